//! Core building blocks for Trellis.
//!
//! This crate holds the pieces of the toolkit that do not depend on the widget tree:
//!
//! - **Frame timers**: delay/continuous timers ticked once per frame with the frame delta
//! - **Invoke-later queue**: a lock-guarded, double-buffered job queue fed from any thread
//! - **Animation state**: named boolean states with change timestamps, optionally shared
//! - **Size sequences**: prefix-sum arrays for O(log n) position/index lookups
//! - **Sparse grids**: ordered `(row, column)` maps with row/column shifting
//! - **Callback guard**: the single boundary at which user callback panics are contained
//!
//! # Timer Example
//!
//! ```
//! use trellis_core::FrameTimers;
//!
//! struct Counter {
//!     ticks: u32,
//! }
//!
//! let mut timers = FrameTimers::<Counter>::new();
//! let id = timers.create();
//! timers.set_delay(id, 20).unwrap();
//! timers.set_callback(id, |c: &mut Counter| c.ticks += 1);
//! timers.start(id);
//!
//! let mut counter = Counter { ticks: 0 };
//! for expired in timers.tick(25) {
//!     if let Some(mut cb) = timers.take_callback(expired.id) {
//!         cb(&mut counter);
//!         timers.restore_callback(expired.id, cb);
//!     }
//!     timers.complete(expired);
//! }
//! assert_eq!(counter.ticks, 1);
//! assert!(!timers.is_running(id));
//! ```

pub mod animation;
pub mod error;
pub mod guard;
pub mod invoke;
pub mod logging;
pub mod size_sequence;
pub mod sparse_grid;
pub mod timer;

pub use animation::{AnimationClock, AnimationState, SharedAnimationState, StateKey};
pub use error::{CoreError, Result, TimerError};
pub use guard::guarded;
pub use invoke::{InvokeLaterHandle, InvokeQueue};
pub use size_sequence::SizeSequence;
pub use sparse_grid::SparseGrid;
pub use timer::{ExpiredTimer, FrameTimers, TimerCallback, TimerId};
