//! Raw input sources.
//!
//! An [`Input`] is polled once per frame and feeds raw events into the GUI through
//! [`Gui::handle_mouse`], [`Gui::handle_mouse_wheel`] and [`Gui::handle_key`].
//! [`QueuedInput`] replays a script of [`RawInput`] records, which makes frame-by-frame
//! tests deterministic. Its queue may be filled from any thread.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Gui;
use crate::event::{Key, MouseButton};

/// A source of raw input.
pub trait Input {
    /// Feed pending input into `gui`.
    ///
    /// Returns `false` if the input source lost focus; the GUI then clears its keyboard
    /// and mouse state.
    fn poll_input(&mut self, gui: &mut Gui) -> bool;
}

/// One raw input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    /// Mouse position, optionally with a button state change.
    Mouse {
        x: i32,
        y: i32,
        button: Option<MouseButton>,
        pressed: bool,
    },
    Wheel(i32),
    Key {
        key: Key,
        ch: Option<char>,
        pressed: bool,
    },
    /// The window lost input focus.
    FocusLost,
}

/// Replays queued [`RawInput`] records. Clones share the queue.
#[derive(Debug, Default, Clone)]
pub struct QueuedInput {
    queue: Arc<Mutex<VecDeque<RawInput>>>,
}

static_assertions::assert_impl_all!(QueuedInput: Send, Sync);

impl QueuedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, input: RawInput) {
        self.queue.lock().push_back(input);
    }

    /// Queue a move to `(x, y)`.
    pub fn move_to(&self, x: i32, y: i32) {
        self.push(RawInput::Mouse {
            x,
            y,
            button: None,
            pressed: false,
        });
    }

    /// Queue a press and release of `button` at `(x, y)`.
    pub fn click(&self, x: i32, y: i32, button: MouseButton) {
        self.push(RawInput::Mouse {
            x,
            y,
            button: Some(button),
            pressed: true,
        });
        self.push(RawInput::Mouse {
            x,
            y,
            button: Some(button),
            pressed: false,
        });
    }

    /// Queue a press and release of `key`.
    pub fn type_key(&self, key: Key, ch: Option<char>) {
        self.push(RawInput::Key {
            key,
            ch,
            pressed: true,
        });
        self.push(RawInput::Key {
            key,
            ch,
            pressed: false,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Input for QueuedInput {
    fn poll_input(&mut self, gui: &mut Gui) -> bool {
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                None => return true,
                Some(RawInput::Mouse {
                    x,
                    y,
                    button,
                    pressed,
                }) => {
                    gui.handle_mouse(x, y, button, pressed);
                }
                Some(RawInput::Wheel(delta)) => {
                    gui.handle_mouse_wheel(delta);
                }
                Some(RawInput::Key { key, ch, pressed }) => {
                    gui.handle_key(key, ch, pressed);
                }
                Some(RawInput::FocusLost) => return false,
            }
        }
    }
}
