//! Frame timers.
//!
//! Timers here are not wall-clock driven. The owner (the GUI) advances them once per
//! frame with the frame's delta time, so a timer fires at most once per frame and always
//! on the GUI thread. A timer may be started or stopped from inside its own callback.
//!
//! The tick is split in three steps so the callback can borrow the owner mutably:
//! [`FrameTimers::tick`] reports the expired timers, the owner runs each callback (taken
//! out with [`FrameTimers::take_callback`]) and finally calls [`FrameTimers::complete`].

use slotmap::{SlotMap, new_key_type};

use crate::error::{Result, TimerError};
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a frame timer.
    pub struct TimerId;
}

/// Default delay of a freshly created timer, in milliseconds.
pub const DEFAULT_DELAY_MS: i32 = 10;

/// Run state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Stopped,
    /// Remaining milliseconds until the timer fires.
    Counting(i32),
    InCallback,
    /// `start` was called from inside the callback.
    StartRequested,
    /// `stop` was called from inside the callback.
    StopRequested,
}

/// A timer callback receiving the owner.
pub type TimerCallback<C> = Box<dyn FnMut(&mut C)>;

struct TimerData<C: ?Sized> {
    state: TimerState,
    delay: i32,
    continuous: bool,
    callback: Option<TimerCallback<C>>,
}

/// A timer that expired during [`FrameTimers::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiredTimer {
    /// The timer that fired.
    pub id: TimerId,
    /// The counter value after subtracting the frame delta (zero or negative).
    overshoot: i32,
}

/// Frame-delta driven timers whose callbacks receive `&mut C`.
pub struct FrameTimers<C: ?Sized> {
    timers: SlotMap<TimerId, TimerData<C>>,
    /// Running timers in start order.
    active: Vec<TimerId>,
}

impl<C: ?Sized> FrameTimers<C> {
    /// Create an empty timer set.
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            active: Vec::new(),
        }
    }

    /// Create a stopped, one-shot timer with the default delay.
    pub fn create(&mut self) -> TimerId {
        self.timers.insert(TimerData {
            state: TimerState::Stopped,
            delay: DEFAULT_DELAY_MS,
            continuous: false,
            callback: None,
        })
    }

    /// Remove a timer entirely. Removing from inside its own callback is allowed.
    pub fn remove(&mut self, id: TimerId) -> Result<()> {
        self.timers.remove(id).ok_or(TimerError::InvalidTimerId)?;
        self.active.retain(|&t| t != id);
        Ok(())
    }

    /// Set the callback invoked when the timer fires.
    pub fn set_callback<F>(&mut self, id: TimerId, callback: F)
    where
        F: FnMut(&mut C) + 'static,
    {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.callback = Some(Box::new(callback));
        }
    }

    /// Set the delay in milliseconds. Takes effect on the next start or repetition.
    pub fn set_delay(&mut self, id: TimerId, delay: i32) -> Result<()> {
        if delay < 1 {
            return Err(TimerError::InvalidDelay(delay).into());
        }
        let timer = self.timers.get_mut(id).ok_or(TimerError::InvalidTimerId)?;
        timer.delay = delay;
        Ok(())
    }

    /// The delay in milliseconds.
    pub fn delay(&self, id: TimerId) -> Option<i32> {
        self.timers.get(id).map(|t| t.delay)
    }

    /// Make the timer repeat until stopped.
    pub fn set_continuous(&mut self, id: TimerId, continuous: bool) {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.continuous = continuous;
        }
    }

    /// Whether the timer repeats.
    pub fn is_continuous(&self, id: TimerId) -> bool {
        self.timers.get(id).is_some_and(|t| t.continuous)
    }

    /// Whether the timer is counting down, or is a continuous timer inside its callback.
    pub fn is_running(&self, id: TimerId) -> bool {
        self.timers.get(id).is_some_and(|t| match t.state {
            TimerState::Counting(_) | TimerState::StartRequested => true,
            TimerState::InCallback => t.continuous,
            TimerState::Stopped | TimerState::StopRequested => false,
        })
    }

    /// Start the timer. Starting a running timer does not restart its countdown.
    pub fn start(&mut self, id: TimerId) {
        let Some(timer) = self.timers.get_mut(id) else {
            return;
        };
        match timer.state {
            TimerState::Stopped => {
                timer.state = TimerState::Counting(timer.delay);
                self.active.push(id);
            }
            TimerState::InCallback | TimerState::StopRequested => {
                timer.state = TimerState::StartRequested;
            }
            TimerState::Counting(_) | TimerState::StartRequested => {}
        }
    }

    /// Stop the timer.
    pub fn stop(&mut self, id: TimerId) {
        let Some(timer) = self.timers.get_mut(id) else {
            return;
        };
        match timer.state {
            TimerState::Counting(_) => {
                timer.state = TimerState::Stopped;
                self.active.retain(|&t| t != id);
            }
            TimerState::InCallback | TimerState::StartRequested => {
                timer.state = TimerState::StopRequested;
            }
            TimerState::Stopped | TimerState::StopRequested => {}
        }
    }

    /// Number of running timers.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advance all running timers by `delta` milliseconds.
    ///
    /// Returns the timers that expired, in start order. Each must be passed back to
    /// [`complete`](Self::complete) after its callback ran.
    #[tracing::instrument(skip(self), target = "trellis_core::timer", level = "trace")]
    pub fn tick(&mut self, delta: i32) -> Vec<ExpiredTimer> {
        let mut expired = Vec::new();
        for &id in &self.active {
            let Some(timer) = self.timers.get_mut(id) else {
                continue;
            };
            if let TimerState::Counting(counter) = timer.state {
                let remaining = counter - delta;
                if remaining <= 0 {
                    timer.state = TimerState::InCallback;
                    expired.push(ExpiredTimer {
                        id,
                        overshoot: remaining,
                    });
                } else {
                    timer.state = TimerState::Counting(remaining);
                }
            }
        }
        if !expired.is_empty() {
            tracing::trace!(target: targets::TIMER, count = expired.len(), "timers expired");
        }
        expired
    }

    /// Take the callback out so the owner can call it with `&mut C`.
    pub fn take_callback(&mut self, id: TimerId) -> Option<TimerCallback<C>> {
        self.timers.get_mut(id).and_then(|t| t.callback.take())
    }

    /// Put a callback back after it ran. Ignored if the timer was removed or got a new callback.
    pub fn restore_callback(&mut self, id: TimerId, callback: TimerCallback<C>) {
        if let Some(timer) = self.timers.get_mut(id)
            && timer.callback.is_none()
        {
            timer.callback = Some(callback);
        }
    }

    /// Finish an expired timer: reschedule it or take it off the active list.
    pub fn complete(&mut self, expired: ExpiredTimer) {
        let id = expired.id;
        let Some(timer) = self.timers.get_mut(id) else {
            self.active.retain(|&t| t != id);
            return;
        };
        let keep_running = match timer.state {
            TimerState::StopRequested => false,
            TimerState::StartRequested => true,
            TimerState::InCallback => timer.continuous,
            TimerState::Stopped | TimerState::Counting(_) => return,
        };
        if keep_running {
            timer.state = TimerState::Counting((expired.overshoot + timer.delay).max(1));
        } else {
            timer.state = TimerState::Stopped;
            self.active.retain(|&t| t != id);
        }
    }
}

impl<C: ?Sized> Default for FrameTimers<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Owner {
        fired: Vec<&'static str>,
        stop_me: Option<TimerId>,
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn run_frame(timers: &mut FrameTimers<Owner>, owner: &mut Owner, delta: i32) {
        init_tracing();
        for expired in timers.tick(delta) {
            if let Some(mut cb) = timers.take_callback(expired.id) {
                cb(owner);
                timers.restore_callback(expired.id, cb);
            }
            if let Some(id) = owner.stop_me.take() {
                timers.stop(id);
            }
            timers.complete(expired);
        }
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut timers = FrameTimers::<Owner>::new();
        let mut owner = Owner::default();
        let id = timers.create();
        timers.set_delay(id, 30).unwrap();
        timers.set_callback(id, |o: &mut Owner| o.fired.push("a"));
        timers.start(id);
        run_frame(&mut timers, &mut owner, 20);
        assert!(owner.fired.is_empty());
        run_frame(&mut timers, &mut owner, 20);
        assert_eq!(owner.fired, vec!["a"]);
        run_frame(&mut timers, &mut owner, 50);
        assert_eq!(owner.fired, vec!["a"]);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn test_continuous_reschedules_with_overshoot() {
        let mut timers = FrameTimers::<Owner>::new();
        let mut owner = Owner::default();
        let id = timers.create();
        timers.set_delay(id, 10).unwrap();
        timers.set_continuous(id, true);
        timers.set_callback(id, |o: &mut Owner| o.fired.push("c"));
        timers.start(id);
        run_frame(&mut timers, &mut owner, 15);
        // counter = max(1, -5 + 10) = 5
        run_frame(&mut timers, &mut owner, 4);
        assert_eq!(owner.fired.len(), 1);
        run_frame(&mut timers, &mut owner, 1);
        assert_eq!(owner.fired.len(), 2);
        assert!(timers.is_running(id));
    }

    #[test]
    fn test_stop_from_callback() {
        let mut timers = FrameTimers::<Owner>::new();
        let mut owner = Owner::default();
        let id = timers.create();
        timers.set_continuous(id, true);
        timers.set_callback(id, move |o: &mut Owner| {
            o.fired.push("x");
            o.stop_me = Some(id);
        });
        timers.start(id);
        run_frame(&mut timers, &mut owner, 100);
        assert!(!timers.is_running(id));
        run_frame(&mut timers, &mut owner, 100);
        assert_eq!(owner.fired.len(), 1);
    }

    #[test]
    fn test_restart_one_shot_from_callback() {
        let mut timers = FrameTimers::<Owner>::new();
        let id = timers.create();
        timers.start(id);
        let expired = timers.tick(DEFAULT_DELAY_MS);
        assert_eq!(expired.len(), 1);
        timers.start(id);
        timers.complete(expired[0]);
        assert!(timers.is_running(id));
    }

    #[test]
    fn test_invalid_delay_rejected() {
        let mut timers = FrameTimers::<Owner>::new();
        let id = timers.create();
        assert!(matches!(
            timers.set_delay(id, 0),
            Err(crate::CoreError::Timer(TimerError::InvalidDelay(0)))
        ));
        assert_eq!(timers.delay(id), Some(DEFAULT_DELAY_MS));
    }

    #[test]
    fn test_remove_unknown_timer() {
        let mut timers = FrameTimers::<Owner>::new();
        let id = timers.create();
        timers.remove(id).unwrap();
        assert!(timers.remove(id).is_err());
    }
}
