//! Per-widget animation state.
//!
//! An [`AnimationState`] is a bag of named boolean states, each remembering when it last
//! changed. Themes select images from the active states and animate transitions using the
//! elapsed time. A state bag may chain to a parent so widgets can inherit e.g. `hover`
//! from their container. Time comes from an [`AnimationClock`] shared with the GUI; a
//! detached state reads time zero.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// The name of an animation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey(&'static str);

impl StateKey {
    /// Create a state key.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The state name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

/// A millisecond clock shared between the GUI and the animation states it owns.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock(Rc<Cell<i64>>);

impl AnimationClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds.
    pub fn now(&self) -> i64 {
        self.0.get()
    }

    /// Set the current time.
    pub fn set(&self, millis: i64) {
        self.0.set(millis);
    }
}

/// A reference-counted animation state, used when several widgets share one bag.
pub type SharedAnimationState = Rc<RefCell<AnimationState>>;

#[derive(Debug, Clone, Copy)]
struct State {
    last_changed: i64,
    active: bool,
    should_animate: bool,
}

/// Named boolean states with change timestamps.
#[derive(Debug, Default)]
pub struct AnimationState {
    parent: Option<SharedAnimationState>,
    states: HashMap<StateKey, State>,
    clock: Option<AnimationClock>,
}

impl AnimationState {
    /// Create an empty, detached state bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state bag that falls back to `parent` for unknown states.
    pub fn with_parent(parent: SharedAnimationState) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Wrap in an `Rc<RefCell<_>>`.
    pub fn shared(self) -> SharedAnimationState {
        Rc::new(RefCell::new(self))
    }

    /// Attach to (or detach from) a GUI clock.
    ///
    /// All timestamps are reset to the new clock's current time so no transition is
    /// replayed when a widget is re-added.
    pub fn set_clock(&mut self, clock: Option<AnimationClock>) {
        self.clock = clock;
        let now = self.current_time();
        for state in self.states.values_mut() {
            state.last_changed = now;
        }
    }

    fn current_time(&self) -> i64 {
        self.clock.as_ref().map_or(0, AnimationClock::now)
    }

    /// Milliseconds since `key` last changed.
    ///
    /// Falls back to the parent chain, and finally to the clock time itself.
    pub fn animation_time(&self, key: StateKey) -> i32 {
        if let Some(state) = self.states.get(&key) {
            let elapsed = self.current_time() - state.last_changed;
            return elapsed.min(i64::from(i32::MAX)) as i32;
        }
        if let Some(parent) = &self.parent {
            return parent.borrow().animation_time(key);
        }
        (self.current_time() & i64::from(i32::MAX)) as i32
    }

    /// Whether `key` is active, consulting the parent chain for unknown states.
    pub fn get(&self, key: StateKey) -> bool {
        if let Some(state) = self.states.get(&key) {
            return state.active;
        }
        self.parent.as_ref().is_some_and(|p| p.borrow().get(key))
    }

    /// Whether a transition of `key` should be animated.
    pub fn should_animate(&self, key: StateKey) -> bool {
        if let Some(state) = self.states.get(&key) {
            return state.should_animate;
        }
        self.parent
            .as_ref()
            .is_some_and(|p| p.borrow().should_animate(key))
    }

    /// Set `key`. The timestamp only changes when the value does.
    pub fn set(&mut self, key: StateKey, active: bool) {
        let now = self.current_time();
        let state = self.states.entry(key).or_insert(State {
            last_changed: now,
            active: false,
            should_animate: false,
        });
        if state.active != active {
            state.active = active;
            state.last_changed = now;
            state.should_animate = true;
        }
    }

    /// Restart the animation of `key` without changing its value.
    pub fn reset_animation_time(&mut self, key: StateKey) {
        let now = self.current_time();
        let state = self.states.entry(key).or_insert(State {
            last_changed: now,
            active: false,
            should_animate: false,
        });
        state.last_changed = now;
        state.should_animate = true;
    }

    /// Suppress animation for the current transition of `key`.
    pub fn dont_animate(&mut self, key: StateKey) {
        if let Some(state) = self.states.get_mut(&key) {
            state.should_animate = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOVER: StateKey = StateKey::new("hover");
    const PRESSED: StateKey = StateKey::new("pressed");

    #[test]
    fn test_set_updates_timestamp_only_on_change() {
        let clock = AnimationClock::new();
        let mut state = AnimationState::new();
        state.set_clock(Some(clock.clone()));
        clock.set(100);
        state.set(HOVER, true);
        clock.set(150);
        state.set(HOVER, true);
        assert_eq!(state.animation_time(HOVER), 50);
        assert!(state.get(HOVER));
        assert!(state.should_animate(HOVER));
        state.dont_animate(HOVER);
        assert!(!state.should_animate(HOVER));
    }

    #[test]
    fn test_parent_fallback() {
        let clock = AnimationClock::new();
        let parent = AnimationState::new().shared();
        parent.borrow_mut().set_clock(Some(clock.clone()));
        clock.set(10);
        parent.borrow_mut().set(PRESSED, true);
        let child = AnimationState::with_parent(Rc::clone(&parent));
        assert!(child.get(PRESSED));
        assert!(!child.get(HOVER));
        clock.set(30);
        assert_eq!(child.animation_time(PRESSED), 20);
    }

    #[test]
    fn test_set_clock_resets_timestamps() {
        let mut state = AnimationState::new();
        state.set(HOVER, true);
        let clock = AnimationClock::new();
        clock.set(500);
        state.set_clock(Some(clock.clone()));
        clock.set(520);
        assert_eq!(state.animation_time(HOVER), 20);
    }

    #[test]
    fn test_reset_animation_time() {
        let clock = AnimationClock::new();
        let mut state = AnimationState::new();
        state.set_clock(Some(clock.clone()));
        clock.set(40);
        state.reset_animation_time(HOVER);
        clock.set(45);
        assert_eq!(state.animation_time(HOVER), 5);
        assert!(!state.get(HOVER));
    }
}
