//! The input event record.
//!
//! The GUI owns one [`Event`] and mutates it in place as raw input arrives. Dispatch
//! hands each widget a copy, so hooks may freely call back into the GUI. Sub-events
//! (`MouseEntered`/`MouseExited` synthesized while routing) are derived copies that
//! never write back into the GUI's record.
//!
//! All of this happens on the GUI thread; an `Event` is never shared across threads.

/// What an [`Event`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    MouseEntered,
    MouseMoved,
    MouseBtnDown,
    MouseBtnUp,
    MouseClicked,
    MouseDragged,
    MouseExited,
    MouseWheel,
    KeyPressed,
    KeyReleased,
    PopupOpened,
    PopupClosed,
    ClearKeyboardState,
}

impl EventType {
    pub const fn is_mouse_event(self) -> bool {
        matches!(
            self,
            Self::MouseEntered
                | Self::MouseMoved
                | Self::MouseBtnDown
                | Self::MouseBtnUp
                | Self::MouseClicked
                | Self::MouseDragged
                | Self::MouseExited
                | Self::MouseWheel
        )
    }

    pub const fn is_key_event(self) -> bool {
        matches!(self, Self::KeyPressed | Self::KeyReleased)
    }
}

/// Mouse buttons tracked by the GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// The backend button index (left = 0, right = 1, middle = 2).
    pub const fn index(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
        }
    }

    pub(crate) const fn mask(self) -> ModifierMask {
        match self {
            Self::Left => ModifierMask::LBUTTON,
            Self::Right => ModifierMask::RBUTTON,
            Self::Middle => ModifierMask::MBUTTON,
        }
    }
}

/// Left/right-aware modifier and mouse button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierMask(u16);

impl ModifierMask {
    pub const NONE: Self = Self(0);
    pub const LSHIFT: Self = Self(1);
    pub const LMETA: Self = Self(2);
    pub const LCTRL: Self = Self(4);
    pub const RSHIFT: Self = Self(8);
    pub const RMETA: Self = Self(16);
    pub const RCTRL: Self = Self(32);
    pub const LBUTTON: Self = Self(64);
    pub const RBUTTON: Self = Self(128);
    pub const MBUTTON: Self = Self(256);
    pub const LALT: Self = Self(512);
    pub const RALT: Self = Self(1024);

    pub const SHIFT: Self = Self(Self::LSHIFT.0 | Self::RSHIFT.0);
    pub const META: Self = Self(Self::LMETA.0 | Self::RMETA.0);
    pub const CTRL: Self = Self(Self::LCTRL.0 | Self::RCTRL.0);
    pub const ALT: Self = Self(Self::LALT.0 | Self::RALT.0);
    pub const BUTTONS: Self = Self(Self::LBUTTON.0 | Self::MBUTTON.0 | Self::RBUTTON.0);
    pub const KEYS: Self = Self(Self::SHIFT.0 | Self::META.0 | Self::CTRL.0 | Self::ALT.0);

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether any bit of `other` is set.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn set(&mut self, mask: Self, on: bool) {
        if on {
            self.0 |= mask.0;
        } else {
            self.0 &= !mask.0;
        }
    }

    /// The side-agnostic keyboard modifiers.
    pub const fn keyboard(self) -> KeyboardModifiers {
        KeyboardModifiers {
            shift: self.intersects(Self::SHIFT),
            control: self.intersects(Self::CTRL),
            alt: self.intersects(Self::ALT),
            meta: self.intersects(Self::META),
        }
    }
}

/// Keyboard modifier state without left/right distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held.
    pub control: bool,
    /// The Alt key is held.
    pub alt: bool,
    /// The Meta/Super key is held.
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        control: false,
        alt: false,
        meta: false,
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        shift: false,
        control: true,
        alt: false,
        meta: false,
    };

    /// Alt modifier only.
    pub const ALT: Self = Self {
        shift: false,
        control: false,
        alt: true,
        meta: false,
    };

    /// Control + Shift modifiers.
    pub const CTRL_SHIFT: Self = Self {
        shift: true,
        control: true,
        alt: false,
        meta: false,
    };

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.meta
    }

    /// Control or Meta, the platform "command" modifier.
    pub fn command(&self) -> bool {
        self.control || self.meta
    }
}

/// Keyboard key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[rustfmt::skip]
pub enum Key {
    /// No key code; the event only carries a character.
    #[default]
    None,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Numbers (main keyboard)
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    // Navigation
    ArrowUp, ArrowDown, ArrowLeft, ArrowRight,
    Home, End, PageUp, PageDown,

    // Editing
    Backspace, Delete, Insert,
    Enter, Tab,

    Space,

    // Modifiers
    ShiftLeft, ShiftRight,
    ControlLeft, ControlRight,
    AltLeft, AltRight,
    MetaLeft, MetaRight,

    // Punctuation and symbols
    Minus, Equal,
    BracketLeft, BracketRight, Backslash,
    Semicolon, Quote,
    Comma, Period, Slash,
    Grave,

    Escape,
    NumpadEnter,

    Unknown(u16),
}

impl Key {
    /// Check if this is a modifier key.
    pub fn is_modifier(&self) -> bool {
        self.modifier_mask().is_some()
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Key::ArrowUp
                | Key::ArrowDown
                | Key::ArrowLeft
                | Key::ArrowRight
                | Key::Home
                | Key::End
                | Key::PageUp
                | Key::PageDown
        )
    }

    /// The modifier bit toggled by this key, if it is a modifier key.
    pub const fn modifier_mask(self) -> Option<ModifierMask> {
        match self {
            Key::ShiftLeft => Some(ModifierMask::LSHIFT),
            Key::ShiftRight => Some(ModifierMask::RSHIFT),
            Key::ControlLeft => Some(ModifierMask::LCTRL),
            Key::ControlRight => Some(ModifierMask::RCTRL),
            Key::AltLeft => Some(ModifierMask::LALT),
            Key::AltRight => Some(ModifierMask::RALT),
            Key::MetaLeft => Some(ModifierMask::LMETA),
            Key::MetaRight => Some(ModifierMask::RMETA),
            _ => None,
        }
    }

    /// Parse the names used in theme input maps (`"A"`, `"TAB"`, `"PAGEUP"`, ...).
    pub fn from_name(name: &str) -> Option<Key> {
        let upper = name.to_ascii_uppercase();
        let key = match upper.as_str() {
            "TAB" => Key::Tab,
            "RETURN" | "ENTER" => Key::Enter,
            "ESCAPE" | "ESC" => Key::Escape,
            "SPACE" => Key::Space,
            "BACK" | "BACKSPACE" => Key::Backspace,
            "DELETE" => Key::Delete,
            "INSERT" => Key::Insert,
            "HOME" => Key::Home,
            "END" => Key::End,
            "PRIOR" | "PAGEUP" => Key::PageUp,
            "NEXT" | "PAGEDOWN" => Key::PageDown,
            "UP" => Key::ArrowUp,
            "DOWN" => Key::ArrowDown,
            "LEFT" => Key::ArrowLeft,
            "RIGHT" => Key::ArrowRight,
            _ => {
                let mut chars = upper.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_uppercase() => Key::letter(c)?,
                    (Some(c), None) if c.is_ascii_digit() => Key::digit(c)?,
                    (Some('F'), Some(_)) => {
                        let n: u8 = upper[1..].parse().ok()?;
                        Key::function(n)?
                    }
                    _ => return None,
                }
            }
        };
        Some(key)
    }

    fn letter(c: char) -> Option<Key> {
        const LETTERS: [Key; 26] = [
            Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
            Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
            Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
        ];
        LETTERS.get((c as usize).checked_sub('A' as usize)?).copied()
    }

    fn digit(c: char) -> Option<Key> {
        const DIGITS: [Key; 10] = [
            Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
            Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
        ];
        DIGITS.get(c.to_digit(10)? as usize).copied()
    }

    fn function(n: u8) -> Option<Key> {
        const FUNCTIONS: [Key; 12] = [
            Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
            Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
        ];
        FUNCTIONS.get(usize::from(n).checked_sub(1)?).copied()
    }
}

/// The current input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub(crate) event_type: EventType,
    pub(crate) mouse_x: i32,
    pub(crate) mouse_y: i32,
    pub(crate) wheel_delta: i32,
    pub(crate) mouse_button: Option<MouseButton>,
    pub(crate) click_count: u32,
    pub(crate) drag_event: bool,
    pub(crate) key_repeated: bool,
    pub(crate) key: Key,
    pub(crate) key_char: Option<char>,
    pub(crate) modifiers: ModifierMask,
}

static_assertions::assert_impl_all!(Event: Send, Sync, Copy);

impl Default for Event {
    fn default() -> Self {
        Self::new(EventType::MouseMoved)
    }
}

impl Event {
    /// A blank event of the given type.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            mouse_x: 0,
            mouse_y: 0,
            wheel_delta: 0,
            mouse_button: None,
            click_count: 0,
            drag_event: false,
            key_repeated: false,
            key: Key::None,
            key_char: None,
            modifiers: ModifierMask::NONE,
        }
    }

    /// A mouse event at `(x, y)`.
    pub fn mouse(event_type: EventType, x: i32, y: i32) -> Self {
        Self {
            mouse_x: x,
            mouse_y: y,
            ..Self::new(event_type)
        }
    }

    /// A key event.
    pub fn key(event_type: EventType, key: Key, key_char: Option<char>) -> Self {
        Self {
            key,
            key_char,
            ..Self::new(event_type)
        }
    }

    /// Builder: replace the modifier state.
    pub fn with_modifiers(mut self, modifiers: ModifierMask) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Builder: set the click count.
    pub fn with_click_count(mut self, count: u32) -> Self {
        self.click_count = count;
        self
    }

    /// Builder: set the pressed/released mouse button.
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.mouse_button = Some(button);
        self
    }

    /// Builder: set the wheel delta.
    pub fn with_wheel_delta(mut self, delta: i32) -> Self {
        self.wheel_delta = delta;
        self
    }

    #[inline]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[inline]
    pub fn is_mouse_event(&self) -> bool {
        self.event_type.is_mouse_event()
    }

    pub fn is_mouse_event_no_wheel(&self) -> bool {
        self.is_mouse_event() && self.event_type != EventType::MouseWheel
    }

    #[inline]
    pub fn is_key_event(&self) -> bool {
        self.event_type.is_key_event()
    }

    pub fn is_key_pressed_event(&self) -> bool {
        self.event_type == EventType::KeyPressed
    }

    /// Whether the mouse is currently being dragged.
    pub fn is_mouse_drag_event(&self) -> bool {
        self.drag_event
    }

    /// Whether all mouse buttons are released.
    pub fn is_mouse_drag_end(&self) -> bool {
        !self.modifiers.intersects(ModifierMask::BUTTONS)
    }

    /// Button presses, releases, clicks and drags; disabled widgets swallow these.
    pub fn is_mouse_action(&self) -> bool {
        matches!(
            self.event_type,
            EventType::MouseBtnDown
                | EventType::MouseBtnUp
                | EventType::MouseClicked
                | EventType::MouseDragged
        )
    }

    #[inline]
    pub fn mouse_x(&self) -> i32 {
        self.mouse_x
    }

    #[inline]
    pub fn mouse_y(&self) -> i32 {
        self.mouse_y
    }

    pub fn mouse_button(&self) -> Option<MouseButton> {
        self.mouse_button
    }

    pub fn wheel_delta(&self) -> i32 {
        self.wheel_delta
    }

    pub fn click_count(&self) -> u32 {
        self.click_count
    }

    pub fn key_code(&self) -> Key {
        self.key
    }

    pub fn key_char(&self) -> Option<char> {
        self.key_char
    }

    /// Whether this is a key press carrying a character.
    pub fn has_key_char(&self) -> bool {
        self.event_type == EventType::KeyPressed && self.key_char.is_some()
    }

    /// A typed character with at most Shift held (or AltGr, reported as LCtrl+RAlt).
    pub fn has_key_char_no_modifiers(&self) -> bool {
        let altgr = ModifierMask::LCTRL.union(ModifierMask::RALT);
        let keys = self.modifiers.without(ModifierMask::BUTTONS).without(ModifierMask::SHIFT);
        self.has_key_char() && (keys.is_empty() || keys == altgr)
    }

    pub fn is_key_repeated(&self) -> bool {
        self.event_type == EventType::KeyPressed && self.key_repeated
    }

    pub fn modifiers(&self) -> ModifierMask {
        self.modifiers
    }

    pub fn keyboard_modifiers(&self) -> KeyboardModifiers {
        self.modifiers.keyboard()
    }

    /// Whether `button` is currently held.
    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.modifiers.intersects(button.mask())
    }

    /// A copy of this event with a different type.
    pub fn sub_event(&self, event_type: EventType) -> Event {
        Event {
            event_type,
            ..*self
        }
    }

    /// A copy of this event with different mouse coordinates.
    pub fn at(&self, x: i32, y: i32) -> Event {
        Event {
            mouse_x: x,
            mouse_y: y,
            ..*self
        }
    }

    pub(crate) fn set_button_state(&mut self, button: MouseButton, pressed: bool) {
        self.modifiers.set(button.mask(), pressed);
    }

    /// Track a modifier key press or release.
    pub(crate) fn update_modifier_keys(&mut self, pressed: bool) {
        if let Some(mask) = self.key.modifier_mask() {
            self.modifiers.set(mask, pressed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_char_no_modifiers() {
        let mut evt = Event::key(EventType::KeyPressed, Key::A, Some('a'));
        assert!(evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LSHIFT;
        assert!(evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LCTRL;
        assert!(!evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LCTRL.union(ModifierMask::RALT);
        assert!(evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LBUTTON;
        assert!(evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LCTRL.union(ModifierMask::RALT).union(ModifierMask::RSHIFT);
        assert!(evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::LCTRL.union(ModifierMask::LSHIFT);
        assert!(!evt.has_key_char_no_modifiers());
        evt.modifiers = ModifierMask::RALT;
        assert!(!evt.has_key_char_no_modifiers());
    }

    #[test]
    fn test_modifier_tracking_is_side_aware() {
        let mut evt = Event::key(EventType::KeyPressed, Key::ShiftLeft, None);
        evt.update_modifier_keys(true);
        evt.key = Key::ShiftRight;
        evt.update_modifier_keys(true);
        evt.update_modifier_keys(false);
        assert!(evt.keyboard_modifiers().shift);
        evt.key = Key::ShiftLeft;
        evt.update_modifier_keys(false);
        assert!(!evt.keyboard_modifiers().shift);
    }

    #[test]
    fn test_drag_end_tracks_buttons() {
        let mut evt = Event::default();
        assert!(evt.is_mouse_drag_end());
        evt.set_button_state(MouseButton::Right, true);
        assert!(!evt.is_mouse_drag_end());
        assert!(evt.is_button_down(MouseButton::Right));
        evt.set_button_state(MouseButton::Right, false);
        assert!(evt.is_mouse_drag_end());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("tab"), Some(Key::Tab));
        assert_eq!(Key::from_name("C"), Some(Key::C));
        assert_eq!(Key::from_name("7"), Some(Key::Digit7));
        assert_eq!(Key::from_name("F10"), Some(Key::F10));
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("bogus"), None);
    }
}
