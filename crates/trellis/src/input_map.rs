//! Key stroke to action mapping.
//!
//! An [`InputMap`] is usually loaded from the theme (`inputMap` parameter). When a key
//! event reaches a widget and no focused child consumed it, the widget looks up the
//! action name and offers it to [`Widget::handle_key_stroke_action`](crate::Widget::handle_key_stroke_action).

use crate::event::{Event, EventType, Key, KeyboardModifiers};

/// A key plus the exact modifiers that must be held.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: KeyboardModifiers,
    pub action: String,
}

impl KeyStroke {
    pub fn new(key: Key, modifiers: KeyboardModifiers, action: impl Into<String>) -> Self {
        Self {
            key,
            modifiers,
            action: action.into(),
        }
    }

    /// Parse `"ctrl shift A"` style descriptions; the last token is the key name.
    pub fn parse(stroke: &str, action: impl Into<String>) -> Option<Self> {
        let mut modifiers = KeyboardModifiers::NONE;
        let mut key = None;
        for token in stroke.split_whitespace() {
            if key.is_some() {
                return None;
            }
            match token.to_ascii_lowercase().as_str() {
                "shift" => modifiers.shift = true,
                "ctrl" | "control" => modifiers.control = true,
                "alt" => modifiers.alt = true,
                "meta" | "cmd" => modifiers.meta = true,
                _ => key = Some(Key::from_name(token)?),
            }
        }
        Some(Self::new(key?, modifiers, action))
    }

    fn matches(&self, evt: &Event) -> bool {
        evt.key_code() == self.key && evt.keyboard_modifiers() == self.modifiers
    }
}

/// An ordered set of key strokes; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputMap {
    strokes: Vec<KeyStroke>,
}

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stroke, replacing an existing stroke for the same key and modifiers.
    pub fn add(&mut self, stroke: KeyStroke) {
        if let Some(existing) = self
            .strokes
            .iter_mut()
            .find(|s| s.key == stroke.key && s.modifiers == stroke.modifiers)
        {
            *existing = stroke;
        } else {
            self.strokes.push(stroke);
        }
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, stroke: KeyStroke) -> Self {
        self.add(stroke);
        self
    }

    /// The action bound to a key-pressed event, if any.
    pub fn map_event(&self, evt: &Event) -> Option<&str> {
        if evt.event_type() != EventType::KeyPressed {
            return None;
        }
        self.strokes
            .iter()
            .find(|s| s.matches(evt))
            .map(|s| s.action.as_str())
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ModifierMask;

    #[test]
    fn test_parse_and_map() {
        let map = InputMap::new()
            .with(KeyStroke::parse("ctrl A", "selectAll").unwrap())
            .with(KeyStroke::parse("DELETE", "delete").unwrap());
        let evt = Event::key(EventType::KeyPressed, Key::A, Some('a'))
            .with_modifiers(ModifierMask::LCTRL);
        assert_eq!(map.map_event(&evt), Some("selectAll"));
        let plain = Event::key(EventType::KeyPressed, Key::A, Some('a'));
        assert_eq!(map.map_event(&plain), None);
        let released = Event::key(EventType::KeyReleased, Key::Delete, None);
        assert_eq!(map.map_event(&released), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(KeyStroke::parse("ctrl", "x").is_none());
        assert!(KeyStroke::parse("A B", "x").is_none());
        assert!(KeyStroke::parse("ctrl nosuchkey", "x").is_none());
    }
}
