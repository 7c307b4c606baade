//! Clipboard seam.

/// Access to a text clipboard.
pub trait Clipboard {
    /// The clipboard text, if any.
    fn get_text(&self) -> Option<String>;

    fn set_text(&mut self, text: &str);
}

/// A process-local clipboard.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn get_text(&self) -> Option<String> {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_owned());
    }
}
