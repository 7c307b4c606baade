//! Theme lookup seam.
//!
//! Theme files are parsed elsewhere. The toolkit only needs to walk a tree of
//! [`ThemeInfo`] nodes by dotted path and read typed parameters with defaults. Missing
//! themes or parameters are never errors: every getter falls back to its default.
//!
//! [`MemoryThemeManager`] is an in-memory implementation built in code, used by tests and
//! by applications that configure widgets programmatically.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use cursor_icon::CursorIcon;
use trellis_render::{Alignment, Border, Color, Font, Image, Point};

use crate::input_map::InputMap;

/// A typed theme parameter.
#[derive(Debug, Clone)]
pub enum ThemeValue {
    Int(i32),
    Bool(bool),
    Str(String),
    Color(Color),
    Border(Border),
    Alignment(Alignment),
    /// A two-dimensional offset or size, e.g. `hscrollbarOffset`.
    Point(Point),
    Image(Rc<dyn Image>),
    Font(Rc<dyn Font>),
    Cursor(CursorIcon),
    InputMap(Rc<InputMap>),
}

/// One node of the theme tree.
pub trait ThemeInfo: fmt::Debug {
    /// The name of this node within its parent.
    fn theme_name(&self) -> &str;

    fn parameter(&self, name: &str) -> Option<ThemeValue>;

    fn child_theme(&self, name: &str) -> Option<Rc<dyn ThemeInfo>>;

    fn get_int(&self, name: &str, default: i32) -> i32 {
        match self.parameter(name) {
            Some(ThemeValue::Int(v)) => v,
            _ => default,
        }
    }

    fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.parameter(name) {
            Some(ThemeValue::Bool(v)) => v,
            _ => default,
        }
    }

    fn get_string(&self, name: &str) -> Option<String> {
        match self.parameter(name) {
            Some(ThemeValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    fn get_color(&self, name: &str, default: Color) -> Color {
        match self.parameter(name) {
            Some(ThemeValue::Color(v)) => v,
            _ => default,
        }
    }

    fn get_border(&self, name: &str) -> Option<Border> {
        match self.parameter(name) {
            Some(ThemeValue::Border(v)) => Some(v),
            Some(ThemeValue::Int(v)) => Some(Border::uniform(v)),
            _ => None,
        }
    }

    fn get_alignment(&self, name: &str, default: Alignment) -> Alignment {
        match self.parameter(name) {
            Some(ThemeValue::Alignment(v)) => v,
            Some(ThemeValue::Str(s)) => Alignment::by_name(&s),
            _ => default,
        }
    }

    fn get_point(&self, name: &str, default: Point) -> Point {
        match self.parameter(name) {
            Some(ThemeValue::Point(v)) => v,
            _ => default,
        }
    }

    fn get_image(&self, name: &str) -> Option<Rc<dyn Image>> {
        match self.parameter(name) {
            Some(ThemeValue::Image(v)) => Some(v),
            _ => None,
        }
    }

    fn get_font(&self, name: &str) -> Option<Rc<dyn Font>> {
        match self.parameter(name) {
            Some(ThemeValue::Font(v)) => Some(v),
            _ => None,
        }
    }

    fn get_mouse_cursor(&self, name: &str) -> Option<CursorIcon> {
        match self.parameter(name) {
            Some(ThemeValue::Cursor(v)) => Some(v),
            _ => None,
        }
    }

    fn get_input_map(&self, name: &str) -> Option<Rc<InputMap>> {
        match self.parameter(name) {
            Some(ThemeValue::InputMap(v)) => Some(v),
            _ => None,
        }
    }
}

/// Resolves absolute theme paths.
pub trait ThemeManager: fmt::Debug {
    /// Find the theme node for a dotted path such as `"scrollpane.hscrollbar"`.
    fn find_theme_info(&self, path: &str) -> Option<Rc<dyn ThemeInfo>>;

    /// The font used when a widget's theme does not name one.
    fn default_font(&self) -> Option<Rc<dyn Font>> {
        None
    }
}

/// A theme node built in code.
#[derive(Debug, Default, Clone)]
pub struct MemoryTheme {
    name: String,
    params: HashMap<String, ThemeValue>,
    children: HashMap<String, Rc<MemoryTheme>>,
}

impl MemoryTheme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set a parameter.
    pub fn param(mut self, name: impl Into<String>, value: ThemeValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Builder: add a child theme, keyed by its name.
    pub fn child(mut self, child: MemoryTheme) -> Self {
        self.children.insert(child.name.clone(), Rc::new(child));
        self
    }
}

impl ThemeInfo for MemoryTheme {
    fn theme_name(&self) -> &str {
        &self.name
    }

    fn parameter(&self, name: &str) -> Option<ThemeValue> {
        self.params.get(name).cloned()
    }

    fn child_theme(&self, name: &str) -> Option<Rc<dyn ThemeInfo>> {
        self.children
            .get(name)
            .or_else(|| self.children.get("*"))
            .map(|c| Rc::clone(c) as Rc<dyn ThemeInfo>)
    }
}

/// A [`ThemeManager`] over [`MemoryTheme`] roots.
///
/// The first path segment selects a root theme; a root named `"*"` is the fallback for
/// unknown roots.
#[derive(Debug, Default)]
pub struct MemoryThemeManager {
    roots: HashMap<String, Rc<MemoryTheme>>,
    default_font: Option<Rc<dyn Font>>,
}

impl MemoryThemeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a root theme.
    pub fn with_theme(mut self, theme: MemoryTheme) -> Self {
        self.roots.insert(theme.name.clone(), Rc::new(theme));
        self
    }

    /// Builder: set the default font.
    pub fn with_default_font(mut self, font: Rc<dyn Font>) -> Self {
        self.default_font = Some(font);
        self
    }
}

impl ThemeManager for MemoryThemeManager {
    fn find_theme_info(&self, path: &str) -> Option<Rc<dyn ThemeInfo>> {
        let mut segments = path.split('.');
        let root = segments.next()?;
        let root = self.roots.get(root).or_else(|| {
            let fallback = self.roots.get("*");
            if fallback.is_some() {
                tracing::debug!(target: trellis_core::logging::targets::THEME, path, "using fallback theme");
            }
            fallback
        })?;
        let mut info: Rc<dyn ThemeInfo> = Rc::clone(root) as Rc<dyn ThemeInfo>;
        for segment in segments {
            info = info.child_theme(segment)?;
        }
        Some(info)
    }

    fn default_font(&self) -> Option<Rc<dyn Font>> {
        self.default_font.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MemoryThemeManager {
        MemoryThemeManager::new()
            .with_theme(
                MemoryTheme::new("scrollpane")
                    .param("minWidth", ThemeValue::Int(40))
                    .child(MemoryTheme::new("hscrollbar").param("border", ThemeValue::Int(2))),
            )
            .with_theme(MemoryTheme::new("*").param("fallback", ThemeValue::Bool(true)))
    }

    #[test]
    fn test_find_nested_path() {
        let tm = manager();
        let info = tm.find_theme_info("scrollpane.hscrollbar").unwrap();
        assert_eq!(info.theme_name(), "hscrollbar");
        assert_eq!(info.get_border("border"), Some(Border::uniform(2)));
        assert!(tm.find_theme_info("scrollpane.missing").is_none());
    }

    #[test]
    fn test_fallback_root_and_defaults() {
        let tm = manager();
        let info = tm.find_theme_info("unknown").unwrap();
        assert!(info.get_bool("fallback", false));
        assert_eq!(info.get_int("minWidth", 7), 7);
        assert_eq!(info.get_alignment("align", Alignment::Left), Alignment::Left);
    }
}
