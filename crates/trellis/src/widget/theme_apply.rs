//! Theme names, theme paths and theme application.
//!
//! A widget's theme path is its parent's path joined with its own theme name by `.`.
//! A theme starting with `/` is absolute and ignores the parent. An empty theme name
//! makes the widget transparent to theming: its children resolve against the parent.

use std::rc::Rc;

use trellis_core::logging::targets;
use trellis_render::Border;

use super::{MAX_SIZE, WidgetId};
use crate::gui::Gui;
use crate::theme::{ThemeInfo, ThemeManager};

/// Whether `theme` is an absolute theme path (`"/dialog.button"`).
pub fn is_absolute_theme(theme: &str) -> bool {
    theme.len() > 1 && theme.starts_with('/')
}

fn validate_theme_name(theme: &str) {
    if theme.is_empty() {
        return;
    }
    match theme.rfind('/') {
        Some(index) if index > 0 => {
            panic!("'/' is only allowed as first character in theme name: {theme:?}")
        }
        Some(_) => assert!(theme.len() > 1, "'/' requires a theme path"),
        None => assert!(
            !theme.contains('.'),
            "'.' is only allowed for absolute theme paths: {theme:?}"
        ),
    }
    if let Some(ch) = theme.chars().find(|&ch| ch.is_control() || ch == '*') {
        panic!("invalid character {ch:?} in theme name {theme:?}");
    }
}

impl Gui {
    /// Set a widget's theme name. Takes effect on the next theme application.
    ///
    /// # Panics
    ///
    /// Panics if `theme` contains `/` anywhere but as its first character, a `.` in a
    /// relative name, a control character or `*`, or is `"/"` alone.
    pub fn set_theme(&mut self, id: WidgetId, theme: &str) {
        validate_theme_name(theme);
        self.node_mut(id).base.theme = theme.to_owned();
    }

    /// The dotted theme path used to look the widget up in a [`ThemeManager`].
    pub fn theme_path(&self, id: WidgetId) -> String {
        let theme = self.node(id).base.theme();
        if let Some(absolute) = theme.strip_prefix('/').filter(|_| is_absolute_theme(theme)) {
            return absolute.to_owned();
        }
        let mut path = match self.node(id).parent {
            Some(parent) => self.theme_path(parent),
            None => String::new(),
        };
        if !theme.is_empty() && !path.is_empty() {
            path.push('.');
        }
        path.push_str(theme);
        path
    }

    /// Apply the last theme manager again.
    pub fn reapply_theme(&mut self, id: WidgetId) {
        if let Some(manager) = self.node(id).theme_manager.clone() {
            self.apply_theme_manager(id, manager);
        }
    }

    /// Resolve `id`'s theme path with `manager` and apply it to the subtree.
    pub(crate) fn apply_theme_manager(&mut self, id: WidgetId, manager: Rc<dyn ThemeManager>) {
        self.node_mut(id).theme_manager = Some(Rc::clone(&manager));
        let path = self.theme_path(id);
        if path.is_empty() {
            let children = self.node(id).children.clone();
            for child in children {
                self.apply_theme_manager(child, Rc::clone(&manager));
            }
            return;
        }
        let info = manager.find_theme_info(&path);
        match &info {
            Some(info) if !self.node(id).base.theme.is_empty() => {
                self.apply_theme_info(id, info.as_ref());
            }
            Some(_) => {}
            None => tracing::debug!(target: targets::THEME, %path, "theme not found"),
        }
        self.apply_theme_to_children(id, &manager, info);
    }

    fn apply_theme_relative(
        &mut self,
        id: WidgetId,
        manager: &Rc<dyn ThemeManager>,
        parent_info: Rc<dyn ThemeInfo>,
    ) {
        self.node_mut(id).theme_manager = Some(Rc::clone(manager));
        let theme = self.node(id).base.theme.clone();
        let mut info = Some(parent_info);
        if !theme.is_empty() {
            info = if is_absolute_theme(&theme) {
                manager.find_theme_info(&theme[1..])
            } else {
                info.and_then(|parent| parent.child_theme(&theme))
            };
            match &info {
                Some(info) => self.apply_theme_info(id, info.as_ref()),
                None => tracing::debug!(target: targets::THEME, %theme, "child theme not found"),
            }
        }
        self.apply_theme_to_children(id, manager, info);
    }

    fn apply_theme_to_children(
        &mut self,
        id: WidgetId,
        manager: &Rc<dyn ThemeManager>,
        info: Option<Rc<dyn ThemeInfo>>,
    ) {
        let Some(info) = info else {
            return;
        };
        let children = self.node(id).children.clone();
        for child in children {
            self.apply_theme_relative(child, manager, Rc::clone(&info));
        }
    }

    fn apply_theme_info(&mut self, id: WidgetId, info: &dyn ThemeInfo) {
        self.with_behavior_guarded("apply_theme", id, |w, cx| w.apply_theme(cx, info));
    }

    /// Read the parameters every widget understands.
    pub(crate) fn apply_common_theme(&mut self, id: WidgetId, theme: &dyn ThemeInfo) {
        let base = self.base_of_mut(id);
        base.set_background(theme.get_image("background"));
        base.set_overlay(theme.get_image("overlay"));
        base.set_font(theme.get_font("font"));
        base.set_mouse_cursor(theme.get_mouse_cursor("mouseCursor"));
        base.set_input_map(theme.get_input_map("inputMap"));
        base.theme_tooltip = theme.get_string("tooltip");
        let has_own_tooltip = base.tooltip.is_some();

        self.set_border_size(id, theme.get_border("border").unwrap_or(Border::ZERO));
        self.set_min_size(
            id,
            theme.get_int("minWidth", 0).max(0),
            theme.get_int("minHeight", 0).max(0),
        );
        self.set_max_size(
            id,
            theme.get_int("maxWidth", MAX_SIZE).max(0),
            theme.get_int("maxHeight", MAX_SIZE).max(0),
        );
        if !has_own_tooltip {
            self.update_tooltip(id);
        }
        self.invalidate_layout(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_theme_names() {
        validate_theme_name("");
        validate_theme_name("button");
        validate_theme_name("/dialog.button");
        assert!(is_absolute_theme("/dialog"));
        assert!(!is_absolute_theme("/"));
        assert!(!is_absolute_theme("dialog"));
    }

    #[test]
    #[should_panic(expected = "only allowed as first character")]
    fn test_slash_inside_name_panics() {
        validate_theme_name("dialog/button");
    }

    #[test]
    #[should_panic(expected = "only allowed for absolute theme paths")]
    fn test_dot_in_relative_name_panics() {
        validate_theme_name("dialog.button");
    }

    #[test]
    #[should_panic(expected = "requires a theme path")]
    fn test_lone_slash_panics() {
        validate_theme_name("/");
    }

    #[test]
    #[should_panic(expected = "invalid character")]
    fn test_wildcard_panics() {
        validate_theme_name("but*ton");
    }
}
