//! Popup windows.
//!
//! A popup is a top-level window stacked above the root pane. While it is open it is the
//! top pane and receives all input. Every popup has an owner; hiding or disabling the
//! owner closes the popup.
//!
//! # Example
//!
//! ```
//! use trellis::widgets::PopupWindow;
//! use trellis::{Container, Gui, GuiConfig};
//! use trellis_render::HeadlessRenderer;
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 200)), GuiConfig::default());
//! let owner = gui.create(Container);
//! let root = gui.root_pane();
//! gui.add(root, owner);
//!
//! let popup = gui.create(PopupWindow::new(owner));
//! assert!(PopupWindow::open_popup(&mut gui, popup));
//! assert_eq!(gui.top_pane(), popup);
//!
//! PopupWindow::close_popup(&mut gui, popup);
//! assert!(!PopupWindow::is_open(&gui, popup));
//! ```

use std::rc::Rc;

use trellis_render::Rect;

use crate::event::{Event, EventType, Key};
use crate::gui::Gui;
use crate::widget::{Cx, MAX_SIZE, Widget, WidgetId};

/// Called instead of closing when the popup asks to be closed.
pub type RequestCloseCallback = Rc<dyn Fn(&mut Gui, WidgetId)>;

/// A top-level window owned by another widget.
pub struct PopupWindow {
    owner: WidgetId,
    close_on_clicked_outside: bool,
    close_on_escape: bool,
    request_close: Option<RequestCloseCallback>,
}

impl PopupWindow {
    /// Create a popup owned by `owner`.
    pub fn new(owner: WidgetId) -> Self {
        Self {
            owner,
            close_on_clicked_outside: true,
            close_on_escape: true,
            request_close: None,
        }
    }

    pub fn owner(&self) -> WidgetId {
        self.owner
    }

    pub fn is_close_on_clicked_outside(&self) -> bool {
        self.close_on_clicked_outside
    }

    pub fn set_close_on_clicked_outside(&mut self, close: bool) {
        self.close_on_clicked_outside = close;
    }

    pub fn is_close_on_escape(&self) -> bool {
        self.close_on_escape
    }

    pub fn set_close_on_escape(&mut self, close: bool) {
        self.close_on_escape = close;
    }

    /// Replace the default close action for clicks outside and ESCAPE.
    pub fn set_request_close_callback(&mut self, callback: Option<RequestCloseCallback>) {
        self.request_close = callback;
    }

    // =========================================================================
    // Window operations
    // =========================================================================

    /// Open the popup, give it keyboard focus and focus its first child.
    ///
    /// Fails while the owner is not part of a GUI tree.
    pub fn open_popup(gui: &mut Gui, popup: WidgetId) -> bool {
        let Some(owner) = gui.window_owner(popup) else {
            return false;
        };
        if !gui.is_attached(owner) {
            return false;
        }
        gui.set_visible(popup, true);
        gui.set_enabled(popup, true);
        gui.open_popup(popup);
        gui.request_keyboard_focus(popup);
        gui.focus_first_child(popup);
        Self::is_open(gui, popup)
    }

    /// Open the popup at its preferred size, centered in the GUI.
    pub fn open_popup_centered(gui: &mut Gui, popup: WidgetId) {
        if Self::open_popup(gui, popup) {
            gui.adjust_size(popup);
            Self::center_popup(gui, popup);
        }
    }

    /// Open the popup with the given size, capped by the GUI size, and center it.
    pub fn open_popup_centered_with_size(gui: &mut Gui, popup: WidgetId, width: i32, height: i32) {
        if Self::open_popup(gui, popup)
            && let Some(parent) = gui.parent_of(popup)
        {
            let area = gui.base_of(parent).inner_rect();
            gui.set_size(popup, width.min(area.width), height.min(area.height));
            Self::center_popup(gui, popup);
        }
    }

    /// Close the popup and give keyboard focus back to its owner.
    pub fn close_popup(gui: &mut Gui, popup: WidgetId) {
        if !Self::is_open(gui, popup) {
            return;
        }
        gui.close_popup(popup);
        if let Some(owner) = gui.window_owner(popup)
            && gui.contains(owner)
        {
            gui.request_keyboard_focus(owner);
        }
    }

    pub fn is_open(gui: &Gui, popup: WidgetId) -> bool {
        gui.parent_of(popup).is_some()
    }

    /// Center an open popup inside the GUI.
    pub fn center_popup(gui: &mut Gui, popup: WidgetId) {
        let Some(parent) = gui.parent_of(popup) else {
            return;
        };
        let Rect { x, y, width, height } = gui.base_of(parent).inner_rect();
        let (w, h) = {
            let base = gui.base_of(popup);
            (base.width(), base.height())
        };
        gui.set_position(popup, x + (width - w) / 2, y + (height - h) / 2);
    }

    /// Route every mouse move to the popup until the current drag ends.
    ///
    /// `on_finished` runs when the button is released. Only works while the popup is
    /// the top pane and a drag that started outside of it is in progress.
    pub fn bind_mouse_drag(
        gui: &mut Gui,
        popup: WidgetId,
        on_finished: Option<Box<dyn FnOnce(&mut Gui)>>,
    ) -> bool {
        if !gui.is_attached(popup) {
            return false;
        }
        gui.bind_drag_event(popup, on_finished)
    }

    fn request_popup_close(&self, cx: &mut Cx<'_>) {
        let id = cx.id();
        match self.request_close.clone() {
            Some(callback) => {
                let gui: &mut Gui = cx;
                callback(gui, id);
            }
            None => Self::close_popup(cx, id),
        }
    }

    fn capped_by_parent(cx: &Cx<'_>, size: i32, pick: fn(&Rect) -> i32) -> i32 {
        let limit = cx
            .parent()
            .map_or(MAX_SIZE, |parent| pick(&cx.base_of(parent).inner_rect()));
        size.min(limit)
    }
}

impl Widget for PopupWindow {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let owner = self.owner;
        cx.set_popup_owner(id, owner);
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt) {
            return true;
        }
        if evt.event_type() == EventType::MouseClicked
            && !cx.base().is_inside(evt.mouse_x(), evt.mouse_y())
        {
            if self.close_on_clicked_outside {
                self.request_popup_close(cx);
            }
            return true;
        }
        if evt.is_key_pressed_event() && evt.key_code() == Key::Escape {
            if self.close_on_escape {
                self.request_popup_close(cx);
            }
            return true;
        }
        // A popup is modal: nothing behind it sees the event.
        true
    }

    fn is_mouse_inside(&mut self, _cx: &mut Cx<'_>, _evt: &Event) -> bool {
        true
    }

    fn preferred_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let inner = cx.default_preferred_inner_width();
        let width = cx.outer_preferred_width(inner);
        Self::capped_by_parent(cx, width, |r| r.width)
    }

    fn preferred_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let inner = cx.default_preferred_inner_height();
        let height = cx.outer_preferred_height(inner);
        Self::capped_by_parent(cx, height, |r| r.height)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;
    use crate::widget::Container;

    fn setup() -> (Gui, WidgetId, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 100)), GuiConfig::default());
        gui.update();
        let owner = gui.create(Container);
        let root = gui.root_pane();
        gui.add(root, owner);
        let popup = gui.create(PopupWindow::new(owner));
        (gui, owner, popup)
    }

    #[test]
    fn test_open_marks_owner_and_close_restores() {
        let (mut gui, owner, popup) = setup();
        assert!(PopupWindow::open_popup(&mut gui, popup));
        assert!(gui.base_of(owner).has_open_popup());
        assert!(gui.has_open_popups(owner));

        PopupWindow::close_popup(&mut gui, popup);
        assert!(!gui.base_of(owner).has_open_popup());
        assert_eq!(gui.top_pane(), gui.root_pane());
    }

    #[test]
    fn test_open_fails_for_detached_owner() {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(50, 50)), GuiConfig::default());
        let owner = gui.create(Container);
        let popup = gui.create(PopupWindow::new(owner));
        assert!(!PopupWindow::open_popup(&mut gui, popup));
    }

    #[test]
    fn test_centered_with_size_is_capped() {
        let (mut gui, _owner, popup) = setup();
        PopupWindow::open_popup_centered_with_size(&mut gui, popup, 500, 40);
        let base = gui.base_of(popup);
        assert_eq!((base.width(), base.height()), (200, 40));
        assert_eq!((base.x(), base.y()), (0, 30));
    }

    #[test]
    fn test_escape_uses_request_close_callback() {
        let (mut gui, _owner, popup) = setup();
        let requested = Rc::new(Cell::new(false));
        let flag = Rc::clone(&requested);
        gui.widget_mut::<PopupWindow>(popup)
            .unwrap()
            .set_request_close_callback(Some(Rc::new(move |_gui, _id| flag.set(true))));
        PopupWindow::open_popup(&mut gui, popup);

        let evt = Event::key(EventType::KeyPressed, Key::Escape, None);
        assert!(gui.handle_event(popup, &evt));
        assert!(requested.get());
        assert!(PopupWindow::is_open(&gui, popup));
    }

    #[test]
    fn test_click_outside_closes() {
        let (mut gui, _owner, popup) = setup();
        PopupWindow::open_popup_centered_with_size(&mut gui, popup, 20, 20);
        let evt = Event::mouse(EventType::MouseClicked, 2, 2);
        assert!(gui.handle_event(popup, &evt));
        assert!(!PopupWindow::is_open(&gui, popup));
    }
}
