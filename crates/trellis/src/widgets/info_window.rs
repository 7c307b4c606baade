//! Info windows: non-modal windows shown above everything else, e.g. validation errors.

use crate::gui::Gui;
use crate::signal::Signal;
use crate::widget::{Cx, Widget, WidgetId, WindowRole};

/// A window shown in the GUI's info slot on behalf of an owner widget.
///
/// Only one info window is shown at a time. Unlike popups it does not take input away
/// from the rest of the tree.
pub struct InfoWindow {
    owner: WidgetId,
    /// Emitted after the window was closed by the GUI or by [`InfoWindow::close_info`].
    pub closed: Signal<()>,
}

impl InfoWindow {
    pub fn new(owner: WidgetId) -> Self {
        Self {
            owner,
            closed: Signal::new(),
        }
    }

    pub fn owner(&self) -> WidgetId {
        self.owner
    }

    pub fn is_open(gui: &Gui, info: WidgetId) -> bool {
        gui.parent_of(info).is_some()
    }

    /// Show the info window.
    ///
    /// Returns `true` if it is open afterwards. Opening fails when the owner is itself
    /// inside an info window or is not part of a GUI tree.
    pub fn open_info(gui: &mut Gui, info: WidgetId) -> bool {
        if Self::is_open(gui, info) {
            return true;
        }
        let Some(owner) = gui.window_owner(info) else {
            return false;
        };
        if Self::inside_info_window(gui, owner) || !gui.is_attached(owner) {
            return false;
        }
        gui.open_info(info);
        gui.focus_first_child(info);
        true
    }

    pub fn close_info(gui: &mut Gui, info: WidgetId) {
        gui.close_info(info);
    }

    fn inside_info_window(gui: &Gui, widget: WidgetId) -> bool {
        let mut current = Some(widget);
        while let Some(id) = current {
            if matches!(gui.node(id).window, WindowRole::Info { .. }) {
                return true;
            }
            current = gui.parent_of(id);
        }
        false
    }
}

impl Widget for InfoWindow {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let owner = self.owner;
        cx.set_info_owner(id, owner);
    }

    fn info_window_closed(&mut self, cx: &mut Cx<'_>) {
        self.closed.emit(cx, ());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;
    use crate::widget::Container;

    fn gui_with_owner() -> (Gui, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(100, 100)), GuiConfig::default());
        let owner = gui.create(Container);
        let root = gui.root_pane();
        gui.add(root, owner);
        (gui, owner)
    }

    #[test]
    fn test_open_and_close_emits_closed() {
        let (mut gui, owner) = gui_with_owner();
        let info = gui.create(InfoWindow::new(owner));
        let closed = Rc::new(Cell::new(0));
        let counter = Rc::clone(&closed);
        gui.widget::<InfoWindow>(info)
            .unwrap()
            .closed
            .connect(move |_gui, _| counter.set(counter.get() + 1));

        assert!(InfoWindow::open_info(&mut gui, info));
        assert_eq!(gui.active_info_window(), Some(info));
        InfoWindow::close_info(&mut gui, info);
        assert_eq!(gui.active_info_window(), None);
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_nested_info_window_is_refused() {
        let (mut gui, owner) = gui_with_owner();
        let outer = gui.create(InfoWindow::new(owner));
        let inner_owner = gui.create(Container);
        gui.add(outer, inner_owner);
        assert!(InfoWindow::open_info(&mut gui, outer));

        let inner = gui.create(InfoWindow::new(inner_owner));
        assert!(!InfoWindow::open_info(&mut gui, inner));
        assert_eq!(gui.active_info_window(), Some(outer));
    }

    #[test]
    fn test_hiding_owner_closes_info() {
        let (mut gui, owner) = gui_with_owner();
        let info = gui.create(InfoWindow::new(owner));
        InfoWindow::open_info(&mut gui, info);
        gui.set_visible(owner, false);
        assert!(!InfoWindow::is_open(&gui, info));
    }
}
