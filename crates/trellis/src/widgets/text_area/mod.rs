//! Rich text with a box-model layout engine.
//!
//! A [`TextArea`] shows the element tree of a [`TextAreaModel`]: paragraphs, text runs,
//! images, embedded widgets, lists, blocks, tables and links. Elements carry a [`Style`]
//! whose inherited attributes are looked up along the parent chain and, for styles with a
//! [`StyleSheetKey`], in a [`StyleSheetResolver`].
//!
//! The layout is rebuilt from scratch whenever the inner width changes or something the
//! layout depends on changes (model, style resolver, font mapper, theme). Changes are
//! never patched into an existing layout.
//!
//! # Example
//!
//! ```
//! use trellis::widgets::text_area::{attributes, HAlignment, SimpleTextAreaModel, Style, TextArea, Value};
//! use trellis::{Gui, GuiConfig};
//! use trellis_render::HeadlessRenderer;
//!
//! let style = Style::new()
//!     .with(&attributes::HORIZONTAL_ALIGNMENT, HAlignment::Center)
//!     .with(&attributes::MARGIN_BOTTOM, Value::Px(4.0));
//! assert_eq!(style.get(&attributes::HORIZONTAL_ALIGNMENT, None), HAlignment::Center);
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(300, 200)), GuiConfig::default());
//! let model = SimpleTextAreaModel::new().shared();
//! model.set_text(&mut gui, "hello world", false);
//!
//! let area = gui.create(TextArea::new(Some(model)));
//! let root = gui.root_pane();
//! gui.add(root, area);
//! gui.set_size(area, 300, 100);
//! gui.update();
//! let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
//! assert!(renderer.drawn_text().contains(&"hello world"));
//! ```

mod layout;
mod model;
mod style;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use cursor_icon::CursorIcon;
use trellis_core::AnimationState;
use trellis_core::logging::targets;
use trellis_render::{Font, Image, Rect};

pub use model::{
    Clear, Display, Element, ElementKind, FloatPosition, HAlignment, SimpleTextAreaModel, TableElement,
    TextAreaModel, TextDecoration, VAlignment,
};
pub use style::{
    AttributeType, OrderedListType, Style, StyleAttribute, StyleSheet, StyleSheetKey, StyleSheetResolver,
    StyleValue, Value, attributes,
};

use self::layout::{LId, Layouter, LayoutTree, ROOT, Resources};
use super::STATE_HOVER;
use crate::event::{Event, EventType};
use crate::gui::Gui;
use crate::signal::{ConnectionId, Signal};
use crate::theme::ThemeInfo;
use crate::widget::{Cx, TooltipContent, Widget, WidgetId, compute_size};

/// Creates widgets for widget elements that name no registered widget.
pub trait WidgetResolver {
    /// Return a new, unparented widget or `None`.
    ///
    /// The text area owns the returned widget and disposes it on the next relayout.
    fn resolve_widget(&mut self, gui: &mut Gui, name: &str, param: Option<&str>) -> Option<WidgetId>;
}

/// Supplies images that are neither registered nor found in the theme.
pub trait ImageResolver {
    fn resolve_image(&self, name: &str) -> Option<Rc<dyn Image>>;
}

/// Maps font attributes to a concrete font.
pub trait FontMapper {
    fn get_font(&self, families: &[String], size: i32, bold: bool, italic: bool) -> Option<Rc<dyn Font>>;
}

/// Receives mouse drags that start on the text area.
pub trait DragListener {
    fn drag_started(&mut self, cx: &mut Cx<'_>);

    /// The mouse moved by `(dx, dy)` since the button went down.
    fn dragged(&mut self, cx: &mut Cx<'_>, dx: i32, dy: i32);

    fn drag_stopped(&mut self, cx: &mut Cx<'_>);
}

/// A mouse button event over an element.
#[derive(Debug, Clone)]
pub struct ElementMouseEvent {
    pub event: Event,
    pub element: Rc<Element>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreferredSize {
    min_width: i32,
    max_width: i32,
    border: i32,
    width: i32,
    height: i32,
}

/// Shows a [`TextAreaModel`].
///
/// Widgets named by widget elements become children of the text area while they are laid
/// out. Do not add children directly; use [`register_widget`](Self::register_widget).
pub struct TextArea {
    initial_model: Option<Rc<dyn TextAreaModel>>,
    model: Option<Rc<dyn TextAreaModel>>,
    model_connection: Option<ConnectionId>,
    res: Resources,
    tree: LayoutTree,
    all_bg_images: Vec<LId>,
    force_relayout: bool,
    in_layout_code: bool,
    preferred_inner_size: Option<PreferredSize>,
    last_mouse_x: i32,
    last_mouse_y: i32,
    last_mouse_inside: bool,
    dragging: bool,
    drag_start_x: i32,
    drag_start_y: i32,
    drag_listener: Option<Box<dyn DragListener>>,
    cur_under_mouse: Option<LId>,
    as_normal: AnimationState,
    as_hover: AnimationState,
    cursor_link: Option<CursorIcon>,

    /// A link was clicked; carries the link target.
    pub link_clicked: Signal<String>,
    /// A mouse button went down, up or clicked over an element.
    pub mouse_button: Signal<ElementMouseEvent>,
}

impl Default for TextArea {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TextArea {
    pub fn new(model: Option<Rc<dyn TextAreaModel>>) -> Self {
        Self {
            initial_model: model,
            model: None,
            model_connection: None,
            res: Resources::default(),
            tree: LayoutTree::new(),
            all_bg_images: Vec::new(),
            force_relayout: true,
            in_layout_code: false,
            preferred_inner_size: None,
            last_mouse_x: 0,
            last_mouse_y: 0,
            last_mouse_inside: false,
            dragging: false,
            drag_start_x: 0,
            drag_start_y: 0,
            drag_listener: None,
            cur_under_mouse: None,
            as_normal: AnimationState::new(),
            as_hover: AnimationState::new(),
            cursor_link: Some(CursorIcon::Pointer),
            link_clicked: Signal::new(),
            mouse_button: Signal::new(),
        }
    }

    // =========================================================================
    // Model
    // =========================================================================

    pub fn model(&self) -> Option<&Rc<dyn TextAreaModel>> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, cx: &mut Cx<'_>, model: Option<Rc<dyn TextAreaModel>>) {
        self.disconnect_model();
        if let Some(model) = &model {
            let id = cx.id();
            let connection = model.changes().connect(move |gui: &mut Gui, _: &()| {
                gui.with_widget::<TextArea, _>(id, |area, cx| area.force_relayout(cx));
            });
            self.model_connection = Some(connection);
        }
        self.model = model;
        self.force_relayout(cx);
    }

    fn disconnect_model(&mut self) {
        if let (Some(model), Some(connection)) = (&self.model, self.model_connection.take()) {
            model.changes().disconnect(connection);
        }
    }

    /// Discard the layout; it is rebuilt on the next validation.
    pub fn force_relayout(&mut self, cx: &mut Cx<'_>) {
        self.force_relayout = true;
        self.preferred_inner_size = None;
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    // =========================================================================
    // Widgets, images and fonts
    // =========================================================================

    /// Make `widget` available to widget elements named `name`.
    ///
    /// # Panics
    ///
    /// Panics if `widget` has a parent or is already registered, or if `name` is taken.
    pub fn register_widget(&mut self, cx: &Cx<'_>, name: &str, widget: WidgetId) {
        assert!(cx.parent_of(widget).is_none(), "widget must not have a parent");
        assert!(
            !self.res.widgets.contains_key(name) && !self.res.widget_resolvers.contains_key(name),
            "widget name {name:?} already registered"
        );
        assert!(
            !self.res.widgets.values().any(|&w| w == widget),
            "widget {widget:?} already registered"
        );
        self.res.widgets.insert(name.to_owned(), widget);
    }

    /// # Panics
    ///
    /// Panics if `name` is taken.
    pub fn register_widget_resolver(&mut self, name: &str, resolver: Box<dyn WidgetResolver>) {
        assert!(
            !self.res.widgets.contains_key(name) && !self.res.widget_resolvers.contains_key(name),
            "widget name {name:?} already registered"
        );
        self.res.widget_resolvers.insert(name.to_owned(), resolver);
    }

    pub fn unregister_widget_resolver(&mut self, name: &str) {
        self.res.widget_resolvers.remove(name);
    }

    /// Forget a registered widget. It is removed from the text area if it was shown.
    pub fn unregister_widget(&mut self, cx: &mut Cx<'_>, name: &str) -> Option<WidgetId> {
        let widget = self.res.widgets.remove(name)?;
        let id = cx.id();
        if cx.contains(widget) && cx.parent_of(widget) == Some(id) {
            cx.remove_child(id, widget);
            self.force_relayout(cx);
        }
        Some(widget)
    }

    pub fn unregister_all_widgets(&mut self, cx: &mut Cx<'_>) {
        self.res.widgets.clear();
        self.clear_widgets(cx);
        self.force_relayout(cx);
    }

    pub fn register_image(&mut self, name: &str, image: Rc<dyn Image>) {
        self.res.user_images.insert(name.to_owned(), image);
    }

    pub fn unregister_image(&mut self, name: &str) {
        self.res.user_images.remove(name);
    }

    pub fn register_image_resolver(&mut self, resolver: Rc<dyn ImageResolver>) {
        if !self.res.image_resolvers.iter().any(|r| Rc::ptr_eq(r, &resolver)) {
            self.res.image_resolvers.push(resolver);
        }
    }

    pub fn unregister_image_resolver(&mut self, resolver: &Rc<dyn ImageResolver>) {
        self.res.image_resolvers.retain(|r| !Rc::ptr_eq(r, resolver));
    }

    pub fn font_mapper(&self) -> Option<&Rc<dyn FontMapper>> {
        self.res.font_mapper.as_ref()
    }

    pub fn set_font_mapper(&mut self, cx: &mut Cx<'_>, mapper: Option<Rc<dyn FontMapper>>) {
        self.res.font_mapper = mapper;
        self.force_relayout(cx);
    }

    pub fn style_class_resolver(&self) -> Option<&Rc<dyn StyleSheetResolver>> {
        self.res.style_resolver.as_ref()
    }

    pub fn set_style_class_resolver(&mut self, cx: &mut Cx<'_>, resolver: Option<Rc<dyn StyleSheetResolver>>) {
        self.res.style_resolver = resolver;
        self.force_relayout(cx);
    }

    /// Use [`StyleSheet::default_sheet`]: paragraphs and lists get a bottom margin.
    pub fn set_default_style_sheet(&mut self, cx: &mut Cx<'_>) {
        self.set_style_class_resolver(cx, Some(Rc::new(StyleSheet::default_sheet())));
    }

    pub fn set_drag_listener(&mut self, listener: Option<Box<dyn DragListener>>) {
        self.drag_listener = listener;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Bounds of the first box laid out for `element`, relative to the inner area.
    pub fn element_rect(&self, element: &Rc<Element>) -> Option<Rect> {
        let (id, dx, dy) = self.tree.find_element(ROOT, element)?;
        Some(self.tree.node(id).rect().offset(dx, dy))
    }

    /// The element under the mouse, as of the last mouse event.
    pub fn element_under_mouse(&self) -> Option<&Rc<Element>> {
        self.tree.node(self.cur_under_mouse?).element.as_ref()
    }

    /// Height of the laid out content.
    pub fn content_height(&self) -> i32 {
        self.tree.root().height
    }

    fn hovered_href(&self) -> Option<&str> {
        self.cur_under_mouse
            .and_then(|id| self.tree.node(id).href.as_deref())
    }

    // =========================================================================
    // Layout
    // =========================================================================

    fn clear_widgets(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        cx.remove_all_children(id);
        for widget in self.res.resolved_widgets.drain(..) {
            if cx.contains(widget) {
                cx.dispose(widget);
            }
        }
    }

    fn clear_layout(&mut self, cx: &mut Cx<'_>) {
        self.tree.clear();
        self.all_bg_images.clear();
        self.cur_under_mouse = None;
        self.clear_widgets(cx);
    }

    fn compute_preferred_inner_size(&mut self, cx: &mut Cx<'_>) -> PreferredSize {
        let (min_width, max_width, border) = {
            let base = cx.base();
            (base.min_width(), base.max_width(), base.border().horizontal())
        };
        if let Some(size) = self.preferred_inner_size
            && (size.min_width, size.max_width, size.border) == (min_width, max_width, border)
        {
            return size;
        }
        let mut size = PreferredSize {
            min_width,
            max_width,
            border,
            width: -1,
            height: -1,
        };
        match self.model.as_ref().map(|model| model.elements()) {
            None => {
                size.width = 0;
                size.height = 0;
            }
            Some(elements) if max_width > 0 => {
                let max_inner = (max_width - border).max(0);
                let min_inner = (min_width - border).max(0);
                if min_inner < max_inner {
                    let mut scratch = LayoutTree::new();
                    scratch.root_mut().width = max_inner;
                    let id = cx.id();
                    let mut layouter = Layouter::new(cx, id, &mut self.res, &mut scratch);
                    let mut b = layouter.new_box(ROOT, true);
                    layouter.layout_elements(&mut b, &elements);
                    layouter.finish(&mut b);
                    size.width = (max_inner - b.min_remaining_width).max(0);
                    size.height = b.cur_y;
                }
            }
            Some(_) => {}
        }
        self.preferred_inner_size = Some(size);
        size
    }

    fn update_mouse_hover_from(&mut self, cx: &mut Cx<'_>, evt: &Event) {
        self.last_mouse_inside = self.is_mouse_inside(cx, evt);
        self.last_mouse_x = evt.mouse_x();
        self.last_mouse_y = evt.mouse_y();
        self.update_mouse_hover(cx);
    }

    fn update_mouse_hover(&mut self, cx: &mut Cx<'_>) {
        let under = if self.last_mouse_inside {
            let base = cx.base();
            Some(self.tree.find(
                ROOT,
                self.last_mouse_x - base.inner_x(),
                self.last_mouse_y - base.inner_y(),
            ))
        } else {
            None
        };
        if self.cur_under_mouse != under {
            self.cur_under_mouse = under;
            self.tree.set_hover(ROOT, under);
            self.as_normal.reset_animation_time(STATE_HOVER);
            self.as_hover.reset_animation_time(STATE_HOVER);
            let id = cx.id();
            cx.update_tooltip(id);
        }
        cx.base().set_animation_state(STATE_HOVER, self.last_mouse_inside);
    }
}

impl Drop for TextArea {
    fn drop(&mut self) {
        self.disconnect_model();
    }
}

impl Widget for TextArea {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let anim = Rc::clone(cx.base().animation_state());
        self.as_normal = AnimationState::with_parent(Rc::clone(&anim));
        self.as_normal.set(STATE_HOVER, false);
        self.as_hover = AnimationState::with_parent(anim);
        self.as_hover.set(STATE_HOVER, true);
        let model = self.initial_model.take();
        self.set_model(cx, model);
    }

    fn destroy(&mut self, _cx: &mut Cx<'_>) {
        self.tree.clear();
        self.all_bg_images.clear();
        self.cur_under_mouse = None;
        self.force_relayout = true;
    }

    fn after_add_to_gui(&mut self, cx: &mut Cx<'_>) {
        let clock = cx.animation_clock().clone();
        self.as_normal.set_clock(Some(clock.clone()));
        self.as_hover.set_clock(Some(clock));
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        self.res.theme_fonts = theme.child_theme("fonts");
        self.res.theme_images = theme.child_theme("images");
        self.res.default_font = theme.get_font("font");
        self.cursor_link = theme
            .get_mouse_cursor("mouseCursor.link")
            .or(Some(CursorIcon::Pointer));
        self.force_relayout(cx);
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let (inner_x, inner_y, target_width, inner_height) = {
            let base = cx.base();
            (base.inner_x(), base.inner_y(), base.inner_width(), base.inner_height())
        };
        if self.tree.root().width == target_width && !self.force_relayout {
            return;
        }
        let _span = tracing::debug_span!(target: targets::TEXT, "trellis::text_layout", width = target_width).entered();
        self.in_layout_code = true;
        self.force_relayout = false;
        self.clear_layout(cx);
        self.tree.root_mut().width = target_width;

        let id = cx.id();
        let elements = self.model.as_ref().map(|model| model.elements());
        let required_height = {
            let mut layouter = Layouter::new(cx, id, &mut self.res, &mut self.tree);
            let mut b = layouter.new_box(ROOT, false);
            if let Some(elements) = &elements {
                layouter.layout_elements(&mut b, elements);
                layouter.finish(&mut b);
            }
            b.cur_y
        };
        if elements.is_some() {
            let mut rects = Vec::new();
            self.tree.widget_rects(ROOT, inner_x, inner_y, &mut rects);
            for (widget, rect) in rects {
                cx.set_position(widget, rect.x, rect.y);
                cx.set_size(widget, rect.width, rect.height);
            }
            self.tree.collect_bg_images(ROOT, 0, 0, &mut self.all_bg_images);
        }
        self.update_mouse_hover(cx);
        self.in_layout_code = false;
        tracing::debug!(
            target: targets::TEXT,
            nodes = self.tree.len(),
            height = required_height,
            "text laid out"
        );

        if self.tree.root().height != required_height {
            self.tree.root_mut().height = required_height;
            if inner_height != required_height {
                cx.invalidate_layout(id);
            }
        }
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let (x, y) = {
            let base = cx.base();
            (base.inner_x(), base.inner_y())
        };
        let states = (&self.as_normal, &self.as_hover);
        let renderer = cx.renderer_mut();
        for &image in &self.all_bg_images {
            self.tree.draw(renderer, image, x, y, states);
        }
        self.tree.draw(renderer, ROOT, x, y, states);
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt) {
            return true;
        }
        if !evt.is_mouse_event() {
            return false;
        }
        let event_type = evt.event_type();
        if self.dragging {
            if event_type == EventType::MouseDragged
                && let Some(listener) = self.drag_listener.as_mut()
            {
                listener.dragged(
                    cx,
                    evt.mouse_x() - self.drag_start_x,
                    evt.mouse_y() - self.drag_start_y,
                );
            }
            if evt.is_mouse_drag_end() {
                if let Some(listener) = self.drag_listener.as_mut() {
                    listener.drag_stopped(cx);
                }
                self.dragging = false;
                self.update_mouse_hover_from(cx, evt);
            }
            return true;
        }
        self.update_mouse_hover_from(cx, evt);
        match event_type {
            EventType::MouseWheel => return false,
            EventType::MouseBtnDown => {
                self.drag_start_x = evt.mouse_x();
                self.drag_start_y = evt.mouse_y();
            }
            EventType::MouseDragged => {
                self.dragging = true;
                if let Some(listener) = self.drag_listener.as_mut() {
                    listener.drag_started(cx);
                }
                return true;
            }
            _ => {}
        }
        if matches!(
            event_type,
            EventType::MouseClicked | EventType::MouseBtnDown | EventType::MouseBtnUp
        ) && let Some(element) = self.element_under_mouse().cloned()
        {
            self.mouse_button.emit(cx, ElementMouseEvent { event: *evt, element });
        }
        if event_type == EventType::MouseClicked
            && let Some(href) = self.hovered_href()
        {
            tracing::debug!(target: targets::TEXT, href, "link clicked");
            let href = href.to_owned();
            self.link_clicked.emit(cx, href);
        }
        true
    }

    fn mouse_cursor(&mut self, cx: &mut Cx<'_>, _evt: &Event) -> Option<CursorIcon> {
        if self.hovered_href().is_some() {
            return self.cursor_link;
        }
        cx.base().mouse_cursor()
    }

    fn tooltip_content_at(&mut self, cx: &mut Cx<'_>, _x: i32, _y: i32) -> Option<TooltipContent> {
        if let Some(element) = self.element_under_mouse()
            && let ElementKind::Image { tooltip: Some(tooltip), .. } = element.kind()
        {
            return Some(TooltipContent::Text(tooltip.clone()));
        }
        let base = cx.base();
        base.tooltip_content()
            .cloned()
            .or_else(|| base.theme_tooltip_content().map(|t| TooltipContent::Text(t.to_owned())))
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let size = self.compute_preferred_inner_size(cx);
        if size.width >= 0 {
            size.width
        } else {
            cx.base().inner_width()
        }
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        if cx.base().inner_width() == 0 {
            let size = self.compute_preferred_inner_size(cx);
            if size.height >= 0 {
                return size.height;
            }
        }
        self.layout(cx);
        self.tree.root().height
    }

    fn preferred_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let inner = self.preferred_inner_width(cx);
        let preferred = cx.outer_preferred_width(inner);
        let base = cx.base();
        compute_size(base.min_width(), preferred, base.max_width())
    }

    fn size_changed(&mut self, cx: &mut Cx<'_>) {
        if !self.in_layout_code {
            let id = cx.id();
            cx.invalidate_layout(id);
        }
    }

    fn child_added(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn child_removed(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn all_children_removed(&mut self, _cx: &mut Cx<'_>) {}
}
