//! The box-model layout engine.
//!
//! A layout pass walks the element tree and appends positioned nodes to a
//! [`LayoutTree`]. Clip nodes own the nodes laid out inside them; every other node is
//! positioned relative to its clip. Text is split into runs that each fit one line.
//!
//! Each clip also records a line table: one `(bottom, count)` pair per line, where
//! `count` nodes of the clip's layout belong to the line and `bottom` is zero for nodes
//! outside the line flow (floats). Hit testing walks this table instead of every node.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use trellis_core::AnimationState;
use trellis_core::logging::targets;
use trellis_render::{Color, Font, Image, Rect, Renderer};

use super::model::{
    Clear, Display, Element, ElementKind, FloatPosition, HAlignment, TableElement, TextDecoration,
    VAlignment,
};
use super::style::{AttributeType, Style, StyleAttribute, StyleSheetResolver, Value, attributes as attr};
use super::{FontMapper, ImageResolver, WidgetResolver};
use crate::gui::Gui;
use crate::theme::ThemeInfo;
use crate::widget::{WidgetId, compute_size};

pub(crate) type LId = usize;

/// The root clip of every tree.
pub(crate) const ROOT: LId = 0;

const DEFAULT_FONT_SIZE: i32 = 14;

/// Height of a list label while its item is laid out, so the label keeps floating.
const LIST_LABEL_HEIGHT: i32 = i16::MAX as i32;

/// Resources elements refer to by name.
#[derive(Default)]
pub(crate) struct Resources {
    pub(crate) widgets: HashMap<String, WidgetId>,
    pub(crate) widget_resolvers: HashMap<String, Box<dyn WidgetResolver>>,
    pub(crate) user_images: HashMap<String, Rc<dyn Image>>,
    pub(crate) image_resolvers: Vec<Rc<dyn ImageResolver>>,
    pub(crate) theme_fonts: Option<Rc<dyn ThemeInfo>>,
    pub(crate) theme_images: Option<Rc<dyn ThemeInfo>>,
    pub(crate) default_font: Option<Rc<dyn Font>>,
    pub(crate) font_mapper: Option<Rc<dyn FontMapper>>,
    pub(crate) style_resolver: Option<Rc<dyn StyleSheetResolver>>,
    /// Widgets created by resolvers during the current layout; disposed on relayout.
    pub(crate) resolved_widgets: Vec<WidgetId>,
}

/// Font and colors of a text run.
pub(crate) struct FontData {
    font: Rc<dyn Font>,
    color: Color,
    color_hover: Color,
    decoration: TextDecoration,
    decoration_hover: TextDecoration,
}

impl FontData {
    fn color(&self, hover: bool) -> Color {
        if hover { self.color_hover } else { self.color }
    }

    fn decoration(&self, hover: bool) -> TextDecoration {
        if hover {
            self.decoration_hover
        } else {
            self.decoration
        }
    }
}

pub(crate) enum ImagePaint {
    Image(Rc<dyn Image>),
    Color { color: Color, hover: Option<Color> },
}

#[derive(Default)]
pub(crate) struct ClipContent {
    pub(crate) layout: Vec<LId>,
    pub(crate) bg_images: Vec<LId>,
    pub(crate) anchors: Vec<LId>,
    pub(crate) line_info: Vec<i32>,
}

pub(crate) enum LKind {
    /// Marks the area of a container element; not drawn.
    Anchor,
    Text { text: String, font: Rc<FontData> },
    Image { paint: ImagePaint, hover_src: Option<LId> },
    Widget(WidgetId),
    Clip(ClipContent),
}

pub(crate) struct LNode {
    pub(crate) element: Option<Rc<Element>>,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) margin_top: i32,
    pub(crate) margin_left: i32,
    pub(crate) margin_right: i32,
    pub(crate) margin_bottom: i32,
    pub(crate) href: Option<Rc<str>>,
    pub(crate) is_hover: bool,
    pub(crate) inherit_hover: bool,
    pub(crate) kind: LKind,
}

impl LNode {
    fn new(element: Option<Rc<Element>>, kind: LKind) -> Self {
        Self {
            element,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            margin_top: 0,
            margin_left: 0,
            margin_right: 0,
            margin_bottom: 0,
            href: None,
            is_hover: false,
            inherit_hover: false,
            kind,
        }
    }

    fn clip(element: Option<Rc<Element>>) -> Self {
        Self::new(element, LKind::Clip(ClipContent::default()))
    }

    fn sized(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub(crate) fn bottom(&self) -> i32 {
        self.y + self.height + self.margin_bottom
    }

    fn is_inside(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub(crate) fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

fn same_element(a: &LNode, b: &LNode) -> bool {
    match (&a.element, &b.element) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Arena of layout nodes; index [`ROOT`] is the root clip.
pub(crate) struct LayoutTree {
    nodes: Vec<LNode>,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![LNode::clip(None)],
        }
    }

    fn push(&mut self, node: LNode) -> LId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub(crate) fn node(&self, id: LId) -> &LNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: LId) -> &mut LNode {
        &mut self.nodes[id]
    }

    pub(crate) fn root(&self) -> &LNode {
        &self.nodes[ROOT]
    }

    pub(crate) fn root_mut(&mut self) -> &mut LNode {
        &mut self.nodes[ROOT]
    }

    fn clip_mut(&mut self, id: LId) -> Option<&mut ClipContent> {
        match &mut self.nodes[id].kind {
            LKind::Clip(content) => Some(content),
            _ => None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len.max(1));
    }

    /// Drop every node but the root; the root keeps its size.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        if let Some(content) = self.clip_mut(ROOT) {
            *content = ClipContent::default();
        }
    }

    /// Shift the content of a clip down, keeping its line table in sync.
    pub(crate) fn move_content_y(&mut self, clip: LId, amount: i32) {
        let layout = match &self.nodes[clip].kind {
            LKind::Clip(content) => content.layout.clone(),
            _ => return,
        };
        for id in layout {
            self.nodes[id].y += amount;
        }
        let Some(content) = self.clip_mut(clip) else {
            return;
        };
        let line_info = &mut content.line_info;
        if line_info.len() < 2 {
            return;
        }
        let shift_from = if line_info[1] != 0 {
            line_info.splice(0..0, [amount, 0]);
            2
        } else {
            0
        };
        for pair in line_info[shift_from..].chunks_exact_mut(2) {
            if pair[0] > 0 {
                pair[0] += amount;
            }
        }
    }

    /// The node under `(x, y)`, in the coordinates of `id`'s parent.
    pub(crate) fn find(&self, id: LId, x: i32, y: i32) -> LId {
        let node = self.node(id);
        let LKind::Clip(content) = &node.kind else {
            return id;
        };
        let (x, y) = (x - node.x, y - node.y);
        let mut line_top = 0;
        let mut layout_idx = 0;
        for pair in content.line_info.chunks_exact(2) {
            if y < line_top {
                break;
            }
            let line_bottom = pair[0];
            let count = usize::try_from(pair[1]).unwrap_or(0);
            if count > 0 {
                let Some(line) = content.layout.get(layout_idx..layout_idx + count) else {
                    break;
                };
                if line_bottom == 0 || y < line_bottom {
                    if let Some(&hit) = line.iter().find(|&&child| self.node(child).is_inside(x, y)) {
                        return self.find(hit, x, y);
                    }
                    if line_bottom > 0 && x >= self.node(line[0]).x {
                        let mut prev: Option<&LNode> = None;
                        for &child in line {
                            let node = self.node(child);
                            if node.x >= x && prev.is_none_or(|prev| same_element(prev, node)) {
                                return child;
                            }
                            prev = Some(node);
                        }
                    }
                }
                layout_idx += count;
            }
            if line_bottom > 0 {
                line_top = line_bottom;
            }
        }
        id
    }

    /// The first node laid out for `element`, with the offset of its clip.
    pub(crate) fn find_element(&self, id: LId, element: &Rc<Element>) -> Option<(LId, i32, i32)> {
        let node = self.node(id);
        if node.element.as_ref().is_some_and(|e| Rc::ptr_eq(e, element)) {
            return Some((id, 0, 0));
        }
        let LKind::Clip(content) = &node.kind else {
            return None;
        };
        content
            .layout
            .iter()
            .chain(&content.anchors)
            .find_map(|&child| self.find_element(child, element))
            .map(|(found, dx, dy)| (found, dx + node.x, dy + node.y))
    }

    fn matches_hover(&self, id: LId, target: Option<LId>) -> bool {
        target.is_some_and(|t| t == id || same_element(self.node(id), self.node(t)))
    }

    /// Mark the nodes belonging to the element of `target` as hovered.
    pub(crate) fn set_hover(&mut self, id: LId, target: Option<LId>) -> bool {
        let children = match &self.nodes[id].kind {
            LKind::Clip(content) => content.layout.clone(),
            _ => {
                let hover = self.matches_hover(id, target);
                self.nodes[id].is_hover = hover;
                return hover;
            }
        };
        let mut child_hover = false;
        for &child in &children {
            child_hover |= self.set_hover(child, target);
        }
        let hover = child_hover || self.matches_hover(id, target);
        self.nodes[id].is_hover = hover;
        for child in children {
            let node = &mut self.nodes[child];
            if node.inherit_hover {
                node.is_hover = hover;
            }
        }
        hover
    }

    /// Absolute bounds of every embedded widget.
    pub(crate) fn widget_rects(&self, id: LId, off_x: i32, off_y: i32, out: &mut Vec<(WidgetId, Rect)>) {
        let node = self.node(id);
        match &node.kind {
            LKind::Widget(widget) => out.push((*widget, node.rect().offset(off_x, off_y))),
            LKind::Clip(content) => {
                for &child in &content.layout {
                    self.widget_rects(child, off_x + node.x, off_y + node.y, out);
                }
            }
            _ => {}
        }
    }

    /// Move every background image into root coordinates and collect them in paint order.
    pub(crate) fn collect_bg_images(&mut self, id: LId, off_x: i32, off_y: i32, out: &mut Vec<LId>) {
        let (off_x, off_y) = (off_x + self.nodes[id].x, off_y + self.nodes[id].y);
        let (bg_images, layout) = match &self.nodes[id].kind {
            LKind::Clip(content) => (content.bg_images.clone(), content.layout.clone()),
            _ => return,
        };
        for image in bg_images {
            let node = &mut self.nodes[image];
            node.x += off_x;
            node.y += off_y;
            out.push(image);
        }
        for child in layout {
            self.collect_bg_images(child, off_x, off_y, out);
        }
    }

    pub(crate) fn draw(
        &self,
        renderer: &mut dyn Renderer,
        id: LId,
        off_x: i32,
        off_y: i32,
        states: (&AnimationState, &AnimationState),
    ) {
        let node = self.node(id);
        let (normal, hover) = states;
        match &node.kind {
            LKind::Clip(content) => {
                let (x, y) = (off_x + node.x, off_y + node.y);
                renderer.clip_enter(Rect::new(x, y, node.width, node.height));
                if !renderer.clip_is_empty() {
                    for &child in &content.layout {
                        self.draw(renderer, child, x, y, states);
                    }
                }
                renderer.clip_leave();
            }
            LKind::Text { text, font } => {
                let color = font.color(node.is_hover);
                let (x, y) = (off_x + node.x, off_y + node.y);
                let width = renderer.draw_text(font.font.as_ref(), color, x, y, text);
                let line_y = match font.decoration(node.is_hover) {
                    TextDecoration::None => None,
                    TextDecoration::Underline => Some(y + font.font.base_line() + 1),
                    TextDecoration::LineThrough => Some(y + font.font.line_height() / 2),
                };
                if let Some(line_y) = line_y {
                    renderer.fill_rect(Rect::new(x, line_y, width, 1), color);
                }
            }
            LKind::Image { paint, hover_src } => {
                let is_hover = self.node(hover_src.unwrap_or(id)).is_hover;
                let rect = node.rect().offset(off_x, off_y);
                match paint {
                    ImagePaint::Image(image) => {
                        let state = if is_hover { hover } else { normal };
                        renderer.draw_image(image.as_ref(), state, rect);
                    }
                    ImagePaint::Color { color, hover } => {
                        let color = if is_hover { hover.unwrap_or(*color) } else { *color };
                        renderer.fill_rect(rect, color);
                    }
                }
            }
            LKind::Anchor | LKind::Widget(_) => {}
        }
    }
}

// =============================================================================
// Flow boxes
// =============================================================================

/// The flow state of one clip while its content is laid out.
pub(crate) struct FlowBox {
    clip: LId,
    layout: Vec<LId>,
    anchors: Vec<LId>,
    bg_images: Vec<LId>,
    obj_left: Vec<LId>,
    obj_right: Vec<LId>,
    line_info: Vec<i32>,
    box_left: i32,
    box_width: i32,
    box_margin_offset_left: i32,
    box_margin_offset_right: i32,
    /// Nodes are only measured; widgets are not inserted.
    measure_only: bool,
    pub(crate) cur_y: i32,
    cur_x: i32,
    line_start_idx: usize,
    last_processed_anchor: usize,
    margin_top: i32,
    margin_left: i32,
    margin_right: i32,
    margin_bottom_abs: i32,
    margin_bottom_next: i32,
    line_start_x: i32,
    line_width: i32,
    font_line_height: i32,
    min_line_height: i32,
    last_line_end: usize,
    last_line_bottom: i32,
    pub(crate) min_remaining_width: i32,
    in_paragraph: bool,
    was_auto_break: bool,
    was_preformatted: bool,
    text_alignment: HAlignment,
    href: Option<Rc<str>>,
    style: Option<Rc<Style>>,
    resolver: Option<Rc<dyn StyleSheetResolver>>,
}

impl FlowBox {
    pub(crate) fn new(
        tree: &LayoutTree,
        clip: LId,
        padding_left: i32,
        padding_right: i32,
        padding_top: i32,
        measure_only: bool,
        resolver: Option<Rc<dyn StyleSheetResolver>>,
    ) -> Self {
        let box_width = (tree.node(clip).width - padding_left - padding_right).max(0);
        Self {
            clip,
            layout: Vec::new(),
            anchors: Vec::new(),
            bg_images: Vec::new(),
            obj_left: Vec::new(),
            obj_right: Vec::new(),
            line_info: Vec::new(),
            box_left: padding_left,
            box_width,
            box_margin_offset_left: padding_left,
            box_margin_offset_right: padding_right,
            measure_only,
            cur_y: padding_top,
            cur_x: padding_left,
            line_start_idx: 0,
            last_processed_anchor: 0,
            margin_top: 0,
            margin_left: 0,
            margin_right: 0,
            margin_bottom_abs: 0,
            margin_bottom_next: 0,
            line_start_x: padding_left,
            line_width: box_width,
            font_line_height: 0,
            min_line_height: 0,
            last_line_end: 0,
            last_line_bottom: 0,
            min_remaining_width: box_width,
            in_paragraph: false,
            was_auto_break: false,
            was_preformatted: false,
            text_alignment: HAlignment::Left,
            href: None,
            style: None,
            resolver,
        }
    }

    fn compute_padding(&mut self, tree: &LayoutTree) {
        let left = self.compute_left_padding(tree, self.margin_left);
        let right = self.compute_right_padding(tree, self.margin_right);
        self.line_start_x = left;
        self.line_width = (right - left).max(0);
        if self.is_at_start_of_line() {
            self.cur_x = self.line_start_x;
        }
        self.account_min_remaining(self.remaining());
    }

    fn compute_left_padding(&self, tree: &LayoutTree, margin_left: i32) -> i32 {
        let start = self.box_left + (margin_left - self.box_margin_offset_left).max(0);
        self.obj_left.iter().map(|&id| tree.node(id)).fold(start, |left, e| {
            left.max(e.x + e.width + e.margin_right.max(margin_left))
        })
    }

    fn compute_right_padding(&self, tree: &LayoutTree, margin_right: i32) -> i32 {
        let start = self.box_left + self.box_width - (margin_right - self.box_margin_offset_right).max(0);
        self.obj_right
            .iter()
            .map(|&id| tree.node(id))
            .fold(start, |right, e| right.min(e.x - e.margin_left.max(margin_right)))
    }

    fn compute_padding_width(&self, tree: &LayoutTree, margin_left: i32, margin_right: i32) -> i32 {
        (self.compute_right_padding(tree, margin_right) - self.compute_left_padding(tree, margin_left)).max(0)
    }

    fn compute_top_padding(&self, margin_top: i32) -> i32 {
        self.margin_bottom_abs.max(self.cur_y + margin_top)
    }

    fn set_margin_bottom(&mut self, margin_bottom: i32) {
        if self.is_at_start_of_line() {
            self.margin_bottom_abs = self.margin_bottom_abs.max(self.cur_y + margin_bottom);
        } else {
            self.margin_bottom_next = self.margin_bottom_next.max(margin_bottom);
        }
    }

    fn remaining(&self) -> i32 {
        (self.line_width - self.cur_x + self.line_start_x).max(0)
    }

    fn account_min_remaining(&mut self, remaining: i32) {
        self.min_remaining_width = self.min_remaining_width.min(remaining);
    }

    fn x_and_advance(&mut self, amount: i32) -> i32 {
        let x = self.cur_x;
        self.cur_x = x + amount;
        x
    }

    fn is_at_start_of_line(&self) -> bool {
        self.line_start_idx == self.layout.len()
    }

    fn prev_on_line_ends_not_with_space(&self, tree: &LayoutTree) -> bool {
        if self.is_at_start_of_line() {
            return false;
        }
        match self.layout.last().map(|&id| &tree.node(id).kind) {
            Some(LKind::Text { text, .. }) => text.chars().next_back().is_some_and(|c| !is_skip(c)),
            _ => true,
        }
    }

    fn check_floaters(&mut self, tree: &LayoutTree) {
        let cur_y = self.cur_y;
        self.obj_left.retain(|&id| tree.node(id).bottom() > cur_y);
        self.obj_right.retain(|&id| tree.node(id).bottom() > cur_y);
        self.compute_padding(tree);
    }

    fn clear_floater(&mut self, tree: &mut LayoutTree, clear: Clear) {
        if clear == Clear::None {
            return;
        }
        let mut target_y = -1;
        if matches!(clear, Clear::Left | Clear::Both) {
            for &id in &self.obj_left {
                let e = tree.node(id);
                // list labels float until their item is done
                if e.height != LIST_LABEL_HEIGHT {
                    target_y = target_y.max(e.y + e.height);
                }
            }
        }
        if matches!(clear, Clear::Right | Clear::Both) {
            for &id in &self.obj_right {
                let e = tree.node(id);
                target_y = target_y.max(e.y + e.height);
            }
        }
        if target_y >= 0 {
            self.advance_to_y(tree, target_y);
        }
    }

    fn advance_to_y(&mut self, tree: &mut LayoutTree, target_y: i32) {
        self.next_line(tree, false);
        if target_y > self.cur_y {
            self.cur_y = target_y;
            self.check_floaters(tree);
        }
    }

    fn advance_past_floaters(&mut self, tree: &mut LayoutTree, required: i32, margin_left: i32, margin_right: i32) {
        if self.compute_padding_width(tree, margin_left, margin_right) >= required {
            return;
        }
        self.next_line(tree, false);
        loop {
            let mut target_y = i32::MAX;
            if let Some(&id) = self.obj_left.last() {
                let e = tree.node(id);
                if e.height != LIST_LABEL_HEIGHT {
                    target_y = target_y.min(e.bottom());
                }
            }
            if let Some(&id) = self.obj_right.last() {
                target_y = target_y.min(tree.node(id).bottom());
            }
            if target_y == i32::MAX || target_y < self.cur_y {
                return;
            }
            self.cur_y = target_y;
            self.check_floaters(tree);
            if self.compute_padding_width(tree, margin_left, margin_right) >= required {
                return;
            }
        }
    }

    /// Complete the current line: align its nodes and move below it.
    ///
    /// Returns `false` if the line was empty and nothing happened. A forced break on an
    /// empty line still adds an empty line unless the previous break was automatic.
    fn next_line(&mut self, tree: &mut LayoutTree, force: bool) -> bool {
        if self.is_at_start_of_line() && (self.was_auto_break || !force) {
            self.was_auto_break = !force;
            return false;
        }
        self.account_min_remaining(self.remaining());
        let mut target_y = self.cur_y;
        let mut line_height = self.min_line_height;
        let line = self.line_start_idx..self.layout.len();
        if line.is_empty() {
            line_height = line_height.max(self.font_line_height);
        } else {
            for idx in line.clone() {
                line_height = line_height.max(tree.node(self.layout[idx]).height);
            }
            let last = tree.node(self.layout[line.end - 1]);
            let remaining = (self.line_start_x + self.line_width) - (last.x + last.width);
            match self.text_alignment {
                HAlignment::Left => {}
                HAlignment::Right => {
                    for idx in line.clone() {
                        tree.node_mut(self.layout[idx]).x += remaining;
                    }
                }
                HAlignment::Center => {
                    let offset = remaining / 2;
                    for idx in line.clone() {
                        tree.node_mut(self.layout[idx]).x += offset;
                    }
                }
                HAlignment::Justify => {
                    if remaining < self.line_width / 4 {
                        let gaps = (line.len() - 1) as i32;
                        for (i, idx) in line.clone().enumerate().skip(1) {
                            tree.node_mut(self.layout[idx]).x += remaining * i as i32 / gaps;
                        }
                    }
                }
            }
            let resolver = self.resolver.as_deref();
            for idx in line.clone() {
                let node = tree.node_mut(self.layout[idx]);
                let valign = node
                    .element
                    .as_ref()
                    .map_or(VAlignment::Bottom, |e| e.style().get(&attr::VERTICAL_ALIGNMENT, resolver));
                match valign {
                    VAlignment::Bottom => node.y = line_height - node.height,
                    VAlignment::Top => node.y = 0,
                    VAlignment::Middle => node.y = (line_height - node.height) / 2,
                    VAlignment::Fill => {
                        node.y = 0;
                        node.height = line_height;
                    }
                }
                let (margin_top, y, bottom) = (node.margin_top, node.y, node.bottom());
                target_y = target_y.max(self.compute_top_padding(margin_top - y));
                self.margin_bottom_next = self.margin_bottom_next.max(bottom - line_height);
            }
            for idx in line {
                tree.node_mut(self.layout[idx]).y += target_y;
            }
        }
        self.process_anchors(tree, target_y, line_height);
        self.min_line_height = 0;
        self.line_start_idx = self.layout.len();
        self.was_auto_break = !force;
        self.cur_y = target_y + line_height;
        self.margin_bottom_abs = self.margin_bottom_abs.max(self.cur_y + self.margin_bottom_next);
        self.margin_bottom_next = 0;
        self.margin_top = 0;
        self.check_floaters(tree);
        true
    }

    /// Close the box and hand its nodes to the clip.
    fn finish(&mut self, tree: &mut LayoutTree) {
        self.next_line(tree, false);
        self.clear_floater(tree, Clear::Both);
        self.process_anchors(tree, self.cur_y, 0);
        if let Some(content) = tree.clip_mut(self.clip) {
            content.layout.clone_from(&self.layout);
            content.anchors.clone_from(&self.anchors);
            content.bg_images.clone_from(&self.bg_images);
            content.line_info.clone_from(&self.line_info);
        }
    }

    fn compute_next_tab_stop(&self, tab_size: i32, font: &dyn Font) -> i32 {
        let em = font.m_width();
        if tab_size <= 0 || em <= 0 {
            return self.cur_x + font.space_width();
        }
        let tab_size_px = tab_size.min(i32::from(i16::MAX) / em) * em;
        let x = self.cur_x - self.line_start_x + font.space_width();
        self.cur_x + tab_size_px - (x % tab_size_px)
    }

    fn add_anchor(&mut self, tree: &mut LayoutTree, element: &Rc<Element>) -> LId {
        let mut anchor = LNode::new(Some(Rc::clone(element)), LKind::Anchor);
        anchor.x = self.box_left;
        anchor.y = self.cur_y;
        anchor.width = self.box_width;
        let id = tree.push(anchor);
        self.anchors.push(id);
        id
    }

    fn process_anchors(&mut self, tree: &mut LayoutTree, y: i32, height: i32) {
        while let Some(&id) = self.anchors.get(self.last_processed_anchor) {
            self.last_processed_anchor += 1;
            let anchor = tree.node_mut(id);
            if anchor.height == 0 {
                anchor.y = y;
                anchor.height = height;
            }
        }
        if self.line_start_idx > self.last_line_end {
            self.line_info.extend([0, count(self.line_start_idx - self.last_line_end)]);
        }
        if y > self.last_line_bottom {
            self.line_info.extend([y, 0]);
        }
        self.last_line_bottom = y + height;
        self.line_info
            .extend([self.last_line_bottom, count(self.layout.len() - self.line_start_idx)]);
        self.last_line_end = self.layout.len();
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

// =============================================================================
// Layouter
// =============================================================================

#[derive(PartialEq, Eq, Hash)]
struct FontKey {
    families: Vec<String>,
    size: i32,
    bold: bool,
    italic: bool,
}

/// Runs one layout pass over elements.
pub(crate) struct Layouter<'a> {
    gui: &'a mut Gui,
    owner: WidgetId,
    res: &'a mut Resources,
    pub(crate) tree: &'a mut LayoutTree,
    resolver: Option<Rc<dyn StyleSheetResolver>>,
    fallback_font: Rc<dyn Font>,
    font_cache: HashMap<FontKey, Option<Rc<dyn Font>>>,
}

impl<'a> Layouter<'a> {
    pub(crate) fn new(
        gui: &'a mut Gui,
        owner: WidgetId,
        res: &'a mut Resources,
        tree: &'a mut LayoutTree,
    ) -> Self {
        let fallback_font = res.default_font.clone().unwrap_or_else(|| gui.font_of(owner));
        let resolver = res.style_resolver.clone();
        if let Some(resolver) = &resolver {
            resolver.start_layout();
        }
        Self {
            gui,
            owner,
            res,
            tree,
            resolver,
            fallback_font,
            font_cache: HashMap::new(),
        }
    }

    pub(crate) fn new_box(&self, clip: LId, measure_only: bool) -> FlowBox {
        FlowBox::new(&*self.tree, clip, 0, 0, 0, measure_only, self.resolver.clone())
    }

    pub(crate) fn finish(&mut self, b: &mut FlowBox) {
        b.finish(self.tree);
    }

    fn get<T: AttributeType>(&self, style: &Style, attribute: &StyleAttribute<T>) -> T {
        style.get(attribute, self.resolver.as_deref())
    }

    pub(crate) fn layout_elements(&mut self, b: &mut FlowBox, elements: &[Rc<Element>]) {
        for element in elements {
            self.layout_element(b, element);
        }
    }

    fn layout_element(&mut self, b: &mut FlowBox, e: &Rc<Element>) {
        let clear = self.get(e.style(), &attr::CLEAR);
        b.clear_floater(self.tree, clear);
        if !matches!(e.kind(), ElementKind::Text(_) | ElementKind::LineBreak) && b.was_preformatted {
            b.next_line(self.tree, false);
            b.was_preformatted = false;
        }
        match e.kind() {
            ElementKind::Text(text) => self.layout_text_element(b, e, text),
            ElementKind::LineBreak => {
                b.next_line(self.tree, true);
            }
            ElementKind::Paragraph(children) => self.layout_paragraph(b, e, children),
            ElementKind::Image { name, .. } => self.layout_image(b, e, name),
            ElementKind::Widget { name, param } => self.layout_widget(b, e, name, param.as_deref()),
            ElementKind::List(children) => self.layout_list(b, e, children),
            ElementKind::OrderedList { start, children } => self.layout_ordered_list(b, e, *start, children),
            ElementKind::Block(_) => self.layout_block(b, e),
            ElementKind::Table(table) => self.layout_table(b, e, table),
            ElementKind::Link { href, .. } => self.layout_link(b, e, href),
            ElementKind::Container(_) | ElementKind::TableCell { .. } => self.layout_container(b, e),
        }
    }

    fn layout_image(&mut self, b: &mut FlowBox, e: &Rc<Element>, name: &str) {
        let Some(image) = self.select_image(name) else {
            tracing::debug!(target: targets::TEXT, name, "image not found");
            return;
        };
        let id = self.push_image(e, image);
        self.tree.node_mut(id).href = b.href.clone();
        self.place_styled(b, e, id);
    }

    fn push_image(&mut self, e: &Rc<Element>, image: Rc<dyn Image>) -> LId {
        let (width, height) = (image.width(), image.height());
        let paint = ImagePaint::Image(image);
        self.tree.push(
            LNode::new(Some(Rc::clone(e)), LKind::Image { paint, hover_src: None }).sized(width, height),
        )
    }

    fn layout_widget(&mut self, b: &mut FlowBox, e: &Rc<Element>, name: &str, param: Option<&str>) {
        let (widget, resolved) = match self.res.widgets.get(name) {
            Some(&widget) => (widget, false),
            None => {
                let widget = self
                    .res
                    .widget_resolvers
                    .get_mut(name)
                    .and_then(|resolver| resolver.resolve_widget(self.gui, name, param));
                let Some(widget) = widget else {
                    tracing::debug!(target: targets::TEXT, name, "widget not found");
                    return;
                };
                (widget, true)
            }
        };
        let (width, height) = if b.measure_only {
            let gui = &mut *self.gui;
            let width = compute_size(gui.min_width(widget), gui.preferred_width(widget), gui.max_width(widget));
            let height = compute_size(
                gui.min_height(widget),
                gui.preferred_height(widget),
                gui.max_height(widget),
            );
            if resolved {
                gui.dispose(widget);
            }
            (width, height)
        } else {
            if self.gui.parent_of(widget).is_some() {
                tracing::error!(
                    target: targets::TEXT,
                    name,
                    widget = ?widget,
                    "widget already added"
                );
                return;
            }
            let index = self.gui.num_children(self.owner);
            self.gui.insert_child(self.owner, widget, index);
            self.gui.adjust_size(widget);
            if resolved {
                self.res.resolved_widgets.push(widget);
            }
            let base = self.gui.base_of(widget);
            (base.width(), base.height())
        };
        let id = self
            .tree
            .push(LNode::new(Some(Rc::clone(e)), LKind::Widget(widget)).sized(width, height));
        self.place_styled(b, e, id);
    }

    /// Place an object after applying the element's margins and explicit size.
    fn place_styled(&mut self, b: &mut FlowBox, e: &Rc<Element>, id: LId) {
        let style = Rc::clone(e.style());
        let float = self.get(&style, &attr::FLOAT_POSITION);
        let display = self.get(&style, &attr::DISPLAY);
        let full = b.box_width;
        let margin_top = self.convert_to_px0(&style, &attr::MARGIN_TOP, full);
        let margin_left = self.convert_to_px0(&style, &attr::MARGIN_LEFT, full);
        let margin_right = self.convert_to_px0(&style, &attr::MARGIN_RIGHT, full);
        let margin_bottom = self.convert_to_px0(&style, &attr::MARGIN_BOTTOM, full);
        let (old_width, old_height) = {
            let node = self.tree.node_mut(id);
            node.margin_top = margin_top;
            node.margin_left = margin_left;
            node.margin_right = margin_right;
            node.margin_bottom = margin_bottom;
            (node.width, node.height)
        };
        let mut auto_height = old_height;
        let width = self.convert_to_px(&style, &attr::WIDTH, full, old_width);
        if width > 0 {
            if old_width > 0 {
                auto_height = width * old_height / old_width;
            }
            self.tree.node_mut(id).width = width;
        }
        let height = self.convert_to_px(&style, &attr::HEIGHT, old_height, auto_height);
        if height > 0 {
            self.tree.node_mut(id).height = height;
        }
        self.place(b, e, id, float, display);
    }

    /// Place an object inline, as a block or as a float.
    fn place(&mut self, b: &mut FlowBox, e: &Rc<Element>, id: LId, float: FloatPosition, display: Display) {
        let floating = float != FloatPosition::None;
        if floating || display != Display::Inline {
            b.next_line(self.tree, false);
            if !floating {
                b.cur_y = b.compute_top_padding(self.tree.node(id).margin_top);
                b.check_floaters(self.tree);
            }
        }
        let (margin_left, margin_right) = {
            let node = self.tree.node(id);
            (node.margin_left, node.margin_right)
        };
        let required = self.tree.node(id).width;
        b.advance_past_floaters(self.tree, required, margin_left, margin_right);
        {
            let node = self.tree.node_mut(id);
            node.width = node.width.min(b.line_width);
        }
        let width = self.tree.node(id).width;
        let x = match (float, display) {
            (FloatPosition::Right, _) => {
                let x = b.compute_right_padding(self.tree, margin_right) - width;
                b.obj_right.push(id);
                x
            }
            (FloatPosition::Left, _) => {
                let x = b.compute_left_padding(self.tree, margin_left);
                b.obj_left.push(id);
                x
            }
            (FloatPosition::None, Display::Inline) => {
                if b.remaining() < width && !b.is_at_start_of_line() {
                    b.next_line(self.tree, false);
                }
                b.x_and_advance(width)
            }
            (FloatPosition::None, Display::Block) => match self.get(e.style(), &attr::HORIZONTAL_ALIGNMENT) {
                HAlignment::Center | HAlignment::Justify => b.line_start_x + (b.line_width - width) / 2,
                HAlignment::Right => b.compute_right_padding(self.tree, margin_right) - width,
                HAlignment::Left => b.compute_left_padding(self.tree, margin_left),
            },
        };
        self.tree.node_mut(id).x = x;
        b.layout.push(id);
        if floating {
            debug_assert_eq!(b.line_start_idx, b.layout.len() - 1);
            b.line_start_idx += 1;
            let y = b.compute_top_padding(self.tree.node(id).margin_top);
            self.tree.node_mut(id).y = y;
            b.compute_padding(self.tree);
        } else if display != Display::Inline {
            b.account_min_remaining((b.line_width - width).max(0));
            b.next_line(self.tree, false);
        }
    }

    // -------------------------------------------------------------------------
    // Units, fonts and images
    // -------------------------------------------------------------------------

    /// Convert a length to pixels; `full` is the base of percentages.
    fn convert_to_px(&mut self, style: &Style, attribute: &StyleAttribute<Value>, full: i32, auto: i32) -> i32 {
        let resolver = self.resolver.clone();
        let style = style.resolve(attribute, resolver.as_deref());
        let value = style.get_no_resolve(attribute, resolver.as_deref());
        let px = match value {
            Value::Auto => return auto,
            Value::Px(v) => v,
            Value::Pt(v) => v * 1.33,
            Value::Percent(v) => v * full as f32 * 0.01,
            Value::Em(v) | Value::Ex(v) => {
                // font-size in em refers to the parent's font
                let font_style = if attribute.ordinal() == attr::FONT_SIZE.ordinal() {
                    match style.parent() {
                        Some(parent) => parent.as_ref(),
                        None => return DEFAULT_FONT_SIZE,
                    }
                } else {
                    style
                };
                let font = self.select_font(font_style);
                let unit_px = if matches!(value, Value::Em(_)) {
                    font.m_width()
                } else {
                    font.x_width()
                };
                v * unit_px as f32
            }
        };
        if px >= f32::from(i16::MAX) {
            i32::from(i16::MAX)
        } else if px <= f32::from(i16::MIN) {
            i32::from(i16::MIN)
        } else {
            px.round() as i32
        }
    }

    fn convert_to_px0(&mut self, style: &Style, attribute: &StyleAttribute<Value>, full: i32) -> i32 {
        self.convert_to_px(style, attribute, full, 0).max(0)
    }

    fn select_font(&mut self, style: &Style) -> Rc<dyn Font> {
        let families = self.get(style, &attr::FONT_FAMILIES);
        if let Some(mapper) = self.res.font_mapper.clone() {
            let key = FontKey {
                size: self.convert_to_px(style, &attr::FONT_SIZE, DEFAULT_FONT_SIZE, DEFAULT_FONT_SIZE),
                bold: self.get(style, &attr::FONT_WEIGHT) >= 550,
                italic: self.get(style, &attr::FONT_ITALIC),
                families: families.clone(),
            };
            let font = match self.font_cache.get(&key) {
                Some(cached) => cached.clone(),
                None => {
                    let font = mapper.get_font(&key.families, key.size, key.bold, key.italic);
                    self.font_cache.insert(key, font.clone());
                    font
                }
            };
            if let Some(font) = font {
                return font;
            }
        }
        if let Some(fonts) = &self.res.theme_fonts
            && let Some(font) = families.iter().find_map(|family| fonts.get_font(family))
        {
            return font;
        }
        Rc::clone(&self.fallback_font)
    }

    fn create_font_data(&mut self, style: &Style) -> Rc<FontData> {
        let font = self.select_font(style);
        let color = self.get(style, &attr::COLOR);
        let decoration = self.get(style, &attr::TEXT_DECORATION);
        Rc::new(FontData {
            font,
            color,
            color_hover: self.get(style, &attr::COLOR_HOVER).unwrap_or(color),
            decoration,
            decoration_hover: self.get(style, &attr::TEXT_DECORATION_HOVER).unwrap_or(decoration),
        })
    }

    fn select_image(&self, name: &str) -> Option<Rc<dyn Image>> {
        if let Some(image) = self.res.user_images.get(name) {
            return Some(Rc::clone(image));
        }
        self.res
            .image_resolvers
            .iter()
            .find_map(|resolver| resolver.resolve_image(name))
            .or_else(|| self.res.theme_images.as_ref()?.get_image(name))
    }

    fn select_style_image(&self, style: &Style, attribute: &StyleAttribute<Option<String>>) -> Option<Rc<dyn Image>> {
        let name = self.get(style, attribute)?;
        self.select_image(&name)
    }

    fn background_paint(&self, style: &Style) -> Option<ImagePaint> {
        if let Some(image) = self.select_style_image(style, &attr::BACKGROUND_IMAGE) {
            return Some(ImagePaint::Image(image));
        }
        let color = self.get(style, &attr::BACKGROUND_COLOR);
        if color.is_transparent() {
            return None;
        }
        Some(ImagePaint::Color {
            color,
            hover: self.get(style, &attr::BACKGROUND_COLOR_HOVER),
        })
    }

    /// Queue a background for `element` at the current line; the caller sets the size.
    fn create_bg_image(&mut self, b: &mut FlowBox, element: &Rc<Element>) -> Option<LId> {
        let paint = self.background_paint(element.style())?;
        Some(self.push_bg_image(b, element, paint))
    }

    fn push_bg_image(&mut self, b: &mut FlowBox, element: &Rc<Element>, paint: ImagePaint) -> LId {
        let (width, height) = match &paint {
            ImagePaint::Image(image) => (image.width(), image.height()),
            ImagePaint::Color { .. } => (0, 0),
        };
        let mut node = LNode::new(Some(Rc::clone(element)), LKind::Image { paint, hover_src: None })
            .sized(width, height);
        node.y = b.cur_y;
        let id = self.tree.push(node);
        b.bg_images.push(id);
        id
    }

    fn set_bg_hover_src(&mut self, image: LId, src: LId) {
        if let LKind::Image { hover_src, .. } = &mut self.tree.node_mut(image).kind {
            *hover_src = Some(src);
        }
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    fn setup_text_params(&mut self, b: &mut FlowBox, style: &Style, line_height: i32, paragraph_start: bool) {
        b.font_line_height = line_height;
        if paragraph_start {
            b.next_line(self.tree, false);
            b.in_paragraph = true;
        }
        if paragraph_start || (!b.in_paragraph && b.is_at_start_of_line()) {
            b.margin_left = self.convert_to_px0(style, &attr::MARGIN_LEFT, b.box_width);
            b.margin_right = self.convert_to_px0(style, &attr::MARGIN_RIGHT, b.box_width);
            b.text_alignment = self.get(style, &attr::HORIZONTAL_ALIGNMENT);
            b.compute_padding(self.tree);
            let indent = self.convert_to_px(style, &attr::TEXT_INDENT, b.box_width, 0);
            b.cur_x = (b.line_start_x + indent).max(0);
        }
        b.margin_top = self.convert_to_px0(style, &attr::MARGIN_TOP, b.box_width);
    }

    fn layout_paragraph(&mut self, b: &mut FlowBox, e: &Rc<Element>, children: &[Rc<Element>]) {
        let style = Rc::clone(e.style());
        let font = self.select_font(&style);
        self.do_margin_top(b, &style);
        let anchor = b.add_anchor(self.tree, e);
        self.setup_text_params(b, &style, font.line_height(), true);
        self.layout_elements(b, children);
        // the last line of a justified paragraph stays left aligned
        if b.text_alignment == HAlignment::Justify {
            b.text_alignment = HAlignment::Left;
        }
        b.next_line(self.tree, false);
        b.in_paragraph = false;
        let anchor = self.tree.node_mut(anchor);
        anchor.height = b.cur_y - anchor.y;
        self.do_margin_bottom(b, &style);
    }

    fn layout_text_element(&mut self, b: &mut FlowBox, e: &Rc<Element>, text: &str) {
        let style = Rc::clone(e.style());
        let font_data = self.create_font_data(&style);
        let pre = self.get(&style, &attr::PREFORMATTED);
        let resolver = self.resolver.clone();
        let inherit_hover = match style
            .resolve(&attr::INHERIT_HOVER, resolver.as_deref())
            .raw(&attr::INHERIT_HOVER)
        {
            Some(inherit) => inherit,
            // text directly inside a block follows the block's hover state
            None => b
                .style
                .as_ref()
                .is_some_and(|box_style| style.parent().is_some_and(|p| Rc::ptr_eq(box_style, p))),
        };
        self.setup_text_params(b, &style, font_data.font.line_height(), false);
        if pre && !b.was_preformatted {
            b.next_line(self.tree, false);
        }
        if pre {
            let tab_size = self.get(&style, &attr::TAB_SIZE);
            let mut idx = 0;
            while idx < text.len() {
                let end = text[idx..].find('\n').map_or(text.len(), |p| idx + p);
                self.layout_text_pre(b, e, &font_data, tab_size, &text[idx..end], inherit_hover);
                idx = end;
                if idx < text.len() {
                    idx += 1;
                    b.next_line(self.tree, true);
                }
            }
        } else {
            self.layout_text(b, e, &font_data, text, inherit_hover);
        }
        b.was_preformatted = pre;
    }

    fn push_text(&mut self, b: &mut FlowBox, e: &Rc<Element>, font: &Rc<FontData>, text: &str) -> LId {
        let width = font.font.compute_text_width(text);
        let height = font.font.line_height();
        let kind = LKind::Text {
            text: text.to_owned(),
            font: Rc::clone(font),
        };
        let mut node = LNode::new(Some(Rc::clone(e)), kind).sized(width, height);
        node.margin_top = b.margin_top;
        self.tree.push(node)
    }

    /// Wrap a run of flowing text into the current box.
    fn layout_text(&mut self, b: &mut FlowBox, e: &Rc<Element>, font_data: &Rc<FontData>, text: &str, inherit_hover: bool) {
        let font = Rc::clone(&font_data.font);
        let text_start = text.len() - text.trim_start_matches(is_skip).len();
        let trimmed_end = text.trim_end_matches(is_skip).len();
        let ends_with_space = trimmed_end < text.len() && trimmed_end >= text_start;
        let text_end = trimmed_end.max(text_start);
        if text_start > 0 && b.prev_on_line_ends_not_with_space(self.tree) {
            b.cur_x += font.space_width();
        }
        let mut break_word: Option<bool> = None;
        let mut idx = text_start;
        while idx < text_end {
            let justify = b.text_alignment == HAlignment::Justify;
            let mut end = idx;
            let mut visible_end = idx;
            if !justify {
                end = idx + font.visible_prefix_len(&text[idx..text_end], b.remaining());
                visible_end = end;
                if end < text_end {
                    // keep punctuation with the word before it
                    while end > idx && char_at(text, end).is_some_and(is_punctuation) {
                        end = prev_boundary(text, end);
                    }
                    if !char_at(text, end).is_some_and(is_break) {
                        while end > idx && !char_before(text, end).is_some_and(is_break) {
                            end = prev_boundary(text, end);
                        }
                    }
                }
                while end > idx && char_before(text, end).is_some_and(is_skip) {
                    end = prev_boundary(text, end);
                }
            }
            let mut advance_past_floaters = false;
            if end == idx {
                if !justify && b.next_line(self.tree, false) {
                    continue;
                }
                let break_word =
                    *break_word.get_or_insert_with(|| e.style().get(&attr::BREAK_WORD, self.resolver.as_deref()));
                if break_word {
                    end = if visible_end == idx {
                        next_boundary(text, idx)
                    } else {
                        visible_end
                    };
                } else {
                    while end < text_end && !char_at(text, end).is_some_and(is_break) {
                        end = next_boundary(text, end);
                    }
                    while end < text_end && char_at(text, end).is_some_and(is_punctuation) {
                        end = next_boundary(text, end);
                    }
                }
                advance_past_floaters = true;
            }
            if idx < end {
                let id = self.push_text(b, e, font_data, &text[idx..end]);
                let mut width = self.tree.node(id).width;
                if advance_past_floaters {
                    b.advance_past_floaters(self.tree, width, b.margin_left, b.margin_right);
                }
                if justify && b.remaining() < width {
                    b.next_line(self.tree, false);
                }
                if end < text_end && char_at(text, end).is_some_and(is_skip) {
                    width += font.space_width();
                }
                let x = b.x_and_advance(width);
                let node = self.tree.node_mut(id);
                node.x = x;
                node.margin_top = b.margin_top;
                node.href = b.href.clone();
                node.inherit_hover = inherit_hover;
                b.layout.push(id);
            }
            idx = end;
            while idx < text_end && char_at(text, idx).is_some_and(is_skip) {
                idx = next_boundary(text, idx);
            }
        }
        if !b.is_at_start_of_line() && ends_with_space {
            b.cur_x += font.space_width();
        }
    }

    /// Lay out one line of preformatted text, wrapping only where it overflows.
    fn layout_text_pre(
        &mut self,
        b: &mut FlowBox,
        e: &Rc<Element>,
        font_data: &Rc<FontData>,
        tab_size: i32,
        text: &str,
        inherit_hover: bool,
    ) {
        let font = Rc::clone(&font_data.font);
        let mut idx = 0;
        loop {
            while idx < text.len() {
                if text.as_bytes()[idx] == b'\t' {
                    idx += 1;
                    let tab_x = b.compute_next_tab_stop(tab_size, font.as_ref());
                    if tab_x < b.line_width {
                        b.cur_x = tab_x;
                    } else if !b.is_at_start_of_line() {
                        break;
                    }
                }
                let mut end = text[idx..].find('\t').map_or(text.len(), |p| idx + p);
                if end > idx {
                    let fitting = font.visible_prefix_len(&text[idx..end], b.remaining());
                    if fitting == 0 && !b.is_at_start_of_line() {
                        break;
                    }
                    end = if fitting == 0 { next_boundary(text, idx) } else { idx + fitting };
                    let id = self.push_text(b, e, font_data, &text[idx..end]);
                    let x = b.x_and_advance(self.tree.node(id).width);
                    let node = self.tree.node_mut(id);
                    node.x = x;
                    node.inherit_hover = inherit_hover;
                    b.layout.push(id);
                }
                idx = end;
            }
            if idx >= text.len() {
                break;
            }
            b.next_line(self.tree, false);
        }
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    fn do_margin_top(&mut self, b: &mut FlowBox, style: &Style) {
        let margin_top = self.convert_to_px0(style, &attr::MARGIN_TOP, b.box_width);
        // the line must be complete before the target is known
        b.next_line(self.tree, false);
        b.advance_to_y(self.tree, b.compute_top_padding(margin_top));
    }

    fn do_margin_bottom(&mut self, b: &mut FlowBox, style: &Style) {
        let margin_bottom = self.convert_to_px0(style, &attr::MARGIN_BOTTOM, b.box_width);
        b.set_margin_bottom(margin_bottom);
    }

    fn layout_container(&mut self, b: &mut FlowBox, e: &Rc<Element>) {
        let style = Rc::clone(e.style());
        self.do_margin_top(b, &style);
        b.add_anchor(self.tree, e);
        self.layout_elements(b, e.children());
        self.do_margin_bottom(b, &style);
    }

    fn layout_link(&mut self, b: &mut FlowBox, e: &Rc<Element>, href: &str) {
        let old_href = b.href.replace(Rc::from(href));
        if self.get(e.style(), &attr::DISPLAY) == Display::Block {
            self.layout_block(b, e);
        } else {
            self.layout_container(b, e);
        }
        b.href = old_href;
    }

    fn layout_list(&mut self, b: &mut FlowBox, e: &Rc<Element>, children: &[Rc<Element>]) {
        let style = Rc::clone(e.style());
        self.do_margin_top(b, &style);
        if let Some(image) = self.select_style_image(&style, &attr::LIST_STYLE_IMAGE) {
            let bullet = self.push_image(e, image);
            let gap = self.convert_to_px0(&style, &attr::PADDING_LEFT, b.box_width);
            self.tree.node_mut(bullet).margin_right = gap;
            self.place(b, e, bullet, FloatPosition::Left, Display::Block);
            let image_height = std::mem::replace(&mut self.tree.node_mut(bullet).height, LIST_LABEL_HEIGHT);
            self.layout_elements(b, children);
            self.tree.node_mut(bullet).height = image_height;
            b.obj_left.retain(|&id| id != bullet);
            let bottom = self.tree.node(bullet).bottom();
            b.advance_to_y(self.tree, bottom);
            b.compute_padding(self.tree);
        } else {
            self.layout_elements(b, children);
            b.next_line(self.tree, false);
        }
        self.do_margin_bottom(b, &style);
    }

    fn layout_ordered_list(&mut self, b: &mut FlowBox, e: &Rc<Element>, start: i32, items: &[Rc<Element>]) {
        let style = Rc::clone(e.style());
        let font_data = self.create_font_data(&style);
        self.do_margin_top(b, &style);
        let anchor = b.add_anchor(self.tree, e);
        let start = start.max(1);
        let list_type = self.get(&style, &attr::LIST_STYLE_TYPE);
        let labels: Vec<String> = (0..items.len())
            .map(|i| format!("{}. ", list_type.format(start.saturating_add(count(i)))))
            .collect();
        let max_label_width = labels
            .iter()
            .map(|label| font_data.font.compute_text_width(label))
            .fold(self.convert_to_px0(&style, &attr::PADDING_LEFT, b.box_width), i32::max);
        for (item, label) in items.iter().zip(&labels) {
            let item_style = Rc::clone(item.style());
            self.do_margin_top(b, &item_style);
            let id = self.push_text(b, e, &font_data, label);
            let (label_width, label_height) = {
                let node = self.tree.node(id);
                (node.width, node.height)
            };
            let gap = self.convert_to_px0(&item_style, &attr::PADDING_LEFT, b.box_width);
            self.tree.node_mut(id).width += gap;
            self.place(b, e, id, FloatPosition::Left, Display::Block);
            {
                let node = self.tree.node_mut(id);
                node.x += (max_label_width - label_width).max(0);
                node.height = LIST_LABEL_HEIGHT;
            }
            self.layout_element(b, item);
            self.tree.node_mut(id).height = label_height;
            b.obj_left.retain(|&other| other != id);
            let bottom = self.tree.node(id).bottom();
            b.advance_to_y(self.tree, bottom);
            b.compute_padding(self.tree);
            self.do_margin_bottom(b, &item_style);
        }
        let anchor = self.tree.node_mut(anchor);
        anchor.height = b.cur_y - anchor.y;
        self.do_margin_bottom(b, &style);
    }

    /// Lay the children of `e` out into `clip` and size the clip.
    #[allow(clippy::too_many_arguments)]
    fn layout_box(
        &mut self,
        clip: LId,
        container_width: i32,
        padding_left: i32,
        padding_right: i32,
        e: &Rc<Element>,
        href: Option<Rc<str>>,
        measure_only: bool,
    ) -> FlowBox {
        let style = Rc::clone(e.style());
        let padding_top = self.convert_to_px0(&style, &attr::PADDING_TOP, container_width);
        let padding_bottom = self.convert_to_px0(&style, &attr::PADDING_BOTTOM, container_width);
        let margin_bottom = self.convert_to_px0(&style, &attr::MARGIN_BOTTOM, container_width);
        let mut b = FlowBox::new(
            self.tree,
            clip,
            padding_left,
            padding_right,
            padding_top,
            measure_only,
            self.resolver.clone(),
        );
        b.href = href;
        b.style = Some(Rc::clone(&style));
        self.layout_elements(&mut b, e.children());
        b.finish(self.tree);
        let content_height = b.cur_y + padding_bottom;
        let box_height = content_height.max(self.convert_to_px(&style, &attr::HEIGHT, content_height, content_height));
        if box_height > content_height {
            let amount = match self.get(&style, &attr::VERTICAL_ALIGNMENT) {
                VAlignment::Bottom => box_height - content_height,
                VAlignment::Fill | VAlignment::Middle => (box_height - content_height) / 2,
                VAlignment::Top => 0,
            };
            if amount > 0 {
                self.tree.move_content_y(clip, amount);
            }
        }
        let node = self.tree.node_mut(clip);
        node.height = box_height;
        node.margin_bottom = margin_bottom.max(b.margin_bottom_abs - b.cur_y);
        b
    }

    /// Lay out `e` into a scratch clip and return the box; the scratch nodes are dropped.
    fn measure_box(
        &mut self,
        width: i32,
        container_width: i32,
        padding_left: i32,
        padding_right: i32,
        e: &Rc<Element>,
    ) -> (i32, FlowBox) {
        let mark = self.tree.len();
        let dummy = self.tree.push(LNode::clip(None).sized(width, 0));
        let b = self.layout_box(dummy, container_width, padding_left, padding_right, e, None, true);
        self.tree.truncate(mark);
        (width, b)
    }

    fn layout_block(&mut self, b: &mut FlowBox, e: &Rc<Element>) {
        b.next_line(self.tree, false);
        let style = Rc::clone(e.style());
        let float = self.get(&style, &attr::FLOAT_POSITION);
        let bg_image = self.create_bg_image(b, e);
        let full = b.box_width;
        let margin_top = self.convert_to_px0(&style, &attr::MARGIN_TOP, full);
        let margin_left = self.convert_to_px0(&style, &attr::MARGIN_LEFT, full);
        let margin_right = self.convert_to_px0(&style, &attr::MARGIN_RIGHT, full);
        let mut bg_x = b.compute_left_padding(self.tree, margin_left);
        let mut bg_y = b.compute_top_padding(margin_top);
        let mut remaining = (b.compute_right_padding(self.tree, margin_right) - bg_x).max(0);
        let padding_left = self.convert_to_px0(&style, &attr::PADDING_LEFT, full);
        let padding_right = self.convert_to_px0(&style, &attr::PADDING_RIGHT, full);
        let mut bg_width = if float == FloatPosition::None {
            self.convert_to_px(&style, &attr::WIDTH, remaining, remaining)
        } else {
            match self.convert_to_px(&style, &attr::WIDTH, full, i32::MIN) {
                i32::MIN => {
                    let width = (b.line_width - padding_left - padding_right).max(0);
                    let (width, measured) = self.measure_box(width, full, padding_left, padding_right, e);
                    (width - measured.min_remaining_width).max(0)
                }
                width => width,
            }
        };
        bg_width = bg_width.max(0) + padding_left + padding_right;
        if float != FloatPosition::None {
            b.advance_past_floaters(self.tree, bg_width, margin_left, margin_right);
            bg_x = b.compute_left_padding(self.tree, margin_left);
            bg_y = bg_y.max(b.cur_y);
            remaining = (b.compute_right_padding(self.tree, margin_right) - bg_x).max(0);
        }
        bg_width = bg_width.min(remaining);
        if float == FloatPosition::Right {
            bg_x = b.compute_right_padding(self.tree, margin_right) - bg_width;
        }
        let mut node = LNode::clip(Some(Rc::clone(e))).sized(bg_width, 0);
        node.x = bg_x;
        node.y = bg_y;
        node.margin_left = margin_left;
        node.margin_right = margin_right;
        node.href = b.href.clone();
        let clip = self.tree.push(node);
        b.layout.push(clip);
        let clip_box = self.layout_box(
            clip,
            full,
            padding_left,
            padding_right,
            e,
            b.href.clone(),
            b.measure_only,
        );
        b.line_start_idx = b.layout.len();
        let (clip_height, clip_margin_bottom) = {
            let node = self.tree.node(clip);
            (node.height, node.margin_bottom)
        };
        match float {
            FloatPosition::None => {
                b.advance_to_y(self.tree, bg_y + clip_height);
                b.set_margin_bottom(clip_margin_bottom);
                b.account_min_remaining(clip_box.min_remaining_width);
            }
            FloatPosition::Right => {
                b.obj_right.push(clip);
                b.compute_padding(self.tree);
            }
            FloatPosition::Left => {
                b.obj_left.push(clip);
                b.compute_padding(self.tree);
            }
        }
        if let Some(bg_image) = bg_image {
            let node = self.tree.node_mut(bg_image);
            node.x = bg_x;
            node.y = bg_y;
            node.width = bg_width;
            node.height = clip_height;
            self.set_bg_hover_src(bg_image, clip);
        }
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    fn cell_padding(&mut self, style: &Style, table_padding: i32, full: i32) -> (i32, i32) {
        let left = table_padding.max(self.convert_to_px0(style, &attr::PADDING_LEFT, full));
        let right = table_padding.max(self.convert_to_px0(style, &attr::PADDING_RIGHT, full));
        (left, right)
    }

    /// Natural column widths; `spacing` has one more entry than there are columns.
    fn compute_table_width(
        &mut self,
        table: &TableElement,
        max_table_width: i32,
        widths: &mut [i32],
        spacing: &mut [i32],
        fixed: &mut [bool],
    ) {
        let cell_spacing = table.cell_spacing();
        let mut colspan_widths: BTreeMap<(usize, usize), i32> = BTreeMap::new();
        for col in 0..table.num_columns() {
            let mut width = 0;
            let mut margin_left = 0;
            let mut margin_right = 0;
            let mut has_fixed_width = false;
            for row in 0..table.num_rows() {
                let Some(cell) = table.cell(row, col) else {
                    continue;
                };
                let cell = Rc::clone(cell);
                let cell_style = Rc::clone(cell.style());
                let colspan = match cell.kind() {
                    ElementKind::TableCell { colspan, .. } => *colspan,
                    _ => 1,
                };
                let mut cell_width = self.convert_to_px(&cell_style, &attr::WIDTH, max_table_width, i32::MIN);
                if cell_width == i32::MIN && (colspan > 1 || !has_fixed_width) {
                    let (padding_left, padding_right) =
                        self.cell_padding(&cell_style, table.cell_padding(), max_table_width);
                    let (_, measured) =
                        self.measure_box(max_table_width, max_table_width, padding_left, padding_right, &cell);
                    cell_width = max_table_width - measured.min_remaining_width;
                } else if colspan == 1 && cell_width >= 0 {
                    has_fixed_width = true;
                }
                if colspan > 1 {
                    let entry = colspan_widths.entry((col, colspan)).or_insert(cell_width);
                    *entry = (*entry).max(cell_width);
                } else {
                    width = width.max(cell_width);
                    margin_left =
                        margin_left.max(self.convert_to_px(&cell_style, &attr::MARGIN_LEFT, max_table_width, 0));
                    margin_right =
                        margin_right.max(self.convert_to_px(&cell_style, &attr::MARGIN_RIGHT, max_table_width, 0));
                }
            }
            fixed[col] = has_fixed_width;
            widths[col] = width;
            spacing[col] = spacing[col].max(margin_left);
            spacing[col + 1] = cell_spacing.max(margin_right);
        }
        for ((col, colspan), mut width) in colspan_widths {
            let span = col..(col + colspan).min(widths.len());
            let mut remaining_cols = span.len();
            for c in span.clone() {
                if fixed[c] {
                    width -= widths[c];
                    remaining_cols -= 1;
                }
            }
            if width <= 0 {
                continue;
            }
            for c in span {
                if remaining_cols == 0 {
                    break;
                }
                if !fixed[c] {
                    let col_width = width / count(remaining_cols);
                    widths[c] = widths[c].max(col_width);
                    width -= col_width;
                    remaining_cols -= 1;
                }
            }
        }
    }

    fn layout_table(&mut self, b: &mut FlowBox, e: &Rc<Element>, table: &TableElement) {
        let num_columns = table.num_columns();
        let num_rows = table.num_rows();
        if num_columns == 0 || num_rows == 0 {
            return;
        }
        let cell_spacing = table.cell_spacing();
        let table_style = Rc::clone(e.style());
        self.do_margin_top(b, &table_style);
        let anchor = b.add_anchor(self.tree, e);
        let full = b.box_width;
        let margin_left = self.convert_to_px0(&table_style, &attr::MARGIN_LEFT, full);
        let margin_right = self.convert_to_px0(&table_style, &attr::MARGIN_RIGHT, full);
        let left = b.compute_left_padding(self.tree, margin_left);
        let right = b.compute_right_padding(self.tree, margin_right);
        let max_table_width = (right - left).max(0);
        let requested = self.convert_to_px(&table_style, &attr::WIDTH, full, i32::MIN);
        let auto_table_width = requested == i32::MIN;
        let mut table_width = max_table_width.min(requested);
        if table_width <= 0 {
            table_width = max_table_width;
        }

        let mut widths = vec![0; num_columns];
        let mut spacing = vec![0; num_columns + 1];
        let mut fixed = vec![false; num_columns];
        spacing[0] = cell_spacing.max(self.convert_to_px0(&table_style, &attr::PADDING_LEFT, full));
        self.compute_table_width(table, table_width, &mut widths, &mut spacing, &mut fixed);
        spacing[num_columns] =
            spacing[num_columns].max(self.convert_to_px0(&table_style, &attr::PADDING_RIGHT, full));

        let spacing_sum: i32 = spacing.iter().sum();
        let width_sum: i32 = widths.iter().sum();
        if auto_table_width {
            table_width = max_table_width.min(width_sum + spacing_sum);
        }
        let available_width = (table_width - spacing_sum).max(0);
        if available_width != width_sum && width_sum > 0 {
            distribute_column_widths(&mut widths, &fixed, available_width, width_sum);
        }

        let table_bg = self.create_bg_image(b, e);
        b.text_alignment = HAlignment::Left;
        b.cur_y += cell_spacing.max(self.convert_to_px0(&table_style, &attr::PADDING_TOP, full));
        let mut cell_bgs: Vec<Option<LId>> = vec![None; num_columns];
        for row in 0..num_rows {
            if row > 0 {
                b.cur_y += cell_spacing;
            }
            let row_style = table.row_style(row).cloned();
            let mut row_bg = None;
            if let Some(row_style) = &row_style {
                let margin_top = self.convert_to_px0(row_style, &attr::MARGIN_TOP, table_width);
                b.cur_y = b.compute_top_padding(margin_top);
                if let Some(paint) = self.background_paint(row_style) {
                    let id = self.push_bg_image(b, e, paint);
                    let node = self.tree.node_mut(id);
                    node.x = left;
                    node.width = table_width;
                    row_bg = Some(id);
                }
                b.cur_y += self.convert_to_px0(row_style, &attr::PADDING_TOP, table_width);
                b.min_line_height = self.convert_to_px0(row_style, &attr::HEIGHT, table_width);
            }
            let mut x = left;
            let mut col = 0;
            while col < num_columns {
                x += spacing[col];
                let mut width = widths[col];
                let mut span = 1;
                if let Some(cell) = table.cell(row, col).cloned() {
                    if let ElementKind::TableCell { colspan, .. } = cell.kind() {
                        span = (*colspan).min(num_columns - col).max(1);
                    }
                    for c in 1..span {
                        width += spacing[col + c] + widths[col + c];
                    }
                    let cell_style = Rc::clone(cell.style());
                    let (padding_left, padding_right) =
                        self.cell_padding(&cell_style, table.cell_padding(), table_width);
                    let mut node = LNode::clip(Some(Rc::clone(&cell))).sized(width, 0);
                    node.x = x;
                    node.y = b.cur_y;
                    node.margin_top = self.convert_to_px0(&cell_style, &attr::MARGIN_TOP, table_width);
                    let clip = self.tree.push(node);
                    if let Some(bg) = self.create_bg_image(b, &cell) {
                        let node = self.tree.node_mut(bg);
                        node.x = x;
                        node.width = width;
                        self.set_bg_hover_src(bg, clip);
                        cell_bgs[col] = Some(bg);
                    }
                    b.layout.push(clip);
                    self.layout_box(clip, table_width, padding_left, padding_right, &cell, None, b.measure_only);
                }
                x += width;
                col += span;
            }
            b.next_line(self.tree, false);
            for bg in cell_bgs.iter_mut() {
                if let Some(bg) = bg.take() {
                    let node = self.tree.node_mut(bg);
                    node.height = b.cur_y - node.y;
                }
            }
            if let Some(row_style) = &row_style {
                b.cur_y += self.convert_to_px0(row_style, &attr::PADDING_BOTTOM, table_width);
                if let Some(row_bg) = row_bg {
                    let node = self.tree.node_mut(row_bg);
                    node.height = b.cur_y - node.y;
                }
                self.do_margin_bottom(b, row_style);
            }
        }
        b.cur_y += cell_spacing.max(self.convert_to_px0(&table_style, &attr::PADDING_BOTTOM, full));
        b.check_floaters(self.tree);
        b.account_min_remaining((b.line_width - table_width).max(0));
        if let Some(table_bg) = table_bg {
            let node = self.tree.node_mut(table_bg);
            node.height = b.cur_y - node.y;
            node.x = left;
            node.width = table_width;
        }
        let anchor = self.tree.node_mut(anchor);
        anchor.x = left;
        anchor.width = table_width;
        anchor.height = b.cur_y - anchor.y;
        self.do_margin_bottom(b, &table_style);
    }
}

impl Drop for Layouter<'_> {
    fn drop(&mut self) {
        if let Some(resolver) = &self.resolver {
            resolver.layout_finished();
        }
    }
}

/// Scale the columns so their widths add up to `available`.
///
/// Only columns without a fixed width change, unless even the fixed ones do not fit.
fn distribute_column_widths(widths: &mut [i32], fixed: &[bool], available: i32, width_sum: i32) {
    let mut remaining = available;
    let mut to_distribute = width_sum;
    let mut remaining_cols = widths.len();
    for (width, _) in widths.iter().zip(fixed).filter(|(_, fixed)| **fixed) {
        remaining -= *width;
        to_distribute -= *width;
        remaining_cols -= 1;
    }
    let all_columns = remaining < 0;
    if all_columns {
        remaining = available;
        to_distribute = width_sum;
        remaining_cols = widths.len();
    }
    for (width, &is_fixed) in widths.iter_mut().zip(fixed) {
        if remaining_cols == 0 {
            break;
        }
        if all_columns || !is_fixed {
            let old = *width;
            let new = if to_distribute > 0 {
                (i64::from(old) * i64::from(remaining) / i64::from(to_distribute)) as i32
            } else {
                0
            };
            *width = new;
            remaining -= new;
            to_distribute -= old;
            remaining_cols -= 1;
        }
    }
}

fn is_skip(ch: char) -> bool {
    ch.is_whitespace()
}

fn is_punctuation(ch: char) -> bool {
    ":;,.-!?".contains(ch)
}

fn is_break(ch: char) -> bool {
    is_skip(ch) || is_punctuation(ch) || ch == '\u{3001}' || ch == '\u{3002}'
}

fn char_at(text: &str, idx: usize) -> Option<char> {
    text.get(idx..)?.chars().next()
}

fn char_before(text: &str, idx: usize) -> Option<char> {
    text.get(..idx)?.chars().next_back()
}

fn prev_boundary(text: &str, idx: usize) -> usize {
    char_before(text, idx).map_or(0, |c| idx - c.len_utf8())
}

fn next_boundary(text: &str, idx: usize) -> usize {
    char_at(text, idx).map_or(text.len(), |c| idx + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribute_shrinks_free_columns() {
        let mut widths = [100, 50, 50];
        distribute_column_widths(&mut widths, &[true, false, false], 150, 200);
        assert_eq!(widths, [100, 25, 25]);
    }

    #[test]
    fn test_distribute_all_columns_when_fixed_overflow() {
        let mut widths = [100, 100];
        distribute_column_widths(&mut widths, &[true, true], 100, 200);
        assert_eq!(widths, [50, 50]);
    }

    #[test]
    fn test_move_content_keeps_line_table() {
        let mut tree = LayoutTree::new();
        let text = tree.push(LNode::new(None, LKind::Anchor).sized(10, 10));
        if let Some(content) = tree.clip_mut(ROOT) {
            content.layout.push(text);
            content.line_info = vec![10, 1, 20, 0];
        }
        tree.move_content_y(ROOT, 5);
        assert_eq!(tree.node(text).y, 5);
        let LKind::Clip(content) = &tree.root().kind else {
            unreachable!()
        };
        assert_eq!(content.line_info, vec![5, 0, 15, 1, 25, 0]);
    }

    #[test]
    fn test_char_helpers() {
        let text = "aé b";
        assert_eq!(next_boundary(text, 1), 3);
        assert_eq!(prev_boundary(text, 3), 1);
        assert_eq!(char_before(text, 3), Some('é'));
        assert_eq!(char_at(text, 3), Some(' '));
        assert!(is_break('、'));
        assert!(!is_break('x'));
    }
}
