//! The GUI: widget arena, tree root and frame pump.
//!
//! A [`Gui`] owns every widget, the renderer and all per-frame state. Its root node has a
//! fixed child layout:
//!
//! ```text
//! [root pane, popup 1, ..., popup n, info placeholder, tooltip window]
//! ```
//!
//! The widget third from the end is the *top pane*: the root pane while no popup is
//! open, otherwise the most recently opened popup. Input is dispatched to the top pane.
//!
//! # Frame protocol
//!
//! [`Gui::update`] runs, in order: resize to the renderer viewport, advance time, poll
//! input, synthesize key repeat, tooltip housekeeping, fire timers, drain the
//! invoke-later queue, validate layout, render, update the mouse cursor.

mod clipboard;
mod config;
mod input;
mod keyboard;
mod mouse;
mod popup;
mod tooltip;

#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::SlotMap;
use trellis_core::logging::targets;
use trellis_core::{
    AnimationClock, FrameTimers, InvokeLaterHandle, InvokeQueue, SharedAnimationState, TimerId,
    guarded,
};
use trellis_render::{Font, MonospaceFont, Renderer};

use crate::error::GuiResult;
use crate::event::Event;
use crate::theme::ThemeManager;
use crate::widget::{Container, Cx, Node, Widget, WidgetBase, WidgetId};

pub use clipboard::{Clipboard, MemoryClipboard};
pub use config::GuiConfig;
pub use input::{Input, QueuedInput, RawInput};
pub use tooltip::{STATE_FADE, TooltipWindow};

pub(crate) use mouse::MouseState;
pub(crate) use tooltip::TooltipState;

/// Listener told when the mouse enters (`true`) or leaves (`false`) the idle state.
pub type MouseIdleListener = Box<dyn FnMut(&mut Gui, bool)>;

type DeferredJob = Box<dyn FnOnce(&mut Gui)>;

/// Behavior of the root node.
#[derive(Debug, Default)]
struct GuiRoot;

impl Widget for GuiRoot {
    fn layout(&mut self, cx: &mut Cx<'_>) {
        let root = cx.id();
        let pane = cx.root_pane();
        cx.layout_child_full_inner_area(root, pane);
    }
}

/// A popup capturing mouse moves until the drag ends.
pub(crate) struct BoundDrag {
    pub(crate) popup: WidgetId,
    pub(crate) callback: Option<DeferredJob>,
}

#[derive(Debug, Default)]
pub(crate) struct KeyState {
    pub(crate) event_time: i64,
    /// Milliseconds until the next synthetic repeat; zero when no key is held.
    pub(crate) repeat_delay: i64,
    pub(crate) focus_key_widget: Option<WidgetId>,
}

/// The root of a widget tree and its frame pump.
pub struct Gui {
    pub(crate) nodes: SlotMap<WidgetId, Node>,
    root: WidgetId,
    root_pane: WidgetId,
    pub(crate) info_placeholder: WidgetId,
    pub(crate) tooltip_window: WidgetId,
    pub(crate) active_info: Option<WidgetId>,
    renderer: Box<dyn Renderer>,
    config: GuiConfig,
    theme_manager: Option<Rc<dyn ThemeManager>>,
    default_font: Rc<dyn Font>,
    timers: FrameTimers<Gui>,
    invoke_queue: InvokeQueue<Gui>,
    clock: AnimationClock,
    cur_time: i64,
    time_delta: i32,
    pub(crate) has_invalid_layouts: bool,
    pub(crate) event: Event,
    pub(crate) mouse: MouseState,
    pub(crate) keys: KeyState,
    pub(crate) tooltip: TooltipState,
    pub(crate) popup_event_occurred: bool,
    pub(crate) bound_drag: Option<BoundDrag>,
    hook_depth: u32,
    deferred: VecDeque<DeferredJob>,
    draining: bool,
    input: Option<Box<dyn Input>>,
    clipboard: Box<dyn Clipboard>,
    pub(crate) mouse_idle_listener: Option<MouseIdleListener>,
}

// Widgets and signal slots stay on the thread that created the GUI.
static_assertions::assert_not_impl_any!(Gui: Send, Sync);

impl Gui {
    /// Create a GUI drawing through `renderer`.
    pub fn new(renderer: Box<dyn Renderer>, config: GuiConfig) -> Self {
        let now = renderer.time_millis();
        let clock = AnimationClock::new();
        clock.set(now);
        let mut gui = Self {
            nodes: SlotMap::with_key(),
            root: WidgetId::default(),
            root_pane: WidgetId::default(),
            info_placeholder: WidgetId::default(),
            tooltip_window: WidgetId::default(),
            active_info: None,
            renderer,
            config,
            theme_manager: None,
            default_font: Rc::new(MonospaceFont::default()),
            timers: FrameTimers::new(),
            invoke_queue: InvokeQueue::new(),
            clock,
            cur_time: now,
            time_delta: 0,
            has_invalid_layouts: false,
            event: Event::default(),
            mouse: MouseState::default(),
            keys: KeyState::default(),
            tooltip: TooltipState::default(),
            popup_event_occurred: false,
            bound_drag: None,
            hook_depth: 0,
            deferred: VecDeque::new(),
            draining: false,
            input: None,
            clipboard: Box::new(MemoryClipboard::default()),
            mouse_idle_listener: None,
        };

        let root = gui.nodes.insert(Node::new(Box::new(GuiRoot), None));
        {
            let node = &mut gui.nodes[root];
            node.attached = true;
            node.base.theme.clear();
            node.base.set_focus_key_enabled(false);
        }
        gui.root = root;

        let root_pane = gui.create(Container);
        gui.nodes[root_pane].base.theme.clear();
        gui.nodes[root_pane].base.set_focus_key_enabled(false);
        let placeholder = gui.create(Container);
        gui.nodes[placeholder].base.theme.clear();
        gui.nodes[placeholder].base.set_can_accept_keyboard_focus(false);
        let tooltip_window = gui.create(TooltipWindow::default());
        gui.nodes[tooltip_window].base.visible = false;

        gui.root_pane = root_pane;
        gui.info_placeholder = placeholder;
        gui.tooltip_window = tooltip_window;
        gui.insert_child_unchecked(root, root_pane, 0);
        gui.insert_child_unchecked(root, placeholder, 1);
        gui.insert_child_unchecked(root, tooltip_window, 2);

        let viewport = gui.renderer.viewport();
        gui.set_size(root, viewport.width, viewport.height);
        tracing::debug!(target: targets::CORE, width = viewport.width, height = viewport.height, "GUI created");
        gui
    }

    /// The root node. Its children are managed by the GUI.
    pub fn root(&self) -> WidgetId {
        self.root
    }

    pub fn root_pane(&self) -> WidgetId {
        self.root_pane
    }

    /// Replace the root pane. The old pane is removed (and destroyed) but stays in the arena.
    ///
    /// # Panics
    ///
    /// Panics if `pane` already has a parent.
    pub fn set_root_pane(&mut self, pane: WidgetId) {
        let root = self.root;
        self.remove_child_at(root, 0);
        self.insert_child_unchecked(root, pane, 0);
        self.root_pane = pane;
    }

    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GuiConfig {
        &mut self.config
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    /// The renderer as its concrete type.
    pub fn renderer_as<R: Renderer>(&self) -> Option<&R> {
        (self.renderer.as_ref() as &dyn std::any::Any).downcast_ref::<R>()
    }

    pub fn renderer_as_mut<R: Renderer>(&mut self) -> Option<&mut R> {
        (self.renderer.as_mut() as &mut dyn std::any::Any).downcast_mut::<R>()
    }

    /// Time of the current frame in milliseconds.
    pub fn current_time(&self) -> i64 {
        self.cur_time
    }

    /// Milliseconds elapsed between the previous and the current frame.
    pub fn time_delta(&self) -> i32 {
        self.time_delta
    }

    /// The clock widgets' animation states read.
    pub fn animation_clock(&self) -> &AnimationClock {
        &self.clock
    }

    /// The current input event record.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn theme_manager(&self) -> Option<&Rc<dyn ThemeManager>> {
        self.theme_manager.as_ref()
    }

    /// Apply `manager` to the whole tree.
    pub fn apply_theme(&mut self, manager: Rc<dyn ThemeManager>) {
        self.theme_manager = Some(Rc::clone(&manager));
        let root = self.root;
        self.apply_theme_manager(root, manager);
    }

    /// The font used when neither the widget's theme nor the theme manager names one.
    pub fn set_default_font(&mut self, font: Rc<dyn Font>) {
        self.default_font = font;
    }

    /// The font a widget paints text with.
    pub fn font_of(&self, id: WidgetId) -> Rc<dyn Font> {
        if let Some(font) = self.base_of(id).font() {
            return Rc::clone(font);
        }
        self.theme_manager
            .as_ref()
            .and_then(|tm| tm.default_font())
            .unwrap_or_else(|| Rc::clone(&self.default_font))
    }

    pub fn clipboard(&self) -> &dyn Clipboard {
        self.clipboard.as_ref()
    }

    pub fn clipboard_mut(&mut self) -> &mut dyn Clipboard {
        self.clipboard.as_mut()
    }

    pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
        self.clipboard = clipboard;
    }

    /// Set the input source polled at the start of every frame.
    pub fn set_input(&mut self, input: Option<Box<dyn Input>>) {
        self.input = input;
    }

    pub fn set_mouse_idle_listener(&mut self, listener: Option<MouseIdleListener>) {
        self.mouse_idle_listener = listener;
    }

    // ---------------------------------------------------------------------
    // Arena access
    // ---------------------------------------------------------------------

    /// Add a widget to the arena. It starts detached.
    pub fn create<W: Widget>(&mut self, widget: W) -> WidgetId {
        self.create_node(Box::new(widget), None)
    }

    /// Add a widget that shares `anim` with another widget. It never writes to the state.
    pub fn create_with_animation_state<W: Widget>(
        &mut self,
        widget: W,
        anim: SharedAnimationState,
    ) -> WidgetId {
        self.create_node(Box::new(widget), Some(anim))
    }

    fn create_node(
        &mut self,
        behavior: Box<dyn Widget>,
        anim: Option<SharedAnimationState>,
    ) -> WidgetId {
        let id = self.nodes.insert(Node::new(behavior, anim));
        tracing::trace!(target: targets::TREE, ?id, type_name = self.nodes[id].type_name, "widget created");
        self.with_behavior(id, |w, cx| w.created(cx));
        id
    }

    /// Remove a widget and its subtree from the arena.
    ///
    /// A parented widget is removed from its parent first. Ids of the subtree become stale.
    pub fn dispose(&mut self, id: WidgetId) {
        assert!(id != self.root, "the GUI root cannot be disposed");
        if let Some(parent) = self.parent_of(id) {
            let index = self.child_index(parent, id).unwrap_or_default();
            self.remove_child_at(parent, index);
        } else {
            self.destroy_subtree(id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
            }
        }
    }

    /// Whether `id` refers to a live widget.
    pub fn contains(&self, id: WidgetId) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn node(&self, id: WidgetId) -> &Node {
        match self.nodes.get(id) {
            Some(node) => node,
            None => panic!("stale widget id {id:?}"),
        }
    }

    pub(crate) fn node_mut(&mut self, id: WidgetId) -> &mut Node {
        match self.nodes.get_mut(id) {
            Some(node) => node,
            None => panic!("stale widget id {id:?}"),
        }
    }

    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn base_of(&self, id: WidgetId) -> &WidgetBase {
        &self.node(id).base
    }

    pub fn base_of_mut(&mut self, id: WidgetId) -> &mut WidgetBase {
        &mut self.node_mut(id).base
    }

    pub fn parent_of(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).parent
    }

    pub fn children_of(&self, id: WidgetId) -> &[WidgetId] {
        &self.node(id).children
    }

    pub fn num_children(&self, id: WidgetId) -> usize {
        self.node(id).children.len()
    }

    /// The child at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn child(&self, id: WidgetId, index: usize) -> WidgetId {
        self.node(id).children[index]
    }

    pub fn type_name_of(&self, id: WidgetId) -> &'static str {
        self.node(id).type_name
    }

    /// Whether the widget is part of this GUI's visible tree.
    pub fn is_attached(&self, id: WidgetId) -> bool {
        self.node(id).attached
    }

    /// Borrow a widget's behavior as its concrete type.
    ///
    /// Returns `None` while one of the widget's hooks is running or if the type differs.
    pub fn widget<W: Widget>(&self, id: WidgetId) -> Option<&W> {
        let behavior = self.nodes.get(id)?.behavior.as_deref()?;
        (behavior as &dyn std::any::Any).downcast_ref::<W>()
    }

    pub fn widget_mut<W: Widget>(&mut self, id: WidgetId) -> Option<&mut W> {
        let behavior = self.nodes.get_mut(id)?.behavior.as_deref_mut()?;
        (behavior as &mut dyn std::any::Any).downcast_mut::<W>()
    }

    /// Run `f` with the widget's concrete behavior and its context.
    pub fn with_widget<W: Widget, R>(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut W, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let mut behavior = self.nodes.get_mut(id)?.behavior.take()?;
        self.hook_depth += 1;
        let result = match (behavior.as_mut() as &mut dyn std::any::Any).downcast_mut::<W>() {
            Some(widget) => Some(f(widget, &mut Cx::new(self, id))),
            None => None,
        };
        self.finish_hook(id, behavior);
        result
    }

    // ---------------------------------------------------------------------
    // Hook dispatch
    // ---------------------------------------------------------------------

    /// Call a hook on the widget's behavior.
    pub(crate) fn with_behavior<R>(
        &mut self,
        id: WidgetId,
        f: impl FnOnce(&mut dyn Widget, &mut Cx<'_>) -> R,
    ) -> R {
        let taken = self.node_mut(id).behavior.take();
        self.hook_depth += 1;
        match taken {
            Some(mut behavior) => {
                let result = f(behavior.as_mut(), &mut Cx::new(self, id));
                self.finish_hook(id, behavior);
                result
            }
            None => {
                let mut fallback = Container;
                let result = f(&mut fallback, &mut Cx::new(self, id));
                self.leave_hook();
                result
            }
        }
    }

    /// Call a hook, containing and logging a panic.
    pub(crate) fn with_behavior_guarded<R>(
        &mut self,
        boundary: &'static str,
        id: WidgetId,
        f: impl FnOnce(&mut dyn Widget, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let taken = self.node_mut(id).behavior.take();
        self.hook_depth += 1;
        match taken {
            Some(mut behavior) => {
                let result = guarded(boundary, || f(behavior.as_mut(), &mut Cx::new(self, id)));
                self.finish_hook(id, behavior);
                result
            }
            None => {
                let mut fallback = Container;
                let result = guarded(boundary, || f(&mut fallback, &mut Cx::new(self, id)));
                self.leave_hook();
                result
            }
        }
    }

    fn finish_hook(&mut self, id: WidgetId, behavior: Box<dyn Widget>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.behavior = Some(behavior);
        }
        self.leave_hook();
    }

    fn leave_hook(&mut self) {
        self.hook_depth -= 1;
        if self.hook_depth == 0 {
            self.run_deferred();
        }
    }

    /// Whether a widget hook is on the call stack.
    pub fn in_hook(&self) -> bool {
        self.hook_depth > 0
    }

    /// Run `job` once no widget hook is on the stack.
    pub fn defer(&mut self, job: impl FnOnce(&mut Gui) + 'static) {
        if self.hook_depth == 0 && !self.draining {
            job(self);
        } else {
            self.deferred.push_back(Box::new(job));
        }
    }

    fn run_deferred(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        while let Some(job) = self.deferred.pop_front() {
            guarded("deferred", || job(self));
        }
        self.draining = false;
    }

    // ---------------------------------------------------------------------
    // Timers and invoke-later
    // ---------------------------------------------------------------------

    /// Create a stopped timer. Its callback runs on the GUI thread during [`update`](Self::update).
    pub fn create_timer(&mut self) -> TimerId {
        self.timers.create()
    }

    pub fn remove_timer(&mut self, id: TimerId) -> GuiResult<()> {
        Ok(self.timers.remove(id)?)
    }

    pub fn set_timer_callback(&mut self, id: TimerId, callback: impl FnMut(&mut Gui) + 'static) {
        self.timers.set_callback(id, callback);
    }

    /// # Errors
    ///
    /// Fails for unknown timers and delays below one millisecond.
    pub fn set_timer_delay(&mut self, id: TimerId, delay: i32) -> GuiResult<()> {
        Ok(self.timers.set_delay(id, delay)?)
    }

    pub fn set_timer_continuous(&mut self, id: TimerId, continuous: bool) {
        self.timers.set_continuous(id, continuous);
    }

    pub fn start_timer(&mut self, id: TimerId) {
        self.timers.start(id);
    }

    pub fn stop_timer(&mut self, id: TimerId) {
        self.timers.stop(id);
    }

    pub fn is_timer_running(&self, id: TimerId) -> bool {
        self.timers.is_running(id)
    }

    /// Queue `job` to run during the next [`update`](Self::update).
    pub fn invoke_later(&self, job: impl FnOnce(&mut Gui) + Send + 'static) {
        self.invoke_queue.push(job);
    }

    /// A handle for queuing jobs from other threads.
    pub fn invoke_later_handle(&self) -> InvokeLaterHandle<Gui> {
        self.invoke_queue.handle()
    }

    // ---------------------------------------------------------------------
    // Frame pump
    // ---------------------------------------------------------------------

    /// Run one frame.
    #[tracing::instrument(skip_all, level = "trace", name = "trellis::frame")]
    pub fn update(&mut self) {
        let viewport = self.renderer.viewport();
        let root = self.root;
        self.set_size(root, viewport.width.max(0), viewport.height.max(0));
        self.update_time();
        self.handle_input();
        self.handle_key_repeat();
        self.handle_tooltips();
        self.update_timers();
        self.invoke_runnables();
        self.validate_gui_layout();
        self.draw();
        self.update_cursor();
    }

    /// Forget the time spent paused so timers and animations do not jump.
    pub fn resync_timer_after_pause(&mut self) {
        self.cur_time = self.renderer.time_millis();
        self.time_delta = 0;
        self.clock.set(self.cur_time);
    }

    fn update_time(&mut self) {
        let now = self.renderer.time_millis();
        self.time_delta = (now - self.cur_time).clamp(0, i64::from(i32::MAX)) as i32;
        self.cur_time = now;
        self.clock.set(now);
    }

    fn handle_input(&mut self) {
        let Some(mut input) = self.input.take() else {
            return;
        };
        let alive = input.poll_input(self);
        if self.input.is_none() {
            self.input = Some(input);
        }
        if !alive {
            self.clear_keyboard_state();
            self.clear_mouse_state();
        }
    }

    fn update_timers(&mut self) {
        for expired in self.timers.tick(self.time_delta) {
            if let Some(mut callback) = self.timers.take_callback(expired.id) {
                guarded("timer_callback", || callback(self));
                self.timers.restore_callback(expired.id, callback);
            }
            self.timers.complete(expired);
        }
    }

    fn invoke_runnables(&mut self) {
        let mut batch = self.invoke_queue.take_batch();
        for job in batch.drain(..) {
            guarded("invoke_later", || job(self));
        }
        self.invoke_queue.recycle(batch);
    }

    /// Render the tree.
    pub fn draw(&mut self) {
        if !self.renderer.start_rendering() {
            return;
        }
        let root = self.root;
        self.draw_widget(root);
        if let Err(err) = self.renderer.end_rendering() {
            tracing::warn!(target: targets::CORE, %err, "frame ended with unbalanced render state");
        }
    }

    fn update_cursor(&mut self) {
        let evt = self.event;
        let mut widget = Some(self.widget_under_mouse());
        while let Some(id) = widget {
            if self.base_of(id).is_enabled()
                && let Some(cursor) = self.with_behavior(id, |w, cx| w.mouse_cursor(cx, &evt))
            {
                self.renderer.set_cursor(Some(cursor));
                return;
            }
            widget = self.parent_of(id);
        }
        self.renderer.set_cursor(None);
    }

    /// The widget the mouse is over, following the mouse-over chain from the top pane.
    pub fn widget_under_mouse(&self) -> WidgetId {
        self.widget_under_mouse_of(self.top_pane())
    }

    /// The pane receiving input: the newest popup, or the root pane.
    pub fn top_pane(&self) -> WidgetId {
        let children = self.children_of(self.root);
        children[children.len() - 3]
    }
}

impl std::fmt::Debug for Gui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gui")
            .field("widgets", &self.nodes.len())
            .field("root_pane", &self.root_pane)
            .field("cur_time", &self.cur_time)
            .finish_non_exhaustive()
    }
}
