//! Single and multi line text input.
//!
//! Cursor and selection positions are byte offsets into the text and always sit on
//! grapheme cluster boundaries. The length limit counts characters.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use cursor_icon::CursorIcon;
use trellis_core::StateKey;
use trellis_core::logging::targets;
use trellis_render::{Color, Font, Image, Rect};
use unicode_segmentation::UnicodeSegmentation;

use super::{InfoWindow, STATE_HOVER, ScrollPane};
use crate::error::{GuiError, GuiResult};
use crate::event::{Event, EventType, Key, KeyboardModifiers, ModifierMask, MouseButton};
use crate::gui::Gui;
use crate::input_map::{InputMap, KeyStroke};
use crate::signal::{ConnectionId, Signal};
use crate::theme::ThemeInfo;
use crate::widget::{Cx, FocusGainedCause, MAX_SIZE, TooltipContent, Widget, WidgetId};

/// The field shows an error message.
pub const STATE_ERROR: StateKey = StateKey::new("error");
pub const STATE_READONLY: StateKey = StateKey::new("readonly");
/// Reset whenever the cursor moves; drives cursor blinking.
pub const STATE_CURSOR_MOVED: StateKey = StateKey::new("cursorMoved");

const DEFAULT_COLUMNS: i32 = 5;
const DEFAULT_PASSWORD_CHAR: char = '*';
const DEFAULT_AUTO_COMPLETION_HEIGHT: i32 = 100;
/// Distance kept between the cursor and the left or right edge while scrolling.
const SCROLL_MARGIN: i32 = 5;

/// Why the [`EditField::callback`] signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditFieldCallbackKind {
    /// The text was edited or replaced.
    TextChanged,
    /// Return was pressed in a single line field.
    Return,
    Escape,
    /// A key the field does not handle, forwarded because
    /// [`EditField::set_forward_unhandled_keys_to_callback`] is on.
    UnhandledKey,
}

/// Payload of [`EditField::callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditFieldCallback {
    pub kind: EditFieldCallbackKind,
    /// The key that caused the callback, [`Key::None`] for programmatic changes.
    pub key: Key,
}

/// Supplies auto-completion suggestions for an [`EditField`].
pub trait AutoCompletionDataSource {
    /// Suggestions for `text` with the cursor at byte offset `cursor`. An empty result
    /// closes the completion window.
    fn collect_suggestions(&self, text: &str, cursor: usize) -> Vec<String>;
}

/// A string value an [`EditField`] edits.
pub trait StringModel {
    fn value(&self) -> String;

    /// Store a new value. A rejected value is reported to the user as the field's
    /// error message.
    fn set_value(&self, gui: &mut Gui, value: &str) -> GuiResult<()>;

    /// Emitted after the value changed.
    fn changes(&self) -> &Signal<()>;
}

/// A [`StringModel`] holding a string, optionally limited in length.
///
/// ```
/// use trellis::widgets::{SimpleStringModel, StringModel};
/// use trellis::{Gui, GuiConfig};
/// use trellis_render::HeadlessRenderer;
///
/// let mut gui = Gui::new(Box::new(HeadlessRenderer::new(64, 64)), GuiConfig::default());
/// let model = SimpleStringModel::with_max_length(3);
/// assert!(model.set_value(&mut gui, "abc").is_ok());
/// assert!(model.set_value(&mut gui, "abcd").is_err());
/// assert_eq!(model.value(), "abc");
/// ```
#[derive(Default)]
pub struct SimpleStringModel {
    value: RefCell<String>,
    max_length: Option<usize>,
    changes: Signal<()>,
}

impl SimpleStringModel {
    pub fn new(value: &str) -> Self {
        Self {
            value: RefCell::new(value.to_owned()),
            ..Self::default()
        }
    }

    /// A model rejecting values longer than `max` characters.
    pub fn with_max_length(max: usize) -> Self {
        Self {
            max_length: Some(max),
            ..Self::default()
        }
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl StringModel for SimpleStringModel {
    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_value(&self, gui: &mut Gui, value: &str) -> GuiResult<()> {
        if let Some(max) = self.max_length
            && value.chars().count() > max
        {
            return Err(GuiError::TextTooLong { max });
        }
        if *self.value.borrow() == value {
            return Ok(());
        }
        *self.value.borrow_mut() = value.to_owned();
        self.changes.emit(gui, ());
        Ok(())
    }

    fn changes(&self) -> &Signal<()> {
        &self.changes
    }
}

/// A text input field.
///
/// Typed characters are inserted at the cursor; Shift extends the selection while
/// moving. Double click selects a word and triple click selects everything. The
/// default input map binds Ctrl+X/C/V/A to cut, copy, paste and select all, and Ctrl+D
/// to duplicating the current line in multi line mode.
///
/// ```
/// use trellis::widgets::EditField;
/// use trellis::{Gui, GuiConfig, Key};
/// use trellis_render::HeadlessRenderer;
///
/// let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 100)), GuiConfig::default());
/// let field = gui.create(EditField::new());
/// let root = gui.root_pane();
/// gui.add(root, field);
/// gui.request_keyboard_focus(field);
///
/// gui.handle_key(Key::H, Some('h'), true);
/// gui.handle_key(Key::I, Some('i'), true);
/// assert_eq!(gui.widget::<EditField>(field).unwrap().text(), "hi");
/// ```
pub struct EditField {
    text: String,
    cursor_pos: usize,
    selection_start: usize,
    selection_end: usize,
    scroll_pos: i32,
    pending_scroll: Option<bool>,
    num_lines: usize,

    multi_line: bool,
    read_only: bool,
    password_masking: bool,
    password_char: char,
    max_text_length: usize,
    columns: i32,
    forward_unhandled_keys: bool,
    auto_completion_on_set_text: bool,

    text_color: Color,
    selection_color: Color,
    cursor_image: Option<Rc<dyn Image>>,
    selection_image: Option<Rc<dyn Image>>,

    error_msg: Option<String>,
    error_msg_from_model: bool,
    error_window: Option<(WidgetId, WidgetId)>,

    completion_source: Option<Rc<dyn AutoCompletionDataSource>>,
    completion_window: Option<(WidgetId, WidgetId)>,
    completion_height: i32,

    model: Option<Rc<dyn StringModel>>,
    model_connection: Option<ConnectionId>,

    /// Fired on text changes, Return, Escape and forwarded keys.
    pub callback: Signal<EditFieldCallback>,
}

impl Default for EditField {
    fn default() -> Self {
        Self::new()
    }
}

impl EditField {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            cursor_pos: 0,
            selection_start: 0,
            selection_end: 0,
            scroll_pos: 0,
            pending_scroll: None,
            num_lines: 1,
            multi_line: false,
            read_only: false,
            password_masking: false,
            password_char: DEFAULT_PASSWORD_CHAR,
            max_text_length: MAX_SIZE as usize,
            columns: DEFAULT_COLUMNS,
            forward_unhandled_keys: false,
            auto_completion_on_set_text: false,
            text_color: Color::BLACK,
            selection_color: Color::from_rgba(0.6, 0.75, 1.0, 1.0),
            cursor_image: None,
            selection_image: None,
            error_msg: None,
            error_msg_from_model: false,
            error_window: None,
            completion_source: None,
            completion_window: None,
            completion_height: DEFAULT_AUTO_COMPLETION_HEIGHT,
            model: None,
            model_connection: None,
            callback: Signal::new(),
        }
    }

    fn default_input_map() -> Rc<InputMap> {
        Rc::new(
            InputMap::new()
                .with(KeyStroke::new(Key::X, KeyboardModifiers::CTRL, "cut"))
                .with(KeyStroke::new(Key::C, KeyboardModifiers::CTRL, "copy"))
                .with(KeyStroke::new(Key::V, KeyboardModifiers::CTRL, "paste"))
                .with(KeyStroke::new(Key::A, KeyboardModifiers::CTRL, "selectAll"))
                .with(KeyStroke::new(Key::D, KeyboardModifiers::CTRL, "duplicateLineDown")),
        )
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text. The length limit applies; the selection is cleared.
    pub fn set_text(&mut self, cx: &mut Cx<'_>, text: &str) {
        self.replace_text(cx, text, false);
    }

    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    /// Move the cursor to the byte offset `pos`, clearing the selection.
    pub fn set_cursor_pos(&mut self, cx: &mut Cx<'_>, pos: usize) {
        let pos = self.snap(pos);
        self.move_cursor(cx, pos, false);
    }

    pub fn selection_start(&self) -> usize {
        self.selection_start
    }

    pub fn selection_end(&self) -> usize {
        self.selection_end
    }

    pub fn has_selection(&self) -> bool {
        self.selection_start != self.selection_end
    }

    pub fn selected_text(&self) -> &str {
        &self.text[self.selection_start..self.selection_end]
    }

    /// Select the byte range `start..end`; the cursor moves to `end`.
    pub fn set_selection(&mut self, cx: &mut Cx<'_>, start: usize, end: usize) {
        let (start, end) = (self.snap(start), self.snap(end));
        self.selection_start = start.min(end);
        self.selection_end = start.max(end);
        self.move_cursor(cx, end, true);
    }

    pub fn select_all(&mut self, cx: &mut Cx<'_>) {
        self.selection_start = 0;
        self.selection_end = self.text.len();
        let end = self.text.len();
        self.move_cursor(cx, end, true);
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, cx: &mut Cx<'_>, read_only: bool) {
        self.read_only = read_only;
        cx.base().set_animation_state(STATE_READONLY, read_only);
    }

    pub fn is_multi_line(&self) -> bool {
        self.multi_line
    }

    /// Switching to single line mode strips the line breaks from the text.
    pub fn set_multi_line(&mut self, cx: &mut Cx<'_>, multi_line: bool) {
        if self.multi_line == multi_line {
            return;
        }
        self.multi_line = multi_line;
        if !multi_line && self.text.contains('\n') {
            let stripped = strip_new_lines(&self.text).into_owned();
            self.replace_text(cx, &stripped, false);
        } else {
            self.update_line_count(cx);
        }
    }

    pub fn is_password_masking(&self) -> bool {
        self.password_masking
    }

    /// Show every character as the password character. Copying and cutting put the
    /// masked text on the clipboard.
    pub fn set_password_masking(&mut self, cx: &mut Cx<'_>, masking: bool) {
        self.password_masking = masking;
        let id = cx.id();
        cx.invalidate_layout_locally(id);
    }

    pub fn password_char(&self) -> char {
        self.password_char
    }

    pub fn set_password_char(&mut self, ch: char) {
        self.password_char = ch;
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    /// Limit the text to `max` characters, truncating the current text if needed.
    pub fn set_max_text_length(&mut self, cx: &mut Cx<'_>, max: usize) {
        self.max_text_length = max;
        if self.text_length() > max {
            let truncated = truncate_chars(&self.text, max).to_owned();
            self.replace_text(cx, &truncated, false);
        }
    }

    pub fn columns(&self) -> i32 {
        self.columns
    }

    /// The number of `X` widths the preferred width is sized for.
    ///
    /// # Panics
    ///
    /// Panics if `columns` is negative.
    pub fn set_columns(&mut self, cx: &mut Cx<'_>, columns: i32) {
        assert!(columns >= 0, "columns must not be negative");
        self.columns = columns;
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    /// Horizontal scroll offset of the text in pixels.
    pub fn scroll_pos(&self) -> i32 {
        self.scroll_pos
    }

    pub fn is_forward_unhandled_keys_to_callback(&self) -> bool {
        self.forward_unhandled_keys
    }

    /// Report keys the field does not handle through [`EditFieldCallbackKind::UnhandledKey`]
    /// and consume them.
    pub fn set_forward_unhandled_keys_to_callback(&mut self, forward: bool) {
        self.forward_unhandled_keys = forward;
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.text_color = color;
    }

    pub fn set_auto_completion(&mut self, source: Option<Rc<dyn AutoCompletionDataSource>>) {
        self.completion_source = source;
    }

    /// Whether [`set_text`](Self::set_text) and model changes also refresh suggestions.
    pub fn set_auto_completion_on_set_text(&mut self, enabled: bool) {
        self.auto_completion_on_set_text = enabled;
    }

    pub fn is_auto_completion_open(&self, gui: &Gui) -> bool {
        self.completion_window
            .is_some_and(|(window, _)| InfoWindow::is_open(gui, window))
    }

    /// The suggestions shown in the completion window.
    pub fn auto_completion_suggestions<'g>(&self, gui: &'g Gui) -> &'g [String] {
        self.completion_window
            .and_then(|(_, list)| gui.widget::<CompletionList>(list))
            .map(|list| list.suggestions.as_slice())
            .unwrap_or_default()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_msg.as_deref()
    }

    /// Show `msg` below the field while it has keyboard focus, or clear the error.
    pub fn set_error_message(&mut self, cx: &mut Cx<'_>, msg: Option<String>) {
        self.error_msg_from_model = false;
        let id = cx.id();
        cx.base().set_animation_state(STATE_ERROR, msg.is_some());
        self.error_msg = msg;
        if self.error_msg.is_some() {
            if cx.has_keyboard_focus(id) {
                self.open_error_window(cx);
            }
        } else {
            self.close_error_window(cx);
        }
        cx.update_tooltip(id);
    }

    // =========================================================================
    // Model
    // =========================================================================

    pub fn model(&self) -> Option<&Rc<dyn StringModel>> {
        self.model.as_ref()
    }

    /// Bind the field to `model`; the text follows the model and edits are written back.
    pub fn set_model(&mut self, cx: &mut Cx<'_>, model: Option<Rc<dyn StringModel>>) {
        self.disconnect_model();
        if let Some(model) = &model {
            let id = cx.id();
            let connection = model.changes().connect(move |gui: &mut Gui, _: &()| {
                gui.with_widget::<EditField, _>(id, |field, cx| field.model_changed(cx));
            });
            self.model_connection = Some(connection);
        }
        self.model = model;
        self.model_changed(cx);
    }

    fn disconnect_model(&mut self) {
        if let (Some(model), Some(connection)) = (&self.model, self.model_connection.take()) {
            model.changes().disconnect(connection);
        }
    }

    fn model_changed(&mut self, cx: &mut Cx<'_>) {
        let Some(model) = self.model.clone() else {
            return;
        };
        let value = model.value();
        if value != self.text {
            self.replace_text(cx, &value, true);
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Insert `text` at the cursor, replacing the selection. Text beyond the length
    /// limit is dropped.
    pub fn insert_text(&mut self, cx: &mut Cx<'_>, text: &str) {
        if self.read_only {
            return;
        }
        let mut update = false;
        if self.has_selection() {
            self.remove_selection();
            update = true;
        }
        let remaining = self.max_text_length.saturating_sub(self.text_length());
        let insert = truncate_chars(text, remaining);
        if !insert.is_empty() {
            self.text.insert_str(self.cursor_pos, insert);
            self.cursor_pos += insert.len();
            update = true;
        }
        if update {
            self.update_text(cx, true, false, Key::None);
            self.scroll_to_cursor(cx, false);
        }
    }

    /// Insert a typed character. Control characters are ignored except a line break in
    /// multi line mode.
    pub fn insert_char(&mut self, cx: &mut Cx<'_>, ch: char) -> bool {
        if self.read_only || (ch.is_control() && !(self.multi_line && ch == '\n')) {
            return false;
        }
        let mut update = false;
        if self.has_selection() {
            self.remove_selection();
            update = true;
        }
        if self.text_length() < self.max_text_length {
            self.text.insert(self.cursor_pos, ch);
            self.cursor_pos += ch.len_utf8();
            update = true;
        }
        if update {
            self.update_text(cx, true, false, Key::None);
            self.scroll_to_cursor(cx, false);
        }
        true
    }

    pub fn delete_selection(&mut self, cx: &mut Cx<'_>) {
        if self.read_only || !self.has_selection() {
            return;
        }
        self.remove_selection();
        self.update_text(cx, true, false, Key::Delete);
        self.scroll_to_cursor(cx, false);
    }

    fn remove_selection(&mut self) {
        self.text.replace_range(self.selection_start..self.selection_end, "");
        self.cursor_pos = self.selection_start;
        self.selection_end = self.selection_start;
    }

    fn delete_prev(&mut self, cx: &mut Cx<'_>) {
        if self.read_only {
            return;
        }
        if self.has_selection() {
            self.delete_selection(cx);
        } else if self.cursor_pos > 0 {
            let start = prev_grapheme(&self.text, self.cursor_pos);
            self.text.replace_range(start..self.cursor_pos, "");
            self.cursor_pos = start;
            self.clear_selection_at_cursor();
            self.update_text(cx, true, false, Key::Backspace);
            self.scroll_to_cursor(cx, false);
        }
    }

    fn delete_next(&mut self, cx: &mut Cx<'_>) {
        if self.read_only {
            return;
        }
        if self.has_selection() {
            self.delete_selection(cx);
        } else if self.cursor_pos < self.text.len() {
            let end = next_grapheme(&self.text, self.cursor_pos);
            self.text.replace_range(self.cursor_pos..end, "");
            self.clear_selection_at_cursor();
            self.update_text(cx, true, false, Key::Delete);
        }
    }

    fn clear_selection_at_cursor(&mut self) {
        self.selection_start = self.cursor_pos;
        self.selection_end = self.cursor_pos;
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Cut the selection, or the whole text if nothing is selected. A read only field
    /// only copies.
    pub fn cut_to_clipboard(&mut self, cx: &mut Cx<'_>) {
        if !self.has_selection() {
            self.select_all(cx);
        }
        let text = self.masked(self.selected_text()).into_owned();
        if !self.read_only {
            self.delete_selection(cx);
        }
        cx.clipboard_mut().set_text(&text);
    }

    /// Copy the selection, or the whole text if nothing is selected.
    pub fn copy_to_clipboard(&mut self, cx: &mut Cx<'_>) {
        let source = if self.has_selection() {
            self.selected_text()
        } else {
            &self.text
        };
        let text = self.masked(source).into_owned();
        cx.clipboard_mut().set_text(&text);
    }

    /// Insert the clipboard text; line breaks are dropped in single line mode.
    pub fn paste_from_clipboard(&mut self, cx: &mut Cx<'_>) {
        let Some(text) = cx.clipboard().get_text() else {
            return;
        };
        if self.multi_line {
            self.insert_text(cx, &text);
        } else {
            self.insert_text(cx, &strip_new_lines(&text));
        }
    }

    /// Insert a copy of the lines touched by the cursor or selection below them.
    pub fn duplicate_line_down(&mut self, cx: &mut Cx<'_>) {
        if !self.multi_line || self.read_only {
            return;
        }
        let (from, to) = if self.has_selection() {
            (self.selection_start, self.selection_end)
        } else {
            (self.cursor_pos, self.cursor_pos)
        };
        let start = self.line_start(from);
        let end = self.line_end(to);
        let copy = format!("\n{}", &self.text[start..end]);
        if self.text_length() + copy.chars().count() > self.max_text_length {
            return;
        }
        self.text.insert_str(end, &copy);
        let pos = self.cursor_pos + copy.len();
        self.move_cursor(cx, pos, false);
        self.update_text(cx, true, false, Key::None);
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    /// Snap `pos` into the text and down to a character boundary.
    fn snap(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    /// Move the cursor, extending the selection from the old position when `select`.
    fn move_cursor(&mut self, cx: &mut Cx<'_>, pos: usize, select: bool) {
        if !select {
            self.selection_start = pos;
            self.selection_end = pos;
        }
        if self.cursor_pos == pos {
            return;
        }
        if select {
            if self.has_selection() {
                if self.cursor_pos == self.selection_start {
                    self.selection_start = pos;
                } else {
                    self.selection_end = pos;
                }
            } else {
                self.selection_start = self.cursor_pos;
                self.selection_end = pos;
            }
            if self.selection_start > self.selection_end {
                std::mem::swap(&mut self.selection_start, &mut self.selection_end);
            }
        }
        self.cursor_pos = pos;
        cx.base()
            .animation_state()
            .borrow_mut()
            .reset_animation_time(STATE_CURSOR_MOVED);
        self.scroll_to_cursor(cx, false);
    }

    fn move_cursor_x(&mut self, cx: &mut Cx<'_>, forward: bool, select: bool) {
        let pos = if !select && self.has_selection() {
            if forward {
                self.selection_end
            } else {
                self.selection_start
            }
        } else if forward {
            next_grapheme(&self.text, self.cursor_pos)
        } else {
            prev_grapheme(&self.text, self.cursor_pos)
        };
        self.move_cursor(cx, pos, select);
    }

    fn move_cursor_y(&mut self, cx: &mut Cx<'_>, down: bool, select: bool) {
        let font = cx.font();
        let x = self.text_x(font.as_ref(), self.cursor_pos);
        let target_start = if down {
            let end = self.line_end(self.cursor_pos);
            if end == self.text.len() {
                self.move_cursor(cx, end, select);
                return;
            }
            end + 1
        } else {
            let start = self.line_start(self.cursor_pos);
            if start == 0 {
                self.move_cursor(cx, 0, select);
                return;
            }
            self.line_start(start - 1)
        };
        let target_end = self.line_end(target_start);
        let pos = self.pos_from_x(font.as_ref(), x, target_start, target_end);
        self.move_cursor(cx, pos, select);
    }

    fn select_word_at(&mut self, cx: &mut Cx<'_>, pos: usize) {
        let start = self.text[..pos]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map_or(0, |(i, c)| i + c.len_utf8());
        let end = self.text[pos..]
            .find(char::is_whitespace)
            .map_or(self.text.len(), |i| pos + i);
        self.selection_start = start;
        self.selection_end = end;
        self.move_cursor(cx, end, true);
    }

    // =========================================================================
    // Lines and geometry
    // =========================================================================

    fn line_start(&self, pos: usize) -> usize {
        if !self.multi_line {
            return 0;
        }
        self.text[..pos].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        if !self.multi_line {
            return self.text.len();
        }
        self.text[pos..].find('\n').map_or(self.text.len(), |i| pos + i)
    }

    fn line_number(&self, pos: usize) -> usize {
        if !self.multi_line {
            return 0;
        }
        self.text[..pos].matches('\n').count()
    }

    fn nth_line_start(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        match self.text.match_indices('\n').nth(line - 1) {
            Some((i, _)) => i + 1,
            None => self.line_start(self.text.len()),
        }
    }

    /// The text as shown: one password character per grapheme when masking.
    fn masked<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.password_masking {
            let count = text.graphemes(true).count();
            Cow::Owned(std::iter::repeat_n(self.password_char, count).collect())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// X offset of `pos` from the start of its line, ignoring scrolling.
    fn text_x(&self, font: &dyn Font, pos: usize) -> i32 {
        let start = self.line_start(pos);
        font.compute_text_width(&self.masked(&self.text[start..pos]))
    }

    /// The position in `start..end` closest to the line relative `x`.
    fn pos_from_x(&self, font: &dyn Font, x: i32, start: usize, end: usize) -> usize {
        let line = &self.text[start..end];
        let shown = self.masked(line);
        let prefix = font.visible_prefix_len(&shown, x + font.space_width() / 2);
        let count = shown[..prefix].graphemes(true).count();
        start + grapheme_offset(line, count)
    }

    fn pos_from_mouse(&self, cx: &Cx<'_>, mx: i32, my: i32) -> usize {
        let font = cx.font();
        let base = cx.base();
        let x = mx - base.inner_x() + self.scroll_pos;
        let start = if self.multi_line {
            let line = (my - base.inner_y()).max(0) / font.line_height().max(1);
            self.nth_line_start(usize::try_from(line).unwrap_or(0))
        } else {
            0
        };
        let end = self.line_end(start);
        self.pos_from_x(font.as_ref(), x, start, end)
    }

    fn scroll_to_cursor(&mut self, cx: &mut Cx<'_>, force: bool) {
        let render_width = cx.base().inner_width() - SCROLL_MARGIN;
        if render_width <= 0 {
            self.pending_scroll = Some(force || self.pending_scroll == Some(true));
            return;
        }
        self.pending_scroll = None;
        let font = cx.font();
        let x = self.text_x(font.as_ref(), self.cursor_pos);
        if x < self.scroll_pos + SCROLL_MARGIN {
            self.scroll_pos = (x - SCROLL_MARGIN).max(0);
        } else if force || x - self.scroll_pos > render_width {
            self.scroll_pos = (x - render_width).max(0);
        }
        if self.multi_line {
            let id = cx.id();
            if let Some(pane) = ScrollPane::containing_scroll_pane(cx, id) {
                let line_height = font.line_height();
                let line_y = i32::try_from(self.line_number(self.cursor_pos))
                    .unwrap_or(i32::MAX / line_height.max(1))
                    * line_height;
                ScrollPane::scroll_to_area_y(cx, pane, line_y, line_height, line_height / 2);
            }
        }
    }

    // =========================================================================
    // Text updates
    // =========================================================================

    fn replace_text(&mut self, cx: &mut Cx<'_>, text: &str, from_model: bool) {
        let text = truncate_chars(text, self.max_text_length);
        self.text.clear();
        self.text.push_str(text);
        self.cursor_pos = if self.multi_line { 0 } else { self.text.len() };
        self.selection_start = 0;
        self.selection_end = 0;
        let completion = self.auto_completion_on_set_text;
        self.update_text(cx, completion, from_model, Key::None);
        self.scroll_to_cursor(cx, true);
    }

    fn update_text(&mut self, cx: &mut Cx<'_>, update_completion: bool, from_model: bool, key: Key) {
        if !from_model && let Some(model) = self.model.clone() {
            match model.set_value(cx, &self.text) {
                Ok(()) => {
                    if self.error_msg_from_model {
                        self.set_error_message(cx, None);
                    }
                }
                Err(err) => {
                    tracing::debug!(target: targets::TEXT, %err, "model rejected edit field text");
                    self.set_error_message(cx, Some(err.to_string()));
                    self.error_msg_from_model = true;
                }
            }
        }
        self.update_line_count(cx);
        self.do_callback(cx, EditFieldCallbackKind::TextChanged, key);
        if update_completion {
            self.update_auto_completion(cx);
        }
    }

    fn update_line_count(&mut self, cx: &mut Cx<'_>) {
        let lines = if self.multi_line {
            self.text.matches('\n').count() + 1
        } else {
            1
        };
        if lines != self.num_lines {
            self.num_lines = lines;
            let id = cx.id();
            cx.invalidate_layout(id);
        }
    }

    fn do_callback(&self, cx: &mut Cx<'_>, kind: EditFieldCallbackKind, key: Key) {
        self.callback.emit(cx, EditFieldCallback { kind, key });
    }

    // =========================================================================
    // Error window
    // =========================================================================

    fn open_error_window(&mut self, cx: &mut Cx<'_>) {
        if self.is_auto_completion_open(cx) {
            return;
        }
        let Some(msg) = self.error_msg.clone() else {
            return;
        };
        let (window, label) = match self.error_window {
            Some(ids) => ids,
            None => {
                let owner = cx.id();
                let ids = create_info_window(cx, owner, MessageLabel::default());
                self.error_window = Some(ids);
                ids
            }
        };
        if let Some(label) = cx.widget_mut::<MessageLabel>(label) {
            label.text = msg;
        }
        if InfoWindow::open_info(cx, window) {
            self.layout_error_window(cx);
        }
    }

    fn close_error_window(&mut self, cx: &mut Cx<'_>) {
        if let Some((window, _)) = self.error_window {
            InfoWindow::close_info(cx, window);
        }
    }

    fn layout_error_window(&mut self, cx: &mut Cx<'_>) {
        let Some((window, label)) = self.error_window else {
            return;
        };
        let Some(container) = cx.parent_of(window) else {
            return;
        };
        let border = cx.base_of(window).border();
        let preferred = cx.preferred_width(label) + border.horizontal();
        let height = cx.preferred_height(label) + border.vertical();
        let base = cx.base();
        let width = base.width().max(preferred);
        let (mut x, y) = (base.x(), base.bottom());
        let container_base = cx.base_of(container);
        let max_right = container_base.inner_right();
        if x + width > max_right {
            x = max_right - width.min(container_base.inner_width());
        }
        cx.set_size(window, width, height);
        cx.set_position(window, x, y);
        cx.layout_child_full_inner_area(window, label);
    }

    // =========================================================================
    // Auto-completion
    // =========================================================================

    fn update_auto_completion(&mut self, cx: &mut Cx<'_>) {
        let Some(source) = self.completion_source.clone() else {
            return;
        };
        let id = cx.id();
        if !cx.has_keyboard_focus(id) {
            return;
        }
        let suggestions = source.collect_suggestions(&self.text, self.cursor_pos);
        if suggestions.is_empty() {
            self.close_completion_window(cx);
            return;
        }
        let (window, list) = match self.completion_window {
            Some(ids) => ids,
            None => {
                let ids = create_info_window(cx, id, CompletionList::new(id));
                self.completion_window = Some(ids);
                ids
            }
        };
        if let Some(list) = cx.widget_mut::<CompletionList>(list) {
            list.suggestions = suggestions;
            list.selected = None;
        }
        if InfoWindow::open_info(cx, window) {
            self.layout_completion_window(cx);
        }
    }

    fn close_completion_window(&mut self, cx: &mut Cx<'_>) {
        if let Some((window, _)) = self.completion_window {
            InfoWindow::close_info(cx, window);
        }
    }

    fn layout_completion_window(&mut self, cx: &mut Cx<'_>) {
        let Some((window, list)) = self.completion_window else {
            return;
        };
        let Some(container) = cx.parent_of(window) else {
            return;
        };
        let base = cx.base();
        let (x, width) = (base.x(), base.width());
        let mut y = base.bottom();
        let height = self.completion_height;
        if y + height > cx.base_of(container).inner_bottom() {
            y = (cx.base().y() - height).max(cx.base_of(container).inner_y());
        }
        cx.set_size(window, width, height);
        cx.set_position(window, x, y);
        cx.layout_child_full_inner_area(window, list);
    }

    /// Replace the text with an accepted suggestion.
    fn accept_completion(&mut self, cx: &mut Cx<'_>, text: &str) {
        self.close_completion_window(cx);
        self.replace_text(cx, text, false);
        let id = cx.id();
        cx.request_keyboard_focus(id);
    }

    /// Keys steering an open completion window. Returns `None` when the key is not
    /// meant for the window.
    fn handle_completion_key(&mut self, cx: &mut Cx<'_>, evt: &Event) -> Option<bool> {
        let (_, list) = self.completion_window?;
        match evt.key_code() {
            Key::ArrowUp | Key::ArrowDown => {
                let down = evt.key_code() == Key::ArrowDown;
                let widget = cx.widget_mut::<CompletionList>(list)?;
                widget.move_selection(down);
                Some(true)
            }
            Key::Enter | Key::NumpadEnter => {
                let choice = cx
                    .widget::<CompletionList>(list)
                    .and_then(CompletionList::selected_text)
                    .map(str::to_owned);
                match choice {
                    Some(text) => {
                        self.accept_completion(cx, &text);
                        Some(true)
                    }
                    None => {
                        self.close_completion_window(cx);
                        None
                    }
                }
            }
            Key::Escape => {
                self.close_completion_window(cx);
                Some(true)
            }
            _ => None,
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    fn handle_key_pressed(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if self.is_auto_completion_open(cx)
            && let Some(handled) = self.handle_completion_key(cx, evt)
        {
            return handled;
        }
        let select = evt.modifiers().intersects(ModifierMask::SHIFT);
        let key = evt.key_code();
        match key {
            Key::Backspace => self.delete_prev(cx),
            Key::Delete => self.delete_next(cx),
            Key::Enter | Key::NumpadEnter => {
                if self.multi_line {
                    if !evt.has_key_char_no_modifiers() {
                        return self.forward_unhandled(cx, key);
                    }
                    self.insert_char(cx, '\n');
                } else {
                    self.do_callback(cx, EditFieldCallbackKind::Return, key);
                }
            }
            Key::Escape => self.do_callback(cx, EditFieldCallbackKind::Escape, key),
            Key::Home => {
                let pos = self.line_start(self.cursor_pos);
                self.move_cursor(cx, pos, select);
            }
            Key::End => {
                let pos = self.line_end(self.cursor_pos);
                self.move_cursor(cx, pos, select);
            }
            Key::ArrowLeft => self.move_cursor_x(cx, false, select),
            Key::ArrowRight => self.move_cursor_x(cx, true, select),
            Key::ArrowUp | Key::ArrowDown if self.multi_line => {
                self.move_cursor_y(cx, key == Key::ArrowDown, select);
            }
            Key::Tab => return false,
            _ => {
                if evt.has_key_char_no_modifiers()
                    && let Some(ch) = evt.key_char()
                    && self.insert_char(cx, ch)
                {
                    return true;
                }
                return self.forward_unhandled(cx, key);
            }
        }
        true
    }

    fn forward_unhandled(&mut self, cx: &mut Cx<'_>, key: Key) -> bool {
        if self.forward_unhandled_keys {
            self.do_callback(cx, EditFieldCallbackKind::UnhandledKey, key);
            return true;
        }
        false
    }

    fn handle_key_released(&self, evt: &Event) -> bool {
        match evt.key_code() {
            Key::Backspace
            | Key::Delete
            | Key::Enter
            | Key::NumpadEnter
            | Key::Escape
            | Key::Home
            | Key::End
            | Key::ArrowLeft
            | Key::ArrowRight => true,
            Key::ArrowUp | Key::ArrowDown => self.multi_line,
            _ => evt.key_char().is_some_and(|c| !c.is_control()) || self.forward_unhandled_keys,
        }
    }
}

impl Drop for EditField {
    fn drop(&mut self) {
        self.disconnect_model();
    }
}

impl Widget for EditField {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let base = cx.base_mut();
        base.set_can_accept_keyboard_focus(true);
        base.set_clip(true);
        base.set_input_map(Some(Self::default_input_map()));
    }

    fn destroy(&mut self, cx: &mut Cx<'_>) {
        for (window, _) in [self.error_window.take(), self.completion_window.take()]
            .into_iter()
            .flatten()
        {
            InfoWindow::close_info(cx, window);
            cx.dispose(window);
        }
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        if cx.base().input_map().is_none() {
            cx.base_mut().set_input_map(Some(Self::default_input_map()));
        }
        self.text_color = theme.get_color("textColor", self.text_color);
        self.selection_color = theme.get_color("selectionColor", self.selection_color);
        self.cursor_image = theme.get_image("cursor");
        self.selection_image = theme.get_image("selection");
        self.completion_height = theme
            .get_int("autocompletion-height", DEFAULT_AUTO_COMPLETION_HEIGHT)
            .max(0);
        self.columns = theme.get_int("columns", self.columns).max(0);
        if let Some(ch) = theme.get_string("passwordChar").and_then(|s| s.chars().next()) {
            self.password_char = ch;
        }
    }

    fn handle_key_stroke_action(&mut self, cx: &mut Cx<'_>, action: &str, _evt: &Event) -> bool {
        match action {
            "cut" => self.cut_to_clipboard(cx),
            "copy" => self.copy_to_clipboard(cx),
            "paste" => self.paste_from_clipboard(cx),
            "selectAll" => self.select_all(cx),
            "duplicateLineDown" => self.duplicate_line_down(cx),
            _ => return false,
        }
        true
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt) {
            return true;
        }
        if evt.is_mouse_event() {
            let hover = evt.event_type() != EventType::MouseExited
                && cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
            cx.base().set_animation_state(STATE_HOVER, hover);
        }
        if evt.is_mouse_drag_event() {
            if evt.event_type() == EventType::MouseDragged
                && evt.modifiers().intersects(ModifierMask::LBUTTON)
            {
                let pos = self.pos_from_mouse(cx, evt.mouse_x(), evt.mouse_y());
                self.move_cursor(cx, pos, true);
            }
            return true;
        }
        match evt.event_type() {
            EventType::KeyPressed => self.handle_key_pressed(cx, evt),
            EventType::KeyReleased => self.handle_key_released(evt),
            EventType::MouseBtnDown => {
                if evt.mouse_button() == Some(MouseButton::Left)
                    && cx.base().is_inside(evt.mouse_x(), evt.mouse_y())
                {
                    let pos = self.pos_from_mouse(cx, evt.mouse_x(), evt.mouse_y());
                    let select = evt.modifiers().intersects(ModifierMask::SHIFT);
                    self.move_cursor(cx, pos, select);
                }
                true
            }
            EventType::MouseClicked => {
                match evt.click_count() {
                    2 => {
                        let pos = self.pos_from_mouse(cx, evt.mouse_x(), evt.mouse_y());
                        self.select_word_at(cx, pos);
                    }
                    3 => self.select_all(cx),
                    _ => {}
                }
                true
            }
            EventType::MouseWheel => false,
            _ => evt.is_mouse_event(),
        }
    }

    fn mouse_cursor(&mut self, cx: &mut Cx<'_>, _evt: &Event) -> Option<CursorIcon> {
        cx.base().mouse_cursor().or(Some(CursorIcon::Text))
    }

    fn tooltip_content_at(&mut self, cx: &mut Cx<'_>, _x: i32, _y: i32) -> Option<TooltipContent> {
        if let Some(msg) = &self.error_msg {
            return Some(TooltipContent::Text(msg.clone()));
        }
        let base = cx.base();
        if let Some(content) = base.tooltip_content() {
            return Some(content.clone());
        }
        if let Some(text) = base.theme_tooltip_content() {
            return Some(TooltipContent::Text(text.to_owned()));
        }
        let id = cx.id();
        if self.password_masking || self.multi_line || cx.has_keyboard_focus(id) {
            return None;
        }
        let width = cx.font().compute_text_width(&self.text);
        (width > cx.base().inner_width()).then(|| TooltipContent::Text(self.text.clone()))
    }

    fn keyboard_focus_gained(
        &mut self,
        cx: &mut Cx<'_>,
        _cause: FocusGainedCause,
        _previous: Option<WidgetId>,
    ) {
        if self.error_msg.is_some() {
            self.open_error_window(cx);
        } else {
            self.update_auto_completion(cx);
        }
    }

    fn keyboard_focus_lost(&mut self, cx: &mut Cx<'_>) {
        self.close_error_window(cx);
        self.close_completion_window(cx);
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        if let Some(force) = self.pending_scroll {
            self.scroll_to_cursor(cx, force);
        }
        self.layout_error_window(cx);
        self.layout_completion_window(cx);
    }

    fn position_changed(&mut self, cx: &mut Cx<'_>) {
        self.layout_error_window(cx);
        self.layout_completion_window(cx);
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let font = cx.font();
        let line_height = font.line_height();
        let inner = cx.base().inner_rect();
        let id = cx.id();
        let x0 = inner.x - self.scroll_pos;
        let mut y = inner.y;
        let mut start = 0;
        for line in self.text.split('\n') {
            let end = start + line.len();
            let sel_start = self.selection_start.max(start);
            let sel_end = self.selection_end.min(end);
            if self.has_selection() && sel_start < sel_end {
                let sx = font.compute_text_width(&self.masked(&self.text[start..sel_start]));
                let ex = font.compute_text_width(&self.masked(&self.text[start..sel_end]));
                let rect = Rect::new(x0 + sx, y, ex - sx, line_height);
                match &self.selection_image {
                    Some(image) => cx.draw_image(image, rect),
                    None => cx.fill_rect(rect, self.selection_color),
                }
            }
            let shown = self.masked(line);
            cx.draw_text(self.text_color, x0, y, &shown);
            start = end + 1;
            y += line_height;
        }
        if cx.has_keyboard_focus(id) && !self.read_only {
            let line = i32::try_from(self.line_number(self.cursor_pos)).unwrap_or(0);
            let x = x0 + self.text_x(font.as_ref(), self.cursor_pos);
            let y = inner.y + line * line_height;
            match &self.cursor_image {
                Some(image) => {
                    let rect = Rect::new(x, y, image.width(), line_height);
                    cx.draw_image(image, rect);
                }
                None => cx.fill_rect(Rect::new(x, y, 1, line_height), self.text_color),
            }
        }
    }

    fn min_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let chars = cx.font().x_width() * self.columns;
        let base = cx.base();
        base.min_width().max(base.border().horizontal() + chars)
    }

    fn min_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let line = cx.font().line_height();
        let base = cx.base();
        base.min_height().max(base.border().vertical() + line)
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().x_width() * self.columns
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let lines = if self.multi_line {
            i32::try_from(self.num_lines).unwrap_or(MAX_SIZE)
        } else {
            1
        };
        cx.font().line_height().saturating_mul(lines)
    }
}

/// Create an info window owned by `owner` holding one content widget. Neither takes
/// keyboard focus away from the owner.
fn create_info_window<W: Widget>(cx: &mut Cx<'_>, owner: WidgetId, content: W) -> (WidgetId, WidgetId) {
    let window = cx.create(InfoWindow::new(owner));
    let content = cx.create(content);
    cx.base_of_mut(window).set_can_accept_keyboard_focus(false);
    cx.base_of_mut(content).set_can_accept_keyboard_focus(false);
    cx.add(window, content);
    (window, content)
}

/// One line of text inside the error window.
#[derive(Debug, Default)]
struct MessageLabel {
    text: String,
    color: Option<Color>,
}

impl Widget for MessageLabel {
    fn default_theme(&self) -> String {
        "errorinfo".to_owned()
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        self.color = theme
            .parameter("textColor")
            .map(|_| theme.get_color("textColor", Color::BLACK));
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let inner = cx.base().inner_rect();
        cx.draw_text(self.color.unwrap_or(Color::RED), inner.x, inner.y, &self.text);
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().compute_text_width(&self.text)
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().line_height()
    }
}

/// The suggestion list inside the auto-completion window.
struct CompletionList {
    field: WidgetId,
    suggestions: Vec<String>,
    selected: Option<usize>,
    highlight: Color,
}

impl CompletionList {
    fn new(field: WidgetId) -> Self {
        Self {
            field,
            suggestions: Vec::new(),
            selected: None,
            highlight: Color::from_rgba(0.6, 0.75, 1.0, 1.0),
        }
    }

    fn move_selection(&mut self, down: bool) {
        let last = self.suggestions.len().checked_sub(1);
        self.selected = match (self.selected, last) {
            (_, None) => None,
            (None, Some(_)) if down => Some(0),
            (None, Some(_)) => None,
            (Some(i), Some(last)) if down => Some((i + 1).min(last)),
            (Some(0), Some(_)) => None,
            (Some(i), Some(_)) => Some(i - 1),
        };
    }

    fn selected_text(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.suggestions.get(i))
            .map(String::as_str)
    }
}

impl Widget for CompletionList {
    fn default_theme(&self) -> String {
        "autocompletion".to_owned()
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if evt.event_type() != EventType::MouseBtnDown {
            return evt.is_mouse_event() && evt.event_type() != EventType::MouseWheel;
        }
        let line_height = cx.font().line_height().max(1);
        let row = (evt.mouse_y() - cx.base().inner_y()) / line_height;
        let Some(text) = usize::try_from(row)
            .ok()
            .and_then(|row| self.suggestions.get(row))
            .cloned()
        else {
            return true;
        };
        let field = self.field;
        cx.defer(move |gui| {
            gui.with_widget::<EditField, _>(field, |edit, cx| edit.accept_completion(cx, &text));
        });
        true
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let inner = cx.base().inner_rect();
        let line_height = cx.font().line_height();
        let mut y = inner.y;
        for (i, suggestion) in self.suggestions.iter().enumerate() {
            if y >= inner.bottom() {
                break;
            }
            if self.selected == Some(i) {
                cx.fill_rect(Rect::new(inner.x, y, inner.width, line_height), self.highlight);
            }
            cx.draw_text(Color::BLACK, inner.x, y, suggestion);
            y += line_height;
        }
    }
}

fn prev_grapheme(text: &str, pos: usize) -> usize {
    text[..pos]
        .grapheme_indices(true)
        .next_back()
        .map_or(0, |(i, _)| i)
}

fn next_grapheme(text: &str, pos: usize) -> usize {
    text[pos..]
        .graphemes(true)
        .next()
        .map_or(pos, |g| pos + g.len())
}

/// Byte offset of the `n`th grapheme, or the text length.
fn grapheme_offset(text: &str, n: usize) -> usize {
    text.grapheme_indices(true)
        .nth(n)
        .map_or(text.len(), |(i, _)| i)
}

/// The longest grapheme-aligned prefix with at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    let mut chars = 0;
    let mut end = 0;
    for grapheme in text.graphemes(true) {
        let count = grapheme.chars().count();
        if chars + count > max {
            break;
        }
        chars += count;
        end += grapheme.len();
    }
    &text[..end]
}

fn strip_new_lines(text: &str) -> Cow<'_, str> {
    if text.contains('\n') {
        Cow::Owned(text.replace('\n', ""))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;

    fn gui_with_field() -> (Gui, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 200)), GuiConfig::default());
        let field = gui.create(EditField::new());
        let root = gui.root_pane();
        gui.add(root, field);
        gui.set_position(field, 10, 10);
        gui.set_size(field, 80, 16);
        gui.validate_layout(root);
        assert!(gui.request_keyboard_focus(field));
        (gui, field)
    }

    fn with_field<R>(gui: &mut Gui, id: WidgetId, f: impl FnOnce(&mut EditField, &mut Cx<'_>) -> R) -> R {
        gui.with_widget::<EditField, _>(id, f).unwrap()
    }

    fn field(gui: &Gui, id: WidgetId) -> &EditField {
        gui.widget::<EditField>(id).unwrap()
    }

    fn type_text(gui: &mut Gui, text: &str) {
        for ch in text.chars() {
            gui.handle_key(Key::None, Some(ch), true);
        }
    }

    fn press(gui: &mut Gui, key: Key) {
        gui.handle_key(key, None, true);
        gui.handle_key(key, None, false);
    }

    fn press_ctrl(gui: &mut Gui, key: Key) {
        gui.handle_key(Key::ControlLeft, None, true);
        gui.handle_key(key, None, true);
        gui.handle_key(key, None, false);
        gui.handle_key(Key::ControlLeft, None, false);
    }

    fn record_callbacks(gui: &Gui, id: WidgetId) -> Rc<RefCell<Vec<EditFieldCallback>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        field(gui, id)
            .callback
            .connect(move |_gui, cb| sink.borrow_mut().push(*cb));
        seen
    }

    #[test]
    fn test_typing_and_backspace() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "hello");
        assert_eq!(field(&gui, id).text(), "hello");
        assert_eq!(field(&gui, id).cursor_pos(), 5);

        press(&mut gui, Key::Backspace);
        press(&mut gui, Key::ArrowLeft);
        press(&mut gui, Key::Delete);
        assert_eq!(field(&gui, id).text(), "hel");
        assert_eq!(field(&gui, id).cursor_pos(), 3);
    }

    #[test]
    fn test_ctrl_shortcut_char_is_not_inserted() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "ab");
        gui.handle_key(Key::ControlLeft, None, true);
        gui.handle_key(Key::Q, Some('q'), true);
        gui.handle_key(Key::Q, Some('q'), false);
        gui.handle_key(Key::ControlLeft, None, false);
        assert_eq!(field(&gui, id).text(), "ab");

        gui.handle_key(Key::ShiftLeft, None, true);
        gui.handle_key(Key::Q, Some('Q'), true);
        gui.handle_key(Key::ShiftLeft, None, false);
        assert_eq!(field(&gui, id).text(), "abQ");
    }

    #[test]
    fn test_max_length_drops_extra_input() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_max_text_length(cx, 3));
        type_text(&mut gui, "abcd");
        assert_eq!(field(&gui, id).text(), "abc");

        with_field(&mut gui, id, |f, cx| f.set_text(cx, "xyzzy"));
        assert_eq!(field(&gui, id).text(), "xyz");
    }

    #[test]
    fn test_read_only_ignores_edits() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| {
            f.set_text(cx, "fixed");
            f.set_read_only(cx, true);
        });
        type_text(&mut gui, "x");
        press(&mut gui, Key::Backspace);
        assert_eq!(field(&gui, id).text(), "fixed");
        assert!(gui.base_of(id).get_animation_state(STATE_READONLY));
    }

    #[test]
    fn test_control_characters_are_rejected() {
        let (mut gui, id) = gui_with_field();
        assert!(!with_field(&mut gui, id, |f, cx| f.insert_char(cx, '\u{7}')));
        assert!(!with_field(&mut gui, id, |f, cx| f.insert_char(cx, '\n')));
        assert_eq!(field(&gui, id).text(), "");
    }

    #[test]
    fn test_shift_arrows_extend_selection() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "abcd");
        gui.handle_key(Key::ShiftLeft, None, true);
        press(&mut gui, Key::ArrowLeft);
        press(&mut gui, Key::ArrowLeft);
        gui.handle_key(Key::ShiftLeft, None, false);
        assert_eq!(field(&gui, id).selected_text(), "cd");

        type_text(&mut gui, "X");
        assert_eq!(field(&gui, id).text(), "abX");
        assert!(!field(&gui, id).has_selection());
    }

    #[test]
    fn test_home_end_in_single_line() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "abc");
        press(&mut gui, Key::Home);
        assert_eq!(field(&gui, id).cursor_pos(), 0);
        press(&mut gui, Key::End);
        assert_eq!(field(&gui, id).cursor_pos(), 3);
    }

    #[test]
    fn test_cut_and_paste_through_clipboard() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "one two");
        with_field(&mut gui, id, |f, cx| f.set_selection(cx, 0, 4));
        press_ctrl(&mut gui, Key::X);
        assert_eq!(field(&gui, id).text(), "two");
        assert_eq!(gui.clipboard().get_text().as_deref(), Some("one "));

        press(&mut gui, Key::End);
        press_ctrl(&mut gui, Key::V);
        assert_eq!(field(&gui, id).text(), "twoone ");
    }

    #[test]
    fn test_paste_strips_new_lines_in_single_line_mode() {
        let (mut gui, id) = gui_with_field();
        gui.clipboard_mut().set_text("a\nb");
        press_ctrl(&mut gui, Key::V);
        assert_eq!(field(&gui, id).text(), "ab");
    }

    #[test]
    fn test_copy_without_selection_copies_everything() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "all");
        press_ctrl(&mut gui, Key::C);
        assert_eq!(gui.clipboard().get_text().as_deref(), Some("all"));
        assert_eq!(field(&gui, id).text(), "all");
    }

    #[test]
    fn test_password_copy_is_masked() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| {
            f.set_password_masking(cx, true);
            f.set_text(cx, "secret");
        });
        press_ctrl(&mut gui, Key::C);
        assert_eq!(gui.clipboard().get_text().as_deref(), Some("******"));

        gui.draw();
        let renderer = gui.renderer_as::<HeadlessRenderer>().unwrap();
        assert!(renderer.drawn_text().contains(&"******"));
        assert!(!renderer.drawn_text().contains(&"secret"));
    }

    #[test]
    fn test_read_only_cut_only_copies() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| {
            f.set_text(cx, "keep");
            f.set_read_only(cx, true);
        });
        press_ctrl(&mut gui, Key::X);
        assert_eq!(field(&gui, id).text(), "keep");
        assert_eq!(gui.clipboard().get_text().as_deref(), Some("keep"));
    }

    #[test]
    fn test_double_click_selects_word_triple_click_all() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_text(cx, "ab cd"));
        // Mouse over "c": inner x 10 + 3 * 8.
        let click = Event::mouse(EventType::MouseClicked, 36, 12).with_button(MouseButton::Left);
        gui.handle_event(id, &click.with_click_count(2));
        assert_eq!(field(&gui, id).selected_text(), "cd");

        gui.handle_event(id, &click.with_click_count(3));
        assert_eq!(field(&gui, id).selected_text(), "ab cd");
    }

    #[test]
    fn test_mouse_down_places_cursor_and_shift_selects() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_text(cx, "abcdef"));
        let down = Event::mouse(EventType::MouseBtnDown, 10 + 2 * 8, 12).with_button(MouseButton::Left);
        gui.handle_event(id, &down);
        assert_eq!(field(&gui, id).cursor_pos(), 2);

        let shift_down = Event::mouse(EventType::MouseBtnDown, 10 + 5 * 8, 12)
            .with_button(MouseButton::Left)
            .with_modifiers(ModifierMask::LSHIFT);
        gui.handle_event(id, &shift_down);
        assert_eq!(field(&gui, id).selected_text(), "cde");
    }

    #[test]
    fn test_return_and_escape_callbacks() {
        let (mut gui, id) = gui_with_field();
        let seen = record_callbacks(&gui, id);
        press(&mut gui, Key::Enter);
        press(&mut gui, Key::Escape);
        let kinds: Vec<_> = seen.borrow().iter().map(|cb| cb.kind).collect();
        assert_eq!(kinds, [EditFieldCallbackKind::Return, EditFieldCallbackKind::Escape]);
    }

    #[test]
    fn test_text_changes_are_reported() {
        let (mut gui, id) = gui_with_field();
        let seen = record_callbacks(&gui, id);
        type_text(&mut gui, "a");
        press(&mut gui, Key::Backspace);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|cb| cb.kind == EditFieldCallbackKind::TextChanged));
        assert_eq!(seen[1].key, Key::Backspace);
    }

    #[test]
    fn test_unhandled_keys_are_forwarded_when_enabled() {
        let (mut gui, id) = gui_with_field();
        assert!(!gui.handle_key(Key::F5, None, true));

        with_field(&mut gui, id, |f, _| f.set_forward_unhandled_keys_to_callback(true));
        let seen = record_callbacks(&gui, id);
        assert!(gui.handle_key(Key::F5, None, true));
        assert_eq!(
            seen.borrow().as_slice(),
            [EditFieldCallback {
                kind: EditFieldCallbackKind::UnhandledKey,
                key: Key::F5
            }]
        );
    }

    #[test]
    fn test_multi_line_editing() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_multi_line(cx, true));
        type_text(&mut gui, "ab");
        gui.handle_key(Key::Enter, Some('\n'), true);
        type_text(&mut gui, "cdef");
        assert_eq!(field(&gui, id).text(), "ab\ncdef");
        assert_eq!(field(&gui, id).num_lines(), 2);

        press(&mut gui, Key::ArrowUp);
        assert_eq!(field(&gui, id).cursor_pos(), 2);
        press(&mut gui, Key::ArrowDown);
        press(&mut gui, Key::Home);
        assert_eq!(field(&gui, id).cursor_pos(), 3);
        assert_eq!(gui.preferred_inner_height(id), 32);
    }

    #[test]
    fn test_duplicate_line_down() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| {
            f.set_multi_line(cx, true);
            f.set_text(cx, "one\ntwo");
        });
        press_ctrl(&mut gui, Key::D);
        assert_eq!(field(&gui, id).text(), "one\none\ntwo");
        assert_eq!(field(&gui, id).cursor_pos(), 4);
    }

    #[test]
    fn test_leaving_multi_line_strips_line_breaks() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| {
            f.set_multi_line(cx, true);
            f.set_text(cx, "a\nb");
            f.set_multi_line(cx, false);
        });
        assert_eq!(field(&gui, id).text(), "ab");
    }

    #[test]
    fn test_cursor_moves_by_grapheme() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_text(cx, "ae\u{301}"));
        press(&mut gui, Key::ArrowLeft);
        assert_eq!(field(&gui, id).cursor_pos(), 1);
        press(&mut gui, Key::Backspace);
        assert_eq!(field(&gui, id).text(), "e\u{301}");
    }

    #[test]
    fn test_scrolls_to_keep_cursor_visible() {
        let (mut gui, id) = gui_with_field();
        type_text(&mut gui, "abcdefghijklmnop");
        // 16 chars * 8 px = 128, visible width 80 - 5.
        assert_eq!(field(&gui, id).scroll_pos(), 128 - 75);
        press(&mut gui, Key::Home);
        assert_eq!(field(&gui, id).scroll_pos(), 0);
    }

    #[test]
    fn test_model_error_is_shown_in_info_window() {
        let (mut gui, id) = gui_with_field();
        let model = SimpleStringModel::with_max_length(2).shared();
        with_field(&mut gui, id, |f, cx| f.set_model(cx, Some(model.clone())));

        type_text(&mut gui, "ab");
        assert_eq!(model.value(), "ab");
        assert_eq!(field(&gui, id).error_message(), None);

        type_text(&mut gui, "c");
        assert_eq!(model.value(), "ab");
        assert!(field(&gui, id).error_message().is_some());
        assert!(gui.base_of(id).get_animation_state(STATE_ERROR));
        let info = gui.active_info_window().unwrap();
        assert_eq!(gui.window_owner(info), Some(id));
        assert_eq!(gui.base_of(info).y(), gui.base_of(id).bottom());

        press(&mut gui, Key::Backspace);
        assert_eq!(field(&gui, id).error_message(), None);
        assert_eq!(gui.active_info_window(), None);
    }

    #[test]
    fn test_model_changes_update_text() {
        let (mut gui, id) = gui_with_field();
        let model = SimpleStringModel::new("start").shared();
        with_field(&mut gui, id, |f, cx| f.set_model(cx, Some(model.clone())));
        assert_eq!(field(&gui, id).text(), "start");

        model.set_value(&mut gui, "changed").unwrap();
        assert_eq!(field(&gui, id).text(), "changed");
    }

    #[test]
    fn test_focus_loss_closes_error_window() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_error_message(cx, Some("bad".into())));
        assert!(gui.active_info_window().is_some());

        let other = gui.create(EditField::new());
        let root = gui.root_pane();
        gui.add(root, other);
        gui.request_keyboard_focus(other);
        assert_eq!(gui.active_info_window(), None);

        gui.request_keyboard_focus(id);
        assert!(gui.active_info_window().is_some());
    }

    struct Words(Vec<&'static str>);

    impl AutoCompletionDataSource for Words {
        fn collect_suggestions(&self, text: &str, _cursor: usize) -> Vec<String> {
            if text.is_empty() {
                return Vec::new();
            }
            self.0
                .iter()
                .filter(|w| w.starts_with(text))
                .map(|w| (*w).to_owned())
                .collect()
        }
    }

    #[test]
    fn test_auto_completion_suggests_and_accepts() {
        let (mut gui, id) = gui_with_field();
        let source = Rc::new(Words(vec!["apple", "apricot", "banana"]));
        with_field(&mut gui, id, |f, _| f.set_auto_completion(Some(source)));

        type_text(&mut gui, "ap");
        assert!(field(&gui, id).is_auto_completion_open(&gui));
        assert_eq!(field(&gui, id).auto_completion_suggestions(&gui), ["apple", "apricot"]);

        press(&mut gui, Key::ArrowDown);
        press(&mut gui, Key::ArrowDown);
        gui.handle_key(Key::Enter, None, true);
        assert_eq!(field(&gui, id).text(), "apricot");
        assert!(!field(&gui, id).is_auto_completion_open(&gui));
    }

    #[test]
    fn test_auto_completion_closes_without_suggestions() {
        let (mut gui, id) = gui_with_field();
        let source = Rc::new(Words(vec!["apple"]));
        with_field(&mut gui, id, |f, _| f.set_auto_completion(Some(source)));
        type_text(&mut gui, "a");
        assert!(field(&gui, id).is_auto_completion_open(&gui));
        type_text(&mut gui, "x");
        assert!(!field(&gui, id).is_auto_completion_open(&gui));

        press(&mut gui, Key::Backspace);
        assert!(field(&gui, id).is_auto_completion_open(&gui));
        press(&mut gui, Key::Escape);
        assert!(!field(&gui, id).is_auto_completion_open(&gui));
    }

    #[test]
    fn test_preferred_width_uses_columns() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_columns(cx, 10));
        assert_eq!(gui.preferred_inner_width(id), 80);
        assert_eq!(gui.min_width(id), 80);
    }

    #[test]
    fn test_long_text_tooltip() {
        let (mut gui, id) = gui_with_field();
        with_field(&mut gui, id, |f, cx| f.set_text(cx, "a rather long value"));
        gui.giveup_keyboard_focus(id);
        let tooltip = with_field(&mut gui, id, |f, cx| f.tooltip_content_at(cx, 0, 0));
        assert_eq!(tooltip, Some(TooltipContent::Text("a rather long value".into())));
    }
}
