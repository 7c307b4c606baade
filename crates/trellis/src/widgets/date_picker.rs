//! A month calendar with a month adjuster and free-form date parsing.

use std::cell::Cell;
use std::fmt::Write as _;
use std::rc::Rc;

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use trellis_core::StateKey;
use trellis_core::logging::targets;
use trellis_render::{Color, Rect};

use super::{EditField, EditFieldCallback, EditFieldCallbackKind, STATE_ARMED, STATE_HOVER, STATE_PRESSED, STATE_SELECTED};
use crate::error::{GuiError, GuiResult};
use crate::event::{Event, EventType, Key, ModifierMask, MouseButton};
use crate::gui::Gui;
use crate::signal::{ConnectionId, Signal};
use crate::widget::{Cx, Widget, WidgetId};

/// A day button showing a day of the previous month.
pub const STATE_PREV_MONTH: StateKey = StateKey::new("prevMonth");
/// A day button showing a day of the next month.
pub const STATE_NEXT_MONTH: StateKey = StateKey::new("nextMonth");

const WEEKS: usize = 6;
const DAYS_PER_WEEK: usize = 7;
/// Horizontal drag distance on the month adjuster per month.
const DRAG_PIXELS_PER_MONTH: i32 = 5;
/// Two digit years resolve to at most this many years in the future.
const TWO_DIGIT_YEAR_WINDOW: i32 = 20;

/// Full dates tried after month names. `%b` and `%B` both accept short and long names;
/// the year must have four digits.
const GENERIC_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
];

/// Result of a [`DateParser`] hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// The hook does not recognize the text; the built-in parsing runs.
    NotHandled,
    Handled(T),
    /// The hook recognized the text and rejects it with a message.
    Failed(String),
}

/// A user hook consulted before the built-in date parsing.
pub trait DateParser {
    /// Parse `text`; `current` is the date shown by the picker.
    fn parse(&self, text: &str, current: NaiveDate) -> ParseOutcome<NaiveDate>;
}

impl<F> DateParser for F
where
    F: Fn(&str, NaiveDate) -> ParseOutcome<NaiveDate>,
{
    fn parse(&self, text: &str, current: NaiveDate) -> ParseOutcome<NaiveDate> {
        self(text, current)
    }
}

/// A date value a [`DatePicker`] edits.
pub trait DateModel {
    fn value(&self) -> NaiveDate;
    fn set_value(&self, gui: &mut Gui, value: NaiveDate);
    fn changes(&self) -> &Signal<()>;
}

/// A [`DateModel`] holding one date.
pub struct SimpleDateModel {
    value: Cell<NaiveDate>,
    changes: Signal<()>,
}

impl SimpleDateModel {
    pub fn new(value: NaiveDate) -> Self {
        Self {
            value: Cell::new(value),
            changes: Signal::new(),
        }
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }
}

impl DateModel for SimpleDateModel {
    fn value(&self) -> NaiveDate {
        self.value.get()
    }

    fn set_value(&self, gui: &mut Gui, value: NaiveDate) {
        if self.value.replace(value) != value {
            self.changes.emit(gui, ());
        }
    }

    fn changes(&self) -> &Signal<()> {
        &self.changes
    }
}

/// Names and patterns used to show and parse dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    /// January first.
    pub month_names: [String; 12],
    pub short_month_names: [String; 12],
    /// Abbreviated, Monday first.
    pub weekday_names: [String; 7],
    /// A chrono format string used by [`DatePicker::format_date`].
    pub long_date_pattern: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        let names = |list: [&str; 12]| list.map(str::to_owned);
        Self {
            month_names: names([
                "January", "February", "March", "April", "May", "June", "July", "August",
                "September", "October", "November", "December",
            ]),
            short_month_names: names([
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ]),
            weekday_names: ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"].map(str::to_owned),
            long_date_pattern: "%A, %B %-d, %Y".to_owned(),
        }
    }
}

/// Input from the month adjuster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdjusterAction {
    Decrement,
    Increment,
    DragStart,
    /// Horizontal distance from the drag start.
    DragUpdate(i32),
    DragCancel,
    DragEnd,
}

/// A calendar for picking a day.
///
/// The top row is a month adjuster showing "<month> <year>": its arrows step one month,
/// dragging across it moves one month per 5 pixels (Escape restores the month the drag
/// started in) and clicking the text opens an editor that accepts anything
/// [`parse_date`](Self::parse_date) does. Below are the weekday names, Monday first, and
/// six weeks of day buttons including the surrounding days of the previous and next
/// month.
pub struct DatePicker {
    date: NaiveDate,
    format: DateFormat,
    parser: Option<Rc<dyn DateParser>>,
    model: Option<Rc<dyn DateModel>>,
    model_connection: Option<ConnectionId>,
    adjuster: WidgetId,
    weekday_labels: Vec<WidgetId>,
    day_buttons: Vec<WidgetId>,
    drag_start: Option<NaiveDate>,
    /// Emitted with the shown date whenever the display changes.
    pub calendar_changed: Signal<NaiveDate>,
}

impl Default for DatePicker {
    fn default() -> Self {
        Self::new()
    }
}

impl DatePicker {
    /// A picker showing today.
    pub fn new() -> Self {
        Self::with_date(Local::now().date_naive())
    }

    pub fn with_date(date: NaiveDate) -> Self {
        Self {
            date,
            format: DateFormat::default(),
            parser: None,
            model: None,
            model_connection: None,
            adjuster: WidgetId::default(),
            weekday_labels: Vec::new(),
            day_buttons: Vec::new(),
            drag_start: None,
            calendar_changed: Signal::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, cx: &mut Cx<'_>, date: NaiveDate) {
        if self.date != date {
            self.date = date;
            self.calendar_changed(cx);
        }
    }

    pub fn date_format(&self) -> &DateFormat {
        &self.format
    }

    pub fn set_date_format(&mut self, cx: &mut Cx<'_>, format: DateFormat) {
        self.format = format;
        self.update_display(cx);
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    pub fn set_parser(&mut self, parser: Option<Rc<dyn DateParser>>) {
        self.parser = parser;
    }

    /// The date formatted with [`DateFormat::long_date_pattern`].
    pub fn format_date(&self) -> String {
        let mut out = String::new();
        if write!(out, "{}", self.date.format(&self.format.long_date_pattern)).is_err() {
            tracing::warn!(
                target: targets::DATE,
                pattern = %self.format.long_date_pattern,
                "invalid date pattern"
            );
            return self.date.to_string();
        }
        out
    }

    /// The text shown by the month adjuster.
    pub fn month_text(&self) -> String {
        format!("{} {}", self.format.month_names[self.date.month0() as usize], self.date.year())
    }

    /// Parse `text` and show the result.
    ///
    /// The parser hook runs first, then a month name and/or a year that replace those
    /// fields of the current date, then a set of numeric and named full date formats.
    pub fn parse_date(&mut self, cx: &mut Cx<'_>, text: &str) -> GuiResult<NaiveDate> {
        let date = self.resolve(text)?;
        self.set_date(cx, date);
        Ok(date)
    }

    /// Check `text` like [`parse_date`](Self::parse_date) without changing the date.
    pub fn validate_date(&self, text: &str) -> GuiResult<NaiveDate> {
        self.resolve(text)
    }

    fn resolve(&self, text: &str) -> GuiResult<NaiveDate> {
        if let Some(parser) = &self.parser {
            match parser.parse(text, self.date) {
                ParseOutcome::Handled(date) => return Ok(date),
                ParseOutcome::Failed(msg) => return Err(GuiError::InvalidDate(msg)),
                ParseOutcome::NotHandled => {}
            }
        }
        let trimmed = text.trim();
        if let Some(date) = self.resolve_month_year(trimmed) {
            return Ok(date);
        }
        GENERIC_FORMATS
            .iter()
            .filter_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
            .find(|date| (1000..=9999).contains(&date.year()))
            .ok_or_else(|| GuiError::InvalidDate(format!("unparseable date \"{text}\"")))
    }

    /// A month name and/or a year applied to the current date.
    fn resolve_month_year(&self, text: &str) -> Option<NaiveDate> {
        let lower = text.to_lowercase();
        let mut rest = lower.as_str();
        let mut month = None;
        for names in [&self.format.month_names, &self.format.short_month_names] {
            let found = names.iter().position(|name| {
                let name = name.to_lowercase();
                !name.is_empty() && lower.starts_with(&name)
            });
            if let Some(index) = found {
                rest = lower[names[index].to_lowercase().len()..].trim_start_matches([' ', ',', '.']);
                month = Some(index as u32 + 1);
                break;
            }
        }
        let year = match rest.trim().parse::<i32>() {
            Ok(year) if year < 100 => Some(fixup_two_digit_year(year, Local::now().year())),
            Ok(year) => Some(year),
            Err(_) if rest.trim().is_empty() => None,
            Err(_) => return None,
        };
        if month.is_none() && year.is_none() {
            return None;
        }
        clamped_date(
            year.unwrap_or(self.date.year()),
            month.unwrap_or(self.date.month()),
            self.date.day(),
        )
    }

    // =========================================================================
    // Model
    // =========================================================================

    pub fn model(&self) -> Option<&Rc<dyn DateModel>> {
        self.model.as_ref()
    }

    /// Bind the picker to `model`; the shown date follows it and picks are written back.
    pub fn set_model(&mut self, cx: &mut Cx<'_>, model: Option<Rc<dyn DateModel>>) {
        self.disconnect_model();
        if let Some(model) = &model {
            let id = cx.id();
            let connection = model.changes().connect(move |gui: &mut Gui, _: &()| {
                gui.with_widget::<DatePicker, _>(id, |picker, cx| picker.model_changed(cx));
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
        if let Some(model) = &self.model {
            let value = model.value();
            if value != self.date {
                self.date = value;
                self.update_display(cx);
            }
        }
    }

    fn calendar_changed(&mut self, cx: &mut Cx<'_>) {
        if let Some(model) = self.model.clone() {
            model.set_value(cx, self.date);
        }
        self.update_display(cx);
    }

    // =========================================================================
    // Display
    // =========================================================================

    /// The first day shown: the Monday on or before the first of the month.
    fn grid_start(&self) -> NaiveDate {
        let first = self.date.with_day(1).unwrap_or(self.date);
        let offset = u64::from(first.weekday().num_days_from_monday());
        first.checked_sub_days(Days::new(offset)).unwrap_or(first)
    }

    fn update_display(&mut self, cx: &mut Cx<'_>) {
        let month_text = self.month_text();
        if let Some(adjuster) = cx.widget_mut::<MonthAdjuster>(self.adjuster) {
            adjuster.text = month_text;
        }
        for (label, name) in self.weekday_labels.iter().zip(&self.format.weekday_names) {
            if let Some(label) = cx.widget_mut::<CalendarLabel>(*label) {
                label.text.clone_from(name);
            }
        }

        let shown = (self.date.year(), self.date.month());
        let mut day = self.grid_start();
        for &button in &self.day_buttons {
            if let Some(widget) = cx.widget_mut::<DayButton>(button) {
                widget.date = day;
                widget.text = day.day().to_string();
            }
            let month = (day.year(), day.month());
            let base = cx.base_of(button);
            base.set_animation_state(STATE_PREV_MONTH, month < shown);
            base.set_animation_state(STATE_NEXT_MONTH, month > shown);
            base.set_animation_state(STATE_SELECTED, day == self.date);
            day = day.succ_opt().unwrap_or(day);
        }
        tracing::trace!(target: targets::DATE, date = %self.date, "calendar updated");
        self.calendar_changed.emit(cx, self.date);
    }

    fn adjust(&mut self, cx: &mut Cx<'_>, action: AdjusterAction) {
        match action {
            AdjusterAction::Decrement => self.set_date(cx, add_months(self.date, -1)),
            AdjusterAction::Increment => self.set_date(cx, add_months(self.date, 1)),
            AdjusterAction::DragStart => self.drag_start = Some(self.date),
            AdjusterAction::DragUpdate(delta) => {
                if let Some(start) = self.drag_start {
                    self.set_date(cx, add_months(start, delta / DRAG_PIXELS_PER_MONTH));
                }
            }
            AdjusterAction::DragCancel => {
                if let Some(start) = self.drag_start.take() {
                    self.set_date(cx, start);
                }
            }
            AdjusterAction::DragEnd => self.drag_start = None,
        }
    }

    fn cell_size(&self, cx: &mut Cx<'_>) -> (i32, i32) {
        let cells = self.weekday_labels.iter().chain(&self.day_buttons);
        let mut size = (0, 0);
        for &cell in cells {
            size.0 = size.0.max(cx.preferred_width(cell));
            size.1 = size.1.max(cx.preferred_height(cell));
        }
        size
    }
}

impl Drop for DatePicker {
    fn drop(&mut self) {
        self.disconnect_model();
    }
}

impl Widget for DatePicker {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        self.adjuster = cx.create(MonthAdjuster::new(id));
        cx.set_theme(self.adjuster, "monthAdjuster");
        cx.add(id, self.adjuster);
        for _ in 0..DAYS_PER_WEEK {
            let label = cx.create(CalendarLabel::default());
            cx.set_theme(label, "weekDayLabel");
            cx.base_of_mut(label).set_can_accept_keyboard_focus(false);
            cx.add(id, label);
            self.weekday_labels.push(label);
        }
        for _ in 0..WEEKS * DAYS_PER_WEEK {
            let button = cx.create(DayButton::new(id));
            cx.set_theme(button, "daybutton");
            cx.base_of_mut(button).set_can_accept_keyboard_focus(false);
            cx.add(id, button);
            self.day_buttons.push(button);
        }
        self.update_display(cx);
    }

    fn after_add_to_gui(&mut self, cx: &mut Cx<'_>) {
        self.model_changed(cx);
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let inner = cx.base().inner_rect();
        let adjuster_height = cx.preferred_height(self.adjuster);
        cx.set_position(self.adjuster, inner.x, inner.y);
        cx.set_size(self.adjuster, inner.width, adjuster_height);

        let rows = 1 + WEEKS as i32;
        let cell_width = inner.width / DAYS_PER_WEEK as i32;
        let cell_height = ((inner.height - adjuster_height) / rows).max(0);
        let top = inner.y + adjuster_height;
        let cells = self.weekday_labels.iter().chain(&self.day_buttons);
        for (index, &cell) in cells.enumerate() {
            let column = (index % DAYS_PER_WEEK) as i32;
            let row = (index / DAYS_PER_WEEK) as i32;
            cx.set_position(cell, inner.x + column * cell_width, top + row * cell_height);
            cx.set_size(cell, cell_width, cell_height);
        }
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let (cell_width, _) = self.cell_size(cx);
        cx.preferred_width(self.adjuster)
            .max(cell_width * DAYS_PER_WEEK as i32)
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let (_, cell_height) = self.cell_size(cx);
        cx.preferred_height(self.adjuster) + cell_height * (1 + WEEKS as i32)
    }
}

/// Tell the picker about adjuster input once the current hook returns.
fn send_action(cx: &mut Cx<'_>, picker: WidgetId, action: AdjusterAction) {
    cx.defer(move |gui| {
        gui.with_widget::<DatePicker, _>(picker, |picker, cx| picker.adjust(cx, action));
    });
}

/// The "< month year >" row at the top of the picker.
struct MonthAdjuster {
    picker: WidgetId,
    text: String,
    drag_origin: Option<i32>,
    drag_cancelled: bool,
    editor: Option<WidgetId>,
}

impl MonthAdjuster {
    fn new(picker: WidgetId) -> Self {
        Self {
            picker,
            text: String::new(),
            drag_origin: None,
            drag_cancelled: false,
            editor: None,
        }
    }

    fn arrow_width(cx: &Cx<'_>) -> i32 {
        cx.font().line_height()
    }

    /// Replace the text with an editor for typing a date.
    fn start_edit(&mut self, cx: &mut Cx<'_>) {
        if self.editor.is_some() {
            return;
        }
        let id = cx.id();
        let editor = cx.create(EditField::new());
        cx.add(id, editor);
        self.editor = Some(editor);
        let picker = self.picker;
        if let Some(field) = cx.widget::<EditField>(editor) {
            field.callback.connect(move |gui: &mut Gui, cb: &EditFieldCallback| {
                editor_callback(gui, id, picker, editor, *cb);
            });
        }
        let text = self.text.clone();
        cx.with_widget::<EditField, _>(editor, |field, cx| {
            field.set_text(cx, &text);
            field.select_all(cx);
        });
        self.layout_editor(cx);
        cx.request_keyboard_focus(editor);
    }

    fn end_edit(&mut self, cx: &mut Cx<'_>) {
        if let Some(editor) = self.editor.take() {
            cx.dispose(editor);
            let id = cx.id();
            cx.request_keyboard_focus(id);
        }
    }

    fn layout_editor(&self, cx: &mut Cx<'_>) {
        let Some(editor) = self.editor else {
            return;
        };
        let inner = cx.base().inner_rect();
        let arrow = Self::arrow_width(cx);
        cx.set_position(editor, inner.x + arrow, inner.y);
        cx.set_size(editor, (inner.width - 2 * arrow).max(0), inner.height);
    }
}

fn editor_callback(gui: &mut Gui, adjuster: WidgetId, picker: WidgetId, editor: WidgetId, cb: EditFieldCallback) {
    let end_edit = |gui: &mut Gui| {
        gui.with_widget::<MonthAdjuster, _>(adjuster, |adjuster, cx| adjuster.end_edit(cx));
    };
    let Some(text) = gui.widget::<EditField>(editor).map(|field| field.text().to_owned()) else {
        return;
    };
    match cb.kind {
        EditFieldCallbackKind::Return => {
            match gui.with_widget::<DatePicker, _>(picker, |picker, cx| picker.parse_date(cx, &text)) {
                Some(Ok(_)) => end_edit(gui),
                Some(Err(err)) => {
                    gui.with_widget::<EditField, _>(editor, |field, cx| {
                        field.set_error_message(cx, Some(err.to_string()));
                    });
                }
                None => {}
            }
        }
        EditFieldCallbackKind::Escape => end_edit(gui),
        EditFieldCallbackKind::TextChanged => {
            let error = gui
                .widget::<DatePicker>(picker)
                .and_then(|picker| picker.validate_date(&text).err())
                .map(|err| err.to_string());
            gui.with_widget::<EditField, _>(editor, |field, cx| field.set_error_message(cx, error));
        }
        EditFieldCallbackKind::UnhandledKey => {}
    }
}

impl Widget for MonthAdjuster {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if cx.default_handle_event(evt) {
            return true;
        }
        let left = evt.mouse_button() == Some(MouseButton::Left);
        match evt.event_type() {
            EventType::MouseBtnDown if left && self.editor.is_none() => {
                let inner = cx.base().inner_rect();
                let arrow = Self::arrow_width(cx);
                let x = evt.mouse_x() - inner.x;
                if x < arrow {
                    send_action(cx, self.picker, AdjusterAction::Decrement);
                } else if x >= inner.width - arrow {
                    send_action(cx, self.picker, AdjusterAction::Increment);
                } else {
                    self.drag_origin = Some(evt.mouse_x());
                    self.drag_cancelled = false;
                    send_action(cx, self.picker, AdjusterAction::DragStart);
                }
            }
            EventType::MouseDragged if evt.modifiers().intersects(ModifierMask::LBUTTON) => {
                if let Some(origin) = self.drag_origin
                    && !self.drag_cancelled
                {
                    let delta = evt.mouse_x() - origin;
                    send_action(cx, self.picker, AdjusterAction::DragUpdate(delta));
                }
            }
            EventType::MouseBtnUp if evt.is_mouse_drag_end() => {
                if self.drag_origin.take().is_some() && !self.drag_cancelled {
                    send_action(cx, self.picker, AdjusterAction::DragEnd);
                }
            }
            EventType::MouseClicked if evt.click_count() == 1 && self.editor.is_none() => {
                let inner = cx.base().inner_rect();
                let arrow = Self::arrow_width(cx);
                let x = evt.mouse_x() - inner.x;
                if x >= arrow && x < inner.width - arrow {
                    self.start_edit(cx);
                }
            }
            EventType::KeyPressed if evt.key_code() == Key::Escape => {
                if self.drag_origin.is_some() && !self.drag_cancelled {
                    self.drag_cancelled = true;
                    send_action(cx, self.picker, AdjusterAction::DragCancel);
                    return true;
                }
                return false;
            }
            _ => return evt.is_mouse_event() && evt.event_type() != EventType::MouseWheel,
        }
        true
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        self.layout_editor(cx);
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let font = cx.font();
        let inner = cx.base().inner_rect();
        let arrow = font.line_height();
        let color = Color::BLACK;
        cx.draw_text(color, inner.x + (arrow - font.compute_text_width("<")) / 2, inner.y, "<");
        let right = inner.right() - arrow;
        cx.draw_text(color, right + (arrow - font.compute_text_width(">")) / 2, inner.y, ">");
        if self.editor.is_none() {
            let width = font.compute_text_width(&self.text);
            cx.draw_text(color, inner.x + (inner.width - width) / 2, inner.y, &self.text);
        }
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let font = cx.font();
        font.compute_text_width(&self.text) + 2 * font.line_height()
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let line = cx.font().line_height();
        match self.editor {
            Some(editor) => line.max(cx.preferred_height(editor)),
            None => line,
        }
    }
}

/// A weekday name above a column of days.
#[derive(Default)]
struct CalendarLabel {
    text: String,
}

impl Widget for CalendarLabel {
    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        paint_centered(cx, &self.text);
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().compute_text_width(&self.text)
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().line_height()
    }
}

/// One day of the grid; clicking it picks the day.
struct DayButton {
    picker: WidgetId,
    date: NaiveDate,
    text: String,
    pressed: bool,
    hover: bool,
}

impl DayButton {
    fn new(picker: WidgetId) -> Self {
        Self {
            picker,
            date: NaiveDate::MIN,
            text: String::new(),
            pressed: false,
            hover: false,
        }
    }

    fn is_armed(&self) -> bool {
        self.pressed && self.hover
    }
}

impl Widget for DayButton {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let left = evt.mouse_button() == Some(MouseButton::Left);
        let mut picked = false;
        match evt.event_type() {
            EventType::MouseEntered => self.hover = true,
            EventType::MouseExited => self.hover = false,
            EventType::MouseDragged => {
                self.hover = cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
            }
            EventType::MouseBtnDown if left => {
                self.pressed = true;
                self.hover = cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
            }
            EventType::MouseBtnUp if left => {
                picked = self.is_armed();
                self.pressed = false;
            }
            _ => {}
        }
        let base = cx.base();
        base.set_animation_state(STATE_HOVER, self.hover);
        base.set_animation_state(STATE_PRESSED, self.pressed);
        base.set_animation_state(STATE_ARMED, self.is_armed());

        if picked {
            let (picker, date) = (self.picker, self.date);
            cx.defer(move |gui| {
                gui.with_widget::<DatePicker, _>(picker, |picker, cx| picker.set_date(cx, date));
            });
        }
        evt.is_mouse_event()
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        if cx.base().get_animation_state(STATE_SELECTED) {
            let inner = cx.base().inner_rect();
            cx.fill_rect(inner, Color::from_rgba(0.6, 0.75, 1.0, 1.0));
        }
        paint_centered(cx, &self.text);
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().compute_text_width("00")
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().line_height()
    }
}

fn paint_centered(cx: &mut Cx<'_>, text: &str) {
    let font = cx.font();
    let inner: Rect = cx.base().inner_rect();
    let x = inner.x + (inner.width - font.compute_text_width(text)) / 2;
    let y = inner.y + (inner.height - font.line_height()) / 2;
    cx.draw_text(Color::BLACK, x, y, text);
}

/// Map a two digit year into the century window ending [`TWO_DIGIT_YEAR_WINDOW`] years
/// after `current_year`.
fn fixup_two_digit_year(year: i32, current_year: i32) -> i32 {
    let future = current_year + TWO_DIGIT_YEAR_WINDOW;
    let trip_point = future % 100;
    let year = if year > trip_point { year - 100 } else { year };
    year + future - trip_point
}

/// The date with `day` clamped to the length of the month.
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (1..=day.max(1))
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
}

/// Shift by whole months, clamping the day; out of range results keep `date`.
fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn gui_with_picker(date: NaiveDate) -> (Gui, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 400)), GuiConfig::default());
        let picker = gui.create(DatePicker::with_date(date));
        let root = gui.root_pane();
        gui.add(root, picker);
        gui.set_position(picker, 0, 0);
        gui.set_size(picker, 280, 176);
        gui.validate_layout(root);
        (gui, picker)
    }

    fn with_picker<R>(gui: &mut Gui, id: WidgetId, f: impl FnOnce(&mut DatePicker, &mut Cx<'_>) -> R) -> R {
        gui.with_widget::<DatePicker, _>(id, f).unwrap()
    }

    fn picker(gui: &Gui, id: WidgetId) -> &DatePicker {
        gui.widget::<DatePicker>(id).unwrap()
    }

    #[test]
    fn test_fixup_two_digit_year() {
        assert_eq!(fixup_two_digit_year(19, 2024), 2019);
        assert_eq!(fixup_two_digit_year(44, 2024), 2044);
        assert_eq!(fixup_two_digit_year(45, 2024), 1945);
        assert_eq!(fixup_two_digit_year(99, 2024), 1999);
        assert_eq!(fixup_two_digit_year(0, 2090), 2100);
    }

    #[test]
    fn test_month_and_year_replace_the_right_fields() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let parsed = with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "March 2019")).unwrap();
        assert_eq!(parsed, ymd(2019, 3, 15));
        assert_eq!(picker(&gui, id).date(), ymd(2019, 3, 15));

        let parsed = with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "Sep 2001")).unwrap();
        assert_eq!(parsed, ymd(2001, 9, 15));
    }

    #[test]
    fn test_month_name_only_keeps_year() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "  october")).unwrap();
        assert_eq!(picker(&gui, id).date(), ymd(2024, 10, 15));
    }

    #[test]
    fn test_year_only_and_day_clamping() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 2, 29));
        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "2023")).unwrap();
        assert_eq!(picker(&gui, id).date(), ymd(2023, 2, 28));

        let (mut gui, id) = gui_with_picker(ymd(2024, 1, 31));
        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "Apr 2022")).unwrap();
        assert_eq!(picker(&gui, id).date(), ymd(2022, 4, 30));
    }

    #[test]
    fn test_generic_formats() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        for (text, expected) in [
            ("2021-07-04", ymd(2021, 7, 4)),
            ("24.12.2020", ymd(2020, 12, 24)),
            ("11/05/1999", ymd(1999, 11, 5)),
            ("March 5, 2019", ymd(2019, 3, 5)),
            ("9 Sep 2001", ymd(2001, 9, 9)),
        ] {
            let parsed = with_picker(&mut gui, id, |p, cx| p.parse_date(cx, text)).unwrap();
            assert_eq!(parsed, expected, "{text}");
        }
    }

    #[test]
    fn test_unparseable_text_keeps_date() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let result = with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "someday"));
        assert!(matches!(result, Err(GuiError::InvalidDate(_))));
        assert!(picker(&gui, id).validate_date("Marchish 20x").is_err());
        assert!(picker(&gui, id).validate_date("5 March 19").is_err());
        assert_eq!(picker(&gui, id).date(), ymd(2024, 5, 15));
    }

    #[test]
    fn test_validate_does_not_update() {
        let (gui, id) = gui_with_picker(ymd(2024, 5, 15));
        assert_eq!(picker(&gui, id).validate_date("2000-01-01").unwrap(), ymd(2000, 1, 1));
        assert_eq!(picker(&gui, id).date(), ymd(2024, 5, 15));
    }

    #[test]
    fn test_parser_hook_runs_first() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let hook = |text: &str, current: NaiveDate| match text {
            "tomorrow" => ParseOutcome::Handled(current.succ_opt().unwrap()),
            "2021-01-01" => ParseOutcome::Failed("holiday".to_owned()),
            _ => ParseOutcome::NotHandled,
        };
        with_picker(&mut gui, id, |p, _| p.set_parser(Some(Rc::new(hook))));

        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "tomorrow")).unwrap();
        assert_eq!(picker(&gui, id).date(), ymd(2024, 5, 16));

        let err = with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "2021-01-01")).unwrap_err();
        assert_eq!(err.to_string(), "invalid date: holiday");

        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "2021-01-02")).unwrap();
        assert_eq!(picker(&gui, id).date(), ymd(2021, 1, 2));
    }

    #[test]
    fn test_grid_starts_on_monday_with_surrounding_months() {
        // May 1st 2024 is a Wednesday.
        let (gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let buttons = picker(&gui, id).day_buttons.clone();
        assert_eq!(buttons.len(), 42);
        let day = |i: usize| gui.widget::<DayButton>(buttons[i]).unwrap().date;
        assert_eq!(day(0), ymd(2024, 4, 29));
        assert_eq!(day(2), ymd(2024, 5, 1));
        assert_eq!(day(41), ymd(2024, 6, 9));

        let state = |i: usize, key| gui.base_of(buttons[i]).get_animation_state(key);
        assert!(state(1, STATE_PREV_MONTH));
        assert!(!state(2, STATE_PREV_MONTH));
        assert!(state(16, STATE_SELECTED));
        assert!(!state(15, STATE_SELECTED));
        assert!(!state(32, STATE_NEXT_MONTH));
        assert!(state(33, STATE_NEXT_MONTH));
    }

    #[test]
    fn test_weekday_labels_are_monday_first() {
        let (gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let labels = &picker(&gui, id).weekday_labels;
        let first = gui.widget::<CalendarLabel>(labels[0]).unwrap();
        let last = gui.widget::<CalendarLabel>(labels[6]).unwrap();
        assert_eq!((first.text.as_str(), last.text.as_str()), ("Mon", "Sun"));
    }

    #[test]
    fn test_clicking_previous_month_day_switches_month() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let button = picker(&gui, id).day_buttons[0];
        let base = gui.base_of(button);
        let (x, y) = (base.x() + 2, base.y() + 2);
        let down = Event::mouse(EventType::MouseBtnDown, x, y).with_button(MouseButton::Left);
        let up = Event::mouse(EventType::MouseBtnUp, x, y).with_button(MouseButton::Left);
        gui.handle_event(button, &down);
        gui.handle_event(button, &up);

        assert_eq!(picker(&gui, id).date(), ymd(2024, 4, 29));
        assert_eq!(picker(&gui, id).month_text(), "April 2024");
        let adjuster = picker(&gui, id).adjuster;
        assert_eq!(gui.widget::<MonthAdjuster>(adjuster).unwrap().text, "April 2024");
    }

    #[test]
    fn test_adjuster_steps_and_drags_months() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 1, 31));
        with_picker(&mut gui, id, |p, cx| p.adjust(cx, AdjusterAction::Increment));
        assert_eq!(picker(&gui, id).date(), ymd(2024, 2, 29));
        with_picker(&mut gui, id, |p, cx| p.adjust(cx, AdjusterAction::Decrement));
        assert_eq!(picker(&gui, id).date(), ymd(2024, 1, 29));

        with_picker(&mut gui, id, |p, cx| {
            p.adjust(cx, AdjusterAction::DragStart);
            p.adjust(cx, AdjusterAction::DragUpdate(12));
        });
        assert_eq!(picker(&gui, id).date(), ymd(2024, 3, 29));
        with_picker(&mut gui, id, |p, cx| p.adjust(cx, AdjusterAction::DragUpdate(-7)));
        assert_eq!(picker(&gui, id).date(), ymd(2023, 12, 29));
        with_picker(&mut gui, id, |p, cx| p.adjust(cx, AdjusterAction::DragCancel));
        assert_eq!(picker(&gui, id).date(), ymd(2024, 1, 29));
    }

    #[test]
    fn test_adjuster_arrow_click() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let adjuster = picker(&gui, id).adjuster;
        let base = gui.base_of(adjuster);
        let (right, y) = (base.right() - 2, base.y() + 2);
        let down = Event::mouse(EventType::MouseBtnDown, right, y).with_button(MouseButton::Left);
        gui.handle_event(adjuster, &down);
        assert_eq!(picker(&gui, id).date(), ymd(2024, 6, 15));
    }

    #[test]
    fn test_calendar_changed_signal() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        picker(&gui, id)
            .calendar_changed
            .connect(move |_gui, date| sink.borrow_mut().push(*date));
        with_picker(&mut gui, id, |p, cx| p.set_date(cx, ymd(2024, 6, 1)));
        with_picker(&mut gui, id, |p, cx| p.set_date(cx, ymd(2024, 6, 1)));
        assert_eq!(seen.borrow().as_slice(), [ymd(2024, 6, 1)]);
    }

    #[test]
    fn test_model_binding() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let model = SimpleDateModel::new(ymd(2020, 2, 2)).shared();
        with_picker(&mut gui, id, |p, cx| p.set_model(cx, Some(model.clone())));
        assert_eq!(picker(&gui, id).date(), ymd(2020, 2, 2));

        model.set_value(&mut gui, ymd(2021, 3, 3));
        assert_eq!(picker(&gui, id).date(), ymd(2021, 3, 3));

        with_picker(&mut gui, id, |p, cx| p.parse_date(cx, "2022-04-04")).unwrap();
        assert_eq!(model.value(), ymd(2022, 4, 4));
    }

    #[test]
    fn test_format_date() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        assert_eq!(picker(&gui, id).format_date(), "Wednesday, May 15, 2024");

        let format = DateFormat {
            long_date_pattern: "%d.%m.%Y".to_owned(),
            ..DateFormat::default()
        };
        with_picker(&mut gui, id, |p, cx| p.set_date_format(cx, format));
        assert_eq!(picker(&gui, id).format_date(), "15.05.2024");
    }

    #[test]
    fn test_editing_the_month_text() {
        let (mut gui, id) = gui_with_picker(ymd(2024, 5, 15));
        let adjuster = picker(&gui, id).adjuster;
        gui.with_widget::<MonthAdjuster, _>(adjuster, |a, cx| a.start_edit(cx));
        let editor = gui.widget::<MonthAdjuster>(adjuster).unwrap().editor.unwrap();
        assert_eq!(gui.widget::<EditField>(editor).unwrap().text(), "May 2024");

        let enter = Event::key(EventType::KeyPressed, Key::Enter, None);
        gui.with_widget::<EditField, _>(editor, |f, cx| f.set_text(cx, "garbage"));
        assert!(gui.widget::<EditField>(editor).unwrap().error_message().is_some());
        gui.handle_event(editor, &enter);
        assert_eq!(picker(&gui, id).date(), ymd(2024, 5, 15));
        assert!(gui.widget::<MonthAdjuster>(adjuster).unwrap().editor.is_some());

        gui.with_widget::<EditField, _>(editor, |f, cx| f.set_text(cx, "June 2020"));
        assert_eq!(gui.widget::<EditField>(editor).unwrap().error_message(), None);
        gui.handle_event(editor, &enter);
        assert_eq!(picker(&gui, id).date(), ymd(2020, 6, 15));
        assert!(gui.widget::<MonthAdjuster>(adjuster).unwrap().editor.is_none());
        assert!(!gui.contains(editor));
    }
}
