//! Styles for text area elements.
//!
//! A [`Style`] stores values for a fixed set of typed [`StyleAttribute`]s. Lookups of
//! inherited attributes walk the parent chain; every style may also carry a
//! [`StyleSheetKey`] that a [`StyleSheetResolver`] maps to a style sheet entry.
//!
//! ```
//! use std::rc::Rc;
//!
//! use trellis::widgets::text_area::{attributes, HAlignment, Style, Value};
//!
//! let parent = Rc::new(Style::new().with(&attributes::HORIZONTAL_ALIGNMENT, HAlignment::Center));
//! let child = Style::child_of(&parent, None).with(&attributes::MARGIN_TOP, Value::Px(4.0));
//!
//! // inherited from the parent
//! assert_eq!(child.get(&attributes::HORIZONTAL_ALIGNMENT, None), HAlignment::Center);
//! // margins are not inherited
//! assert_eq!(parent.get(&attributes::MARGIN_TOP, None), Value::Px(0.0));
//! assert_eq!(child.get(&attributes::MARGIN_TOP, None), Value::Px(4.0));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use trellis_render::Color;

use super::model::{Clear, Display, FloatPosition, HAlignment, TextDecoration, VAlignment};
use crate::error::{GuiError, GuiResult};

/// A length with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Pixels.
    Px(f32),
    /// Points at 96 DPI.
    Pt(f32),
    /// Multiples of the font's `M` width.
    Em(f32),
    /// Multiples of the font's `x` width.
    Ex(f32),
    /// Percent of the containing width.
    Percent(f32),
    Auto,
}

impl Value {
    pub const ZERO_PX: Self = Self::Px(0.0);

    /// Whether the value needs a font to be converted to pixels.
    pub const fn is_font_based(self) -> bool {
        matches!(self, Self::Em(_) | Self::Ex(_))
    }

    pub const fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }

    pub const fn unit_postfix(self) -> &'static str {
        match self {
            Self::Px(_) => "px",
            Self::Pt(_) => "pt",
            Self::Em(_) => "em",
            Self::Ex(_) => "ex",
            Self::Percent(_) => "%",
            Self::Auto => "auto",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::ZERO_PX
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Px(v) | Self::Pt(v) | Self::Em(v) | Self::Ex(v) | Self::Percent(v) => {
                write!(f, "{v}{}", self.unit_postfix())
            }
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for Value {
    type Err = GuiError;

    /// Parse `"12px"`, `"10pt"`, `"1.5em"`, `"2ex"`, `"50%"` or `"auto"`. A bare number is
    /// taken as pixels.
    fn from_str(s: &str) -> GuiResult<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let number: f32 = number
            .parse()
            .map_err(|_| GuiError::InvalidStyleValue(s.to_owned()))?;
        match unit.to_ascii_lowercase().as_str() {
            "" | "px" => Ok(Self::Px(number)),
            "pt" => Ok(Self::Pt(number)),
            "em" => Ok(Self::Em(number)),
            "ex" => Ok(Self::Ex(number)),
            "%" => Ok(Self::Percent(number)),
            _ => Err(GuiError::InvalidStyleValue(s.to_owned())),
        }
    }
}

/// Numbering of ordered list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderedListType {
    #[default]
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl OrderedListType {
    /// Format the 1-based item number.
    ///
    /// ```
    /// use trellis::widgets::text_area::OrderedListType;
    ///
    /// assert_eq!(OrderedListType::Decimal.format(12), "12");
    /// assert_eq!(OrderedListType::LowerAlpha.format(28), "ab");
    /// assert_eq!(OrderedListType::UpperRoman.format(1994), "MCMXCIV");
    /// ```
    pub fn format(self, number: i32) -> String {
        match self {
            Self::Decimal => number.to_string(),
            Self::LowerAlpha | Self::UpperAlpha if number < 1 => number.to_string(),
            Self::LowerAlpha => alpha(number, b'a'),
            Self::UpperAlpha => alpha(number, b'A'),
            Self::LowerRoman => roman(number).map_or_else(|| number.to_string(), |r| r.to_lowercase()),
            Self::UpperRoman => roman(number).unwrap_or_else(|| number.to_string()),
        }
    }

    /// Parse a CSS `list-style-type` name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "decimal" => Some(Self::Decimal),
            "lower-alpha" | "lower-latin" => Some(Self::LowerAlpha),
            "upper-alpha" | "upper-latin" => Some(Self::UpperAlpha),
            "lower-roman" => Some(Self::LowerRoman),
            "upper-roman" => Some(Self::UpperRoman),
            _ => None,
        }
    }
}

fn alpha(mut number: i32, base: u8) -> String {
    let mut digits = Vec::new();
    while number > 0 {
        number -= 1;
        digits.push((base + (number % 26) as u8) as char);
        number /= 26;
    }
    digits.iter().rev().collect()
}

fn roman(mut number: i32) -> Option<String> {
    const TABLE: [(i32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    if !(1..4000).contains(&number) {
        return None;
    }
    let mut out = String::new();
    for (value, digits) in TABLE {
        while number >= value {
            out.push_str(digits);
            number -= value;
        }
    }
    Some(out)
}

/// A stored attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    HAlignment(HAlignment),
    VAlignment(VAlignment),
    Value(Value),
    Decoration(TextDecoration),
    OptDecoration(Option<TextDecoration>),
    Families(Vec<String>),
    Int(i32),
    Bool(bool),
    Text(Option<String>),
    Color(Color),
    OptColor(Option<Color>),
    ListType(OrderedListType),
    Clear(Clear),
    Display(Display),
    Float(FloatPosition),
}

/// Rust types usable as attribute values.
pub trait AttributeType: Clone + 'static {
    fn into_style_value(self) -> StyleValue;
    fn from_style_value(value: &StyleValue) -> Option<Self>;
}

macro_rules! attribute_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl AttributeType for $ty {
                fn into_style_value(self) -> StyleValue {
                    StyleValue::$variant(self)
                }

                fn from_style_value(value: &StyleValue) -> Option<Self> {
                    match value {
                        StyleValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

attribute_type! {
    HAlignment => HAlignment,
    VAlignment => VAlignment,
    Value => Value,
    TextDecoration => Decoration,
    Option<TextDecoration> => OptDecoration,
    Vec<String> => Families,
    i32 => Int,
    bool => Bool,
    Option<String> => Text,
    Color => Color,
    Option<Color> => OptColor,
    OrderedListType => ListType,
    Clear => Clear,
    Display => Display,
    FloatPosition => Float,
}

/// A typed style attribute.
///
/// Inherited attributes are looked up along the parent chain; the others only on the
/// style itself and its style sheet entry.
pub struct StyleAttribute<T> {
    ordinal: usize,
    name: &'static str,
    inherited: bool,
    default: fn() -> T,
    _type: PhantomData<fn() -> T>,
}

impl<T> StyleAttribute<T> {
    const fn new(ordinal: usize, name: &'static str, inherited: bool, default: fn() -> T) -> Self {
        Self {
            ordinal,
            name,
            inherited,
            default,
            _type: PhantomData,
        }
    }

    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

impl<T> fmt::Debug for StyleAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The attribute set.
pub mod attributes {
    use trellis_render::Color;

    use super::{OrderedListType, StyleAttribute, Value};
    use crate::widgets::text_area::model::{
        Clear, Display, FloatPosition, HAlignment, TextDecoration, VAlignment,
    };

    /// Number of attributes; ordinals are `0..COUNT`.
    pub const COUNT: usize = 33;

    // inherited
    pub const HORIZONTAL_ALIGNMENT: StyleAttribute<HAlignment> =
        StyleAttribute::new(0, "horizontal-alignment", true, || HAlignment::Left);
    pub const VERTICAL_ALIGNMENT: StyleAttribute<VAlignment> =
        StyleAttribute::new(1, "vertical-alignment", true, || VAlignment::Bottom);
    pub const TEXT_INDENT: StyleAttribute<Value> =
        StyleAttribute::new(2, "text-indent", true, || Value::ZERO_PX);
    pub const TEXT_DECORATION: StyleAttribute<TextDecoration> =
        StyleAttribute::new(3, "text-decoration", true, || TextDecoration::None);
    /// Decoration while hovered; `None` keeps the normal decoration.
    pub const TEXT_DECORATION_HOVER: StyleAttribute<Option<TextDecoration>> =
        StyleAttribute::new(4, "text-decoration-hover", true, || None);
    pub const FONT_FAMILIES: StyleAttribute<Vec<String>> =
        StyleAttribute::new(5, "font-family", true, || vec!["default".to_owned()]);
    pub const FONT_SIZE: StyleAttribute<Value> =
        StyleAttribute::new(6, "font-size", true, || Value::Px(14.0));
    pub const FONT_WEIGHT: StyleAttribute<i32> =
        StyleAttribute::new(7, "font-weight", true, || 400);
    pub const FONT_ITALIC: StyleAttribute<bool> =
        StyleAttribute::new(8, "font-italic", true, || false);
    pub const TAB_SIZE: StyleAttribute<i32> = StyleAttribute::new(9, "tab-size", true, || 8);
    pub const LIST_STYLE_IMAGE: StyleAttribute<Option<String>> =
        StyleAttribute::new(10, "list-style-image", true, || Some("ul-bullet".to_owned()));
    pub const LIST_STYLE_TYPE: StyleAttribute<OrderedListType> =
        StyleAttribute::new(11, "list-style-type", true, OrderedListType::default);
    pub const PREFORMATTED: StyleAttribute<bool> =
        StyleAttribute::new(12, "preformatted", true, || false);
    pub const BREAK_WORD: StyleAttribute<bool> =
        StyleAttribute::new(13, "break-word", true, || false);
    pub const COLOR: StyleAttribute<Color> = StyleAttribute::new(14, "color", true, || Color::WHITE);
    pub const COLOR_HOVER: StyleAttribute<Option<Color>> =
        StyleAttribute::new(15, "color-hover", true, || None);
    pub const INHERIT_HOVER: StyleAttribute<bool> =
        StyleAttribute::new(16, "inherit-hover", true, || false);

    // not inherited
    pub const CLEAR: StyleAttribute<Clear> = StyleAttribute::new(17, "clear", false, || Clear::None);
    pub const DISPLAY: StyleAttribute<Display> =
        StyleAttribute::new(18, "display", false, || Display::Inline);
    pub const FLOAT_POSITION: StyleAttribute<FloatPosition> =
        StyleAttribute::new(19, "float", false, || FloatPosition::None);
    pub const WIDTH: StyleAttribute<Value> = StyleAttribute::new(20, "width", false, || Value::Auto);
    pub const HEIGHT: StyleAttribute<Value> = StyleAttribute::new(21, "height", false, || Value::Auto);
    pub const BACKGROUND_IMAGE: StyleAttribute<Option<String>> =
        StyleAttribute::new(22, "background-image", false, || None);
    pub const BACKGROUND_COLOR: StyleAttribute<Color> =
        StyleAttribute::new(23, "background-color", false, || Color::TRANSPARENT);
    pub const BACKGROUND_COLOR_HOVER: StyleAttribute<Option<Color>> =
        StyleAttribute::new(24, "background-color-hover", false, || None);
    pub const MARGIN_TOP: StyleAttribute<Value> =
        StyleAttribute::new(25, "margin-top", false, || Value::ZERO_PX);
    pub const MARGIN_LEFT: StyleAttribute<Value> =
        StyleAttribute::new(26, "margin-left", false, || Value::ZERO_PX);
    pub const MARGIN_RIGHT: StyleAttribute<Value> =
        StyleAttribute::new(27, "margin-right", false, || Value::ZERO_PX);
    pub const MARGIN_BOTTOM: StyleAttribute<Value> =
        StyleAttribute::new(28, "margin-bottom", false, || Value::ZERO_PX);
    pub const PADDING_TOP: StyleAttribute<Value> =
        StyleAttribute::new(29, "padding-top", false, || Value::ZERO_PX);
    pub const PADDING_LEFT: StyleAttribute<Value> =
        StyleAttribute::new(30, "padding-left", false, || Value::ZERO_PX);
    pub const PADDING_RIGHT: StyleAttribute<Value> =
        StyleAttribute::new(31, "padding-right", false, || Value::ZERO_PX);
    pub const PADDING_BOTTOM: StyleAttribute<Value> =
        StyleAttribute::new(32, "padding-bottom", false, || Value::ZERO_PX);
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    value: StyleValue,
    inherited: bool,
}

/// Selects a style sheet entry for a style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StyleSheetKey {
    pub element: Option<String>,
    pub class_name: Option<String>,
    pub id: Option<String>,
}

impl StyleSheetKey {
    pub fn new(element: Option<&str>, class_name: Option<&str>, id: Option<&str>) -> Self {
        Self {
            element: element.map(str::to_owned),
            class_name: class_name.map(str::to_owned),
            id: id.map(str::to_owned),
        }
    }

    pub fn element(name: &str) -> Self {
        Self::new(Some(name), None, None)
    }

    /// Whether this key, used as a selector, matches `key`. Unset parts match anything.
    pub fn matches(&self, key: &StyleSheetKey) -> bool {
        fn part(selector: &Option<String>, value: &Option<String>) -> bool {
            selector.is_none() || selector == value
        }
        part(&self.element, &key.element) && part(&self.class_name, &key.class_name) && part(&self.id, &key.id)
    }
}

/// Maps a style to its style sheet entry.
pub trait StyleSheetResolver {
    /// Called before a layout pass.
    fn start_layout(&self) {}

    /// The style sheet entry for `style`'s key.
    fn resolve(&self, style: &Style) -> Option<Rc<Style>>;

    /// Called after a layout pass.
    fn layout_finished(&self) {}
}

/// A set of styled elements.
#[derive(Debug, Clone, Default)]
pub struct Style {
    parent: Option<Rc<Style>>,
    key: Option<StyleSheetKey>,
    values: Vec<Option<Slot>>,
}

impl Style {
    /// An empty root style.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_of(parent: &Rc<Style>, key: Option<StyleSheetKey>) -> Self {
        Self {
            parent: Some(Rc::clone(parent)),
            key,
            values: Vec::new(),
        }
    }

    /// A root style carrying a style sheet key.
    pub fn with_key(key: StyleSheetKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    pub fn parent(&self) -> Option<&Rc<Style>> {
        self.parent.as_ref()
    }

    pub fn style_sheet_key(&self) -> Option<&StyleSheetKey> {
        self.key.as_ref()
    }

    /// Builder form of [`put`](Self::put).
    pub fn with<T: AttributeType>(mut self, attribute: &StyleAttribute<T>, value: T) -> Self {
        self.put(attribute, value);
        self
    }

    pub fn put<T: AttributeType>(&mut self, attribute: &StyleAttribute<T>, value: T) {
        if self.values.len() <= attribute.ordinal {
            self.values.resize(attributes::COUNT.max(attribute.ordinal + 1), None);
        }
        self.values[attribute.ordinal] = Some(Slot {
            value: value.into_style_value(),
            inherited: attribute.inherited,
        });
    }

    pub fn remove<T>(&mut self, attribute: &StyleAttribute<T>) {
        if let Some(slot) = self.values.get_mut(attribute.ordinal) {
            *slot = None;
        }
    }

    fn raw_value(&self, ordinal: usize) -> Option<&StyleValue> {
        self.values.get(ordinal)?.as_ref().map(|slot| &slot.value)
    }

    /// The value stored on this style itself, ignoring parents and style sheets.
    pub fn raw<T: AttributeType>(&self, attribute: &StyleAttribute<T>) -> Option<T> {
        self.raw_value(attribute.ordinal).and_then(T::from_style_value)
    }

    /// The value of this style or its style sheet entry, or the attribute default.
    pub fn get_no_resolve<T: AttributeType>(
        &self,
        attribute: &StyleAttribute<T>,
        resolver: Option<&dyn StyleSheetResolver>,
    ) -> T {
        if let Some(value) = self.raw(attribute) {
            return value;
        }
        if let (Some(resolver), Some(_)) = (resolver, &self.key)
            && let Some(sheet) = resolver.resolve(self)
            && let Some(value) = sheet.raw(attribute)
        {
            return value;
        }
        attribute.default_value()
    }

    fn defines(&self, ordinal: usize, resolver: Option<&dyn StyleSheetResolver>) -> bool {
        if self.raw_value(ordinal).is_some() {
            return true;
        }
        match (resolver, &self.key) {
            (Some(resolver), Some(_)) => resolver
                .resolve(self)
                .is_some_and(|sheet| sheet.raw_value(ordinal).is_some()),
            _ => false,
        }
    }

    /// The style that supplies `attribute`: `self` for non-inherited attributes,
    /// otherwise the nearest style in the parent chain that defines it (or the root).
    pub fn resolve<T>(&self, attribute: &StyleAttribute<T>, resolver: Option<&dyn StyleSheetResolver>) -> &Style {
        if !attribute.inherited {
            return self;
        }
        let mut style = self;
        loop {
            match &style.parent {
                None => return style,
                Some(_) if style.defines(attribute.ordinal, resolver) => return style,
                Some(parent) => style = parent.as_ref(),
            }
        }
    }

    pub fn get<T: AttributeType>(
        &self,
        attribute: &StyleAttribute<T>,
        resolver: Option<&dyn StyleSheetResolver>,
    ) -> T {
        self.resolve(attribute, resolver).get_no_resolve(attribute, resolver)
    }

    /// Copy every value set on `other` into this style.
    pub fn put_all(&mut self, other: &Style) {
        if other.values.is_empty() {
            return;
        }
        if self.values.len() < other.values.len() {
            self.values.resize(other.values.len(), None);
        }
        for (dst, src) in self.values.iter_mut().zip(&other.values) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
    }

    /// A copy of this style keeping only inherited attributes.
    pub fn without_non_inheritable(&self) -> Style {
        let mut copy = self.clone();
        for slot in &mut copy.values {
            if slot.as_ref().is_some_and(|s| !s.inherited) {
                *slot = None;
            }
        }
        copy
    }
}

/// A list of selector rules resolved in insertion order; later rules win.
#[derive(Debug, Default)]
pub struct StyleSheet {
    rules: Vec<(StyleSheetKey, Style)>,
    cache: RefCell<HashMap<StyleSheetKey, Option<Rc<Style>>>>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraphs and unordered lists get one `em` of bottom margin.
    pub fn default_sheet() -> Self {
        let margin = Style::new().with(&attributes::MARGIN_BOTTOM, Value::Em(1.0));
        let mut sheet = Self::new();
        sheet.add_rule(StyleSheetKey::element("p"), margin.clone());
        sheet.add_rule(StyleSheetKey::element("ul"), margin);
        sheet
    }

    pub fn add_rule(&mut self, selector: StyleSheetKey, style: Style) {
        self.rules.push((selector, style));
        self.cache.get_mut().clear();
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }
}

impl StyleSheetResolver for StyleSheet {
    fn resolve(&self, style: &Style) -> Option<Rc<Style>> {
        let key = style.style_sheet_key()?;
        if let Some(cached) = self.cache.borrow().get(key) {
            return cached.clone();
        }
        let mut merged: Option<Style> = None;
        for (selector, rule) in &self.rules {
            if selector.matches(key) {
                merged.get_or_insert_with(Style::new).put_all(rule);
            }
        }
        let merged = merged.map(Rc::new);
        self.cache.borrow_mut().insert(key.clone(), merged.clone());
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::attributes::*;
    use super::*;

    #[test]
    fn test_value_parse() {
        assert_eq!("12px".parse::<Value>().unwrap(), Value::Px(12.0));
        assert_eq!("1.5em".parse::<Value>().unwrap(), Value::Em(1.5));
        assert_eq!("50%".parse::<Value>().unwrap(), Value::Percent(50.0));
        assert_eq!("AUTO".parse::<Value>().unwrap(), Value::Auto);
        assert_eq!("7".parse::<Value>().unwrap(), Value::Px(7.0));
        assert!("12furlongs".parse::<Value>().is_err());
        assert_eq!(Value::Pt(10.0).to_string(), "10pt");
    }

    #[test]
    fn test_inherited_lookup_walks_parents() {
        let root = Rc::new(Style::new().with(&COLOR, Color::RED).with(&WIDTH, Value::Px(10.0)));
        let mid = Rc::new(Style::child_of(&root, None));
        let leaf = Style::child_of(&mid, None);
        assert_eq!(leaf.get(&COLOR, None), Color::RED);
        assert_eq!(leaf.get(&WIDTH, None), Value::Auto);
        assert!(std::ptr::eq(leaf.resolve(&COLOR, None), root.as_ref()));
    }

    #[test]
    fn test_style_sheet_supplies_values() {
        let mut sheet = StyleSheet::new();
        sheet.add_rule(
            StyleSheetKey::new(None, Some("warn"), None),
            Style::new().with(&COLOR, Color::RED),
        );
        sheet.add_rule(
            StyleSheetKey::new(Some("p"), Some("warn"), None),
            Style::new().with(&TAB_SIZE, 4),
        );
        let root = Rc::new(Style::new().with(&COLOR, Color::BLUE));
        let styled = Rc::new(Style::child_of(&root, Some(StyleSheetKey::new(Some("p"), Some("warn"), None))));
        let leaf = Style::child_of(&styled, None);

        assert_eq!(leaf.get(&COLOR, Some(&sheet)), Color::RED);
        assert_eq!(leaf.get(&TAB_SIZE, Some(&sheet)), 4);
        assert_eq!(leaf.get(&COLOR, None), Color::BLUE);
    }

    #[test]
    fn test_default_sheet_margins() {
        let sheet = StyleSheet::default_sheet();
        let p = Style::with_key(StyleSheetKey::element("p"));
        assert_eq!(p.get(&MARGIN_BOTTOM, Some(&sheet)), Value::Em(1.0));
        let div = Style::with_key(StyleSheetKey::element("div"));
        assert_eq!(div.get(&MARGIN_BOTTOM, Some(&sheet)), Value::ZERO_PX);
    }

    #[test]
    fn test_without_non_inheritable() {
        let style = Style::new()
            .with(&MARGIN_LEFT, Value::Px(3.0))
            .with(&PREFORMATTED, true)
            .without_non_inheritable();
        assert_eq!(style.raw(&MARGIN_LEFT), None);
        assert_eq!(style.raw(&PREFORMATTED), Some(true));
    }

    #[test]
    fn test_list_numbering() {
        assert_eq!(OrderedListType::LowerAlpha.format(1), "a");
        assert_eq!(OrderedListType::LowerAlpha.format(26), "z");
        assert_eq!(OrderedListType::UpperAlpha.format(27), "AA");
        assert_eq!(OrderedListType::LowerRoman.format(4), "iv");
        assert_eq!(OrderedListType::UpperRoman.format(4000), "4000");
        assert_eq!(OrderedListType::by_name("upper-roman"), Some(OrderedListType::UpperRoman));
    }
}
