//! Basic geometry and color types for rendering.
//!
//! Widget geometry is integral: positions and sizes are whole pixels. Colors are
//! linear RGBA floats.

use std::fmt;

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The origin point (0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Offset this point by `(dx, dy)`.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A size in 2D space (width and height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Zero size.
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    /// Check if the size has zero area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

impl From<(i32, i32)> for Size {
    fn from((width, height): (i32, i32)) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from origin and size.
    #[inline]
    pub const fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Create a rectangle spanning two corners; the corners may be in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether `(x, y)` lies inside; the right and bottom edges are exclusive.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// The overlapping area, or an empty rectangle at the clamped origin.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }

    /// The smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Translate the rectangle.
    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink the rectangle by the given border, clamping to zero size.
    pub fn inset(&self, border: Border) -> Rect {
        Rect::new(
            self.x + border.left,
            self.y + border.top,
            (self.width - border.horizontal()).max(0),
            (self.height - border.vertical()).max(0),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.width, self.height)
    }
}

/// Insets on the four sides of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Border {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Border {
    /// No insets.
    pub const ZERO: Self = Self::uniform(0);

    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// The same inset on every side.
    pub const fn uniform(size: i32) -> Self {
        Self::new(size, size, size, size)
    }

    /// `horz` on the left and right, `vert` on the top and bottom.
    pub const fn symmetric(horz: i32, vert: i32) -> Self {
        Self::new(vert, horz, vert, horz)
    }

    #[inline]
    pub const fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    #[inline]
    pub const fn vertical(&self) -> i32 {
        self.top + self.bottom
    }

    pub const fn is_zero(&self) -> bool {
        self.top == 0 && self.left == 0 && self.bottom == 0 && self.right == 0
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Placement of an object inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    Fill,
}

impl Alignment {
    /// Parse an alignment name, case-insensitively; unknown names map to [`Alignment::Fill`].
    pub fn by_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "LEFT" => Self::Left,
            "CENTER" => Self::Center,
            "RIGHT" => Self::Right,
            "TOP" => Self::Top,
            "BOTTOM" => Self::Bottom,
            "TOPLEFT" => Self::TopLeft,
            "TOPRIGHT" => Self::TopRight,
            "BOTTOMLEFT" => Self::BottomLeft,
            "BOTTOMRIGHT" => Self::BottomRight,
            _ => Self::Fill,
        }
    }

    /// Horizontal position in halves: 0 = left, 1 = center, 2 = right.
    pub const fn h_position(self) -> i32 {
        match self {
            Self::Left | Self::TopLeft | Self::BottomLeft => 0,
            Self::Right | Self::TopRight | Self::BottomRight => 2,
            Self::Center | Self::Top | Self::Bottom | Self::Fill => 1,
        }
    }

    /// Vertical position in halves: 0 = top, 1 = center, 2 = bottom.
    pub const fn v_position(self) -> i32 {
        match self {
            Self::Top | Self::TopLeft | Self::TopRight => 0,
            Self::Bottom | Self::BottomLeft | Self::BottomRight => 2,
            Self::Left | Self::Center | Self::Right | Self::Fill => 1,
        }
    }

    pub const fn font_h_alignment(self) -> HAlignment {
        match self.h_position() {
            0 => HAlignment::Left,
            2 => HAlignment::Right,
            _ => HAlignment::Center,
        }
    }

    pub fn compute_position_x(self, container_width: i32, object_width: i32) -> i32 {
        (container_width - object_width).max(0) * self.h_position() / 2
    }

    pub fn compute_position_y(self, container_height: i32, object_height: i32) -> i32 {
        (container_height - object_height).max(0) * self.v_position() / 2
    }
}

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::from_rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::from_rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::from_rgba(1.0, 1.0, 1.0, 1.0);
    pub const RED: Self = Self::from_rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Self = Self::from_rgba(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Self = Self::from_rgba(0.0, 0.0, 1.0, 1.0);

    /// Create a color from float components.
    #[inline]
    pub const fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit components.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Create an opaque color from 8-bit components.
    #[inline]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba8(r, g, b, 255)
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::from_rgb8(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
            )),
            6 => Some(Self::from_rgb8(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// The same color with a different alpha.
    #[inline]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { a: alpha, ..self }
    }

    /// Component-wise product, used to apply tint colors.
    pub fn multiply(self, other: Self) -> Self {
        Self::from_rgba(
            self.r * other.r,
            self.g * other.g,
            self.b * other.b,
            self.a * other.a,
        )
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_excludes_far_edges() {
        let r = Rect::new(10, 10, 5, 5);
        assert!(r.contains(10, 10));
        assert!(r.contains(14, 14));
        assert!(!r.contains(15, 10));
        assert!(!r.contains(9, 12));
    }

    #[test]
    fn test_rect_intersect_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert!(a.intersect(&Rect::new(20, 20, 1, 1)).is_empty());
    }

    #[test]
    fn test_alignment_positions() {
        assert_eq!(Alignment::BottomRight.compute_position_x(100, 20), 80);
        assert_eq!(Alignment::Center.compute_position_y(100, 20), 40);
        assert_eq!(Alignment::TopLeft.compute_position_x(10, 20), 0);
        assert_eq!(Alignment::by_name("bottomleft"), Alignment::BottomLeft);
        assert_eq!(Alignment::by_name("nonsense"), Alignment::Fill);
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("000000"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#ff000080").map(|c| c.r), Some(1.0));
        assert_eq!(Color::from_hex("#12"), None);
    }

    #[test]
    fn test_border_inset() {
        let r = Rect::new(0, 0, 10, 10).inset(Border::new(1, 2, 3, 4));
        assert_eq!(r, Rect::new(2, 1, 4, 6));
        assert_eq!(Rect::new(0, 0, 3, 3).inset(Border::uniform(5)).size(), Size::ZERO);
    }
}
