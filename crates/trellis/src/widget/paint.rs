//! Painting.

use trellis_render::Color;

use super::WidgetId;
use crate::gui::Gui;

/// A tint color that can fade between two colors over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TintAnimator {
    from: Color,
    to: Color,
    fade_start: i64,
    fade_duration: i64,
}

impl TintAnimator {
    /// A constant tint.
    pub fn new(color: Color) -> Self {
        Self {
            from: color,
            to: color,
            fade_start: 0,
            fade_duration: 0,
        }
    }

    /// Jump to `color` immediately.
    pub fn set_color(&mut self, color: Color) {
        *self = Self::new(color);
    }

    /// Fade from the current color to `color` over `duration_ms`, starting at `now`.
    pub fn fade_to(&mut self, color: Color, duration_ms: i64, now: i64) {
        self.from = self.color_at(now);
        self.to = color;
        self.fade_start = now;
        self.fade_duration = duration_ms.max(0);
    }

    /// Fade the alpha channel to zero.
    pub fn fade_to_hide(&mut self, duration_ms: i64, now: i64) {
        let target = self.to.with_alpha(0.0);
        self.fade_to(target, duration_ms, now);
    }

    pub fn is_fade_active(&self, now: i64) -> bool {
        self.fade_duration > 0 && now - self.fade_start < self.fade_duration
    }

    pub fn target(&self) -> Color {
        self.to
    }

    /// The interpolated tint at `now`.
    pub fn color_at(&self, now: i64) -> Color {
        if !self.is_fade_active(now) {
            return self.to;
        }
        let t = ((now - self.fade_start).max(0) as f32) / self.fade_duration as f32;
        let lerp = |a: f32, b: f32| a + (b - a) * t;
        Color {
            r: lerp(self.from.r, self.to.r),
            g: lerp(self.from.g, self.to.g),
            b: lerp(self.from.b, self.to.b),
            a: lerp(self.from.a, self.to.a),
        }
    }
}

impl Gui {
    /// Paint `id` and its subtree, applying tint and clip.
    pub(crate) fn draw_widget(&mut self, id: WidgetId) {
        let now = self.current_time();
        let base = self.base_of(id);
        let tint = base.tint.map(|t| t.color_at(now));
        let clip = base.is_clip().then(|| base.rect());

        if let Some(tint) = tint {
            self.renderer_mut().push_tint(tint);
        }
        match clip {
            Some(rect) => {
                self.renderer_mut().clip_enter(rect);
                if !self.renderer().clip_is_empty() {
                    self.with_behavior(id, |w, cx| w.paint(cx));
                }
                self.renderer_mut().clip_leave();
            }
            None => self.with_behavior(id, |w, cx| w.paint(cx)),
        }
        if tint.is_some() {
            self.renderer_mut().pop_tint();
        }
    }

    /// Paint every visible child of `id` in order.
    pub(crate) fn draw_children(&mut self, id: WidgetId) {
        let children = self.children_of(id).to_vec();
        for child in children {
            if self.contains(child) && self.base_of(child).is_visible() {
                self.draw_widget(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_tint() {
        let tint = TintAnimator::new(Color::RED);
        assert_eq!(tint.color_at(123), Color::RED);
        assert!(!tint.is_fade_active(0));
    }

    #[test]
    fn test_fade_interpolates() {
        let mut tint = TintAnimator::new(Color::WHITE);
        tint.fade_to_hide(100, 1000);
        assert!(tint.is_fade_active(1050));
        let mid = tint.color_at(1050);
        assert!((mid.a - 0.5).abs() < 1e-6);
        assert_eq!(tint.color_at(1100).a, 0.0);
        assert!(!tint.is_fade_active(1100));
    }
}
