//! GUI configuration.
//!
//! Everything that used to be a process-wide knob lives in [`GuiConfig`], handed to
//! [`Gui::new`](crate::Gui::new). Configurations can be built in code or loaded from TOML.

use serde::Deserialize;

use crate::error::{GuiError, GuiResult};

/// Timing and debugging parameters of a [`Gui`](crate::Gui).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuiConfig {
    /// Log every layout validation pass.
    pub debug_layout: bool,
    /// Warn when an input map action reaches a widget that does not handle it.
    pub warn_on_unhandled_action: bool,
    tooltip_delay_ms: i64,
    tooltip_reappear_delay_ms: i64,
    /// Offset from the mouse position to the tooltip's anchor.
    pub tooltip_offset: (i32, i32),
    mouse_idle_ms: i64,
    /// Movement (in pixels) with a button held before a drag starts.
    pub drag_distance: i32,
    /// Maximum time between clicks of a multi-click.
    pub double_click_ms: i64,
    pub key_repeat_initial_ms: i64,
    pub key_repeat_interval_ms: i64,
    /// Cap on layout validation passes per frame.
    pub max_layout_iterations: u32,
}

static_assertions::assert_impl_all!(GuiConfig: Send, Sync);

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            debug_layout: false,
            warn_on_unhandled_action: false,
            tooltip_delay_ms: 1000,
            tooltip_reappear_delay_ms: 100,
            tooltip_offset: (0, 0),
            mouse_idle_ms: 60,
            drag_distance: 3,
            double_click_ms: 500,
            key_repeat_initial_ms: 250,
            key_repeat_interval_ms: 33,
            max_layout_iterations: 1000,
        }
    }
}

impl GuiConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis::GuiConfig;
    ///
    /// let config = GuiConfig::from_toml_str("tooltip_delay_ms = 400\ndebug_layout = true").unwrap();
    /// assert_eq!(config.tooltip_delay_ms(), 400);
    /// assert!(config.debug_layout);
    /// ```
    pub fn from_toml_str(source: &str) -> GuiResult<Self> {
        let config: GuiConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GuiResult<()> {
        if self.tooltip_delay_ms < 1 {
            return Err(GuiError::InvalidConfig(format!(
                "tooltip_delay_ms must be >= 1, got {}",
                self.tooltip_delay_ms
            )));
        }
        if self.mouse_idle_ms < 1 {
            return Err(GuiError::InvalidConfig(format!(
                "mouse_idle_ms must be >= 1, got {}",
                self.mouse_idle_ms
            )));
        }
        if self.tooltip_reappear_delay_ms < 0 {
            return Err(GuiError::InvalidConfig(format!(
                "tooltip_reappear_delay_ms must not be negative, got {}",
                self.tooltip_reappear_delay_ms
            )));
        }
        Ok(())
    }

    pub fn tooltip_delay_ms(&self) -> i64 {
        self.tooltip_delay_ms
    }

    /// # Errors
    ///
    /// Returns [`GuiError::InvalidConfig`] if `delay < 1`.
    pub fn set_tooltip_delay_ms(&mut self, delay: i64) -> GuiResult<()> {
        if delay < 1 {
            return Err(GuiError::InvalidConfig(format!(
                "tooltip_delay_ms must be >= 1, got {delay}"
            )));
        }
        self.tooltip_delay_ms = delay;
        Ok(())
    }

    pub fn tooltip_reappear_delay_ms(&self) -> i64 {
        self.tooltip_reappear_delay_ms
    }

    /// # Errors
    ///
    /// Returns [`GuiError::InvalidConfig`] if `delay` is negative.
    pub fn set_tooltip_reappear_delay_ms(&mut self, delay: i64) -> GuiResult<()> {
        if delay < 0 {
            return Err(GuiError::InvalidConfig(format!(
                "tooltip_reappear_delay_ms must not be negative, got {delay}"
            )));
        }
        self.tooltip_reappear_delay_ms = delay;
        Ok(())
    }

    pub fn mouse_idle_ms(&self) -> i64 {
        self.mouse_idle_ms
    }

    /// # Errors
    ///
    /// Returns [`GuiError::InvalidConfig`] if `idle < 1`.
    pub fn set_mouse_idle_ms(&mut self, idle: i64) -> GuiResult<()> {
        if idle < 1 {
            return Err(GuiError::InvalidConfig(format!(
                "mouse_idle_ms must be >= 1, got {idle}"
            )));
        }
        self.mouse_idle_ms = idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuiConfig::default();
        assert_eq!(config.tooltip_delay_ms(), 1000);
        assert_eq!(config.tooltip_reappear_delay_ms(), 100);
        assert_eq!(config.mouse_idle_ms(), 60);
        assert_eq!(config.drag_distance, 3);
        assert_eq!(config.double_click_ms, 500);
        assert_eq!(config.max_layout_iterations, 1000);
    }

    #[test]
    fn test_toml_keeps_missing_defaults() {
        let config = GuiConfig::from_toml_str("drag_distance = 5\ntooltip_offset = [4, 8]").unwrap();
        assert_eq!(config.drag_distance, 5);
        assert_eq!(config.tooltip_offset, (4, 8));
        assert_eq!(config.key_repeat_initial_ms, 250);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = GuiConfig::from_toml_str("tooltip_dealy_ms = 5").unwrap_err();
        assert!(matches!(err, GuiError::ConfigParse(_)));
    }

    #[test]
    fn test_toml_rejects_invalid_delay() {
        let err = GuiConfig::from_toml_str("mouse_idle_ms = 0").unwrap_err();
        assert!(matches!(err, GuiError::InvalidConfig(_)));
    }

    #[test]
    fn test_setters_validate() {
        let mut config = GuiConfig::default();
        assert!(config.set_tooltip_delay_ms(0).is_err());
        assert!(config.set_mouse_idle_ms(-3).is_err());
        config.set_tooltip_delay_ms(250).unwrap();
        assert_eq!(config.tooltip_delay_ms(), 250);
    }
}
