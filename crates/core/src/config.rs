//! Run configuration for the renderer.
//!
//! The validation toggle is deliberately a runtime flag rather than a
//! compile-time switch so tests and callers can inject either setting.

/// Configuration for a renderer session.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// Whether to request the Khronos validation layer and debug messenger.
    pub validation: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan".to_string(),
            validation: cfg!(debug_assertions),
        }
    }
}

impl RenderConfig {
    /// Builds a configuration from defaults plus environment overrides.
    ///
    /// `TRI_VALIDATION=0` (or `false`/`off`) disables validation; any other
    /// value enables it. Unset leaves the build-profile default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("TRI_VALIDATION") {
            config.validation = !matches!(value.as_str(), "0" | "false" | "off");
        }

        config
    }

    /// Returns the configured window size as a `(width, height)` pair.
    #[inline]
    pub fn window_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_size() {
        let config = RenderConfig::default();
        assert_eq!(config.window_size(), (800, 600));
        assert_eq!(config.title, "Vulkan");
    }

    #[test]
    fn validation_follows_build_profile_by_default() {
        let config = RenderConfig::default();
        assert_eq!(config.validation, cfg!(debug_assertions));
    }
}
