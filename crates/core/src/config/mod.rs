use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for a page session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub devices: DeviceConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Engine-wide switches that do not depend on the device class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    #[serde(default = "default_true")]
    pub smooth: bool,
    #[serde(default = "default_true")]
    pub clamp_to_content_bounds: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            smooth: true,
            clamp_to_content_bounds: true,
        }
    }
}

/// Per-class tuning values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    pub smoothing_factor: f64,
    pub input_multiplier: f64,
}

/// Breakpoints and per-class parameters used by [`crate::device::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_tablet_breakpoint")]
    pub tablet_breakpoint_px: u32,
    #[serde(default = "default_desktop_breakpoint")]
    pub desktop_breakpoint_px: u32,
    #[serde(default = "default_touch")]
    pub touch: ProfileParams,
    #[serde(default = "default_tablet")]
    pub tablet: ProfileParams,
    #[serde(default = "default_desktop")]
    pub desktop: ProfileParams,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            tablet_breakpoint_px: default_tablet_breakpoint(),
            desktop_breakpoint_px: default_desktop_breakpoint(),
            touch: default_touch(),
            tablet: default_tablet(),
            desktop: default_desktop(),
        }
    }
}

/// Delays, all in milliseconds of page clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Wait between reaching scroll-ready and binding animations.
    #[serde(default = "default_bind_delay")]
    pub bind_delay_ms: u64,
    /// Loading is forced to finish after this long.
    #[serde(default = "default_fallback_deadline")]
    pub fallback_deadline_ms: u64,
    #[serde(default = "default_resize_debounce")]
    pub resize_debounce_ms: u64,
    #[serde(default = "default_load_refresh")]
    pub load_refresh_ms: u64,
    #[serde(default = "default_visibility_resync")]
    pub visibility_resync_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            bind_delay_ms: default_bind_delay(),
            fallback_deadline_ms: default_fallback_deadline(),
            resize_debounce_ms: default_resize_debounce(),
            load_refresh_ms: default_load_refresh(),
            visibility_resync_ms: default_visibility_resync(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tablet_breakpoint() -> u32 {
    768
}

fn default_desktop_breakpoint() -> u32 {
    1024
}

fn default_touch() -> ProfileParams {
    ProfileParams {
        smoothing_factor: 0.15,
        input_multiplier: 1.5,
    }
}

fn default_tablet() -> ProfileParams {
    ProfileParams {
        smoothing_factor: 0.12,
        input_multiplier: 1.0,
    }
}

fn default_desktop() -> ProfileParams {
    ProfileParams {
        smoothing_factor: 0.1,
        input_multiplier: 0.8,
    }
}

fn default_bind_delay() -> u64 {
    500
}

fn default_fallback_deadline() -> u64 {
    5_000
}

fn default_resize_debounce() -> u64 {
    500
}

fn default_load_refresh() -> u64 {
    1_000
}

fn default_visibility_resync() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "lifecycle": { "bind_delay_ms": 0 } }"#).unwrap();

        assert_eq!(config.lifecycle.bind_delay_ms, 0);
        assert_eq!(config.lifecycle.fallback_deadline_ms, 5_000);
        assert_eq!(config.devices.tablet_breakpoint_px, 768);
        assert!(config.scroll.smooth);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::SmoothPageError::Json(_)));
    }
}
