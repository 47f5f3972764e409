use serde::{Deserialize, Serialize};

use crate::{config::DeviceConfig, SmoothPageError, Result};

/// Coarse device class derived from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceClass {
    Touch,
    Tablet,
    Desktop,
}

/// Behaviour parameters chosen for one device class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub smoothing_factor: f64,
    pub input_multiplier: f64,
    /// Upper width bound of the class. Desktop reports the desktop breakpoint.
    pub breakpoint_px: u32,
}

impl DeviceProfile {
    pub fn validate(&self) -> Result<()> {
        validate_params(self.smoothing_factor, self.input_multiplier)
    }
}

/// Maps a viewport width onto a profile. Pure and deterministic.
pub fn resolve(viewport_width_px: u32, config: &DeviceConfig) -> DeviceProfile {
    let class = classify(viewport_width_px, config);
    let (params, breakpoint_px) = match class {
        DeviceClass::Touch => (config.touch, config.tablet_breakpoint_px),
        DeviceClass::Tablet => (config.tablet, config.desktop_breakpoint_px),
        DeviceClass::Desktop => (config.desktop, config.desktop_breakpoint_px),
    };

    DeviceProfile {
        class,
        smoothing_factor: params.smoothing_factor,
        input_multiplier: params.input_multiplier,
        breakpoint_px,
    }
}

pub fn classify(viewport_width_px: u32, config: &DeviceConfig) -> DeviceClass {
    if viewport_width_px < config.tablet_breakpoint_px {
        DeviceClass::Touch
    } else if viewport_width_px < config.desktop_breakpoint_px {
        DeviceClass::Tablet
    } else {
        DeviceClass::Desktop
    }
}

pub(crate) fn validate_params(smoothing_factor: f64, input_multiplier: f64) -> Result<()> {
    if !(smoothing_factor > 0.0 && smoothing_factor <= 1.0) {
        return Err(SmoothPageError::config(format!(
            "smoothing factor {smoothing_factor} must lie in (0, 1]"
        )));
    }
    if !(input_multiplier.is_finite() && input_multiplier > 0.0) {
        return Err(SmoothPageError::config(format!(
            "input multiplier {input_multiplier} must be positive"
        )));
    }
    Ok(())
}
