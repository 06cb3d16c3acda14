//! Viewer configuration
//!
//! Every tunable of the viewer lives here with its default. The whole tree
//! is serde-enabled so a host can load it from JSON and override single
//! fields; missing fields fall back to [`Default`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::surface::SurfaceSettings;

/// Top-level configuration shared by every viewer instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub transition: TransitionConfig,
    pub orbit: OrbitConfig,
    pub governor: GovernorConfig,
    pub lighting: Lighting,
    pub quality: QualityConfig,
}

/// Camera presets and clip planes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub preview_position: [f32; 3],
    pub preview_zoom: f32,
    /// Nominal zoom of the interactive mode, kept for parity with the preview
    /// preset. Nothing reads it: opening a viewer keeps the current camera.
    pub interactive_zoom: f32,
    pub target: [f32; 3],
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            preview_position: [5.0, 4.0, 5.0],
            preview_zoom: 65.0,
            interactive_zoom: 85.0,
            target: [0.0, 0.0, 0.0],
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Return-to-preview animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Fraction of the remaining distance covered per rendered frame
    pub smoothing: f32,
    pub position_epsilon: f32,
    pub zoom_epsilon: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.03,
            position_epsilon: 0.01,
            zoom_epsilon: 0.1,
        }
    }
}

/// Orbit control limits, used only while a viewer is interactive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            damping: true,
            damping_factor: 0.05,
            min_distance: 4.0,
            max_distance: 15.0,
            min_polar_angle: 0.0,
            max_polar_angle: std::f32::consts::PI / 2.2,
            min_zoom: 1.0,
            max_zoom: 1000.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

/// Render-loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Continuous rendering kept after closing, in milliseconds
    pub close_hold_ms: u64,
    /// Continuous rendering kept after the first frame, in milliseconds
    pub settle_delay_ms: u64,
}

impl GovernorConfig {
    pub fn close_hold(&self) -> Duration {
        Duration::from_millis(self.close_hold_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            close_hold_ms: 2000,
            settle_delay_ms: 100,
        }
    }
}

/// Fixed scene lighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    pub ambient_intensity: f32,
    pub directional_position: [f32; 3],
    pub directional_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_intensity: 1.8,
            directional_position: [10.0, 10.0, 5.0],
            directional_intensity: 1.2,
        }
    }
}

/// Surface settings per viewer mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub interactive: SurfaceSettings,
    pub preview: SurfaceSettings,
}

impl QualityConfig {
    pub fn for_mode(&self, interactive: bool) -> &SurfaceSettings {
        if interactive {
            &self.interactive
        } else {
            &self.preview
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            interactive: SurfaceSettings::interactive(),
            preview: SurfaceSettings::preview(),
        }
    }
}
