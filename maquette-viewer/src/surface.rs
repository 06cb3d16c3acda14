//! Drawing surfaces
//!
//! The viewer does not own a graphics backend. Each frame it hands a
//! [`Frame`] to the host's [`RenderSurface`], which turns it into GPU work.

use std::cell::RefCell;
use std::rc::Rc;

use maquette_core::NormalizedScene;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraState, Viewport};
use crate::config::Lighting;
use crate::governor::RenderMode;
use crate::viewer::ViewerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderPrecision {
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    LowPower,
    HighPerformance,
}

/// Context and quality settings for a viewer's surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSettings {
    pub antialias: bool,
    pub precision: ShaderPrecision,
    /// Device pixel ratio range `(min, max)`
    pub pixel_ratio: (f32, f32),
    pub tone_mapping: bool,
    /// Transparent background
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub power_preference: PowerPreference,
}

impl SurfaceSettings {
    pub fn interactive() -> Self {
        Self {
            antialias: true,
            precision: ShaderPrecision::High,
            pixel_ratio: (1.0, 2.0),
            tone_mapping: true,
            ..Self::preview()
        }
    }

    pub fn preview() -> Self {
        Self {
            antialias: false,
            precision: ShaderPrecision::Medium,
            pixel_ratio: (1.0, 1.0),
            tone_mapping: false,
            alpha: true,
            depth: true,
            stencil: false,
            power_preference: PowerPreference::HighPerformance,
        }
    }

    /// Clamp a device pixel ratio into this surface's range
    pub fn effective_pixel_ratio(&self, device: f32) -> f32 {
        let (min, max) = self.pixel_ratio;
        if device.is_finite() {
            device.max(min).min(max)
        } else {
            min
        }
    }
}

/// Everything a surface needs to draw one viewer frame
#[derive(Debug)]
pub struct Frame<'a> {
    pub viewer: ViewerId,
    pub frame: u64,
    pub mode: RenderMode,
    pub camera: CameraState,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    /// `None` draws an empty placeholder
    pub scene: Option<&'a NormalizedScene>,
    pub lighting: &'a Lighting,
    pub viewport: Viewport,
    pub settings: &'a SurfaceSettings,
}

/// Host-provided drawing target, one per viewer
pub trait RenderSurface {
    fn draw(&mut self, frame: &Frame<'_>);

    /// Called once when the viewer is dropped
    fn release(&mut self) {}
}

/// One recorded [`RenderSurface::draw`] call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub viewer: ViewerId,
    pub frame: u64,
    pub mode: RenderMode,
    pub camera: CameraState,
    pub primitives: Option<usize>,
    pub antialias: bool,
}

/// Surface that records draws instead of issuing them. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    draws: Rc<RefCell<Vec<DrawRecord>>>,
    released: Rc<RefCell<bool>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.draws.borrow().clone()
    }

    pub fn draw_count(&self) -> usize {
        self.draws.borrow().len()
    }

    pub fn last(&self) -> Option<DrawRecord> {
        self.draws.borrow().last().cloned()
    }

    pub fn is_released(&self) -> bool {
        *self.released.borrow()
    }
}

impl RenderSurface for RecordingSurface {
    fn draw(&mut self, frame: &Frame<'_>) {
        self.draws.borrow_mut().push(DrawRecord {
            viewer: frame.viewer,
            frame: frame.frame,
            mode: frame.mode,
            camera: frame.camera,
            primitives: frame.scene.map(|scene| scene.root.primitive_count()),
            antialias: frame.settings.antialias,
        });
    }

    fn release(&mut self) {
        *self.released.borrow_mut() = true;
    }
}
