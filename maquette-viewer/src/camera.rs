//! Orthographic camera and camera presets

use nalgebra::{Matrix4, Orthographic3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;

/// Position and zoom of a viewer camera, the two values a transition animates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Point3<f32>,
    pub zoom: f32,
}

impl CameraState {
    pub fn new(position: Point3<f32>, zoom: f32) -> Self {
        Self { position, zoom }
    }

    /// The fixed three-quarter view every preview rests in
    pub fn preview(config: &CameraConfig) -> Self {
        Self::new(Point3::from(config.preview_position), config.preview_zoom)
    }

    /// Move a fraction `t` of the remaining way towards `target`
    pub fn lerp_towards(&mut self, target: &CameraState, t: f32) {
        self.position.coords = self.position.coords.lerp(&target.position.coords, t);
        self.zoom += (target.zoom - self.zoom) * t;
    }

    pub fn position_distance(&self, other: &CameraState) -> f32 {
        (self.position - other.position).norm()
    }

    pub fn zoom_distance(&self, other: &CameraState) -> f32 {
        (self.zoom - other.zoom).abs()
    }

    /// True when both the position and zoom are strictly inside their tolerances
    pub fn is_within(&self, other: &CameraState, position_epsilon: f32, zoom_epsilon: f32) -> bool {
        self.position_distance(other) < position_epsilon && self.zoom_distance(other) < zoom_epsilon
    }
}

/// Drawing area of a viewer in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// A viewport with no area draws nothing
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width / self.height
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(640.0, 480.0)
    }
}

/// An orthographic camera looking at a fixed target.
///
/// `zoom` is in pixels per world unit: the visible half-width is
/// `viewport.width / (2 * zoom)`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: Viewport,
}

impl OrthographicCamera {
    pub fn new(state: CameraState, config: &CameraConfig, viewport: Viewport) -> Self {
        Self {
            position: state.position,
            target: Point3::from(config.target),
            up: Vector3::y(),
            zoom: state.zoom,
            near: config.near,
            far: config.far,
            viewport,
        }
    }

    pub fn state(&self) -> CameraState {
        CameraState::new(self.position, self.zoom)
    }

    pub fn set_state(&mut self, state: &CameraState) {
        self.position = state.position;
        self.zoom = state.zoom;
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let zoom = self.zoom.max(f32::EPSILON);
        let (width, height) = if self.viewport.is_empty() {
            (1.0, 1.0)
        } else {
            (self.viewport.width, self.viewport.height)
        };
        let half_w = width / (2.0 * zoom);
        let half_h = height / (2.0 * zoom);
        Orthographic3::new(-half_w, half_w, -half_h, half_h, self.near, self.far).into_inner()
    }

    /// Distance from the camera to its target
    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        let config = CameraConfig::default();
        Self::new(CameraState::preview(&config), &config, Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preview_state() {
        let state = CameraState::preview(&CameraConfig::default());
        assert_eq!(state.position, Point3::new(5.0, 4.0, 5.0));
        assert_eq!(state.zoom, 65.0);
    }

    #[test]
    fn test_lerp_covers_fraction_of_remaining_distance() {
        let mut state = CameraState::new(Point3::new(10.0, 0.0, 0.0), 100.0);
        let target = CameraState::new(Point3::origin(), 0.0);
        state.lerp_towards(&target, 0.25);
        assert_relative_eq!(state.position, Point3::new(7.5, 0.0, 0.0));
        assert_relative_eq!(state.zoom, 75.0);
    }

    #[test]
    fn test_is_within_is_strict() {
        let a = CameraState::new(Point3::origin(), 65.0);
        let b = CameraState::new(Point3::new(0.005, 0.0, 0.0), 65.05);
        assert!(a.is_within(&b, 0.01, 0.1));
        assert!(!a.is_within(&b, 0.005, 0.1));
    }

    #[test]
    fn test_projection_uses_zoom_and_viewport() {
        let mut camera = OrthographicCamera::default();
        camera.viewport = Viewport::new(650.0, 130.0);
        camera.zoom = 65.0;
        // half extents 5 x 1, so x = 5 in view space maps to the right edge
        let p = camera.projection_matrix().transform_point(&Point3::new(5.0, 1.0, -1.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_view_matrix_looks_at_target() {
        let camera = OrthographicCamera::default();
        let target_in_view = camera.view_matrix().transform_point(&camera.target);
        assert_relative_eq!(target_in_view.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target_in_view.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(target_in_view.z, -camera.distance(), epsilon = 1e-4);
    }

    #[test]
    fn test_empty_viewport() {
        assert!(Viewport::new(0.0, 100.0).is_empty());
        assert!(Viewport::new(f32::NAN, 100.0).is_empty());
        assert!(!Viewport::new(1.0, 1.0).is_empty());
        assert_eq!(Viewport::new(0.0, 0.0).aspect_ratio(), 1.0);
    }
}
