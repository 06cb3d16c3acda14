//! Orbit controls for interactive viewers
//!
//! Rotation input accumulates a spherical delta around the camera target that
//! [`OrbitControls::update`] applies once per frame. With damping enabled only
//! a fraction of the delta is applied and the rest decays, so the camera
//! keeps gliding for a few frames after the input stops.

use std::f32::consts::PI;

use nalgebra::Vector3;

use crate::camera::{CameraState, OrthographicCamera};
use crate::config::OrbitConfig;

const EPS: f32 = 1e-6;

/// Smallest camera change reported as movement
const MOVE_EPS: f32 = 1e-4;

/// Zoom multiplier for one wheel step at unit zoom speed
const ZOOM_STEP: f32 = 0.95;

#[derive(Debug, Clone, Copy)]
struct Spherical {
    radius: f32,
    /// Azimuth around +Y, measured from +Z
    theta: f32,
    /// Polar angle from +Y
    phi: f32,
}

impl Spherical {
    fn from_offset(offset: &Vector3<f32>) -> Self {
        let radius = offset.norm();
        if radius < EPS {
            return Self {
                radius: 0.0,
                theta: 0.0,
                phi: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Orbit, zoom and damping around the camera target
#[derive(Debug, Clone)]
pub struct OrbitControls {
    enabled: bool,
    config: OrbitConfig,
    home: CameraState,
    delta_theta: f32,
    delta_phi: f32,
    zoom_scale: f32,
}

impl OrbitControls {
    /// Controls that [`reset`](Self::reset) back to `home`
    pub fn new(config: OrbitConfig, home: CameraState) -> Self {
        Self {
            enabled: true,
            config,
            home,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom_scale: 1.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling also drops any momentum still pending
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.clear_deltas();
        }
    }

    pub fn home(&self) -> &CameraState {
        &self.home
    }

    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    /// Queue a rotation in radians. Returns false when the input was dropped.
    pub fn rotate(&mut self, azimuth: f32, polar: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.delta_theta += azimuth * self.config.rotate_speed;
        self.delta_phi += polar * self.config.rotate_speed;
        true
    }

    /// Queue a rotation from a pointer drag; a drag over the full viewport height turns a full circle
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) -> bool {
        if !(viewport_height > 0.0) {
            return false;
        }
        self.rotate(-2.0 * PI * dx / viewport_height, -2.0 * PI * dy / viewport_height)
    }

    /// Queue a zoom by wheel steps; positive steps zoom in
    pub fn zoom(&mut self, steps: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.zoom_scale *= ZOOM_STEP.powf(-steps * self.config.zoom_speed);
        true
    }

    /// Apply pending input to `camera`. Returns true if the camera moved.
    ///
    /// Without pending input the camera is left exactly as it is, so the
    /// distance and polar limits only take effect on the next user input.
    pub fn update(&mut self, camera: &mut OrthographicCamera) -> bool {
        if !self.enabled || self.is_settled() {
            return false;
        }
        let before = camera.state();

        let mut spherical = Spherical::from_offset(&(camera.position - camera.target));
        let factor = if self.config.damping {
            self.config.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.delta_theta * factor;
        spherical.phi += self.delta_phi * factor;
        spherical.phi = spherical
            .phi
            .max(self.config.min_polar_angle)
            .min(self.config.max_polar_angle)
            .max(EPS)
            .min(PI - EPS);
        spherical.radius = spherical
            .radius
            .max(self.config.min_distance)
            .min(self.config.max_distance);
        camera.position = camera.target + spherical.to_offset();

        if self.zoom_scale != 1.0 {
            camera.zoom = (camera.zoom * self.zoom_scale)
                .max(self.config.min_zoom)
                .min(self.config.max_zoom);
            self.zoom_scale = 1.0;
        }

        if self.config.damping {
            self.delta_theta *= 1.0 - factor;
            self.delta_phi *= 1.0 - factor;
        } else {
            self.clear_deltas();
        }

        let after = camera.state();
        after.position_distance(&before) > MOVE_EPS || after.zoom_distance(&before) > MOVE_EPS
    }

    /// Restore the home state and forget pending input
    pub fn reset(&mut self, camera: &mut OrthographicCamera) {
        camera.set_state(&self.home);
        self.clear_deltas();
    }

    /// No momentum left to apply
    pub fn is_settled(&self) -> bool {
        self.delta_theta.abs() < EPS && self.delta_phi.abs() < EPS && self.zoom_scale == 1.0
    }

    fn clear_deltas(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.zoom_scale = 1.0;
    }
}
