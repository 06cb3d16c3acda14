//! Preview viewers for 3D models
//!
//! This crate turns loaded assets into self-governing viewers:
//! - Orthographic camera with fixed preview and interactive presets
//! - Return-to-preview camera transitions
//! - Orbit controls while a viewer is interactive
//! - A render-loop governor that keeps idle previews on demand
//! - A shared frame scheduler driving every viewer on the page

pub mod config;
pub mod camera;
pub mod orbit;
pub mod transition;
pub mod governor;
pub mod scheduler;
pub mod surface;
pub mod viewer;

pub use config::*;
pub use camera::*;
pub use orbit::*;
pub use transition::*;
pub use governor::*;
pub use scheduler::*;
pub use surface::*;
pub use viewer::*;
