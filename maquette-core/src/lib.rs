//! Core data structures for maquette
//!
//! This crate provides the geometry and scene-graph types shared by the asset
//! readers and the preview viewer, plus the scene normalizer that fits any
//! asset into the canonical viewing frame.

pub mod point;
pub mod mesh;
pub mod bounds;
pub mod traits;
pub mod transform;
pub mod scene;
pub mod normalize;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use bounds::*;
pub use traits::*;
pub use transform::*;
pub use scene::*;
pub use normalize::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
