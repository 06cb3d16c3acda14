//! Asset loading for maquette
//!
//! This crate reads 3D assets (glTF/GLB, PLY, OBJ) into the core scene graph
//! and provides the process-wide [`AssetCache`] that every viewer loads
//! through.

pub mod ply;
pub mod obj;
pub mod gltf;
pub mod registry;
pub mod cache;
pub mod warm_up;
pub mod error;

pub use crate::error::*;
pub use crate::registry::LoaderRegistry;
pub use crate::cache::{AssetCache, AssetHandle, AssetLoader, AssetRequest, RequestPoll};
pub use crate::warm_up::{WarmUpConfig, WarmUpReport};

use maquette_core::SceneNode;
use std::path::Path;

/// Trait for readers turning one file format into a scene graph
pub trait SceneReader: Send + Sync {
    /// Read the file at `path` into a scene rooted at the returned node
    fn read_scene(&self, path: &Path) -> IoResult<SceneNode>;

    /// Lowercase file extensions handled by this reader
    fn extensions(&self) -> &[&'static str];

    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;
}
