//! Error types for I/O operations

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while reading an asset
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Invalid scene data: {0}")]
    Core(#[from] maquette_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the asset cache.
///
/// Cloneable so a single failed load can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("failed to load {path}: {cause}")]
    LoadFailed {
        path: String,
        #[source]
        cause: Arc<IoError>,
    },

    #[error("load of {path} ended without a result")]
    Abandoned { path: String },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            LoadError::LoadFailed { path, .. } | LoadError::Abandoned { path } => path,
        }
    }
}

pub type IoResult<T> = std::result::Result<T, IoError>;
