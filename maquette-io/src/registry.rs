//! Format registry for asset loading
//!
//! Maps file extensions to [`SceneReader`]s and resolves web-style source
//! identifiers against an asset root directory, so the cache can load any
//! supported format without knowing which one it is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use maquette_core::SceneAsset;

use crate::cache::AssetLoader;
use crate::error::{IoError, IoResult};
use crate::gltf::GltfReader;
use crate::obj::ObjReader;
use crate::ply::PlyReader;
use crate::SceneReader;

/// Extension-keyed set of readers rooted at an asset directory
pub struct LoaderRegistry {
    root: PathBuf,
    readers: HashMap<String, Arc<dyn SceneReader>>,
}

impl LoaderRegistry {
    /// Create an empty registry
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            readers: HashMap::new(),
        }
    }

    /// Registry with the glTF, PLY and OBJ readers installed
    pub fn with_default_readers(root: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(root);
        registry.register(Arc::new(GltfReader::default()));
        registry.register(Arc::new(PlyReader));
        registry.register(Arc::new(ObjReader));
        registry
    }

    /// Register a reader for every extension it claims, replacing earlier ones
    pub fn register(&mut self, reader: Arc<dyn SceneReader>) {
        for ext in reader.extensions() {
            self.readers.insert(ext.to_lowercase(), Arc::clone(&reader));
        }
    }

    pub fn supports(&self, path: &str) -> bool {
        extension_of(Path::new(path))
            .map(|ext| self.readers.contains_key(&ext))
            .unwrap_or(false)
    }

    /// Turn a source identifier into a filesystem path under the root.
    ///
    /// Leading separators are stripped, so `/assets/a.glb` lands inside the root.
    pub fn resolve(&self, source: &str) -> PathBuf {
        self.root.join(source.trim_start_matches(['/', '\\']))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for LoaderRegistry {
    fn load(&self, source: &str) -> IoResult<SceneAsset> {
        let path = self.resolve(source);
        let ext = extension_of(&path).ok_or_else(|| IoError::UnsupportedFormat {
            format: format!("{} has no extension", source),
        })?;
        let reader = self
            .readers
            .get(&ext)
            .ok_or_else(|| IoError::UnsupportedFormat { format: ext.clone() })?;
        if !path.is_file() {
            return Err(IoError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let root = reader.read_scene(&path)?;
        Ok(SceneAsset::new(source, root))
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_strips_leading_separator() {
        let registry = LoaderRegistry::new("/srv/site/public");
        assert_eq!(
            registry.resolve("/assets/projects/le reseau/reseau-optimized.glb"),
            PathBuf::from("/srv/site/public/assets/projects/le reseau/reseau-optimized.glb")
        );
        assert_eq!(registry.resolve("a.ply"), PathBuf::from("/srv/site/public/a.ply"));
    }

    #[test]
    fn test_supported_extensions_are_case_insensitive() {
        let registry = LoaderRegistry::with_default_readers(".");
        assert!(registry.supports("model.GLB"));
        assert!(registry.supports("model.gltf"));
        assert!(registry.supports("scan.ply"));
        assert!(registry.supports("mesh.obj"));
        assert!(!registry.supports("cloud.las"));
        assert!(!registry.supports("no_extension"));
    }

    #[test]
    fn test_unknown_format_and_missing_file() {
        let registry = LoaderRegistry::with_default_readers(std::env::temp_dir());
        assert!(matches!(
            registry.load("cloud.las"),
            Err(IoError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            registry.load("/definitely/not/here.glb"),
            Err(IoError::FileNotFound { .. })
        ));
    }
}
