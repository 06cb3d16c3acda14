//! Scene normalization
//!
//! Fits an asset of arbitrary native dimensions into the canonical viewing
//! frame: its bounding box is centered on the origin and its largest
//! dimension becomes [`TARGET_EXTENT`] units.
//!
//! The result wraps the asset root in two nodes:
//!
//! ```text
//! wrapper (uniform scale)
//! └── centering (translation by -center)
//!     └── asset root (its own transform preserved)
//! ```

use crate::{
    bounds::Aabb,
    scene::{SceneAsset, SceneNode},
    transform::Transform3D,
    Vector3f,
};

/// Largest dimension of a normalized scene
pub const TARGET_EXTENT: f32 = 4.0;

/// Anisotropic filtering level forced onto textured materials
pub const MIN_ANISOTROPY: u16 = 1;

/// An asset fitted into the canonical frame
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedScene {
    /// Translation applied to the asset root
    pub translation: Vector3f,
    /// Uniform scale applied by the wrapper
    pub scale: f32,
    /// Bounds of the asset before normalization, `None` for an asset without geometry
    pub source_bounds: Option<Aabb>,
    /// Wrapper node, ready to be drawn
    pub root: SceneNode,
}

impl NormalizedScene {
    /// Bounds after normalization
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.world_bounds()
    }

    /// The combined transform taking asset coordinates into the canonical frame
    pub fn transform(&self) -> Transform3D {
        Transform3D::uniform_scaling(self.scale) * Transform3D::translation(self.translation)
    }

    /// True when the asset had no extent and was left unscaled
    pub fn is_degenerate(&self) -> bool {
        self.source_bounds
            .map_or(true, |b| !(b.max_dimension() > 0.0))
    }
}

/// Compute the centering and scaling of `asset` and wrap a copy of its root.
///
/// Zero-size (or empty) assets keep a scale of 1. Every primitive of the copy
/// is marked for frustum culling and textured materials are reduced to the
/// minimum anisotropy level. The asset itself is left untouched.
pub fn normalize(asset: &SceneAsset) -> NormalizedScene {
    let source_bounds = asset.root.world_bounds();

    let (center, max_dim) = match source_bounds {
        Some(b) => (b.center().coords, b.max_dimension()),
        None => (Vector3f::zeros(), 0.0),
    };
    // NaN and zero both land here
    let scale = if max_dim > 0.0 && max_dim.is_finite() {
        TARGET_EXTENT / max_dim
    } else {
        1.0
    };
    let translation = -center;

    let mut content = asset.root.clone();
    content.for_each_primitive_mut(&mut |primitive| {
        primitive.frustum_culled = true;
        if let Some(texture) = primitive.material.base_color_texture.as_mut() {
            texture.anisotropy = MIN_ANISOTROPY;
        }
    });

    let centering = SceneNode::named("centering")
        .with_transform(Transform3D::translation(translation))
        .with_child(content);
    let root = SceneNode::named("normalized")
        .with_transform(Transform3D::uniform_scaling(scale))
        .with_child(centering);

    NormalizedScene {
        translation,
        scale,
        source_bounds,
        root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, MeshPrimitive, Point3f, TextureSlot, TriangleMesh};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn box_asset(center: Point3f, size: Vector3f) -> SceneAsset {
        let b = Aabb::from_center_size(center, size);
        let mesh = TriangleMesh::from_vertices_and_faces(b.corners().to_vec(), vec![[0, 1, 2], [5, 6, 7]]);
        let material = Material {
            base_color_texture: Some(TextureSlot { index: 0, anisotropy: 16 }),
            ..Material::default()
        };
        SceneAsset::new("box.glb", SceneNode::named("box").with_primitive(MeshPrimitive::new(mesh, material)))
    }

    #[test]
    fn test_offset_box_scales_to_target_extent() {
        let asset = box_asset(Point3f::new(2.0, 0.0, 0.0), Vector3f::new(8.0, 4.0, 4.0));
        let normalized = normalize(&asset);

        assert_relative_eq!(normalized.scale, 0.5);
        assert_relative_eq!(normalized.translation, Vector3f::new(-2.0, 0.0, 0.0));

        let bounds = normalized.bounds().unwrap();
        assert_relative_eq!(bounds.center(), Point3f::origin(), epsilon = 1e-5);
        assert_relative_eq!(bounds.max_dimension(), TARGET_EXTENT, epsilon = 1e-5);
        assert!(!normalized.is_degenerate());
    }

    #[test]
    fn test_various_sizes_fill_target_extent() {
        let cases = [
            (Point3f::new(0.0, 0.0, 0.0), Vector3f::new(1.0, 1.0, 1.0)),
            (Point3f::new(-120.0, 35.0, 8.0), Vector3f::new(30.0, 250.0, 12.0)),
            (Point3f::new(0.3, -0.2, 0.1), Vector3f::new(0.01, 0.002, 0.004)),
            (Point3f::new(5.0, 5.0, 5.0), Vector3f::new(3.0, 0.0, 1.0)),
        ];
        for (center, size) in cases {
            let normalized = normalize(&box_asset(center, size));
            let bounds = normalized.bounds().unwrap();
            assert_relative_eq!(bounds.max_dimension(), TARGET_EXTENT, max_relative = 1e-4);
            assert_abs_diff_eq!(bounds.center(), Point3f::origin(), epsilon = 1e-3);
        }
    }

    #[test]
    fn test_zero_size_asset_keeps_unit_scale() {
        let asset = box_asset(Point3f::new(1.0, 2.0, 3.0), Vector3f::zeros());
        let normalized = normalize(&asset);
        assert_eq!(normalized.scale, 1.0);
        assert!(normalized.scale.is_finite());
        assert_relative_eq!(normalized.translation, Vector3f::new(-1.0, -2.0, -3.0));
        assert!(normalized.is_degenerate());
    }

    #[test]
    fn test_asset_without_geometry_keeps_unit_scale() {
        let asset = SceneAsset::new("empty.glb", SceneNode::named("empty"));
        let normalized = normalize(&asset);
        assert_eq!(normalized.scale, 1.0);
        assert_eq!(normalized.translation, Vector3f::zeros());
        assert!(normalized.bounds().is_none());
    }

    #[test]
    fn test_normalization_is_idempotent_and_pure() {
        let asset = box_asset(Point3f::new(-3.0, 1.0, 7.0), Vector3f::new(2.0, 6.0, 3.0));
        let before = asset.clone();
        let first = normalize(&asset);
        let second = normalize(&asset);
        assert_eq!(first, second);
        assert_eq!(asset, before);
    }

    #[test]
    fn test_performance_hints_applied_to_copy() {
        let asset = box_asset(Point3f::origin(), Vector3f::new(1.0, 1.0, 1.0));
        let mut normalized = normalize(&asset);

        let mut seen = 0;
        normalized.root.for_each_primitive_mut(&mut |p| {
            seen += 1;
            assert!(p.frustum_culled);
            assert_eq!(p.material.base_color_texture.unwrap().anisotropy, MIN_ANISOTROPY);
        });
        assert_eq!(seen, 1);

        let original = &asset.root.primitives[0];
        assert!(!original.frustum_culled);
        assert_eq!(original.material.base_color_texture.unwrap().anisotropy, 16);
    }

    #[test]
    fn test_root_transform_is_preserved() {
        let mut asset = box_asset(Point3f::origin(), Vector3f::new(2.0, 2.0, 2.0));
        asset.root.transform = Transform3D::translation(Vector3f::new(10.0, 0.0, 0.0));
        let normalized = normalize(&asset);
        assert_relative_eq!(normalized.translation, Vector3f::new(-10.0, 0.0, 0.0), epsilon = 1e-6);
        let bounds = normalized.bounds().unwrap();
        assert_relative_eq!(bounds.center(), Point3f::origin(), epsilon = 1e-5);
    }
}
