//! Core traits for maquette

use crate::{bounds::Aabb, mesh::TriangleMesh, point::Point3f};

/// Trait for objects occupying space in the scene
pub trait Bounded {
    /// Axis-aligned bounds in local coordinates, `None` if there is no geometry
    fn bounding_box(&self) -> Option<Aabb>;

    /// Center of the bounding box, the origin when there is no geometry
    fn center(&self) -> Point3f {
        self.bounding_box()
            .map(|b| b.center())
            .unwrap_or_else(Point3f::origin)
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }
}
