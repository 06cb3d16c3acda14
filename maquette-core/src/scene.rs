//! Scene graph produced by the asset readers
//!
//! A loaded asset is a tree of [`SceneNode`]s. Each node carries a local
//! transform relative to its parent and any number of mesh primitives.

use crate::{bounds::Aabb, mesh::TriangleMesh, traits::Bounded, transform::Transform3D};
use serde::{Deserialize, Serialize};

/// Texture binding of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSlot {
    /// Index into the asset's texture table
    pub index: usize,
    /// Anisotropic filtering level requested for sampling
    pub anisotropy: u16,
}

/// Surface description of a primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<TextureSlot>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
        }
    }
}

/// Triangle geometry with its material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshPrimitive {
    pub mesh: TriangleMesh,
    pub material: Material,
    /// Whether the renderer may skip this primitive when it is outside the view frustum
    pub frustum_culled: bool,
}

impl MeshPrimitive {
    pub fn new(mesh: TriangleMesh, material: Material) -> Self {
        Self {
            mesh,
            material,
            frustum_culled: false,
        }
    }
}

/// A node in the scene graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: Option<String>,
    pub transform: Transform3D,
    pub primitives: Vec<MeshPrimitive>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_primitive(mut self, primitive: MeshPrimitive) -> Self {
        self.primitives.push(primitive);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visit every node depth-first together with its world transform
    pub fn traverse<F>(&self, parent: &Transform3D, visit: &mut F)
    where
        F: FnMut(&SceneNode, &Transform3D),
    {
        let world = *parent * self.transform;
        visit(self, &world);
        for child in &self.children {
            child.traverse(&world, visit);
        }
    }

    /// Visit every primitive mutably
    pub fn for_each_primitive_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut MeshPrimitive),
    {
        for primitive in &mut self.primitives {
            visit(primitive);
        }
        for child in &mut self.children {
            child.for_each_primitive_mut(visit);
        }
    }

    /// Bounds of all geometry below this node in the parent's frame,
    /// `None` when the subtree holds no vertices
    pub fn world_bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        self.traverse(&Transform3D::identity(), &mut |node, world| {
            for primitive in &node.primitives {
                if let Some(local) = primitive.mesh.bounding_box() {
                    let b = local.transformed(world);
                    bounds = Some(match bounds {
                        Some(acc) => acc.union(&b),
                        None => b,
                    });
                }
            }
        });
        bounds
    }

    pub fn primitive_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&Transform3D::identity(), &mut |node, _| count += node.primitives.len());
        count
    }
}

impl Bounded for SceneNode {
    fn bounding_box(&self) -> Option<Aabb> {
        self.world_bounds()
    }
}

/// A fully loaded asset, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAsset {
    /// Source identifier the asset was loaded from
    pub source: String,
    pub root: SceneNode,
}

impl SceneAsset {
    pub fn new(source: impl Into<String>, root: SceneNode) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    pub fn vertex_count(&self) -> usize {
        let mut count = 0;
        self.root.traverse(&Transform3D::identity(), &mut |node, _| {
            count += node.primitives.iter().map(|p| p.mesh.vertex_count()).sum::<usize>();
        });
        count
    }
}
