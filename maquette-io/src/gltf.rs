//! glTF 2.0 support (`.gltf` and binary `.glb`)
//!
//! The default scene (or the first one, when none is marked default) is read
//! with its node hierarchy and local transforms intact. Only triangle-list
//! primitives are kept; points, lines and strips are skipped.
//!
//! Images are never read. Materials only record which texture they use, so a
//! missing or undecodable image does not stop the geometry from loading.

use crate::{IoError, IoResult, SceneReader};
use ::gltf::{buffer, mesh::Mode, Node, Primitive};
use log::debug;
use maquette_core::{
    Material, MeshPrimitive, Point3f, SceneNode, TextureSlot, Transform3D, TriangleMesh, Vector3f,
};
use std::path::Path;

/// Deepest node nesting accepted before the file is rejected
const MAX_NODE_DEPTH: usize = 128;

pub struct GltfReader {
    /// Anisotropy requested for base-colour textures
    pub texture_anisotropy: u16,
}

impl Default for GltfReader {
    fn default() -> Self {
        Self {
            texture_anisotropy: 16,
        }
    }
}

impl GltfReader {
    fn read_node(&self, node: &Node<'_>, buffers: &[buffer::Data], depth: usize) -> IoResult<SceneNode> {
        if depth > MAX_NODE_DEPTH {
            return Err(IoError::ParseError {
                message: format!("node hierarchy deeper than {}", MAX_NODE_DEPTH),
            });
        }

        let mut out = SceneNode {
            name: node.name().map(str::to_owned),
            transform: Transform3D::from(node.transform().matrix()),
            ..SceneNode::default()
        };

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != Mode::Triangles {
                    debug!("skipping {:?} primitive in mesh {}", primitive.mode(), mesh.index());
                    continue;
                }
                out.primitives.push(self.read_primitive(&primitive, buffers)?);
            }
        }

        for child in node.children() {
            out.children.push(self.read_node(&child, buffers, depth + 1)?);
        }
        Ok(out)
    }

    fn read_primitive(&self, primitive: &Primitive<'_>, buffers: &[buffer::Data]) -> IoResult<MeshPrimitive> {
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));

        let vertices: Vec<Point3f> = reader
            .read_positions()
            .ok_or_else(|| IoError::ParseError {
                message: "primitive has no POSITION attribute".to_string(),
            })?
            .map(Point3f::from)
            .collect();

        let faces: Vec<[usize; 3]> = match reader.read_indices() {
            Some(indices) => {
                let flat: Vec<usize> = indices.into_u32().map(|i| i as usize).collect();
                flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
            }
            None => (0..vertices.len() / 3).map(|i| [3 * i, 3 * i + 1, 3 * i + 2]).collect(),
        };

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = reader.read_normals() {
            mesh.set_normals(normals.map(Vector3f::from).collect());
        }
        if mesh.invalid_faces().next().is_some() {
            return Err(IoError::ParseError {
                message: "primitive index references a missing vertex".to_string(),
            });
        }

        let source = primitive.material();
        let pbr = source.pbr_metallic_roughness();
        let material = Material {
            name: source.name().map(str::to_owned),
            base_color: pbr.base_color_factor(),
            base_color_texture: pbr.base_color_texture().map(|info| TextureSlot {
                index: info.texture().index(),
                anisotropy: self.texture_anisotropy,
            }),
        };

        Ok(MeshPrimitive::new(mesh, material))
    }
}

impl SceneReader for GltfReader {
    fn read_scene(&self, path: &Path) -> IoResult<SceneNode> {
        let ::gltf::Gltf { document, blob } = ::gltf::Gltf::open(path)?;
        let buffers = ::gltf::import_buffers(&document, path.parent(), blob)?;
        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| IoError::ParseError {
                message: format!("{} contains no scene", path.display()),
            })?;

        let mut root = SceneNode {
            name: scene.name().map(str::to_owned),
            ..SceneNode::default()
        };
        for node in scene.nodes() {
            root.children.push(self.read_node(&node, &buffers, 0)?);
        }
        Ok(root)
    }

    fn extensions(&self) -> &[&'static str] {
        &["glb", "gltf"]
    }

    fn format_name(&self) -> &'static str {
        "glTF"
    }
}
