//! OBJ format support

use crate::{IoError, IoResult, SceneReader};
use maquette_core::{Material, MeshPrimitive, Point3f, SceneNode, TriangleMesh};
use ::obj::{Obj, ObjData};
use std::path::Path;

pub struct ObjReader;

impl ObjReader {
    /// Read a triangle mesh from an OBJ file, merging all objects and groups
    pub fn read_mesh(path: &Path) -> IoResult<TriangleMesh> {
        let obj = Obj::load(path).map_err(|e| IoError::ParseError {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::data_to_mesh(&obj.data)
    }

    fn data_to_mesh(data: &ObjData) -> IoResult<TriangleMesh> {
        let vertices: Vec<Point3f> = data.position.iter().map(|&p| Point3f::from(p)).collect();

        let mut faces = Vec::new();
        for object in &data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    let corners: Vec<usize> = poly.0.iter().map(|tuple| tuple.0).collect();
                    for i in 1..corners.len().saturating_sub(1) {
                        faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
            }
        }

        let mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if mesh.invalid_faces().next().is_some() {
            return Err(IoError::ParseError {
                message: "face references a missing vertex".to_string(),
            });
        }
        Ok(mesh)
    }
}

impl SceneReader for ObjReader {
    fn read_scene(&self, path: &Path) -> IoResult<SceneNode> {
        let mesh = Self::read_mesh(path)?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("obj");
        Ok(SceneNode::named(name).with_primitive(MeshPrimitive::new(mesh, Material::default())))
    }

    fn extensions(&self) -> &[&'static str] {
        &["obj"]
    }

    fn format_name(&self) -> &'static str {
        "OBJ"
    }
}
