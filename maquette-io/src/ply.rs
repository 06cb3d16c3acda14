//! PLY format support

use crate::{IoError, IoResult, SceneReader};
use maquette_core::{Material, MeshPrimitive, Point3f, SceneNode, TriangleMesh, Vector3f};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, Property},
};

pub struct PlyReader;

impl PlyReader {
    /// Read a triangle mesh from a PLY file
    pub fn read_mesh(path: &Path) -> IoResult<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut has_normals = true;
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;
                vertices.push(Point3f::new(x, y, z));

                if has_normals {
                    match (
                        extract_property_value(vertex, "nx"),
                        extract_property_value(vertex, "ny"),
                        extract_property_value(vertex, "nz"),
                    ) {
                        (Ok(nx), Ok(ny), Ok(nz)) => normals.push(Vector3f::new(nx, ny, nz)),
                        _ => has_normals = false,
                    }
                }
            }
        }

        // polygons are fanned into triangles
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                for i in 1..indices.len().saturating_sub(1) {
                    faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if has_normals && !normals.is_empty() {
            mesh.set_normals(normals);
        }
        if mesh.invalid_faces().next().is_some() {
            return Err(IoError::ParseError {
                message: format!("{}: face references a missing vertex", path.display()),
            });
        }

        Ok(mesh)
    }
}

impl SceneReader for PlyReader {
    fn read_scene(&self, path: &Path) -> IoResult<SceneNode> {
        let mesh = Self::read_mesh(path)?;
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("ply");
        Ok(SceneNode::named(name).with_primitive(MeshPrimitive::new(mesh, Material::default())))
    }

    fn extensions(&self) -> &[&'static str] {
        &["ply"]
    }

    fn format_name(&self) -> &'static str {
        "PLY"
    }
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> IoResult<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        _ => Err(IoError::ParseError {
            message: format!("Property '{}' not found or invalid type", name),
        }),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> IoResult<Vec<usize>> {
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUChar(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(IoError::ParseError {
            message: "Face indices not found".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_ascii_quad_is_triangulated() {
        let temp_file = std::env::temp_dir().join("maquette_quad.ply");
        let ply_content = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0.0 0.0 0.0
2.0 0.0 0.0
2.0 1.0 0.0
0.0 1.0 0.0
4 0 1 2 3
";
        fs::write(&temp_file, ply_content).unwrap();

        let node = PlyReader.read_scene(&temp_file).unwrap();
        let mesh = &node.primitives[0].mesh;
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(mesh.normals.is_none());
        assert_eq!(node.name.as_deref(), Some("maquette_quad"));

        let _ = fs::remove_file(&temp_file);
    }

    #[test]
    fn test_out_of_range_face_is_rejected() {
        let temp_file = std::env::temp_dir().join("maquette_bad_face.ply");
        let ply_content = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0.0 0.0 0.0
1.0 0.0 0.0
0.0 1.0 0.0
3 0 1 7
";
        fs::write(&temp_file, ply_content).unwrap();
        assert!(matches!(PlyReader::read_mesh(&temp_file), Err(IoError::ParseError { .. })));
        let _ = fs::remove_file(&temp_file);
    }
}
