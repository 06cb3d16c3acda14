//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Set vertex normals, ignored unless there is one per vertex
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Faces referencing a vertex that does not exist
    pub fn invalid_faces(&self) -> impl Iterator<Item = &[usize; 3]> {
        let count = self.vertices.len();
        self.faces.iter().filter(move |f| f.iter().any(|&i| i >= count))
    }

    /// Area-weighted vertex normals from the face winding.
    ///
    /// Vertices not touched by any face get `+Z`.
    pub fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            if face.iter().any(|&i| i >= self.vertices.len()) {
                continue;
            }
            let v0 = self.vertices[face[0]];
            let v1 = self.vertices[face[1]];
            let v2 = self.vertices[face[2]];
            let n = (v1 - v0).cross(&(v2 - v0));
            for &i in face {
                normals[i] += n;
            }
        }
        normals
            .into_iter()
            .map(|n| n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z))
            .collect()
    }

    /// Interleaved vertex buffer, computing normals when the mesh has none
    pub fn to_vertices(&self) -> Vec<Vertex> {
        let computed;
        let normals = match &self.normals {
            Some(normals) => normals,
            None => {
                computed = self.compute_vertex_normals();
                &computed
            }
        };
        self.vertices
            .iter()
            .zip(normals)
            .map(|(p, n)| Vertex::new(p, n))
            .collect()
    }

    /// Flattened `u32` index buffer
    pub fn to_indices(&self) -> Vec<u32> {
        self.faces
            .iter()
            .flat_map(|f| [f[0] as u32, f[1] as u32, f[2] as u32])
            .collect()
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_vertex_normals_follow_winding() {
        let normals = quad().compute_vertex_normals();
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_vertex_buffer_is_pod() {
        let mesh = quad();
        let vertices = mesh.to_vertices();
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.to_indices(), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_set_normals_rejects_mismatched_length() {
        let mut mesh = quad();
        mesh.set_normals(vec![Vector3f::z()]);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_invalid_faces() {
        let mut mesh = quad();
        mesh.faces.push([0, 1, 9]);
        assert_eq!(mesh.invalid_faces().count(), 1);
    }
}
