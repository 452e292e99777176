//! Validation methods for Mesh.
//!
//! Checks the bookkeeping that every mutation has to preserve:
//! - live counts match the non-deleted entries
//! - live faces only reference live vertices
//! - every live corner sits exactly once in its vertex's fan

use std::collections::HashMap;

use crate::types::{Corner, TopologyError};
use crate::Mesh;

impl Mesh {
    /// Verify mesh bookkeeping, returning the first inconsistency found.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let live_vertices = self.vertices.iter().filter(|v| !v.deleted).count();
        if live_vertices != self.vertex_count() {
            return Err(TopologyError::InvalidTopology(format!(
                "vertex count {} but {} live vertices",
                self.vertex_count(),
                live_vertices
            )));
        }
        let live_faces = self.faces.iter().filter(|f| !f.deleted).count();
        if live_faces != self.face_count() {
            return Err(TopologyError::InvalidTopology(format!(
                "face count {} but {} live faces",
                self.face_count(),
                live_faces
            )));
        }

        for face in self.faces.iter().filter(|f| !f.deleted) {
            for v in face.vertices {
                let vertex = self.get_vertex(v).ok_or_else(|| {
                    TopologyError::InvalidTopology(format!("Face {:?}: missing vertex {:?}", face.id, v))
                })?;
                if vertex.deleted {
                    return Err(TopologyError::InvalidTopology(format!(
                        "Face {:?}: references deleted vertex {:?}",
                        face.id, v
                    )));
                }
            }
        }

        // Walk every fan once, counting how often each live corner is reached.
        let mut seen: HashMap<Corner, usize> = HashMap::new();
        for vertex in self.vertices.iter().filter(|v| !v.deleted) {
            let limit = 3 * self.faces.len() + 1;
            for (steps, corner) in self.fan(vertex.id).enumerate() {
                if steps >= limit {
                    return Err(TopologyError::InvalidTopology(format!(
                        "Vertex {:?}: fan does not terminate",
                        vertex.id
                    )));
                }
                let face = self.face(corner.face);
                if face.deleted {
                    return Err(TopologyError::InvalidTopology(format!(
                        "Vertex {:?}: fan reaches deleted face {:?}",
                        vertex.id, corner.face
                    )));
                }
                if face.vertices[corner.slot] != vertex.id {
                    return Err(TopologyError::InvalidTopology(format!(
                        "Vertex {:?}: fan corner {:?} holds {:?}",
                        vertex.id, corner, face.vertices[corner.slot]
                    )));
                }
                *seen.entry(corner).or_default() += 1;
            }
        }
        for face in self.faces.iter().filter(|f| !f.deleted) {
            for slot in 0..3 {
                let count = seen.get(&Corner::new(face.id, slot)).copied().unwrap_or(0);
                if count != 1 {
                    return Err(TopologyError::InvalidTopology(format!(
                        "Face {:?} slot {}: reached {} times by fan walks",
                        face.id, slot, count
                    )));
                }
            }
        }
        Ok(())
    }
}
