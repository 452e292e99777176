//! Modification methods for Mesh.

use glam::Vec3;
use tracing::trace;

use crate::fan::FanCursor;
use crate::types::{Corner, FaceId, VertexId, VertexPair};
use crate::Mesh;

impl Mesh {
    /// Soft-delete a face. Its fan links are left as they are.
    pub fn delete_face(&mut self, face: FaceId) {
        let f = self.face_mut(face);
        if !f.deleted {
            f.deleted = true;
            self.face_count -= 1;
        }
    }

    /// Soft-delete a vertex.
    pub fn delete_vertex(&mut self, vertex: VertexId) {
        let v = self.vertex_mut(vertex);
        if !v.deleted {
            v.deleted = true;
            self.vertex_count -= 1;
        }
    }

    /// Unlink the corner `(face, slot)` from the fan of its vertex.
    ///
    /// The anchor is fixed in constant time; any other corner needs a walk
    /// to find its predecessor.
    pub fn vf_detach(&mut self, face: FaceId, slot: usize) {
        let vertex = self.face(face).vertices[slot];
        let target = Corner::new(face, slot);
        let next = self.face(face).fan_next[slot];

        if self.vertex(vertex).fan == Some(target) {
            self.vertex_mut(vertex).fan = next;
            return;
        }

        let mut cursor = FanCursor::new(vertex);
        while let Some(corner) = cursor.next(self) {
            if self.face(corner.face).fan_next[corner.slot] == Some(target) {
                self.face_mut(corner.face).fan_next[corner.slot] = next;
                return;
            }
        }
    }

    /// Merge `pair.v0` into `pair.v1` and move `v1` to `position`.
    ///
    /// Faces holding both endpoints are detached from the fans of their two
    /// other corners and deleted. Faces holding only `v0` are re-pointed at
    /// `v1` and prepended to its fan. Returns the deleted faces.
    pub fn collapse(&mut self, pair: VertexPair, position: Vec3) -> Vec<FaceId> {
        let (shared, only_v0): (Vec<Corner>, Vec<Corner>) = self
            .fan(pair.v0)
            .partition(|c| self.face(c.face).contains(pair.v1));

        let mut deleted = Vec::with_capacity(shared.len());
        for corner in shared {
            self.vf_detach(corner.face, corner.next_slot());
            self.vf_detach(corner.face, corner.prev_slot());
            self.delete_face(corner.face);
            deleted.push(corner.face);
        }

        for corner in only_v0 {
            let anchor = self.vertex(pair.v1).fan;
            let face = self.face_mut(corner.face);
            face.vertices[corner.slot] = pair.v1;
            face.fan_next[corner.slot] = anchor;
            self.vertex_mut(pair.v1).fan = Some(corner);
        }

        self.delete_vertex(pair.v0);
        self.vertex_mut(pair.v1).position = position;

        trace!(
            "collapse: {:?} -> {:?}, removed {} faces",
            pair.v0,
            pair.v1,
            deleted.len()
        );
        deleted
    }
}
