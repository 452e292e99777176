//! Walks over the faces incident to a vertex.
//!
//! The walk starts at the vertex's anchor corner and follows the per-corner
//! `fan_next` links until a `None` link ends the chain.

use crate::types::{Corner, VertexId};
use crate::Mesh;

/// Restartable cursor over a vertex fan.
///
/// The cursor does not borrow the mesh, so callers may mutate flags between
/// steps. The anchor is read on the first step after construction or `reset`.
#[derive(Debug, Clone, Copy)]
pub struct FanCursor {
    vertex: VertexId,
    current: Option<Corner>,
    started: bool,
}

impl FanCursor {
    pub fn new(vertex: VertexId) -> Self {
        Self {
            vertex,
            current: None,
            started: false,
        }
    }

    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Advance to the next corner of the fan.
    pub fn next(&mut self, mesh: &Mesh) -> Option<Corner> {
        if !self.started {
            self.started = true;
            self.current = mesh.vertex(self.vertex).fan;
        } else if let Some(corner) = self.current {
            self.current = mesh.face(corner.face).fan_next[corner.slot];
        }
        self.current
    }

    /// Rewind to the anchor.
    pub fn reset(&mut self) {
        self.started = false;
        self.current = None;
    }
}

/// Borrowing iterator over a vertex fan
#[derive(Debug, Clone)]
pub struct FanIter<'a> {
    mesh: &'a Mesh,
    cursor: FanCursor,
}

impl<'a> FanIter<'a> {
    pub(crate) fn new(mesh: &'a Mesh, vertex: VertexId) -> Self {
        Self {
            mesh,
            cursor: FanCursor::new(vertex),
        }
    }

    /// Rewind to the anchor so the fan can be walked again.
    pub fn reset(&mut self) {
        self.cursor.reset();
    }
}

impl Iterator for FanIter<'_> {
    type Item = Corner;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next(self.mesh)
    }
}

#[cfg(test)]
mod tests {
    use crate::{shapes, FaceId, Mesh, VertexId};

    use super::*;

    #[test]
    fn test_cursor_reset_rewalks() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        let mut cursor = FanCursor::new(VertexId(0));
        let mut first = Vec::new();
        while let Some(c) = cursor.next(&mesh) {
            first.push(c);
        }
        assert!(cursor.next(&mesh).is_none());

        cursor.reset();
        let mut second = Vec::new();
        while let Some(c) = cursor.next(&mesh) {
            second.push(c);
        }
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_iter_reset() {
        let mesh = Mesh::from_buffers(&shapes::tetrahedron()).unwrap();
        let mut iter = mesh.fan(VertexId(0));
        let faces: Vec<FaceId> = iter.by_ref().map(|c| c.face).collect();
        assert_eq!(faces.len(), 3);
        iter.reset();
        assert_eq!(iter.count(), 3);
    }

    #[test]
    fn test_every_corner_points_at_its_vertex() {
        let mesh = Mesh::from_buffers(&shapes::uv_sphere(4, 6)).unwrap();
        for v in mesh.live_vertices() {
            for corner in mesh.fan(v) {
                assert_eq!(mesh.corner_vertex(corner), v);
            }
        }
    }
}
