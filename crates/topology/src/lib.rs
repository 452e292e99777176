//! Vertex-face topology for triangle mesh decimation
//!
//! Each vertex anchors a fan of its incident faces. The fan is a singly linked
//! list threaded through the faces: every face corner stores the next corner
//! around the same vertex. This gives adjacency walks without a separate edge
//! table, and lets a collapse relink faces in time proportional to the fan size.
//!
//! Vertices and faces are soft-deleted: flags are set and live counts are
//! decremented, but storage is never compacted while a decimation runs.

mod construction;
mod fan;
mod modification;
pub mod shapes;
mod topology;
mod types;
mod validation;

use decimator_config::AttributeMask;

pub use construction::MeshBuffers;
pub use fan::{FanCursor, FanIter};
pub use topology::{triangle_normal, triangle_quality};
pub use types::{Corner, Face, FaceId, TopologyError, Vertex, VertexId, VertexPair};

/// Indexed triangle mesh with per-vertex face fans
#[derive(Debug, Clone)]
pub struct Mesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) faces: Vec<Face>,
    vertex_count: usize,
    face_count: usize,
    /// Attribute channels carried by the source buffers
    attributes: AttributeMask,
}

impl Mesh {
    /// Number of live (not deleted) vertices
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of live (not deleted) faces
    pub fn face_count(&self) -> usize {
        self.face_count
    }

    /// Attribute channels this mesh carries. Always includes position.
    pub fn attributes(&self) -> AttributeMask {
        self.attributes
    }

    /// All vertex slots, including deleted ones
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All face slots, including deleted ones
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Iterate the ids of live faces
    pub fn live_faces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.iter().filter(|f| !f.deleted).map(|f| f.id)
    }

    /// Iterate the ids of live vertices
    pub fn live_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().filter(|v| !v.deleted).map(|v| v.id)
    }

    /// Vertex by id. Ids are only handed out by this mesh; a foreign id panics.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    #[inline]
    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.vertices[id.index()]
    }

    /// Face by id. Ids are only handed out by this mesh; a foreign id panics.
    #[inline]
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id.index()]
    }

    #[inline]
    pub fn face_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.faces[id.index()]
    }

    pub fn get_vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    #[inline]
    pub fn position(&self, id: VertexId) -> glam::Vec3 {
        self.vertices[id.index()].position
    }
}
