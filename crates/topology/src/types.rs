//! Type definitions for the vertex-face mesh.

use glam::{Vec2, Vec3};

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Type-safe face identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

impl VertexId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One corner of a face: the face and the slot (0..3) holding the vertex.
///
/// Corners are the links of a vertex fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Corner {
    pub face: FaceId,
    pub slot: usize,
}

impl Corner {
    pub fn new(face: FaceId, slot: usize) -> Self {
        Self { face, slot }
    }

    /// Slot of the next corner counter-clockwise.
    #[inline]
    pub fn next_slot(self) -> usize {
        (self.slot + 1) % 3
    }

    /// Slot of the previous corner counter-clockwise.
    #[inline]
    pub fn prev_slot(self) -> usize {
        (self.slot + 2) % 3
    }
}

/// A vertex of the mesh
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Vec3,
    /// Anchor of the incident face fan
    pub fan: Option<Corner>,
    /// Modification mark, compared against candidate snapshots
    pub mark: u64,
    pub deleted: bool,
    pub visited: bool,
    /// Cleared for vertices that must not move (frozen boundary)
    pub writable: bool,
    /// Endpoint of at least one border edge
    pub border: bool,
}

impl Vertex {
    pub fn new(id: VertexId, position: Vec3) -> Self {
        Self {
            id,
            position,
            fan: None,
            mark: 0,
            deleted: false,
            visited: false,
            writable: true,
            border: false,
        }
    }
}

/// A triangle of the mesh
///
/// Each corner stores its own normal and uv so seams survive, plus the link
/// to the next face in that corner vertex's fan.
#[derive(Debug, Clone)]
pub struct Face {
    pub id: FaceId,
    pub vertices: [VertexId; 3],
    pub normals: [Vec3; 3],
    pub uvs: [Vec2; 3],
    /// Face normal captured when the mesh was loaded
    pub face_normal: Vec3,
    /// Next face in the fan of each corner's vertex
    pub fan_next: [Option<Corner>; 3],
    pub deleted: bool,
    pub visited: bool,
    /// Border flag per edge; edge `i` runs from corner `i` to corner `i + 1`
    pub border: [bool; 3],
}

impl Face {
    pub fn new(id: FaceId, vertices: [VertexId; 3]) -> Self {
        Self {
            id,
            vertices,
            normals: [Vec3::ZERO; 3],
            uvs: [Vec2::ZERO; 3],
            face_normal: Vec3::ZERO,
            fan_next: [None; 3],
            deleted: false,
            visited: false,
            border: [false; 3],
        }
    }

    /// Slot holding `vertex`, if the face references it.
    pub fn slot_of(&self, vertex: VertexId) -> Option<usize> {
        self.vertices.iter().position(|v| *v == vertex)
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn clear_border_flags(&mut self) {
        self.border = [false; 3];
    }

    /// Interpolate the corner normals with barycentric weights.
    pub fn interpolate_normal(&self, barycentric: Vec3) -> Vec3 {
        (self.normals[0] * barycentric.x
            + self.normals[1] * barycentric.y
            + self.normals[2] * barycentric.z)
            .normalize_or_zero()
    }

    /// Interpolate the corner uvs with barycentric weights.
    pub fn interpolate_uv(&self, barycentric: Vec3) -> Vec2 {
        self.uvs[0] * barycentric.x + self.uvs[1] * barycentric.y + self.uvs[2] * barycentric.z
    }
}

/// An edge nominated for collapse. `v0` is removed and `v1` survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexPair {
    pub v0: VertexId,
    pub v1: VertexId,
}

impl VertexPair {
    pub fn new(v0: VertexId, v1: VertexId) -> Self {
        Self { v0, v1 }
    }
}

/// Errors that can occur during mesh construction and validation
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Mesh has no indices")]
    NoIndices,
    #[error("Index count {0} is not a multiple of 3")]
    IndexCount(usize),
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("Attribute `{name}` has {actual} entries, expected {expected}")]
    AttributeLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Flat buffer `{name}` of length {len} is not a multiple of {stride}")]
    FlatBuffer {
        name: &'static str,
        len: usize,
        stride: usize,
    },
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),
}
