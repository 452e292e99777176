//! Topology queries and derived per-face data.

use std::cmp::Ordering;

use decimator_config::{Attribute, AttributeMask};
use glam::{Vec2, Vec3};

use crate::fan::FanIter;
use crate::types::{Corner, FaceId, VertexId};
use crate::Mesh;

/// Quality of a triangle: twice its area over its longest squared edge.
///
/// An equilateral triangle scores `sqrt(3)/2`; needles and zero-area
/// triangles score 0.
pub fn triangle_quality(p0: Vec3, p1: Vec3, p2: Vec3) -> f32 {
    let d10 = p1 - p0;
    let d20 = p2 - p0;
    let d12 = p1 - p2;
    let area2 = d10.cross(d20).length();
    if area2 == 0.0 {
        return 0.0;
    }
    let longest = d10
        .length_squared()
        .max(d20.length_squared())
        .max(d12.length_squared());
    if longest == 0.0 {
        return 0.0;
    }
    area2 / longest
}

/// Unit normal of a counter-clockwise triangle, zero when degenerate.
pub fn triangle_normal(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    (p1 - p0).cross(p2 - p0).normalize_or_zero()
}

impl Mesh {
    // ============================================================================
    // Vertex order
    // ============================================================================

    /// Strict total order over vertices: Z, then Y, then X, then id.
    pub fn vertex_cmp(&self, a: VertexId, b: VertexId) -> Ordering {
        let pa = self.position(a);
        let pb = self.position(b);
        pa.z.total_cmp(&pb.z)
            .then_with(|| pa.y.total_cmp(&pb.y))
            .then_with(|| pa.x.total_cmp(&pb.x))
            .then_with(|| a.cmp(&b))
    }

    #[inline]
    pub fn vertex_less(&self, a: VertexId, b: VertexId) -> bool {
        self.vertex_cmp(a, b) == Ordering::Less
    }

    /// The pair `(a, b)` ordered so the lower vertex comes first.
    pub fn canonical_edge(&self, a: VertexId, b: VertexId) -> (VertexId, VertexId) {
        if self.vertex_less(a, b) { (a, b) } else { (b, a) }
    }

    // ============================================================================
    // Fans
    // ============================================================================

    /// Walk the faces incident to `vertex`.
    pub fn fan(&self, vertex: VertexId) -> FanIter<'_> {
        FanIter::new(self, vertex)
    }

    /// Collect the fan of `vertex` so the mesh can be mutated while visiting it.
    pub fn fan_corners(&self, vertex: VertexId) -> Vec<Corner> {
        self.fan(vertex).collect()
    }

    /// Vertex at a corner (the fan pivot).
    #[inline]
    pub fn corner_vertex(&self, corner: Corner) -> VertexId {
        self.face(corner.face).vertices[corner.slot]
    }

    /// The two other vertices of a corner's face, counter-clockwise from the pivot.
    #[inline]
    pub fn opposite_vertices(&self, corner: Corner) -> (VertexId, VertexId) {
        let face = self.face(corner.face);
        (face.vertices[corner.next_slot()], face.vertices[corner.prev_slot()])
    }

    /// Distinct vertices sharing an edge with `vertex`, in fan order.
    pub fn neighbors(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut out = Vec::new();
        for corner in self.fan(vertex) {
            let (a, b) = self.opposite_vertices(corner);
            for n in [a, b] {
                if !out.contains(&n) {
                    out.push(n);
                }
            }
        }
        out
    }

    /// Faces containing both endpoints of an edge.
    pub fn edge_faces(&self, a: VertexId, b: VertexId) -> Vec<FaceId> {
        self.fan(a)
            .filter(|c| self.face(c.face).contains(b))
            .map(|c| c.face)
            .collect()
    }

    /// Rebuild every fan from the live faces.
    ///
    /// Faces are prepended, so the anchor of each vertex ends up being its
    /// highest-numbered incident face.
    pub fn build_vertex_face(&mut self) {
        for v in &mut self.vertices {
            v.fan = None;
        }
        for fi in 0..self.faces.len() {
            if self.faces[fi].deleted {
                continue;
            }
            for slot in 0..3 {
                let vid = self.faces[fi].vertices[slot];
                let anchor = self.vertices[vid.index()].fan;
                self.faces[fi].fan_next[slot] = anchor;
                self.vertices[vid.index()].fan = Some(Corner::new(FaceId(fi as u32), slot));
            }
        }
    }

    /// Flag every face edge that has a single incident face, and both of its
    /// endpoints.
    ///
    /// For each vertex the endpoints opposite it are toggled once per incident
    /// face. An endpoint left toggled was seen an odd number of times, so the
    /// edge towards it is open. Only the lower endpoint of an edge flags it.
    pub fn build_face_border(&mut self) {
        for face in &mut self.faces {
            face.clear_border_flags();
        }
        for vertex in &mut self.vertices {
            vertex.border = false;
        }
        for vi in 0..self.vertices.len() {
            if self.vertices[vi].deleted {
                continue;
            }
            let vid = VertexId(vi as u32);
            let corners = self.fan_corners(vid);

            for &corner in &corners {
                let (a, b) = self.opposite_vertices(corner);
                self.vertex_mut(a).visited = false;
                self.vertex_mut(b).visited = false;
            }
            for &corner in &corners {
                let (a, b) = self.opposite_vertices(corner);
                for n in [a, b] {
                    let v = self.vertex_mut(n);
                    v.visited = !v.visited;
                }
            }
            for &corner in &corners {
                let (a, b) = self.opposite_vertices(corner);
                if self.vertex_less(vid, a) && self.vertex(a).visited {
                    self.face_mut(corner.face).border[corner.slot] = true;
                    self.mark_border_edge(vid, a);
                }
                if self.vertex_less(vid, b) && self.vertex(b).visited {
                    self.face_mut(corner.face).border[corner.prev_slot()] = true;
                    self.mark_border_edge(vid, b);
                }
            }
        }
    }

    fn mark_border_edge(&mut self, a: VertexId, b: VertexId) {
        self.vertex_mut(a).border = true;
        self.vertex_mut(b).border = true;
    }

    /// True when the face has at least one border edge.
    pub fn is_border_face(&self, face: FaceId) -> bool {
        self.face(face).border.iter().any(|b| *b)
    }

    /// Reset every live vertex's modification mark.
    pub fn reset_marks(&mut self) {
        for v in self.vertices.iter_mut().filter(|v| !v.deleted) {
            v.mark = 0;
        }
    }

    // ============================================================================
    // Geometry
    // ============================================================================

    pub fn face_positions(&self, face: FaceId) -> [Vec3; 3] {
        self.face(face).vertices.map(|v| self.position(v))
    }

    pub fn face_quality(&self, face: FaceId) -> f32 {
        let [p0, p1, p2] = self.face_positions(face);
        triangle_quality(p0, p1, p2)
    }

    pub fn compute_face_normal(&self, face: FaceId) -> Vec3 {
        let [p0, p1, p2] = self.face_positions(face);
        triangle_normal(p0, p1, p2)
    }

    /// Capture the current geometric normal of every live face.
    pub fn build_face_normals(&mut self) {
        for fi in 0..self.faces.len() {
            if self.faces[fi].deleted {
                continue;
            }
            let n = self.compute_face_normal(FaceId(fi as u32));
            self.faces[fi].face_normal = n;
        }
    }

    // ============================================================================
    // Attribute vectors
    // ============================================================================

    /// Attribute vector of a face corner laid out by `mask`:
    /// position, then normal, then uv.
    pub fn corner_attributes(&self, face: FaceId, slot: usize, mask: AttributeMask) -> Vec<f32> {
        let f = self.face(face);
        let mut out = Vec::with_capacity(mask.component_count());
        for attribute in mask.iter() {
            match attribute {
                Attribute::Position => out.extend_from_slice(&self.position(f.vertices[slot]).to_array()),
                Attribute::Normal => out.extend_from_slice(&f.normals[slot].to_array()),
                Attribute::Uv0 => out.extend_from_slice(&f.uvs[slot].to_array()),
            }
        }
        out
    }

    /// Write an attribute vector laid out by `mask` back into a face corner.
    /// Missing trailing components are left untouched.
    pub fn set_corner_attributes(&mut self, face: FaceId, slot: usize, mask: AttributeMask, values: &[f32]) {
        let mut offset = 0;
        for attribute in mask.iter() {
            let n = attribute.components();
            let Some(chunk) = values.get(offset..offset + n) else {
                return;
            };
            match attribute {
                Attribute::Position => {
                    let v = self.face(face).vertices[slot];
                    self.vertex_mut(v).position = Vec3::from_slice(chunk);
                }
                Attribute::Normal => self.face_mut(face).normals[slot] = Vec3::from_slice(chunk),
                Attribute::Uv0 => self.face_mut(face).uvs[slot] = Vec2::from_slice(chunk),
            }
            offset += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::shapes;

    #[test]
    fn test_triangle_quality() {
        let q = triangle_quality(Vec3::ZERO, Vec3::X, Vec3::new(0.5, 3f32.sqrt() / 2.0, 0.0));
        assert_relative_eq!(q, 3f32.sqrt() / 2.0, epsilon = 1e-5);
        assert_eq!(triangle_quality(Vec3::ZERO, Vec3::X, Vec3::X * 2.0), 0.0);
        assert_eq!(triangle_quality(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO), 0.0);
    }

    #[test]
    fn test_vertex_order_is_z_then_y_then_x() {
        let buffers = three_points(
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        );
        let mesh = Mesh::from_buffers(&buffers).unwrap();
        // x-only < y-only < z-only
        assert!(mesh.vertex_less(VertexId(0), VertexId(1)));
        assert!(mesh.vertex_less(VertexId(1), VertexId(2)));
        assert!(!mesh.vertex_less(VertexId(2), VertexId(0)));
        assert_eq!(mesh.vertex_cmp(VertexId(1), VertexId(1)), Ordering::Equal);
    }

    #[test]
    fn test_closed_mesh_has_no_border() {
        let mut mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        mesh.build_face_border();
        assert!(mesh.live_faces().all(|f| !mesh.is_border_face(f)));
    }

    #[test]
    fn test_grid_border_edges() {
        let mut mesh = Mesh::from_buffers(&shapes::grid(2)).unwrap();
        mesh.build_face_border();
        let border_edges: usize = mesh
            .live_faces()
            .map(|f| mesh.face(f).border.iter().filter(|b| **b).count())
            .sum();
        // 2x2 quads: 8 boundary edges, each flagged on exactly one face
        assert_eq!(border_edges, 8);
    }

    #[test]
    fn test_border_flags_reach_vertices() {
        let mut mesh = Mesh::from_buffers(&shapes::grid(2)).unwrap();
        mesh.build_face_border();
        let interior: Vec<_> = mesh.live_vertices().filter(|v| !mesh.vertex(*v).border).collect();
        assert_eq!(interior.len(), 1);
        assert_eq!(mesh.position(interior[0]), Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(mesh.live_vertices().filter(|v| mesh.vertex(*v).border).count(), 8);

        let mut closed = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        closed.build_face_border();
        assert!(closed.live_vertices().all(|v| !closed.vertex(v).border));
    }

    #[test]
    fn test_single_triangle_all_border() {
        let buffers = three_points(
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        );
        let mut mesh = Mesh::from_buffers(&buffers).unwrap();
        mesh.build_face_border();
        assert_eq!(mesh.face(FaceId(0)).border, [true; 3]);
    }

    #[test]
    fn test_corner_attributes_layout() {
        let mut mesh = Mesh::from_buffers(&shapes::grid(1)).unwrap();
        let mask = AttributeMask::POSITION | AttributeMask::NORMAL | AttributeMask::UV0;
        let attrs = mesh.corner_attributes(FaceId(0), 1, mask);
        assert_eq!(attrs.len(), 8);
        assert_eq!(&attrs[0..3], &mesh.position(mesh.face(FaceId(0)).vertices[1]).to_array());
        assert_eq!(&attrs[3..6], &[0.0, 0.0, 1.0]);

        mesh.set_corner_attributes(FaceId(0), 1, AttributeMask::UV0, &[0.25, 0.75]);
        assert_eq!(mesh.face(FaceId(0)).uvs[1], Vec2::new(0.25, 0.75));
    }

    #[test]
    fn test_edge_faces() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        for v in mesh.live_vertices() {
            for n in mesh.neighbors(v) {
                assert_eq!(mesh.edge_faces(v, n).len(), 2);
            }
        }
    }

    #[test]
    fn test_build_face_normals_follows_moved_vertices() {
        let mut mesh = Mesh::from_buffers(&shapes::grid(1)).unwrap();
        let lifted = mesh
            .live_vertices()
            .find(|v| mesh.position(*v) == Vec3::new(1.0, 1.0, 0.0))
            .unwrap();
        mesh.vertex_mut(lifted).position.z = 1.0;
        let face = mesh.live_faces().find(|f| mesh.face(*f).contains(lifted)).unwrap();
        assert_eq!(mesh.face(face).face_normal, Vec3::Z);

        mesh.build_face_normals();
        assert_eq!(mesh.face(face).face_normal, mesh.compute_face_normal(face));
        assert!(mesh.face(face).face_normal.z < 1.0);
    }

    fn three_points(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> crate::MeshBuffers {
        crate::MeshBuffers::new(vec![a, b, c], vec![0, 1, 2])
    }
}
