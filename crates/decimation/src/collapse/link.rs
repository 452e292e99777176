//! Topological link condition for edge collapses.
//!
//! Collapsing `(v0, v1)` keeps a 2-manifold exactly when the vertices and
//! edges the two stars share are the ones of the edge's own link. Open fans
//! are closed over a dummy vertex first, so borders follow the same rule.

use std::collections::HashMap;

use topology::{Mesh, VertexId, VertexPair};

/// `None` stands for the dummy vertex closing open fans.
type LinkVertex = Option<VertexId>;

/// Scratch maps reused across link checks.
#[derive(Debug, Clone, Default)]
pub struct LinkScratch {
    vertex_counts: HashMap<LinkVertex, u32>,
    edge_counts: HashMap<(LinkVertex, LinkVertex), u32>,
    fan_counts: HashMap<VertexId, u32>,
    edge_link: Vec<LinkVertex>,
}

impl LinkScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether collapsing `pair` preserves the manifold.
    ///
    /// Every vertex of either star is counted once per incident face corner,
    /// so a vertex inside both closed stars reaches 4. Every link edge is
    /// counted once per star. The collapse is legal when no link edge is
    /// shared and the shared vertices are exactly the edge's link.
    pub fn check(&mut self, mesh: &Mesh, pair: VertexPair) -> bool {
        self.vertex_counts.clear();
        self.edge_counts.clear();
        self.edge_link.clear();

        for pivot in [pair.v0, pair.v1] {
            self.fan_counts.clear();
            for corner in mesh.fan(pivot) {
                let (a, b) = mesh.opposite_vertices(corner);
                for v in [a, b] {
                    *self.fan_counts.entry(v).or_default() += 1;
                    *self.vertex_counts.entry(Some(v)).or_default() += 1;
                }
                let (lo, hi) = mesh.canonical_edge(a, b);
                *self.edge_counts.entry((Some(lo), Some(hi))).or_default() += 1;
            }

            // An open fan has two ends, each seen once. Close it over the dummy.
            let open_ends: Vec<VertexId> = self
                .fan_counts
                .iter()
                .filter(|(_, count)| **count == 1)
                .map(|(v, _)| *v)
                .collect();
            if open_ends.len() == 2 {
                *self.vertex_counts.entry(None).or_default() += 2;
                for end in open_ends {
                    *self.edge_counts.entry((None, Some(end))).or_default() += 1;
                    *self.vertex_counts.entry(Some(end)).or_default() += 1;
                }
            }
        }

        for corner in mesh.fan(pair.v0) {
            let (a, b) = mesh.opposite_vertices(corner);
            if a == pair.v1 {
                self.edge_link.push(Some(b));
            }
            if b == pair.v1 {
                self.edge_link.push(Some(a));
            }
        }
        if self.edge_link.len() == 1 {
            self.edge_link.push(None);
        }

        if self.edge_counts.values().any(|count| *count == 2) {
            return false;
        }
        let shared_vertices = self.vertex_counts.values().filter(|count| **count == 4).count();
        shared_vertices == self.edge_link.len()
    }
}

#[cfg(test)]
mod tests {
    use topology::shapes;

    use super::*;
    use crate::test_support::{equator, vertex_at};

    fn mesh_of(buffers: &topology::MeshBuffers) -> Mesh {
        Mesh::from_buffers(buffers).unwrap()
    }

    #[test]
    fn test_bipyramid_equator_edge_is_rejected() {
        let mesh = mesh_of(&shapes::triangular_bipyramid());
        let ring = equator(&mesh);
        let mut link = LinkScratch::new();
        assert!(!link.check(&mesh, VertexPair::new(ring[0], ring[1])));
        assert!(!link.check(&mesh, VertexPair::new(ring[2], ring[0])));
    }

    #[test]
    fn test_bipyramid_apex_edge_is_legal() {
        let mesh = mesh_of(&shapes::triangular_bipyramid());
        let ring = equator(&mesh);
        let top = vertex_at(&mesh, [0.0, 0.0, 1.0]);
        let bottom = vertex_at(&mesh, [0.0, 0.0, -1.0]);
        let mut link = LinkScratch::new();
        assert!(link.check(&mesh, VertexPair::new(top, ring[0])));
        assert!(link.check(&mesh, VertexPair::new(ring[1], bottom)));
    }

    #[test]
    fn test_tetrahedron_edges_are_rejected() {
        let mesh = mesh_of(&shapes::tetrahedron());
        let mut link = LinkScratch::new();
        for v in mesh.live_vertices() {
            for n in mesh.neighbors(v) {
                assert!(!link.check(&mesh, VertexPair::new(v, n)));
            }
        }
    }

    #[test]
    fn test_octahedron_edges_are_legal() {
        let mesh = mesh_of(&shapes::octahedron());
        let mut link = LinkScratch::new();
        for v in mesh.live_vertices() {
            for n in mesh.neighbors(v) {
                assert!(link.check(&mesh, VertexPair::new(v, n)), "{v:?} -> {n:?}");
            }
        }
    }

    #[test]
    fn test_grid_edges() {
        let mesh = mesh_of(&shapes::grid(3));
        let id = |i: u32, j: u32| vertex_at(&mesh, [i as f32 / 3.0, j as f32 / 3.0, 0.0]);
        let mut link = LinkScratch::new();

        // Interior vertex to interior vertex.
        assert!(link.check(&mesh, VertexPair::new(id(1, 1), id(2, 2))));
        // Along the border.
        assert!(link.check(&mesh, VertexPair::new(id(1, 0), id(2, 0))));
        // Interior vertex to a border vertex.
        assert!(link.check(&mesh, VertexPair::new(id(1, 1), id(1, 0))));
        // Two border vertices around the corner: no shared face, and
        // joining them would pinch the border at (0, 0).
        assert!(!link.check(&mesh, VertexPair::new(id(1, 0), id(0, 1))));
    }
}
