//! Per-vertex quadric storage.
//!
//! Every vertex keeps a position-only quadric (the sum of its faces' plane
//! quadrics) and one extended quadric per distinct attribute vector seen at
//! its corners. Seams produce several buckets: the position is shared, the
//! attribute values are not.

use topology::VertexId;

use super::Quadric;

/// Extended quadric of one attribute vector at a vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub attributes: Vec<f32>,
    pub quadric: Quadric,
}

#[derive(Debug, Clone, Default)]
pub struct QuadricHelper {
    qd3: Vec<Quadric>,
    buckets: Vec<Vec<Bucket>>,
    size: usize,
}

impl QuadricHelper {
    /// Storage for `vertex_count` vertices with quadrics of dimension `size`.
    pub fn new(vertex_count: usize, size: usize) -> Self {
        Self {
            qd3: vec![Quadric::zero(3); vertex_count],
            buckets: vec![Vec::new(); vertex_count],
            size,
        }
    }

    /// Dimension of the extended quadrics.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Open a bucket for `attributes` at `vertex`, seeded with the
    /// positional error accumulated there so far.
    pub fn alloc(&mut self, vertex: VertexId, attributes: &[f32]) {
        let mut quadric = Quadric::zero(self.size);
        quadric.sum3(&self.qd3[vertex.index()], attributes);
        self.buckets[vertex.index()].push(Bucket {
            attributes: attributes.to_vec(),
            quadric,
        });
    }

    /// Add a face's quadrics to `vertex`.
    ///
    /// The bucket matching the face's corner attributes takes the full
    /// quadric. The others take only its positional part.
    pub fn sum_all(&mut self, vertex: VertexId, attributes: &[f32], full: &Quadric, geometry: Option<&Quadric>) {
        for bucket in &mut self.buckets[vertex.index()] {
            if bucket.attributes == attributes {
                bucket.quadric.add(full);
            } else if let Some(geometry) = geometry {
                let own = bucket.attributes.clone();
                bucket.quadric.sum3(geometry, &own);
            }
        }
    }

    pub fn contains(&self, vertex: VertexId, attributes: &[f32]) -> bool {
        self.buckets[vertex.index()]
            .iter()
            .any(|b| b.attributes == attributes)
    }

    /// Quadric of the bucket holding `attributes`, or of the vertex's first
    /// bucket when none matches.
    pub fn qd(&self, vertex: VertexId, attributes: &[f32]) -> Option<&Quadric> {
        let buckets = &self.buckets[vertex.index()];
        buckets
            .iter()
            .find(|b| b.attributes == attributes)
            .or_else(|| buckets.first())
            .map(|b| &b.quadric)
    }

    /// Like [`qd`](Self::qd), but a vertex without buckets answers with its
    /// positional quadric embedded at `attributes`.
    pub fn vertex_quadric(&self, vertex: VertexId, attributes: &[f32]) -> Quadric {
        match self.qd(vertex, attributes) {
            Some(q) => q.clone(),
            None => {
                let mut q = Quadric::zero(self.size);
                q.sum3(self.qd3(vertex), attributes);
                q
            }
        }
    }

    pub fn buckets(&self, vertex: VertexId) -> &[Bucket] {
        &self.buckets[vertex.index()]
    }

    pub fn set_buckets(&mut self, vertex: VertexId, buckets: Vec<Bucket>) {
        self.buckets[vertex.index()] = buckets;
    }

    pub fn qd3(&self, vertex: VertexId) -> &Quadric {
        &self.qd3[vertex.index()]
    }

    pub fn qd3_mut(&mut self, vertex: VertexId) -> &mut Quadric {
        &mut self.qd3[vertex.index()]
    }

    pub fn set_qd3(&mut self, vertex: VertexId, quadric: Quadric) {
        self.qd3[vertex.index()] = quadric;
    }
}
