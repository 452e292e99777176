//! State shared by every collapse of one decimation run.

use decimator_config::{AttributeMask, CollapseParams};
use topology::{Mesh, VertexId, VertexPair};
use tracing::debug;

use super::EdgeCollapse;
use super::link::LinkScratch;
use crate::quadric::{QuadricHelper, face_quadrics};
use crate::queue::PriorityQueue;

#[derive(Debug, Clone)]
pub struct SharedData {
    params: CollapseParams,
    quadrics: QuadricHelper,
    pub(crate) link: LinkScratch,
    pub(crate) global_mark: u64,
}

impl SharedData {
    /// Prepare `mesh` for decimation and seed `queue` with one candidate per
    /// writable edge.
    ///
    /// The parameters are fitted to the attributes the mesh carries. Fans and
    /// border flags are rebuilt, boundary vertices are frozen when
    /// `preserve_boundary` is set, and every vertex gets its quadrics.
    pub fn init<Q: PriorityQueue<EdgeCollapse>>(mesh: &mut Mesh, params: &CollapseParams, queue: &mut Q) -> Self {
        let params = params.normalized_for(mesh.attributes());
        let size = 3 + params.used_attributes.component_count();

        mesh.reset_marks();
        mesh.build_vertex_face();
        mesh.build_face_border();
        if params.preserve_boundary {
            freeze_boundary(mesh);
        }

        let mut shared = Self {
            quadrics: QuadricHelper::new(mesh.vertices().len(), size),
            params,
            link: LinkScratch::new(),
            global_mark: 0,
        };
        shared.init_quadrics(mesh);
        shared.init_collapses(mesh, queue);
        shared
    }

    /// Fitted collapse parameters
    pub fn params(&self) -> &CollapseParams {
        &self.params
    }

    pub fn quadrics(&self) -> &QuadricHelper {
        &self.quadrics
    }

    pub(crate) fn quadrics_mut(&mut self) -> &mut QuadricHelper {
        &mut self.quadrics
    }

    pub fn global_mark(&self) -> u64 {
        self.global_mark
    }

    /// Attribute components carried by the quadrics
    pub fn attribute_size(&self) -> usize {
        self.params.used_attributes.component_count()
    }

    /// Dimension of the extended quadrics
    pub fn quadric_size(&self) -> usize {
        self.quadrics.size()
    }

    fn init_quadrics(&mut self, mesh: &Mesh) {
        let mask = self.params.used_attributes;
        for face in mesh.live_faces() {
            let quadrics = face_quadrics(mesh, face, mask, &self.params);
            let vertices = mesh.face(face).vertices;
            for (slot, &v) in vertices.iter().enumerate() {
                if !mesh.vertex(v).writable {
                    continue;
                }
                let attributes = mesh.corner_attributes(face, slot, mask);
                if !self.quadrics.contains(v, &attributes) {
                    self.quadrics.alloc(v, &attributes);
                }
                self.quadrics
                    .sum_all(v, &attributes, &quadrics.full, quadrics.geometry.as_ref());
            }
            if let Some(geometry) = &quadrics.geometry {
                for v in vertices {
                    geometry.add_to_geometry(self.quadrics.qd3_mut(v));
                }
            }
        }
        debug!(
            "collapse init: quadrics of size {} for {} vertices",
            self.quadrics.size(),
            mesh.vertex_count()
        );
    }

    /// One candidate per edge with two writable endpoints, oriented from the
    /// lower to the higher vertex.
    fn init_collapses<Q: PriorityQueue<EdgeCollapse>>(&self, mesh: &mut Mesh, queue: &mut Q) {
        let vertices: Vec<VertexId> = mesh.live_vertices().collect();
        for v in vertices {
            if !mesh.vertex(v).writable {
                continue;
            }
            let corners = mesh.fan_corners(v);
            for &corner in &corners {
                let (a, b) = mesh.opposite_vertices(corner);
                mesh.vertex_mut(a).visited = false;
                mesh.vertex_mut(b).visited = false;
            }
            for &corner in &corners {
                let (a, b) = mesh.opposite_vertices(corner);
                for n in [a, b] {
                    let neighbor = mesh.vertex(n);
                    if neighbor.visited || !neighbor.writable || !mesh.vertex_less(v, n) {
                        continue;
                    }
                    mesh.vertex_mut(n).visited = true;
                    let candidate = EdgeCollapse::new(VertexPair::new(v, n), mesh, self);
                    queue.enqueue(candidate, candidate.priority());
                }
            }
        }
        debug!("collapse init: {} candidates queued", queue.len());
    }
}

/// Clear the writable flag of every vertex on a border edge.
fn freeze_boundary(mesh: &mut Mesh) {
    let border: Vec<VertexId> = mesh.live_vertices().filter(|v| mesh.vertex(*v).border).collect();
    let mut frozen = 0usize;
    for v in border {
        let vertex = mesh.vertex_mut(v);
        if vertex.writable {
            vertex.writable = false;
            frozen += 1;
        }
    }
    debug!("collapse init: froze {} boundary vertices", frozen);
}

/// Attribute channels a collapse must interpolate instead of optimizing.
pub(crate) fn interpolated_attributes(mesh: &Mesh, params: &CollapseParams) -> AttributeMask {
    mesh.attributes() - AttributeMask::POSITION - params.used_attributes
}
