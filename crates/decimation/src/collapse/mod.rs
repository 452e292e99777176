//! Edge collapse candidates.
//!
//! A candidate snapshots the global mark when it is created. Any later
//! collapse touching one of its endpoints stamps that endpoint with a newer
//! mark, which makes the candidate stale without removing it from the queue.
//!
//! ## Priority
//!
//! The priority of collapsing `v0` into `v1` is the quadric error at the
//! best placement divided by the quality of the worst triangle the collapse
//! leaves behind. Flipped normals multiply it by 1000 when the normal check
//! is on. Edges straddling an attribute seam are solved once per side of
//! the seam and take the worse of the two.

mod execute;
mod link;
mod shared;
mod weight;

use decimator_config::CollapseParams;
use glam::Vec3;
use nalgebra::DVector;
use topology::{Mesh, VertexId, VertexPair, triangle_normal, triangle_quality};
use tracing::trace;

pub use link::LinkScratch;
pub use shared::SharedData;

use crate::quadric::{Quadric, extended_point};
use crate::queue::PriorityQueue;

/// Penalty factor for collapses that flip a retained face.
const NORMAL_FLIP_PENALTY: f32 = 1000.0;

/// A candidate collapse of `pair.v0` into `pair.v1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCollapse {
    pair: VertexPair,
    mark: u64,
    priority: f32,
}

impl EdgeCollapse {
    /// Price the collapse of `pair` against the current mesh.
    pub fn new(pair: VertexPair, mesh: &Mesh, shared: &SharedData) -> Self {
        let priority = Placement::compute(mesh, shared, pair).priority;
        Self {
            pair,
            mark: shared.global_mark,
            priority,
        }
    }

    pub fn pair(&self) -> VertexPair {
        self.pair
    }

    pub fn mark(&self) -> u64 {
        self.mark
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    /// Both endpoints are alive and neither changed since this candidate was priced.
    pub fn is_up_to_date(&self, mesh: &Mesh) -> bool {
        let v0 = mesh.vertex(self.pair.v0);
        let v1 = mesh.vertex(self.pair.v1);
        !v0.deleted && !v1.deleted && self.mark >= v0.mark && self.mark >= v1.mark
    }

    /// Whether the collapse keeps the mesh manifold.
    pub fn is_feasible(&self, mesh: &Mesh, shared: &mut SharedData) -> bool {
        shared.link.check(mesh, self.pair)
    }

    /// Stamp the survivor with a fresh mark and queue a candidate for each
    /// of its writable neighbors.
    pub fn update_heap<Q: PriorityQueue<EdgeCollapse>>(&self, mesh: &mut Mesh, shared: &mut SharedData, queue: &mut Q) {
        shared.global_mark += 1;
        let survivor = self.pair.v1;
        mesh.vertex_mut(survivor).mark = shared.global_mark;

        let corners = mesh.fan_corners(survivor);
        for &corner in &corners {
            let (a, b) = mesh.opposite_vertices(corner);
            mesh.vertex_mut(a).visited = false;
            mesh.vertex_mut(b).visited = false;
        }
        let mut queued = 0;
        for &corner in &corners {
            let (a, b) = mesh.opposite_vertices(corner);
            for n in [a, b] {
                let neighbor = mesh.vertex(n);
                if neighbor.visited || !neighbor.writable {
                    continue;
                }
                mesh.vertex_mut(n).visited = true;
                let candidate = EdgeCollapse::new(VertexPair::new(survivor, n), mesh, shared);
                queue.enqueue(candidate, candidate.priority);
                queued += 1;
            }
        }
        trace!("collapse: requeued {} edges around {:?}", queued, survivor);
    }
}

/// Corner attributes of the faces on either side of an edge.
///
/// `first` holds the attributes of `v0` and `v1` in the first face found
/// around `v0` that contains `v1`. `second` is set when the other face across
/// the edge carries different attributes, i.e. the edge lies on a seam.
#[derive(Debug, Clone, Default)]
pub(crate) struct EdgeSides {
    pub first: (Vec<f32>, Vec<f32>),
    pub second: Option<(Vec<f32>, Vec<f32>)>,
}

impl EdgeSides {
    fn of(mesh: &Mesh, pair: VertexPair, params: &CollapseParams) -> Self {
        let mask = params.used_attributes;
        let mut sides = EdgeSides::default();
        let mut found = 0;
        for corner in mesh.fan(pair.v0) {
            let face = mesh.face(corner.face);
            let Some(slot) = face.slot_of(pair.v1) else {
                continue;
            };
            let side = (
                mesh.corner_attributes(corner.face, corner.slot, mask),
                mesh.corner_attributes(corner.face, slot, mask),
            );
            found += 1;
            if found == 1 {
                sides.first = side;
            } else {
                if side != sides.first {
                    sides.second = Some(side);
                }
                break;
            }
        }
        sides
    }
}

/// Best placement of a collapse and what it costs.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub sides: EdgeSides,
    /// Optimal extended point for the first side
    pub first: DVector<f64>,
    pub first_quadric: Quadric,
    /// Optimal extended point and summed quadric of the second side of a seam
    pub second: Option<(DVector<f64>, Quadric)>,
    pub priority: f32,
}

impl Placement {
    pub fn compute(mesh: &Mesh, shared: &SharedData, pair: VertexPair) -> Self {
        let params = shared.params();
        let helper = shared.quadrics();
        let sides = EdgeSides::of(mesh, pair, params);
        let (p0, p1) = (mesh.position(pair.v0), mesh.position(pair.v1));

        let side_quadric = |(a0, a1): &(Vec<f32>, Vec<f32>)| {
            let mut q = helper.vertex_quadric(pair.v0, a0);
            q.add(&helper.vertex_quadric(pair.v1, a1));
            (extended_point(p0, a0), extended_point(p1, a1), q)
        };

        let (x0, x1, first_quadric) = side_quadric(&sides.first);
        let mut first = minimal(&x0, &x1, &first_quadric, params);
        let mut first_priority = evaluate(mesh, pair, &first, &first_quadric, params);

        let mut second = None;
        let mut priority = first_priority;
        if let Some(side) = &sides.second {
            let (y0, y1, second_quadric) = side_quadric(side);
            let mut other = minimal(&y0, &y1, &second_quadric, params);
            let mut second_priority = evaluate(mesh, pair, &other, &second_quadric, params);

            // Both sides must agree on one position: the costlier side keeps
            // its own, the other re-solves its attributes there.
            if first_priority > second_priority {
                other = minimal_at(&y0, &y1, &second_quadric, position_of(&first), params);
                second_priority = evaluate(mesh, pair, &other, &second_quadric, params);
            } else {
                first = minimal_at(&x0, &x1, &first_quadric, position_of(&other), params);
                first_priority = evaluate(mesh, pair, &first, &first_quadric, params);
            }
            priority = first_priority.max(second_priority);
            second = Some((other, second_quadric));
        }

        let priority = priority * (1.0 + weight::extra_weight(shared, pair));
        Self {
            sides,
            first,
            first_quadric,
            second,
            priority,
        }
    }

    /// Where the survivor moves.
    pub fn position(&self) -> Vec3 {
        vec3_of(&self.first)
    }
}

fn position_of(x: &DVector<f64>) -> [f64; 3] {
    [x[0], x[1], x[2]]
}

fn vec3_of(x: &DVector<f64>) -> Vec3 {
    Vec3::new(x[0] as f32, x[1] as f32, x[2] as f32)
}

/// Attribute components of an extended point.
pub(crate) fn attributes_of(x: &DVector<f64>) -> Vec<f32> {
    x.iter().skip(3).map(|v| *v as f32).collect()
}

/// Least-error point for merging `x0` and `x1`: the quadric minimum when
/// optimal placement is on and the system is solvable, otherwise the best
/// of evenly spaced samples along the edge.
fn minimal(x0: &DVector<f64>, x1: &DVector<f64>, q: &Quadric, params: &CollapseParams) -> DVector<f64> {
    if params.optimal_placement {
        if let Some(x) = q.minimum() {
            return x;
        }
    }
    sample_edge(x0, x1, q, params, None)
}

/// Like [`minimal`], with the position held at `geo`.
fn minimal_at(
    x0: &DVector<f64>,
    x1: &DVector<f64>,
    q: &Quadric,
    geo: [f64; 3],
    params: &CollapseParams,
) -> DVector<f64> {
    if params.optimal_placement {
        if let Some(x) = q.minimum_with_geo_constraints(&geo) {
            return x;
        }
    }
    sample_edge(x0, x1, q, params, Some(geo))
}

fn sample_edge(
    x0: &DVector<f64>,
    x1: &DVector<f64>,
    q: &Quadric,
    params: &CollapseParams,
    geo: Option<[f64; 3]>,
) -> DVector<f64> {
    let steps = if params.optimal_placement {
        params.optimal_sample_count.max(1) + 1
    } else {
        1
    };
    let mut best = x0.clone();
    let mut best_error = f64::INFINITY;
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        let mut x = x0 * (1.0 - t) + x1 * t;
        if let Some(geo) = geo {
            x.as_mut_slice()[..3].copy_from_slice(&geo);
        }
        let error = q.apply(&x);
        if error < best_error {
            best_error = error;
            best = x;
        }
    }
    best
}

/// Priority of placing the merged vertex at `x`.
fn evaluate(mesh: &Mesh, pair: VertexPair, x: &DVector<f64>, q: &Quadric, params: &CollapseParams) -> f32 {
    let (min_quality, min_cosine) = retained_face_metrics(mesh, pair, vec3_of(x));
    priority_from(q.apply(x), min_quality, min_cosine, params)
}

/// Worst quality and worst normal agreement over the faces that survive the
/// collapse, with both endpoints moved to `position`. The mesh is not touched.
///
/// Returns `(f64::MAX, f32::MAX)` when no face survives.
pub(crate) fn retained_face_metrics(mesh: &Mesh, pair: VertexPair, position: Vec3) -> (f64, f32) {
    let moved = |v: VertexId| {
        if v == pair.v0 || v == pair.v1 {
            position
        } else {
            mesh.position(v)
        }
    };
    let mut min_quality = f64::MAX;
    let mut min_cosine = f32::MAX;
    for (pivot, other) in [(pair.v0, pair.v1), (pair.v1, pair.v0)] {
        for corner in mesh.fan(pivot) {
            let face = mesh.face(corner.face);
            if face.contains(other) {
                continue;
            }
            let [p0, p1, p2] = face.vertices.map(moved);
            min_quality = min_quality.min(triangle_quality(p0, p1, p2) as f64);
            min_cosine = min_cosine.min(triangle_normal(p0, p1, p2).dot(face.face_normal));
        }
    }
    (min_quality, min_cosine)
}

/// Combine the quadric error and the retained-face metrics into a priority.
///
/// Quality is capped at `quality_threshold`, so only poor triangles raise the
/// cost. A degenerate retained triangle makes the collapse infinitely costly.
pub(crate) fn priority_from(error: f64, min_quality: f64, min_cosine: f32, params: &CollapseParams) -> f32 {
    let quality = min_quality.min(params.quality_threshold);
    if quality <= 0.0 {
        return f32::INFINITY;
    }
    let error = error.max(params.quadric_epsilon);
    let mut priority = (error / quality) as f32;
    if params.normal_check && min_cosine < params.normal_cosine_threshold {
        priority *= NORMAL_FLIP_PENALTY;
    }
    priority
}
