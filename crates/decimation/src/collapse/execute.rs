//! Carrying out a collapse: placement, intersection test, attribute
//! interpolation, topology surgery, BVH upkeep and quadric re-bucketing.

use std::collections::HashSet;

use decimator_config::{Attribute, AttributeMask, AttributeSetting, CollapseParams};
use glam::Vec3;
use topology::{Corner, Face, FaceId, Mesh, VertexId, VertexPair};
use tracing::debug;

use super::shared::interpolated_attributes;
use super::{EdgeCollapse, EdgeSides, Placement, SharedData, attributes_of};
use crate::DecimateError;
use crate::face_bvh::{FaceBvh, face_sphere};
use crate::geometry::{barycentric_coords, point_to_triangle, segment_intersects_triangle};
use crate::quadric::{Bucket, Quadric, QuadricHelper};

impl EdgeCollapse {
    /// Merge `v0` into `v1` at the optimal placement.
    ///
    /// Returns `Ok(false)` without touching anything when intersection
    /// prevention finds a crossing. Errors come from the face hierarchy and
    /// mean it no longer matches the mesh.
    pub fn execute(&self, mesh: &mut Mesh, shared: &mut SharedData, bvh: &mut FaceBvh) -> Result<bool, DecimateError> {
        let pair = self.pair;
        let params = shared.params().clone();
        let helper = shared.quadrics();
        let mut qsum3 = helper.qd3(pair.v0).clone();
        qsum3.add(helper.qd3(pair.v1));

        let placement = Placement::compute(mesh, shared, pair);
        let position = placement.position();

        if params.prevent_intersection {
            let crossings = intersection_count(mesh, bvh, pair, position);
            if crossings > 0 {
                debug!(
                    "collapse execute: {:?} -> {:?} rejected, {} crossings",
                    pair.v0, pair.v1, crossings
                );
                return Ok(false);
            }
        }

        let interpolated = interpolated_attributes(mesh, &params);
        if !interpolated.is_empty() {
            interpolate_attributes(mesh, pair, position, interpolated, &params);
        }

        let deleted = mesh.collapse(pair, position);
        if params.prevent_intersection {
            for face in &deleted {
                bvh.remove(face)?;
            }
        }

        let buckets = rebucket(mesh, shared.quadrics(), pair, &placement, &qsum3, params.used_attributes);

        if params.prevent_intersection {
            for corner in mesh.fan(pair.v1) {
                bvh.update_object(&corner.face, face_sphere(mesh, corner.face))?;
            }
            bvh.optimize()?;
        }

        let quadrics = shared.quadrics_mut();
        quadrics.set_qd3(pair.v1, qsum3);
        quadrics.set_buckets(pair.v1, buckets);
        Ok(true)
    }
}

/// Count crossings between the triangles around the merged vertex and the
/// rest of the mesh.
///
/// Every segment from `position` to a surviving neighbor is tested against
/// the faces the hierarchy reports near it, skipping the faces around both
/// endpoints. A hit at either end of a segment does not count.
fn intersection_count(mesh: &Mesh, bvh: &FaceBvh, pair: VertexPair, position: Vec3) -> usize {
    let mut ends: Vec<Vec3> = Vec::new();
    let mut excluded: HashSet<FaceId> = HashSet::new();
    for (pivot, other) in [(pair.v0, pair.v1), (pair.v1, pair.v0)] {
        let moved = mesh.position(pivot) != position;
        for corner in mesh.fan(pivot) {
            excluded.insert(corner.face);
            if !moved {
                continue;
            }
            let (a, b) = mesh.opposite_vertices(corner);
            for n in [a, b] {
                let p = mesh.position(n);
                if n != other && !ends.contains(&p) {
                    ends.push(p);
                }
            }
        }
    }
    if ends.is_empty() {
        return 0;
    }

    let nearby = bvh.collect_objects(|bounds| ends.iter().any(|end| bounds.intersects_segment(position, *end)));
    let mut count = 0;
    for face in nearby {
        if excluded.contains(&face) || mesh.face(face).deleted {
            continue;
        }
        let [p1, p2, p3] = mesh.face_positions(face);
        for end in &ends {
            if let Some(hit) = segment_intersects_triangle(position, *end, p1, p2, p3) {
                if hit != *end && hit != position {
                    count += 1;
                }
            }
        }
    }
    count
}

fn is_outside(barycentric: Vec3) -> bool {
    !barycentric.is_finite() || barycentric.min_element() < 0.0
}

/// Recompute the `mask` attributes of every corner of `v0` and `v1` on a
/// face that survives the collapse, as seen from `position`.
///
/// The face across the edge nearest to `position` is the reference. A corner
/// whose own face does not contain `position` either borrows the reference's
/// value, when the two agree within the channel's distance threshold, or
/// clamps to its face's closest point.
fn interpolate_attributes(mesh: &mut Mesh, pair: VertexPair, position: Vec3, mask: AttributeMask, params: &CollapseParams) {
    let mut nearest: Option<(FaceId, usize, usize, f32)> = None;
    for corner in mesh.fan(pair.v0) {
        let Some(slot1) = mesh.face(corner.face).slot_of(pair.v1) else {
            continue;
        };
        let [a, b, c] = mesh.face_positions(corner.face);
        let distance = point_to_triangle(position, a, b, c).sqr_distance;
        if nearest.is_none_or(|(_, _, _, best)| distance < best) {
            nearest = Some((corner.face, corner.slot, slot1, distance));
        }
    }
    let Some((reference_id, slot0, slot1, _)) = nearest else {
        return;
    };

    let reference = mesh.face(reference_id).clone();
    let [a, b, c] = mesh.face_positions(reference_id);
    let mut reference_coord = barycentric_coords(position, a, b, c);
    if is_outside(reference_coord) {
        reference_coord = point_to_triangle(position, a, b, c).barycentric;
    }

    let mut corners: Vec<(Corner, usize)> = Vec::new();
    for (pivot, other, reference_slot) in [(pair.v0, pair.v1, slot0), (pair.v1, pair.v0, slot1)] {
        corners.extend(
            mesh.fan(pivot)
                .filter(|corner| !mesh.face(corner.face).contains(other))
                .map(|corner| (corner, reference_slot)),
        );
    }

    let lookup = Interpolation {
        reference: &reference,
        reference_coord,
    };
    for (corner, reference_slot) in corners {
        let [a, b, c] = mesh.face_positions(corner.face);
        let face = mesh.face(corner.face);
        let mut coord = barycentric_coords(position, a, b, c);
        let outside = is_outside(coord);
        let closest = if outside {
            point_to_triangle(position, a, b, c).barycentric
        } else {
            coord
        };
        if !coord.is_finite() {
            coord = closest;
        }
        let at = Site {
            face,
            slot: corner.slot,
            reference_slot,
            coord,
            closest,
            outside,
        };

        let normal = mask
            .has(Attribute::Normal)
            .then(|| lookup.normal(&at, &params.normal_setting));
        let uv = mask.has(Attribute::Uv0).then(|| lookup.uv(&at, &params.uv_setting));

        let face = mesh.face_mut(corner.face);
        if let Some(normal) = normal {
            face.normals[corner.slot] = normal;
        }
        if let Some(uv) = uv {
            face.uvs[corner.slot] = uv;
        }
    }
}

/// Reference face of an interpolation and where the merge point falls on it
struct Interpolation<'a> {
    reference: &'a Face,
    reference_coord: Vec3,
}

/// One corner being interpolated
struct Site<'a> {
    face: &'a Face,
    slot: usize,
    reference_slot: usize,
    coord: Vec3,
    closest: Vec3,
    outside: bool,
}

impl Interpolation<'_> {
    fn normal(&self, at: &Site, setting: &AttributeSetting) -> Vec3 {
        let own = at.face.normals[at.slot];
        let theirs = self.reference.normals[at.reference_slot];
        if at.outside
            && setting.interpolate_with_adjacent_face
            && own.distance_squared(theirs) < setting.sqr_distance_threshold
        {
            self.reference.interpolate_normal(self.reference_coord)
        } else if at.outside && setting.interpolate_clamped {
            at.face.interpolate_normal(at.closest)
        } else {
            at.face.interpolate_normal(at.coord)
        }
    }

    fn uv(&self, at: &Site, setting: &AttributeSetting) -> glam::Vec2 {
        let own = at.face.uvs[at.slot];
        let theirs = self.reference.uvs[at.reference_slot];
        if at.outside
            && setting.interpolate_with_adjacent_face
            && own.distance_squared(theirs) < setting.sqr_distance_threshold
        {
            self.reference.interpolate_uv(self.reference_coord)
        } else if at.outside && setting.interpolate_clamped {
            at.face.interpolate_uv(at.closest)
        } else {
            at.face.interpolate_uv(at.coord)
        }
    }
}

/// New attribute buckets of the survivor after the collapse.
///
/// Corners that carried an edge value on either side of the edge take the
/// optimized value of that side. Any other value keeps the bucket of the
/// endpoint it came from, widened by the other endpoint's positional error.
fn rebucket(
    mesh: &mut Mesh,
    helper: &QuadricHelper,
    pair: VertexPair,
    placement: &Placement,
    qsum3: &Quadric,
    mask: AttributeMask,
) -> Vec<Bucket> {
    let EdgeSides { first, second } = &placement.sides;
    let merged_first = attributes_of(&placement.first);
    let mut buckets = vec![Bucket {
        attributes: merged_first.clone(),
        quadric: placement.first_quadric.clone(),
    }];
    let merged_second = placement.second.as_ref().map(|(x, quadric)| {
        let attributes = attributes_of(x);
        buckets.push(Bucket {
            attributes: attributes.clone(),
            quadric: quadric.clone(),
        });
        attributes
    });

    for corner in mesh.fan_corners(pair.v1) {
        let attributes = mesh.corner_attributes(corner.face, corner.slot, mask);
        if attributes == first.0 || attributes == first.1 {
            mesh.set_corner_attributes(corner.face, corner.slot, mask, &merged_first);
            continue;
        }
        if let (Some((a0, a1)), Some(merged)) = (second, &merged_second) {
            if attributes == *a0 || attributes == *a1 {
                mesh.set_corner_attributes(corner.face, corner.slot, mask, merged);
                continue;
            }
        }
        if buckets.iter().any(|b| b.attributes == attributes) {
            continue;
        }
        let quadric = carried_quadric(helper, pair, &attributes, qsum3);
        buckets.push(Bucket { attributes, quadric });
    }
    buckets
}

/// Quadric for an attribute value away from the edge: the bucket of the
/// endpoint holding it plus the other endpoint's positional error, or the
/// merged positional error alone when neither endpoint knows the value.
fn carried_quadric(helper: &QuadricHelper, pair: VertexPair, attributes: &[f32], qsum3: &Quadric) -> Quadric {
    let owners: [(VertexId, VertexId); 2] = [(pair.v0, pair.v1), (pair.v1, pair.v0)];
    for (owner, other) in owners {
        if helper.contains(owner, attributes) {
            if let Some(q) = helper.qd(owner, attributes) {
                let mut quadric = q.clone();
                quadric.sum3(helper.qd3(other), attributes);
                return quadric;
            }
        }
    }
    let mut quadric = Quadric::zero(helper.size());
    quadric.sum3(qsum3, attributes);
    quadric
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use decimator_config::BvhSettings;
    use glam::Vec2;
    use topology::{MeshBuffers, shapes};
    use spatial::ObjectAdapter;

    use super::*;
    use crate::face_bvh::build_face_bvh;
    use crate::queue::{BinaryHeapQueue, PriorityQueue};
    use crate::test_support::vertex_at;

    struct Fixture {
        mesh: Mesh,
        shared: SharedData,
        queue: BinaryHeapQueue<EdgeCollapse>,
        bvh: FaceBvh,
    }

    fn fixture(buffers: &MeshBuffers, params: &CollapseParams) -> Fixture {
        let mut mesh = Mesh::from_buffers(buffers).unwrap();
        let mut queue = BinaryHeapQueue::new();
        let shared = SharedData::init(&mut mesh, params, &mut queue);
        let bvh = build_face_bvh(&mesh, params.prevent_intersection, &BvhSettings::default()).unwrap();
        Fixture {
            mesh,
            shared,
            queue,
            bvh,
        }
    }

    #[test]
    fn test_execute_merges_pair() {
        let mut params = CollapseParams::default();
        params.used_attributes = AttributeMask::NONE;
        let mut f = fixture(&shapes::octahedron(), &params);
        let candidate = f.queue.dequeue().unwrap().0;
        let pair = candidate.pair();

        assert!(candidate.execute(&mut f.mesh, &mut f.shared, &mut f.bvh).unwrap());
        assert_eq!(f.mesh.face_count(), 6);
        assert_eq!(f.mesh.vertex_count(), 5);
        assert!(f.mesh.vertex(pair.v0).deleted);
        f.mesh.validate().unwrap();
        // The survivor's positional quadric is the sum of both endpoints'.
        assert!(f.shared.quadrics().qd3(pair.v1).is_valid());
        assert_eq!(f.shared.quadrics().buckets(pair.v1).len(), 1);
    }

    #[test]
    fn test_execute_keeps_bvh_in_sync() {
        let mut params = CollapseParams::default();
        params.prevent_intersection = true;
        let mut f = fixture(&shapes::uv_sphere(6, 8), &params);

        let mut executed = 0;
        while executed < 10 {
            let Some((candidate, _)) = f.queue.dequeue() else {
                break;
            };
            if !candidate.is_up_to_date(&f.mesh) || !candidate.is_feasible(&f.mesh, &mut f.shared) {
                continue;
            }
            if candidate.execute(&mut f.mesh, &mut f.shared, &mut f.bvh).unwrap() {
                candidate.update_heap(&mut f.mesh, &mut f.shared, &mut f.queue);
                executed += 1;
            }
        }
        assert_eq!(executed, 10);
        f.bvh.check_invariants().unwrap();
        assert_eq!(f.bvh.leaf_count(), f.mesh.face_count());
        for face in f.mesh.live_faces() {
            assert!(f.bvh.adapter().leaf(&face).is_some());
        }
        f.mesh.validate().unwrap();
    }

    #[test]
    fn test_crossing_segment_is_counted() {
        // A flat fan around the origin and a separate triangle standing
        // across the segment from the origin to (1, 0, 0).
        let buffers = MeshBuffers::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.5, -0.5, -0.5],
                [0.5, 0.5, -0.5],
                [0.5, 0.0, 0.5],
            ],
            vec![0, 1, 2, 0, 2, 3, 4, 5, 6],
        );
        let mut params = CollapseParams::default();
        params.prevent_intersection = true;
        let f = fixture(&buffers, &params);
        let origin = vertex_at(&f.mesh, [0.0, 0.0, 0.0]);
        let left = vertex_at(&f.mesh, [-1.0, 0.0, 0.0]);
        let up = vertex_at(&f.mesh, [0.0, 1.0, 0.0]);

        // Pulling the origin out to (-1, 0, 0) stretches its edge to (1, 0, 0)
        // through the standing triangle.
        let left_pos = Vec3::new(-1.0, 0.0, 0.0);
        let crossings = intersection_count(&f.mesh, &f.bvh, VertexPair::new(origin, left), left_pos);
        assert_eq!(crossings, 1);
        // The other way round only the edge to (0, 1, 0) moves.
        let crossings = intersection_count(&f.mesh, &f.bvh, VertexPair::new(left, origin), Vec3::ZERO);
        assert_eq!(crossings, 0);
        // Segments passing above the standing triangle.
        let crossings = intersection_count(&f.mesh, &f.bvh, VertexPair::new(origin, up), Vec3::new(-0.5, 1.5, 0.0));
        assert_eq!(crossings, 0);
    }

    #[test]
    fn test_convex_collapse_has_no_crossings() {
        // Every segment from the survivor to a ring vertex is a chord of the
        // hull, touching other faces only at its far end.
        let mut params = CollapseParams::default();
        params.prevent_intersection = true;
        params.used_attributes = AttributeMask::NONE;
        for buffers in [shapes::octahedron(), shapes::uv_sphere(6, 8)] {
            let f = fixture(&buffers, &params);
            for v0 in f.mesh.live_vertices() {
                for v1 in f.mesh.neighbors(v0) {
                    let pair = VertexPair::new(v0, v1);
                    let crossings = intersection_count(&f.mesh, &f.bvh, pair, f.mesh.position(v1));
                    assert_eq!(crossings, 0, "{pair:?}");
                }
            }
        }
    }

    #[test]
    fn test_interpolation_follows_surviving_face() {
        // Grid uvs equal xy: interpolating at any inside point reproduces it.
        let mut params = CollapseParams::default();
        params.used_attributes = AttributeMask::NONE;
        let mut f = fixture(&shapes::grid(4), &params);
        let a = vertex_at(&f.mesh, [0.5, 0.5, 0.0]);
        let b = vertex_at(&f.mesh, [0.75, 0.5, 0.0]);
        let target = Vec3::new(0.625, 0.5, 0.0);

        interpolate_attributes(&mut f.mesh, VertexPair::new(a, b), target, AttributeMask::UV0, &params);
        for v in [a, b] {
            for corner in f.mesh.fan(v) {
                let face = f.mesh.face(corner.face);
                if face.contains(a) && face.contains(b) {
                    continue;
                }
                let uv = face.uvs[corner.slot];
                assert_relative_eq!(uv.x, 0.625, epsilon = 1e-5);
                assert_relative_eq!(uv.y, 0.5, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_execute_interpolates_unused_channels() {
        let mut params = CollapseParams::default();
        params.used_attributes = AttributeMask::NONE;
        let mut f = fixture(&shapes::grid(4), &params);
        let a = vertex_at(&f.mesh, [0.5, 0.5, 0.0]);
        let b = vertex_at(&f.mesh, [0.75, 0.5, 0.0]);
        let candidate = EdgeCollapse::new(VertexPair::new(a, b), &f.mesh, &f.shared);

        assert!(candidate.execute(&mut f.mesh, &mut f.shared, &mut f.bvh).unwrap());
        let position = f.mesh.position(b);
        for corner in f.mesh.fan(b) {
            let face = f.mesh.face(corner.face);
            assert_relative_eq!(face.uvs[corner.slot].distance(Vec2::new(position.x, position.y)), 0.0, epsilon = 1e-4);
            assert_relative_eq!(face.normals[corner.slot].z, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_execute_rebuckets_seam() {
        // Two uv islands meeting on the diagonal of a quad; collapsing along
        // the seam keeps one bucket per island.
        let buffers = MeshBuffers {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: None,
            uvs: Some(vec![[0.0, 0.0], [0.5, 0.0], [0.5, 0.5], [0.6, 0.6], [1.0, 1.0], [0.6, 1.0]]),
            indices: vec![0, 1, 2, 3, 4, 5],
        };
        let mut f = fixture(&buffers, &CollapseParams::default());
        let a = vertex_at(&f.mesh, [1.0, 0.0, 0.0]);
        let c = vertex_at(&f.mesh, [1.0, 1.0, 0.0]);

        // (1, 0) into (1, 1): the first face disappears, the second keeps
        // (1, 1) with its own island's uv.
        let candidate = EdgeCollapse::new(VertexPair::new(a, c), &f.mesh, &f.shared);
        assert!(candidate.execute(&mut f.mesh, &mut f.shared, &mut f.bvh).unwrap());
        assert_eq!(f.mesh.face_count(), 1);

        let buckets = f.shared.quadrics().buckets(c);
        // The merged value of the collapsed edge plus the surviving island.
        assert_eq!(buckets.len(), 2);
        let survivor_uv = f.mesh.fan(c).map(|corner| f.mesh.face(corner.face).uvs[corner.slot]).next().unwrap();
        assert!(buckets.iter().any(|b| b.attributes == survivor_uv.to_array().to_vec()));
    }

    #[test]
    fn test_carried_quadric_prefers_owner() {
        let mut params = CollapseParams::default();
        params.used_attributes = AttributeMask::UV0;
        let f = fixture(&shapes::grid(2), &params);
        let a = vertex_at(&f.mesh, [0.5, 0.5, 0.0]);
        let b = vertex_at(&f.mesh, [1.0, 0.5, 0.0]);
        let helper = f.shared.quadrics();
        let qsum3 = Quadric::zero(3);

        let pair = VertexPair::new(a, b);

        let mut expected = helper.qd(a, &[0.5, 0.5]).unwrap().clone();
        expected.sum3(helper.qd3(b), &[0.5, 0.5]);
        assert_eq!(carried_quadric(helper, pair, &[0.5, 0.5], &qsum3), expected);

        let mut expected = helper.qd(b, &[1.0, 0.5]).unwrap().clone();
        expected.sum3(helper.qd3(a), &[1.0, 0.5]);
        assert_eq!(carried_quadric(helper, pair, &[1.0, 0.5], &qsum3), expected);

        let fresh = carried_quadric(helper, pair, &[9.0, 9.0], &qsum3);
        assert_eq!(fresh, Quadric::zero(5));
    }
}
