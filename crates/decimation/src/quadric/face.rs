//! Quadrics contributed by a single face.

use std::array;

use decimator_config::{AttributeMask, CollapseParams, QUALITY_QUADRIC_WEIGHT};
use nalgebra::DVector;
use topology::{FaceId, Mesh};

use super::{Quadric, extended_point};

/// The quadrics one face adds to its corners.
#[derive(Debug, Clone)]
pub struct FaceQuadrics {
    /// Plane quadric in position + attribute space, with virtual boundary planes
    pub full: Quadric,
    /// Position-only plane quadric, absent for zero-area faces
    pub geometry: Option<Quadric>,
}

/// Compute the quadrics of `face` over the attributes in `mask`.
///
/// Border edges (every edge when `quality_quadric` is set) add a virtual
/// plane standing on the edge, perpendicular to the face, so collapses that
/// drag the edge sideways are penalized.
///
/// Zero-area faces carry no positional information. They still contribute in
/// attribute space unless their three attribute vectors are colinear in length.
pub fn face_quadrics(mesh: &Mesh, face: FaceId, mask: AttributeMask, params: &CollapseParams) -> FaceQuadrics {
    let f = mesh.face(face);
    let positions = mesh.face_positions(face);
    let attributes: [Vec<f32>; 3] = array::from_fn(|slot| mesh.corner_attributes(face, slot, mask));
    let corners: [DVector<f64>; 3] = array::from_fn(|i| extended_point(positions[i], &attributes[i]));

    if mesh.face_quality(face) > 0.0 {
        let geo = positions.map(|p| extended_point(p, &[]));
        let geometry = Quadric::from_corners(&geo[0], &geo[1], &geo[2]);
        let mut full = Quadric::from_corners(&corners[0], &corners[1], &corners[2]);

        for edge in 0..3 {
            let border = f.border[edge];
            if !(border || params.quality_quadric) {
                continue;
            }
            let next = (edge + 1) % 3;
            let (p0, p1) = (positions[edge], positions[next]);
            let apex_position = (p0 + p1) * 0.5 + f.face_normal * p0.distance(p1);
            let apex_attributes: Vec<f32> = attributes[edge]
                .iter()
                .zip(&attributes[next])
                .map(|(a, b)| (a + b) * 0.5)
                .collect();
            let apex = extended_point(apex_position, &apex_attributes);

            let mut plane = Quadric::from_corners(&corners[edge], &corners[next], &apex);
            plane.scale(if border { params.boundary_weight } else { QUALITY_QUADRIC_WEIGHT });
            full.add(&plane);
        }

        return FaceQuadrics {
            full,
            geometry: Some(geometry),
        };
    }

    let length = |a: &[f32], b: &[f32]| -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| {
                let d = (*x - *y) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    };
    let a = length(&attributes[0], &attributes[1]);
    let b = length(&attributes[1], &attributes[2]);
    let c = length(&attributes[2], &attributes[0]);
    let colinear = a + b == c || a + c == b || b + c == a;

    let full = if colinear {
        Quadric::zero(3 + mask.component_count())
    } else {
        Quadric::from_corners(&corners[0], &corners[1], &corners[2])
    };
    FaceQuadrics { full, geometry: None }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use topology::{MeshBuffers, shapes};

    use super::*;

    fn bordered_grid() -> Mesh {
        let mut mesh = Mesh::from_buffers(&shapes::grid(1)).unwrap();
        mesh.build_face_border();
        mesh
    }

    #[test]
    fn test_geometry_quadric_vanishes_on_face_plane() {
        let mesh = bordered_grid();
        let params = CollapseParams::default();
        let quadrics = face_quadrics(&mesh, FaceId(0), AttributeMask::UV0, &params);

        let geometry = quadrics.geometry.unwrap();
        assert_eq!(geometry.size(), 3);
        for p in mesh.face_positions(FaceId(0)) {
            assert_relative_eq!(geometry.apply(&extended_point(p, &[])), 0.0, epsilon = 1e-9);
        }
        let above = extended_point(glam::Vec3::new(0.5, 0.2, 0.5), &[]);
        assert_relative_eq!(geometry.apply(&above), 0.25, epsilon = 1e-9);
        assert_eq!(quadrics.full.size(), 5);
    }

    #[test]
    fn test_border_planes_penalize_sliding_off_the_edge() {
        let mesh = bordered_grid();
        let face = FaceId(0);
        assert!(mesh.is_border_face(face));

        let mut params = CollapseParams::default();
        params.boundary_weight = 0.0;
        let free = face_quadrics(&mesh, face, AttributeMask::NONE, &params).full;
        params.boundary_weight = 1.0;
        let held = face_quadrics(&mesh, face, AttributeMask::NONE, &params).full;

        // In the face plane but outside the bottom border edge.
        let outside = extended_point(glam::Vec3::new(0.5, -0.5, 0.0), &[]);
        assert_relative_eq!(free.apply(&outside), 0.0, epsilon = 1e-9);
        assert!(held.apply(&outside) > 0.2);
    }

    #[test]
    fn test_quality_quadric_adds_planes_on_inner_edges() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        let face = FaceId(0);
        let mut params = CollapseParams::default();
        let plain = face_quadrics(&mesh, face, AttributeMask::NONE, &params).full;
        params.quality_quadric = true;
        let weighted = face_quadrics(&mesh, face, AttributeMask::NONE, &params).full;

        let centroid = mesh.face_positions(face).iter().sum::<glam::Vec3>() / 3.0;
        let x = extended_point(centroid, &[]);
        assert_relative_eq!(plain.apply(&x), 0.0, epsilon = 1e-9);
        assert!(weighted.apply(&x) > 0.0);
    }

    #[test]
    fn test_degenerate_face_with_uniform_attributes_is_zero() {
        let buffers = MeshBuffers::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]], vec![0, 1, 2]);
        let mesh = Mesh::from_buffers(&buffers).unwrap();
        let quadrics = face_quadrics(&mesh, FaceId(0), AttributeMask::NONE, &CollapseParams::default());
        assert!(quadrics.geometry.is_none());
        assert_eq!(quadrics.full, Quadric::zero(3));
    }

    #[test]
    fn test_degenerate_face_with_spread_attributes_keeps_attribute_plane() {
        let buffers = MeshBuffers {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            normals: None,
            uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            indices: vec![0, 1, 2],
        };
        let mesh = Mesh::from_buffers(&buffers).unwrap();
        let quadrics = face_quadrics(&mesh, FaceId(0), AttributeMask::UV0, &CollapseParams::default());
        assert!(quadrics.geometry.is_none());
        assert_eq!(quadrics.full.size(), 5);
        assert!(quadrics.full.is_valid());
        assert_ne!(quadrics.full, Quadric::zero(5));
    }
}
