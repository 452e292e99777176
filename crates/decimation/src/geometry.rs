//! Triangle predicates used by collapse placement and intersection checks.

use glam::Vec3;

pub use topology::triangle_quality;

/// Result of a closest-point query against a triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub point: Vec3,
    /// Weights of the triangle corners reproducing `point`
    pub barycentric: Vec3,
    pub sqr_distance: f32,
}

/// Barycentric coordinates of `p` projected onto the plane of `(a, b, c)`.
///
/// A coordinate is negative when the projection falls outside the opposite
/// edge. Degenerate triangles give non-finite coordinates.
pub fn barycentric_coords(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Vec3::new(1.0 - v - w, v, w)
}

/// Closest point of triangle `(a, b, c)` to `p`.
///
/// Classifies `p` against the Voronoi regions of the corners and edges
/// before projecting onto the face. Degenerate triangles are treated as
/// their three edges.
pub fn point_to_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> ClosestPoint {
    let ab = b - a;
    let ac = c - a;
    let area = ab.cross(ac).length_squared();
    if area <= f32::EPSILON * ab.length_squared() * ac.length_squared() || area == 0.0 {
        return closest_on_edges(p, a, b, c);
    }

    let at = |barycentric: Vec3| {
        let point = a * barycentric.x + b * barycentric.y + c * barycentric.z;
        ClosestPoint {
            point,
            barycentric,
            sqr_distance: point.distance_squared(p),
        }
    };

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return at(Vec3::X);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return at(Vec3::Y);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return at(Vec3::new(1.0 - v, v, 0.0));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return at(Vec3::Z);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return at(Vec3::new(1.0 - w, 0.0, w));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return at(Vec3::new(0.0, 1.0 - w, w));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    at(Vec3::new(1.0 - v - w, v, w))
}

fn closest_on_edges(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> ClosestPoint {
    let corners = [a, b, c];
    let mut best: Option<ClosestPoint> = None;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (start, end) = (corners[i], corners[j]);
        let dir = end - start;
        let len = dir.length_squared();
        let t = if len > 0.0 {
            ((p - start).dot(dir) / len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let point = start + dir * t;
        let mut barycentric = Vec3::ZERO;
        barycentric[i] = 1.0 - t;
        barycentric[j] = t;
        let candidate = ClosestPoint {
            point,
            barycentric,
            sqr_distance: point.distance_squared(p),
        };
        if best.is_none_or(|b| candidate.sqr_distance < b.sqr_distance) {
            best = Some(candidate);
        }
    }
    best.unwrap_or(ClosestPoint {
        point: a,
        barycentric: Vec3::X,
        sqr_distance: a.distance_squared(p),
    })
}

#[inline]
fn orientation(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> i8 {
    let volume = (b - a).dot((c - a).cross(d - a));
    if volume > 0.0 {
        1
    } else if volume < 0.0 {
        -1
    } else {
        0
    }
}

/// Intersection of segment `q1 q2` with triangle `(p1, p2, p3)`.
///
/// The endpoints must lie on different sides of the triangle's plane and the
/// segment must pass inside all three edges, judged by the signs of signed
/// tetrahedron volumes. Returns the crossing point, which is the endpoint
/// itself, bit for bit, when that endpoint lies on the plane. Coplanar
/// segments never intersect.
pub fn segment_intersects_triangle(q1: Vec3, q2: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Option<Vec3> {
    let s1 = orientation(q1, p1, p2, p3);
    let s2 = orientation(q2, p1, p2, p3);
    if s1 == s2 {
        return None;
    }

    let s3 = orientation(q1, q2, p1, p2);
    let s4 = orientation(q1, q2, p2, p3);
    let s5 = orientation(q1, q2, p3, p1);
    if s3 != s4 || s4 != s5 {
        return None;
    }

    if s2 == 0 {
        return Some(q2);
    }
    if s1 == 0 {
        return Some(q1);
    }

    let normal = (p2 - p1).cross(p3 - p1);
    let dir = q2 - q1;
    let denom = normal.dot(dir);
    if denom == 0.0 {
        return None;
    }
    let t = normal.dot(p1 - q1) / denom;
    Some(q1 + dir * t)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const B: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    const C: Vec3 = Vec3::new(0.0, 1.0, 0.0);

    #[test]
    fn test_barycentric_of_corners_and_centroid() {
        assert_relative_eq!(barycentric_coords(A, A, B, C).x, 1.0);
        assert_relative_eq!(barycentric_coords(B, A, B, C).y, 1.0);
        assert_relative_eq!(barycentric_coords(C, A, B, C).z, 1.0);

        let centroid = (A + B + C) / 3.0;
        let coords = barycentric_coords(centroid, A, B, C);
        assert_relative_eq!(coords.x, 1.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(coords.y, 1.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(coords.z, 1.0 / 3.0, epsilon = 1e-6);

        let outside = barycentric_coords(Vec3::new(-1.0, 0.5, 0.0), A, B, C);
        assert!(outside.min_element() < 0.0);
    }

    #[test]
    fn test_point_above_face_projects() {
        let hit = point_to_triangle(Vec3::new(0.25, 0.25, 2.0), A, B, C);
        assert_relative_eq!(hit.point.x, 0.25, epsilon = 1e-6);
        assert_relative_eq!(hit.point.y, 0.25, epsilon = 1e-6);
        assert_relative_eq!(hit.point.z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(hit.sqr_distance, 4.0, epsilon = 1e-5);
        assert_relative_eq!(hit.barycentric.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_point_beyond_corner_and_edge() {
        let corner = point_to_triangle(Vec3::new(-1.0, -1.0, 0.0), A, B, C);
        assert_eq!(corner.point, A);
        assert_eq!(corner.barycentric, Vec3::X);
        assert_relative_eq!(corner.sqr_distance, 2.0);

        let edge = point_to_triangle(Vec3::new(0.5, -2.0, 0.0), A, B, C);
        assert_relative_eq!(edge.point.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(edge.point.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(edge.barycentric.y, 0.5, epsilon = 1e-6);
        assert_eq!(edge.barycentric.z, 0.0);

        let hypotenuse = point_to_triangle(Vec3::new(1.0, 1.0, 0.0), A, B, C);
        assert_relative_eq!(hypotenuse.point.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(hypotenuse.point.y, 0.5, epsilon = 1e-6);
        assert_eq!(hypotenuse.barycentric.x, 0.0);
    }

    #[test]
    fn test_degenerate_triangle_uses_edges() {
        let hit = point_to_triangle(
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        assert!(hit.barycentric.is_finite());
        assert_relative_eq!(hit.point.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(hit.sqr_distance, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_segment_crossing_triangle() {
        let hit = segment_intersects_triangle(Vec3::new(0.2, 0.2, -1.0), Vec3::new(0.2, 0.2, 1.0), A, B, C).unwrap();
        assert_relative_eq!(hit.x, 0.2, epsilon = 1e-6);
        assert_relative_eq!(hit.y, 0.2, epsilon = 1e-6);
        assert_relative_eq!(hit.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_segment_missing_triangle() {
        // Passes beside the hypotenuse.
        assert!(segment_intersects_triangle(Vec3::new(0.8, 0.8, -1.0), Vec3::new(0.8, 0.8, 1.0), A, B, C).is_none());
        // Stops short of the plane.
        assert!(segment_intersects_triangle(Vec3::new(0.2, 0.2, 1.0), Vec3::new(0.2, 0.2, 0.5), A, B, C).is_none());
        // Lies in the plane.
        assert!(segment_intersects_triangle(Vec3::new(-1.0, 0.2, 0.0), Vec3::new(2.0, 0.2, 0.0), A, B, C).is_none());
    }

    #[test]
    fn test_segment_ending_on_triangle_returns_endpoint() {
        let end = Vec3::new(0.25, 0.25, 0.0);
        let hit = segment_intersects_triangle(Vec3::new(0.25, 0.25, 1.0), end, A, B, C).unwrap();
        assert_eq!(hit, end);
    }

    #[test]
    fn test_segment_ending_on_corner_returns_exact_corner() {
        let (p1, p2, p3) = (Vec3::new(0.3, 0.7, 0.1), Vec3::new(1.1, 0.2, 0.3), Vec3::new(0.6, 1.3, 0.9));
        let start = Vec3::new(0.61, 0.73, -0.37);
        for corner in [p1, p2, p3] {
            if let Some(hit) = segment_intersects_triangle(start, corner, p1, p2, p3) {
                assert_eq!(hit, corner);
            }
            if let Some(hit) = segment_intersects_triangle(corner, start, p1, p2, p3) {
                assert_eq!(hit, corner);
            }
        }
    }
}
