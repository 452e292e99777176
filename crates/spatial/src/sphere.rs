//! Bounding spheres.

use glam::Vec3;

use crate::aabb::Aabb;

/// A sphere bounding one object of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Minimum bounding sphere of a triangle.
    ///
    /// Right and obtuse triangles are bounded by the sphere on their longest
    /// edge; acute ones by their circumsphere.
    pub fn from_triangle(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        // label so that `a` is opposite the longest edge `b..c`
        let mut len_a = (p1 - p2).length();
        let mut len_b = (p2 - p0).length();
        let mut len_c = (p0 - p1).length();
        let (mut a, mut b, mut c) = (p0, p1, p2);
        if len_b < len_c {
            std::mem::swap(&mut len_b, &mut len_c);
            std::mem::swap(&mut b, &mut c);
        }
        if len_a < len_b {
            std::mem::swap(&mut len_a, &mut len_b);
            std::mem::swap(&mut a, &mut b);
        }

        if len_b * len_b + len_c * len_c <= len_a * len_a {
            return Sphere::new((b + c) * 0.5, len_a * 0.5);
        }

        let alpha = a - c;
        let beta = b - c;
        let axb = alpha.cross(beta);
        let denom = 2.0 * axb.length_squared();
        if denom == 0.0 {
            return Sphere::new((b + c) * 0.5, len_a * 0.5);
        }
        let center =
            c + (beta * alpha.length_squared() - alpha * beta.length_squared()).cross(axb) / denom;
        let radius = center
            .distance(a)
            .max(center.distance(b))
            .max(center.distance(c));
        Sphere::new(center, radius)
    }

    /// Cube enclosing the sphere.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_sphere(self.center, self.radius)
    }

    pub fn contains_point(&self, point: Vec3, tolerance: f32) -> bool {
        self.center.distance(point) <= self.radius + tolerance
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_equilateral_uses_circumsphere() {
        let p0 = Vec3::new(1.0, 0.0, 0.0);
        let p1 = Vec3::new(-0.5, 3f32.sqrt() / 2.0, 0.0);
        let p2 = Vec3::new(-0.5, -(3f32.sqrt()) / 2.0, 0.0);
        let s = Sphere::from_triangle(p0, p1, p2);
        assert_relative_eq!(s.center.length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(s.radius, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_obtuse_uses_longest_edge() {
        let p0 = Vec3::new(0.0, 0.0, 0.0);
        let p1 = Vec3::new(4.0, 0.0, 0.0);
        let p2 = Vec3::new(2.0, 0.5, 0.0);
        let s = Sphere::from_triangle(p0, p1, p2);
        assert_relative_eq!(s.center.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(s.center.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(s.radius, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_contains_vertices_in_any_order() {
        let pts = [
            Vec3::new(0.3, -1.2, 2.0),
            Vec3::new(1.7, 0.4, -0.5),
            Vec3::new(-0.9, 0.8, 0.1),
        ];
        for (i, j, k) in [(0, 1, 2), (1, 2, 0), (2, 0, 1), (0, 2, 1), (2, 1, 0), (1, 0, 2)] {
            let s = Sphere::from_triangle(pts[i], pts[j], pts[k]);
            for p in pts {
                assert!(s.contains_point(p, 1e-4));
            }
        }
    }

    #[test]
    fn test_degenerate_triangle() {
        let s = Sphere::from_triangle(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(s.radius, 0.0);
        assert_eq!(s.center, Vec3::ZERO);
    }
}
