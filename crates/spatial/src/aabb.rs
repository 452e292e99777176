//! Axis-aligned bounding boxes.

use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any `include_*` call replaces.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Cube enclosing a sphere.
    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            min: center - Vec3::splat(radius),
            max: center + Vec3::splat(radius),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_aabb(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Half of the size along each axis.
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Surface area, the cost measure of the tree heuristics.
    pub fn surface_area(&self) -> f32 {
        let s = self.size();
        2.0 * (s.x * s.y + s.x * s.z + s.y * s.z)
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// Separating axis test between the segment `a..b` and this box.
    ///
    /// Works in box space: the three box axes and the three cross products of
    /// the segment direction with them are tried as separating axes.
    pub fn intersects_segment(&self, a: Vec3, b: Vec3) -> bool {
        let center = self.center();
        let e = self.extents();
        let a = a - center;
        let b = b - center;

        let mid = (a + b) * 0.5;
        let l = a - mid;
        let ext = l.abs();

        if mid.x.abs() > e.x + ext.x || mid.y.abs() > e.y + ext.y || mid.z.abs() > e.z + ext.z {
            return false;
        }
        if (mid.y * l.z - mid.z * l.y).abs() > e.y * ext.z + e.z * ext.y {
            return false;
        }
        if (mid.x * l.z - mid.z * l.x).abs() > e.x * ext.z + e.z * ext.x {
            return false;
        }
        if (mid.x * l.y - mid.y * l.x).abs() > e.x * ext.y + e.y * ext.x {
            return false;
        }
        true
    }
}
