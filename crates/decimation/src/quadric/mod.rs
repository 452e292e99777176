//! Quadric error metric in position + attribute space.
//!
//! A quadric measures the summed squared distance of a point `x` (position
//! followed by `k` attribute components) to a set of planes:
//! `Q(x) = xᵀ A x + 2 b·x + c`. Quadrics of faces sharing a vertex add up, so
//! the error of moving that vertex is one evaluation.

pub mod face;
pub mod helper;

use nalgebra::{DMatrix, DVector};

pub use face::{FaceQuadrics, face_quadrics};
pub use helper::{Bucket, QuadricHelper};

/// Solutions of systems whose condition estimate exceeds this are treated as
/// singular. Planar neighborhoods give rank-deficient matrices whose rounded
/// inverse would place vertices arbitrarily far along the plane.
const MAX_CONDITION: f64 = 1e12;

/// Corner orders tried by [`Quadric::from_corners`], in the order they are tried.
const PERMUTATIONS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 2, 0], [1, 0, 2], [2, 0, 1], [2, 1, 0]];

#[derive(Debug, Clone, PartialEq)]
pub struct Quadric {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub c: f64,
}

impl Quadric {
    /// An unset quadric of dimension `n`. Invalid until assigned.
    pub fn new(n: usize) -> Self {
        Self {
            a: DMatrix::zeros(n, n),
            b: DVector::zeros(n),
            c: -1.0,
        }
    }

    /// The zero quadric of dimension `n`: no error anywhere.
    pub fn zero(n: usize) -> Self {
        Self {
            a: DMatrix::zeros(n, n),
            b: DVector::zeros(n),
            c: 0.0,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.b.len()
    }

    /// A quadric is valid once its constant term is non-negative. NaN is invalid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.c >= 0.0
    }

    pub fn add(&mut self, other: &Quadric) {
        self.a += &other.a;
        self.b += &other.b;
        self.c += other.c;
    }

    pub fn scale(&mut self, factor: f64) {
        self.a *= factor;
        self.b *= factor;
        self.c *= factor;
    }

    /// Evaluate the error at `x`.
    pub fn apply(&self, x: &DVector<f64>) -> f64 {
        x.dot(&(&self.a * x)) + 2.0 * self.b.dot(x) + self.c
    }

    /// Add the positional block of this quadric into the 3-dimensional `q3`.
    pub fn add_to_geometry(&self, q3: &mut Quadric) {
        for i in 0..3 {
            for j in 0..3 {
                q3.a[(i, j)] += self.a[(i, j)];
            }
            q3.b[i] += self.b[i];
        }
        q3.c += self.c;
    }

    /// Embed the positional quadric `q3` and pull the attribute components
    /// towards `attributes`.
    ///
    /// Used for faces whose corner at a vertex carries different attributes:
    /// they constrain the position of the vertex, not its attribute values.
    pub fn sum3(&mut self, q3: &Quadric, attributes: &[f32]) {
        if q3.size() != 3 {
            return;
        }
        for i in 0..3 {
            for j in 0..3 {
                self.a[(i, j)] += q3.a[(i, j)];
            }
            self.b[i] += q3.b[i];
        }
        let n = self.size();
        for (offset, value) in attributes.iter().enumerate().take(n.saturating_sub(3)) {
            let i = offset + 3;
            let value = *value as f64;
            self.a[(i, i)] += 1.0;
            self.b[i] -= value;
            self.c += value * value;
        }
        self.c += q3.c;
    }

    /// Quadric of the plane through three points of the same dimension.
    ///
    /// Tries every corner order until one gives a non-negative constant term.
    /// Rounding can leave all of them slightly negative; then the order with
    /// the least residual is used with the residual cleared. Coincident or
    /// colinear corners end up as the zero quadric.
    pub fn from_corners(p: &DVector<f64>, q: &DVector<f64>, r: &DVector<f64>) -> Quadric {
        let corners = [p, q, r];
        let mut best: Option<(f64, Quadric)> = None;
        for perm in PERMUTATIONS {
            let quadric = Self::from_basis(corners[perm[0]], corners[perm[1]], corners[perm[2]]);
            if quadric.is_valid() {
                return quadric;
            }
            let residual = -quadric.c;
            if residual.is_finite() && best.as_ref().is_none_or(|(least, _)| residual < *least) {
                best = Some((residual, quadric));
            }
        }

        match best {
            Some((_, mut quadric)) if quadric.is_finite() => {
                quadric.c = 0.0;
                quadric
            }
            _ => Quadric::zero(p.len()),
        }
    }

    /// Gram-Schmidt construction with `p` as origin.
    fn from_basis(p: &DVector<f64>, q: &DVector<f64>, r: &DVector<f64>) -> Quadric {
        let n = p.len();
        let e1 = normalized(q - p);
        let diff = r - p;
        let e2 = normalized(&diff - &e1 * e1.dot(&diff));

        let a = DMatrix::identity(n, n) - &e1 * e1.transpose() - &e2 * e2.transpose();
        let pe1 = p.dot(&e1);
        let pe2 = p.dot(&e2);
        let b = &e1 * pe1 + &e2 * pe2 - p;
        let c = p.dot(p) - pe1 * pe1 - pe2 * pe2;
        Quadric { a, b, c }
    }

    fn is_finite(&self) -> bool {
        self.c.is_finite() && self.a.iter().all(|v| v.is_finite()) && self.b.iter().all(|v| v.is_finite())
    }

    /// Point of least error, `x = -A⁻¹ b`. `None` when `A` is singular.
    pub fn minimum(&self) -> Option<DVector<f64>> {
        solve(&self.a, &self.b)
    }

    /// Point of least error with the position held at `geo`.
    ///
    /// Only the attribute block is solved for:
    /// `x' = -M⁻¹ (b' + A[3.., ..3] · geo)` with `M = A[3.., 3..]`.
    pub fn minimum_with_geo_constraints(&self, geo: &[f64; 3]) -> Option<DVector<f64>> {
        let n = self.size();
        let mut x = DVector::zeros(n);
        x.as_mut_slice()[..3].copy_from_slice(geo);
        if n <= 3 {
            return Some(x);
        }

        let k = n - 3;
        let m = self.a.view((3, 3), (k, k)).into_owned();
        let mut r = self.b.rows(3, k).into_owned();
        for i in 0..k {
            for (j, g) in geo.iter().enumerate() {
                r[i] += self.a[(3 + i, j)] * g;
            }
        }
        let attributes = solve(&m, &r)?;
        x.as_mut_slice()[3..].copy_from_slice(attributes.as_slice());
        Some(x)
    }
}

/// `-m⁻¹ r`, rejecting singular and badly conditioned `m`.
fn solve(m: &DMatrix<f64>, r: &DVector<f64>) -> Option<DVector<f64>> {
    let inverse = m.clone().try_inverse()?;
    let condition = m.norm() * inverse.norm();
    if !condition.is_finite() || condition > MAX_CONDITION {
        return None;
    }
    let x = -(inverse * r);
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Unit vector along `v`. A zero vector yields NaN components, which make the
/// resulting quadric invalid.
fn normalized(v: DVector<f64>) -> DVector<f64> {
    let norm = v.norm();
    v / norm
}

/// Extended-space point: position followed by attribute components.
pub fn extended_point(position: glam::Vec3, attributes: &[f32]) -> DVector<f64> {
    DVector::from_iterator(
        3 + attributes.len(),
        position
            .to_array()
            .into_iter()
            .chain(attributes.iter().copied())
            .map(f64::from),
    )
}
