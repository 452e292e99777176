//! Edge-collapse parameters.
//!
//! These drive the quadric cost model, the feasibility checks and the
//! attribute handling of every collapse.

use serde::{Deserialize, Serialize};

use crate::mask::{Attribute, AttributeMask};

/// Default weight of the virtual plane added along border edges
pub const DEFAULT_BOUNDARY_WEIGHT: f64 = 0.5;

/// Weight of the virtual planes added along every edge in quality-quadric mode
pub const QUALITY_QUADRIC_WEIGHT: f64 = 0.05;

/// Default floor for quadric errors
pub const DEFAULT_QUADRIC_EPSILON: f64 = 1e-15;

/// Default triangle quality above which no penalty is applied
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.1;

/// Default squared distance under which two sampled attribute values are the same
pub const DEFAULT_SQR_DISTANCE_THRESHOLD: f32 = 0.003;

/// How attribute values are grouped when counting distinct values around an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupingPolicy {
    /// Values are grouped by exact equality.
    Exact,
    /// Values are bucketed on a grid of `cell_size`, then merged when they lie
    /// within the squared distance threshold of a value already in the bucket.
    Sampled { cell_size: f32 },
}

impl Default for GroupingPolicy {
    fn default() -> Self {
        GroupingPolicy::Exact
    }
}

/// Per-attribute handling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSetting {
    /// Extra priority weight per additional distinct value around an edge (default: 0)
    pub extra_weight: f32,
    /// Borrow the value of the nearest shared face when the merge point falls
    /// outside the face being interpolated (default: true)
    pub interpolate_with_adjacent_face: bool,
    /// Clamp interpolation to the closest point on the face when the merge point
    /// falls outside it (default: true)
    pub interpolate_clamped: bool,
    /// Grouping used to count distinct values (default: exact)
    pub grouping: GroupingPolicy,
    /// Max squared distance for two values to count as the same (default: 0.003)
    pub sqr_distance_threshold: f32,
}

impl Default for AttributeSetting {
    fn default() -> Self {
        Self {
            extra_weight: 0.0,
            interpolate_with_adjacent_face: true,
            interpolate_clamped: true,
            grouping: GroupingPolicy::Exact,
            sqr_distance_threshold: DEFAULT_SQR_DISTANCE_THRESHOLD,
        }
    }
}

/// Parameters of the edge-collapse cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseParams {
    /// Attributes that extend the quadric beyond position (default: uv0)
    pub used_attributes: AttributeMask,
    /// Weight of the virtual plane quadric on border edges (default: 0.5)
    pub boundary_weight: f64,
    /// Penalize collapses that tilt a retained triangle's normal (default: false)
    pub normal_check: bool,
    /// Minimum cosine between old and new face normals (default: cos(pi/2))
    pub normal_cosine_threshold: f32,
    /// Solve for the optimal merge position (default: true)
    pub optimal_placement: bool,
    /// Samples along the edge when no optimal position exists (default: 1)
    pub optimal_sample_count: usize,
    /// Freeze vertices on border edges (default: false)
    pub preserve_boundary: bool,
    /// Lower bound of a quadric error (default: 1e-15)
    pub quadric_epsilon: f64,
    /// Triangle quality at and above which no penalty applies (default: 0.1)
    pub quality_threshold: f64,
    /// Add low-weight virtual planes on every edge (default: false)
    pub quality_quadric: bool,
    /// Reject collapses that would make a triangle cross another one (default: false)
    pub prevent_intersection: bool,
    /// Settings for the normal channel
    pub normal_setting: AttributeSetting,
    /// Settings for the uv0 channel
    pub uv_setting: AttributeSetting,
}

impl Default for CollapseParams {
    fn default() -> Self {
        Self {
            used_attributes: AttributeMask::UV0,
            boundary_weight: DEFAULT_BOUNDARY_WEIGHT,
            normal_check: false,
            normal_cosine_threshold: std::f32::consts::FRAC_PI_2.cos(),
            optimal_placement: true,
            optimal_sample_count: 1,
            preserve_boundary: false,
            quadric_epsilon: DEFAULT_QUADRIC_EPSILON,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            quality_quadric: false,
            prevent_intersection: false,
            normal_setting: AttributeSetting::default(),
            uv_setting: AttributeSetting::default(),
        }
    }
}

impl CollapseParams {
    /// Settings for an attribute channel. Position has no settings of its own.
    pub fn setting(&self, attribute: Attribute) -> Option<&AttributeSetting> {
        match attribute {
            Attribute::Normal => Some(&self.normal_setting),
            Attribute::Uv0 => Some(&self.uv_setting),
            Attribute::Position => None,
        }
    }

    /// Copy of these parameters fitted to a mesh carrying `available` attributes:
    /// unavailable channels are dropped from the quadric and the sample count is
    /// raised to at least one.
    pub fn normalized_for(&self, available: AttributeMask) -> CollapseParams {
        let mut params = self.clone();
        params.used_attributes = (params.used_attributes & available) - AttributeMask::POSITION;
        params.optimal_sample_count = params.optimal_sample_count.max(1);
        params
    }
}
