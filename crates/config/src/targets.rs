//! Termination targets for a decimation run.

use serde::{Deserialize, Serialize};

/// Conditions that end the simplification loop. The first one reached wins;
/// a zero value disables its condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConditions {
    /// Stop once the live face count is at or below this value
    pub face_count: usize,
    /// Stop once the live vertex count is at or below this value
    pub vertex_count: usize,
    /// Stop once more than this many collapses were executed
    pub max_operations: usize,
    /// Stop once the priority of the current candidate exceeds this value
    pub max_error: f32,
    /// Stop once the loop has run longer than this many seconds
    pub max_seconds: f32,
}

impl TargetConditions {
    /// Target only the face count.
    pub fn faces(face_count: usize) -> Self {
        Self {
            face_count,
            ..Default::default()
        }
    }

    /// True when no condition is enabled.
    pub fn is_unbounded(&self) -> bool {
        self.face_count == 0
            && self.vertex_count == 0
            && self.max_operations == 0
            && self.max_error <= 0.0
            && self.max_seconds <= 0.0
    }
}
