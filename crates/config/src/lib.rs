//! Shared configuration for the decimator
//!
//! This crate is the single source of truth for every tunable of a decimation
//! run: the collapse cost model, the termination targets, and the spatial
//! index. All settings are serde-serializable so hosts can load them from JSON.

mod bvh;
mod collapse;
mod mask;
mod targets;

use serde::{Deserialize, Serialize};

pub use bvh::{BvhSettings, DEFAULT_REQUEUE_PERIOD, RequeuePolicy};
pub use collapse::{
    AttributeSetting, CollapseParams, DEFAULT_BOUNDARY_WEIGHT, DEFAULT_QUADRIC_EPSILON,
    DEFAULT_QUALITY_THRESHOLD, DEFAULT_SQR_DISTANCE_THRESHOLD, GroupingPolicy,
    QUALITY_QUADRIC_WEIGHT,
};
pub use mask::{Attribute, AttributeMask};
pub use targets::TargetConditions;

/// Default number of collapses between two progress lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Complete configuration of a decimation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimationConfig {
    /// Cost model and collapse behavior
    pub collapse: CollapseParams,
    /// When to stop
    pub targets: TargetConditions,
    /// Spatial index used by intersection prevention
    pub bvh: BvhSettings,
    /// Collapses between two progress lines, 0 disables them (default: 100)
    pub progress_interval: usize,
}

impl Default for DecimationConfig {
    fn default() -> Self {
        Self {
            collapse: CollapseParams::default(),
            targets: TargetConditions::default(),
            bvh: BvhSettings::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl DecimationConfig {
    /// Create a config that stops at the given face count
    pub fn with_face_target(face_count: usize) -> Self {
        Self {
            targets: TargetConditions::faces(face_count),
            ..Default::default()
        }
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: DecimationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.collapse;
        if c.used_attributes.has(Attribute::Position) {
            return Err(invalid(
                "collapse.used_attributes",
                "position is always part of the quadric and cannot be listed",
            ));
        }
        check_non_negative("collapse.boundary_weight", c.boundary_weight)?;
        check_non_negative("collapse.quadric_epsilon", c.quadric_epsilon)?;
        if !(c.quality_threshold.is_finite() && c.quality_threshold > 0.0) {
            return Err(invalid(
                "collapse.quality_threshold",
                format!("must be positive, got {}", c.quality_threshold),
            ));
        }
        if !(-1.0..=1.0).contains(&c.normal_cosine_threshold) {
            return Err(invalid(
                "collapse.normal_cosine_threshold",
                format!("must be in [-1, 1], got {}", c.normal_cosine_threshold),
            ));
        }
        for (field, setting) in [
            ("collapse.normal_setting", &c.normal_setting),
            ("collapse.uv_setting", &c.uv_setting),
        ] {
            check_non_negative(field, setting.sqr_distance_threshold as f64)?;
            check_non_negative(field, setting.extra_weight as f64)?;
            if let GroupingPolicy::Sampled { cell_size } = setting.grouping {
                if !(cell_size.is_finite() && cell_size > 0.0) {
                    return Err(invalid(field, format!("cell size must be positive, got {cell_size}")));
                }
            }
        }

        if self.bvh.leaf_object_max == 0 {
            return Err(invalid("bvh.leaf_object_max", "must be at least 1"));
        }
        match self.bvh.requeue {
            RequeuePolicy::Periodic { period: 0 } => {
                return Err(invalid("bvh.requeue", "period must be at least 1"));
            }
            RequeuePolicy::Random { probability, .. } if !(0.0..=1.0).contains(&probability) => {
                return Err(invalid(
                    "bvh.requeue",
                    format!("probability must be in [0, 1], got {probability}"),
                ));
            }
            _ => {}
        }

        check_non_negative("targets.max_error", self.targets.max_error as f64)?;
        check_non_negative("targets.max_seconds", self.targets.max_seconds as f64)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and non-negative, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecimationConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.targets.is_unbounded());
        assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert_eq!(config.bvh.leaf_object_max, 1);
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "collapse": { "used_attributes": ["normal"], "normal_check": true },
            "targets": { "face_count": 500 },
            "bvh": { "requeue": { "kind": "random", "probability": 0.02, "seed": 7 } }
        }"#;
        let config = DecimationConfig::from_json_str(json).unwrap();
        assert_eq!(config.collapse.used_attributes, AttributeMask::NORMAL);
        assert!(config.collapse.normal_check);
        assert_eq!(config.collapse.boundary_weight, DEFAULT_BOUNDARY_WEIGHT);
        assert_eq!(config.targets.face_count, 500);
        assert_eq!(
            config.bvh.requeue,
            RequeuePolicy::Random {
                probability: 0.02,
                seed: Some(7)
            }
        );
    }

    #[test]
    fn test_rejects_position_in_used_attributes() {
        let json = r#"{ "collapse": { "used_attributes": ["position", "uv0"] } }"#;
        let err = DecimationConfig::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "collapse.used_attributes",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = DecimationConfig::default();
        config.bvh.leaf_object_max = 0;
        assert!(config.validate().is_err());

        let mut config = DecimationConfig::default();
        config.collapse.quality_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = DecimationConfig::default();
        config.collapse.uv_setting.grouping = GroupingPolicy::Sampled { cell_size: -1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = DecimationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_json_round_trip_keeps_targets() {
        let config = DecimationConfig::with_face_target(42);
        let json = config.to_json_string().unwrap();
        let back = DecimationConfig::from_json_str(&json).unwrap();
        assert_eq!(back.targets, config.targets);
        assert_eq!(back.collapse, config.collapse);
    }
}
