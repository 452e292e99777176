//! Quadric edge-collapse decimation of triangle meshes
//!
//! This crate drives the simplification loop over a [`topology::Mesh`]:
//! - [`quadric`] - Error quadrics over position and attributes, per-vertex buckets
//! - [`collapse`] - Edge collapse candidates: pricing, link condition, execution
//! - [`queue`] - Min-priority queue of candidates
//! - [`face_bvh`] - Face hierarchy used to reject self-intersecting collapses
//! - [`geometry`] - Triangle predicates
//! - [`decimator`] - The loop, its termination targets and progress reporting
//!
//! The quickest way in is [`decimate`], which takes indexed buffers and
//! returns simplified ones.

pub mod collapse;
pub mod decimator;
pub mod face_bvh;
pub mod geometry;
pub mod quadric;
pub mod queue;

pub use collapse::{EdgeCollapse, SharedData};
pub use decimator::{
    DecimationReport, DecimationStatus, Decimator, DecimatorState, StepOutcome, TerminationReason, decimate,
};
pub use face_bvh::{FaceAdapter, FaceBvh};
pub use quadric::{Quadric, QuadricHelper};
pub use queue::{BinaryHeapQueue, PriorityQueue};

/// Errors raised while decimating
#[derive(Debug, thiserror::Error)]
pub enum DecimateError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] decimator_config::ConfigError),
    #[error("Invalid mesh: {0}")]
    Topology(#[from] topology::TopologyError),
    #[error("Face hierarchy error: {0}")]
    Bvh(#[from] spatial::BvhError),
}
