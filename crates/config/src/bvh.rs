//! Settings of the dynamic bounding volume hierarchy.

use serde::{Deserialize, Serialize};

/// Default number of optimization visits between two parent re-queues (2%)
pub const DEFAULT_REQUEUE_PERIOD: u32 = 50;

/// Whether the rotation pass re-queues a node's parent after it decided not to rotate.
///
/// Re-queuing spreads the optimization work over several passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequeuePolicy {
    /// Never re-queue.
    Never,
    /// Re-queue on every `period`-th decision. Reproducible.
    Periodic { period: u32 },
    /// Re-queue with the given probability. Seeded from the OS unless `seed` is set.
    Random {
        probability: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for RequeuePolicy {
    fn default() -> Self {
        RequeuePolicy::Periodic {
            period: DEFAULT_REQUEUE_PERIOD,
        }
    }
}

/// BVH configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Maximum objects per leaf before splitting (default: 1, required by optimize)
    pub leaf_object_max: usize,
    /// Parent re-queue policy of the rotation pass (default: every 50th decision)
    pub requeue: RequeuePolicy,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            leaf_object_max: 1,
            requeue: RequeuePolicy::default(),
        }
    }
}
