//! Dynamic bounding volume hierarchy.
//!
//! A binary tree of axis-aligned boxes over objects bounded by spheres.
//! The tree is built top-down and then mutated in place:
//!
//! - **Insertion** descends by surface-area cost and may push two siblings
//!   down under a new node when that is notably cheaper.
//! - **Removal** collapses an emptied leaf into its parent.
//! - **Updates** refit the object's leaf and queue the leaf's parent.
//! - **Optimization** sweeps queued nodes deepest-first and applies local
//!   tree rotations that shrink the children's summed surface area.
//!
//! Nodes live in an arena addressed by [`NodeId`]; freed slots are reused.
//! Objects are reached through an [`ObjectAdapter`], which keeps the tree
//! independent of what it indexes.

mod aabb;
mod adapter;
mod node;
mod query;
mod rotation;
mod sphere;
mod tree;
mod validation;

use std::collections::BTreeSet;

use decimator_config::{BvhSettings, RequeuePolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use aabb::Aabb;
pub use adapter::{HashAdapter, ObjectAdapter};
pub use node::{BvhNode, NodeId};
pub use rotation::Rotation;
pub use sphere::Sphere;

/// Merge-and-pushdown is only taken when it costs less than this fraction of
/// the cheaper descent.
pub const MERGE_DISCOUNT: f32 = 0.3;

/// Minimum relative surface-area gain for a rotation to be applied.
pub const ROTATION_THRESHOLD: f32 = 0.3;

/// Errors raised by hierarchy operations. All of them are broken
/// preconditions; the operation that hit one is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum BvhError {
    #[error("Cannot build a BVH node from an empty object list")]
    EmptyNode,
    #[error("BVH leaf {0:?} has objects and child links")]
    LeafWithChildren(NodeId),
    #[error("Bad intermediate node {0:?}: missing child link")]
    BadIntermediateNode(NodeId),
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("Leaf {0:?} has no objects to fit")]
    EmptyLeaf(NodeId),
    #[error("Node {0:?} is not a leaf")]
    NotALeaf(NodeId),
    #[error("Object is not mapped to any leaf")]
    UnmappedObject,
    #[error("Object has no bounding sphere")]
    MissingSphere,
    #[error("Optimize requires leaf_object_max = 1, found {0}")]
    OptimizeRequiresSingleObjectLeaves(usize),
    #[error("BVH invariant violated: {0}")]
    Invariant(String),
}

/// Decides whether a node that kept its shape re-queues its parent.
#[derive(Debug)]
enum RequeueState {
    Never,
    Periodic { period: u32, counter: u32 },
    Random { probability: f64, rng: StdRng },
}

impl RequeueState {
    fn from_policy(policy: RequeuePolicy) -> Self {
        match policy {
            RequeuePolicy::Never => RequeueState::Never,
            RequeuePolicy::Periodic { period } => RequeueState::Periodic {
                period: period.max(1),
                counter: 0,
            },
            RequeuePolicy::Random { probability, seed } => RequeueState::Random {
                probability: probability.clamp(0.0, 1.0),
                rng: match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                },
            },
        }
    }

    fn should_requeue(&mut self) -> bool {
        match self {
            RequeueState::Never => false,
            RequeueState::Periodic { period, counter } => {
                *counter += 1;
                if *counter >= *period {
                    *counter = 0;
                    true
                } else {
                    false
                }
            }
            RequeueState::Random { probability, rng } => rng.random_bool(*probability),
        }
    }
}

/// Dynamic bounding volume hierarchy over objects of type `T`.
#[derive(Debug)]
pub struct Bvh<T, A> {
    nodes: Vec<BvhNode<T>>,
    free: Vec<NodeId>,
    root: NodeId,
    adapter: A,
    settings: BvhSettings,
    /// Nodes waiting for the rotation pass
    pending: BTreeSet<NodeId>,
    max_depth: u32,
    requeue: RequeueState,
}

impl<T: Clone + PartialEq, A: ObjectAdapter<T>> Bvh<T, A> {
    /// Build a hierarchy over `objects`. The adapter must already know
    /// every object's bounding sphere. An empty list gives an empty root leaf.
    pub fn new(adapter: A, objects: Vec<T>, settings: BvhSettings) -> Result<Self, BvhError> {
        let requeue = RequeueState::from_policy(settings.requeue);
        let mut bvh = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NodeId(0),
            adapter,
            settings,
            pending: BTreeSet::new(),
            max_depth: 0,
            requeue,
        };
        bvh.root = if objects.is_empty() {
            bvh.alloc(BvhNode::leaf(None, 0, Vec::new()))
        } else {
            bvh.build_node(None, objects, 0)?
        };
        tracing::debug!(
            "bvh: built {} nodes, max depth {}",
            bvh.node_count(),
            bvh.max_depth
        );
        Ok(bvh)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn settings(&self) -> &BvhSettings {
        &self.settings
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// A live node, or `None` for ids of freed or unknown slots.
    pub fn node(&self, id: NodeId) -> Option<&BvhNode<T>> {
        self.nodes.get(id.index()).filter(|n| n.in_use)
    }

    /// Number of live nodes, leaves and internal.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Number of live leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.in_use && n.is_leaf()).count()
    }

    /// Deepest depth any node has been stamped with.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Nodes waiting for [`Bvh::optimize`].
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Objects stored in a leaf; empty for internal or unknown nodes.
    pub fn objects(&self, id: NodeId) -> &[T] {
        self.node(id).map(BvhNode::objects).unwrap_or(&[])
    }

    // ============================================================================
    // Arena
    // ============================================================================

    fn alloc(&mut self, node: BvhNode<T>) -> NodeId {
        self.max_depth = self.max_depth.max(node.depth);
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId((self.nodes.len() - 1) as u32)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.index()] = BvhNode::vacant();
        self.pending.remove(&id);
        self.free.push(id);
    }

    #[inline]
    fn n(&self, id: NodeId) -> &BvhNode<T> {
        &self.nodes[id.index()]
    }

    #[inline]
    fn n_mut(&mut self, id: NodeId) -> &mut BvhNode<T> {
        &mut self.nodes[id.index()]
    }

    /// Leaf test that enforces the objects XOR children invariant.
    fn is_leaf(&self, id: NodeId) -> Result<bool, BvhError> {
        let node = self.n(id);
        let leaf = node.objects.is_some();
        if leaf && (node.left.is_some() || node.right.is_some()) {
            return Err(BvhError::LeafWithChildren(id));
        }
        Ok(leaf)
    }

    fn children(&self, id: NodeId) -> Result<(NodeId, NodeId), BvhError> {
        let node = self.n(id);
        match (node.left, node.right) {
            (Some(l), Some(r)) => Ok((l, r)),
            _ => Err(BvhError::BadIntermediateNode(id)),
        }
    }

    fn sphere_of(&self, object: &T) -> Result<Sphere, BvhError> {
        self.adapter.sphere(object).ok_or(BvhError::MissingSphere)
    }
}
