//! Nodes of the hierarchy arena.

use crate::aabb::Aabb;

/// Index of a node in the hierarchy arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node of the hierarchy.
///
/// A leaf holds `objects` and no children; an internal node holds two
/// children and no object list. Anything else is a broken invariant.
#[derive(Debug, Clone)]
pub struct BvhNode<T> {
    pub bounds: Aabb,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub depth: u32,
    /// Only populated in leaves
    pub objects: Option<Vec<T>>,
    pub(crate) in_use: bool,
}

impl<T> BvhNode<T> {
    pub(crate) fn leaf(parent: Option<NodeId>, depth: u32, objects: Vec<T>) -> Self {
        Self {
            bounds: Aabb::empty(),
            parent,
            left: None,
            right: None,
            depth,
            objects: Some(objects),
            in_use: true,
        }
    }

    pub(crate) fn internal(parent: Option<NodeId>, depth: u32, left: NodeId, right: NodeId) -> Self {
        Self {
            bounds: Aabb::empty(),
            parent,
            left: Some(left),
            right: Some(right),
            depth,
            objects: None,
            in_use: true,
        }
    }

    pub(crate) fn vacant() -> Self {
        Self {
            bounds: Aabb::empty(),
            parent: None,
            left: None,
            right: None,
            depth: 0,
            objects: None,
            in_use: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.objects.is_some()
    }

    /// Objects of a leaf; empty for internal nodes.
    pub fn objects(&self) -> &[T] {
        self.objects.as_deref().unwrap_or(&[])
    }
}
