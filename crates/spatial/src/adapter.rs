//! The seam between the hierarchy and the objects it indexes.

use std::collections::HashMap;
use std::hash::Hash;

use crate::node::NodeId;
use crate::sphere::Sphere;

/// Maps objects to their bounding spheres and owning leaves.
///
/// The hierarchy never inspects objects directly; it asks the adapter for a
/// bounding sphere and records leaf ownership through it.
pub trait ObjectAdapter<T> {
    /// Current bounding sphere of an object, if known.
    fn sphere(&self, object: &T) -> Option<Sphere>;
    /// Store a new bounding sphere after the object moved or changed size.
    fn set_sphere(&mut self, object: &T, sphere: Sphere);
    fn map_to_leaf(&mut self, object: &T, leaf: NodeId);
    fn unmap(&mut self, object: &T);
    fn leaf(&self, object: &T) -> Option<NodeId>;
}

/// Adapter backed by hash maps, for any hashable object key.
#[derive(Debug, Clone)]
pub struct HashAdapter<K> {
    spheres: HashMap<K, Sphere>,
    leaves: HashMap<K, NodeId>,
}

impl<K> Default for HashAdapter<K> {
    fn default() -> Self {
        Self {
            spheres: HashMap::new(),
            leaves: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> HashAdapter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an adapter knowing the spheres of the given objects.
    pub fn with_spheres(items: impl IntoIterator<Item = (K, Sphere)>) -> Self {
        Self {
            spheres: items.into_iter().collect(),
            leaves: HashMap::new(),
        }
    }

    pub fn mapped_count(&self) -> usize {
        self.leaves.len()
    }
}

impl<K: Eq + Hash + Clone> ObjectAdapter<K> for HashAdapter<K> {
    fn sphere(&self, object: &K) -> Option<Sphere> {
        self.spheres.get(object).copied()
    }

    fn set_sphere(&mut self, object: &K, sphere: Sphere) {
        self.spheres.insert(object.clone(), sphere);
    }

    fn map_to_leaf(&mut self, object: &K, leaf: NodeId) {
        self.leaves.insert(object.clone(), leaf);
    }

    fn unmap(&mut self, object: &K) {
        self.leaves.remove(object);
    }

    fn leaf(&self, object: &K) -> Option<NodeId> {
        self.leaves.get(object).copied()
    }
}
