//! Structural mutation: top-down build, insertion, removal and refitting.

use crate::aabb::Aabb;
use crate::adapter::ObjectAdapter;
use crate::node::{BvhNode, NodeId};
use crate::sphere::Sphere;
use crate::{Bvh, BvhError, MERGE_DISCOUNT};

impl<T: Clone + PartialEq, A: ObjectAdapter<T>> Bvh<T, A> {
    /// Add an object whose sphere the adapter already knows.
    ///
    /// Descends by surface-area cost. At each internal node the object goes
    /// left, right, or the two children are merged under a new node and the
    /// object becomes their sibling.
    pub fn add(&mut self, object: T) -> Result<(), BvhError> {
        let new_box = self.sphere_of(&object)?.aabb();
        let new_sa = new_box.surface_area();

        let mut current = self.root;
        while !self.is_leaf(current)? {
            let (left, right) = self.children(current)?;
            let left_box = self.n(left).bounds;
            let right_box = self.n(right).bounds;

            let send_left = right_box.surface_area() + left_box.union(&new_box).surface_area();
            let send_right = left_box.surface_area() + right_box.union(&new_box).surface_area();
            let merged = left_box.union(&right_box).surface_area() + new_sa;

            if merged < send_left.min(send_right) * MERGE_DISCOUNT {
                return self.add_pushdown(current, object);
            }
            current = if send_left < send_right { left } else { right };
        }

        self.n_mut(current)
            .objects
            .get_or_insert_with(Vec::new)
            .push(object.clone());
        self.adapter.map_to_leaf(&object, current);
        self.refit_volume(current)?;

        if self.n(current).objects().len() > self.leaf_max() {
            self.split_node(current)?;
            self.child_refit(current, false)?;
        }
        Ok(())
    }

    /// Record `sphere` for `object` and add it.
    pub fn insert(&mut self, object: T, sphere: Sphere) -> Result<(), BvhError> {
        self.adapter.set_sphere(&object, sphere);
        self.add(object)
    }

    /// Remove an object. A leaf left empty is collapsed into its parent,
    /// unless it is the root.
    pub fn remove(&mut self, object: &T) -> Result<(), BvhError> {
        let leaf = self.adapter.leaf(object).ok_or(BvhError::UnmappedObject)?;
        if !self.is_leaf(leaf)? {
            return Err(BvhError::NotALeaf(leaf));
        }

        self.adapter.unmap(object);
        let remaining = {
            let objects = self.n_mut(leaf).objects.get_or_insert_with(Vec::new);
            if let Some(pos) = objects.iter().position(|o| o == object) {
                objects.remove(pos);
            }
            objects.len()
        };

        if remaining > 0 {
            self.refit_volume(leaf)?;
        } else if let Some(parent) = self.n(leaf).parent {
            self.remove_leaf(parent, leaf)?;
            self.release(leaf);
        } else {
            self.n_mut(leaf).bounds = Aabb::empty();
        }
        Ok(())
    }

    /// Store a new sphere for `object` and refit its leaf. When the leaf
    /// box changed, the leaf's parent is queued for [`Bvh::optimize`].
    pub fn update_object(&mut self, object: &T, sphere: Sphere) -> Result<(), BvhError> {
        self.adapter.set_sphere(object, sphere);
        let leaf = self.adapter.leaf(object).ok_or(BvhError::UnmappedObject)?;
        if !self.is_leaf(leaf)? {
            return Err(BvhError::NotALeaf(leaf));
        }
        if self.refit_volume(leaf)? {
            if let Some(parent) = self.n(leaf).parent {
                self.pending.insert(parent);
            }
        }
        Ok(())
    }

    // ============================================================================
    // Construction
    // ============================================================================

    pub(crate) fn build_node(
        &mut self,
        parent: Option<NodeId>,
        objects: Vec<T>,
        depth: u32,
    ) -> Result<NodeId, BvhError> {
        if objects.is_empty() {
            return Err(BvhError::EmptyNode);
        }
        let bounds = self.objects_bounds(&objects)?;
        let count = objects.len();

        let id = self.alloc(BvhNode::leaf(parent, depth, objects));
        self.n_mut(id).bounds = bounds;
        for object in self.nodes[id.index()].objects() {
            self.adapter.map_to_leaf(object, id);
        }

        if count > self.leaf_max() {
            self.split_node(id)?;
            self.child_refit(id, false)?;
        }
        Ok(id)
    }

    /// Turn a leaf into an internal node by bisecting its objects on the
    /// axis with the lowest `SA(left) * |left| + SA(right) * |right|`.
    /// Ties keep the earlier axis.
    fn split_node(&mut self, id: NodeId) -> Result<(), BvhError> {
        let objects = self.n_mut(id).objects.take().ok_or(BvhError::NotALeaf(id))?;
        for object in &objects {
            self.adapter.unmap(object);
        }
        let center = objects.len() / 2;

        let mut best: Option<(f32, Vec<T>)> = None;
        for axis in 0..3 {
            let mut keyed = objects
                .iter()
                .map(|o| Ok((self.sphere_of(o)?.center[axis], o.clone())))
                .collect::<Result<Vec<_>, BvhError>>()?;
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            let ordered: Vec<T> = keyed.into_iter().map(|(_, o)| o).collect();

            let (lo, hi) = ordered.split_at(center);
            let cost = self.objects_bounds(lo)?.surface_area() * lo.len() as f32
                + self.objects_bounds(hi)?.surface_area() * hi.len() as f32;
            if best.as_ref().is_none_or(|(best_cost, _)| cost < *best_cost) {
                best = Some((cost, ordered));
            }
        }

        let (_, mut lo) = best.ok_or(BvhError::EmptyNode)?;
        let hi = lo.split_off(center);
        let depth = self.n(id).depth + 1;
        let left = self.build_node(Some(id), lo, depth)?;
        let right = self.build_node(Some(id), hi, depth)?;

        let node = self.n_mut(id);
        node.left = Some(left);
        node.right = Some(right);
        Ok(())
    }

    /// Wrap the children of `id` in a new internal node and hang a new leaf
    /// holding `object` next to it.
    fn add_pushdown(&mut self, id: NodeId, object: T) -> Result<(), BvhError> {
        let (left, right) = self.children(id)?;
        let depth = self.n(id).depth;

        let merged = self.alloc(BvhNode::internal(Some(id), depth + 1, left, right));
        self.n_mut(left).parent = Some(merged);
        self.n_mut(right).parent = Some(merged);
        self.child_refit(merged, false)?;

        let bounds = self.sphere_of(&object)?.aabb();
        let leaf = self.alloc(BvhNode::leaf(Some(id), depth + 1, vec![object.clone()]));
        self.n_mut(leaf).bounds = bounds;
        self.adapter.map_to_leaf(&object, leaf);

        let node = self.n_mut(id);
        node.left = Some(merged);
        node.right = Some(leaf);
        self.set_depth(id, depth);
        self.child_refit(id, true)
    }

    // ============================================================================
    // Removal
    // ============================================================================

    /// `parent` takes the place of the sibling of `removed`.
    fn remove_leaf(&mut self, parent: NodeId, removed: NodeId) -> Result<(), BvhError> {
        let (left, right) = self.children(parent)?;
        let keep = if removed == left {
            right
        } else if removed == right {
            left
        } else {
            return Err(BvhError::NotAChild {
                parent,
                child: removed,
            });
        };

        let kept = std::mem::replace(self.n_mut(keep), BvhNode::vacant());
        self.free.push(keep);
        if self.pending.remove(&keep) {
            self.pending.insert(parent);
        }

        let node = self.n_mut(parent);
        node.bounds = kept.bounds;
        node.left = kept.left;
        node.right = kept.right;
        node.objects = kept.objects;

        match (kept.left, kept.right) {
            (Some(l), Some(r)) => {
                self.n_mut(l).parent = Some(parent);
                self.n_mut(r).parent = Some(parent);
                let depth = self.n(parent).depth;
                self.set_depth(parent, depth);
            }
            _ => {
                for object in self.nodes[parent.index()].objects() {
                    self.adapter.map_to_leaf(object, parent);
                }
            }
        }

        if let Some(grandparent) = self.n(parent).parent {
            self.child_refit(grandparent, true)?;
        }
        Ok(())
    }

    // ============================================================================
    // Refitting
    // ============================================================================

    /// Recompute a leaf box from its objects and fix the ancestors. Returns
    /// whether the box changed.
    pub(crate) fn refit_volume(&mut self, leaf: NodeId) -> Result<bool, BvhError> {
        let node = self.n(leaf);
        if node.objects().is_empty() {
            return Err(BvhError::EmptyLeaf(leaf));
        }
        let old = node.bounds;
        let parent = node.parent;
        let new = self.objects_bounds(node.objects())?;
        if new == old {
            return Ok(false);
        }
        self.n_mut(leaf).bounds = new;

        if let Some(parent) = parent {
            if new.contains_aabb(&old) {
                self.child_expanded(parent, leaf);
            } else {
                self.child_refit(parent, true)?;
            }
        }
        Ok(true)
    }

    /// Set an internal node's box to the union of its children, walking up
    /// to the root when `propagate` is set.
    pub(crate) fn child_refit(&mut self, id: NodeId, propagate: bool) -> Result<(), BvhError> {
        let mut current = Some(id);
        while let Some(node) = current {
            let (left, right) = self.children(node)?;
            let bounds = self.n(left).bounds.union(&self.n(right).bounds);
            self.n_mut(node).bounds = bounds;
            current = if propagate { self.n(node).parent } else { None };
        }
        Ok(())
    }

    /// Grow ancestors in place after `child` only grew.
    fn child_expanded(&mut self, id: NodeId, child: NodeId) {
        let mut current = id;
        let mut grown = self.n(child).bounds;
        loop {
            let node = self.n_mut(current);
            let expanded = node.bounds.union(&grown);
            if expanded == node.bounds {
                return;
            }
            node.bounds = expanded;
            grown = expanded;
            match node.parent {
                Some(parent) => current = parent,
                None => return,
            }
        }
    }

    /// Re-stamp the depth of a subtree.
    pub(crate) fn set_depth(&mut self, id: NodeId, depth: u32) {
        let mut stack = vec![(id, depth)];
        while let Some((node, depth)) = stack.pop() {
            self.max_depth = self.max_depth.max(depth);
            let n = self.n_mut(node);
            n.depth = depth;
            if let (Some(l), Some(r)) = (n.left, n.right) {
                stack.push((l, depth + 1));
                stack.push((r, depth + 1));
            }
        }
    }

    pub(crate) fn objects_bounds(&self, objects: &[T]) -> Result<Aabb, BvhError> {
        objects.iter().try_fold(Aabb::empty(), |acc, object| {
            Ok(acc.union(&self.sphere_of(object)?.aabb()))
        })
    }

    fn leaf_max(&self) -> usize {
        self.settings.leaf_object_max.max(1)
    }
}
