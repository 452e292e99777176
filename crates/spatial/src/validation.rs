//! Structural self-check, used by tests and debug assertions of callers.

use crate::adapter::ObjectAdapter;
use crate::{Bvh, BvhError};

impl<T: Clone + PartialEq, A: ObjectAdapter<T>> Bvh<T, A> {
    /// Walk the tree from the root and verify its invariants:
    /// leaves hold objects XOR children, parent links and depths agree,
    /// internal boxes are exactly the union of their children, leaf boxes
    /// contain their objects, and the adapter maps every object to its leaf.
    pub fn check_invariants(&self) -> Result<(), BvhError> {
        let fail = |msg: String| Err(BvhError::Invariant(msg));

        if self.n(self.root).parent.is_some() {
            return fail(format!("root {:?} has a parent", self.root));
        }

        let mut reached = 0usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            reached += 1;
            let node = self.n(id);
            if !node.in_use {
                return fail(format!("{id:?} is reachable but freed"));
            }

            if self.is_leaf(id)? {
                if node.objects().is_empty() && id != self.root {
                    return fail(format!("non-root leaf {id:?} is empty"));
                }
                for object in node.objects() {
                    if self.adapter.leaf(object) != Some(id) {
                        return fail(format!("object in {id:?} is mapped elsewhere"));
                    }
                    let sphere = self.sphere_of(object)?;
                    if !node.bounds.contains_aabb(&sphere.aabb()) {
                        return fail(format!("leaf {id:?} does not contain its object"));
                    }
                }
                continue;
            }

            let (left, right) = self.children(id)?;
            for child in [left, right] {
                let c = self.n(child);
                if c.parent != Some(id) {
                    return fail(format!("{child:?} does not point back to {id:?}"));
                }
                if c.depth != node.depth + 1 {
                    return fail(format!(
                        "{child:?} has depth {}, parent {id:?} has {}",
                        c.depth, node.depth
                    ));
                }
                stack.push(child);
            }
            if node.bounds != self.n(left).bounds.union(&self.n(right).bounds) {
                return fail(format!("{id:?} is not the union of its children"));
            }
        }

        if reached != self.node_count() {
            return fail(format!(
                "{} nodes reachable, {} allocated",
                reached,
                self.node_count()
            ));
        }
        if self.pending.iter().any(|id| !self.n(*id).in_use) {
            return fail("freed node left in the pending set".to_string());
        }
        Ok(())
    }
}
