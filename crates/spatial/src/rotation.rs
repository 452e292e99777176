//! Tree rotations driven by the pending set.

use crate::adapter::ObjectAdapter;
use crate::node::NodeId;
use crate::{Bvh, BvhError, ROTATION_THRESHOLD};

/// Local restructurings of a node with its children and grandchildren.
///
/// `L_RL` swaps the left child with the right child's left child, and so
/// on. The last two swap grandchildren across the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Rotation {
    None,
    L_RL,
    L_RR,
    R_LL,
    R_LR,
    LL_RR,
    LL_RL,
}

impl Rotation {
    pub const ALL: [Rotation; 7] = [
        Rotation::None,
        Rotation::L_RL,
        Rotation::L_RR,
        Rotation::R_LL,
        Rotation::R_LR,
        Rotation::LL_RR,
        Rotation::LL_RL,
    ];

    /// Whether the rotation moves a subtree one level up or down.
    pub fn changes_depth(self) -> bool {
        matches!(
            self,
            Rotation::L_RL | Rotation::L_RR | Rotation::R_LL | Rotation::R_LR
        )
    }
}

impl<T: Clone + PartialEq, A: ObjectAdapter<T>> Bvh<T, A> {
    /// Drain the pending set, deepest nodes first, rotating where the
    /// children's summed surface area drops enough. Returns the number of
    /// rotations applied.
    pub fn optimize(&mut self) -> Result<usize, BvhError> {
        if self.settings.leaf_object_max != 1 {
            return Err(BvhError::OptimizeRequiresSingleObjectLeaves(
                self.settings.leaf_object_max,
            ));
        }

        let mut applied = 0;
        while let Some(depth) = self.pending.iter().map(|id| self.n(*id).depth).max() {
            let sweep: Vec<NodeId> = self
                .pending
                .iter()
                .copied()
                .filter(|id| self.n(*id).depth == depth)
                .collect();
            for id in &sweep {
                self.pending.remove(id);
            }
            for id in sweep {
                if !self.n(id).in_use || self.is_leaf(id)? {
                    continue;
                }
                if self.try_rotate(id)?.is_some() {
                    applied += 1;
                }
            }
        }

        if applied > 0 {
            tracing::debug!("bvh: optimize applied {} rotations", applied);
        }
        Ok(applied)
    }

    /// Pick the cheapest of the seven rotations at `id` and apply it when
    /// the gain reaches [`ROTATION_THRESHOLD`].
    pub(crate) fn try_rotate(&mut self, id: NodeId) -> Result<Option<Rotation>, BvhError> {
        let (left, right) = self.children(id)?;
        let parent = self.n(id).parent;
        let left_leaf = self.is_leaf(left)?;
        let right_leaf = self.is_leaf(right)?;

        if left_leaf && right_leaf {
            if let Some(parent) = parent {
                self.pending.insert(parent);
            }
            return Ok(None);
        }

        let lc = if left_leaf { None } else { Some(self.children(left)?) };
        let rc = if right_leaf { None } else { Some(self.children(right)?) };

        let sa = |n: NodeId| self.n(n).bounds.surface_area();
        let pair = |a: NodeId, b: NodeId| self.n(a).bounds.union(&self.n(b).bounds).surface_area();

        let current = sa(left) + sa(right);
        let mut best = (current, Rotation::None);
        for rotation in &Rotation::ALL[1..] {
            let cost = match (rotation, lc, rc) {
                (Rotation::L_RL, _, Some((rl, rr))) => sa(rl) + pair(left, rr),
                (Rotation::L_RR, _, Some((rl, rr))) => sa(rr) + pair(left, rl),
                (Rotation::R_LL, Some((ll, lr)), _) => pair(right, lr) + sa(ll),
                (Rotation::R_LR, Some((ll, lr)), _) => pair(right, ll) + sa(lr),
                (Rotation::LL_RR, Some((ll, lr)), Some((rl, rr))) => pair(rr, lr) + pair(rl, ll),
                (Rotation::LL_RL, Some((ll, lr)), Some((rl, rr))) => pair(rl, lr) + pair(ll, rr),
                _ => f32::INFINITY,
            };
            if cost < best.0 {
                best = (cost, *rotation);
            }
        }

        let (best_sa, rotation) = best;
        if rotation == Rotation::None {
            if let Some(parent) = parent {
                if self.requeue.should_requeue() {
                    self.pending.insert(parent);
                }
            }
            return Ok(None);
        }

        if let Some(parent) = parent {
            self.pending.insert(parent);
        }
        if current <= 0.0 || (current - best_sa) / current < ROTATION_THRESHOLD {
            return Ok(None);
        }

        tracing::trace!(
            "bvh: rotate {:?} at {:?}, {} -> {}",
            rotation,
            id,
            current,
            best_sa
        );
        self.apply_rotation(id, rotation)?;
        Ok(Some(rotation))
    }

    fn apply_rotation(&mut self, id: NodeId, rotation: Rotation) -> Result<(), BvhError> {
        let (left, right) = self.children(id)?;
        match rotation {
            Rotation::None => return Ok(()),
            Rotation::L_RL => {
                let (rl, _) = self.children(right)?;
                self.n_mut(id).left = Some(rl);
                self.n_mut(rl).parent = Some(id);
                self.n_mut(right).left = Some(left);
                self.n_mut(left).parent = Some(right);
                self.child_refit(right, false)?;
            }
            Rotation::L_RR => {
                let (_, rr) = self.children(right)?;
                self.n_mut(id).left = Some(rr);
                self.n_mut(rr).parent = Some(id);
                self.n_mut(right).right = Some(left);
                self.n_mut(left).parent = Some(right);
                self.child_refit(right, false)?;
            }
            Rotation::R_LL => {
                let (ll, _) = self.children(left)?;
                self.n_mut(id).right = Some(ll);
                self.n_mut(ll).parent = Some(id);
                self.n_mut(left).left = Some(right);
                self.n_mut(right).parent = Some(left);
                self.child_refit(left, false)?;
            }
            Rotation::R_LR => {
                let (_, lr) = self.children(left)?;
                self.n_mut(id).right = Some(lr);
                self.n_mut(lr).parent = Some(id);
                self.n_mut(left).right = Some(right);
                self.n_mut(right).parent = Some(left);
                self.child_refit(left, false)?;
            }
            Rotation::LL_RR => {
                let (ll, _) = self.children(left)?;
                let (_, rr) = self.children(right)?;
                self.n_mut(left).left = Some(rr);
                self.n_mut(rr).parent = Some(left);
                self.n_mut(right).right = Some(ll);
                self.n_mut(ll).parent = Some(right);
                self.child_refit(left, false)?;
                self.child_refit(right, false)?;
            }
            Rotation::LL_RL => {
                let (ll, _) = self.children(left)?;
                let (rl, _) = self.children(right)?;
                self.n_mut(left).left = Some(rl);
                self.n_mut(rl).parent = Some(left);
                self.n_mut(right).left = Some(ll);
                self.n_mut(ll).parent = Some(right);
                self.child_refit(left, false)?;
                self.child_refit(right, false)?;
            }
        }

        if rotation.changes_depth() {
            let depth = self.n(id).depth;
            self.set_depth(id, depth);
        }
        Ok(())
    }
}
