//! Read-only traversals.

use glam::Vec3;

use crate::aabb::Aabb;
use crate::adapter::ObjectAdapter;
use crate::node::NodeId;
use crate::Bvh;

impl<T: Clone + PartialEq, A: ObjectAdapter<T>> Bvh<T, A> {
    /// Preorder walk returning every node whose box passes `hit`.
    /// Subtrees under a failing node are skipped.
    pub fn traverse(&self, mut hit: impl FnMut(&Aabb) -> bool) -> Vec<NodeId> {
        let mut hits = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.n(id);
            if !hit(&node.bounds) {
                continue;
            }
            hits.push(id);
            if let (Some(left), Some(right)) = (node.left, node.right) {
                stack.push(right);
                stack.push(left);
            }
        }
        hits
    }

    /// Objects of every leaf whose box passes `hit`.
    pub fn collect_objects(&self, hit: impl FnMut(&Aabb) -> bool) -> Vec<T> {
        self.traverse(hit)
            .into_iter()
            .flat_map(|id| self.n(id).objects().iter().cloned())
            .collect()
    }

    /// Leaves whose box touches the sphere.
    pub fn find_overlapping_leaves_sphere(&self, center: Vec3, radius: f32) -> Vec<NodeId> {
        self.leaves_where(|b| b.intersects_sphere(center, radius))
    }

    /// Leaves whose box touches `aabb`.
    pub fn find_overlapping_leaves_aabb(&self, aabb: &Aabb) -> Vec<NodeId> {
        self.leaves_where(|b| b.intersects(aabb))
    }

    fn leaves_where(&self, hit: impl FnMut(&Aabb) -> bool) -> Vec<NodeId> {
        self.traverse(hit)
            .into_iter()
            .filter(|id| self.n(*id).is_leaf())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use glam::Vec3;

    use crate::test_support::*;
    use crate::*;

    fn all_leaves(bvh: &TestBvh) -> Vec<NodeId> {
        (0..bvh.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| bvh.node(*id).is_some_and(|n| n.is_leaf()))
            .collect()
    }

    #[test]
    fn test_sphere_query_matches_brute_force() {
        let items = random_spheres(150, 17);
        let mut bvh = build(&items);
        for (id, _) in items.iter().step_by(3) {
            bvh.remove(id).unwrap();
        }

        for (center, radius) in [
            (Vec3::ZERO, 2.0),
            (Vec3::new(5.0, -3.0, 1.0), 4.5),
            (Vec3::splat(50.0), 1.0),
            (Vec3::new(-8.0, 8.0, 0.0), 0.0),
        ] {
            let found: BTreeSet<NodeId> = bvh
                .find_overlapping_leaves_sphere(center, radius)
                .into_iter()
                .collect();
            let expected: BTreeSet<NodeId> = all_leaves(&bvh)
                .into_iter()
                .filter(|id| bvh.node(*id).unwrap().bounds.intersects_sphere(center, radius))
                .collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_aabb_query_matches_brute_force() {
        let items = random_spheres(150, 29);
        let bvh = build(&items);
        let queries = [
            Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            Aabb::new(Vec3::new(2.0, -10.0, -10.0), Vec3::new(3.0, 10.0, 10.0)),
            Aabb::new(Vec3::splat(20.0), Vec3::splat(21.0)),
        ];
        for query in queries {
            let found: BTreeSet<NodeId> =
                bvh.find_overlapping_leaves_aabb(&query).into_iter().collect();
            let expected: BTreeSet<NodeId> = all_leaves(&bvh)
                .into_iter()
                .filter(|id| bvh.node(*id).unwrap().bounds.intersects(&query))
                .collect();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_traverse_all_visits_every_node() {
        let items = random_spheres(33, 4);
        let bvh = build(&items);
        let visited = bvh.traverse(|_| true);
        assert_eq!(visited.len(), bvh.node_count());
        assert_eq!(visited[0], bvh.root());

        let mut objects = bvh.collect_objects(|_| true);
        objects.sort();
        assert_eq!(objects, (0..33).collect::<Vec<u32>>());
    }

    #[test]
    fn test_traverse_prunes_failing_subtrees() {
        let bvh = build(&random_spheres(16, 4));
        assert!(bvh.traverse(|_| false).is_empty());
        assert_eq!(bvh.traverse(|b| b.surface_area() > 1e6).len(), 0);
    }
}
