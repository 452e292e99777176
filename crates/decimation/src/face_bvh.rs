//! Bounding volume hierarchy over mesh faces.

use decimator_config::BvhSettings;
use spatial::{Bvh, BvhError, NodeId, ObjectAdapter, Sphere};
use topology::{FaceId, Mesh};
use tracing::debug;

pub type FaceBvh = Bvh<FaceId, FaceAdapter>;

/// Dense per-face storage of bounding spheres and owning leaves.
#[derive(Debug, Clone, Default)]
pub struct FaceAdapter {
    spheres: Vec<Option<Sphere>>,
    leaves: Vec<Option<NodeId>>,
}

impl FaceAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter knowing the bounding sphere of every live face.
    pub fn from_mesh(mesh: &Mesh) -> Self {
        let mut adapter = Self {
            spheres: vec![None; mesh.faces().len()],
            leaves: vec![None; mesh.faces().len()],
        };
        for face in mesh.live_faces() {
            adapter.spheres[face.index()] = Some(face_sphere(mesh, face));
        }
        adapter
    }

    fn grow(&mut self, face: FaceId) {
        let needed = face.index() + 1;
        if self.spheres.len() < needed {
            self.spheres.resize(needed, None);
            self.leaves.resize(needed, None);
        }
    }
}

impl ObjectAdapter<FaceId> for FaceAdapter {
    fn sphere(&self, face: &FaceId) -> Option<Sphere> {
        self.spheres.get(face.index()).copied().flatten()
    }

    fn set_sphere(&mut self, face: &FaceId, sphere: Sphere) {
        self.grow(*face);
        self.spheres[face.index()] = Some(sphere);
    }

    fn map_to_leaf(&mut self, face: &FaceId, leaf: NodeId) {
        self.grow(*face);
        self.leaves[face.index()] = Some(leaf);
    }

    fn unmap(&mut self, face: &FaceId) {
        if let Some(slot) = self.leaves.get_mut(face.index()) {
            *slot = None;
        }
    }

    fn leaf(&self, face: &FaceId) -> Option<NodeId> {
        self.leaves.get(face.index()).copied().flatten()
    }
}

/// Smallest sphere around the face's current corners.
pub fn face_sphere(mesh: &Mesh, face: FaceId) -> Sphere {
    let [p0, p1, p2] = mesh.face_positions(face);
    Sphere::from_triangle(p0, p1, p2)
}

/// Build the face hierarchy. It indexes every live face when `populate` is
/// set and is left empty otherwise.
pub fn build_face_bvh(mesh: &Mesh, populate: bool, settings: &BvhSettings) -> Result<FaceBvh, BvhError> {
    if !populate {
        return Bvh::new(FaceAdapter::new(), Vec::new(), settings.clone());
    }
    let faces: Vec<FaceId> = mesh.live_faces().collect();
    let bvh = Bvh::new(FaceAdapter::from_mesh(mesh), faces, settings.clone())?;
    debug!(
        "face bvh: {} nodes, {} leaves, depth {}",
        bvh.node_count(),
        bvh.leaf_count(),
        bvh.max_depth()
    );
    Ok(bvh)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use topology::shapes;

    use super::*;

    #[test]
    fn test_build_indexes_live_faces() {
        let mesh = Mesh::from_buffers(&shapes::uv_sphere(6, 8)).unwrap();
        let bvh = build_face_bvh(&mesh, true, &BvhSettings::default()).unwrap();
        bvh.check_invariants().unwrap();
        assert_eq!(bvh.leaf_count(), mesh.face_count());
        for face in mesh.live_faces() {
            assert!(bvh.adapter().leaf(&face).is_some());
        }
    }

    #[test]
    fn test_unpopulated_bvh_is_empty() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        let bvh = build_face_bvh(&mesh, false, &BvhSettings::default()).unwrap();
        assert!(bvh.objects(bvh.root()).is_empty());
        assert!(bvh.collect_objects(|_| true).is_empty());
    }

    #[test]
    fn test_remove_and_update_faces() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        let mut bvh = build_face_bvh(&mesh, true, &BvhSettings::default()).unwrap();

        bvh.remove(&FaceId(3)).unwrap();
        assert!(bvh.adapter().leaf(&FaceId(3)).is_none());

        let moved = Sphere::new(Vec3::new(5.0, 0.0, 0.0), 0.5);
        bvh.update_object(&FaceId(0), moved).unwrap();
        bvh.optimize().unwrap();
        bvh.check_invariants().unwrap();

        let near = bvh.collect_objects(|b| b.intersects_sphere(Vec3::new(5.0, 0.0, 0.0), 0.1));
        assert_eq!(near, vec![FaceId(0)]);
    }

    #[test]
    fn test_adapter_grows_on_demand() {
        let mut adapter = FaceAdapter::new();
        assert!(adapter.sphere(&FaceId(4)).is_none());
        adapter.set_sphere(&FaceId(4), Sphere::new(Vec3::ZERO, 1.0));
        assert!(adapter.sphere(&FaceId(4)).is_some());
        assert!(adapter.leaf(&FaceId(2)).is_none());
        adapter.unmap(&FaceId(9));
    }
}
