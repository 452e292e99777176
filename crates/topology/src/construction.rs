//! Construction of Mesh from indexed buffers, and export back to them.

use std::collections::HashMap;

use decimator_config::AttributeMask;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Face, FaceId, TopologyError, Vertex, VertexId};
use crate::Mesh;

/// Indexed triangle buffers: the ingestion and export format of the decimator.
///
/// Normals and uvs are per buffer vertex, like any indexed GPU mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn new(positions: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: None,
            uvs: None,
            indices,
        }
    }

    /// Build from flat `xyz xyz ...` positions and a triangle index list.
    pub fn from_flat(positions: &[f32], indices: &[u32]) -> Result<Self, TopologyError> {
        let positions = cast_flat::<[f32; 3]>("positions", positions, 3)?;
        Ok(Self::new(positions.to_vec(), indices.to_vec()))
    }

    /// Attach flat `xyz xyz ...` normals.
    pub fn with_flat_normals(mut self, normals: &[f32]) -> Result<Self, TopologyError> {
        self.normals = Some(cast_flat::<[f32; 3]>("normals", normals, 3)?.to_vec());
        Ok(self)
    }

    /// Attach flat `uv uv ...` texture coordinates.
    pub fn with_flat_uvs(mut self, uvs: &[f32]) -> Result<Self, TopologyError> {
        self.uvs = Some(cast_flat::<[f32; 2]>("uvs", uvs, 2)?.to_vec());
        Ok(self)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Attribute channels present in these buffers.
    pub fn attributes(&self) -> AttributeMask {
        let mut mask = AttributeMask::POSITION;
        if self.normals.is_some() {
            mask = mask | AttributeMask::NORMAL;
        }
        if self.uvs.is_some() {
            mask = mask | AttributeMask::UV0;
        }
        mask
    }
}

fn cast_flat<'a, T: bytemuck::Pod>(
    name: &'static str,
    data: &'a [f32],
    stride: usize,
) -> Result<&'a [T], TopologyError> {
    bytemuck::try_cast_slice(data).map_err(|_| TopologyError::FlatBuffer {
        name,
        len: data.len(),
        stride,
    })
}

#[inline]
fn bits3(v: Vec3) -> [u32; 3] {
    v.to_array().map(f32::to_bits)
}

impl Mesh {
    /// Build the mesh from indexed buffers.
    ///
    /// Buffer vertices at bit-identical positions are merged into one mesh
    /// vertex; their normals and uvs stay on the face corners, so seams are
    /// preserved. Fans are built and face normals captured.
    pub fn from_buffers(buffers: &MeshBuffers) -> Result<Self, TopologyError> {
        if buffers.indices.is_empty() {
            return Err(TopologyError::NoIndices);
        }
        if buffers.indices.len() % 3 != 0 {
            return Err(TopologyError::IndexCount(buffers.indices.len()));
        }
        let vertex_count = buffers.positions.len();
        if let Some(normals) = &buffers.normals {
            check_len("normals", vertex_count, normals.len())?;
        }
        if let Some(uvs) = &buffers.uvs {
            check_len("uvs", vertex_count, uvs.len())?;
        }

        let mut lookup: HashMap<[u32; 3], VertexId> = HashMap::with_capacity(vertex_count);
        let mut vertices: Vec<Vertex> = Vec::with_capacity(vertex_count);
        let mut faces: Vec<Face> = Vec::with_capacity(buffers.triangle_count());

        for tri in buffers.indices.chunks_exact(3) {
            let mut ids = [VertexId(0); 3];
            for (k, &index) in tri.iter().enumerate() {
                let position = buffers
                    .positions
                    .get(index as usize)
                    .map(|p| Vec3::from_array(*p))
                    .ok_or(TopologyError::IndexOutOfRange {
                        index,
                        vertex_count,
                    })?;
                ids[k] = *lookup.entry(bits3(position)).or_insert_with(|| {
                    let id = VertexId(vertices.len() as u32);
                    vertices.push(Vertex::new(id, position));
                    id
                });
            }

            let mut face = Face::new(FaceId(faces.len() as u32), ids);
            let [p0, p1, p2] = ids.map(|v| vertices[v.index()].position);
            face.face_normal = crate::triangle_normal(p0, p1, p2);
            for (k, &index) in tri.iter().enumerate() {
                face.normals[k] = match &buffers.normals {
                    Some(normals) => Vec3::from_array(normals[index as usize]),
                    None => face.face_normal,
                };
                if let Some(uvs) = &buffers.uvs {
                    face.uvs[k] = Vec2::from_array(uvs[index as usize]);
                }
            }
            faces.push(face);
        }

        let mut mesh = Mesh {
            vertex_count: vertices.len(),
            face_count: faces.len(),
            vertices,
            faces,
            attributes: buffers.attributes(),
        };
        mesh.build_vertex_face();

        debug!(
            "mesh: built {} vertices, {} faces from {} buffer vertices",
            mesh.vertex_count, mesh.face_count, vertex_count
        );
        Ok(mesh)
    }

    /// Export the live faces as indexed buffers.
    ///
    /// Output vertices are shared between corners whose full attribute vector
    /// (position, and normal/uv when present) is bit-identical.
    pub fn to_buffers(&self) -> MeshBuffers {
        let mask = self.attributes;
        let has_normals = mask.contains(AttributeMask::NORMAL);
        let has_uvs = mask.contains(AttributeMask::UV0);

        let mut lookup: HashMap<Vec<u32>, u32> = HashMap::new();
        let mut out = MeshBuffers {
            normals: has_normals.then(Vec::new),
            uvs: has_uvs.then(Vec::new),
            ..Default::default()
        };

        for face in self.faces.iter().filter(|f| !f.deleted) {
            for slot in 0..3 {
                let key: Vec<u32> = self
                    .corner_attributes(face.id, slot, mask)
                    .into_iter()
                    .map(f32::to_bits)
                    .collect();
                let index = *lookup.entry(key).or_insert_with(|| {
                    out.positions.push(self.position(face.vertices[slot]).to_array());
                    if let Some(normals) = out.normals.as_mut() {
                        normals.push(face.normals[slot].to_array());
                    }
                    if let Some(uvs) = out.uvs.as_mut() {
                        uvs.push(face.uvs[slot].to_array());
                    }
                    (out.positions.len() - 1) as u32
                });
                out.indices.push(index);
            }
        }

        debug!(
            "mesh: exported {} vertices, {} triangles",
            out.positions.len(),
            out.triangle_count()
        );
        out
    }
}

fn check_len(name: &'static str, expected: usize, actual: usize) -> Result<(), TopologyError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TopologyError::AttributeLength {
            name,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes;

    #[test]
    fn test_merges_equal_positions() {
        // two triangles sharing an edge, written as 6 unshared buffer vertices
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let buffers = MeshBuffers::new(positions, vec![0, 1, 2, 3, 4, 5]);
        let mesh = Mesh::from_buffers(&buffers).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn test_from_flat() {
        let flat = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let buffers = MeshBuffers::from_flat(&flat, &[0, 1, 2]).unwrap();
        assert_eq!(buffers.positions.len(), 3);
        assert_eq!(buffers.positions[1], [1.0, 0.0, 0.0]);

        let err = MeshBuffers::from_flat(&flat[..8], &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, TopologyError::FlatBuffer { stride: 3, .. }));
    }

    #[test]
    fn test_flat_attributes_set_the_mask() {
        let flat = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let buffers = MeshBuffers::from_flat(&flat, &[0, 1, 2])
            .and_then(|b| b.with_flat_normals(&normals))
            .and_then(|b| b.with_flat_uvs(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        assert_eq!(
            buffers.attributes(),
            AttributeMask::POSITION | AttributeMask::NORMAL | AttributeMask::UV0
        );
        assert_eq!(buffers.uvs.as_ref().unwrap()[2], [0.0, 1.0]);

        let err = MeshBuffers::from_flat(&flat, &[0, 1, 2])
            .and_then(|b| b.with_flat_uvs(&[0.0, 0.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, TopologyError::FlatBuffer { stride: 2, .. }));
    }

    #[test]
    fn test_rejects_bad_indices() {
        let buffers = MeshBuffers::new(vec![[0.0; 3]; 3], vec![0, 1]);
        assert!(matches!(Mesh::from_buffers(&buffers), Err(TopologyError::IndexCount(2))));

        let buffers = MeshBuffers::new(vec![[0.0; 3]; 3], vec![0, 1, 7]);
        assert!(matches!(
            Mesh::from_buffers(&buffers),
            Err(TopologyError::IndexOutOfRange { index: 7, .. })
        ));

        let buffers = MeshBuffers::new(vec![[0.0; 3]; 3], vec![]);
        assert!(matches!(Mesh::from_buffers(&buffers), Err(TopologyError::NoIndices)));
    }

    #[test]
    fn test_rejects_short_attributes() {
        let mut buffers = shapes::grid(1);
        buffers.uvs = Some(vec![[0.0; 2]; 2]);
        assert!(matches!(
            Mesh::from_buffers(&buffers),
            Err(TopologyError::AttributeLength { name: "uvs", .. })
        ));
    }

    #[test]
    fn test_export_dedups_by_attribute_vector() {
        let mesh = Mesh::from_buffers(&shapes::octahedron()).unwrap();
        let out = mesh.to_buffers();
        assert_eq!(out.positions.len(), 6);
        assert_eq!(out.indices.len(), 24);
        assert!(out.normals.is_none());
    }

    #[test]
    fn test_export_keeps_uv_seams() {
        // same positions as a shared edge, but the second triangle uses other uvs
        let positions = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let uvs = vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [0.5, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ];
        let mut buffers = MeshBuffers::new(positions, vec![0, 1, 2, 3, 4, 5]);
        buffers.uvs = Some(uvs);
        let mesh = Mesh::from_buffers(&buffers).unwrap();
        assert_eq!(mesh.vertex_count(), 4);

        let out = mesh.to_buffers();
        // (1,0,0) carries two uvs, (0,1,0) one
        assert_eq!(out.positions.len(), 5);
        assert_eq!(out.uvs.as_ref().map(Vec::len), Some(5));
    }
}
