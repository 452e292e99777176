//! Small closed and open meshes, as indexed buffers.
//!
//! All closed shapes are wound counter-clockwise when seen from outside.

use std::f32::consts::{PI, TAU};

use crate::construction::MeshBuffers;

/// Regular tetrahedron inscribed in the cube `[-1, 1]^3`.
pub fn tetrahedron() -> MeshBuffers {
    MeshBuffers::new(
        vec![
            [1.0, 1.0, 1.0],
            [1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
        ],
        vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2],
    )
}

/// Unit octahedron: 6 vertices on the axes, 8 faces.
pub fn octahedron() -> MeshBuffers {
    MeshBuffers::new(
        vec![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ],
        vec![
            0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, //
            2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5,
        ],
    )
}

/// Two tetrahedra glued on a triangle: apexes 0 (top) and 1 (bottom),
/// equator 2, 3, 4.
pub fn triangular_bipyramid() -> MeshBuffers {
    let ring = |k: f32| {
        let a = k * TAU / 3.0;
        [a.cos(), a.sin(), 0.0]
    };
    MeshBuffers::new(
        vec![[0.0, 0.0, 1.0], [0.0, 0.0, -1.0], ring(0.0), ring(1.0), ring(2.0)],
        vec![
            2, 3, 0, 3, 4, 0, 4, 2, 0, //
            3, 2, 1, 4, 3, 1, 2, 4, 1,
        ],
    )
}

/// Flat `n x n` quad grid over `[0, 1]^2` at z = 0, with +Z normals and
/// uvs equal to xy. Open boundary.
pub fn grid(n: u32) -> MeshBuffers {
    let n = n.max(1);
    let side = n + 1;
    let mut positions = Vec::with_capacity((side * side) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());
    for j in 0..side {
        for i in 0..side {
            let (x, y) = (i as f32 / n as f32, j as f32 / n as f32);
            positions.push([x, y, 0.0]);
            uvs.push([x, y]);
        }
    }
    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for j in 0..n {
        for i in 0..n {
            let a = j * side + i;
            let b = a + 1;
            let c = b + side;
            let d = a + side;
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    let normals = vec![[0.0, 0.0, 1.0]; positions.len()];
    MeshBuffers {
        positions,
        normals: Some(normals),
        uvs: Some(uvs),
        indices,
    }
}

/// Unit sphere with single pole vertices on the Z axis. `rings >= 2` latitude
/// bands and `segments >= 3` longitude slices. Normals point outward.
pub fn uv_sphere(rings: u32, segments: u32) -> MeshBuffers {
    let rings = rings.max(2);
    let segments = segments.max(3);

    let mut positions = vec![[0.0, 0.0, 1.0]];
    for k in 1..rings {
        let theta = PI * k as f32 / rings as f32;
        for j in 0..segments {
            let phi = TAU * j as f32 / segments as f32;
            positions.push([theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]);
        }
    }
    positions.push([0.0, 0.0, -1.0]);
    let south = (positions.len() - 1) as u32;

    let ring_vertex = |k: u32, j: u32| 1 + (k - 1) * segments + (j % segments);
    let mut indices = Vec::new();
    for j in 0..segments {
        indices.extend_from_slice(&[0, ring_vertex(1, j), ring_vertex(1, j + 1)]);
    }
    for k in 1..rings - 1 {
        for j in 0..segments {
            let a = ring_vertex(k, j);
            let b = ring_vertex(k + 1, j);
            let c = ring_vertex(k + 1, j + 1);
            let d = ring_vertex(k, j + 1);
            indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }
    for j in 0..segments {
        indices.extend_from_slice(&[south, ring_vertex(rings - 1, j + 1), ring_vertex(rings - 1, j)]);
    }

    let normals = positions.clone();
    MeshBuffers {
        positions,
        normals: Some(normals),
        uvs: None,
        indices,
    }
}
