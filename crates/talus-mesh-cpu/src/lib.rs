//! CPU heightfield meshing: dense vertex grid, reconstructed normals, quad
//! indices, and the collision-triangle view of the same geometry.
#![forbid(unsafe_code)]

use talus_geom::Vec3;
use talus_world::{CHUNK_SIZE, ChunkCoord, HeightField};

/// Offset triple for normal accumulation. Each grid cell contributes the two
/// triangle face normals formed by consecutive pairs of these offsets around
/// the cell's pivot vertex.
const NORMAL_OFFSETS: [(i32, i32); 3] = [(1, 0), (1, 1), (0, 1)];

/// A chunk mesh in CPU memory: parallel vertex attribute arrays plus an
/// index buffer. Positions are world-space (the chunk origin is baked in),
/// so both the GPU model and the static collider use an identity transform.
#[derive(Clone, Debug, Default)]
pub struct ChunkMeshCPU {
    pub coord: ChunkCoord,
    pub quality: usize,
    pub pos: Vec<f32>,
    pub norm: Vec<f32>,
    pub uv: Vec<f32>,
    pub idx: Vec<u32>,
}

impl ChunkMeshCPU {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.pos.len() / 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.idx.len() / 3
    }

    #[inline]
    pub fn position(&self, v: usize) -> Vec3 {
        Vec3::new(self.pos[v * 3], self.pos[v * 3 + 1], self.pos[v * 3 + 2])
    }

    #[inline]
    pub fn normal(&self, v: usize) -> Vec3 {
        Vec3::new(self.norm[v * 3], self.norm[v * 3 + 1], self.norm[v * 3 + 2])
    }

    /// Vertex positions as points, for the physics trimesh.
    pub fn collision_positions(&self) -> Vec<[f32; 3]> {
        (0..self.vertex_count())
            .map(|v| [self.pos[v * 3], self.pos[v * 3 + 1], self.pos[v * 3 + 2]])
            .collect()
    }

    /// Index triples as triangles, for the physics trimesh.
    pub fn collision_triangles(&self) -> Vec<[u32; 3]> {
        self.idx
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect()
    }
}

#[inline]
fn grid_index(side: usize, i: i32, j: i32) -> usize {
    i as usize * side + j as usize
}

/// World-space position of lattice vertex (i, j), which may lie outside the
/// chunk (the normal pass overscans one cell past every edge).
#[inline]
fn lattice_pos(hf: &HeightField, coord: ChunkCoord, ratio: f32, i: i32, j: i32) -> Vec3 {
    let (ox, oz) = coord.origin();
    let wx = ox + i as f32 * ratio;
    let wz = oz + j as f32 * ratio;
    Vec3::new(wx, hf.height(wx, wz), wz)
}

/// Builds the chunk mesh at the given tessellation quality (cells per side).
/// Deterministic: geometry is a pure function of (coord, quality, height
/// field parameters).
pub fn build_chunk_mesh(hf: &HeightField, coord: ChunkCoord, quality: usize) -> ChunkMeshCPU {
    debug_assert!(quality >= 1);
    let side = quality + 1;
    let ratio = CHUNK_SIZE as f32 / quality as f32;

    let mut pos = vec![0.0f32; side * side * 3];
    let mut uv = vec![0.0f32; side * side * 2];
    for i in 0..side {
        for j in 0..side {
            let p = lattice_pos(hf, coord, ratio, i as i32, j as i32);
            let v = i * side + j;
            pos[v * 3] = p.x;
            pos[v * 3 + 1] = p.y;
            pos[v * 3 + 2] = p.z;
            uv[v * 2] = i as f32 / quality as f32;
            uv[v * 2 + 1] = j as f32 / quality as f32;
        }
    }

    let norm = build_normals(hf, coord, ratio, quality);
    let idx = quad_indices(quality, quality);
    log::trace!(
        target: "mesh",
        "built chunk ({}, {}) q={} verts={} tris={}",
        coord.cx,
        coord.cz,
        quality,
        side * side,
        idx.len() / 3
    );

    ChunkMeshCPU {
        coord,
        quality,
        pos,
        norm,
        uv,
        idx,
    }
}

/// Per-vertex normals by accumulation: every cell (including a one-cell
/// border outside the chunk, so edge vertices see the neighbor chunk's
/// cells and seams stay invisible) adds its two raw face cross products to
/// each touched in-grid vertex; the sums are then negated and normalized.
/// The offset order yields downward crosses, so the negation is what turns
/// the stored normals upward; it must not be dropped.
fn build_normals(hf: &HeightField, coord: ChunkCoord, ratio: f32, quality: usize) -> Vec<f32> {
    let side = quality + 1;
    let q = quality as i32;
    let mut acc = vec![Vec3::ZERO; side * side];

    let in_grid = |v: i32| v >= 0 && v < side as i32;
    for i in -1..=q {
        for j in -1..=q {
            let a = lattice_pos(hf, coord, ratio, i, j);
            for k in 0..NORMAL_OFFSETS.len() - 1 {
                let (o1, o2) = (NORMAL_OFFSETS[k], NORMAL_OFFSETS[k + 1]);
                let b = lattice_pos(hf, coord, ratio, i + o1.0, j + o1.1);
                let c = lattice_pos(hf, coord, ratio, i + o2.0, j + o2.1);
                let face = (b - a).cross(c - a);

                if i >= 0 && j >= 0 {
                    acc[grid_index(side, i, j)] += face;
                }
                if in_grid(i + o1.0) && in_grid(j + o1.1) {
                    acc[grid_index(side, i + o1.0, j + o1.1)] += face;
                }
                if in_grid(i + o2.0) && in_grid(j + o2.1) {
                    acc[grid_index(side, i + o2.0, j + o2.1)] += face;
                }
            }
        }
    }

    let mut norm = vec![0.0f32; side * side * 3];
    for (v, sum) in acc.iter().enumerate() {
        let n = -sum.normalized();
        norm[v * 3] = n.x;
        norm[v * 3 + 1] = n.y;
        norm[v * 3 + 2] = n.z;
    }
    norm
}

/// Two triangles per cell over a `(width+1)`-stride vertex grid, in the
/// fixed winding the normal sign convention depends on.
pub fn quad_indices(width: usize, height: usize) -> Vec<u32> {
    let s = (width + 1) as u32;
    let mut indices = Vec::with_capacity(width * height * 6);
    for i in 0..height as u32 {
        for j in 0..width as u32 {
            indices.extend_from_slice(&[
                (i + 1) * s + j + 1,
                (i + 1) * s + j,
                i * s + j,
                i * s + j,
                i * s + j + 1,
                (i + 1) * s + j + 1,
            ]);
        }
    }
    indices
}
