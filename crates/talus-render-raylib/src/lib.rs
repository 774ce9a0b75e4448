//! Raylib-side GPU utilities: conversions, chunk mesh upload, entity models.
// Unsafe is required for Raylib mesh/model upload operations in this crate.

use raylib::prelude::*;
use talus_mesh_cpu::ChunkMeshCPU;
use talus_world::ChunkCoord;

pub mod conv {
    use talus_geom::Vec3;

    pub fn vec3_to_rl(v: Vec3) -> raylib::prelude::Vector3 {
        raylib::prelude::Vector3::new(v.x, v.y, v.z)
    }

    pub fn vec3_from_rl(v: raylib::prelude::Vector3) -> Vec3 {
        Vec3 {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// A chunk's GPU residency: one model, world-space vertices, identity
/// transform at draw time.
pub struct ChunkRender {
    pub coord: ChunkCoord,
    pub model: Model,
}

/// Uploads a CPU chunk mesh into a raylib model. Raylib meshes index with
/// u16, which caps a chunk at 255 cells per side; the streaming layer never
/// requests more.
pub fn upload_chunk_mesh(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    cpu: &ChunkMeshCPU,
) -> Option<ChunkRender> {
    let v_count = cpu.vertex_count();
    if v_count == 0 || v_count > u16::MAX as usize {
        log::error!(
            "chunk ({}, {}) mesh not uploadable: {} vertices",
            cpu.coord.cx,
            cpu.coord.cz,
            v_count
        );
        return None;
    }

    let mut raw: raylib::ffi::Mesh = unsafe { std::mem::zeroed() };
    raw.vertexCount = v_count as i32;
    raw.triangleCount = (cpu.idx.len() / 3) as i32;
    unsafe {
        let vbytes = (v_count * 3 * std::mem::size_of::<f32>()) as u32;
        let tbytes = (v_count * 2 * std::mem::size_of::<f32>()) as u32;
        let ibytes = (cpu.idx.len() * std::mem::size_of::<u16>()) as u32;
        raw.vertices = raylib::ffi::MemAlloc(vbytes) as *mut f32;
        raw.normals = raylib::ffi::MemAlloc(vbytes) as *mut f32;
        raw.texcoords = raylib::ffi::MemAlloc(tbytes) as *mut f32;
        raw.indices = raylib::ffi::MemAlloc(ibytes) as *mut u16;
        std::ptr::copy_nonoverlapping(cpu.pos.as_ptr(), raw.vertices, v_count * 3);
        std::ptr::copy_nonoverlapping(cpu.norm.as_ptr(), raw.normals, v_count * 3);
        std::ptr::copy_nonoverlapping(cpu.uv.as_ptr(), raw.texcoords, v_count * 2);
        for (k, &i) in cpu.idx.iter().enumerate() {
            *raw.indices.add(k) = i as u16;
        }
    }
    let mut mesh = unsafe { raylib::core::models::Mesh::from_raw(raw) };
    unsafe {
        mesh.upload(false);
    }
    let model = rl
        .load_model_from_mesh(thread, unsafe { mesh.make_weak() })
        .ok()?;
    Some(ChunkRender {
        coord: cpu.coord,
        model,
    })
}

/// Entity models generated once at startup and owned by the render shell;
/// entity draw borrows them instead of touching hidden lazy statics.
pub struct AssetRegistry {
    pub ball: Model,
    pub cube: Model,
}

impl AssetRegistry {
    pub fn load(rl: &mut RaylibHandle, thread: &RaylibThread) -> Option<Self> {
        let ball_mesh = Mesh::gen_mesh_sphere(thread, 1.0, 16, 24);
        let ball = rl
            .load_model_from_mesh(thread, unsafe { ball_mesh.make_weak() })
            .ok()?;
        let cube_mesh = Mesh::gen_mesh_cube(thread, 2.0, 2.0, 2.0);
        let cube = rl
            .load_model_from_mesh(thread, unsafe { cube_mesh.make_weak() })
            .ok()?;
        Some(Self { ball, cube })
    }
}
