//! Chunk coordinates, terrain configuration, and the height field.
#![forbid(unsafe_code)]

mod config;
mod heightfield;

pub use config::{
    Config, ConfigError, EvictionPolicy, PhysicsConfig, StreamConfig, TerrainConfig,
};
pub use heightfield::HeightField;

/// World units per chunk side.
pub const CHUNK_SIZE: i32 = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    /// Chunk containing the given world-space position.
    #[inline]
    pub fn from_world(x: f32, z: f32) -> Self {
        Self {
            cx: (x.floor() as i32).div_euclid(CHUNK_SIZE),
            cz: (z.floor() as i32).div_euclid(CHUNK_SIZE),
        }
    }

    /// World-space position of the chunk's (0, 0) corner.
    #[inline]
    pub fn origin(self) -> (f32, f32) {
        (
            (self.cx * CHUNK_SIZE) as f32,
            (self.cz * CHUNK_SIZE) as f32,
        )
    }

    /// Square-window distance (the streaming radius metric).
    #[inline]
    pub fn chebyshev(self, other: ChunkCoord) -> i32 {
        (self.cx - other.cx).abs().max((self.cz - other.cz).abs())
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}
