//! Chunk streaming and the fixed-rate tick.
//!
//! Per-coordinate lifecycle: absent -> building -> resident (or failed).
//! Builds run synchronously on the owning thread the first time a
//! coordinate enters the generate window; residency then outlives the
//! window unless an eviction policy is configured.

use hashbrown::{HashMap, HashSet};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use talus_geom::Vec3;
use talus_mesh_cpu::{ChunkMeshCPU, build_chunk_mesh};
use talus_physics::{ColliderHandle, PhysicsWorld};
use talus_world::{CHUNK_SIZE, ChunkCoord, Config, EvictionPolicy, HeightField};

use crate::entity::{Entity, TickCtx};

pub struct ResidentChunk {
    pub mesh: ChunkMeshCPU,
    pub collider: ColliderHandle,
    /// Tick at which the generate window last covered this chunk; the LRU
    /// eviction key.
    last_windowed: u64,
}

enum ChunkState {
    Resident(ResidentChunk),
    /// Build was rejected (bad collision mesh); logged once, skipped in
    /// draw, never retried.
    Failed,
}

/// What `ensure_window` changed, so the render shell can sync GPU models.
#[derive(Default)]
pub struct WindowUpdate {
    pub built: Vec<ChunkCoord>,
    pub evicted: Vec<ChunkCoord>,
}

pub struct World {
    cfg: Config,
    hf: HeightField,
    chunks: HashMap<ChunkCoord, ChunkState>,
    /// Chunks that already spawned their demo entities; survives eviction so
    /// a re-entering chunk does not duplicate them.
    seeded: HashSet<ChunkCoord>,
    pub entities: Vec<Entity>,
    tick_no: u64,
}

impl World {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cfg: cfg.clone(),
            hf: HeightField::new(&cfg.terrain),
            chunks: HashMap::new(),
            seeded: HashSet::new(),
            entities: Vec::new(),
            tick_no: 0,
        }
    }

    pub fn add(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn draw_radius(&self) -> i32 {
        self.cfg.stream.draw_radius
    }

    pub fn entity_cull_distance(&self) -> f32 {
        self.cfg.stream.entity_cull_distance
    }

    pub fn resident_count(&self) -> usize {
        self.chunks
            .values()
            .filter(|s| matches!(s, ChunkState::Resident(_)))
            .count()
    }

    pub fn resident(&self, coord: ChunkCoord) -> Option<&ResidentChunk> {
        match self.chunks.get(&coord) {
            Some(ChunkState::Resident(c)) => Some(c),
            _ => None,
        }
    }

    /// Draw-path lookup. A coordinate inside the draw window that was never
    /// built means the build-before-draw protocol broke; failed chunks are
    /// skipped silently (already reported once).
    pub fn resident_for_draw(&self, coord: ChunkCoord) -> Option<&ResidentChunk> {
        match self.chunks.get(&coord) {
            Some(ChunkState::Resident(c)) => Some(c),
            Some(ChunkState::Failed) => None,
            None => {
                debug_assert!(
                    false,
                    "chunk ({}, {}) is in the draw window but was never built",
                    coord.cx, coord.cz
                );
                None
            }
        }
    }

    /// Makes every coordinate within the generate radius resident, building
    /// the missing ones synchronously, then applies the eviction policy.
    /// The generate radius exceeds the draw radius so builds happen beyond
    /// the edge of view.
    pub fn ensure_window(&mut self, phys: &mut PhysicsWorld, center: ChunkCoord) -> WindowUpdate {
        let r = self.cfg.stream.generate_radius;
        let mut update = WindowUpdate::default();
        for i in -r..=r {
            for j in -r..=r {
                let coord = center.offset(i, j);
                if !self.chunks.contains_key(&coord) && self.build_chunk(phys, coord) {
                    update.built.push(coord);
                }
                if let Some(ChunkState::Resident(c)) = self.chunks.get_mut(&coord) {
                    c.last_windowed = self.tick_no;
                }
            }
        }
        update.evicted = self.evict(phys, center);
        update
    }

    fn build_chunk(&mut self, phys: &mut PhysicsWorld, coord: ChunkCoord) -> bool {
        let terrain = &self.cfg.terrain;
        let mesh = build_chunk_mesh(&self.hf, coord, terrain.mesh_quality);
        let (positions, triangles) = if terrain.collider_quality == terrain.mesh_quality {
            (mesh.collision_positions(), mesh.collision_triangles())
        } else {
            let coarse = build_chunk_mesh(&self.hf, coord, terrain.collider_quality);
            (coarse.collision_positions(), coarse.collision_triangles())
        };
        match phys.add_static_trimesh(&positions, &triangles) {
            Ok(collider) => {
                log::info!(target: "events", "chunk resident ({}, {})", coord.cx, coord.cz);
                self.chunks.insert(
                    coord,
                    ChunkState::Resident(ResidentChunk {
                        mesh,
                        collider,
                        last_windowed: self.tick_no,
                    }),
                );
                if self.cfg.stream.seed_entities && self.seeded.insert(coord) {
                    self.seed_entities(phys, coord);
                }
                true
            }
            Err(e) => {
                log::error!(target: "events", "chunk build failed ({}, {}): {e}", coord.cx, coord.cz);
                self.chunks.insert(coord, ChunkState::Failed);
                false
            }
        }
    }

    /// Demo seeding: a few dynamic bodies dropped above the chunk center,
    /// jittered deterministically per chunk so runs are reproducible.
    fn seed_entities(&mut self, phys: &mut PhysicsWorld, coord: ChunkCoord) {
        let (ox, oz) = coord.origin();
        let half = CHUNK_SIZE as f32 * 0.5;
        let center = Vec3::new(ox + half, 12.0, oz + half);
        let mut rng = SmallRng::seed_from_u64(chunk_seed(self.cfg.terrain.seed, coord));
        for _ in 0..self.cfg.stream.seed_balls {
            let jitter = Vec3::new(rng.random_range(-8.0..8.0), 0.0, rng.random_range(-8.0..8.0));
            self.entities
                .push(Entity::spawn_ball(phys, center + jitter));
        }
        for _ in 0..self.cfg.stream.seed_cubes {
            let jitter = Vec3::new(
                rng.random_range(-8.0..8.0),
                rng.random_range(0.0..4.0),
                rng.random_range(-8.0..8.0),
            );
            self.entities
                .push(Entity::spawn_cube(phys, center + jitter));
        }
    }

    fn evict(&mut self, phys: &mut PhysicsWorld, center: ChunkCoord) -> Vec<ChunkCoord> {
        let EvictionPolicy::Lru { max_resident } = self.cfg.stream.eviction else {
            return Vec::new();
        };
        let resident = self.resident_count();
        if resident <= max_resident {
            return Vec::new();
        }
        let r = self.cfg.stream.generate_radius;
        // Only chunks outside the current window are candidates; config
        // validation guarantees the window itself fits the cap.
        let mut candidates: Vec<(ChunkCoord, u64)> = self
            .chunks
            .iter()
            .filter_map(|(coord, state)| match state {
                ChunkState::Resident(c) if coord.chebyshev(center) > r => {
                    Some((*coord, c.last_windowed))
                }
                _ => None,
            })
            .collect();
        candidates.sort_by_key(|&(_, last)| last);

        let mut evicted = Vec::new();
        let mut remaining = resident;
        for (coord, _) in candidates {
            if remaining <= max_resident {
                break;
            }
            if let Some(ChunkState::Resident(c)) = self.chunks.remove(&coord) {
                phys.remove_static(c.collider);
                remaining -= 1;
                log::info!(target: "events", "chunk evicted ({}, {})", coord.cx, coord.cz);
                evicted.push(coord);
            }
        }
        evicted
    }

    /// Advances the simulation by one fixed timestep, then runs entity view
    /// culling and per-entity logic. Entities past the cull distance are
    /// detached from the simulation (state parked) until they come back.
    pub fn tick(&mut self, ctx: &mut TickCtx) {
        self.tick_no += 1;
        ctx.phys.step();

        let cull = self.cfg.stream.entity_cull_distance;
        let anchor = ctx.camera.pos;
        for entity in &mut self.entities {
            let dist = entity.pos(ctx.phys).dist(anchor);
            if dist > cull {
                if entity.attached() {
                    entity.exit_view(ctx.phys);
                }
                continue;
            }
            if !entity.attached() {
                entity.enter_view(ctx.phys);
            }
            entity.tick(ctx);
        }
    }
}

fn chunk_seed(seed: i32, coord: ChunkCoord) -> u64 {
    let mut h = seed as u64 ^ 0x517C_C1B7_2722_0A95;
    h = h.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (coord.cx as i64 as u64);
    h = h.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (coord.cz as i64 as u64);
    h.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::input::InputState;
    use talus_world::{StreamConfig, TerrainConfig};

    fn test_config() -> Config {
        let mut cfg = Config::default();
        cfg.terrain = TerrainConfig {
            mesh_quality: 8,
            collider_quality: 8,
            ..TerrainConfig::default()
        };
        cfg.stream = StreamConfig {
            draw_radius: 1,
            generate_radius: 2,
            seed_entities: false,
            ..StreamConfig::default()
        };
        cfg.validate().unwrap();
        cfg
    }

    fn phys(cfg: &Config) -> PhysicsWorld {
        PhysicsWorld::new(cfg.physics.gravity_y, cfg.physics.timestep).unwrap()
    }

    #[test]
    fn ensure_window_makes_the_square_resident() {
        let cfg = test_config();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        let center = ChunkCoord::new(3, -2);
        let update = world.ensure_window(&mut phys, center);

        let r = cfg.stream.generate_radius;
        assert_eq!(update.built.len(), ((2 * r + 1) * (2 * r + 1)) as usize);
        for i in -r..=r {
            for j in -r..=r {
                assert!(world.resident(center.offset(i, j)).is_some());
            }
        }
        // Nothing beyond the generate radius exists.
        assert!(world.resident(center.offset(r + 1, 0)).is_none());
        assert_eq!(world.resident_count(), update.built.len());
        assert_eq!(phys.collider_count(), update.built.len());
        // Seeding gated off: no entities appeared.
        assert!(world.entities.is_empty());
    }

    #[test]
    fn second_window_pass_builds_nothing() {
        let cfg = test_config();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        let center = ChunkCoord::new(0, 0);
        world.ensure_window(&mut phys, center);
        let again = world.ensure_window(&mut phys, center);
        assert!(again.built.is_empty());
        assert!(again.evicted.is_empty());
    }

    #[test]
    fn chunks_outlive_the_window_without_eviction() {
        let cfg = test_config();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));
        world.ensure_window(&mut phys, ChunkCoord::new(20, 0));
        // KeepAll: both windows stay resident.
        assert_eq!(world.resident_count(), 2 * 25);
        assert!(world.resident(ChunkCoord::new(0, 0)).is_some());
    }

    #[test]
    fn lru_eviction_caps_residency_and_frees_colliders() {
        let mut cfg = test_config();
        cfg.stream.eviction = EvictionPolicy::Lru { max_resident: 25 };
        cfg.validate().unwrap();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));
        let update = world.ensure_window(&mut phys, ChunkCoord::new(40, 0));
        assert_eq!(world.resident_count(), 25);
        assert_eq!(update.evicted.len(), 25);
        assert_eq!(phys.collider_count(), 25);
        assert!(world.resident(ChunkCoord::new(0, 0)).is_none());
        assert!(world.resident(ChunkCoord::new(40, 0)).is_some());
    }

    #[test]
    fn chunk_geometry_is_deterministic_across_worlds() {
        let cfg = test_config();
        let mut phys_a = phys(&cfg);
        let mut phys_b = phys(&cfg);
        let mut a = World::new(&cfg);
        let mut b = World::new(&cfg);
        a.ensure_window(&mut phys_a, ChunkCoord::new(1, 1));
        b.ensure_window(&mut phys_b, ChunkCoord::new(1, 1));
        let ca = a.resident(ChunkCoord::new(2, 0)).unwrap();
        let cb = b.resident(ChunkCoord::new(2, 0)).unwrap();
        assert_eq!(ca.mesh.pos, cb.mesh.pos);
        assert_eq!(ca.mesh.idx, cb.mesh.idx);
    }

    #[test]
    fn seeding_is_deterministic_and_gated() {
        let mut cfg = test_config();
        cfg.stream.seed_entities = true;
        let mut phys_a = phys(&cfg);
        let mut phys_b = phys(&cfg);
        let mut a = World::new(&cfg);
        let mut b = World::new(&cfg);
        a.ensure_window(&mut phys_a, ChunkCoord::new(0, 0));
        b.ensure_window(&mut phys_b, ChunkCoord::new(0, 0));
        let expected = 25 * (cfg.stream.seed_balls + cfg.stream.seed_cubes);
        assert_eq!(a.entities.len(), expected);
        assert_eq!(b.entities.len(), expected);
        for (ea, eb) in a.entities.iter().zip(&b.entities) {
            assert_eq!(ea.pos(&phys_a), eb.pos(&phys_b));
        }
    }

    #[test]
    fn reentering_an_evicted_chunk_does_not_reseed() {
        let mut cfg = test_config();
        cfg.stream.seed_entities = true;
        cfg.stream.eviction = EvictionPolicy::Lru { max_resident: 25 };
        cfg.validate().unwrap();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));
        let first = world.entities.len();
        world.ensure_window(&mut phys, ChunkCoord::new(40, 0));
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));
        // Re-entry rebuilt geometry but spawned nothing new for old chunks.
        assert_eq!(
            world.entities.len(),
            first + 25 * (cfg.stream.seed_balls + cfg.stream.seed_cubes)
        );
    }

    #[test]
    fn tick_parks_far_entities_and_keeps_near_ones_live() {
        let cfg = test_config();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));

        world.add(Entity::spawn_ball(&mut phys, Vec3::new(5.0, 10.0, 5.0)));
        world.add(Entity::spawn_ball(&mut phys, Vec3::new(500.0, 10.0, 0.0)));

        let mut camera = OrbitCamera::new(Vec3::new(5.0, 0.0, 5.0));
        camera.tick();
        let input = InputState::default();
        let mut ctx = TickCtx {
            phys: &mut phys,
            input: &input,
            camera: &mut camera,
            dt: 1.0 / 60.0,
        };
        world.tick(&mut ctx);

        assert!(world.entities[0].attached());
        assert!(!world.entities[1].attached());
        // The far ball's cached state survives and reattaches when the
        // camera gets close.
        let parked_pos = world.entities[1].pos(&phys);
        camera.pos = Vec3::new(500.0, 0.0, 0.0);
        let mut ctx = TickCtx {
            phys: &mut phys,
            input: &input,
            camera: &mut camera,
            dt: 1.0 / 60.0,
        };
        world.tick(&mut ctx);
        assert!(world.entities[1].attached());
        let reattached = world.entities[1].pos(&phys);
        assert!(parked_pos.dist(reattached) < 1.0);
    }

    #[test]
    fn player_accelerates_from_input() {
        let cfg = test_config();
        let mut phys = phys(&cfg);
        let mut world = World::new(&cfg);
        world.ensure_window(&mut phys, ChunkCoord::new(0, 0));
        world.add(Entity::spawn_player(&mut phys, Vec3::new(5.0, 8.0, 5.0)));

        let mut camera = OrbitCamera::new(Vec3::new(5.0, 5.5, 5.0));
        camera.tick();
        let input = InputState {
            forward: true,
            ..InputState::default()
        };
        for _ in 0..30 {
            let mut ctx = TickCtx {
                phys: &mut phys,
                input: &input,
                camera: &mut camera,
                dt: 1.0 / 60.0,
            };
            world.tick(&mut ctx);
        }
        let vel = world.entities[0].vel(&phys);
        assert!(vel.flat().length() > 0.01, "player never moved: {vel:?}");
        // Camera trails the player.
        assert!(camera.pos.dist(world.entities[0].pos(&phys)) < 1e-4);
    }
}
