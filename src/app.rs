//! Window shell and frame loop: input capture, fixed-rate simulation,
//! chunk residency and GPU model sync, draw, debug overlay.

use hashbrown::HashMap;
use raylib::prelude::*;

use talus_geom::Vec3;
use talus_physics::PhysicsWorld;
use talus_render_raylib::{AssetRegistry, ChunkRender, upload_chunk_mesh};
use talus_world::{ChunkCoord, Config};

use crate::camera::OrbitCamera;
use crate::entity::{Entity, TickCtx};
use crate::input::InputState;
use crate::world::World;

/// Game logic rate; the physics step length inside each tick is the
/// separately configured `physics.timestep`.
const UPDATE_STEP: f32 = 1.0 / 60.0;
/// Frame-delta clamp so a debugger pause does not replay minutes of ticks.
const MAX_FRAME_DELTA: f32 = 0.25;
const PLAYER_START: Vec3 = Vec3::new(5.0, 8.0, 5.0);

const SKY: Color = Color {
    r: 168,
    g: 204,
    b: 215,
    a: 255,
};
const TERRAIN_TINT: Color = Color {
    r: 110,
    g: 126,
    b: 96,
    a: 255,
};

pub fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let (mut rl, thread) = raylib::init().size(1920, 1200).title("talus").build();
    rl.set_exit_key(None);
    rl.disable_cursor();

    let mut phys = PhysicsWorld::new(cfg.physics.gravity_y, cfg.physics.timestep)?;
    let mut world = World::new(&cfg);
    let mut camera = OrbitCamera::new(PLAYER_START - Vec3::UP * 2.5);
    world.add(Entity::spawn_player(&mut phys, PLAYER_START));
    let assets =
        AssetRegistry::load(&mut rl, &thread).ok_or("failed to build entity models")?;
    let mut renders: HashMap<ChunkCoord, ChunkRender> = HashMap::new();
    let mut accumulator = 0.0f32;
    let mut grabbed = true;
    let mut paused = false;
    let mut wireframe = false;

    while !rl.window_should_close() {
        let frame_dt = rl.get_frame_time().min(MAX_FRAME_DELTA);
        let input = InputState::capture(&rl);
        if input.release_cursor && grabbed {
            rl.enable_cursor();
            grabbed = false;
        } else if input.grab_cursor && !grabbed {
            rl.disable_cursor();
            grabbed = true;
        }
        if input.toggle_pause {
            paused = !paused;
        }
        if input.toggle_wireframe {
            wireframe = !wireframe;
        }
        if grabbed {
            camera.look(input.mouse_dx, input.mouse_dy);
        }
        camera.tick();

        accumulator += frame_dt;
        while accumulator >= UPDATE_STEP {
            if !paused {
                let mut ctx = TickCtx {
                    phys: &mut phys,
                    input: &input,
                    camera: &mut camera,
                    dt: UPDATE_STEP,
                };
                world.tick(&mut ctx);
            }
            accumulator -= UPDATE_STEP;
        }

        // Residency first, then GPU sync, then draw: the draw window below
        // only ever sees built chunks.
        let center = ChunkCoord::from_world(camera.pos.x, camera.pos.z);
        let update = world.ensure_window(&mut phys, center);
        for coord in update.built {
            if let Some(chunk) = world.resident(coord) {
                if let Some(render) = upload_chunk_mesh(&mut rl, &thread, &chunk.mesh) {
                    renders.insert(coord, render);
                }
            }
        }
        for coord in update.evicted {
            renders.remove(&coord);
        }

        let player_pos = world
            .entities
            .first()
            .map(|e| e.pos(&phys))
            .unwrap_or(camera.pos);
        let cull = world.entity_cull_distance();
        let draw_r = world.draw_radius();

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(SKY);
        {
            let mut d3 = d.begin_mode3D(camera.to_camera3d());
            for i in -draw_r..=draw_r {
                for j in -draw_r..=draw_r {
                    let coord = center.offset(i, j);
                    if world.resident_for_draw(coord).is_some() {
                        if let Some(render) = renders.get(&coord) {
                            if wireframe {
                                d3.draw_model_wires(
                                    &render.model,
                                    Vector3::zero(),
                                    1.0,
                                    TERRAIN_TINT,
                                );
                            } else {
                                d3.draw_model(&render.model, Vector3::zero(), 1.0, TERRAIN_TINT);
                            }
                        }
                    }
                }
            }
            for entity in &world.entities {
                if entity.pos(&phys).dist(camera.pos) > cull {
                    continue;
                }
                entity.draw(&mut d3, &phys, &assets);
            }
        }

        d.draw_text(
            &format!(
                "pos: {:.2}, {:.2}, {:.2}",
                player_pos.x, player_pos.y, player_pos.z
            ),
            10,
            10,
            20,
            Color::WHITE,
        );
        d.draw_text(
            &format!("cpos: {}, {}", center.cx, center.cz),
            10,
            34,
            20,
            Color::WHITE,
        );
        d.draw_text(
            &format!(
                "chunks: {} resident / {} drawn",
                world.resident_count(),
                renders.len()
            ),
            10,
            58,
            20,
            Color::WHITE,
        );
        d.draw_fps(10, 82);
    }
    Ok(())
}

/// Runs the simulation loop without a window: residency plus fixed ticks.
/// Used for smoke runs and profiling from the CLI.
pub fn run_headless(cfg: Config, ticks: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut phys = PhysicsWorld::new(cfg.physics.gravity_y, cfg.physics.timestep)?;
    let mut world = World::new(&cfg);
    let mut camera = OrbitCamera::new(PLAYER_START - Vec3::UP * 2.5);
    world.add(Entity::spawn_player(&mut phys, PLAYER_START));
    let input = InputState::default();

    for _ in 0..ticks {
        camera.tick();
        let center = ChunkCoord::from_world(camera.pos.x, camera.pos.z);
        world.ensure_window(&mut phys, center);
        let mut ctx = TickCtx {
            phys: &mut phys,
            input: &input,
            camera: &mut camera,
            dt: UPDATE_STEP,
        };
        world.tick(&mut ctx);
    }
    log::info!(
        "headless run: {} ticks, {} chunks resident, {} bodies",
        ticks,
        world.resident_count(),
        phys.body_count()
    );
    Ok(())
}
