//! Game entities: a closed set of variants over the physics simulation.
//!
//! While an entity is attached, its pose is never cached: every access
//! reads the authoritative body state. Detaching (view culling) caches the
//! full pose so a later reattach is an exact round trip.

use raylib::prelude::*;
use talus_geom::{Quat, Vec3};
use talus_physics::{BodyPose, BodyShape, PhysicsWorld, RigidBodyHandle};
use talus_render_raylib::{AssetRegistry, conv::vec3_to_rl};

use crate::camera::OrbitCamera;
use crate::input::InputState;

/// Explicit per-tick context: simulation, input snapshot, camera. Threaded
/// through instead of reaching for process-wide globals.
pub struct TickCtx<'a> {
    pub phys: &'a mut PhysicsWorld,
    pub input: &'a InputState,
    pub camera: &'a mut OrbitCamera,
    pub dt: f32,
}

#[derive(Clone, Copy, Debug)]
enum Attachment {
    Live(RigidBodyHandle),
    Parked(BodyPose),
}

pub struct Player {
    attachment: Attachment,
}

pub struct Ball {
    attachment: Attachment,
}

pub struct Cube {
    attachment: Attachment,
}

pub enum Entity {
    Player(Player),
    Ball(Ball),
    Cube(Cube),
}

// Player capsule: radius 1, cylindrical half-height 1.5 => feet sit 2.5
// below the body center.
const PLAYER_FOOT_OFFSET: f32 = 2.5;
const PLAYER_ACCEL: f32 = 7.6;
const PLAYER_JUMP_SPEED: f32 = 5.0;
const PLAYER_DAMPING: f32 = 0.01;
const BALL_RADIUS: f32 = 1.0;

impl Entity {
    pub fn spawn_player(phys: &mut PhysicsWorld, body_pos: Vec3) -> Entity {
        let handle = phys.add_dynamic(Self::player_shape(), 3.0, body_pos, true);
        Entity::Player(Player {
            attachment: Attachment::Live(handle),
        })
    }

    pub fn spawn_ball(phys: &mut PhysicsWorld, pos: Vec3) -> Entity {
        let handle = phys.add_dynamic(Self::ball_shape(), 1.0, pos, false);
        Entity::Ball(Ball {
            attachment: Attachment::Live(handle),
        })
    }

    pub fn spawn_cube(phys: &mut PhysicsWorld, pos: Vec3) -> Entity {
        let handle = phys.add_dynamic(Self::cube_shape(), 1.0, pos, false);
        Entity::Cube(Cube {
            attachment: Attachment::Live(handle),
        })
    }

    fn player_shape() -> BodyShape {
        BodyShape::CapsuleY {
            half_height: 1.5,
            radius: 1.0,
        }
    }

    fn ball_shape() -> BodyShape {
        BodyShape::Ball {
            radius: BALL_RADIUS,
        }
    }

    fn cube_shape() -> BodyShape {
        BodyShape::Cuboid {
            hx: 1.0,
            hy: 1.0,
            hz: 1.0,
        }
    }

    fn shape(&self) -> BodyShape {
        match self {
            Entity::Player(_) => Self::player_shape(),
            Entity::Ball(_) => Self::ball_shape(),
            Entity::Cube(_) => Self::cube_shape(),
        }
    }

    fn mass(&self) -> f32 {
        match self {
            Entity::Player(_) => 3.0,
            Entity::Ball(_) | Entity::Cube(_) => 1.0,
        }
    }

    fn lock_rotations(&self) -> bool {
        matches!(self, Entity::Player(_))
    }

    fn attachment(&self) -> Attachment {
        match self {
            Entity::Player(p) => p.attachment,
            Entity::Ball(b) => b.attachment,
            Entity::Cube(c) => c.attachment,
        }
    }

    fn set_attachment(&mut self, a: Attachment) {
        match self {
            Entity::Player(p) => p.attachment = a,
            Entity::Ball(b) => b.attachment = a,
            Entity::Cube(c) => c.attachment = a,
        }
    }

    pub fn attached(&self) -> bool {
        matches!(self.attachment(), Attachment::Live(_))
    }

    fn body_pos(&self, phys: &PhysicsWorld) -> Vec3 {
        match self.attachment() {
            Attachment::Live(h) => phys.position(h),
            Attachment::Parked(pose) => pose.position,
        }
    }

    /// World-space anchor position. The player reports feet, not body
    /// center; balls and cubes report the body center.
    pub fn pos(&self, phys: &PhysicsWorld) -> Vec3 {
        let p = self.body_pos(phys);
        match self {
            Entity::Player(_) => p - Vec3::UP * PLAYER_FOOT_OFFSET,
            _ => p,
        }
    }

    pub fn vel(&self, phys: &PhysicsWorld) -> Vec3 {
        match self.attachment() {
            Attachment::Live(h) => phys.linvel(h),
            Attachment::Parked(pose) => pose.linvel,
        }
    }

    pub fn orient(&self, phys: &PhysicsWorld) -> Quat {
        match self.attachment() {
            Attachment::Live(h) => phys.orientation(h),
            Attachment::Parked(pose) => pose.orientation,
        }
    }

    /// Only the player is steerable; repositioning a free-falling ball or
    /// cube would desync it from the simulation.
    pub fn set_pos(&mut self, phys: &mut PhysicsWorld, pos: Vec3) {
        match self {
            Entity::Player(_) => {
                let Attachment::Live(h) = self.attachment() else {
                    panic!("cannot reposition a detached player");
                };
                phys.set_position(h, pos + Vec3::UP * PLAYER_FOOT_OFFSET);
            }
            Entity::Ball(_) => panic!("cannot set the position of a ball"),
            Entity::Cube(_) => panic!("cannot set the position of a cube"),
        }
    }

    /// Removes the body from the live simulation, caching its exact state.
    pub fn exit_view(&mut self, phys: &mut PhysicsWorld) {
        if let Attachment::Live(h) = self.attachment() {
            let pose = phys.detach(h);
            self.set_attachment(Attachment::Parked(pose));
        }
    }

    /// Reattaches a parked body with its cached state.
    pub fn enter_view(&mut self, phys: &mut PhysicsWorld) {
        if let Attachment::Parked(pose) = self.attachment() {
            let handle = phys.attach(self.shape(), self.mass(), self.lock_rotations(), &pose);
            self.set_attachment(Attachment::Live(handle));
        }
    }

    pub fn tick(&mut self, ctx: &mut TickCtx) {
        if let Entity::Player(p) = self {
            p.tick(ctx);
        }
    }

    pub fn draw(&self, d3: &mut impl RaylibDraw3D, phys: &PhysicsWorld, assets: &AssetRegistry) {
        match self {
            Entity::Player(p) => p.draw(d3, phys),
            Entity::Ball(_) => {
                d3.draw_model(&assets.ball, vec3_to_rl(self.pos(phys)), 1.0, Color::SKYBLUE);
            }
            Entity::Cube(_) => {
                let (axis, angle) = self.orient(phys).to_axis_angle();
                d3.draw_model_ex(
                    &assets.cube,
                    vec3_to_rl(self.pos(phys)),
                    vec3_to_rl(axis),
                    angle.to_degrees(),
                    Vector3::one(),
                    Color::BEIGE,
                );
            }
        }
    }
}

impl Player {
    fn handle(&self) -> RigidBodyHandle {
        match self.attachment {
            Attachment::Live(h) => h,
            Attachment::Parked(_) => panic!("player must stay attached to the simulation"),
        }
    }

    fn feet(&self, phys: &PhysicsWorld) -> Vec3 {
        phys.position(self.handle()) - Vec3::UP * PLAYER_FOOT_OFFSET
    }

    fn tick(&mut self, ctx: &mut TickCtx) {
        let h = self.handle();
        let input = ctx.input;

        let mut dir = Vec3::ZERO;
        if input.forward {
            dir.z += 1.0;
        }
        if input.back {
            dir.z -= 1.0;
        }
        if input.left {
            dir.x -= 1.0;
        }
        if input.right {
            dir.x += 1.0;
        }
        if dir.length() > 1e-4 {
            dir = dir.normalized();
        }

        let vel = ctx.phys.linvel(h);
        // Horizontal velocity bleeds toward zero; vertical is the solver's.
        let mut v = vel.flat().lerp(Vec3::ZERO, PLAYER_DAMPING) + Vec3::UP * vel.y;
        if input.jump {
            v.y += PLAYER_JUMP_SPEED;
        }
        let wish = ctx.camera.right * dir.x + ctx.camera.front.flat().normalized() * dir.z;
        if wish.length() > 1e-4 {
            v += wish.normalized() * PLAYER_ACCEL * ctx.dt;
        }
        ctx.phys.set_linvel(h, v);

        // The camera trails the feet; the body itself is rotation-locked.
        ctx.camera.pos = self.feet(ctx.phys);
    }

    fn draw(&self, d3: &mut impl RaylibDraw3D, phys: &PhysicsWorld) {
        let feet = self.feet(phys);
        d3.draw_capsule(
            vec3_to_rl(feet + Vec3::UP * 0.5),
            vec3_to_rl(feet + Vec3::UP * 2.0),
            0.5,
            12,
            6,
            Color::ORANGE,
        );
    }
}
