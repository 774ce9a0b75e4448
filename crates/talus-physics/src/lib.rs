//! Rigid-body simulation seam: owns the rapier sets and pipeline, exposes
//! the handful of operations the terrain and entity code needs. Body state
//! lives here and only here; callers read poses through, never cache them.
#![forbid(unsafe_code)]

use rapier3d::math::Rotation;
use rapier3d::na;
use rapier3d::prelude::*;
use talus_geom::{Quat, Vec3};
use thiserror::Error;

pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("failed to build physics thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("collision mesh rejected: {0}")]
    Trimesh(String),
}

/// Collision shape for a dynamic body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyShape {
    Ball { radius: f32 },
    Cuboid { hx: f32, hy: f32, hz: f32 },
    CapsuleY { half_height: f32, radius: f32 },
}

/// Full dynamic state of a body, as cached across a detach/attach cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyPose {
    pub position: Vec3,
    pub orientation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
}

/// Solver worker count: all cores minus a small reservation for the render
/// thread, never below one.
pub fn worker_thread_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let kept = if cores > 4 { cores - 2 } else { cores - 1 };
    kept.max(1)
}

pub struct PhysicsWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    query: QueryPipeline,
    params: IntegrationParameters,
    gravity: Vector<Real>,
    pool: rayon::ThreadPool,
}

impl PhysicsWorld {
    pub fn new(gravity_y: f32, timestep: f32) -> Result<Self, PhysicsError> {
        let threads = worker_thread_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("talus-solver-{i}"))
            .build()?;
        log::debug!("physics solver pool: {threads} thread(s)");
        let mut params = IntegrationParameters::default();
        params.dt = timestep;
        Ok(Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query: QueryPipeline::new(),
            params,
            gravity: vector![0.0, gravity_y, 0.0],
            pool,
        })
    }

    /// Registers world-space triangle geometry as a fixed collider. The
    /// chunk origin is baked into the vertices, so the collider transform is
    /// identity.
    pub fn add_static_trimesh(
        &mut self,
        positions: &[[f32; 3]],
        triangles: &[[u32; 3]],
    ) -> Result<ColliderHandle, PhysicsError> {
        let vertices: Vec<Point<Real>> = positions
            .iter()
            .map(|p| point![p[0], p[1], p[2]])
            .collect();
        let shape = SharedShape::trimesh(vertices, triangles.to_vec());
        Ok(self.colliders.insert(ColliderBuilder::new(shape).build()))
    }

    pub fn remove_static(&mut self, handle: ColliderHandle) {
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, false);
    }

    pub fn add_dynamic(
        &mut self,
        shape: BodyShape,
        mass: f32,
        position: Vec3,
        lock_rotations: bool,
    ) -> RigidBodyHandle {
        let mut builder =
            RigidBodyBuilder::dynamic().translation(vector![position.x, position.y, position.z]);
        if lock_rotations {
            builder = builder.lock_rotations();
        }
        let handle = self.bodies.insert(builder.build());
        let collider = match shape {
            BodyShape::Ball { radius } => ColliderBuilder::ball(radius),
            BodyShape::Cuboid { hx, hy, hz } => ColliderBuilder::cuboid(hx, hy, hz),
            BodyShape::CapsuleY {
                half_height,
                radius,
            } => ColliderBuilder::capsule_y(half_height, radius),
        }
        .mass(mass)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    fn body(&self, handle: RigidBodyHandle) -> &RigidBody {
        self.bodies
            .get(handle)
            .expect("state query on a removed body")
    }

    pub fn body_pose(&self, handle: RigidBodyHandle) -> BodyPose {
        let body = self.body(handle);
        let t = body.translation();
        let r = body.rotation();
        let lv = body.linvel();
        let av = body.angvel();
        BodyPose {
            position: Vec3::new(t.x, t.y, t.z),
            orientation: Quat::new(r.i, r.j, r.k, r.w),
            linvel: Vec3::new(lv.x, lv.y, lv.z),
            angvel: Vec3::new(av.x, av.y, av.z),
        }
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Vec3 {
        let t = self.body(handle).translation();
        Vec3::new(t.x, t.y, t.z)
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Vec3 {
        let v = self.body(handle).linvel();
        Vec3::new(v.x, v.y, v.z)
    }

    pub fn orientation(&self, handle: RigidBodyHandle) -> Quat {
        let r = self.body(handle).rotation();
        Quat::new(r.i, r.j, r.k, r.w)
    }

    pub fn set_position(&mut self, handle: RigidBodyHandle, position: Vec3) {
        self.bodies
            .get_mut(handle)
            .expect("state update on a removed body")
            .set_translation(vector![position.x, position.y, position.z], true);
    }

    pub fn set_linvel(&mut self, handle: RigidBodyHandle, vel: Vec3) {
        self.bodies
            .get_mut(handle)
            .expect("state update on a removed body")
            .set_linvel(vector![vel.x, vel.y, vel.z], true);
    }

    /// Removes the body from the simulation, returning its full state for a
    /// later [`PhysicsWorld::attach`]. The round trip is exact when no step
    /// happens in between.
    pub fn detach(&mut self, handle: RigidBodyHandle) -> BodyPose {
        let pose = self.body_pose(handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        pose
    }

    /// Re-inserts a previously detached body with its cached state.
    pub fn attach(
        &mut self,
        shape: BodyShape,
        mass: f32,
        lock_rotations: bool,
        pose: &BodyPose,
    ) -> RigidBodyHandle {
        let handle = self.add_dynamic(shape, mass, pose.position, lock_rotations);
        let body = self
            .bodies
            .get_mut(handle)
            .expect("freshly inserted body is present");
        let q = na::Quaternion::new(
            pose.orientation.w,
            pose.orientation.x,
            pose.orientation.y,
            pose.orientation.z,
        );
        body.set_rotation(Rotation::from_quaternion(q), true);
        body.set_linvel(vector![pose.linvel.x, pose.linvel.y, pose.linvel.z], true);
        body.set_angvel(vector![pose.angvel.x, pose.angvel.y, pose.angvel.z], true);
        handle
    }

    /// Advances the simulation by exactly one fixed timestep. Constraint
    /// solving runs on the dedicated worker pool.
    pub fn step(&mut self) {
        let Self {
            bodies,
            colliders,
            pipeline,
            islands,
            broad_phase,
            narrow_phase,
            impulse_joints,
            multibody_joints,
            ccd,
            query,
            params,
            gravity,
            pool,
        } = self;
        pool.install(|| {
            pipeline.step(
                gravity,
                params,
                islands,
                broad_phase,
                narrow_phase,
                bodies,
                colliders,
                impulse_joints,
                multibody_joints,
                ccd,
                Some(query),
                &(),
                &(),
            );
        });
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}
