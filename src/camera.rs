//! Third-person orbit camera: follows a ground position, looks along a
//! yaw/pitch basis, keeps the eye a fixed distance behind the target.

use raylib::prelude::Camera3D;
use talus_geom::Vec3;
use talus_render_raylib::conv::vec3_to_rl;

const TARGET_LIFT: f32 = 2.4;
const EYE_BACK: f32 = 10.0;
const FOV_DEG: f32 = 45.0;

pub struct OrbitCamera {
    /// Follow position (the player's feet); culling and chunk windowing key
    /// off this, not the eye.
    pub pos: Vec3,
    pub yaw: f32,   // degrees
    pub pitch: f32, // degrees
    pub front: Vec3,
    pub right: Vec3,
    up: Vec3,
    pub sensitivity: f32,
}

impl OrbitCamera {
    pub fn new(pos: Vec3) -> Self {
        let mut cam = Self {
            pos,
            yaw: 0.0,
            pitch: -15.0,
            front: Vec3::new(1.0, 0.0, 0.0),
            right: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::UP,
            sensitivity: 0.1,
        };
        cam.tick();
        cam
    }

    /// Mouse-look. Vertical delta is inverted so pushing the mouse forward
    /// pitches up; pitch is clamped short of the poles.
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-89.0, 89.0);
    }

    /// Rebuilds the orthonormal basis from yaw/pitch.
    pub fn tick(&mut self) {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        self.front = Vec3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalized();
        self.right = self.front.cross(Vec3::UP).normalized();
        self.up = self.right.cross(self.front).normalized();
    }

    pub fn target(&self) -> Vec3 {
        self.pos + Vec3::UP * TARGET_LIFT
    }

    pub fn eye(&self) -> Vec3 {
        self.target() - self.front * EYE_BACK
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D::perspective(
            vec3_to_rl(self.eye()),
            vec3_to_rl(self.target()),
            vec3_to_rl(self.up),
            FOV_DEG,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_stays_orthonormal_under_look() {
        let mut cam = OrbitCamera::new(Vec3::ZERO);
        cam.look(123.0, -45.0);
        cam.tick();
        assert!((cam.front.length() - 1.0).abs() < 1e-5);
        assert!((cam.right.length() - 1.0).abs() < 1e-5);
        assert!(cam.front.dot(cam.right).abs() < 1e-5);
    }

    #[test]
    fn pitch_clamps_short_of_the_poles() {
        let mut cam = OrbitCamera::new(Vec3::ZERO);
        cam.look(0.0, -10_000.0);
        assert_eq!(cam.pitch, 89.0);
        cam.look(0.0, 10_000.0);
        assert_eq!(cam.pitch, -89.0);
    }

    #[test]
    fn eye_sits_behind_the_target() {
        let mut cam = OrbitCamera::new(Vec3::new(5.0, 2.0, -3.0));
        cam.tick();
        assert!((cam.eye().dist(cam.target()) - EYE_BACK).abs() < 1e-4);
    }
}
