//! Per-frame input snapshot. Captured once at the top of the frame and
//! passed into the tick explicitly; nothing below the shell reads the
//! window state directly.

use raylib::prelude::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered jump (pressed this frame, not held).
    pub jump: bool,
    pub release_cursor: bool,
    pub grab_cursor: bool,
    pub toggle_pause: bool,
    pub toggle_wireframe: bool,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}

impl InputState {
    pub fn capture(rl: &RaylibHandle) -> Self {
        let md = rl.get_mouse_delta();
        Self {
            forward: rl.is_key_down(KeyboardKey::KEY_W),
            back: rl.is_key_down(KeyboardKey::KEY_S),
            left: rl.is_key_down(KeyboardKey::KEY_A),
            right: rl.is_key_down(KeyboardKey::KEY_D),
            jump: rl.is_key_pressed(KeyboardKey::KEY_SPACE),
            release_cursor: rl.is_key_pressed(KeyboardKey::KEY_ESCAPE),
            grab_cursor: rl.is_mouse_button_pressed(MouseButton::MOUSE_BUTTON_LEFT),
            toggle_pause: rl.is_key_pressed(KeyboardKey::KEY_O),
            toggle_wireframe: rl.is_key_pressed(KeyboardKey::KEY_I),
            mouse_dx: md.x,
            mouse_dy: md.y,
        }
    }
}
