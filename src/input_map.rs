use ultraviolet::Vec2;
use winit::event::{MouseButton, VirtualKeyCode};

const NUM_KEYS: usize = VirtualKeyCode::Cut as usize + 1;
const NUM_MOUSE_BUTTONS: usize = 2;

/// Keys that move the camera, holding any of them restarts the accumulation
const CAMERA_KEYS: [VirtualKeyCode; 6] = [
    VirtualKeyCode::W,
    VirtualKeyCode::A,
    VirtualKeyCode::S,
    VirtualKeyCode::D,
    VirtualKeyCode::R,
    VirtualKeyCode::F,
];

pub struct InputMap {
    state: [bool; NUM_KEYS],
    mouse_state: [bool; NUM_MOUSE_BUTTONS],
    mouse_delta: Vec2,
}

impl Default for InputMap {
    fn default() -> Self {
        Self::new()
    }
}

impl InputMap {
    pub fn new() -> Self {
        InputMap {
            state: [false; NUM_KEYS],
            mouse_state: [false; NUM_MOUSE_BUTTONS],
            mouse_delta: Vec2::zero(),
        }
    }

    pub(crate) fn update_key_press(&mut self, key: VirtualKeyCode) {
        self.state[key as usize] = true;
    }

    pub(crate) fn update_key_release(&mut self, key: VirtualKeyCode) {
        self.state[key as usize] = false;
    }

    pub(crate) fn update_mouse_press(&mut self, button: MouseButton) {
        if let Some(index) = mouse_index(button) {
            self.mouse_state[index] = true;
        }
    }

    pub(crate) fn update_mouse_release(&mut self, button: MouseButton) {
        if let Some(index) = mouse_index(button) {
            self.mouse_state[index] = false;
        }
    }

    /// Releases everything, used when the window loses focus and misses the release events.
    pub(crate) fn release_all(&mut self) {
        self.state = [false; NUM_KEYS];
        self.mouse_state = [false; NUM_MOUSE_BUTTONS];
        self.mouse_delta = Vec2::zero();
    }

    pub fn clear_mouse_delta(&mut self) {
        self.mouse_delta = Vec2::zero();
    }

    pub(crate) fn accumulate_mouse_delta(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_pressed(&self, key: VirtualKeyCode) -> bool {
        self.state[key as usize]
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        mouse_index(button)
            .map(|index| self.mouse_state[index])
            .unwrap_or(false)
    }

    /// Whether the camera could change this frame: a movement key is held or the view is
    /// being dragged.
    pub fn is_camera_moving(&self) -> bool {
        CAMERA_KEYS.iter().any(|&key| self.is_pressed(key))
            || self.is_mouse_pressed(MouseButton::Left)
    }
}

fn mouse_index(button: MouseButton) -> Option<usize> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Right => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_move_the_camera() {
        let mut input = InputMap::new();
        assert!(!input.is_camera_moving());

        input.update_key_press(VirtualKeyCode::Q);
        assert!(!input.is_camera_moving());

        input.update_key_press(VirtualKeyCode::F);
        assert!(input.is_camera_moving());
        input.update_key_release(VirtualKeyCode::F);
        assert!(!input.is_camera_moving());
    }

    #[test]
    fn dragging_moves_the_camera() {
        let mut input = InputMap::new();
        input.update_mouse_press(MouseButton::Right);
        assert!(!input.is_camera_moving());
        input.update_mouse_press(MouseButton::Left);
        assert!(input.is_camera_moving());
        input.update_mouse_release(MouseButton::Left);
        assert!(!input.is_camera_moving());
    }

    #[test]
    fn mouse_delta_accumulates_until_cleared() {
        let mut input = InputMap::new();
        input.accumulate_mouse_delta(Vec2::new(1.0, 2.0));
        input.accumulate_mouse_delta(Vec2::new(3.0, -1.0));
        assert_eq!(input.mouse_delta(), Vec2::new(4.0, 1.0));
        input.clear_mouse_delta();
        assert_eq!(input.mouse_delta(), Vec2::zero());
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut input = InputMap::new();
        input.update_key_press(VirtualKeyCode::W);
        input.update_mouse_press(MouseButton::Middle);
        input.release_all();
        assert!(!input.is_pressed(VirtualKeyCode::W));
        assert!(!input.is_mouse_pressed(MouseButton::Middle));
    }
}
