use ultraviolet::Vec3;
use winit::event::{MouseButton, VirtualKeyCode};

use crate::input_map::InputMap;

use super::{camera_controller::CameraController, Camera};

/// Flies through the scene. W/A/S/D move in the horizontal plane, R/F move up and down and
/// dragging with the left mouse button turns the camera.
pub struct FreecamController {
    pub position: Vec3,
    /// Radians above the horizon
    pub pitch: f32,
    /// Radians turned to the left of -z
    pub yaw: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl FreecamController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            position: Vec3::zero(),
            pitch: 0.0,
            yaw: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Starts at `position` looking along `direction`, which does not need to be normalized.
    pub fn looking_at(position: Vec3, direction: Vec3, speed: f32, sensitivity: f32) -> Self {
        let (pitch, yaw) = angles_from_direction(direction);
        Self {
            position,
            pitch,
            yaw,
            speed,
            sensitivity,
        }
    }

    pub fn update(&mut self, input_map: &InputMap, delta_time: f32) {
        // Update orientation
        if input_map.is_mouse_pressed(MouseButton::Left) {
            let mouse_delta = input_map.mouse_delta();
            let max_pitch = 88f32.to_radians();
            self.yaw -= mouse_delta.x * self.sensitivity;
            self.pitch =
                (self.pitch - mouse_delta.y * self.sensitivity).clamp(-max_pitch, max_pitch);
        }

        // Update position
        let direction = input_to_direction(input_map);
        let horizontal_movement = normalize_if_not_zero(direction * Vec3::new(1.0, 0.0, 1.0));
        let vertical_movement = Camera::up() * direction.y;
        let horizontal_movement = rotate_by_yaw(horizontal_movement, self.yaw);

        self.position += horizontal_movement * self.speed * delta_time;
        self.position += vertical_movement * self.speed * delta_time;
    }
}

impl CameraController for FreecamController {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn direction(&self) -> Vec3 {
        let horizontal = rotate_by_yaw(Camera::forward(), self.yaw) * self.pitch.cos();
        horizontal + Camera::up() * self.pitch.sin()
    }
}

fn angles_from_direction(direction: Vec3) -> (f32, f32) {
    let direction = normalize_if_not_zero(direction);
    if direction == Vec3::zero() {
        return (0.0, 0.0);
    }
    let pitch = direction.y.clamp(-1.0, 1.0).asin();
    let yaw = (-direction.x).atan2(-direction.z);
    (pitch, yaw)
}

/// Turns a vector about the y axis, a positive yaw turns -z towards -x.
fn rotate_by_yaw(vector: Vec3, yaw: f32) -> Vec3 {
    let (sin, cos) = yaw.sin_cos();
    Vec3::new(
        vector.x * cos + vector.z * sin,
        vector.y,
        vector.z * cos - vector.x * sin,
    )
}

fn input_to_direction(input: &InputMap) -> Vec3 {
    let mut direction = Vec3::zero();
    if input.is_pressed(VirtualKeyCode::W) {
        direction += Camera::forward();
    }
    if input.is_pressed(VirtualKeyCode::S) {
        direction -= Camera::forward();
    }

    if input.is_pressed(VirtualKeyCode::D) {
        direction += Camera::right();
    }
    if input.is_pressed(VirtualKeyCode::A) {
        direction -= Camera::right();
    }

    if input.is_pressed(VirtualKeyCode::R) {
        direction += Camera::up();
    }
    if input.is_pressed(VirtualKeyCode::F) {
        direction -= Camera::up();
    }
    direction
}

fn normalize_if_not_zero(vector: Vec3) -> Vec3 {
    let length_squared = vector.mag_sq();
    if length_squared.abs() < 0.001 {
        Vec3::zero()
    } else {
        vector.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::Vec2;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).mag() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn direction_round_trips_through_angles() {
        let direction = Vec3::new(-2.0, -0.25, -0.5);
        let controller = FreecamController::looking_at(Vec3::zero(), direction, 1.0, 1.0);
        assert_close(controller.direction(), direction.normalized());
    }

    #[test]
    fn default_controller_looks_forward() {
        let controller = FreecamController::new(1.0, 1.0);
        assert_close(controller.direction(), Camera::forward());
    }

    #[test]
    fn walking_forward_follows_the_yaw_only() {
        let mut controller =
            FreecamController::looking_at(Vec3::zero(), Vec3::new(1.0, -1.0, 0.0), 2.0, 1.0);
        let mut input = InputMap::new();
        input.update_key_press(VirtualKeyCode::W);

        controller.update(&input, 0.5);
        assert_close(controller.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn r_and_f_move_vertically() {
        let mut controller = FreecamController::new(1.0, 1.0);
        let mut input = InputMap::new();
        input.update_key_press(VirtualKeyCode::R);
        controller.update(&input, 1.0);
        assert_close(controller.position, Camera::up());

        input.update_key_release(VirtualKeyCode::R);
        input.update_key_press(VirtualKeyCode::F);
        controller.update(&input, 3.0);
        assert_close(controller.position, Camera::up() * -2.0);
    }

    #[test]
    fn mouse_only_turns_while_dragging() {
        let mut controller = FreecamController::new(1.0, 0.01);
        let mut input = InputMap::new();
        input.accumulate_mouse_delta(Vec2::new(10.0, 0.0));
        controller.update(&input, 1.0);
        assert_eq!(controller.yaw, 0.0);

        input.update_mouse_press(MouseButton::Left);
        controller.update(&input, 1.0);
        assert!((controller.yaw + 0.1).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controller = FreecamController::new(1.0, 1.0);
        let mut input = InputMap::new();
        input.update_mouse_press(MouseButton::Left);
        input.accumulate_mouse_delta(Vec2::new(0.0, -100.0));
        controller.update(&input, 1.0);
        assert!((controller.pitch - 88f32.to_radians()).abs() < 1e-6);
    }
}
