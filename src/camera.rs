pub mod camera_controller;
pub mod freecam_controller;

use ultraviolet::{projection, Mat4, Vec3};

use self::camera_controller::CameraController;

#[derive(Debug)]
pub struct Camera {
    pub position: Vec3,
    /// Unit length view direction
    pub direction: Vec3,
    pub settings: CameraSettings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub z_near: f32,
    pub z_far: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect_ratio: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            z_near: 0.01,
            z_far: 100.0,
            fov: 45f32.to_radians(),
            aspect_ratio: 1.0,
        }
    }
}

impl Camera {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            position: Vec3::zero(),
            direction: Camera::forward(),
            settings,
        }
    }

    /// World space to view space
    pub fn view_matrix(&self) -> Mat4 {
        let target = self.position + self.direction;
        Mat4::look_at(self.position, target, Camera::up())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        projection::rh_yup::perspective_vk(
            self.settings.fov,
            self.settings.aspect_ratio,
            self.settings.z_near,
            self.settings.z_far,
        )
    }

    /// The ray generation shader turns pixels back into rays, so it only needs the inverses.
    pub fn inverse_view_matrix(&self) -> Mat4 {
        self.view_matrix().inversed()
    }

    pub fn inverse_projection_matrix(&self) -> Mat4 {
        self.projection_matrix().inversed()
    }

    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        self.settings.aspect_ratio = width as f32 / height.max(1) as f32;
    }

    pub fn update_camera(&mut self, controller: &impl CameraController) {
        self.position = controller.position();
        self.direction = controller.direction();
    }

    /// in world-space
    pub const fn forward() -> Vec3 {
        Vec3::new(0.0, 0.0, -1.0)
    }

    /// in world-space
    pub const fn right() -> Vec3 {
        Vec3::new(1.0, 0.0, 0.0)
    }

    /// in world-space
    pub const fn up() -> Vec3 {
        Vec3::new(0.0, 1.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultraviolet::Vec4;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).mag() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn inverse_view_maps_origin_to_eye() {
        let mut camera = Camera::new(CameraSettings::default());
        camera.position = Vec3::new(8.0, 2.0, 2.0);
        camera.direction = Vec3::new(-2.0, -0.25, -0.25).normalized();

        let eye = camera.inverse_view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_close(eye.xyz(), camera.position);

        let forward = camera.inverse_view_matrix() * Vec4::new(0.0, 0.0, -1.0, 0.0);
        assert_close(forward.xyz(), camera.direction);
    }

    #[test]
    fn screen_centre_looks_forward() {
        let mut camera = Camera::new(CameraSettings::default());
        camera.set_aspect_ratio(1280, 720);

        let target = camera.inverse_projection_matrix() * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let direction = (target.xyz() / target.w).normalized();
        assert_close(direction, Camera::forward());
    }

    #[test]
    fn top_of_the_screen_looks_up() {
        let camera = Camera::new(CameraSettings::default());
        // Vulkan clip space points y down
        let target = camera.inverse_projection_matrix() * Vec4::new(0.0, -1.0, 1.0, 1.0);
        assert!(target.y / target.w > 0.0);
    }

    #[test]
    fn aspect_ratio_survives_minimized_windows() {
        let mut camera = Camera::new(CameraSettings::default());
        camera.set_aspect_ratio(800, 0);
        assert!(camera.settings.aspect_ratio.is_finite());
    }
}
