use ultraviolet::Vec3;

pub trait CameraController {
    fn position(&self) -> Vec3;
    /// Unit length view direction
    fn direction(&self) -> Vec3;
}
