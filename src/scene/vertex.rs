use ash::vk;
use bytemuck::{Pod, Zeroable};
use ultraviolet::{Vec2, Vec3};

use crate::offset_of;

/// One entry of the shared vertex buffer. Shaders read it as a plain float array, so the
/// layout must stay tightly packed.
#[derive(Clone, Debug, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub const STRIDE: vk::DeviceSize = std::mem::size_of::<Self>() as vk::DeviceSize;

    pub fn new(position: Vec3, normal: Vec3, color: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            color: color.into(),
            tex_coord: tex_coord.into(),
        }
    }

    /// Where the acceleration structure builder finds the position inside a vertex
    pub fn position_format() -> (vk::Format, vk::DeviceSize) {
        (
            vk::Format::R32G32B32_SFLOAT,
            offset_of!(Self, position) as vk::DeviceSize,
        )
    }
}
