use bytemuck::{Pod, Zeroable};
use crevice::std140::AsStd140;
use ultraviolet::{Mat4, Vec4};

#[derive(AsStd140)]
pub struct UniformBufferObject {
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub horizon_color: Vec4,
    pub zenith_color: Vec4,
    /// Samples already blended into the accumulation image
    pub accumulated_samples: u32,
}

/// Path tracing settings for the ray generation and miss stages.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PushConstants {
    pub min_bounces: u32,
    pub max_bounces: u32,
    pub lens_aperture: f32,
    pub lens_focal_length: f32,
}

impl PushConstants {
    pub const SIZE: u32 = std::mem::size_of::<Self>() as u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constants_fit_the_minimum_guaranteed_limit() {
        // every Vulkan device offers at least 128 bytes
        assert_eq!(PushConstants::SIZE, 16);
        assert!(PushConstants::SIZE <= 128);
    }

    #[test]
    fn uniform_block_layout() {
        let size = std::mem::size_of::<<UniformBufferObject as AsStd140>::Output>();
        // two matrices, two colors, then the sample count
        assert!(size >= 64 + 64 + 16 + 16 + 4);
    }
}
