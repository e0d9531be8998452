use std::sync::Arc;

use ash::vk;

use super::context::Context;

/// Sampler shared by every scene texture.
pub struct Sampler {
    pub inner: vk::Sampler,
    context: Arc<Context>,
}

impl Sampler {
    pub fn new_repeating_linear(context: Arc<Context>) -> Self {
        let max_anisotropy = context
            .physical_device_properties
            .limits
            .max_sampler_anisotropy
            .min(16.0);

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .compare_op(vk::CompareOp::ALWAYS)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);

        let inner = unsafe { context.device.create_sampler(&sampler_info, None) }
            .expect("Could not create sampler");

        Self { inner, context }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_sampler(self.inner, None);
        }
    }
}
