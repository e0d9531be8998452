use std::sync::Arc;

use ash::vk;

use crate::vulkan::context::Context;

// Keep in sync with assets/shaders/bindings.glsl
pub const TOP_LEVEL_ACCELERATION_STRUCTURE: u32 = 0;
pub const ACCUMULATION_IMAGE: u32 = 1;
pub const OUTPUT_IMAGE: u32 = 2;
pub const UNIFORM_BUFFER: u32 = 3;
pub const VERTEX_BUFFER: u32 = 4;
pub const INDEX_BUFFER: u32 = 5;
pub const OFFSET_BUFFER: u32 = 6;
pub const MATERIAL_BUFFER: u32 = 7;
pub const TEXTURE_SAMPLERS: u32 = 8;

pub const BINDING_COUNT: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingSlot {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stages: vk::ShaderStageFlags,
}

/// Every slot of the ray tracing descriptor set. The texture array is sized to the scene.
pub fn binding_slots(texture_count: u32) -> [BindingSlot; BINDING_COUNT] {
    use vk::ShaderStageFlags as Stage;

    let slot = |binding, descriptor_type, stages| BindingSlot {
        binding,
        descriptor_type,
        descriptor_count: 1,
        stages,
    };
    let storage_buffer = |binding| {
        slot(
            binding,
            vk::DescriptorType::STORAGE_BUFFER,
            Stage::CLOSEST_HIT_KHR,
        )
    };

    [
        slot(
            TOP_LEVEL_ACCELERATION_STRUCTURE,
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            Stage::RAYGEN_KHR | Stage::CLOSEST_HIT_KHR,
        ),
        slot(
            ACCUMULATION_IMAGE,
            vk::DescriptorType::STORAGE_IMAGE,
            Stage::RAYGEN_KHR,
        ),
        slot(OUTPUT_IMAGE, vk::DescriptorType::STORAGE_IMAGE, Stage::RAYGEN_KHR),
        slot(
            UNIFORM_BUFFER,
            vk::DescriptorType::UNIFORM_BUFFER,
            Stage::RAYGEN_KHR | Stage::MISS_KHR | Stage::INTERSECTION_KHR | Stage::CLOSEST_HIT_KHR,
        ),
        storage_buffer(VERTEX_BUFFER),
        storage_buffer(INDEX_BUFFER),
        storage_buffer(OFFSET_BUFFER),
        slot(
            MATERIAL_BUFFER,
            vk::DescriptorType::STORAGE_BUFFER,
            Stage::INTERSECTION_KHR | Stage::CLOSEST_HIT_KHR,
        ),
        BindingSlot {
            binding: TEXTURE_SAMPLERS,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: texture_count,
            stages: Stage::CLOSEST_HIT_KHR,
        },
    ]
}

/// Pool sizes for one descriptor set per frame in flight. Empty descriptor types are left out.
pub fn pool_sizes(frame_count: u32, texture_count: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
    for slot in binding_slots(texture_count) {
        let descriptor_count = slot.descriptor_count * frame_count;
        if descriptor_count == 0 {
            continue;
        }
        match sizes.iter_mut().find(|size| size.ty == slot.descriptor_type) {
            Some(size) => size.descriptor_count += descriptor_count,
            None => sizes.push(vk::DescriptorPoolSize {
                ty: slot.descriptor_type,
                descriptor_count,
            }),
        }
    }
    sizes
}

pub struct DescriptorSetLayout {
    pub inner: vk::DescriptorSetLayout,
    context: Arc<Context>,
}

impl DescriptorSetLayout {
    pub fn new(context: Arc<Context>, texture_count: u32) -> Self {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = binding_slots(texture_count)
            .iter()
            .map(|slot| {
                vk::DescriptorSetLayoutBinding::builder()
                    .binding(slot.binding)
                    .descriptor_type(slot.descriptor_type)
                    .descriptor_count(slot.descriptor_count)
                    .stage_flags(slot.stages)
                    .build()
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

        let inner = unsafe {
            context
                .device
                .create_descriptor_set_layout(&create_info, None)
        }
        .expect("Could not create ray tracing descriptor set layout");

        Self { inner, context }
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_descriptor_set_layout(self.inner, None)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_dense_and_unique() {
        let slots = binding_slots(2);
        for (position, slot) in slots.iter().enumerate() {
            assert_eq!(slot.binding as usize, position);
        }
        assert_eq!(slots.len(), BINDING_COUNT);
    }

    #[test]
    fn slot_types() {
        let slots = binding_slots(3);
        assert_eq!(
            slots[TOP_LEVEL_ACCELERATION_STRUCTURE as usize].descriptor_type,
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
        );
        assert_eq!(
            slots[UNIFORM_BUFFER as usize].descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER
        );
        assert_eq!(
            slots[OUTPUT_IMAGE as usize].descriptor_type,
            vk::DescriptorType::STORAGE_IMAGE
        );
        for binding in [VERTEX_BUFFER, INDEX_BUFFER, OFFSET_BUFFER, MATERIAL_BUFFER] {
            assert_eq!(
                slots[binding as usize].descriptor_type,
                vk::DescriptorType::STORAGE_BUFFER
            );
        }
        assert_eq!(slots[TEXTURE_SAMPLERS as usize].descriptor_count, 3);
    }

    #[test]
    fn uniform_block_reaches_every_stage_that_shades() {
        let stages = binding_slots(0)[UNIFORM_BUFFER as usize].stages;
        assert!(stages.contains(vk::ShaderStageFlags::RAYGEN_KHR));
        assert!(stages.contains(vk::ShaderStageFlags::MISS_KHR));
        assert!(stages.contains(vk::ShaderStageFlags::INTERSECTION_KHR));
        assert!(stages.contains(vk::ShaderStageFlags::CLOSEST_HIT_KHR));
    }

    #[test]
    fn pool_sizes_scale_with_frames() {
        let sizes = pool_sizes(2, 3);
        let count = |ty| {
            sizes
                .iter()
                .find(|size| size.ty == ty)
                .map(|size| size.descriptor_count)
        };
        assert_eq!(count(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR), Some(2));
        assert_eq!(count(vk::DescriptorType::STORAGE_IMAGE), Some(4));
        assert_eq!(count(vk::DescriptorType::UNIFORM_BUFFER), Some(2));
        assert_eq!(count(vk::DescriptorType::STORAGE_BUFFER), Some(8));
        assert_eq!(count(vk::DescriptorType::COMBINED_IMAGE_SAMPLER), Some(6));
    }

    #[test]
    fn scenes_without_textures_skip_the_sampler_pool() {
        let sizes = pool_sizes(3, 0);
        assert!(sizes
            .iter()
            .all(|size| size.ty != vk::DescriptorType::COMBINED_IMAGE_SAMPLER));
        assert!(sizes.iter().all(|size| size.descriptor_count > 0));
    }
}
