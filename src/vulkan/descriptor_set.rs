use std::sync::Arc;

use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;
use ash::vk;

pub struct DescriptorSet {
    pub inner: vk::DescriptorSet,
}

impl DescriptorSet {
    pub fn new(
        context: Arc<Context>,
        descriptor_pool: vk::DescriptorPool,
        set_layout: vk::DescriptorSetLayout,
        write_descriptor_sets: &[WriteDescriptorSet],
    ) -> Self {
        let device = &context.device;
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(descriptor_pool)
            .set_layouts(std::slice::from_ref(&set_layout));

        let descriptor_set = unsafe {
            device
                .allocate_descriptor_sets(&allocate_info)
                .expect("Could not create descriptor set")
        }[0];

        let descriptor_set = Self {
            inner: descriptor_set,
        };
        descriptor_set.update(&context, write_descriptor_sets);
        descriptor_set
    }

    /// Rewrites some bindings, used when images are recreated after a resize.
    pub fn update(&self, context: &Context, write_descriptor_sets: &[WriteDescriptorSet]) {
        // the extension structs must outlive the writes that point at them
        let mut acceleration_structure_infos: Vec<_> = write_descriptor_sets
            .iter()
            .filter_map(|write| match &write.info {
                DescriptorInfo::AccelerationStructure(handle) => Some(
                    vk::WriteDescriptorSetAccelerationStructureKHR::builder()
                        .acceleration_structures(std::slice::from_ref(handle))
                        .build(),
                ),
                _ => None,
            })
            .collect();
        let mut acceleration_structure_infos = acceleration_structure_infos.iter_mut();

        let mut writes = Vec::with_capacity(write_descriptor_sets.len());
        for write in write_descriptor_sets {
            let mut vk_write = vk::WriteDescriptorSet::builder()
                .dst_binding(write.binding)
                .descriptor_type(write.info.descriptor_type())
                .dst_set(self.inner);

            match &write.info {
                DescriptorInfo::UniformBuffer(info) | DescriptorInfo::StorageBuffer(info) => {
                    vk_write = vk_write.buffer_info(std::slice::from_ref(info))
                }
                DescriptorInfo::StorageImage(info) => {
                    vk_write = vk_write.image_info(std::slice::from_ref(info))
                }
                DescriptorInfo::SampledImages(infos) => {
                    if infos.is_empty() {
                        continue;
                    }
                    vk_write = vk_write.image_info(infos)
                }
                DescriptorInfo::AccelerationStructure(_) => {
                    if let Some(info) = acceleration_structure_infos.next() {
                        vk_write = vk_write.push_next(info);
                        vk_write.descriptor_count = 1;
                    }
                }
            }
            writes.push(vk_write.build());
        }

        unsafe { context.device.update_descriptor_sets(&writes, &[]) };
    }
}

pub struct WriteDescriptorSet {
    binding: u32,
    info: DescriptorInfo,
}

pub enum DescriptorInfo {
    UniformBuffer(vk::DescriptorBufferInfo),
    StorageBuffer(vk::DescriptorBufferInfo),
    StorageImage(vk::DescriptorImageInfo),
    SampledImages(Vec<vk::DescriptorImageInfo>),
    AccelerationStructure(vk::AccelerationStructureKHR),
}

impl DescriptorInfo {
    pub fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            DescriptorInfo::UniformBuffer(_) => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorInfo::StorageBuffer(_) => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorInfo::StorageImage(_) => vk::DescriptorType::STORAGE_IMAGE,
            DescriptorInfo::SampledImages(_) => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            DescriptorInfo::AccelerationStructure(_) => {
                vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
            }
        }
    }
}

impl WriteDescriptorSet {
    pub fn binding(&self) -> u32 {
        self.binding
    }

    pub fn info(&self) -> &DescriptorInfo {
        &self.info
    }

    pub fn uniform_buffer<T: Copy>(binding: u32, buffer: &Buffer<T>) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::UniformBuffer(buffer.descriptor_info()),
        }
    }

    pub fn storage_buffer<T: Copy>(binding: u32, buffer: &Buffer<T>) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::StorageBuffer(buffer.descriptor_info()),
        }
    }

    /// Storage images are always bound in the general layout.
    pub fn storage_image(binding: u32, image_view: &ImageView) -> WriteDescriptorSet {
        let info = vk::DescriptorImageInfo::builder()
            .image_view(image_view.inner)
            .image_layout(vk::ImageLayout::GENERAL)
            .build();

        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::StorageImage(info),
        }
    }

    /// Binds the views as one array, element `i` of the array is `image_views[i]`.
    pub fn image_view_sampler_array(
        binding: u32,
        image_views: &[Arc<ImageView>],
        sampler: &Sampler,
    ) -> WriteDescriptorSet {
        let infos = image_views
            .iter()
            .map(|image_view| {
                vk::DescriptorImageInfo::builder()
                    .sampler(sampler.inner)
                    .image_view(image_view.inner)
                    .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .build()
            })
            .collect();

        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::SampledImages(infos),
        }
    }

    pub fn acceleration_structure(
        binding: u32,
        acceleration_structure: vk::AccelerationStructureKHR,
    ) -> WriteDescriptorSet {
        WriteDescriptorSet {
            binding,
            info: DescriptorInfo::AccelerationStructure(acceleration_structure),
        }
    }
}
