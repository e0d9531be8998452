use std::{ops::BitOr, sync::Arc};

use ash::vk::{
    self, AccessFlags2, Extent3D, Format, ImageCreateFlags, ImageLayout, ImageMemoryBarrier2,
    ImageSubresourceRange, ImageTiling, ImageType, ImageUsageFlags, PipelineStageFlags2,
    SampleCountFlags, SharingMode,
};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use log::warn;

use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;

pub struct Image {
    pub inner: vk::Image,
    allocation: Option<Allocation>,

    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub layout: vk::ImageLayout,
    pub mip_levels: u32,

    context: Arc<Context>,
}

impl Image {
    pub fn new(context: Arc<Context>, create_info: &vk::ImageCreateInfo) -> Image {
        let device = &context.device;

        let image =
            unsafe { device.create_image(create_info, None) }.expect("Could not create image");

        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let allocation = context
            .allocator()
            .allocate(&AllocationCreateDesc {
                name: "image",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .expect("Could not allocate memory for image");

        unsafe { device.bind_image_memory(image, allocation.memory(), allocation.offset()) }
            .expect("Could not bind image memory");

        Self {
            inner: image,
            allocation: Some(allocation),
            format: create_info.format,
            extent: create_info.extent,
            layout: create_info.initial_layout,
            mip_levels: create_info.mip_levels,
            context,
        }
    }

    /// Two dimensional image the ray generation shader writes to, kept in the general layout.
    pub fn new_storage(
        context: Arc<Context>,
        format: vk::Format,
        extent: vk::Extent2D,
        usage: vk::ImageUsageFlags,
    ) -> Image {
        let create_info = vk::ImageCreateInfo {
            format,
            extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            usage: usage | ImageUsageFlags::STORAGE,
            ..simple_image_create_info()
        };
        Image::new(context, &create_info)
    }

    /// Copies the base level out of `buffer` and blits the rest of the mip chain.
    pub fn copy_from_buffer_for_texture<T: Copy>(
        &mut self,
        command_buffer: vk::CommandBuffer,
        buffer: &Buffer<T>,
    ) {
        let num_levels = self.mip_levels;
        let device = &self.context.device;

        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            PipelineStageFlags2::NONE,
            PipelineStageFlags2::COPY,
            AccessFlags2::empty(),
            AccessFlags2::TRANSFER_WRITE,
            self.full_subresource_range(vk::ImageAspectFlags::COLOR),
        );

        let buffer_image_copy = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: color_layer(0),
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: self.extent,
        };

        unsafe {
            device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer.inner,
                self.inner,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&buffer_image_copy),
            )
        };

        for level in 1..num_levels {
            let src_size = Self::extent_to_offset(Self::mip_level(self.extent, level - 1));
            let dst_size = Self::extent_to_offset(Self::mip_level(self.extent, level));

            self.insert_image_memory_barrier(
                command_buffer,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                PipelineStageFlags2::ALL_TRANSFER,
                PipelineStageFlags2::BLIT,
                AccessFlags2::TRANSFER_WRITE,
                AccessFlags2::TRANSFER_READ,
                color_level(level - 1),
            );

            let blit = vk::ImageBlit::builder()
                .src_offsets([vk::Offset3D::default(), src_size])
                .src_subresource(color_layer(level - 1))
                .dst_offsets([vk::Offset3D::default(), dst_size])
                .dst_subresource(color_layer(level))
                .build();

            unsafe {
                device.cmd_blit_image(
                    command_buffer,
                    self.inner,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.inner,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    std::slice::from_ref(&blit),
                    vk::Filter::LINEAR,
                )
            }

            self.insert_image_memory_barrier(
                command_buffer,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                PipelineStageFlags2::BLIT,
                PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
                AccessFlags2::TRANSFER_READ,
                AccessFlags2::SHADER_READ,
                color_level(level - 1),
            );
        }

        self.insert_image_memory_barrier(
            command_buffer,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            PipelineStageFlags2::ALL_TRANSFER,
            PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
            AccessFlags2::TRANSFER_WRITE,
            AccessFlags2::SHADER_READ,
            color_level(num_levels - 1),
        );
        self.layout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    }

    /// Moves the whole image into `new_layout`, waiting on all earlier work
    pub fn transition_layout(
        &mut self,
        command_buffer: vk::CommandBuffer,
        new_layout: vk::ImageLayout,
    ) {
        self.insert_image_memory_barrier(
            command_buffer,
            self.layout,
            new_layout,
            PipelineStageFlags2::ALL_COMMANDS,
            PipelineStageFlags2::ALL_COMMANDS,
            AccessFlags2::MEMORY_WRITE,
            AccessFlags2::MEMORY_READ | AccessFlags2::MEMORY_WRITE,
            self.full_subresource_range(vk::ImageAspectFlags::COLOR),
        );
        self.layout = new_layout;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_stage_mask: PipelineStageFlags2,
        dst_stage_mask: PipelineStageFlags2,
        src_access_mask: vk::AccessFlags2,
        dst_access_mask: vk::AccessFlags2,
        subresource_range: ImageSubresourceRange,
    ) {
        image_memory_barrier(
            &self.context,
            command_buffer,
            self.inner,
            ImageMemoryBarrier2 {
                old_layout,
                new_layout,
                src_stage_mask,
                dst_stage_mask,
                src_access_mask,
                dst_access_mask,
                subresource_range,
                ..ImageMemoryBarrier2::default()
            },
        );
    }

    pub fn max_mip_levels(extent: vk::Extent3D) -> u32 {
        // The number of levels in a complete mipmap chain is:
        // ⌊log2(max(width_0, height_0, depth_0))⌋ + 1

        32 - [extent.width, extent.height, extent.depth]
            .into_iter()
            .fold(0, BitOr::bitor)
            .leading_zeros()
    }

    pub fn mip_level(base_extent: vk::Extent3D, level: u32) -> vk::Extent3D {
        Extent3D {
            width: (base_extent.width >> level).max(1),
            height: (base_extent.height >> level).max(1),
            depth: (base_extent.depth >> level).max(1),
        }
    }

    pub fn extent_to_offset(extent: vk::Extent3D) -> vk::Offset3D {
        vk::Offset3D {
            x: extent.width as i32,
            y: extent.height as i32,
            z: extent.depth as i32,
        }
    }

    pub fn full_subresource_range(
        &self,
        aspect_mask: vk::ImageAspectFlags,
    ) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

/// Records a layout transition for any image, including swapchain images we do not own.
/// Queue family indices are filled in, everything else comes from `barrier`.
pub fn image_memory_barrier(
    context: &Context,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    barrier: ImageMemoryBarrier2,
) {
    let barrier = ImageMemoryBarrier2 {
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        ..barrier
    };

    let dependency_info =
        vk::DependencyInfo::builder().image_memory_barriers(std::slice::from_ref(&barrier));

    unsafe {
        context
            .synchronisation2_loader
            .cmd_pipeline_barrier2(command_buffer, &dependency_info)
    };
}

pub fn color_subresource_range() -> ImageSubresourceRange {
    ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_level(level: u32) -> ImageSubresourceRange {
    ImageSubresourceRange {
        base_mip_level: level,
        ..color_subresource_range()
    }
}

pub fn color_layer(level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level: level,
        base_array_layer: 0,
        layer_count: 1,
    }
}

pub fn simple_image_create_info() -> vk::ImageCreateInfo {
    vk::ImageCreateInfo {
        flags: ImageCreateFlags::empty(),
        image_type: ImageType::TYPE_2D,
        format: Format::UNDEFINED,
        extent: Extent3D {
            width: 0,
            height: 0,
            depth: 0,
        },
        mip_levels: 1,
        array_layers: 1,
        samples: SampleCountFlags::TYPE_1,
        tiling: ImageTiling::OPTIMAL,
        usage: ImageUsageFlags::empty(),
        sharing_mode: SharingMode::EXCLUSIVE,
        initial_layout: ImageLayout::UNDEFINED,
        ..Default::default()
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image(self.inner, None) };
        if let Some(allocation) = self.allocation.take() {
            if let Err(error) = self.context.allocator().free(allocation) {
                warn!("Could not free image memory: {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_length() {
        let extent = |width, height| Extent3D {
            width,
            height,
            depth: 1,
        };
        assert_eq!(Image::max_mip_levels(extent(1, 1)), 1);
        assert_eq!(Image::max_mip_levels(extent(2048, 1024)), 12);
        assert_eq!(Image::max_mip_levels(extent(300, 200)), 9);
    }

    #[test]
    fn mip_levels_never_reach_zero() {
        let base = Extent3D {
            width: 8,
            height: 2,
            depth: 1,
        };
        assert_eq!(
            Image::mip_level(base, 2),
            Extent3D {
                width: 2,
                height: 1,
                depth: 1
            }
        );
    }
}
