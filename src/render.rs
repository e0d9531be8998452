pub mod acceleration;
pub mod accumulator;
pub mod bindings;
pub mod pipeline;
pub mod shader_binding_table;
pub mod shader_groups;
pub mod shader_types;

use std::sync::Arc;

use ash::vk::{self, AccessFlags2, ImageLayout, PipelineStageFlags2};
use crevice::std140::AsStd140;
use gpu_allocator::MemoryLocation;
use log::{debug, info};
use ultraviolet::{Vec3, Vec4};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::scene::Scene;
use crate::scene_uploader::GpuScene;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::context::Context;
use crate::vulkan::descriptor_set::{DescriptorSet, WriteDescriptorSet};
use crate::vulkan::image::{color_layer, color_subresource_range, image_memory_barrier, Image};
use crate::vulkan::image_view::ImageView;
use crate::vulkan::swapchain::SwapchainContainer;

use self::accumulator::FrameAccumulator;
use self::bindings::DescriptorSetLayout;
use self::pipeline::{RayTracingPipeline, PUSH_CONSTANT_STAGES};
use self::shader_binding_table::ShaderBindingTable;
use self::shader_types::{PushConstants, Std140UniformBufferObject, UniformBufferObject};

/// Running sum of all samples, in full float precision
pub const ACCUMULATION_FORMAT: vk::Format = vk::Format::R32G32B32A32_SFLOAT;

#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SwapchainIndex(usize);
impl SwapchainIndex {
    pub fn new(index: usize) -> SwapchainIndex {
        SwapchainIndex(index)
    }
}

/// Per frame in flight: the uniform block and the descriptor set that points at it.
struct FrameResources {
    uniform_buffer: Buffer<Std140UniformBufferObject>,
    descriptor_set: DescriptorSet,
}

/// Images the ray generation shader writes, shared by every frame in flight.
struct StorageImages {
    accumulation: ImageView,
    output: ImageView,
}

impl StorageImages {
    fn new(command_pool: &CommandPool, extent: vk::Extent2D, output_format: vk::Format) -> Self {
        let context = command_pool.context();
        let mut accumulation = Image::new_storage(
            context.clone(),
            ACCUMULATION_FORMAT,
            extent,
            vk::ImageUsageFlags::empty(),
        );
        let mut output = Image::new_storage(
            context.clone(),
            output_format,
            extent,
            vk::ImageUsageFlags::TRANSFER_SRC,
        );

        command_pool.one_time_submit(|command_buffer| {
            accumulation.transition_layout(command_buffer, ImageLayout::GENERAL);
            output.transition_layout(command_buffer, ImageLayout::GENERAL);
        });
        debug!(
            "Storage images of {}x{}, output format {:?}",
            extent.width, extent.height, output_format
        );

        Self {
            accumulation: ImageView::new_color(context.clone(), accumulation),
            output: ImageView::new_color(context.clone(), output),
        }
    }

    fn descriptor_writes(&self) -> [WriteDescriptorSet; 2] {
        [
            WriteDescriptorSet::storage_image(bindings::ACCUMULATION_IMAGE, &self.accumulation),
            WriteDescriptorSet::storage_image(bindings::OUTPUT_IMAGE, &self.output),
        ]
    }

    fn extent(&self) -> vk::Extent2D {
        self.output.extent_2d()
    }
}

/// Which image a barrier of the present sequence applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BarrierTarget {
    Accumulation,
    Output,
    Swapchain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LayoutTransition {
    target: BarrierTarget,
    old_layout: ImageLayout,
    new_layout: ImageLayout,
    src_stage_mask: PipelineStageFlags2,
    src_access_mask: AccessFlags2,
    dst_stage_mask: PipelineStageFlags2,
    dst_access_mask: AccessFlags2,
}

/// The previous frame may still be blending into the accumulation image.
const BEFORE_TRACE: [LayoutTransition; 1] = [LayoutTransition {
    target: BarrierTarget::Accumulation,
    old_layout: ImageLayout::GENERAL,
    new_layout: ImageLayout::GENERAL,
    src_stage_mask: PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    src_access_mask: AccessFlags2::SHADER_STORAGE_WRITE,
    dst_stage_mask: PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
    dst_access_mask: AccessFlags2::from_raw(
        AccessFlags2::SHADER_STORAGE_READ.as_raw() | AccessFlags2::SHADER_STORAGE_WRITE.as_raw(),
    ),
}];

const BEFORE_COPY: [LayoutTransition; 2] = [
    LayoutTransition {
        target: BarrierTarget::Swapchain,
        old_layout: ImageLayout::UNDEFINED,
        new_layout: ImageLayout::TRANSFER_DST_OPTIMAL,
        // chains with the acquire semaphore, which is waited on in the copy stage
        src_stage_mask: PipelineStageFlags2::COPY,
        src_access_mask: AccessFlags2::NONE,
        dst_stage_mask: PipelineStageFlags2::COPY,
        dst_access_mask: AccessFlags2::TRANSFER_WRITE,
    },
    LayoutTransition {
        target: BarrierTarget::Output,
        old_layout: ImageLayout::GENERAL,
        new_layout: ImageLayout::TRANSFER_SRC_OPTIMAL,
        src_stage_mask: PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        src_access_mask: AccessFlags2::SHADER_STORAGE_WRITE,
        dst_stage_mask: PipelineStageFlags2::COPY,
        dst_access_mask: AccessFlags2::TRANSFER_READ,
    },
];

const AFTER_COPY: [LayoutTransition; 2] = [
    LayoutTransition {
        target: BarrierTarget::Swapchain,
        old_layout: ImageLayout::TRANSFER_DST_OPTIMAL,
        new_layout: ImageLayout::PRESENT_SRC_KHR,
        src_stage_mask: PipelineStageFlags2::COPY,
        src_access_mask: AccessFlags2::TRANSFER_WRITE,
        dst_stage_mask: PipelineStageFlags2::NONE,
        dst_access_mask: AccessFlags2::NONE,
    },
    LayoutTransition {
        target: BarrierTarget::Output,
        old_layout: ImageLayout::TRANSFER_SRC_OPTIMAL,
        new_layout: ImageLayout::GENERAL,
        src_stage_mask: PipelineStageFlags2::COPY,
        src_access_mask: AccessFlags2::TRANSFER_READ,
        dst_stage_mask: PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        dst_access_mask: AccessFlags2::SHADER_STORAGE_WRITE,
    },
];

/// Traces the scene into the storage images and copies the result into the swapchain.
pub struct RayTracingRenderer {
    context: Arc<Context>,
    descriptor_pool: vk::DescriptorPool,
    frames: Vec<FrameResources>,
    storage_images: StorageImages,
    shader_binding_table: ShaderBindingTable,
    pipeline: RayTracingPipeline,
    set_layout: DescriptorSetLayout,
    accumulator: FrameAccumulator,
    push_constants: PushConstants,
}

impl RayTracingRenderer {
    pub fn new(
        command_pool: &CommandPool,
        gpu_scene: &GpuScene,
        swapchain: &SwapchainContainer,
        frame_count: usize,
        push_constants: PushConstants,
    ) -> Result<Self, RenderError> {
        let context = command_pool.context().clone();
        let texture_count = gpu_scene.texture_count();

        let set_layout = DescriptorSetLayout::new(context.clone(), texture_count);
        let pipeline = RayTracingPipeline::new(context.clone(), set_layout.inner)?;
        let shader_binding_table = ShaderBindingTable::new(context.clone(), pipeline.inner);

        let descriptor_pool = create_descriptor_pool(&context, frame_count as u32, texture_count);
        let storage_images =
            StorageImages::new(command_pool, swapchain.extent, swapchain.storage_format());

        let frames = (0..frame_count)
            .map(|_| {
                let uniform_buffer = Buffer::new(
                    context.clone(),
                    UniformBufferObject::std140_size_static() as u64,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                );

                let mut writes = gpu_scene.descriptor_writes();
                writes.extend(storage_images.descriptor_writes());
                writes.push(WriteDescriptorSet::uniform_buffer(
                    bindings::UNIFORM_BUFFER,
                    &uniform_buffer,
                ));
                let descriptor_set = DescriptorSet::new(
                    context.clone(),
                    descriptor_pool,
                    set_layout.inner,
                    &writes,
                );

                FrameResources {
                    uniform_buffer,
                    descriptor_set,
                }
            })
            .collect();

        info!(
            "Ray tracing renderer ready with {} frames in flight and {} textures",
            frame_count, texture_count
        );

        Ok(Self {
            context,
            descriptor_pool,
            frames,
            storage_images,
            shader_binding_table,
            pipeline,
            set_layout,
            accumulator: FrameAccumulator::new(),
            push_constants,
        })
    }

    pub fn accumulated_samples(&self) -> u32 {
        self.accumulator.sample_count()
    }

    /// Recreates the storage images at the new swapchain size and starts accumulating again.
    /// The caller waits for the device to go idle first.
    pub fn resize(&mut self, command_pool: &CommandPool, swapchain: &SwapchainContainer) {
        self.storage_images = StorageImages::new(
            command_pool,
            swapchain.extent,
            swapchain.storage_format(),
        );
        let writes = self.storage_images.descriptor_writes();
        for frame in &self.frames {
            frame.descriptor_set.update(&self.context, &writes);
        }
        self.accumulator.reset();
        debug!(
            "Renderer resized to {}x{}",
            swapchain.extent.width, swapchain.extent.height
        );
    }

    /// Writes the uniform block of `frame_index` and advances the sample count.
    pub fn update_uniforms(
        &mut self,
        frame_index: usize,
        camera: &Camera,
        scene: &Scene,
        camera_moved: bool,
    ) {
        let accumulated_samples = self
            .accumulator
            .advance(camera_moved, scene.accumulate_frames());

        let uniforms = UniformBufferObject {
            inverse_view: camera.inverse_view_matrix(),
            inverse_projection: camera.inverse_projection_matrix(),
            horizon_color: color_vec4(scene.horizon_color()),
            zenith_color: color_vec4(scene.zenith_color()),
            accumulated_samples,
        };

        self.frames[frame_index]
            .uniform_buffer
            .copy_data(std::slice::from_ref(&uniforms.as_std140()));
    }

    /// Records one frame into `command_buffer`: the trace and the copy into the swapchain image.
    pub fn record(
        &self,
        command_buffer: vk::CommandBuffer,
        frame_index: usize,
        swapchain: &SwapchainContainer,
        swapchain_index: SwapchainIndex,
    ) {
        let device = &self.context.device;
        let swapchain_image = swapchain.images[swapchain_index.0];
        let extent = self.storage_images.extent();

        self.insert_transitions(command_buffer, swapchain_image, &BEFORE_TRACE);

        unsafe {
            device.cmd_push_constants(
                command_buffer,
                self.pipeline.layout,
                PUSH_CONSTANT_STAGES,
                0,
                bytemuck::bytes_of(&self.push_constants),
            );
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                self.pipeline.inner,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                self.pipeline.layout,
                0,
                std::slice::from_ref(&self.frames[frame_index].descriptor_set.inner),
                &[],
            );

            let regions = self.shader_binding_table.regions();
            self.context
                .context_raytracing
                .ray_tracing_pipeline
                .cmd_trace_rays(
                    command_buffer,
                    &regions.raygen,
                    &regions.miss,
                    &regions.hit,
                    &regions.callable,
                    extent.width,
                    extent.height,
                    1,
                );
        }

        self.insert_transitions(command_buffer, swapchain_image, &BEFORE_COPY);

        let copy_region = vk::ImageCopy {
            src_subresource: color_layer(0),
            src_offset: vk::Offset3D::default(),
            dst_subresource: color_layer(0),
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D {
                width: extent.width.min(swapchain.extent.width),
                height: extent.height.min(swapchain.extent.height),
                depth: 1,
            },
        };
        unsafe {
            device.cmd_copy_image(
                command_buffer,
                self.storage_images.output.image.inner,
                ImageLayout::TRANSFER_SRC_OPTIMAL,
                swapchain_image,
                ImageLayout::TRANSFER_DST_OPTIMAL,
                std::slice::from_ref(&copy_region),
            )
        };

        self.insert_transitions(command_buffer, swapchain_image, &AFTER_COPY);
    }

    fn insert_transitions(
        &self,
        command_buffer: vk::CommandBuffer,
        swapchain_image: vk::Image,
        transitions: &[LayoutTransition],
    ) {
        for transition in transitions {
            let image = match transition.target {
                BarrierTarget::Accumulation => self.storage_images.accumulation.image.inner,
                BarrierTarget::Output => self.storage_images.output.image.inner,
                BarrierTarget::Swapchain => swapchain_image,
            };
            image_memory_barrier(
                &self.context,
                command_buffer,
                image,
                vk::ImageMemoryBarrier2 {
                    old_layout: transition.old_layout,
                    new_layout: transition.new_layout,
                    src_stage_mask: transition.src_stage_mask,
                    src_access_mask: transition.src_access_mask,
                    dst_stage_mask: transition.dst_stage_mask,
                    dst_access_mask: transition.dst_access_mask,
                    subresource_range: color_subresource_range(),
                    ..Default::default()
                },
            );
        }
    }
}

fn color_vec4(color: Vec3) -> Vec4 {
    Vec4::new(color.x, color.y, color.z, 0.0)
}

fn create_descriptor_pool(
    context: &Context,
    frame_count: u32,
    texture_count: u32,
) -> vk::DescriptorPool {
    let pool_sizes = bindings::pool_sizes(frame_count, texture_count);
    let create_info = vk::DescriptorPoolCreateInfo::builder()
        .pool_sizes(&pool_sizes)
        .max_sets(frame_count);

    unsafe { context.device.create_descriptor_pool(&create_info, None) }
        .expect("Could not create descriptor pool")
}

impl Drop for RayTracingRenderer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device
                .destroy_descriptor_pool(self.descriptor_pool, None)
        };
    }
}
