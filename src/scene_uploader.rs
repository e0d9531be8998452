use std::sync::Arc;

use ash::vk::{self, ImageUsageFlags};
use gpu_allocator::MemoryLocation;
use log::info;

use crate::error::RenderError;
use crate::loader::{self, LoadedImage};
use crate::render::acceleration::{GeometryAddresses, SceneAccelerationStructures};
use crate::render::bindings;
use crate::scene::{Aabb, MaterialRecord, Scene, TextureResource, Vertex};
use crate::scene_packer::{self, Offset, PackedScene};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::descriptor_set::WriteDescriptorSet;
use crate::vulkan::image::{simple_image_create_info, Image};
use crate::vulkan::image_view::ImageView;
use crate::vulkan::sampler::Sampler;

/// Format every scene texture is decoded to
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Everything the shaders read about the scene, resident on the device.
/// Shared read-only by all frames in flight.
pub struct GpuScene {
    pub vertex_buffer: Buffer<Vertex>,
    pub index_buffer: Buffer<u32>,
    pub offset_buffer: Buffer<Offset>,
    pub material_buffer: Buffer<MaterialRecord>,
    /// Only exists when the scene has procedural models
    pub aabb_buffer: Option<Buffer<Aabb>>,
    pub textures: Vec<Arc<ImageView>>,
    pub sampler: Sampler,
    pub acceleration_structures: SceneAccelerationStructures,
}

impl GpuScene {
    /// Packs the scene, uploads it and builds the acceleration structures. Blocks until
    /// every transfer and build has finished.
    pub fn upload(command_pool: &CommandPool, scene: &Scene) -> Result<Self, RenderError> {
        let context = command_pool.context().clone();
        let packed = scene_packer::pack(scene);

        // the geometry buffers double as build inputs for the bottom level structures
        let geometry_usage = vk::BufferUsageFlags::STORAGE_BUFFER
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
            | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR;

        let vertex_buffer =
            Buffer::new_device_local(command_pool, geometry_usage, &packed.vertices);
        let index_buffer = Buffer::new_device_local(command_pool, geometry_usage, &packed.indices);
        let offset_buffer = Buffer::new_device_local(
            command_pool,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            &packed.offsets,
        );
        let material_buffer = Buffer::new_device_local(
            command_pool,
            vk::BufferUsageFlags::STORAGE_BUFFER,
            &packed.materials,
        );
        let aabb_buffer = packed
            .has_procedural_geometry()
            .then(|| Buffer::new_device_local(command_pool, geometry_usage, &packed.aabbs));

        let addresses = geometry_addresses(&vertex_buffer, &index_buffer, aabb_buffer.as_ref());
        let acceleration_structures =
            SceneAccelerationStructures::build(command_pool, scene, &packed, &addresses)?;

        let textures = scene
            .textures()
            .iter()
            .map(|texture| upload_texture(command_pool, texture))
            .collect::<Result<Vec<_>, _>>()?;
        let sampler = Sampler::new_repeating_linear(context);

        log_upload(&packed, textures.len());

        Ok(Self {
            vertex_buffer,
            index_buffer,
            offset_buffer,
            material_buffer,
            aabb_buffer,
            textures,
            sampler,
            acceleration_structures,
        })
    }

    pub fn texture_count(&self) -> u32 {
        self.textures.len() as u32
    }

    /// Descriptor writes for every binding that does not change with the window size or frame.
    pub fn descriptor_writes(&self) -> Vec<WriteDescriptorSet> {
        vec![
            WriteDescriptorSet::acceleration_structure(
                bindings::TOP_LEVEL_ACCELERATION_STRUCTURE,
                self.acceleration_structures.top_level(),
            ),
            WriteDescriptorSet::storage_buffer(bindings::VERTEX_BUFFER, &self.vertex_buffer),
            WriteDescriptorSet::storage_buffer(bindings::INDEX_BUFFER, &self.index_buffer),
            WriteDescriptorSet::storage_buffer(bindings::OFFSET_BUFFER, &self.offset_buffer),
            WriteDescriptorSet::storage_buffer(bindings::MATERIAL_BUFFER, &self.material_buffer),
            WriteDescriptorSet::image_view_sampler_array(
                bindings::TEXTURE_SAMPLERS,
                &self.textures,
                &self.sampler,
            ),
        ]
    }
}

fn geometry_addresses(
    vertex_buffer: &Buffer<Vertex>,
    index_buffer: &Buffer<u32>,
    aabb_buffer: Option<&Buffer<Aabb>>,
) -> GeometryAddresses {
    GeometryAddresses {
        vertices: vertex_buffer.get_device_address(),
        indices: index_buffer.get_device_address(),
        aabbs: aabb_buffer
            .map(|buffer| buffer.get_device_address())
            .unwrap_or(0),
    }
}

fn texture_create_info(image: &LoadedImage) -> vk::ImageCreateInfo {
    let extent = vk::Extent3D {
        width: image.width,
        height: image.height,
        depth: 1,
    };
    vk::ImageCreateInfo {
        format: TEXTURE_FORMAT,
        extent,
        mip_levels: Image::max_mip_levels(extent),
        usage: ImageUsageFlags::SAMPLED
            | ImageUsageFlags::TRANSFER_DST
            | ImageUsageFlags::TRANSFER_SRC,
        ..simple_image_create_info()
    }
}

fn upload_texture(
    command_pool: &CommandPool,
    texture: &TextureResource,
) -> Result<Arc<ImageView>, RenderError> {
    let context = command_pool.context().clone();
    let loaded_image = loader::load_image_file(&texture.path)?;

    let staging_buffer: Buffer<u8> = Buffer::new(
        context.clone(),
        loaded_image.bytes.len() as vk::DeviceSize,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
    );
    staging_buffer.copy_data(&loaded_image.bytes);

    let mut image = Image::new(context.clone(), &texture_create_info(&loaded_image));
    command_pool.one_time_submit(|command_buffer| {
        image.copy_from_buffer_for_texture(command_buffer, &staging_buffer)
    });

    info!(
        "Uploaded texture '{}' into slot {} ({}x{}, {} mip levels)",
        texture.name,
        texture.id.slot(),
        loaded_image.width,
        loaded_image.height,
        image.mip_levels
    );

    Ok(Arc::new(ImageView::new_color(context, image)))
}

fn log_upload(packed: &PackedScene, texture_count: usize) {
    info!(
        "Uploaded scene: {} vertices, {} indices, {} instances, {} procedural boxes, {} textures",
        packed.vertices.len(),
        packed.indices.len(),
        packed.offsets.len(),
        packed.aabbs.len(),
        texture_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textures_get_a_full_mip_chain() {
        let image = LoadedImage {
            width: 2048,
            height: 1024,
            bytes: Vec::new(),
        };
        let create_info = texture_create_info(&image);
        assert_eq!(create_info.format, TEXTURE_FORMAT);
        assert_eq!(create_info.mip_levels, 12);
        assert_eq!(create_info.extent.depth, 1);
        assert!(create_info
            .usage
            .contains(ImageUsageFlags::TRANSFER_SRC | ImageUsageFlags::SAMPLED));
    }
}
