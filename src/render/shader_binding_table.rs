use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use log::info;

use super::shader_groups::ShaderGroup;
use crate::utility::{aligned_device_address, aligned_size};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::context::Context;

/// Where each shader group handle lives inside the binding table.
///
/// Every entry occupies `entry_stride` bytes: the handle followed by zero padding up to the
/// base alignment of shader groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderBindingTableLayout {
    handle_size: u32,
    entry_stride: u32,
    group_count: u32,
}

impl ShaderBindingTableLayout {
    pub fn new(handle_size: u32, base_alignment: u32, group_count: u32) -> Self {
        Self {
            handle_size,
            entry_stride: aligned_size(handle_size, base_alignment),
            group_count,
        }
    }

    pub fn handle_size(&self) -> u32 {
        self.handle_size
    }

    pub fn entry_stride(&self) -> u32 {
        self.entry_stride
    }

    pub fn table_size(&self) -> vk::DeviceSize {
        self.group_count as vk::DeviceSize * self.entry_stride as vk::DeviceSize
    }

    pub fn offset(&self, group: ShaderGroup) -> vk::DeviceSize {
        group.index() as vk::DeviceSize * self.entry_stride as vk::DeviceSize
    }

    /// Copies tightly packed handles, as returned by the driver, into their aligned slots.
    pub fn pack(&self, handles: &[u8]) -> Vec<u8> {
        let handle_size = self.handle_size as usize;
        let stride = self.entry_stride as usize;
        assert_eq!(handles.len(), self.group_count as usize * handle_size);

        let mut table = vec![0u8; self.table_size() as usize];
        for (group, handle) in handles.chunks_exact(handle_size).enumerate() {
            table[group * stride..group * stride + handle_size].copy_from_slice(handle);
        }
        table
    }

    pub fn regions(&self, table_address: vk::DeviceAddress) -> ShaderBindingRegions {
        let stride = self.entry_stride as vk::DeviceSize;
        let region = |first: ShaderGroup, count: u32| vk::StridedDeviceAddressRegionKHR {
            device_address: table_address + self.offset(first),
            stride,
            size: count as vk::DeviceSize * stride,
        };

        let miss_count = ShaderGroup::FIRST_HIT_GROUP.index() - ShaderGroup::Miss.index();
        let hit_count = ShaderGroup::hit_groups().count() as u32;

        ShaderBindingRegions {
            raygen: region(ShaderGroup::RayGen, 1),
            miss: region(ShaderGroup::Miss, miss_count),
            hit: region(ShaderGroup::FIRST_HIT_GROUP, hit_count),
            callable: vk::StridedDeviceAddressRegionKHR::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ShaderBindingRegions {
    pub raygen: vk::StridedDeviceAddressRegionKHR,
    pub miss: vk::StridedDeviceAddressRegionKHR,
    pub hit: vk::StridedDeviceAddressRegionKHR,
    pub callable: vk::StridedDeviceAddressRegionKHR,
}

pub struct ShaderBindingTable {
    _buffer: Buffer<u8>,
    layout: ShaderBindingTableLayout,
    regions: ShaderBindingRegions,
}

impl ShaderBindingTable {
    pub fn new(context: Arc<Context>, pipeline: vk::Pipeline) -> Self {
        let properties = &context
            .context_raytracing
            .physical_device_ray_tracing_pipeline_properties_khr;
        let layout = ShaderBindingTableLayout::new(
            properties.shader_group_handle_size,
            properties.shader_group_base_alignment,
            ShaderGroup::COUNT,
        );

        let handles = unsafe {
            context
                .context_raytracing
                .ray_tracing_pipeline
                .get_ray_tracing_shader_group_handles(
                    pipeline,
                    0,
                    ShaderGroup::COUNT,
                    (ShaderGroup::COUNT * layout.handle_size()) as usize,
                )
        }
        .expect("Could not get shader group handles");
        let table = layout.pack(&handles);

        // Allocations only guarantee the buffer's own alignment, so leave room to move the table
        // start onto the shader group base alignment.
        let base_alignment = properties.shader_group_base_alignment as vk::DeviceSize;
        let buffer: Buffer<u8> = Buffer::new(
            context.clone(),
            layout.table_size() + base_alignment,
            vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::CpuToGpu,
        );
        let buffer_address = buffer.get_device_address();
        let table_address = aligned_device_address(buffer_address, base_alignment);
        buffer.copy_data_at((table_address - buffer_address) as usize, &table);

        info!(
            "Shader binding table: {} groups, handle size {}, stride {}",
            ShaderGroup::COUNT,
            layout.handle_size(),
            layout.entry_stride()
        );

        Self {
            _buffer: buffer,
            layout,
            regions: layout.regions(table_address),
        }
    }

    pub fn layout(&self) -> &ShaderBindingTableLayout {
        &self.layout
    }

    pub fn regions(&self) -> &ShaderBindingRegions {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_handle_up_to_alignment() {
        let layout = ShaderBindingTableLayout::new(32, 64, ShaderGroup::COUNT);
        assert_eq!(layout.entry_stride(), 64);
        assert_eq!(layout.table_size(), 5 * 64);

        let layout = ShaderBindingTableLayout::new(32, 32, ShaderGroup::COUNT);
        assert_eq!(layout.entry_stride(), 32);
        assert_eq!(layout.table_size(), 5 * 32);
    }

    #[test]
    fn stride_law_holds_for_common_devices() {
        for (handle_size, alignment) in [(32, 64), (32, 32), (16, 64), (48, 64), (64, 64)] {
            let layout = ShaderBindingTableLayout::new(handle_size, alignment, ShaderGroup::COUNT);
            assert!(layout.entry_stride() >= handle_size);
            assert_eq!(layout.entry_stride() % alignment, 0);
            assert_eq!(
                layout.table_size(),
                ShaderGroup::COUNT as u64 * layout.entry_stride() as u64
            );
        }
    }

    #[test]
    fn handles_land_in_their_aligned_slots() {
        let layout = ShaderBindingTableLayout::new(4, 8, 3);
        let handles = [1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
        let table = layout.pack(&handles);
        assert_eq!(
            table,
            vec![
                1, 1, 1, 1, 0, 0, 0, 0, //
                2, 2, 2, 2, 0, 0, 0, 0, //
                3, 3, 3, 3, 0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn group_offsets_are_multiples_of_the_stride() {
        let layout = ShaderBindingTableLayout::new(32, 64, ShaderGroup::COUNT);
        assert_eq!(layout.offset(ShaderGroup::RayGen), 0);
        assert_eq!(layout.offset(ShaderGroup::Miss), 64);
        assert_eq!(layout.offset(ShaderGroup::TrianglesHitGroup), 128);
        assert_eq!(layout.offset(ShaderGroup::BoxHitGroup), 256);
    }

    #[test]
    fn regions_cover_their_groups() {
        let layout = ShaderBindingTableLayout::new(32, 64, ShaderGroup::COUNT);
        let regions = layout.regions(0x1000);

        assert_eq!(regions.raygen.device_address, 0x1000);
        assert_eq!(regions.raygen.size, 64);
        assert_eq!(regions.raygen.stride, 64);

        assert_eq!(regions.miss.device_address, 0x1040);
        assert_eq!(regions.miss.size, 64);

        assert_eq!(regions.hit.device_address, 0x1080);
        assert_eq!(regions.hit.size, 3 * 64);
        assert_eq!(regions.hit.stride, 64);

        assert_eq!(regions.callable.size, 0);
    }
}
