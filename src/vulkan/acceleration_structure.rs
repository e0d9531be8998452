use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;

use super::{buffer::Buffer, command_pool::CommandPool, context::Context};
use crate::utility::aligned_device_address;

pub struct AccelerationStructure {
    pub inner: vk::AccelerationStructureKHR,
    pub context: Arc<Context>,
    pub buffer: Buffer<u8>,
    pub device_address: vk::DeviceAddress,
}

impl AccelerationStructure {
    // See https://github.com/SaschaWillems/Vulkan/blob/a467d941599a2cef5bd0eff696999bca8d75ee23/base/VulkanRaytracingSample.cpp#L149
    pub fn new(
        context: Arc<Context>,
        structure_type: vk::AccelerationStructureTypeKHR,
        build_size_info: vk::AccelerationStructureBuildSizesInfoKHR,
    ) -> Self {
        let buffer: Buffer<u8> = Buffer::new(
            context.clone(),
            build_size_info.acceleration_structure_size,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::GpuOnly,
        );

        let create_info = vk::AccelerationStructureCreateInfoKHR::builder()
            .buffer(buffer.inner)
            .size(build_size_info.acceleration_structure_size)
            .ty(structure_type);

        let inner = unsafe {
            context
                .context_raytracing
                .acceleration_structure
                .create_acceleration_structure(&create_info, None)
        }
        .expect("Could not create acceleration structure");

        let device_address = {
            let acceleration_structure_device_address_info =
                vk::AccelerationStructureDeviceAddressInfoKHR::builder()
                    .acceleration_structure(inner);

            unsafe {
                context
                    .context_raytracing
                    .acceleration_structure
                    .get_acceleration_structure_device_address(
                        &acceleration_structure_device_address_info,
                    )
            }
        };

        Self {
            inner,
            context,
            buffer,
            device_address,
        }
    }

    /// Builds a structure over `geometries`, one build range per geometry, and waits for the
    /// build to finish.
    pub fn build(
        command_pool: &CommandPool,
        structure_type: vk::AccelerationStructureTypeKHR,
        geometries: &[vk::AccelerationStructureGeometryKHR],
        ranges: &[vk::AccelerationStructureBuildRangeInfoKHR],
    ) -> Self {
        assert_eq!(geometries.len(), ranges.len());
        let context = command_pool.context().clone();
        let acceleration_structure_loader = &context.context_raytracing.acceleration_structure;

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::builder()
            .ty(structure_type)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(geometries)
            .build();

        let max_primitive_counts: Vec<u32> =
            ranges.iter().map(|range| range.primitive_count).collect();

        let build_size_info = unsafe {
            acceleration_structure_loader.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                &max_primitive_counts,
            )
        };

        let acceleration_structure = Self::new(context.clone(), structure_type, build_size_info);

        let scratch_alignment = context
            .context_raytracing
            .physical_device_acceleration_structure_properties_khr
            .min_acceleration_structure_scratch_offset_alignment
            as vk::DeviceSize;
        let scratch_buffer: Buffer<u8> = Buffer::new(
            context.clone(),
            build_size_info.build_scratch_size + scratch_alignment,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::GpuOnly,
        );

        build_info.dst_acceleration_structure = acceleration_structure.inner;
        build_info.scratch_data = vk::DeviceOrHostAddressKHR {
            device_address: aligned_device_address(
                scratch_buffer.get_device_address(),
                scratch_alignment,
            ),
        };

        command_pool.one_time_submit(|command_buffer| unsafe {
            acceleration_structure_loader.cmd_build_acceleration_structures(
                command_buffer,
                std::slice::from_ref(&build_info),
                &[ranges],
            )
        });

        acceleration_structure
    }
}

impl Drop for AccelerationStructure {
    fn drop(&mut self) {
        unsafe {
            self.context
                .context_raytracing
                .acceleration_structure
                .destroy_acceleration_structure(self.inner, None);
        }
    }
}
