use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use ash::{self, vk};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use log::warn;

use super::command_pool::CommandPool;
use super::context::Context;

/// Typed device buffer. The element type only documents what the shaders read from it.
pub struct Buffer<T> {
    pub inner: vk::Buffer,
    pub usage: vk::BufferUsageFlags,
    pub size: vk::DeviceSize,
    allocation: Option<Allocation>,
    context: Arc<Context>,
    _marker: PhantomData<T>,
}

impl<T: Copy> Buffer<T> {
    pub fn new(
        context: Arc<Context>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Buffer<T> {
        let device = &context.device;

        let create_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer =
            unsafe { device.create_buffer(&create_info, None) }.expect("Could not create buffer");

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let allocation = context
            .allocator()
            .allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .expect("Could not allocate memory for buffer");

        unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) }
            .expect("Could not bind buffer memory for buffer");

        Buffer {
            inner: buffer,
            usage,
            size,
            allocation: Some(allocation),
            context,
            _marker: PhantomData,
        }
    }

    /// Creates a device local buffer and fills it through a staging buffer. Blocks until the
    /// copy has finished.
    pub fn new_device_local(
        command_pool: &CommandPool,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> Buffer<T> {
        let context = command_pool.context().clone();
        // zero sized buffers are invalid, empty data still gets one element
        let size = std::mem::size_of_val(data)
            .max(std::mem::size_of::<T>())
            .max(4) as vk::DeviceSize;

        let staging_buffer: Buffer<T> = Buffer::new(
            context.clone(),
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        );
        staging_buffer.copy_data(data);

        let buffer = Buffer::new(
            context.clone(),
            size,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        );

        command_pool.one_time_submit(|command_buffer| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            unsafe {
                context.device.cmd_copy_buffer(
                    command_buffer,
                    staging_buffer.inner,
                    buffer.inner,
                    std::slice::from_ref(&region),
                )
            };
        });

        buffer
    }

    pub fn get_device_address(&self) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfo::builder().buffer(self.inner);
        unsafe {
            self.context
                .buffer_device_address
                .get_buffer_device_address(&info)
        }
    }

    pub fn copy_data(&self, data: &[T]) {
        self.copy_data_at(0, data);
    }

    /// Writes `data` starting at element `offset`. Only valid for host visible buffers.
    pub fn copy_data_at(&self, offset: usize, data: &[T]) {
        let element_size = std::mem::size_of::<T>();
        let byte_offset = offset * element_size;
        let byte_count = std::mem::size_of_val(data);
        assert!((byte_offset + byte_count) as vk::DeviceSize <= self.size);

        let buffer_ptr = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .expect("Buffer memory is not host visible")
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr() as *const u8,
                buffer_ptr.add(byte_offset),
                byte_count,
            )
        };
    }

    pub fn descriptor_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.inner,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_buffer(self.inner, None) };
        if let Some(allocation) = self.allocation.take() {
            if let Err(error) = self.context.allocator().free(allocation) {
                warn!("Could not free buffer memory: {}", error);
            }
        }
    }
}

impl<T> Deref for Buffer<T> {
    type Target = vk::Buffer;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
