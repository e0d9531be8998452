use std::{ops::Deref, sync::Arc};

use ash::vk::{self};

use super::context::Context;

#[derive(Clone)]
pub struct CommandPool {
    inner: Arc<CommandPoolImpl>,
}

impl CommandPool {
    pub fn new(context: Arc<Context>) -> Self {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(context.queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let command_pool = unsafe { context.device.create_command_pool(&create_info, None) }
            .expect("Could not create command pool");

        Self {
            inner: Arc::new(CommandPoolImpl {
                inner: command_pool,
                context,
            }),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.inner.context
    }

    pub fn allocate_command_buffers(&self, count: u32) -> Vec<vk::CommandBuffer> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_buffer_count(count)
            .command_pool(self.inner.inner)
            .level(vk::CommandBufferLevel::PRIMARY);

        unsafe { self.context().device.allocate_command_buffers(&allocate_info) }
            .expect("Could not allocate command buffers")
    }

    pub fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        unsafe {
            self.context()
                .device
                .free_command_buffers(self.inner.inner, command_buffers)
        };
    }

    /// Records commands into a fresh command buffer, submits it and waits for the queue to
    /// go idle.
    pub fn one_time_submit<R>(&self, record: impl FnOnce(vk::CommandBuffer) -> R) -> R {
        let device = &self.context().device;
        let command_buffer = self.allocate_command_buffers(1)[0];

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .expect("Could not begin command buffer");

        let result = record(command_buffer);

        unsafe { device.end_command_buffer(command_buffer) }
            .expect("Could not end command buffer");

        let submit_info = vk::SubmitInfo::builder()
            .command_buffers(std::slice::from_ref(&command_buffer))
            .build();
        unsafe {
            device.queue_submit(
                self.context().queue,
                std::slice::from_ref(&submit_info),
                vk::Fence::null(),
            )
        }
        .expect("Could not submit to queue");
        unsafe { device.queue_wait_idle(self.context().queue) }
            .expect("Could not wait for queue idle");

        self.free_command_buffers(std::slice::from_ref(&command_buffer));
        result
    }
}

struct CommandPoolImpl {
    pub inner: vk::CommandPool,
    pub context: Arc<Context>,
}

impl Drop for CommandPoolImpl {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_command_pool(self.inner, None) };
    }
}

impl Deref for CommandPool {
    type Target = vk::CommandPool;

    fn deref(&self) -> &Self::Target {
        &self.inner.inner
    }
}
