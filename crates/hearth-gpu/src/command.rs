//! Setup command buffers.
//!
//! [`GraphicsDevice::create`](crate::GraphicsDevice::create) records into a
//! command buffer it does not own. This pool hands one out, and submits it
//! once recording is done.

use crate::device::AshDevice;
use crate::error::Result;
use ash::vk;
use std::sync::Arc;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    device: Arc<AshDevice>,
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a new command pool on `queue_family`.
    pub fn new(
        device: Arc<AshDevice>,
        queue_family: u32,
        flags: vk::CommandPoolCreateFlags,
    ) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(flags);

        let pool = unsafe { device.raw().create_command_pool(&create_info, None)? };

        Ok(Self {
            device,
            pool,
            queue_family,
        })
    }

    /// Get the raw pool handle.
    pub const fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub const fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Allocate a primary command buffer and begin it for a single submit.
    pub fn begin_setup(&self) -> Result<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let cmd = unsafe { self.device.raw().allocate_command_buffers(&alloc_info)? }[0];

        let begin_info =
            vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if let Err(e) = unsafe { self.device.raw().begin_command_buffer(cmd, &begin_info) } {
            unsafe { self.device.raw().free_command_buffers(self.pool, &[cmd]) };
            return Err(e.into());
        }
        Ok(cmd)
    }

    /// End `cmd`, submit it to `queue`, wait for completion and free it.
    pub fn submit_and_wait(&self, queue: vk::Queue, cmd: vk::CommandBuffer) -> Result<()> {
        let device = self.device.raw();
        let result = (|| -> Result<()> {
            unsafe {
                device.end_command_buffer(cmd)?;
                let fence = device.create_fence(&vk::FenceCreateInfo::default(), None)?;
                let command_buffers = [cmd];
                let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
                let submitted = device
                    .queue_submit(queue, &[submit], fence)
                    .and_then(|()| device.wait_for_fences(&[fence], true, u64::MAX));
                device.destroy_fence(fence, None);
                submitted?;
            }
            Ok(())
        })();
        unsafe { device.free_command_buffers(self.pool, &[cmd]) };
        result
    }

    /// Free `cmd` without submitting it.
    pub fn discard(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.raw().free_command_buffers(self.pool, &[cmd]) };
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_command_pool(self.pool, None);
        }
    }
}
