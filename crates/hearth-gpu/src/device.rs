//! Logical device on `ash`.

use crate::api::Device;
use crate::error::Result;
use crate::instance::InstanceShared;
use ash::vk;
use std::sync::Arc;

/// A Vulkan logical device.
///
/// Waits for the device to go idle and destroys it on drop.
pub struct AshDevice {
    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    instance: Arc<InstanceShared>,
}

impl AshDevice {
    pub(crate) const fn new(
        instance: Arc<InstanceShared>,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Self {
        Self {
            device,
            physical_device,
            instance,
        }
    }

    /// Get the Vulkan device handle.
    pub const fn raw(&self) -> &ash::Device {
        &self.device
    }

    pub const fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance.instance
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Device for AshDevice {
    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image> {
        Ok(unsafe { self.device.create_image(info, None)? })
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) }
    }

    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        unsafe { self.device.get_image_memory_requirements(image) }
    }

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> Result<vk::DeviceMemory> {
        Ok(unsafe { self.device.allocate_memory(info, None)? })
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        unsafe { self.device.bind_image_memory(image, memory, offset)? };
        Ok(())
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView> {
        Ok(unsafe { self.device.create_image_view(info, None)? })
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass> {
        Ok(unsafe { self.device.create_render_pass(info, None)? })
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer> {
        Ok(unsafe { self.device.create_framebuffer(info, None)? })
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn queue(&self, queue_family: u32, index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(queue_family, index) }
    }

    fn cmd_image_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(barrier),
            );
        }
    }
}

impl Drop for AshDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        tracing::debug!("Vulkan device destroyed");
    }
}
