//! Headless harness for smoke tests on real hardware.
//!
//! Bootstraps the `ash` backend without a window: the swapchain is replaced
//! by [`OffscreenTargets`], a set of device-local color images.

use ash::vk;
use hearth_gpu::api::{Device, PhysicalDevice};
use hearth_gpu::memory::find_memory_type;
use hearth_gpu::{
    AshDevice, AshEntrypoint, AshPhysicalDevice, BarrierImageTools, CommandPool, DevicePartition,
    Driver, DriverConfig, GpuError, GraphicsDevice, GraphicsDeviceCreateInfo, LogicalDevice,
    OwnedResource, ResourceStack, SwapchainBuffer, SwapchainCollection, prepare_color_attachments,
};
use std::sync::Arc;

use crate::{Result, TestError};

/// Offscreen stand-in for a swapchain.
pub struct OffscreenTargets {
    device: Arc<AshDevice>,
    image_tools: BarrierImageTools<AshDevice>,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    format: vk::Format,
    image_count: usize,
    extent: vk::Extent2D,
    resources: ResourceStack,
    buffers: Vec<SwapchainBuffer>,
}

impl OffscreenTargets {
    pub fn new(
        logical_device: &LogicalDevice<AshPhysicalDevice>,
        format: vk::Format,
        image_count: usize,
    ) -> Self {
        let device = Arc::clone(logical_device.device());
        Self {
            image_tools: BarrierImageTools::new(Arc::clone(&device)),
            memory_properties: logical_device.physical_device().memory_properties(),
            device,
            format,
            image_count,
            extent: vk::Extent2D::default(),
            resources: ResourceStack::new(),
            buffers: Vec::new(),
        }
    }

    pub const fn format(&self) -> vk::Format {
        self.format
    }

    fn create_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> hearth_gpu::Result<SwapchainBuffer> {
        let device = self.device.as_ref();
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(self.format)
            .extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = device.create_image(&image_info)?;

        let requirements = device.image_memory_requirements(image);
        let properties = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        let Some(memory_type_index) =
            find_memory_type(&self.memory_properties, requirements.memory_type_bits, properties)
        else {
            device.destroy_image(image);
            return Err(GpuError::NoSuitableMemoryType {
                type_bits: requirements.memory_type_bits,
                properties,
            });
        };
        let memory = match device.allocate_memory(
            &vk::MemoryAllocateInfo::default()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index),
        ) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image);
                return Err(e);
            }
        };
        self.resources.push(OwnedResource::Memory(memory));
        self.resources.push(OwnedResource::Image(image));
        device.bind_image_memory(image, memory, 0)?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(self.format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = device.create_image_view(&view_info)?;
        self.resources.push(OwnedResource::ImageView(view));

        Ok(SwapchainBuffer { image, view })
    }
}

impl SwapchainCollection for OffscreenTargets {
    fn create(&mut self, cmd: vk::CommandBuffer, width: u32, height: u32) -> hearth_gpu::Result<()> {
        self.resources.release(self.device.as_ref());
        self.buffers.clear();
        for _ in 0..self.image_count {
            let buffer = self.create_target(width, height)?;
            self.buffers.push(buffer);
        }
        self.extent = vk::Extent2D { width, height };
        prepare_color_attachments(&self.image_tools, cmd, &self.buffers)
    }

    fn buffers(&self) -> &[SwapchainBuffer] {
        &self.buffers
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for OffscreenTargets {
    fn drop(&mut self) {
        let _ = self.device.wait_idle();
        self.resources.release(self.device.as_ref());
    }
}

/// Headless renderer for testing.
///
/// Owns the whole stack from the driver down to the framebuffers.
pub struct HeadlessRenderer {
    graphics: GraphicsDevice<DevicePartition<AshPhysicalDevice>>,
    targets: OffscreenTargets,
    command_pool: CommandPool,
    queue: vk::Queue,
    logical_device: LogicalDevice<AshPhysicalDevice>,
    driver: Driver<AshEntrypoint>,
}

impl HeadlessRenderer {
    /// Create a renderer with `image_count` offscreen targets.
    ///
    /// Validation follows `HEARTH_VALIDATION` (see [`DriverConfig::from_env`]).
    pub fn new(width: u32, height: u32, image_count: usize) -> Result<Self> {
        let config = DriverConfig::from_env().app_name("hearth-test");

        let mut driver = Driver::new(AshEntrypoint::load()?);
        driver.initialize_from_config(&config)?;
        let logical_device = driver.create_logical_device_with(None, &config)?;
        let queue = logical_device
            .queues()
            .first()
            .map(hearth_gpu::QueueInfo::queue)
            .ok_or(TestError::NoQueue)?;

        let command_pool = CommandPool::new(
            Arc::clone(logical_device.device()),
            logical_device.queue_family(),
            vk::CommandPoolCreateFlags::TRANSIENT,
        )?;
        let targets = OffscreenTargets::new(&logical_device, vk::Format::R8G8B8A8_UNORM, image_count);
        let graphics = GraphicsDevice::from_logical_device(&logical_device);

        let mut renderer = Self {
            graphics,
            targets,
            command_pool,
            queue,
            logical_device,
            driver,
        };
        renderer.resize(width, height)?;

        tracing::info!(
            "Headless renderer ready: {}x{}, {} target(s)",
            width,
            height,
            image_count
        );
        Ok(renderer)
    }

    /// Re-create the render targets at a new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let info = GraphicsDeviceCreateInfo::new(width, height).color_format(self.targets.format());
        let cmd = self.command_pool.begin_setup()?;
        if let Err(e) = self.graphics.create(cmd, &mut self.targets, &info) {
            self.command_pool.discard(cmd);
            return Err(e.into());
        }
        self.command_pool.submit_and_wait(self.queue, cmd)?;
        Ok(())
    }

    pub const fn graphics(&self) -> &GraphicsDevice<DevicePartition<AshPhysicalDevice>> {
        &self.graphics
    }

    pub const fn logical_device(&self) -> &LogicalDevice<AshPhysicalDevice> {
        &self.logical_device
    }

    pub const fn driver(&self) -> &Driver<AshEntrypoint> {
        &self.driver
    }
}

impl Drop for HeadlessRenderer {
    fn drop(&mut self) {
        let _ = self.logical_device.device().wait_idle();
        self.graphics.dispose();
        // The instance itself lives on until the device is dropped.
        self.driver.dispose();
    }
}
