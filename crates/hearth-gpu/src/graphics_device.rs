//! Depth buffer, render pass and framebuffers for a swapchain.
//!
//! A [`GraphicsDevice`] is either fully created or holds nothing. Every
//! object it creates is recorded in a [`ResourceStack`], which also drives
//! teardown: framebuffers, render pass, the multisampled color target if
//! any, then the depth view, image and memory.

use crate::api::{Device, PhysicalDevice};
use crate::capabilities::GpuCapabilities;
use crate::depth::{depth_aspect_mask, select_depth_format};
use crate::error::{GpuError, Result};
use crate::image_tools::{BarrierImageTools, ImageTools};
use crate::logical_device::LogicalDevice;
use crate::memory::{DevicePartition, ThreadPartition};
use crate::render_pass::{create_render_pass, is_multisampled};
use crate::resources::{OwnedResource, ResourceStack};
use crate::swapchain::SwapchainCollection;
use ash::vk;
use ash::vk::Handle;
use std::sync::Arc;

/// Parameters of [`GraphicsDevice::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsDeviceCreateInfo {
    /// Format of the swapchain images the render pass writes.
    pub color: vk::Format,
    /// Depth-stencil format, or `None` to pick the best supported one.
    pub depth_stencil: Option<vk::Format>,
    /// Sample count; must be supported for color and depth attachments.
    pub samples: vk::SampleCountFlags,
    pub width: u32,
    pub height: u32,
}

impl Default for GraphicsDeviceCreateInfo {
    fn default() -> Self {
        Self {
            color: vk::Format::B8G8R8A8_UNORM,
            depth_stencil: None,
            samples: vk::SampleCountFlags::TYPE_1,
            width: 1280,
            height: 720,
        }
    }
}

impl GraphicsDeviceCreateInfo {
    /// Defaults at the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn color_format(mut self, format: vk::Format) -> Self {
        self.color = format;
        self
    }

    /// Use `format` instead of negotiating a depth format.
    #[must_use]
    pub const fn depth_format(mut self, format: vk::Format) -> Self {
        self.depth_stencil = Some(format);
        self
    }

    #[must_use]
    pub const fn samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    #[must_use]
    pub const fn extent(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GpuError::invalid_argument(
                "create_info",
                format!("extent {}x{} is empty", self.width, self.height),
            ));
        }
        if self.color == vk::Format::UNDEFINED {
            return Err(GpuError::invalid_argument(
                "create_info",
                "color format is undefined",
            ));
        }
        Ok(())
    }
}

/// Shape of an image [`GraphicsDevice`] renders into alongside the swapchain.
struct AttachmentImage {
    format: vk::Format,
    samples: vk::SampleCountFlags,
    usage: vk::ImageUsageFlags,
    aspect_mask: vk::ImageAspectFlags,
    layout: vk::ImageLayout,
    width: u32,
    height: u32,
}

/// Render targets shared by every frame of a swapchain.
pub struct GraphicsDevice<T: ThreadPartition> {
    partition: T,
    image_tools: Box<dyn ImageTools>,
    resources: ResourceStack,
    depth_format: vk::Format,
    depth_view: vk::ImageView,
    color_target: vk::ImageView,
    samples: vk::SampleCountFlags,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    viewport: vk::Viewport,
    scissor: vk::Rect2D,
    created: bool,
    disposed: bool,
}

impl<P> GraphicsDevice<DevicePartition<P>>
where
    P: PhysicalDevice,
    P::Device: 'static,
{
    /// Graphics device on `logical_device`, recording layout transitions as
    /// pipeline barriers.
    pub fn from_logical_device(logical_device: &LogicalDevice<P>) -> Self {
        Self::new(
            DevicePartition::new(logical_device),
            BarrierImageTools::new(Arc::clone(logical_device.device())),
        )
    }
}

impl<T: ThreadPartition> GraphicsDevice<T> {
    pub fn new(partition: T, image_tools: impl ImageTools + 'static) -> Self {
        Self {
            partition,
            image_tools: Box::new(image_tools),
            resources: ResourceStack::new(),
            depth_format: vk::Format::UNDEFINED,
            depth_view: vk::ImageView::null(),
            color_target: vk::ImageView::null(),
            samples: vk::SampleCountFlags::TYPE_1,
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            viewport: vk::Viewport::default(),
            scissor: vk::Rect2D::default(),
            created: false,
            disposed: false,
        }
    }

    /// (Re)create the depth buffer, render pass, swapchain images and
    /// framebuffers.
    ///
    /// Above one sample, color renders into a multisampled image of its own
    /// and resolves into the swapchain image. The swapchain must come out at
    /// exactly the requested extent, otherwise `create` fails with
    /// [`GpuError::OutOfRange`] and the caller retries at the swapchain's
    /// size.
    ///
    /// The depth layout transition is recorded into `setup_cmd`; submitting
    /// it is up to the caller. Resources of a previous `create` are released
    /// first. If any step fails, whatever this call created is released
    /// again before the error is returned.
    #[tracing::instrument(level = "debug", skip_all, fields(width = info.width, height = info.height))]
    pub fn create<S>(
        &mut self,
        setup_cmd: vk::CommandBuffer,
        swapchains: &mut S,
        info: &GraphicsDeviceCreateInfo,
    ) -> Result<()>
    where
        S: SwapchainCollection + ?Sized,
    {
        if setup_cmd.is_null() {
            return Err(GpuError::invalid_argument(
                "setup_cmd",
                "a command buffer in the recording state is required",
            ));
        }
        info.validate()?;
        if self.disposed {
            return Err(GpuError::InvalidState(
                "graphics device has been disposed".to_string(),
            ));
        }

        let gpu = self.partition.physical_device();
        let capabilities = GpuCapabilities::from_properties(&gpu.properties());
        if !capabilities.supports_samples(info.samples) {
            return Err(GpuError::OutOfRange {
                parameter: "create_info.samples",
                message: format!(
                    "{:?} is not supported (color {:?}, depth {:?})",
                    info.samples,
                    capabilities.color_sample_counts,
                    capabilities.depth_sample_counts
                ),
            });
        }

        let depth_format = match info.depth_stencil {
            Some(format) => format,
            None => select_depth_format(|format| gpu.format_properties(format))?,
        };

        self.release();

        if let Err(e) = self.build(setup_cmd, swapchains, info, depth_format) {
            let released = self.resources.release(self.partition.device());
            self.reset();
            tracing::debug!("Create failed, rolled back {} resource(s): {}", released, e);
            return Err(e);
        }

        self.viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: info.width as f32,
            height: info.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        self.scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: info.width,
                height: info.height,
            },
        };
        self.created = true;

        tracing::debug!(
            "Graphics device created: {:?} depth, {} framebuffer(s)",
            depth_format,
            self.framebuffers.len()
        );
        Ok(())
    }

    fn build<S>(
        &mut self,
        cmd: vk::CommandBuffer,
        swapchains: &mut S,
        info: &GraphicsDeviceCreateInfo,
        depth_format: vk::Format,
    ) -> Result<()>
    where
        S: SwapchainCollection + ?Sized,
    {
        let depth_view = self.create_attachment(
            cmd,
            &AttachmentImage {
                format: depth_format,
                samples: info.samples,
                usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_SRC,
                aspect_mask: depth_aspect_mask(depth_format),
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                width: info.width,
                height: info.height,
            },
        )?;
        self.depth_view = depth_view;
        self.depth_format = depth_format;

        if is_multisampled(info.samples) {
            self.color_target = self.create_attachment(
                cmd,
                &AttachmentImage {
                    format: info.color,
                    samples: info.samples,
                    usage: vk::ImageUsageFlags::COLOR_ATTACHMENT
                        | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    width: info.width,
                    height: info.height,
                },
            )?;
        }
        self.samples = info.samples;

        let device = self.partition.device();
        let render_pass = create_render_pass(device, info.color, depth_format, info.samples)?;
        self.resources.push(OwnedResource::RenderPass(render_pass));
        self.render_pass = render_pass;

        swapchains.create(cmd, info.width, info.height)?;
        let extent = swapchains.extent();
        if extent.width != info.width || extent.height != info.height {
            return Err(GpuError::OutOfRange {
                parameter: "create_info.extent",
                message: format!(
                    "swapchain images are {}x{}, requested {}x{}",
                    extent.width, extent.height, info.width, info.height
                ),
            });
        }

        for buffer in swapchains.buffers() {
            let attachments = if self.color_target.is_null() {
                vec![buffer.view, depth_view]
            } else {
                vec![self.color_target, depth_view, buffer.view]
            };
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(info.width)
                .height(info.height)
                .layers(1);
            let framebuffer = device.create_framebuffer(&framebuffer_info)?;
            self.resources.push(OwnedResource::Framebuffer(framebuffer));
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    /// Create a device-local image with memory and a view, and record its
    /// transition into `image.layout`.
    fn create_attachment(
        &mut self,
        cmd: vk::CommandBuffer,
        image: &AttachmentImage,
    ) -> Result<vk::ImageView> {
        let device = self.partition.device();

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(image.format)
            .extent(vk::Extent3D {
                width: image.width,
                height: image.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(image.samples)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let handle = device.create_image(&image_info)?;

        let requirements = device.image_memory_requirements(handle);
        let properties = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        let memory = self
            .partition
            .memory_type(requirements.memory_type_bits, properties)
            .ok_or(GpuError::NoSuitableMemoryType {
                type_bits: requirements.memory_type_bits,
                properties,
            })
            .and_then(|memory_type_index| {
                device.allocate_memory(
                    &vk::MemoryAllocateInfo::default()
                        .allocation_size(requirements.size)
                        .memory_type_index(memory_type_index),
                )
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(handle);
                return Err(e);
            }
        };
        // Memory goes first so it is freed after the image.
        self.resources.push(OwnedResource::Memory(memory));
        self.resources.push(OwnedResource::Image(handle));
        device.bind_image_memory(handle, memory, 0)?;

        self.image_tools.set_image_layout(
            cmd,
            handle,
            image.aspect_mask,
            vk::ImageLayout::UNDEFINED,
            image.layout,
        )?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(handle)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(image.aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = device.create_image_view(&view_info)?;
        self.resources.push(OwnedResource::ImageView(view));
        Ok(view)
    }

    /// Destroy everything [`GraphicsDevice::create`] made, newest first.
    ///
    /// Safe to call repeatedly; the device can be created again afterwards.
    pub fn release(&mut self) {
        let released = self.resources.release(self.partition.device());
        self.reset();
        if released > 0 {
            tracing::debug!("Released {} graphics device resource(s)", released);
        }
    }

    /// Release all resources for good. Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.release();
        self.disposed = true;
    }

    fn reset(&mut self) {
        self.depth_format = vk::Format::UNDEFINED;
        self.depth_view = vk::ImageView::null();
        self.color_target = vk::ImageView::null();
        self.samples = vk::SampleCountFlags::TYPE_1;
        self.render_pass = vk::RenderPass::null();
        self.framebuffers.clear();
        self.viewport = vk::Viewport::default();
        self.scissor = vk::Rect2D::default();
        self.created = false;
    }

    pub const fn partition(&self) -> &T {
        &self.partition
    }

    /// Full-extent viewport with depth range `[0, 1]`.
    pub const fn viewport(&self) -> vk::Viewport {
        self.viewport
    }

    /// Full-extent scissor at the origin.
    pub const fn scissor(&self) -> vk::Rect2D {
        self.scissor
    }

    pub const fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// One framebuffer per swapchain image, in swapchain order.
    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    pub const fn depth_view(&self) -> vk::ImageView {
        self.depth_view
    }

    /// Multisampled color image the pass resolves from; null when
    /// rendering single-sampled.
    pub const fn color_target(&self) -> vk::ImageView {
        self.color_target
    }

    pub const fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    /// Depth format in use, `UNDEFINED` while nothing is created.
    pub const fn depth_format(&self) -> vk::Format {
        self.depth_format
    }

    pub const fn device_created(&self) -> bool {
        self.created
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of GPU objects currently owned.
    pub fn held_resources(&self) -> usize {
        self.resources.len()
    }
}

impl<T: ThreadPartition> Drop for GraphicsDevice<T> {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            tracing::warn!(
                "GraphicsDevice dropped with {} resource(s) still held",
                self.resources.len()
            );
        }
        self.dispose();
    }
}
