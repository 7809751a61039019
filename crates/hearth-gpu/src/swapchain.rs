//! Swapchain management.

use crate::device::AshDevice;
use crate::error::{GpuError, Result};
use crate::image_tools::{BarrierImageTools, ImageTools};
use crate::instance::AshPhysicalDevice;
use crate::logical_device::LogicalDevice;
use crate::surface::Surface;
use ash::vk;
use std::sync::Arc;

/// One presentable image and the view rendering targets it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainBuffer {
    pub image: vk::Image,
    pub view: vk::ImageView,
}

/// The rotating set of presentable images a [`GraphicsDevice`](crate::GraphicsDevice)
/// builds framebuffers for.
///
/// Render passes load these images in `COLOR_ATTACHMENT_OPTIMAL`. New
/// images are either already in that layout or have the transition
/// recorded into the setup command buffer by [`SwapchainCollection::create`];
/// [`prepare_color_attachments`] does the latter.
pub trait SwapchainCollection {
    /// (Re)create the images, asking for the given size.
    fn create(&mut self, cmd: vk::CommandBuffer, width: u32, height: u32) -> Result<()>;

    /// Image/view pairs of the current generation.
    fn buffers(&self) -> &[SwapchainBuffer];

    /// Size the current images were actually created at.
    fn extent(&self) -> vk::Extent2D;
}

/// Record the transition of every image in `buffers` from `UNDEFINED` to
/// `COLOR_ATTACHMENT_OPTIMAL`.
pub fn prepare_color_attachments(
    image_tools: &dyn ImageTools,
    cmd: vk::CommandBuffer,
    buffers: &[SwapchainBuffer],
) -> Result<()> {
    for buffer in buffers {
        image_tools.set_image_layout(
            cmd,
            buffer.image,
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        )?;
    }
    Ok(())
}

/// `VK_KHR_swapchain` backed [`SwapchainCollection`].
pub struct AshSwapchainCollection {
    device: Arc<AshDevice>,
    image_tools: BarrierImageTools<AshDevice>,
    physical_device: Arc<AshPhysicalDevice>,
    surface: Arc<Surface>,
    loader: ash::khr::swapchain::Device,
    queue_family: u32,
    vsync: bool,
    swapchain: vk::SwapchainKHR,
    buffers: Vec<SwapchainBuffer>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl AshSwapchainCollection {
    /// Prepare a collection presenting to `surface` from `logical_device`.
    ///
    /// Nothing is created until [`SwapchainCollection::create`] runs. The
    /// device must have been created with `VK_KHR_swapchain` enabled.
    pub fn new(
        logical_device: &LogicalDevice<AshPhysicalDevice>,
        surface: Arc<Surface>,
        vsync: bool,
    ) -> Self {
        let device = Arc::clone(logical_device.device());
        let loader = ash::khr::swapchain::Device::new(device.instance(), device.raw());
        Self {
            physical_device: Arc::clone(logical_device.physical_device()),
            queue_family: logical_device.queue_family(),
            image_tools: BarrierImageTools::new(Arc::clone(&device)),
            device,
            surface,
            loader,
            vsync,
            swapchain: vk::SwapchainKHR::null(),
            buffers: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent: vk::Extent2D::default(),
        }
    }

    pub const fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub const fn format(&self) -> vk::Format {
        self.format
    }

    pub const fn loader(&self) -> &ash::khr::swapchain::Device {
        &self.loader
    }

    fn destroy_views(&mut self) {
        for buffer in self.buffers.drain(..) {
            unsafe { self.device.raw().destroy_image_view(buffer.view, None) };
        }
    }
}

impl SwapchainCollection for AshSwapchainCollection {
    #[tracing::instrument(level = "debug", skip(self, cmd))]
    fn create(&mut self, cmd: vk::CommandBuffer, width: u32, height: u32) -> Result<()> {
        let surface_loader = self.physical_device.surface_loader();
        let gpu = self.physical_device.handle();
        let surface = self.surface.handle();

        let (capabilities, formats, present_modes) = unsafe {
            (
                surface_loader.get_physical_device_surface_capabilities(gpu, surface)?,
                surface_loader.get_physical_device_surface_formats(gpu, surface)?,
                surface_loader.get_physical_device_surface_present_modes(gpu, surface)?,
            )
        };

        let surface_format = select_surface_format(&formats)?;
        let present_mode = select_present_mode(&present_modes, self.vsync);
        let extent = calculate_extent(&capabilities, width, height);
        let image_count = select_image_count(&capabilities);

        let queue_families = [self.queue_family];
        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        // The old generation is retired by the new swapchain.
        self.destroy_views();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = swapchain;
        self.format = surface_format.format;
        self.extent = extent;

        let images = unsafe { self.loader.get_swapchain_images(swapchain)? };
        for image in images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(surface_format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );
            let view = unsafe { self.device.raw().create_image_view(&view_info, None)? };
            self.buffers.push(SwapchainBuffer { image, view });
        }
        prepare_color_attachments(&self.image_tools, cmd, &self.buffers)?;

        tracing::debug!(
            "Swapchain created: {} image(s), {}x{}, {:?}",
            self.buffers.len(),
            extent.width,
            extent.height,
            present_mode
        );
        Ok(())
    }

    fn buffers(&self) -> &[SwapchainBuffer] {
        &self.buffers
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for AshSwapchainCollection {
    fn drop(&mut self) {
        let _ = self.device.wait_idle();
        self.destroy_views();
        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe { self.loader.destroy_swapchain(self.swapchain, None) };
        }
    }
}

/// Select the best surface format.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    // Prefer SRGB
    for format in available {
        if format.format == vk::Format::B8G8R8A8_SRGB
            && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        {
            return Ok(*format);
        }
    }

    // Fall back to first available
    available
        .first()
        .copied()
        .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".to_string()))
}

/// Select the best present mode.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        // FIFO is always supported
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One image more than the minimum, capped by the maximum (0 means no cap).
pub const fn select_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}
