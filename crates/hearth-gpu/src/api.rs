//! Capability traits over the Vulkan API surfaces.
//!
//! The orchestration in [`Driver`](crate::Driver) and
//! [`GraphicsDevice`](crate::GraphicsDevice) only talks to these traits. The
//! `ash` backend in [`instance`](crate::instance) and [`device`](crate::device)
//! implements them against a real loader; test doubles implement them without
//! a GPU.
//!
//! Parameter blocks are the plain `ash::vk` structs. Handles are `ash::vk`
//! handles, so a null handle is always `Handle::null()`.

use crate::config::ApplicationInfo;
use crate::error::Result;
use ash::vk;

/// Loader-level entry point.
pub trait Entrypoint {
    type Instance: Instance;

    /// Names of every instance extension the loader exposes.
    fn instance_extension_names(&self) -> Result<Vec<String>>;

    /// Create an instance.
    fn create_instance(&self, info: &InstanceCreateInfo<'_>) -> Result<Self::Instance>;
}

/// An API instance.
pub trait Instance {
    type PhysicalDevice: PhysicalDevice;

    /// Enumerate the physical devices visible to this instance.
    fn enumerate_physical_devices(&self) -> Result<Vec<Self::PhysicalDevice>>;

    /// Release the instance.
    fn destroy(self);
}

/// Query surface of one GPU.
pub trait PhysicalDevice {
    type Device: Device;

    fn properties(&self) -> vk::PhysicalDeviceProperties;

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties;

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties;

    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties>;

    /// Whether `queue_family` can present to `surface`.
    fn surface_support(&self, queue_family: u32, surface: vk::SurfaceKHR) -> Result<bool>;

    /// Names of every device extension this GPU exposes.
    fn extension_names(&self) -> Result<Vec<String>>;

    fn create_device(&self, info: &DeviceCreateInfo<'_>) -> Result<Self::Device>;
}

/// A logical device.
///
/// Destroying the device itself is left to the implementation's `Drop`, so
/// every holder of the shared device keeps it alive.
pub trait Device {
    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image>;
    fn destroy_image(&self, image: vk::Image);
    fn image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements;

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> Result<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);
    fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<()>;

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo<'_>)
        -> Result<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    /// Fetch queue `index` of `queue_family`.
    fn queue(&self, queue_family: u32, index: u32) -> vk::Queue;

    /// Record a single image memory barrier into `cmd`.
    fn cmd_image_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    );
}

/// Instance creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct InstanceCreateInfo<'a> {
    pub application_info: &'a ApplicationInfo,
    pub enabled_layer_names: &'a [String],
    pub enabled_extension_names: &'a [String],
}

/// Queues requested from one family.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceQueueCreateInfo {
    pub queue_family_index: u32,
    /// One priority per queue; the length is the queue count.
    pub queue_priorities: Vec<f32>,
}

impl DeviceQueueCreateInfo {
    /// Request `count` queues of `queue_family_index`, all at priority zero.
    pub fn uniform(queue_family_index: u32, count: u32) -> Self {
        Self {
            queue_family_index,
            queue_priorities: vec![0.0; count as usize],
        }
    }

    /// Number of queues requested.
    pub fn queue_count(&self) -> u32 {
        u32::try_from(self.queue_priorities.len()).unwrap_or(u32::MAX)
    }
}

/// Logical device creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCreateInfo<'a> {
    pub queue_create_infos: &'a [DeviceQueueCreateInfo],
    pub enabled_extension_names: &'a [String],
}

/// Whether to enable every extension the loader or GPU exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionsOption {
    /// Only the caller-supplied names (possibly none).
    #[default]
    Specific,
    /// Everything that is enumerated.
    All,
}

/// How many queues to request from the selected family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueAllocation {
    #[default]
    One,
    /// Every queue the family offers.
    All,
}
