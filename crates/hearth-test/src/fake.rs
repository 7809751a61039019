//! Recording fake backend.
//!
//! Implements the capability traits of `hearth_gpu::api` without touching a
//! GPU. Every object created or destroyed through it is written to a shared
//! [`Ledger`], so tests can assert on creation order, teardown order and
//! leak balance. Failures can be injected at any creation step with
//! [`FakeBackend::fail_at`].

use ash::vk;
use ash::vk::Handle;
use hearth_gpu::api::{
    Device, DeviceCreateInfo, Entrypoint, Instance, InstanceCreateInfo, PhysicalDevice,
};
use hearth_gpu::swapchain::{SwapchainBuffer, SwapchainCollection};
use hearth_gpu::{GpuError, Result};
use parking_lot::{Mutex, MutexGuard};
use std::ffi::c_char;
use std::sync::Arc;

/// Kinds of device objects tracked for leak balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Memory,
    Image,
    ImageView,
    RenderPass,
    Framebuffer,
}

impl ObjectKind {
    pub const ALL: [Self; 5] = [
        Self::Memory,
        Self::Image,
        Self::ImageView,
        Self::RenderPass,
        Self::Framebuffer,
    ];
}

/// A call observed by the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    InstanceCreated {
        application: String,
        layers: Vec<String>,
        extensions: Vec<String>,
    },
    InstanceDestroyed,
    DeviceCreated {
        queue_family: u32,
        queue_count: u32,
        extensions: Vec<String>,
    },
    DeviceDestroyed,
    Created {
        kind: ObjectKind,
        handle: u64,
    },
    Destroyed {
        kind: ObjectKind,
        handle: u64,
    },
    ImageDescribed {
        image: u64,
        format: vk::Format,
        samples: vk::SampleCountFlags,
        usage: vk::ImageUsageFlags,
        width: u32,
        height: u32,
    },
    RenderPassAttachments {
        render_pass: u64,
        samples: Vec<vk::SampleCountFlags>,
        resolves: u32,
    },
    Allocated {
        memory: u64,
        size: u64,
        memory_type_index: u32,
    },
    Bound {
        image: u64,
        memory: u64,
        offset: u64,
    },
    Transition {
        image: u64,
        aspect_mask: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
    FramebufferAttachments {
        framebuffer: u64,
        attachments: Vec<u64>,
        width: u32,
        height: u32,
    },
    SwapchainCreated {
        width: u32,
        height: u32,
        images: usize,
    },
}

/// Call that should fail with `ERROR_OUT_OF_DEVICE_MEMORY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateInstance,
    CreateDevice,
    CreateImage,
    AllocateMemory,
    BindMemory,
    CreateImageView,
    CreateRenderPass,
    /// The framebuffer created after `nth` successful ones.
    CreateFramebuffer { nth: usize },
    CreateSwapchain,
}

/// Everything the fake backend observed, in call order.
#[derive(Debug, Default)]
pub struct Ledger {
    events: Vec<Event>,
    next_handle: u64,
    fail: Option<FailPoint>,
}

impl Ledger {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.iter().position(pred)
    }

    pub fn created(&self, kind: ObjectKind) -> usize {
        self.count(|event| matches!(event, Event::Created { kind: k, .. } if *k == kind))
    }

    pub fn destroyed(&self, kind: ObjectKind) -> usize {
        self.count(|event| matches!(event, Event::Destroyed { kind: k, .. } if *k == kind))
    }

    pub fn live(&self, kind: ObjectKind) -> usize {
        self.created(kind).saturating_sub(self.destroyed(kind))
    }

    /// Objects created and not yet destroyed, over every kind.
    pub fn live_objects(&self) -> usize {
        ObjectKind::ALL.iter().map(|&kind| self.live(kind)).sum()
    }

    pub fn created_total(&self) -> usize {
        ObjectKind::ALL.iter().map(|&kind| self.created(kind)).sum()
    }

    /// How often `handle` was destroyed.
    pub fn destroy_count(&self, handle: u64) -> usize {
        self.count(|event| matches!(event, Event::Destroyed { handle: h, .. } if *h == handle))
    }

    /// Kinds of destroyed objects, in destruction order.
    pub fn destroyed_kinds(&self) -> Vec<ObjectKind> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Destroyed { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn instances_created(&self) -> usize {
        self.count(|event| matches!(event, Event::InstanceCreated { .. }))
    }

    pub fn instances_destroyed(&self) -> usize {
        self.count(|event| matches!(event, Event::InstanceDestroyed))
    }

    pub fn devices_destroyed(&self) -> usize {
        self.count(|event| matches!(event, Event::DeviceDestroyed))
    }

    /// Attachments of every framebuffer created, in creation order.
    pub fn framebuffer_attachments(&self) -> Vec<Vec<u64>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::FramebufferAttachments { attachments, .. } => Some(attachments.clone()),
                _ => None,
            })
            .collect()
    }

    /// Creation parameters of every image, in creation order.
    pub fn images(&self) -> Vec<ImageDescription> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                Event::ImageDescribed {
                    image,
                    format,
                    samples,
                    usage,
                    width,
                    height,
                } => Some(ImageDescription {
                    image,
                    format,
                    samples,
                    usage,
                    width,
                    height,
                }),
                _ => None,
            })
            .collect()
    }

    /// Attachment sample counts and resolve count of the newest render pass.
    pub fn last_render_pass(&self) -> Option<(Vec<vk::SampleCountFlags>, u32)> {
        self.events.iter().rev().find_map(|event| match event {
            Event::RenderPassAttachments {
                samples, resolves, ..
            } => Some((samples.clone(), *resolves)),
            _ => None,
        })
    }

    /// `(image, aspect, old, new)` of every recorded layout transition.
    pub fn transitions(
        &self,
    ) -> Vec<(u64, vk::ImageAspectFlags, vk::ImageLayout, vk::ImageLayout)> {
        self.events
            .iter()
            .filter_map(|event| match *event {
                Event::Transition {
                    image,
                    aspect_mask,
                    old_layout,
                    new_layout,
                } => Some((image, aspect_mask, old_layout, new_layout)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|event| pred(event)).count()
    }

    fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        0x1000 + self.next_handle
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail == Some(point) {
            Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
        } else {
            Ok(())
        }
    }

    fn create(&mut self, kind: ObjectKind, point: FailPoint) -> Result<u64> {
        self.check(point)?;
        let handle = self.next_handle();
        self.record(Event::Created { kind, handle });
        Ok(handle)
    }

    fn destroy(&mut self, kind: ObjectKind, handle: u64) {
        self.record(Event::Destroyed { kind, handle });
    }
}

/// What an image was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescription {
    pub image: u64,
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub usage: vk::ImageUsageFlags,
    pub width: u32,
    pub height: u32,
}

/// Shared handle to a [`Ledger`].
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    ledger: Arc<Mutex<Ledger>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock()
    }

    /// Make `point` fail until [`FakeBackend::clear_failure`].
    pub fn fail_at(&self, point: FailPoint) {
        self.ledger.lock().fail = Some(point);
    }

    pub fn clear_failure(&self) {
        self.ledger.lock().fail = None;
    }
}

/// What a fake GPU reports.
#[derive(Debug, Clone)]
pub struct FakeGpuConfig {
    pub name: String,
    pub vendor_id: u32,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
    /// Presentation support per queue family; missing entries mean `false`.
    pub present_support: Vec<bool>,
    /// Formats usable as optimal-tiling depth-stencil attachments.
    pub depth_formats: Vec<vk::Format>,
    pub color_sample_counts: vk::SampleCountFlags,
    pub depth_sample_counts: vk::SampleCountFlags,
    pub memory_types: Vec<vk::MemoryPropertyFlags>,
    /// Memory type mask reported for every image.
    pub image_memory_type_bits: u32,
    pub image_memory_size: u64,
    pub extensions: Vec<String>,
}

impl Default for FakeGpuConfig {
    fn default() -> Self {
        Self {
            name: "Fake GPU".to_string(),
            vendor_id: 0x10DE,
            queue_families: vec![family(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                4,
            )],
            present_support: vec![true],
            depth_formats: hearth_gpu::depth::DEPTH_FORMAT_CANDIDATES.to_vec(),
            color_sample_counts: vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_2
                | vk::SampleCountFlags::TYPE_4,
            depth_sample_counts: vk::SampleCountFlags::TYPE_1
                | vk::SampleCountFlags::TYPE_2
                | vk::SampleCountFlags::TYPE_4,
            memory_types: vec![
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            ],
            image_memory_type_bits: 0b11,
            image_memory_size: 0x40_0000,
            extensions: vec!["VK_KHR_swapchain".to_string()],
        }
    }
}

/// Queue family with `flags` and `queue_count` queues.
pub fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count,
        ..Default::default()
    }
}

/// Fake loader entry point.
pub struct FakeEntrypoint {
    backend: FakeBackend,
    gpus: Vec<FakeGpuConfig>,
    instance_extensions: Vec<String>,
}

impl FakeEntrypoint {
    /// One default GPU.
    pub fn new(backend: &FakeBackend) -> Self {
        Self {
            backend: backend.clone(),
            gpus: vec![FakeGpuConfig::default()],
            instance_extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_EXT_debug_utils".to_string(),
            ],
        }
    }

    #[must_use]
    pub fn gpus(mut self, gpus: Vec<FakeGpuConfig>) -> Self {
        self.gpus = gpus;
        self
    }

    #[must_use]
    pub fn instance_extensions(mut self, names: Vec<String>) -> Self {
        self.instance_extensions = names;
        self
    }
}

impl Entrypoint for FakeEntrypoint {
    type Instance = FakeInstance;

    fn instance_extension_names(&self) -> Result<Vec<String>> {
        Ok(self.instance_extensions.clone())
    }

    fn create_instance(&self, info: &InstanceCreateInfo<'_>) -> Result<FakeInstance> {
        let mut ledger = self.backend.ledger();
        ledger.check(FailPoint::CreateInstance)?;
        ledger.record(Event::InstanceCreated {
            application: info.application_info.application_name.clone(),
            layers: info.enabled_layer_names.to_vec(),
            extensions: info.enabled_extension_names.to_vec(),
        });
        Ok(FakeInstance {
            backend: self.backend.clone(),
            gpus: self.gpus.clone(),
        })
    }
}

pub struct FakeInstance {
    backend: FakeBackend,
    gpus: Vec<FakeGpuConfig>,
}

impl Instance for FakeInstance {
    type PhysicalDevice = FakePhysicalDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<FakePhysicalDevice>> {
        Ok(self
            .gpus
            .iter()
            .map(|config| FakePhysicalDevice {
                backend: self.backend.clone(),
                config: config.clone(),
            })
            .collect())
    }

    fn destroy(self) {
        self.backend.ledger().record(Event::InstanceDestroyed);
    }
}

pub struct FakePhysicalDevice {
    backend: FakeBackend,
    config: FakeGpuConfig,
}

impl FakePhysicalDevice {
    pub fn new(backend: &FakeBackend, config: FakeGpuConfig) -> Self {
        Self {
            backend: backend.clone(),
            config,
        }
    }

    pub const fn config(&self) -> &FakeGpuConfig {
        &self.config
    }
}

impl PhysicalDevice for FakePhysicalDevice {
    type Device = FakeDevice;

    fn properties(&self) -> vk::PhysicalDeviceProperties {
        let mut properties = vk::PhysicalDeviceProperties {
            api_version: vk::API_VERSION_1_0,
            vendor_id: self.config.vendor_id,
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            ..Default::default()
        };
        for (slot, byte) in properties
            .device_name
            .iter_mut()
            .zip(self.config.name.bytes().take(vk::MAX_PHYSICAL_DEVICE_NAME_SIZE - 1))
        {
            *slot = byte as c_char;
        }
        properties.limits.framebuffer_color_sample_counts = self.config.color_sample_counts;
        properties.limits.framebuffer_depth_sample_counts = self.config.depth_sample_counts;
        properties.limits.max_framebuffer_width = 16384;
        properties.limits.max_framebuffer_height = 16384;
        properties
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        let optimal_tiling_features = if self.config.depth_formats.contains(&format) {
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::FormatFeatureFlags::empty()
        };
        vk::FormatProperties {
            optimal_tiling_features,
            ..Default::default()
        }
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: u32::try_from(self.config.memory_types.len()).unwrap_or(0),
            ..Default::default()
        };
        for (slot, &flags) in properties
            .memory_types
            .iter_mut()
            .zip(&self.config.memory_types)
        {
            slot.property_flags = flags;
        }
        properties
    }

    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        self.config.queue_families.clone()
    }

    fn surface_support(&self, queue_family: u32, _surface: vk::SurfaceKHR) -> Result<bool> {
        Ok(self
            .config
            .present_support
            .get(queue_family as usize)
            .copied()
            .unwrap_or(false))
    }

    fn extension_names(&self) -> Result<Vec<String>> {
        Ok(self.config.extensions.clone())
    }

    fn create_device(&self, info: &DeviceCreateInfo<'_>) -> Result<FakeDevice> {
        let mut ledger = self.backend.ledger();
        ledger.check(FailPoint::CreateDevice)?;
        let (queue_family, queue_count) = info
            .queue_create_infos
            .first()
            .map_or((0, 0), |queue| (queue.queue_family_index, queue.queue_count()));
        ledger.record(Event::DeviceCreated {
            queue_family,
            queue_count,
            extensions: info.enabled_extension_names.to_vec(),
        });
        Ok(FakeDevice {
            backend: self.backend.clone(),
            memory_type_bits: self.config.image_memory_type_bits,
            memory_size: self.config.image_memory_size,
        })
    }
}

/// Fake logical device; records [`Event::DeviceDestroyed`] on drop.
pub struct FakeDevice {
    backend: FakeBackend,
    memory_type_bits: u32,
    memory_size: u64,
}

impl Device for FakeDevice {
    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image> {
        let mut ledger = self.backend.ledger();
        let handle = ledger.create(ObjectKind::Image, FailPoint::CreateImage)?;
        ledger.record(Event::ImageDescribed {
            image: handle,
            format: info.format,
            samples: info.samples,
            usage: info.usage,
            width: info.extent.width,
            height: info.extent.height,
        });
        Ok(vk::Image::from_raw(handle))
    }

    fn destroy_image(&self, image: vk::Image) {
        self.backend
            .ledger()
            .destroy(ObjectKind::Image, image.as_raw());
    }

    fn image_memory_requirements(&self, _image: vk::Image) -> vk::MemoryRequirements {
        vk::MemoryRequirements {
            size: self.memory_size,
            alignment: 256,
            memory_type_bits: self.memory_type_bits,
        }
    }

    fn allocate_memory(&self, info: &vk::MemoryAllocateInfo<'_>) -> Result<vk::DeviceMemory> {
        let mut ledger = self.backend.ledger();
        let memory = ledger.create(ObjectKind::Memory, FailPoint::AllocateMemory)?;
        ledger.record(Event::Allocated {
            memory,
            size: info.allocation_size,
            memory_type_index: info.memory_type_index,
        });
        Ok(vk::DeviceMemory::from_raw(memory))
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        self.backend
            .ledger()
            .destroy(ObjectKind::Memory, memory.as_raw());
    }

    fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        let mut ledger = self.backend.ledger();
        ledger.check(FailPoint::BindMemory)?;
        ledger.record(Event::Bound {
            image: image.as_raw(),
            memory: memory.as_raw(),
            offset,
        });
        Ok(())
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView> {
        let handle = self
            .backend
            .ledger()
            .create(ObjectKind::ImageView, FailPoint::CreateImageView)?;
        Ok(vk::ImageView::from_raw(handle))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.backend
            .ledger()
            .destroy(ObjectKind::ImageView, view.as_raw());
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo<'_>) -> Result<vk::RenderPass> {
        let mut ledger = self.backend.ledger();
        let handle = ledger.create(ObjectKind::RenderPass, FailPoint::CreateRenderPass)?;
        // SAFETY: the builder set each pointer and count from one live slice.
        let (attachments, subpasses) = unsafe {
            (
                raw_slice(info.p_attachments, info.attachment_count),
                raw_slice(info.p_subpasses, info.subpass_count),
            )
        };
        let resolves = subpasses
            .iter()
            .filter(|subpass| !subpass.p_resolve_attachments.is_null())
            .map(|subpass| subpass.color_attachment_count)
            .sum();
        ledger.record(Event::RenderPassAttachments {
            render_pass: handle,
            samples: attachments.iter().map(|attachment| attachment.samples).collect(),
            resolves,
        });
        Ok(vk::RenderPass::from_raw(handle))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.backend
            .ledger()
            .destroy(ObjectKind::RenderPass, render_pass.as_raw());
    }

    fn create_framebuffer(
        &self,
        info: &vk::FramebufferCreateInfo<'_>,
    ) -> Result<vk::Framebuffer> {
        let mut ledger = self.backend.ledger();
        let nth = ledger.created(ObjectKind::Framebuffer);
        let framebuffer = ledger.create(ObjectKind::Framebuffer, FailPoint::CreateFramebuffer { nth })?;
        // SAFETY: the builder set the pointer and count from one live slice.
        let attachments = unsafe { raw_slice(info.p_attachments, info.attachment_count) }
            .iter()
            .map(|view| view.as_raw())
            .collect();
        ledger.record(Event::FramebufferAttachments {
            framebuffer,
            attachments,
            width: info.width,
            height: info.height,
        });
        Ok(vk::Framebuffer::from_raw(framebuffer))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.backend
            .ledger()
            .destroy(ObjectKind::Framebuffer, framebuffer.as_raw());
    }

    fn queue(&self, queue_family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw((u64::from(queue_family) << 32) | (u64::from(index) + 1))
    }

    fn cmd_image_barrier(
        &self,
        _cmd: vk::CommandBuffer,
        _src_stage: vk::PipelineStageFlags,
        _dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier<'_>,
    ) {
        self.backend.ledger().record(Event::Transition {
            image: barrier.image.as_raw(),
            aspect_mask: barrier.subresource_range.aspect_mask,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
        });
    }
}

/// View `count` elements at `ptr` as a slice; empty when `count` is zero.
///
/// # Safety
/// A non-zero `count` requires `ptr` to point at that many live elements.
unsafe fn raw_slice<'a, T>(ptr: *const T, count: u32) -> &'a [T] {
    if count == 0 || ptr.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, count as usize) }
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.backend.ledger().record(Event::DeviceDestroyed);
    }
}

/// Swapchain stand-in with a fixed number of images.
///
/// Its images and views belong to the swapchain, so they are not part of
/// the leak balance.
pub struct FakeSwapchain {
    backend: FakeBackend,
    image_count: usize,
    surface_extent: Option<vk::Extent2D>,
    extent: vk::Extent2D,
    buffers: Vec<SwapchainBuffer>,
}

impl FakeSwapchain {
    pub fn new(backend: &FakeBackend, image_count: usize) -> Self {
        Self {
            backend: backend.clone(),
            image_count,
            surface_extent: None,
            extent: vk::Extent2D::default(),
            buffers: Vec::new(),
        }
    }

    /// Pin the image size like a surface reporting a current extent does,
    /// whatever size `create` asks for.
    #[must_use]
    pub const fn surface_extent(mut self, width: u32, height: u32) -> Self {
        self.surface_extent = Some(vk::Extent2D { width, height });
        self
    }
}

impl SwapchainCollection for FakeSwapchain {
    fn create(&mut self, _cmd: vk::CommandBuffer, width: u32, height: u32) -> Result<()> {
        let mut ledger = self.backend.ledger();
        ledger.check(FailPoint::CreateSwapchain)?;
        self.buffers = (0..self.image_count)
            .map(|_| SwapchainBuffer {
                image: vk::Image::from_raw(ledger.next_handle()),
                view: vk::ImageView::from_raw(ledger.next_handle()),
            })
            .collect();
        self.extent = self
            .surface_extent
            .unwrap_or(vk::Extent2D { width, height });
        ledger.record(Event::SwapchainCreated {
            width: self.extent.width,
            height: self.extent.height,
            images: self.image_count,
        });
        Ok(())
    }

    fn buffers(&self) -> &[SwapchainBuffer] {
        &self.buffers
    }

    fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}
