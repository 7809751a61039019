//! Ordered ownership of GPU objects.
//!
//! Every object a [`GraphicsDevice`](crate::GraphicsDevice) creates is pushed
//! here in acquisition order and destroyed by popping, so teardown is always
//! the exact reverse of creation.

use crate::api::Device;
use ash::vk;

/// A GPU object owned by a [`ResourceStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedResource {
    Memory(vk::DeviceMemory),
    Image(vk::Image),
    ImageView(vk::ImageView),
    RenderPass(vk::RenderPass),
    Framebuffer(vk::Framebuffer),
}

impl OwnedResource {
    /// Destroy the object through `device`.
    pub fn destroy<D: Device + ?Sized>(self, device: &D) {
        match self {
            Self::Memory(memory) => device.free_memory(memory),
            Self::Image(image) => device.destroy_image(image),
            Self::ImageView(view) => device.destroy_image_view(view),
            Self::RenderPass(render_pass) => device.destroy_render_pass(render_pass),
            Self::Framebuffer(framebuffer) => device.destroy_framebuffer(framebuffer),
        }
    }
}

/// Stack of owned GPU objects.
#[derive(Debug, Default)]
pub struct ResourceStack {
    entries: Vec<OwnedResource>,
}

impl ResourceStack {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Take ownership of `resource`.
    pub fn push(&mut self, resource: OwnedResource) {
        self.entries.push(resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned objects in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = &OwnedResource> {
        self.entries.iter()
    }

    /// Remove every object, most recently acquired first.
    pub fn drain_reverse(&mut self) -> impl Iterator<Item = OwnedResource> + '_ {
        self.entries.drain(..).rev()
    }

    /// Destroy every object through `device`, most recently acquired first.
    ///
    /// Returns how many objects were destroyed.
    pub fn release<D: Device + ?Sized>(&mut self, device: &D) -> usize {
        let mut released = 0;
        for resource in self.drain_reverse() {
            resource.destroy(device);
            released += 1;
        }
        released
    }
}
