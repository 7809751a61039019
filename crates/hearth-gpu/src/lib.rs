//! Managed Vulkan objects for the hearth renderer.
//!
//! This crate provides:
//! - Instance ownership and logical device bootstrap ([`Driver`])
//! - Queue family selection, including presentation support
//! - Depth buffer, render pass and framebuffers per swapchain ([`GraphicsDevice`])
//! - An `ash` backend for the capability traits in [`api`]
//! - Surfaces, swapchains and setup command buffers

pub mod api;
pub mod capabilities;
pub mod command;
pub mod config;
pub mod depth;
pub mod device;
pub mod driver;
pub mod error;
pub mod graphics_device;
pub mod image_tools;
pub mod instance;
pub mod logical_device;
pub mod memory;
pub mod queue;
pub mod render_pass;
pub mod resources;
pub mod surface;
pub mod swapchain;

pub use api::{
    Device, DeviceCreateInfo, DeviceQueueCreateInfo, Entrypoint, ExtensionsOption, Instance,
    InstanceCreateInfo, PhysicalDevice, QueueAllocation,
};
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::CommandPool;
pub use config::{validation_layers, ApplicationInfo, DriverConfig};
pub use device::AshDevice;
pub use driver::{Driver, GpuOf};
pub use error::{GpuError, Result};
pub use graphics_device::{GraphicsDevice, GraphicsDeviceCreateInfo};
pub use image_tools::{BarrierImageTools, ImageTools};
pub use instance::{AshEntrypoint, AshInstance, AshPhysicalDevice};
pub use logical_device::{LogicalDevice, QueueInfo};
pub use memory::{DevicePartition, ThreadPartition};
pub use resources::{OwnedResource, ResourceStack};
pub use surface::Surface;
pub use swapchain::{
    prepare_color_attachments, AshSwapchainCollection, SwapchainBuffer, SwapchainCollection,
};
