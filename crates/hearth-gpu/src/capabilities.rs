//! GPU capability detection.

use crate::instance::name_of;
use ash::vk;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub const fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Capabilities of a physical device relevant to render target setup.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    pub device_type: vk::PhysicalDeviceType,
    /// Vulkan API version
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,
    /// Sample counts usable for color framebuffer attachments
    pub color_sample_counts: vk::SampleCountFlags,
    /// Sample counts usable for depth framebuffer attachments
    pub depth_sample_counts: vk::SampleCountFlags,
    pub max_framebuffer_width: u32,
    pub max_framebuffer_height: u32,
}

impl GpuCapabilities {
    pub fn from_properties(properties: &vk::PhysicalDeviceProperties) -> Self {
        let limits = &properties.limits;
        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name: name_of(&properties.device_name),
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            color_sample_counts: limits.framebuffer_color_sample_counts,
            depth_sample_counts: limits.framebuffer_depth_sample_counts,
            max_framebuffer_width: limits.max_framebuffer_width,
            max_framebuffer_height: limits.max_framebuffer_height,
        }
    }

    /// Sample counts usable for both color and depth attachments.
    pub fn common_sample_counts(&self) -> vk::SampleCountFlags {
        self.color_sample_counts & self.depth_sample_counts
    }

    /// Whether `samples` (a single count) works for color and depth alike.
    pub fn supports_samples(&self, samples: vk::SampleCountFlags) -> bool {
        samples.as_raw().is_power_of_two() && self.common_sample_counts().contains(samples)
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}, {:?}) - Vulkan {}.{}.{} - samples {:?}",
            self.device_name,
            self.vendor,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.common_sample_counts(),
        )
    }
}
