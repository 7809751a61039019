//! Depth-stencil format negotiation.

use crate::error::{GpuError, Result};
use ash::vk;

/// Depth formats in descending precision order.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// First candidate whose optimal tiling supports depth-stencil attachments.
///
/// `format_properties` is normally
/// [`PhysicalDevice::format_properties`](crate::api::PhysicalDevice::format_properties).
pub fn select_depth_format(
    format_properties: impl Fn(vk::Format) -> vk::FormatProperties,
) -> Result<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|&format| {
            format_properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or(GpuError::NoSupportedDepthFormat)
}

/// Whether `format` carries a stencil component.
pub const fn has_stencil(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::S8_UINT
    )
}

/// Aspects a view of a `format` depth image covers.
pub fn depth_aspect_mask(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}
