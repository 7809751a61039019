//! Image layout transitions recorded into caller command buffers.

use crate::api::Device;
use crate::error::{GpuError, Result};
use ash::vk;
use std::sync::Arc;

/// Records image layout transitions.
pub trait ImageTools {
    fn set_image_layout(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        aspect_mask: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<()>;
}

/// Access mask and pipeline stage that touch an image in `layout`.
///
/// Used as the source scope when leaving `layout` and as the destination
/// scope when entering it.
pub fn layout_scope(layout: vk::ImageLayout) -> Result<(vk::AccessFlags, vk::PipelineStageFlags)> {
    let scope = match layout {
        vk::ImageLayout::UNDEFINED | vk::ImageLayout::PREINITIALIZED => {
            (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE)
        }
        vk::ImageLayout::GENERAL => (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => {
            (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER)
        }
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => {
            (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER)
        }
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => {
            (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER)
        }
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            // Reads happen in the early tests, writes in the late ones.
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => {
            (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE)
        }
        other => {
            return Err(GpuError::invalid_argument(
                "layout",
                format!("unsupported layout transition endpoint {other:?}"),
            ))
        }
    };
    Ok(scope)
}

/// [`ImageTools`] that records a pipeline barrier through the device.
pub struct BarrierImageTools<D: Device> {
    device: Arc<D>,
}

impl<D: Device> BarrierImageTools<D> {
    pub const fn new(device: Arc<D>) -> Self {
        Self { device }
    }
}

impl<D: Device> ImageTools for BarrierImageTools<D> {
    fn set_image_layout(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        aspect_mask: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<()> {
        if new_layout == vk::ImageLayout::UNDEFINED || new_layout == vk::ImageLayout::PREINITIALIZED
        {
            return Err(GpuError::invalid_argument(
                "new_layout",
                format!("images cannot transition to {new_layout:?}"),
            ));
        }
        let (src_access, src_stage) = layout_scope(old_layout)?;
        let (dst_access, dst_stage) = layout_scope(new_layout)?;

        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(vk::REMAINING_MIP_LEVELS)
                    .base_array_layer(0)
                    .layer_count(vk::REMAINING_ARRAY_LAYERS),
            );

        self.device.cmd_image_barrier(cmd, src_stage, dst_stage, &barrier);
        Ok(())
    }
}
