//! Color + depth render pass.

use crate::api::Device;
use crate::error::Result;
use ash::vk;

/// Attachment slot of the color image the subpass renders into.
pub const COLOR_ATTACHMENT: u32 = 0;
/// Attachment slot of the shared depth-stencil image.
pub const DEPTH_ATTACHMENT: u32 = 1;
/// Attachment slot of the swapchain image a multisampled pass resolves into.
pub const RESOLVE_ATTACHMENT: u32 = 2;

/// Whether a pass at `samples` needs a resolve attachment.
pub fn is_multisampled(samples: vk::SampleCountFlags) -> bool {
    samples != vk::SampleCountFlags::TYPE_1
}

/// Attachment descriptions for a color + depth pass at `samples`.
///
/// Color and depth are cleared on load; stencil contents are don't-care.
/// Single-sampled passes store straight into the swapchain image. A
/// multisampled pass renders into transient color and depth images and
/// resolves color into a third, single-sampled attachment. Every
/// attachment stays in its attachment-optimal layout.
pub fn attachment_descriptions(
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Vec<vk::AttachmentDescription> {
    let multisampled = is_multisampled(samples);
    let color_store = if multisampled {
        vk::AttachmentStoreOp::DONT_CARE
    } else {
        vk::AttachmentStoreOp::STORE
    };

    let mut attachments = vec![
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(color_store)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];
    if multisampled {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(color_format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::DONT_CARE)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        );
    }
    attachments
}

/// Create a render pass with one graphics subpass writing the color and
/// depth attachments, resolving color when `samples` is above one.
pub fn create_render_pass<D: Device + ?Sized>(
    device: &D,
    color_format: vk::Format,
    depth_format: vk::Format,
    samples: vk::SampleCountFlags,
) -> Result<vk::RenderPass> {
    let attachments = attachment_descriptions(color_format, depth_format, samples);

    let color_refs = [vk::AttachmentReference {
        attachment: COLOR_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let resolve_refs = [vk::AttachmentReference {
        attachment: RESOLVE_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: DEPTH_ATTACHMENT,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref);
    if is_multisampled(samples) {
        subpass = subpass.resolve_attachments(&resolve_refs);
    }
    let subpasses = [subpass];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);

    device.create_render_pass(&create_info)
}
