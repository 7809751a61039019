use super::fake_graphics_device;
use crate::fake::{Event, FailPoint, FakeBackend, FakeGpuConfig, FakeSwapchain, ObjectKind};
use ash::vk;
use ash::vk::Handle;
use hearth_gpu::{
    prepare_color_attachments, BarrierImageTools, GpuError, GraphicsDeviceCreateInfo,
    SwapchainCollection,
};
use std::sync::Arc;

fn setup_cmd() -> vk::CommandBuffer {
    vk::CommandBuffer::from_raw(0x5e70)
}

fn info() -> GraphicsDeviceCreateInfo {
    GraphicsDeviceCreateInfo::new(800, 600)
}

/// Objects one successful `create` owns with `images` swapchain images.
const fn generation_size(images: usize) -> usize {
    // memory, image, view, render pass
    4 + images
}

/// Memory, image and view of the multisampled color target.
const COLOR_TARGET_OBJECTS: usize = 3;

fn created_handles(backend: &FakeBackend) -> Vec<u64> {
    backend
        .ledger()
        .events()
        .iter()
        .filter_map(|event| match event {
            Event::Created { handle, .. } => Some(*handle),
            _ => None,
        })
        .collect()
}

#[test]
fn create_succeeds_within_sample_limits() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 3);

    graphics
        .create(
            setup_cmd(),
            &mut swapchain,
            &info().samples(vk::SampleCountFlags::TYPE_4),
        )
        .unwrap();

    assert!(graphics.device_created());
    assert!(!graphics.render_pass().is_null());
    assert!(!graphics.depth_view().is_null());
    assert_eq!(
        graphics.held_resources(),
        generation_size(3) + COLOR_TARGET_OBJECTS
    );
    assert_eq!(
        backend.ledger().live_objects(),
        generation_size(3) + COLOR_TARGET_OBJECTS
    );
}

#[test]
fn multisampled_create_renders_at_requested_samples() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics
        .create(
            setup_cmd(),
            &mut swapchain,
            &info().samples(vk::SampleCountFlags::TYPE_4),
        )
        .unwrap();

    assert_eq!(graphics.samples(), vk::SampleCountFlags::TYPE_4);
    assert!(!graphics.color_target().is_null());

    let ledger = backend.ledger();
    let images = ledger.images();
    assert_eq!(images.len(), 2);
    let (depth, color) = (images[0], images[1]);
    assert_eq!(depth.format, graphics.depth_format());
    assert_eq!(depth.samples, vk::SampleCountFlags::TYPE_4);
    assert_eq!(color.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(color.samples, vk::SampleCountFlags::TYPE_4);
    assert!(color
        .usage
        .contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
    assert_eq!((color.width, color.height), (800, 600));

    let transitions = ledger.transitions();
    assert_eq!(transitions.len(), 2);
    assert_eq!(transitions[1].0, color.image);
    assert_eq!(transitions[1].1, vk::ImageAspectFlags::COLOR);
    assert_eq!(transitions[1].3, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let (samples, resolves) = ledger.last_render_pass().unwrap();
    assert_eq!(
        samples,
        vec![
            vk::SampleCountFlags::TYPE_4,
            vk::SampleCountFlags::TYPE_4,
            vk::SampleCountFlags::TYPE_1,
        ]
    );
    assert_eq!(resolves, 1);

    let color_target = graphics.color_target().as_raw();
    let depth_view = graphics.depth_view().as_raw();
    let attachments = ledger.framebuffer_attachments();
    drop(ledger);
    for (attachment, view) in attachments.iter().zip(swapchain_views(&swapchain)) {
        assert_eq!(attachment, &vec![color_target, depth_view, view]);
    }
}

#[test]
fn single_sampled_create_has_no_color_target() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    assert_eq!(graphics.samples(), vk::SampleCountFlags::TYPE_1);
    assert!(graphics.color_target().is_null());
    let ledger = backend.ledger();
    assert_eq!(ledger.images().len(), 1);
    assert_eq!(ledger.images()[0].samples, vk::SampleCountFlags::TYPE_1);
    assert_eq!(
        ledger.last_render_pass(),
        Some((
            vec![vk::SampleCountFlags::TYPE_1, vk::SampleCountFlags::TYPE_1],
            0
        ))
    );
}

#[test]
fn multisampled_teardown_releases_color_target_before_depth() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics
        .create(
            setup_cmd(),
            &mut swapchain,
            &info().samples(vk::SampleCountFlags::TYPE_2),
        )
        .unwrap();

    graphics.dispose();

    assert_eq!(
        backend.ledger().destroyed_kinds(),
        vec![
            ObjectKind::Framebuffer,
            ObjectKind::Framebuffer,
            ObjectKind::RenderPass,
            ObjectKind::ImageView,
            ObjectKind::Image,
            ObjectKind::Memory,
            ObjectKind::ImageView,
            ObjectKind::Image,
            ObjectKind::Memory,
        ]
    );
    assert!(graphics.color_target().is_null());
    assert_eq!(graphics.samples(), vk::SampleCountFlags::TYPE_1);
}

#[test]
fn failed_multisampled_create_rolls_back_everything() {
    let points = [
        FailPoint::CreateRenderPass,
        FailPoint::CreateSwapchain,
        FailPoint::CreateFramebuffer { nth: 1 },
    ];
    for point in points {
        let backend = FakeBackend::new();
        let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
        let mut swapchain = FakeSwapchain::new(&backend, 2);
        backend.fail_at(point);

        let result = graphics.create(
            setup_cmd(),
            &mut swapchain,
            &info().samples(vk::SampleCountFlags::TYPE_4),
        );

        assert!(result.is_err(), "{point:?} should fail");
        assert!(graphics.color_target().is_null(), "{point:?}");
        assert_eq!(graphics.held_resources(), 0, "{point:?}");
        assert_eq!(backend.ledger().live_objects(), 0, "{point:?}");
    }
}

#[test]
fn depth_image_can_be_read_back() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    let depth = backend.ledger().images()[0];
    assert!(depth.usage.contains(
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC
    ));
    assert_eq!((depth.width, depth.height), (800, 600));
}

#[test]
fn samples_beyond_color_limit_fail_before_allocation() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        color_sample_counts: vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2,
        depth_sample_counts: vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8,
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    let result = graphics.create(
        setup_cmd(),
        &mut swapchain,
        &info().samples(vk::SampleCountFlags::TYPE_4),
    );

    assert!(matches!(
        result,
        Err(GpuError::OutOfRange {
            parameter: "create_info.samples",
            ..
        })
    ));
    assert!(!graphics.device_created());
    assert_eq!(backend.ledger().created_total(), 0);
}

#[test]
fn samples_beyond_depth_limit_fail_before_allocation() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        color_sample_counts: vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_8,
        depth_sample_counts: vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4,
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    let result = graphics.create(
        setup_cmd(),
        &mut swapchain,
        &info().samples(vk::SampleCountFlags::TYPE_8),
    );

    assert!(matches!(result, Err(GpuError::OutOfRange { .. })));
    assert!(!graphics.device_created());
    assert_eq!(backend.ledger().created_total(), 0);
}

#[test]
fn recreate_releases_previous_generation_first() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 3);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();
    let first_generation = created_handles(&backend);
    let boundary = backend.ledger().events().len();

    graphics
        .create(setup_cmd(), &mut swapchain, &info().extent(1024, 768))
        .unwrap();

    let ledger = backend.ledger();
    let first_new = ledger
        .events()
        .iter()
        .skip(boundary)
        .position(|event| matches!(event, Event::Created { .. }))
        .map(|offset| boundary + offset)
        .unwrap();
    for handle in &first_generation {
        assert_eq!(ledger.destroy_count(*handle), 1);
        let destroyed_at = ledger
            .position(|event| matches!(event, Event::Destroyed { handle: h, .. } if h == handle))
            .unwrap();
        assert!(destroyed_at < first_new);
    }
    assert_eq!(ledger.live_objects(), generation_size(3));
    drop(ledger);
    assert_eq!(graphics.held_resources(), generation_size(3));
}

#[test]
fn one_framebuffer_per_swapchain_image() {
    for images in [1, 2, 3, 5] {
        let backend = FakeBackend::new();
        let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
        let mut swapchain = FakeSwapchain::new(&backend, images);

        graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

        assert_eq!(graphics.framebuffers().len(), images);
        let depth_view = graphics.depth_view().as_raw();
        let attachments = backend.ledger().framebuffer_attachments();
        assert_eq!(attachments.len(), images);
        for (attachment, buffer) in attachments.iter().zip(swapchain_views(&swapchain)) {
            assert_eq!(attachment, &vec![buffer, depth_view]);
        }
    }
}

fn swapchain_views(swapchain: &FakeSwapchain) -> Vec<u64> {
    swapchain
        .buffers()
        .iter()
        .map(|buffer| buffer.view.as_raw())
        .collect()
}

#[test]
fn swapchain_is_created_at_requested_extent() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics
        .create(setup_cmd(), &mut swapchain, &info().extent(640, 360))
        .unwrap();

    let ledger = backend.ledger();
    assert!(ledger.events().contains(&Event::SwapchainCreated {
        width: 640,
        height: 360,
        images: 2
    }));
    assert!(ledger.events().iter().any(|event| matches!(
        event,
        Event::FramebufferAttachments {
            width: 640,
            height: 360,
            ..
        }
    )));
}

#[test]
fn swapchain_at_other_extent_fails_and_rolls_back() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2).surface_extent(1600, 900);

    let result = graphics.create(setup_cmd(), &mut swapchain, &info().extent(1280, 720));

    assert!(matches!(
        result,
        Err(GpuError::OutOfRange {
            parameter: "create_info.extent",
            ..
        })
    ));
    assert!(!graphics.device_created());
    assert!(graphics.framebuffers().is_empty());
    assert_eq!(graphics.held_resources(), 0);
    assert_eq!(backend.ledger().live_objects(), 0);
    assert!(backend.ledger().framebuffer_attachments().is_empty());

    let extent = swapchain.extent();
    graphics
        .create(
            setup_cmd(),
            &mut swapchain,
            &info().extent(extent.width, extent.height),
        )
        .unwrap();
    assert_eq!(graphics.viewport().width, 1600.0);
    assert_eq!(graphics.scissor().extent.height, 900);
    let ledger = backend.ledger();
    let depth = ledger.images().last().copied().unwrap();
    assert_eq!((depth.width, depth.height), (1600, 900));
    assert!(ledger.events().iter().all(|event| !matches!(
        event,
        Event::FramebufferAttachments { width, height, .. } if (*width, *height) != (1600, 900)
    )));
}

#[test]
fn swapchain_images_are_prepared_for_attachment_use() {
    let backend = FakeBackend::new();
    let (device, _graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 3);
    swapchain.create(setup_cmd(), 800, 600).unwrap();
    let tools = BarrierImageTools::new(Arc::clone(device.device()));

    prepare_color_attachments(&tools, setup_cmd(), swapchain.buffers()).unwrap();

    let transitions = backend.ledger().transitions();
    assert_eq!(transitions.len(), 3);
    for (transition, buffer) in transitions.iter().zip(swapchain.buffers()) {
        assert_eq!(
            *transition,
            (
                buffer.image.as_raw(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            )
        );
    }
}

#[test]
fn depth_format_falls_back_to_d24_s8() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        depth_formats: vec![vk::Format::D24_UNORM_S8_UINT],
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    assert_eq!(graphics.depth_format(), vk::Format::D24_UNORM_S8_UINT);
    let transitions = backend.ledger().transitions();
    assert_eq!(transitions.len(), 1);
    assert_eq!(
        transitions[0].1,
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn depth_only_format_uses_depth_aspect() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        depth_formats: vec![vk::Format::D32_SFLOAT, vk::Format::D16_UNORM],
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    assert_eq!(graphics.depth_format(), vk::Format::D32_SFLOAT);
    assert_eq!(
        backend.ledger().transitions()[0].1,
        vk::ImageAspectFlags::DEPTH
    );
}

#[test]
fn explicit_depth_format_skips_negotiation() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics
        .create(
            setup_cmd(),
            &mut swapchain,
            &info().depth_format(vk::Format::D16_UNORM),
        )
        .unwrap();

    assert_eq!(graphics.depth_format(), vk::Format::D16_UNORM);
}

#[test]
fn missing_depth_support_fails_cleanly() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        depth_formats: Vec::new(),
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    let result = graphics.create(setup_cmd(), &mut swapchain, &info());

    assert!(matches!(result, Err(GpuError::NoSupportedDepthFormat)));
    assert_eq!(backend.ledger().created_total(), 0);
}

#[test]
fn depth_image_is_transitioned_for_attachment_use() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    let ledger = backend.ledger();
    let image = ledger
        .events()
        .iter()
        .find_map(|event| match event {
            Event::Created {
                kind: ObjectKind::Image,
                handle,
            } => Some(*handle),
            _ => None,
        })
        .unwrap();
    let (transitioned, _, old_layout, new_layout) = ledger.transitions()[0];
    assert_eq!(transitioned, image);
    assert_eq!(old_layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(new_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
}

#[test]
fn depth_memory_is_device_local_and_bound_at_zero() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig::default();
    let size = gpu.image_memory_size;
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    let ledger = backend.ledger();
    let (memory, allocated, memory_type_index) = ledger
        .events()
        .iter()
        .find_map(|event| match *event {
            Event::Allocated {
                memory,
                size,
                memory_type_index,
            } => Some((memory, size, memory_type_index)),
            _ => None,
        })
        .unwrap();
    // Type 0 is host visible, type 1 device local.
    assert_eq!(memory_type_index, 1);
    assert_eq!(allocated, size);
    assert!(ledger.events().iter().any(|event| matches!(
        event,
        Event::Bound { memory: m, offset: 0, .. } if *m == memory
    )));
}

#[test]
fn missing_device_local_memory_leaks_nothing() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        memory_types: vec![vk::MemoryPropertyFlags::HOST_VISIBLE],
        image_memory_type_bits: 0b1,
        ..FakeGpuConfig::default()
    };
    let (_device, mut graphics) = fake_graphics_device(&backend, gpu);
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    let result = graphics.create(setup_cmd(), &mut swapchain, &info());

    assert!(matches!(
        result,
        Err(GpuError::NoSuitableMemoryType { type_bits: 0b1, .. })
    ));
    assert_eq!(backend.ledger().live_objects(), 0);
    assert!(!graphics.device_created());
}

#[test]
fn failed_create_rolls_back_everything() {
    let points = [
        FailPoint::CreateImage,
        FailPoint::AllocateMemory,
        FailPoint::BindMemory,
        FailPoint::CreateImageView,
        FailPoint::CreateRenderPass,
        FailPoint::CreateSwapchain,
        FailPoint::CreateFramebuffer { nth: 0 },
        FailPoint::CreateFramebuffer { nth: 2 },
    ];
    for point in points {
        let backend = FakeBackend::new();
        let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
        let mut swapchain = FakeSwapchain::new(&backend, 3);
        backend.fail_at(point);

        let result = graphics.create(setup_cmd(), &mut swapchain, &info());

        assert!(result.is_err(), "{point:?} should fail");
        assert!(!graphics.device_created(), "{point:?}");
        assert_eq!(graphics.held_resources(), 0, "{point:?}");
        assert!(graphics.render_pass().is_null(), "{point:?}");
        assert!(graphics.depth_view().is_null(), "{point:?}");
        assert!(graphics.framebuffers().is_empty(), "{point:?}");
        assert_eq!(backend.ledger().live_objects(), 0, "{point:?}");
    }
}

#[test]
fn failed_recreate_leaves_nothing_and_can_retry() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    backend.fail_at(FailPoint::CreateRenderPass);
    assert!(graphics.create(setup_cmd(), &mut swapchain, &info()).is_err());
    assert!(!graphics.device_created());
    assert_eq!(backend.ledger().live_objects(), 0);

    backend.clear_failure();
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();
    assert!(graphics.device_created());
    assert_eq!(backend.ledger().live_objects(), generation_size(2));
}

#[test]
fn teardown_runs_in_reverse_creation_order() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 3);
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    graphics.dispose();

    assert_eq!(
        backend.ledger().destroyed_kinds(),
        vec![
            ObjectKind::Framebuffer,
            ObjectKind::Framebuffer,
            ObjectKind::Framebuffer,
            ObjectKind::RenderPass,
            ObjectKind::ImageView,
            ObjectKind::Image,
            ObjectKind::Memory,
        ]
    );
}

#[test]
fn dispose_is_idempotent() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();
    let handles = created_handles(&backend);

    graphics.dispose();
    graphics.dispose();
    drop(graphics);

    let ledger = backend.ledger();
    for handle in handles {
        assert_eq!(ledger.destroy_count(handle), 1);
    }
    assert_eq!(ledger.live_objects(), 0);
}

#[test]
fn disposed_device_cannot_be_created() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics.dispose();

    let result = graphics.create(setup_cmd(), &mut swapchain, &info());

    assert!(matches!(result, Err(GpuError::InvalidState(_))));
    assert!(graphics.is_disposed());
    assert_eq!(backend.ledger().created_total(), 0);
}

#[test]
fn invalid_arguments_are_rejected_before_gpu_work() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    let null_cmd = graphics.create(vk::CommandBuffer::null(), &mut swapchain, &info());
    assert!(matches!(
        null_cmd,
        Err(GpuError::InvalidArgument {
            parameter: "setup_cmd",
            ..
        })
    ));

    let empty = graphics.create(setup_cmd(), &mut swapchain, &info().extent(0, 600));
    assert!(matches!(
        empty,
        Err(GpuError::InvalidArgument {
            parameter: "create_info",
            ..
        })
    ));

    let colorless = graphics.create(
        setup_cmd(),
        &mut swapchain,
        &info().color_format(vk::Format::UNDEFINED),
    );
    assert!(matches!(colorless, Err(GpuError::InvalidArgument { .. })));

    assert_eq!(backend.ledger().created_total(), 0);
}

#[test]
fn viewport_and_scissor_cover_the_extent() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);

    graphics
        .create(setup_cmd(), &mut swapchain, &info().extent(1920, 1080))
        .unwrap();

    let viewport = graphics.viewport();
    assert_eq!((viewport.x, viewport.y), (0.0, 0.0));
    assert_eq!((viewport.width, viewport.height), (1920.0, 1080.0));
    assert_eq!((viewport.min_depth, viewport.max_depth), (0.0, 1.0));

    let scissor = graphics.scissor();
    assert_eq!((scissor.offset.x, scissor.offset.y), (0, 0));
    assert_eq!(
        (scissor.extent.width, scissor.extent.height),
        (1920, 1080)
    );
}

#[test]
fn release_allows_recreation() {
    let backend = FakeBackend::new();
    let (_device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    graphics.release();
    graphics.release();
    assert!(!graphics.device_created());
    assert!(!graphics.is_disposed());
    assert_eq!(backend.ledger().live_objects(), 0);

    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();
    assert!(graphics.device_created());
}

#[test]
fn drop_releases_held_resources() {
    let backend = FakeBackend::new();
    let (device, mut graphics) = fake_graphics_device(&backend, FakeGpuConfig::default());
    let mut swapchain = FakeSwapchain::new(&backend, 2);
    graphics.create(setup_cmd(), &mut swapchain, &info()).unwrap();

    drop(graphics);
    assert_eq!(backend.ledger().live_objects(), 0);

    drop(device);
    assert_eq!(backend.ledger().devices_destroyed(), 1);
}
