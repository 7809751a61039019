use super::initialized_driver;
use crate::fake::{
    family, Event, FailPoint, FakeBackend, FakeEntrypoint, FakeGpuConfig, FakePhysicalDevice,
};
use ash::vk;
use ash::vk::Handle;
use hearth_gpu::{
    ApplicationInfo, DeviceQueueCreateInfo, Driver, DriverConfig, ExtensionsOption, GpuError,
    QueueAllocation,
};
use std::sync::Arc;

fn surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(0xdead_beef)
}

fn gpu_with_families(
    families: Vec<vk::QueueFamilyProperties>,
    present_support: Vec<bool>,
) -> FakeGpuConfig {
    FakeGpuConfig {
        queue_families: families,
        present_support,
        ..FakeGpuConfig::default()
    }
}

fn created_device(backend: &FakeBackend) -> Option<(u32, u32, Vec<String>)> {
    backend.ledger().events().iter().find_map(|event| match event {
        Event::DeviceCreated {
            queue_family,
            queue_count,
            extensions,
        } => Some((*queue_family, *queue_count, extensions.clone())),
        _ => None,
    })
}

fn created_instance(backend: &FakeBackend) -> Option<(Vec<String>, Vec<String>)> {
    backend.ledger().events().iter().find_map(|event| match event {
        Event::InstanceCreated {
            layers, extensions, ..
        } => Some((layers.clone(), extensions.clone())),
        _ => None,
    })
}

#[test]
fn initialize_twice_is_rejected() {
    let backend = FakeBackend::new();
    let mut driver = initialized_driver(&backend, FakeGpuConfig::default());

    let second = driver.initialize(&ApplicationInfo::default());
    assert!(matches!(second, Err(GpuError::InvalidState(_))));
    assert_eq!(backend.ledger().instances_created(), 1);
    assert!(driver.is_initialized());
}

#[test]
fn initialize_after_dispose_is_rejected() {
    let backend = FakeBackend::new();
    let mut driver = initialized_driver(&backend, FakeGpuConfig::default());
    driver.dispose();

    let again = driver.initialize(&ApplicationInfo::default());
    assert!(matches!(again, Err(GpuError::InvalidState(_))));
    assert_eq!(backend.ledger().instances_created(), 1);
}

#[test]
fn dispose_is_idempotent() {
    let backend = FakeBackend::new();
    let mut driver = initialized_driver(&backend, FakeGpuConfig::default());

    driver.dispose();
    driver.dispose();
    drop(driver);

    assert_eq!(backend.ledger().instances_destroyed(), 1);
}

#[test]
fn drop_disposes_held_instance() {
    let backend = FakeBackend::new();
    {
        let driver = initialized_driver(&backend, FakeGpuConfig::default());
        assert!(!driver.is_disposed());
    }
    assert_eq!(backend.ledger().instances_destroyed(), 1);
}

#[test]
fn dispose_without_instance_destroys_nothing() {
    let backend = FakeBackend::new();
    let mut driver = Driver::new(FakeEntrypoint::new(&backend));
    driver.dispose();
    assert!(driver.is_disposed());
    assert_eq!(backend.ledger().instances_destroyed(), 0);
}

#[test]
fn all_instance_extensions_are_passed() {
    let backend = FakeBackend::new();
    let names = vec![
        "VK_KHR_surface".to_string(),
        "VK_KHR_xlib_surface".to_string(),
        "VK_EXT_debug_utils".to_string(),
    ];
    let mut driver =
        Driver::new(FakeEntrypoint::new(&backend).instance_extensions(names.clone()));

    driver
        .initialize_with_extensions(&ApplicationInfo::default(), ExtensionsOption::All)
        .unwrap();

    assert_eq!(created_instance(&backend), Some((Vec::new(), names)));
}

#[test]
fn specific_instance_extensions_pass_none() {
    let backend = FakeBackend::new();
    let mut driver = Driver::new(FakeEntrypoint::new(&backend));

    driver
        .initialize_with_extensions(&ApplicationInfo::default(), ExtensionsOption::Specific)
        .unwrap();

    assert_eq!(created_instance(&backend), Some((Vec::new(), Vec::new())));
}

#[test]
fn config_supplies_layers_and_extra_extensions() {
    let backend = FakeBackend::new();
    let mut driver = Driver::new(FakeEntrypoint::new(&backend));
    let config = DriverConfig::new()
        .app_name("configured")
        .validation(true)
        .extra_instance_extensions(["VK_KHR_surface".to_string()]);

    driver.initialize_from_config(&config).unwrap();

    let ledger = backend.ledger();
    assert!(matches!(
        ledger.events().first(),
        Some(Event::InstanceCreated { application, .. }) if application == "configured"
    ));
    drop(ledger);
    assert_eq!(
        created_instance(&backend),
        Some((hearth_gpu::validation_layers(), vec!["VK_KHR_surface".to_string()]))
    );
}

#[test]
fn instance_creation_failure_propagates() {
    let backend = FakeBackend::new();
    backend.fail_at(FailPoint::CreateInstance);
    let mut driver = Driver::new(FakeEntrypoint::new(&backend));

    let result = driver.initialize(&ApplicationInfo::default());
    assert!(matches!(
        result,
        Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
    ));
    assert!(!driver.is_initialized());

    backend.clear_failure();
    driver.initialize(&ApplicationInfo::default()).unwrap();
    assert!(driver.is_initialized());
}

#[test]
fn logical_device_requires_instance() {
    let backend = FakeBackend::new();
    let driver = Driver::new(FakeEntrypoint::new(&backend));

    let result = driver.create_logical_device(None, ExtensionsOption::Specific);
    assert!(matches!(result, Err(GpuError::NotInitialized)));
}

#[test]
fn no_gpu_means_no_suitable_device() {
    let backend = FakeBackend::new();
    let mut driver = Driver::new(FakeEntrypoint::new(&backend).gpus(Vec::new()));
    driver.initialize(&ApplicationInfo::default()).unwrap();

    let result = driver.create_logical_device(None, ExtensionsOption::Specific);
    assert!(matches!(result, Err(GpuError::NoSuitableDevice)));
}

#[test]
fn headless_selection_takes_first_graphics_family() {
    let backend = FakeBackend::new();
    let gpu = gpu_with_families(
        vec![
            family(vk::QueueFlags::TRANSFER, 2),
            family(vk::QueueFlags::COMPUTE, 2),
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 16),
        ],
        Vec::new(),
    );
    let driver = initialized_driver(&backend, gpu);

    let device = driver
        .create_logical_device(None, ExtensionsOption::Specific)
        .unwrap();

    assert_eq!(device.queue_family(), 2);
    assert_eq!(device.queues().len(), 1);
    assert_eq!(created_device(&backend), Some((2, 1, Vec::new())));
}

#[test]
fn surface_selection_picks_common_family() {
    let backend = FakeBackend::new();
    let gpu = gpu_with_families(
        vec![
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1),
        ],
        vec![false, true, true],
    );
    let driver = initialized_driver(&backend, gpu);

    let device = driver
        .create_logical_device(Some(surface()), ExtensionsOption::Specific)
        .unwrap();

    assert_eq!(device.queue_family(), 2);
}

#[test]
fn surface_selection_without_common_family_fails() {
    let backend = FakeBackend::new();
    let gpu = gpu_with_families(
        vec![
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ],
        vec![false, true],
    );
    let driver = initialized_driver(&backend, gpu);

    let result = driver.create_logical_device(Some(surface()), ExtensionsOption::Specific);

    assert!(matches!(
        result,
        Err(GpuError::NoCommonQueue {
            graphics: 0,
            present: 1
        })
    ));
    assert_eq!(created_device(&backend), None);
}

#[test]
fn surface_selection_without_presenting_family_fails() {
    let backend = FakeBackend::new();
    let gpu = gpu_with_families(vec![family(vk::QueueFlags::GRAPHICS, 1)], vec![false]);
    let driver = initialized_driver(&backend, gpu);

    let result = driver.create_logical_device(Some(surface()), ExtensionsOption::Specific);
    assert!(matches!(result, Err(GpuError::NoPresentationQueue)));
}

#[test]
fn queue_allocation_all_yields_every_queue() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());
    let config = DriverConfig::new().queue_allocation(QueueAllocation::All);

    let device = driver.create_logical_device_with(None, &config).unwrap();

    let indices: Vec<u32> = device.queues().iter().map(|q| q.queue_index()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(device.queues().iter().all(|q| q.queue_family() == 0));
    assert!(device
        .queues()
        .iter()
        .all(|q| Arc::ptr_eq(q.device(), device.device())));
    assert_eq!(created_device(&backend).map(|(_, count, _)| count), Some(4));
}

#[test]
fn all_device_extensions_are_enabled() {
    let backend = FakeBackend::new();
    let gpu = FakeGpuConfig {
        extensions: vec![
            "VK_KHR_swapchain".to_string(),
            "VK_KHR_maintenance1".to_string(),
        ],
        ..FakeGpuConfig::default()
    };
    let driver = initialized_driver(&backend, gpu.clone());

    driver
        .create_logical_device(None, ExtensionsOption::All)
        .unwrap();

    assert_eq!(
        created_device(&backend).map(|(_, _, extensions)| extensions),
        Some(gpu.extensions)
    );
}

#[test]
fn presenting_device_enables_swapchain() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());

    driver
        .create_logical_device_with(Some(surface()), &DriverConfig::new())
        .unwrap();

    assert_eq!(
        created_device(&backend).map(|(_, _, extensions)| extensions),
        Some(vec![hearth_gpu::driver::SWAPCHAIN_EXTENSION.to_string()])
    );
}

#[test]
fn explicit_queue_request_is_validated() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());
    let gpu = Arc::new(FakePhysicalDevice::new(&backend, FakeGpuConfig::default()));

    let empty = DeviceQueueCreateInfo {
        queue_family_index: 0,
        queue_priorities: Vec::new(),
    };
    let missing_family = DeviceQueueCreateInfo::uniform(7, 1);
    let too_many = DeviceQueueCreateInfo::uniform(0, 5);

    for info in [empty, missing_family, too_many] {
        let result = driver.create_device_for_queue(Arc::clone(&gpu), &info, &[]);
        assert!(matches!(
            result,
            Err(GpuError::InvalidArgument {
                parameter: "queue_create_info",
                ..
            })
        ));
    }
    assert_eq!(created_device(&backend), None);
}

#[test]
fn explicit_queue_request_fetches_each_queue() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());
    let gpu = Arc::new(FakePhysicalDevice::new(&backend, FakeGpuConfig::default()));

    let device = driver
        .create_device_for_queue(gpu, &DeviceQueueCreateInfo::uniform(0, 2), &[])
        .unwrap();

    let queues = device.queues();
    assert_eq!(queues.len(), 2);
    assert_ne!(queues[0].queue(), queues[1].queue());
    assert_eq!(queues[1].queue_index(), 1);
}

#[test]
fn explicit_device_creation_requires_instance() {
    let backend = FakeBackend::new();
    let driver = Driver::new(FakeEntrypoint::new(&backend));
    let gpu = Arc::new(FakePhysicalDevice::new(&backend, FakeGpuConfig::default()));

    let result = driver.create_device(
        gpu,
        None,
        QueueAllocation::One,
        vk::QueueFlags::GRAPHICS,
        &[],
    );
    assert!(matches!(result, Err(GpuError::NotInitialized)));
}

#[test]
fn device_creation_failure_propagates() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());
    backend.fail_at(FailPoint::CreateDevice);

    let result = driver.create_logical_device(None, ExtensionsOption::Specific);
    assert!(matches!(result, Err(GpuError::Vulkan(_))));
}

#[test]
fn dropping_logical_device_destroys_device() {
    let backend = FakeBackend::new();
    let driver = initialized_driver(&backend, FakeGpuConfig::default());

    let device = driver
        .create_logical_device(None, ExtensionsOption::Specific)
        .unwrap();
    assert_eq!(backend.ledger().devices_destroyed(), 0);
    drop(device);
    assert_eq!(backend.ledger().devices_destroyed(), 1);
}
