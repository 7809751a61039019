//! Driver and graphics device behaviour against the fake backend.

mod driver;
mod graphics_device;

use crate::fake::{FakeBackend, FakeEntrypoint, FakeGpuConfig, FakePhysicalDevice};
use hearth_gpu::{
    ApplicationInfo, DevicePartition, Driver, ExtensionsOption, GraphicsDevice, LogicalDevice,
};

/// Driver over one fake GPU, already initialized.
fn initialized_driver(backend: &FakeBackend, gpu: FakeGpuConfig) -> Driver<FakeEntrypoint> {
    let mut driver = Driver::new(FakeEntrypoint::new(backend).gpus(vec![gpu]));
    driver.initialize(&ApplicationInfo::new("scenario")).unwrap();
    driver
}

/// Logical device on `gpu` and a graphics device on top of it.
fn fake_graphics_device(
    backend: &FakeBackend,
    gpu: FakeGpuConfig,
) -> (
    LogicalDevice<FakePhysicalDevice>,
    GraphicsDevice<DevicePartition<FakePhysicalDevice>>,
) {
    let mut driver = initialized_driver(backend, gpu);
    let logical_device = driver
        .create_logical_device(None, ExtensionsOption::Specific)
        .unwrap();
    driver.dispose();
    let graphics = GraphicsDevice::from_logical_device(&logical_device);
    (logical_device, graphics)
}
