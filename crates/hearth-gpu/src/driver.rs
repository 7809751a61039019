//! Instance ownership and logical device bootstrap.

use crate::api::{
    DeviceQueueCreateInfo, Entrypoint, ExtensionsOption, Instance, InstanceCreateInfo,
    PhysicalDevice, QueueAllocation,
};
use crate::capabilities::GpuCapabilities;
use crate::config::{ApplicationInfo, DriverConfig};
use crate::error::{GpuError, Result};
use crate::logical_device::{self, LogicalDevice};
use ash::vk;
use std::sync::Arc;

/// Device extension needed to present to a surface.
pub const SWAPCHAIN_EXTENSION: &str = "VK_KHR_swapchain";

/// Physical device type reachable from an entry point.
pub type GpuOf<E> = <<E as Entrypoint>::Instance as Instance>::PhysicalDevice;

/// Owns the API instance and creates logical devices from it.
///
/// The instance is created once by one of the `initialize` methods and
/// destroyed by [`Driver::dispose`]. Dropping an initialized driver disposes
/// it as well, with a warning.
pub struct Driver<E: Entrypoint> {
    entrypoint: E,
    instance: Option<E::Instance>,
    disposed: bool,
}

impl<E: Entrypoint> Driver<E> {
    pub const fn new(entrypoint: E) -> Self {
        Self {
            entrypoint,
            instance: None,
            disposed: false,
        }
    }

    pub const fn entrypoint(&self) -> &E {
        &self.entrypoint
    }

    /// The instance, once initialized.
    pub const fn instance(&self) -> Option<&E::Instance> {
        self.instance.as_ref()
    }

    pub const fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Create the instance without layers or extensions.
    pub fn initialize(&mut self, app_info: &ApplicationInfo) -> Result<()> {
        self.initialize_with(app_info, &[], &[])
    }

    /// Create the instance, optionally with every instance extension the
    /// loader exposes.
    pub fn initialize_with_extensions(
        &mut self,
        app_info: &ApplicationInfo,
        option: ExtensionsOption,
    ) -> Result<()> {
        let extensions = match option {
            ExtensionsOption::All => self.entrypoint.instance_extension_names()?,
            ExtensionsOption::Specific => Vec::new(),
        };
        self.initialize_with(app_info, &[], &extensions)
    }

    /// Create the instance with explicit layers and extensions.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn initialize_with(
        &mut self,
        app_info: &ApplicationInfo,
        layers: &[String],
        extensions: &[String],
    ) -> Result<()> {
        if self.disposed {
            return Err(GpuError::InvalidState("driver has been disposed".to_string()));
        }
        if self.instance.is_some() {
            return Err(GpuError::InvalidState("driver is already initialized".to_string()));
        }

        let instance = self.entrypoint.create_instance(&InstanceCreateInfo {
            application_info: app_info,
            enabled_layer_names: layers,
            enabled_extension_names: extensions,
        })?;
        self.instance = Some(instance);

        tracing::info!(
            "Driver initialized for {} ({} layer(s), {} extension(s))",
            app_info.application_name,
            layers.len(),
            extensions.len()
        );
        Ok(())
    }

    /// Create the instance from a [`DriverConfig`].
    pub fn initialize_from_config(&mut self, config: &DriverConfig) -> Result<()> {
        let mut extensions = match config.instance_extensions {
            ExtensionsOption::All => self.entrypoint.instance_extension_names()?,
            ExtensionsOption::Specific => Vec::new(),
        };
        for name in &config.extra_instance_extensions {
            if !extensions.contains(name) {
                extensions.push(name.clone());
            }
        }
        self.initialize_with(&config.application, &config.layers(), &extensions)
    }

    /// Create a graphics device on the first GPU.
    ///
    /// With a `surface`, the queue family must also be able to present to it.
    pub fn create_logical_device(
        &self,
        surface: Option<vk::SurfaceKHR>,
        option: ExtensionsOption,
    ) -> Result<LogicalDevice<GpuOf<E>>> {
        self.create_logical_device_inner(surface, option, QueueAllocation::One, &[])
    }

    /// [`Driver::create_logical_device`] with the device options of `config`.
    ///
    /// When a surface is given and only specific extensions are requested,
    /// `VK_KHR_swapchain` is enabled so the device can present.
    pub fn create_logical_device_with(
        &self,
        surface: Option<vk::SurfaceKHR>,
        config: &DriverConfig,
    ) -> Result<LogicalDevice<GpuOf<E>>> {
        let extra: Vec<String> = if surface.is_some() {
            vec![SWAPCHAIN_EXTENSION.to_string()]
        } else {
            Vec::new()
        };
        self.create_logical_device_inner(
            surface,
            config.device_extensions,
            config.queue_allocation,
            &extra,
        )
    }

    fn create_logical_device_inner(
        &self,
        surface: Option<vk::SurfaceKHR>,
        option: ExtensionsOption,
        allocation: QueueAllocation,
        extra_extensions: &[String],
    ) -> Result<LogicalDevice<GpuOf<E>>> {
        let instance = self.instance.as_ref().ok_or(GpuError::NotInitialized)?;
        let gpu = instance
            .enumerate_physical_devices()?
            .into_iter()
            .next()
            .ok_or(GpuError::NoSuitableDevice)?;

        let capabilities = GpuCapabilities::from_properties(&gpu.properties());
        tracing::info!("Selected GPU: {}", capabilities.summary());

        let extensions = match option {
            ExtensionsOption::All => gpu.extension_names()?,
            ExtensionsOption::Specific => extra_extensions.to_vec(),
        };

        logical_device::create_device(
            Arc::new(gpu),
            surface,
            allocation,
            vk::QueueFlags::GRAPHICS,
            &extensions,
        )
    }

    /// Create a device on `gpu` with queues from a family chosen for
    /// `requested`, presenting to `surface` if given.
    pub fn create_device(
        &self,
        gpu: Arc<GpuOf<E>>,
        surface: Option<vk::SurfaceKHR>,
        allocation: QueueAllocation,
        requested: vk::QueueFlags,
        extensions: &[String],
    ) -> Result<LogicalDevice<GpuOf<E>>> {
        self.ensure_initialized()?;
        logical_device::create_device(gpu, surface, allocation, requested, extensions)
    }

    /// Create a device on `gpu` from an explicit queue request.
    pub fn create_device_for_queue(
        &self,
        gpu: Arc<GpuOf<E>>,
        queue_create_info: &DeviceQueueCreateInfo,
        extensions: &[String],
    ) -> Result<LogicalDevice<GpuOf<E>>> {
        self.ensure_initialized()?;
        logical_device::create_device_for_queue(gpu, queue_create_info, extensions)
    }

    /// Physical devices visible to the instance.
    pub fn physical_devices(&self) -> Result<Vec<GpuOf<E>>> {
        self.instance
            .as_ref()
            .ok_or(GpuError::NotInitialized)?
            .enumerate_physical_devices()
    }

    /// Destroy the instance. Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        if let Some(instance) = self.instance.take() {
            instance.destroy();
            tracing::debug!("Driver disposed");
        }
        self.disposed = true;
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.instance.is_some() {
            Ok(())
        } else {
            Err(GpuError::NotInitialized)
        }
    }
}

impl<E: Entrypoint> Drop for Driver<E> {
    fn drop(&mut self) {
        if self.instance.is_some() {
            tracing::warn!("Driver dropped with its instance still held; disposing");
            self.dispose();
        }
    }
}
