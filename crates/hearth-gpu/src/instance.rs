//! Vulkan instance and physical devices on `ash`.

use crate::api::{DeviceCreateInfo, Entrypoint, Instance, InstanceCreateInfo, PhysicalDevice};
use crate::device::AshDevice;
use crate::error::{GpuError, Result};
use ash::vk;
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

/// Instance state shared by everything created from it.
///
/// The instance is destroyed when the last holder goes away, so physical
/// devices, devices and surfaces never outlive it.
pub(crate) struct InstanceShared {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
}

impl Drop for InstanceShared {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
        tracing::debug!("Vulkan instance destroyed");
    }
}

/// Loaded Vulkan entry point.
#[derive(Clone)]
pub struct AshEntrypoint {
    entry: ash::Entry,
}

impl AshEntrypoint {
    /// Load the system Vulkan loader.
    pub fn load() -> Result<Self> {
        // SAFETY: the loader is kept alive by `entry` for as long as it is used.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;
        Ok(Self { entry })
    }

    pub const fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Names of the instance layers installed on this system.
    pub fn layer_names(&self) -> Result<Vec<String>> {
        let layers = unsafe { self.entry.enumerate_instance_layer_properties()? };
        Ok(layers.iter().map(|layer| name_of(&layer.layer_name)).collect())
    }
}

impl Entrypoint for AshEntrypoint {
    type Instance = AshInstance;

    fn instance_extension_names(&self) -> Result<Vec<String>> {
        let extensions = unsafe { self.entry.enumerate_instance_extension_properties(None)? };
        Ok(extensions
            .iter()
            .map(|ext| name_of(&ext.extension_name))
            .collect())
    }

    fn create_instance(&self, info: &InstanceCreateInfo<'_>) -> Result<AshInstance> {
        let app = info.application_info;
        let app_name = to_cstring("application_name", &app.application_name)?;
        let engine_name = to_cstring("engine_name", &app.engine_name)?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(app.application_version)
            .engine_name(&engine_name)
            .engine_version(app.engine_version)
            .api_version(app.api_version);

        // Check that requested layers are available
        let available_layers = self.layer_names()?;
        let layers: Vec<&String> = info
            .enabled_layer_names
            .iter()
            .filter(|layer| {
                let found = available_layers.contains(*layer);
                if !found {
                    tracing::warn!("Layer {} not available", layer);
                }
                found
            })
            .collect();
        let layers = layers
            .into_iter()
            .map(|layer| to_cstring("enabled_layer_names", layer))
            .collect::<Result<Vec<_>>>()?;
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

        let extensions = to_cstrings("enabled_extension_names", info.enabled_extension_names)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();

        // Required for MoltenVK on macOS
        #[cfg(target_os = "macos")]
        let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        #[cfg(not(target_os = "macos"))]
        let create_flags = vk::InstanceCreateFlags::empty();

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs)
            .flags(create_flags);

        let instance = unsafe { self.entry.create_instance(&create_info, None)? };
        let surface_loader = ash::khr::surface::Instance::new(&self.entry, &instance);

        tracing::info!(
            "Vulkan instance created ({} layer(s), {} extension(s))",
            layer_ptrs.len(),
            extension_ptrs.len()
        );

        Ok(AshInstance {
            shared: Arc::new(InstanceShared {
                entry: self.entry.clone(),
                instance,
                surface_loader,
            }),
        })
    }
}

/// A Vulkan instance.
pub struct AshInstance {
    pub(crate) shared: Arc<InstanceShared>,
}

impl AshInstance {
    pub fn raw(&self) -> &ash::Instance {
        &self.shared.instance
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.shared.entry
    }
}

impl Instance for AshInstance {
    type PhysicalDevice = AshPhysicalDevice;

    fn enumerate_physical_devices(&self) -> Result<Vec<AshPhysicalDevice>> {
        let handles = unsafe { self.shared.instance.enumerate_physical_devices()? };
        Ok(handles
            .into_iter()
            .map(|handle| AshPhysicalDevice {
                shared: Arc::clone(&self.shared),
                handle,
            })
            .collect())
    }

    fn destroy(self) {
        // The instance itself goes once the last child releases it.
        let holders = Arc::strong_count(&self.shared);
        if holders > 1 {
            tracing::debug!(
                "Instance released; destruction waits on {} child object(s)",
                holders - 1
            );
        }
    }
}

/// A GPU visible to an [`AshInstance`].
#[derive(Clone)]
pub struct AshPhysicalDevice {
    shared: Arc<InstanceShared>,
    handle: vk::PhysicalDevice,
}

impl AshPhysicalDevice {
    pub const fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.shared.instance
    }

    pub(crate) fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.shared.surface_loader
    }
}

impl PhysicalDevice for AshPhysicalDevice {
    type Device = AshDevice;

    fn properties(&self) -> vk::PhysicalDeviceProperties {
        unsafe { self.shared.instance.get_physical_device_properties(self.handle) }
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.shared
                .instance
                .get_physical_device_format_properties(self.handle, format)
        }
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        unsafe {
            self.shared
                .instance
                .get_physical_device_memory_properties(self.handle)
        }
    }

    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        unsafe {
            self.shared
                .instance
                .get_physical_device_queue_family_properties(self.handle)
        }
    }

    fn surface_support(&self, queue_family: u32, surface: vk::SurfaceKHR) -> Result<bool> {
        let supported = unsafe {
            self.shared.surface_loader.get_physical_device_surface_support(
                self.handle,
                queue_family,
                surface,
            )?
        };
        Ok(supported)
    }

    fn extension_names(&self) -> Result<Vec<String>> {
        let extensions = unsafe {
            self.shared
                .instance
                .enumerate_device_extension_properties(self.handle)?
        };
        Ok(extensions
            .iter()
            .map(|ext| name_of(&ext.extension_name))
            .collect())
    }

    fn create_device(&self, info: &DeviceCreateInfo<'_>) -> Result<AshDevice> {
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = info
            .queue_create_infos
            .iter()
            .map(|queue| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue.queue_family_index)
                    .queue_priorities(&queue.queue_priorities)
            })
            .collect();

        let extensions = to_cstrings("enabled_extension_names", info.enabled_extension_names)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs);

        let device = unsafe {
            self.shared
                .instance
                .create_device(self.handle, &device_create_info, None)?
        };

        Ok(AshDevice::new(Arc::clone(&self.shared), self.handle, device))
    }
}

/// Read a fixed-size, nul-terminated Vulkan name.
pub(crate) fn name_of(raw: &[c_char]) -> String {
    // SAFETY: Vulkan guarantees the name arrays are nul-terminated.
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn to_cstring(parameter: &'static str, value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| GpuError::invalid_argument(parameter, format!("`{value}` contains a nul byte")))
}

pub(crate) fn to_cstrings(parameter: &'static str, values: &[String]) -> Result<Vec<CString>> {
    values
        .iter()
        .map(|value| to_cstring(parameter, value))
        .collect()
}
