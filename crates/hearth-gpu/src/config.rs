//! Driver and application configuration.

use crate::api::{ExtensionsOption, QueueAllocation};
use ash::vk;

/// Application identity passed to instance creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: u32,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            application_name: "hearth".to_string(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            engine_name: "hearth".to_string(),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            api_version: vk::API_VERSION_1_0,
        }
    }
}

impl ApplicationInfo {
    /// Create application info with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            application_name: name.into(),
            ..Self::default()
        }
    }

    /// Set the application version.
    #[must_use]
    pub const fn version(mut self, version: u32) -> Self {
        self.application_version = version;
        self
    }

    /// Set the requested Vulkan API version.
    #[must_use]
    pub const fn api_version(mut self, version: u32) -> Self {
        self.api_version = version;
        self
    }
}

/// Layer enabled when validation is requested.
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Layers enabled for validation builds.
pub fn validation_layers() -> Vec<String> {
    vec![VALIDATION_LAYER.to_string()]
}

/// Everything a [`Driver`](crate::Driver) needs to bootstrap an instance
/// and a logical device.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub application: ApplicationInfo,
    pub validation: bool,
    pub instance_extensions: ExtensionsOption,
    /// Extra instance extensions, e.g. the ones a surface requires.
    pub extra_instance_extensions: Vec<String>,
    pub device_extensions: ExtensionsOption,
    pub queue_allocation: QueueAllocation,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            application: ApplicationInfo::default(),
            validation: cfg!(debug_assertions),
            instance_extensions: ExtensionsOption::Specific,
            extra_instance_extensions: Vec::new(),
            device_extensions: ExtensionsOption::Specific,
            queue_allocation: QueueAllocation::One,
        }
    }
}

impl DriverConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `HEARTH_VALIDATION` and `HEARTH_ALL_EXTENSIONS`.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("HEARTH_VALIDATION") {
            match parse_flag(&value) {
                Some(enabled) => self.validation = enabled,
                None => tracing::warn!("Ignoring HEARTH_VALIDATION={value}"),
            }
        }
        if lookup("HEARTH_ALL_EXTENSIONS").as_deref().and_then(parse_flag) == Some(true) {
            self.instance_extensions = ExtensionsOption::All;
            self.device_extensions = ExtensionsOption::All;
        }
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.application.application_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub const fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Choose which instance extensions to enable.
    #[must_use]
    pub const fn instance_extensions(mut self, option: ExtensionsOption) -> Self {
        self.instance_extensions = option;
        self
    }

    /// Add instance extensions on top of the selected option.
    #[must_use]
    pub fn extra_instance_extensions(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.extra_instance_extensions.extend(names);
        self
    }

    /// Choose which device extensions to enable.
    #[must_use]
    pub const fn device_extensions(mut self, option: ExtensionsOption) -> Self {
        self.device_extensions = option;
        self
    }

    /// Choose how many queues to take from the selected family.
    #[must_use]
    pub const fn queue_allocation(mut self, allocation: QueueAllocation) -> Self {
        self.queue_allocation = allocation;
        self
    }

    /// Layers to request for this config.
    pub fn layers(&self) -> Vec<String> {
        if self.validation {
            validation_layers()
        } else {
            Vec::new()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
