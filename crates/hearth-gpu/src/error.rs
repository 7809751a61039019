//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// A Vulkan call did not report success.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be loaded.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// A caller-supplied argument is unusable.
    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// A caller-supplied value is outside what the device supports.
    #[error("Argument `{parameter}` out of range: {message}")]
    OutOfRange {
        parameter: &'static str,
        message: String,
    },

    /// The operation is not valid in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The driver has no instance yet.
    #[error("Driver is not initialized")]
    NotInitialized,

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No queue family offers the requested capabilities.
    #[error("Could not find a queue family supporting {requested:?}")]
    NoMatchingQueue { requested: vk::QueueFlags },

    /// No queue family can present to the surface.
    #[error("Could not find a presentation queue")]
    NoPresentationQueue,

    /// The capability family and the presentation family differ.
    #[error("Could not find a common queue (requested family {graphics}, present family {present})")]
    NoCommonQueue { graphics: u32, present: u32 },

    /// No memory type satisfies the requirements.
    #[error("No memory type in mask {type_bits:#b} has properties {properties:?}")]
    NoSuitableMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// None of the depth format candidates can be a depth-stencil attachment.
    #[error("No supported depth-stencil format")]
    NoSupportedDepthFormat,

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),
}

impl GpuError {
    pub(crate) fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
