//! Presentation surfaces for windowed rendering.
//!
//! Hides the raw-window-handle plumbing from application code.

use crate::error::{GpuError, Result};
use crate::instance::{AshInstance, InstanceShared};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use std::ffi::CStr;
use std::sync::Arc;

/// A Vulkan surface bound to a window.
///
/// Destroyed on drop; keeps its instance alive until then.
pub struct Surface {
    handle: vk::SurfaceKHR,
    instance: Arc<InstanceShared>,
}

impl Surface {
    /// Instance extensions needed to create surfaces for `display`.
    pub fn required_extensions(display: RawDisplayHandle) -> Result<Vec<String>> {
        let names = ash_window::enumerate_required_extensions(display)
            .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;
        Ok(names
            .iter()
            // SAFETY: ash-window returns pointers to static nul-terminated names.
            .map(|&name| unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
            .collect())
    }

    /// Create a surface for `window`.
    ///
    /// The instance must have been created with [`Surface::required_extensions`].
    ///
    /// # Safety
    /// The window must outlive the returned surface.
    pub unsafe fn from_window<W>(instance: &AshInstance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let handle = unsafe {
            ash_window::create_surface(
                instance.entry(),
                instance.raw(),
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        tracing::debug!("Surface created");

        Ok(Self {
            handle,
            instance: Arc::clone(&instance.shared),
        })
    }

    pub const fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.instance
                .surface_loader
                .destroy_surface(self.handle, None);
        }
    }
}
