//! Logical device creation and queue retrieval.

use crate::api::{
    Device, DeviceCreateInfo, DeviceQueueCreateInfo, PhysicalDevice, QueueAllocation,
};
use crate::error::{GpuError, Result};
use crate::queue::{find_queue_family, find_queue_family_for_surface};
use ash::vk;
use std::sync::Arc;

/// One queue retrieved from a logical device.
pub struct QueueInfo<P: PhysicalDevice> {
    queue_index: u32,
    queue_family: u32,
    queue: vk::Queue,
    physical_device: Arc<P>,
    device: Arc<P::Device>,
}

impl<P: PhysicalDevice> QueueInfo<P> {
    /// Index of the queue within its family.
    pub const fn queue_index(&self) -> u32 {
        self.queue_index
    }

    pub const fn queue_family(&self) -> u32 {
        self.queue_family
    }

    pub const fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn physical_device(&self) -> &Arc<P> {
        &self.physical_device
    }

    pub fn device(&self) -> &Arc<P::Device> {
        &self.device
    }
}

/// A logical device together with the queues it was created with.
///
/// The queue family is fixed at creation.
pub struct LogicalDevice<P: PhysicalDevice> {
    physical_device: Arc<P>,
    device: Arc<P::Device>,
    queues: Vec<QueueInfo<P>>,
}

impl<P: PhysicalDevice> LogicalDevice<P> {
    pub fn physical_device(&self) -> &Arc<P> {
        &self.physical_device
    }

    pub fn device(&self) -> &Arc<P::Device> {
        &self.device
    }

    /// Queues in queue-index order.
    pub fn queues(&self) -> &[QueueInfo<P>] {
        &self.queues
    }

    /// Family every queue of this device belongs to.
    pub fn queue_family(&self) -> u32 {
        self.queues.first().map_or(0, QueueInfo::queue_family)
    }
}

/// Create a device on `gpu` with queues from a family chosen for
/// `requested` (and presentation to `surface`, if given).
#[tracing::instrument(level = "debug", skip_all)]
pub fn create_device<P: PhysicalDevice>(
    gpu: Arc<P>,
    surface: Option<vk::SurfaceKHR>,
    allocation: QueueAllocation,
    requested: vk::QueueFlags,
    extensions: &[String],
) -> Result<LogicalDevice<P>> {
    let families = gpu.queue_family_properties();
    if families.is_empty() {
        return Err(GpuError::NoMatchingQueue { requested });
    }

    let family = match surface {
        Some(surface) => {
            let supports_present = (0u32..)
                .zip(&families)
                .map(|(index, _)| gpu.surface_support(index, surface))
                .collect::<Result<Vec<_>>>()?;
            find_queue_family_for_surface(&families, &supports_present, requested)?
        }
        None => find_queue_family(&families, requested)?,
    };

    let queue_count = match allocation {
        QueueAllocation::One => 1,
        QueueAllocation::All => families[family as usize].queue_count,
    };
    tracing::debug!(
        "Using queue family {} ({:?}) with {} queue(s)",
        family,
        families[family as usize].queue_flags,
        queue_count
    );

    create_device_for_queue(
        gpu,
        &DeviceQueueCreateInfo::uniform(family, queue_count),
        extensions,
    )
}

/// Create a device on `gpu` from an explicit queue request.
pub fn create_device_for_queue<P: PhysicalDevice>(
    gpu: Arc<P>,
    queue_info: &DeviceQueueCreateInfo,
    extensions: &[String],
) -> Result<LogicalDevice<P>> {
    if queue_info.queue_priorities.is_empty() {
        return Err(GpuError::invalid_argument(
            "queue_create_info",
            "at least one queue priority is required",
        ));
    }
    let families = gpu.queue_family_properties();
    let Some(family) = families.get(queue_info.queue_family_index as usize) else {
        return Err(GpuError::invalid_argument(
            "queue_create_info",
            format!(
                "queue family {} does not exist ({} families)",
                queue_info.queue_family_index,
                families.len()
            ),
        ));
    };
    if queue_info.queue_count() > family.queue_count {
        return Err(GpuError::invalid_argument(
            "queue_create_info",
            format!(
                "{} queues requested, family {} has {}",
                queue_info.queue_count(),
                queue_info.queue_family_index,
                family.queue_count
            ),
        ));
    }

    let device = Arc::new(gpu.create_device(&DeviceCreateInfo {
        queue_create_infos: std::slice::from_ref(queue_info),
        enabled_extension_names: extensions,
    })?);

    let queues = (0..queue_info.queue_count())
        .map(|queue_index| QueueInfo {
            queue_index,
            queue_family: queue_info.queue_family_index,
            queue: device.queue(queue_info.queue_family_index, queue_index),
            physical_device: Arc::clone(&gpu),
            device: Arc::clone(&device),
        })
        .collect();

    tracing::info!(
        "Logical device created with {} queue(s) on family {}",
        queue_info.queue_count(),
        queue_info.queue_family_index
    );

    Ok(LogicalDevice {
        physical_device: gpu,
        device,
        queues,
    })
}
