//! Device memory type lookup and the thread partition that carries it.

use crate::api::PhysicalDevice;
use crate::logical_device::LogicalDevice;
use ash::vk;
use std::sync::Arc;

/// A physical/logical device pair with memory-type lookup.
pub trait ThreadPartition {
    type PhysicalDevice: PhysicalDevice;

    fn physical_device(&self) -> &Self::PhysicalDevice;

    fn device(&self) -> &<Self::PhysicalDevice as PhysicalDevice>::Device;

    /// Index of a memory type allowed by `type_bits` that has all of
    /// `properties`.
    fn memory_type(&self, type_bits: u32, properties: vk::MemoryPropertyFlags) -> Option<u32>;
}

/// Find the first memory type allowed by `type_bits` whose flags contain
/// `properties`.
pub fn find_memory_type(
    memory: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory
        .memory_types
        .iter()
        .take(memory.memory_type_count as usize)
        .zip(0u32..)
        .find(|(memory_type, index)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(properties)
        })
        .map(|(_, index)| index)
}

/// [`ThreadPartition`] over a [`LogicalDevice`], with the memory properties
/// queried once up front.
pub struct DevicePartition<P: PhysicalDevice> {
    physical_device: Arc<P>,
    device: Arc<P::Device>,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl<P: PhysicalDevice> DevicePartition<P> {
    pub fn new(logical_device: &LogicalDevice<P>) -> Self {
        let physical_device = Arc::clone(logical_device.physical_device());
        let memory_properties = physical_device.memory_properties();
        Self {
            physical_device,
            device: Arc::clone(logical_device.device()),
            memory_properties,
        }
    }

    pub const fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }
}

impl<P: PhysicalDevice> ThreadPartition for DevicePartition<P> {
    type PhysicalDevice = P;

    fn physical_device(&self) -> &P {
        &self.physical_device
    }

    fn device(&self) -> &P::Device {
        &self.device
    }

    fn memory_type(&self, type_bits: u32, properties: vk::MemoryPropertyFlags) -> Option<u32> {
        find_memory_type(&self.memory_properties, type_bits, properties)
    }
}
