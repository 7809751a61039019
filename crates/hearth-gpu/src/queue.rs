//! Queue family selection.
//!
//! Graphics and presentation must share one family: the submission side
//! assumes a single queue, so a device whose only presenting family differs
//! from its graphics family is rejected with [`GpuError::NoCommonQueue`]
//! rather than served with two queues.

use crate::error::{GpuError, Result};
use ash::vk;

/// First family whose flags contain every requested bit.
pub fn find_queue_family(
    families: &[vk::QueueFamilyProperties],
    requested: vk::QueueFlags,
) -> Result<u32> {
    families
        .iter()
        .position(|family| family.queue_flags.contains(requested))
        .map(family_index)
        .ok_or(GpuError::NoMatchingQueue { requested })
}

/// Family that supports both `requested` and presentation.
///
/// `supports_present[i]` tells whether family `i` can present to the surface.
/// A family offering both wins outright; otherwise the first capable family
/// and the first presenting family must coincide.
pub fn find_queue_family_for_surface(
    families: &[vk::QueueFamilyProperties],
    supports_present: &[bool],
    requested: vk::QueueFlags,
) -> Result<u32> {
    let presents = |index: usize| supports_present.get(index).copied().unwrap_or(false);

    let mut graphics = None;
    for (index, family) in families.iter().enumerate() {
        if !family.queue_flags.contains(requested) {
            continue;
        }
        if presents(index) {
            return Ok(family_index(index));
        }
        graphics.get_or_insert(index);
    }

    let present = (0..families.len()).find(|&index| presents(index));

    match (graphics, present) {
        (None, _) => Err(GpuError::NoMatchingQueue { requested }),
        (Some(_), None) => Err(GpuError::NoPresentationQueue),
        (Some(graphics), Some(present)) if graphics != present => Err(GpuError::NoCommonQueue {
            graphics: family_index(graphics),
            present: family_index(present),
        }),
        (Some(graphics), Some(_)) => Ok(family_index(graphics)),
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn family_index(index: usize) -> u32 {
    index as u32
}
