//! Picking the queue a priming or reset operation runs on.

use ash::vk;

use vkstate_api::handle::{VkDevice, VkQueue};
use vkstate_api::State;

/// First of `preferred`, then of every captured queue, that lives on
/// `device`, whose family supports any bit of `flags` and, when `families`
/// is non-empty, is one of `families`.
pub fn get_queue_for(
    state: &State,
    flags: vk::QueueFlags,
    families: &[u32],
    device: VkDevice,
    preferred: &[VkQueue],
) -> Option<VkQueue> {
    let eligible = |queue: &VkQueue| -> bool {
        let Some(q) = state.queues.get(queue) else {
            return false;
        };
        q.device == device
            && (families.is_empty() || families.contains(&q.family))
            && vk::QueueFlags::from_raw(state.queue_flags(*queue)).intersects(flags)
    };
    preferred
        .iter()
        .find(|q| eligible(q))
        .or_else(|| state.queues.keys().find(|q| eligible(q)))
        .copied()
}

/// Queue family of `queue`, if captured.
pub fn family_of(state: &State, queue: VkQueue) -> Option<u32> {
    state.queues.get(&queue).map(|q| q.family)
}
