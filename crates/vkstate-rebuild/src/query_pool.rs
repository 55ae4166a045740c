//! Restoring per-slot query state.
//!
//! Every slot that was ever reset is reset again, then brought to its
//! captured status with a begin, a begin/end pair, or a timestamp write.

use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::state::{QueryPoolObject, QueryStatus};
use vkstate_api::{ApiCommand, CmdCall, State};
use vkstate_core::RebuildError;

use crate::emitter::Emitter;
use crate::queue_select::get_queue_for;
use crate::scratch::ScratchResources;

/// Commands that take one slot from freshly reset to `status`.
pub fn slot_commands(
    pool: VkQueryPool,
    query_type: vk::QueryType,
    slot: u32,
    status: QueryStatus,
) -> Vec<CmdCall> {
    let reset = CmdCall::ResetQueryPool {
        query_pool: pool,
        first_query: slot,
        query_count: 1,
    };
    let begin = CmdCall::BeginQuery {
        query_pool: pool,
        query: slot,
        flags: 0,
    };
    match status {
        QueryStatus::Uninitialized => Vec::new(),
        QueryStatus::Inactive => vec![reset],
        QueryStatus::Active => vec![reset, begin],
        QueryStatus::Complete if query_type == vk::QueryType::TIMESTAMP => vec![
            reset,
            CmdCall::WriteTimestamp {
                pipeline_stage: vk::PipelineStageFlags::ALL_COMMANDS.as_raw(),
                query_pool: pool,
                query: slot,
            },
        ],
        QueryStatus::Complete => vec![
            reset,
            begin,
            CmdCall::EndQuery {
                query_pool: pool,
                query: slot,
            },
        ],
    }
}

/// Bring every slot of `handle` back to its captured status.
///
/// Returns the number of slots touched.
pub fn rebuild_query_state(
    em: &mut Emitter<'_>,
    scratch: &mut ScratchResources,
    state: &State,
    handle: VkQueryPool,
    pool: &QueryPoolObject,
) -> Result<usize, RebuildError> {
    let query_type = vk::QueryType::from_raw(pool.query_type);
    let calls: Vec<CmdCall> = pool
        .status
        .iter()
        .enumerate()
        .flat_map(|(slot, status)| slot_commands(handle, query_type, slot as u32, *status))
        .collect();
    if calls.is_empty() {
        return Ok(0);
    }

    let flags = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE;
    let preferred: Vec<VkQueue> = pool.last_bound_queue.into_iter().collect();
    let queue = get_queue_for(state, flags, &[], pool.device, &preferred).ok_or(
        RebuildError::NoEligibleQueue {
            flags: flags.as_raw(),
            device: pool.device,
        },
    )?;
    let command_buffer = scratch.acquire(em, state, queue)?;
    for call in calls {
        em.write(ApiCommand::Cmd {
            command_buffer,
            call,
        });
    }
    let touched = pool
        .status
        .iter()
        .filter(|s| **s != QueryStatus::Uninitialized)
        .count();
    debug!(pool = ?handle, slots = touched, ?queue, "restored query state");
    Ok(touched)
}
