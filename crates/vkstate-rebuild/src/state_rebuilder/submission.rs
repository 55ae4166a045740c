use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::CommandBufferLevel;
use vkstate_api::{ApiCommand, Ptr};
use vkstate_core::RebuildError;

use crate::commands::allocate_command_buffers;
use crate::query_pool::rebuild_query_state;
use crate::recorder::{rerecord, Rerecorded};

use super::StateRebuilder;

impl StateRebuilder<'_, '_> {
    // ── Queries ─────────────────────────────────────────────

    pub(super) fn query_pools(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&query_pool, obj) in &state.query_pools {
            if !self.requires(query_pool, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let info = packed::QueryPoolCreateInfo {
                s_type: s_type(vk::StructureType::QUERY_POOL_CREATE_INFO),
                flags: obj.flags,
                query_type: obj.query_type as u32,
                query_count: obj.query_count,
                pipeline_statistics: obj.pipeline_statistics,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let query_pool_out = em.alloc_write(8);
            em.write(ApiCommand::CreateQueryPool {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                query_pool_out,
                query_pool,
            });
            let result = rebuild_query_state(
                &mut self.em,
                &mut self.scratch,
                state,
                query_pool,
                obj,
            );
            self.recover(query_pool, result)?;
        }
        Ok(())
    }

    // ── Command buffers ─────────────────────────────────────

    /// Secondaries first, so primaries that execute them find them
    /// recorded.
    pub(super) fn command_buffers(&mut self) -> Result<(), RebuildError> {
        self.command_buffer_pass(CommandBufferLevel::Secondary)?;
        self.command_buffer_pass(CommandBufferLevel::Primary)
    }

    fn command_buffer_pass(&mut self, level: CommandBufferLevel) -> Result<(), RebuildError> {
        let state = self.state;
        for (&pool, pool_obj) in &state.command_pools {
            if !self.em.new_state.contains(pool) {
                continue;
            }
            let buffers: Vec<VkCommandBuffer> = state
                .command_buffers
                .iter()
                .filter(|(_, cb)| cb.pool == pool && cb.level == level)
                .map(|(h, _)| *h)
                .collect();
            if buffers.is_empty() {
                continue;
            }
            allocate_command_buffers(&mut self.em, pool_obj.device, pool, level.as_raw(), &buffers);
            if !self.config.rebuild.rerecord_command_buffers {
                continue;
            }
            for handle in buffers {
                let Some(cb) = state.command_buffers.get(&handle) else {
                    continue;
                };
                match rerecord(&mut self.em, handle, cb)? {
                    Rerecorded::Abandoned(missing) => {
                        self.skip(handle, format!("inherited {missing} no longer exists"));
                    }
                    Rerecorded::Stopped { at, reason } => {
                        self.skip(handle, format!("recording stopped at command {at}: {reason}"));
                    }
                    Rerecorded::NotRecorded | Rerecorded::Recorded { .. } => {}
                }
            }
        }
        Ok(())
    }

    // ── Mappings ────────────────────────────────────────────

    /// Map again every allocation that was mapped at capture time.
    pub(super) fn mappings(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&memory, obj) in &state.device_memories {
            let Some(mapped) = obj.mapped else {
                continue;
            };
            if !self.em.new_state.contains(memory) {
                continue;
            }
            let size = if mapped.size == vk::WHOLE_SIZE {
                obj.allocation_size.saturating_sub(mapped.offset)
            } else {
                mapped.size
            };
            let em = &mut self.em;
            let data_out = em.alloc_write(8);
            let mapped_location = em.map_region(size);
            em.write(ApiCommand::MapMemory {
                device: obj.device,
                memory,
                offset: mapped.offset,
                size: mapped.size,
                flags: 0,
                data_out,
                mapped_location,
            });
            debug!(?memory, offset = mapped.offset, size, "restored mapping");
        }
        Ok(())
    }
}
