//! Re-recording captured command buffers.

use ash::vk;
use tracing::{debug, warn};

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::{BeginInfo, CommandBufferObject, RecordingState};
use vkstate_api::{AnyHandle, ApiCommand};
use vkstate_core::RebuildError;

use crate::cmd_rebuild::rebuild_and_write;
use crate::emitter::Emitter;

/// What happened to one command buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rerecorded {
    /// Not recording or completed at capture time.
    NotRecorded,
    /// The inherited render pass or framebuffer no longer exists.
    Abandoned(AnyHandle),
    /// Stopped at command `at`; the buffer is left open.
    Stopped { at: usize, reason: String },
    Recorded { commands: usize, ended: bool },
}

/// `vkBeginCommandBuffer` on `command_buffer` with `begin`.
pub fn begin_command_buffer(
    em: &mut Emitter<'_>,
    command_buffer: VkCommandBuffer,
    begin: &BeginInfo,
) {
    let p_inheritance_info = match begin.inheritance {
        Some(inh) => {
            let info = packed::CommandBufferInheritanceInfo {
                s_type: s_type(vk::StructureType::COMMAND_BUFFER_INHERITANCE_INFO),
                render_pass: inh.render_pass.0,
                subpass: inh.subpass,
                framebuffer: inh.framebuffer.0,
                occlusion_query_enable: u32::from(inh.occlusion_query_enable),
                query_flags: inh.query_flags,
                pipeline_statistics: inh.pipeline_statistics,
                ..Default::default()
            };
            em.alloc_read(&info).0
        }
        None => 0,
    };
    let info = packed::CommandBufferBeginInfo {
        s_type: s_type(vk::StructureType::COMMAND_BUFFER_BEGIN_INFO),
        flags: begin.flags,
        p_inheritance_info,
        ..Default::default()
    };
    let begin_info = em.alloc_read(&info);
    em.write(ApiCommand::BeginCommandBuffer {
        command_buffer,
        begin_info,
    });
}

/// Missing inherited object that prevents re-recording, if any.
fn missing_inherited(em: &Emitter<'_>, begin: &BeginInfo) -> Option<AnyHandle> {
    let inh = begin.inheritance?;
    [inh.framebuffer.any(), inh.render_pass.any()]
        .into_iter()
        .find(|h| h.raw != 0 && !em.new_state.contains(*h))
}

/// Re-record `cb` into `handle`, which must already be allocated.
///
/// Dangling references and unsupported commands stop the recording and are
/// reported in the result; fatal errors propagate.
pub fn rerecord(
    em: &mut Emitter<'_>,
    handle: VkCommandBuffer,
    cb: &CommandBufferObject,
) -> Result<Rerecorded, RebuildError> {
    if !matches!(
        cb.recording,
        RecordingState::Recording | RecordingState::Completed
    ) {
        return Ok(Rerecorded::NotRecorded);
    }
    let begin = cb.begin_info.unwrap_or_default();
    if let Some(missing) = missing_inherited(em, &begin) {
        warn!(command_buffer = ?handle, %missing, "inherited object is gone; not re-recording");
        return Ok(Rerecorded::Abandoned(missing));
    }

    begin_command_buffer(em, handle, &begin);
    for (at, cmd) in cb.commands.iter().enumerate() {
        if let Err(e) = rebuild_and_write(em, handle, cmd) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!(command_buffer = ?handle, at, error = %e, "stopped re-recording");
            return Ok(Rerecorded::Stopped {
                at,
                reason: e.to_string(),
            });
        }
    }

    let ended = cb.recording == RecordingState::Completed;
    if ended {
        em.write(ApiCommand::EndCommandBuffer {
            command_buffer: handle,
        });
    }
    debug!(command_buffer = ?handle, commands = cb.commands.len(), ended, "re-recorded");
    Ok(Rerecorded::Recorded {
        commands: cb.commands.len(),
        ended,
    })
}
