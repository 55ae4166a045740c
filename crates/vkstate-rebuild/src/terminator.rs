//! Stopping a trace in the middle of a queue submission.
//!
//! The [`Terminator`] sits between the trace command stream and the replay.
//! It forwards commands until the last requested one, rewrites the submit
//! that contains the requested sub-command so that only its prefix runs, and
//! drops everything after.
//!
//! A sub-command index is `[submit, primary, command, secondary, secondary
//! command]`, truncated to the depth it addresses:
//!
//! | depth | kept |
//! |-------|------|
//! | 1 | submits `..=submit` |
//! | 2 | primaries `..=primary` of the last submit |
//! | 3 | commands `..command` of the last primary |
//! | 4 | as 3, plus secondaries `..=secondary` of the execute at `command` |
//! | 5 | as 3, plus secondaries `..secondary` and commands `..=secondary command` of the next one |
//!
//! From depth 3 on, the last primary is replaced with a synthesized one that
//! closes any render pass left open before it ends.

use tracing::{debug, info};

use vkstate_api::handle::*;
use vkstate_api::packed;
use vkstate_api::state::CommandBufferLevel;
use vkstate_api::{
    ApiCommand, BlobStore, CmdCall, CommandId, CommandSink, EmittedCommand, ObservedData, Ptr,
    RecordedCommand, State, SubCmdIdx, SyncData,
};
use vkstate_core::{HandleAllocator, RebuildError};

use crate::cmd_rebuild::rebuild_and_write;
use crate::commands::allocate_command_buffers;
use crate::emitter::{Emitter, NewState};
use crate::recorder::begin_command_buffer;

/// Ids given to synthesized commands, clear of any trace command id.
pub const SYNTHETIC_ID_BASE: u64 = 1 << 62;

/// Replay addresses for synthesized payloads, clear of the rebuilder's.
pub const SYNTHETIC_MEMORY_BASE: u64 = 0x100_0000_0000;

/// `ExecuteCommands` is followed into secondaries at most this deep.
const MAX_NESTING: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accumulating,
    Cutting,
    Stopped,
}

/// What to do with an incoming submit.
enum Disposition {
    Forward,
    Cut(SubCmdIdx),
    Drop,
}

pub struct Terminator<'a> {
    state: &'a State,
    sync: &'a SyncData,
    blobs: &'a dyn BlobStore,
    target: Option<(CommandId, SubCmdIdx)>,
    last_request: Option<CommandId>,
    phase: Phase,
    next_handle: u64,
    next_id: u64,
}

impl<'a> Terminator<'a> {
    pub fn new(state: &'a State, sync: &'a SyncData, blobs: &'a dyn BlobStore) -> Self {
        Self {
            state,
            sync,
            blobs,
            target: None,
            last_request: None,
            phase: Phase::Accumulating,
            next_handle: state.max_handle().saturating_add(1),
            next_id: SYNTHETIC_ID_BASE,
        }
    }

    /// Allocate synthesized command buffers from `next` upwards, e.g. to
    /// continue after the handles a state rebuild used.
    pub fn with_handle_base(mut self, next: u64) -> Self {
        self.next_handle = self.next_handle.max(next);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_request(&self) -> Option<CommandId> {
        self.last_request
    }

    /// Request that replay stops after command `id`, or after sub-command
    /// `idx` of it when `idx` is not empty. Only one sub-command target is
    /// supported.
    pub fn add(&mut self, id: CommandId, idx: SubCmdIdx) -> Result<(), RebuildError> {
        if !idx.is_empty() {
            if let Some((existing, _)) = &self.target {
                return Err(RebuildError::BadRequest(format!(
                    "a sub-command target is already set on command {}",
                    existing.0
                )));
            }
            if self.sync.sub_commands(id).is_none() {
                return Err(RebuildError::BadRequest(format!(
                    "command {} has no recorded sub-commands",
                    id.0
                )));
            }
            self.target = Some((id, idx));
        }
        self.last_request = Some(self.last_request.map_or(id, |last| last.max(id)));
        Ok(())
    }

    /// Forward, rewrite or drop one trace command.
    pub fn process(
        &mut self,
        cmd: EmittedCommand,
        out: &mut dyn CommandSink,
    ) -> Result<(), RebuildError> {
        if self.phase == Phase::Stopped {
            return Ok(());
        }
        let Some(last) = self.last_request else {
            out.emit(cmd);
            return Ok(());
        };
        if cmd.id > last {
            info!(id = cmd.id.0, last = last.0, "trace terminated");
            self.phase = Phase::Stopped;
            return Ok(());
        }
        if !matches!(cmd.command, ApiCommand::QueueSubmit { .. }) {
            out.emit(cmd);
            return Ok(());
        }
        match self.disposition(&cmd, last) {
            Disposition::Forward => {
                out.emit(cmd);
                Ok(())
            }
            Disposition::Drop => {
                debug!(id = cmd.id.0, "submit runs entirely after the last request; dropped");
                Ok(())
            }
            Disposition::Cut(idx) => {
                self.phase = Phase::Cutting;
                let result = self.cut(&cmd, &idx, out);
                self.phase = Phase::Accumulating;
                result
            }
        }
    }

    fn disposition(&self, cmd: &EmittedCommand, last: CommandId) -> Disposition {
        if let Some((id, idx)) = &self.target {
            if *id == cmd.id {
                return Disposition::Cut(idx.clone());
            }
        }
        let Some(subs) = self.sync.sub_commands(cmd.id) else {
            return Disposition::Forward;
        };
        if subs.iter().all(|s| s.id <= last) {
            return Disposition::Forward;
        }
        match subs.iter().filter(|s| s.id <= last).last() {
            Some(sub) => Disposition::Cut(sub.index.clone()),
            None => Disposition::Drop,
        }
    }

    /// Rewrite submit `cmd` so that it stops at `idx`.
    ///
    /// `idx[0]` is the last `VkSubmitInfo` kept; later ones are dropped.
    /// With no second element every command buffer of the kept submits
    /// still runs. With a second element, that submit's command buffer list is cut
    /// after primary `idx[1]`. Deeper indices replace that primary with a
    /// freshly recorded copy that stops at the addressed command and closes
    /// any render pass still open there.
    pub fn cut(
        &mut self,
        cmd: &EmittedCommand,
        idx: &SubCmdIdx,
        out: &mut dyn CommandSink,
    ) -> Result<(), RebuildError> {
        let ApiCommand::QueueSubmit {
            queue,
            submit_count,
            submits,
            fence,
        } = cmd.command
        else {
            return Err(RebuildError::BadRequest(format!(
                "cannot cut {}: not a queue submission",
                cmd.name()
            )));
        };
        let state = self.state;
        let memory = cmd.memory(self.blobs);
        let mut infos: Vec<packed::SubmitInfo> =
            memory.read_slice(submits, u64::from(submit_count))?;
        let last_submit = index_at(idx, 0)?;
        if last_submit >= infos.len() {
            return Err(out_of_range(idx, 0, infos.len()));
        }
        infos.truncate(last_submit + 1);

        let handles = HandleAllocator::above(self.next_handle.saturating_sub(1));
        let mut em = Emitter::new(out, self.blobs, handles)
            .with_first_id(CommandId(self.next_id))
            .with_memory_base(SYNTHETIC_MEMORY_BASE)
            .with_new_state(NewState::from_state(state));

        let mut primaries = None;
        if idx.len() >= 2 {
            let info = infos[last_submit];
            let mut buffers: Vec<u64> =
                memory.read_slice(Ptr(info.p_command_buffers), u64::from(info.command_buffer_count))?;
            let last_primary = index_at(idx, 1)?;
            if last_primary >= buffers.len() {
                return Err(out_of_range(idx, 1, buffers.len()));
            }
            buffers.truncate(last_primary + 1);

            if idx.len() >= 3 {
                let mut walk = RenderPassWalk::new(state);
                if let Ok(q) = state.queue(queue) {
                    for pending in &q.pending_commands {
                        if let Some(cmd) = state
                            .command_buffers
                            .get(&pending.buffer)
                            .and_then(|cb| cb.commands.get(pending.index))
                        {
                            walk.visit(cmd, 0);
                        }
                    }
                }
                for earlier in &infos[..last_submit] {
                    let earlier: Vec<u64> = memory.read_slice(
                        Ptr(earlier.p_command_buffers),
                        u64::from(earlier.command_buffer_count),
                    )?;
                    for cb in earlier {
                        walk.visit_buffer(VkCommandBuffer(cb), usize::MAX, 0);
                    }
                }
                for cb in &buffers[..last_primary] {
                    walk.visit_buffer(VkCommandBuffer(*cb), usize::MAX, 0);
                }
                let replacement =
                    synthesize_primary(&mut em, &mut walk, VkCommandBuffer(buffers[last_primary]), idx)?;
                buffers[last_primary] = replacement.0;
            }
            primaries = Some(buffers);
        }

        // The original submit's arrays stay readable; the rewritten ones are
        // observed after them and take precedence.
        for read in &cmd.reads {
            match &read.data {
                ObservedData::Bytes(bytes) => em.fill(Ptr(read.range.base), bytes.clone()),
                ObservedData::Blob(blob) => em.observe_blob(Ptr(read.range.base), *blob),
            }
        }
        if let Some(buffers) = primaries {
            let last = &mut infos[last_submit];
            last.command_buffer_count = buffers.len() as u32;
            last.p_command_buffers = em.alloc_read_slice(&buffers).0;
        }
        let submits = em.alloc_read_slice(&infos);
        em.write(ApiCommand::QueueSubmit {
            queue,
            submit_count: infos.len() as u32,
            submits,
            fence,
        });

        info!(id = cmd.id.0, ?idx, synthesized = em.emitted(), "submission cut");
        self.next_id += em.emitted() as u64;
        self.next_handle = em.next_handle();
        Ok(())
    }
}

fn index_at(idx: &SubCmdIdx, depth: usize) -> Result<usize, RebuildError> {
    idx.get(depth)
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| RebuildError::BadRequest(format!("sub-command index {idx:?} too short")))
}

fn out_of_range(idx: &SubCmdIdx, depth: usize, len: usize) -> RebuildError {
    RebuildError::BadRequest(format!(
        "sub-command index {idx:?} is out of range at depth {depth} ({len} entries)"
    ))
}

// ── Render pass tracking ────────────────────────────────────

/// Replays render pass begin/next/end to find the pass open at a point.
struct RenderPassWalk<'s> {
    state: &'s State,
    open: Option<(VkRenderPass, u32)>,
}

impl<'s> RenderPassWalk<'s> {
    fn new(state: &'s State) -> Self {
        Self { state, open: None }
    }

    fn visit(&mut self, cmd: &RecordedCommand, depth: usize) {
        match cmd {
            RecordedCommand::BeginRenderPass { render_pass, .. } => {
                self.open = Some((*render_pass, 0));
            }
            RecordedCommand::NextSubpass { .. } => {
                if let Some((_, subpass)) = &mut self.open {
                    *subpass += 1;
                }
            }
            RecordedCommand::EndRenderPass => self.open = None,
            RecordedCommand::ExecuteCommands { command_buffers } if depth < MAX_NESTING => {
                for cb in command_buffers.values() {
                    self.visit_buffer(*cb, usize::MAX, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn visit_buffer(&mut self, cb: VkCommandBuffer, limit: usize, depth: usize) {
        let state = self.state;
        if let Some(obj) = state.command_buffers.get(&cb) {
            for cmd in obj.commands.iter().take(limit) {
                self.visit(cmd, depth);
            }
        }
    }

    /// `NextSubpass` to the final subpass, then `EndRenderPass`.
    fn close(&mut self, em: &mut Emitter<'_>, command_buffer: VkCommandBuffer) -> Result<(), RebuildError> {
        let Some((render_pass, subpass)) = self.open.take() else {
            return Ok(());
        };
        let subpasses = self.state.render_pass(render_pass)?.subpasses.len() as u32;
        for _ in subpass.saturating_add(1)..subpasses {
            em.write(ApiCommand::Cmd {
                command_buffer,
                call: CmdCall::NextSubpass {
                    contents: ash::vk::SubpassContents::INLINE.as_raw(),
                },
            });
        }
        em.write(ApiCommand::Cmd {
            command_buffer,
            call: CmdCall::EndRenderPass,
        });
        debug!(?render_pass, from = subpass, subpasses, "closed open render pass");
        Ok(())
    }
}

// ── Synthesis ───────────────────────────────────────────────

/// Allocate and begin a fresh buffer like `original`.
fn fresh_buffer(
    em: &mut Emitter<'_>,
    state: &State,
    original: VkCommandBuffer,
    level: CommandBufferLevel,
) -> Result<VkCommandBuffer, RebuildError> {
    let obj = state.command_buffer(original)?;
    let fresh: VkCommandBuffer = em.alloc_handle();
    allocate_command_buffers(em, obj.device, obj.pool, level.as_raw(), &[fresh]);
    begin_command_buffer(em, fresh, &obj.begin_info.unwrap_or_default());
    Ok(fresh)
}

fn synthesize_primary(
    em: &mut Emitter<'_>,
    walk: &mut RenderPassWalk<'_>,
    original: VkCommandBuffer,
    idx: &SubCmdIdx,
) -> Result<VkCommandBuffer, RebuildError> {
    let state = walk.state;
    let obj = state.command_buffer(original)?;
    let cut_at = index_at(idx, 2)?;
    if cut_at > obj.commands.len() || (idx.len() >= 4 && cut_at == obj.commands.len()) {
        return Err(out_of_range(idx, 2, obj.commands.len()));
    }

    let primary = fresh_buffer(em, state, original, CommandBufferLevel::Primary)?;
    for cmd in &obj.commands[..cut_at] {
        rebuild_and_write(em, primary, cmd)?;
        walk.visit(cmd, 0);
    }

    if idx.len() >= 4 {
        let RecordedCommand::ExecuteCommands { command_buffers } = &obj.commands[cut_at] else {
            return Err(RebuildError::BadRequest(format!(
                "sub-command index {idx:?} descends into {}, not vkCmdExecuteCommands",
                obj.commands[cut_at].name()
            )));
        };
        let secondaries: Vec<VkCommandBuffer> = command_buffers.values().copied().collect();
        let last_secondary = index_at(idx, 3)?;
        if last_secondary >= secondaries.len() {
            return Err(out_of_range(idx, 3, secondaries.len()));
        }

        let mut executed = Vec::with_capacity(last_secondary + 1);
        let verbatim = if idx.len() == 4 {
            last_secondary + 1
        } else {
            last_secondary
        };
        for cb in &secondaries[..verbatim] {
            walk.visit_buffer(*cb, usize::MAX, 1);
            executed.push(cb.0);
        }
        if idx.len() >= 5 {
            let partial = synthesize_secondary(em, walk, secondaries[last_secondary], idx)?;
            executed.push(partial.0);
        }

        let command_buffers = em.alloc_read_slice(&executed);
        em.write(ApiCommand::Cmd {
            command_buffer: primary,
            call: CmdCall::ExecuteCommands {
                command_buffer_count: executed.len() as u32,
                command_buffers,
            },
        });
    }

    walk.close(em, primary)?;
    em.write(ApiCommand::EndCommandBuffer {
        command_buffer: primary,
    });
    Ok(primary)
}

fn synthesize_secondary(
    em: &mut Emitter<'_>,
    walk: &mut RenderPassWalk<'_>,
    original: VkCommandBuffer,
    idx: &SubCmdIdx,
) -> Result<VkCommandBuffer, RebuildError> {
    let state = walk.state;
    let obj = state.command_buffer(original)?;
    let last = index_at(idx, 4)?;
    if last >= obj.commands.len() {
        return Err(out_of_range(idx, 4, obj.commands.len()));
    }

    let secondary = fresh_buffer(em, state, original, CommandBufferLevel::Secondary)?;
    for cmd in &obj.commands[..=last] {
        rebuild_and_write(em, secondary, cmd)?;
        walk.visit(cmd, 1);
    }
    em.write(ApiCommand::EndCommandBuffer {
        command_buffer: secondary,
    });
    Ok(secondary)
}
