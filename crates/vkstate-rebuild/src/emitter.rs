//! Command emission with scoped replay-memory payloads.
//!
//! Every struct or array a command points at is placed in the replay address
//! space by one of the `alloc_*` helpers, which also records the read (or
//! write) observation the next [`Emitter::write`] attaches. Payloads are freed
//! as soon as that command has been written.

use std::collections::{BTreeMap, BTreeSet};

use bytemuck::Pod;
use tracing::trace;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, cstr_bytes};
use vkstate_api::{
    AnyHandle, ApiCommand, BlobRef, BlobStore, CommandId, CommandSink, EmittedCommand, MemRange,
    ObservedData, Ptr, RangeList, ReadObservation, State,
};
use vkstate_core::{HandleAllocator, RebuildError};

/// Start of the address range the rebuilder places payloads in.
pub const REPLAY_BASE: u64 = 0x1_0000_0000;

const PAYLOAD_ALIGN: u64 = 16;

// ── Allocation tracker ──────────────────────────────────────

/// First-fit allocator over the replay address space.
#[derive(Debug)]
pub struct AllocationTracker {
    /// Free ranges sorted by base, never touching.
    free: Vec<MemRange>,
    used: BTreeMap<u64, u64>,
}

impl AllocationTracker {
    pub fn new(base: u64) -> Self {
        let base = vkstate_api::format::round_up(base.max(PAYLOAD_ALIGN), PAYLOAD_ALIGN);
        Self {
            free: vec![MemRange::new(base, u64::MAX / 2 - base)],
            used: BTreeMap::new(),
        }
    }

    pub fn alloc(&mut self, size: u64) -> u64 {
        let size = vkstate_api::format::round_up(size.max(1), PAYLOAD_ALIGN);
        let slot = self.free.iter().position(|r| r.size >= size);
        let base = match slot {
            Some(i) => {
                let range = &mut self.free[i];
                let base = range.base;
                range.base += size;
                range.size -= size;
                if range.size == 0 {
                    self.free.remove(i);
                }
                base
            }
            // Only reachable after exhausting 2^62 bytes of payloads.
            None => self.used.iter().map(|(b, s)| b + s).max().unwrap_or(REPLAY_BASE),
        };
        self.used.insert(base, size);
        base
    }

    pub fn free(&mut self, base: u64) {
        let Some(size) = self.used.remove(&base) else {
            return;
        };
        let i = self.free.partition_point(|r| r.base < base);
        self.free.insert(i, MemRange::new(base, size));
        if i + 1 < self.free.len() && self.free[i].end() == self.free[i + 1].base {
            self.free[i].size += self.free[i + 1].size;
            self.free.remove(i + 1);
        }
        if i > 0 && self.free[i - 1].end() == self.free[i].base {
            self.free[i - 1].size += self.free[i].size;
            self.free.remove(i);
        }
    }

    /// Bytes currently handed out.
    pub fn in_use(&self) -> u64 {
        self.used.values().sum()
    }
}

// ── Rebuilt state ───────────────────────────────────────────

/// Handles a pipeline was created against, as emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDeps {
    pub layout: VkPipelineLayout,
    pub render_pass: VkRenderPass,
    pub shader_modules: Vec<VkShaderModule>,
}

/// What exists on the replay side after the commands emitted so far.
#[derive(Debug, Clone, Default)]
pub struct NewState {
    live: BTreeSet<AnyHandle>,
    pub pipelines: BTreeMap<VkPipeline, PipelineDeps>,
    pub framebuffers: BTreeMap<VkFramebuffer, VkRenderPass>,
    pub descriptor_set_layouts: BTreeMap<VkDescriptorSet, VkDescriptorSetLayout>,
    pub pool_buffers: BTreeMap<VkCommandPool, Vec<VkCommandBuffer>>,
}

impl NewState {
    /// Everything in `state` taken as already existing.
    pub fn from_state(state: &State) -> Self {
        let mut new = NewState {
            live: state.all_handles().into_iter().collect(),
            ..Default::default()
        };
        for (h, p) in &state.compute_pipelines {
            new.pipelines.insert(
                *h,
                PipelineDeps {
                    layout: p.layout.handle,
                    render_pass: VkRenderPass::NULL,
                    shader_modules: vec![p.stage.module.handle],
                },
            );
        }
        for (h, p) in &state.graphics_pipelines {
            new.pipelines.insert(
                *h,
                PipelineDeps {
                    layout: p.layout.handle,
                    render_pass: p.render_pass.handle,
                    shader_modules: p.stages.iter().map(|s| s.module.handle).collect(),
                },
            );
        }
        for (h, f) in &state.framebuffers {
            new.framebuffers.insert(*h, f.render_pass.handle);
        }
        for (h, s) in &state.descriptor_sets {
            new.descriptor_set_layouts.insert(*h, s.layout.handle);
        }
        for (h, cb) in &state.command_buffers {
            new.pool_buffers.entry(cb.pool).or_default().push(*h);
        }
        new
    }

    pub fn contains(&self, handle: impl Into<AnyHandle>) -> bool {
        let handle = handle.into();
        handle.raw != 0 && self.live.contains(&handle)
    }

    /// `Err(DanglingReference)` unless `handle` exists.
    pub fn require(&self, handle: impl Into<AnyHandle>) -> Result<(), RebuildError> {
        let handle = handle.into();
        if self.contains(handle) {
            Ok(())
        } else {
            Err(RebuildError::dangling(handle))
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &AnyHandle> {
        self.live.iter()
    }

    fn apply(&mut self, command: &ApiCommand, reads: &[ReadObservation]) {
        if let ApiCommand::AllocateCommandBuffers {
            allocate_info,
            command_buffers,
            ..
        } = command
        {
            if let Some(info) = read_pod::<packed::CommandBufferAllocateInfo>(reads, *allocate_info)
            {
                self.pool_buffers
                    .entry(VkCommandPool(info.command_pool))
                    .or_default()
                    .extend_from_slice(command_buffers);
            }
        }
        for h in command.destroyed_handles() {
            self.live.remove(&h);
            if h.kind == HandleKind::CommandPool {
                let pool = VkCommandPool(h.raw);
                for cb in self.pool_buffers.remove(&pool).unwrap_or_default() {
                    self.live.remove(&cb.any());
                }
            }
        }
        self.live.extend(command.created_handles());
    }
}

/// The `T` a pending read observation supplies at `at`.
fn read_pod<T: Pod>(reads: &[ReadObservation], at: Ptr) -> Option<T> {
    let size = std::mem::size_of::<T>();
    reads
        .iter()
        .filter(|r| r.range.base == at.0)
        .find_map(|r| match &r.data {
            ObservedData::Bytes(bytes) if bytes.len() >= size => {
                Some(bytemuck::pod_read_unaligned(&bytes[..size]))
            }
            _ => None,
        })
}

// ── Emitter ─────────────────────────────────────────────────

/// Writes API commands to a sink, attaching the memory observations of the
/// payloads allocated for each one.
pub struct Emitter<'a> {
    sink: &'a mut dyn CommandSink,
    blobs: &'a dyn BlobStore,
    handles: HandleAllocator,
    memory: AllocationTracker,
    reads: Vec<ReadObservation>,
    writes: Vec<MemRange>,
    /// Payloads released after the next write.
    scoped: Vec<u64>,
    ranges: RangeList,
    next_id: u64,
    emitted: usize,
    pub new_state: NewState,
}

impl<'a> Emitter<'a> {
    pub fn new(
        sink: &'a mut dyn CommandSink,
        blobs: &'a dyn BlobStore,
        handles: HandleAllocator,
    ) -> Self {
        Self {
            sink,
            blobs,
            handles,
            memory: AllocationTracker::new(REPLAY_BASE),
            reads: Vec::new(),
            writes: Vec::new(),
            scoped: Vec::new(),
            ranges: RangeList::new(),
            next_id: 0,
            emitted: 0,
            new_state: NewState::default(),
        }
    }

    /// Number the next emitted command `first`.
    pub fn with_first_id(mut self, first: CommandId) -> Self {
        self.next_id = first.0;
        self
    }

    /// Place payloads starting at `base`.
    pub fn with_memory_base(mut self, base: u64) -> Self {
        self.memory = AllocationTracker::new(base);
        self
    }

    pub fn with_new_state(mut self, new_state: NewState) -> Self {
        self.new_state = new_state;
        self
    }

    pub fn blobs(&self) -> &'a dyn BlobStore {
        self.blobs
    }

    pub fn alloc_handle<H: Handle>(&self) -> H {
        self.handles.alloc()
    }

    /// The raw value the next fresh handle will take.
    pub fn next_handle(&self) -> u64 {
        self.handles.peek()
    }

    // ── Payloads ────────────────────────────────────────────

    /// Place `bytes` in replay memory, observed by the next command.
    pub fn alloc_bytes(&mut self, bytes: Vec<u8>) -> Ptr {
        let base = self.memory.alloc(bytes.len() as u64);
        self.scoped.push(base);
        self.reads.push(ReadObservation {
            range: MemRange::new(base, bytes.len() as u64),
            data: ObservedData::Bytes(bytes),
        });
        Ptr(base)
    }

    pub fn alloc_read<T: Pod>(&mut self, value: &T) -> Ptr {
        self.alloc_bytes(bytemuck::bytes_of(value).to_vec())
    }

    /// Place an array; an empty slice is passed as a null pointer.
    pub fn alloc_read_slice<T: Pod>(&mut self, values: &[T]) -> Ptr {
        if values.is_empty() {
            return Ptr::NULL;
        }
        self.alloc_bytes(bytemuck::cast_slice(values).to_vec())
    }

    pub fn alloc_cstr(&mut self, s: &str) -> Ptr {
        self.alloc_bytes(cstr_bytes(s))
    }

    /// A `const char* const*` array of NUL-terminated names.
    pub fn alloc_cstr_array(&mut self, names: &[String]) -> Ptr {
        let ptrs: Vec<u64> = names.iter().map(|n| self.alloc_cstr(n).0).collect();
        self.alloc_read_slice(&ptrs)
    }

    /// Output storage the next command writes `size` bytes into.
    pub fn alloc_write(&mut self, size: u64) -> Ptr {
        let base = self.memory.alloc(size);
        self.scoped.push(base);
        self.writes.push(MemRange::new(base, size));
        Ptr(base)
    }

    /// Claim an address now, supply its contents later with [`fill`].
    ///
    /// [`fill`]: Emitter::fill
    pub fn reserve(&mut self, size: u64) -> Ptr {
        let base = self.memory.alloc(size);
        self.scoped.push(base);
        Ptr(base)
    }

    pub fn fill(&mut self, at: Ptr, bytes: Vec<u8>) {
        self.reads.push(ReadObservation {
            range: MemRange::new(at.0, bytes.len() as u64),
            data: ObservedData::Bytes(bytes),
        });
    }

    /// Place the captured bytes `blob` names, observed by hash.
    pub fn read_at(&mut self, blob: &BlobRef) -> Result<Ptr, RebuildError> {
        if self.blobs.get(&blob.hash).is_none() {
            return Err(RebuildError::MissingBlob(blob.hash));
        }
        let base = self.memory.alloc(blob.size);
        self.scoped.push(base);
        self.observe_blob(Ptr(base), *blob);
        Ok(Ptr(base))
    }

    /// Observe `blob` at a fixed address, e.g. inside a mapping.
    pub fn observe_blob(&mut self, at: Ptr, blob: BlobRef) {
        self.reads.push(ReadObservation {
            range: MemRange::new(at.0, blob.size),
            data: ObservedData::Blob(blob),
        });
    }

    /// Address range for a memory mapping; lives until [`unmap_region`].
    ///
    /// [`unmap_region`]: Emitter::unmap_region
    pub fn map_region(&mut self, size: u64) -> Ptr {
        Ptr(self.memory.alloc(size))
    }

    pub fn unmap_region(&mut self, at: Ptr) {
        self.memory.free(at.0);
    }

    // ── Writing ─────────────────────────────────────────────

    /// Emit `command` with the pending observations, then release its
    /// payloads.
    pub fn write(&mut self, command: ApiCommand) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        let reads = std::mem::take(&mut self.reads);
        let writes = std::mem::take(&mut self.writes);
        for r in &reads {
            self.ranges.merge(r.range);
        }
        for w in &writes {
            self.ranges.merge(*w);
        }
        self.new_state.apply(&command, &reads);
        trace!(id = id.0, cmd = command.name(), reads = reads.len(), "emit");
        self.sink.emit(EmittedCommand {
            id,
            command,
            reads,
            writes,
            result: 0,
        });
        self.emitted += 1;
        self.release_scoped();
        id
    }

    /// Drop the observations and payloads of a command that will not be
    /// written.
    pub fn discard_pending(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.release_scoped();
    }

    fn release_scoped(&mut self) {
        for base in std::mem::take(&mut self.scoped) {
            self.memory.free(base);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.reads.is_empty() || !self.writes.is_empty() || !self.scoped.is_empty()
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn ranges(&self) -> &RangeList {
        &self.ranges
    }

    /// Replay bytes held by payloads and mappings.
    pub fn memory_in_use(&self) -> u64 {
        self.memory.in_use()
    }

    pub fn into_parts(self) -> (RangeList, NewState, usize) {
        (self.ranges, self.new_state, self.emitted)
    }
}
