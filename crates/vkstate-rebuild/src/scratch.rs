//! Scratch command buffers and staging memory used to prime resources.
//!
//! One transient command pool and one host-visible staging allocation exist
//! per `(device, queue family)`, with one command buffer per queue. A
//! [`ScratchTask`] creates its staging buffers, binds them into the staging
//! memory, fills them, and records its work into the queue's command buffer.
//! Nothing executes until the family is flushed, at which point every
//! recording buffer is submitted and waited on, and the deferred cleanup of
//! the tasks runs.

use std::collections::BTreeMap;

use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::{ApiCommand, ObservedData, Ptr, State};
use vkstate_core::config::ScratchConfig;
use vkstate_core::RebuildError;

use crate::commands::{allocate_command_buffers, allocate_memory, queue_submit};
use crate::emitter::Emitter;

pub type CommitFn = Box<dyn FnOnce(&mut Emitter<'_>, &[VkBuffer]) -> Result<(), RebuildError>>;
pub type RecordFn = Box<dyn FnOnce(&mut Emitter<'_>, &Recording) -> Result<(), RebuildError>>;
pub type DeferredFn = Box<dyn FnOnce(&mut Emitter<'_>) -> Result<(), RebuildError>>;

/// Bytes placed at `offset` inside a staging buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPiece {
    pub offset: u64,
    pub data: ObservedData,
}

impl StagedPiece {
    pub fn size(&self) -> u64 {
        match &self.data {
            ObservedData::Bytes(b) => b.len() as u64,
            ObservedData::Blob(b) => b.size,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagingBuffer {
    pub size: u64,
    pub pieces: Vec<StagedPiece>,
}

/// The command buffer a task records into, and its staging buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub queue: VkQueue,
    pub family: u32,
    pub device: VkDevice,
    pub command_buffer: VkCommandBuffer,
    pub buffers: Vec<VkBuffer>,
}

// ── Task ────────────────────────────────────────────────────

/// One unit of priming work: staging buffers plus the callbacks that use
/// them.
pub struct ScratchTask {
    queue: VkQueue,
    buffers: Vec<StagingBuffer>,
    on_commit: Vec<CommitFn>,
    on_record: Vec<RecordFn>,
    deferred: Vec<DeferredFn>,
}

impl ScratchTask {
    pub fn new(queue: VkQueue) -> Self {
        Self {
            queue,
            buffers: Vec::new(),
            on_commit: Vec::new(),
            on_record: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn queue(&self) -> VkQueue {
        self.queue
    }

    /// Add a staging buffer; returns its index in [`Recording::buffers`].
    pub fn add_buffer(&mut self, buffer: StagingBuffer) -> usize {
        self.buffers.push(buffer);
        self.buffers.len() - 1
    }

    /// Runs once the staging buffers are bound and filled.
    pub fn on_commit(
        &mut self,
        f: impl FnOnce(&mut Emitter<'_>, &[VkBuffer]) -> Result<(), RebuildError> + 'static,
    ) {
        self.on_commit.push(Box::new(f));
    }

    /// Records commands into the queue's scratch command buffer.
    pub fn on_record(
        &mut self,
        f: impl FnOnce(&mut Emitter<'_>, &Recording) -> Result<(), RebuildError> + 'static,
    ) {
        self.on_record.push(Box::new(f));
    }

    /// Runs after the recorded work has executed.
    pub fn defer(&mut self, f: impl FnOnce(&mut Emitter<'_>) -> Result<(), RebuildError> + 'static) {
        self.deferred.push(Box::new(f));
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
            && self.on_commit.is_empty()
            && self.on_record.is_empty()
            && self.deferred.is_empty()
    }

    pub fn commit(
        self,
        em: &mut Emitter<'_>,
        scratch: &mut ScratchResources,
        state: &State,
    ) -> Result<Recording, RebuildError> {
        if self.is_empty() {
            return Err(RebuildError::EmptyScratchTask);
        }
        let queue = state.queue(self.queue)?;
        let (device, family) = (queue.device, queue.family);

        let mut handles = Vec::with_capacity(self.buffers.len());
        for staging in &self.buffers {
            let buffer: VkBuffer = em.alloc_handle();
            let info = packed::BufferCreateInfo {
                s_type: s_type(vk::StructureType::BUFFER_CREATE_INFO),
                size: staging.size.max(1),
                usage: (vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST)
                    .as_raw(),
                sharing_mode: vk::SharingMode::EXCLUSIVE.as_raw() as u32,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let buffer_out = em.alloc_write(8);
            em.write(ApiCommand::CreateBuffer {
                device,
                create_info,
                allocator: Ptr::NULL,
                buffer_out,
                buffer,
            });
            let requirements_out = em.alloc_write(packed::MEMORY_REQUIREMENTS_SIZE);
            em.write(ApiCommand::GetBufferMemoryRequirements {
                device,
                buffer,
                requirements_out,
            });
            handles.push(buffer);
        }
        let temporary = if handles.is_empty() {
            None
        } else {
            let pairs: Vec<_> = handles.iter().copied().zip(self.buffers.iter()).collect();
            scratch.bind_and_fill(em, state, self.queue, &pairs)?
        };

        for f in self.on_commit {
            f(em, &handles)?;
        }

        let command_buffer = if self.on_record.is_empty() {
            VkCommandBuffer::NULL
        } else {
            scratch.acquire(em, state, self.queue)?
        };
        let recording = Recording {
            queue: self.queue,
            family,
            device,
            command_buffer,
            buffers: handles.clone(),
        };
        for f in self.on_record {
            f(em, &recording)?;
        }

        for buffer in handles {
            scratch.defer(
                state,
                self.queue,
                Box::new(move |em: &mut Emitter<'_>| {
                    em.write(ApiCommand::DestroyBuffer {
                        device,
                        buffer,
                        allocator: Ptr::NULL,
                    });
                    Ok(())
                }),
            )?;
        }
        for f in self.deferred {
            scratch.defer(state, self.queue, f)?;
        }
        // Freed only once nothing is bound to it.
        if let Some(memory) = temporary {
            scratch.defer(
                state,
                self.queue,
                Box::new(move |em: &mut Emitter<'_>| {
                    em.write(ApiCommand::FreeMemory {
                        device,
                        memory,
                        allocator: Ptr::NULL,
                    });
                    Ok(())
                }),
            )?;
        }
        Ok(recording)
    }
}

// ── Per-family resources ────────────────────────────────────

struct QueueScratch {
    command_buffer: VkCommandBuffer,
    recording: bool,
}

struct FamilyScratch {
    device: VkDevice,
    pool: Option<VkCommandPool>,
    memory: Option<VkDeviceMemory>,
    memory_type_index: u32,
    offset: u64,
    queues: BTreeMap<VkQueue, QueueScratch>,
    deferred: Vec<DeferredFn>,
}

/// Scratch pools, command buffers and staging memory of every family used
/// so far.
pub struct ScratchResources {
    config: ScratchConfig,
    families: BTreeMap<(VkDevice, u32), FamilyScratch>,
}

impl ScratchResources {
    pub fn new(config: ScratchConfig) -> Self {
        Self {
            config,
            families: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &ScratchConfig {
        &self.config
    }

    fn family_key(state: &State, queue: VkQueue) -> Result<(VkDevice, u32), RebuildError> {
        let q = state.queue(queue)?;
        Ok((q.device, q.family))
    }

    fn family(
        &mut self,
        state: &State,
        queue: VkQueue,
    ) -> Result<&mut FamilyScratch, RebuildError> {
        let key = Self::family_key(state, queue)?;
        Ok(self.families.entry(key).or_insert_with(|| FamilyScratch {
            device: key.0,
            pool: None,
            memory: None,
            memory_type_index: host_visible_memory_type(state, key.0),
            offset: 0,
            queues: BTreeMap::new(),
            deferred: Vec::new(),
        }))
    }

    fn ensure_pool(
        em: &mut Emitter<'_>,
        fam: &mut FamilyScratch,
        family: u32,
    ) -> VkCommandPool {
        if let Some(pool) = fam.pool {
            return pool;
        }
        let pool: VkCommandPool = em.alloc_handle();
        let info = packed::CommandPoolCreateInfo {
            s_type: s_type(vk::StructureType::COMMAND_POOL_CREATE_INFO),
            flags: (vk::CommandPoolCreateFlags::TRANSIENT
                | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .as_raw(),
            queue_family_index: family,
            ..Default::default()
        };
        let create_info = em.alloc_read(&info);
        let command_pool_out = em.alloc_write(8);
        em.write(ApiCommand::CreateCommandPool {
            device: fam.device,
            create_info,
            allocator: Ptr::NULL,
            command_pool_out,
            command_pool: pool,
        });
        debug!(device = ?fam.device, family, pool = ?pool, "created scratch command pool");
        fam.pool = Some(pool);
        pool
    }

    /// The scratch command buffer of `queue`, begun and ready to record.
    pub fn acquire(
        &mut self,
        em: &mut Emitter<'_>,
        state: &State,
        queue: VkQueue,
    ) -> Result<VkCommandBuffer, RebuildError> {
        let (_, family) = Self::family_key(state, queue)?;
        let fam = self.family(state, queue)?;
        let pool = Self::ensure_pool(em, fam, family);
        let device = fam.device;

        let qs = match fam.queues.entry(queue) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => {
                let command_buffer: VkCommandBuffer = em.alloc_handle();
                allocate_command_buffers(
                    em,
                    device,
                    pool,
                    vk::CommandBufferLevel::PRIMARY.as_raw() as u32,
                    &[command_buffer],
                );
                e.insert(QueueScratch {
                    command_buffer,
                    recording: false,
                })
            }
        };

        if !qs.recording {
            let info = packed::CommandBufferBeginInfo {
                s_type: s_type(vk::StructureType::COMMAND_BUFFER_BEGIN_INFO),
                flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT.as_raw(),
                ..Default::default()
            };
            let begin_info = em.alloc_read(&info);
            em.write(ApiCommand::BeginCommandBuffer {
                command_buffer: qs.command_buffer,
                begin_info,
            });
            qs.recording = true;
        }
        Ok(qs.command_buffer)
    }

    /// Bind `buffers` into staging memory and fill them with their pieces.
    ///
    /// Each buffer of size S takes `request_size(S)` bytes. A batch larger
    /// than the whole staging allocation gets a temporary allocation of its
    /// own, which is returned for the caller to free after the buffers are
    /// destroyed. A batch that does not fit in what is left flushes the
    /// family first.
    pub fn bind_and_fill(
        &mut self,
        em: &mut Emitter<'_>,
        state: &State,
        queue: VkQueue,
        buffers: &[(VkBuffer, &StagingBuffer)],
    ) -> Result<Option<VkDeviceMemory>, RebuildError> {
        let requests: Vec<u64> = buffers
            .iter()
            .map(|(_, b)| self.config.request_size(b.size.max(1)))
            .collect();
        let total: u64 = requests.iter().sum();
        let capacity = self.config.allocation_size();
        let key = Self::family_key(state, queue)?;

        let mut temporary = None;
        let (memory, start) = if total > capacity {
            let fam = self.family(state, queue)?;
            let memory = allocate_memory(em, fam.device, total, fam.memory_type_index, None);
            debug!(bytes = total, ?memory, "staging batch exceeds scratch memory; using temporary allocation");
            temporary = Some(memory);
            (memory, 0)
        } else {
            let needs_flush = self
                .families
                .get(&key)
                .is_some_and(|f| f.offset + total > capacity);
            if needs_flush {
                self.flush_family(em, key)?;
            }
            let fam = self.family(state, queue)?;
            let memory = match fam.memory {
                Some(m) => m,
                None => {
                    let m = allocate_memory(em, fam.device, capacity, fam.memory_type_index, None);
                    fam.memory = Some(m);
                    m
                }
            };
            let start = fam.offset;
            fam.offset += total;
            (memory, start)
        };

        let device = key.0;
        let mut offset = start;
        let mut placements = Vec::with_capacity(buffers.len());
        for ((buffer, staging), request) in buffers.iter().zip(&requests) {
            em.write(ApiCommand::BindBufferMemory {
                device,
                buffer: *buffer,
                memory,
                offset,
            });
            placements.push((offset - start, *staging));
            offset += request;
        }

        let mapped = em.map_region(total);
        let data_out = em.alloc_write(8);
        em.write(ApiCommand::MapMemory {
            device,
            memory,
            offset: start,
            size: total,
            flags: 0,
            data_out,
            mapped_location: mapped,
        });
        for (rel, staging) in placements {
            for piece in &staging.pieces {
                let at = mapped.offset(rel + piece.offset);
                match &piece.data {
                    ObservedData::Blob(blob) => em.observe_blob(at, *blob),
                    ObservedData::Bytes(bytes) => em.fill(at, bytes.clone()),
                }
            }
        }
        let range = packed::MappedMemoryRange {
            s_type: s_type(vk::StructureType::MAPPED_MEMORY_RANGE),
            memory: memory.0,
            offset: start,
            size: total,
            ..Default::default()
        };
        let ranges = em.alloc_read(&range);
        em.write(ApiCommand::FlushMappedMemoryRanges {
            device,
            range_count: 1,
            ranges,
        });
        em.write(ApiCommand::UnmapMemory { device, memory });
        em.unmap_region(mapped);
        Ok(temporary)
    }

    /// Run `f` after the family of `queue` next flushes.
    pub fn defer(
        &mut self,
        state: &State,
        queue: VkQueue,
        f: DeferredFn,
    ) -> Result<(), RebuildError> {
        self.family(state, queue)?.deferred.push(f);
        Ok(())
    }

    /// Submit and drain the family `queue` belongs to.
    pub fn flush_queue_family(
        &mut self,
        em: &mut Emitter<'_>,
        state: &State,
        queue: VkQueue,
    ) -> Result<(), RebuildError> {
        let key = Self::family_key(state, queue)?;
        self.flush_family(em, key)
    }

    fn flush_family(
        &mut self,
        em: &mut Emitter<'_>,
        key: (VkDevice, u32),
    ) -> Result<(), RebuildError> {
        let Some(fam) = self.families.get_mut(&key) else {
            return Ok(());
        };
        for (queue, qs) in fam.queues.iter_mut().filter(|(_, qs)| qs.recording) {
            let command_buffer = qs.command_buffer;
            em.write(ApiCommand::EndCommandBuffer { command_buffer });
            queue_submit(em, *queue, &[command_buffer], &[], VkFence::NULL);
            em.write(ApiCommand::QueueWaitIdle { queue: *queue });
            em.write(ApiCommand::ResetCommandBuffer {
                command_buffer,
                flags: 0,
            });
            qs.recording = false;
        }
        fam.offset = 0;
        let deferred = std::mem::take(&mut fam.deferred);
        for f in deferred {
            f(em)?;
        }
        Ok(())
    }

    pub fn flush_all(&mut self, em: &mut Emitter<'_>) -> Result<(), RebuildError> {
        let keys: Vec<_> = self.families.keys().copied().collect();
        for key in keys {
            self.flush_family(em, key)?;
        }
        Ok(())
    }

    /// Flush everything, then destroy every scratch pool and free every
    /// staging allocation.
    pub fn free_all(&mut self, em: &mut Emitter<'_>) -> Result<(), RebuildError> {
        self.flush_all(em)?;
        for fam in std::mem::take(&mut self.families).into_values() {
            if let Some(command_pool) = fam.pool {
                em.write(ApiCommand::DestroyCommandPool {
                    device: fam.device,
                    command_pool,
                    allocator: Ptr::NULL,
                });
            }
            if let Some(memory) = fam.memory {
                em.write(ApiCommand::FreeMemory {
                    device: fam.device,
                    memory,
                    allocator: Ptr::NULL,
                });
            }
        }
        Ok(())
    }

    /// Families that currently hold scratch resources.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }
}

/// Index of a host-visible (preferably coherent) memory type of `device`.
pub fn host_visible_memory_type(state: &State, device: VkDevice) -> u32 {
    let types = state
        .devices
        .get(&device)
        .and_then(|d| state.physical_devices.get(&d.physical_device))
        .map(|pd| pd.memory_types.as_slice())
        .unwrap_or_default();
    let find = |want: vk::MemoryPropertyFlags| {
        types
            .iter()
            .position(|t| vk::MemoryPropertyFlags::from_raw(t.property_flags).contains(want))
    };
    find(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
        .or_else(|| find(vk::MemoryPropertyFlags::HOST_VISIBLE))
        .unwrap_or(0) as u32
}
