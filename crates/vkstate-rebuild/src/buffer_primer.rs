//! Restoring captured buffer contents through a staging copy.

use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::BufferObject;
use vkstate_api::{BlobRef, ObservedData, State};
use vkstate_core::RebuildError;

use crate::commands::{copy_buffer, pipeline_barrier};
use crate::emitter::Emitter;
use crate::queue_select::{family_of, get_queue_for};
use crate::scratch::{Recording, ScratchResources, ScratchTask, StagedPiece, StagingBuffer};

/// Captured bytes of `buffer`, as `(offset in buffer, blob)`.
pub fn buffer_contents(
    state: &State,
    handle: VkBuffer,
    buffer: &BufferObject,
) -> Result<Vec<(u64, BlobRef)>, RebuildError> {
    let slice = |memory: VkDeviceMemory, offset: u64, size: u64| {
        state
            .device_memories
            .get(&memory)
            .and_then(|m| m.data)
            .map(|data| data.slice(offset, size))
            .filter(|b| b.size > 0)
    };

    if buffer.is_sparse() {
        if !buffer.is_residency() && !buffer.sparse_fully_bound() {
            return Err(RebuildError::PartialSparseBinding(handle.any()));
        }
        return Ok(buffer
            .sparse_bindings
            .iter()
            .filter(|b| b.resource_offset < buffer.info.size)
            .filter_map(|b| {
                let size = b.size.min(buffer.info.size - b.resource_offset);
                slice(b.memory, b.memory_offset, size).map(|blob| (b.resource_offset, blob))
            })
            .collect());
    }
    Ok(buffer
        .memory
        .and_then(|bound| slice(bound.memory, bound.offset, buffer.info.size))
        .map(|blob| vec![(0, blob)])
        .unwrap_or_default())
}

/// Copy the captured contents of `handle` into the rebuilt buffer.
///
/// Returns `Ok(false)` when there was nothing to copy.
pub fn prime_buffer(
    em: &mut Emitter<'_>,
    scratch: &mut ScratchResources,
    state: &State,
    handle: VkBuffer,
    buffer: &BufferObject,
) -> Result<bool, RebuildError> {
    let contents = buffer_contents(state, handle, buffer)?;
    if contents.is_empty() {
        return Ok(false);
    }

    let flags = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
    let preferred: Vec<VkQueue> = buffer.last_bound_queue.into_iter().collect();
    let queue = get_queue_for(state, flags, &[], buffer.device, &preferred).ok_or(
        RebuildError::NoEligibleQueue {
            flags: flags.as_raw(),
            device: buffer.device,
        },
    )?;
    let priming_family = family_of(state, queue).unwrap_or(vk::QUEUE_FAMILY_IGNORED);

    // Owned by one family: hand it over explicitly once the copy is done.
    let exclusive = buffer.info.sharing_mode == vk::SharingMode::EXCLUSIVE.as_raw();
    let post_families = match buffer.last_bound_queue.and_then(|q| family_of(state, q)) {
        Some(old) if exclusive => (old, priming_family),
        _ => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
    };

    let regions: Vec<packed::BufferCopy> = contents
        .iter()
        .map(|(offset, blob)| packed::BufferCopy {
            src_offset: *offset,
            dst_offset: *offset,
            size: blob.size,
        })
        .collect();
    let staging = StagingBuffer {
        size: buffer.info.size,
        pieces: contents
            .iter()
            .map(|(offset, blob)| StagedPiece {
                offset: *offset,
                data: ObservedData::Blob(*blob),
            })
            .collect(),
    };

    let size = buffer.info.size;
    let mut task = ScratchTask::new(queue);
    task.add_buffer(staging);
    task.on_record(move |em: &mut Emitter<'_>, rec: &Recording| {
        let barrier = |src: vk::AccessFlags, dst: vk::AccessFlags, families: (u32, u32)| {
            packed::BufferMemoryBarrier {
                s_type: s_type(vk::StructureType::BUFFER_MEMORY_BARRIER),
                src_access_mask: src.as_raw(),
                dst_access_mask: dst.as_raw(),
                src_queue_family_index: families.0,
                dst_queue_family_index: families.1,
                buffer: handle.0,
                offset: 0,
                size,
                ..Default::default()
            }
        };
        let ignored = (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED);
        pipeline_barrier(
            em,
            rec.command_buffer,
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::PipelineStageFlags::TRANSFER,
            &[barrier(
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                ignored,
            )],
            &[],
        );
        copy_buffer(em, rec.command_buffer, rec.buffers[0], handle, &regions);
        pipeline_barrier(
            em,
            rec.command_buffer,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::ALL_COMMANDS,
            &[barrier(
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
                post_families,
            )],
            &[],
        );
        Ok(())
    });
    task.commit(em, scratch, state)?;
    debug!(buffer = ?handle, bytes = size, ?queue, "primed buffer");
    Ok(true)
}
