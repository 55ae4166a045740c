//! Tests for the captured-state model: blobs, address ranges, memory views
//! and format geometry.

use ash::vk;

use vkstate_api::format::{block_staging_format, format_info, round_up, FormatKind};
use vkstate_api::handle::*;
use vkstate_api::packed::ImageSubresourceRange;
use vkstate_api::recorded::ImageBarrierRecord;
use vkstate_api::state::{BufferInfo, BufferObject, SparseBinding};
use vkstate_api::{
    ApiCommand, BlobHash, BlobStore, CommandId, DenseMap, EmittedCommand, MemRange,
    MemoryBlobStore, ModelError, ObservedData, Ptr, RangeList, ReadObservation, RecordedCommand,
    State,
};

fn command_reading(reads: Vec<ReadObservation>) -> EmittedCommand {
    EmittedCommand {
        id: CommandId(1),
        command: ApiCommand::QueueWaitIdle { queue: VkQueue(1) },
        reads,
        writes: Vec::new(),
        result: 0,
    }
}

// ── Blobs ───────────────────────────────────────────────────

#[test]
fn test_blob_store_dedups_by_content() {
    let store = MemoryBlobStore::new();
    let a = store.insert(vec![1u8, 2, 3, 4]);
    let b = store.insert(vec![1u8, 2, 3, 4]);
    assert_eq!(a, b);
    assert_eq!(store.len(), 1);
    assert_eq!(a.hash, BlobHash::of(&[1, 2, 3, 4]));
    assert_eq!(a.size, 4);
}

#[test]
fn test_blob_slice_reads_subrange() {
    let store = MemoryBlobStore::new();
    let blob = store.insert((0u8..16).collect::<Vec<_>>());
    let slice = blob.slice(4, 4);
    assert_eq!(store.read(&slice), Some(vec![4, 5, 6, 7]));

    let clamped = blob.slice(12, 100);
    assert_eq!(clamped.size, 4);
    assert_eq!(store.read(&clamped), Some(vec![12, 13, 14, 15]));
}

#[test]
fn test_unknown_blob_reads_none() {
    let store = MemoryBlobStore::new();
    let missing = vkstate_api::BlobRef::whole(BlobHash::of(b"never stored"), 12);
    assert!(store.read(&missing).is_none());
    assert!(store.is_empty());
}

// ── Ranges ──────────────────────────────────────────────────

#[test]
fn test_range_list_coalesces() {
    let mut list = RangeList::new();
    list.merge(MemRange::new(0, 10));
    list.merge(MemRange::new(20, 10));
    assert_eq!(list.len(), 2);

    // Touching ranges join.
    list.merge(MemRange::new(10, 10));
    assert_eq!(list.ranges(), &[MemRange::new(0, 30)]);

    list.merge(MemRange::new(5, 0));
    assert_eq!(list.len(), 1);
}

#[test]
fn test_range_list_keeps_order() {
    let mut list = RangeList::new();
    list.merge(MemRange::new(100, 4));
    list.merge(MemRange::new(0, 4));
    list.merge(MemRange::new(50, 4));
    let bases: Vec<u64> = list.ranges().iter().map(|r| r.base).collect();
    assert_eq!(bases, vec![0, 50, 100]);

    list.merge(MemRange::new(2, 60));
    assert_eq!(list.ranges(), &[MemRange::new(0, 62), MemRange::new(100, 4)]);
}

// ── Memory views ────────────────────────────────────────────

#[test]
fn test_memory_view_reads_bytes_and_blobs() {
    let store = MemoryBlobStore::new();
    let blob = store.insert(vec![9u8; 8]);
    let cmd = command_reading(vec![
        ReadObservation {
            range: MemRange::new(0x1000, 8),
            data: ObservedData::Bytes(7u32.to_le_bytes().into_iter().chain([1, 0, 0, 0]).collect()),
        },
        ReadObservation {
            range: MemRange::new(0x2000, 8),
            data: ObservedData::Blob(blob),
        },
    ]);
    let mem = cmd.memory(&store);
    assert_eq!(mem.read::<u32>(Ptr(0x1000)).unwrap(), 7);
    assert_eq!(mem.read_slice::<u32>(Ptr(0x1000), 2).unwrap(), vec![7, 1]);
    assert_eq!(mem.bytes(Ptr(0x2004), 4).unwrap(), vec![9; 4]);
    assert!(mem.read_slice::<u64>(Ptr(0x1000), 0).unwrap().is_empty());
}

#[test]
fn test_memory_view_rejects_unobserved() {
    let store = MemoryBlobStore::new();
    let cmd = command_reading(vec![ReadObservation {
        range: MemRange::new(0x1000, 4),
        data: ObservedData::Bytes(vec![0; 4]),
    }]);
    match cmd.memory(&store).read::<u64>(Ptr(0x1000)) {
        Err(ModelError::UnobservedRead { addr, size }) => {
            assert_eq!(addr, 0x1000);
            assert_eq!(size, 8);
        }
        other => panic!("expected UnobservedRead, got {:?}", other),
    }
}

// ── Formats ─────────────────────────────────────────────────

#[test]
fn test_color_level_sizes() {
    let info = format_info(vk::Format::R8G8B8A8_UNORM).unwrap();
    assert_eq!(info.element_size, 4);
    let level0 = info
        .level_size(vk::ImageAspectFlags::COLOR, [16, 8, 1], 0)
        .unwrap();
    assert_eq!(level0.size, 16 * 8 * 4);
    let level3 = info
        .level_size(vk::ImageAspectFlags::COLOR, [16, 8, 1], 3)
        .unwrap();
    assert_eq!((level3.width, level3.height), (2, 1));
    assert_eq!(level3.size, 8);
    assert!(info.level_size(vk::ImageAspectFlags::DEPTH, [16, 8, 1], 0).is_none());
}

#[test]
fn test_compressed_level_rounds_to_blocks() {
    let info = format_info(vk::Format::BC1_RGBA_UNORM_BLOCK).unwrap();
    assert!(info.is_compressed());
    let level = info
        .level_size(vk::ImageAspectFlags::COLOR, [10, 6, 1], 0)
        .unwrap();
    assert_eq!((level.width_in_blocks, level.height_in_blocks), (3, 2));
    assert_eq!(level.size, 3 * 2 * 8);
    assert_eq!(block_staging_format(8), Some(vk::Format::R32G32_UINT));
    assert_eq!(block_staging_format(16), Some(vk::Format::R32G32B32A32_UINT));
    assert_eq!(block_staging_format(4), None);
}

#[test]
fn test_depth_stencil_aspects() {
    let info = format_info(vk::Format::D32_SFLOAT_S8_UINT).unwrap();
    assert_eq!(
        info.aspect_bits(),
        vec![vk::ImageAspectFlags::DEPTH, vk::ImageAspectFlags::STENCIL]
    );
    assert_eq!(info.aspect_element_size(vk::ImageAspectFlags::DEPTH), Some(4));
    assert_eq!(info.aspect_element_size(vk::ImageAspectFlags::STENCIL), Some(1));
    match info.kind {
        FormatKind::DepthStencil { depth, stencil } => {
            assert_eq!((depth, stencil), (Some(4), Some(1)));
        }
        other => panic!("expected DepthStencil, got {:?}", other),
    }
}

#[test]
fn test_planar_chroma_is_subsampled() {
    let info = format_info(vk::Format::G8_B8R8_2PLANE_420_UNORM).unwrap();
    assert!(info.is_planar());
    assert_eq!(
        info.aspect_bits(),
        vec![vk::ImageAspectFlags::PLANE_0, vk::ImageAspectFlags::PLANE_1]
    );
    let luma = info
        .level_size(vk::ImageAspectFlags::PLANE_0, [64, 32, 1], 0)
        .unwrap();
    let chroma = info
        .level_size(vk::ImageAspectFlags::PLANE_1, [64, 32, 1], 0)
        .unwrap();
    assert_eq!(luma.size, 64 * 32);
    assert_eq!((chroma.width, chroma.height), (32, 16));
    assert_eq!(chroma.size, 32 * 16 * 2);
}

#[test]
fn test_unknown_format() {
    match format_info(vk::Format::UNDEFINED) {
        Err(ModelError::UnknownFormat(raw)) => assert_eq!(raw, 0),
        other => panic!("expected UnknownFormat, got {:?}", other),
    }
    assert_eq!(round_up(13, 8), 16);
    assert_eq!(round_up(13, 0), 13);
}

// ── State ───────────────────────────────────────────────────

#[test]
fn test_sparse_coverage() {
    let bind = |offset, size| SparseBinding {
        resource_offset: offset,
        size,
        memory: VkDeviceMemory(5),
        ..Default::default()
    };
    let mut buffer = BufferObject {
        info: BufferInfo {
            flags: vk::BufferCreateFlags::SPARSE_BINDING.as_raw(),
            size: 8192,
            ..Default::default()
        },
        sparse_bindings: vec![bind(4096, 4096), bind(0, 4096)],
        ..Default::default()
    };
    assert!(buffer.is_sparse());
    assert!(buffer.sparse_fully_bound());

    buffer.sparse_bindings[1].memory = VkDeviceMemory::NULL;
    assert!(!buffer.sparse_fully_bound());
}

#[test]
fn test_state_lookup_and_json() {
    let mut state = State::default();
    state.buffers.insert(
        VkBuffer(0x30),
        BufferObject {
            device: VkDevice(0x10),
            info: BufferInfo {
                size: 256,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    assert_eq!(state.max_handle(), 0x30);
    match state.buffer(VkBuffer(0x31)) {
        Err(ModelError::MissingObject { kind, handle }) => {
            assert_eq!(kind, HandleKind::Buffer);
            assert_eq!(handle, 0x31);
        }
        other => panic!("expected MissingObject, got {:?}", other),
    }

    let json = serde_json::to_string(&state).unwrap();
    let back: State = serde_json::from_str(&json).unwrap();
    assert_eq!(back.buffers, state.buffers);
    assert_eq!(back.all_handles(), vec![VkBuffer(0x30).any()]);
}

// ── Recorded commands ───────────────────────────────────────

fn total_eq<T: Eq>(a: &T, b: &T) -> bool {
    a == b
}

#[test]
fn test_recorded_image_barrier_json() {
    let barrier = ImageBarrierRecord {
        src_access_mask: vk::AccessFlags::TRANSFER_WRITE.as_raw(),
        dst_access_mask: vk::AccessFlags::SHADER_READ.as_raw(),
        old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL.as_raw(),
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image: VkImage(0x40),
        subresource_range: ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR.as_raw(),
            base_mip_level: 0,
            level_count: 3,
            base_array_layer: 0,
            layer_count: 1,
        },
    };
    let command = RecordedCommand::PipelineBarrier {
        src_stage_mask: vk::PipelineStageFlags::TRANSFER.as_raw(),
        dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw(),
        dependency_flags: 0,
        memory_barriers: DenseMap::new(),
        buffer_memory_barriers: DenseMap::new(),
        image_memory_barriers: [(0, barrier)].into_iter().collect(),
    };

    let json = serde_json::to_string(&command).unwrap();
    match serde_json::from_str::<RecordedCommand>(&json).unwrap() {
        RecordedCommand::PipelineBarrier {
            image_memory_barriers,
            ..
        } => {
            assert_eq!(image_memory_barriers.len(), 1);
            assert!(total_eq(&image_memory_barriers[&0], &barrier));
            assert!(total_eq(
                &image_memory_barriers[&0].subresource_range,
                &barrier.subresource_range
            ));
        }
        other => panic!("expected PipelineBarrier, got {:?}", other),
    }
}
