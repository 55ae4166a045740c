//! Tests for command emission: the bytes a rebuilt command's payloads carry
//! and the handles the emitted stream leaves alive.

use ash::vk;

use vkstate_api::handle::*;
use vkstate_api::packed;
use vkstate_api::recorded::ImageBarrierRecord;
use vkstate_api::state::ImageObject;
use vkstate_api::{
    ApiCommand, CmdCall, DenseMap, EmittedCommand, MemoryBlobStore, ObservedData, Ptr,
    RecordedCommand, State,
};
use vkstate_core::HandleAllocator;
use vkstate_rebuild::cmd_rebuild::rebuild_and_write;
use vkstate_rebuild::commands::allocate_command_buffers;
use vkstate_rebuild::{Emitter, NewState};

const DEVICE: VkDevice = VkDevice(1);
const TARGET: VkCommandBuffer = VkCommandBuffer(2);

/// Bytes observed at `at` when `cmd` was emitted.
fn payload(cmd: &EmittedCommand, at: Ptr) -> &[u8] {
    let read = cmd
        .reads
        .iter()
        .find(|r| r.range.base == at.0)
        .unwrap_or_else(|| panic!("no read observed at {:#x}", at.0));
    match &read.data {
        ObservedData::Bytes(bytes) => bytes,
        other => panic!("expected synthesized bytes, got {:?}", other),
    }
}

#[test]
fn test_viewport_payload_is_packed_array() {
    let blobs = MemoryBlobStore::new();
    let mut out: Vec<EmittedCommand> = Vec::new();
    let mut em = Emitter::new(&mut out, &blobs, HandleAllocator::above(10));

    let viewports = [
        packed::Viewport {
            x: 0.0,
            y: 0.0,
            width: 640.0,
            height: 480.0,
            min_depth: 0.0,
            max_depth: 1.0,
        },
        packed::Viewport {
            x: 640.0,
            y: 0.0,
            width: 320.0,
            height: 240.0,
            min_depth: 0.5,
            max_depth: 1.0,
        },
    ];
    let recorded = RecordedCommand::SetViewport {
        first_viewport: 1,
        viewports: viewports.iter().copied().enumerate().map(|(i, v)| (i as u32, v)).collect(),
    };
    rebuild_and_write(&mut em, TARGET, &recorded).unwrap();
    drop(em);

    assert_eq!(out.len(), 1);
    match &out[0].command {
        ApiCommand::Cmd {
            command_buffer,
            call:
                CmdCall::SetViewport {
                    first_viewport,
                    viewport_count,
                    viewports: at,
                },
        } => {
            assert_eq!(*command_buffer, TARGET);
            assert_eq!(*first_viewport, 1);
            assert_eq!(*viewport_count, 2);
            assert_eq!(payload(&out[0], *at), bytemuck::cast_slice::<_, u8>(&viewports));
        }
        other => panic!("expected vkCmdSetViewport, got {:?}", other),
    }
}

#[test]
fn test_image_barrier_payload_is_packed_struct() {
    let image = VkImage(5);
    let mut state = State::default();
    state.images.insert(
        image,
        ImageObject {
            device: DEVICE,
            ..Default::default()
        },
    );
    let blobs = MemoryBlobStore::new();
    let mut out: Vec<EmittedCommand> = Vec::new();
    let mut em = Emitter::new(&mut out, &blobs, HandleAllocator::above(10))
        .with_new_state(NewState::from_state(&state));

    let range = packed::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR.as_raw(),
        base_mip_level: 1,
        level_count: 2,
        base_array_layer: 0,
        layer_count: 1,
    };
    let record = ImageBarrierRecord {
        src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE.as_raw(),
        dst_access_mask: vk::AccessFlags::SHADER_READ.as_raw(),
        old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL.as_raw(),
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL.as_raw(),
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image,
        subresource_range: range,
    };
    let recorded = RecordedCommand::PipelineBarrier {
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT.as_raw(),
        dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw(),
        dependency_flags: 0,
        memory_barriers: DenseMap::new(),
        buffer_memory_barriers: DenseMap::new(),
        image_memory_barriers: [(0, record)].into_iter().collect(),
    };
    rebuild_and_write(&mut em, TARGET, &recorded).unwrap();
    drop(em);

    let expected = packed::ImageMemoryBarrier {
        s_type: vk::StructureType::IMAGE_MEMORY_BARRIER.as_raw(),
        src_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE.as_raw(),
        dst_access_mask: vk::AccessFlags::SHADER_READ.as_raw(),
        old_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL.as_raw() as u32,
        new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL.as_raw() as u32,
        src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
        image: image.0,
        subresource_range: range,
        ..Default::default()
    };
    match &out[0].command {
        ApiCommand::Cmd {
            call:
                CmdCall::PipelineBarrier {
                    memory_barrier_count,
                    memory_barriers,
                    buffer_memory_barrier_count,
                    image_memory_barrier_count,
                    image_memory_barriers,
                    ..
                },
            ..
        } => {
            assert_eq!(*memory_barrier_count, 0);
            assert_eq!(*memory_barriers, Ptr::NULL);
            assert_eq!(*buffer_memory_barrier_count, 0);
            assert_eq!(*image_memory_barrier_count, 1);
            assert_eq!(
                payload(&out[0], *image_memory_barriers),
                bytemuck::bytes_of(&expected)
            );
        }
        other => panic!("expected vkCmdPipelineBarrier, got {:?}", other),
    }
}

#[test]
fn test_rebuild_rejects_missing_image() {
    let blobs = MemoryBlobStore::new();
    let mut out: Vec<EmittedCommand> = Vec::new();
    let mut em = Emitter::new(&mut out, &blobs, HandleAllocator::above(10));
    let recorded = RecordedCommand::PipelineBarrier {
        src_stage_mask: 0,
        dst_stage_mask: 0,
        dependency_flags: 0,
        memory_barriers: DenseMap::new(),
        buffer_memory_barriers: DenseMap::new(),
        image_memory_barriers: [(
            0,
            ImageBarrierRecord {
                image: VkImage(5),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect(),
    };
    match rebuild_and_write(&mut em, TARGET, &recorded) {
        Err(vkstate_core::RebuildError::DanglingReference { handle, .. }) => {
            assert_eq!(handle, 5)
        }
        other => panic!("expected DanglingReference, got {:?}", other),
    }
    assert!(!em.has_pending());
    drop(em);
    assert!(out.is_empty());
}

#[test]
fn test_destroying_pool_drops_its_command_buffers() {
    let blobs = MemoryBlobStore::new();
    let mut out: Vec<EmittedCommand> = Vec::new();
    let mut em = Emitter::new(&mut out, &blobs, HandleAllocator::above(10));

    let pool: VkCommandPool = em.alloc_handle();
    em.write(ApiCommand::CreateCommandPool {
        device: DEVICE,
        create_info: Ptr::NULL,
        allocator: Ptr::NULL,
        command_pool_out: Ptr::NULL,
        command_pool: pool,
    });
    let primary: VkCommandBuffer = em.alloc_handle();
    allocate_command_buffers(
        &mut em,
        DEVICE,
        pool,
        vk::CommandBufferLevel::PRIMARY.as_raw() as u32,
        &[primary],
    );

    // Written straight to the emitter rather than through the helper.
    let secondary: VkCommandBuffer = em.alloc_handle();
    let info = packed::CommandBufferAllocateInfo {
        s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO.as_raw(),
        command_pool: pool.0,
        level: vk::CommandBufferLevel::SECONDARY.as_raw() as u32,
        command_buffer_count: 1,
        ..Default::default()
    };
    let allocate_info = em.alloc_read(&info);
    let command_buffers_out = em.alloc_write(8);
    em.write(ApiCommand::AllocateCommandBuffers {
        device: DEVICE,
        allocate_info,
        command_buffers_out,
        command_buffers: vec![secondary],
    });

    assert!(em.new_state.contains(primary));
    assert!(em.new_state.contains(secondary));
    assert_eq!(em.new_state.pool_buffers[&pool], vec![primary, secondary]);

    em.write(ApiCommand::DestroyCommandPool {
        device: DEVICE,
        command_pool: pool,
        allocator: Ptr::NULL,
    });
    assert!(!em.new_state.contains(pool));
    assert!(!em.new_state.contains(primary));
    assert!(!em.new_state.contains(secondary));
    assert!(!em.new_state.pool_buffers.contains_key(&pool));
    assert!(em.new_state.is_empty());
    drop(em);
    assert_eq!(out.len(), 4);
}
