//! Integration test: rebuild small captured states and check the emitted
//! command stream.

use std::sync::Arc;

use ash::vk;

use vkstate_api::handle::*;
use vkstate_api::state::*;
use vkstate_api::{
    ApiCommand, BlobRef, EmittedCommand, MemoryBlobStore, ObservedData, State,
};
use vkstate_core::{RebuildConfig, RebuildError};
use vkstate_rebuild::rebuild_state;

const INSTANCE: VkInstance = VkInstance(1);
const PHYSICAL_DEVICE: VkPhysicalDevice = VkPhysicalDevice(2);
const DEVICE: VkDevice = VkDevice(3);
const QUEUE: VkQueue = VkQueue(4);
const MEMORY: VkDeviceMemory = VkDeviceMemory(5);
const BUFFER: VkBuffer = VkBuffer(6);

/// Instance, physical device and device, with one graphics queue when
/// `with_queue` is set.
fn device_state(with_queue: bool) -> State {
    let mut state = State::default();
    state.instances.insert(INSTANCE, InstanceObject::default());
    state.physical_devices.insert(
        PHYSICAL_DEVICE,
        PhysicalDeviceObject {
            instance: INSTANCE,
            device_name: "test device".into(),
            queue_families: vec![QueueFamilyProperties {
                queue_flags: (vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER).as_raw(),
                queue_count: 1,
                ..Default::default()
            }],
            memory_types: vec![MemoryType {
                property_flags: (vk::MemoryPropertyFlags::HOST_VISIBLE
                    | vk::MemoryPropertyFlags::HOST_COHERENT)
                    .as_raw(),
                heap_index: 0,
            }],
            ..Default::default()
        },
    );
    state.devices.insert(
        DEVICE,
        DeviceObject {
            physical_device: PHYSICAL_DEVICE,
            ..Default::default()
        },
    );
    if with_queue {
        state.queues.insert(
            QUEUE,
            QueueObject {
                device: DEVICE,
                family: 0,
                index: 0,
                priority: 1.0,
                ..Default::default()
            },
        );
    }
    state
}

/// `device_state` plus a 64-byte host-visible allocation with captured
/// contents and a buffer bound to it.
fn buffer_state(blobs: &MemoryBlobStore) -> (State, BlobRef) {
    let mut state = device_state(true);
    let data = blobs.insert((0u8..64).collect::<Vec<_>>());
    state.device_memories.insert(
        MEMORY,
        DeviceMemoryObject {
            device: DEVICE,
            allocation_size: 64,
            memory_type_index: 0,
            data: Some(data),
            ..Default::default()
        },
    );
    state.buffers.insert(
        BUFFER,
        BufferObject {
            device: DEVICE,
            info: BufferInfo {
                size: 64,
                usage: vk::BufferUsageFlags::UNIFORM_BUFFER.as_raw(),
                sharing_mode: vk::SharingMode::EXCLUSIVE.as_raw(),
                ..Default::default()
            },
            memory: Some(BoundMemory {
                memory: MEMORY,
                offset: 0,
            }),
            ..Default::default()
        },
    );
    (state, data)
}

fn names(cmds: &[EmittedCommand]) -> Vec<&str> {
    cmds.iter().map(|c| c.name()).collect()
}

#[test]
fn test_buffer_contents_are_staged() {
    vkstate_common::logging::init_test_logging();

    let blobs = MemoryBlobStore::new();
    let (state, data) = buffer_state(&blobs);
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    let output = rebuild_state(&state, &blobs, &RebuildConfig::default(), &mut cmds).unwrap();

    assert_eq!(
        names(&cmds),
        vec![
            "vkCreateInstance",
            "vkEnumeratePhysicalDevices",
            "vkGetPhysicalDeviceProperties",
            "vkGetPhysicalDeviceMemoryProperties",
            "vkGetPhysicalDeviceQueueFamilyProperties",
            "vkCreateDevice",
            "vkGetDeviceQueue",
            "vkAllocateMemory",
            "vkCreateBuffer",
            "vkGetBufferMemoryRequirements",
            "vkBindBufferMemory",
            // Staging buffer in scratch memory.
            "vkCreateBuffer",
            "vkGetBufferMemoryRequirements",
            "vkAllocateMemory",
            "vkBindBufferMemory",
            "vkMapMemory",
            "vkFlushMappedMemoryRanges",
            "vkUnmapMemory",
            // Scratch command buffer.
            "vkCreateCommandPool",
            "vkAllocateCommandBuffers",
            "vkBeginCommandBuffer",
            "vkCmdPipelineBarrier",
            "vkCmdCopyBuffer",
            "vkCmdPipelineBarrier",
            "vkEndCommandBuffer",
            "vkQueueSubmit",
            "vkQueueWaitIdle",
            "vkResetCommandBuffer",
            // Cleanup.
            "vkDestroyBuffer",
            "vkDestroyCommandPool",
            "vkFreeMemory",
        ]
    );
    assert_eq!(output.command_count, cmds.len());
    assert!(output.skipped.is_empty());
    for (i, cmd) in cmds.iter().enumerate() {
        assert_eq!(cmd.id.0, i as u64);
    }

    // Scratch handles start above the captured ones.
    let staging = VkBuffer(7);
    match &cmds[22].command {
        ApiCommand::Cmd {
            call:
                vkstate_api::CmdCall::CopyBuffer {
                    src_buffer,
                    dst_buffer,
                    region_count,
                    ..
                },
            ..
        } => {
            assert_eq!(*src_buffer, staging);
            assert_eq!(*dst_buffer, BUFFER);
            assert_eq!(*region_count, 1);
        }
        other => panic!("expected vkCmdCopyBuffer, got {:?}", other),
    }
    match &cmds[28].command {
        ApiCommand::DestroyBuffer { buffer, .. } => assert_eq!(*buffer, staging),
        other => panic!("expected vkDestroyBuffer, got {:?}", other),
    }
    assert_eq!(output.next_handle, 11);

    // The captured bytes are observed inside the mapping, by hash.
    let flush = &cmds[16];
    assert!(flush
        .reads
        .iter()
        .any(|r| r.data == ObservedData::Blob(data) && r.range.size == 64));
}

#[test]
fn test_priming_can_be_disabled() {
    vkstate_common::logging::init_test_logging();

    let blobs = MemoryBlobStore::new();
    let (state, _) = buffer_state(&blobs);
    let mut config = RebuildConfig::default();
    config.rebuild.prime_buffers = false;
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    rebuild_state(&state, &blobs, &config, &mut cmds).unwrap();

    assert_eq!(cmds.len(), 11);
    assert_eq!(cmds.last().map(|c| c.name()), Some("vkBindBufferMemory"));
}

#[test]
fn test_dangling_dependency_is_skipped() {
    vkstate_common::logging::init_test_logging();

    let mut state = State::default();
    state.buffers.insert(
        BUFFER,
        BufferObject {
            device: DEVICE,
            info: BufferInfo {
                size: 16,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let blobs = MemoryBlobStore::new();
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    let output = rebuild_state(&state, &blobs, &RebuildConfig::default(), &mut cmds).unwrap();

    assert!(cmds.is_empty());
    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].handle, BUFFER.any());
    assert!(
        output.skipped[0].reason.contains("dangling reference"),
        "reason: {}",
        output.skipped[0].reason
    );
}

#[test]
fn test_unknown_surface_is_fatal() {
    vkstate_common::logging::init_test_logging();

    let mut state = State::default();
    state.instances.insert(INSTANCE, InstanceObject::default());
    state.surfaces.insert(
        VkSurface(9),
        SurfaceObject {
            instance: INSTANCE,
            kind: SurfaceKind::Unknown,
            flags: 0,
        },
    );
    let blobs = MemoryBlobStore::new();
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    match rebuild_state(&state, &blobs, &RebuildConfig::default(), &mut cmds) {
        Err(RebuildError::UnsupportedVariant(what)) => assert!(what.contains("surface")),
        other => panic!("expected UnsupportedVariant, got {:?}", other),
    }
    assert_eq!(names(&cmds), vec!["vkCreateInstance"]);
}

#[test]
fn test_destroyed_shader_module_gets_placeholder() {
    vkstate_common::logging::init_test_logging();

    let blobs = MemoryBlobStore::new();
    let code = blobs.insert(vec![0x03u8, 0x02, 0x23, 0x07, 0, 0, 1, 0]);
    let mut state = device_state(false);

    let layout = PipelineLayoutObject {
        device: DEVICE,
        flags: 0,
        set_layouts: Vec::new(),
        push_constant_ranges: Vec::new(),
    };
    state
        .pipeline_layouts
        .insert(VkPipelineLayout(11), Arc::new(layout.clone()));
    // Module 10 was destroyed after the pipeline was created from it.
    let module = ShaderModuleObject {
        device: DEVICE,
        flags: 0,
        code,
    };
    state.compute_pipelines.insert(
        VkPipeline(20),
        ComputePipelineObject {
            device: DEVICE,
            flags: 0,
            stage: ShaderStage {
                flags: 0,
                stage: vk::ShaderStageFlags::COMPUTE.as_raw(),
                module: Linked::new(VkShaderModule(10), module),
                entry_point: "main".into(),
                specialization: None,
            },
            layout: Linked::new(VkPipelineLayout(11), layout),
            base_pipeline: VkPipeline::NULL,
            pipeline_cache: VkPipelineCache::NULL,
        },
    );

    let mut cmds: Vec<EmittedCommand> = Vec::new();
    let output = rebuild_state(&state, &blobs, &RebuildConfig::default(), &mut cmds).unwrap();
    assert!(output.skipped.is_empty());

    let tail: Vec<&str> = names(&cmds).into_iter().skip(5).collect();
    assert_eq!(
        tail,
        vec![
            "vkCreateDevice",
            "vkCreatePipelineLayout",
            "vkCreateShaderModule",
            "vkCreateComputePipelines",
            "vkDestroyShaderModule",
        ]
    );

    let placeholder = VkShaderModule(21);
    let n = cmds.len();
    match &cmds[n - 3].command {
        ApiCommand::CreateShaderModule { shader_module, .. } => {
            assert_eq!(*shader_module, placeholder)
        }
        other => panic!("expected vkCreateShaderModule, got {:?}", other),
    }
    assert!(cmds[n - 3]
        .reads
        .iter()
        .any(|r| r.data == ObservedData::Blob(code)));
    match &cmds[n - 2].command {
        ApiCommand::CreateComputePipelines { pipelines, .. } => {
            assert_eq!(pipelines, &vec![VkPipeline(20)])
        }
        other => panic!("expected vkCreateComputePipelines, got {:?}", other),
    }
    match &cmds[n - 1].command {
        ApiCommand::DestroyShaderModule { shader_module, .. } => {
            assert_eq!(*shader_module, placeholder)
        }
        other => panic!("expected vkDestroyShaderModule, got {:?}", other),
    }
}

#[test]
fn test_mappings_are_restored() {
    vkstate_common::logging::init_test_logging();

    let mut state = device_state(false);
    state.device_memories.insert(
        MEMORY,
        DeviceMemoryObject {
            device: DEVICE,
            allocation_size: 4096,
            memory_type_index: 0,
            mapped: Some(MappedRange {
                offset: 1024,
                size: vk::WHOLE_SIZE,
            }),
            ..Default::default()
        },
    );
    let blobs = MemoryBlobStore::new();

    let mut cmds: Vec<EmittedCommand> = Vec::new();
    rebuild_state(&state, &blobs, &RebuildConfig::default(), &mut cmds).unwrap();
    match cmds.last().map(|c| &c.command) {
        Some(ApiCommand::MapMemory {
            memory,
            offset,
            size,
            ..
        }) => {
            assert_eq!(*memory, MEMORY);
            assert_eq!(*offset, 1024);
            assert_eq!(*size, vk::WHOLE_SIZE);
        }
        other => panic!("expected vkMapMemory, got {:?}", other),
    }

    let mut config = RebuildConfig::default();
    config.rebuild.restore_mappings = false;
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    rebuild_state(&state, &blobs, &config, &mut cmds).unwrap();
    assert_eq!(cmds.last().map(|c| c.name()), Some("vkAllocateMemory"));
}
