//! Integration test: cut a captured submission at a sub-command and check the
//! rewritten stream.

use std::collections::BTreeMap;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, Rect2D};
use vkstate_api::state::*;
use vkstate_api::{
    ApiCommand, CmdCall, CommandId, EmittedCommand, MemRange, MemoryBlobStore, ObservedData, Ptr,
    ReadObservation, RecordedCommand, State, SubCmdIdx, SubCommand, SyncData,
};
use vkstate_core::RebuildError;
use vkstate_rebuild::terminator::SYNTHETIC_ID_BASE;
use vkstate_rebuild::{Phase, Terminator};

const DEVICE: VkDevice = VkDevice(3);
const QUEUE: VkQueue = VkQueue(4);
const POOL: VkCommandPool = VkCommandPool(5);
const RENDER_PASS: VkRenderPass = VkRenderPass(6);
const FRAMEBUFFER: VkFramebuffer = VkFramebuffer(7);
const PRIMARY: VkCommandBuffer = VkCommandBuffer(10);
const SECONDARY_A: VkCommandBuffer = VkCommandBuffer(11);
const SECONDARY_B: VkCommandBuffer = VkCommandBuffer(12);

const SUBMIT_INFOS: u64 = 0x1000;
const COMMAND_BUFFERS: u64 = 0x2000;

fn draw(vertex_count: u32) -> RecordedCommand {
    RecordedCommand::Draw {
        vertex_count,
        instance_count: 1,
        first_vertex: 0,
        first_instance: 0,
    }
}

fn command_buffer(level: CommandBufferLevel, commands: Vec<RecordedCommand>) -> CommandBufferObject {
    CommandBufferObject {
        device: DEVICE,
        pool: POOL,
        level,
        recording: RecordingState::Completed,
        begin_info: None,
        commands,
    }
}

/// A primary that begins a two-subpass render pass and executes two
/// secondaries inside it.
fn render_pass_state() -> State {
    let mut state = State::default();
    state.devices.insert(DEVICE, DeviceObject::default());
    state.queues.insert(
        QUEUE,
        QueueObject {
            device: DEVICE,
            ..Default::default()
        },
    );
    state.command_pools.insert(
        POOL,
        CommandPoolObject {
            device: DEVICE,
            ..Default::default()
        },
    );
    let render_pass = RenderPassObject {
        device: DEVICE,
        subpasses: vec![SubpassDescription::default(), SubpassDescription::default()],
        ..Default::default()
    };
    state
        .render_passes
        .insert(RENDER_PASS, std::sync::Arc::new(render_pass.clone()));
    state.framebuffers.insert(
        FRAMEBUFFER,
        FramebufferObject {
            device: DEVICE,
            flags: 0,
            render_pass: Linked::new(RENDER_PASS, render_pass),
            attachments: Vec::new(),
            width: 64,
            height: 64,
            layers: 1,
        },
    );

    state.command_buffers.insert(
        PRIMARY,
        command_buffer(
            CommandBufferLevel::Primary,
            vec![
                RecordedCommand::BeginRenderPass {
                    render_pass: RENDER_PASS,
                    framebuffer: FRAMEBUFFER,
                    render_area: Rect2D {
                        offset: [0, 0],
                        extent: [64, 64],
                    },
                    clear_values: BTreeMap::new(),
                    contents: ash::vk::SubpassContents::SECONDARY_COMMAND_BUFFERS.as_raw(),
                },
                RecordedCommand::ExecuteCommands {
                    command_buffers: [(0, SECONDARY_A), (1, SECONDARY_B)].into_iter().collect(),
                },
                RecordedCommand::EndRenderPass,
            ],
        ),
    );
    state.command_buffers.insert(
        SECONDARY_A,
        command_buffer(CommandBufferLevel::Secondary, vec![draw(3), draw(6)]),
    );
    state.command_buffers.insert(
        SECONDARY_B,
        command_buffer(
            CommandBufferLevel::Secondary,
            vec![draw(9), draw(12), draw(15)],
        ),
    );
    state
}

/// `vkQueueSubmit` of `submits`, each executing `PRIMARY`, as captured.
fn submit(id: u64, submits: u32) -> EmittedCommand {
    let info = packed::SubmitInfo {
        s_type: ash::vk::StructureType::SUBMIT_INFO.as_raw(),
        command_buffer_count: 1,
        p_command_buffers: COMMAND_BUFFERS,
        ..Default::default()
    };
    let infos = vec![info; submits as usize];
    EmittedCommand {
        id: CommandId(id),
        command: ApiCommand::QueueSubmit {
            queue: QUEUE,
            submit_count: submits,
            submits: Ptr(SUBMIT_INFOS),
            fence: VkFence::NULL,
        },
        reads: vec![
            ReadObservation {
                range: MemRange::new(SUBMIT_INFOS, 72 * u64::from(submits)),
                data: ObservedData::Bytes(bytemuck::cast_slice(&infos).to_vec()),
            },
            ReadObservation {
                range: MemRange::new(COMMAND_BUFFERS, 8),
                data: ObservedData::Bytes(PRIMARY.0.to_le_bytes().to_vec()),
            },
        ],
        writes: Vec::new(),
        result: 0,
    }
}

fn other(id: u64) -> EmittedCommand {
    EmittedCommand {
        id: CommandId(id),
        command: ApiCommand::QueueWaitIdle { queue: QUEUE },
        reads: Vec::new(),
        writes: Vec::new(),
        result: 0,
    }
}

fn sync_for(submit: u64, subs: &[(&[u64], u64)]) -> SyncData {
    let subs = subs
        .iter()
        .map(|(index, id)| SubCommand {
            index: SubCmdIdx::new(index.to_vec()),
            id: CommandId(*id),
        })
        .collect();
    SyncData {
        command_ranges: [(CommandId(submit), subs)].into_iter().collect(),
    }
}

fn names(cmds: &[EmittedCommand]) -> Vec<&str> {
    cmds.iter().map(|c| c.name()).collect()
}

#[test]
fn test_cut_inside_secondary_closes_render_pass() {
    vkstate_common::logging::init_test_logging();

    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(100, &[(&[0, 0, 1, 1, 1], 100)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(100), SubCmdIdx::new(vec![0, 0, 1, 1, 1]))
        .unwrap();

    let mut out: Vec<EmittedCommand> = Vec::new();
    term.process(other(99), &mut out).unwrap();
    term.process(submit(100, 1), &mut out).unwrap();
    assert_eq!(term.phase(), Phase::Accumulating);

    assert_eq!(
        names(&out),
        vec![
            "vkQueueWaitIdle",
            // Replacement primary.
            "vkAllocateCommandBuffers",
            "vkBeginCommandBuffer",
            "vkCmdBeginRenderPass",
            // Partial copy of the second secondary.
            "vkAllocateCommandBuffers",
            "vkBeginCommandBuffer",
            "vkCmdDraw",
            "vkCmdDraw",
            "vkEndCommandBuffer",
            "vkCmdExecuteCommands",
            "vkCmdNextSubpass",
            "vkCmdEndRenderPass",
            "vkEndCommandBuffer",
            "vkQueueSubmit",
        ]
    );
    assert_eq!(out[0].id, CommandId(99));
    for (i, cmd) in out[1..].iter().enumerate() {
        assert_eq!(cmd.id.0, SYNTHETIC_ID_BASE + i as u64);
    }

    let primary = VkCommandBuffer(13);
    let partial = VkCommandBuffer(14);
    match &out[6].command {
        ApiCommand::Cmd {
            command_buffer,
            call: CmdCall::Draw { vertex_count, .. },
        } => {
            assert_eq!(*command_buffer, partial);
            assert_eq!(*vertex_count, 9);
        }
        other => panic!("expected vkCmdDraw, got {:?}", other),
    }

    let execute = &out[9];
    match &execute.command {
        ApiCommand::Cmd {
            command_buffer,
            call:
                CmdCall::ExecuteCommands {
                    command_buffer_count,
                    command_buffers,
                },
        } => {
            assert_eq!(*command_buffer, primary);
            assert_eq!(*command_buffer_count, 2);
            let executed: Vec<u64> = execute
                .memory(&blobs)
                .read_slice(*command_buffers, 2)
                .unwrap();
            assert_eq!(executed, vec![SECONDARY_A.0, partial.0]);
        }
        other => panic!("expected vkCmdExecuteCommands, got {:?}", other),
    }

    // The rewritten submit runs the replacement primary.
    let rewritten = out.last().unwrap();
    match &rewritten.command {
        ApiCommand::QueueSubmit {
            queue,
            submit_count,
            submits,
            ..
        } => {
            assert_eq!(*queue, QUEUE);
            assert_eq!(*submit_count, 1);
            let mem = rewritten.memory(&blobs);
            let info: packed::SubmitInfo = mem.read(*submits).unwrap();
            assert_eq!(info.command_buffer_count, 1);
            let buffers: Vec<u64> = mem
                .read_slice(Ptr(info.p_command_buffers), 1)
                .unwrap();
            assert_eq!(buffers, vec![primary.0]);
        }
        other => panic!("expected vkQueueSubmit, got {:?}", other),
    }

    // Everything after the requested command is dropped.
    term.process(other(101), &mut out).unwrap();
    term.process(other(50), &mut out).unwrap();
    assert_eq!(term.phase(), Phase::Stopped);
    assert_eq!(out.len(), 14);
}

#[test]
fn test_cut_at_execute_keeps_whole_secondaries() {
    vkstate_common::logging::init_test_logging();

    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(100, &[(&[0, 0, 1, 0], 100)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(100), SubCmdIdx::new(vec![0, 0, 1, 0]))
        .unwrap();

    let mut out: Vec<EmittedCommand> = Vec::new();
    term.process(submit(100, 1), &mut out).unwrap();
    assert_eq!(
        names(&out),
        vec![
            "vkAllocateCommandBuffers",
            "vkBeginCommandBuffer",
            "vkCmdBeginRenderPass",
            "vkCmdExecuteCommands",
            "vkCmdNextSubpass",
            "vkCmdEndRenderPass",
            "vkEndCommandBuffer",
            "vkQueueSubmit",
        ]
    );
    let execute = &out[3];
    match &execute.command {
        ApiCommand::Cmd {
            call: CmdCall::ExecuteCommands { command_buffers, .. },
            ..
        } => {
            let executed: Vec<u64> = execute
                .memory(&blobs)
                .read_slice(*command_buffers, 1)
                .unwrap();
            assert_eq!(executed, vec![SECONDARY_A.0]);
        }
        other => panic!("expected vkCmdExecuteCommands, got {:?}", other),
    }
}

#[test]
fn test_submit_after_request_is_truncated_by_sync_data() {
    vkstate_common::logging::init_test_logging();

    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    // Two submits; only the first has run by command 60.
    let sync = sync_for(55, &[(&[0], 56), (&[1], 70)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(60), SubCmdIdx::default()).unwrap();

    let mut out: Vec<EmittedCommand> = Vec::new();
    term.process(submit(55, 2), &mut out).unwrap();
    assert_eq!(names(&out), vec!["vkQueueSubmit"]);
    match &out[0].command {
        ApiCommand::QueueSubmit { submit_count, .. } => assert_eq!(*submit_count, 1),
        other => panic!("expected vkQueueSubmit, got {:?}", other),
    }
    assert_eq!(term.phase(), Phase::Accumulating);
}

#[test]
fn test_cut_at_primary_drops_later_primaries() {
    vkstate_common::logging::init_test_logging();

    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(100, &[(&[0, 0], 100), (&[0, 1], 101)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(100), SubCmdIdx::new(vec![0, 0])).unwrap();

    // One submit running PRIMARY and then a second primary.
    let mut captured = submit(100, 1);
    let info = packed::SubmitInfo {
        s_type: ash::vk::StructureType::SUBMIT_INFO.as_raw(),
        command_buffer_count: 2,
        p_command_buffers: COMMAND_BUFFERS,
        ..Default::default()
    };
    captured.reads = vec![
        ReadObservation {
            range: MemRange::new(SUBMIT_INFOS, 72),
            data: ObservedData::Bytes(bytemuck::bytes_of(&info).to_vec()),
        },
        ReadObservation {
            range: MemRange::new(COMMAND_BUFFERS, 16),
            data: ObservedData::Bytes(bytemuck::cast_slice(&[PRIMARY.0, 13u64]).to_vec()),
        },
    ];

    let mut out: Vec<EmittedCommand> = Vec::new();
    term.process(captured, &mut out).unwrap();
    // Nothing is re-recorded at this depth.
    assert_eq!(names(&out), vec!["vkQueueSubmit"]);
    match &out[0].command {
        ApiCommand::QueueSubmit {
            submit_count,
            submits,
            ..
        } => {
            assert_eq!(*submit_count, 1);
            let memory = out[0].memory(&blobs);
            let infos: Vec<packed::SubmitInfo> = memory.read_slice(*submits, 1).unwrap();
            assert_eq!(infos[0].command_buffer_count, 1);
            let kept: Vec<u64> = memory
                .read_slice(Ptr(infos[0].p_command_buffers), 1)
                .unwrap();
            assert_eq!(kept, vec![PRIMARY.0]);
        }
        other => panic!("expected vkQueueSubmit, got {:?}", other),
    }
}

#[test]
fn test_submit_running_entirely_later_is_dropped() {
    vkstate_common::logging::init_test_logging();

    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(55, &[(&[0], 70)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(60), SubCmdIdx::default()).unwrap();

    let mut out: Vec<EmittedCommand> = Vec::new();
    term.process(submit(55, 1), &mut out).unwrap();
    term.process(other(58), &mut out).unwrap();
    assert_eq!(names(&out), vec!["vkQueueWaitIdle"]);
}

#[test]
fn test_without_requests_everything_passes() {
    let state = State::default();
    let blobs = MemoryBlobStore::new();
    let sync = SyncData::default();
    let mut term = Terminator::new(&state, &sync, &blobs);

    let mut out: Vec<EmittedCommand> = Vec::new();
    for id in 0..5 {
        term.process(other(id), &mut out).unwrap();
    }
    assert_eq!(out.len(), 5);
    assert_eq!(term.last_request(), None);
    assert_eq!(term.phase(), Phase::Accumulating);
}

#[test]
fn test_bad_requests() {
    let state = State::default();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(100, &[(&[0, 0, 0], 100)]);
    let mut term = Terminator::new(&state, &sync, &blobs);

    match term.add(CommandId(7), SubCmdIdx::new(vec![0])) {
        Err(RebuildError::BadRequest(msg)) => assert!(msg.contains("no recorded sub-commands")),
        other => panic!("expected BadRequest, got {:?}", other),
    }

    term.add(CommandId(100), SubCmdIdx::new(vec![0, 0, 0]))
        .unwrap();
    match term.add(CommandId(100), SubCmdIdx::new(vec![0, 0])) {
        Err(RebuildError::BadRequest(msg)) => assert!(msg.contains("already set")),
        other => panic!("expected BadRequest, got {:?}", other),
    }

    // Plain requests only move the stop point.
    term.add(CommandId(120), SubCmdIdx::default()).unwrap();
    term.add(CommandId(80), SubCmdIdx::default()).unwrap();
    assert_eq!(term.last_request(), Some(CommandId(120)));
}

#[test]
fn test_out_of_range_index_is_rejected() {
    let state = render_pass_state();
    let blobs = MemoryBlobStore::new();
    let sync = sync_for(100, &[(&[3], 100)]);
    let mut term = Terminator::new(&state, &sync, &blobs);
    term.add(CommandId(100), SubCmdIdx::new(vec![3])).unwrap();

    let mut out: Vec<EmittedCommand> = Vec::new();
    match term.process(submit(100, 1), &mut out) {
        Err(RebuildError::BadRequest(msg)) => assert!(msg.contains("out of range")),
        other => panic!("expected BadRequest, got {:?}", other),
    }
    assert!(out.is_empty());
}
