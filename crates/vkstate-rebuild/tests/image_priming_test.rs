//! Integration test: restoring image contents and layouts, across queue
//! families, sample counts, compressed and multi-aspect formats.

use ash::vk;
use bytemuck::Pod;

use vkstate_api::handle::*;
use vkstate_api::packed;
use vkstate_api::state::*;
use vkstate_api::{
    ApiCommand, BlobRef, CmdCall, EmittedCommand, MemoryBlobStore, ObservedData, Ptr, State,
};
use vkstate_core::RebuildConfig;
use vkstate_rebuild::rebuild_state;

const INSTANCE: VkInstance = VkInstance(1);
const PHYSICAL_DEVICE: VkPhysicalDevice = VkPhysicalDevice(2);
const DEVICE: VkDevice = VkDevice(3);
const QUEUE: VkQueue = VkQueue(4);
const MEMORY: VkDeviceMemory = VkDeviceMemory(5);
const IMAGE: VkImage = VkImage(6);
/// Only queue of the compute-only family 1.
const COMPUTE_QUEUE: VkQueue = VkQueue(12);

/// Family 0 does graphics and transfer, family 1 only compute.
fn device_state() -> State {
    let mut state = State::default();
    state.instances.insert(INSTANCE, InstanceObject::default());
    state.physical_devices.insert(
        PHYSICAL_DEVICE,
        PhysicalDeviceObject {
            instance: INSTANCE,
            queue_families: vec![
                QueueFamilyProperties {
                    queue_flags: (vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER).as_raw(),
                    queue_count: 1,
                    ..Default::default()
                },
                QueueFamilyProperties {
                    queue_flags: vk::QueueFlags::COMPUTE.as_raw(),
                    queue_count: 1,
                    ..Default::default()
                },
            ],
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
    for (queue, family) in [(QUEUE, 0), (COMPUTE_QUEUE, 1)] {
        state.queues.insert(
            queue,
            QueueObject {
                device: DEVICE,
                family,
                index: 0,
                priority: 1.0,
                ..Default::default()
            },
        );
    }
    state.device_memories.insert(
        MEMORY,
        DeviceMemoryObject {
            device: DEVICE,
            allocation_size: 1 << 16,
            memory_type_index: 0,
            ..Default::default()
        },
    );
    state
}

fn image(format: vk::Format, extent: [u32; 3], layers: u32) -> ImageObject {
    ImageObject {
        device: DEVICE,
        info: ImageInfo {
            image_type: vk::ImageType::TYPE_2D.as_raw(),
            format: format.as_raw(),
            extent,
            mip_levels: 1,
            array_layers: layers,
            samples: vk::SampleCountFlags::TYPE_1.as_raw(),
            tiling: vk::ImageTiling::OPTIMAL.as_raw(),
            usage: vk::ImageUsageFlags::SAMPLED.as_raw(),
            sharing_mode: vk::SharingMode::EXCLUSIVE.as_raw(),
            ..Default::default()
        },
        memory: Some(BoundMemory {
            memory: MEMORY,
            offset: 0,
        }),
        ..Default::default()
    }
}

fn subresource(
    aspect: vk::ImageAspectFlags,
    layer: u32,
    layout: vk::ImageLayout,
    queue: VkQueue,
    data: BlobRef,
) -> ImageSubresource {
    ImageSubresource {
        aspect: aspect.as_raw(),
        layer,
        level: 0,
        layout: layout.as_raw(),
        last_bound_queue: Some(queue),
        data: Some(data),
    }
}

fn rebuild(state: &State, blobs: &MemoryBlobStore) -> Vec<EmittedCommand> {
    vkstate_common::logging::init_test_logging();
    let mut cmds: Vec<EmittedCommand> = Vec::new();
    let output = rebuild_state(state, blobs, &RebuildConfig::default(), &mut cmds).unwrap();
    assert!(output.skipped.is_empty(), "skipped: {:?}", output.skipped);
    cmds
}

/// The `count` packed `T`s observed at `at` when `cmd` was emitted.
fn payload<T: Pod>(cmd: &EmittedCommand, at: Ptr, count: u32) -> Vec<T> {
    if count == 0 {
        return Vec::new();
    }
    let read = cmd
        .reads
        .iter()
        .find(|r| r.range.base == at.0)
        .unwrap_or_else(|| panic!("no read observed at {:#x}", at.0));
    match &read.data {
        ObservedData::Bytes(bytes) => bytes
            .chunks_exact(std::mem::size_of::<T>())
            .take(count as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect(),
        other => panic!("expected synthesized bytes, got {:?}", other),
    }
}

/// Every `vkCmdPipelineBarrier` with image barriers, as
/// `(index, command buffer, barriers)`.
fn image_barriers(
    cmds: &[EmittedCommand],
) -> Vec<(usize, VkCommandBuffer, Vec<packed::ImageMemoryBarrier>)> {
    cmds.iter()
        .enumerate()
        .filter_map(|(i, c)| match &c.command {
            ApiCommand::Cmd {
                command_buffer,
                call:
                    CmdCall::PipelineBarrier {
                        image_memory_barrier_count,
                        image_memory_barriers,
                        ..
                    },
            } if *image_memory_barrier_count > 0 => Some((
                i,
                *command_buffer,
                payload(c, *image_memory_barriers, *image_memory_barrier_count),
            )),
            _ => None,
        })
        .collect()
}

/// Every `vkCmdCopyBufferToImage` as `(source, destination, regions)`.
fn buffer_to_image_copies(
    cmds: &[EmittedCommand],
) -> Vec<(VkBuffer, VkImage, Vec<packed::BufferImageCopy>)> {
    cmds.iter()
        .filter_map(|c| match &c.command {
            ApiCommand::Cmd {
                call:
                    CmdCall::CopyBufferToImage {
                        src_buffer,
                        dst_image,
                        region_count,
                        regions,
                        ..
                    },
                ..
            } => Some((*src_buffer, *dst_image, payload(c, *regions, *region_count))),
            _ => None,
        })
        .collect()
}

fn layout(raw: u32) -> vk::ImageLayout {
    vk::ImageLayout::from_raw(raw as i32)
}

#[test]
fn test_image_owned_by_other_family_is_released_and_acquired() {
    let blobs = MemoryBlobStore::new();
    let mut state = device_state();
    let mut img = image(vk::Format::R8G8B8A8_UNORM, [4, 4, 1], 2);
    let read_only = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    img.subresources = vec![
        subresource(vk::ImageAspectFlags::COLOR, 0, read_only, QUEUE, blobs.insert(vec![1u8; 64])),
        subresource(
            vk::ImageAspectFlags::COLOR,
            1,
            read_only,
            COMPUTE_QUEUE,
            blobs.insert(vec![2u8; 64]),
        ),
    ];
    state.images.insert(IMAGE, img);

    let cmds = rebuild(&state, &blobs);

    // Primed on the graphics queue: staging buffer 13, staging memory 14,
    // pool 15 and command buffer 16.
    let priming_cb = VkCommandBuffer(16);
    let copies = buffer_to_image_copies(&cmds);
    assert_eq!(copies.len(), 1);
    let (src, dst, regions) = &copies[0];
    assert_eq!((*src, *dst), (VkBuffer(13), IMAGE));
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0].buffer_offset, 0);
    assert_eq!(regions[0].image_subresource.base_array_layer, 0);
    assert_eq!(regions[1].buffer_offset, 64);
    assert_eq!(regions[1].image_subresource.base_array_layer, 1);
    assert_eq!(regions[1].image_extent, [4, 4, 1]);

    let barriers = image_barriers(&cmds);
    assert_eq!(barriers.len(), 3);

    let (_, cb, to_dst) = &barriers[0];
    assert_eq!(*cb, priming_cb);
    assert_eq!(to_dst.len(), 1);
    assert_eq!(layout(to_dst[0].new_layout), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(to_dst[0].subresource_range.layer_count, 2);

    let (_, cb, finals) = &barriers[1];
    assert_eq!(*cb, priming_cb);
    assert_eq!(finals.len(), 2);
    assert_eq!(finals[0].src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    assert_eq!(finals[0].dst_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    let release = finals[1];
    assert_eq!(release.subresource_range.base_array_layer, 1);
    assert_eq!(release.src_queue_family_index, 0);
    assert_eq!(release.dst_queue_family_index, 1);
    assert_eq!(layout(release.old_layout), vk::ImageLayout::TRANSFER_DST_OPTIMAL);
    assert_eq!(layout(release.new_layout), read_only);

    // Acquired on the owner's own scratch buffer once the release ran.
    let (acquire_at, cb, acquire) = &barriers[2];
    assert_eq!(*cb, VkCommandBuffer(18));
    assert_eq!(acquire, &vec![release]);
    let release_waited = cmds
        .iter()
        .position(|c| matches!(c.command, ApiCommand::QueueWaitIdle { queue } if queue == QUEUE))
        .expect("priming queue drained");
    assert!(release_waited < *acquire_at);

    let pool_family = cmds.iter().find_map(|c| match &c.command {
        ApiCommand::CreateCommandPool {
            create_info,
            command_pool,
            ..
        } if *command_pool == VkCommandPool(17) => {
            payload::<packed::CommandPoolCreateInfo>(c, *create_info, 1)
                .first()
                .map(|info| info.queue_family_index)
        }
        _ => None,
    });
    assert_eq!(pool_family, Some(1));
    assert!(cmds[*acquire_at..].iter().any(|c| matches!(
        c.command,
        ApiCommand::QueueSubmit { queue, .. } if queue == COMPUTE_QUEUE
    )));
}

#[test]
fn test_multisampled_image_gets_layouts_only() {
    let blobs = MemoryBlobStore::new();
    let mut state = device_state();
    let mut img = image(vk::Format::R8G8B8A8_UNORM, [4, 4, 1], 1);
    img.info.samples = vk::SampleCountFlags::TYPE_4.as_raw();
    img.info.usage = vk::ImageUsageFlags::COLOR_ATTACHMENT.as_raw();
    img.subresources = vec![subresource(
        vk::ImageAspectFlags::COLOR,
        0,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        QUEUE,
        blobs.insert(vec![7u8; 64]),
    )];
    state.images.insert(IMAGE, img);

    let cmds = rebuild(&state, &blobs);

    assert!(buffer_to_image_copies(&cmds).is_empty());
    assert!(!cmds.iter().any(|c| c.name() == "vkCreateBuffer"));
    let barriers = image_barriers(&cmds);
    assert_eq!(barriers.len(), 1);
    let barrier = barriers[0].2[0];
    assert_eq!(barrier.image, IMAGE.0);
    assert_eq!(layout(barrier.old_layout), vk::ImageLayout::UNDEFINED);
    assert_eq!(layout(barrier.new_layout), vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(barrier.src_access_mask, 0);
}

#[test]
fn test_compressed_image_goes_through_staging_image() {
    let blobs = MemoryBlobStore::new();
    let mut state = device_state();
    let mut img = image(vk::Format::BC1_RGBA_UNORM_BLOCK, [8, 8, 1], 1);
    // 2x2 blocks of 8 bytes.
    img.subresources = vec![subresource(
        vk::ImageAspectFlags::COLOR,
        0,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        QUEUE,
        blobs.insert(vec![3u8; 32]),
    )];
    state.images.insert(IMAGE, img);

    let cmds = rebuild(&state, &blobs);

    // Staging image 13 with memory 14, then staging buffer 15.
    let staging_image = VkImage(13);
    let staging_memory = VkDeviceMemory(14);
    let create = cmds
        .iter()
        .find_map(|c| match &c.command {
            ApiCommand::CreateImage {
                create_info, image, ..
            } if *image == staging_image => {
                payload::<packed::ImageCreateInfo>(c, *create_info, 1).first().copied()
            }
            _ => None,
        })
        .expect("staging image created");
    assert_eq!(create.format, vk::Format::R32G32_UINT.as_raw() as u32);
    assert_eq!(create.extent, [2, 2, 1]);

    let copies = buffer_to_image_copies(&cmds);
    assert_eq!(copies.len(), 1);
    let (src, dst, regions) = &copies[0];
    assert_eq!((*src, *dst), (VkBuffer(15), staging_image));
    assert_eq!(regions[0].image_extent, [2, 2, 1]);

    let image_copies: Vec<(VkImage, VkImage, Vec<packed::ImageCopy>)> = cmds
        .iter()
        .filter_map(|c| match &c.command {
            ApiCommand::Cmd {
                call:
                    CmdCall::CopyImage {
                        src_image,
                        dst_image,
                        region_count,
                        regions,
                        ..
                    },
                ..
            } => Some((*src_image, *dst_image, payload(c, *regions, *region_count))),
            _ => None,
        })
        .collect();
    assert_eq!(image_copies.len(), 1);
    let (src, dst, regions) = &image_copies[0];
    assert_eq!((*src, *dst), (staging_image, IMAGE));
    assert_eq!(regions[0].extent, [2, 2, 1]);
    assert_eq!(regions[0].dst_subresource.mip_level, 0);

    // Staging image and its memory go once the copy has run.
    let waited = cmds
        .iter()
        .position(|c| c.name() == "vkQueueWaitIdle")
        .expect("scratch submitted");
    let destroyed = cmds
        .iter()
        .position(|c| matches!(c.command, ApiCommand::DestroyImage { image, .. } if image == staging_image))
        .expect("staging image destroyed");
    match &cmds[destroyed + 1].command {
        ApiCommand::FreeMemory { memory, .. } => assert_eq!(*memory, staging_memory),
        other => panic!("expected vkFreeMemory, got {:?}", other),
    }
    assert!(waited < destroyed);
}

#[test]
fn test_depth_stencil_copies_each_aspect() {
    let blobs = MemoryBlobStore::new();
    let mut state = device_state();
    let mut img = image(vk::Format::D32_SFLOAT_S8_UINT, [4, 4, 1], 1);
    let attachment = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;
    img.subresources = vec![
        subresource(vk::ImageAspectFlags::DEPTH, 0, attachment, QUEUE, blobs.insert(vec![4u8; 64])),
        subresource(vk::ImageAspectFlags::STENCIL, 0, attachment, QUEUE, blobs.insert(vec![5u8; 16])),
    ];
    state.images.insert(IMAGE, img);

    let cmds = rebuild(&state, &blobs);

    let copies = buffer_to_image_copies(&cmds);
    assert_eq!(copies.len(), 1);
    let regions = &copies[0].2;
    assert_eq!(regions.len(), 2);
    assert_eq!(
        regions[0].image_subresource.aspect_mask,
        vk::ImageAspectFlags::DEPTH.as_raw()
    );
    assert_eq!(regions[0].buffer_offset, 0);
    assert_eq!(
        regions[1].image_subresource.aspect_mask,
        vk::ImageAspectFlags::STENCIL.as_raw()
    );
    assert_eq!(regions[1].buffer_offset, 64);

    let barriers = image_barriers(&cmds);
    assert_eq!(barriers.len(), 2);
    assert_eq!(
        barriers[0].2[0].subresource_range.aspect_mask,
        (vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL).as_raw()
    );
    let finals: Vec<u32> = barriers[1]
        .2
        .iter()
        .map(|b| b.subresource_range.aspect_mask)
        .collect();
    assert_eq!(
        finals,
        vec![
            vk::ImageAspectFlags::DEPTH.as_raw(),
            vk::ImageAspectFlags::STENCIL.as_raw()
        ]
    );
}

fn planar_state(blobs: &MemoryBlobStore, flags: vk::ImageCreateFlags) -> State {
    let mut state = device_state();
    let mut img = image(vk::Format::G8_B8R8_2PLANE_420_UNORM, [4, 4, 1], 1);
    img.info.flags = flags.as_raw();
    let read_only = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
    img.subresources = vec![
        subresource(vk::ImageAspectFlags::PLANE_0, 0, read_only, QUEUE, blobs.insert(vec![6u8; 16])),
        subresource(vk::ImageAspectFlags::PLANE_1, 0, read_only, QUEUE, blobs.insert(vec![8u8; 8])),
    ];
    state.images.insert(IMAGE, img);
    state
}

#[test]
fn test_planar_image_copies_planes_and_transitions_as_color() {
    let blobs = MemoryBlobStore::new();
    let state = planar_state(&blobs, vk::ImageCreateFlags::empty());

    let cmds = rebuild(&state, &blobs);

    let copies = buffer_to_image_copies(&cmds);
    let regions = &copies[0].2;
    assert_eq!(regions.len(), 2);
    assert_eq!(
        regions[0].image_subresource.aspect_mask,
        vk::ImageAspectFlags::PLANE_0.as_raw()
    );
    assert_eq!(regions[0].image_extent, [4, 4, 1]);
    assert_eq!(
        regions[1].image_subresource.aspect_mask,
        vk::ImageAspectFlags::PLANE_1.as_raw()
    );
    assert_eq!(regions[1].buffer_offset, 16);
    assert_eq!(regions[1].image_extent, [2, 2, 1]);

    let color = vk::ImageAspectFlags::COLOR.as_raw();
    let barriers = image_barriers(&cmds);
    assert_eq!(barriers.len(), 2);
    assert_eq!(barriers[0].2.len(), 1);
    assert_eq!(barriers[0].2[0].subresource_range.aspect_mask, color);
    // Both planes share one transition.
    assert_eq!(barriers[1].2.len(), 1);
    assert_eq!(barriers[1].2[0].subresource_range.aspect_mask, color);
    assert_eq!(
        layout(barriers[1].2[0].new_layout),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    );
}

#[test]
fn test_disjoint_planar_image_transitions_each_plane() {
    let blobs = MemoryBlobStore::new();
    let state = planar_state(&blobs, vk::ImageCreateFlags::DISJOINT);

    let cmds = rebuild(&state, &blobs);

    let barriers = image_barriers(&cmds);
    assert_eq!(barriers.len(), 2);
    assert_eq!(
        barriers[0].2[0].subresource_range.aspect_mask,
        (vk::ImageAspectFlags::PLANE_0 | vk::ImageAspectFlags::PLANE_1).as_raw()
    );
    let finals: Vec<u32> = barriers[1]
        .2
        .iter()
        .map(|b| b.subresource_range.aspect_mask)
        .collect();
    assert_eq!(
        finals,
        vec![
            vk::ImageAspectFlags::PLANE_0.as_raw(),
            vk::ImageAspectFlags::PLANE_1.as_raw()
        ]
    );
}
