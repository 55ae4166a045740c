//! Restoring captured image contents and layouts.
//!
//! Three paths:
//! - **copy**: stage the packed texel data in a buffer and
//!   `vkCmdCopyBufferToImage` it into the image,
//! - **staged**: for block-compressed formats, copy the data into an
//!   uncompressed image with one texel per block and `vkCmdCopyImage` from
//!   there,
//! - **layout only**: no contents are restored, every subresource is just
//!   transitioned to its captured layout.
//!
//! Subresources last used by another queue family than the priming queue's
//! are handed back with a release barrier on the priming command buffer and
//! a matching acquire barrier on the owner's.

use std::collections::{BTreeMap, BTreeSet};

use ash::vk;
use tracing::{debug, warn};

use vkstate_api::format::{block_staging_format, format_info, round_up, FormatInfo};
use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::ImageObject;
use vkstate_api::{ApiCommand, ObservedData, Ptr, State};
use vkstate_core::RebuildError;

use crate::commands::{
    allocate_memory, copy_buffer_to_image, copy_image, create_image, image_barrier,
    image_memory_requirements, pipeline_barrier, subresource_range,
};
use crate::emitter::Emitter;
use crate::queue_select::{family_of, get_queue_for};
use crate::scratch::{Recording, ScratchResources, ScratchTask, StagedPiece, StagingBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimePath {
    Copy,
    Staged,
    LayoutOnly,
}

/// How `image` can be primed, and why not when it can't.
pub fn priming_path(
    handle: VkImage,
    image: &ImageObject,
    prime_contents: bool,
) -> (PrimePath, Option<String>) {
    let layout_only = |why: String| (PrimePath::LayoutOnly, Some(why));
    if image.is_swapchain_image {
        return (PrimePath::LayoutOnly, None);
    }
    if !prime_contents {
        return (PrimePath::LayoutOnly, None);
    }
    if !image.subresources.iter().any(|s| s.data.is_some()) {
        return (PrimePath::LayoutOnly, None);
    }
    if image.info.samples > 1 {
        return layout_only(format!(
            "{} has {} samples; multisampled contents are not restored",
            handle.any(),
            image.info.samples
        ));
    }
    if image.is_sparse() {
        if image.is_residency() && !image.metadata_mip_tail_bound() {
            return layout_only(format!("{} has an unbound metadata mip tail", handle.any()));
        }
        if !image.is_residency() && !image.sparse_fully_bound() {
            return layout_only(RebuildError::PartialSparseBinding(handle.any()).to_string());
        }
    }
    match format_info(vk::Format::from_raw(image.info.format)) {
        Ok(info) if info.is_compressed() => {
            if block_staging_format(info.element_size).is_some() {
                (PrimePath::Staged, None)
            } else {
                layout_only(format!(
                    "{} has {}-byte compressed blocks with no staging format",
                    handle.any(),
                    info.element_size
                ))
            }
        }
        Ok(_) => (PrimePath::Copy, None),
        Err(e) => layout_only(format!("{}: {e}", handle.any())),
    }
}

/// Final transition of one subresource.
#[derive(Debug, Clone, Copy)]
struct Transition {
    barrier: packed::ImageMemoryBarrier,
    /// Queue that acquires ownership after the release barrier.
    owner: Option<VkQueue>,
}

fn transitions(
    state: &State,
    handle: VkImage,
    image: &ImageObject,
    priming_family: u32,
    old_layout: vk::ImageLayout,
    src_access: vk::AccessFlags,
) -> Vec<Transition> {
    let exclusive = image.info.sharing_mode == vk::SharingMode::EXCLUSIVE.as_raw();
    let whole_planes = format_info(vk::Format::from_raw(image.info.format))
        .map(|info| info.is_planar() && !image.is_disjoint())
        .unwrap_or(false);
    let mut seen = BTreeSet::new();
    image
        .subresources
        .iter()
        .filter(|s| {
            let layout = vk::ImageLayout::from_raw(s.layout);
            layout != vk::ImageLayout::UNDEFINED && layout != vk::ImageLayout::PREINITIALIZED
        })
        .map(|s| {
            let aspect = if whole_planes {
                vk::ImageAspectFlags::COLOR.as_raw()
            } else {
                s.aspect
            };
            (s, aspect)
        })
        // Planes of a non-disjoint image transition together.
        .filter(|(s, aspect)| seen.insert((*aspect, s.level, s.layer)))
        .map(|(s, aspect)| {
            let owner = s
                .last_bound_queue
                .filter(|_| exclusive)
                .and_then(|q| family_of(state, q).map(|f| (q, f)))
                .filter(|(_, f)| *f != priming_family);
            let families = match owner {
                Some((_, f)) => (priming_family, f),
                None => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
            };
            Transition {
                barrier: image_barrier(
                    handle,
                    subresource_range(aspect, s.level, s.layer),
                    old_layout,
                    s.layout,
                    src_access,
                    vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
                    families,
                ),
                owner: owner.map(|(q, _)| q),
            }
        })
        .collect()
}

/// Every subresource of `image`. Barriers on a non-disjoint multi-planar
/// image name the color aspect rather than its planes.
fn whole_range(info: &FormatInfo, image: &ImageObject) -> packed::ImageSubresourceRange {
    let aspects = if info.is_planar() && !image.is_disjoint() {
        vk::ImageAspectFlags::COLOR
    } else {
        info.aspects()
    };
    packed::ImageSubresourceRange {
        aspect_mask: aspects.as_raw(),
        base_mip_level: 0,
        level_count: image.info.mip_levels.max(1),
        base_array_layer: 0,
        layer_count: image.info.array_layers.max(1),
    }
}

/// Packed data of one subresource and where it lands in the staging buffer.
struct Placement {
    aspect: vk::ImageAspectFlags,
    layer: u32,
    level: u32,
    offset: u64,
    extent: [u32; 3],
    blocks: [u32; 3],
}

/// Lay out every subresource with captured data in one staging buffer,
/// each level at an 8-byte aligned offset.
fn stage_subresources(info: &FormatInfo, image: &ImageObject) -> (StagingBuffer, Vec<Placement>) {
    let mut staging = StagingBuffer::default();
    let mut placements = Vec::new();
    let mut offset = 0;
    for aspect in info.aspect_bits() {
        for layer in 0..image.info.array_layers.max(1) {
            for level in 0..image.info.mip_levels.max(1) {
                let Some(data) = image
                    .subresource(aspect.as_raw(), layer, level)
                    .and_then(|s| s.data)
                else {
                    continue;
                };
                let Some(size) = info.level_size(aspect, image.info.extent, level) else {
                    continue;
                };
                staging.pieces.push(StagedPiece {
                    offset,
                    data: ObservedData::Blob(data.slice(0, size.size)),
                });
                placements.push(Placement {
                    aspect,
                    layer,
                    level,
                    offset,
                    extent: [size.width, size.height, size.depth],
                    blocks: [size.width_in_blocks, size.height_in_blocks, size.depth],
                });
                offset += size.aligned_size();
            }
        }
    }
    staging.size = offset;
    (staging, placements)
}

fn layers(aspect: vk::ImageAspectFlags, level: u32, layer: u32) -> packed::ImageSubresourceLayers {
    packed::ImageSubresourceLayers {
        aspect_mask: aspect.as_raw(),
        mip_level: level,
        base_array_layer: layer,
        layer_count: 1,
    }
}

/// Prime `handle` (already created and bound) from its captured state.
pub fn prime_image(
    em: &mut Emitter<'_>,
    scratch: &mut ScratchResources,
    state: &State,
    handle: VkImage,
    image: &ImageObject,
    prime_contents: bool,
) -> Result<PrimePath, RebuildError> {
    let (mut path, reason) = priming_path(handle, image, prime_contents);
    if let Some(reason) = reason {
        warn!("{reason}; restoring layouts only");
    }

    let flags = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER;
    let mut preferred: Vec<VkQueue> = Vec::new();
    for q in image.subresources.iter().filter_map(|s| s.last_bound_queue) {
        if !preferred.contains(&q) {
            preferred.push(q);
        }
    }
    let queue = get_queue_for(state, flags, &[], image.device, &preferred).ok_or(
        RebuildError::NoEligibleQueue {
            flags: flags.as_raw(),
            device: image.device,
        },
    )?;
    let priming_family = family_of(state, queue).unwrap_or(vk::QUEUE_FAMILY_IGNORED);

    let info = format_info(vk::Format::from_raw(image.info.format)).ok();
    let (staging, placements) = match (&info, path) {
        (Some(info), PrimePath::Copy | PrimePath::Staged) => stage_subresources(info, image),
        _ => (StagingBuffer::default(), Vec::new()),
    };
    if placements.is_empty() {
        path = PrimePath::LayoutOnly;
    }

    let finals = match path {
        PrimePath::LayoutOnly => transitions(
            state,
            handle,
            image,
            priming_family,
            vk::ImageLayout::UNDEFINED,
            vk::AccessFlags::empty(),
        ),
        PrimePath::Copy | PrimePath::Staged => transitions(
            state,
            handle,
            image,
            priming_family,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::AccessFlags::TRANSFER_WRITE,
        ),
    };
    if path == PrimePath::LayoutOnly && finals.is_empty() {
        return Ok(path);
    }
    let final_barriers: Vec<packed::ImageMemoryBarrier> =
        finals.iter().map(|t| t.barrier).collect();

    let mut task = ScratchTask::new(queue);
    match (path, info) {
        (PrimePath::Copy, Some(info)) => {
            task.add_buffer(staging);
            let to_dst = image_barrier(
                handle,
                whole_range(&info, image),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
            );
            let regions: Vec<packed::BufferImageCopy> = placements
                .iter()
                .map(|p| packed::BufferImageCopy {
                    buffer_offset: p.offset,
                    buffer_row_length: 0,
                    buffer_image_height: 0,
                    image_subresource: layers(p.aspect, p.level, p.layer),
                    image_offset: [0; 3],
                    image_extent: p.extent,
                })
                .collect();
            let finals = final_barriers.clone();
            task.on_record(move |em: &mut Emitter<'_>, rec: &Recording| {
                let cb = rec.command_buffer;
                pipeline_barrier(
                    em,
                    cb,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::TRANSFER,
                    &[],
                    &[to_dst],
                );
                copy_buffer_to_image(em, cb, rec.buffers[0], handle, &regions);
                pipeline_barrier(
                    em,
                    cb,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::ALL_COMMANDS,
                    &[],
                    &finals,
                );
                Ok(())
            });
        }
        (PrimePath::Staged, Some(info)) => {
            let staged = Staged {
                staging,
                placements: &placements,
                info: &info,
                handle,
                image,
            };
            stage_compressed(em, state, &mut task, staged, &final_barriers)?;
        }
        _ => {
            let finals = final_barriers.clone();
            task.on_record(move |em: &mut Emitter<'_>, rec: &Recording| {
                pipeline_barrier(
                    em,
                    rec.command_buffer,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::ALL_COMMANDS,
                    &[],
                    &finals,
                );
                Ok(())
            });
        }
    }
    task.commit(em, scratch, state)?;

    // Release happened on the priming buffer; acquire on each owner's.
    let mut acquires: BTreeMap<VkQueue, Vec<packed::ImageMemoryBarrier>> = BTreeMap::new();
    for t in &finals {
        if let Some(owner) = t.owner {
            acquires.entry(owner).or_default().push(t.barrier);
        }
    }
    if !acquires.is_empty() {
        scratch.flush_queue_family(em, state, queue)?;
        for (owner, barriers) in acquires {
            let cb = scratch.acquire(em, state, owner)?;
            pipeline_barrier(
                em,
                cb,
                vk::PipelineStageFlags::ALL_COMMANDS,
                vk::PipelineStageFlags::ALL_COMMANDS,
                &[],
                &barriers,
            );
        }
    }
    debug!(image = ?handle, ?path, ?queue, "primed image");
    Ok(path)
}

struct Staged<'a> {
    staging: StagingBuffer,
    placements: &'a [Placement],
    info: &'a FormatInfo,
    handle: VkImage,
    image: &'a ImageObject,
}

/// Set up the per-level staging images of a block-compressed image and
/// record the two-step copy.
fn stage_compressed(
    em: &mut Emitter<'_>,
    state: &State,
    task: &mut ScratchTask,
    staged: Staged<'_>,
    final_barriers: &[packed::ImageMemoryBarrier],
) -> Result<(), RebuildError> {
    let Staged {
        staging,
        placements,
        info,
        handle,
        image,
    } = staged;
    let format = block_staging_format(info.element_size).ok_or_else(|| {
        RebuildError::InvariantViolation(format!(
            "no staging format for {}-byte blocks",
            info.element_size
        ))
    })?;
    let device = image.device;
    let layer_count = image.info.array_layers.max(1);
    let local_type = device_local_memory_type(state, device);

    // One staging image per level that has data, sized in blocks.
    let mut levels: BTreeMap<u32, (VkImage, [u32; 3])> = BTreeMap::new();
    let mut memories = Vec::new();
    for p in placements {
        if levels.contains_key(&p.level) {
            continue;
        }
        let staging_image: VkImage = em.alloc_handle();
        let create = packed::ImageCreateInfo {
            s_type: s_type(vk::StructureType::IMAGE_CREATE_INFO),
            image_type: image.info.image_type as u32,
            format: format.as_raw() as u32,
            extent: p.blocks,
            mip_levels: 1,
            array_layers: layer_count,
            samples: vk::SampleCountFlags::TYPE_1.as_raw(),
            tiling: vk::ImageTiling::OPTIMAL.as_raw() as u32,
            usage: (vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST)
                .as_raw(),
            sharing_mode: vk::SharingMode::EXCLUSIVE.as_raw() as u32,
            initial_layout: vk::ImageLayout::UNDEFINED.as_raw() as u32,
            ..Default::default()
        };
        create_image(em, device, staging_image, &create, &[]);
        image_memory_requirements(em, device, staging_image);
        let bytes = u64::from(p.blocks[0])
            * u64::from(p.blocks[1])
            * u64::from(p.blocks[2])
            * u64::from(layer_count)
            * u64::from(info.element_size);
        let dedicated = packed::MemoryDedicatedAllocateInfo {
            s_type: s_type(vk::StructureType::MEMORY_DEDICATED_ALLOCATE_INFO),
            image: staging_image.0,
            ..Default::default()
        };
        let memory = allocate_memory(
            em,
            device,
            round_up(bytes * 2, 65536),
            local_type,
            Some(dedicated),
        );
        em.write(ApiCommand::BindImageMemory {
            device,
            image: staging_image,
            memory,
            offset: 0,
        });
        levels.insert(p.level, (staging_image, p.blocks));
        memories.push((staging_image, memory));
    }

    let whole = whole_range(info, image);
    let color = vk::ImageAspectFlags::COLOR;
    let ignored = (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED);
    let staging_range = |layer_count| packed::ImageSubresourceRange {
        aspect_mask: color.as_raw(),
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count,
    };

    let mut to_dst: Vec<packed::ImageMemoryBarrier> = levels
        .values()
        .map(|(img, _)| {
            image_barrier(
                *img,
                staging_range(layer_count),
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                ignored,
            )
        })
        .collect();
    to_dst.push(image_barrier(
        handle,
        whole,
        vk::ImageLayout::UNDEFINED,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
        vk::AccessFlags::empty(),
        vk::AccessFlags::TRANSFER_WRITE,
        ignored,
    ));
    let to_src: Vec<packed::ImageMemoryBarrier> = levels
        .values()
        .map(|(img, _)| {
            image_barrier(
                *img,
                staging_range(layer_count),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL.as_raw(),
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::TRANSFER_READ,
                ignored,
            )
        })
        .collect();

    // Buffer -> staging image, one texel per block.
    let uploads: Vec<(VkImage, packed::BufferImageCopy)> = placements
        .iter()
        .filter_map(|p| {
            let (img, blocks) = levels.get(&p.level)?;
            Some((
                *img,
                packed::BufferImageCopy {
                    buffer_offset: p.offset,
                    buffer_row_length: 0,
                    buffer_image_height: 0,
                    image_subresource: layers(color, 0, p.layer),
                    image_offset: [0; 3],
                    image_extent: *blocks,
                },
            ))
        })
        .collect();
    // Staging image -> compressed level; extent is in staging texels.
    let copies: Vec<(VkImage, packed::ImageCopy)> = levels
        .iter()
        .map(|(level, (img, blocks))| {
            (
                *img,
                packed::ImageCopy {
                    src_subresource: packed::ImageSubresourceLayers {
                        aspect_mask: color.as_raw(),
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count,
                    },
                    src_offset: [0; 3],
                    dst_subresource: packed::ImageSubresourceLayers {
                        aspect_mask: color.as_raw(),
                        mip_level: *level,
                        base_array_layer: 0,
                        layer_count,
                    },
                    dst_offset: [0; 3],
                    extent: *blocks,
                },
            )
        })
        .collect();

    task.add_buffer(staging);
    let finals = final_barriers.to_vec();
    task.on_record(move |em: &mut Emitter<'_>, rec: &Recording| {
        let cb = rec.command_buffer;
        pipeline_barrier(
            em,
            cb,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
            &[],
            &to_dst,
        );
        for (img, region) in &uploads {
            copy_buffer_to_image(em, cb, rec.buffers[0], *img, std::slice::from_ref(region));
        }
        pipeline_barrier(
            em,
            cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            &[],
            &to_src,
        );
        for (img, region) in &copies {
            copy_image(em, cb, *img, handle, std::slice::from_ref(region));
        }
        pipeline_barrier(
            em,
            cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::ALL_COMMANDS,
            &[],
            &finals,
        );
        Ok(())
    });
    task.defer(move |em: &mut Emitter<'_>| {
        for (image, memory) in memories {
            em.write(ApiCommand::DestroyImage {
                device,
                image,
                allocator: Ptr::NULL,
            });
            em.write(ApiCommand::FreeMemory {
                device,
                memory,
                allocator: Ptr::NULL,
            });
        }
        Ok(())
    });
    Ok(())
}

/// Index of a device-local memory type of `device`, or 0.
fn device_local_memory_type(state: &State, device: VkDevice) -> u32 {
    state
        .devices
        .get(&device)
        .and_then(|d| state.physical_devices.get(&d.physical_device))
        .and_then(|pd| {
            pd.memory_types.iter().position(|t| {
                vk::MemoryPropertyFlags::from_raw(t.property_flags)
                    .contains(vk::MemoryPropertyFlags::DEVICE_LOCAL)
            })
        })
        .unwrap_or(0) as u32
}
