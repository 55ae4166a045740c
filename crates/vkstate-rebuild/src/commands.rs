//! Emission helpers for the calls the primers and the scratch pool issue
//! directly.

use ash::vk;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::{ApiCommand, CmdCall, Ptr};

use crate::emitter::Emitter;

pub fn allocate_memory(
    em: &mut Emitter<'_>,
    device: VkDevice,
    size: u64,
    memory_type_index: u32,
    dedicated: Option<packed::MemoryDedicatedAllocateInfo>,
) -> VkDeviceMemory {
    let memory: VkDeviceMemory = em.alloc_handle();
    allocate_memory_as(em, device, memory, size, memory_type_index, dedicated);
    memory
}

/// `vkAllocateMemory` writing `memory`.
pub fn allocate_memory_as(
    em: &mut Emitter<'_>,
    device: VkDevice,
    memory: VkDeviceMemory,
    size: u64,
    memory_type_index: u32,
    dedicated: Option<packed::MemoryDedicatedAllocateInfo>,
) {
    let p_next = dedicated.map(|d| em.alloc_read(&d).0).unwrap_or(0);
    let info = packed::MemoryAllocateInfo {
        s_type: s_type(vk::StructureType::MEMORY_ALLOCATE_INFO),
        p_next,
        allocation_size: size,
        memory_type_index,
        ..Default::default()
    };
    let allocate_info = em.alloc_read(&info);
    let memory_out = em.alloc_write(8);
    em.write(ApiCommand::AllocateMemory {
        device,
        allocate_info,
        allocator: Ptr::NULL,
        memory_out,
        memory,
    });
}

/// `vkAllocateCommandBuffers` of `command_buffers` from `pool`.
pub fn allocate_command_buffers(
    em: &mut Emitter<'_>,
    device: VkDevice,
    pool: VkCommandPool,
    level: u32,
    command_buffers: &[VkCommandBuffer],
) {
    let info = packed::CommandBufferAllocateInfo {
        s_type: s_type(vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO),
        command_pool: pool.0,
        level,
        command_buffer_count: command_buffers.len() as u32,
        ..Default::default()
    };
    let allocate_info = em.alloc_read(&info);
    let command_buffers_out = em.alloc_write(8 * command_buffers.len() as u64);
    em.write(ApiCommand::AllocateCommandBuffers {
        device,
        allocate_info,
        command_buffers_out,
        command_buffers: command_buffers.to_vec(),
    });
}

pub fn create_image(
    em: &mut Emitter<'_>,
    device: VkDevice,
    image: VkImage,
    info: &packed::ImageCreateInfo,
    queue_family_indices: &[u32],
) {
    let mut info = *info;
    info.queue_family_index_count = queue_family_indices.len() as u32;
    info.p_queue_family_indices = em.alloc_read_slice(queue_family_indices).0;
    let create_info = em.alloc_read(&info);
    let image_out = em.alloc_write(8);
    em.write(ApiCommand::CreateImage {
        device,
        create_info,
        allocator: Ptr::NULL,
        image_out,
        image,
    });
}

pub fn image_memory_requirements(em: &mut Emitter<'_>, device: VkDevice, image: VkImage) {
    let requirements_out = em.alloc_write(packed::MEMORY_REQUIREMENTS_SIZE);
    em.write(ApiCommand::GetImageMemoryRequirements {
        device,
        image,
        requirements_out,
    });
}

pub fn pipeline_barrier(
    em: &mut Emitter<'_>,
    command_buffer: VkCommandBuffer,
    src_stage: vk::PipelineStageFlags,
    dst_stage: vk::PipelineStageFlags,
    buffers: &[packed::BufferMemoryBarrier],
    images: &[packed::ImageMemoryBarrier],
) {
    let buffer_memory_barriers = em.alloc_read_slice(buffers);
    let image_memory_barriers = em.alloc_read_slice(images);
    em.write(ApiCommand::Cmd {
        command_buffer,
        call: CmdCall::PipelineBarrier {
            src_stage_mask: src_stage.as_raw(),
            dst_stage_mask: dst_stage.as_raw(),
            dependency_flags: 0,
            memory_barrier_count: 0,
            memory_barriers: Ptr::NULL,
            buffer_memory_barrier_count: buffers.len() as u32,
            buffer_memory_barriers,
            image_memory_barrier_count: images.len() as u32,
            image_memory_barriers,
        },
    });
}

pub fn image_barrier(
    image: VkImage,
    range: packed::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: i32,
    src_access: vk::AccessFlags,
    dst_access: vk::AccessFlags,
    families: (u32, u32),
) -> packed::ImageMemoryBarrier {
    packed::ImageMemoryBarrier {
        s_type: s_type(vk::StructureType::IMAGE_MEMORY_BARRIER),
        src_access_mask: src_access.as_raw(),
        dst_access_mask: dst_access.as_raw(),
        old_layout: old_layout.as_raw() as u32,
        new_layout: new_layout as u32,
        src_queue_family_index: families.0,
        dst_queue_family_index: families.1,
        image: image.0,
        subresource_range: range,
        ..Default::default()
    }
}

pub fn subresource_range(aspect: u32, level: u32, layer: u32) -> packed::ImageSubresourceRange {
    packed::ImageSubresourceRange {
        aspect_mask: aspect,
        base_mip_level: level,
        level_count: 1,
        base_array_layer: layer,
        layer_count: 1,
    }
}

pub fn copy_buffer(
    em: &mut Emitter<'_>,
    command_buffer: VkCommandBuffer,
    src_buffer: VkBuffer,
    dst_buffer: VkBuffer,
    regions: &[packed::BufferCopy],
) {
    let regions_ptr = em.alloc_read_slice(regions);
    em.write(ApiCommand::Cmd {
        command_buffer,
        call: CmdCall::CopyBuffer {
            src_buffer,
            dst_buffer,
            region_count: regions.len() as u32,
            regions: regions_ptr,
        },
    });
}

pub fn copy_buffer_to_image(
    em: &mut Emitter<'_>,
    command_buffer: VkCommandBuffer,
    src_buffer: VkBuffer,
    dst_image: VkImage,
    regions: &[packed::BufferImageCopy],
) {
    let regions_ptr = em.alloc_read_slice(regions);
    em.write(ApiCommand::Cmd {
        command_buffer,
        call: CmdCall::CopyBufferToImage {
            src_buffer,
            dst_image,
            dst_image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
            region_count: regions.len() as u32,
            regions: regions_ptr,
        },
    });
}

pub fn copy_image(
    em: &mut Emitter<'_>,
    command_buffer: VkCommandBuffer,
    src_image: VkImage,
    dst_image: VkImage,
    regions: &[packed::ImageCopy],
) {
    let regions_ptr = em.alloc_read_slice(regions);
    em.write(ApiCommand::Cmd {
        command_buffer,
        call: CmdCall::CopyImage {
            src_image,
            src_image_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL.as_raw(),
            dst_image,
            dst_image_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL.as_raw(),
            region_count: regions.len() as u32,
            regions: regions_ptr,
        },
    });
}

/// `vkQueueSubmit` of `command_buffers` with optional semaphore signals.
pub fn queue_submit(
    em: &mut Emitter<'_>,
    queue: VkQueue,
    command_buffers: &[VkCommandBuffer],
    signal_semaphores: &[VkSemaphore],
    fence: VkFence,
) {
    let cbs: Vec<u64> = command_buffers.iter().map(|c| c.0).collect();
    let sems: Vec<u64> = signal_semaphores.iter().map(|s| s.0).collect();
    let submit = packed::SubmitInfo {
        s_type: s_type(vk::StructureType::SUBMIT_INFO),
        command_buffer_count: cbs.len() as u32,
        p_command_buffers: em.alloc_read_slice(&cbs).0,
        signal_semaphore_count: sems.len() as u32,
        p_signal_semaphores: em.alloc_read_slice(&sems).0,
        ..Default::default()
    };
    let submits = em.alloc_read(&submit);
    em.write(ApiCommand::QueueSubmit {
        queue,
        submit_count: 1,
        submits,
        fence,
    });
}
