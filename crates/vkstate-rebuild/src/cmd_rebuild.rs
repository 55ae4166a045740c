//! Reissuing captured `vkCmd*` commands against a target command buffer.
//!
//! [`rebuild_command`] checks that every handle the command references
//! exists in the rebuilt state, then builds the pointer-form call with its
//! array and struct arguments placed as payloads on the emitter. The caller
//! writes the returned command (or discards the payloads on error).

use ash::vk;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::recorded::{BufferBarrierRecord, ImageBarrierRecord, MemoryBarrierRecord};
use vkstate_api::{AnyHandle, ApiCommand, CmdCall, DenseMap, RecordedCommand};
use vkstate_core::RebuildError;

use crate::dense::{unpack, unpack_with};
use crate::emitter::{Emitter, NewState};

/// Build the call that re-records `cmd` into `target`.
pub fn rebuild_command(
    em: &mut Emitter<'_>,
    target: VkCommandBuffer,
    cmd: &RecordedCommand,
) -> Result<ApiCommand, RebuildError> {
    check_references(&em.new_state, cmd)?;
    let call = encode(em, cmd)?;
    Ok(ApiCommand::Cmd {
        command_buffer: target,
        call,
    })
}

/// Rebuild `cmd` and write it, releasing payloads on failure.
pub fn rebuild_and_write(
    em: &mut Emitter<'_>,
    target: VkCommandBuffer,
    cmd: &RecordedCommand,
) -> Result<(), RebuildError> {
    match rebuild_command(em, target, cmd) {
        Ok(api) => {
            em.write(api);
            Ok(())
        }
        Err(e) => {
            em.discard_pending();
            Err(e)
        }
    }
}

// ── Reference checks ────────────────────────────────────────

fn check_references(new: &NewState, cmd: &RecordedCommand) -> Result<(), RebuildError> {
    if let RecordedCommand::Unsupported { name } = cmd {
        return Err(RebuildError::UnsupportedCommand(name.clone()));
    }
    referenced_handles(cmd)
        .into_iter()
        .filter(|h| h.raw != 0)
        .try_for_each(|h| new.require(h))
}

fn barrier_handles(
    out: &mut Vec<AnyHandle>,
    buffers: &DenseMap<BufferBarrierRecord>,
    images: &DenseMap<ImageBarrierRecord>,
) {
    out.extend(buffers.values().map(|b| b.buffer.any()));
    out.extend(images.values().map(|b| b.image.any()));
}

/// Handles `cmd` needs to exist when it is re-recorded.
pub fn referenced_handles(cmd: &RecordedCommand) -> Vec<AnyHandle> {
    use RecordedCommand as R;

    let mut out = Vec::new();
    match cmd {
        R::BindPipeline { pipeline, .. } => out.push(pipeline.any()),
        R::BindDescriptorSets {
            layout,
            descriptor_sets,
            ..
        } => {
            out.push(layout.any());
            out.extend(descriptor_sets.values().map(|s| s.any()));
        }
        R::BindIndexBuffer { buffer, .. }
        | R::DrawIndirect { buffer, .. }
        | R::DrawIndexedIndirect { buffer, .. }
        | R::DispatchIndirect { buffer, .. } => out.push(buffer.any()),
        R::BindVertexBuffers { buffers, .. } => out.extend(buffers.values().map(|b| b.any())),
        R::PushConstants { layout, .. } => out.push(layout.any()),
        R::CopyBuffer {
            src_buffer,
            dst_buffer,
            ..
        } => {
            out.push(src_buffer.any());
            out.push(dst_buffer.any());
        }
        R::CopyImage {
            src_image,
            dst_image,
            ..
        }
        | R::BlitImage {
            src_image,
            dst_image,
            ..
        }
        | R::ResolveImage {
            src_image,
            dst_image,
            ..
        } => {
            out.push(src_image.any());
            out.push(dst_image.any());
        }
        R::CopyBufferToImage {
            src_buffer,
            dst_image,
            ..
        } => {
            out.push(src_buffer.any());
            out.push(dst_image.any());
        }
        R::CopyImageToBuffer {
            src_image,
            dst_buffer,
            ..
        } => {
            out.push(src_image.any());
            out.push(dst_buffer.any());
        }
        R::UpdateBuffer { dst_buffer, .. } | R::FillBuffer { dst_buffer, .. } => {
            out.push(dst_buffer.any())
        }
        R::ClearColorImage { image, .. } | R::ClearDepthStencilImage { image, .. } => {
            out.push(image.any())
        }
        R::SetEvent { event, .. } | R::ResetEvent { event, .. } => out.push(event.any()),
        R::WaitEvents {
            events,
            buffer_memory_barriers,
            image_memory_barriers,
            ..
        } => {
            out.extend(events.values().map(|e| e.any()));
            barrier_handles(&mut out, buffer_memory_barriers, image_memory_barriers);
        }
        R::PipelineBarrier {
            buffer_memory_barriers,
            image_memory_barriers,
            ..
        } => barrier_handles(&mut out, buffer_memory_barriers, image_memory_barriers),
        R::BeginQuery { query_pool, .. }
        | R::EndQuery { query_pool, .. }
        | R::ResetQueryPool { query_pool, .. }
        | R::WriteTimestamp { query_pool, .. } => out.push(query_pool.any()),
        R::CopyQueryPoolResults {
            query_pool,
            dst_buffer,
            ..
        } => {
            out.push(query_pool.any());
            out.push(dst_buffer.any());
        }
        R::BeginRenderPass {
            render_pass,
            framebuffer,
            ..
        } => {
            out.push(render_pass.any());
            out.push(framebuffer.any());
        }
        R::ExecuteCommands { command_buffers } => {
            out.extend(command_buffers.values().map(|c| c.any()))
        }
        R::SetViewport { .. }
        | R::SetScissor { .. }
        | R::SetLineWidth { .. }
        | R::SetDepthBias { .. }
        | R::SetBlendConstants { .. }
        | R::SetDepthBounds { .. }
        | R::SetStencilCompareMask { .. }
        | R::SetStencilWriteMask { .. }
        | R::SetStencilReference { .. }
        | R::Draw { .. }
        | R::DrawIndexed { .. }
        | R::Dispatch { .. }
        | R::ClearAttachments { .. }
        | R::NextSubpass { .. }
        | R::EndRenderPass
        | R::DebugMarkerBegin { .. }
        | R::DebugMarkerEnd
        | R::DebugMarkerInsert { .. }
        | R::Unsupported { .. } => {}
    }
    out
}

// ── Barrier encoding ────────────────────────────────────────

pub fn memory_barrier(rec: &MemoryBarrierRecord) -> packed::MemoryBarrier {
    packed::MemoryBarrier {
        s_type: s_type(vk::StructureType::MEMORY_BARRIER),
        src_access_mask: rec.src_access_mask,
        dst_access_mask: rec.dst_access_mask,
        ..Default::default()
    }
}

pub fn buffer_barrier(rec: &BufferBarrierRecord) -> packed::BufferMemoryBarrier {
    packed::BufferMemoryBarrier {
        s_type: s_type(vk::StructureType::BUFFER_MEMORY_BARRIER),
        src_access_mask: rec.src_access_mask,
        dst_access_mask: rec.dst_access_mask,
        src_queue_family_index: rec.src_queue_family_index,
        dst_queue_family_index: rec.dst_queue_family_index,
        buffer: rec.buffer.0,
        offset: rec.offset,
        size: rec.size,
        ..Default::default()
    }
}

pub fn image_barrier(rec: &ImageBarrierRecord) -> packed::ImageMemoryBarrier {
    packed::ImageMemoryBarrier {
        s_type: s_type(vk::StructureType::IMAGE_MEMORY_BARRIER),
        src_access_mask: rec.src_access_mask,
        dst_access_mask: rec.dst_access_mask,
        old_layout: rec.old_layout as u32,
        new_layout: rec.new_layout as u32,
        src_queue_family_index: rec.src_queue_family_index,
        dst_queue_family_index: rec.dst_queue_family_index,
        image: rec.image.0,
        subresource_range: rec.subresource_range,
        ..Default::default()
    }
}

struct Barriers {
    memory_count: u32,
    memory: vkstate_api::Ptr,
    buffer_count: u32,
    buffer: vkstate_api::Ptr,
    image_count: u32,
    image: vkstate_api::Ptr,
}

fn encode_barriers(
    em: &mut Emitter<'_>,
    memory: &DenseMap<MemoryBarrierRecord>,
    buffer: &DenseMap<BufferBarrierRecord>,
    image: &DenseMap<ImageBarrierRecord>,
) -> Result<Barriers, RebuildError> {
    let memory = unpack_with(memory, memory_barrier)?;
    let buffer = unpack_with(buffer, buffer_barrier)?;
    let image = unpack_with(image, image_barrier)?;
    Ok(Barriers {
        memory_count: memory.len() as u32,
        memory: em.alloc_read_slice(&memory),
        buffer_count: buffer.len() as u32,
        buffer: em.alloc_read_slice(&buffer),
        image_count: image.len() as u32,
        image: em.alloc_read_slice(&image),
    })
}

fn raw_handles<H: Handle>(map: &DenseMap<H>) -> Result<Vec<u64>, RebuildError> {
    unpack_with(map, |h| h.raw())
}

fn debug_marker(em: &mut Emitter<'_>, name: &str, color: [f32; 4]) -> vkstate_api::Ptr {
    let info = packed::DebugMarkerMarkerInfo {
        s_type: s_type(vk::StructureType::DEBUG_MARKER_MARKER_INFO_EXT),
        p_marker_name: em.alloc_cstr(name).0,
        color,
        ..Default::default()
    };
    em.alloc_read(&info)
}

// ── Encoding ────────────────────────────────────────────────

fn encode(em: &mut Emitter<'_>, cmd: &RecordedCommand) -> Result<CmdCall, RebuildError> {
    use RecordedCommand as R;

    let call = match cmd {
        R::BindPipeline {
            pipeline_bind_point,
            pipeline,
        } => CmdCall::BindPipeline {
            pipeline_bind_point: *pipeline_bind_point,
            pipeline: *pipeline,
        },
        R::SetViewport {
            first_viewport,
            viewports,
        } => {
            let viewports = unpack(viewports)?;
            CmdCall::SetViewport {
                first_viewport: *first_viewport,
                viewport_count: viewports.len() as u32,
                viewports: em.alloc_read_slice(&viewports),
            }
        }
        R::SetScissor {
            first_scissor,
            scissors,
        } => {
            let scissors = unpack(scissors)?;
            CmdCall::SetScissor {
                first_scissor: *first_scissor,
                scissor_count: scissors.len() as u32,
                scissors: em.alloc_read_slice(&scissors),
            }
        }
        R::SetLineWidth { line_width } => CmdCall::SetLineWidth {
            line_width: *line_width,
        },
        R::SetDepthBias {
            constant_factor,
            clamp,
            slope_factor,
        } => CmdCall::SetDepthBias {
            constant_factor: *constant_factor,
            clamp: *clamp,
            slope_factor: *slope_factor,
        },
        R::SetBlendConstants { blend_constants } => CmdCall::SetBlendConstants {
            blend_constants: *blend_constants,
        },
        R::SetDepthBounds {
            min_depth_bounds,
            max_depth_bounds,
        } => CmdCall::SetDepthBounds {
            min_depth_bounds: *min_depth_bounds,
            max_depth_bounds: *max_depth_bounds,
        },
        R::SetStencilCompareMask {
            face_mask,
            compare_mask,
        } => CmdCall::SetStencilCompareMask {
            face_mask: *face_mask,
            compare_mask: *compare_mask,
        },
        R::SetStencilWriteMask {
            face_mask,
            write_mask,
        } => CmdCall::SetStencilWriteMask {
            face_mask: *face_mask,
            write_mask: *write_mask,
        },
        R::SetStencilReference {
            face_mask,
            reference,
        } => CmdCall::SetStencilReference {
            face_mask: *face_mask,
            reference: *reference,
        },
        R::BindDescriptorSets {
            pipeline_bind_point,
            layout,
            first_set,
            descriptor_sets,
            dynamic_offsets,
        } => {
            let sets = raw_handles(descriptor_sets)?;
            let offsets = unpack(dynamic_offsets)?;
            CmdCall::BindDescriptorSets {
                pipeline_bind_point: *pipeline_bind_point,
                layout: *layout,
                first_set: *first_set,
                descriptor_set_count: sets.len() as u32,
                descriptor_sets: em.alloc_read_slice(&sets),
                dynamic_offset_count: offsets.len() as u32,
                dynamic_offsets: em.alloc_read_slice(&offsets),
            }
        }
        R::BindIndexBuffer {
            buffer,
            offset,
            index_type,
        } => CmdCall::BindIndexBuffer {
            buffer: *buffer,
            offset: *offset,
            index_type: *index_type,
        },
        R::BindVertexBuffers {
            first_binding,
            buffers,
            offsets,
        } => {
            let buffers = raw_handles(buffers)?;
            let offsets = unpack(offsets)?;
            if buffers.len() != offsets.len() {
                return Err(RebuildError::InvariantViolation(format!(
                    "vkCmdBindVertexBuffers with {} buffers and {} offsets",
                    buffers.len(),
                    offsets.len()
                )));
            }
            CmdCall::BindVertexBuffers {
                first_binding: *first_binding,
                binding_count: buffers.len() as u32,
                buffers: em.alloc_read_slice(&buffers),
                offsets: em.alloc_read_slice(&offsets),
            }
        }
        R::PushConstants {
            layout,
            stage_flags,
            offset,
            size,
            data,
        } => CmdCall::PushConstants {
            layout: *layout,
            stage_flags: *stage_flags,
            offset: *offset,
            size: *size,
            values: em.read_at(data)?,
        },
        R::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        } => CmdCall::Draw {
            vertex_count: *vertex_count,
            instance_count: *instance_count,
            first_vertex: *first_vertex,
            first_instance: *first_instance,
        },
        R::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        } => CmdCall::DrawIndexed {
            index_count: *index_count,
            instance_count: *instance_count,
            first_index: *first_index,
            vertex_offset: *vertex_offset,
            first_instance: *first_instance,
        },
        R::DrawIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        } => CmdCall::DrawIndirect {
            buffer: *buffer,
            offset: *offset,
            draw_count: *draw_count,
            stride: *stride,
        },
        R::DrawIndexedIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        } => CmdCall::DrawIndexedIndirect {
            buffer: *buffer,
            offset: *offset,
            draw_count: *draw_count,
            stride: *stride,
        },
        R::Dispatch {
            group_count_x,
            group_count_y,
            group_count_z,
        } => CmdCall::Dispatch {
            group_count_x: *group_count_x,
            group_count_y: *group_count_y,
            group_count_z: *group_count_z,
        },
        R::DispatchIndirect { buffer, offset } => CmdCall::DispatchIndirect {
            buffer: *buffer,
            offset: *offset,
        },
        R::CopyBuffer {
            src_buffer,
            dst_buffer,
            regions,
        } => {
            let regions = unpack(regions)?;
            CmdCall::CopyBuffer {
                src_buffer: *src_buffer,
                dst_buffer: *dst_buffer,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
            }
        }
        R::CopyImage {
            src_image,
            src_image_layout,
            dst_image,
            dst_image_layout,
            regions,
        } => {
            let regions = unpack(regions)?;
            CmdCall::CopyImage {
                src_image: *src_image,
                src_image_layout: *src_image_layout,
                dst_image: *dst_image,
                dst_image_layout: *dst_image_layout,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
            }
        }
        R::BlitImage {
            src_image,
            src_image_layout,
            dst_image,
            dst_image_layout,
            regions,
            filter,
        } => {
            let regions = unpack(regions)?;
            CmdCall::BlitImage {
                src_image: *src_image,
                src_image_layout: *src_image_layout,
                dst_image: *dst_image,
                dst_image_layout: *dst_image_layout,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
                filter: *filter,
            }
        }
        R::CopyBufferToImage {
            src_buffer,
            dst_image,
            dst_image_layout,
            regions,
        } => {
            let regions = unpack(regions)?;
            CmdCall::CopyBufferToImage {
                src_buffer: *src_buffer,
                dst_image: *dst_image,
                dst_image_layout: *dst_image_layout,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
            }
        }
        R::CopyImageToBuffer {
            src_image,
            src_image_layout,
            dst_buffer,
            regions,
        } => {
            let regions = unpack(regions)?;
            CmdCall::CopyImageToBuffer {
                src_image: *src_image,
                src_image_layout: *src_image_layout,
                dst_buffer: *dst_buffer,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
            }
        }
        R::UpdateBuffer {
            dst_buffer,
            dst_offset,
            data_size,
            data,
        } => CmdCall::UpdateBuffer {
            dst_buffer: *dst_buffer,
            dst_offset: *dst_offset,
            data_size: *data_size,
            data: em.read_at(data)?,
        },
        R::FillBuffer {
            dst_buffer,
            dst_offset,
            size,
            data,
        } => CmdCall::FillBuffer {
            dst_buffer: *dst_buffer,
            dst_offset: *dst_offset,
            size: *size,
            data: *data,
        },
        R::ClearColorImage {
            image,
            image_layout,
            color,
            ranges,
        } => {
            let ranges = unpack(ranges)?;
            CmdCall::ClearColorImage {
                image: *image,
                image_layout: *image_layout,
                color: em.alloc_read(color),
                range_count: ranges.len() as u32,
                ranges: em.alloc_read_slice(&ranges),
            }
        }
        R::ClearDepthStencilImage {
            image,
            image_layout,
            depth_stencil,
            ranges,
        } => {
            let ranges = unpack(ranges)?;
            CmdCall::ClearDepthStencilImage {
                image: *image,
                image_layout: *image_layout,
                depth_stencil: em.alloc_read(depth_stencil),
                range_count: ranges.len() as u32,
                ranges: em.alloc_read_slice(&ranges),
            }
        }
        R::ClearAttachments { attachments, rects } => {
            let attachments = unpack(attachments)?;
            let rects = unpack(rects)?;
            CmdCall::ClearAttachments {
                attachment_count: attachments.len() as u32,
                attachments: em.alloc_read_slice(&attachments),
                rect_count: rects.len() as u32,
                rects: em.alloc_read_slice(&rects),
            }
        }
        R::ResolveImage {
            src_image,
            src_image_layout,
            dst_image,
            dst_image_layout,
            regions,
        } => {
            let regions = unpack(regions)?;
            CmdCall::ResolveImage {
                src_image: *src_image,
                src_image_layout: *src_image_layout,
                dst_image: *dst_image,
                dst_image_layout: *dst_image_layout,
                region_count: regions.len() as u32,
                regions: em.alloc_read_slice(&regions),
            }
        }
        R::SetEvent { event, stage_mask } => CmdCall::SetEvent {
            event: *event,
            stage_mask: *stage_mask,
        },
        R::ResetEvent { event, stage_mask } => CmdCall::ResetEvent {
            event: *event,
            stage_mask: *stage_mask,
        },
        R::WaitEvents {
            events,
            src_stage_mask,
            dst_stage_mask,
            memory_barriers,
            buffer_memory_barriers,
            image_memory_barriers,
        } => {
            let events = raw_handles(events)?;
            let b = encode_barriers(
                em,
                memory_barriers,
                buffer_memory_barriers,
                image_memory_barriers,
            )?;
            CmdCall::WaitEvents {
                event_count: events.len() as u32,
                events: em.alloc_read_slice(&events),
                src_stage_mask: *src_stage_mask,
                dst_stage_mask: *dst_stage_mask,
                memory_barrier_count: b.memory_count,
                memory_barriers: b.memory,
                buffer_memory_barrier_count: b.buffer_count,
                buffer_memory_barriers: b.buffer,
                image_memory_barrier_count: b.image_count,
                image_memory_barriers: b.image,
            }
        }
        R::PipelineBarrier {
            src_stage_mask,
            dst_stage_mask,
            dependency_flags,
            memory_barriers,
            buffer_memory_barriers,
            image_memory_barriers,
        } => {
            let b = encode_barriers(
                em,
                memory_barriers,
                buffer_memory_barriers,
                image_memory_barriers,
            )?;
            CmdCall::PipelineBarrier {
                src_stage_mask: *src_stage_mask,
                dst_stage_mask: *dst_stage_mask,
                dependency_flags: *dependency_flags,
                memory_barrier_count: b.memory_count,
                memory_barriers: b.memory,
                buffer_memory_barrier_count: b.buffer_count,
                buffer_memory_barriers: b.buffer,
                image_memory_barrier_count: b.image_count,
                image_memory_barriers: b.image,
            }
        }
        R::BeginQuery {
            query_pool,
            query,
            flags,
        } => CmdCall::BeginQuery {
            query_pool: *query_pool,
            query: *query,
            flags: *flags,
        },
        R::EndQuery { query_pool, query } => CmdCall::EndQuery {
            query_pool: *query_pool,
            query: *query,
        },
        R::ResetQueryPool {
            query_pool,
            first_query,
            query_count,
        } => CmdCall::ResetQueryPool {
            query_pool: *query_pool,
            first_query: *first_query,
            query_count: *query_count,
        },
        R::WriteTimestamp {
            pipeline_stage,
            query_pool,
            query,
        } => CmdCall::WriteTimestamp {
            pipeline_stage: *pipeline_stage,
            query_pool: *query_pool,
            query: *query,
        },
        R::CopyQueryPoolResults {
            query_pool,
            first_query,
            query_count,
            dst_buffer,
            dst_offset,
            stride,
            flags,
        } => CmdCall::CopyQueryPoolResults {
            query_pool: *query_pool,
            first_query: *first_query,
            query_count: *query_count,
            dst_buffer: *dst_buffer,
            dst_offset: *dst_offset,
            stride: *stride,
            flags: *flags,
        },
        R::BeginRenderPass {
            render_pass,
            framebuffer,
            render_area,
            clear_values,
            contents,
        } => {
            let clear_values = unpack(clear_values)?;
            let begin = packed::RenderPassBeginInfo {
                s_type: s_type(vk::StructureType::RENDER_PASS_BEGIN_INFO),
                render_pass: render_pass.0,
                framebuffer: framebuffer.0,
                render_area: *render_area,
                clear_value_count: clear_values.len() as u32,
                p_clear_values: em.alloc_read_slice(&clear_values).0,
                ..Default::default()
            };
            CmdCall::BeginRenderPass {
                render_pass_begin: em.alloc_read(&begin),
                contents: *contents,
            }
        }
        R::NextSubpass { contents } => CmdCall::NextSubpass {
            contents: *contents,
        },
        R::EndRenderPass => CmdCall::EndRenderPass,
        R::ExecuteCommands { command_buffers } => {
            let buffers = raw_handles(command_buffers)?;
            CmdCall::ExecuteCommands {
                command_buffer_count: buffers.len() as u32,
                command_buffers: em.alloc_read_slice(&buffers),
            }
        }
        R::DebugMarkerBegin { marker_name, color } => CmdCall::DebugMarkerBegin {
            marker_info: debug_marker(em, marker_name, *color),
        },
        R::DebugMarkerEnd => CmdCall::DebugMarkerEnd,
        R::DebugMarkerInsert { marker_name, color } => CmdCall::DebugMarkerInsert {
            marker_info: debug_marker(em, marker_name, *color),
        },
        R::Unsupported { name } => return Err(RebuildError::UnsupportedCommand(name.clone())),
    };
    Ok(call)
}
