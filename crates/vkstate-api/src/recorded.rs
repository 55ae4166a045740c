//! Commands captured inside command buffers.
//!
//! Array arguments keep the capture's dense `u32`-keyed maps; the rebuilder
//! unpacks them into contiguous payloads when it reissues the command.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::blob::BlobRef;
use crate::handle::*;
use crate::packed::{
    BufferCopy, BufferImageCopy, ClearAttachment, ClearDepthStencilValue, ClearRect, ClearValue,
    ImageBlit, ImageCopy, ImageResolve, ImageSubresourceRange, Rect2D, Viewport,
};

/// A captured array: element index to element.
pub type DenseMap<T> = BTreeMap<u32, T>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBarrierRecord {
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferBarrierRecord {
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub buffer: VkBuffer,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBarrierRecord {
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub old_layout: i32,
    pub new_layout: i32,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub image: VkImage,
    pub subresource_range: ImageSubresourceRange,
}

/// One command recorded into a command buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordedCommand {
    // ── State ───────────────────────────────────────────────
    BindPipeline {
        pipeline_bind_point: i32,
        pipeline: VkPipeline,
    },
    SetViewport {
        first_viewport: u32,
        viewports: DenseMap<Viewport>,
    },
    SetScissor {
        first_scissor: u32,
        scissors: DenseMap<Rect2D>,
    },
    SetLineWidth {
        line_width: f32,
    },
    SetDepthBias {
        constant_factor: f32,
        clamp: f32,
        slope_factor: f32,
    },
    SetBlendConstants {
        blend_constants: [f32; 4],
    },
    SetDepthBounds {
        min_depth_bounds: f32,
        max_depth_bounds: f32,
    },
    SetStencilCompareMask {
        face_mask: u32,
        compare_mask: u32,
    },
    SetStencilWriteMask {
        face_mask: u32,
        write_mask: u32,
    },
    SetStencilReference {
        face_mask: u32,
        reference: u32,
    },
    BindDescriptorSets {
        pipeline_bind_point: i32,
        layout: VkPipelineLayout,
        first_set: u32,
        descriptor_sets: DenseMap<VkDescriptorSet>,
        dynamic_offsets: DenseMap<u32>,
    },
    BindIndexBuffer {
        buffer: VkBuffer,
        offset: u64,
        index_type: i32,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: DenseMap<VkBuffer>,
        offsets: DenseMap<u64>,
    },
    PushConstants {
        layout: VkPipelineLayout,
        stage_flags: u32,
        offset: u32,
        size: u32,
        data: BlobRef,
    },

    // ── Draw / dispatch ─────────────────────────────────────
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: VkBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawIndexedIndirect {
        buffer: VkBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    },
    DispatchIndirect {
        buffer: VkBuffer,
        offset: u64,
    },

    // ── Transfer ────────────────────────────────────────────
    CopyBuffer {
        src_buffer: VkBuffer,
        dst_buffer: VkBuffer,
        regions: DenseMap<BufferCopy>,
    },
    CopyImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        regions: DenseMap<ImageCopy>,
    },
    BlitImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        regions: DenseMap<ImageBlit>,
        filter: i32,
    },
    CopyBufferToImage {
        src_buffer: VkBuffer,
        dst_image: VkImage,
        dst_image_layout: i32,
        regions: DenseMap<BufferImageCopy>,
    },
    CopyImageToBuffer {
        src_image: VkImage,
        src_image_layout: i32,
        dst_buffer: VkBuffer,
        regions: DenseMap<BufferImageCopy>,
    },
    UpdateBuffer {
        dst_buffer: VkBuffer,
        dst_offset: u64,
        data_size: u64,
        data: BlobRef,
    },
    FillBuffer {
        dst_buffer: VkBuffer,
        dst_offset: u64,
        size: u64,
        data: u32,
    },
    ClearColorImage {
        image: VkImage,
        image_layout: i32,
        color: ClearValue,
        ranges: DenseMap<ImageSubresourceRange>,
    },
    ClearDepthStencilImage {
        image: VkImage,
        image_layout: i32,
        depth_stencil: ClearDepthStencilValue,
        ranges: DenseMap<ImageSubresourceRange>,
    },
    ClearAttachments {
        attachments: DenseMap<ClearAttachment>,
        rects: DenseMap<ClearRect>,
    },
    ResolveImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        regions: DenseMap<ImageResolve>,
    },

    // ── Synchronization ─────────────────────────────────────
    SetEvent {
        event: VkEvent,
        stage_mask: u32,
    },
    ResetEvent {
        event: VkEvent,
        stage_mask: u32,
    },
    WaitEvents {
        events: DenseMap<VkEvent>,
        src_stage_mask: u32,
        dst_stage_mask: u32,
        memory_barriers: DenseMap<MemoryBarrierRecord>,
        buffer_memory_barriers: DenseMap<BufferBarrierRecord>,
        image_memory_barriers: DenseMap<ImageBarrierRecord>,
    },
    PipelineBarrier {
        src_stage_mask: u32,
        dst_stage_mask: u32,
        dependency_flags: u32,
        memory_barriers: DenseMap<MemoryBarrierRecord>,
        buffer_memory_barriers: DenseMap<BufferBarrierRecord>,
        image_memory_barriers: DenseMap<ImageBarrierRecord>,
    },

    // ── Queries ─────────────────────────────────────────────
    BeginQuery {
        query_pool: VkQueryPool,
        query: u32,
        flags: u32,
    },
    EndQuery {
        query_pool: VkQueryPool,
        query: u32,
    },
    ResetQueryPool {
        query_pool: VkQueryPool,
        first_query: u32,
        query_count: u32,
    },
    WriteTimestamp {
        pipeline_stage: u32,
        query_pool: VkQueryPool,
        query: u32,
    },
    CopyQueryPoolResults {
        query_pool: VkQueryPool,
        first_query: u32,
        query_count: u32,
        dst_buffer: VkBuffer,
        dst_offset: u64,
        stride: u64,
        flags: u32,
    },

    // ── Render pass ─────────────────────────────────────────
    BeginRenderPass {
        render_pass: VkRenderPass,
        framebuffer: VkFramebuffer,
        render_area: Rect2D,
        clear_values: DenseMap<ClearValue>,
        contents: i32,
    },
    NextSubpass {
        contents: i32,
    },
    EndRenderPass,
    ExecuteCommands {
        command_buffers: DenseMap<VkCommandBuffer>,
    },

    // ── Debug markers ───────────────────────────────────────
    DebugMarkerBegin {
        marker_name: String,
        color: [f32; 4],
    },
    DebugMarkerEnd,
    DebugMarkerInsert {
        marker_name: String,
        color: [f32; 4],
    },

    /// A command the capture recorded but this model does not describe.
    Unsupported {
        name: String,
    },
}

impl RecordedCommand {
    pub fn name(&self) -> &str {
        match self {
            RecordedCommand::BindPipeline { .. } => "vkCmdBindPipeline",
            RecordedCommand::SetViewport { .. } => "vkCmdSetViewport",
            RecordedCommand::SetScissor { .. } => "vkCmdSetScissor",
            RecordedCommand::SetLineWidth { .. } => "vkCmdSetLineWidth",
            RecordedCommand::SetDepthBias { .. } => "vkCmdSetDepthBias",
            RecordedCommand::SetBlendConstants { .. } => "vkCmdSetBlendConstants",
            RecordedCommand::SetDepthBounds { .. } => "vkCmdSetDepthBounds",
            RecordedCommand::SetStencilCompareMask { .. } => "vkCmdSetStencilCompareMask",
            RecordedCommand::SetStencilWriteMask { .. } => "vkCmdSetStencilWriteMask",
            RecordedCommand::SetStencilReference { .. } => "vkCmdSetStencilReference",
            RecordedCommand::BindDescriptorSets { .. } => "vkCmdBindDescriptorSets",
            RecordedCommand::BindIndexBuffer { .. } => "vkCmdBindIndexBuffer",
            RecordedCommand::BindVertexBuffers { .. } => "vkCmdBindVertexBuffers",
            RecordedCommand::PushConstants { .. } => "vkCmdPushConstants",
            RecordedCommand::Draw { .. } => "vkCmdDraw",
            RecordedCommand::DrawIndexed { .. } => "vkCmdDrawIndexed",
            RecordedCommand::DrawIndirect { .. } => "vkCmdDrawIndirect",
            RecordedCommand::DrawIndexedIndirect { .. } => "vkCmdDrawIndexedIndirect",
            RecordedCommand::Dispatch { .. } => "vkCmdDispatch",
            RecordedCommand::DispatchIndirect { .. } => "vkCmdDispatchIndirect",
            RecordedCommand::CopyBuffer { .. } => "vkCmdCopyBuffer",
            RecordedCommand::CopyImage { .. } => "vkCmdCopyImage",
            RecordedCommand::BlitImage { .. } => "vkCmdBlitImage",
            RecordedCommand::CopyBufferToImage { .. } => "vkCmdCopyBufferToImage",
            RecordedCommand::CopyImageToBuffer { .. } => "vkCmdCopyImageToBuffer",
            RecordedCommand::UpdateBuffer { .. } => "vkCmdUpdateBuffer",
            RecordedCommand::FillBuffer { .. } => "vkCmdFillBuffer",
            RecordedCommand::ClearColorImage { .. } => "vkCmdClearColorImage",
            RecordedCommand::ClearDepthStencilImage { .. } => "vkCmdClearDepthStencilImage",
            RecordedCommand::ClearAttachments { .. } => "vkCmdClearAttachments",
            RecordedCommand::ResolveImage { .. } => "vkCmdResolveImage",
            RecordedCommand::SetEvent { .. } => "vkCmdSetEvent",
            RecordedCommand::ResetEvent { .. } => "vkCmdResetEvent",
            RecordedCommand::WaitEvents { .. } => "vkCmdWaitEvents",
            RecordedCommand::PipelineBarrier { .. } => "vkCmdPipelineBarrier",
            RecordedCommand::BeginQuery { .. } => "vkCmdBeginQuery",
            RecordedCommand::EndQuery { .. } => "vkCmdEndQuery",
            RecordedCommand::ResetQueryPool { .. } => "vkCmdResetQueryPool",
            RecordedCommand::WriteTimestamp { .. } => "vkCmdWriteTimestamp",
            RecordedCommand::CopyQueryPoolResults { .. } => "vkCmdCopyQueryPoolResults",
            RecordedCommand::BeginRenderPass { .. } => "vkCmdBeginRenderPass",
            RecordedCommand::NextSubpass { .. } => "vkCmdNextSubpass",
            RecordedCommand::EndRenderPass => "vkCmdEndRenderPass",
            RecordedCommand::ExecuteCommands { .. } => "vkCmdExecuteCommands",
            RecordedCommand::DebugMarkerBegin { .. } => "vkCmdDebugMarkerBeginEXT",
            RecordedCommand::DebugMarkerEnd => "vkCmdDebugMarkerEndEXT",
            RecordedCommand::DebugMarkerInsert { .. } => "vkCmdDebugMarkerInsertEXT",
            RecordedCommand::Unsupported { name } => name,
        }
    }
}
