//! Vulkan API calls as the rebuilder emits them.
//!
//! Arguments mirror the C signatures: structs and arrays are passed by
//! replay-space [`Ptr`] (their bytes travel in the command's read
//! observations), scalars and handles by value. Output handles are carried
//! both as the out-pointer and as the value the call produces.

use serde::{Deserialize, Serialize};

use crate::handle::*;
use crate::observation::Ptr;

/// Window-system platform of a `vkCreate*SurfaceKHR` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfacePlatform {
    Xlib,
    Xcb,
    Wayland,
    Win32,
    Android,
    MacOs,
    Headless,
}

/// A command recorded into a command buffer (`vkCmd*`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CmdCall {
    BindPipeline {
        pipeline_bind_point: i32,
        pipeline: VkPipeline,
    },
    SetViewport {
        first_viewport: u32,
        viewport_count: u32,
        viewports: Ptr,
    },
    SetScissor {
        first_scissor: u32,
        scissor_count: u32,
        scissors: Ptr,
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
        descriptor_set_count: u32,
        descriptor_sets: Ptr,
        dynamic_offset_count: u32,
        dynamic_offsets: Ptr,
    },
    BindIndexBuffer {
        buffer: VkBuffer,
        offset: u64,
        index_type: i32,
    },
    BindVertexBuffers {
        first_binding: u32,
        binding_count: u32,
        buffers: Ptr,
        offsets: Ptr,
    },
    PushConstants {
        layout: VkPipelineLayout,
        stage_flags: u32,
        offset: u32,
        size: u32,
        values: Ptr,
    },
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
    CopyBuffer {
        src_buffer: VkBuffer,
        dst_buffer: VkBuffer,
        region_count: u32,
        regions: Ptr,
    },
    CopyImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        region_count: u32,
        regions: Ptr,
    },
    BlitImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        region_count: u32,
        regions: Ptr,
        filter: i32,
    },
    CopyBufferToImage {
        src_buffer: VkBuffer,
        dst_image: VkImage,
        dst_image_layout: i32,
        region_count: u32,
        regions: Ptr,
    },
    CopyImageToBuffer {
        src_image: VkImage,
        src_image_layout: i32,
        dst_buffer: VkBuffer,
        region_count: u32,
        regions: Ptr,
    },
    UpdateBuffer {
        dst_buffer: VkBuffer,
        dst_offset: u64,
        data_size: u64,
        data: Ptr,
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
        color: Ptr,
        range_count: u32,
        ranges: Ptr,
    },
    ClearDepthStencilImage {
        image: VkImage,
        image_layout: i32,
        depth_stencil: Ptr,
        range_count: u32,
        ranges: Ptr,
    },
    ClearAttachments {
        attachment_count: u32,
        attachments: Ptr,
        rect_count: u32,
        rects: Ptr,
    },
    ResolveImage {
        src_image: VkImage,
        src_image_layout: i32,
        dst_image: VkImage,
        dst_image_layout: i32,
        region_count: u32,
        regions: Ptr,
    },
    SetEvent {
        event: VkEvent,
        stage_mask: u32,
    },
    ResetEvent {
        event: VkEvent,
        stage_mask: u32,
    },
    WaitEvents {
        event_count: u32,
        events: Ptr,
        src_stage_mask: u32,
        dst_stage_mask: u32,
        memory_barrier_count: u32,
        memory_barriers: Ptr,
        buffer_memory_barrier_count: u32,
        buffer_memory_barriers: Ptr,
        image_memory_barrier_count: u32,
        image_memory_barriers: Ptr,
    },
    PipelineBarrier {
        src_stage_mask: u32,
        dst_stage_mask: u32,
        dependency_flags: u32,
        memory_barrier_count: u32,
        memory_barriers: Ptr,
        buffer_memory_barrier_count: u32,
        buffer_memory_barriers: Ptr,
        image_memory_barrier_count: u32,
        image_memory_barriers: Ptr,
    },
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
    BeginRenderPass {
        render_pass_begin: Ptr,
        contents: i32,
    },
    NextSubpass {
        contents: i32,
    },
    EndRenderPass,
    ExecuteCommands {
        command_buffer_count: u32,
        command_buffers: Ptr,
    },
    DebugMarkerBegin {
        marker_info: Ptr,
    },
    DebugMarkerEnd,
    DebugMarkerInsert {
        marker_info: Ptr,
    },
}

impl CmdCall {
    pub fn name(&self) -> &'static str {
        match self {
            CmdCall::BindPipeline { .. } => "vkCmdBindPipeline",
            CmdCall::SetViewport { .. } => "vkCmdSetViewport",
            CmdCall::SetScissor { .. } => "vkCmdSetScissor",
            CmdCall::SetLineWidth { .. } => "vkCmdSetLineWidth",
            CmdCall::SetDepthBias { .. } => "vkCmdSetDepthBias",
            CmdCall::SetBlendConstants { .. } => "vkCmdSetBlendConstants",
            CmdCall::SetDepthBounds { .. } => "vkCmdSetDepthBounds",
            CmdCall::SetStencilCompareMask { .. } => "vkCmdSetStencilCompareMask",
            CmdCall::SetStencilWriteMask { .. } => "vkCmdSetStencilWriteMask",
            CmdCall::SetStencilReference { .. } => "vkCmdSetStencilReference",
            CmdCall::BindDescriptorSets { .. } => "vkCmdBindDescriptorSets",
            CmdCall::BindIndexBuffer { .. } => "vkCmdBindIndexBuffer",
            CmdCall::BindVertexBuffers { .. } => "vkCmdBindVertexBuffers",
            CmdCall::PushConstants { .. } => "vkCmdPushConstants",
            CmdCall::Draw { .. } => "vkCmdDraw",
            CmdCall::DrawIndexed { .. } => "vkCmdDrawIndexed",
            CmdCall::DrawIndirect { .. } => "vkCmdDrawIndirect",
            CmdCall::DrawIndexedIndirect { .. } => "vkCmdDrawIndexedIndirect",
            CmdCall::Dispatch { .. } => "vkCmdDispatch",
            CmdCall::DispatchIndirect { .. } => "vkCmdDispatchIndirect",
            CmdCall::CopyBuffer { .. } => "vkCmdCopyBuffer",
            CmdCall::CopyImage { .. } => "vkCmdCopyImage",
            CmdCall::BlitImage { .. } => "vkCmdBlitImage",
            CmdCall::CopyBufferToImage { .. } => "vkCmdCopyBufferToImage",
            CmdCall::CopyImageToBuffer { .. } => "vkCmdCopyImageToBuffer",
            CmdCall::UpdateBuffer { .. } => "vkCmdUpdateBuffer",
            CmdCall::FillBuffer { .. } => "vkCmdFillBuffer",
            CmdCall::ClearColorImage { .. } => "vkCmdClearColorImage",
            CmdCall::ClearDepthStencilImage { .. } => "vkCmdClearDepthStencilImage",
            CmdCall::ClearAttachments { .. } => "vkCmdClearAttachments",
            CmdCall::ResolveImage { .. } => "vkCmdResolveImage",
            CmdCall::SetEvent { .. } => "vkCmdSetEvent",
            CmdCall::ResetEvent { .. } => "vkCmdResetEvent",
            CmdCall::WaitEvents { .. } => "vkCmdWaitEvents",
            CmdCall::PipelineBarrier { .. } => "vkCmdPipelineBarrier",
            CmdCall::BeginQuery { .. } => "vkCmdBeginQuery",
            CmdCall::EndQuery { .. } => "vkCmdEndQuery",
            CmdCall::ResetQueryPool { .. } => "vkCmdResetQueryPool",
            CmdCall::WriteTimestamp { .. } => "vkCmdWriteTimestamp",
            CmdCall::CopyQueryPoolResults { .. } => "vkCmdCopyQueryPoolResults",
            CmdCall::BeginRenderPass { .. } => "vkCmdBeginRenderPass",
            CmdCall::NextSubpass { .. } => "vkCmdNextSubpass",
            CmdCall::EndRenderPass => "vkCmdEndRenderPass",
            CmdCall::ExecuteCommands { .. } => "vkCmdExecuteCommands",
            CmdCall::DebugMarkerBegin { .. } => "vkCmdDebugMarkerBeginEXT",
            CmdCall::DebugMarkerEnd => "vkCmdDebugMarkerEndEXT",
            CmdCall::DebugMarkerInsert { .. } => "vkCmdDebugMarkerInsertEXT",
        }
    }
}

/// One Vulkan API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApiCommand {
    // ── Instance ────────────────────────────────────────────
    CreateInstance {
        create_info: Ptr,
        allocator: Ptr,
        instance_out: Ptr,
        instance: VkInstance,
    },
    EnumeratePhysicalDevices {
        instance: VkInstance,
        count: Ptr,
        physical_devices_out: Ptr,
        physical_devices: Vec<VkPhysicalDevice>,
    },
    GetPhysicalDeviceProperties {
        physical_device: VkPhysicalDevice,
        properties_out: Ptr,
    },
    GetPhysicalDeviceMemoryProperties {
        physical_device: VkPhysicalDevice,
        properties_out: Ptr,
    },
    GetPhysicalDeviceQueueFamilyProperties {
        physical_device: VkPhysicalDevice,
        count: Ptr,
        properties_out: Ptr,
    },
    CreateSurface {
        platform: SurfacePlatform,
        instance: VkInstance,
        create_info: Ptr,
        allocator: Ptr,
        surface_out: Ptr,
        surface: VkSurface,
    },

    // ── Device ──────────────────────────────────────────────
    CreateDevice {
        physical_device: VkPhysicalDevice,
        create_info: Ptr,
        allocator: Ptr,
        device_out: Ptr,
        device: VkDevice,
    },
    GetDeviceQueue {
        device: VkDevice,
        queue_family_index: u32,
        queue_index: u32,
        queue_out: Ptr,
        queue: VkQueue,
    },
    CreateSwapchain {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        swapchain_out: Ptr,
        swapchain: VkSwapchain,
    },
    GetSwapchainImages {
        device: VkDevice,
        swapchain: VkSwapchain,
        count: Ptr,
        images_out: Ptr,
        images: Vec<VkImage>,
    },

    // ── Memory ──────────────────────────────────────────────
    AllocateMemory {
        device: VkDevice,
        allocate_info: Ptr,
        allocator: Ptr,
        memory_out: Ptr,
        memory: VkDeviceMemory,
    },
    FreeMemory {
        device: VkDevice,
        memory: VkDeviceMemory,
        allocator: Ptr,
    },
    MapMemory {
        device: VkDevice,
        memory: VkDeviceMemory,
        offset: u64,
        size: u64,
        flags: u32,
        data_out: Ptr,
        /// Replay address the mapping is placed at.
        mapped_location: Ptr,
    },
    UnmapMemory {
        device: VkDevice,
        memory: VkDeviceMemory,
    },
    FlushMappedMemoryRanges {
        device: VkDevice,
        range_count: u32,
        ranges: Ptr,
    },

    // ── Buffers / images ────────────────────────────────────
    CreateBuffer {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        buffer_out: Ptr,
        buffer: VkBuffer,
    },
    DestroyBuffer {
        device: VkDevice,
        buffer: VkBuffer,
        allocator: Ptr,
    },
    GetBufferMemoryRequirements {
        device: VkDevice,
        buffer: VkBuffer,
        requirements_out: Ptr,
    },
    BindBufferMemory {
        device: VkDevice,
        buffer: VkBuffer,
        memory: VkDeviceMemory,
        offset: u64,
    },
    CreateImage {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        image_out: Ptr,
        image: VkImage,
    },
    DestroyImage {
        device: VkDevice,
        image: VkImage,
        allocator: Ptr,
    },
    GetImageMemoryRequirements {
        device: VkDevice,
        image: VkImage,
        requirements_out: Ptr,
    },
    GetImageSparseMemoryRequirements {
        device: VkDevice,
        image: VkImage,
        count: Ptr,
        requirements_out: Ptr,
    },
    BindImageMemory {
        device: VkDevice,
        image: VkImage,
        memory: VkDeviceMemory,
        offset: u64,
    },
    QueueBindSparse {
        queue: VkQueue,
        bind_info_count: u32,
        bind_info: Ptr,
        fence: VkFence,
    },
    CreateImageView {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        view_out: Ptr,
        view: VkImageView,
    },
    CreateBufferView {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        view_out: Ptr,
        view: VkBufferView,
    },

    // ── Samplers / synchronization ──────────────────────────
    CreateSamplerYcbcrConversion {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        conversion_out: Ptr,
        conversion: VkSamplerYcbcrConversion,
    },
    CreateSampler {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        sampler_out: Ptr,
        sampler: VkSampler,
    },
    CreateFence {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        fence_out: Ptr,
        fence: VkFence,
    },
    CreateSemaphore {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        semaphore_out: Ptr,
        semaphore: VkSemaphore,
    },
    CreateEvent {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        event_out: Ptr,
        event: VkEvent,
    },
    SetEvent {
        device: VkDevice,
        event: VkEvent,
    },

    // ── Queue ───────────────────────────────────────────────
    QueueSubmit {
        queue: VkQueue,
        submit_count: u32,
        submits: Ptr,
        fence: VkFence,
    },
    QueueWaitIdle {
        queue: VkQueue,
    },

    // ── Command pools / buffers ─────────────────────────────
    CreateCommandPool {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        command_pool_out: Ptr,
        command_pool: VkCommandPool,
    },
    DestroyCommandPool {
        device: VkDevice,
        command_pool: VkCommandPool,
        allocator: Ptr,
    },
    AllocateCommandBuffers {
        device: VkDevice,
        allocate_info: Ptr,
        command_buffers_out: Ptr,
        command_buffers: Vec<VkCommandBuffer>,
    },
    BeginCommandBuffer {
        command_buffer: VkCommandBuffer,
        begin_info: Ptr,
    },
    EndCommandBuffer {
        command_buffer: VkCommandBuffer,
    },
    ResetCommandBuffer {
        command_buffer: VkCommandBuffer,
        flags: u32,
    },
    Cmd {
        command_buffer: VkCommandBuffer,
        call: CmdCall,
    },

    // ── Pipelines ───────────────────────────────────────────
    CreatePipelineCache {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        pipeline_cache_out: Ptr,
        pipeline_cache: VkPipelineCache,
    },
    CreateDescriptorSetLayout {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        set_layout_out: Ptr,
        set_layout: VkDescriptorSetLayout,
    },
    DestroyDescriptorSetLayout {
        device: VkDevice,
        set_layout: VkDescriptorSetLayout,
        allocator: Ptr,
    },
    CreateDescriptorUpdateTemplate {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        template_out: Ptr,
        template: VkDescriptorUpdateTemplate,
    },
    CreatePipelineLayout {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        pipeline_layout_out: Ptr,
        pipeline_layout: VkPipelineLayout,
    },
    DestroyPipelineLayout {
        device: VkDevice,
        pipeline_layout: VkPipelineLayout,
        allocator: Ptr,
    },
    CreateRenderPass {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        render_pass_out: Ptr,
        render_pass: VkRenderPass,
    },
    DestroyRenderPass {
        device: VkDevice,
        render_pass: VkRenderPass,
        allocator: Ptr,
    },
    CreateShaderModule {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        shader_module_out: Ptr,
        shader_module: VkShaderModule,
    },
    DestroyShaderModule {
        device: VkDevice,
        shader_module: VkShaderModule,
        allocator: Ptr,
    },
    CreateComputePipelines {
        device: VkDevice,
        pipeline_cache: VkPipelineCache,
        create_info_count: u32,
        create_infos: Ptr,
        allocator: Ptr,
        pipelines_out: Ptr,
        pipelines: Vec<VkPipeline>,
    },
    CreateGraphicsPipelines {
        device: VkDevice,
        pipeline_cache: VkPipelineCache,
        create_info_count: u32,
        create_infos: Ptr,
        allocator: Ptr,
        pipelines_out: Ptr,
        pipelines: Vec<VkPipeline>,
    },

    // ── Descriptors / framebuffers / queries ────────────────
    CreateDescriptorPool {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        descriptor_pool_out: Ptr,
        descriptor_pool: VkDescriptorPool,
    },
    AllocateDescriptorSets {
        device: VkDevice,
        allocate_info: Ptr,
        descriptor_sets_out: Ptr,
        descriptor_sets: Vec<VkDescriptorSet>,
    },
    UpdateDescriptorSets {
        device: VkDevice,
        write_count: u32,
        writes: Ptr,
        copy_count: u32,
        copies: Ptr,
    },
    CreateFramebuffer {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        framebuffer_out: Ptr,
        framebuffer: VkFramebuffer,
    },
    CreateQueryPool {
        device: VkDevice,
        create_info: Ptr,
        allocator: Ptr,
        query_pool_out: Ptr,
        query_pool: VkQueryPool,
    },

    /// A trace command the rebuilder forwards without interpreting.
    Other { name: String },
}

impl ApiCommand {
    pub fn name(&self) -> &str {
        match self {
            ApiCommand::CreateInstance { .. } => "vkCreateInstance",
            ApiCommand::EnumeratePhysicalDevices { .. } => "vkEnumeratePhysicalDevices",
            ApiCommand::GetPhysicalDeviceProperties { .. } => "vkGetPhysicalDeviceProperties",
            ApiCommand::GetPhysicalDeviceMemoryProperties { .. } => {
                "vkGetPhysicalDeviceMemoryProperties"
            }
            ApiCommand::GetPhysicalDeviceQueueFamilyProperties { .. } => {
                "vkGetPhysicalDeviceQueueFamilyProperties"
            }
            ApiCommand::CreateSurface { platform, .. } => match platform {
                SurfacePlatform::Xlib => "vkCreateXlibSurfaceKHR",
                SurfacePlatform::Xcb => "vkCreateXcbSurfaceKHR",
                SurfacePlatform::Wayland => "vkCreateWaylandSurfaceKHR",
                SurfacePlatform::Win32 => "vkCreateWin32SurfaceKHR",
                SurfacePlatform::Android => "vkCreateAndroidSurfaceKHR",
                SurfacePlatform::MacOs => "vkCreateMacOSSurfaceMVK",
                SurfacePlatform::Headless => "vkCreateHeadlessSurfaceEXT",
            },
            ApiCommand::CreateDevice { .. } => "vkCreateDevice",
            ApiCommand::GetDeviceQueue { .. } => "vkGetDeviceQueue",
            ApiCommand::CreateSwapchain { .. } => "vkCreateSwapchainKHR",
            ApiCommand::GetSwapchainImages { .. } => "vkGetSwapchainImagesKHR",
            ApiCommand::AllocateMemory { .. } => "vkAllocateMemory",
            ApiCommand::FreeMemory { .. } => "vkFreeMemory",
            ApiCommand::MapMemory { .. } => "vkMapMemory",
            ApiCommand::UnmapMemory { .. } => "vkUnmapMemory",
            ApiCommand::FlushMappedMemoryRanges { .. } => "vkFlushMappedMemoryRanges",
            ApiCommand::CreateBuffer { .. } => "vkCreateBuffer",
            ApiCommand::DestroyBuffer { .. } => "vkDestroyBuffer",
            ApiCommand::GetBufferMemoryRequirements { .. } => "vkGetBufferMemoryRequirements",
            ApiCommand::BindBufferMemory { .. } => "vkBindBufferMemory",
            ApiCommand::CreateImage { .. } => "vkCreateImage",
            ApiCommand::DestroyImage { .. } => "vkDestroyImage",
            ApiCommand::GetImageMemoryRequirements { .. } => "vkGetImageMemoryRequirements",
            ApiCommand::GetImageSparseMemoryRequirements { .. } => {
                "vkGetImageSparseMemoryRequirements"
            }
            ApiCommand::BindImageMemory { .. } => "vkBindImageMemory",
            ApiCommand::QueueBindSparse { .. } => "vkQueueBindSparse",
            ApiCommand::CreateImageView { .. } => "vkCreateImageView",
            ApiCommand::CreateBufferView { .. } => "vkCreateBufferView",
            ApiCommand::CreateSamplerYcbcrConversion { .. } => "vkCreateSamplerYcbcrConversion",
            ApiCommand::CreateSampler { .. } => "vkCreateSampler",
            ApiCommand::CreateFence { .. } => "vkCreateFence",
            ApiCommand::CreateSemaphore { .. } => "vkCreateSemaphore",
            ApiCommand::CreateEvent { .. } => "vkCreateEvent",
            ApiCommand::SetEvent { .. } => "vkSetEvent",
            ApiCommand::QueueSubmit { .. } => "vkQueueSubmit",
            ApiCommand::QueueWaitIdle { .. } => "vkQueueWaitIdle",
            ApiCommand::CreateCommandPool { .. } => "vkCreateCommandPool",
            ApiCommand::DestroyCommandPool { .. } => "vkDestroyCommandPool",
            ApiCommand::AllocateCommandBuffers { .. } => "vkAllocateCommandBuffers",
            ApiCommand::BeginCommandBuffer { .. } => "vkBeginCommandBuffer",
            ApiCommand::EndCommandBuffer { .. } => "vkEndCommandBuffer",
            ApiCommand::ResetCommandBuffer { .. } => "vkResetCommandBuffer",
            ApiCommand::Cmd { call, .. } => call.name(),
            ApiCommand::CreatePipelineCache { .. } => "vkCreatePipelineCache",
            ApiCommand::CreateDescriptorSetLayout { .. } => "vkCreateDescriptorSetLayout",
            ApiCommand::DestroyDescriptorSetLayout { .. } => "vkDestroyDescriptorSetLayout",
            ApiCommand::CreateDescriptorUpdateTemplate { .. } => {
                "vkCreateDescriptorUpdateTemplate"
            }
            ApiCommand::CreatePipelineLayout { .. } => "vkCreatePipelineLayout",
            ApiCommand::DestroyPipelineLayout { .. } => "vkDestroyPipelineLayout",
            ApiCommand::CreateRenderPass { .. } => "vkCreateRenderPass",
            ApiCommand::DestroyRenderPass { .. } => "vkDestroyRenderPass",
            ApiCommand::CreateShaderModule { .. } => "vkCreateShaderModule",
            ApiCommand::DestroyShaderModule { .. } => "vkDestroyShaderModule",
            ApiCommand::CreateComputePipelines { .. } => "vkCreateComputePipelines",
            ApiCommand::CreateGraphicsPipelines { .. } => "vkCreateGraphicsPipelines",
            ApiCommand::CreateDescriptorPool { .. } => "vkCreateDescriptorPool",
            ApiCommand::AllocateDescriptorSets { .. } => "vkAllocateDescriptorSets",
            ApiCommand::UpdateDescriptorSets { .. } => "vkUpdateDescriptorSets",
            ApiCommand::CreateFramebuffer { .. } => "vkCreateFramebuffer",
            ApiCommand::CreateQueryPool { .. } => "vkCreateQueryPool",
            ApiCommand::Other { name } => name,
        }
    }

    /// Handles this call brings into existence.
    pub fn created_handles(&self) -> Vec<AnyHandle> {
        match self {
            ApiCommand::CreateInstance { instance, .. } => vec![instance.any()],
            ApiCommand::EnumeratePhysicalDevices {
                physical_devices, ..
            } => physical_devices.iter().map(|h| h.any()).collect(),
            ApiCommand::CreateSurface { surface, .. } => vec![surface.any()],
            ApiCommand::CreateDevice { device, .. } => vec![device.any()],
            ApiCommand::GetDeviceQueue { queue, .. } => vec![queue.any()],
            ApiCommand::CreateSwapchain { swapchain, .. } => vec![swapchain.any()],
            ApiCommand::GetSwapchainImages { images, .. } => {
                images.iter().map(|h| h.any()).collect()
            }
            ApiCommand::AllocateMemory { memory, .. } => vec![memory.any()],
            ApiCommand::CreateBuffer { buffer, .. } => vec![buffer.any()],
            ApiCommand::CreateImage { image, .. } => vec![image.any()],
            ApiCommand::CreateImageView { view, .. } => vec![view.any()],
            ApiCommand::CreateBufferView { view, .. } => vec![view.any()],
            ApiCommand::CreateSamplerYcbcrConversion { conversion, .. } => vec![conversion.any()],
            ApiCommand::CreateSampler { sampler, .. } => vec![sampler.any()],
            ApiCommand::CreateFence { fence, .. } => vec![fence.any()],
            ApiCommand::CreateSemaphore { semaphore, .. } => vec![semaphore.any()],
            ApiCommand::CreateEvent { event, .. } => vec![event.any()],
            ApiCommand::CreateCommandPool { command_pool, .. } => vec![command_pool.any()],
            ApiCommand::AllocateCommandBuffers {
                command_buffers, ..
            } => command_buffers.iter().map(|h| h.any()).collect(),
            ApiCommand::CreatePipelineCache { pipeline_cache, .. } => vec![pipeline_cache.any()],
            ApiCommand::CreateDescriptorSetLayout { set_layout, .. } => vec![set_layout.any()],
            ApiCommand::CreateDescriptorUpdateTemplate { template, .. } => vec![template.any()],
            ApiCommand::CreatePipelineLayout {
                pipeline_layout, ..
            } => vec![pipeline_layout.any()],
            ApiCommand::CreateRenderPass { render_pass, .. } => vec![render_pass.any()],
            ApiCommand::CreateShaderModule { shader_module, .. } => vec![shader_module.any()],
            ApiCommand::CreateComputePipelines { pipelines, .. }
            | ApiCommand::CreateGraphicsPipelines { pipelines, .. } => {
                pipelines.iter().map(|h| h.any()).collect()
            }
            ApiCommand::CreateDescriptorPool {
                descriptor_pool, ..
            } => vec![descriptor_pool.any()],
            ApiCommand::AllocateDescriptorSets {
                descriptor_sets, ..
            } => descriptor_sets.iter().map(|h| h.any()).collect(),
            ApiCommand::CreateFramebuffer { framebuffer, .. } => vec![framebuffer.any()],
            ApiCommand::CreateQueryPool { query_pool, .. } => vec![query_pool.any()],
            _ => Vec::new(),
        }
    }

    /// Handles this call destroys.
    pub fn destroyed_handles(&self) -> Vec<AnyHandle> {
        match self {
            ApiCommand::FreeMemory { memory, .. } => vec![memory.any()],
            ApiCommand::DestroyBuffer { buffer, .. } => vec![buffer.any()],
            ApiCommand::DestroyImage { image, .. } => vec![image.any()],
            ApiCommand::DestroyCommandPool { command_pool, .. } => vec![command_pool.any()],
            ApiCommand::DestroyDescriptorSetLayout { set_layout, .. } => vec![set_layout.any()],
            ApiCommand::DestroyPipelineLayout {
                pipeline_layout, ..
            } => vec![pipeline_layout.any()],
            ApiCommand::DestroyRenderPass { render_pass, .. } => vec![render_pass.any()],
            ApiCommand::DestroyShaderModule { shader_module, .. } => vec![shader_module.any()],
            _ => Vec::new(),
        }
    }
}
