//! Little-endian, 64-bit-pointer encodings of the Vulkan structs the rebuilder
//! places into replay memory.
//!
//! Every struct mirrors the C layout of its Vulkan counterpart with the
//! implicit padding spelled out, so the byte image of a value is exactly what
//! a 64-bit replay driver reads. Pointers and handles are `u64` addresses and
//! ids in the replay address space.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Raw `VkStructureType` value.
pub fn s_type(st: vk::StructureType) -> i32 {
    st.as_raw()
}

/// NUL-terminated copy of `s`.
pub fn cstr_bytes(s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend(s.bytes().filter(|&b| b != 0));
    bytes.push(0);
    bytes
}

// ── Instance / device ───────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub p_application_name: u64,
    pub application_version: u32,
    pub _p1: u32,
    pub p_engine_name: u64,
    pub engine_version: u32,
    pub api_version: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct InstanceCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub p_application_info: u64,
    pub enabled_layer_count: u32,
    pub _p2: u32,
    pub pp_enabled_layer_names: u64,
    pub enabled_extension_count: u32,
    pub _p3: u32,
    pub pp_enabled_extension_names: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DeviceQueueCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub queue_family_index: u32,
    pub queue_count: u32,
    pub _p1: u32,
    pub p_queue_priorities: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DeviceCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub queue_create_info_count: u32,
    pub p_queue_create_infos: u64,
    pub enabled_layer_count: u32,
    pub _p1: u32,
    pub pp_enabled_layer_names: u64,
    pub enabled_extension_count: u32,
    pub _p2: u32,
    pub pp_enabled_extension_names: u64,
    pub p_enabled_features: u64,
}

/// `sizeof(VkPhysicalDeviceProperties)`.
pub const PHYSICAL_DEVICE_PROPERTIES_SIZE: u64 = 824;
/// `sizeof(VkPhysicalDeviceMemoryProperties)`.
pub const PHYSICAL_DEVICE_MEMORY_PROPERTIES_SIZE: u64 = 520;
/// `sizeof(VkQueueFamilyProperties)`.
pub const QUEUE_FAMILY_PROPERTIES_SIZE: u64 = 24;
/// `sizeof(VkMemoryRequirements)`.
pub const MEMORY_REQUIREMENTS_SIZE: u64 = 24;
/// `sizeof(VkSparseImageMemoryRequirements)`.
pub const SPARSE_IMAGE_MEMORY_REQUIREMENTS_SIZE: u64 = 48;
/// Number of `VkBool32` members in `VkPhysicalDeviceFeatures`.
pub const PHYSICAL_DEVICE_FEATURE_COUNT: usize = 55;

/// Encode `VkPhysicalDeviceFeatures` from its member list, padding missing
/// members with `VK_FALSE`.
pub fn physical_device_features(bits: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PHYSICAL_DEVICE_FEATURE_COUNT * 4);
    for i in 0..PHYSICAL_DEVICE_FEATURE_COUNT {
        let v = bits.get(i).copied().unwrap_or(0);
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode a feature struct of the form `{sType, pNext, VkBool32...}` (every
/// `VkPhysicalDevice*Features` extension struct has this shape).
pub fn feature_struct(s_type: i32, p_next: u64, members: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + members.len() * 4 + 4);
    out.extend_from_slice(&s_type.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&p_next.to_le_bytes());
    for m in members {
        out.extend_from_slice(&m.to_le_bytes());
    }
    while out.len() % 8 != 0 {
        out.push(0);
    }
    out
}

// ── Surfaces / swapchain ────────────────────────────────────

/// Xlib, Xcb, Wayland and Win32 surface create infos: two native handles.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct NativeSurfaceCreateInfo2 {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub native0: u64,
    pub native1: u64,
}

/// Android and macOS surface create infos: one native handle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct NativeSurfaceCreateInfo1 {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub native0: u64,
}

/// Any create info that is only `{sType, pNext, flags}` (headless surface,
/// fence, semaphore, event).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct FlagsOnlyCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SwapchainCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub surface: u64,
    pub min_image_count: u32,
    pub image_format: u32,
    pub image_color_space: u32,
    pub image_extent: [u32; 2],
    pub image_array_layers: u32,
    pub image_usage: u32,
    pub image_sharing_mode: u32,
    pub queue_family_index_count: u32,
    pub _p2: u32,
    pub p_queue_family_indices: u64,
    pub pre_transform: u32,
    pub composite_alpha: u32,
    pub present_mode: u32,
    pub clipped: u32,
    pub old_swapchain: u64,
}

// ── Memory / buffers / images ───────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MemoryAllocateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub allocation_size: u64,
    pub memory_type_index: u32,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MemoryDedicatedAllocateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub image: u64,
    pub buffer: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MappedMemoryRange {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub memory: u64,
    pub offset: u64,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub size: u64,
    pub usage: u32,
    pub sharing_mode: u32,
    pub queue_family_index_count: u32,
    pub _p2: u32,
    pub p_queue_family_indices: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub image_type: u32,
    pub format: u32,
    pub extent: [u32; 3],
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub tiling: u32,
    pub usage: u32,
    pub sharing_mode: u32,
    pub queue_family_index_count: u32,
    pub _p1: u32,
    pub p_queue_family_indices: u64,
    pub initial_layout: u32,
    pub _p2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageSubresourceRange {
    pub aspect_mask: u32,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageSubresourceLayers {
    pub aspect_mask: u32,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ComponentMapping {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageViewCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub image: u64,
    pub view_type: u32,
    pub format: u32,
    pub components: ComponentMapping,
    pub subresource_range: ImageSubresourceRange,
    pub _p2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferViewCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub buffer: u64,
    pub format: u32,
    pub _p2: u32,
    pub offset: u64,
    pub range: u64,
}

// ── Sparse binding ──────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BindSparseInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub wait_semaphore_count: u32,
    pub _p1: u32,
    pub p_wait_semaphores: u64,
    pub buffer_bind_count: u32,
    pub _p2: u32,
    pub p_buffer_binds: u64,
    pub image_opaque_bind_count: u32,
    pub _p3: u32,
    pub p_image_opaque_binds: u64,
    pub image_bind_count: u32,
    pub _p4: u32,
    pub p_image_binds: u64,
    pub signal_semaphore_count: u32,
    pub _p5: u32,
    pub p_signal_semaphores: u64,
}

/// `VkSparseBufferMemoryBindInfo`, `VkSparseImageOpaqueMemoryBindInfo` and
/// `VkSparseImageMemoryBindInfo` share this layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SparseResourceBindInfo {
    pub resource: u64,
    pub bind_count: u32,
    pub _p0: u32,
    pub p_binds: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SparseMemoryBind {
    pub resource_offset: u64,
    pub size: u64,
    pub memory: u64,
    pub memory_offset: u64,
    pub flags: u32,
    pub _p0: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SparseImageMemoryBind {
    pub aspect_mask: u32,
    pub mip_level: u32,
    pub array_layer: u32,
    pub offset: [i32; 3],
    pub extent: [u32; 3],
    pub _p0: u32,
    pub memory: u64,
    pub memory_offset: u64,
    pub flags: u32,
    pub _p1: u32,
}

// ── Samplers / sync objects ─────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SamplerCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub mipmap_mode: u32,
    pub address_mode_u: u32,
    pub address_mode_v: u32,
    pub address_mode_w: u32,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: u32,
    pub max_anisotropy: f32,
    pub compare_enable: u32,
    pub compare_op: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: u32,
    pub unnormalized_coordinates: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SamplerYcbcrConversionCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub format: u32,
    pub ycbcr_model: u32,
    pub ycbcr_range: u32,
    pub components: ComponentMapping,
    pub x_chroma_offset: u32,
    pub y_chroma_offset: u32,
    pub chroma_filter: u32,
    pub force_explicit_reconstruction: u32,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SamplerYcbcrConversionInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub conversion: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SubmitInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub wait_semaphore_count: u32,
    pub _p1: u32,
    pub p_wait_semaphores: u64,
    pub p_wait_dst_stage_mask: u64,
    pub command_buffer_count: u32,
    pub _p2: u32,
    pub p_command_buffers: u64,
    pub signal_semaphore_count: u32,
    pub _p3: u32,
    pub p_signal_semaphores: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct QueryPoolCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub query_type: u32,
    pub query_count: u32,
    pub pipeline_statistics: u32,
}

// ── Command pools / buffers ─────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CommandPoolCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub queue_family_index: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CommandBufferAllocateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub command_pool: u64,
    pub level: u32,
    pub command_buffer_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CommandBufferInheritanceInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub render_pass: u64,
    pub subpass: u32,
    pub _p1: u32,
    pub framebuffer: u64,
    pub occlusion_query_enable: u32,
    pub query_flags: u32,
    pub pipeline_statistics: u32,
    pub _p2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct CommandBufferBeginInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub p_inheritance_info: u64,
}

// ── Pipelines ───────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineCacheCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub initial_data_size: u64,
    pub p_initial_data: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ShaderModuleCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub code_size: u64,
    pub p_code: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: u32,
    pub descriptor_count: u32,
    pub stage_flags: u32,
    pub p_immutable_samplers: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorSetLayoutCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub binding_count: u32,
    pub p_bindings: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorUpdateTemplateEntry {
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_type: u32,
    pub offset: u64,
    pub stride: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorUpdateTemplateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub descriptor_update_entry_count: u32,
    pub p_descriptor_update_entries: u64,
    pub template_type: u32,
    pub _p1: u32,
    pub descriptor_set_layout: u64,
    pub pipeline_bind_point: u32,
    pub _p2: u32,
    pub pipeline_layout: u64,
    pub set: u32,
    pub _p3: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PushConstantRange {
    pub stage_flags: u32,
    pub offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineLayoutCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub set_layout_count: u32,
    pub p_set_layouts: u64,
    pub push_constant_range_count: u32,
    pub _p1: u32,
    pub p_push_constant_ranges: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct AttachmentDescription {
    pub flags: u32,
    pub format: u32,
    pub samples: u32,
    pub load_op: u32,
    pub store_op: u32,
    pub stencil_load_op: u32,
    pub stencil_store_op: u32,
    pub initial_layout: u32,
    pub final_layout: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub attachment: u32,
    pub layout: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SubpassDescription {
    pub flags: u32,
    pub pipeline_bind_point: u32,
    pub input_attachment_count: u32,
    pub _p0: u32,
    pub p_input_attachments: u64,
    pub color_attachment_count: u32,
    pub _p1: u32,
    pub p_color_attachments: u64,
    pub p_resolve_attachments: u64,
    pub p_depth_stencil_attachment: u64,
    pub preserve_attachment_count: u32,
    pub _p2: u32,
    pub p_preserve_attachments: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: u32,
    pub dst_stage_mask: u32,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub dependency_flags: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct RenderPassCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub attachment_count: u32,
    pub p_attachments: u64,
    pub subpass_count: u32,
    pub _p1: u32,
    pub p_subpasses: u64,
    pub dependency_count: u32,
    pub _p2: u32,
    pub p_dependencies: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SpecializationMapEntry {
    pub constant_id: u32,
    pub offset: u32,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SpecializationInfo {
    pub map_entry_count: u32,
    pub _p0: u32,
    pub p_map_entries: u64,
    pub data_size: u64,
    pub p_data: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineShaderStageCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub stage: u32,
    pub module: u64,
    pub p_name: u64,
    pub p_specialization_info: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ComputePipelineCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub stage: PipelineShaderStageCreateInfo,
    pub layout: u64,
    pub base_pipeline_handle: u64,
    pub base_pipeline_index: i32,
    pub _p2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct VertexInputBindingDescription {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct VertexInputAttributeDescription {
    pub location: u32,
    pub binding: u32,
    pub format: u32,
    pub offset: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineVertexInputStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub vertex_binding_description_count: u32,
    pub p_vertex_binding_descriptions: u64,
    pub vertex_attribute_description_count: u32,
    pub _p1: u32,
    pub p_vertex_attribute_descriptions: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineInputAssemblyStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub topology: u32,
    pub primitive_restart_enable: u32,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineTessellationStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub patch_control_points: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Rect2D {
    pub offset: [i32; 2],
    pub extent: [u32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineViewportStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub viewport_count: u32,
    pub p_viewports: u64,
    pub scissor_count: u32,
    pub _p1: u32,
    pub p_scissors: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineRasterizationStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub depth_clamp_enable: u32,
    pub rasterizer_discard_enable: u32,
    pub polygon_mode: u32,
    pub cull_mode: u32,
    pub front_face: u32,
    pub depth_bias_enable: u32,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub line_width: f32,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineMultisampleStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub rasterization_samples: u32,
    pub sample_shading_enable: u32,
    pub min_sample_shading: f32,
    pub p_sample_mask: u64,
    pub alpha_to_coverage_enable: u32,
    pub alpha_to_one_enable: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct StencilOpState {
    pub fail_op: u32,
    pub pass_op: u32,
    pub depth_fail_op: u32,
    pub compare_op: u32,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineDepthStencilStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub depth_test_enable: u32,
    pub depth_write_enable: u32,
    pub depth_compare_op: u32,
    pub depth_bounds_test_enable: u32,
    pub stencil_test_enable: u32,
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineColorBlendAttachmentState {
    pub blend_enable: u32,
    pub src_color_blend_factor: u32,
    pub dst_color_blend_factor: u32,
    pub color_blend_op: u32,
    pub src_alpha_blend_factor: u32,
    pub dst_alpha_blend_factor: u32,
    pub alpha_blend_op: u32,
    pub color_write_mask: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineColorBlendStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub logic_op_enable: u32,
    pub logic_op: u32,
    pub attachment_count: u32,
    pub p_attachments: u64,
    pub blend_constants: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct PipelineDynamicStateCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub dynamic_state_count: u32,
    pub p_dynamic_states: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct GraphicsPipelineCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub stage_count: u32,
    pub p_stages: u64,
    pub p_vertex_input_state: u64,
    pub p_input_assembly_state: u64,
    pub p_tessellation_state: u64,
    pub p_viewport_state: u64,
    pub p_rasterization_state: u64,
    pub p_multisample_state: u64,
    pub p_depth_stencil_state: u64,
    pub p_color_blend_state: u64,
    pub p_dynamic_state: u64,
    pub layout: u64,
    pub render_pass: u64,
    pub subpass: u32,
    pub _p1: u32,
    pub base_pipeline_handle: u64,
    pub base_pipeline_index: i32,
    pub _p2: u32,
}

// ── Descriptors ─────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorPoolSize {
    pub descriptor_type: u32,
    pub descriptor_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorPoolCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub max_sets: u32,
    pub pool_size_count: u32,
    pub _p1: u32,
    pub p_pool_sizes: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorSetAllocateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub descriptor_pool: u64,
    pub descriptor_set_count: u32,
    pub _p1: u32,
    pub p_set_layouts: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorImageInfo {
    pub sampler: u64,
    pub image_view: u64,
    pub image_layout: u32,
    pub _p0: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DescriptorBufferInfo {
    pub buffer: u64,
    pub offset: u64,
    pub range: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct WriteDescriptorSet {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub dst_set: u64,
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_type: u32,
    pub p_image_info: u64,
    pub p_buffer_info: u64,
    pub p_texel_buffer_view: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct FramebufferCreateInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub flags: u32,
    pub _p1: u32,
    pub render_pass: u64,
    pub attachment_count: u32,
    pub _p2: u32,
    pub p_attachments: u64,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub _p3: u32,
}

// ── Recorded-command payloads ───────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct MemoryBarrier {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferMemoryBarrier {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub buffer: u64,
    pub offset: u64,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageMemoryBarrier {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub old_layout: u32,
    pub new_layout: u32,
    pub src_queue_family_index: u32,
    pub dst_queue_family_index: u32,
    pub image: u64,
    pub subresource_range: ImageSubresourceRange,
    pub _p1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    pub buffer_row_length: u32,
    pub buffer_image_height: u32,
    pub image_subresource: ImageSubresourceLayers,
    pub image_offset: [i32; 3],
    pub image_extent: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageCopy {
    pub src_subresource: ImageSubresourceLayers,
    pub src_offset: [i32; 3],
    pub dst_subresource: ImageSubresourceLayers,
    pub dst_offset: [i32; 3],
    pub extent: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ImageBlit {
    pub src_subresource: ImageSubresourceLayers,
    pub src_offsets: [[i32; 3]; 2],
    pub dst_subresource: ImageSubresourceLayers,
    pub dst_offsets: [[i32; 3]; 2],
}

/// `VkClearValue`: 16 raw bytes interpreted by attachment format.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ClearValue {
    pub raw: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ClearDepthStencilValue {
    pub depth: f32,
    pub stencil: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ClearAttachment {
    pub aspect_mask: u32,
    pub color_attachment: u32,
    pub clear_value: ClearValue,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ClearRect {
    pub rect: Rect2D,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct RenderPassBeginInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub render_pass: u64,
    pub framebuffer: u64,
    pub render_area: Rect2D,
    pub clear_value_count: u32,
    pub _p1: u32,
    pub p_clear_values: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct DebugMarkerMarkerInfo {
    pub s_type: i32,
    pub _p0: u32,
    pub p_next: u64,
    pub p_marker_name: u64,
    pub color: [f32; 4],
}

/// `VkImageResolve` has the same layout as `VkImageCopy`.
pub type ImageResolve = ImageCopy;
