use serde::{Deserialize, Serialize};

use super::{DescriptorSetLayoutObject, Linked};
use crate::blob::BlobRef;
use crate::handle::*;
use crate::packed::{
    AttachmentDescription, AttachmentReference, PipelineColorBlendAttachmentState,
    PushConstantRange, Rect2D, SpecializationMapEntry, StencilOpState, SubpassDependency,
    VertexInputAttributeDescription, VertexInputBindingDescription, Viewport,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineCacheObject {
    pub device: VkDevice,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderModuleObject {
    pub device: VkDevice,
    pub flags: u32,
    /// SPIR-V words.
    pub code: BlobRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineLayoutObject {
    pub device: VkDevice,
    pub flags: u32,
    pub set_layouts: Vec<Linked<VkDescriptorSetLayout, DescriptorSetLayoutObject>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

// ── Render pass ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubpassDescription {
    pub flags: u32,
    pub pipeline_bind_point: i32,
    pub input_attachments: Vec<AttachmentReference>,
    pub color_attachments: Vec<AttachmentReference>,
    /// Empty, or one entry per color attachment.
    pub resolve_attachments: Vec<AttachmentReference>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPassObject {
    pub device: VkDevice,
    pub flags: u32,
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDescription>,
    pub dependencies: Vec<SubpassDependency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramebufferObject {
    pub device: VkDevice,
    pub flags: u32,
    pub render_pass: Linked<VkRenderPass, RenderPassObject>,
    pub attachments: Vec<VkImageView>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

// ── Pipelines ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    pub map_entries: Vec<SpecializationMapEntry>,
    pub data: BlobRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderStage {
    pub flags: u32,
    pub stage: u32,
    pub module: Linked<VkShaderModule, ShaderModuleObject>,
    pub entry_point: String,
    pub specialization: Option<Specialization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputePipelineObject {
    pub device: VkDevice,
    pub flags: u32,
    pub stage: ShaderStage,
    pub layout: Linked<VkPipelineLayout, PipelineLayoutObject>,
    pub base_pipeline: VkPipeline,
    pub pipeline_cache: VkPipelineCache,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexInputState {
    pub bindings: Vec<VertexInputBindingDescription>,
    pub attributes: Vec<VertexInputAttributeDescription>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputAssemblyState {
    pub topology: i32,
    pub primitive_restart_enable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub viewport_count: u32,
    pub scissor_count: u32,
    /// Empty when viewports are dynamic.
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Rect2D>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RasterizationState {
    pub depth_clamp_enable: bool,
    pub rasterizer_discard_enable: bool,
    pub polygon_mode: i32,
    pub cull_mode: u32,
    pub front_face: i32,
    pub depth_bias_enable: bool,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub line_width: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultisampleState {
    pub rasterization_samples: u32,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    pub sample_mask: Vec<u32>,
    pub alpha_to_coverage_enable: bool,
    pub alpha_to_one_enable: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: i32,
    pub depth_bounds_test_enable: bool,
    pub stencil_test_enable: bool,
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorBlendState {
    pub logic_op_enable: bool,
    pub logic_op: i32,
    pub attachments: Vec<PipelineColorBlendAttachmentState>,
    pub blend_constants: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsPipelineObject {
    pub device: VkDevice,
    pub flags: u32,
    pub stages: Vec<ShaderStage>,
    pub vertex_input: Option<VertexInputState>,
    pub input_assembly: Option<InputAssemblyState>,
    pub tessellation_patch_control_points: Option<u32>,
    pub viewport: Option<ViewportState>,
    pub rasterization: RasterizationState,
    pub multisample: Option<MultisampleState>,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_blend: Option<ColorBlendState>,
    pub dynamic_states: Option<Vec<i32>>,
    pub layout: Linked<VkPipelineLayout, PipelineLayoutObject>,
    pub render_pass: Linked<VkRenderPass, RenderPassObject>,
    pub subpass: u32,
    pub base_pipeline: VkPipeline,
    pub pipeline_cache: VkPipelineCache,
}
