use serde::{Deserialize, Serialize};

use crate::handle::*;
use crate::packed::ComponentMapping;

// ── Samplers ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerYcbcrConversionObject {
    pub device: VkDevice,
    pub format: i32,
    pub ycbcr_model: i32,
    pub ycbcr_range: i32,
    pub components: ComponentMapping,
    pub x_chroma_offset: i32,
    pub y_chroma_offset: i32,
    pub chroma_filter: i32,
    pub force_explicit_reconstruction: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerObject {
    pub device: VkDevice,
    pub flags: u32,
    pub mag_filter: i32,
    pub min_filter: i32,
    pub mipmap_mode: i32,
    pub address_mode_u: i32,
    pub address_mode_v: i32,
    pub address_mode_w: i32,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: bool,
    pub max_anisotropy: f32,
    pub compare_enable: bool,
    pub compare_op: i32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: i32,
    pub unnormalized_coordinates: bool,
    pub ycbcr_conversion: Option<VkSamplerYcbcrConversion>,
}

// ── Synchronization primitives ──────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FenceObject {
    pub device: VkDevice,
    pub signaled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemaphoreObject {
    pub device: VkDevice,
    pub signaled: bool,
    /// Queue the semaphore was last signaled or waited on.
    pub last_queue: Option<VkQueue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventObject {
    pub device: VkDevice,
    pub signaled: bool,
}

// ── Queries ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    #[default]
    Uninitialized,
    /// Reset, not begun.
    Inactive,
    /// Begun, not ended.
    Active,
    /// Has a result.
    Complete,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPoolObject {
    pub device: VkDevice,
    pub flags: u32,
    pub query_type: i32,
    pub query_count: u32,
    pub pipeline_statistics: u32,
    pub status: Vec<QueryStatus>,
    pub last_bound_queue: Option<VkQueue>,
}
