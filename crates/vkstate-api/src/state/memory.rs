use ash::vk;
use serde::{Deserialize, Serialize};

use crate::blob::BlobRef;
use crate::handle::*;
use crate::packed::{ComponentMapping, ImageSubresourceRange};

// ── Device memory ───────────────────────────────────────────

/// The single resource a dedicated allocation was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedicatedTarget {
    Buffer(VkBuffer),
    Image(VkImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedRange {
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMemoryObject {
    pub device: VkDevice,
    pub allocation_size: u64,
    pub memory_type_index: u32,
    pub dedicated: Option<DedicatedTarget>,
    /// Captured contents of the whole allocation.
    pub data: Option<BlobRef>,
    pub mapped: Option<MappedRange>,
}

// ── Binding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    pub memory_type_bits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundMemory {
    pub memory: VkDeviceMemory,
    pub offset: u64,
}

/// An opaque sparse binding (`VkSparseMemoryBind`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseBinding {
    pub resource_offset: u64,
    pub size: u64,
    pub memory: VkDeviceMemory,
    pub memory_offset: u64,
    pub flags: u32,
}

/// A subresource-qualified sparse binding (`VkSparseImageMemoryBind`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseImageBinding {
    pub aspect_mask: u32,
    pub mip_level: u32,
    pub array_layer: u32,
    pub offset: [i32; 3],
    pub extent: [u32; 3],
    pub memory: VkDeviceMemory,
    pub memory_offset: u64,
    pub flags: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseImageRequirements {
    pub aspect_mask: u32,
    pub image_granularity: [u32; 3],
    pub flags: u32,
    pub mip_tail_first_lod: u32,
    pub mip_tail_size: u64,
    pub mip_tail_offset: u64,
    pub mip_tail_stride: u64,
}

/// True when the union of `bindings` covers `[start, end)`.
pub fn sparse_covers(bindings: &[SparseBinding], start: u64, end: u64) -> bool {
    let mut ranges: Vec<(u64, u64)> = bindings
        .iter()
        .filter(|b| !b.memory.is_null())
        .map(|b| (b.resource_offset, b.resource_offset.saturating_add(b.size)))
        .collect();
    ranges.sort_unstable();
    let mut covered = start;
    for (lo, hi) in ranges {
        if covered >= end {
            break;
        }
        if lo > covered {
            return false;
        }
        covered = covered.max(hi);
    }
    covered >= end
}

// ── Buffer ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferInfo {
    pub flags: u32,
    pub size: u64,
    pub usage: u32,
    pub sharing_mode: i32,
    pub queue_family_indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferObject {
    pub device: VkDevice,
    pub info: BufferInfo,
    pub memory: Option<BoundMemory>,
    pub sparse_bindings: Vec<SparseBinding>,
    pub memory_requirements: MemoryRequirements,
    pub last_bound_queue: Option<VkQueue>,
}

impl BufferObject {
    pub fn is_sparse(&self) -> bool {
        vk::BufferCreateFlags::from_raw(self.info.flags).contains(vk::BufferCreateFlags::SPARSE_BINDING)
    }

    pub fn is_residency(&self) -> bool {
        vk::BufferCreateFlags::from_raw(self.info.flags)
            .contains(vk::BufferCreateFlags::SPARSE_RESIDENCY)
    }

    pub fn sparse_fully_bound(&self) -> bool {
        let end = if self.memory_requirements.size > 0 {
            self.memory_requirements.size
        } else {
            self.info.size
        };
        sparse_covers(&self.sparse_bindings, 0, end)
    }
}

// ── Image ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub flags: u32,
    pub image_type: i32,
    pub format: i32,
    pub extent: [u32; 3],
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub tiling: i32,
    pub usage: u32,
    pub sharing_mode: i32,
    pub queue_family_indices: Vec<u32>,
    pub initial_layout: i32,
}

/// Live state of one `(aspect, layer, level)` of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSubresource {
    /// Single aspect bit.
    pub aspect: u32,
    pub layer: u32,
    pub level: u32,
    pub layout: i32,
    pub last_bound_queue: Option<VkQueue>,
    /// Tightly packed texel blocks, laid out as a buffer-to-image copy
    /// source with zero row length and image height.
    pub data: Option<BlobRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageObject {
    pub device: VkDevice,
    pub info: ImageInfo,
    pub is_swapchain_image: bool,
    pub memory: Option<BoundMemory>,
    pub opaque_sparse_bindings: Vec<SparseBinding>,
    pub sparse_image_bindings: Vec<SparseImageBinding>,
    pub memory_requirements: MemoryRequirements,
    pub sparse_requirements: Vec<SparseImageRequirements>,
    pub subresources: Vec<ImageSubresource>,
}

impl ImageObject {
    fn create_flags(&self) -> vk::ImageCreateFlags {
        vk::ImageCreateFlags::from_raw(self.info.flags)
    }

    pub fn is_sparse(&self) -> bool {
        self.create_flags().contains(vk::ImageCreateFlags::SPARSE_BINDING)
    }

    pub fn is_residency(&self) -> bool {
        self.create_flags().contains(vk::ImageCreateFlags::SPARSE_RESIDENCY)
    }

    /// Planes of a multi-planar format are bound separately.
    pub fn is_disjoint(&self) -> bool {
        self.create_flags().contains(vk::ImageCreateFlags::DISJOINT)
    }

    pub fn subresource(&self, aspect: u32, layer: u32, level: u32) -> Option<&ImageSubresource> {
        self.subresources
            .iter()
            .find(|s| s.aspect == aspect && s.layer == layer && s.level == level)
    }

    pub fn sparse_fully_bound(&self) -> bool {
        sparse_covers(&self.opaque_sparse_bindings, 0, self.memory_requirements.size)
    }

    /// Every metadata mip tail the image needs is backed by memory.
    pub fn metadata_mip_tail_bound(&self) -> bool {
        let single = vk::SparseImageFormatFlags::SINGLE_MIPTAIL;
        self.sparse_requirements
            .iter()
            .filter(|r| {
                vk::ImageAspectFlags::from_raw(r.aspect_mask)
                    .contains(vk::ImageAspectFlags::METADATA)
            })
            .all(|r| {
                let layers = if vk::SparseImageFormatFlags::from_raw(r.flags).contains(single) {
                    1
                } else {
                    self.info.array_layers.max(1)
                };
                (0..u64::from(layers)).all(|layer| {
                    let start = r.mip_tail_offset + layer * r.mip_tail_stride;
                    sparse_covers(&self.opaque_sparse_bindings, start, start + r.mip_tail_size)
                })
            })
    }
}

// ── Views ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageViewObject {
    pub device: VkDevice,
    pub image: VkImage,
    pub flags: u32,
    pub view_type: i32,
    pub format: i32,
    pub components: ComponentMapping,
    pub subresource_range: ImageSubresourceRange,
    pub ycbcr_conversion: Option<VkSamplerYcbcrConversion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferViewObject {
    pub device: VkDevice,
    pub buffer: VkBuffer,
    pub format: i32,
    pub offset: u64,
    pub range: u64,
}
