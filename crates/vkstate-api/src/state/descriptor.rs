use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Linked, PipelineLayoutObject};
use crate::handle::*;
use crate::packed::DescriptorPoolSize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSetLayoutBinding {
    pub descriptor_type: i32,
    pub descriptor_count: u32,
    pub stage_flags: u32,
    pub immutable_samplers: Vec<VkSampler>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSetLayoutObject {
    pub device: VkDevice,
    pub flags: u32,
    pub bindings: BTreeMap<u32, DescriptorSetLayoutBinding>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTemplateEntry {
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_count: u32,
    pub descriptor_type: i32,
    pub offset: u64,
    pub stride: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorUpdateTemplateObject {
    pub device: VkDevice,
    pub flags: u32,
    pub entries: Vec<UpdateTemplateEntry>,
    pub template_type: i32,
    pub descriptor_set_layout: VkDescriptorSetLayout,
    pub pipeline_bind_point: i32,
    pub pipeline_layout: Option<Linked<VkPipelineLayout, PipelineLayoutObject>>,
    pub set: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorPoolObject {
    pub device: VkDevice,
    pub flags: u32,
    pub max_sets: u32,
    pub pool_sizes: Vec<DescriptorPoolSize>,
}

/// Contents of one descriptor array element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Descriptor {
    #[default]
    Empty,
    Image {
        sampler: VkSampler,
        image_view: VkImageView,
        image_layout: i32,
    },
    Buffer {
        buffer: VkBuffer,
        offset: u64,
        range: u64,
    },
    TexelBuffer(VkBufferView),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSetObject {
    pub device: VkDevice,
    pub pool: VkDescriptorPool,
    pub layout: Linked<VkDescriptorSetLayout, DescriptorSetLayoutObject>,
    /// Binding number to array elements.
    pub bindings: BTreeMap<u32, Vec<Descriptor>>,
}
