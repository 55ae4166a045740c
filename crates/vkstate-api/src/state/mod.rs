//! The captured Vulkan state: one ordered map per handle kind.
//!
//! Records hold creation parameters plus the live mutable state observed at
//! capture time. Enums and flags are raw Vulkan integers; use `ash::vk`
//! wrappers (`vk::Format::from_raw`, …) to interpret them.

mod command_buffer;
mod descriptor;
mod instance;
mod memory;
mod pipeline;
mod sync;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::handle::*;

pub use command_buffer::*;
pub use descriptor::*;
pub use instance::*;
pub use memory::*;
pub use pipeline::*;
pub use sync::*;

/// A handle together with a snapshot of the record it named when a dependent
/// object was created. Lets the rebuilder recreate a destroyed dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linked<H, T> {
    pub handle: H,
    pub object: Arc<T>,
}

impl<H: Handle, T> Linked<H, T> {
    pub fn new(handle: H, object: T) -> Self {
        Self {
            handle,
            object: Arc::new(object),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub instances: BTreeMap<VkInstance, InstanceObject>,
    pub physical_devices: BTreeMap<VkPhysicalDevice, PhysicalDeviceObject>,
    pub surfaces: BTreeMap<VkSurface, SurfaceObject>,
    pub devices: BTreeMap<VkDevice, DeviceObject>,
    pub queues: BTreeMap<VkQueue, QueueObject>,
    pub swapchains: BTreeMap<VkSwapchain, SwapchainObject>,
    pub device_memories: BTreeMap<VkDeviceMemory, DeviceMemoryObject>,
    pub buffers: BTreeMap<VkBuffer, BufferObject>,
    pub images: BTreeMap<VkImage, ImageObject>,
    pub sampler_ycbcr_conversions: BTreeMap<VkSamplerYcbcrConversion, SamplerYcbcrConversionObject>,
    pub samplers: BTreeMap<VkSampler, SamplerObject>,
    pub fences: BTreeMap<VkFence, FenceObject>,
    pub semaphores: BTreeMap<VkSemaphore, SemaphoreObject>,
    pub events: BTreeMap<VkEvent, EventObject>,
    pub command_pools: BTreeMap<VkCommandPool, CommandPoolObject>,
    pub pipeline_caches: BTreeMap<VkPipelineCache, PipelineCacheObject>,
    pub descriptor_set_layouts: BTreeMap<VkDescriptorSetLayout, Arc<DescriptorSetLayoutObject>>,
    pub descriptor_update_templates: BTreeMap<VkDescriptorUpdateTemplate, DescriptorUpdateTemplateObject>,
    pub pipeline_layouts: BTreeMap<VkPipelineLayout, Arc<PipelineLayoutObject>>,
    pub render_passes: BTreeMap<VkRenderPass, Arc<RenderPassObject>>,
    pub shader_modules: BTreeMap<VkShaderModule, Arc<ShaderModuleObject>>,
    pub compute_pipelines: BTreeMap<VkPipeline, ComputePipelineObject>,
    pub graphics_pipelines: BTreeMap<VkPipeline, GraphicsPipelineObject>,
    pub image_views: BTreeMap<VkImageView, ImageViewObject>,
    pub buffer_views: BTreeMap<VkBufferView, BufferViewObject>,
    pub descriptor_pools: BTreeMap<VkDescriptorPool, DescriptorPoolObject>,
    pub descriptor_sets: BTreeMap<VkDescriptorSet, DescriptorSetObject>,
    pub framebuffers: BTreeMap<VkFramebuffer, FramebufferObject>,
    pub query_pools: BTreeMap<VkQueryPool, QueryPoolObject>,
    pub command_buffers: BTreeMap<VkCommandBuffer, CommandBufferObject>,
}

macro_rules! lookup {
    ($($fn_name:ident: $map:ident[$handle:ty] -> $obj:ty,)*) => {
        impl State {
            $(
                pub fn $fn_name(&self, handle: $handle) -> Result<&$obj, ModelError> {
                    self.$map.get(&handle).ok_or(ModelError::MissingObject {
                        kind: <$handle as Handle>::KIND,
                        handle: handle.raw(),
                    })
                }
            )*
        }
    };
}

lookup! {
    instance: instances[VkInstance] -> InstanceObject,
    physical_device: physical_devices[VkPhysicalDevice] -> PhysicalDeviceObject,
    device: devices[VkDevice] -> DeviceObject,
    queue: queues[VkQueue] -> QueueObject,
    device_memory: device_memories[VkDeviceMemory] -> DeviceMemoryObject,
    buffer: buffers[VkBuffer] -> BufferObject,
    image: images[VkImage] -> ImageObject,
    command_pool: command_pools[VkCommandPool] -> CommandPoolObject,
    command_buffer: command_buffers[VkCommandBuffer] -> CommandBufferObject,
    render_pass: render_passes[VkRenderPass] -> Arc<RenderPassObject>,
    query_pool: query_pools[VkQueryPool] -> QueryPoolObject,
}

impl State {
    /// Every handle value present in the state, of any kind.
    pub fn all_handles(&self) -> Vec<AnyHandle> {
        fn keys<H: Handle, T>(out: &mut Vec<AnyHandle>, map: &BTreeMap<H, T>) {
            out.extend(map.keys().map(|h| h.any()));
        }

        let mut out = Vec::new();
        keys(&mut out, &self.instances);
        keys(&mut out, &self.physical_devices);
        keys(&mut out, &self.surfaces);
        keys(&mut out, &self.devices);
        keys(&mut out, &self.queues);
        keys(&mut out, &self.swapchains);
        keys(&mut out, &self.device_memories);
        keys(&mut out, &self.buffers);
        keys(&mut out, &self.images);
        keys(&mut out, &self.sampler_ycbcr_conversions);
        keys(&mut out, &self.samplers);
        keys(&mut out, &self.fences);
        keys(&mut out, &self.semaphores);
        keys(&mut out, &self.events);
        keys(&mut out, &self.command_pools);
        keys(&mut out, &self.pipeline_caches);
        keys(&mut out, &self.descriptor_set_layouts);
        keys(&mut out, &self.descriptor_update_templates);
        keys(&mut out, &self.pipeline_layouts);
        keys(&mut out, &self.render_passes);
        keys(&mut out, &self.shader_modules);
        keys(&mut out, &self.compute_pipelines);
        keys(&mut out, &self.graphics_pipelines);
        keys(&mut out, &self.image_views);
        keys(&mut out, &self.buffer_views);
        keys(&mut out, &self.descriptor_pools);
        keys(&mut out, &self.descriptor_sets);
        keys(&mut out, &self.framebuffers);
        keys(&mut out, &self.query_pools);
        keys(&mut out, &self.command_buffers);
        out
    }

    /// Largest handle value of any kind, including handles only referenced
    /// from records (destroyed dependencies).
    pub fn max_handle(&self) -> u64 {
        let live = self.all_handles().iter().map(|h| h.raw).max().unwrap_or(0);
        let linked = self
            .compute_pipelines
            .values()
            .map(|p| p.stage.module.handle.0.max(p.layout.handle.0))
            .chain(self.graphics_pipelines.values().map(|p| {
                p.stages
                    .iter()
                    .map(|s| s.module.handle.0)
                    .fold(p.layout.handle.0.max(p.render_pass.handle.0), u64::max)
            }))
            .chain(self.framebuffers.values().map(|f| f.render_pass.handle.0))
            .chain(self.descriptor_sets.values().map(|s| s.layout.handle.0))
            .max()
            .unwrap_or(0);
        live.max(linked)
    }

    pub fn pipeline_exists(&self, pipeline: VkPipeline) -> bool {
        self.compute_pipelines.contains_key(&pipeline)
            || self.graphics_pipelines.contains_key(&pipeline)
    }

    /// Queue-family properties of the physical device behind `device`.
    pub fn queue_family(&self, device: VkDevice, family: u32) -> Option<&QueueFamilyProperties> {
        let dev = self.devices.get(&device)?;
        let pd = self.physical_devices.get(&dev.physical_device)?;
        pd.queue_families.get(family as usize)
    }

    /// Queue flags of the family `queue` belongs to.
    pub fn queue_flags(&self, queue: VkQueue) -> u32 {
        self.queues
            .get(&queue)
            .and_then(|q| self.queue_family(q.device, q.family))
            .map(|f| f.queue_flags)
            .unwrap_or(0)
    }
}
