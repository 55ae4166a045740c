use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::{BufferObject, DedicatedTarget, ImageObject, SparseBinding};
use vkstate_api::{ApiCommand, Ptr};
use vkstate_core::RebuildError;

use crate::buffer_primer::prime_buffer;
use crate::commands::{allocate_memory_as, create_image, image_memory_requirements};
use crate::emitter::Emitter;
use crate::image_primer::prime_image;
use crate::queue_select::get_queue_for;

use super::StateRebuilder;

fn sparse_binds(em: &Emitter<'_>, bindings: &[SparseBinding]) -> Vec<packed::SparseMemoryBind> {
    bindings
        .iter()
        .filter(|b| em.new_state.contains(b.memory))
        .map(|b| packed::SparseMemoryBind {
            resource_offset: b.resource_offset,
            size: b.size,
            memory: b.memory.0,
            memory_offset: b.memory_offset,
            flags: b.flags,
            ..Default::default()
        })
        .collect()
}

impl StateRebuilder<'_, '_> {
    // ── Memory ──────────────────────────────────────────────

    /// Allocations not dedicated to a resource. Dedicated ones are made
    /// right after the resource they belong to is created.
    pub(super) fn device_memories(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&memory, obj) in state.device_memories.iter().filter(|(_, m)| m.dedicated.is_none()) {
            if !self.requires(memory, obj.device) {
                continue;
            }
            allocate_memory_as(
                &mut self.em,
                obj.device,
                memory,
                obj.allocation_size,
                obj.memory_type_index,
                None,
            );
        }
        Ok(())
    }

    fn dedicated_memories(&mut self, target: DedicatedTarget) {
        let state = self.state;
        for (&memory, obj) in &state.device_memories {
            if obj.dedicated != Some(target) {
                continue;
            }
            let (image, buffer) = match target {
                DedicatedTarget::Buffer(b) => (0, b.0),
                DedicatedTarget::Image(i) => (i.0, 0),
            };
            let dedicated = packed::MemoryDedicatedAllocateInfo {
                s_type: s_type(vk::StructureType::MEMORY_DEDICATED_ALLOCATE_INFO),
                image,
                buffer,
                ..Default::default()
            };
            allocate_memory_as(
                &mut self.em,
                obj.device,
                memory,
                obj.allocation_size,
                obj.memory_type_index,
                Some(dedicated),
            );
        }
    }

    /// `vkQueueBindSparse` on a sparse-capable queue of `device`.
    fn bind_sparse(
        &mut self,
        device: VkDevice,
        preferred: Option<VkQueue>,
        info: packed::BindSparseInfo,
    ) -> Result<(), RebuildError> {
        let flags = vk::QueueFlags::SPARSE_BINDING;
        let preferred: Vec<VkQueue> = preferred.into_iter().collect();
        let queue = get_queue_for(self.state, flags, &[], device, &preferred).ok_or(
            RebuildError::NoEligibleQueue {
                flags: flags.as_raw(),
                device,
            },
        )?;
        let bind_info = self.em.alloc_read(&info);
        self.em.write(ApiCommand::QueueBindSparse {
            queue,
            bind_info_count: 1,
            bind_info,
            fence: VkFence::NULL,
        });
        Ok(())
    }

    // ── Buffer ──────────────────────────────────────────────

    pub(super) fn buffers(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&buffer, obj) in &state.buffers {
            if !self.requires(buffer, obj.device) {
                continue;
            }
            self.create_buffer(buffer, obj);
            self.dedicated_memories(DedicatedTarget::Buffer(buffer));

            let bound = if obj.is_sparse() {
                let binds = sparse_binds(&self.em, &obj.sparse_bindings);
                let em = &mut self.em;
                let resource = packed::SparseResourceBindInfo {
                    resource: buffer.0,
                    bind_count: binds.len() as u32,
                    p_binds: em.alloc_read_slice(&binds).0,
                    ..Default::default()
                };
                let info = packed::BindSparseInfo {
                    s_type: s_type(vk::StructureType::BIND_SPARSE_INFO),
                    buffer_bind_count: 1,
                    p_buffer_binds: em.alloc_read(&resource).0,
                    ..Default::default()
                };
                let result = self.bind_sparse(obj.device, obj.last_bound_queue, info);
                self.recover(buffer, result)?.is_some()
            } else if let Some(bound) = obj.memory {
                if self.requires(buffer, bound.memory) {
                    self.em.write(ApiCommand::BindBufferMemory {
                        device: obj.device,
                        buffer,
                        memory: bound.memory,
                        offset: bound.offset,
                    });
                    true
                } else {
                    false
                }
            } else {
                false
            };

            if bound && self.config.rebuild.prime_buffers {
                let result = prime_buffer(&mut self.em, &mut self.scratch, state, buffer, obj);
                self.recover(buffer, result)?;
            }
        }
        Ok(())
    }

    fn create_buffer(&mut self, buffer: VkBuffer, obj: &BufferObject) {
        let em = &mut self.em;
        let info = packed::BufferCreateInfo {
            s_type: s_type(vk::StructureType::BUFFER_CREATE_INFO),
            flags: obj.info.flags,
            size: obj.info.size,
            // Contents are copied in.
            usage: obj.info.usage | vk::BufferUsageFlags::TRANSFER_DST.as_raw(),
            sharing_mode: obj.info.sharing_mode as u32,
            queue_family_index_count: obj.info.queue_family_indices.len() as u32,
            p_queue_family_indices: em.alloc_read_slice(&obj.info.queue_family_indices).0,
            ..Default::default()
        };
        let create_info = em.alloc_read(&info);
        let buffer_out = em.alloc_write(8);
        em.write(ApiCommand::CreateBuffer {
            device: obj.device,
            create_info,
            allocator: Ptr::NULL,
            buffer_out,
            buffer,
        });
        let requirements_out = em.alloc_write(packed::MEMORY_REQUIREMENTS_SIZE);
        em.write(ApiCommand::GetBufferMemoryRequirements {
            device: obj.device,
            buffer,
            requirements_out,
        });
    }

    // ── Image ───────────────────────────────────────────────

    pub(super) fn images(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&image, obj) in &state.images {
            if !self.requires(image, obj.device) {
                continue;
            }
            let bound = if obj.is_swapchain_image {
                // Created with the swapchain.
                self.em.new_state.contains(image)
            } else {
                self.create_image(image, obj);
                self.dedicated_memories(DedicatedTarget::Image(image));
                self.bind_image(image, obj)?
            };
            if !bound {
                continue;
            }
            let result = prime_image(
                &mut self.em,
                &mut self.scratch,
                state,
                image,
                obj,
                self.config.rebuild.prime_images,
            );
            if let Some(path) = self.recover(image, result)? {
                debug!(?image, ?path, "image rebuilt");
            }
        }
        Ok(())
    }

    fn create_image(&mut self, image: VkImage, obj: &ImageObject) {
        let em = &mut self.em;
        let info = packed::ImageCreateInfo {
            s_type: s_type(vk::StructureType::IMAGE_CREATE_INFO),
            flags: obj.info.flags,
            image_type: obj.info.image_type as u32,
            format: obj.info.format as u32,
            extent: obj.info.extent,
            mip_levels: obj.info.mip_levels,
            array_layers: obj.info.array_layers,
            samples: obj.info.samples,
            tiling: obj.info.tiling as u32,
            usage: obj.info.usage | vk::ImageUsageFlags::TRANSFER_DST.as_raw(),
            sharing_mode: obj.info.sharing_mode as u32,
            initial_layout: vk::ImageLayout::UNDEFINED.as_raw() as u32,
            ..Default::default()
        };
        create_image(em, obj.device, image, &info, &obj.info.queue_family_indices);
        image_memory_requirements(em, obj.device, image);
        if obj.is_sparse() && obj.is_residency() {
            let n = obj.sparse_requirements.len() as u64;
            let count = em.alloc_read(&(n as u32));
            let requirements_out =
                em.alloc_write(packed::SPARSE_IMAGE_MEMORY_REQUIREMENTS_SIZE * n);
            em.write(ApiCommand::GetImageSparseMemoryRequirements {
                device: obj.device,
                image,
                count,
                requirements_out,
            });
        }
    }

    fn bind_image(&mut self, image: VkImage, obj: &ImageObject) -> Result<bool, RebuildError> {
        if obj.is_sparse() {
            let opaque = sparse_binds(&self.em, &obj.opaque_sparse_bindings);
            let binds: Vec<packed::SparseImageMemoryBind> = obj
                .sparse_image_bindings
                .iter()
                .filter(|b| self.em.new_state.contains(b.memory))
                .map(|b| packed::SparseImageMemoryBind {
                    aspect_mask: b.aspect_mask,
                    mip_level: b.mip_level,
                    array_layer: b.array_layer,
                    offset: b.offset,
                    extent: b.extent,
                    memory: b.memory.0,
                    memory_offset: b.memory_offset,
                    flags: b.flags,
                    ..Default::default()
                })
                .collect();
            let em = &mut self.em;
            let mut info = packed::BindSparseInfo {
                s_type: s_type(vk::StructureType::BIND_SPARSE_INFO),
                ..Default::default()
            };
            if !opaque.is_empty() {
                let resource = packed::SparseResourceBindInfo {
                    resource: image.0,
                    bind_count: opaque.len() as u32,
                    p_binds: em.alloc_read_slice(&opaque).0,
                    ..Default::default()
                };
                info.image_opaque_bind_count = 1;
                info.p_image_opaque_binds = em.alloc_read(&resource).0;
            }
            if !binds.is_empty() {
                let resource = packed::SparseResourceBindInfo {
                    resource: image.0,
                    bind_count: binds.len() as u32,
                    p_binds: em.alloc_read_slice(&binds).0,
                    ..Default::default()
                };
                info.image_bind_count = 1;
                info.p_image_binds = em.alloc_read(&resource).0;
            }
            let preferred = obj.subresources.iter().find_map(|s| s.last_bound_queue);
            let result = self.bind_sparse(obj.device, preferred, info);
            return Ok(self.recover(image, result)?.is_some());
        }
        match obj.memory {
            Some(bound) if self.requires(image, bound.memory) => {
                self.em.write(ApiCommand::BindImageMemory {
                    device: obj.device,
                    image,
                    memory: bound.memory,
                    offset: bound.offset,
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
