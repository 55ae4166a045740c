use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::{
    Descriptor, DescriptorSetLayoutObject, Linked, PipelineLayoutObject, RenderPassObject,
    ShaderModuleObject,
};
use vkstate_api::{AnyHandle, ApiCommand, Ptr};
use vkstate_core::RebuildError;

use crate::commands::queue_submit;
use crate::emitter::Emitter;
use crate::queue_select::get_queue_for;

use super::{Placeholders, StateRebuilder};

// ── Encoders shared with placeholders ───────────────────────

fn emit_descriptor_set_layout(
    em: &mut Emitter<'_>,
    set_layout: VkDescriptorSetLayout,
    obj: &DescriptorSetLayoutObject,
) {
    let bindings: Vec<packed::DescriptorSetLayoutBinding> = obj
        .bindings
        .iter()
        .map(|(binding, b)| {
            let samplers: Vec<u64> = b.immutable_samplers.iter().map(|s| s.0).collect();
            packed::DescriptorSetLayoutBinding {
                binding: *binding,
                descriptor_type: b.descriptor_type as u32,
                descriptor_count: b.descriptor_count,
                stage_flags: b.stage_flags,
                p_immutable_samplers: em.alloc_read_slice(&samplers).0,
            }
        })
        .collect();
    let info = packed::DescriptorSetLayoutCreateInfo {
        s_type: s_type(vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO),
        flags: obj.flags,
        binding_count: bindings.len() as u32,
        p_bindings: em.alloc_read_slice(&bindings).0,
        ..Default::default()
    };
    let create_info = em.alloc_read(&info);
    let set_layout_out = em.alloc_write(8);
    em.write(ApiCommand::CreateDescriptorSetLayout {
        device: obj.device,
        create_info,
        allocator: Ptr::NULL,
        set_layout_out,
        set_layout,
    });
}

fn emit_pipeline_layout(
    em: &mut Emitter<'_>,
    pipeline_layout: VkPipelineLayout,
    obj: &PipelineLayoutObject,
    set_layouts: &[VkDescriptorSetLayout],
) {
    let sets: Vec<u64> = set_layouts.iter().map(|s| s.0).collect();
    let info = packed::PipelineLayoutCreateInfo {
        s_type: s_type(vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO),
        flags: obj.flags,
        set_layout_count: sets.len() as u32,
        p_set_layouts: em.alloc_read_slice(&sets).0,
        push_constant_range_count: obj.push_constant_ranges.len() as u32,
        p_push_constant_ranges: em.alloc_read_slice(&obj.push_constant_ranges).0,
        ..Default::default()
    };
    let create_info = em.alloc_read(&info);
    let pipeline_layout_out = em.alloc_write(8);
    em.write(ApiCommand::CreatePipelineLayout {
        device: obj.device,
        create_info,
        allocator: Ptr::NULL,
        pipeline_layout_out,
        pipeline_layout,
    });
}

fn emit_render_pass(em: &mut Emitter<'_>, render_pass: VkRenderPass, obj: &RenderPassObject) {
    let subpasses: Vec<packed::SubpassDescription> = obj
        .subpasses
        .iter()
        .map(|sp| packed::SubpassDescription {
            flags: sp.flags,
            pipeline_bind_point: sp.pipeline_bind_point as u32,
            input_attachment_count: sp.input_attachments.len() as u32,
            p_input_attachments: em.alloc_read_slice(&sp.input_attachments).0,
            color_attachment_count: sp.color_attachments.len() as u32,
            p_color_attachments: em.alloc_read_slice(&sp.color_attachments).0,
            p_resolve_attachments: em.alloc_read_slice(&sp.resolve_attachments).0,
            p_depth_stencil_attachment: sp
                .depth_stencil_attachment
                .map(|d| em.alloc_read(&d).0)
                .unwrap_or(0),
            preserve_attachment_count: sp.preserve_attachments.len() as u32,
            p_preserve_attachments: em.alloc_read_slice(&sp.preserve_attachments).0,
            ..Default::default()
        })
        .collect();
    let info = packed::RenderPassCreateInfo {
        s_type: s_type(vk::StructureType::RENDER_PASS_CREATE_INFO),
        flags: obj.flags,
        attachment_count: obj.attachments.len() as u32,
        p_attachments: em.alloc_read_slice(&obj.attachments).0,
        subpass_count: subpasses.len() as u32,
        p_subpasses: em.alloc_read_slice(&subpasses).0,
        dependency_count: obj.dependencies.len() as u32,
        p_dependencies: em.alloc_read_slice(&obj.dependencies).0,
        ..Default::default()
    };
    let create_info = em.alloc_read(&info);
    let render_pass_out = em.alloc_write(8);
    em.write(ApiCommand::CreateRenderPass {
        device: obj.device,
        create_info,
        allocator: Ptr::NULL,
        render_pass_out,
        render_pass,
    });
}

fn emit_shader_module(
    em: &mut Emitter<'_>,
    shader_module: VkShaderModule,
    obj: &ShaderModuleObject,
) -> Result<(), RebuildError> {
    let info = packed::ShaderModuleCreateInfo {
        s_type: s_type(vk::StructureType::SHADER_MODULE_CREATE_INFO),
        flags: obj.flags,
        code_size: obj.code.size,
        p_code: em.read_at(&obj.code)?.0,
        ..Default::default()
    };
    let create_info = em.alloc_read(&info);
    let shader_module_out = em.alloc_write(8);
    em.write(ApiCommand::CreateShaderModule {
        device: obj.device,
        create_info,
        allocator: Ptr::NULL,
        shader_module_out,
        shader_module,
    });
    Ok(())
}

fn descriptor_live(em: &Emitter<'_>, d: &Descriptor) -> bool {
    let live = |h: AnyHandle| h.raw == 0 || em.new_state.contains(h);
    match *d {
        Descriptor::Empty => false,
        Descriptor::Image {
            sampler,
            image_view,
            ..
        } => {
            (sampler.0 != 0 || image_view.0 != 0) && live(sampler.any()) && live(image_view.any())
        }
        Descriptor::Buffer { buffer, .. } => buffer.0 != 0 && live(buffer.any()),
        Descriptor::TexelBuffer(view) => view.0 != 0 && live(view.any()),
    }
}

impl StateRebuilder<'_, '_> {
    // ── Placeholders ────────────────────────────────────────

    /// `linked.handle` if it exists, otherwise a temporary copy of the
    /// layout it named, destroyed when `temps` is released.
    fn set_layout_for(
        &mut self,
        linked: &Linked<VkDescriptorSetLayout, DescriptorSetLayoutObject>,
        temps: &mut Placeholders,
    ) -> VkDescriptorSetLayout {
        if self.em.new_state.contains(linked.handle) {
            return linked.handle;
        }
        let temp: VkDescriptorSetLayout = self.em.alloc_handle();
        emit_descriptor_set_layout(&mut self.em, temp, &linked.object);
        temps.push(ApiCommand::DestroyDescriptorSetLayout {
            device: linked.object.device,
            set_layout: temp,
            allocator: Ptr::NULL,
        });
        debug!(original = ?linked.handle, ?temp, "placeholder descriptor set layout");
        temp
    }

    pub(super) fn pipeline_layout_for(
        &mut self,
        linked: &Linked<VkPipelineLayout, PipelineLayoutObject>,
        temps: &mut Placeholders,
    ) -> VkPipelineLayout {
        if self.em.new_state.contains(linked.handle) {
            return linked.handle;
        }
        let set_layouts: Vec<VkDescriptorSetLayout> = linked
            .object
            .set_layouts
            .iter()
            .map(|l| self.set_layout_for(l, temps))
            .collect();
        let temp: VkPipelineLayout = self.em.alloc_handle();
        emit_pipeline_layout(&mut self.em, temp, &linked.object, &set_layouts);
        temps.push(ApiCommand::DestroyPipelineLayout {
            device: linked.object.device,
            pipeline_layout: temp,
            allocator: Ptr::NULL,
        });
        debug!(original = ?linked.handle, ?temp, "placeholder pipeline layout");
        temp
    }

    pub(super) fn render_pass_for(
        &mut self,
        linked: &Linked<VkRenderPass, RenderPassObject>,
        temps: &mut Placeholders,
    ) -> VkRenderPass {
        if self.em.new_state.contains(linked.handle) {
            return linked.handle;
        }
        let temp: VkRenderPass = self.em.alloc_handle();
        emit_render_pass(&mut self.em, temp, &linked.object);
        temps.push(ApiCommand::DestroyRenderPass {
            device: linked.object.device,
            render_pass: temp,
            allocator: Ptr::NULL,
        });
        debug!(original = ?linked.handle, ?temp, "placeholder render pass");
        temp
    }

    pub(super) fn shader_module_for(
        &mut self,
        linked: &Linked<VkShaderModule, ShaderModuleObject>,
        temps: &mut Placeholders,
    ) -> Result<VkShaderModule, RebuildError> {
        if self.em.new_state.contains(linked.handle) {
            return Ok(linked.handle);
        }
        let temp: VkShaderModule = self.em.alloc_handle();
        emit_shader_module(&mut self.em, temp, &linked.object)?;
        temps.push(ApiCommand::DestroyShaderModule {
            device: linked.object.device,
            shader_module: temp,
            allocator: Ptr::NULL,
        });
        debug!(original = ?linked.handle, ?temp, "placeholder shader module");
        Ok(temp)
    }

    // ── Samplers ────────────────────────────────────────────

    pub(super) fn ycbcr_conversions(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&conversion, obj) in &state.sampler_ycbcr_conversions {
            if !self.requires(conversion, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let info = packed::SamplerYcbcrConversionCreateInfo {
                s_type: s_type(vk::StructureType::SAMPLER_YCBCR_CONVERSION_CREATE_INFO),
                format: obj.format as u32,
                ycbcr_model: obj.ycbcr_model as u32,
                ycbcr_range: obj.ycbcr_range as u32,
                components: obj.components,
                x_chroma_offset: obj.x_chroma_offset as u32,
                y_chroma_offset: obj.y_chroma_offset as u32,
                chroma_filter: obj.chroma_filter as u32,
                force_explicit_reconstruction: u32::from(obj.force_explicit_reconstruction),
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let conversion_out = em.alloc_write(8);
            em.write(ApiCommand::CreateSamplerYcbcrConversion {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                conversion_out,
                conversion,
            });
        }
        Ok(())
    }

    fn ycbcr_info(&mut self, conversion: Option<VkSamplerYcbcrConversion>) -> u64 {
        match conversion {
            Some(conversion) => {
                let info = packed::SamplerYcbcrConversionInfo {
                    s_type: s_type(vk::StructureType::SAMPLER_YCBCR_CONVERSION_INFO),
                    conversion: conversion.0,
                    ..Default::default()
                };
                self.em.alloc_read(&info).0
            }
            None => 0,
        }
    }

    pub(super) fn samplers(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&sampler, obj) in &state.samplers {
            if !self.requires(sampler, obj.device) {
                continue;
            }
            if let Some(conversion) = obj.ycbcr_conversion {
                if !self.requires(sampler, conversion) {
                    continue;
                }
            }
            let p_next = self.ycbcr_info(obj.ycbcr_conversion);
            let em = &mut self.em;
            let info = packed::SamplerCreateInfo {
                s_type: s_type(vk::StructureType::SAMPLER_CREATE_INFO),
                p_next,
                flags: obj.flags,
                mag_filter: obj.mag_filter as u32,
                min_filter: obj.min_filter as u32,
                mipmap_mode: obj.mipmap_mode as u32,
                address_mode_u: obj.address_mode_u as u32,
                address_mode_v: obj.address_mode_v as u32,
                address_mode_w: obj.address_mode_w as u32,
                mip_lod_bias: obj.mip_lod_bias,
                anisotropy_enable: u32::from(obj.anisotropy_enable),
                max_anisotropy: obj.max_anisotropy,
                compare_enable: u32::from(obj.compare_enable),
                compare_op: obj.compare_op as u32,
                min_lod: obj.min_lod,
                max_lod: obj.max_lod,
                border_color: obj.border_color as u32,
                unnormalized_coordinates: u32::from(obj.unnormalized_coordinates),
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let sampler_out = em.alloc_write(8);
            em.write(ApiCommand::CreateSampler {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                sampler_out,
                sampler,
            });
        }
        Ok(())
    }

    // ── Synchronization ─────────────────────────────────────

    pub(super) fn fences(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&fence, obj) in &state.fences {
            if !self.requires(fence, obj.device) {
                continue;
            }
            let flags = if obj.signaled {
                vk::FenceCreateFlags::SIGNALED.as_raw()
            } else {
                0
            };
            let em = &mut self.em;
            let create_info = em.alloc_read(&packed::FlagsOnlyCreateInfo {
                s_type: s_type(vk::StructureType::FENCE_CREATE_INFO),
                flags,
                ..Default::default()
            });
            let fence_out = em.alloc_write(8);
            em.write(ApiCommand::CreateFence {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                fence_out,
                fence,
            });
        }
        Ok(())
    }

    /// Semaphores; signaled ones are signaled again by an empty submit.
    pub(super) fn semaphores(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&semaphore, obj) in &state.semaphores {
            if !self.requires(semaphore, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let create_info = em.alloc_read(&packed::FlagsOnlyCreateInfo {
                s_type: s_type(vk::StructureType::SEMAPHORE_CREATE_INFO),
                ..Default::default()
            });
            let semaphore_out = em.alloc_write(8);
            em.write(ApiCommand::CreateSemaphore {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                semaphore_out,
                semaphore,
            });
            if !obj.signaled {
                continue;
            }
            let flags = vk::QueueFlags::GRAPHICS
                | vk::QueueFlags::COMPUTE
                | vk::QueueFlags::TRANSFER
                | vk::QueueFlags::SPARSE_BINDING;
            let preferred: Vec<VkQueue> = obj.last_queue.into_iter().collect();
            let queue = get_queue_for(state, flags, &[], obj.device, &preferred).ok_or(
                RebuildError::NoEligibleQueue {
                    flags: flags.as_raw(),
                    device: obj.device,
                },
            );
            if let Some(queue) = self.recover(semaphore, queue)? {
                queue_submit(&mut self.em, queue, &[], &[semaphore], VkFence::NULL);
            }
        }
        Ok(())
    }

    pub(super) fn events(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&event, obj) in &state.events {
            if !self.requires(event, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let create_info = em.alloc_read(&packed::FlagsOnlyCreateInfo {
                s_type: s_type(vk::StructureType::EVENT_CREATE_INFO),
                ..Default::default()
            });
            let event_out = em.alloc_write(8);
            em.write(ApiCommand::CreateEvent {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                event_out,
                event,
            });
            if obj.signaled {
                em.write(ApiCommand::SetEvent {
                    device: obj.device,
                    event,
                });
            }
        }
        Ok(())
    }

    // ── Pools and caches ────────────────────────────────────

    pub(super) fn command_pools(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&command_pool, obj) in &state.command_pools {
            if !self.requires(command_pool, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let create_info = em.alloc_read(&packed::CommandPoolCreateInfo {
                s_type: s_type(vk::StructureType::COMMAND_POOL_CREATE_INFO),
                flags: obj.flags,
                queue_family_index: obj.queue_family_index,
                ..Default::default()
            });
            let command_pool_out = em.alloc_write(8);
            em.write(ApiCommand::CreateCommandPool {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                command_pool_out,
                command_pool,
            });
        }
        Ok(())
    }

    pub(super) fn pipeline_caches(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&pipeline_cache, obj) in &state.pipeline_caches {
            if !self.requires(pipeline_cache, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let create_info = em.alloc_read(&packed::PipelineCacheCreateInfo {
                s_type: s_type(vk::StructureType::PIPELINE_CACHE_CREATE_INFO),
                flags: obj.flags,
                ..Default::default()
            });
            let pipeline_cache_out = em.alloc_write(8);
            em.write(ApiCommand::CreatePipelineCache {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                pipeline_cache_out,
                pipeline_cache,
            });
        }
        Ok(())
    }

    // ── Layouts ─────────────────────────────────────────────

    pub(super) fn descriptor_set_layouts(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&set_layout, obj) in &state.descriptor_set_layouts {
            if !self.requires(set_layout, obj.device) {
                continue;
            }
            emit_descriptor_set_layout(&mut self.em, set_layout, obj);
        }
        Ok(())
    }

    pub(super) fn descriptor_update_templates(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&template, obj) in &state.descriptor_update_templates {
            if !self.requires(template, obj.device) {
                continue;
            }
            let mut temps = Placeholders::default();
            let pipeline_layout = obj
                .pipeline_layout
                .as_ref()
                .map(|l| self.pipeline_layout_for(l, &mut temps).0)
                .unwrap_or(0);
            let entries: Vec<packed::DescriptorUpdateTemplateEntry> = obj
                .entries
                .iter()
                .map(|e| packed::DescriptorUpdateTemplateEntry {
                    dst_binding: e.dst_binding,
                    dst_array_element: e.dst_array_element,
                    descriptor_count: e.descriptor_count,
                    descriptor_type: e.descriptor_type as u32,
                    offset: e.offset,
                    stride: e.stride,
                })
                .collect();
            let em = &mut self.em;
            let info = packed::DescriptorUpdateTemplateCreateInfo {
                s_type: s_type(vk::StructureType::DESCRIPTOR_UPDATE_TEMPLATE_CREATE_INFO),
                flags: obj.flags,
                descriptor_update_entry_count: entries.len() as u32,
                p_descriptor_update_entries: em.alloc_read_slice(&entries).0,
                template_type: obj.template_type as u32,
                descriptor_set_layout: obj.descriptor_set_layout.0,
                pipeline_bind_point: obj.pipeline_bind_point as u32,
                pipeline_layout,
                set: obj.set,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let template_out = em.alloc_write(8);
            em.write(ApiCommand::CreateDescriptorUpdateTemplate {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                template_out,
                template,
            });
            temps.release(em);
        }
        Ok(())
    }

    pub(super) fn pipeline_layouts(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&pipeline_layout, obj) in &state.pipeline_layouts {
            if !self.requires(pipeline_layout, obj.device) {
                continue;
            }
            let mut temps = Placeholders::default();
            let set_layouts: Vec<VkDescriptorSetLayout> = obj
                .set_layouts
                .iter()
                .map(|l| self.set_layout_for(l, &mut temps))
                .collect();
            emit_pipeline_layout(&mut self.em, pipeline_layout, obj, &set_layouts);
            temps.release(&mut self.em);
        }
        Ok(())
    }

    pub(super) fn render_passes(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&render_pass, obj) in &state.render_passes {
            if !self.requires(render_pass, obj.device) {
                continue;
            }
            emit_render_pass(&mut self.em, render_pass, obj);
        }
        Ok(())
    }

    pub(super) fn shader_modules(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&shader_module, obj) in &state.shader_modules {
            if !self.requires(shader_module, obj.device) {
                continue;
            }
            let result = emit_shader_module(&mut self.em, shader_module, obj);
            self.recover(shader_module, result)?;
        }
        Ok(())
    }

    // ── Views ───────────────────────────────────────────────

    pub(super) fn image_views(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&view, obj) in &state.image_views {
            if !self.requires(view, obj.device) || !self.requires(view, obj.image) {
                continue;
            }
            if let Some(conversion) = obj.ycbcr_conversion {
                if !self.requires(view, conversion) {
                    continue;
                }
            }
            let p_next = self.ycbcr_info(obj.ycbcr_conversion);
            let em = &mut self.em;
            let info = packed::ImageViewCreateInfo {
                s_type: s_type(vk::StructureType::IMAGE_VIEW_CREATE_INFO),
                p_next,
                flags: obj.flags,
                image: obj.image.0,
                view_type: obj.view_type as u32,
                format: obj.format as u32,
                components: obj.components,
                subresource_range: obj.subresource_range,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let view_out = em.alloc_write(8);
            em.write(ApiCommand::CreateImageView {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                view_out,
                view,
            });
        }
        Ok(())
    }

    pub(super) fn buffer_views(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&view, obj) in &state.buffer_views {
            if !self.requires(view, obj.device) || !self.requires(view, obj.buffer) {
                continue;
            }
            let em = &mut self.em;
            let info = packed::BufferViewCreateInfo {
                s_type: s_type(vk::StructureType::BUFFER_VIEW_CREATE_INFO),
                buffer: obj.buffer.0,
                format: obj.format as u32,
                offset: obj.offset,
                range: obj.range,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let view_out = em.alloc_write(8);
            em.write(ApiCommand::CreateBufferView {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                view_out,
                view,
            });
        }
        Ok(())
    }

    // ── Descriptors ─────────────────────────────────────────

    /// Descriptor pools, each followed by the sets allocated from it.
    pub(super) fn descriptor_pools(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&descriptor_pool, obj) in &state.descriptor_pools {
            if !self.requires(descriptor_pool, obj.device) {
                continue;
            }
            let em = &mut self.em;
            let info = packed::DescriptorPoolCreateInfo {
                s_type: s_type(vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO),
                flags: obj.flags,
                max_sets: obj.max_sets,
                pool_size_count: obj.pool_sizes.len() as u32,
                p_pool_sizes: em.alloc_read_slice(&obj.pool_sizes).0,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let descriptor_pool_out = em.alloc_write(8);
            em.write(ApiCommand::CreateDescriptorPool {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                descriptor_pool_out,
                descriptor_pool,
            });

            let sets: Vec<_> = state
                .descriptor_sets
                .iter()
                .filter(|(_, s)| s.pool == descriptor_pool)
                .collect();
            if sets.is_empty() {
                continue;
            }
            let mut temps = Placeholders::default();
            let layouts: Vec<VkDescriptorSetLayout> = sets
                .iter()
                .map(|(_, s)| self.set_layout_for(&s.layout, &mut temps))
                .collect();
            let descriptor_sets: Vec<VkDescriptorSet> = sets.iter().map(|(h, _)| **h).collect();
            let raw_layouts: Vec<u64> = layouts.iter().map(|l| l.0).collect();
            let em = &mut self.em;
            let info = packed::DescriptorSetAllocateInfo {
                s_type: s_type(vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO),
                descriptor_pool: descriptor_pool.0,
                descriptor_set_count: descriptor_sets.len() as u32,
                p_set_layouts: em.alloc_read_slice(&raw_layouts).0,
                ..Default::default()
            };
            let allocate_info = em.alloc_read(&info);
            let descriptor_sets_out = em.alloc_write(8 * descriptor_sets.len() as u64);
            em.write(ApiCommand::AllocateDescriptorSets {
                device: obj.device,
                allocate_info,
                descriptor_sets_out,
                descriptor_sets: descriptor_sets.clone(),
            });
            for (set, layout) in descriptor_sets.into_iter().zip(layouts) {
                em.new_state.descriptor_set_layouts.insert(set, layout);
            }
            temps.release(em);
        }
        Ok(())
    }

    /// Every set's non-empty descriptors, as runs of consecutive array
    /// elements whose referenced objects exist.
    pub(super) fn descriptor_writes(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&set, obj) in &state.descriptor_sets {
            if !self.em.new_state.contains(set) {
                continue;
            }
            let em = &mut self.em;
            let mut writes = Vec::new();
            for (&binding, elements) in &obj.bindings {
                let Some(layout_binding) = obj.layout.object.bindings.get(&binding) else {
                    continue;
                };
                let mut start = 0;
                while start < elements.len() {
                    if !descriptor_live(em, &elements[start]) {
                        start += 1;
                        continue;
                    }
                    let run = elements[start..]
                        .iter()
                        .take_while(|d| descriptor_live(em, d))
                        .count();
                    let slice = &elements[start..start + run];
                    let mut write = packed::WriteDescriptorSet {
                        s_type: s_type(vk::StructureType::WRITE_DESCRIPTOR_SET),
                        dst_set: set.0,
                        dst_binding: binding,
                        dst_array_element: start as u32,
                        descriptor_count: run as u32,
                        descriptor_type: layout_binding.descriptor_type as u32,
                        ..Default::default()
                    };
                    match slice[0] {
                        Descriptor::Image { .. } => {
                            let infos: Vec<packed::DescriptorImageInfo> = slice
                                .iter()
                                .map(|d| match *d {
                                    Descriptor::Image {
                                        sampler,
                                        image_view,
                                        image_layout,
                                    } => packed::DescriptorImageInfo {
                                        sampler: sampler.0,
                                        image_view: image_view.0,
                                        image_layout: image_layout as u32,
                                        ..Default::default()
                                    },
                                    _ => packed::DescriptorImageInfo::default(),
                                })
                                .collect();
                            write.p_image_info = em.alloc_read_slice(&infos).0;
                        }
                        Descriptor::Buffer { .. } => {
                            let infos: Vec<packed::DescriptorBufferInfo> = slice
                                .iter()
                                .map(|d| match *d {
                                    Descriptor::Buffer {
                                        buffer,
                                        offset,
                                        range,
                                    } => packed::DescriptorBufferInfo {
                                        buffer: buffer.0,
                                        offset,
                                        range,
                                    },
                                    _ => packed::DescriptorBufferInfo::default(),
                                })
                                .collect();
                            write.p_buffer_info = em.alloc_read_slice(&infos).0;
                        }
                        Descriptor::TexelBuffer(_) => {
                            let views: Vec<u64> = slice
                                .iter()
                                .map(|d| match *d {
                                    Descriptor::TexelBuffer(v) => v.0,
                                    _ => 0,
                                })
                                .collect();
                            write.p_texel_buffer_view = em.alloc_read_slice(&views).0;
                        }
                        Descriptor::Empty => {}
                    }
                    writes.push(write);
                    start += run;
                }
            }
            if writes.is_empty() {
                continue;
            }
            let count = writes.len() as u32;
            let writes = em.alloc_read_slice(&writes);
            em.write(ApiCommand::UpdateDescriptorSets {
                device: obj.device,
                write_count: count,
                writes,
                copy_count: 0,
                copies: Ptr::NULL,
            });
        }
        Ok(())
    }

    // ── Framebuffers ────────────────────────────────────────

    pub(super) fn framebuffers(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        for (&framebuffer, obj) in &state.framebuffers {
            if !self.requires(framebuffer, obj.device) {
                continue;
            }
            if let Some(missing) = obj
                .attachments
                .iter()
                .find(|a| !self.em.new_state.contains(**a))
            {
                self.skip(framebuffer, RebuildError::dangling(*missing).to_string());
                continue;
            }
            let mut temps = Placeholders::default();
            let render_pass = self.render_pass_for(&obj.render_pass, &mut temps);
            let attachments: Vec<u64> = obj.attachments.iter().map(|a| a.0).collect();
            let em = &mut self.em;
            let info = packed::FramebufferCreateInfo {
                s_type: s_type(vk::StructureType::FRAMEBUFFER_CREATE_INFO),
                flags: obj.flags,
                render_pass: render_pass.0,
                attachment_count: attachments.len() as u32,
                p_attachments: em.alloc_read_slice(&attachments).0,
                width: obj.width,
                height: obj.height,
                layers: obj.layers,
                ..Default::default()
            };
            let create_info = em.alloc_read(&info);
            let framebuffer_out = em.alloc_write(8);
            em.write(ApiCommand::CreateFramebuffer {
                device: obj.device,
                create_info,
                allocator: Ptr::NULL,
                framebuffer_out,
                framebuffer,
            });
            em.new_state.framebuffers.insert(framebuffer, render_pass);
            temps.release(em);
        }
        Ok(())
    }
}
