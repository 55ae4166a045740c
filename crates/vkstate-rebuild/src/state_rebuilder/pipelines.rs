use std::collections::{BTreeMap, BTreeSet};

use ash::vk;
use tracing::debug;

use vkstate_api::handle::*;
use vkstate_api::packed::{self, s_type};
use vkstate_api::state::{ComputePipelineObject, GraphicsPipelineObject, ShaderStage};
use vkstate_api::{ApiCommand, Ptr};
use vkstate_core::RebuildError;

use crate::emitter::{Emitter, PipelineDeps};

use super::{Placeholders, StateRebuilder};

/// A pipeline and the base it is created from, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSlot {
    pub pipeline: VkPipeline,
    pub base: Option<VkPipeline>,
}

/// Creation order for pipelines keyed to their base pipeline (`NULL` for
/// none), such that every base precedes its derivatives.
///
/// A base outside `bases` is dropped. Pipelines on a derivation cycle are
/// placed in ascending handle order without a base once nothing else can
/// be; pipelines deriving from them keep their bases.
pub fn pipeline_order(bases: &BTreeMap<VkPipeline, VkPipeline>) -> Vec<PipelineSlot> {
    let mut order = Vec::with_capacity(bases.len());
    let mut placed: BTreeSet<VkPipeline> = BTreeSet::new();
    let mut pending: Vec<VkPipeline> = bases.keys().copied().collect();

    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|&pipeline| {
            let base = bases[&pipeline];
            let slot = if base.is_null() || !bases.contains_key(&base) {
                PipelineSlot {
                    pipeline,
                    base: None,
                }
            } else if placed.contains(&base) {
                PipelineSlot {
                    pipeline,
                    base: Some(base),
                }
            } else {
                return true;
            };
            order.push(slot);
            placed.insert(pipeline);
            false
        });
        if pending.len() < before {
            continue;
        }

        // Every pending base is itself pending, so some of them loop.
        let cyclic: Vec<VkPipeline> = pending
            .iter()
            .copied()
            .filter(|&p| on_cycle(bases, p))
            .collect();
        debug!(count = cyclic.len(), "pipeline derivation cycle; dropping bases");
        for &pipeline in &cyclic {
            order.push(PipelineSlot {
                pipeline,
                base: None,
            });
            placed.insert(pipeline);
        }
        pending.retain(|p| !placed.contains(p));
    }
    order
}

/// Following bases from `pipeline` leads back to it.
fn on_cycle(bases: &BTreeMap<VkPipeline, VkPipeline>, pipeline: VkPipeline) -> bool {
    let mut current = pipeline;
    for _ in 0..bases.len() {
        match bases.get(&current) {
            Some(&base) if !base.is_null() => current = base,
            _ => return false,
        }
        if current == pipeline {
            return true;
        }
    }
    false
}

/// Flags with the derivative bit cleared when there is no base to derive
/// from.
fn derivative_flags(flags: u32, base: Option<VkPipeline>) -> u32 {
    match base {
        Some(_) => flags,
        None => flags & !vk::PipelineCreateFlags::DERIVATIVE.as_raw(),
    }
}

fn stage_info(
    em: &mut Emitter<'_>,
    stage: &ShaderStage,
    module: VkShaderModule,
) -> Result<packed::PipelineShaderStageCreateInfo, RebuildError> {
    let p_specialization_info = match &stage.specialization {
        Some(spec) => {
            let info = packed::SpecializationInfo {
                map_entry_count: spec.map_entries.len() as u32,
                p_map_entries: em.alloc_read_slice(&spec.map_entries).0,
                data_size: spec.data.size,
                p_data: em.read_at(&spec.data)?.0,
                ..Default::default()
            };
            em.alloc_read(&info).0
        }
        None => 0,
    };
    Ok(packed::PipelineShaderStageCreateInfo {
        s_type: s_type(vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO),
        flags: stage.flags,
        stage: stage.stage,
        module: module.0,
        p_name: em.alloc_cstr(&stage.entry_point).0,
        p_specialization_info,
        ..Default::default()
    })
}

fn graphics_states(
    em: &mut Emitter<'_>,
    obj: &GraphicsPipelineObject,
    info: &mut packed::GraphicsPipelineCreateInfo,
) {
    if let Some(vi) = &obj.vertex_input {
        let state = packed::PipelineVertexInputStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO),
            vertex_binding_description_count: vi.bindings.len() as u32,
            p_vertex_binding_descriptions: em.alloc_read_slice(&vi.bindings).0,
            vertex_attribute_description_count: vi.attributes.len() as u32,
            p_vertex_attribute_descriptions: em.alloc_read_slice(&vi.attributes).0,
            ..Default::default()
        };
        info.p_vertex_input_state = em.alloc_read(&state).0;
    }
    if let Some(ia) = obj.input_assembly {
        let state = packed::PipelineInputAssemblyStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO),
            topology: ia.topology as u32,
            primitive_restart_enable: u32::from(ia.primitive_restart_enable),
            ..Default::default()
        };
        info.p_input_assembly_state = em.alloc_read(&state).0;
    }
    if let Some(patch_control_points) = obj.tessellation_patch_control_points {
        let state = packed::PipelineTessellationStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_TESSELLATION_STATE_CREATE_INFO),
            patch_control_points,
            ..Default::default()
        };
        info.p_tessellation_state = em.alloc_read(&state).0;
    }
    if let Some(vp) = &obj.viewport {
        let state = packed::PipelineViewportStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO),
            viewport_count: vp.viewport_count,
            p_viewports: em.alloc_read_slice(&vp.viewports).0,
            scissor_count: vp.scissor_count,
            p_scissors: em.alloc_read_slice(&vp.scissors).0,
            ..Default::default()
        };
        info.p_viewport_state = em.alloc_read(&state).0;
    }

    let rs = obj.rasterization;
    let state = packed::PipelineRasterizationStateCreateInfo {
        s_type: s_type(vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO),
        depth_clamp_enable: u32::from(rs.depth_clamp_enable),
        rasterizer_discard_enable: u32::from(rs.rasterizer_discard_enable),
        polygon_mode: rs.polygon_mode as u32,
        cull_mode: rs.cull_mode,
        front_face: rs.front_face as u32,
        depth_bias_enable: u32::from(rs.depth_bias_enable),
        depth_bias_constant_factor: rs.depth_bias_constant_factor,
        depth_bias_clamp: rs.depth_bias_clamp,
        depth_bias_slope_factor: rs.depth_bias_slope_factor,
        line_width: rs.line_width,
        ..Default::default()
    };
    info.p_rasterization_state = em.alloc_read(&state).0;

    if let Some(ms) = &obj.multisample {
        let state = packed::PipelineMultisampleStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO),
            rasterization_samples: ms.rasterization_samples,
            sample_shading_enable: u32::from(ms.sample_shading_enable),
            min_sample_shading: ms.min_sample_shading,
            p_sample_mask: em.alloc_read_slice(&ms.sample_mask).0,
            alpha_to_coverage_enable: u32::from(ms.alpha_to_coverage_enable),
            alpha_to_one_enable: u32::from(ms.alpha_to_one_enable),
            ..Default::default()
        };
        info.p_multisample_state = em.alloc_read(&state).0;
    }
    if let Some(ds) = obj.depth_stencil {
        let state = packed::PipelineDepthStencilStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_DEPTH_STENCIL_STATE_CREATE_INFO),
            depth_test_enable: u32::from(ds.depth_test_enable),
            depth_write_enable: u32::from(ds.depth_write_enable),
            depth_compare_op: ds.depth_compare_op as u32,
            depth_bounds_test_enable: u32::from(ds.depth_bounds_test_enable),
            stencil_test_enable: u32::from(ds.stencil_test_enable),
            front: ds.front,
            back: ds.back,
            min_depth_bounds: ds.min_depth_bounds,
            max_depth_bounds: ds.max_depth_bounds,
            ..Default::default()
        };
        info.p_depth_stencil_state = em.alloc_read(&state).0;
    }
    if let Some(cb) = &obj.color_blend {
        let state = packed::PipelineColorBlendStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO),
            logic_op_enable: u32::from(cb.logic_op_enable),
            logic_op: cb.logic_op as u32,
            attachment_count: cb.attachments.len() as u32,
            p_attachments: em.alloc_read_slice(&cb.attachments).0,
            blend_constants: cb.blend_constants,
            ..Default::default()
        };
        info.p_color_blend_state = em.alloc_read(&state).0;
    }
    if let Some(dynamic) = &obj.dynamic_states {
        let raw: Vec<u32> = dynamic.iter().map(|d| *d as u32).collect();
        let state = packed::PipelineDynamicStateCreateInfo {
            s_type: s_type(vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO),
            dynamic_state_count: raw.len() as u32,
            p_dynamic_states: em.alloc_read_slice(&raw).0,
            ..Default::default()
        };
        info.p_dynamic_state = em.alloc_read(&state).0;
    }
}

impl StateRebuilder<'_, '_> {
    /// The base, if it was actually created.
    fn live_base(&self, base: Option<VkPipeline>) -> Option<VkPipeline> {
        base.filter(|b| self.em.new_state.contains(*b))
    }

    fn live_cache(&self, cache: VkPipelineCache) -> VkPipelineCache {
        if self.em.new_state.contains(cache) {
            cache
        } else {
            VkPipelineCache::NULL
        }
    }

    // ── Compute ─────────────────────────────────────────────

    pub(super) fn compute_pipelines(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        let bases: BTreeMap<VkPipeline, VkPipeline> = state
            .compute_pipelines
            .iter()
            .map(|(h, p)| (*h, p.base_pipeline))
            .collect();
        for slot in pipeline_order(&bases) {
            let Some(obj) = state.compute_pipelines.get(&slot.pipeline) else {
                continue;
            };
            if !self.requires(slot.pipeline, obj.device) {
                continue;
            }
            let mut temps = Placeholders::default();
            let result = self.create_compute(slot, obj, &mut temps);
            self.recover(slot.pipeline, result)?;
            temps.release(&mut self.em);
        }
        Ok(())
    }

    fn create_compute(
        &mut self,
        slot: PipelineSlot,
        obj: &ComputePipelineObject,
        temps: &mut Placeholders,
    ) -> Result<(), RebuildError> {
        let module = self.shader_module_for(&obj.stage.module, temps)?;
        let layout = self.pipeline_layout_for(&obj.layout, temps);
        let base = self.live_base(slot.base);
        let pipeline_cache = self.live_cache(obj.pipeline_cache);

        let em = &mut self.em;
        let stage = stage_info(em, &obj.stage, module)?;
        let info = packed::ComputePipelineCreateInfo {
            s_type: s_type(vk::StructureType::COMPUTE_PIPELINE_CREATE_INFO),
            flags: derivative_flags(obj.flags, base),
            stage,
            layout: layout.0,
            base_pipeline_handle: base.map_or(0, |b| b.0),
            base_pipeline_index: -1,
            ..Default::default()
        };
        let create_infos = em.alloc_read(&info);
        let pipelines_out = em.alloc_write(8);
        em.write(ApiCommand::CreateComputePipelines {
            device: obj.device,
            pipeline_cache,
            create_info_count: 1,
            create_infos,
            allocator: Ptr::NULL,
            pipelines_out,
            pipelines: vec![slot.pipeline],
        });
        em.new_state.pipelines.insert(
            slot.pipeline,
            PipelineDeps {
                layout,
                render_pass: VkRenderPass::NULL,
                shader_modules: vec![module],
            },
        );
        Ok(())
    }

    // ── Graphics ────────────────────────────────────────────

    pub(super) fn graphics_pipelines(&mut self) -> Result<(), RebuildError> {
        let state = self.state;
        let bases: BTreeMap<VkPipeline, VkPipeline> = state
            .graphics_pipelines
            .iter()
            .map(|(h, p)| (*h, p.base_pipeline))
            .collect();
        for slot in pipeline_order(&bases) {
            let Some(obj) = state.graphics_pipelines.get(&slot.pipeline) else {
                continue;
            };
            if !self.requires(slot.pipeline, obj.device) {
                continue;
            }
            let mut temps = Placeholders::default();
            let result = self.create_graphics(slot, obj, &mut temps);
            self.recover(slot.pipeline, result)?;
            temps.release(&mut self.em);
        }
        Ok(())
    }

    fn create_graphics(
        &mut self,
        slot: PipelineSlot,
        obj: &GraphicsPipelineObject,
        temps: &mut Placeholders,
    ) -> Result<(), RebuildError> {
        let mut modules = Vec::with_capacity(obj.stages.len());
        for stage in &obj.stages {
            modules.push(self.shader_module_for(&stage.module, temps)?);
        }
        let layout = self.pipeline_layout_for(&obj.layout, temps);
        let render_pass = self.render_pass_for(&obj.render_pass, temps);
        let base = self.live_base(slot.base);
        let pipeline_cache = self.live_cache(obj.pipeline_cache);

        let em = &mut self.em;
        let mut stages = Vec::with_capacity(obj.stages.len());
        for (stage, module) in obj.stages.iter().zip(&modules) {
            stages.push(stage_info(em, stage, *module)?);
        }
        let mut info = packed::GraphicsPipelineCreateInfo {
            s_type: s_type(vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO),
            flags: derivative_flags(obj.flags, base),
            stage_count: stages.len() as u32,
            p_stages: em.alloc_read_slice(&stages).0,
            layout: layout.0,
            render_pass: render_pass.0,
            subpass: obj.subpass,
            base_pipeline_handle: base.map_or(0, |b| b.0),
            base_pipeline_index: -1,
            ..Default::default()
        };
        graphics_states(em, obj, &mut info);
        let create_infos = em.alloc_read(&info);
        let pipelines_out = em.alloc_write(8);
        em.write(ApiCommand::CreateGraphicsPipelines {
            device: obj.device,
            pipeline_cache,
            create_info_count: 1,
            create_infos,
            allocator: Ptr::NULL,
            pipelines_out,
            pipelines: vec![slot.pipeline],
        });
        em.new_state.pipelines.insert(
            slot.pipeline,
            PipelineDeps {
                layout,
                render_pass,
                shader_modules: modules,
            },
        );
        Ok(())
    }
}
