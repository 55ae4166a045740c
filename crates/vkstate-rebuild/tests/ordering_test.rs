//! Tests for pipeline derivation order, query slot restoration and dense
//! array unpacking.

use std::collections::BTreeMap;

use ash::vk;

use vkstate_api::handle::*;
use vkstate_api::state::QueryStatus;
use vkstate_api::{CmdCall, DenseMap, ModelError};
use vkstate_core::RebuildError;
use vkstate_rebuild::dense::{unpack, unpack_with};
use vkstate_rebuild::query_pool::slot_commands;
use vkstate_rebuild::{pipeline_order, PipelineSlot};

fn slot(pipeline: u64, base: Option<u64>) -> PipelineSlot {
    PipelineSlot {
        pipeline: VkPipeline(pipeline),
        base: base.map(VkPipeline),
    }
}

// ── Pipelines ───────────────────────────────────────────────

#[test]
fn test_bases_precede_derivatives() {
    // 3 derives from 2, which derives from 1.
    let bases: BTreeMap<VkPipeline, VkPipeline> = [
        (VkPipeline(3), VkPipeline(2)),
        (VkPipeline(2), VkPipeline(1)),
        (VkPipeline(1), VkPipeline::NULL),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        pipeline_order(&bases),
        vec![slot(1, None), slot(2, Some(1)), slot(3, Some(2))]
    );
}

#[test]
fn test_unknown_base_is_dropped() {
    let bases: BTreeMap<VkPipeline, VkPipeline> =
        [(VkPipeline(5), VkPipeline(99))].into_iter().collect();
    assert_eq!(pipeline_order(&bases), vec![slot(5, None)]);
}

#[test]
fn test_cycle_is_broken_in_handle_order() {
    let bases: BTreeMap<VkPipeline, VkPipeline> = [
        (VkPipeline(7), VkPipeline(8)),
        (VkPipeline(8), VkPipeline(7)),
        (VkPipeline(9), VkPipeline::NULL),
        (VkPipeline(10), VkPipeline(9)),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        pipeline_order(&bases),
        vec![slot(9, None), slot(10, Some(9)), slot(7, None), slot(8, None)]
    );
}

#[test]
fn test_derivative_of_cycle_keeps_its_base() {
    // 7 and 8 derive from each other; 11 derives from 8 and 12 from 11.
    let bases: BTreeMap<VkPipeline, VkPipeline> = [
        (VkPipeline(7), VkPipeline(8)),
        (VkPipeline(8), VkPipeline(7)),
        (VkPipeline(11), VkPipeline(8)),
        (VkPipeline(12), VkPipeline(11)),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        pipeline_order(&bases),
        vec![
            slot(7, None),
            slot(8, None),
            slot(11, Some(8)),
            slot(12, Some(11))
        ]
    );
}

#[test]
fn test_self_derived_pipeline_loses_its_base() {
    let bases: BTreeMap<VkPipeline, VkPipeline> = [
        (VkPipeline(3), VkPipeline(3)),
        (VkPipeline(4), VkPipeline(3)),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        pipeline_order(&bases),
        vec![slot(3, None), slot(4, Some(3))]
    );
}

#[test]
fn test_empty_order() {
    assert!(pipeline_order(&BTreeMap::new()).is_empty());
}

// ── Queries ─────────────────────────────────────────────────

#[test]
fn test_query_slot_commands() {
    let pool = VkQueryPool(4);
    let occlusion = vk::QueryType::OCCLUSION;

    assert!(slot_commands(pool, occlusion, 0, QueryStatus::Uninitialized).is_empty());

    let inactive = slot_commands(pool, occlusion, 2, QueryStatus::Inactive);
    assert_eq!(
        inactive,
        vec![CmdCall::ResetQueryPool {
            query_pool: pool,
            first_query: 2,
            query_count: 1,
        }]
    );

    let active: Vec<&str> = slot_commands(pool, occlusion, 0, QueryStatus::Active)
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(active, vec!["vkCmdResetQueryPool", "vkCmdBeginQuery"]);

    let complete: Vec<&str> = slot_commands(pool, occlusion, 0, QueryStatus::Complete)
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(
        complete,
        vec!["vkCmdResetQueryPool", "vkCmdBeginQuery", "vkCmdEndQuery"]
    );
}

#[test]
fn test_completed_timestamp_is_written() {
    let pool = VkQueryPool(4);
    let calls = slot_commands(pool, vk::QueryType::TIMESTAMP, 1, QueryStatus::Complete);
    assert_eq!(calls.len(), 2);
    match &calls[1] {
        CmdCall::WriteTimestamp {
            query_pool, query, ..
        } => {
            assert_eq!(*query_pool, pool);
            assert_eq!(*query, 1);
        }
        other => panic!("expected vkCmdWriteTimestamp, got {:?}", other),
    }
}

// ── Dense arrays ────────────────────────────────────────────

#[test]
fn test_dense_unpack() {
    let map: DenseMap<u32> = [(0, 10), (1, 11), (2, 12)].into_iter().collect();
    assert_eq!(unpack(&map).unwrap(), vec![10, 11, 12]);
    assert_eq!(unpack_with(&map, |v| u64::from(*v) * 2).unwrap(), vec![20, 22, 24]);
    assert!(unpack(&DenseMap::<u32>::new()).unwrap().is_empty());
}

#[test]
fn test_sparse_dense_map_is_rejected() {
    let map: DenseMap<u32> = [(0, 10), (2, 12)].into_iter().collect();
    match unpack(&map) {
        Err(RebuildError::Model(ModelError::SparseDenseMap { missing, len })) => {
            assert_eq!(missing, 1);
            assert_eq!(len, 2);
        }
        other => panic!("expected SparseDenseMap, got {:?}", other),
    }
}
