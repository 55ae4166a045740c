//! Mapping from captured submissions to the sub-commands they execute.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observation::CommandId;

/// Position of a command inside a submission:
/// `[submit, primary buffer, command, secondary buffer, secondary command]`,
/// truncated to the depth it addresses.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubCmdIdx(pub Vec<u64>);

impl SubCmdIdx {
    pub fn new(idx: impl Into<Vec<u64>>) -> Self {
        Self(idx.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<u64> {
        self.0.get(i).copied()
    }
}

impl fmt::Debug for SubCmdIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// One sub-command of a captured submission and the trace position at which
/// it counts as executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCommand {
    pub index: SubCmdIdx,
    pub id: CommandId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncData {
    /// Submission command id to its sub-commands, in execution order.
    pub command_ranges: BTreeMap<CommandId, Vec<SubCommand>>,
}

impl SyncData {
    pub fn sub_commands(&self, submit: CommandId) -> Option<&[SubCommand]> {
        self.command_ranges.get(&submit).map(Vec::as_slice)
    }
}
