//! Emitted commands and the memory they read and write.

use std::fmt;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::api::ApiCommand;
use crate::blob::{BlobRef, BlobStore};
use crate::error::ModelError;

/// An address in the replay address space.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ptr(pub u64);

impl Ptr {
    pub const NULL: Ptr = Ptr(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, by: u64) -> Ptr {
        Ptr(self.0 + by)
    }
}

impl fmt::Debug for Ptr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ptr({:#x})", self.0)
    }
}

/// Sequence number of an emitted command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemRange {
    pub base: u64,
    pub size: u64,
}

impl MemRange {
    pub fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, other: &MemRange) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }
}

/// Sorted, non-overlapping, coalesced address ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeList(Vec<MemRange>);

impl RangeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `range`, coalescing it with every range it overlaps or touches.
    pub fn merge(&mut self, range: MemRange) {
        if range.size == 0 {
            return;
        }
        let mut base = range.base;
        let mut end = range.end();
        let first = self.0.partition_point(|r| r.end() < base);
        let mut last = first;
        while last < self.0.len() && self.0[last].base <= end {
            base = base.min(self.0[last].base);
            end = end.max(self.0[last].end());
            last += 1;
        }
        self.0
            .splice(first..last, std::iter::once(MemRange::new(base, end - base)));
    }

    pub fn ranges(&self) -> &[MemRange] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Source of the bytes a read observation supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservedData {
    /// A payload synthesized by the rebuilder.
    Bytes(Vec<u8>),
    /// A slice of the captured blob corpus.
    Blob(BlobRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadObservation {
    pub range: MemRange,
    pub data: ObservedData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedCommand {
    pub id: CommandId,
    pub command: ApiCommand,
    pub reads: Vec<ReadObservation>,
    pub writes: Vec<MemRange>,
    /// `VkResult`; creates always report `VK_SUCCESS`.
    pub result: i32,
}

impl EmittedCommand {
    pub fn name(&self) -> &str {
        self.command.name()
    }

    /// View of the memory this command reads.
    pub fn memory<'a>(&'a self, blobs: &'a dyn BlobStore) -> MemoryView<'a> {
        MemoryView {
            reads: &self.reads,
            blobs,
        }
    }
}

/// Resolves addresses against a command's read observations.
pub struct MemoryView<'a> {
    reads: &'a [ReadObservation],
    blobs: &'a dyn BlobStore,
}

impl MemoryView<'_> {
    pub fn bytes(&self, addr: Ptr, size: u64) -> Result<Vec<u8>, ModelError> {
        let want = MemRange::new(addr.0, size);
        let unobserved = ModelError::UnobservedRead { addr: addr.0, size };
        let obs = self
            .reads
            .iter()
            .rev()
            .find(|r| r.range.contains(&want))
            .ok_or_else(|| unobserved.clone())?;
        let start = addr.0 - obs.range.base;
        match &obs.data {
            ObservedData::Bytes(bytes) => {
                let start = usize::try_from(start).map_err(|_| unobserved.clone())?;
                let end = start + usize::try_from(size).map_err(|_| unobserved.clone())?;
                bytes.get(start..end).map(|b| b.to_vec()).ok_or(unobserved)
            }
            ObservedData::Blob(blob) => self
                .blobs
                .read(&blob.slice(start, size))
                .filter(|b| b.len() as u64 == size)
                .ok_or(unobserved),
        }
    }

    pub fn read<T: Pod>(&self, addr: Ptr) -> Result<T, ModelError> {
        let bytes = self.bytes(addr, std::mem::size_of::<T>() as u64)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    pub fn read_slice<T: Pod>(&self, addr: Ptr, count: u64) -> Result<Vec<T>, ModelError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let elem = std::mem::size_of::<T>();
        let bytes = self.bytes(addr, elem as u64 * count)?;
        Ok(bytes.chunks_exact(elem).map(bytemuck::pod_read_unaligned).collect())
    }
}

/// Receives the emitted command stream.
pub trait CommandSink {
    fn emit(&mut self, cmd: EmittedCommand);
}

impl CommandSink for Vec<EmittedCommand> {
    fn emit(&mut self, cmd: EmittedCommand) {
        self.push(cmd);
    }
}
