use thiserror::Error;

use crate::handle::HandleKind;

/// Inconsistencies detected while reading a captured state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("dense map is missing key {missing} of {len}")]
    SparseDenseMap { missing: u32, len: usize },

    #[error("unknown format {0}")]
    UnknownFormat(i32),

    #[error("{kind} {handle:#x} is not in the captured state")]
    MissingObject { kind: HandleKind, handle: u64 },

    #[error("read of {size} bytes at {addr:#x} is not covered by any observation")]
    UnobservedRead { addr: u64, size: u64 },
}
