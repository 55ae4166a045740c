use vkstate_api::handle::{AnyHandle, HandleKind, VkDevice};
use vkstate_api::{BlobHash, ModelError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RebuildError {
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),

    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("dangling reference to {kind} {handle:#x}")]
    DanglingReference { kind: HandleKind, handle: u64 },

    #[error("{0} is sparse-bound but not fully bound")]
    PartialSparseBinding(AnyHandle),

    #[error("no queue on {device:?} supports flags {flags:#x}")]
    NoEligibleQueue { flags: u32, device: VkDevice },

    #[error("scratch task has nothing to commit")]
    EmptyScratchTask,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("captured blob {0} is missing")]
    MissingBlob(BlobHash),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl RebuildError {
    pub fn dangling(handle: impl Into<AnyHandle>) -> Self {
        let handle = handle.into();
        RebuildError::DanglingReference {
            kind: handle.kind,
            handle: handle.raw,
        }
    }

    /// Fatal errors abort the run; the rest are logged and the rebuilder
    /// carries on with what it can emit.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RebuildError::UnsupportedVariant(_)
                | RebuildError::InvariantViolation(_)
                | RebuildError::Model(_)
        )
    }
}
