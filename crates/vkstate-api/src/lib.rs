pub mod api;
pub mod blob;
pub mod error;
pub mod format;
pub mod handle;
pub mod observation;
pub mod packed;
pub mod recorded;
pub mod state;
pub mod sync_data;

pub use api::{ApiCommand, CmdCall, SurfacePlatform};
pub use blob::{BlobHash, BlobRef, BlobStore, MemoryBlobStore};
pub use error::ModelError;
pub use handle::{AnyHandle, Handle, HandleKind};
pub use observation::{
    CommandId, CommandSink, EmittedCommand, MemRange, MemoryView, ObservedData, Ptr, RangeList,
    ReadObservation,
};
pub use recorded::{DenseMap, RecordedCommand};
pub use state::State;
pub use sync_data::{SubCmdIdx, SubCommand, SyncData};
