pub mod buffer_primer;
pub mod cmd_rebuild;
pub mod commands;
pub mod dense;
pub mod emitter;
pub mod image_primer;
pub mod query_pool;
pub mod queue_select;
pub mod recorder;
pub mod scratch;
pub mod state_rebuilder;
pub mod terminator;

pub use emitter::{Emitter, NewState};
pub use state_rebuilder::{pipeline_order, rebuild_state, PipelineSlot, RebuildOutput, Skipped};
pub use terminator::{Phase, Terminator};
