pub mod config;
pub mod error;
pub mod handle_map;

pub use config::RebuildConfig;
pub use error::RebuildError;
pub use handle_map::HandleAllocator;
