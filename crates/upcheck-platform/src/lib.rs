//! Filesystem glue for upcheck: application paths, persisted update
//! settings and the update log.

mod logging;
mod paths;
mod store;

pub use logging::{DEFAULT_MAX_LOG_SIZE, LoggingOptions, init_logging, set_debug_logging};
pub use paths::{AppPaths, AppPathsError};
pub use store::JsonSettingsStore;
