//! Background update checks for desktop applications.
//!
//! [`Updater`] fetches a release feed, picks the release that suits this
//! installation and tells the host application about it through
//! [`HostCallbacks`]. Checks run periodically, once in the background, or on
//! the user's request.
//!
//! ```no_run
//! use upcheck::{HostCallbacks, Updater};
//!
//! let host = HostCallbacks::new().on_update_available(|release, _auto_install| {
//!     println!("Version {} is available", release.version);
//! });
//!
//! let updater = Updater::builder(env!("CARGO_PKG_VERSION"))
//!     .app_name("example-app")
//!     .default_feed_url("https://updates.example.com/feed.json")
//!     .available_host(|| Some("https://server.example.com".to_string()))
//!     .host(host)
//!     .build()?;
//! updater.set_check_enabled(true)?;
//! updater.start()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod error;
mod updater;

pub use builder::UpdaterBuilder;
pub use error::UpdaterError;
pub use updater::Updater;

pub use upcheck_core::{
    CheckError, CheckMode, CheckOutcome, CycleResult, EligibilityProbe, ErrorKind, FeedError,
    FeedSource, FixedBaseline, HostCallbacks, MemorySettings, ReleaseEntry, SettingsError,
    SettingsStore, UpdateSettings, compare_versions,
};
pub use upcheck_http::{HttpSettings, ProbeSettings};
pub use upcheck_platform::{AppPaths, JsonSettingsStore, LoggingOptions, set_debug_logging};
