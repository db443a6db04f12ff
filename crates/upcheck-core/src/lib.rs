//! Update decision engine for upcheck.
//!
//! This crate owns the logic that decides whether a host application should
//! be told about an update. It performs no I/O of its own:
//! - Version comparison over mixed numeric and textual tokens.
//! - Eligibility filtering and candidate selection over a release feed.
//! - Skip policy, URL security gate and the check cycle orchestrator.
//! - Scheduling of periodic, manual and one-shot checker threads.
//!
//! Transport, persistence and logging setup live in `upcheck-http` and
//! `upcheck-platform`.

mod cycle;
mod error;
mod host;
mod outcome;
mod release;
mod schedule;
mod security;
mod select;
mod settings;
mod skip;
mod traits;
mod version;

pub use cycle::{EngineConfig, UpdateOrchestrator};
pub use error::{CheckError, ErrorKind, FeedError, SettingsError};
pub use host::HostCallbacks;
pub use outcome::{CheckOutcome, CycleResult};
pub use release::ReleaseEntry;
pub use schedule::{
    CancelToken, CheckMode, CheckScheduler, CheckerHandle, DISABLED_RECHECK_INTERVAL, NextStep,
    SchedulerState, WaitResult,
};
pub use security::{SecurityGate, UrlPurpose};
pub use select::{filter_eligible, offers_update, pick_candidate, select_candidate};
pub use settings::{
    DEFAULT_CHECK_INTERVAL_SECS, MIN_CHECK_INTERVAL_SECS, MemorySettings, SettingsStore,
    UpdateSettings,
};
pub use skip::SkipPolicy;
pub use traits::{Clock, EligibilityProbe, FeedSource, FixedBaseline, SystemClock};
pub use version::{TokenKind, Version, VersionToken, compare_versions};
