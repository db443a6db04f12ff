use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::error::CheckError;
use crate::host::HostCallbacks;
use crate::outcome::{CheckOutcome, CycleResult};
use crate::release::ReleaseEntry;
use crate::security::{SecurityGate, UrlPurpose};
use crate::select::{offers_update, select_candidate};
use crate::settings::SettingsStore;
use crate::skip::SkipPolicy;
use crate::traits::{Clock, EligibilityProbe, FeedSource, SystemClock};

/// Static facts about the host application.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Version of the running application, compared against the feed.
    pub current_version: String,
    pub security: SecurityGate,
}

impl EngineConfig {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            security: SecurityGate::default(),
        }
    }

    #[must_use]
    pub fn with_security(mut self, security: SecurityGate) -> Self {
        self.security = security;
        self
    }
}

/// Runs complete check cycles: fetch, select, apply policy, notify.
pub struct UpdateOrchestrator {
    config: EngineConfig,
    feed: Box<dyn FeedSource>,
    probe: Box<dyn EligibilityProbe>,
    settings: Arc<dyn SettingsStore>,
    host: Arc<HostCallbacks>,
    clock: Box<dyn Clock>,
}

impl UpdateOrchestrator {
    pub fn new(
        config: EngineConfig,
        feed: Box<dyn FeedSource>,
        probe: Box<dyn EligibilityProbe>,
        settings: Arc<dyn SettingsStore>,
        host: Arc<HostCallbacks>,
    ) -> Self {
        Self {
            config,
            feed,
            probe,
            settings,
            host,
            clock: Box::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    #[must_use]
    pub fn host(&self) -> &HostCallbacks {
        &self.host
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run one check cycle with the skip policy matching `force_show`.
    ///
    /// # Errors
    /// See [`run_cycle_with`](Self::run_cycle_with).
    pub fn run_cycle(&self, force_show: bool) -> CycleResult {
        let policy = if force_show {
            SkipPolicy::MANUAL
        } else {
            SkipPolicy::BACKGROUND
        };
        self.run_cycle_with(force_show, policy)
    }

    /// Run one check cycle and report its outcome to the host.
    ///
    /// At most one notification is sent. A failed cycle is reported to the
    /// host only when `force_show` is set, but the error is always returned.
    /// A panic inside a collaborator is converted into
    /// [`CheckError::Unknown`]. A panic inside a host handler is logged and
    /// does not change the returned result.
    ///
    /// # Errors
    /// Returns the error that aborted the cycle.
    pub fn run_cycle_with(&self, force_show: bool, policy: SkipPolicy) -> CycleResult {
        let result = catch_unwind(AssertUnwindSafe(|| self.evaluate(force_show, policy)))
            .unwrap_or_else(|panic| Err(CheckError::unknown(panic_message(panic.as_ref()))));

        match result {
            Ok(Some(outcome)) => {
                self.notify(|host| host.report(&outcome));
                Ok(Some(outcome))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                warn!("Update check failed: {error}");
                if force_show {
                    let transport = matches!(error, CheckError::Transport { .. });
                    let outcome = CheckOutcome::from_error(&error);
                    self.notify(|host| {
                        if transport {
                            host.feed_unavailable();
                        }
                        host.report(&outcome);
                    });
                }
                Err(error)
            }
        }
    }

    /// Call into the host, logging a handler panic instead of unwinding.
    pub(crate) fn notify(&self, send: impl FnOnce(&HostCallbacks)) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| send(&self.host))) {
            error!(
                "Host update handler panicked: {}",
                panic_message(panic.as_ref())
            );
        }
    }

    fn evaluate(
        &self,
        force_show: bool,
        policy: SkipPolicy,
    ) -> Result<Option<CheckOutcome>, CheckError> {
        let feed_url = self.settings.feed_url().ok_or(CheckError::Configuration)?;
        self.config.security.validate(&feed_url, UrlPurpose::Feed)?;

        info!("Checking for updates at {feed_url}");
        let headers = self.settings.http_headers();
        let bytes = self.feed.fetch(&feed_url, &headers)?;
        let entries = self.feed.parse(&bytes)?;
        debug!("Feed lists {} release(s)", entries.len());

        let baseline = self.probe.probe_server_baseline();
        if baseline.is_none() {
            warn!("Server version unavailable; no release is eligible");
        }

        let current = self.config.current_version.as_str();
        let Some(candidate) = select_candidate(entries, baseline.as_deref(), current) else {
            info!("No release in the feed applies to this server");
            return Ok(Some(CheckOutcome::NoUpdate));
        };

        self.validate_candidate_urls(&candidate)?;
        self.settings.set_last_check_time(self.clock.now())?;

        if !offers_update(&candidate, current) {
            info!("Already up to date ({current})");
            return Ok(Some(CheckOutcome::NoUpdate));
        }

        let skipped = self.settings.skip_version();
        if policy.should_skip(&candidate, skipped.as_deref(), force_show) {
            info!("Update {} skipped by user preference", candidate.version);
            return Ok(None);
        }

        info!(
            "Update available: {current} -> {}{}",
            candidate.version,
            if candidate.critical { " (critical)" } else { "" }
        );
        Ok(Some(self.offer(candidate)))
    }

    fn validate_candidate_urls(&self, candidate: &ReleaseEntry) -> Result<(), CheckError> {
        if let Some(url) = candidate.notes_url() {
            self.config.security.validate(url, UrlPurpose::ReleaseNotes)?;
        }
        if let Some(url) = candidate.installer_url() {
            self.config.security.validate(url, UrlPurpose::Download)?;
        }
        Ok(())
    }

    fn offer(&self, entry: ReleaseEntry) -> CheckOutcome {
        if entry.critical {
            CheckOutcome::CriticalUpdate { entry }
        } else {
            CheckOutcome::UpdateAvailable {
                entry,
                auto_install_allowed: self.settings.auto_install(),
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Unknown exception: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Unknown exception: {message}")
    } else {
        "Unknown exception".to_string()
    }
}
