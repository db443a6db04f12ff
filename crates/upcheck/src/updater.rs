use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info};
use upcheck_core::{
    CheckMode, CheckScheduler, CheckerHandle, CycleResult, HostCallbacks, SettingsError,
    SettingsStore, UpdateOrchestrator,
};

use crate::builder::UpdaterBuilder;
use crate::error::UpdaterError;

/// Host-facing entry point for update checks.
///
/// Checks run on their own threads. At most one periodic checker runs at a
/// time; single checks may overlap with it. Dropping the updater cancels
/// every checker without waiting; call [`cleanup`](Self::cleanup) to wait.
pub struct Updater {
    orchestrator: Arc<UpdateOrchestrator>,
    workers: Mutex<Vec<CheckerHandle>>,
}

impl Updater {
    #[must_use]
    pub fn builder(current_version: impl Into<String>) -> UpdaterBuilder {
        UpdaterBuilder::new(current_version)
    }

    pub(crate) fn from_orchestrator(orchestrator: UpdateOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Start periodic checking, replacing a periodic checker that is
    /// already running.
    ///
    /// # Errors
    /// Returns an error if the checker thread cannot be spawned.
    pub fn start(&self) -> Result<(), UpdaterError> {
        for handle in self
            .workers()
            .iter()
            .filter(|handle| handle.mode() == CheckMode::Periodic)
        {
            debug!("Replacing running periodic checker");
            handle.cancel();
        }
        let handle = self.spawn(CheckMode::Periodic)?;
        self.workers().push(handle);
        Ok(())
    }

    /// Check once in the background, reporting only actionable outcomes.
    ///
    /// # Errors
    /// Returns an error if the checker thread cannot be spawned.
    pub fn check_silently(&self) -> Result<(), UpdaterError> {
        let handle = self.spawn(CheckMode::OneShot)?;
        self.workers().push(handle);
        Ok(())
    }

    /// Check once on behalf of the user: every outcome is reported and a
    /// skipped version is shown again.
    ///
    /// # Errors
    /// Returns an error if the checker thread cannot be spawned.
    pub fn check_with_ui(&self) -> Result<(), UpdaterError> {
        let handle = self.spawn(CheckMode::Manual)?;
        self.workers().push(handle);
        Ok(())
    }

    /// Run one cycle on the calling thread.
    ///
    /// # Errors
    /// Returns the error that aborted the cycle.
    pub fn check_now(&self, force_show: bool) -> CycleResult {
        self.orchestrator.run_cycle(force_show)
    }

    /// Whether any checker thread is still running.
    #[must_use]
    pub fn is_checking(&self) -> bool {
        self.workers()
            .iter()
            .any(|handle| !handle.is_finished())
    }

    /// Cancel every checker and wait for the threads to exit.
    pub fn cleanup(&self) {
        let handles = std::mem::take(&mut *self.workers());
        for handle in &handles {
            handle.cancel();
        }
        let count = handles.len();
        for handle in handles {
            let _ = handle.join();
        }
        if count > 0 {
            info!("Stopped {count} update checker(s)");
        }
    }

    #[must_use]
    pub fn settings(&self) -> &dyn SettingsStore {
        self.orchestrator.settings()
    }

    #[must_use]
    pub fn host(&self) -> &HostCallbacks {
        self.orchestrator.host()
    }

    /// Hide `version` from future background checks.
    ///
    /// # Errors
    /// Returns an error when the preference cannot be persisted.
    pub fn skip_version(&self, version: &str) -> Result<(), SettingsError> {
        info!("Skipping update {version}");
        self.settings().set_skip_version(Some(version))
    }

    /// # Errors
    /// Returns an error when the setting cannot be persisted.
    pub fn set_feed_url(&self, url: &str) -> Result<(), SettingsError> {
        self.settings().set_feed_url(Some(url))
    }

    /// # Errors
    /// Returns an error when the setting cannot be persisted.
    pub fn set_check_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.settings().set_check_enabled(enabled)
    }

    /// Values below one hour are raised to one hour when used.
    ///
    /// # Errors
    /// Returns an error when the setting cannot be persisted.
    pub fn set_check_interval(&self, interval: Duration) -> Result<(), SettingsError> {
        self.settings().set_check_interval(interval)
    }

    /// # Errors
    /// Returns an error when the setting cannot be persisted.
    pub fn set_auto_install(&self, enabled: bool) -> Result<(), SettingsError> {
        self.settings().set_auto_install(enabled)
    }

    /// Send an extra header with every feed request.
    ///
    /// # Errors
    /// Returns an error when the setting cannot be persisted.
    pub fn set_http_header(&self, name: &str, value: &str) -> Result<(), SettingsError> {
        self.settings().set_http_header(name, value)
    }

    #[must_use]
    pub fn is_ready_to_shutdown(&self) -> bool {
        self.host().is_ready_to_shutdown()
    }

    pub fn request_shutdown(&self) {
        self.host().request_shutdown();
    }

    #[must_use]
    pub fn run_installer(&self, path: &Path, arguments: &str) -> bool {
        self.host().run_installer(path, arguments)
    }

    fn spawn(&self, mode: CheckMode) -> Result<CheckerHandle, UpdaterError> {
        self.prune_finished();
        CheckScheduler::new(Arc::clone(&self.orchestrator), mode)
            .spawn()
            .map_err(UpdaterError::Spawn)
    }

    fn prune_finished(&self) {
        let finished: Vec<CheckerHandle> = {
            let mut workers = self.workers();
            let (done, running) = std::mem::take(&mut *workers)
                .into_iter()
                .partition(CheckerHandle::is_finished);
            *workers = running;
            done
        };
        for handle in finished {
            let _ = handle.join();
        }
    }

    fn workers(&self) -> std::sync::MutexGuard<'_, Vec<CheckerHandle>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("config", self.orchestrator.config())
            .field("workers", &self.workers().len())
            .finish()
    }
}
