use std::fmt;
use std::path::Path;

use crate::error::ErrorKind;
use crate::outcome::CheckOutcome;
use crate::release::ReleaseEntry;

type Handler = Box<dyn Fn() + Send + Sync>;
type Query = Box<dyn Fn() -> bool + Send + Sync>;
type UpdateHandler = Box<dyn Fn(&ReleaseEntry, bool) + Send + Sync>;
type CriticalHandler = Box<dyn Fn(&ReleaseEntry) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(ErrorKind, &str) + Send + Sync>;
type InstallerHandler = Box<dyn Fn(&Path, &str) -> bool + Send + Sync>;

/// Notification handlers registered by the host application.
///
/// Every handler is optional. Without a handler the event is not reported,
/// except for the queries: `is_ready_to_shutdown` answers `true`,
/// `request_shutdown` does nothing and `run_installer` declines.
///
/// Handlers run synchronously on the checker thread; marshalling onto a UI
/// thread is up to the host.
#[derive(Default)]
pub struct HostCallbacks {
    check_started: Option<Handler>,
    no_update: Option<Handler>,
    update_available: Option<UpdateHandler>,
    critical_update: Option<CriticalHandler>,
    error: Option<ErrorHandler>,
    feed_unavailable: Option<Handler>,
    ready_to_shutdown: Option<Query>,
    shutdown_request: Option<Handler>,
    installer: Option<InstallerHandler>,
}

impl HostCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a manual check starts, before any network access.
    #[must_use]
    pub fn on_check_started(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.check_started = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_no_update(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.no_update = Some(Box::new(handler));
        self
    }

    /// The flag passed to the handler tells whether the host may install
    /// without asking.
    #[must_use]
    pub fn on_update_available(
        mut self,
        handler: impl Fn(&ReleaseEntry, bool) + Send + Sync + 'static,
    ) -> Self {
        self.update_available = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_critical_update(
        mut self,
        handler: impl Fn(&ReleaseEntry) + Send + Sync + 'static,
    ) -> Self {
        self.critical_update = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_error(mut self, handler: impl Fn(ErrorKind, &str) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(handler));
        self
    }

    /// Called in addition to the error handler when a user-initiated check
    /// could not download the feed.
    #[must_use]
    pub fn on_feed_unavailable(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.feed_unavailable = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn ready_to_shutdown(mut self, query: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.ready_to_shutdown = Some(Box::new(query));
        self
    }

    #[must_use]
    pub fn on_shutdown_request(mut self, handler: impl Fn() + Send + Sync + 'static) -> Self {
        self.shutdown_request = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn run_installer_with(
        mut self,
        handler: impl Fn(&Path, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.installer = Some(Box::new(handler));
        self
    }

    /// Deliver a check outcome to the matching handler, if any.
    pub fn report(&self, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::NoUpdate => call(self.no_update.as_ref()),
            CheckOutcome::UpdateAvailable {
                entry,
                auto_install_allowed,
            } => {
                if let Some(handler) = &self.update_available {
                    handler(entry, *auto_install_allowed);
                }
            }
            CheckOutcome::CriticalUpdate { entry } => {
                if let Some(handler) = &self.critical_update {
                    handler(entry);
                }
            }
            CheckOutcome::Error { kind, message } => {
                if let Some(handler) = &self.error {
                    handler(*kind, message);
                }
            }
        }
    }

    pub fn check_started(&self) {
        call(self.check_started.as_ref());
    }

    pub fn feed_unavailable(&self) {
        call(self.feed_unavailable.as_ref());
    }

    #[must_use]
    pub fn is_ready_to_shutdown(&self) -> bool {
        self.ready_to_shutdown.as_ref().is_none_or(|query| query())
    }

    pub fn request_shutdown(&self) {
        call(self.shutdown_request.as_ref());
    }

    /// Ask the host to launch a downloaded installer.
    ///
    /// Returns whether the host accepted; `false` without a handler.
    #[must_use]
    pub fn run_installer(&self, path: &Path, arguments: &str) -> bool {
        self.installer
            .as_ref()
            .is_some_and(|handler| handler(path, arguments))
    }
}

fn call(handler: Option<&Handler>) {
    if let Some(handler) = handler {
        handler();
    }
}

impl fmt::Debug for HostCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCallbacks")
            .field("check_started", &self.check_started.is_some())
            .field("no_update", &self.no_update.is_some())
            .field("update_available", &self.update_available.is_some())
            .field("critical_update", &self.critical_update.is_some())
            .field("error", &self.error.is_some())
            .field("feed_unavailable", &self.feed_unavailable.is_some())
            .field("ready_to_shutdown", &self.ready_to_shutdown.is_some())
            .field("shutdown_request", &self.shutdown_request.is_some())
            .field("installer", &self.installer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::HostCallbacks;
    use crate::error::ErrorKind;
    use crate::outcome::CheckOutcome;
    use crate::release::ReleaseEntry;

    #[test]
    fn absent_handlers_fall_back_to_documented_defaults() {
        let host = HostCallbacks::new();

        assert!(host.is_ready_to_shutdown());
        assert!(!host.run_installer(Path::new("/tmp/setup.exe"), "/quiet"));
        host.request_shutdown();
        host.report(&CheckOutcome::NoUpdate);
    }

    #[test]
    fn report_routes_each_outcome_to_its_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c, d) = (seen.clone(), seen.clone(), seen.clone(), seen.clone());
        let host = HostCallbacks::new()
            .on_no_update(move || a.lock().unwrap().push("none".to_string()))
            .on_update_available(move |entry, auto| {
                b.lock().unwrap().push(format!("update {} {auto}", entry.version));
            })
            .on_critical_update(move |entry| {
                c.lock().unwrap().push(format!("critical {}", entry.version));
            })
            .on_error(move |kind, message| {
                d.lock().unwrap().push(format!("{kind:?}: {message}"));
            });

        host.report(&CheckOutcome::NoUpdate);
        host.report(&CheckOutcome::UpdateAvailable {
            entry: ReleaseEntry::new("2.0"),
            auto_install_allowed: true,
        });
        host.report(&CheckOutcome::CriticalUpdate {
            entry: ReleaseEntry::new("2.1"),
        });
        host.report(&CheckOutcome::Error {
            kind: ErrorKind::Parse,
            message: "bad feed".to_string(),
        });

        assert_eq!(
            *seen.lock().unwrap(),
            ["none", "update 2.0 true", "critical 2.1", "Parse: bad feed"]
        );
    }

    #[test]
    fn registered_queries_override_defaults() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let counter = shutdowns.clone();
        let host = HostCallbacks::new()
            .ready_to_shutdown(|| false)
            .on_shutdown_request(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .run_installer_with(|path, args| path.ends_with("setup.exe") && args == "/quiet");

        assert!(!host.is_ready_to_shutdown());
        host.request_shutdown();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(host.run_installer(Path::new("/tmp/setup.exe"), "/quiet"));
        assert!(!host.run_installer(Path::new("/tmp/other.exe"), "/quiet"));
    }
}
