use std::cell::Cell;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};

use crate::cycle::UpdateOrchestrator;
use crate::host::HostCallbacks;
use crate::outcome::CycleResult;
use crate::settings::{MIN_CHECK_INTERVAL_SECS, SettingsStore};
use crate::skip::SkipPolicy;

/// How long the periodic checker sleeps while checking is disabled.
pub const DISABLED_RECHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

const MIN_INTERVAL: NonZeroU64 = NonZeroU64::new(MIN_CHECK_INTERVAL_SECS).unwrap();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Check whenever the configured interval has elapsed, until cancelled.
    Periodic,
    /// One user-initiated check that always reports its outcome.
    Manual,
    /// One silent background check.
    OneShot,
}

impl CheckMode {
    #[must_use]
    pub fn force_show(self) -> bool {
        matches!(self, Self::Manual)
    }

    #[must_use]
    pub fn skip_policy(self) -> SkipPolicy {
        if self.force_show() {
            SkipPolicy::MANUAL
        } else {
            SkipPolicy::BACKGROUND
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            Self::Periodic => "upcheck-periodic",
            Self::Manual => "upcheck-manual",
            Self::OneShot => "upcheck-oneshot",
        }
    }
}

/// What the periodic checker does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Run a cycle now, then sleep for `then_wait`.
    RunNow { then_wait: Duration },
    /// Sleep without checking.
    Wait(Duration),
}

/// Snapshot of the scheduling inputs for one turn of the checker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    pub last_check_time: Option<DateTime<Utc>>,
    pub interval_secs: NonZeroU64,
    pub mode: CheckMode,
}

impl SchedulerState {
    #[must_use]
    pub fn new(
        last_check_time: Option<DateTime<Utc>>,
        interval: Duration,
        mode: CheckMode,
    ) -> Self {
        let interval_secs = NonZeroU64::new(interval.as_secs()).unwrap_or(MIN_INTERVAL);
        Self {
            last_check_time,
            interval_secs,
            mode,
        }
    }

    /// Read the durable scheduling state from the settings store.
    #[must_use]
    pub fn snapshot(settings: &dyn SettingsStore, mode: CheckMode) -> Self {
        let stored = settings.load();
        Self::new(stored.last_check_time, stored.check_interval(), mode)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.get())
    }

    /// Decide the next step for an enabled checker at `now`.
    ///
    /// A checker that never ran counts its last check from the Unix epoch, so
    /// it is always due.
    #[must_use]
    pub fn next_step(&self, now: DateTime<Utc>) -> NextStep {
        let last = self.last_check_time.map_or(0, |at| at.timestamp());
        let interval = i64::try_from(self.interval_secs.get()).unwrap_or(i64::MAX);
        let next_check = last.saturating_add(interval);
        let now = now.timestamp();

        if now >= next_check {
            NextStep::RunNow {
                then_wait: self.interval(),
            }
        } else {
            let remaining = u64::try_from(next_check - now).unwrap_or(u64::MAX);
            NextStep::Wait(Duration::from_secs(remaining))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Elapsed,
    Cancelled,
}

/// Receiving side of a checker's cancellation signal.
///
/// A signal sent before the wait starts is not lost, and dropping the
/// [`CheckerHandle`] cancels as well. Once observed, cancellation sticks.
#[derive(Debug)]
pub struct CancelToken {
    signal: Receiver<()>,
    cancelled: Cell<bool>,
}

impl CancelToken {
    #[must_use]
    pub fn pair() -> (Sender<()>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (
            tx,
            Self {
                signal: rx,
                cancelled: Cell::new(false),
            },
        )
    }

    /// Sleep for `timeout` unless cancelled first.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> WaitResult {
        if self.cancelled.get() {
            return WaitResult::Cancelled;
        }

        match self.signal.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => WaitResult::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.cancelled.set(true);
                WaitResult::Cancelled
            }
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if !self.cancelled.get() && !matches!(self.signal.try_recv(), Err(TryRecvError::Empty)) {
            self.cancelled.set(true);
        }
        self.cancelled.get()
    }
}

/// Runs check cycles on a dedicated thread according to a [`CheckMode`].
pub struct CheckScheduler {
    orchestrator: Arc<UpdateOrchestrator>,
    mode: CheckMode,
}

impl CheckScheduler {
    #[must_use]
    pub fn new(orchestrator: Arc<UpdateOrchestrator>, mode: CheckMode) -> Self {
        Self { orchestrator, mode }
    }

    /// Start the checker thread.
    ///
    /// Returns once the thread has signalled that it is running; no network
    /// access happens before that.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(self) -> std::io::Result<CheckerHandle> {
        let (cancel, token) = CancelToken::pair();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let mode = self.mode;

        let thread = std::thread::Builder::new()
            .name(mode.thread_name().to_string())
            .spawn(move || {
                let _ = ready_tx.send(());
                self.run(&token)
            })?;

        let _ = ready_rx.recv();
        debug!("{mode:?} checker started");

        Ok(CheckerHandle {
            mode,
            cancel: Some(cancel),
            thread: Some(thread),
        })
    }

    /// Run the checker on the current thread until it finishes or `token` is
    /// cancelled. Single-shot modes return their cycle's result.
    pub fn run(&self, token: &CancelToken) -> Option<CycleResult> {
        match self.mode {
            CheckMode::Periodic => {
                self.run_periodic(token);
                None
            }
            CheckMode::Manual | CheckMode::OneShot => Some(self.run_once()),
        }
    }

    fn run_once(&self) -> CycleResult {
        if self.mode == CheckMode::Manual {
            self.orchestrator.notify(HostCallbacks::check_started);
        }

        let result = self
            .orchestrator
            .run_cycle_with(self.mode.force_show(), self.mode.skip_policy());
        if let Err(error) = &result {
            warn!("{:?} update check failed: {error}", self.mode);
        }
        result
    }

    fn run_periodic(&self, token: &CancelToken) {
        loop {
            let sleep = self.periodic_turn(token);
            if token.wait(sleep) == WaitResult::Cancelled {
                info!("Periodic update checks stopped");
                return;
            }
        }
    }

    fn periodic_turn(&self, token: &CancelToken) -> Duration {
        let settings = self.orchestrator.settings();
        if !settings.check_enabled() {
            debug!("Automatic update checks are disabled");
            return DISABLED_RECHECK_INTERVAL;
        }

        let state = SchedulerState::snapshot(settings, self.mode);
        match state.next_step(self.orchestrator.now()) {
            NextStep::Wait(remaining) => {
                debug!("Next update check in {}s", remaining.as_secs());
                remaining
            }
            NextStep::RunNow { then_wait } => {
                if token.is_cancelled() {
                    return Duration::ZERO;
                }
                if let Err(error) = self
                    .orchestrator
                    .run_cycle_with(false, SkipPolicy::BACKGROUND)
                {
                    warn!("Background update check failed: {error}");
                }
                then_wait
            }
        }
    }
}

/// Owner of a running checker thread.
///
/// Dropping the handle cancels the checker without waiting for it.
#[derive(Debug)]
pub struct CheckerHandle {
    mode: CheckMode,
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<Option<CycleResult>>>,
}

impl CheckerHandle {
    #[must_use]
    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Signal the checker to stop at its next wait.
    pub fn cancel(&self) {
        if let Some(cancel) = &self.cancel {
            let _ = cancel.try_send(());
        }
    }

    /// Wait for the checker thread to exit.
    ///
    /// Returns the cycle result of a single-shot checker, `None` for a
    /// periodic one or if the thread panicked.
    pub fn join(mut self) -> Option<CycleResult> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(result) => result,
            Err(_) => {
                warn!("{:?} checker thread panicked", self.mode);
                None
            }
        }
    }

    /// Cancel and wait for the checker thread.
    pub fn stop(self) -> Option<CycleResult> {
        self.cancel();
        self.join()
    }
}

impl Drop for CheckerHandle {
    fn drop(&mut self) {
        self.cancel();
        self.cancel.take();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::{CancelToken, CheckMode, NextStep, SchedulerState, WaitResult};
    use crate::skip::SkipPolicy;

    fn at(secs: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    const T: i64 = 1_700_000_000;

    #[test]
    fn waits_for_remaining_interval() {
        let state =
            SchedulerState::new(Some(at(T)), Duration::from_secs(3600), CheckMode::Periodic);

        assert_eq!(
            state.next_step(at(T + 1800)),
            NextStep::Wait(Duration::from_secs(1800))
        );
    }

    #[test]
    fn runs_when_interval_elapsed_then_waits_full_interval() {
        let state =
            SchedulerState::new(Some(at(T)), Duration::from_secs(3600), CheckMode::Periodic);

        assert_eq!(
            state.next_step(at(T + 3600)),
            NextStep::RunNow {
                then_wait: Duration::from_secs(3600)
            }
        );
    }

    #[test]
    fn never_checked_is_due_immediately() {
        let state = SchedulerState::new(None, Duration::from_secs(86_400), CheckMode::Periodic);

        assert!(matches!(state.next_step(at(T)), NextStep::RunNow { .. }));
    }

    #[test]
    fn zero_interval_is_replaced_by_minimum() {
        let state = SchedulerState::new(None, Duration::ZERO, CheckMode::Periodic);

        assert_eq!(state.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn mode_determines_force_show_and_skip_policy() {
        assert!(CheckMode::Manual.force_show());
        assert!(!CheckMode::OneShot.force_show());
        assert!(!CheckMode::Periodic.force_show());
        assert_eq!(CheckMode::Manual.skip_policy(), SkipPolicy::MANUAL);
        assert_eq!(CheckMode::OneShot.skip_policy(), SkipPolicy::BACKGROUND);
    }

    #[test]
    fn signal_before_wait_cancels_immediately() {
        let (cancel, token) = CancelToken::pair();
        cancel.send(()).unwrap();

        assert_eq!(token.wait(Duration::from_secs(3600)), WaitResult::Cancelled);
    }

    #[test]
    fn dropped_sender_cancels_wait() {
        let (cancel, token) = CancelToken::pair();
        drop(cancel);

        assert_eq!(token.wait(Duration::from_secs(3600)), WaitResult::Cancelled);
        assert!(token.is_cancelled());
    }

    #[test]
    fn observed_cancellation_sticks() {
        let (cancel, token) = CancelToken::pair();
        cancel.send(()).unwrap();

        assert!(token.is_cancelled());
        assert_eq!(token.wait(Duration::from_secs(3600)), WaitResult::Cancelled);
    }

    #[test]
    fn wait_elapses_without_signal() {
        let (_cancel, token) = CancelToken::pair();

        assert_eq!(token.wait(Duration::from_millis(10)), WaitResult::Elapsed);
        assert!(!token.is_cancelled());
    }
}
