use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Interval between periodic checks when none is configured: one day.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Shorter configured intervals are raised to one hour.
pub const MIN_CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Persisted update configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    #[serde(default)]
    pub feed_url: Option<String>,

    #[serde(default)]
    pub last_check_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub check_enabled: bool,

    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    #[serde(default)]
    pub skip_version: Option<String>,

    #[serde(default)]
    pub auto_install: bool,

    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            feed_url: None,
            last_check_time: None,
            check_enabled: false,
            check_interval_secs: default_check_interval(),
            skip_version: None,
            auto_install: false,
            http_headers: BTreeMap::new(),
        }
    }
}

impl UpdateSettings {
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(MIN_CHECK_INTERVAL_SECS))
    }
}

/// Typed access to the durable update settings.
///
/// Implementors provide [`load`](Self::load) and [`modify`](Self::modify);
/// `modify` must apply the change and persist it under a single lock so
/// concurrent checkers never interleave read-modify-write cycles.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> UpdateSettings;

    /// Apply `change` to the stored settings.
    ///
    /// # Errors
    /// Returns an error when the updated settings cannot be persisted.
    fn modify(&self, change: &mut dyn FnMut(&mut UpdateSettings)) -> Result<(), SettingsError>;

    fn feed_url(&self) -> Option<String> {
        self.load().feed_url.filter(|url| !url.is_empty())
    }

    fn last_check_time(&self) -> Option<DateTime<Utc>> {
        self.load().last_check_time
    }

    fn check_enabled(&self) -> bool {
        self.load().check_enabled
    }

    fn check_interval(&self) -> Duration {
        self.load().check_interval()
    }

    fn skip_version(&self) -> Option<String> {
        self.load().skip_version
    }

    fn auto_install(&self) -> bool {
        self.load().auto_install
    }

    fn http_headers(&self) -> Vec<(String, String)> {
        self.load().http_headers.into_iter().collect()
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_feed_url(&self, url: Option<&str>) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.feed_url = url.map(str::to_string))
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_last_check_time(&self, at: DateTime<Utc>) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.last_check_time = Some(at))
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_check_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.check_enabled = enabled)
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_check_interval(&self, interval: Duration) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.check_interval_secs = interval.as_secs())
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_skip_version(&self, version: Option<&str>) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.skip_version = version.map(str::to_string))
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_auto_install(&self, enabled: bool) -> Result<(), SettingsError> {
        self.modify(&mut |settings| settings.auto_install = enabled)
    }

    /// # Errors
    /// Propagates persistence failures from [`modify`](Self::modify).
    fn set_http_header(&self, name: &str, value: &str) -> Result<(), SettingsError> {
        self.modify(&mut |settings| {
            settings
                .http_headers
                .insert(name.to_string(), value.to_string());
        })
    }
}

/// Process-local settings, for hosts that persist configuration themselves.
#[derive(Debug, Default)]
pub struct MemorySettings {
    settings: Mutex<UpdateSettings>,
}

impl MemorySettings {
    #[must_use]
    pub fn new(settings: UpdateSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> UpdateSettings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn modify(&self, change: &mut dyn FnMut(&mut UpdateSettings)) -> Result<(), SettingsError> {
        let mut guard = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut guard);
        Ok(())
    }
}
