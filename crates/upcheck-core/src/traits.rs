use chrono::{DateTime, Utc};

use crate::error::FeedError;
use crate::release::ReleaseEntry;

/// Retrieves and decodes the release feed.
pub trait FeedSource: Send + Sync {
    /// Download the raw feed document.
    ///
    /// # Errors
    /// Returns [`FeedError::Transport`] when the feed cannot be retrieved.
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, FeedError>;

    /// Decode a downloaded feed into release entries.
    ///
    /// # Errors
    /// Returns [`FeedError::Parse`] when the document is malformed.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<ReleaseEntry>, FeedError>;
}

/// Reports the version of the server the host is deployed against.
///
/// Probing is best-effort: any failure yields `None`.
pub trait EligibilityProbe: Send + Sync {
    fn probe_server_baseline(&self) -> Option<String>;
}

/// A probe that always answers with the same baseline.
#[derive(Debug, Clone, Default)]
pub struct FixedBaseline(pub Option<String>);

impl EligibilityProbe for FixedBaseline {
    fn probe_server_baseline(&self) -> Option<String> {
        self.0.clone()
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
