use crate::error::{CheckError, ErrorKind};
use crate::release::ReleaseEntry;

/// The single result a completed check reports to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    NoUpdate,
    UpdateAvailable {
        entry: ReleaseEntry,
        auto_install_allowed: bool,
    },
    CriticalUpdate {
        entry: ReleaseEntry,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl CheckOutcome {
    #[must_use]
    pub fn from_error(error: &CheckError) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn entry(&self) -> Option<&ReleaseEntry> {
        match self {
            Self::UpdateAvailable { entry, .. } | Self::CriticalUpdate { entry } => Some(entry),
            Self::NoUpdate | Self::Error { .. } => None,
        }
    }
}

/// Result of one check cycle.
///
/// `Ok(None)` is the silent path: the candidate was skipped by the user and
/// nothing was reported.
pub type CycleResult = Result<Option<CheckOutcome>, CheckError>;
