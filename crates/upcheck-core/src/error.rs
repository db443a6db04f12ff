use thiserror::Error;

use crate::security::UrlPurpose;

/// Coarse classification of a failed check, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InsecureTransport,
    Transport,
    Parse,
    Unknown,
}

/// Why a check cycle was aborted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("The update source configuration is missing.")]
    Configuration,

    #[error("Insecure URL used for {purpose}: {url}")]
    InsecureTransport { purpose: UrlPurpose, url: String },

    #[error("Update feed is unavailable ({context}): {details}")]
    Transport {
        context: &'static str,
        details: String,
    },

    #[error("Update feed is malformed: {details}")]
    Parse { details: String },

    #[error("{0}")]
    Unknown(String),
}

impl CheckError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration => ErrorKind::Configuration,
            Self::InsecureTransport { .. } => ErrorKind::InsecureTransport,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn unknown(details: impl Into<String>) -> Self {
        Self::Unknown(details.into())
    }
}

/// Failure reported by a feed source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("{context}: {details}")]
    Transport {
        context: &'static str,
        details: String,
    },

    #[error("{details}")]
    Parse { details: String },
}

impl FeedError {
    pub fn transport(context: &'static str, details: impl Into<String>) -> Self {
        Self::Transport {
            context,
            details: details.into(),
        }
    }

    pub fn transport_from<E>(context: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::transport(context, error.to_string())
    }

    pub fn parse(details: impl Into<String>) -> Self {
        Self::Parse {
            details: details.into(),
        }
    }
}

impl From<FeedError> for CheckError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::Transport { context, details } => Self::Transport { context, details },
            FeedError::Parse { details } => Self::Parse { details },
        }
    }
}

/// Failure reading or writing persisted update settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl SettingsError {
    #[must_use]
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }
}

impl From<SettingsError> for CheckError {
    fn from(error: SettingsError) -> Self {
        Self::Unknown(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckError, ErrorKind, FeedError, SettingsError};
    use crate::security::UrlPurpose;

    #[test]
    fn feed_errors_map_to_matching_check_errors() {
        let transport = CheckError::from(FeedError::transport("feed request", "timed out"));
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert_eq!(
            transport.to_string(),
            "Update feed is unavailable (feed request): timed out"
        );

        let parse = CheckError::from(FeedError::parse("expected value at line 1 column 1"));
        assert_eq!(parse.kind(), ErrorKind::Parse);
    }

    #[test]
    fn settings_errors_become_unknown() {
        let error = CheckError::from(SettingsError::io(
            "failed to write settings",
            std::io::Error::other("disk full"),
        ));

        assert!(
            matches!(error, CheckError::Unknown(ref message) if message.contains("disk full")),
            "expected Unknown with source message, got {error:?}"
        );
    }

    #[test]
    fn insecure_transport_names_the_purpose() {
        let error = CheckError::InsecureTransport {
            purpose: UrlPurpose::Download,
            url: "http://example.com/app.msi".to_string(),
        };

        assert_eq!(error.kind(), ErrorKind::InsecureTransport);
        assert_eq!(
            error.to_string(),
            "Insecure URL used for update file: http://example.com/app.msi"
        );
    }
}
