use std::fmt;

use url::Url;

use crate::error::CheckError;

/// What a URL is about to be fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlPurpose {
    Feed,
    ReleaseNotes,
    Download,
}

impl fmt::Display for UrlPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feed => write!(f, "appcast feed"),
            Self::ReleaseNotes => write!(f, "release notes"),
            Self::Download => write!(f, "update file"),
        }
    }
}

/// Refuses any URL whose scheme is not on the approved list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGate {
    approved_schemes: Vec<String>,
}

impl Default for SecurityGate {
    fn default() -> Self {
        Self::with_schemes(["https"])
    }
}

impl SecurityGate {
    pub fn with_schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            approved_schemes: schemes
                .into_iter()
                .map(|scheme| scheme.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Check `url` before anything is fetched from it.
    ///
    /// # Errors
    /// Returns [`CheckError::InsecureTransport`] when the URL cannot be parsed
    /// or uses a scheme that is not approved.
    pub fn validate(&self, url: &str, purpose: UrlPurpose) -> Result<(), CheckError> {
        let approved = Url::parse(url)
            .is_ok_and(|parsed| self.approved_schemes.iter().any(|s| s == parsed.scheme()));

        if approved {
            Ok(())
        } else {
            Err(CheckError::InsecureTransport {
                purpose,
                url: url.to_string(),
            })
        }
    }
}
