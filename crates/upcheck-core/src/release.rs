use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One advertised release from the update feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    #[serde(default)]
    pub version: String,
    /// Lowest server version this release can run against; empty when the
    /// release has no server requirement.
    #[serde(default, alias = "min_server_version")]
    pub minimum_server_baseline: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub release_notes_url: String,
    #[serde(default)]
    pub download_url: String,
    /// Feed fields the engine does not interpret, passed through to the host.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ReleaseEntry {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    #[must_use]
    pub fn minimum_server_baseline(mut self, baseline: impl Into<String>) -> Self {
        self.minimum_server_baseline = baseline.into();
        self
    }

    #[must_use]
    pub fn release_notes_url(mut self, url: impl Into<String>) -> Self {
        self.release_notes_url = url.into();
        self
    }

    #[must_use]
    pub fn download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// An entry without a version can never be offered.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.version.is_empty()
    }

    #[must_use]
    pub fn notes_url(&self) -> Option<&str> {
        non_empty(&self.release_notes_url)
    }

    #[must_use]
    pub fn installer_url(&self) -> Option<&str> {
        non_empty(&self.download_url)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ReleaseEntry;

    #[test]
    fn deserializes_with_defaults_and_keeps_unknown_fields() {
        let entry: ReleaseEntry = serde_json::from_value(json!({
            "version": "2.1.0",
            "critical": true,
            "download_url": "https://example.com/app-2.1.0.msi",
            "title": "Version 2.1",
            "size": 1024
        }))
        .expect("entry should deserialize");

        assert_eq!(entry.version, "2.1.0");
        assert!(entry.critical);
        assert!(entry.minimum_server_baseline.is_empty());
        assert_eq!(entry.notes_url(), None);
        assert_eq!(entry.installer_url(), Some("https://example.com/app-2.1.0.msi"));
        assert_eq!(entry.metadata["title"], json!("Version 2.1"));
        assert_eq!(entry.metadata["size"], json!(1024));
    }

    #[test]
    fn missing_version_makes_entry_invalid() {
        let entry: ReleaseEntry =
            serde_json::from_value(json!({ "critical": false })).expect("entry should deserialize");

        assert!(!entry.is_valid());
        assert!(ReleaseEntry::new("1.0").is_valid());
    }

    #[test]
    fn accepts_short_server_version_alias() {
        let entry: ReleaseEntry = serde_json::from_value(json!({
            "version": "3.0",
            "min_server_version": "2.4.0"
        }))
        .expect("entry should deserialize");

        assert_eq!(entry.minimum_server_baseline, "2.4.0");
        assert!(entry.metadata.is_empty());
    }
}
