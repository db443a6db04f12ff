use log::debug;
use serde::Deserialize;
use upcheck_core::{FeedError, ReleaseEntry};

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Releases(Vec<ReleaseEntry>),
    Wrapped { releases: Vec<ReleaseEntry> },
}

/// Decode a JSON release feed.
///
/// The document is either an array of releases or an object with a
/// `releases` array. Unknown per-release fields end up in
/// [`ReleaseEntry::metadata`].
///
/// # Errors
/// Returns [`FeedError::Parse`] when the body is not a feed document.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<ReleaseEntry>, FeedError> {
    let document: FeedDocument = serde_json::from_slice(bytes).map_err(|error| {
        FeedError::parse(format!(
            "expected a JSON array of releases or an object with `releases`: {error}"
        ))
    })?;

    let entries = match document {
        FeedDocument::Releases(entries) | FeedDocument::Wrapped { releases: entries } => entries,
    };

    let unversioned = entries.iter().filter(|entry| !entry.is_valid()).count();
    if unversioned > 0 {
        debug!("{unversioned} feed entries have no version and will never be offered");
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use upcheck_core::FeedError;

    use super::parse_feed;

    fn bytes(value: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(value).expect("fixture should serialize")
    }

    #[test]
    fn parses_bare_array() {
        let body = bytes(&json!([
            {
                "version": "2.0",
                "min_server_version": "1.5",
                "critical": true,
                "release_notes_url": "https://example.com/notes/2.0",
                "download_url": "https://example.com/setup-2.0.exe"
            },
            { "version": "1.9" }
        ]));

        let entries = parse_feed(&body).expect("feed should parse");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].minimum_server_baseline, "1.5");
        assert!(entries[0].critical);
        assert_eq!(entries[0].installer_url(), Some("https://example.com/setup-2.0.exe"));
        assert_eq!(entries[1].notes_url(), None);
    }

    #[test]
    fn parses_wrapped_releases_and_keeps_extra_fields() {
        let body = bytes(&json!({
            "releases": [
                { "version": "3.1", "channel": "beta", "size": 1024 }
            ]
        }));

        let entries = parse_feed(&body).expect("feed should parse");

        assert_eq!(entries[0].version, "3.1");
        assert_eq!(entries[0].metadata.get("channel"), Some(&json!("beta")));
        assert_eq!(entries[0].metadata.get("size"), Some(&json!(1024)));
    }

    #[test]
    fn entries_without_version_are_kept_but_invalid() {
        let entries =
            parse_feed(&bytes(&json!([{ "critical": true }]))).expect("feed should parse");

        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_valid());
    }

    #[test]
    fn rejects_non_feed_documents() {
        for body in [&b"<rss></rss>"[..], b"{\"version\": \"1.0\"}", b""] {
            assert!(matches!(parse_feed(body), Err(FeedError::Parse { .. })));
        }
    }
}
