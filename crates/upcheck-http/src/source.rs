use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use thiserror::Error;
use upcheck_core::{FeedError, FeedSource, ReleaseEntry};

use crate::feed::parse_feed;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SNIPPET_CHARS: usize = 160;

#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[source] reqwest::Error);

/// Client options shared by the feed source and the eligibility probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("upcheck/{}", env!("CARGO_PKG_VERSION")),
            timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

impl HttpSettings {
    /// # Errors
    /// Returns an error when the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<Client, ClientBuildError> {
        Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(ClientBuildError)
    }
}

/// Downloads the release feed over HTTP and decodes it as JSON.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(settings: &HttpSettings) -> Result<Self, ClientBuildError> {
        settings.build_client().map(Self::with_client)
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Vec<u8>, FeedError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .map_err(|error| FeedError::transport_from("request failed", error))?;

        let status = response.status();
        if !status.is_success() {
            let snippet = response
                .text()
                .ok()
                .map(|body| response_snippet(&body, SNIPPET_CHARS))
                .unwrap_or_default();
            return Err(FeedError::transport(
                "unexpected status",
                format!("HTTP {status}{snippet}"),
            ));
        }

        let body = response
            .bytes()
            .map_err(|error| FeedError::transport_from("reading body failed", error))?;
        debug!("Downloaded {} byte feed from {url}", body.len());
        Ok(body.to_vec())
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<ReleaseEntry>, FeedError> {
        parse_feed(bytes)
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.trim().chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{HttpSettings, response_snippet};

    #[test]
    fn snippet_is_prefixed_and_truncated() {
        assert_eq!(response_snippet("  not found \n", 160), ": not found");
        assert_eq!(response_snippet("abcdef", 3), ": abc");
        assert_eq!(response_snippet("   ", 160), "");
    }

    #[test]
    fn default_settings_identify_the_crate() {
        let settings = HttpSettings::default();

        assert!(settings.user_agent.starts_with("upcheck/"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
    }
}
