use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use upcheck_core::EligibilityProbe;

use crate::source::{ClientBuildError, HttpSettings};

type HostResolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Where the server publishes its version and how to read the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Path appended to the resolved host.
    pub path: String,
    /// JSON key holding the server version.
    pub version_key: String,
    /// JSON key holding an error message.
    pub error_key: String,
    /// Baseline assumed for servers that answer 404 because they predate the
    /// version endpoint.
    pub legacy_baseline: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            path: "/getVersion".to_string(),
            version_key: "oethServerVersion".to_string(),
            error_key: "error_msg".to_string(),
            legacy_baseline: "2.1.2".to_string(),
        }
    }
}

/// Asks the server the host is connected to for its version.
pub struct HttpEligibilityProbe {
    client: Client,
    resolve_host: HostResolver,
    settings: ProbeSettings,
}

impl HttpEligibilityProbe {
    /// `resolve_host` returns the base URL of the server currently in use,
    /// or `None` when there is none.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(
        http: &HttpSettings,
        resolve_host: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self::with_client(http.build_client()?, resolve_host))
    }

    #[must_use]
    pub fn with_client(
        client: Client,
        resolve_host: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            client,
            resolve_host: Box::new(resolve_host),
            settings: ProbeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ProbeSettings) -> Self {
        self.settings = settings;
        self
    }

    fn probe_url(&self) -> Option<String> {
        let host = (self.resolve_host)().filter(|host| !host.trim().is_empty())?;
        Some(format!(
            "{}{}",
            host.trim_end_matches('/'),
            self.settings.path
        ))
    }
}

impl EligibilityProbe for HttpEligibilityProbe {
    fn probe_server_baseline(&self) -> Option<String> {
        let Some(url) = self.probe_url() else {
            debug!("No server host available to probe");
            return None;
        };

        // Error statuses still carry the JSON body that identifies old servers.
        let body = match self.client.get(&url).send().and_then(Response::text) {
            Ok(body) => body,
            Err(error) => {
                warn!("Server version probe at {url} failed: {error}");
                return None;
            }
        };

        let baseline = interpret_probe_response(&body, &self.settings);
        debug!("Server version probe at {url} answered {baseline:?}");
        baseline
    }
}

/// Map a version endpoint response to a server baseline.
#[must_use]
pub fn interpret_probe_response(body: &str, settings: &ProbeSettings) -> Option<String> {
    let document: Value = serde_json::from_str(body).ok()?;

    let string_field = |key: &str| {
        document
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };

    if let Some(version) = string_field(&settings.version_key) {
        return Some(version.to_string());
    }

    string_field(&settings.error_key)
        .filter(|message| message.contains("404"))
        .map(|_| settings.legacy_baseline.clone())
}

impl std::fmt::Debug for HttpEligibilityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEligibilityProbe")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProbeSettings, interpret_probe_response};

    fn interpret(body: &str) -> Option<String> {
        interpret_probe_response(body, &ProbeSettings::default())
    }

    #[test]
    fn reads_reported_server_version() {
        assert_eq!(
            interpret(r#"{"oethServerVersion": "3.4.1", "status": "ok"}"#).as_deref(),
            Some("3.4.1")
        );
    }

    #[test]
    fn not_found_error_means_legacy_server() {
        assert_eq!(
            interpret(r#"{"error_msg": "404 Not Found"}"#).as_deref(),
            Some("2.1.2")
        );
    }

    #[test]
    fn other_errors_and_garbage_yield_nothing() {
        assert_eq!(interpret(r#"{"error_msg": "500 Internal Server Error"}"#), None);
        assert_eq!(interpret(r#"{"oethServerVersion": ""}"#), None);
        assert_eq!(interpret(r#"{"oethServerVersion": 3}"#), None);
        assert_eq!(interpret("<html>oops</html>"), None);
        assert_eq!(interpret(""), None);
    }

    #[test]
    fn custom_keys_are_honoured() {
        let settings = ProbeSettings {
            version_key: "serverVersion".to_string(),
            legacy_baseline: "1.0".to_string(),
            ..ProbeSettings::default()
        };

        assert_eq!(
            interpret_probe_response(r#"{"serverVersion": "5.0"}"#, &settings).as_deref(),
            Some("5.0")
        );
        assert_eq!(
            interpret_probe_response(r#"{"error_msg": "HTTP 404"}"#, &settings).as_deref(),
            Some("1.0")
        );
    }
}
