use std::sync::Arc;

use log::info;
use upcheck_core::{
    Clock, EligibilityProbe, EngineConfig, FeedSource, HostCallbacks, SecurityGate,
    SettingsStore, UpdateOrchestrator,
};
use upcheck_http::{HttpEligibilityProbe, HttpFeedSource, HttpSettings, ProbeSettings};
use upcheck_platform::{AppPaths, JsonSettingsStore, LoggingOptions, init_logging};

use crate::error::UpdaterError;
use crate::updater::Updater;

type HostResolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Configures an [`Updater`].
///
/// The minimum is an application name (or a settings store) plus a way to
/// learn the server baseline, either [`eligibility_probe`] or
/// [`available_host`]. Everything else has a default: the JSON settings file
/// under the application's config directory, the HTTP feed source, `https`
/// as the only approved scheme and no host handlers.
///
/// [`eligibility_probe`]: Self::eligibility_probe
/// [`available_host`]: Self::available_host
pub struct UpdaterBuilder {
    current_version: String,
    app_name: Option<String>,
    settings: Option<Arc<dyn SettingsStore>>,
    host: HostCallbacks,
    feed: Option<Box<dyn FeedSource>>,
    probe: Option<Box<dyn EligibilityProbe>>,
    resolve_host: Option<HostResolver>,
    probe_settings: ProbeSettings,
    http: HttpSettings,
    security: SecurityGate,
    default_feed_url: Option<String>,
    logging: Option<LoggingOptions>,
    clock: Option<Box<dyn Clock>>,
}

impl UpdaterBuilder {
    pub(crate) fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            app_name: None,
            settings: None,
            host: HostCallbacks::default(),
            feed: None,
            probe: None,
            resolve_host: None,
            probe_settings: ProbeSettings::default(),
            http: HttpSettings::default(),
            security: SecurityGate::default(),
            default_feed_url: None,
            logging: None,
            clock: None,
        }
    }

    /// Name used for the settings and log directories.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    #[must_use]
    pub fn host(mut self, host: HostCallbacks) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn feed_source(mut self, feed: Box<dyn FeedSource>) -> Self {
        self.feed = Some(feed);
        self
    }

    #[must_use]
    pub fn eligibility_probe(mut self, probe: Box<dyn EligibilityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Probe the server returned by `resolve` over HTTP.
    #[must_use]
    pub fn available_host(
        mut self,
        resolve: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_host = Some(Box::new(resolve));
        self
    }

    #[must_use]
    pub fn probe_settings(mut self, settings: ProbeSettings) -> Self {
        self.probe_settings = settings;
        self
    }

    #[must_use]
    pub fn http_settings(mut self, settings: HttpSettings) -> Self {
        self.http = settings;
        self
    }

    /// Replace the approved URL schemes, `https` by default.
    #[must_use]
    pub fn approved_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.security = SecurityGate::with_schemes(schemes);
        self
    }

    /// Feed URL to store when the settings do not name one yet.
    #[must_use]
    pub fn default_feed_url(mut self, url: impl Into<String>) -> Self {
        self.default_feed_url = Some(url.into());
        self
    }

    /// Install the update log under the application's data directory.
    #[must_use]
    pub fn logging(mut self, options: LoggingOptions) -> Self {
        self.logging = Some(options);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wire the collaborators together.
    ///
    /// No checker is started; call [`Updater::start`] or one of the
    /// single-check triggers.
    ///
    /// # Errors
    /// Returns an error when neither an application name nor a settings
    /// store was given, when no eligibility probe can be built, or when the
    /// paths, HTTP client or initial settings cannot be set up.
    pub fn build(self) -> Result<Updater, UpdaterError> {
        let paths = self.app_name.as_deref().map(AppPaths::new).transpose()?;

        if let (Some(paths), Some(options)) = (&paths, &self.logging) {
            init_logging(paths, options);
        }

        let settings: Arc<dyn SettingsStore> = match (self.settings, &paths) {
            (Some(store), _) => store,
            (None, Some(paths)) => {
                paths.ensure_dirs().map_err(UpdaterError::Dirs)?;
                Arc::new(JsonSettingsStore::for_app(paths))
            }
            (None, None) => return Err(UpdaterError::NoSettingsStore),
        };

        if let Some(url) = self.default_feed_url
            && settings.feed_url().is_none()
        {
            settings.set_feed_url(Some(&url))?;
        }

        let probe: Box<dyn EligibilityProbe> = match (self.probe, self.resolve_host) {
            (Some(probe), _) => probe,
            (None, Some(resolve)) => Box::new(
                HttpEligibilityProbe::new(&self.http, resolve)?.with_settings(self.probe_settings),
            ),
            (None, None) => return Err(UpdaterError::NoEligibilityProbe),
        };

        let feed: Box<dyn FeedSource> = match self.feed {
            Some(feed) => feed,
            None => Box::new(HttpFeedSource::new(&self.http)?),
        };

        let config = EngineConfig::new(self.current_version).with_security(self.security);
        info!("Update checker configured for version {}", config.current_version);

        let mut orchestrator =
            UpdateOrchestrator::new(config, feed, probe, settings, Arc::new(self.host));
        if let Some(clock) = self.clock {
            orchestrator = orchestrator.with_clock(clock);
        }

        Ok(Updater::from_orchestrator(orchestrator))
    }
}
