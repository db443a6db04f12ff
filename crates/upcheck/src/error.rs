use thiserror::Error;
use upcheck_core::SettingsError;
use upcheck_http::ClientBuildError;
use upcheck_platform::AppPathsError;

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("failed to resolve application paths: {0}")]
    Paths(#[from] AppPathsError),

    #[error("failed to prepare application directories: {0}")]
    Dirs(#[source] std::io::Error),

    #[error(transparent)]
    Client(#[from] ClientBuildError),

    #[error("failed to store update settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("no settings store: set an application name or supply a store")]
    NoSettingsStore,

    #[error("no eligibility probe: supply a probe or an available-host resolver")]
    NoEligibilityProbe,

    #[error("failed to start update checker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
