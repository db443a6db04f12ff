use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,
    #[error("Could not determine config directory")]
    ConfigDirUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Per-application locations for update settings and the update log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the platform directories for `app_name`.
    ///
    /// # Errors
    /// Returns an error when the user's home, config or data directory
    /// cannot be determined.
    pub fn new(app_name: &str) -> Result<Self, AppPathsError> {
        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().ok_or(AppPathsError::HomeDirUnavailable)?;
            let support = home.join("Library/Application Support").join(app_name);
            Ok(Self {
                config_dir: support.clone(),
                data_dir: support,
            })
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(Self {
                config_dir: dirs::config_dir()
                    .ok_or(AppPathsError::ConfigDirUnavailable)?
                    .join(app_name),
                data_dir: dirs::data_dir()
                    .ok_or(AppPathsError::DataDirUnavailable)?
                    .join(app_name),
            })
        }
    }

    /// Keep everything under a single directory.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("update-settings.json")
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("upcheck.log")
    }

    /// # Errors
    /// Returns an error if either directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::AppPaths;

    #[test]
    fn files_live_in_their_directories() {
        let paths = AppPaths::rooted_at(Path::new("/opt/example"));

        assert!(
            paths
                .settings_file()
                .ends_with(Path::new("config").join("update-settings.json"))
        );
        assert!(
            paths
                .log_file()
                .ends_with(Path::new("data").join("upcheck.log"))
        );
    }

    #[test]
    fn ensure_dirs_creates_both_directories() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let paths = AppPaths::rooted_at(temp_dir.path());

        paths.ensure_dirs().expect("directories should be created");

        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
    }

    #[test]
    fn platform_paths_end_with_app_name() {
        if let Ok(paths) = AppPaths::new("example-app") {
            assert!(paths.config_dir.ends_with("example-app"));
            assert!(paths.data_dir.ends_with("example-app"));
        }
    }
}
