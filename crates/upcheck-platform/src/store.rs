use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fs2::FileExt;
use log::{debug, warn};
use tempfile::NamedTempFile;
use upcheck_core::{SettingsError, SettingsStore, UpdateSettings};

use crate::paths::AppPaths;

/// Update settings persisted as JSON.
///
/// Every change re-reads the file while holding an exclusive lock on a
/// sibling `.lock` file, so concurrent writers from other processes keep
/// each other's settings. The result goes to a temporary file that replaces
/// the settings file. Within the process the cached copy's mutex serializes
/// every read-modify-write.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    cached: Mutex<UpdateSettings>,
}

impl JsonSettingsStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields the defaults; an unreadable or corrupt one is
    /// logged and replaced by the defaults on the next write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_settings(&path);
        Self {
            path,
            cached: Mutex::new(settings),
        }
    }

    #[must_use]
    pub fn for_app(paths: &AppPaths) -> Self {
        Self::open(paths.settings_file())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file, picking up changes made by other processes.
    pub fn reload(&self) {
        let fresh = read_settings(&self.path);
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    fn settings_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn lock_file(&self) -> Result<File, SettingsError> {
        std::fs::create_dir_all(self.settings_dir())
            .map_err(|error| SettingsError::io("failed to create settings directory", error))?;
        let lock = open_lock_file(&self.path)?;
        lock.lock_exclusive()
            .map_err(|error| SettingsError::io("failed to lock settings file", error))?;
        Ok(lock)
    }

    /// Replace the settings file. The caller holds the file lock.
    fn write(&self, settings: &UpdateSettings) -> Result<(), SettingsError> {
        let content = serde_json::to_vec_pretty(settings).map_err(SettingsError::Serialize)?;
        let mut staged = NamedTempFile::new_in(self.settings_dir())
            .map_err(|error| SettingsError::io("failed to stage settings file", error))?;
        staged
            .write_all(&content)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|error| SettingsError::io("failed to write settings file", error))?;
        staged
            .persist(&self.path)
            .map_err(|error| SettingsError::io("failed to replace settings file", error.error))?;
        debug!("Saved update settings to {}", self.path.display());
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> UpdateSettings {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn modify(&self, change: &mut dyn FnMut(&mut UpdateSettings)) -> Result<(), SettingsError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = self.lock_file()?;

        // Another process may have written since this store last looked.
        let current = read_settings(&self.path);
        let mut updated = current.clone();
        change(&mut updated);
        let result = if updated == current {
            Ok(())
        } else {
            self.write(&updated)
        };

        if let Err(error) = FileExt::unlock(&lock) {
            warn!("Failed to release settings lock: {error}");
        }
        result?;
        *cached = updated;
        Ok(())
    }
}

fn read_settings(path: &Path) -> UpdateSettings {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
            warn!("Ignoring malformed settings at {}: {error}", path.display());
            UpdateSettings::default()
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => UpdateSettings::default(),
        Err(error) => {
            warn!("Failed to read settings at {}: {error}", path.display());
            UpdateSettings::default()
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File, SettingsError> {
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(PathBuf::from(lock_path))
        .map_err(|error| SettingsError::io("failed to open settings lock file", error))
}
