//! Hot reload by polling the config file's modification time

use super::Config;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Watches a config file for changes
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ConfigWatcher {
    /// Start watching `path`, treating its current state as already loaded
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified_at(&path);
        Self {
            path,
            last_modified,
        }
    }

    /// Path being watched
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config for the first time
    pub fn load_initial(&mut self) -> Result<Config> {
        self.last_modified = modified_at(&self.path);
        Config::load(&self.path)
    }

    /// Check for a change and reload if there is one
    ///
    /// Returns `Some` only for a well-formed reload. A malformed file is
    /// logged and skipped; it is not retried until the file changes again.
    pub fn poll(&mut self) -> Option<Config> {
        let current = modified_at(&self.path);
        if current == self.last_modified {
            return None;
        }
        self.last_modified = current;

        if current.is_none() {
            debug!(path = %self.path.display(), "config file removed, keeping current config");
            return None;
        }

        match Config::load(&self.path) {
            Ok(config) => {
                info!(path = %self.path.display(), "configuration reloaded");
                Some(config)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed config reload");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch_later(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
        // Force a distinct mtime even on coarse-grained filesystems
        let file = fs::File::options().write(true).open(path).unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        file.set_modified(later).unwrap();
    }

    #[test]
    fn test_unchanged_file_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "interval = \"1m\"").unwrap();

        let mut watcher = ConfigWatcher::new(&path);
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_changed_file_reloads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "interval = \"1m\"").unwrap();
        let mut watcher = ConfigWatcher::new(&path);

        touch_later(&path, "interval = \"5m\"");
        let config = watcher.poll().expect("reload");
        assert_eq!(config.interval, Duration::from_secs(300));
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_malformed_reload_is_ignored() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "interval = \"1m\"").unwrap();
        let mut watcher = ConfigWatcher::new(&path);

        touch_later(&path, "interval = [[[");
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_file_created_after_start_is_loaded() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut watcher = ConfigWatcher::new(&path);
        assert_eq!(watcher.load_initial().unwrap().interval, Duration::from_secs(60));

        fs::write(&path, "interval = \"10s\"").unwrap();
        assert_eq!(watcher.poll().unwrap().interval, Duration::from_secs(10));
    }
}
