use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// One JSON file per key under a data directory: `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|err| StorageError::Write {
            key: key.to_string(),
            reason: format!("failed to create {}: {err}", self.dir.display()),
        })?;
        let path = self.path_for(key);
        fs::write(&path, value).map_err(|err| StorageError::Write {
            key: key.to_string(),
            reason: format!("failed to write {}: {err}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SETTINGS_KEY, SettingsStore, ThemeMode};

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path());
        assert_eq!(store.get(SETTINGS_KEY).expect("read"), None);
    }

    #[test]
    fn settings_persist_across_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data_dir = dir.path().join("nested");

        let settings = SettingsStore::load(Box::new(FileStore::new(&data_dir)));
        settings.update(|s| s.theme_mode = ThemeMode::Dark);

        let path = FileStore::new(&data_dir).path_for(SETTINGS_KEY);
        assert!(path.ends_with("webClockSettings.json"));
        let reloaded = SettingsStore::load(Box::new(FileStore::new(&data_dir)));
        assert_eq!(reloaded.theme_mode(), ThemeMode::Dark);
    }
}
