//! JSON file backed store

use parking_lot::Mutex;
use relup_errors::StorageError;
use relup_platform::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, i64>,
}

/// Store persisting every mutation to a JSON file.
///
/// Writes go to a sibling `.tmp` file that is synced and renamed over the
/// target, so a crash leaves either the old or the new contents.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => {
                let file: StateFile =
                    serde_json::from_str(&content).map_err(|e| StorageError::CorruptedData {
                        message: format!("{}: {e}", path.display()),
                    })?;
                if file.version > FORMAT_VERSION {
                    return Err(StorageError::CorruptedData {
                        message: format!(
                            "{}: unsupported state version {}",
                            path.display(),
                            file.version
                        ),
                    });
                }
                file.values
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::from_io_with_path(&e, &path)),
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "opened state file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &BTreeMap<String, i64>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::from_io_with_path(&e, parent))?;
        }

        let file = StateFile {
            version: FORMAT_VERSION,
            values: values.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| StorageError::IoError {
            message: format!("failed to serialize state: {e}"),
        })?;

        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp = File::create(&temp_path)
                .map_err(|e| StorageError::from_io_with_path(&e, &temp_path))?;
            temp.write_all(content.as_bytes())
                .map_err(|e| StorageError::from_io_with_path(&e, &temp_path))?;
            // Ensure all data is on disk before the rename
            temp.sync_all()
                .map_err(|e| StorageError::from_io_with_path(&e, &temp_path))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::AtomicRenameFailed {
            message: format!(
                "{} -> {}: {e}",
                temp_path.display(),
                self.path.display()
            ),
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_i64(&self, key: &str, default: i64) -> Result<i64, StorageError> {
        Ok(self.values.lock().get(key).copied().unwrap_or(default))
    }

    fn put_i64(&self, key: &str, value: i64) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.save(&values) {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.save(&values) {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}
