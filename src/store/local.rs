//! String-keyed JSON storage on disk
//!
//! Provides a `LocalStore` that keeps one JSON file per key in an
//! XDG-compliant data directory, stamped with the time it was last written.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Wrapper struct for values stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct StoredValue<T> {
    /// The stored value
    data: T,
    /// When the value was last written
    updated_at: DateTime<Utc>,
}

/// Reads and writes persisted values by key
///
/// Values live in `~/.local/share/coindash/` on Linux. A value that is
/// missing or cannot be parsed reads as absent.
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// Directory where value files are stored
    data_dir: PathBuf,
}

impl LocalStore {
    /// Creates a LocalStore using the XDG data directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "coindash")?;
        Some(Self {
            data_dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Creates a LocalStore with a custom directory
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the path to the file for the given key
    fn value_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    /// Writes `data` under `key`, replacing any previous value
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation or file writing fails
    pub fn write<T: Serialize>(&self, key: &str, data: &T) -> io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;

        let stored = StoredValue {
            data,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        fs::write(self.value_path(key), json)
    }

    /// Reads the value stored under `key`
    ///
    /// Returns `None` if the key was never written or its file cannot be parsed.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_with_timestamp(key).map(|(data, _)| data)
    }

    /// Reads a value together with the time it was written
    pub fn read_with_timestamp<T: DeserializeOwned>(&self, key: &str) -> Option<(T, DateTime<Utc>)> {
        let content = fs::read_to_string(self.value_path(key)).ok()?;
        match serde_json::from_str::<StoredValue<T>>(&content) {
            Ok(stored) => Some((stored.data, stored.updated_at)),
            Err(e) => {
                log::warn!("ignoring unreadable stored value '{}': {}", key, e);
                None
            }
        }
    }

    /// Deletes the value stored under `key`; a missing key is not an error
    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.value_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_store() -> (LocalStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = LocalStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_write_creates_file_in_data_directory() {
        let (store, temp_dir) = create_test_store();
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        store.write("watchlist", &data).expect("Write should succeed");

        let expected_path = temp_dir.path().join("watchlist.json");
        assert!(expected_path.exists(), "Value file should exist");
        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"updated_at\""));
        assert!(content.contains("42"));
    }

    #[test]
    fn test_read_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result: Option<TestData> = store.read("nonexistent_key");

        assert!(result.is_none());
    }

    #[test]
    fn test_read_returns_none_for_corrupt_file() {
        let (store, temp_dir) = create_test_store();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let result: Option<TestData> = store.read("broken");

        assert!(result.is_none());
    }

    #[test]
    fn test_overwrite_keeps_latest_value() {
        let (store, _temp_dir) = create_test_store();

        store.write("isDarkMode", &true).unwrap();
        store.write("isDarkMode", &false).unwrap();

        assert_eq!(store.read::<bool>("isDarkMode"), Some(false));
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("data");
        let store = LocalStore::with_dir(nested_path.clone());

        store.write("recentSearches", &Vec::<String>::new()).unwrap();

        assert!(nested_path.join("recentSearches.json").exists());
    }

    #[test]
    fn test_updated_at_timestamp_is_recorded() {
        let (store, _temp_dir) = create_test_store();

        let before = Utc::now();
        store.write("stamp", &1u8).unwrap();
        let after = Utc::now();

        let (_, updated_at) = store.read_with_timestamp::<u8>("stamp").unwrap();
        assert!(updated_at >= before && updated_at <= after);
    }

    #[test]
    fn test_remove_deletes_value_and_tolerates_missing() {
        let (store, _temp_dir) = create_test_store();
        store.write("recentlyViewed", &vec![1, 2, 3]).unwrap();

        store.remove("recentlyViewed").unwrap();
        store.remove("recentlyViewed").unwrap();

        assert!(store.read::<Vec<i32>>("recentlyViewed").is_none());
    }

    #[test]
    fn test_new_uses_project_data_dir() {
        if let Some(store) = LocalStore::new() {
            assert!(store.dir().to_string_lossy().contains("coindash"));
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
