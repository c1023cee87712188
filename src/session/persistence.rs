// Memory persistence: one JSON file of records per user
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::config::StorageConfig;
use crate::memory::types::MemoryRecord;

const FILE_PREFIX: &str = "memory_";
const FILE_SUFFIX: &str = ".json";

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base directory for memory files
    pub storage_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            storage_dir: StorageConfig::default().data_dir,
        }
    }
}

impl From<&StorageConfig> for PersistenceConfig {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            storage_dir: storage.data_dir.clone(),
        }
    }
}

/// On-disk layout of a user's memory file
#[derive(Debug, Serialize, Deserialize)]
struct MemoryFile {
    version: u32,
    records: Vec<MemoryRecord>,
}

/// Memory persistence manager
pub struct MemoryPersistence {
    config: PersistenceConfig,
}

impl MemoryPersistence {
    /// Create new persistence manager
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        if !config.storage_dir.exists() {
            fs::create_dir_all(&config.storage_dir)
                .context("Failed to create memory storage directory")?;
        }

        Ok(Self { config })
    }

    /// Save every record of a user, active and inactive
    pub fn save(&self, user: &str, records: &[MemoryRecord]) -> Result<PathBuf> {
        let path = self.path_for(user);
        let file = MemoryFile {
            version: 1,
            records: records.to_vec(),
        };

        let json = serde_json::to_string_pretty(&file).context("Failed to serialize memory")?;

        // Write to a sibling temp file, then rename into place
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).context("Failed to write memory file")?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).context("Failed to replace memory file");
        }

        tracing::debug!(user, records = records.len(), path = %path.display(), "Saved memory");
        Ok(path)
    }

    /// Load a user's records.
    ///
    /// A missing file yields no records. So does a file that cannot be
    /// decoded; it is logged and left on disk untouched.
    pub fn load(&self, user: &str) -> Result<Vec<MemoryRecord>> {
        let path = self.path_for(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path).context("Failed to read memory file")?;

        match serde_json::from_str::<MemoryFile>(&json) {
            Ok(file) => {
                tracing::info!(user, records = file.records.len(), "Loaded memory");
                Ok(file.records)
            }
            Err(e) => {
                tracing::warn!(
                    user,
                    path = %path.display(),
                    error = %e,
                    "Discarding undecodable memory file"
                );
                Ok(Vec::new())
            }
        }
    }

    /// List users with a memory file
    pub fn list_users(&self) -> Result<Vec<String>> {
        if !self.config.storage_dir.exists() {
            return Ok(Vec::new());
        }

        let mut users = Vec::new();

        for entry in fs::read_dir(&self.config.storage_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                    let encoded = filename
                        .strip_prefix(FILE_PREFIX)
                        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX));
                    if let Some(user) = encoded.and_then(decode_user) {
                        users.push(user);
                    }
                }
            }
        }

        users.sort();
        Ok(users)
    }

    /// Path of a user's memory file
    pub fn path_for(&self, user: &str) -> PathBuf {
        self.config
            .storage_dir
            .join(format!("{}{}{}", FILE_PREFIX, encode_user(user), FILE_SUFFIX))
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }
}

/// Encode a user id into a file name component.
///
/// ASCII alphanumerics, `-` and `_` are kept; every other byte becomes
/// `%XX`. The mapping is injective, so distinct users never share a file.
fn encode_user(user: &str) -> String {
    let mut encoded = String::with_capacity(user.len());
    for byte in user.bytes() {
        if is_plain(byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Inverse of [`encode_user`]; `None` for names it could not have produced
fn decode_user(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = encoded.get(i + 1..i + 3)?;
                if !hex.bytes().all(is_upper_hex) {
                    return None;
                }
                let byte = u8::from_str_radix(hex, 16).ok()?;
                if is_plain(byte) {
                    return None;
                }
                decoded.push(byte);
                i += 3;
            }
            byte if is_plain(byte) => {
                decoded.push(byte);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(decoded).ok()
}

fn is_plain(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn is_upper_hex(byte: u8) -> bool {
    byte.is_ascii_digit() || (b'A'..=b'F').contains(&byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::confidence;
    use crate::memory::types::{MemoryType, Observation};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_persistence() -> (MemoryPersistence, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = PersistenceConfig {
            storage_dir: temp_dir.path().to_path_buf(),
        };
        (MemoryPersistence::new(config).unwrap(), temp_dir)
    }

    fn create_test_record() -> MemoryRecord {
        confidence::new_record(
            &Observation::new(MemoryType::WhatWorked, Utc::now())
                .with_symptom("Headache")
                .with_resolution("Cold compress"),
        )
    }

    #[test]
    fn test_save_and_load() {
        let (persistence, _temp) = create_test_persistence();
        let record = create_test_record();

        persistence.save("alice", &[record.clone()]).unwrap();
        let loaded = persistence.load("alice").unwrap();

        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (persistence, _temp) = create_test_persistence();
        assert!(persistence.load("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let (persistence, _temp) = create_test_persistence();
        fs::write(persistence.path_for("bob"), "{ not json").unwrap();

        assert!(persistence.load("bob").unwrap().is_empty());
        assert!(persistence.path_for("bob").exists());
    }

    #[test]
    fn test_list_users() {
        let (persistence, _temp) = create_test_persistence();
        persistence.save("bob", &[]).unwrap();
        persistence.save("alice", &[]).unwrap();

        assert_eq!(persistence.list_users().unwrap(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_encode_user() {
        assert_eq!(encode_user("alice"), "alice");
        assert_eq!(encode_user("alice_smith-2"), "alice_smith-2");
        assert_eq!(encode_user("alice.smith"), "alice%2Esmith");
        assert_eq!(encode_user("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(encode_user("100%"), "100%25");
    }

    #[test]
    fn test_decode_user() {
        for user in ["alice", "alice.smith", "../etc/passwd", "zoë", "", "50%_off"] {
            assert_eq!(decode_user(&encode_user(user)).as_deref(), Some(user));
        }
        assert_eq!(decode_user("bad%2"), None);
        assert_eq!(decode_user("bad.name"), None);
        assert_eq!(decode_user("alice%2esmith"), None);
        assert_eq!(decode_user("%61lice"), None);
    }

    #[test]
    fn test_similar_user_ids_do_not_collide() {
        let (persistence, _temp) = create_test_persistence();
        assert_ne!(persistence.path_for("alice.smith"), persistence.path_for("alice_smith"));

        let dotted = create_test_record();
        let underscored = create_test_record();
        persistence.save("alice.smith", &[dotted.clone()]).unwrap();
        persistence.save("alice_smith", &[underscored.clone()]).unwrap();

        assert_eq!(persistence.load("alice.smith").unwrap(), vec![dotted]);
        assert_eq!(persistence.load("alice_smith").unwrap(), vec![underscored]);
        assert_eq!(
            persistence.list_users().unwrap(),
            vec!["alice.smith", "alice_smith"]
        );
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let (persistence, temp) = create_test_persistence();
        fs::create_dir(persistence.path_for("alice")).unwrap();

        assert!(persistence.save("alice", &[create_test_record()]).is_err());
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .collect();
        assert!(leftovers.is_empty());
    }
}
