//! Device-local persistence for the questionnaire.
//!
//! `StateStorage` is the raw key-value surface (the browser's local storage on the
//! site, a directory of JSON documents or a map here). `ResponseStore` and `SiteState`
//! layer typed access on top and treat unreadable state as absent.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::contact::StoredContactSubmission;
use super::domain::{ProgressCursor, ResponseMap};

pub mod keys {
    pub const RESPONSES: &str = "questionnaire.responses";
    pub const PROGRESS: &str = "questionnaire.progress";
    pub const HAS_ENTERED: &str = "site.hasEntered";
    pub const SESSION_ID: &str = "site.sessionId";
    pub const CONTACT_SUBMISSIONS: &str = "contact.submissions";
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("state storage io failure for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("state for {key} could not be encoded: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("state storage unavailable: {0}")]
    Unavailable(String),
}

/// Raw key-value persistence. Writes are last-write-wins.
pub trait StateStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn keys(&self) -> Vec<String> {
        let guard = self.entries.lock().expect("storage mutex poisoned");
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().expect("storage mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("storage mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().expect("storage mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// One `<key>.json` document per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl StateStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|err| Self::io_error(key, err))?;
        let target = self.path_for(key);
        let staging = target.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|err| Self::io_error(key, err))?;
        fs::rename(&staging, &target).map_err(|err| Self::io_error(key, err))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(key, err)),
        }
    }
}

fn read_json<T: DeserializeOwned>(storage: &dyn StateStorage, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "treating unreadable state as absent");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "treating corrupt state as absent");
            None
        }
    }
}

fn write_json<T: Serialize>(
    storage: &dyn StateStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.write(key, &encoded)
}

/// Typed access to the in-progress questionnaire: answers plus the cursor.
#[derive(Clone)]
pub struct ResponseStore {
    storage: Arc<dyn StateStorage>,
}

impl ResponseStore {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Option<ResponseMap> {
        read_json(self.storage.as_ref(), keys::RESPONSES)
    }

    pub fn save(&self, responses: &ResponseMap) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), keys::RESPONSES, responses)
    }

    pub fn load_cursor(&self) -> Option<ProgressCursor> {
        read_json(self.storage.as_ref(), keys::PROGRESS)
    }

    pub fn save_cursor(&self, cursor: &ProgressCursor) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), keys::PROGRESS, cursor)
    }

    /// Writes answers then cursor. Sequential, not atomic across keys.
    pub fn persist(
        &self,
        responses: &ResponseMap,
        cursor: &ProgressCursor,
    ) -> Result<(), StorageError> {
        self.save(responses)?;
        self.save_cursor(cursor)
    }

    /// Forgets the answers but keeps the cursor.
    pub fn discard_responses(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::RESPONSES)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::RESPONSES)?;
        self.storage.remove(keys::PROGRESS)
    }
}

/// Site-wide device state outside the questionnaire proper.
#[derive(Clone)]
pub struct SiteState {
    storage: Arc<dyn StateStorage>,
}

impl SiteState {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self { storage }
    }

    /// Whether the visitor has passed the invitation screen on this device.
    pub fn has_entered(&self) -> bool {
        read_json::<bool>(self.storage.as_ref(), keys::HAS_ENTERED).unwrap_or(false)
    }

    pub fn mark_entered(&self) -> Result<(), StorageError> {
        write_json(self.storage.as_ref(), keys::HAS_ENTERED, &true)
    }

    /// Stable per-device session id, minted on first use as `<millis>-<9 chars>`.
    pub fn session_id(&self) -> String {
        if let Some(existing) = read_json::<String>(self.storage.as_ref(), keys::SESSION_ID) {
            if !existing.trim().is_empty() {
                return existing;
            }
        }

        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        let minted = format!("{}-{}", Utc::now().timestamp_millis(), suffix);
        if let Err(err) = write_json(self.storage.as_ref(), keys::SESSION_ID, &minted) {
            tracing::warn!(error = %err, "session id could not be persisted");
        }
        minted
    }

    pub fn contact_submissions(&self) -> Vec<StoredContactSubmission> {
        read_json(self.storage.as_ref(), keys::CONTACT_SUBMISSIONS).unwrap_or_default()
    }

    pub fn append_contact_submission(
        &self,
        submission: StoredContactSubmission,
    ) -> Result<(), StorageError> {
        let mut submissions = self.contact_submissions();
        submissions.push(submission);
        write_json(
            self.storage.as_ref(),
            keys::CONTACT_SUBMISSIONS,
            &submissions,
        )
    }
}
