//! Client-local key-value storage for the bearer token and cached user.
//!
//! DESIGN
//! ======
//! The persisted layout is flat string keys, the same shape a browser's
//! `localStorage` holds: the token plus a denormalized `{username, role,
//! userId}` copy. `FileStorage` keeps the map in a JSON file so CLI
//! invocations share one session; `MemoryStorage` backs tests and embedders.
//!
//! TRADE-OFFS
//! ==========
//! A corrupt session file is treated as empty rather than an error. The only
//! consequence is a fresh login, which is the fail-closed outcome anyway.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::net::types::{Role, User};

pub const TOKEN_KEY: &str = "access_token";
pub const USERNAME_KEY: &str = "username";
pub const ROLE_KEY: &str = "role";
pub const USER_ID_KEY: &str = "userId";

const AUTH_KEYS: [&str; 4] = [TOKEN_KEY, USERNAME_KEY, ROLE_KEY, USER_ID_KEY];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session storage encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat string key-value store.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write several entries as one update.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove several keys as one update. Missing keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// =============================================================================
// AUTH DATA HELPERS
// =============================================================================

/// Persist a token and the denormalized user copy.
///
/// # Errors
///
/// Returns an error if the storage write fails.
pub fn store_auth_data(storage: &dyn SessionStorage, token: &str, user: &User) -> Result<(), StorageError> {
    let id = user.id.to_string();
    storage.set_many(&[
        (TOKEN_KEY, token),
        (USERNAME_KEY, &user.username),
        (ROLE_KEY, user.role.as_str()),
        (USER_ID_KEY, &id),
    ])
}

/// Remove every auth key.
///
/// # Errors
///
/// Returns an error if the storage write fails.
pub fn clear_auth_data(storage: &dyn SessionStorage) -> Result<(), StorageError> {
    storage.remove_many(&AUTH_KEYS)
}

#[must_use]
pub fn stored_token(storage: &dyn SessionStorage) -> Option<String> {
    storage.get(TOKEN_KEY).filter(|token| !token.is_empty())
}

/// Rebuild a user from the denormalized copy. `None` unless every field is
/// present and well-formed.
#[must_use]
pub fn cached_user(storage: &dyn SessionStorage) -> Option<User> {
    let username = storage.get(USERNAME_KEY)?;
    let role = storage.get(ROLE_KEY)?.parse::<Role>().ok()?;
    let id = storage.get(USER_ID_KEY)?.parse::<i64>().ok()?;
    Some(User { id, username, role, created_at: None, is_active: true })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = lock(&self.entries);
        for (key, value) in entries {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = lock(&self.entries);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// JSON-file-backed storage. The whole map is rewritten on every update.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "session file unreadable; starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = lock(&self.entries);
        let mut next = map.clone();
        for (key, value) in entries {
            next.insert((*key).to_owned(), (*value).to_owned());
        }
        self.flush(&next)?;
        *map = next;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = lock(&self.entries);
        if !keys.iter().any(|key| map.contains_key(*key)) {
            return Ok(());
        }
        let mut next = map.clone();
        for key in keys {
            next.remove(*key);
        }
        self.flush(&next)?;
        *map = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
