//! Persisted token store for the portal session.
//!
//! The store owns the access/refresh token pair exclusively; every other
//! component (guard, API client, flows) holds a cheap clone of the handle
//! and queries it live. `set` and `clear` always touch both tokens
//! together - there is deliberately no partial update, so an access token
//! can never survive without the refresh token it was issued with.
//!
//! The pair is persisted as `session.json` in the cache directory and
//! survives restarts. Tests substitute `TokenStore::in_memory()`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Session file name in the cache directory
const SESSION_FILE: &str = "session.json";

/// The client-held session: the access/refresh token pair.
///
/// An absent access token means unauthenticated, regardless of whether a
/// refresh token is present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// On-disk shape of the session. `saved_at` is display metadata only and
/// takes no part in the authenticated/unauthenticated decision.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

struct Inner {
    /// None for in-memory stores (tests); Some(cache dir) otherwise.
    dir: Option<PathBuf>,
    session: Session,
    saved_at: Option<DateTime<Utc>>,
}

/// Shared, atomic holder of the current session.
/// Clone is cheap - all clones point at the same state.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Mutex<Inner>>,
}

impl TokenStore {
    /// Open the store backed by `session.json` under `cache_dir`, loading
    /// any previously persisted session. An unreadable or corrupt file is
    /// treated as no session.
    pub fn open(cache_dir: &Path) -> Self {
        let path = cache_dir.join(SESSION_FILE);
        let (session, saved_at) = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<SessionFile>(&contents) {
                Ok(file) => (
                    Session {
                        access_token: file.access_token,
                        refresh_token: file.refresh_token,
                    },
                    file.saved_at,
                ),
                Err(e) => {
                    warn!(error = %e, ?path, "Ignoring unparseable session file");
                    (Session::default(), None)
                }
            },
            Err(_) => (Session::default(), None),
        };

        debug!(
            authenticated = session.is_authenticated(),
            "Token store opened"
        );

        Self {
            inner: Arc::new(Mutex::new(Inner {
                dir: Some(cache_dir.to_path_buf()),
                session,
                saved_at,
            })),
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                dir: None,
                session: Session::default(),
                saved_at: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> Session {
        self.lock().session.clone()
    }

    /// When the current session was stored, for display purposes.
    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.lock().saved_at
    }

    /// Replace both tokens together and persist the result.
    ///
    /// The in-memory state is always updated; the returned error only
    /// reflects persistence problems.
    pub fn set(&self, access_token: String, refresh_token: Option<String>) -> Result<()> {
        let mut inner = self.lock();
        inner.session = Session {
            access_token: Some(access_token),
            refresh_token,
        };
        inner.saved_at = Some(Utc::now());
        Self::persist(&inner)
    }

    /// Empty both tokens together and remove the persisted session.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.session = Session::default();
        inner.saved_at = None;

        if let Some(ref dir) = inner.dir {
            let path = dir.join(SESSION_FILE);
            if path.exists() {
                std::fs::remove_file(&path).context("Failed to remove session file")?;
            }
        }
        Ok(())
    }

    fn persist(inner: &Inner) -> Result<()> {
        let Some(ref dir) = inner.dir else {
            return Ok(());
        };
        std::fs::create_dir_all(dir).context("Failed to create cache directory")?;

        let file = SessionFile {
            access_token: inner.session.access_token.clone(),
            refresh_token: inner.session.refresh_token.clone(),
            saved_at: inner.saved_at,
        };
        let contents = serde_json::to_string_pretty(&file)?;
        std::fs::write(dir.join(SESSION_FILE), contents).context("Failed to write session file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_both_tokens() {
        let store = TokenStore::in_memory();
        store.set("access-1".into(), Some("refresh-1".into())).unwrap();

        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("access-1"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));

        // A set without a refresh token must not leave the old one behind
        store.set("access-2".into(), None).unwrap();
        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("access-2"));
        assert!(session.refresh_token.is_none());
    }

    #[test]
    fn test_clear_empties_both_tokens() {
        let store = TokenStore::in_memory();
        store.set("access".into(), Some("refresh".into())).unwrap();
        store.clear().unwrap();

        let session = store.get();
        assert!(session.access_token.is_none());
        assert!(session.refresh_token.is_none());
        assert!(!session.is_authenticated());
        assert!(store.signed_in_at().is_none());
    }

    #[test]
    fn test_atomicity_over_mixed_sequences() {
        let store = TokenStore::in_memory();

        // After any sequence of set/clear, the state matches the last call
        store.set("a1".into(), Some("r1".into())).unwrap();
        store.clear().unwrap();
        store.set("a2".into(), None).unwrap();
        store.set("a3".into(), Some("r3".into())).unwrap();

        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("a3"));
        assert_eq!(session.refresh_token.as_deref(), Some("r3"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.get(), Session::default());
    }

    #[test]
    fn test_authenticated_requires_access_token() {
        let session = Session {
            access_token: None,
            refresh_token: Some("refresh".into()),
        };
        // A refresh token alone never counts as authenticated
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let store = TokenStore::open(dir.path());
        store.set("access".into(), Some("refresh".into())).unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());

        // A fresh handle over the same directory sees the same session
        let reopened = TokenStore::open(dir.path());
        let session = reopened.get();
        assert_eq!(session.access_token.as_deref(), Some("access"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert!(reopened.signed_in_at().is_some());
    }

    #[test]
    fn test_clear_removes_session_file() {
        let dir = tempfile::tempdir().unwrap();

        let store = TokenStore::open(dir.path());
        store.set("access".into(), None).unwrap();
        store.clear().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());

        let reopened = TokenStore::open(dir.path());
        assert!(!reopened.get().is_authenticated());
    }

    #[test]
    fn test_corrupt_session_file_treated_as_no_session() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "not json").unwrap();

        let store = TokenStore::open(dir.path());
        assert!(!store.get().is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let store = TokenStore::in_memory();
        let clone = store.clone();

        store.set("access".into(), None).unwrap();
        assert!(clone.get().is_authenticated());

        clone.clear().unwrap();
        assert!(!store.get().is_authenticated());
    }
}
