//! Signed-in session state, passed explicitly to every component that talks
//! to the backend.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const FILENAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Persistence for the session. Implementations decide where it lives.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores the session as JSON next to the app config.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_config_dir() -> Result<Self> {
        let dir = crate::config::Config::dir()?;
        Ok(Self::new(dir.join(FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let session = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: RefCell<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.borrow_mut() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.borrow_mut() = None;
        Ok(())
    }
}

/// The current session plus the store it is persisted in.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    current: RefCell<Option<Session>>,
}

impl SessionContext {
    /// Restores a persisted session. One that cannot be read is discarded.
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        let current = match store.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Discarding stored session: {e:#}");
                if let Err(e) = store.clear() {
                    tracing::warn!("Failed to clear stored session: {e:#}");
                }
                None
            }
        };
        Self {
            store,
            current: RefCell::new(current),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemorySessionStore::default()))
    }

    pub fn session(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn set(&self, session: Session) {
        if let Err(e) = self.store.save(&session) {
            tracing::warn!("Failed to persist session: {e:#}");
        }
        *self.current.borrow_mut() = Some(session);
    }

    /// Swaps in a new access token, keeping the user. The refresh token is
    /// replaced only when the server rotated it.
    pub fn set_tokens(&self, access_token: String, refresh_token: Option<String>) {
        let updated = self.current.borrow().clone().map(|mut s| {
            s.access_token = access_token;
            if let Some(token) = refresh_token.filter(|t| !t.is_empty()) {
                s.refresh_token = Some(token);
            }
            s
        });
        if let Some(session) = updated {
            self.set(session);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear session: {e:#}");
        }
        *self.current.borrow_mut() = None;
    }
}

#[cfg(test)]
pub fn sample_session() -> Session {
    Session {
        user: User {
            id: 7,
            email: "ada@example.com".to_string(),
            status: "active".to_string(),
            last_login_at: None,
        },
        access_token: "access-1".to_string(),
        refresh_token: Some("refresh-1".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join(FILENAME));
        assert!(store.load().unwrap().is_none());

        store.save(&sample_session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_session_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        std::fs::write(&path, "{not json").unwrap();

        let ctx = SessionContext::new(Box::new(FileSessionStore::new(&path)));
        assert!(!ctx.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_context_tracks_tokens() {
        let ctx = SessionContext::in_memory();
        assert!(!ctx.is_authenticated());

        ctx.set(sample_session());
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.refresh_token().as_deref(), Some("refresh-1"));

        ctx.set_tokens("access-2".to_string(), None);
        assert_eq!(ctx.access_token().as_deref(), Some("access-2"));
        assert_eq!(ctx.refresh_token().as_deref(), Some("refresh-1"));
        assert_eq!(ctx.user().map(|u| u.id), Some(7));

        ctx.set_tokens("access-3".to_string(), Some("refresh-2".to_string()));
        assert_eq!(ctx.refresh_token().as_deref(), Some("refresh-2"));

        ctx.clear();
        assert!(ctx.session().is_none());
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let ctx = SessionContext::in_memory();
        let mut session = sample_session();
        session.access_token.clear();
        ctx.set(session);
        assert!(!ctx.is_authenticated());
    }
}
