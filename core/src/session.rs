//! Session marker and its persistence.
//!
//! # Design
//! The session is an explicit `SessionContext` value handed to the router
//! and the request builders instead of being read from ambient storage.
//! Persistence is delegated to a `SessionStore`, which stores one JSON
//! record under `SESSION_KEY`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::AuthPayload;

/// Storage key of the persisted session record.
pub const SESSION_KEY: &str = "userData";

/// Authenticated user record. Holds the token plus whatever else the login
/// payload carried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            profile: Map::new(),
        }
    }

    /// Build a session from a login/register payload. `None` when the
    /// payload carries no usable token.
    pub fn from_auth(payload: AuthPayload) -> Option<Self> {
        match payload.token {
            Some(token) if !token.is_empty() => Some(Self {
                token,
                profile: payload.profile,
            }),
            _ => None,
        }
    }

    /// Owner id of the signed-in user, looked up in the usual places a
    /// login payload puts it.
    pub fn user_id(&self) -> Option<&str> {
        ["userId", "_id", "id"]
            .iter()
            .find_map(|key| self.profile.get(*key).and_then(Value::as_str))
            .or_else(|| {
                let user = self.profile.get("user")?;
                user.get("_id")
                    .or_else(|| user.get("id"))
                    .and_then(Value::as_str)
            })
    }
}

/// Errors raised while loading or persisting the session record.
#[derive(Debug)]
pub enum SessionError {
    Io(io::Error),

    /// The stored record is not valid JSON or lacks a token.
    Corrupt(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(err) => write!(f, "session storage I/O failed: {err}"),
            SessionError::Corrupt(msg) => write!(f, "stored session is corrupt: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Io(err) => Some(err),
            SessionError::Corrupt(_) => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        SessionError::Io(err)
    }
}

/// Key/value storage for the session record, modelled on browser local
/// storage: values are JSON strings.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: BTreeMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores all keys in a single JSON object file. A missing file reads as
/// empty storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&raw).map_err(|e| SessionError::Corrupt(e.to_string()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SessionError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    /// Removing from a file that is not a JSON object deletes the file.
    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(SessionError::Corrupt(msg)) => {
                warn!("{} is unreadable ({msg}), removing it", self.path.display());
                return self.write_all(&BTreeMap::new());
            }
            Err(err) => return Err(err),
        };
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// The current session together with the store it is persisted in.
///
/// Presence of a session means "authenticated"; nothing is verified
/// client-side.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    session: Option<Session>,
}

impl SessionContext {
    /// Load the persisted session, if any, from `store`.
    pub fn load(store: impl SessionStore + 'static) -> Result<Self, SessionError> {
        let session = read_session(&store)?;
        debug!("loaded session context (authenticated: {})", session.is_some());
        Ok(Self {
            store: Box::new(store),
            session,
        })
    }

    /// Like `load`, but a corrupt record is deleted and the context starts
    /// signed out. I/O failures are still returned.
    pub fn load_or_reset(mut store: impl SessionStore + 'static) -> Result<Self, SessionError> {
        let session = match read_session(&store) {
            Ok(session) => session,
            Err(SessionError::Corrupt(msg)) => {
                warn!("discarding stored session: {msg}");
                store.remove(SESSION_KEY)?;
                None
            }
            Err(err) => return Err(err),
        };
        Ok(Self {
            store: Box::new(store),
            session,
        })
    }

    /// An empty, memory-backed context.
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemorySessionStore::new()),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Replace the current session and persist it.
    pub fn sign_in(&mut self, session: Session) -> Result<(), SessionError> {
        let raw = serde_json::to_string(&session).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        self.store.set(SESSION_KEY, raw)?;
        self.session = Some(session);
        Ok(())
    }

    /// Drop the persisted record, then the current session. Returns whether
    /// a session was present. If the store fails the session is kept.
    pub fn sign_out(&mut self) -> Result<bool, SessionError> {
        if self.session.is_none() {
            return Ok(false);
        }
        warn!("clearing session");
        self.store.remove(SESSION_KEY)?;
        self.session = None;
        Ok(true)
    }
}

fn read_session(store: &dyn SessionStore) -> Result<Option<Session>, SessionError> {
    match store.get(SESSION_KEY)? {
        Some(raw) => serde_json::from_str::<Session>(&raw)
            .map(Some)
            .map_err(|e| SessionError::Corrupt(e.to_string())),
        None => Ok(None),
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.session.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("todo-client-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn sign_in_persists_and_load_restores() {
        let path = temp_path("restore");
        let _ = fs::remove_file(&path);
        let mut ctx = SessionContext::load(FileSessionStore::new(&path)).unwrap();
        assert!(!ctx.is_authenticated());

        ctx.sign_in(Session::new("tok-1")).unwrap();
        let stored: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record: Value = serde_json::from_str(stored[SESSION_KEY].as_str().unwrap()).unwrap();
        assert_eq!(record["token"], "tok-1");

        let restored = SessionContext::load(FileSessionStore::new(&path)).unwrap();
        assert_eq!(restored.token(), Some("tok-1"));

        let mut restored = restored;
        assert!(restored.sign_out().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn sign_out_reports_only_the_first_clear() {
        let mut ctx = SessionContext::in_memory();
        ctx.sign_in(Session::new("tok")).unwrap();
        assert!(ctx.sign_out().unwrap());
        assert!(!ctx.sign_out().unwrap());
        assert!(ctx.token().is_none());
    }

    #[test]
    fn load_rejects_record_without_token() {
        let mut store = MemorySessionStore::new();
        store.set(SESSION_KEY, r#"{"name":"x"}"#.to_string()).unwrap();
        let err = SessionContext::load(store).unwrap_err();
        assert!(matches!(err, SessionError::Corrupt(_)));
    }

    #[test]
    fn load_or_reset_discards_record_without_token() {
        let mut store = MemorySessionStore::new();
        store.set(SESSION_KEY, r#"{"name":"x"}"#.to_string()).unwrap();
        let mut ctx = SessionContext::load_or_reset(store).unwrap();
        assert!(!ctx.is_authenticated());
        assert!(!ctx.sign_out().unwrap());
    }

    #[test]
    fn load_or_reset_deletes_unreadable_file() {
        let path = temp_path("garbage");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SessionContext::load(FileSessionStore::new(&path)),
            Err(SessionError::Corrupt(_))
        ));

        let ctx = SessionContext::load_or_reset(FileSessionStore::new(&path)).unwrap();
        assert!(!ctx.is_authenticated());
        assert!(!path.exists());
    }

    struct ReadOnlyStore(Option<String>);

    impl SessionStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, SessionError> {
            Ok(self.0.clone())
        }

        fn set(&mut self, _key: &str, _value: String) -> Result<(), SessionError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn remove(&mut self, _key: &str) -> Result<(), SessionError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn failed_sign_out_keeps_session() {
        let mut ctx = SessionContext::load(ReadOnlyStore(Some(r#"{"token":"tok"}"#.to_string()))).unwrap();
        assert!(matches!(ctx.sign_out(), Err(SessionError::Io(_))));
        assert_eq!(ctx.token(), Some("tok"));
    }

    #[test]
    fn from_auth_requires_token() {
        let payload: AuthPayload = serde_json::from_value(json!({"token": "", "name": "a"})).unwrap();
        assert!(Session::from_auth(payload).is_none());

        let payload: AuthPayload =
            serde_json::from_value(json!({"token": "t", "user": {"_id": "u9"}})).unwrap();
        let session = Session::from_auth(payload).unwrap();
        assert_eq!(session.token, "t");
        assert_eq!(session.user_id(), Some("u9"));
    }

    #[test]
    fn user_id_prefers_top_level_keys() {
        let session: Session =
            serde_json::from_value(json!({"token": "t", "userId": "top", "user": {"_id": "nested"}})).unwrap();
        assert_eq!(session.user_id(), Some("top"));
    }
}
