//! Authentication session context.
//!
//! The context holds the signed-in user and bearer token. It is passed
//! explicitly to whatever needs it and mirrors its state into a
//! [`SessionStore`], from which it can be restored with [`AuthContext::load`].

use crate::models::User;
use std::collections::HashMap;
use std::fmt;

/// Store key holding the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Store key holding the JSON-encoded user.
pub const USER_KEY: &str = "user";

/// Key-value storage backing an [`AuthContext`].
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-process session store.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionStore {
    entries: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Session errors.
#[derive(Debug)]
pub enum SessionError {
    /// The stored user could not be decoded
    CorruptUser(String),
    /// The user could not be encoded for storage
    SerializeError(String),
    /// An operation needed a token but none is set
    NotAuthenticated,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::CorruptUser(e) => write!(f, "Stored user is corrupt: {e}"),
            SessionError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            SessionError::NotAuthenticated => write!(f, "Not authenticated"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Current authentication state.
pub struct AuthContext<S: SessionStore> {
    store: S,
    user: Option<User>,
    token: Option<String>,
}

impl<S: SessionStore> AuthContext<S> {
    /// Create an unauthenticated context over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            user: None,
            token: None,
        }
    }

    /// Restore the session from the store.
    ///
    /// Both the token and the user must be present. A user entry that does not
    /// decode clears both entries and leaves the context signed out.
    pub fn load(&mut self) -> Result<(), SessionError> {
        let (Some(token), Some(user_json)) = (self.store.get(TOKEN_KEY), self.store.get(USER_KEY))
        else {
            return Ok(());
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => {
                tracing::debug!(user_id = %user.user_id, "Restored session");
                self.user = Some(user);
                self.token = Some(token);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to parse user from session store: {}", e);
                self.store.remove(TOKEN_KEY);
                self.store.remove(USER_KEY);
                self.user = None;
                self.token = None;
                Err(SessionError::CorruptUser(e.to_string()))
            }
        }
    }

    /// Replace the session. Passing `None` for either part clears that entry.
    pub fn set_auth(&mut self, user: Option<User>, token: Option<String>) -> Result<(), SessionError> {
        tracing::debug!(
            user_id = user.as_ref().map(|u| u.user_id.as_str()).unwrap_or("-"),
            has_token = token.is_some(),
            "Setting auth state"
        );

        match &user {
            Some(u) => {
                let json = serde_json::to_string(u)
                    .map_err(|e| SessionError::SerializeError(e.to_string()))?;
                self.store.set(USER_KEY, json);
            }
            None => self.store.remove(USER_KEY),
        }
        match &token {
            Some(t) => self.store.set(TOKEN_KEY, t.clone()),
            None => self.store.remove(TOKEN_KEY),
        }

        self.user = user;
        self.token = token;
        Ok(())
    }

    /// Sign out.
    pub fn clear(&mut self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(USER_KEY);
        self.user = None;
        self.token = None;
    }

    pub fn current_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The token, or [`SessionError::NotAuthenticated`].
    pub fn require_token(&self) -> Result<&str, SessionError> {
        self.current_token().ok_or(SessionError::NotAuthenticated)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
