//! Session-backed user identity.
//!
//! Middleware never read session state from globals: they are given a
//! [`UserSession`] capability and ask it about the request at hand.
//! [`MemorySessionStore`] is an in-process implementation keyed by the
//! `session_id` cookie.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RequestContext;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

/// The logged-in user of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub email: String,
    pub role: UserRole,
}

/// Looks up session state for a request.
#[cfg_attr(test, mockall::automock)]
pub trait UserSession: Send + Sync {
    /// The user logged in on the request's session, if any
    fn current_user(&self, req: &RequestContext) -> Option<UserIdentity>;

    /// The CSRF token issued to the request's session, if any
    fn csrf_token(&self, req: &RequestContext) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
struct SessionData {
    user: Option<UserIdentity>,
    csrf_token: Option<String>,
}

/// Default upper bound on the number of live sessions of a [`MemorySessionStore`]
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Sessions held in process memory.
///
/// Sessions have no expiry; they live until [`MemorySessionStore::destroy`] or
/// until the store is full, at which point creating a session evicts the
/// oldest one. State is lost on restart and is not shared between processes.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<Sessions>,
    max_sessions: usize,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, SessionData>,
    // creation order, oldest first
    order: VecDeque<String>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `max_sessions` sessions (at least one)
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self { sessions: RwLock::default(), max_sessions: max_sessions.max(1) }
    }

    /// Returns the number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts an empty session and returns its id, evicting the oldest session when full
    pub fn create(&self) -> String {
        let session_id = random_token();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        while sessions.by_id.len() >= self.max_sessions {
            let Some(oldest) = sessions.order.pop_front() else {
                break;
            };
            sessions.by_id.remove(&oldest);
            debug!(max_sessions = self.max_sessions, "session store full, oldest session evicted");
        }

        sessions.by_id.insert(session_id.clone(), SessionData::default());
        sessions.order.push_back(session_id.clone());
        debug!("session created");
        session_id
    }

    /// Logs `user` into the session; returns false if the session does not exist
    pub fn set_user(&self, session_id: &str, user: UserIdentity) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.by_id.get_mut(session_id) {
            Some(data) => {
                data.user = Some(user);
                true
            }
            None => false,
        }
    }

    /// Issues a fresh CSRF token for the session, replacing any previous one
    pub fn issue_csrf_token(&self, session_id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let data = sessions.by_id.get_mut(session_id)?;
        let token = random_token();
        data.csrf_token = Some(token.clone());
        Some(token)
    }

    /// Drops the session; returns false if it did not exist
    pub fn destroy(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.by_id.remove(session_id).is_none() {
            return false;
        }
        sessions.order.retain(|id| id != session_id);
        true
    }

    /// The `set-cookie` value handing `session_id` to the client
    pub fn session_cookie(session_id: &str) -> String {
        format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
    }

    fn with_session<T>(&self, req: &RequestContext, f: impl FnOnce(&SessionData) -> Option<T>) -> Option<T> {
        let session_id = req.cookie(SESSION_COOKIE)?;
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions.by_id.get(session_id).and_then(f)
    }
}

impl UserSession for MemorySessionStore {
    fn current_user(&self, req: &RequestContext) -> Option<UserIdentity> {
        self.with_session(req, |data| data.user.clone())
    }

    fn csrf_token(&self, req: &RequestContext) -> Option<String> {
        self.with_session(req, |data| data.csrf_token.clone())
    }
}

/// 32 random bytes, hex encoded
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
