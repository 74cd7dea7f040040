//! Session Gate and in-memory session storage
//!
//! Every browser gets a session identified by a cookie. A session carries the
//! "authenticated" flag set by the password gate and the form state (which
//! holds the rendered prompt once a submission succeeds). Nothing is persisted;
//! idle sessions are purged after the configured TTL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::form::FormState;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "dossier_session";

// ============================================================================
// Session
// ============================================================================

/// Per-browser state
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub authenticated: bool,
    pub form: FormState,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            authenticated: false,
            form: FormState::Empty,
            last_seen: now,
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.last_seen > ttl
    }
}

// ============================================================================
// Session Store
// ============================================================================

/// Shared, in-memory session map
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh, unauthenticated session
    pub async fn create(&self) -> Session {
        let session = Session::new();
        self.inner.write().await.insert(session.id, session.clone());
        tracing::debug!(session_id = %session.id, "Created session");
        session
    }

    /// Look up a session and mark it as seen
    pub async fn touch(&self, id: Uuid) -> Option<Session> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&id)?;
        session.last_seen = Utc::now();
        Some(session.clone())
    }

    /// Look up a session without refreshing it
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Mutate a session in place; `None` if it does not exist
    pub async fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.inner.write().await;
        sessions.get_mut(&id).map(f)
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.inner.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Drop sessions idle for longer than `ttl`; returns how many were removed
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(ttl));
        let removed = before - sessions.len();

        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Purged expired sessions");
        }

        removed
    }
}

// ============================================================================
// Session Gate
// ============================================================================

/// Shared-secret check guarding every page except the login form
#[derive(Clone)]
pub struct SessionGate {
    secret_digest: [u8; 32],
}

impl SessionGate {
    pub fn new(password: &str) -> Self {
        Self {
            secret_digest: digest(password),
        }
    }

    /// Compare the input with the configured secret
    pub fn check(&self, input: &str) -> bool {
        let candidate = digest(input);
        // Fixed-length comparison over the digests
        candidate
            .iter()
            .zip(self.secret_digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Run the check against the browser's current session.
    ///
    /// A correct password retires `previous` and issues a new authenticated
    /// session, so an id handed out before login never carries the flag. A
    /// wrong password clears the flag on `previous`, creating a session when
    /// the browser has none.
    pub async fn login(&self, store: &SessionStore, previous: Option<Uuid>, input: &str) -> LoginOutcome {
        if self.check(input) {
            if let Some(old) = previous {
                store.remove(old).await;
            }
            let session = store.create().await;
            store.update(session.id, |s| s.authenticated = true).await;
            tracing::info!(session_id = %session.id, "Session authenticated");

            return LoginOutcome {
                session_id: session.id,
                authenticated: true,
            };
        }

        let known = match previous {
            Some(id) => store.update(id, |s| s.authenticated = false).await.map(|_| id),
            None => None,
        };
        let session_id = match known {
            Some(id) => id,
            None => store.create().await.id,
        };
        tracing::warn!(session_id = %session_id, "Rejected password attempt");

        LoginOutcome {
            session_id,
            authenticated: false,
        }
    }
}

/// Result of a password attempt: the session the browser should hold next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session_id: Uuid,
    pub authenticated: bool,
}

fn digest(input: &str) -> [u8; 32] {
    Sha256::digest(input.as_bytes()).into()
}

/// Fingerprint of the configured secret, safe to log
pub fn secret_fingerprint(password: &str) -> String {
    hex::encode(&digest(password)[..4])
}

/// Extract the session id from a `Cookie` header value
pub fn session_id_from_cookie(header: &str) -> Option<Uuid> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session
pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_accepts_only_the_secret() {
        let gate = SessionGate::new("segredo");

        assert!(gate.check("segredo"));
        assert!(!gate.check("Segredo"));
        assert!(!gate.check(""));
    }

    #[tokio::test]
    async fn test_login_rotates_session() {
        let store = SessionStore::new();
        let gate = SessionGate::new("segredo");
        let session = store.create().await;

        let outcome = gate.login(&store, Some(session.id), "segredo").await;

        assert!(outcome.authenticated);
        assert_ne!(outcome.session_id, session.id);
        assert!(store.get(session.id).await.is_none());
        assert!(store.get(outcome.session_id).await.unwrap().authenticated);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_password_clears_flag() {
        let store = SessionStore::new();
        let gate = SessionGate::new("segredo");
        let session = store.create().await;
        store.update(session.id, |s| s.authenticated = true).await;

        let outcome = gate.login(&store, Some(session.id), "errado").await;

        assert!(!outcome.authenticated);
        assert_eq!(outcome.session_id, session.id);
        assert!(!store.get(session.id).await.unwrap().authenticated);
    }

    #[tokio::test]
    async fn test_login_unknown_session() {
        let store = SessionStore::new();
        let gate = SessionGate::new("segredo");
        let stale = Uuid::new_v4();

        let rejected = gate.login(&store, Some(stale), "errado").await;
        assert!(!rejected.authenticated);
        assert_ne!(rejected.session_id, stale);
        assert!(store.get(rejected.session_id).await.is_some());

        let accepted = gate.login(&store, None, "segredo").await;
        assert!(accepted.authenticated);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new();
        let stale = store.create().await;
        let fresh = store.create().await;

        store
            .update(stale.id, |s| s.last_seen = Utc::now() - Duration::minutes(30))
            .await;

        let removed = store.purge_expired(Duration::minutes(10)).await;

        assert_eq!(removed, 1);
        assert!(store.get(stale.id).await.is_none());
        assert!(store.get(fresh.id).await.is_some());
    }

    #[test]
    fn test_cookie_round_trip() {
        let id = Uuid::new_v4();
        let header = format!("theme=dark; {}", session_cookie(id));

        assert_eq!(session_id_from_cookie(&header), Some(id));
        assert_eq!(session_id_from_cookie("dossier_session=garbage"), None);
    }
}
