//! Server-side sessions
//!
//! Credentials and the connection opened with them stay on the server in a
//! [`SessionStore`]; the browser only holds a random session id in the
//! [`SESSION_COOKIE`] cookie. Handlers get at the connection through the
//! [`Session`] extractor.

use crate::api::{ApiError, ConsoleState};
use crate::database::traits::{ConnectionProvider, DatabaseConnection};
use crate::schema::ConnectionConfig;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "pgconsole.sid";

struct SessionEntry<C> {
    config: ConnectionConfig,
    connection: C,
    expires_at: Instant,
}

/// Live sessions keyed by session id
pub struct SessionStore<C> {
    entries: RwLock<HashMap<Uuid, SessionEntry<C>>>,
    ttl: Duration,
}

impl<C: DatabaseConnection> SessionStore<C> {
    /// Create an empty store whose sessions live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a freshly opened connection, returning the new session id
    ///
    /// Expired sessions are purged first.
    pub async fn insert(&self, config: ConnectionConfig, connection: C) -> Uuid {
        self.purge_expired().await;

        let id = Uuid::new_v4();
        let entry = SessionEntry {
            config,
            connection,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(id, entry);
        id
    }

    /// Connection of a live session
    ///
    /// An expired session is removed and its connection closed.
    pub async fn connection(&self, id: Uuid) -> Option<C> {
        {
            let entries = self.entries.read().await;
            match entries.get(&id) {
                None => return None,
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.connection.clone());
                }
                Some(_) => {}
            }
        }

        let expired = self.entries.write().await.remove(&id);
        if let Some(entry) = expired {
            tracing::info!(database = %entry.config.database, "session expired");
            entry.connection.close().await;
        }
        None
    }

    /// End a session and close its connection
    ///
    /// Returns `false` when no such session existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.entries.write().await.remove(&id);
        match removed {
            Some(entry) => {
                tracing::info!(database = %entry.config.database, "session closed");
                entry.connection.close().await;
                true
            }
            None => false,
        }
    }

    /// Remove every expired session and close its connection
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let expired: Vec<SessionEntry<C>> = {
            let mut entries = self.entries.write().await;
            let ids: Vec<Uuid> = entries
                .iter()
                .filter(|(_, entry)| entry.expires_at <= now)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };

        for entry in expired {
            tracing::info!(database = %entry.config.database, "session expired");
            entry.connection.close().await;
        }
    }

    /// Number of stored sessions, expired ones included
    pub async fn session_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn cookie(value: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        value,
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(id: Uuid, max_age: Duration, secure: bool) -> String {
    cookie(&id.to_string(), max_age, secure)
}

/// `Set-Cookie` value removing the session cookie
pub fn cleared_cookie(secure: bool) -> String {
    cookie("", Duration::ZERO, secure)
}

/// Session id carried by the request's cookies, if any
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// The session id cookie, whether or not it names a live session
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_id(&parts.headers)))
    }
}

/// The connection of the caller's live session
///
/// Rejects with [`ApiError::NoConnection`] when the request carries no
/// session cookie or the session is unknown or expired.
pub struct Session<C> {
    pub connection: C,
}

impl<P: ConnectionProvider> FromRequestParts<ConsoleState<P>> for Session<P::Connection> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ConsoleState<P>,
    ) -> Result<Self, Self::Rejection> {
        let id = session_id(&parts.headers).ok_or(ApiError::NoConnection)?;
        let connection = state
            .sessions
            .connection(id)
            .await
            .ok_or(ApiError::NoConnection)?;
        Ok(Self { connection })
    }
}
