//! Console configuration

use crate::crud::DEFAULT_IDENTITY_COLUMN;
use std::time::Duration;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum allowed page size to prevent excessive memory usage
pub const MAX_PAGE_SIZE: u64 = 500;

/// Default lifetime of a session (and of its cookie)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Behaviour of a mounted [`ConsoleLayer`](crate::ConsoleLayer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSettings {
    /// URL prefix the API is nested under (e.g. "/api")
    pub base_path: String,

    /// Synthetic primary key prepended to created tables and used for ordering
    pub identity_column: String,

    /// Page size used when the request carries none (or an invalid one)
    pub default_page_size: u64,

    /// Upper bound applied to requested page sizes
    pub max_page_size: u64,

    /// Idle-independent lifetime of a session
    pub session_ttl: Duration,

    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,

    /// Origin allowed to call the API with credentials; permissive CORS when `None`
    pub allowed_origin: Option<String>,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            base_path: "/api".to_string(),
            identity_column: DEFAULT_IDENTITY_COLUMN.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            session_ttl: DEFAULT_SESSION_TTL,
            secure_cookie: false,
            allowed_origin: None,
        }
    }
}

impl ConsoleSettings {
    /// Set the URL prefix
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Restrict CORS to `origin`, allowing credentials
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = Some(origin.into());
        self
    }
}
