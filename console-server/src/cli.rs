use std::net::SocketAddr;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "console-server", version, about)]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "PG_CONSOLE_BIND", default_value = "127.0.0.1:3001")]
    pub bind: SocketAddr,

    /// URL prefix of the API
    #[arg(long, env = "PG_CONSOLE_BASE_PATH", default_value = "/api")]
    pub base_path: String,

    /// Origin of the browser client allowed to send credentials.
    /// Pass an empty value for permissive CORS.
    #[arg(long, env = "PG_CONSOLE_ALLOWED_ORIGIN", default_value = "http://localhost:3000")]
    pub allowed_origin: String,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, env = "PG_CONSOLE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Session (and cookie) lifetime in seconds.
    #[arg(long, env = "PG_CONSOLE_SESSION_TTL_SECS", default_value_t = 86_400)]
    pub session_ttl_secs: u64,

    /// Mark the session cookie Secure (serve over HTTPS).
    #[arg(long, env = "PG_CONSOLE_SECURE_COOKIE")]
    pub secure_cookie: bool,

    /// Rows per page when the client sends none.
    #[arg(long, env = "PG_CONSOLE_DEFAULT_PAGE_SIZE", default_value_t = 10)]
    pub default_page_size: u64,

    /// Largest page size a client may request.
    #[arg(long, env = "PG_CONSOLE_MAX_PAGE_SIZE", default_value_t = 500)]
    pub max_page_size: u64,

    /// Maximum connections in each session's pool.
    #[arg(long, env = "PG_CONSOLE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// How long to wait for a pooled connection, in milliseconds.
    #[arg(long, env = "PG_CONSOLE_ACQUIRE_TIMEOUT_MS", default_value_t = 5_000)]
    pub acquire_timeout_ms: u64,
}
