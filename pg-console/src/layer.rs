//! ConsoleLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the console API
//! into an Axum application.

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::{create_api_router, ConsoleState};
use crate::database::traits::ConnectionProvider;
use crate::settings::ConsoleSettings;

#[cfg(feature = "postgres")]
use crate::database::postgres::{PoolSettings, PostgresProvider};

/// Main layer for integrating the console into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use pg_console::{ConsoleLayer, ConsoleSettings, PoolSettings};
///
/// let console = ConsoleLayer::postgres(ConsoleSettings::default(), PoolSettings::default());
/// let app: Router = Router::new().merge(console.into_router());
/// ```
pub struct ConsoleLayer<P: ConnectionProvider> {
    settings: ConsoleSettings,
    provider: P,
}

impl<P: ConnectionProvider> ConsoleLayer<P> {
    /// Create a new console
    ///
    /// # Arguments
    ///
    /// * `settings` - Mount path, paging, session and CORS settings
    /// * `provider` - Opens a connection for each new session
    pub fn new(settings: ConsoleSettings, provider: P) -> Self {
        Self { settings, provider }
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - API endpoints at `{base_path}/*`
    /// - CORS middleware: credentialed for the configured origin, permissive otherwise
    pub fn into_router(self) -> Router {
        let base_path = self.settings.base_path.trim_end_matches('/').to_string();
        let cors = cors_layer(self.settings.allowed_origin.as_deref());
        let api_router = create_api_router(ConsoleState::new(self.provider, self.settings));

        // Axum 0.8 refuses to nest at the root
        let router = if base_path.is_empty() {
            Router::new().merge(api_router)
        } else {
            Router::new().nest(&base_path, api_router)
        };

        router.layer(cors)
    }
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = allowed_origin else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        // Cookies only travel with an explicit origin
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([CONTENT_TYPE]),
        Err(_) => {
            tracing::warn!(origin, "ignoring invalid allowed origin");
            CorsLayer::new()
        }
    }
}

#[cfg(feature = "postgres")]
impl ConsoleLayer<PostgresProvider> {
    /// Create a new console backed by PostgreSQL
    ///
    /// # Arguments
    ///
    /// * `settings` - Mount path, paging, session and CORS settings
    /// * `pool` - Sizing of the pool opened for each session
    pub fn postgres(settings: ConsoleSettings, pool: PoolSettings) -> Self {
        Self::new(settings, PostgresProvider::new(pool))
    }
}
