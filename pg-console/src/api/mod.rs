//! REST API endpoints
//!
//! This module contains all API endpoint handlers for the console.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::database::traits::ConnectionProvider;
use crate::session::SessionStore;
use crate::settings::ConsoleSettings;

pub mod connection;
pub mod error;
pub mod rows;
pub mod tables;

// Re-export handlers for convenience
pub use connection::{connect_handler, disconnect_handler};
pub use error::ApiError;
pub use rows::{delete_row_handler, get_rows_handler, insert_row_handler, update_row_handler};
pub use tables::{create_table_handler, drop_table_handler, list_tables_handler};

/// State shared by every handler
pub struct ConsoleState<P: ConnectionProvider> {
    pub provider: Arc<P>,
    pub sessions: Arc<SessionStore<P::Connection>>,
    pub settings: Arc<ConsoleSettings>,
}

impl<P: ConnectionProvider> ConsoleState<P> {
    pub fn new(provider: P, settings: ConsoleSettings) -> Self {
        Self {
            provider: Arc::new(provider),
            sessions: Arc::new(SessionStore::new(settings.session_ttl)),
            settings: Arc::new(settings),
        }
    }
}

// Manual impl: P itself need not be Clone
impl<P: ConnectionProvider> Clone for ConsoleState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            sessions: Arc::clone(&self.sessions),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `state` - Provider, session store and settings shared by the handlers
///
/// # Returns
///
/// An Axum Router configured with all API routes
pub fn create_api_router<P: ConnectionProvider>(state: ConsoleState<P>) -> Router {
    // Axum 0.8 uses {param} syntax instead of :param
    Router::new()
        .route("/connectdb", post(connect_handler::<P>))
        .route("/disconnect", post(disconnect_handler::<P>))
        .route("/tables", get(list_tables_handler::<P>))
        .route("/create-table", post(create_table_handler::<P>))
        .route(
            "/table/{name}",
            get(get_rows_handler::<P>)
                .post(insert_row_handler::<P>)
                .put(update_row_handler::<P>)
                .delete(delete_row_handler::<P>),
        )
        .route("/table/{name}/drop", delete(drop_table_handler::<P>))
        .with_state(state)
}
