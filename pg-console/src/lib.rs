//! # pg-console
//!
//! A browser-facing PostgreSQL admin console, mountable as an Axum layer.
//!
//! ## Features
//!
//! - Connect to any PostgreSQL database with user-supplied credentials
//! - Table listing and paginated browsing with catalog-derived column types
//! - Row insert, update and delete addressed by primary key
//! - Table create and drop
//! - Server-side sessions behind an opaque cookie
//! - Row codec for type-aware input validation, formatting and parsing
//!
//! ## Security Warning
//!
//! **This is an administration tool!**
//!
//! - No authentication/authorization of its own beyond the database credentials
//! - Exposes full database schema and data to whoever holds a session
//! - Column constraints on table creation are passed through as SQL fragments
//! - Should never be exposed in production or public networks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use pg_console::{ConsoleLayer, ConsoleSettings, PoolSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = ConsoleSettings::default().with_allowed_origin("http://localhost:3000");
//!
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(ConsoleLayer::postgres(settings, PoolSettings::default()).into_router());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

// Public modules
pub mod api;
pub mod codec;
pub mod crud;
pub mod database;
pub mod identifier;
pub mod layer;
pub mod query;
pub mod schema;
pub mod session;
pub mod settings;

#[cfg(test)]
mod test_utils;

// Public exports
pub use api::{ApiError, ConsoleState};
pub use codec::InputKind;
pub use crud::TableEditor;
pub use identifier::Identifier;
pub use layer::ConsoleLayer;
pub use schema::{ColumnDescriptor, ConnectionConfig, PageResult, Pagination, Row, TableDescriptor};
pub use settings::ConsoleSettings;

// Re-export database traits and providers
pub use database::traits::{ConnectionProvider, DatabaseConnection, DatabaseError};

#[cfg(feature = "postgres")]
pub use database::postgres::{PoolSettings, PostgresProvider};
