//! Database abstraction layer
//!
//! This module provides the driver-agnostic connection traits and the
//! PostgreSQL implementation.

pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export the main traits
pub use traits::{ConnectionProvider, DatabaseConnection, DatabaseError};
