//! Connection provider and connection traits
//!
//! These traits define the seam between the HTTP layer / CRUD engine and a
//! concrete database driver.

use crate::query::Statement;
use crate::schema::{ColumnDescriptor, ConnectionConfig, Row, TableDescriptor};
use async_trait::async_trait;
use thiserror::Error;

/// Produces connections from user-supplied credentials
///
/// No reuse guarantee is made across calls: every call may open a fresh pool.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Connection handle produced by this provider
    type Connection: DatabaseConnection;

    /// Open a connection for the given credentials
    ///
    /// # Errors
    ///
    /// [`DatabaseError::Connection`] when the host is unreachable, the
    /// credentials are rejected or the database does not exist.
    async fn acquire(&self, config: &ConnectionConfig) -> Result<Self::Connection, DatabaseError>;
}

/// A live handle able to introspect the catalog and run [`Statement`]s
///
/// Handles are cheap to clone (pool handles) and shared between the session
/// store and in-flight requests.
#[async_trait]
pub trait DatabaseConnection: Clone + Send + Sync + 'static {
    /// List base tables of the default user schema, ordered by name
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>, DatabaseError>;

    /// List the columns of `table` in physical order
    ///
    /// An unknown table yields an empty list, not an error.
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError>;

    /// Run a statement that produces rows (SELECT or DML with RETURNING)
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError>;

    /// Run a statement that produces a single integer (row counts)
    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError>;

    /// Run a statement for its side effect, returning the affected row count
    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError>;

    /// Release the underlying resources
    async fn close(&self);
}

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Target unreachable, credentials rejected or database missing
    #[error("Connection error: {0}")]
    Connection(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),

    /// DDL failure (duplicate table, unknown type, dependent objects)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Uniqueness, not-null, foreign key or type constraint violated
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Table not found
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Primary key matched zero rows
    #[error("Row not found")]
    RowNotFound,

    /// Invalid column name
    #[error("Invalid column: {0}")]
    InvalidColumn(String),

    /// Name rejected by the identifier check
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Request input rejected before any statement ran
    #[error("{0}")]
    Validation(String),
}

impl DatabaseError {
    /// Whether the error was caused by the caller's input rather than the database
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DatabaseError::InvalidColumn(_)
                | DatabaseError::InvalidIdentifier(_)
                | DatabaseError::Validation(_)
        )
    }

    /// Whether the error means the addressed table or row does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::TableNotFound(_) | DatabaseError::RowNotFound)
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(database_error) => {
                let message = database_error.message().to_string();
                match database_error.code().as_deref() {
                    // integrity_constraint_violation, data_exception
                    Some(code) if code.starts_with("23") || code.starts_with("22") => {
                        DatabaseError::Constraint(message)
                    }
                    // syntax_error_or_access_rule_violation, dependent_objects_still_exist
                    Some(code) if code.starts_with("42") || code == "2BP01" => {
                        DatabaseError::Schema(message)
                    }
                    // connection_exception, invalid_authorization, invalid_catalog_name
                    Some(code) if code.starts_with("08") || code.starts_with("28") || code == "3D000" => {
                        DatabaseError::Connection(message)
                    }
                    _ => DatabaseError::Query(message),
                }
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::Connection(error.to_string()),
            _ => DatabaseError::Query(error.to_string()),
        }
    }
}
