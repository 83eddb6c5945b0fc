//! Data model and wire types
//!
//! Descriptors produced by schema introspection, the request and response
//! bodies of the HTTP surface, and the pagination model.

use crate::codec::{self, InputKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A row as returned to the client: column name -> JSON scalar, in column order
pub type Row = serde_json::Map<String, serde_json::Value>;

fn default_port() -> u16 {
    5432
}

/// Connection parameters supplied by the user at connect time
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub database: String,

    pub user: String,

    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// Reject configurations with empty required fields
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("host", self.host.trim().is_empty()),
            ("database", self.database.trim().is_empty()),
            ("user", self.user.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Missing connection fields: {}", missing.join(", ")))
        }
    }
}

// Hand-written so the password never reaches logs
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A table of the default user schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub table_name: String,
}

/// A column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub column_name: String,

    /// `information_schema` type name (e.g. "integer", "character varying")
    pub data_type: String,

    /// Input affordance derived from `data_type`
    pub input_kind: InputKind,

    /// Full type text from the catalog (e.g. "character varying(40)"),
    /// used to cast bound parameters
    #[serde(skip)]
    pub cast_type: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(column_name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        Self {
            column_name: column_name.into(),
            input_kind: codec::classify(&data_type),
            data_type,
            cast_type: None,
        }
    }

    pub fn with_cast_type(mut self, cast_type: impl Into<String>) -> Self {
        self.cast_type = Some(cast_type.into());
        self
    }
}

/// Identifies exactly one row for update and delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyDescriptor {
    pub column: String,
    pub value: serde_json::Value,
}

/// One column of a table to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub sql_type: String,

    #[serde(default)]
    pub constraints: Option<String>,
}

/// Requested page of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Row offset of the first row of this page
    pub fn offset(&self) -> Option<u64> {
        self.page.checked_sub(1)?.checked_mul(self.page_size)
    }
}

/// Raw pagination query parameters
///
/// Parsed leniently: anything missing, non-numeric or below 1 falls back to
/// the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParameters {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PageParameters {
    pub fn resolve(&self, default_page_size: u64, max_page_size: u64) -> PageRequest {
        fn positive(value: Option<&String>) -> Option<u64> {
            value
                .and_then(|text| text.trim().parse::<u64>().ok())
                .filter(|number| *number >= 1)
        }

        PageRequest {
            page: positive(self.page.as_ref()).unwrap_or(1),
            page_size: positive(self.page_size.as_ref())
                .unwrap_or(default_page_size)
                .min(max_page_size),
        }
    }
}

/// Pagination metadata returned with every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub page_size: u64,
    pub total_rows: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total_rows: u64) -> Self {
        Self {
            current_page: request.page,
            page_size: request.page_size,
            total_rows,
            total_pages: total_rows.div_ceil(request.page_size),
        }
    }
}

/// One page of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub pagination: Pagination,
}

/// Body of `POST /table/{name}`, `PUT /table/{name}` and `DELETE /table/{name}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRequest {
    #[serde(default)]
    pub row: Option<Row>,

    #[serde(default)]
    pub primary_key: Option<PrimaryKeyDescriptor>,
}

/// Body of `POST /create-table`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    #[serde(default)]
    pub table_name: Option<String>,

    #[serde(default)]
    pub columns: Option<Vec<ColumnDefinition>>,
}

/// Response from connecting
#[derive(Debug, Clone, Serialize)]
pub struct ConnectResponse {
    pub message: String,
    pub tables: Vec<TableDescriptor>,
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesResponse {
    pub tables: Vec<TableDescriptor>,
}

/// Response carrying a single affected row
#[derive(Debug, Clone, Serialize)]
pub struct RowResponse {
    pub message: String,
    pub row: Row,
}

/// Response from table DDL
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    pub message: String,
    pub table_name: String,
}

/// Plain message response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
