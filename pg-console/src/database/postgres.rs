//! PostgreSQL connection provider implementation

use crate::database::traits::{ConnectionProvider, DatabaseConnection, DatabaseError};
use crate::query::{CompiledQuery, SqlValue, Statement};
use crate::schema::{ColumnDescriptor, ConnectionConfig, Row, TableDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo, ValueRef};
use std::time::Duration;

/// Pool sizing applied to every connection the provider opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum connections per session pool
    pub max_connections: u32,

    /// How long to wait for a connection before giving up
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Opens one `PgPool` per [`ConnectionConfig`]
#[derive(Debug, Clone, Default)]
pub struct PostgresProvider {
    settings: PoolSettings,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider
    ///
    /// # Arguments
    ///
    /// * `settings` - Pool sizing for the pools this provider opens
    pub fn new(settings: PoolSettings) -> Self {
        Self { settings }
    }

    fn connect_options(config: &ConnectionConfig) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database)
            .application_name("pg-console");
        match &config.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

#[async_trait]
impl ConnectionProvider for PostgresProvider {
    type Connection = PostgresConnection;

    async fn acquire(&self, config: &ConnectionConfig) -> Result<Self::Connection, DatabaseError> {
        // connect_with opens the first connection eagerly, so bad credentials fail here
        let pool = PgPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect_with(Self::connect_options(config))
            .await
            .map_err(|error| match DatabaseError::from(error) {
                DatabaseError::Connection(message) => DatabaseError::Connection(message),
                other => DatabaseError::Connection(other.to_string()),
            })?;

        Ok(PostgresConnection { pool })
    }
}

/// A pooled PostgreSQL connection
#[derive(Debug, Clone)]
pub struct PostgresConnection {
    pool: PgPool,
}

impl PostgresConnection {
    /// Build a sqlx query with every parameter bound in order
    fn prepare(compiled: &CompiledQuery) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %compiled.sql, parameters = compiled.parameters.len(), "executing statement");

        compiled
            .parameters
            .iter()
            .fold(sqlx::query(&compiled.sql), |query, parameter| match parameter {
                SqlValue::Null => query.bind(None::<String>),
                SqlValue::Boolean(flag) => query.bind(*flag),
                SqlValue::Integer(integer) => query.bind(*integer),
                SqlValue::Float(float) => query.bind(*float),
                SqlValue::Text(text) => query.bind(text.as_str()),
            })
    }

    /// Convert a PostgreSQL row to a JSON object
    fn row_to_json(row: &PgRow) -> Result<Row, DatabaseError> {
        let mut map = Row::new();

        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                map.insert(column.name().to_string(), Value::Null);
                continue;
            }
            let type_name = raw.type_info().name().to_string();

            let value = match type_name.as_str() {
                "BOOL" => Value::Bool(row.try_get::<bool, _>(index)?),
                "INT2" => Value::from(row.try_get::<i16, _>(index)?),
                "INT4" => Value::from(row.try_get::<i32, _>(index)?),
                "INT8" => Value::from(row.try_get::<i64, _>(index)?),
                "FLOAT4" => float_value(f64::from(row.try_get::<f32, _>(index)?)),
                "FLOAT8" => float_value(row.try_get::<f64, _>(index)?),
                "NUMERIC" => {
                    // String keeps the full precision
                    let decimal: sqlx::types::BigDecimal = row.try_get(index)?;
                    Value::String(decimal.to_string())
                }
                "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "BPCHAR" => {
                    Value::String(row.try_get::<String, _>(index)?)
                }
                "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
                "UUID" => Value::String(row.try_get::<sqlx::types::Uuid, _>(index)?.to_string()),
                "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
                "TIME" => Value::String(row.try_get::<NaiveTime, _>(index)?.format("%H:%M:%S").to_string()),
                "TIMESTAMP" => Value::String(
                    row.try_get::<NaiveDateTime, _>(index)?
                        .format("%Y-%m-%dT%H:%M:%S%.f")
                        .to_string(),
                ),
                "TIMESTAMPTZ" => Value::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
                "BYTEA" => {
                    let bytes: Vec<u8> = row.try_get(index)?;
                    Value::String(format!("[BLOB: {} bytes]", bytes.len()))
                }
                _ => {
                    // Engine statements read other types as text; this covers ad-hoc queries
                    row.try_get::<String, _>(index)
                        .map(Value::String)
                        .unwrap_or_else(|_| Value::String(format!("<{}>", type_name)))
                }
            };

            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }
}

fn float_value(float: f64) -> Value {
    serde_json::Number::from_f64(float)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(float.to_string()))
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>, DatabaseError> {
        let query = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = 'public'
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let tables = rows
            .iter()
            .map(|row| {
                Ok(TableDescriptor {
                    table_name: row.try_get("table_name")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        // Cast targets carry no modifier: an explicit cast to varchar(n) truncates,
        // assignment to the column checks length and precision instead
        let query = r#"
            SELECT
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                format_type(a.atttypid, NULL) AS cast_type
            FROM information_schema.columns c
            JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema
            JOIN pg_catalog.pg_class t ON t.relnamespace = n.oid AND t.relname = c.table_name
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
            WHERE c.table_schema = 'public'
              AND c.table_name = $1
            ORDER BY c.ordinal_position
        "#;

        let rows = sqlx::query(query).bind(table).fetch_all(&self.pool).await?;

        let columns = rows
            .iter()
            .map(|row| {
                let column_name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let cast_type: String = row.try_get("cast_type")?;
                Ok(ColumnDescriptor::new(column_name, data_type).with_cast_type(cast_type))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(columns)
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        let compiled = statement.compile();
        let rows = Self::prepare(&compiled).fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_json).collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let compiled = statement.compile();
        let row = Self::prepare(&compiled).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let compiled = statement.compile();
        let result = Self::prepare(&compiled).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
