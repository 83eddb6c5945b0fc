//! In-memory connection used by the engine and router tests
//!
//! Interprets [`Statement`] values directly instead of SQL text, emulating the
//! PostgreSQL behaviour the engine relies on: serial identities,
//! `RETURNING *`, duplicate-table and dependent-object errors.

use crate::database::traits::{ConnectionProvider, DatabaseConnection, DatabaseError};
use crate::query::{Binding, Statement};
use crate::schema::{ColumnDescriptor, ConnectionConfig, Row, TableDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

struct MemoryTable {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
    next_id: i64,
    has_dependents: bool,
}

#[derive(Default)]
struct MemoryState {
    tables: BTreeMap<String, MemoryTable>,
    executed: Vec<Statement>,
    closed: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub(crate) fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(column, sql_type)| ColumnDescriptor::new(*column, *sql_type).with_cast_type(*sql_type))
            .collect();
        self.state.lock().unwrap().tables.insert(
            name.to_string(),
            MemoryTable {
                columns,
                rows: Vec::new(),
                next_id: 1,
                has_dependents: false,
            },
        );
        self
    }

    /// Insert a row directly, assigning the next identity
    pub(crate) fn seed_row(&self, table: &str, mut row: Row) -> Row {
        let mut state = self.state.lock().unwrap();
        let table = state.tables.get_mut(table).expect("unknown table");
        row.insert("id".to_string(), Value::from(table.next_id));
        table.next_id += 1;
        let row = complete(&table.columns, row);
        table.rows.push(row.clone());
        row
    }

    /// Mark `table` as referenced by a foreign key
    pub(crate) fn add_dependent(&self, table: &str) {
        if let Some(table) = self.state.lock().unwrap().tables.get_mut(table) {
            table.has_dependents = true;
        }
    }

    pub(crate) fn executed(&self) -> Vec<Statement> {
        self.state.lock().unwrap().executed.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

/// Order the row by column, filling absent columns with NULL
fn complete(columns: &[ColumnDescriptor], mut row: Row) -> Row {
    columns
        .iter()
        .map(|column| {
            let value = row.remove(&column.column_name).unwrap_or(Value::Null);
            (column.column_name.clone(), value)
        })
        .collect()
}

/// Loose equality standing in for the `$1::type` cast on key values
fn key_matches(value: &Value, key: &Binding) -> bool {
    let key = Value::from(&key.value);
    let text = |value: &Value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    *value == key || text(value) == text(&key)
}

fn missing_relation(table: &str) -> DatabaseError {
    DatabaseError::Schema(format!("relation \"{}\" does not exist", table))
}

#[async_trait]
impl DatabaseConnection for MemoryDatabase {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .keys()
            .map(|name| TableDescriptor {
                table_name: name.clone(),
            })
            .collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tables
            .get(table)
            .map(|table| table.columns.clone())
            .unwrap_or_default())
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(statement.clone());
        let name = statement.table().as_str().to_string();
        let table = state
            .tables
            .get_mut(&name)
            .ok_or_else(|| missing_relation(&name))?;

        match statement {
            Statement::SelectPage {
                order_by,
                limit,
                offset,
                ..
            } => {
                let mut rows = table.rows.clone();
                rows.sort_by_key(|row| row.get(order_by.as_str()).and_then(Value::as_i64));
                Ok(rows
                    .into_iter()
                    .skip(*offset as usize)
                    .take(*limit as usize)
                    .collect())
            }
            Statement::Insert { values, .. } => {
                let mut row: Row = values
                    .iter()
                    .map(|binding| (binding.column.to_string(), Value::from(&binding.value)))
                    .collect();
                if table.columns.iter().any(|column| column.column_name == "id") {
                    row.insert("id".to_string(), Value::from(table.next_id));
                    table.next_id += 1;
                }
                let row = complete(&table.columns, row);
                table.rows.push(row.clone());
                Ok(vec![row])
            }
            Statement::Update {
                key, assignments, ..
            } => {
                let Some(row) = table
                    .rows
                    .iter_mut()
                    .find(|row| row.get(key.column.as_str()).is_some_and(|value| key_matches(value, key)))
                else {
                    return Ok(Vec::new());
                };
                for binding in assignments {
                    row.insert(binding.column.to_string(), Value::from(&binding.value));
                }
                Ok(vec![row.clone()])
            }
            Statement::Delete { key, .. } => {
                let position = table
                    .rows
                    .iter()
                    .position(|row| row.get(key.column.as_str()).is_some_and(|value| key_matches(value, key)));
                Ok(position.map(|index| table.rows.remove(index)).into_iter().collect())
            }
            _ => Err(DatabaseError::Query("statement returns no rows".to_string())),
        }
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(statement.clone());
        let name = statement.table().as_str();
        let table = state.tables.get(name).ok_or_else(|| missing_relation(name))?;
        Ok(table.rows.len() as u64)
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        match statement {
            Statement::CreateTable {
                table,
                identity,
                columns,
            } => {
                let mut state = self.state.lock().unwrap();
                state.executed.push(statement.clone());
                if state.tables.contains_key(table.as_str()) {
                    return Err(DatabaseError::Schema(format!(
                        "relation \"{}\" already exists",
                        table
                    )));
                }
                let mut descriptors = vec![ColumnDescriptor::new(identity.as_str(), "integer")
                    .with_cast_type("integer")];
                descriptors.extend(columns.iter().map(|column| {
                    ColumnDescriptor::new(column.name().as_str(), column.sql_type())
                        .with_cast_type(column.sql_type())
                }));
                state.tables.insert(
                    table.to_string(),
                    MemoryTable {
                        columns: descriptors,
                        rows: Vec::new(),
                        next_id: 1,
                        has_dependents: false,
                    },
                );
                Ok(0)
            }
            Statement::DropTable { table } => {
                let mut state = self.state.lock().unwrap();
                state.executed.push(statement.clone());
                match state.tables.get(table.as_str()) {
                    None => Err(missing_relation(table.as_str())),
                    Some(existing) if existing.has_dependents => Err(DatabaseError::Schema(format!(
                        "cannot drop table {} because other objects depend on it",
                        table
                    ))),
                    Some(_) => {
                        state.tables.remove(table.as_str());
                        Ok(0)
                    }
                }
            }
            _ => self.fetch_rows(statement).await.map(|rows| rows.len() as u64),
        }
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Provider handing out one shared [`MemoryDatabase`] for a single database name
#[derive(Clone)]
pub(crate) struct MemoryProvider {
    pub(crate) database: MemoryDatabase,
    pub(crate) database_name: String,
}

impl MemoryProvider {
    pub(crate) fn new(database_name: &str, database: MemoryDatabase) -> Self {
        Self {
            database,
            database_name: database_name.to_string(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryDatabase;

    async fn acquire(&self, config: &ConnectionConfig) -> Result<Self::Connection, DatabaseError> {
        if config.database == self.database_name {
            Ok(self.database.clone())
        } else {
            Err(DatabaseError::Connection(format!(
                "database \"{}\" does not exist",
                config.database
            )))
        }
    }
}
