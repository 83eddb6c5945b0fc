//! Schema-driven CRUD engine
//!
//! [`TableEditor`] turns a table name, a row and a primary key into
//! [`Statement`]s. Every table and column name is checked against the
//! catalog (or the safe identifier pattern for names that do not exist yet)
//! before a statement is built; every value is bound.

use crate::database::traits::{DatabaseConnection, DatabaseError};
use crate::identifier::Identifier;
use crate::query::{Binding, ColumnSpec, Projection, SqlValue, Statement};
use crate::schema::{
    ColumnDefinition, ColumnDescriptor, PageRequest, PageResult, Pagination, PrimaryKeyDescriptor,
    Row, TableDescriptor,
};
use serde_json::Value;
use std::collections::HashSet;

/// Default name of the synthetic identity column
pub const DEFAULT_IDENTITY_COLUMN: &str = "id";

/// Columns of an existing table, as reported by the catalog
struct TableLayout {
    table: Identifier,
    columns: Vec<ColumnDescriptor>,
}

impl TableLayout {
    fn column(&self, name: &str) -> Result<(Identifier, &ColumnDescriptor), DatabaseError> {
        let descriptor = self
            .columns
            .iter()
            .find(|column| column.column_name == name)
            .ok_or_else(|| DatabaseError::InvalidColumn(name.to_string()))?;
        Ok((Identifier::from_catalog(&descriptor.column_name), descriptor))
    }

    fn bind(&self, name: &str, value: &Value) -> Result<Binding, DatabaseError> {
        let (column, descriptor) = self.column(name)?;
        Ok(Binding {
            column,
            cast: descriptor.cast_type.clone(),
            value: SqlValue::from(value),
        })
    }

    /// Every column, in physical order
    fn projection(&self) -> Vec<Projection> {
        self.columns.iter().map(Projection::for_column).collect()
    }
}

/// CRUD operations against one connection
pub struct TableEditor<'a, C> {
    connection: &'a C,
    identity_column: &'a str,
}

impl<'a, C: DatabaseConnection> TableEditor<'a, C> {
    /// Create an editor treating `identity_column` as the synthetic primary key
    pub fn new(connection: &'a C, identity_column: &'a str) -> Self {
        Self {
            connection,
            identity_column,
        }
    }

    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>, DatabaseError> {
        self.connection.list_tables().await
    }

    /// Introspect `table`; no columns means no such table
    async fn layout(&self, table: &str) -> Result<TableLayout, DatabaseError> {
        let columns = self.connection.list_columns(table).await?;
        if columns.is_empty() {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }
        Ok(TableLayout {
            table: Identifier::from_catalog(table),
            columns,
        })
    }

    /// Fetch one page of `table`, ordered by the identity column
    ///
    /// The count and the window are two statements without a shared
    /// snapshot; concurrent writes may make them disagree.
    #[tracing::instrument(skip(self))]
    pub async fn select_page(&self, table: &str, request: PageRequest) -> Result<PageResult, DatabaseError> {
        let layout = self.layout(table).await?;

        let out_of_range = || DatabaseError::Validation("Page out of range".to_string());
        let offset = request
            .offset()
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(out_of_range)?;
        let limit = i64::try_from(request.page_size).map_err(|_| out_of_range())?;

        // Tables without the identity column fall back to their first column
        let order_by = match layout.column(self.identity_column) {
            Ok((identity, _)) => identity,
            Err(_) => Identifier::from_catalog(&layout.columns[0].column_name),
        };

        let total_rows = self
            .connection
            .fetch_count(&Statement::Count {
                table: layout.table.clone(),
            })
            .await?;

        let rows = self
            .connection
            .fetch_rows(&Statement::SelectPage {
                table: layout.table.clone(),
                projection: layout.projection(),
                order_by,
                limit,
                offset,
            })
            .await?;

        Ok(PageResult {
            columns: layout.columns,
            rows,
            pagination: Pagination::new(request, total_rows),
        })
    }

    /// Insert `row`, returning it as stored (with its generated identity)
    ///
    /// The identity column is dropped from `row` unconditionally.
    #[tracing::instrument(skip(self, row))]
    pub async fn insert(&self, table: &str, row: &Row) -> Result<Row, DatabaseError> {
        let layout = self.layout(table).await?;

        let values = row
            .iter()
            .filter(|(column, _)| column.as_str() != self.identity_column)
            .map(|(column, value)| layout.bind(column, value))
            .collect::<Result<Vec<_>, _>>()?;

        let statement = Statement::Insert {
            projection: layout.projection(),
            table: layout.table,
            values,
        };
        self.connection
            .fetch_rows(&statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Query("Insert returned no row".to_string()))
    }

    /// Write every field of `row` except the key column to the row matching `primary_key`
    #[tracing::instrument(skip(self, row))]
    pub async fn update(
        &self,
        table: &str,
        row: &Row,
        primary_key: &PrimaryKeyDescriptor,
    ) -> Result<Row, DatabaseError> {
        let layout = self.layout(table).await?;
        let key = layout.bind(&primary_key.column, &primary_key.value)?;

        let assignments = row
            .iter()
            .filter(|(column, _)| **column != primary_key.column)
            .map(|(column, value)| layout.bind(column, value))
            .collect::<Result<Vec<_>, _>>()?;
        if assignments.is_empty() {
            return Err(DatabaseError::Validation("No columns to update".to_string()));
        }

        let statement = Statement::Update {
            projection: layout.projection(),
            table: layout.table,
            key,
            assignments,
        };
        self.connection
            .fetch_rows(&statement)
            .await?
            .into_iter()
            .next()
            .ok_or(DatabaseError::RowNotFound)
    }

    /// Delete the row matching `primary_key`, returning it
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, table: &str, primary_key: &PrimaryKeyDescriptor) -> Result<Row, DatabaseError> {
        let layout = self.layout(table).await?;
        let key = layout.bind(&primary_key.column, &primary_key.value)?;

        let statement = Statement::Delete {
            projection: layout.projection(),
            table: layout.table,
            key,
        };
        self.connection
            .fetch_rows(&statement)
            .await?
            .into_iter()
            .next()
            .ok_or(DatabaseError::RowNotFound)
    }

    /// Create `table` with the identity column followed by `definitions`
    #[tracing::instrument(skip(self, definitions))]
    pub async fn create_table(
        &self,
        table: &str,
        definitions: &[ColumnDefinition],
    ) -> Result<Identifier, DatabaseError> {
        let table = Identifier::new(table)?;
        let identity = Identifier::new(self.identity_column)?;
        if definitions.is_empty() {
            return Err(DatabaseError::Validation(
                "At least one column definition is required".to_string(),
            ));
        }

        let mut seen = HashSet::from([identity.as_str()]);
        let mut columns = Vec::with_capacity(definitions.len());
        for definition in definitions {
            if !seen.insert(definition.name.as_str()) {
                return Err(DatabaseError::Validation(format!(
                    "Duplicate column: {}",
                    definition.name
                )));
            }
            columns.push(ColumnSpec::new(
                &definition.name,
                &definition.sql_type,
                definition.constraints.as_deref(),
            )?);
        }

        self.connection
            .execute(&Statement::CreateTable {
                table: table.clone(),
                identity,
                columns,
            })
            .await?;
        tracing::info!(table = %table, "created table");
        Ok(table)
    }

    /// Drop `table`; fails if other objects depend on it
    #[tracing::instrument(skip(self))]
    pub async fn drop_table(&self, table: &str) -> Result<Identifier, DatabaseError> {
        let tables = self.connection.list_tables().await?;
        let table = Identifier::resolve(table, tables.iter().map(|known| known.table_name.as_str()))
            .ok_or_else(|| DatabaseError::TableNotFound(table.to_string()))?;

        self.connection
            .execute(&Statement::DropTable {
                table: table.clone(),
            })
            .await?;
        tracing::info!(table = %table, "dropped table");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryDatabase;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn key(value: Value) -> PrimaryKeyDescriptor {
        PrimaryKeyDescriptor {
            column: "id".to_string(),
            value,
        }
    }

    fn orders(count: usize) -> MemoryDatabase {
        let database = MemoryDatabase::default().with_table(
            "orders",
            &[("id", "integer"), ("status", "text"), ("quantity", "integer")],
        );
        for index in 0..count {
            database.seed_row("orders", row(json!({"status": "new", "quantity": index})));
        }
        database
    }

    #[tokio::test]
    async fn test_select_page_middle_page() {
        let database = orders(25);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let page = editor
            .select_page("orders", PageRequest { page: 2, page_size: 10 })
            .await
            .unwrap();

        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0]["id"], json!(11));
        assert_eq!(page.pagination.total_rows, 25);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.columns.len(), 3);
    }

    #[tokio::test]
    async fn test_select_page_past_the_end_is_empty() {
        let database = orders(25);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let page = editor
            .select_page("orders", PageRequest { page: 9, page_size: 10 })
            .await
            .unwrap();

        assert!(page.rows.is_empty());
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[tokio::test]
    async fn test_select_page_unknown_table() {
        let database = orders(0);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let error = editor
            .select_page("missing", PageRequest { page: 1, page_size: 10 })
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::TableNotFound(name) if name == "missing"));
        assert!(database.executed().is_empty());
    }

    #[tokio::test]
    async fn test_select_page_orders_by_first_column_without_identity() {
        let database = MemoryDatabase::default().with_table("tags", &[("label", "text")]);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        editor
            .select_page("tags", PageRequest { page: 1, page_size: 10 })
            .await
            .unwrap();

        let executed = database.executed();
        assert!(matches!(
            &executed[1],
            Statement::SelectPage { order_by, .. } if order_by.as_str() == "label"
        ));
    }

    #[tokio::test]
    async fn test_statements_project_catalog_columns() {
        let database = MemoryDatabase::default()
            .with_table("events", &[("id", "integer"), ("span", "interval"), ("mood", "USER-DEFINED")]);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        editor
            .select_page("events", PageRequest { page: 1, page_size: 10 })
            .await
            .unwrap();
        editor
            .insert("events", &row(json!({"span": "1 hour", "mood": "happy"})))
            .await
            .unwrap();

        let executed = database.executed();
        let text_columns = |projection: &[Projection]| -> Vec<String> {
            projection
                .iter()
                .filter(|output| output.as_text)
                .map(|output| output.column.to_string())
                .collect()
        };
        let Statement::SelectPage { projection, .. } = &executed[1] else {
            panic!("expected a select");
        };
        assert_eq!(projection.len(), 3);
        assert_eq!(text_columns(projection), vec!["span", "mood"]);
        let Statement::Insert { projection, .. } = &executed[2] else {
            panic!("expected an insert");
        };
        assert_eq!(text_columns(projection), vec!["span", "mood"]);
    }

    #[tokio::test]
    async fn test_insert_assigns_new_identity() {
        let database = orders(3);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let inserted = editor
            .insert("orders", &row(json!({"id": 1, "status": "paid", "quantity": 5})))
            .await
            .unwrap();

        assert_eq!(inserted["id"], json!(4));
        assert_eq!(inserted["status"], json!("paid"));
        assert_eq!(inserted["quantity"], json!(5));

        let page = editor
            .select_page("orders", PageRequest { page: 1, page_size: 10 })
            .await
            .unwrap();
        assert!(page.rows.contains(&inserted));

        let Statement::Insert { values, .. } = &database.executed()[0] else {
            panic!("expected an insert");
        };
        let columns: Vec<&str> = values.iter().map(|binding| binding.column.as_str()).collect();
        assert_eq!(columns, vec!["status", "quantity"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_column() {
        let database = orders(0);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let error = editor
            .insert("orders", &row(json!({"status": "x", "\"; DROP TABLE orders; --": 1})))
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::InvalidColumn(_)));
        assert!(database.executed().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_only_submitted_fields() {
        let database = orders(2);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let updated = editor
            .update("orders", &row(json!({"id": 2, "status": "shipped"})), &key(json!(2)))
            .await
            .unwrap();

        assert_eq!(updated["id"], json!(2));
        assert_eq!(updated["status"], json!("shipped"));
        assert_eq!(updated["quantity"], json!(1));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let database = orders(2);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let error = editor
            .update("orders", &row(json!({"status": "shipped"})), &key(json!(99)))
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::RowNotFound));
    }

    #[tokio::test]
    async fn test_update_requires_assignments() {
        let database = orders(1);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let error = editor
            .update("orders", &row(json!({"id": 1})), &key(json!(1)))
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_key_column() {
        let database = orders(1);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);
        let primary_key = PrimaryKeyDescriptor {
            column: "uuid".to_string(),
            value: json!(1),
        };

        let error = editor
            .update("orders", &row(json!({"status": "x"})), &primary_key)
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::InvalidColumn(name) if name == "uuid"));
    }

    #[tokio::test]
    async fn test_delete_then_select() {
        let database = orders(3);
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let deleted = editor.delete("orders", &key(json!(2))).await.unwrap();
        assert_eq!(deleted["id"], json!(2));

        let page = editor
            .select_page("orders", PageRequest { page: 1, page_size: 10 })
            .await
            .unwrap();
        assert!(page.rows.iter().all(|row| row["id"] != json!(2)));
        assert_eq!(page.pagination.total_rows, 2);

        let error = editor.delete("orders", &key(json!(2))).await.unwrap_err();
        assert!(matches!(error, DatabaseError::RowNotFound));
    }

    #[tokio::test]
    async fn test_create_table_prepends_identity() {
        let database = MemoryDatabase::default();
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);
        let definitions = vec![ColumnDefinition {
            name: "title".to_string(),
            sql_type: "text".to_string(),
            constraints: Some("NOT NULL".to_string()),
        }];

        let table = editor.create_table("books", &definitions).await.unwrap();
        assert_eq!(table.as_str(), "books");

        let columns = database.list_columns("books").await.unwrap();
        let names: Vec<&str> = columns.iter().map(|column| column.column_name.as_str()).collect();
        assert_eq!(names, vec!["id", "title"]);

        let error = editor.create_table("books", &definitions).await.unwrap_err();
        assert!(matches!(error, DatabaseError::Schema(_)));
    }

    #[tokio::test]
    async fn test_create_table_rejects_bad_definitions() {
        let database = MemoryDatabase::default();
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);
        let definition = |name: &str| ColumnDefinition {
            name: name.to_string(),
            sql_type: "text".to_string(),
            constraints: None,
        };

        let error = editor
            .create_table("books; DROP TABLE x", &[definition("title")])
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::InvalidIdentifier(_)));

        let error = editor.create_table("books", &[]).await.unwrap_err();
        assert!(matches!(error, DatabaseError::Validation(_)));

        let error = editor
            .create_table("books", &[definition("title"), definition("title")])
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::Validation(_)));

        let error = editor
            .create_table("books", &[definition("id")])
            .await
            .unwrap_err();
        assert!(matches!(error, DatabaseError::Validation(_)));

        assert!(database.executed().is_empty());
    }

    #[tokio::test]
    async fn test_drop_table() {
        let database = orders(1).with_table("customers", &[("id", "integer")]);
        database.add_dependent("customers");
        let editor = TableEditor::new(&database, DEFAULT_IDENTITY_COLUMN);

        let error = editor.drop_table("customers").await.unwrap_err();
        assert!(matches!(error, DatabaseError::Schema(_)));

        editor.drop_table("orders").await.unwrap();
        let tables = editor.list_tables().await.unwrap();
        assert_eq!(
            tables,
            vec![TableDescriptor {
                table_name: "customers".to_string()
            }]
        );

        let error = editor.drop_table("orders").await.unwrap_err();
        assert!(matches!(error, DatabaseError::TableNotFound(_)));
    }
}
