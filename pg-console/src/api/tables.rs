//! Table listing and DDL endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};

use crate::api::{ApiError, ConsoleState};
use crate::crud::TableEditor;
use crate::database::traits::ConnectionProvider;
use crate::schema::{CreateTableRequest, TableResponse, TablesResponse};
use crate::session::Session;

/// Handler for GET /api/tables
///
/// Returns the base tables of the connected database.
///
/// # Arguments
///
/// * `state` - Console state (settings)
/// * `session` - The caller's live session
///
/// # Returns
///
/// JSON response containing list of tables
pub async fn list_tables_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
) -> Result<Json<TablesResponse>, ApiError> {
    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let tables = editor
        .list_tables()
        .await
        .map_err(ApiError::operation("Failed to retrieve tables"))?;

    Ok(Json(TablesResponse { tables }))
}

/// Handler for POST /api/create-table
///
/// Creates a table with the identity column followed by the submitted
/// column definitions.
pub async fn create_table_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    body: Result<Json<CreateTableRequest>, JsonRejection>,
) -> Result<Json<TableResponse>, ApiError> {
    let required = || ApiError::BadRequest("Table name and column definitions are required".to_string());
    let Json(request) = body.map_err(|_| required())?;
    let table_name = request
        .table_name
        .filter(|name| !name.is_empty())
        .ok_or_else(required)?;
    let columns = request
        .columns
        .filter(|columns| !columns.is_empty())
        .ok_or_else(required)?;

    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let table = editor
        .create_table(&table_name, &columns)
        .await
        .map_err(ApiError::operation("Failed to create table"))?;

    Ok(Json(TableResponse {
        message: "Table created successfully".to_string(),
        table_name: table.to_string(),
    }))
}

/// Handler for DELETE /api/table/{name}/drop
pub async fn drop_table_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    Path(table_name): Path<String>,
) -> Result<Json<TableResponse>, ApiError> {
    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let table = editor
        .drop_table(&table_name)
        .await
        .map_err(ApiError::operation("Failed to delete table"))?;

    Ok(Json(TableResponse {
        message: "Table deleted successfully".to_string(),
        table_name: table.to_string(),
    }))
}
