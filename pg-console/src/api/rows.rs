//! Row endpoints: paginated read, insert, update and delete

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    response::Json,
};

use crate::api::{ApiError, ConsoleState};
use crate::crud::TableEditor;
use crate::database::traits::ConnectionProvider;
use crate::schema::{PageParameters, PageResult, RowRequest, RowResponse};
use crate::session::Session;

/// Read the JSON body, treating a missing or malformed body as empty
fn row_request(body: Result<Json<RowRequest>, JsonRejection>) -> RowRequest {
    body.map(|Json(request)| request).unwrap_or_default()
}

/// Handler for GET /api/table/{name}
///
/// Fetches one page of a table together with its column descriptors.
///
/// Query parameters:
/// - page: 1-based page number (default: 1)
/// - pageSize: Rows per page (default: 10, capped at the configured maximum)
///
/// Missing, non-numeric or non-positive values fall back to the defaults.
pub async fn get_rows_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    Path(table_name): Path<String>,
    query: Result<Query<PageParameters>, QueryRejection>,
) -> Result<Json<PageResult>, ApiError> {
    let parameters = query.map(|Query(parameters)| parameters).unwrap_or_default();
    let request = parameters.resolve(state.settings.default_page_size, state.settings.max_page_size);

    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let page = editor
        .select_page(&table_name, request)
        .await
        .map_err(ApiError::operation("Failed to retrieve table data"))?;

    Ok(Json(page))
}

/// Handler for POST /api/table/{name}
pub async fn insert_row_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    Path(table_name): Path<String>,
    body: Result<Json<RowRequest>, JsonRejection>,
) -> Result<Json<RowResponse>, ApiError> {
    let row = row_request(body)
        .row
        .ok_or_else(|| ApiError::BadRequest("Table name and row data are required".to_string()))?;

    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let row = editor
        .insert(&table_name, &row)
        .await
        .map_err(ApiError::operation("Failed to insert row"))?;

    Ok(Json(RowResponse {
        message: "Row inserted successfully".to_string(),
        row,
    }))
}

/// Handler for PUT /api/table/{name}
///
/// Writes every submitted field except the key column to the row the
/// primary key identifies.
pub async fn update_row_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    Path(table_name): Path<String>,
    body: Result<Json<RowRequest>, JsonRejection>,
) -> Result<Json<RowResponse>, ApiError> {
    let RowRequest { row, primary_key } = row_request(body);
    let (Some(row), Some(primary_key)) = (row, primary_key) else {
        return Err(ApiError::BadRequest(
            "Table name, row data, and primary key are required".to_string(),
        ));
    };

    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let row = editor
        .update(&table_name, &row, &primary_key)
        .await
        .map_err(ApiError::operation("Failed to update row"))?;

    Ok(Json(RowResponse {
        message: "Row updated successfully".to_string(),
        row,
    }))
}

/// Handler for DELETE /api/table/{name}
pub async fn delete_row_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    session: Session<P::Connection>,
    Path(table_name): Path<String>,
    body: Result<Json<RowRequest>, JsonRejection>,
) -> Result<Json<RowResponse>, ApiError> {
    let primary_key = row_request(body)
        .primary_key
        .ok_or_else(|| ApiError::BadRequest("Table name and primary key are required".to_string()))?;

    let editor = TableEditor::new(&session.connection, &state.settings.identity_column);
    let row = editor
        .delete(&table_name, &primary_key)
        .await
        .map_err(ApiError::operation("Failed to delete row"))?;

    Ok(Json(RowResponse {
        message: "Row deleted successfully".to_string(),
        row,
    }))
}
