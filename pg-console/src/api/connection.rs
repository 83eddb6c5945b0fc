//! Session lifecycle endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Json},
};

use crate::api::{ApiError, ConsoleState};
use crate::database::traits::{ConnectionProvider, DatabaseConnection};
use crate::schema::{ConnectResponse, ConnectionConfig, MessageResponse};
use crate::session::{cleared_cookie, session_cookie, SessionCookie};

/// Handler for POST /connectdb
///
/// Opens a connection with the submitted credentials, lists its tables and
/// starts a new session. A session already named by the request's cookie is
/// ended first.
pub async fn connect_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    SessionCookie(previous): SessionCookie,
    body: Result<Json<ConnectionConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(config) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    config.validate().map_err(ApiError::BadRequest)?;

    if let Some(previous) = previous {
        state.sessions.remove(previous).await;
    }

    tracing::info!(host = %config.host, port = config.port, database = %config.database, "connecting to database");
    let connection = state
        .provider
        .acquire(&config)
        .await
        .map_err(ApiError::ConnectionFailed)?;

    let tables = match connection.list_tables().await {
        Ok(tables) => tables,
        Err(error) => {
            connection.close().await;
            return Err(ApiError::ConnectionFailed(error));
        }
    };

    let database = config.database.clone();
    let id = state.sessions.insert(config, connection).await;
    tracing::info!(database = %database, tables = tables.len(), "connected to database");

    let cookie = session_cookie(id, state.settings.session_ttl, state.settings.secure_cookie);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(ConnectResponse {
            message: "Connected to database successfully".to_string(),
            tables,
        }),
    ))
}

/// Handler for POST /disconnect
///
/// Always clears the cookie; reports whether a session was actually ended.
pub async fn disconnect_handler<P: ConnectionProvider>(
    State(state): State<ConsoleState<P>>,
    SessionCookie(id): SessionCookie,
) -> impl IntoResponse {
    let ended = match id {
        Some(id) => state.sessions.remove(id).await,
        None => false,
    };

    let message = if ended {
        "Disconnected from database successfully"
    } else {
        "Already disconnected"
    };

    (
        [(SET_COOKIE, cleared_cookie(state.settings.secure_cookie))],
        Json(MessageResponse::new(message)),
    )
}
