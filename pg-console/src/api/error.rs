//! Error responses of the HTTP surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::database::traits::DatabaseError;
use crate::schema::MessageResponse;

/// An error returned by a handler, rendered as `{"message": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request carries no live session
    #[error("No database connection. Please connect first.")]
    NoConnection,

    /// Required request input is missing or malformed
    #[error("{0}")]
    BadRequest(String),

    /// Opening the connection for a new session failed
    #[error("Database connection failed, May be due to input database not available")]
    ConnectionFailed(#[source] DatabaseError),

    /// An operation on a live session failed
    #[error("{context}")]
    Operation {
        context: &'static str,
        #[source]
        source: DatabaseError,
    },
}

impl ApiError {
    /// Wrap a database error with the failure message of the operation
    ///
    /// ```rust,ignore
    /// editor.insert(&table, &row).await.map_err(ApiError::operation("Failed to insert row"))?;
    /// ```
    pub fn operation(context: &'static str) -> impl FnOnce(DatabaseError) -> Self {
        move |source| Self::Operation { context, source }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::NoConnection | ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::ConnectionFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ApiError::Operation { context, source } => match source {
                error if error.is_validation() => (StatusCode::BAD_REQUEST, error.to_string()),
                DatabaseError::RowNotFound => (StatusCode::NOT_FOUND, "Row not found".to_string()),
                DatabaseError::TableNotFound(_) => (StatusCode::NOT_FOUND, source.to_string()),
                // Connection failures only get the generic message
                DatabaseError::Connection(_) => (StatusCode::INTERNAL_SERVER_ERROR, context.to_string()),
                DatabaseError::Schema(detail)
                | DatabaseError::Constraint(detail)
                | DatabaseError::Query(detail) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, detail))
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, context.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        match &self {
            ApiError::ConnectionFailed(source) | ApiError::Operation { source, .. }
                if status.is_server_error() =>
            {
                tracing::error!(status = status.as_u16(), error = %source, "{}", message);
            }
            _ => tracing::warn!(status = status.as_u16(), "{}", message),
        }

        (status, Json(MessageResponse::new(message))).into_response()
    }
}
