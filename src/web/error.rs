//! Maps crate errors onto HTTP responses.
//!
//! Every failure is a JSON body `{"success": false, "message": ...}` with a
//! matching status code, so the bar tablet and the admin UI consume one
//! shape. Internal errors (database, I/O, configuration) are logged and
//! replaced with a generic message; they never reach the client verbatim.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Error body shared by all failure responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false`
    pub success: bool,
    /// Human-readable German message
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Validation { .. } | Error::QueryRejected { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::InvalidAmount { .. } => (
                StatusCode::BAD_REQUEST,
                "Ungültige Menge oder Daten.".to_string(),
            ),
            Error::MemberNotFound { .. }
            | Error::ArticleNotFound { .. }
            | Error::BookingNotFound { .. }
            | Error::ReportNotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            Error::InsufficientStock { .. } | Error::InsufficientBalance { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Error::Blacklisted { .. } => (StatusCode::FORBIDDEN, self.to_string()),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Nicht angemeldet oder ungültige Anmeldedaten.".to_string(),
            ),
            Error::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Interner Serverfehler.".to_string(),
                )
            }
            Error::Config { message } => {
                error!(error = %message, "configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Interner Serverfehler.".to_string(),
                )
            }
            Error::Io(e) => {
                error!(error = %e, "i/o error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Interner Serverfehler.".to_string(),
                )
            }
        };

        let body = Json(ErrorBody {
            success: false,
            message,
        });
        (status, body).into_response()
    }
}
