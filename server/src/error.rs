//! Error taxonomy for the request surface.
//!
//! Every user-facing handler returns exactly one `ApiError`; the variants
//! map onto transport status codes in `into_response`. Invariant violations
//! are reported as `Internal` with generic text while the specifics go to
//! the server log.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Malformed or out-of-range field.
    InvalidArg(String),
    /// Display name failed validation (length, emptiness).
    InvalidName(String),
    /// Display name is on the reserved-word list.
    NameReserved,
    /// Another live session already holds this name.
    NameTaken,
    /// Missing or expired session token.
    Unauthorized,
    /// Authenticated but not allowed (e.g. non-host starting a game).
    Forbidden(String),
    /// Unknown room or game id.
    NotFound(&'static str),
    /// State refuses the request: already in a room, room full, wrong
    /// password, not your turn, game not active, team full.
    Conflict(String),
    /// Card and cell are incompatible.
    IllegalMove(String),
    /// Invariant violation; details are logged, not transmitted.
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidArg(_) => "invalid_arg",
            ApiError::InvalidName(_) => "invalid_name",
            ApiError::NameReserved => "name_reserved",
            ApiError::NameTaken => "name_taken",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::IllegalMove(_) => "illegal_move",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArg(_) | ApiError::InvalidName(_) | ApiError::NameReserved => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NameTaken | ApiError::Conflict(_) | ApiError::IllegalMove(_) => {
                StatusCode::CONFLICT
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidArg(msg) => write!(f, "invalid argument: {msg}"),
            ApiError::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            ApiError::NameReserved => write!(f, "that name is reserved"),
            ApiError::NameTaken => write!(f, "that name is already taken"),
            ApiError::Unauthorized => write!(f, "missing or invalid session"),
            ApiError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ApiError::NotFound(what) => write!(f, "{what} not found"),
            ApiError::Conflict(msg) => write!(f, "{msg}"),
            ApiError::IllegalMove(msg) => write!(f, "illegal move: {msg}"),
            // Specifics stay in the log.
            ApiError::Internal(_) => write!(f, "internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("internal error surfaced to client: {detail}");
        }
        let body = json!({
            "success": false,
            "error": { "code": self.code(), "message": self.to_string() },
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::InvalidArg("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NameReserved.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("room").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::NameTaken.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::IllegalMove("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_text_is_generic() {
        let err = ApiError::Internal("board index 14 out of range".into());
        assert_eq!(err.to_string(), "internal server error");
    }
}
