//! Error taxonomy shared by the scheduling services and the HTTP layer.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::play_order::LoopTooLong;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed input; `field` names the offending request field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    NotFound(String),
    /// The request is well formed but the target is not in a state that
    /// allows it.
    #[error("{0}")]
    Conflict(String),
    /// Stored entries reduce to a loop too long to compute.
    #[error(transparent)]
    LoopTooLong(#[from] LoopTooLong),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl ScheduleError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation { field: field.to_string(), message: message.into() }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation { .. } => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) | Self::LoopTooLong(_) => Status::Conflict,
            Self::Database(_) => Status::InternalServerError,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

/// Error body returned by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

pub type ApiError = status::Custom<Json<ErrorResponse>>;

impl From<ScheduleError> for ApiError {
    fn from(err: ScheduleError) -> Self {
        let status = err.status();
        let body = match err {
            ScheduleError::Validation { field, message } => {
                ErrorResponse { error: message, field: Some(field) }
            }
            ScheduleError::Database(e) => {
                error!("Database error: {}", e);
                ErrorResponse { error: "Database error".to_string(), field: None }
            }
            other => ErrorResponse { error: other.to_string(), field: None },
        };
        status::Custom(status, Json(body))
    }
}
