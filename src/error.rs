//! Request-level errors and their HTTP rendering.
use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::{auth::password::PasswordError, db::StoreError};

/// Every failure a handler can report. All of them end the request; nothing
/// here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Input could not be read or is not acceptable, e.g. a missing field or
    /// an unknown transaction type.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the account may not act (inactive).
    #[error("{0}")]
    Forbidden(String),

    /// An email or username is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The resource does not exist or belongs to someone else.
    #[error("{0}")]
    NotFound(String),

    /// Anything unexpected. The message is logged, never sent to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Duplicate identities have always been reported as 400.
            AppError::BadRequest(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field } => {
                AppError::Conflict(format!("The {field} is already in use."))
            }
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooShort => AppError::BadRequest(err.to_string()),
            PasswordError::Argon2(_) => AppError::Internal(err.into()),
        }
    }
}

macro_rules! bad_request_from {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    warn!(status = %rejection.status(), "rejected request input");
                    AppError::BadRequest(rejection.body_text())
                }
            }
        )+
    };
}

bad_request_from!(JsonRejection, QueryRejection, PathRejection, FormRejection);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(ErrorBody { detail });
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
