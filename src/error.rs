use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// One validation failure, shaped like the `{errors: [...]}` entries the
/// client already consumes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub msg: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<&'static str>,
}

impl FieldError {
    pub fn new(param: &'static str, msg: &'static str) -> Self {
        Self {
            msg,
            param: Some(param),
        }
    }

    /// A bare message with no offending parameter (e.g. "Invalid credentials").
    pub fn msg(msg: &'static str) -> Self {
        Self { msg, param: None }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    /// External collaborator did not answer with success; surfaced as 404.
    #[error("{0}")]
    Upstream(&'static str),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::Upstream(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => json!({ "errors": errors }),
            Self::Internal(ref e) => {
                error!(error = ?e, "unhandled internal error");
                // never leak internals to the client
                json!({ "msg": "Server Error" })
            }
            other => json!({ "msg": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Internal(e.into())
    }
}
