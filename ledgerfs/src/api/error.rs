use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledgerfs_core::NamespaceError;
use serde::Serialize;

/// Error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: code,
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(err: &NamespaceError) -> StatusCode {
    match err {
        NamespaceError::NameCollision(_)
        | NamespaceError::FolderNotEmpty(_)
        | NamespaceError::RootAlreadyExists(_) => StatusCode::CONFLICT,
        NamespaceError::EntryNotFound(_) | NamespaceError::ObjectNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        NamespaceError::NotOwner { .. } | NamespaceError::IdentityMismatch { .. } => {
            StatusCode::FORBIDDEN
        }
        NamespaceError::TypeMismatch { .. }
        | NamespaceError::WrongObjectKind { .. }
        | NamespaceError::InvalidName(_)
        | NamespaceError::InvalidPath(_)
        | NamespaceError::NotAFolder(_) => StatusCode::UNPROCESSABLE_ENTITY,
        NamespaceError::Io(_) | NamespaceError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<NamespaceError> for ApiError {
    fn from(err: NamespaceError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(code = err.code(), "request failed: {}", err);
        }
        Self {
            status,
            body: ErrorBody {
                error: err.code(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
