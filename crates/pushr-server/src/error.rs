use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pushr_store::StoreError;
use pushr_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<TypeError> for ServerError {
    fn from(e: TypeError) -> Self {
        Self::Store(e.into())
    }
}

impl ServerError {
    /// HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Store(e) => match e {
                StoreError::ReleaseNotFound(_)
                | StoreError::VersionNotFound { .. }
                | StoreError::NoVersionInChannel { .. }
                | StoreError::Invalid(TypeError::NoVersionInChannel(_)) => StatusCode::NOT_FOUND,
                StoreError::Conflict { .. } => StatusCode::CONFLICT,
                StoreError::Invalid(_) | StoreError::EmptyPayload => StatusCode::BAD_REQUEST,
                StoreError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StoreError::MissingPayload { .. }
                | StoreError::Snapshot { .. }
                | StoreError::Serialization(_)
                | StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            return status.into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            return (status, "Error: internal server error").into_response();
        }
        tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        (status, format!("Error: {self}")).into_response()
    }
}
