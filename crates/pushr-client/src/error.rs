use pushr_store::StoreError;
use pushr_types::TypeError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Map a non-success response onto the error taxonomy.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = body.trim().trim_start_matches("Error: ").to_string();
        match status {
            StatusCode::BAD_REQUEST => Self::Invalid(message),
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(message),
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<TypeError> for ClientError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::NoVersionInChannel(_) => Self::NotFound(e.to_string()),
            other => Self::Invalid(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::CONFLICT, "Error: conflict"),
            ClientError::Conflict(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, ""),
            ClientError::Unauthorized
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
            ClientError::Server { status: 500, .. }
        ));
        match ClientError::from_status(StatusCode::NOT_FOUND, "Error: release not found: x\n") {
            ClientError::NotFound(msg) => assert_eq!(msg, "release not found: x"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn channel_miss_is_not_found() {
        let e = ClientError::from(TypeError::NoVersionInChannel("beta".into()));
        assert!(matches!(e, ClientError::NotFound(_)));
        let e = ClientError::from(TypeError::InvalidName("a-b".into()));
        assert!(matches!(e, ClientError::Invalid(_)));
    }
}
