use async_trait::async_trait;
use axum::extract::{Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use pushr_types::wire::TOKEN_HEADER;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Operation class a token grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Tokens presented with a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Value of the `X-PUSHR-TOKEN` header.
    pub header: Option<String>,
    /// Value of the `token` query parameter, when query tokens are enabled.
    pub query: Option<String>,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn header(token: impl Into<String>) -> Self {
        Self {
            header: Some(token.into()),
            query: None,
        }
    }

    /// Collect credentials from a request's headers and URI.
    pub fn from_request(request: &Request, allow_query: bool) -> Self {
        let query = if allow_query {
            Query::<TokenQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(q)| q.token)
        } else {
            None
        };
        Self {
            header: header_token(request.headers()),
            query,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.header.is_none() && self.query.is_none()
    }

    /// Whether any presented token equals `expected`, header first.
    pub fn presents(&self, expected: &str) -> bool {
        [&self.header, &self.query]
            .into_iter()
            .flatten()
            .any(|t| t == expected)
    }
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Succeeds when `credentials` may perform `access`, otherwise
    /// [`ServerError::Unauthorized`].
    async fn authorize(&self, credentials: &Credentials, access: Access) -> ServerResult<()>;
}

/// Separate read and write tokens. An empty token leaves its class open.
#[derive(Clone, Default)]
pub struct TokenAuth {
    read_token: String,
    write_token: String,
}

impl TokenAuth {
    pub fn new(read_token: impl Into<String>, write_token: impl Into<String>) -> Self {
        Self {
            read_token: read_token.into(),
            write_token: write_token.into(),
        }
    }

    fn token_for(&self, access: Access) -> &str {
        match access {
            Access::Read => &self.read_token,
            Access::Write => &self.write_token,
        }
    }
}

impl std::fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuth")
            .field("read_open", &self.read_token.is_empty())
            .field("write_open", &self.write_token.is_empty())
            .finish()
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authorize(&self, credentials: &Credentials, access: Access) -> ServerResult<()> {
        let expected = self.token_for(access);
        if expected.is_empty() || credentials.presents(expected) {
            return Ok(());
        }
        tracing::debug!(%access, anonymous = credentials.is_anonymous(), "token rejected");
        Err(ServerError::Unauthorized)
    }
}

/// Open access for every operation.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authorize(&self, _credentials: &Credentials, _access: Access) -> ServerResult<()> {
        Ok(())
    }
}

async fn guard(
    state: AppState,
    access: Access,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let credentials = Credentials::from_request(&request, state.allow_query_token);
    state.auth.authorize(&credentials, access).await?;
    Ok(next.run(request).await)
}

/// Route layer admitting requests that hold the read token.
pub async fn require_read(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    guard(state, Access::Read, request, next).await
}

/// Route layer admitting requests that hold the write token.
pub async fn require_write(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    guard(state, Access::Write, request, next).await
}
