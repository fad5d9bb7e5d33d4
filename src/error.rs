//! Error taxonomy for session and identity operations.

use thiserror::Error;

use crate::store::StoreError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The server answered 401. Drives refresh-or-logout.
    #[error("unauthorized")]
    Unauthorized,

    /// Network, DNS or timeout failure.
    #[error("identity service unreachable: {0}")]
    Unreachable(String),

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    /// The login callback URL carried no `token` parameter.
    #[error("authentication token not found in redirect")]
    MissingRedirectToken,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl SessionError {
    /// Only an explicit 401 leads to refresh-or-logout; every other failure
    /// is handled like a transport problem.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Unauthorized)
    }

    /// Classifies a `reqwest` failure. Body decoding problems are reported as
    /// `Malformed`, everything else as `Unreachable`.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Malformed(err.to_string())
        } else {
            SessionError::Unreachable(err.to_string())
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Storage(err.to_string())
    }
}
