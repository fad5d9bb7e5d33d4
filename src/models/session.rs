use serde::Serialize;

use super::user::UserRecord;

/// Error text stored when the session could not be refreshed.
pub const SESSION_EXPIRED: &str = "session expired";

/// Process-wide authentication state.
///
/// Fields are private so that `authenticated == true` always comes with a user:
/// the only ways to build a state are the three constructors below.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(rename = "isAuthenticated")]
    authenticated: bool,
    user: Option<UserRecord>,
    loading: bool,
    error: Option<String>,
}

impl SessionState {
    /// State at process start: unauthenticated, waiting for the bootstrap.
    pub fn initial() -> Self {
        SessionState {
            authenticated: false,
            user: None,
            loading: true,
            error: None,
        }
    }

    pub fn authenticated(user: UserRecord, loading: bool) -> Self {
        SessionState {
            authenticated: true,
            user: Some(user),
            loading,
            error: None,
        }
    }

    pub fn unauthenticated(error: Option<String>) -> Self {
        SessionState {
            authenticated: false,
            user: None,
            loading: false,
            error,
        }
    }

    /// Unauthenticated with the "session expired" error.
    pub fn expired() -> Self {
        Self::unauthenticated(Some(SESSION_EXPIRED.to_string()))
    }

    /// Same state with `loading` cleared.
    pub fn settled(mut self) -> Self {
        self.loading = false;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// While true, `is_authenticated` and `user` are provisional.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}
