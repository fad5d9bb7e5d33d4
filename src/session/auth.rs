//! The public surface of the session layer.
//!
//! `Session` is created once by the host and shared as `Arc<Session>`.
//! Everything the rest of the application needs goes through it: state
//! reads and subscriptions, `login()`/`logout()`, redirect completion and
//! intercepted API calls (`execute`, see the interceptor module).

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::{watch, OnceCell};
use tracing::{info, warn};

use super::persisted::{PersistedSession, PersistedUser};
use super::store::SessionStore;
use crate::config::ConfigV1;
use crate::error::{SessionError, SessionResult};
use crate::identity::{HttpIdentityClient, IdentityEndpoint};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::{SessionState, UserRecord};
use crate::store::{create_storage, Storage};
use crate::transport::HttpTransport;

/// Error text stored when the logout call failed; local state is cleared anyway.
pub const LOGOUT_FAILED: &str = "logout request failed";
/// Error text stored when the login callback carried no token.
pub const TOKEN_NOT_FOUND: &str = "authentication token not found";
/// Error text stored when the user could not be fetched after the callback.
pub const LOGIN_FAILED: &str = "authentication failed";

/// A navigation the host shell should perform. The session layer never
/// navigates by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: Url,
}

pub struct Session {
    pub(super) config: Arc<ConfigV1>,
    pub(super) store: SessionStore,
    pub(super) identity: Arc<dyn IdentityEndpoint>,
    pub(super) transport: Arc<HttpTransport>,
    pub(super) metrics: Metrics,
    pub(super) bootstrapped: OnceCell<()>,
}

impl Session {
    /// Builds a session with the storage backend named in the config.
    pub fn new(config: ConfigV1) -> SessionResult<Self> {
        let storage = create_storage(&config.persistence);
        Self::with_storage(config, storage)
    }

    /// Builds a session over an existing storage backend.
    pub fn with_storage(config: ConfigV1, storage: Arc<dyn Storage>) -> SessionResult<Self> {
        let metrics = Metrics::new();
        let transport = Arc::new(HttpTransport::new(
            &config.identity,
            &config.credentials,
            &config.csrf,
            metrics.clone(),
        )?);
        let identity: Arc<dyn IdentityEndpoint> = Arc::new(HttpIdentityClient::new(
            &config.identity,
            transport.clone(),
            metrics.clone(),
        ));
        let persisted = PersistedSession::new(storage, &config.persistence);

        Ok(Session {
            config: Arc::new(config),
            store: SessionStore::new(persisted),
            identity,
            transport,
            metrics,
            bootstrapped: OnceCell::new(),
        })
    }

    /// Replaces the identity endpoint, e.g. with one that talks to a
    /// different service than the API transport.
    pub fn with_identity_endpoint(mut self, identity: Arc<dyn IdentityEndpoint>) -> Self {
        self.identity = identity;
        self
    }

    pub fn config(&self) -> &ConfigV1 {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// False when sign-in is kept in process memory only.
    pub fn persists_across_restarts(&self) -> bool {
        self.store.persisted().is_durable()
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.state().is_authenticated()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.store.state().user().cloned()
    }

    pub fn loading(&self) -> bool {
        self.store.state().is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.state().error().map(str::to_string)
    }

    /// Where to send the browser to start the OAuth2 flow. No state changes;
    /// the provider's redirect back is handled by `complete_login`.
    pub fn login(&self) -> SessionResult<Redirect> {
        let location = self
            .transport
            .url_for(&self.config.identity.authorize_path())?;
        info!("Login redirect to {}", location);
        Ok(Redirect { location })
    }

    /// Ends the session. The server call is best-effort: local state and
    /// storage are cleared whatever it returns.
    pub async fn logout(&self) {
        let error = match self.identity.end_session().await {
            Ok(()) => None,
            Err(e) => {
                warn!("Logout request failed, clearing local session anyway: {}", e);
                Some(LOGOUT_FAILED.to_string())
            }
        };
        self.transport.set_bearer_token(None).await;
        self.store
            .set_state(SessionState::unauthenticated(error))
            .await;
        info!("Session cleared by logout");
    }

    /// Completes the provider redirect: takes the `token` query parameter of
    /// `callback_url` (absolute or relative), installs it as bearer token and
    /// loads the user it belongs to.
    pub async fn complete_login(&self, callback_url: &str) -> SessionResult<UserRecord> {
        let Some(token) = redirect_token(callback_url)? else {
            warn!("Login callback carried no token");
            // An existing sign-in is not undone by a stray callback.
            self.store
                .update(|state| {
                    if state.is_authenticated() {
                        state.clone()
                    } else {
                        SessionState::unauthenticated(Some(TOKEN_NOT_FOUND.to_string()))
                    }
                })
                .await;
            return Err(SessionError::MissingRedirectToken);
        };

        self.transport.set_bearer_token(Some(token.clone())).await;
        if let Err(e) = self.store.persisted().save_token(&token).await {
            warn!("Failed to persist bearer token: {}", e);
        }

        match self.identity.fetch_current_user().await {
            Ok(user) => {
                info!("User {} signed in", user.id);
                self.store
                    .set_state(SessionState::authenticated(user.clone(), false))
                    .await;
                Ok(user)
            }
            Err(e) => {
                warn!("Could not load user after login redirect: {}", e);
                self.transport.set_bearer_token(None).await;
                self.store
                    .set_state(SessionState::unauthenticated(Some(LOGIN_FAILED.to_string())))
                    .await;
                Err(e)
            }
        }
    }

    /// Attempts a session refresh. Without a persisted user there is no
    /// session worth extending and the server is not asked. Transport errors
    /// count as a failed refresh.
    pub(super) async fn try_refresh(&self) -> bool {
        match self.store.persisted().load_user().await {
            Ok(PersistedUser::Present(_)) => {}
            _ => {
                info!("No persisted user, not attempting a session refresh");
                self.metrics.record_refresh_attempt("skipped");
                return false;
            }
        }

        match self.identity.refresh_session().await {
            Ok(true) => {
                info!("Session refreshed");
                self.metrics.record_refresh_attempt("success");
                true
            }
            Ok(false) => {
                warn!("Session refresh refused by the server");
                self.metrics.record_refresh_attempt("failure");
                false
            }
            Err(e) => {
                warn!("Session refresh failed: {}", e);
                self.metrics.record_refresh_attempt("failure");
                false
            }
        }
    }

    /// Forces the session back to unauthenticated with "session expired".
    pub(super) async fn expire(&self) {
        self.metrics.record_session_expired();
        self.transport.set_bearer_token(None).await;
        self.store.set_state(SessionState::expired()).await;
    }
}

/// Extracts the `token` parameter. Relative callbacks are resolved against
/// a placeholder origin since only the query matters.
fn redirect_token(callback_url: &str) -> SessionResult<Option<String>> {
    let base = Url::parse("http://callback.invalid/")
        .map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
    let url = base
        .join(callback_url)
        .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", callback_url, e)))?;
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty()))
}
