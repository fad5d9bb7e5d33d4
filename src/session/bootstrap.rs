//! One-time reconciliation of persisted and live session state.

use tracing::{debug, info, warn};

use super::auth::Session;
use super::persisted::PersistedUser;
use crate::error::SessionError;
use crate::models::{SessionState, UserRecord};

impl Session {
    /// Runs the bootstrap sequence the first time it is called and returns
    /// the resulting state. Later calls do not touch the network.
    pub async fn bootstrap(&self) -> SessionState {
        self.bootstrapped
            .get_or_init(|| self.run_bootstrap())
            .await;
        self.state()
    }

    async fn run_bootstrap(&self) {
        info!("Starting session bootstrap");
        self.restore_bearer_token().await;

        match self.store.persisted().load_user().await {
            Ok(PersistedUser::Present(user)) => self.bootstrap_from_persisted(user).await,
            Ok(PersistedUser::Corrupt) => {
                warn!("Discarding unreadable persisted user");
                self.store
                    .set_state(SessionState::unauthenticated(None))
                    .await;
            }
            Ok(PersistedUser::Absent) => self.bootstrap_without_persisted().await,
            Err(e) => {
                warn!("Could not read persisted user, checking server session: {}", e);
                self.bootstrap_without_persisted().await;
            }
        }

        let state = self.state();
        info!(
            authenticated = state.is_authenticated(),
            "Session bootstrap finished"
        );
    }

    async fn restore_bearer_token(&self) {
        match self.store.persisted().load_token().await {
            Ok(Some(token)) => {
                debug!("Restoring persisted bearer token");
                self.transport.set_bearer_token(Some(token)).await;
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read persisted bearer token: {}", e),
        }
    }

    /// Optimistically trusts the persisted user, then confirms with the server.
    async fn bootstrap_from_persisted(&self, persisted: UserRecord) {
        debug!("Persisted user {} found", persisted.id);
        self.store
            .set_state(SessionState::authenticated(persisted, true))
            .await;

        match self.identity.fetch_current_user().await {
            Ok(fresh) => {
                self.store
                    .set_state(SessionState::authenticated(fresh, false))
                    .await;
            }
            Err(SessionError::Unauthorized) => {
                info!("Persisted session rejected, trying refresh");
                if self.try_refresh().await {
                    match self.identity.fetch_current_user().await {
                        Ok(fresh) => {
                            self.store
                                .set_state(SessionState::authenticated(fresh, false))
                                .await;
                            return;
                        }
                        Err(e) => warn!("User check after refresh failed: {}", e),
                    }
                }
                self.expire().await;
            }
            Err(e) => {
                // Keep the optimistic state; a network blip is not a logout.
                warn!("User check failed, keeping persisted session: {}", e);
                self.store.update(|state| state.clone().settled()).await;
            }
        }
    }

    /// No local hint; a cookie-only session may still exist on the server.
    async fn bootstrap_without_persisted(&self) {
        match self.identity.fetch_current_user().await {
            Ok(user) => {
                info!("Server session found for user {}", user.id);
                self.store
                    .set_state(SessionState::authenticated(user, false))
                    .await;
            }
            Err(e) => {
                debug!("No server session: {}", e);
                self.store
                    .set_state(SessionState::unauthenticated(None))
                    .await;
            }
        }
    }
}
