use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::persisted::PersistedSession;
use crate::models::SessionState;

/// Holds the live `SessionState`, publishes every transition to subscribers
/// and mirrors the user record into durable storage.
pub struct SessionStore {
    sender: watch::Sender<SessionState>,
    persisted: PersistedSession,
    // Serializes persist-then-publish so storage and subscribers agree on order.
    transitions: Mutex<()>,
}

impl SessionStore {
    pub fn new(persisted: PersistedSession) -> Self {
        let (sender, _) = watch::channel(SessionState::initial());
        SessionStore {
            sender,
            persisted,
            transitions: Mutex::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.sender.borrow().clone()
    }

    /// Receives the current state immediately and every later transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.sender.subscribe()
    }

    pub fn persisted(&self) -> &PersistedSession {
        &self.persisted
    }

    /// The single mutation entry point. Authenticated states overwrite the
    /// persisted user; unauthenticated states clear the user and the token.
    /// Storage failures are logged and never block the transition.
    pub async fn set_state(&self, next: SessionState) {
        let _guard = self.transitions.lock().await;
        self.commit(next).await;
    }

    /// Derives the next state from the current one under the same lock as
    /// `set_state`, so no transition can slip in between read and write.
    pub async fn update<F>(&self, next: F)
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        let _guard = self.transitions.lock().await;
        let next = next(&*self.sender.borrow());
        self.commit(next).await;
    }

    // Caller holds `transitions`.
    async fn commit(&self, next: SessionState) {
        match next.user() {
            Some(user) if next.is_authenticated() => {
                if let Err(e) = self.persisted.save_user(user).await {
                    warn!("Failed to persist user {}: {}", user.id, e);
                }
            }
            _ => {
                if let Err(e) = self.persisted.clear_user().await {
                    warn!("Failed to clear persisted user: {}", e);
                }
                if let Err(e) = self.persisted.clear_token().await {
                    warn!("Failed to clear persisted token: {}", e);
                }
            }
        }

        debug!(
            authenticated = next.is_authenticated(),
            loading = next.is_loading(),
            error = next.error().unwrap_or(""),
            "Session state transition"
        );
        self.sender.send_replace(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersistenceConfig;
    use crate::models::UserRecord;
    use crate::session::persisted::PersistedUser;
    use crate::store::{MemoryStorage, Storage};
    use std::sync::Arc;

    fn user(name: &str) -> UserRecord {
        UserRecord {
            id: 1,
            display_name: name.into(),
            email: "a@example.org".into(),
            image_url: None,
            role: "ROLE_USER".into(),
        }
    }

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let persisted = PersistedSession::new(storage.clone(), &PersistenceConfig::default());
        (storage, SessionStore::new(persisted))
    }

    #[tokio::test]
    async fn test_starts_in_initial_state() {
        let (_, store) = store();
        assert_eq!(store.state(), SessionState::initial());
    }

    #[tokio::test]
    async fn test_authenticated_transition_persists_user() {
        let (_, store) = store();
        store
            .set_state(SessionState::authenticated(user("A"), false))
            .await;
        assert_eq!(
            store.persisted().load_user().await,
            Ok(PersistedUser::Present(user("A")))
        );

        store
            .set_state(SessionState::authenticated(user("A2"), false))
            .await;
        assert_eq!(
            store.persisted().load_user().await,
            Ok(PersistedUser::Present(user("A2")))
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_transition_clears_storage() {
        let (storage, store) = store();
        store
            .set_state(SessionState::authenticated(user("A"), false))
            .await;
        storage.set("accessToken", "tok").await.expect("set");

        store.set_state(SessionState::expired()).await;
        assert_eq!(storage.get("user").await, Ok(None));
        assert_eq!(storage.get("accessToken").await, Ok(None));
        assert!(!store.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_update_reads_latest_state() {
        let (storage, store) = store();
        store
            .set_state(SessionState::authenticated(user("A"), true))
            .await;
        store.set_state(SessionState::expired()).await;

        // Settling must not resurrect the optimistic user.
        store.update(|state| state.clone().settled()).await;
        assert_eq!(store.state(), SessionState::expired());
        assert_eq!(storage.get("user").await, Ok(None));

        store
            .update(|_| SessionState::authenticated(user("B"), false))
            .await;
        assert_eq!(
            store.persisted().load_user().await,
            Ok(PersistedUser::Present(user("B")))
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (_, store) = store();
        let mut receiver = store.subscribe();
        assert!(receiver.borrow_and_update().is_loading());

        store
            .set_state(SessionState::authenticated(user("A"), false))
            .await;
        receiver.changed().await.expect("sender alive");
        let seen = receiver.borrow_and_update().clone();
        assert!(seen.is_authenticated());
        assert_eq!(seen.user().map(|u| u.display_name.as_str()), Some("A"));
    }
}
