mod common;

use mockito::{Matcher, Server};
use prismauth::models::session::SESSION_EXPIRED;
use prismauth::store::Storage;
use prismauth::SessionState;

use common::{seed_cookie, seed_user, session_for, user, user_json, UNREACHABLE_URL};

/// A persisted user confirmed by the server ends up authenticated with the
/// fresh record, not the persisted one.
#[tokio::test]
async fn bootstrap_replaces_persisted_user_with_fresh_one() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(user_json(1, "A2"))
        .expect(1)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_user(&storage, 1, "A").await;

    let state = session.bootstrap().await;
    me.assert_async().await;

    assert_eq!(state, SessionState::authenticated(user(1, "A2"), false));
    assert_eq!(state.user().map(|u| u.display_name.as_str()), Some("A2"));
    assert!(state.error().is_none());

    let persisted = storage.get("user").await.expect("get").expect("user kept");
    assert!(persisted.contains(r#""name":"A2""#));
}

/// A transport failure during the check keeps the optimistic local state.
#[tokio::test]
async fn bootstrap_keeps_persisted_user_when_server_unreachable() {
    let (session, storage) = session_for(UNREACHABLE_URL);
    seed_user(&storage, 1, "A").await;

    let state = session.bootstrap().await;

    assert!(state.is_authenticated());
    assert_eq!(state.user(), Some(&user(1, "A")));
    assert!(!state.is_loading());
    assert!(state.error().is_none());
    assert!(storage.get("user").await.expect("get").is_some());
}

/// A server error is treated like a transport failure.
#[tokio::test]
async fn bootstrap_keeps_persisted_user_on_server_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .with_status(502)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_user(&storage, 1, "A").await;

    let state = session.bootstrap().await;
    refresh.assert_async().await;
    assert_eq!(state, SessionState::authenticated(user(1, "A"), false));
}

/// 401 on the check, refresh rotates the cookie, the second check succeeds.
#[tokio::test]
async fn bootstrap_refreshes_and_rechecks_once() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/api/auth/me")
        .match_header("cookie", "session=old")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .match_header("cookie", "session=old")
        .with_status(200)
        .with_header("set-cookie", "session=new; Path=/")
        .expect(1)
        .create_async()
        .await;
    let accepted = server
        .mock("GET", "/api/auth/me")
        .match_header("cookie", "session=new")
        .with_status(200)
        .with_body(user_json(1, "A"))
        .expect(1)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_user(&storage, 1, "A").await;
    seed_cookie(&session, "session=old");

    let state = session.bootstrap().await;
    rejected.assert_async().await;
    refresh.assert_async().await;
    accepted.assert_async().await;

    assert_eq!(state, SessionState::authenticated(user(1, "A"), false));
    assert_eq!(session.metrics().refresh_attempts("success"), 1);
}

/// 401 and a refused refresh expire the session and clear storage.
#[tokio::test]
async fn bootstrap_expires_when_refresh_is_refused() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_user(&storage, 1, "A").await;
    storage.set("accessToken", "stale").await.expect("seed token");

    let state = session.bootstrap().await;
    me.assert_async().await;
    refresh.assert_async().await;

    assert_eq!(state, SessionState::expired());
    assert_eq!(state.error(), Some(SESSION_EXPIRED));
    assert_eq!(storage.get("user").await, Ok(None));
    assert_eq!(storage.get("accessToken").await, Ok(None));
    assert_eq!(session.transport().bearer_token().await, None);
    assert_eq!(session.metrics().expirations(), 1);
}

/// Without a persisted user a 401 simply means "not signed in": no refresh.
#[tokio::test]
async fn bootstrap_without_persisted_user_does_not_refresh() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let (session, _storage) = session_for(&server.url());
    let state = session.bootstrap().await;
    me.assert_async().await;
    refresh.assert_async().await;

    assert_eq!(state, SessionState::unauthenticated(None));
}

/// A cookie-only session is picked up and mirrored into storage.
#[tokio::test]
async fn bootstrap_without_persisted_user_adopts_cookie_session() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/auth/me")
        .match_header("cookie", "session=abc")
        .with_status(200)
        .with_body(user_json(5, "Cookie"))
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_cookie(&session, "session=abc");

    let state = session.bootstrap().await;
    assert_eq!(state, SessionState::authenticated(user(5, "Cookie"), false));
    assert!(storage.get("user").await.expect("get").is_some());
}

/// An unreadable persisted record is dropped without asking the server.
#[tokio::test]
async fn bootstrap_discards_corrupt_persisted_user() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .expect(0)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    storage.set("user", "{broken").await.expect("seed");

    let state = session.bootstrap().await;
    me.assert_async().await;
    assert_eq!(state, SessionState::unauthenticated(None));
    assert_eq!(storage.get("user").await, Ok(None));
}

#[tokio::test]
async fn bootstrap_runs_only_once() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .with_status(200)
        .with_body(user_json(1, "A"))
        .expect(1)
        .create_async()
        .await;

    let (session, _storage) = session_for(&server.url());
    let first = session.bootstrap().await;
    let second = session.bootstrap().await;
    me.assert_async().await;
    assert_eq!(first, second);
}

/// A bearer token left by a previous login is sent with the identity check.
#[tokio::test]
async fn bootstrap_restores_persisted_bearer_token() {
    let mut server = Server::new_async().await;
    let me = server
        .mock("GET", "/api/auth/me")
        .match_header("authorization", "Bearer tok-9")
        .with_status(200)
        .with_body(user_json(9, "Bearer"))
        .expect(1)
        .create_async()
        .await;
    let anonymous = server
        .mock("GET", "/api/auth/me")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .expect(0)
        .create_async()
        .await;

    let (session, storage) = session_for(&server.url());
    seed_user(&storage, 9, "Bearer").await;
    storage.set("accessToken", "tok-9").await.expect("seed token");

    let state = session.bootstrap().await;
    me.assert_async().await;
    anonymous.assert_async().await;
    assert!(state.is_authenticated());
    assert_eq!(session.transport().bearer_token().await.as_deref(), Some("tok-9"));
}
