#![allow(dead_code)]

use std::sync::Arc;

use prismauth::config::{parse_config, ConfigV1};
use prismauth::store::{MemoryStorage, Storage};
use prismauth::{Session, UserRecord};

pub fn test_config(base_url: &str) -> ConfigV1 {
    let yaml = format!(
        r#"
version: "1.0.0"
identity:
  base_url: "{base_url}"
  provider: google
  timeout_in_ms: 2000
persistence:
  type: memory
credentials:
  default: omit
  rules:
    - prefix: /api/news
      credentials: omit
    - prefix: /api
      credentials: include
logging:
  level: debug
  format: json
"#
    );
    parse_config(&yaml).expect("Failed to parse test config YAML")
}

/// A session over in-memory storage, plus a handle on that storage.
pub fn session_for(base_url: &str) -> (Session, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let session = Session::with_storage(test_config(base_url), storage.clone())
        .expect("session should build");
    (session, storage)
}

pub fn user_json(id: i64, name: &str) -> String {
    format!(
        r#"{{"id": {id}, "name": "{name}", "email": "user{id}@example.org", "role": "ROLE_USER"}}"#
    )
}

pub fn user(id: i64, name: &str) -> UserRecord {
    UserRecord::from_json(&user_json(id, name)).expect("fixture user")
}

/// Pretends a previous run left a user record behind.
pub async fn seed_user(storage: &MemoryStorage, id: i64, name: &str) {
    storage
        .set("user", &user_json(id, name))
        .await
        .expect("seed user");
}

/// Puts a session cookie valid for the whole API into the jar.
pub fn seed_cookie(session: &Session, cookie: &str) {
    let url = session.transport().url_for("/").expect("base url");
    session
        .transport()
        .cookie_jar()
        .add_cookie_str(&format!("{}; Path=/", cookie), &url);
}

/// A base URL nothing listens on.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";
