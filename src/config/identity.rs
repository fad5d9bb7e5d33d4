use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the identity service lives and which paths it serves.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct IdentityConfig {
    /// Base URL of the API, e.g. "http://localhost:8080".
    pub base_url: String,
    /// OAuth2 provider name used in the authorization entry point.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_me_path")]
    pub me_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Per-request timeout for every call made by the client.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

impl IdentityConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        IdentityConfig {
            base_url: base_url.into(),
            provider: default_provider(),
            me_path: default_me_path(),
            refresh_path: default_refresh_path(),
            logout_path: default_logout_path(),
            timeout_in_ms: default_timeout_in_ms(),
        }
    }

    /// Path of the browser navigation target that starts the OAuth2 flow.
    pub fn authorize_path(&self) -> String {
        format!("/oauth2/authorize/{}", self.provider)
    }

    /// Calls on these paths never trigger refresh-and-replay.
    pub fn is_recovery_exempt(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        path == self.me_path || path == self.refresh_path
    }
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_me_path() -> String {
    "/api/auth/me".to_string()
}

fn default_refresh_path() -> String {
    "/api/auth/refresh-token".to_string()
}

fn default_logout_path() -> String {
    "/api/auth/logout".to_string()
}

fn default_timeout_in_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_paths_are_exempt_from_recovery() {
        let config = IdentityConfig::new("http://localhost:8080");
        assert!(config.is_recovery_exempt("/api/auth/me"));
        assert!(config.is_recovery_exempt("/api/auth/refresh-token?x=1"));
        assert!(!config.is_recovery_exempt("/api/auth/logout"));
        assert!(!config.is_recovery_exempt("/api/bookmarks"));
    }

    #[test]
    fn authorize_path_uses_provider() {
        let mut config = IdentityConfig::new("http://localhost:8080");
        assert_eq!(config.authorize_path(), "/oauth2/authorize/google");
        config.provider = "kakao".into();
        assert_eq!(config.authorize_path(), "/oauth2/authorize/kakao");
    }
}
