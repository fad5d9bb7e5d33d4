use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::credentials::{CredentialsConfig, CsrfConfig};
use super::identity::IdentityConfig;
use super::logging::LoggingConfig;
use super::persistence::PersistenceConfig;

/// Environment variables with this prefix override file values,
/// `__` separates nested keys (e.g. `PRISMAUTH_IDENTITY__BASE_URL`).
pub const ENV_PREFIX: &str = "PRISMAUTH_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub identity: IdentityConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn into_v1(self) -> ConfigV1 {
        match self {
            Config::ConfigV1(c) => c,
        }
    }
}

/// Load config from a YAML file, with `PRISMAUTH_*` environment overrides.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    figment.extract::<Config>().map(Config::into_v1)
}

/// Parse config from an in-memory YAML document.
pub fn parse_config(yaml: &str) -> Result<ConfigV1, figment::Error> {
    Figment::new()
        .merge(Yaml::string(yaml))
        .extract::<Config>()
        .map(Config::into_v1)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, StorageBackend};

    #[test]
    fn minimal_config_fills_defaults() {
        let config = parse_config(
            r#"
version: "1.0.0"
identity:
  base_url: "http://localhost:8080"
"#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.identity.me_path, "/api/auth/me");
        assert_eq!(config.identity.refresh_path, "/api/auth/refresh-token");
        assert_eq!(config.identity.logout_path, "/api/auth/logout");
        assert_eq!(config.identity.provider, "google");
        assert_eq!(config.persistence.user_key, "user");
        assert!(matches!(
            config.persistence.backend,
            StorageBackend::Memory
        ));
        assert_eq!(config.credentials.default, Credentials::Omit);
        assert_eq!(config.csrf.cookie_name, "XSRF-TOKEN");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn full_config_parses() {
        let config = parse_config(
            r#"
version: "1.0.0"
identity:
  base_url: "http://api.example.org"
  provider: github
  timeout_in_ms: 1500
persistence:
  type: file
  directory: /tmp/prismauth
credentials:
  default: include
  rules:
    - prefix: /api/news/
      credentials: omit
logging:
  level: debug
  format: json
"#,
        )
        .expect("full config should parse");

        assert_eq!(config.identity.provider, "github");
        assert_eq!(config.identity.timeout_in_ms, 1500);
        match &config.persistence.backend {
            StorageBackend::File(file) => {
                assert_eq!(file.directory.to_str(), Some("/tmp/prismauth"))
            }
            other => panic!("expected file backend, got {:?}", other),
        }
        assert_eq!(config.credentials.rules.len(), 1);
        assert_eq!(config.credentials.default, Credentials::Include);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let result = parse_config(
            r#"
version: "2.0.0"
identity:
  base_url: "http://localhost:8080"
"#,
        );
        assert!(result.is_err());
    }
}
