use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether session credentials (cookies, bearer token, CSRF header)
/// travel with a request.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Credentials {
    Include,
    Omit,
}

/// One row of the credential table. `prefix` matches whole path segments:
/// "/api/news" matches "/api/news" and "/api/news/42" but not "/api/newsletter".
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct CredentialRule {
    pub prefix: String,
    pub credentials: Credentials,
}

/// Ordered credential table; the first matching rule wins,
/// `default` applies when nothing matches.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials")]
    pub default: Credentials,
    #[serde(default = "default_rules")]
    pub rules: Vec<CredentialRule>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        CredentialsConfig {
            default: default_credentials(),
            rules: default_rules(),
        }
    }
}

/// CSRF token forwarding: the value of `cookie_name` is copied into
/// `header_name` on credentialed requests.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CsrfConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_header_name")]
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        CsrfConfig {
            enabled: true,
            cookie_name: default_cookie_name(),
            header_name: default_header_name(),
        }
    }
}

fn default_credentials() -> Credentials {
    Credentials::Omit
}

// Public news listings are read anonymously, the rest of the API needs the session.
fn default_rules() -> Vec<CredentialRule> {
    vec![
        CredentialRule {
            prefix: "/api/news".to_string(),
            credentials: Credentials::Omit,
        },
        CredentialRule {
            prefix: "/api".to_string(),
            credentials: Credentials::Include,
        },
    ]
}

fn default_true() -> bool {
    true
}

fn default_cookie_name() -> String {
    "XSRF-TOKEN".to_string()
}

fn default_header_name() -> String {
    "X-XSRF-TOKEN".to_string()
}
