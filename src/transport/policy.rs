use crate::config::{CredentialRule, Credentials, CredentialsConfig};

/// Per-request credential predicate over the destination path.
#[derive(Debug, Clone)]
pub struct CredentialPolicy {
    default: Credentials,
    rules: Vec<CredentialRule>,
}

impl CredentialPolicy {
    pub fn new(config: &CredentialsConfig) -> Self {
        CredentialPolicy {
            default: config.default,
            rules: config.rules.clone(),
        }
    }

    /// First matching rule in table order, else the default.
    pub fn decide(&self, path: &str) -> Credentials {
        let path = path.split('?').next().unwrap_or(path);
        self.rules
            .iter()
            .find(|rule| prefix_matches(&rule.prefix, path))
            .map(|rule| rule.credentials)
            .unwrap_or(self.default)
    }

    pub fn attaches(&self, path: &str) -> bool {
        self.decide(path) == Credentials::Include
    }
}

/// Segment-aware prefix match.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };
    rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(prefix: &str, credentials: Credentials) -> CredentialRule {
        CredentialRule {
            prefix: prefix.to_string(),
            credentials,
        }
    }

    #[test]
    fn default_table_keeps_news_public() {
        let policy = CredentialPolicy::new(&CredentialsConfig::default());
        assert!(!policy.attaches("/api/news"));
        assert!(!policy.attaches("/api/news/123"));
        assert!(!policy.attaches("/api/news?sort=views&size=5"));
        assert!(policy.attaches("/api/newsletter"));
        assert!(policy.attaches("/api/clusters"));
        assert!(policy.attaches("/api/auth/me"));
        assert!(!policy.attaches("/static/logo.svg"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = CredentialPolicy::new(&CredentialsConfig {
            default: Credentials::Omit,
            rules: vec![
                rule("/api", Credentials::Include),
                rule("/api/news", Credentials::Omit),
            ],
        });
        // The broader rule is listed first, so it shadows the narrower one.
        assert!(policy.attaches("/api/news/1"));
    }

    #[test]
    fn trailing_slash_prefix_matches_children_only() {
        let policy = CredentialPolicy::new(&CredentialsConfig {
            default: Credentials::Include,
            rules: vec![rule("/api/news/", Credentials::Omit)],
        });
        assert!(!policy.attaches("/api/news/9"));
        assert!(policy.attaches("/api/news"));
    }

    #[test]
    fn empty_table_uses_default() {
        let policy = CredentialPolicy::new(&CredentialsConfig {
            default: Credentials::Include,
            rules: vec![],
        });
        assert!(policy.attaches("/anything"));
    }
}
