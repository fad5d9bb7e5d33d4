use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::policy::CredentialPolicy;
use super::request::ApiRequest;
use crate::config::{Credentials, CredentialsConfig, CsrfConfig, IdentityConfig};
use crate::error::{SessionError, SessionResult};
use crate::metrics::{Metrics, MetricsRecorder};

/// The request stage: turns an `ApiRequest` into a `reqwest` call and decides,
/// per call, whether session credentials go with it.
///
/// Credentialed calls share a cookie jar and carry the bearer token and the
/// CSRF header when those exist. Anonymous calls use a second client that
/// has no cookie store at all.
pub struct HttpTransport {
    base_url: String,
    policy: CredentialPolicy,
    csrf_cookie: Option<String>,
    csrf_header: Option<HeaderName>,
    jar: Arc<Jar>,
    credentialed: Client,
    anonymous: Client,
    bearer: RwLock<Option<String>>,
    metrics: Metrics,
}

impl HttpTransport {
    pub fn new(
        identity: &IdentityConfig,
        credentials: &CredentialsConfig,
        csrf: &CsrfConfig,
        metrics: Metrics,
    ) -> SessionResult<Self> {
        let base_url = identity.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| SessionError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let timeout = Duration::from_millis(identity.timeout_in_ms);
        let jar = Arc::new(Jar::default());
        let credentialed = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(SessionError::from_transport)?;
        let anonymous = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SessionError::from_transport)?;

        let (csrf_cookie, csrf_header) = if csrf.enabled {
            match HeaderName::from_bytes(csrf.header_name.as_bytes()) {
                Ok(name) => (Some(csrf.cookie_name.clone()), Some(name)),
                Err(_) => {
                    warn!(
                        "Invalid CSRF header name '{}'; CSRF forwarding disabled",
                        csrf.header_name
                    );
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Ok(HttpTransport {
            base_url,
            policy: CredentialPolicy::new(credentials),
            csrf_cookie,
            csrf_header,
            jar,
            credentialed,
            anonymous,
            bearer: RwLock::new(None),
            metrics,
        })
    }

    /// Absolute URL for an API path. The base URL's own path is kept.
    pub fn url_for(&self, path: &str) -> SessionResult<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|e| SessionError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    /// The cookie jar shared by all credentialed calls.
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub async fn set_bearer_token(&self, token: Option<String>) {
        *self.bearer.write().await = token;
    }

    pub async fn bearer_token(&self) -> Option<String> {
        self.bearer.read().await.clone()
    }

    /// Whether `request` travels with session credentials.
    pub fn attaches_credentials(&self, request: &ApiRequest) -> bool {
        match request.credentials_override() {
            Some(credentials) => credentials == Credentials::Include,
            None => self.policy.attaches(request.path()),
        }
    }

    /// Sends one attempt of `request`. Any HTTP status is a successful send;
    /// only transport failures are errors here.
    pub async fn send(&self, request: &ApiRequest) -> SessionResult<Response> {
        let url = self.url_for(request.raw_path())?;
        let include = self.attaches_credentials(request);
        let client = if include {
            &self.credentialed
        } else {
            &self.anonymous
        };

        let mut builder = client
            .request(request.method().clone(), url.clone())
            .headers(request.headers().clone());
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if include {
            if let Some(token) = self.bearer_token().await {
                builder = builder.bearer_auth(token);
            }
            if let Some((name, value)) = self.csrf_header_for(&url) {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let result = builder.send().await;
        let mode = if include { "include" } else { "omit" };
        self.metrics
            .record_request_duration(mode, started.elapsed().as_secs_f64());

        let response = result.map_err(SessionError::from_transport)?;
        debug!(
            "{} {} -> {} (credentials: {})",
            request.method(),
            request.path(),
            response.status(),
            mode
        );
        Ok(response)
    }

    fn csrf_header_for(&self, url: &Url) -> Option<(HeaderName, HeaderValue)> {
        let cookie_name = self.csrf_cookie.as_deref()?;
        let header_name = self.csrf_header.clone()?;
        let cookies = self.jar.cookies(url)?;
        let cookies = cookies.to_str().ok()?;
        let token = find_cookie(cookies, cookie_name)?;
        let value = HeaderValue::from_str(token).ok()?;
        Some((header_name, value))
    }
}

/// Looks up `name` in a `Cookie` header value ("a=1; b=2").
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
