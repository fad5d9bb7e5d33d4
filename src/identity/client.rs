use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::config::{Credentials, IdentityConfig};
use crate::error::{SessionError, SessionResult};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::models::UserRecord;
use crate::transport::{ApiRequest, HttpTransport};

/// The three calls the session layer makes to the identity service.
/// None of them retries on its own; recovery belongs to the interceptor.
#[async_trait]
pub trait IdentityEndpoint: Send + Sync {
    /// Current user, or `Unauthorized` on 401.
    async fn fetch_current_user(&self) -> SessionResult<UserRecord>;

    /// `Ok(true)` when the session was extended, `Ok(false)` when the server
    /// refused. Only transport failures are errors.
    async fn refresh_session(&self) -> SessionResult<bool>;

    /// Best-effort server-side invalidation.
    async fn end_session(&self) -> SessionResult<()>;
}

/// `IdentityEndpoint` over HTTP. Every call is credentialed.
pub struct HttpIdentityClient {
    config: IdentityConfig,
    transport: Arc<HttpTransport>,
    metrics: Metrics,
}

impl HttpIdentityClient {
    pub fn new(config: &IdentityConfig, transport: Arc<HttpTransport>, metrics: Metrics) -> Self {
        info!(
            "Creating identity client for '{}' (provider '{}')",
            config.base_url, config.provider
        );
        HttpIdentityClient {
            config: config.clone(),
            transport,
            metrics,
        }
    }

    async fn request_current_user(&self, request: &ApiRequest) -> SessionResult<UserRecord> {
        let response = self.transport.send(request).await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SessionError::Unauthorized),
            status if status.is_success() => {
                let body = response.text().await.map_err(SessionError::from_transport)?;
                UserRecord::from_json(&body).map_err(|e| SessionError::Malformed(e.to_string()))
            }
            status => Err(SessionError::UnexpectedStatus(status.as_u16())),
        }
    }

    fn record(&self, operation: &str, started: Instant, result: &str) {
        self.metrics.record_identity_call(operation, result);
        self.metrics
            .record_identity_duration(operation, started.elapsed().as_secs_f64());
    }
}

fn result_label<T>(result: &SessionResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(SessionError::Unauthorized) => "unauthorized",
        Err(SessionError::Malformed(_)) => "malformed",
        Err(SessionError::UnexpectedStatus(_)) => "status",
        Err(_) => "unreachable",
    }
}

#[async_trait]
impl IdentityEndpoint for HttpIdentityClient {
    async fn fetch_current_user(&self) -> SessionResult<UserRecord> {
        debug!("Checking current user at '{}'", self.config.me_path);
        let started = Instant::now();
        let request = ApiRequest::get(self.config.me_path.as_str()).credentials(Credentials::Include);

        let result = self.request_current_user(&request).await;

        self.record("me", started, result_label(&result));
        result
    }

    async fn refresh_session(&self) -> SessionResult<bool> {
        debug!("Refreshing session at '{}'", self.config.refresh_path);
        let started = Instant::now();
        let request =
            ApiRequest::post(self.config.refresh_path.as_str()).credentials(Credentials::Include);

        let result = self
            .transport
            .send(&request)
            .await
            .map(|response| response.status().is_success());

        let label = match &result {
            Ok(true) => "ok",
            Ok(false) => "refused",
            Err(_) => "unreachable",
        };
        self.record("refresh", started, label);
        result
    }

    async fn end_session(&self) -> SessionResult<()> {
        debug!("Ending session at '{}'", self.config.logout_path);
        let started = Instant::now();
        let request =
            ApiRequest::post(self.config.logout_path.as_str()).credentials(Credentials::Include);

        let result = match self.transport.send(&request).await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                warn!("Logout endpoint answered {}", response.status());
                Err(SessionError::UnexpectedStatus(response.status().as_u16()))
            }
            Err(e) => Err(e),
        };

        self.record("logout", started, result_label(&result));
        result
    }
}
