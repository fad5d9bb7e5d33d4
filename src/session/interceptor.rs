//! Response stage of the interceptor pair: 401 detection, refresh, and a
//! single verbatim replay per logical call.

use reqwest::{Response, StatusCode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::auth::Session;
use crate::error::{SessionError, SessionResult};
use crate::metrics::MetricsRecorder;
use crate::transport::ApiRequest;

/// Which attempt of one logical call is in flight. Owned by the call,
/// so concurrent calls never share a retry allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(u8);

impl Attempt {
    pub const FIRST: Attempt = Attempt(0);

    pub fn is_replay(self) -> bool {
        self.0 > 0
    }

    pub fn next(self) -> Attempt {
        Attempt(self.0.saturating_add(1))
    }
}

/// What to do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hand the response to the caller.
    Deliver,
    /// Return `Unauthorized` without any recovery.
    Surface,
    /// Refresh the session, then replay as the given attempt.
    RefreshAndReplay(Attempt),
}

/// `exempt` marks identity-check and refresh calls, which must never
/// recover through themselves, and calls sent without credentials.
pub fn decide(status: StatusCode, exempt: bool, attempt: Attempt) -> Decision {
    if status != StatusCode::UNAUTHORIZED {
        Decision::Deliver
    } else if exempt || attempt.is_replay() {
        Decision::Surface
    } else {
        Decision::RefreshAndReplay(attempt.next())
    }
}

impl Session {
    /// Sends `request` through both interceptor stages.
    ///
    /// Non-401 responses are returned whatever their status. A 401 on a
    /// credentialed call leads to at most one refresh and one replay; if the refresh fails the session is
    /// cleared to "session expired" and `Unauthorized` is returned.
    pub async fn execute(&self, request: &ApiRequest) -> SessionResult<Response> {
        let call_id = Uuid::new_v4();
        // A call sent without credentials cannot be fixed by refreshing them.
        let exempt = self.config.identity.is_recovery_exempt(request.path())
            || !self.transport.attaches_credentials(request);
        let mut attempt = Attempt::FIRST;

        loop {
            let response = self.transport.send(request).await?;
            match decide(response.status(), exempt, attempt) {
                Decision::Deliver => return Ok(response),
                Decision::Surface => {
                    debug!(
                        %call_id,
                        replayed = attempt.is_replay(),
                        "401 on {} {} surfaced to caller",
                        request.method(),
                        request.path()
                    );
                    return Err(SessionError::Unauthorized);
                }
                Decision::RefreshAndReplay(next) => {
                    info!(
                        %call_id,
                        "401 on {} {}, refreshing session",
                        request.method(),
                        request.path()
                    );
                    if !self.try_refresh().await {
                        warn!(%call_id, "Refresh failed, session expired");
                        self.expire().await;
                        return Err(SessionError::Unauthorized);
                    }
                    self.metrics.record_replay();
                    attempt = next;
                }
            }
        }
    }
}
