//! Authenticated HTTP client for the analytics service.
//!
//! Synchronous `ureq` client with a bounded timeout. Speaks three endpoints:
//!
//! - `POST /login`: credentials for an access token
//! - `GET /dashboard/stats?start_date=..&end_date=..`
//! - `GET /dashboard/user_activity?days=..`
//!
//! Dashboard calls return the raw response body; decoding belongs to the
//! normalizer so that an undecodable body can still be shown to the operator.
//! There is no retry: a timeout is reported as such.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::schema::ServiceConfig;
use crate::daterange::DateRange;
use crate::error::{AuthError, Endpoint, FetchError};
use crate::session::{Authenticate, BearerToken};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for `POST /login`.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response body from `POST /login`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

// ---------------------------------------------------------------------------
// Dashboard API seam
// ---------------------------------------------------------------------------

/// The two dashboard reads a render pass needs.
///
/// `Sync` because a render pass issues both calls from scoped threads.
pub trait DashboardApi: Sync {
    /// Raw body of `/dashboard/stats` for `range`.
    fn fetch_stats(&self, token: &BearerToken, range: &DateRange) -> Result<String, FetchError>;

    /// Raw body of `/dashboard/user_activity` for the last `days` days.
    fn fetch_activity(&self, token: &BearerToken, days: i64) -> Result<String, FetchError>;

    /// Where the render pass records each fetch, if anywhere.
    fn fetch_log(&self) -> Option<&Path> {
        None
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one analytics service instance.
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
    timeout: Duration,
    /// JSONL fetch log; `None` when logging is disabled.
    fetch_log: Option<PathBuf>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            timeout,
            fetch_log: None,
        }
    }

    /// Build a client from the resolved `[service]` config.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Append one JSONL record per dashboard fetch to `path`.
    pub fn with_fetch_log(mut self, path: Option<PathBuf>) -> Self {
        self.fetch_log = path;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether anything answers HTTP at the base URL.
    ///
    /// Any status code counts as reachable; only transport failures do not.
    pub fn is_reachable(&self) -> bool {
        let result = self
            .agent
            .get(&self.base_url)
            .timeout(Duration::from_secs(5))
            .call();
        !matches!(result, Err(ureq::Error::Transport(_)))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue an authenticated GET and return the body of a 2xx response.
    fn get(
        &self,
        endpoint: Endpoint,
        token: &BearerToken,
        query: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let mut request = self
            .agent
            .get(&self.url(endpoint.path()))
            .set("Authorization", &token.header_value())
            .set("Content-Type", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(resp) => resp.into_string().map_err(|e| io_fetch_error(endpoint, &e)),
            Err(ureq::Error::Status(401, _)) => Err(FetchError::Unauthorized { endpoint }),
            Err(ureq::Error::Status(status, resp)) => Err(FetchError::Status {
                endpoint,
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(t)) => Err(transport_fetch_error(endpoint, &t)),
        }
    }
}

impl DashboardApi for ApiClient {
    fn fetch_stats(&self, token: &BearerToken, range: &DateRange) -> Result<String, FetchError> {
        self.get(
            Endpoint::Stats,
            token,
            &[
                ("start_date", range.start().format("%Y-%m-%d").to_string()),
                ("end_date", range.end().format("%Y-%m-%d").to_string()),
            ],
        )
    }

    fn fetch_activity(&self, token: &BearerToken, days: i64) -> Result<String, FetchError> {
        self.get(Endpoint::Activity, token, &[("days", days.to_string())])
    }

    fn fetch_log(&self) -> Option<&Path> {
        self.fetch_log.as_deref()
    }
}

impl Authenticate for ApiClient {
    fn authenticate(&self, username: &str, password: &str) -> Result<BearerToken, AuthError> {
        let body = LoginRequest { username, password };
        let resp = match self.agent.post(&self.url("/login")).send_json(&body) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(status, _)) => {
                return Err(AuthError::InvalidCredentials { status });
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(if is_timeout(&t) {
                    AuthError::Timeout
                } else {
                    AuthError::Connection(t.to_string())
                });
            }
        };

        let parsed: LoginResponse = resp
            .into_json()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("empty access_token".to_string()));
        }

        Ok(BearerToken::new(parsed.access_token))
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn transport_fetch_error(endpoint: Endpoint, t: &ureq::Transport) -> FetchError {
    if is_timeout(t) {
        FetchError::Timeout { endpoint }
    } else {
        FetchError::Transport {
            endpoint,
            detail: t.to_string(),
        }
    }
}

/// A body read that failed mid-stream.
fn io_fetch_error(endpoint: Endpoint, e: &std::io::Error) -> FetchError {
    if is_timeout_io(e) {
        FetchError::Timeout { endpoint }
    } else {
        FetchError::Transport {
            endpoint,
            detail: e.to_string(),
        }
    }
}

/// Walk the error chain looking for a timed-out socket.
fn is_timeout(t: &ureq::Transport) -> bool {
    let mut source = std::error::Error::source(t);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>()
            && is_timeout_io(io)
        {
            return true;
        }
        source = err.source();
    }
    t.to_string().contains("timed out")
}

fn is_timeout_io(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
