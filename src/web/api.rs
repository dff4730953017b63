//! JSON API handlers for the browser dashboard.
//!
//! Each handler corresponds to an endpoint and returns an [`HttpResponse`]
//! with JSON content. Operator-facing failures (bad dates, rejected logins,
//! missing session) are answered with a status code and `{"error": ...}`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::dashboard::{self, DashboardView};
use crate::daterange;
use crate::error::AuthError;

use super::{AppState, Backend, HttpResponse, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    authenticated: bool,
    username: Option<String>,
    /// One-shot greeting after a successful login.
    welcome: Option<String>,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    #[serde(flatten)]
    view: DashboardView,
    days_in_range: i64,
    combined_error: Option<String>,
    /// The token was rejected during this pass and the session has ended.
    session_ended: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    service_url: String,
    service_reachable: bool,
    authenticated: bool,
    fetch_log_enabled: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(status: u16, data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status)))
}

/// Value of a query parameter; empty values count as absent.
fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn auth_status(err: &AuthError) -> u16 {
    match err {
        AuthError::MissingCredentials => 400,
        AuthError::InvalidCredentials { .. } => 401,
        AuthError::Timeout => 504,
        AuthError::Connection(_) | AuthError::MalformedResponse(_) => 502,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/session
pub fn get_session<B: Backend>(state: &mut AppState<B>) -> Result<HttpResponse> {
    let resp = SessionResponse {
        authenticated: state.session.is_authenticated(),
        username: state.session.username().map(str::to_string),
        welcome: state.session.take_welcome(),
    };
    json_response(200, &resp)
}

/// POST /api/login with `{"username": ..., "password": ...}`
pub fn post_login<B: Backend>(state: &mut AppState<B>, body: &str) -> Result<HttpResponse> {
    let form: LoginForm = match serde_json::from_str(body) {
        Ok(form) => form,
        Err(e) => return Ok(error_response(400, &format!("invalid login request: {e}"))),
    };

    match state
        .session
        .login(&state.backend, &form.username, &form.password)
    {
        Ok(()) => get_session(state),
        Err(e) => Ok(error_response(auth_status(&e), &e.to_string())),
    }
}

/// POST /api/logout
pub fn post_logout<B: Backend>(state: &mut AppState<B>) -> Result<HttpResponse> {
    state.session.logout();
    get_session(state)
}

/// GET /api/dashboard?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD
///
/// Both parameters are optional; the default window ends today.
pub fn get_dashboard<B: Backend>(
    state: &mut AppState<B>,
    url: &str,
    today: NaiveDate,
) -> Result<HttpResponse> {
    let start = query_param(url, "start_date");
    let end = query_param(url, "end_date");

    let range = match daterange::resolve(
        start.as_deref(),
        end.as_deref(),
        state.default_range_days,
        today,
    ) {
        Ok(range) => range,
        Err(e) => return Ok(error_response(400, &e.to_string())),
    };

    let view = match dashboard::render_pass(&state.backend, &mut state.session, range) {
        Ok(view) => view,
        Err(e) => return Ok(error_response(401, &e.to_string())),
    };

    let resp = DashboardResponse {
        days_in_range: view.range.days_in_range(),
        combined_error: view.combined_error(),
        session_ended: view.token_rejected(),
        view,
    };
    json_response(200, &resp)
}

/// GET /api/health
pub fn get_health<B: Backend>(state: &mut AppState<B>) -> Result<HttpResponse> {
    let resp = HealthResponse {
        service_url: state.backend.service_url().to_string(),
        service_reachable: state.backend.is_reachable(),
        authenticated: state.session.is_authenticated(),
        fetch_log_enabled: state.fetch_log_enabled,
    };
    json_response(200, &resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
