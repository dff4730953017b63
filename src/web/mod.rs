//! Embedded browser dashboard.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - the single-page dashboard (login form, date filter, KPI cards, charts)
//! - JSON endpoints that drive one [`Session`] and render passes against the
//!   analytics service
//!
//! Launched via `melanalytics web` (default: `http://127.0.0.1:8501`).

mod api;
mod frontend;

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::client::{ApiClient, DashboardApi};
use crate::config::AppConfig;
use crate::session::{Authenticate, Session};

type HttpResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// What the dashboard server needs from the analytics service.
pub trait Backend: DashboardApi + Authenticate {
    fn service_url(&self) -> &str;
    fn is_reachable(&self) -> bool;
}

impl Backend for ApiClient {
    fn service_url(&self) -> &str {
        self.base_url()
    }

    fn is_reachable(&self) -> bool {
        ApiClient::is_reachable(self)
    }
}

/// State owned by the server loop: one operator, one session.
pub struct AppState<B> {
    pub backend: B,
    pub session: Session,
    pub default_range_days: u32,
    pub fetch_log_enabled: bool,
}

impl<B: Backend> AppState<B> {
    pub fn new(backend: B, default_range_days: u32) -> Self {
        Self {
            backend,
            session: Session::new(),
            default_range_days,
            fetch_log_enabled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on `cfg.web.addr`.
///
/// Blocks the current thread. Requests are handled sequentially; a failing
/// request gets a JSON error and the server keeps going.
pub fn serve(cfg: &AppConfig) -> Result<()> {
    let addr = cfg.web.addr.as_str();
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    let client = crate::cli::client_for(cfg);
    println!("melanalytics dashboard running at http://{addr}");
    println!("Analytics service: {}", client.base_url());
    println!("Press Ctrl+C to stop.\n");

    if cfg.web.open_browser {
        let _ = open_browser(&format!("http://{addr}"));
    }

    let mut state = AppState::new(client, cfg.dashboard.default_range_days);
    state.fetch_log_enabled = cfg.logging.enabled;

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Post) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let today = Local::now().date_naive();
        let resp = dispatch(&mut state, &method, &url, body.as_deref(), today)
            .unwrap_or_else(|e| error_response(500, &e.to_string()));
        let status = resp.status_code().0;
        let _ = request.respond(resp);

        if cfg.logging.access_log {
            println!(
                "{} {} {} {}",
                method,
                url,
                status,
                Local::now().format("%H:%M:%S")
            );
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch<B: Backend>(
    state: &mut AppState<B>,
    method: &Method,
    url: &str,
    body: Option<&str>,
    today: NaiveDate,
) -> Result<HttpResponse> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        (&Method::Get, "/api/session") => api::get_session(state),
        (&Method::Post, "/api/login") => api::post_login(state, body.unwrap_or("")),
        (&Method::Post, "/api/logout") => api::post_logout(state),
        (&Method::Get, "/api/dashboard") => api::get_dashboard(state, url, today),
        (&Method::Get, "/api/health") => api::get_health(state),

        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend() -> HttpResponse {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// `{"error": message}` with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8")
        .expect("static header is valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
