//! Embedded web dashboard for tankwatch.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard (login form, level gauge, history chart)
//! - JSON API endpoints for the session, the dashboard snapshot and health
//!
//! Launched via `tankwatch serve` (default: `http://127.0.0.1:8501`).

mod api;
mod frontend;

use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::auth::{CredentialTable, SessionStore};
use crate::config::TankwatchConfig;
use crate::dashboard::DashboardSettings;
use crate::feed::{CachedSource, HttpFeed, ReadingSource};
use crate::logging::log_event;

pub use api::ApiReply;

/// Largest request body accepted (login form JSON).
const MAX_BODY_BYTES: u64 = 16 * 1024;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Server-side state shared by all requests.
///
/// Requests are handled one at a time, so plain `&mut self` access is
/// enough.
pub struct WebApp<S> {
    source: CachedSource<S>,
    settings: DashboardSettings,
    credentials: CredentialTable,
    sessions: SessionStore,
    auth_enabled: bool,
    session_ttl_secs: u64,
    refresh_secs: u64,
    log: bool,
}

impl<S: ReadingSource> WebApp<S> {
    pub fn new(source: S, config: &TankwatchConfig) -> Self {
        Self {
            source: CachedSource::new(source, config.feed.cache_ttl_secs),
            settings: DashboardSettings::from_config(config),
            credentials: CredentialTable::new(config.auth.users.clone()),
            sessions: SessionStore::new(config.auth.session_ttl_secs),
            auth_enabled: config.auth.enabled,
            session_ttl_secs: config.auth.session_ttl_secs,
            refresh_secs: config.dashboard.refresh_secs,
            log: config.logging.enabled,
        }
    }

    /// Route a request and always produce a reply; handler errors become
    /// a JSON 500.
    pub fn handle(
        &mut self,
        method: &Method,
        url: &str,
        cookie: Option<&str>,
        body: Option<&str>,
    ) -> ApiReply {
        match self.dispatch(method, url, cookie, body) {
            Ok(reply) => reply,
            Err(e) => ApiReply::error(500, &format!("{e:#}")),
        }
    }

    fn dispatch(
        &mut self,
        method: &Method,
        url: &str,
        cookie: Option<&str>,
        body: Option<&str>,
    ) -> Result<ApiReply> {
        // Strip query string for path matching
        let path = url.split('?').next().unwrap_or(url);

        match (method, path) {
            (&Method::Get, "/") | (&Method::Get, "/index.html") => {
                Ok(ApiReply::html(frontend::INDEX_HTML))
            }

            (&Method::Post, "/api/login") => self.post_login(body.unwrap_or("{}")),
            (&Method::Post, "/api/logout") => Ok(self.post_logout(cookie)),
            (&Method::Get, "/api/session") => self.get_session(cookie),
            (&Method::Get, "/api/dashboard") => self.get_dashboard(url, cookie),
            (&Method::Get, "/api/health") => self.get_health(),

            _ => Ok(ApiReply::error(404, "not found")),
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server for the configured HTTP feed.
///
/// Blocks the current thread. Handles requests sequentially.
pub fn serve(config: &TankwatchConfig, addr: &str) -> Result<()> {
    if config.auth.enabled && config.auth.users.is_empty() {
        anyhow::bail!(
            "login is enabled but no users are configured. Add one with \
             `tankwatch config set auth.users.<name> <password>` or set auth.enabled = false."
        );
    }

    let feed = HttpFeed::from_config(&config.feed)?;
    let mut app = WebApp::new(feed, config);

    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("tankwatch dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");
    if config.logging.enabled {
        log_event(&format!("dashboard listening on {addr}"));
    }

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let cookie = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Cookie"))
            .map(|h| h.value.as_str().to_string());

        let reply = match read_body(&method, request.as_reader()) {
            Ok(body) => app.handle(&method, &url, cookie.as_deref(), body.as_deref()),
            Err(e) => ApiReply::error(400, &format!("{e:#}")),
        };
        let status = reply.status;

        match into_response(reply) {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let _ = request.respond(into_fallback(&e));
            }
        }

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

/// Read the body up-front for methods that carry one, capped at
/// `MAX_BODY_BYTES`.
fn read_body(method: &Method, reader: &mut dyn Read) -> Result<Option<String>> {
    if !matches!(method, Method::Put | Method::Post | Method::Patch) {
        return Ok(None);
    }
    let mut buf = String::new();
    reader
        .take(MAX_BODY_BYTES)
        .read_to_string(&mut buf)
        .context("unreadable request body")?;
    Ok(Some(buf))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn into_response(reply: ApiReply) -> Result<Response<Cursor<Vec<u8>>>> {
    let mut resp = Response::from_data(reply.body.into_bytes())
        .with_header(content_type(reply.content_type)?)
        .with_status_code(StatusCode(reply.status));

    if let Some(cookie) = reply.set_cookie {
        let header = Header::from_bytes("Set-Cookie", cookie.as_bytes())
            .map_err(|()| anyhow::anyhow!("invalid Set-Cookie header"))
            .context("failed to build session cookie")?;
        resp = resp.with_header(header);
    }

    Ok(resp)
}

fn into_fallback(error: &anyhow::Error) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": error.to_string() }).to_string();
    Response::from_data(body.into_bytes()).with_status_code(StatusCode(500))
}

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value)
        .map_err(|()| anyhow::anyhow!("invalid Content-Type header: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_body_skips_methods_without_body() {
        let mut reader = Cursor::new(b"ignored".to_vec());
        assert_eq!(read_body(&Method::Get, &mut reader).unwrap(), None);
    }

    #[test]
    fn read_body_returns_post_payload() {
        let mut reader = Cursor::new(br#"{"username":"a"}"#.to_vec());
        let body = read_body(&Method::Post, &mut reader).unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"username":"a"}"#));
    }

    #[test]
    fn read_body_caps_payload_size() {
        let mut reader = Cursor::new(vec![b'x'; MAX_BODY_BYTES as usize + 100]);
        let body = read_body(&Method::Post, &mut reader).unwrap().unwrap();
        assert_eq!(body.len() as u64, MAX_BODY_BYTES);
    }

    #[test]
    fn invalid_utf8_body_is_an_error() {
        let mut reader = Cursor::new(vec![b'{', 0xff, 0xfe, b'}']);
        let err = read_body(&Method::Post, &mut reader).unwrap_err();
        assert!(err.to_string().contains("unreadable request body"));

        let reply = ApiReply::error(400, &format!("{err:#}"));
        assert_eq!(reply.status, 400);
    }
}
