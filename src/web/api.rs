//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns an [`ApiReply`]
//! that the server loop turns into a `tiny_http` response.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::session::{self, clear_cookie, set_cookie};
use crate::dashboard::{self, CycleOutcome, SnapshotView};
use crate::feed::ReadingSource;
use crate::logging::log_event;

use super::WebApp;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// Username reported when the login gate is switched off.
const ANONYMOUS_USER: &str = "local";

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Transport-independent HTTP reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub set_cookie: Option<String>,
}

impl ApiReply {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body: body.to_string(),
            set_cookie: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body: serde_json::json!({ "error": message }).to_string(),
            set_cookie: None,
        }
    }

    fn with_cookie(mut self, cookie: String) -> Self {
        self.set_cookie = Some(cookie);
        self
    }
}

/// Build a JSON reply.
fn json_response<T: Serialize>(status: u16, data: &T) -> Result<ApiReply> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(ApiReply {
        status,
        content_type: CONTENT_TYPE_JSON,
        body,
        set_cookie: None,
    })
}

/// True when the query string carries `refresh=1` (or `refresh=true`).
fn wants_refresh(url: &str) -> bool {
    url.split('?')
        .nth(1)
        .map(|query| {
            query.split('&').any(|pair| {
                matches!(pair.split_once('='), Some(("refresh", "1" | "true")))
            })
        })
        .unwrap_or(false)
}

/// Host part of a feed URL; the full URL may carry a deployment key.
fn feed_host(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("://")?;
    rest.split(['/', '?'])
        .next()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// JSON request/response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    authenticated: bool,
    username: Option<String>,
    auth_enabled: bool,
    refresh_secs: u64,
}

/// Dashboard API response. `snapshot` is absent when no data is available.
#[derive(Serialize)]
struct DashboardResponse {
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<SnapshotView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    refresh_secs: u64,
}

/// Health API response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    feed_host: Option<String>,
    cache_age_secs: Option<u64>,
    auth_enabled: bool,
    users: usize,
    active_sessions: usize,
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

impl<S: ReadingSource> WebApp<S> {
    /// Logged-in username for a request, if any.
    fn authorize(&self, cookie: Option<&str>) -> Option<String> {
        if !self.auth_enabled {
            return Some(ANONYMOUS_USER.to_string());
        }
        let token = cookie.and_then(session::token_from_cookie)?;
        self.sessions.validate(token).map(str::to_string)
    }

    /// `POST /api/login`: check credentials and open a session.
    ///
    /// Expects JSON body: `{ "username": "admin", "password": "..." }`
    pub(super) fn post_login(&mut self, body: &str) -> Result<ApiReply> {
        if !self.auth_enabled {
            return json_response(
                200,
                &serde_json::json!({ "authenticated": true, "username": ANONYMOUS_USER }),
            );
        }

        let Ok(req) = serde_json::from_str::<LoginRequest>(body) else {
            return Ok(ApiReply::error(400, "expected {\"username\", \"password\"}"));
        };

        if !self.credentials.verify(&req.username, &req.password) {
            if self.log {
                log_event(&format!("login failed for user '{}'", req.username));
            }
            return Ok(ApiReply::error(401, "invalid username or password"));
        }

        let token = self.sessions.create(&req.username);
        if self.log {
            log_event(&format!("login succeeded for user '{}'", req.username));
        }

        let reply = json_response(
            200,
            &serde_json::json!({ "authenticated": true, "username": req.username }),
        )?;
        Ok(reply.with_cookie(set_cookie(&token, self.session_ttl_secs)))
    }

    /// `POST /api/logout`: drop the session and clear the cookie.
    pub(super) fn post_logout(&mut self, cookie: Option<&str>) -> ApiReply {
        if let Some(token) = cookie.and_then(session::token_from_cookie) {
            self.sessions.revoke(token);
        }
        ApiReply {
            status: 200,
            content_type: CONTENT_TYPE_JSON,
            body: r#"{"authenticated":false}"#.to_string(),
            set_cookie: Some(clear_cookie()),
        }
    }

    /// `GET /api/session`: who is logged in and how often to refresh.
    pub(super) fn get_session(&self, cookie: Option<&str>) -> Result<ApiReply> {
        let username = self.authorize(cookie);
        let resp = SessionResponse {
            authenticated: username.is_some(),
            username,
            auth_enabled: self.auth_enabled,
            refresh_secs: self.refresh_secs,
        };
        json_response(200, &resp)
    }

    /// `GET /api/dashboard[?refresh=1]`: run one pipeline cycle.
    pub(super) fn get_dashboard(&mut self, url: &str, cookie: Option<&str>) -> Result<ApiReply> {
        if self.authorize(cookie).is_none() {
            return Ok(ApiReply::error(401, "login required"));
        }

        if wants_refresh(url) {
            self.source.invalidate();
        }

        let outcome = dashboard::run_cycle(&mut self.source, &self.settings, Utc::now(), self.log);
        let resp = match outcome {
            CycleOutcome::Ready(snapshot) => DashboardResponse {
                available: true,
                snapshot: Some(snapshot.view()),
                error: None,
                refresh_secs: self.refresh_secs,
            },
            CycleOutcome::NoData => DashboardResponse {
                available: false,
                snapshot: None,
                error: None,
                refresh_secs: self.refresh_secs,
            },
            CycleOutcome::Failed(message) => {
                if self.log {
                    log_event(&format!("dashboard refresh failed: {message}"));
                }
                DashboardResponse {
                    available: false,
                    snapshot: None,
                    error: Some(message),
                    refresh_secs: self.refresh_secs,
                }
            }
        };

        json_response(200, &resp)
    }

    /// `GET /api/health`: server health summary.
    pub(super) fn get_health(&self) -> Result<ApiReply> {
        let resp = HealthResponse {
            status: "ok",
            feed_host: feed_host(&self.source.source().describe()),
            cache_age_secs: self.source.age().map(|age| age.as_secs()),
            auth_enabled: self.auth_enabled,
            users: self.credentials.len(),
            active_sessions: self.sessions.len(),
        };
        json_response(200, &resp)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use chrono::Duration;
    use serde_json::Value;
    use tiny_http::Method;

    use super::*;
    use crate::config::TankwatchConfig;
    use crate::readings::{Reading, ReadingSeries, parse_timestamp};

    struct StubSource {
        series: Option<ReadingSeries>,
        fetches: Rc<Cell<usize>>,
    }

    impl ReadingSource for StubSource {
        fn describe(&self) -> String {
            "stub".to_string()
        }

        fn fetch(&self) -> anyhow::Result<Option<ReadingSeries>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.series.clone())
        }
    }

    fn series(levels: &[f64]) -> ReadingSeries {
        let start = parse_timestamp("2024-05-01T12:00:00Z").unwrap();
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| Reading::new(level, start + Duration::minutes(10 * i as i64)))
            .collect()
    }

    fn config(auth: bool) -> TankwatchConfig {
        let mut config = TankwatchConfig::default();
        config.auth.enabled = auth;
        config.auth.users.insert("admin".to_string(), "s3cret".to_string());
        config.logging.enabled = false;
        config
    }

    fn app(series: Option<ReadingSeries>, auth: bool) -> (WebApp<StubSource>, Rc<Cell<usize>>) {
        let fetches = Rc::new(Cell::new(0));
        let source = StubSource {
            series,
            fetches: Rc::clone(&fetches),
        };
        (WebApp::new(source, &config(auth)), fetches)
    }

    fn json(reply: &ApiReply) -> Value {
        serde_json::from_str(&reply.body).unwrap()
    }

    fn login(app: &mut WebApp<StubSource>) -> String {
        let reply = app.handle(
            &Method::Post,
            "/api/login",
            None,
            Some(r#"{"username":"admin","password":"s3cret"}"#),
        );
        assert_eq!(reply.status, 200);
        let cookie = reply.set_cookie.expect("login sets a cookie");
        cookie.split(';').next().unwrap().to_string()
    }

    #[test]
    fn wants_refresh_reads_query() {
        assert!(wants_refresh("/api/dashboard?refresh=1"));
        assert!(wants_refresh("/api/dashboard?x=2&refresh=true"));
        assert!(!wants_refresh("/api/dashboard"));
        assert!(!wants_refresh("/api/dashboard?refresh=0"));
    }

    #[test]
    fn feed_host_hides_path() {
        assert_eq!(
            feed_host("https://script.example.com/macros/s/KEY/exec?x=1").as_deref(),
            Some("script.example.com")
        );
        assert_eq!(feed_host("http://127.0.0.1:8080").as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(feed_host("/tmp/feed.json"), None);
    }

    #[test]
    fn index_page_is_public() {
        let (mut app, _) = app(None, true);
        let reply = app.handle(&Method::Get, "/", None, None);
        assert_eq!(reply.status, 200);
        assert!(reply.content_type.starts_with("text/html"));
        assert!(reply.body.contains("<title>tankwatch"));
    }

    #[test]
    fn unknown_route_is_404() {
        let (mut app, _) = app(None, true);
        let reply = app.handle(&Method::Get, "/api/nope", None, None);
        assert_eq!(reply.status, 404);
        assert_eq!(json(&reply)["error"], "not found");
    }

    #[test]
    fn dashboard_requires_login() {
        let (mut app, fetches) = app(Some(series(&[20.0, 80.0])), true);
        let reply = app.handle(&Method::Get, "/api/dashboard", None, None);
        assert_eq!(reply.status, 401);
        assert_eq!(fetches.get(), 0);

        let reply = app.handle(
            &Method::Get,
            "/api/dashboard",
            Some("tankwatch_session=forged"),
            None,
        );
        assert_eq!(reply.status, 401);
    }

    #[test]
    fn bad_credentials_are_rejected() {
        let (mut app, _) = app(None, true);
        let reply = app.handle(
            &Method::Post,
            "/api/login",
            None,
            Some(r#"{"username":"admin","password":"nope"}"#),
        );
        assert_eq!(reply.status, 401);
        assert!(reply.set_cookie.is_none());

        let reply = app.handle(&Method::Post, "/api/login", None, Some("not json"));
        assert_eq!(reply.status, 400);
    }

    #[test]
    fn login_then_dashboard_then_logout() {
        let (mut app, fetches) = app(Some(series(&[20.0, 80.0])), true);
        let cookie = login(&mut app);

        let session = json(&app.handle(&Method::Get, "/api/session", Some(&cookie), None));
        assert_eq!(session["authenticated"], true);
        assert_eq!(session["username"], "admin");
        assert_eq!(session["refresh_secs"], 300);

        let reply = app.handle(&Method::Get, "/api/dashboard", Some(&cookie), None);
        assert_eq!(reply.status, 200);
        let body = json(&reply);
        assert_eq!(body["available"], true);
        assert_eq!(body["snapshot"]["current_level"], 80.0);
        assert_eq!(body["snapshot"]["timing"]["fill_text"], "10 min");

        // Served from cache, then forced refresh.
        app.handle(&Method::Get, "/api/dashboard", Some(&cookie), None);
        assert_eq!(fetches.get(), 1);
        app.handle(&Method::Get, "/api/dashboard?refresh=1", Some(&cookie), None);
        assert_eq!(fetches.get(), 2);

        let reply = app.handle(&Method::Post, "/api/logout", Some(&cookie), None);
        assert!(reply.set_cookie.unwrap().contains("Max-Age=0"));
        let reply = app.handle(&Method::Get, "/api/dashboard", Some(&cookie), None);
        assert_eq!(reply.status, 401);
    }

    #[test]
    fn dashboard_without_data_is_unavailable() {
        let (mut app, _) = app(None, false);
        let body = json(&app.handle(&Method::Get, "/api/dashboard", None, None));
        assert_eq!(body["available"], false);
        assert!(body.get("snapshot").is_none());
        assert!(body.get("error").is_none());
    }

    #[test]
    fn auth_disabled_serves_everyone() {
        let (mut app, _) = app(Some(series(&[50.0])), false);
        let session = json(&app.handle(&Method::Get, "/api/session", None, None));
        assert_eq!(session["authenticated"], true);
        assert_eq!(session["auth_enabled"], false);

        let body = json(&app.handle(&Method::Get, "/api/dashboard", None, None));
        assert_eq!(body["available"], true);
        assert_eq!(body["snapshot"]["timing"]["fill_text"], "--");
    }

    #[test]
    fn health_reports_counts() {
        let (mut app, _) = app(None, true);
        let _cookie = login(&mut app);
        let body = json(&app.handle(&Method::Get, "/api/health", None, None));
        assert_eq!(body["status"], "ok");
        assert_eq!(body["users"], 1);
        assert_eq!(body["active_sessions"], 1);
        assert_eq!(body["cache_age_secs"], Value::Null);
        assert_eq!(body["feed_host"], Value::Null);
    }
}
