//! End-to-end pipeline tests: feed document → series → estimate → snapshot,
//! and the web handlers on top of a file-backed source.
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tiny_http::Method;

use tankwatch::config::TankwatchConfig;
use tankwatch::dashboard::{self, AlertLevel, CycleOutcome, DashboardSettings, Snapshot, Trend};
use tankwatch::estimator::TimingEstimator;
use tankwatch::feed::{CachedSource, FileFeed};
use tankwatch::readings::decode_feed;
use tankwatch::web::WebApp;

fn doc(readings: &[(f64, &str)]) -> String {
    let data: Vec<Value> = readings
        .iter()
        .map(|(level, at)| serde_json::json!({ "level": level, "dateTime": at }))
        .collect();
    serde_json::json!({ "success": true, "data": data }).to_string()
}

fn temp_feed(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "tankwatch-{name}-{}.json",
        std::process::id()
    ));
    fs::write(&path, body).unwrap();
    path
}

fn now(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Estimation from decoded documents
// ---------------------------------------------------------------------------

#[test]
fn rising_document_gives_fill_time() {
    let body = doc(&[
        (20.0, "2024-05-01T10:00:00Z"),
        (50.0, "2024-05-01T10:20:00Z"),
        (80.0, "2024-05-01T10:40:00Z"),
    ]);
    let series = decode_feed(&body).unwrap().unwrap();
    let timing = TimingEstimator::default().estimate(series.as_slice());

    assert_eq!(timing.fill_text(), "40 min");
    assert_eq!(timing.empty_text(), "--");
}

#[test]
fn falling_document_gives_empty_time() {
    let body = doc(&[
        (90.0, "2024-05-01T08:00:00Z"),
        (60.0, "2024-05-01T09:15:00Z"),
        (12.0, "2024-05-01T10:30:00Z"),
    ]);
    let series = decode_feed(&body).unwrap().unwrap();
    let timing = TimingEstimator::default().estimate(series.as_slice());

    assert_eq!(timing.empty_text(), "2h 30min");
    assert_eq!(timing.fill_text(), "--");
}

#[test]
fn mixed_offsets_compare_on_the_same_clock() {
    // 10:00Z and 12:30+02:00 (= 10:30Z) are thirty minutes apart.
    let body = doc(&[
        (10.0, "2024-05-01T10:00:00Z"),
        (95.0, "2024-05-01T12:30:00+02:00"),
    ]);
    let series = decode_feed(&body).unwrap().unwrap();
    let timing = TimingEstimator::default().estimate(series.as_slice());
    assert_eq!(timing.fill_minutes(), Some(30));
}

#[test]
fn single_reading_is_undetermined_but_still_snapshots() {
    let body = doc(&[(42.0, "2024-05-01T10:00:00Z")]);
    let series = decode_feed(&body).unwrap().unwrap();
    let snapshot = Snapshot::build(
        &series,
        now("2024-05-01T10:00:30Z"),
        &DashboardSettings::default(),
    )
    .unwrap();

    assert_eq!(snapshot.alert, AlertLevel::Warning);
    assert_eq!(snapshot.trend, Trend::Unknown);
    assert_eq!(snapshot.timing.fill_text(), "--");
    assert_eq!(snapshot.timing.empty_text(), "--");
    assert_eq!(snapshot.update_text(), "just now");
}

#[test]
fn out_of_order_readings_surface_as_warnings() {
    let body = doc(&[
        (40.0, "2024-05-01T10:20:00Z"),
        (45.0, "2024-05-01T10:10:00Z"),
        (120.0, "2024-05-01T10:30:00Z"),
    ]);
    let series = decode_feed(&body).unwrap().unwrap();
    let snapshot = Snapshot::build(
        &series,
        now("2024-05-01T11:00:00Z"),
        &DashboardSettings::default(),
    )
    .unwrap();

    assert_eq!(snapshot.warnings.len(), 2);
}

// ---------------------------------------------------------------------------
// File-backed pipeline cycle
// ---------------------------------------------------------------------------

#[test]
fn file_source_runs_a_full_cycle() {
    let path = temp_feed(
        "cycle",
        &doc(&[
            (70.0, "2024-05-01T10:00:00Z"),
            (40.0, "2024-05-01T10:30:00Z"),
            (22.0, "2024-05-01T11:00:00Z"),
        ]),
    );

    let mut source = CachedSource::new(FileFeed::new(&path), 300);
    let outcome = dashboard::run_cycle(
        &mut source,
        &DashboardSettings::default(),
        now("2024-05-01T11:05:00Z"),
        false,
    );
    fs::remove_file(&path).unwrap();

    let snapshot = match outcome {
        CycleOutcome::Ready(snapshot) => snapshot,
        other => panic!("expected a snapshot, got {other:?}"),
    };
    assert_eq!(snapshot.alert, AlertLevel::Critical);
    assert_eq!(snapshot.trend, Trend::Draining { delta: 18.0 });
    assert_eq!(snapshot.timing.empty_text(), "1h");
    assert_eq!(snapshot.update_text(), "5 min ago");
}

#[test]
fn missing_file_fails_the_cycle() {
    let mut source = CachedSource::new(FileFeed::new("/definitely/not/here.json"), 300);
    let outcome = dashboard::run_cycle(&mut source, &DashboardSettings::default(), Utc::now(), false);
    assert!(matches!(outcome, CycleOutcome::Failed(_)));
}

// ---------------------------------------------------------------------------
// Web handlers over a file source
// ---------------------------------------------------------------------------

#[test]
fn web_dashboard_serves_file_snapshot_after_login() {
    let path = temp_feed(
        "web",
        &doc(&[
            (20.0, "2024-05-01T10:00:00Z"),
            (80.0, "2024-05-01T10:10:00Z"),
        ]),
    );

    let mut config = TankwatchConfig::default();
    config.logging.enabled = false;
    config
        .auth
        .users
        .insert("operator".to_string(), "pump-house".to_string());
    let mut app = WebApp::new(FileFeed::new(&path), &config);

    let denied = app.handle(&Method::Get, "/api/dashboard", None, None);
    assert_eq!(denied.status, 401);

    let login = app.handle(
        &Method::Post,
        "/api/login",
        None,
        Some(r#"{"username":"operator","password":"pump-house"}"#),
    );
    assert_eq!(login.status, 200);
    let cookie = login.set_cookie.unwrap();
    let cookie = cookie.split(';').next().unwrap();

    let reply = app.handle(&Method::Get, "/api/dashboard", Some(cookie), None);
    fs::remove_file(&path).unwrap();

    assert_eq!(reply.status, 200);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["available"], true);
    assert_eq!(body["snapshot"]["alert"], "ok");
    assert_eq!(body["snapshot"]["timing"]["fill_text"], "10 min");
    assert_eq!(body["snapshot"]["history"][1]["level"], 80.0);
}

#[test]
fn web_dashboard_reports_source_errors_inline() {
    let mut config = TankwatchConfig::default();
    config.logging.enabled = false;
    config.auth.enabled = false;
    let mut app = WebApp::new(FileFeed::new("/definitely/not/here.json"), &config);

    let reply = app.handle(&Method::Get, "/api/dashboard", None, None);
    assert_eq!(reply.status, 200);
    let body: Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(body["available"], false);
    assert!(body["error"].as_str().unwrap().contains("failed to read"));
}
