//! Integration tests for the directory API.
//!
//! These drive the full router against the in-memory store. Tests marked
//! `#[ignore]` need a MySQL server configured through the `DB_*` variables.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

use patient_directory::api::{create_router, AppState};
use patient_directory::config::{Config, DatabaseSettings, SearchMode};
use patient_directory::server::{serve, spawn_connectivity_check, STARTUP_CHECK_TIMEOUT};
use patient_directory::store::{
    BirthDate, DirectoryStore, MemoryStore, MySqlStore, Patient, ProviderEntry, QueryKind, RowId,
};

const WELCOME: &str = "Welcome to the API! Use /patients or /providers to access data.";

fn patient(id: i64, first: Option<&str>, last: &str, dob: (i32, u32, u32)) -> Patient {
    Patient {
        patient_id: RowId::from(id),
        first_name: first.map(str::to_string),
        last_name: Some(last.to_string()),
        date_of_birth: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).map(BirthDate),
    }
}

/// A small clinic: one patient without a first name, one provider without
/// a specialty.
fn clinic() -> MemoryStore {
    clinic_builder().build()
}

fn clinic_builder() -> patient_directory::store::MemoryStoreBuilder {
    MemoryStore::builder()
        .patient(patient(1, Some("Maria"), "Lopez", (1985, 3, 14)))
        .patient(patient(2, Some("James"), "Okafor", (1972, 11, 2)))
        .patient(patient(3, None, "Unknown", (2001, 6, 30)))
        .provider(ProviderEntry::new(10, "Priya", "Shah", "Cardiology"))
        .provider(ProviderEntry::new(11, "Tom", "Berg", "Pediatrics"))
        .provider(ProviderEntry {
            provider_speciality: None,
            ..ProviderEntry::new(12, "Lee", "Park", "")
        })
}

fn app(store: MemoryStore, mode: SearchMode) -> Router {
    create_router(AppState::new(Arc::new(store), mode))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    let value = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("{uri} returned non-JSON body: {e}"));
    (status, value)
}

fn keys(row: &Value) -> Vec<String> {
    let mut keys: Vec<String> = row.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn root_returns_exact_welcome_text() {
    let app = app(clinic(), SearchMode::Passthrough);
    let (status, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), WELCOME);
}

#[tokio::test]
async fn patients_have_exactly_four_fields() {
    let app = app(clinic(), SearchMode::Passthrough);
    let (status, body) = get_json(&app, "/patients").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successful");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for row in data {
        assert_eq!(
            keys(row),
            vec!["date_of_birth", "first_name", "last_name", "patient_id"]
        );
    }
    assert_eq!(
        data[0],
        json!({
            "patient_id": 1,
            "first_name": "Maria",
            "last_name": "Lopez",
            "date_of_birth": "1985-03-14",
        })
    );
}

#[tokio::test]
async fn providers_have_exactly_three_fields() {
    let app = app(clinic(), SearchMode::Passthrough);
    let (status, body) = get_json(&app, "/providers").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    for row in data {
        assert_eq!(
            keys(row),
            vec!["first_name", "last_name", "provider_speciality"]
        );
    }
}

#[tokio::test]
async fn empty_tables_list_as_empty_arrays() {
    let app = app(MemoryStore::new(), SearchMode::Passthrough);

    for uri in ["/patients", "/providers", "/patients/search"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!({ "message": "Successful", "data": [] }), "{uri}");
    }
}

#[tokio::test]
async fn patient_search_parameter_has_no_effect_in_passthrough() {
    let app = app(clinic(), SearchMode::Passthrough);
    let (_, baseline) = get_json(&app, "/patients/search").await;

    assert_eq!(
        baseline["data"],
        json!([
            { "patient_id": 1, "first_name": "Maria" },
            { "patient_id": 2, "first_name": "James" },
        ])
    );

    for uri in [
        "/patients/search?first_name=Maria",
        "/patients/search?first_name=Nobody",
        "/patients/search?first_name=",
        "/patients/search?unrelated=1",
    ] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, baseline, "{uri}");
    }
}

#[tokio::test]
async fn provider_search_returns_non_null_specialties() {
    let app = app(clinic(), SearchMode::Passthrough);
    let (status, body) = get_json(&app, "/providers/search?specialty=Dermatology").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Successful",
            "data": [
                { "provider_id": 10, "provider_speciality": "Cardiology" },
                { "provider_id": 11, "provider_speciality": "Pediatrics" },
            ],
        })
    );
}

#[tokio::test]
async fn provider_search_is_404_only_when_no_specialties_exist() {
    let store = MemoryStore::builder()
        .provider(ProviderEntry {
            provider_speciality: None,
            ..ProviderEntry::new(1, "Lee", "Park", "")
        })
        .build();
    let app = app(store, SearchMode::Passthrough);

    let (status, body) = get_json(&app, "/providers/search?specialty=Cardiology").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "message": "No providers found for this specialty." })
    );

    // The listing still has the provider.
    let (status, body) = get_json(&app, "/providers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn filter_mode_narrows_searches() {
    let app = app(clinic(), SearchMode::Filter);

    let (status, body) = get_json(&app, "/patients/search?first_name=James").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{ "patient_id": 2, "first_name": "James" }]));

    let (status, body) = get_json(&app, "/patients/search?first_name=Nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = get_json(&app, "/providers/search?specialty=Pediatrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([{ "provider_id": 11, "provider_speciality": "Pediatrics" }])
    );

    let (status, _) = get_json(&app, "/providers/search?specialty=Dermatology").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Without a parameter the unfiltered search runs.
    let (_, body) = get_json(&app, "/providers/search").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn database_failure_is_opaque_500_and_recoverable() {
    let store = clinic();
    let app = app(store.clone(), SearchMode::Passthrough);

    let endpoints = [
        (QueryKind::ListPatients, "/patients"),
        (QueryKind::ListProviders, "/providers"),
        (QueryKind::SearchPatients, "/patients/search?first_name=Maria"),
        (QueryKind::SearchProviders, "/providers/search?specialty=Cardiology"),
    ];

    for (kind, uri) in endpoints {
        store.fail(kind);
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(String::from_utf8(body).unwrap(), "Server error", "{uri}");

        store.recover(kind);
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    // Root never touches the store.
    store.fail(QueryKind::Ping);
    let (status, _) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn requests_beyond_connection_limit_queue_and_complete() {
    let store = clinic_builder()
        .max_connections(2)
        .latency(Duration::from_millis(25))
        .build();
    let app = app(store.clone(), SearchMode::Passthrough);

    let requests = (0..12).map(|i| {
        let app = app.clone();
        let uri = if i % 2 == 0 { "/patients" } else { "/providers" };
        async move { get(&app, uri).await.0 }
    });
    let statuses = futures::future::join_all(requests).await;

    assert!(statuses.iter().all(|s| *s == StatusCode::OK));
    assert_eq!(store.completed(), 12);
    assert_eq!(store.peak_in_flight(), 2);
}

/// Plain HTTP/1.1 GET over a fresh connection; returns the raw response.
async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_over_tcp_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(Arc::new(clinic()), SearchMode::Passthrough);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async {
        stop_rx.await.ok();
    }));

    let response = http_get(addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with(WELCOME));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

/// Start the check and the server the way `main` does, then hit `/` and
/// `/patients` over TCP.
async fn serve_with_startup_check(store: Arc<dyn DirectoryStore>) -> (String, String, bool) {
    let startup_check = spawn_connectivity_check(store.clone(), Duration::from_millis(300));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(store, SearchMode::Passthrough);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state, async {
        stop_rx.await.ok();
    }));

    let root = tokio::time::timeout(Duration::from_secs(5), http_get(addr, "/"))
        .await
        .expect("root did not answer while the database was unreachable");
    let patients = tokio::time::timeout(Duration::from_secs(5), http_get(addr, "/patients"))
        .await
        .expect("/patients did not answer while the database was unreachable");
    let connected = startup_check.await.unwrap();

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
    (root, patients, connected)
}

#[tokio::test]
async fn silent_database_does_not_delay_listening() {
    let store = clinic_builder()
        .stalling(QueryKind::Ping)
        .failing(QueryKind::ListPatients)
        .build();

    let (root, patients, connected) = serve_with_startup_check(Arc::new(store)).await;

    assert!(root.starts_with("HTTP/1.1 200 OK"));
    assert!(root.ends_with(WELCOME));
    assert!(patients.starts_with("HTTP/1.1 500"));
    assert!(patients.ends_with("Server error"));
    assert!(!connected);
}

#[tokio::test]
async fn refused_database_still_serves_root_and_fails_queries() {
    let store = MySqlStore::connect(&DatabaseSettings {
        host: "127.0.0.1".to_string(),
        port: 1,
        username: "nobody".to_string(),
        password: String::new(),
        database: "missing".to_string(),
        max_connections: 2,
        acquire_timeout: Some(Duration::from_millis(300)),
    });

    let (root, patients, connected) = serve_with_startup_check(Arc::new(store)).await;

    assert!(root.starts_with("HTTP/1.1 200 OK"));
    assert!(patients.starts_with("HTTP/1.1 500"));
    assert!(patients.ends_with("Server error"));
    assert!(!connected);
}

#[test]
fn startup_check_limit_is_shorter_than_default_acquire_timeout() {
    assert!(STARTUP_CHECK_TIMEOUT < patient_directory::store::DEFAULT_ACQUIRE_TIMEOUT);
}

#[tokio::test]
#[ignore = "requires database"]
async fn live_database_endpoints() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(_) => {
            println!("Skipping: DB_* not configured");
            return;
        }
    };

    let store = Arc::new(MySqlStore::connect(&config.database()));
    let app = create_router(AppState::new(store, SearchMode::Passthrough));

    for uri in ["/patients", "/providers", "/patients/search"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["message"], "Successful");
    }

    let (status, _) = get(&app, "/providers/search").await;
    assert!(status == StatusCode::OK || status == StatusCode::NOT_FOUND);
}
