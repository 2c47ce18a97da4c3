//! HTTP client tests against a local stand-in for Prometheus

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use prometheus_mcp::Error;
use prometheus_mcp::backend::{
    HttpPrometheusClient, InstantQuery, PrometheusApi, QueryOptions, Range, RangeQuery,
    SeriesQuery,
};
use prometheus_mcp::promtime::parse_timestamp;

/// Path and decoded query pairs of one request
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    params: Vec<(String, String)>,
}

impl Seen {
    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Serve every request with `status` and `body`, recording what arrived
async fn stub(status: StatusCode, body: Value) -> (SocketAddr, Arc<Mutex<Vec<Seen>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let app = Router::new().fallback(move |uri: Uri| {
        let recorder = Arc::clone(&recorder);
        let body = body.clone();
        async move {
            let params = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
                .into_owned()
                .collect();
            recorder.lock().unwrap().push(Seen {
                path: uri.path().to_string(),
                params,
            });
            (status, Json(body)).into_response()
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn success(data: Value) -> Value {
    json!({"status": "success", "data": data})
}

fn client(addr: SocketAddr) -> HttpPrometheusClient {
    HttpPrometheusClient::new(&format!("http://{addr}/")).unwrap()
}

#[tokio::test]
async fn query_sends_expression_time_and_options() {
    let (addr, seen) = stub(StatusCode::OK, success(json!({"resultType": "vector", "result": []}))).await;

    let response = client(addr)
        .query(InstantQuery {
            query: "up".to_string(),
            time: Some(parse_timestamp("2024-01-01T00:00:00Z").unwrap()),
            options: QueryOptions {
                timeout: Some(Duration::from_secs(90)),
                limit: Some(5),
            },
        })
        .await
        .unwrap();

    assert_eq!(response.data["resultType"], "vector");
    let seen = seen.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "/api/v1/query");
    assert_eq!(seen.param("query"), Some("up"));
    assert_eq!(seen.param("time"), Some("2024-01-01T00:00:00Z"));
    assert_eq!(seen.param("timeout"), Some("1m30s"));
    assert_eq!(seen.param("limit"), Some("5"));
}

#[tokio::test]
async fn query_without_time_leaves_it_to_prometheus() {
    let (addr, seen) = stub(StatusCode::OK, success(json!({}))).await;

    client(addr)
        .query(InstantQuery {
            query: "up".to_string(),
            time: None,
            options: QueryOptions::default(),
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap()[0].clone();
    assert_eq!(seen.param("time"), None);
    assert_eq!(seen.param("timeout"), None);
    assert_eq!(seen.param("limit"), None);
}

#[tokio::test]
async fn query_range_sends_window() {
    let (addr, seen) = stub(StatusCode::OK, success(json!({}))).await;

    client(addr)
        .query_range(RangeQuery {
            query: "up".to_string(),
            range: Range {
                start: parse_timestamp("2024-01-01T00:00:00Z").unwrap(),
                end: parse_timestamp("2024-01-01T06:00:00+02:00").unwrap(),
                step: Duration::from_secs(300),
            },
            options: QueryOptions::default(),
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "/api/v1/query_range");
    assert_eq!(seen.param("start"), Some("2024-01-01T00:00:00Z"));
    assert_eq!(seen.param("end"), Some("2024-01-01T06:00:00+02:00"));
    assert_eq!(seen.param("step"), Some("5m"));
}

#[tokio::test]
async fn series_repeats_match_parameter() {
    let (addr, seen) = stub(StatusCode::OK, success(json!([]))).await;

    client(addr)
        .series(SeriesQuery {
            matchers: vec!["up".to_string(), "process_start_time_seconds{job=\"prometheus\"}".to_string()],
            start: parse_timestamp("2024-01-01T00:00:00Z").unwrap(),
            end: parse_timestamp("2024-01-01T01:00:00Z").unwrap(),
            options: QueryOptions {
                timeout: None,
                limit: Some(100),
            },
        })
        .await
        .unwrap();

    let seen = seen.lock().unwrap()[0].clone();
    assert_eq!(seen.path, "/api/v1/series");
    let matchers: Vec<&str> = seen
        .params
        .iter()
        .filter(|(k, _)| k == "match[]")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(
        matchers,
        vec!["up", "process_start_time_seconds{job=\"prometheus\"}"]
    );
    assert_eq!(seen.param("limit"), Some("100"));
}

#[tokio::test]
async fn parameterless_endpoints() {
    let (addr, seen) = stub(StatusCode::OK, success(json!({}))).await;
    let client = client(addr);

    client.alert_managers().await.unwrap();
    client.alerts().await.unwrap();
    client.label_values("__name__").await.unwrap();
    client.rules().await.unwrap();
    client.tsdb().await.unwrap();
    client.targets().await.unwrap();

    let paths: Vec<String> = seen.lock().unwrap().iter().map(|s| s.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/v1/alertmanagers",
            "/api/v1/alerts",
            "/api/v1/label/__name__/values",
            "/api/v1/rules",
            "/api/v1/status/tsdb",
            "/api/v1/targets",
        ]
    );
}

#[tokio::test]
async fn warnings_are_kept() {
    let (addr, _) = stub(
        StatusCode::OK,
        json!({"status": "success", "data": [], "warnings": ["partial response"]}),
    )
    .await;

    let response = client(addr).alerts().await.unwrap();

    assert_eq!(response.warnings, vec!["partial response".to_string()]);
}

#[tokio::test]
async fn error_envelope_becomes_backend_error() {
    let (addr, _) = stub(
        StatusCode::BAD_REQUEST,
        json!({"status": "error", "errorType": "bad_data", "error": "parse error at char 4"}),
    )
    .await;

    let err = client(addr)
        .query(InstantQuery {
            query: "up{".to_string(),
            time: None,
            options: QueryOptions::default(),
        })
        .await
        .unwrap_err();

    match err {
        Error::Backend { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad_data: parse error at char 4");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).targets().await.unwrap_err();

    assert!(matches!(err, Error::Http(_)), "unexpected error: {err}");
}

#[test]
fn rejects_invalid_base_urls() {
    assert!(matches!(
        HttpPrometheusClient::new("not a url"),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        HttpPrometheusClient::new("ftp://prometheus:9090"),
        Err(Error::Config(_))
    ));
    assert_eq!(
        HttpPrometheusClient::new("http://prometheus:9090/")
            .unwrap()
            .base_url(),
        "http://prometheus:9090"
    );
}
