//! Tool invocation tests against in-memory fakes

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use common::{Call, FailingEncoder, FakeApi, FakeProbe, Harness, arguments};
use prometheus_mcp::backend::{
    ExemplarQuery, InstantQuery, QueryOptions, Range, RangeQuery, SeriesQuery,
};
use prometheus_mcp::promtime::parse_timestamp;
use prometheus_mcp::tools::{
    ExtractionError, ManagementTools, ParamKind, PrometheusTools, ToolError,
};
use prometheus_mcp::Error;

const START: &str = "2024-01-01T00:00:00Z";
const END: &str = "2024-01-01T01:00:00Z";

fn vector_result() -> Value {
    json!({
        "resultType": "vector",
        "result": [
            {"metric": {"__name__": "up", "job": "prometheus"}, "value": [1_704_067_200, "1"]}
        ]
    })
}

/// A valid value for every parameter name the tools declare
fn valid_value(name: &str, kind: ParamKind) -> Value {
    match (name, kind) {
        ("step", _) => json!("1m"),
        ("timeout", _) => json!("30s"),
        ("start" | "time", _) => json!(START),
        ("end", _) => json!(END),
        (_, ParamKind::Number) => json!(10),
        (_, ParamKind::StringArray) => json!(["up"]),
        (_, ParamKind::String) => json!("up"),
    }
}

#[tokio::test]
async fn query_returns_backend_data_verbatim() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    let text = harness.call("query", json!({"query": "up"})).await.unwrap();

    let decoded: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(decoded, vector_result());
    assert_eq!(
        harness.api.calls(),
        vec![Call::Query(InstantQuery {
            query: "up".to_string(),
            time: None,
            options: QueryOptions::default(),
        })]
    );
    assert_eq!(harness.sink.total("query"), 1);
    assert_eq!(harness.sink.errors("query"), 0);
}

#[tokio::test]
async fn query_forwards_time_and_options() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    harness
        .call(
            "query",
            json!({"query": "up", "time": START, "timeout": "30s", "limit": 10}),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.api.calls(),
        vec![Call::Query(InstantQuery {
            query: "up".to_string(),
            time: Some(parse_timestamp(START).unwrap()),
            options: QueryOptions {
                timeout: Some(Duration::from_secs(30)),
                limit: Some(10),
            },
        })]
    );
}

#[tokio::test]
async fn query_ignores_non_integer_limit() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    harness
        .call("query", json!({"query": "up", "limit": "ten"}))
        .await
        .unwrap();

    let Call::Query(query) = &harness.api.calls()[0] else {
        panic!("expected a query call");
    };
    assert_eq!(query.options.limit, None);
}

#[tokio::test]
async fn query_rejects_malformed_timeout() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    let failure = harness
        .call("query", json!({"query": "up", "timeout": "soon"}))
        .await
        .unwrap_err();

    assert_eq!(failure.message, "unable to extract 'timeout' parameter");
    assert!(harness.api.calls().is_empty());
    assert_eq!(harness.sink.errors("query"), 1);
}

#[tokio::test]
async fn query_range_forwards_window() {
    let harness = Harness::new(
        FakeApi::returning(json!({"resultType": "matrix", "result": []})),
        FakeProbe::up(),
    );

    harness
        .call(
            "query_range",
            json!({"query": "rate(x[5m])", "start": START, "end": END, "step": "1m"}),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.api.calls(),
        vec![Call::QueryRange(RangeQuery {
            query: "rate(x[5m])".to_string(),
            range: Range {
                start: parse_timestamp(START).unwrap(),
                end: parse_timestamp(END).unwrap(),
                step: Duration::from_secs(60),
            },
            options: QueryOptions::default(),
        })]
    );
}

#[tokio::test]
async fn series_passes_matchers() {
    let harness = Harness::new(
        FakeApi::returning(json!([{"__name__": "up", "job": "prometheus"}])),
        FakeProbe::up(),
    );

    harness
        .call(
            "series",
            json!({"match[]": ["up"], "start": START, "end": END}),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.api.calls(),
        vec![Call::Series(SeriesQuery {
            matchers: vec!["up".to_string()],
            start: parse_timestamp(START).unwrap(),
            end: parse_timestamp(END).unwrap(),
            options: QueryOptions::default(),
        })]
    );
}

#[tokio::test]
async fn series_rejects_non_string_matchers() {
    let harness = Harness::new(FakeApi::returning(json!([])), FakeProbe::up());

    let failure = harness
        .call(
            "series",
            json!({"match[]": ["up", 3], "start": START, "end": END}),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.message, "unable to extract 'match[]' parameter");
    assert!(matches!(
        failure.cause,
        ToolError::Extraction(ExtractionError::InvalidElement { index: 1, .. })
    ));
}

#[tokio::test]
async fn exemplars_and_metrics_reach_the_backend() {
    let harness = Harness::new(FakeApi::returning(json!([])), FakeProbe::up());

    harness
        .call(
            "exemplars",
            json!({"query": "http_requests_total", "start": START, "end": END}),
        )
        .await
        .unwrap();
    harness.call("metrics", json!({})).await.unwrap();

    assert_eq!(
        harness.api.calls(),
        vec![
            Call::Exemplars(ExemplarQuery {
                query: "http_requests_total".to_string(),
                start: parse_timestamp(START).unwrap(),
                end: parse_timestamp(END).unwrap(),
            }),
            Call::LabelValues("__name__".to_string()),
        ]
    );
}

#[tokio::test]
async fn parameterless_tools_map_to_their_endpoints() {
    let harness = Harness::new(FakeApi::returning(json!({})), FakeProbe::up());

    for tool in ["alertmanagers", "alerts", "rules", "status_tsdb", "targets"] {
        harness.call(tool, json!({})).await.unwrap();
    }

    assert_eq!(
        harness.api.calls(),
        vec![
            Call::AlertManagers,
            Call::Alerts,
            Call::Rules,
            Call::Tsdb,
            Call::Targets,
        ]
    );
}

#[tokio::test]
async fn missing_query_fails_without_backend_call() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    let failure = harness.call("query", json!({})).await.unwrap_err();

    assert_eq!(failure.message, "unable to extract 'query' parameter");
    assert!(matches!(
        failure.cause,
        ToolError::Extraction(ExtractionError::Missing { field: "query" })
    ));
    assert!(harness.api.calls().is_empty());
    assert_eq!(harness.sink.total("query"), 1);
    assert_eq!(harness.sink.errors("query"), 1);
}

#[tokio::test]
async fn backend_failure_is_summarized() {
    let harness = Harness::new(
        FakeApi::failing(400, "bad_data: parse error"),
        FakeProbe::up(),
    );

    let failure = harness.call("query", json!({"query": "up{"})).await.unwrap_err();

    assert_eq!(failure.message, "unable to retrieve query");
    assert!(!failure.message.contains("bad_data"));
    assert!(matches!(
        failure.cause,
        ToolError::Backend(Error::Backend { status: 400, .. })
    ));
    assert_eq!(harness.sink.errors("query"), 1);
}

#[tokio::test]
async fn ping_reports_ok_when_ready() {
    let harness = Harness::new(FakeApi::default(), FakeProbe::up());

    assert_eq!(harness.call("ping", json!({})).await.unwrap(), "OK");
    assert_eq!(harness.sink.total("ping"), 1);
    assert_eq!(harness.sink.errors("ping"), 0);
}

#[tokio::test]
async fn ping_fails_when_not_ready() {
    let harness = Harness::new(
        FakeApi::default(),
        FakeProbe::status(StatusCode::SERVICE_UNAVAILABLE),
    );

    let failure = harness.call("ping", json!({})).await.unwrap_err();

    assert!(matches!(failure.cause, ToolError::Probe(_)));
    assert_eq!(harness.sink.total("ping"), 1);
    assert_eq!(harness.sink.errors("ping"), 1);
}

#[tokio::test]
async fn ping_fails_when_unreachable() {
    let harness = Harness::new(FakeApi::default(), FakeProbe::unreachable());

    let failure = harness.call("ping", json!({})).await.unwrap_err();

    assert_eq!(failure.message, "unable to ping Prometheus");
    assert_eq!(harness.sink.errors("ping"), 1);
}

#[tokio::test]
async fn encoding_failure_hides_cause() {
    let harness = Harness::with_encoder(
        FakeApi::returning(json!({"alerts": []})),
        FakeProbe::up(),
        Arc::new(FailingEncoder),
    );

    let failure = harness.call("alerts", json!({})).await.unwrap_err();

    assert_eq!(failure.message, "unable to marshal alerts");
    assert!(!failure.message.contains("exploded"));
    assert!(matches!(failure.cause, ToolError::Serialization(_)));
    assert_eq!(harness.sink.errors("alerts"), 1);
}

#[tokio::test]
async fn cancelled_call_fails() {
    let harness = Harness::new(FakeApi::returning(json!({})), FakeProbe::up());
    let ctx = CancellationToken::new();
    ctx.cancel();

    let failure = harness
        .registry
        .call("alerts", ctx, arguments(json!({})))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(failure.message, "unable to retrieve alerts");
    assert!(matches!(
        failure.cause,
        ToolError::Backend(Error::Cancelled)
    ));
}

#[tokio::test]
async fn counters_track_successes_and_failures() {
    let harness = Harness::new(FakeApi::returning(vector_result()), FakeProbe::up());

    for _ in 0..3 {
        harness.call("query", json!({"query": "up"})).await.unwrap();
    }
    for _ in 0..2 {
        harness.call("query", json!({})).await.unwrap_err();
    }

    assert_eq!(harness.sink.total("query"), 5);
    assert_eq!(harness.sink.errors("query"), 2);
    assert_eq!(harness.sink.total("alerts"), 0);
}

#[tokio::test]
async fn every_required_parameter_is_enforced() {
    let descriptors = PrometheusTools::descriptors()
        .into_iter()
        .chain(ManagementTools::descriptors());

    for descriptor in descriptors {
        for missing in descriptor.required_params() {
            let harness = Harness::new(FakeApi::returning(json!({})), FakeProbe::up());
            let args: serde_json::Map<String, Value> = descriptor
                .params
                .iter()
                .filter(|p| p.required && p.name != missing)
                .map(|p| (p.name.to_string(), valid_value(p.name, p.kind)))
                .collect();

            let failure = harness
                .call(descriptor.name, Value::Object(args))
                .await
                .unwrap_err();

            assert_eq!(
                failure.message,
                format!("unable to extract '{missing}' parameter"),
                "tool {}",
                descriptor.name
            );
            assert!(harness.api.calls().is_empty(), "tool {}", descriptor.name);
        }
    }
}

#[tokio::test]
async fn complete_arguments_are_accepted() {
    let descriptors = PrometheusTools::descriptors()
        .into_iter()
        .chain(ManagementTools::descriptors());

    for descriptor in descriptors {
        let harness = Harness::new(FakeApi::returning(json!({})), FakeProbe::up());
        let args: serde_json::Map<String, Value> = descriptor
            .params
            .iter()
            .map(|p| (p.name.to_string(), valid_value(p.name, p.kind)))
            .collect();

        let result = harness.call(descriptor.name, Value::Object(args)).await;
        assert!(result.is_ok(), "tool {}: {:?}", descriptor.name, result.err());
    }
}
