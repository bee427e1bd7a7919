//! Behavior-driven tests for error handling
//!
//! These tests verify HOW failures are classified, which ones are retried,
//! how long the client backs off, and that bad input never reaches the
//! network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tickerdesk_core::{
    CacheCategory, ClientConfig, ClientError, DataAccessClient, ErrorKind, HttpError,
    ManualClock, RetryPolicy, ScriptedHttpClient, ScriptedReply, ValidationError,
    DEFAULT_ROUTES,
};

fn client_with(transport: Arc<ScriptedHttpClient>) -> (Arc<ManualClock>, DataAccessClient) {
    let clock = Arc::new(ManualClock::new());
    let client = DataAccessClient::builder()
        .transport(transport)
        .clock(clock.clone())
        .build()
        .expect("client should build");
    (clock, client)
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

// =============================================================================
// Retry and backoff
// =============================================================================

#[tokio::test]
async fn when_server_keeps_failing_system_retries_with_exponential_backoff() {
    // Given: A server that always answers 503 and the default retry policy
    let transport = Arc::new(ScriptedHttpClient::new().on("/stock/chart/", ScriptedReply::status(503)));
    let (clock, client) = client_with(transport.clone());

    // When: A chart is requested
    let error = client
        .chart("AAPL", Default::default(), Default::default())
        .await
        .expect_err("server never recovers");

    // Then: Four attempts were made, waiting 1s, 2s and 4s between them
    assert_eq!(transport.call_count("/stock/chart/AAPL"), 4);
    assert_eq!(clock.sleeps(), millis(&[1_000, 2_000, 4_000]));

    // And: The final error describes the last failure
    let error = error.as_request().expect("classified request error");
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.status(), 503);
    assert_eq!(error.endpoint(), "/stock/chart/AAPL");
    assert!(error.should_retry());
}

#[tokio::test]
async fn when_backoff_would_exceed_the_cap_system_waits_the_maximum() {
    // Given: Six retries starting at 2s
    let transport = Arc::new(ScriptedHttpClient::new().on("/stock/header/", ScriptedReply::status(500)));
    let clock = Arc::new(ManualClock::new());
    let client = DataAccessClient::builder()
        .config(ClientConfig::default().with_retry(RetryPolicy::exponential(
            6,
            Duration::from_secs(2),
            Duration::from_secs(10),
        )))
        .transport(transport.clone())
        .clock(clock.clone())
        .build()
        .expect("client");

    // When: The request fails every time
    client.header("AAPL").await.expect_err("always 500");

    // Then: Delays double until they reach the 10s cap
    assert_eq!(
        clock.sleeps(),
        millis(&[2_000, 4_000, 8_000, 10_000, 10_000, 10_000])
    );
    assert_eq!(transport.call_count("/stock/header/"), 7);
}

#[tokio::test]
async fn when_server_says_not_implemented_system_does_not_retry() {
    // Given: An endpoint answering 501
    let transport = Arc::new(
        ScriptedHttpClient::new().on("/stock/technical-analysis/", ScriptedReply::status(501)),
    );
    let (clock, client) = client_with(transport.clone());

    // When: Technical analysis is requested
    let error = client
        .technical_analysis("AAPL", &BTreeMap::new())
        .await
        .expect_err("501");

    // Then: The failure is permanent and there was a single attempt
    let error = error.as_request().expect("request error");
    assert_eq!(error.kind(), ErrorKind::PermanentServer);
    assert!(!error.should_retry());
    assert_eq!(transport.call_count("/stock/technical-analysis/"), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn when_request_is_rejected_system_does_not_retry_client_errors() {
    // Given: A backend rejecting unknown tickers with 404 and bad input with 400
    let transport = Arc::new(
        ScriptedHttpClient::new()
            .on("/stock/fundamentals/ZZZZ", ScriptedReply::status(404))
            .on("/stock/news/", ScriptedReply::status(400)),
    );
    let (clock, client) = client_with(transport.clone());

    // When: Both resources are requested
    let not_found = client.fundamentals("ZZZZ", false).await.expect_err("404");
    let bad_request = client.news("AAPL", 3).await.expect_err("400");

    // Then: Each was attempted once and classified as a client error
    for (error, status) in [(not_found, 404), (bad_request, 400)] {
        let error = error.as_request().expect("request error");
        assert_eq!(error.kind(), ErrorKind::Client);
        assert_eq!(error.status(), status);
    }
    assert_eq!(transport.calls().len(), 2);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn when_network_is_down_system_retries_and_reports_status_zero() {
    // Given: A transport that cannot connect
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stock/ticker-tape/",
        ScriptedReply::network("connection refused"),
    ));
    let (clock, client) = client_with(transport.clone());

    // When: The ticker tape is requested
    let error = client.ticker_tape(Some(20), false).await.expect_err("offline");

    // Then: The failure is a retried network error carrying the transport message
    let error = error.as_request().expect("request error");
    assert_eq!(error.kind(), ErrorKind::Network);
    assert_eq!(error.status(), 0);
    assert_eq!(error.message(), "connection refused");
    assert_eq!(transport.call_count("/stock/ticker-tape/"), 4);
    assert_eq!(clock.sleeps().len(), 3);
}

#[tokio::test]
async fn when_attempt_times_out_system_treats_it_as_a_network_failure() {
    // Given: A first attempt that times out, then a healthy answer
    let transport = Arc::new(
        ScriptedHttpClient::new()
            .on(
                "/stock/header/",
                ScriptedReply::Failure(HttpError::timeout("request timeout after 30000ms")),
            )
            .on("/stock/header/", ScriptedReply::json(r#"{"price":10.0}"#)),
    );
    let (clock, client) = client_with(transport.clone());

    // When: The header is requested
    let header = client.header("AAPL").await.expect("second attempt succeeds");

    // Then: The timeout was retried after the base delay
    assert_eq!(header.price, Some(10.0));
    assert_eq!(clock.sleeps(), millis(&[1_000]));
    assert_eq!(transport.calls()[0].timeout_ms, 30_000);
}

#[tokio::test]
async fn when_failure_is_returned_system_does_not_cache_it() {
    // Given: A backend that fails with 404 and then succeeds
    let transport = Arc::new(
        ScriptedHttpClient::new()
            .on("/stock/header/", ScriptedReply::status(404))
            .on("/stock/header/", ScriptedReply::json(r#"{"price":1.0}"#)),
    );
    let (_, client) = client_with(transport.clone());

    // When: The header is requested twice
    client.header("AAPL").await.expect_err("first fails");
    let header = client.header("AAPL").await.expect("second succeeds");

    // Then: The second call went to the network
    assert_eq!(header.price, Some(1.0));
    assert_eq!(transport.call_count("/stock/header/"), 2);
}

// =============================================================================
// Validation and decoding
// =============================================================================

#[tokio::test]
async fn when_input_is_invalid_system_fails_before_any_network_call() {
    // Given: A client with a backend that would accept anything
    let transport = Arc::new(ScriptedHttpClient::new().on("/", ScriptedReply::json("{}")));
    let (_, client) = client_with(transport.clone());

    // When: Invalid tickers, queries and limits are used
    let errors = vec![
        client.header("").await.expect_err("empty ticker"),
        client.header("AAPL MSFT").await.expect_err("space"),
        client.header("THISTICKERISWAYTOOLONG").await.expect_err("too long"),
        client.header("1ABC").await.expect_err("leading digit"),
        client.search("  ", 5).await.expect_err("blank query"),
        client.search("apple", 0).await.expect_err("zero limit"),
        client.ticker_tape(Some(0), false).await.expect_err("zero tape limit"),
    ];

    // Then: Each is a validation error and nothing was sent
    for error in &errors {
        assert!(
            matches!(error, ClientError::Validation(_)),
            "unexpected error: {error}"
        );
    }
    assert!(matches!(
        errors[5],
        ClientError::Validation(ValidationError::ZeroLimit { field: "limit" })
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn when_payload_has_wrong_field_type_system_reports_decode_error() {
    // Given: A backend returning a string where a number is expected
    let transport = Arc::new(
        ScriptedHttpClient::new().on("/stock/header/", ScriptedReply::json(r#"{"price":"n/a"}"#)),
    );
    let (_, client) = client_with(transport);

    // When: The header is requested
    let error = client.header("AAPL").await.expect_err("bad payload");

    // Then: The caller gets a decode error naming the endpoint
    assert!(
        matches!(&error, ClientError::Decode { endpoint, .. } if endpoint == "/stock/header/AAPL"),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn when_payload_is_missing_fields_system_fills_defaults() {
    // Given: A backend returning null for a summary
    let transport = Arc::new(
        ScriptedHttpClient::new().on("/stock/ai-summary/", ScriptedReply::json("null")),
    );
    let (_, client) = client_with(transport);

    // When: The summary is requested
    let summary = client.ai_summary("AAPL").await.expect("defaults");

    // Then: An empty summary for the requested ticker is returned
    assert_eq!(summary.ticker, "AAPL");
    assert!(summary.summary.is_empty());
    assert!(summary.key_points.is_empty());
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn when_route_is_missing_system_refuses_the_request() {
    // Given: A route table where the header category lives under another prefix
    let transport = Arc::new(ScriptedHttpClient::new());
    let routes = DEFAULT_ROUTES
        .iter()
        .map(|(prefix, category)| {
            if *category == CacheCategory::Header {
                ("/stock/quote-header/", *category)
            } else {
                (*prefix, *category)
            }
        })
        .collect::<Vec<_>>();
    let client = DataAccessClient::builder()
        .transport(transport.clone())
        .clock(Arc::new(ManualClock::new()))
        .routes(routes)
        .build()
        .expect("every category is still routed");

    // When: The header is requested
    let error = client.header("AAPL").await.expect_err("unrouted");

    // Then: The client refuses instead of guessing a category
    assert!(matches!(error, ClientError::Unrouted { ref path } if path == "/stock/header/AAPL"));
    assert!(transport.calls().is_empty());
}

#[test]
fn when_backoff_factor_is_invalid_system_refuses_to_build() {
    // Given: A retry policy that never grows
    let config = ClientConfig::default().with_retry(RetryPolicy {
        backoff_factor: 0.5,
        ..RetryPolicy::default()
    });

    // When: The client is built
    let result = DataAccessClient::builder()
        .config(config)
        .transport(Arc::new(ScriptedHttpClient::new()))
        .build();

    // Then: Construction fails with a configuration error
    assert!(matches!(result, Err(ClientError::Config(_))));
}
