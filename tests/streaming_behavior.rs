//! Behavior-driven tests for streamed chat
//!
//! These tests verify HOW the client turns a server-sent-event body into
//! chat events: token order, tolerance for bad input, chunk boundaries,
//! dropped connections and cancellation.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tickerdesk_core::{
    ChatMode, ChatRequest, ClientError, DataAccessClient, ErrorKind, HttpError, ManualClock,
    ScriptedHttpClient, ScriptedReply, StreamEvent, INTERRUPTED_MESSAGE,
};
use tokio_util::sync::CancellationToken;

fn client_with(transport: Arc<ScriptedHttpClient>) -> (Arc<ManualClock>, DataAccessClient) {
    let clock = Arc::new(ManualClock::new());
    let client = DataAccessClient::builder()
        .transport(transport)
        .clock(clock.clone())
        .build()
        .expect("client should build");
    (clock, client)
}

fn token(content: &str) -> StreamEvent {
    StreamEvent::Token {
        content: content.to_string(),
    }
}

fn done(content: &str) -> StreamEvent {
    StreamEvent::Done {
        content: content.to_string(),
    }
}

async fn stream_all(client: &DataAccessClient, ticker: &str) -> Vec<StreamEvent> {
    client
        .stream_chat(
            ticker,
            &ChatRequest::new("What moved the stock?"),
            ChatMode::Stream,
            CancellationToken::new(),
        )
        .await
        .expect("stream should open")
        .collect()
        .await
}

// =============================================================================
// Decoding
// =============================================================================

#[tokio::test]
async fn when_backend_streams_tokens_system_yields_them_in_order_then_done() {
    // Given: A backend streaming two tokens and a completion, one per chunk
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stock/chat/AAPL/stream",
        ScriptedReply::sse([
            "data: {\"type\":\"token\",\"content\":\"Hel\"}\n",
            "data: {\"type\":\"token\",\"content\":\"lo\"}\n",
            "data: {\"type\":\"complete\",\"content\":\"Hello\"}\n",
        ]),
    ));
    let (_, client) = client_with(transport.clone());

    // When: The chat is streamed
    let events = stream_all(&client, "AAPL").await;

    // Then: Tokens arrive in order, followed by exactly one Done
    assert_eq!(events, vec![token("Hel"), token("lo"), done("Hello")]);
    assert_eq!(transport.call_count("/stock/chat/AAPL/stream"), 1);
}

#[tokio::test]
async fn when_a_line_is_malformed_system_skips_it_and_keeps_streaming() {
    // Given: A malformed line between two valid tokens
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::sse([
            "data: {\"type\":\"token\",\"content\":\"first\"}\n",
            "data: {not json\n",
            "data: {\"type\":\"token\",\"content\":\"second\"}\n",
            "data: {\"done\":true}\n",
        ]),
    ));
    let (_, client) = client_with(transport);

    // When: The chat is streamed
    let events = stream_all(&client, "MSFT").await;

    // Then: Both valid tokens are still delivered
    assert_eq!(events, vec![token("first"), token("second"), done("")]);
}

#[tokio::test]
async fn when_backend_flushes_mid_line_system_reassembles_the_line() {
    // Given: Lines split at arbitrary byte offsets, with CRLF endings
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::sse([
            "data: {\"type\":\"tok",
            "en\",\"content\":\"Rev\"}\r\ndata: {\"type\":\"token\",",
            "\"content\":\"enue\"}\r\n",
            "data: {\"type\":\"complete\",\"content\":\"Revenue\"}\r\n",
        ]),
    ));
    let (_, client) = client_with(transport);

    // When: The chat is streamed
    let events = stream_all(&client, "AAPL").await;

    // Then: No payload is lost at the chunk boundaries
    assert_eq!(events, vec![token("Rev"), token("enue"), done("Revenue")]);
}

#[tokio::test]
async fn when_backend_reports_an_error_system_ends_with_that_error() {
    // Given: A backend that fails after one token
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::sse([
            "data: {\"type\":\"token\",\"content\":\"Let me\"}\n",
            "data: {\"type\":\"error\",\"message\":\"Model overloaded\"}\n",
            "data: {\"type\":\"token\",\"content\":\"ignored\"}\n",
        ]),
    ));
    let (_, client) = client_with(transport);

    // When: The chat is streamed
    let events = stream_all(&client, "AAPL").await;

    // Then: The error is the last event and nothing after it is read
    assert_eq!(
        events,
        vec![
            token("Let me"),
            StreamEvent::Error {
                message: String::from("Model overloaded"),
            },
        ]
    );
}

#[tokio::test]
async fn when_stream_closes_without_completion_system_still_ends_with_done() {
    // Given: A body that just stops after a token
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::sse(["data: {\"type\":\"token\",\"content\":\"partial\"}\n"]),
    ));
    let (_, client) = client_with(transport);

    // When: The chat is streamed
    let events = stream_all(&client, "AAPL").await;

    // Then: The caller still receives a terminal event
    assert_eq!(events, vec![token("partial"), done("")]);
}

// =============================================================================
// Failures and cancellation
// =============================================================================

#[tokio::test]
async fn when_connection_drops_mid_stream_system_apologizes_and_finishes() {
    // Given: A connection reset after the first token
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::Stream {
            status: 200,
            chunks: vec![
                Ok(b"data: {\"type\":\"token\",\"content\":\"The\"}\n".to_vec()),
                Err(HttpError::new("connection reset by peer")),
            ],
        },
    ));
    let (_, client) = client_with(transport);

    // When: The chat is streamed
    let events = stream_all(&client, "AAPL").await;

    // Then: The user sees an apology and the stream ends cleanly
    assert_eq!(events, vec![token("The"), token(INTERRUPTED_MESSAGE), done("")]);
}

#[tokio::test]
async fn when_stream_endpoint_fails_system_returns_classified_error_without_retry() {
    // Given: A streaming endpoint answering 503
    let transport = Arc::new(ScriptedHttpClient::new().on("/stream", ScriptedReply::status(503)));
    let (clock, client) = client_with(transport.clone());

    // When: A stream is opened
    let result = client
        .stream_chat(
            "AAPL",
            &ChatRequest::new("hi"),
            ChatMode::Stream,
            CancellationToken::new(),
        )
        .await;

    // Then: The failure is classified and not retried
    let Err(ClientError::Request(error)) = result else {
        panic!("expected a request error");
    };
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.message(), "HTTP 503: Service Unavailable");
    assert_eq!(transport.call_count("/stream"), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn when_caller_cancels_system_stops_reading_the_stream() {
    // Given: A stream that has delivered its first token
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stream",
        ScriptedReply::sse(["data: {\"type\":\"token\",\"content\":\"a\"}\n"]),
    ));
    let (_, client) = client_with(transport);
    let cancel = CancellationToken::new();
    let mut events = client
        .stream_chat("AAPL", &ChatRequest::new("hi"), ChatMode::Stream, cancel.clone())
        .await
        .expect("stream");
    assert_eq!(events.next().await, Some(token("a")));

    // When: The caller cancels
    cancel.cancel();

    // Then: The stream ends without further events
    let next = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("cancelled stream must end promptly");
    assert_eq!(next, None);
}

#[tokio::test]
async fn when_same_stream_is_requested_twice_system_opens_two_connections() {
    // Given: A streaming backend
    let transport = Arc::new(ScriptedHttpClient::new().on(
        "/stock/chat/AAPL/deep",
        ScriptedReply::sse(["data: {\"type\":\"complete\",\"content\":\"ok\"}\n"]),
    ));
    let (_, client) = client_with(transport.clone());

    // When: The same deep question is streamed twice
    for _ in 0..2 {
        let events: Vec<StreamEvent> = client
            .stream_chat(
                "AAPL",
                &ChatRequest::new("Deep dive?"),
                ChatMode::Deep,
                CancellationToken::new(),
            )
            .await
            .expect("stream")
            .collect()
            .await;
        assert_eq!(events, vec![done("ok")]);
    }

    // Then: Streams bypass cache and coalescing
    assert_eq!(transport.call_count("/stock/chat/AAPL/deep"), 2);
    assert_eq!(client.cache_stats().await.total_entries(), 0);
}
