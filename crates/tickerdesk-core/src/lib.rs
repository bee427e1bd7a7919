//! # Tickerdesk Core
//!
//! Client-side data-access layer for the tickerdesk stock dashboard.
//!
//! ## Overview
//!
//! Every network interaction between a dashboard and its financial-data/AI
//! backend goes through this crate. It provides:
//!
//! - **Categorized TTL cache** with lazy and periodic expiry
//! - **Request coalescing**: one network call per identical in-flight request
//! - **Retry with exponential backoff** driven by error classification
//! - **SSE chat decoding** into a cancellable stream of tokens
//! - **Typed façade** with input validation and stable response schemas
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`auth`] | Bearer token source |
//! | [`cache`] | Categorized cache store and background sweeper |
//! | [`classify`] | HTTP/transport failure classification |
//! | [`client`] | [`DataAccessClient`] façade and builder |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Client configuration and environment loading |
//! | [`coordinator`] | Read-through cache, coalescing, retry loop |
//! | [`domain`] | Symbols, chart options, response schemas |
//! | [`error`] | Validation, configuration and client errors |
//! | [`http_client`] | Transport trait, reqwest and scripted transports |
//! | [`observer`] | Request lifecycle notifications |
//! | [`request`] | Logical requests and cache keys |
//! | [`retry`] | Backoff policy |
//! | [`routes`] | Endpoint → cache category table |
//! | [`sse`] | Server-sent-event decoder |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use tickerdesk_core::{ChatMode, ChatRequest, ClientConfig, DataAccessClient, StreamEvent};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DataAccessClient::builder()
//!         .config(ClientConfig::from_env()?)
//!         .build()?;
//!
//!     let header = client.header("AAPL").await?;
//!     println!("{} {:?}", header.ticker, header.price);
//!
//!     let mut events = client
//!         .stream_chat("AAPL", &ChatRequest::new("Outlook?"), ChatMode::Stream, CancellationToken::new())
//!         .await?;
//!     while let Some(event) = events.next().await {
//!         if let StreamEvent::Token { content } = event {
//!             print!("{content}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ DataAccessClient │  validate → build ApiRequest → reshape
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ RequestCoordinator│───▶│ CacheStore       │
//! │ (coalesce, retry) │    └──────────────────┘
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ HttpClient       │────▶│ SSE decoder      │ (streaming only)
//! │ (reqwest/scripted)│    └──────────────────┘
//! └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tickerdesk_core::{ClientError, ErrorKind};
//!
//! fn describe(error: &ClientError) -> &'static str {
//!     match error.as_request().map(|error| error.kind()) {
//!         Some(ErrorKind::Network) => "backend unreachable",
//!         Some(ErrorKind::Server) => "backend failing",
//!         Some(ErrorKind::PermanentServer) => "not supported by backend",
//!         Some(ErrorKind::Client) => "request rejected",
//!         None => "invalid input or configuration",
//!     }
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod classify;
pub mod client;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod observer;
pub mod request;
pub mod retry;
pub mod routes;
pub mod sse;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use cache::{CacheCategory, CacheEntry, CacheStats, CacheStore, SweeperHandle};
pub use classify::{ClassifiedError, ErrorKind};
pub use client::{ChatMode, DataAccessClient, DataAccessClientBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClientConfig;
pub use coordinator::{CoordinatorStats, RequestCoordinator};
pub use domain::{
    AiSummary, ChartInterval, ChartPeriod, ChartPoint, ChartSeries, ChatReply, ChatRequest,
    ChatTurn, Fundamentals, HealthReport, NewsArticle, NewsFeed, Reshape, SearchHit,
    SearchResults, StockHeader, Symbol, TechnicalAnalysis, TechnicalSignal, TickerTape,
    TickerTapeItem, UtcDateTime,
};
pub use error::{ClientError, ConfigError, ValidationError};
pub use http_client::{
    ByteStream, HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    HttpStreamResponse, ReqwestHttpClient, ScriptedHttpClient, ScriptedReply,
};
pub use observer::{RecordingObserver, RequestEvent, RequestObserver, TracingObserver};
pub use request::ApiRequest;
pub use retry::RetryPolicy;
pub use routes::{RouteTable, DEFAULT_ROUTES};
pub use sse::{decode, EventStream, SseLineDecoder, StreamEvent, INTERRUPTED_MESSAGE};
