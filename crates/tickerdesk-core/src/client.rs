//! Typed façade over the request coordinator.
//!
//! Every method validates its arguments before touching the network, builds
//! the endpoint, delegates to [`RequestCoordinator`] and reshapes the raw
//! payload into a stable schema from [`crate::domain`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::auth::{StaticTokenProvider, TokenProvider};
use crate::cache::{CacheCategory, CacheStats, CacheStore, SweeperHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::coordinator::{CoordinatorParts, CoordinatorStats, RequestCoordinator};
use crate::domain::{
    AiSummary, ChartInterval, ChartPeriod, ChartSeries, ChatReply, ChatRequest, Fundamentals,
    HealthReport, NewsFeed, Reshape, SearchResults, StockHeader, Symbol, TechnicalAnalysis,
    TickerTape,
};
use crate::error::{ClientError, ValidationError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::observer::{RequestObserver, TracingObserver};
use crate::request::ApiRequest;
use crate::routes::{RouteTable, DEFAULT_ROUTES};
use crate::sse::{self, EventStream};

/// Which streaming chat endpoint to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatMode {
    /// Regular streamed answer.
    #[default]
    Stream,
    /// Slower, research-style answer.
    Deep,
}

impl ChatMode {
    pub const fn path_suffix(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Deep => "deep",
        }
    }
}

/// Assembles a [`DataAccessClient`] from injected collaborators.
#[derive(Default)]
pub struct DataAccessClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    tokens: Option<Arc<dyn TokenProvider>>,
    observer: Option<Arc<dyn RequestObserver>>,
    routes: Option<Vec<(String, CacheCategory)>>,
}

impl DataAccessClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the standard route table.
    pub fn routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = (S, CacheCategory)>,
        S: Into<String>,
    {
        self.routes = Some(
            routes
                .into_iter()
                .map(|(prefix, category)| (prefix.into(), category))
                .collect(),
        );
        self
    }

    /// Validate configuration and routes, then wire everything together.
    ///
    /// Defaults: reqwest transport, system clock, a static token provider
    /// when the config carries a token, and the `tracing` observer.
    pub fn build(self) -> Result<DataAccessClient, ClientError> {
        self.config.validate()?;
        let routes = match self.routes {
            Some(routes) => RouteTable::new(routes)?,
            None => RouteTable::new(DEFAULT_ROUTES.iter().copied())?,
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new(&self.config.user_agent)));
        let tokens = self.tokens.or_else(|| {
            self.config
                .token
                .clone()
                .map(|token| Arc::new(StaticTokenProvider::new(token)) as Arc<dyn TokenProvider>)
        });
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));
        let cache = CacheStore::with_ttl_overrides(clock.clone(), &self.config.ttl_overrides);

        let coordinator = RequestCoordinator::new(CoordinatorParts {
            transport,
            clock,
            cache,
            routes,
            config: self.config,
            tokens,
            observer,
        })?;
        Ok(DataAccessClient { coordinator })
    }
}

/// Entry point for UI code: one async method per backend resource.
#[derive(Debug, Clone)]
pub struct DataAccessClient {
    coordinator: RequestCoordinator,
}

impl DataAccessClient {
    pub fn builder() -> DataAccessClientBuilder {
        DataAccessClientBuilder::default()
    }

    /// Backend liveness; never served from cache.
    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        self.fetch(ApiRequest::get("/health").skip_cache(true)).await
    }

    pub async fn fundamentals(
        &self,
        ticker: &str,
        force_refresh: bool,
    ) -> Result<Fundamentals, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let request = ApiRequest::get(format!("/stock/fundamentals/{}", symbol.path_segment()))
            .with_query_opt("force_refresh", force_refresh.then_some(true))
            .skip_cache(force_refresh);

        let mut fundamentals: Fundamentals = self.fetch(request).await?;
        fill_ticker(&mut fundamentals.ticker, &symbol);
        Ok(fundamentals)
    }

    pub async fn chart(
        &self,
        ticker: &str,
        period: ChartPeriod,
        interval: ChartInterval,
    ) -> Result<ChartSeries, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let request = ApiRequest::get(format!("/stock/chart/{}", symbol.path_segment()))
            .with_query("period", period)
            .with_query("interval", interval);

        let mut series: ChartSeries = self.fetch(request).await?;
        fill_ticker(&mut series.ticker, &symbol);
        Ok(series)
    }

    pub async fn news(&self, ticker: &str, limit: u32) -> Result<NewsFeed, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let limit = positive(limit, "limit")?;
        let request = ApiRequest::get(format!("/stock/news/{}", symbol.path_segment()))
            .with_query("limit", limit);

        let mut feed: NewsFeed = self.fetch(request).await?;
        fill_ticker(&mut feed.ticker, &symbol);
        Ok(feed)
    }

    pub async fn ticker_tape(
        &self,
        limit: Option<u32>,
        force_refresh: bool,
    ) -> Result<TickerTape, ClientError> {
        let limit = limit.map(|limit| positive(limit, "limit")).transpose()?;
        let request = ApiRequest::get("/stock/ticker-tape/")
            .with_query_opt("limit", limit)
            .with_query_opt("force_refresh", force_refresh.then_some(true))
            .skip_cache(force_refresh);
        self.fetch(request).await
    }

    pub async fn ai_summary(&self, ticker: &str) -> Result<AiSummary, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let mut summary: AiSummary = self
            .fetch(ApiRequest::get(format!(
                "/stock/ai-summary/{}",
                symbol.path_segment()
            )))
            .await?;
        fill_ticker(&mut summary.ticker, &symbol);
        Ok(summary)
    }

    /// Indicator snapshot; `params` are forwarded as query parameters
    /// (for example `rsi_period=14`).
    pub async fn technical_analysis(
        &self,
        ticker: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<TechnicalAnalysis, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let request = params.iter().fold(
            ApiRequest::get(format!(
                "/stock/technical-analysis/{}",
                symbol.path_segment()
            )),
            |request, (name, value)| request.with_query(name.as_str(), value),
        );

        let mut analysis: TechnicalAnalysis = self.fetch(request).await?;
        fill_ticker(&mut analysis.ticker, &symbol);
        Ok(analysis)
    }

    pub async fn header(&self, ticker: &str) -> Result<StockHeader, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let mut header: StockHeader = self
            .fetch(ApiRequest::get(format!("/stock/header/{}", symbol.path_segment())))
            .await?;
        fill_ticker(&mut header.ticker, &symbol);
        Ok(header)
    }

    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResults, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let limit = positive(limit, "limit")?;
        let request = ApiRequest::get("/stock/search")
            .with_query("q", query)
            .with_query("limit", limit);

        let mut results: SearchResults = self.fetch(request).await?;
        if results.query.is_empty() {
            results.query = query.to_string();
        }
        Ok(results)
    }

    /// One chat turn answered in full. Never cached or coalesced.
    pub async fn send_chat_message(
        &self,
        ticker: &str,
        request: &ChatRequest,
    ) -> Result<ChatReply, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let path = format!("/stock/chat/{}", symbol.path_segment());
        let body = chat_body(&path, request)?;
        self.fetch(ApiRequest::post(path, body)).await
    }

    /// One chat turn streamed token by token.
    ///
    /// Cancelling `cancel` aborts the HTTP read and ends the stream.
    pub async fn stream_chat(
        &self,
        ticker: &str,
        request: &ChatRequest,
        mode: ChatMode,
        cancel: CancellationToken,
    ) -> Result<EventStream, ClientError> {
        let symbol = Symbol::parse(ticker)?;
        let path = format!(
            "/stock/chat/{}/{}",
            symbol.path_segment(),
            mode.path_suffix()
        );
        let body = chat_body(&path, request)?;
        let response = self
            .coordinator
            .execute_stream(ApiRequest::post(path, body))
            .await?;
        Ok(sse::decode(response.body, cancel))
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.coordinator.cache().stats().await
    }

    /// Drop cached data for one category, or everything.
    pub async fn clear_cache(&self, category: Option<CacheCategory>) {
        self.coordinator.cache().clear(category).await;
    }

    /// Start the periodic expiry sweep at the configured interval.
    pub fn spawn_cache_sweeper(&self) -> SweeperHandle {
        self.coordinator
            .cache()
            .spawn_sweeper(self.coordinator.config().sweep_interval)
    }

    pub fn network_stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Distinct requests still in flight.
    pub fn pending_requests(&self) -> usize {
        self.coordinator.pending_len()
    }

    pub fn config(&self) -> &ClientConfig {
        self.coordinator.config()
    }

    async fn fetch<T: Reshape>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let endpoint = request.path().to_string();
        let payload = self.coordinator.execute(request).await?;
        T::reshape(&endpoint, payload)
    }
}

fn positive(value: u32, field: &'static str) -> Result<u32, ValidationError> {
    if value == 0 {
        return Err(ValidationError::ZeroLimit { field });
    }
    Ok(value)
}

fn fill_ticker(target: &mut String, symbol: &Symbol) {
    if target.is_empty() {
        *target = symbol.as_str().to_string();
    }
}

fn chat_body(endpoint: &str, request: &ChatRequest) -> Result<Value, ClientError> {
    if request.question.trim().is_empty() {
        return Err(ValidationError::EmptyQuestion.into());
    }
    serde_json::to_value(request).map_err(|error| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
    })
}
