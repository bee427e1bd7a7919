use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;

/// HTTP methods used by the backend surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Authentication applied to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    BearerToken(String),
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::None => {}
            Self::BearerToken(token) => {
                headers.insert(String::from("authorization"), format!("Bearer {token}"));
            }
        }
    }
}

/// Outgoing request envelope handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 30_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Buffered response returned by [`HttpClient::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Body chunks of a streaming response.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, HttpError>>;

/// Unbuffered response returned by [`HttpClient::execute_stream`].
pub struct HttpStreamResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl HttpStreamResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self { status, body }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

impl std::fmt::Debug for HttpStreamResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Transport-level failure: no HTTP status was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    timed_out: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract consumed by the request coordinator.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

    /// Issue a request and hand back the body as it arrives.
    ///
    /// `timeout_ms` bounds only the wait for response headers; the body may
    /// stream for longer.
    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpStreamResponse, HttpError>> + Send + 'a>>;
}

/// Production transport using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(user_agent)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    fn builder(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(concat!("tickerdesk/", env!("CARGO_PKG_VERSION")))
    }
}

fn map_send_error(error: &reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::timeout(format!("request timeout: {error}"))
    } else if error.is_connect() {
        HttpError::new(format!("connection failed: {error}"))
    } else {
        HttpError::new(format!("request failed: {error}"))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let timeout = Duration::from_millis(request.timeout_ms);
            let response = self
                .builder(&request)
                .timeout(timeout)
                .send()
                .await
                .map_err(|error| map_send_error(&error))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|error| map_send_error(&error))?;

            Ok(HttpResponse { status, body })
        })
    }

    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpStreamResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let timeout = Duration::from_millis(request.timeout_ms);
            let response = tokio::time::timeout(timeout, self.builder(&request).send())
                .await
                .map_err(|_| {
                    HttpError::timeout(format!(
                        "no response headers within {}ms",
                        request.timeout_ms
                    ))
                })?
                .map_err(|error| map_send_error(&error))?;

            let status = response.status().as_u16();
            let body = response
                .bytes_stream()
                .map(|chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|error| HttpError::new(format!("stream read failed: {error}")))
                })
                .boxed();

            Ok(HttpStreamResponse { status, body })
        })
    }
}

/// Canned reply served by [`ScriptedHttpClient`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(HttpResponse),
    Failure(HttpError),
    Stream {
        status: u16,
        chunks: Vec<Result<Vec<u8>, HttpError>>,
    },
}

impl ScriptedReply {
    pub fn json(body: impl Into<String>) -> Self {
        Self::Response(HttpResponse::ok_json(body))
    }

    pub fn status(status: u16) -> Self {
        Self::Response(HttpResponse::with_status(status, ""))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Failure(HttpError::new(message))
    }

    /// A 200 event stream delivering `chunks` one read at a time.
    pub fn sse<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream {
            status: 200,
            chunks: chunks
                .into_iter()
                .map(|chunk| Ok(chunk.into().into_bytes()))
                .collect(),
        }
    }
}

#[derive(Debug)]
struct ScriptedRoute {
    pattern: String,
    replies: VecDeque<ScriptedReply>,
}

/// Deterministic offline transport.
///
/// Replies are matched by the first registered pattern contained in the
/// request URL and served in order; the last reply of a route repeats.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<ScriptedRoute>>,
    calls: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, keeping requests in flight long enough to overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn on(self, pattern: impl Into<String>, reply: ScriptedReply) -> Self {
        self.push(pattern, reply);
        self
    }

    pub fn push(&self, pattern: impl Into<String>, reply: ScriptedReply) {
        let pattern = pattern.into();
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|route| route.pattern == pattern) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(ScriptedRoute {
                pattern,
                replies: VecDeque::from([reply]),
            }),
        }
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|request| request.url.contains(pattern))
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> ScriptedReply {
        self.calls.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let Some(route) = routes
            .iter_mut()
            .find(|route| request.url.contains(&route.pattern))
        else {
            return ScriptedReply::status(404);
        };

        if route.replies.len() > 1 {
            route
                .replies
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::status(404))
        } else {
            route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedReply::status(404))
        }
    }

    async fn delay(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = self.next_reply(&request);
            self.delay().await;
            match reply {
                ScriptedReply::Response(response) => Ok(response),
                ScriptedReply::Failure(error) => Err(error),
                ScriptedReply::Stream { status, chunks } => {
                    let mut body = Vec::new();
                    for chunk in chunks {
                        body.extend(chunk?);
                    }
                    Ok(HttpResponse {
                        status,
                        body: String::from_utf8_lossy(&body).into_owned(),
                    })
                }
            }
        })
    }

    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpStreamResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = self.next_reply(&request);
            self.delay().await;
            match reply {
                ScriptedReply::Response(response) => {
                    let body = stream::iter(vec![Ok(response.body.into_bytes())]).boxed();
                    Ok(HttpStreamResponse::new(response.status, body))
                }
                ScriptedReply::Failure(error) => Err(error),
                ScriptedReply::Stream { status, chunks } => {
                    Ok(HttpStreamResponse::new(status, stream::iter(chunks).boxed()))
                }
            }
        })
    }
}
