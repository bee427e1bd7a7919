//! Read-through cache, in-flight coalescing and the retry loop.
//!
//! For a non-streaming [`ApiRequest`] the coordinator:
//!
//! 1. resolves the cache category from the route table,
//! 2. returns a live cache entry when one exists,
//! 3. joins an identical request that is already in flight,
//! 4. otherwise dispatches a network call, retrying retryable failures with
//!    exponential backoff, and writes a success through to the cache.
//!
//! Streaming requests skip all of the above and hand back the raw body.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{resolve_auth, TokenProvider};
use crate::cache::{CacheCategory, CacheStore};
use crate::classify::ClassifiedError;
use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigError};
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, HttpStreamResponse};
use crate::observer::{RequestEvent, RequestObserver};
use crate::request::ApiRequest;
use crate::retry::RetryPolicy;
use crate::routes::RouteTable;

type PendingFetch = Shared<BoxFuture<'static, Result<Value, ClientError>>>;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Collaborators the coordinator is assembled from.
pub struct CoordinatorParts {
    pub transport: Arc<dyn HttpClient>,
    pub clock: Arc<dyn Clock>,
    pub cache: CacheStore,
    pub routes: RouteTable,
    pub config: ClientConfig,
    pub tokens: Option<Arc<dyn TokenProvider>>,
    pub observer: Arc<dyn RequestObserver>,
}

/// Network activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Attempts handed to the transport, retries included.
    pub network_calls: u64,
    /// Callers that joined an identical in-flight request.
    pub coalesced: u64,
}

#[derive(Clone)]
pub struct RequestCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    cache: CacheStore,
    routes: RouteTable,
    retry: RetryPolicy,
    config: ClientConfig,
    tokens: Option<Arc<dyn TokenProvider>>,
    observer: Arc<dyn RequestObserver>,
    pending: Mutex<HashMap<String, PendingFetch>>,
    network_calls: AtomicU64,
    coalesced: AtomicU64,
}

impl std::fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("base_url", &self.inner.config.base_url)
            .field("retry", &self.inner.retry)
            .field("pending", &self.inner.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl RequestCoordinator {
    pub fn new(parts: CoordinatorParts) -> Result<Self, ConfigError> {
        parts.config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                transport: parts.transport,
                clock: parts.clock,
                cache: parts.cache,
                routes: parts.routes,
                retry: parts.config.retry,
                config: parts.config,
                tokens: parts.tokens,
                observer: parts.observer,
                pending: Mutex::new(HashMap::new()),
                network_calls: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            network_calls: self.inner.network_calls.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Number of distinct requests currently in flight.
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Resolve a request through cache, coalescing and retries.
    pub async fn execute(&self, request: ApiRequest) -> Result<Value, ClientError> {
        let category = self.inner.category_for(request.path())?;
        let key = request.cache_key();
        let use_cache = !request.skips_cache() && category.is_cacheable();

        if use_cache {
            if let Some(data) = self.inner.cache.get(&key, category).await {
                debug!(key = %key, %category, "served from cache");
                return Ok(data);
            }
        }

        // Chat posts are conversational turns, never shared between callers.
        if request.method() == HttpMethod::Post && category == CacheCategory::Chat {
            return self.inner.fetch(&request).await;
        }

        let pending = {
            let mut table = self.inner.pending.lock();
            if let Some(existing) = table.get(&key) {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "joined in-flight request");
                existing.clone()
            } else {
                let endpoint = request.path().to_string();
                // Spawned so the request settles, and its entry is removed,
                // even when every caller stops waiting.
                let task = tokio::spawn(Arc::clone(&self.inner).fetch_and_store(
                    request,
                    key.clone(),
                    category,
                    use_cache,
                ));
                let fetch = task
                    .map(move |joined| {
                        joined.unwrap_or_else(|error| {
                            warn!(endpoint = %endpoint, %error, "request task ended abnormally");
                            Err(ClientError::Aborted { endpoint })
                        })
                    })
                    .boxed()
                    .shared();
                table.insert(key, fetch.clone());
                fetch
            }
        };

        pending.await
    }

    /// Open a streaming response. One attempt only: a stream cannot be
    /// replayed once bytes have been delivered.
    pub async fn execute_stream(
        &self,
        request: ApiRequest,
    ) -> Result<HttpStreamResponse, ClientError> {
        self.inner.category_for(request.path())?;
        let endpoint = request.path().to_string();
        let request_id = Uuid::new_v4();
        let http_request = self.inner.http_request(&request, ACCEPT_EVENT_STREAM).await;

        self.inner.observer.on_event(&RequestEvent::Started {
            request_id,
            endpoint: endpoint.clone(),
            attempt: 0,
        });
        self.inner.network_calls.fetch_add(1, Ordering::Relaxed);
        let started = self.inner.clock.now();

        let outcome = match self.inner.transport.execute_stream(http_request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(ClassifiedError::from_status(response.status, endpoint.as_str())),
            Err(error) => Err(ClassifiedError::from_transport(&error, endpoint.as_str())),
        };

        match outcome {
            Ok(response) => {
                self.inner.observer.on_event(&RequestEvent::Succeeded {
                    request_id,
                    endpoint,
                    attempt: 0,
                    elapsed: self.inner.clock.now().saturating_duration_since(started),
                });
                Ok(response)
            }
            Err(error) => {
                self.inner.observer.on_event(&RequestEvent::Failed {
                    request_id,
                    endpoint,
                    attempt: 0,
                    error: error.clone(),
                    will_retry: false,
                });
                Err(error.into())
            }
        }
    }
}

/// Removes a pending entry when its fetch task settles or is torn down.
struct PendingGuard {
    inner: Arc<Inner>,
    key: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(&self.key);
    }
}

impl Inner {
    fn category_for(&self, path: &str) -> Result<CacheCategory, ClientError> {
        self.routes
            .classify(path)
            .ok_or_else(|| ClientError::Unrouted {
                path: path.to_string(),
            })
    }

    fn fetch_and_store(
        self: Arc<Self>,
        request: ApiRequest,
        key: String,
        category: CacheCategory,
        use_cache: bool,
    ) -> impl std::future::Future<Output = Result<Value, ClientError>> + Send + 'static {
        let guard = PendingGuard {
            inner: Arc::clone(&self),
            key,
        };
        async move {
            let result = self.fetch(&request).await;
            if let (Ok(data), true) = (&result, use_cache) {
                self.cache.set(guard.key.as_str(), data.clone(), category, None).await;
            }
            drop(guard);
            result
        }
    }

    async fn fetch(&self, request: &ApiRequest) -> Result<Value, ClientError> {
        let request_id = Uuid::new_v4();
        let endpoint = request.path().to_string();
        let mut attempt: u32 = 0;

        let body = loop {
            self.observer.on_event(&RequestEvent::Started {
                request_id,
                endpoint: endpoint.clone(),
                attempt,
            });
            let started = self.clock.now();

            match self.attempt(request, &endpoint).await {
                Ok(body) => {
                    self.observer.on_event(&RequestEvent::Succeeded {
                        request_id,
                        endpoint: endpoint.clone(),
                        attempt,
                        elapsed: self.clock.now().saturating_duration_since(started),
                    });
                    break body;
                }
                Err(error) => {
                    let will_retry =
                        error.should_retry() && self.retry.allows_retry_after(attempt);
                    self.observer.on_event(&RequestEvent::Failed {
                        request_id,
                        endpoint: endpoint.clone(),
                        attempt,
                        error: error.clone(),
                        will_retry,
                    });
                    if !will_retry {
                        return Err(error.into());
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after {}",
                        error.message()
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        parse_body(&endpoint, &body)
    }

    async fn attempt(&self, request: &ApiRequest, endpoint: &str) -> Result<String, ClassifiedError> {
        let http_request = self.http_request(request, ACCEPT_JSON).await;
        self.network_calls.fetch_add(1, Ordering::Relaxed);

        let response = self
            .transport
            .execute(http_request)
            .await
            .map_err(|error| ClassifiedError::from_transport(&error, endpoint))?;

        if !response.is_success() {
            return Err(ClassifiedError::from_status(response.status, endpoint));
        }
        Ok(response.body)
    }

    /// Wire request for one attempt; the token is fetched anew every time.
    async fn http_request(&self, request: &ApiRequest, accept: &str) -> HttpRequest {
        let auth = resolve_auth(self.tokens.as_deref()).await;
        let url = self.config.url_for(&request.path_and_query());

        let mut http_request = HttpRequest::new(request.method(), url)
            .with_header("accept", accept)
            .with_timeout_ms(self.config.timeout_ms)
            .with_auth(&auth);
        if let Some(body) = request.body_json() {
            http_request = http_request
                .with_header("content-type", ACCEPT_JSON)
                .with_body(body);
        }
        http_request
    }
}

fn parse_body(endpoint: &str, body: &str) -> Result<Value, ClientError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|error| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
    })
}
