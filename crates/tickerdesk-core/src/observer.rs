//! Request lifecycle notifications.
//!
//! The coordinator reports every attempt to a [`RequestObserver`]. Observers
//! are informational only: they cannot fail a request or alter retries.

use std::fmt::Debug;
use std::time::Duration;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::classify::ClassifiedError;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestEvent {
    Started {
        request_id: Uuid,
        endpoint: String,
        attempt: u32,
    },
    Succeeded {
        request_id: Uuid,
        endpoint: String,
        attempt: u32,
        elapsed: Duration,
    },
    Failed {
        request_id: Uuid,
        endpoint: String,
        attempt: u32,
        error: ClassifiedError,
        will_retry: bool,
    },
}

impl RequestEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::Started { request_id, .. }
            | Self::Succeeded { request_id, .. }
            | Self::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Started { endpoint, .. }
            | Self::Succeeded { endpoint, .. }
            | Self::Failed { endpoint, .. } => endpoint,
        }
    }
}

pub trait RequestObserver: Send + Sync + Debug {
    fn on_event(&self, event: &RequestEvent);
}

/// Default observer: forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_event(&self, event: &RequestEvent) {
        match event {
            RequestEvent::Started {
                request_id,
                endpoint,
                attempt,
            } => {
                tracing::debug!(%request_id, %endpoint, attempt, "request started");
            }
            RequestEvent::Succeeded {
                request_id,
                endpoint,
                attempt,
                elapsed,
            } => {
                tracing::debug!(
                    %request_id,
                    %endpoint,
                    attempt,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "request succeeded"
                );
            }
            RequestEvent::Failed {
                request_id,
                endpoint,
                attempt,
                error,
                will_retry,
            } => {
                tracing::warn!(
                    %request_id,
                    %endpoint,
                    attempt,
                    status = error.status(),
                    kind = %error.kind(),
                    will_retry,
                    "request failed: {}",
                    error.message()
                );
            }
        }
    }
}

/// Observer that keeps every event, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RequestEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RequestEvent> {
        self.events.lock().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn on_event(&self, event: &RequestEvent) {
        self.events.lock().push(event.clone());
    }
}
