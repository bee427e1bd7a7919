use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use tickerdesk_core::CoordinatorStats;
use uuid::Uuid;

/// Identifier of one CLI invocation, echoed in the output envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Metadata attached to every JSON result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub command: &'static str,
    pub latency_ms: u64,
    pub network_calls: u64,
    pub coalesced: u64,
}

impl Metadata {
    pub fn new(command: &'static str, latency_ms: u64, stats: CoordinatorStats) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            command,
            latency_ms,
            network_calls: stats.network_calls,
            coalesced: stats.coalesced,
        }
    }
}

/// `{ "meta": ..., "data": ... }` document written to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_serializes_meta_before_data() {
        let envelope = Envelope {
            meta: Metadata::new(
                "header",
                12,
                CoordinatorStats {
                    network_calls: 1,
                    coalesced: 0,
                },
            ),
            data: json!({"ticker": "AAPL"}),
        };

        let rendered = serde_json::to_string(&envelope).expect("serialize");
        assert!(rendered.starts_with(r#"{"meta":{"request_id":""#));
        assert!(rendered.contains(r#""command":"header","latency_ms":12,"network_calls":1"#));
        assert!(rendered.ends_with(r#""data":{"ticker":"AAPL"}}"#));
    }
}
