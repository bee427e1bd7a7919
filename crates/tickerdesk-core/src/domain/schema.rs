//! Stable response schemas returned by the façade.
//!
//! Backend payloads drift between releases, so every field here is either
//! optional or defaulted. A missing field never fails deserialization; a
//! field with the wrong JSON type does.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Schemas that can be built from a raw backend payload.
pub trait Reshape: DeserializeOwned + Default {
    /// Field that receives the payload when the backend answers with a bare
    /// JSON array instead of an object.
    const LIST_FIELD: Option<&'static str> = None;

    fn reshape(endpoint: &str, payload: Value) -> Result<Self, ClientError> {
        let payload = match (payload, Self::LIST_FIELD) {
            (Value::Object(map), _) => Value::Object(map),
            (Value::Array(items), Some(field)) => {
                let mut map = Map::new();
                map.insert(field.to_owned(), Value::Array(items));
                Value::Object(map)
            }
            _ => return Ok(Self::default()),
        };

        serde_json::from_value(payload).map_err(|error| ClientError::Decode {
            endpoint: endpoint.to_owned(),
            message: error.to_string(),
        })
    }
}

/// Accepts a string, number or bool and keeps its textual form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub status: String,
    pub version: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "ok" | "healthy")
    }
}

impl Reshape for HealthReport {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    #[serde(alias = "symbol")]
    pub ticker: String,
    #[serde(alias = "name", alias = "longName", alias = "companyName")]
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
    #[serde(alias = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(alias = "peRatio", alias = "trailingPE")]
    pub pe_ratio: Option<f64>,
    #[serde(alias = "forwardPE")]
    pub forward_pe: Option<f64>,
    pub eps: Option<f64>,
    #[serde(alias = "dividendYield")]
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    #[serde(alias = "fiftyTwoWeekHigh")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(alias = "fiftyTwoWeekLow")]
    pub fifty_two_week_low: Option<f64>,
    pub description: Option<String>,
}

impl Reshape for Fundamentals {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartPoint {
    #[serde(alias = "date", alias = "time", deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSeries {
    #[serde(alias = "symbol")]
    pub ticker: String,
    pub period: Option<String>,
    pub interval: Option<String>,
    #[serde(alias = "data", alias = "candles")]
    pub points: Vec<ChartPoint>,
}

impl Reshape for ChartSeries {
    const LIST_FIELD: Option<&'static str> = Some("points");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsArticle {
    pub title: String,
    #[serde(alias = "source")]
    pub publisher: Option<String>,
    #[serde(alias = "url")]
    pub link: Option<String>,
    pub summary: Option<String>,
    #[serde(
        alias = "publishedAt",
        alias = "providerPublishTime",
        deserialize_with = "lenient_string"
    )]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsFeed {
    #[serde(alias = "symbol")]
    pub ticker: String,
    #[serde(alias = "news", alias = "items")]
    pub articles: Vec<NewsArticle>,
}

impl Reshape for NewsFeed {
    const LIST_FIELD: Option<&'static str> = Some("articles");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerTapeItem {
    #[serde(alias = "ticker")]
    pub symbol: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    #[serde(alias = "changePercent")]
    pub change_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerTape {
    #[serde(alias = "tickers", alias = "data")]
    pub items: Vec<TickerTapeItem>,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

impl Reshape for TickerTape {
    const LIST_FIELD: Option<&'static str> = Some("items");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSummary {
    #[serde(alias = "symbol")]
    pub ticker: String,
    #[serde(alias = "content", alias = "analysis")]
    pub summary: String,
    pub sentiment: Option<String>,
    #[serde(alias = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(alias = "generatedAt", deserialize_with = "lenient_string")]
    pub generated_at: Option<String>,
}

impl Reshape for AiSummary {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalSignal {
    pub name: String,
    pub signal: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalAnalysis {
    #[serde(alias = "symbol")]
    pub ticker: String,
    pub indicators: BTreeMap<String, Value>,
    pub signals: Vec<TechnicalSignal>,
    pub summary: Option<String>,
}

impl Reshape for TechnicalAnalysis {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockHeader {
    #[serde(alias = "symbol")]
    pub ticker: String,
    #[serde(alias = "name", alias = "companyName")]
    pub company_name: Option<String>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    #[serde(alias = "changePercent")]
    pub change_percent: Option<f64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    #[serde(alias = "marketState")]
    pub market_state: Option<String>,
}

impl Reshape for StockHeader {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(alias = "shortname", alias = "longname")]
    pub name: Option<String>,
    pub exchange: Option<String>,
    #[serde(alias = "type", alias = "quoteType")]
    pub asset_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    pub query: String,
    #[serde(alias = "quotes", alias = "items")]
    pub results: Vec<SearchHit>,
}

impl Reshape for SearchResults {
    const LIST_FIELD: Option<&'static str> = Some("results");
}

/// One prior exchange in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: String::from("user"),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: String::from("assistant"),
            content: content.into(),
        }
    }
}

/// Request body for the chat endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub history: Vec<ChatTurn>,
    pub config_override: Option<Value>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            history: Vec::new(),
            config_override: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_config_override(mut self, config_override: Value) -> Self {
        self.config_override = Some(config_override);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatReply {
    #[serde(alias = "response", alias = "content")]
    pub answer: String,
    #[serde(alias = "symbol")]
    pub ticker: Option<String>,
    pub sources: Vec<Value>,
}

impl Reshape for ChatReply {}
