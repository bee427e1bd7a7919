//! # Domain Types
//!
//! Validated request inputs and the stable response schemas the façade
//! hands back to UI code.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated, uppercased ticker |
//! | [`ChartPeriod`] / [`ChartInterval`] | Chart lookback and bar width |
//! | [`UtcDateTime`] | RFC3339 UTC timestamp |
//! | [`Fundamentals`], [`ChartSeries`], [`NewsFeed`], ... | Reshaped payloads |
//! | [`ChatRequest`] | Body for the chat endpoints |

mod chart;
mod schema;
mod symbol;
mod timestamp;

pub use chart::{ChartInterval, ChartPeriod};
pub use schema::{
    AiSummary, ChartPoint, ChartSeries, ChatReply, ChatRequest, ChatTurn, Fundamentals,
    HealthReport, NewsArticle, NewsFeed, Reshape, SearchHit, SearchResults, StockHeader,
    TechnicalAnalysis, TechnicalSignal, TickerTape, TickerTapeItem,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
