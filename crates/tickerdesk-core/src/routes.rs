//! Endpoint path → cache category routing.
//!
//! The table is declarative and checked once when the client is built:
//! every [`CacheCategory`] must be reachable and no prefix may repeat. A path
//! that matches nothing is an error at request time rather than a silent
//! fallback to some category.

use crate::cache::CacheCategory;
use crate::error::ConfigError;

/// Backend routes, relative to the API prefix.
pub const DEFAULT_ROUTES: &[(&str, CacheCategory)] = &[
    ("/health", CacheCategory::Market),
    ("/stock/ticker-tape", CacheCategory::Market),
    ("/stock/chart/", CacheCategory::Chart),
    ("/stock/technical-analysis/", CacheCategory::Chart),
    ("/stock/fundamentals/", CacheCategory::Fundamentals),
    ("/stock/news/", CacheCategory::News),
    ("/stock/chat/", CacheCategory::Chat),
    ("/stock/ai-summary/", CacheCategory::AiSummary),
    ("/stock/header/", CacheCategory::Header),
    ("/stock/search", CacheCategory::Search),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<(String, CacheCategory)>,
}

impl RouteTable {
    /// Build and validate a route table.
    pub fn new<I, S>(routes: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, CacheCategory)>,
        S: Into<String>,
    {
        let mut table: Vec<(String, CacheCategory)> = Vec::new();
        for (prefix, category) in routes {
            let prefix = prefix.into();
            if table.iter().any(|(existing, _)| *existing == prefix) {
                return Err(ConfigError::DuplicateRoute { prefix });
            }
            table.push((prefix, category));
        }

        for category in CacheCategory::ALL {
            if !table.iter().any(|(_, routed)| *routed == category) {
                return Err(ConfigError::UnroutedCategory {
                    category: category.as_str(),
                });
            }
        }

        // Longest prefix first so the most specific route wins.
        table.sort_by(|(left, _), (right, _)| right.len().cmp(&left.len()));
        Ok(Self { routes: table })
    }

    pub fn standard() -> Result<Self, ConfigError> {
        Self::new(DEFAULT_ROUTES.iter().copied())
    }

    /// Category for an endpoint path (query string excluded).
    pub fn classify(&self, path: &str) -> Option<CacheCategory> {
        self.routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, category)| *category)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_covers_every_category() {
        let table = RouteTable::standard().expect("standard routes are complete");
        assert_eq!(table.len(), DEFAULT_ROUTES.len());
    }

    #[test]
    fn classifies_backend_paths() {
        let table = RouteTable::standard().expect("routes");
        let cases = [
            ("/health", CacheCategory::Market),
            ("/stock/ticker-tape/", CacheCategory::Market),
            ("/stock/chart/AAPL", CacheCategory::Chart),
            ("/stock/technical-analysis/AAPL", CacheCategory::Chart),
            ("/stock/fundamentals/MSFT", CacheCategory::Fundamentals),
            ("/stock/news/TSLA", CacheCategory::News),
            ("/stock/chat/AAPL/stream", CacheCategory::Chat),
            ("/stock/ai-summary/NVDA", CacheCategory::AiSummary),
            ("/stock/header/AMZN", CacheCategory::Header),
            ("/stock/search", CacheCategory::Search),
        ];
        for (path, expected) in cases {
            assert_eq!(table.classify(path), Some(expected), "{path}");
        }
    }

    #[test]
    fn unknown_path_has_no_category() {
        let table = RouteTable::standard().expect("routes");
        assert_eq!(table.classify("/stock/options/AAPL"), None);
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::new(
            DEFAULT_ROUTES
                .iter()
                .copied()
                .chain([("/stock/chart/live/", CacheCategory::Market)]),
        )
        .expect("routes");
        assert_eq!(table.classify("/stock/chart/live/AAPL"), Some(CacheCategory::Market));
        assert_eq!(table.classify("/stock/chart/AAPL"), Some(CacheCategory::Chart));
    }

    #[test]
    fn rejects_incomplete_table() {
        let error = RouteTable::new(
            DEFAULT_ROUTES
                .iter()
                .copied()
                .filter(|(_, category)| *category != CacheCategory::Search),
        )
        .expect_err("search is unrouted");
        assert_eq!(error, ConfigError::UnroutedCategory { category: "search" });
    }

    #[test]
    fn rejects_duplicate_prefix() {
        let error = RouteTable::new(
            DEFAULT_ROUTES
                .iter()
                .copied()
                .chain([("/health", CacheCategory::Header)]),
        )
        .expect_err("duplicate");
        assert!(matches!(error, ConfigError::DuplicateRoute { .. }));
    }
}
