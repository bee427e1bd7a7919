//! Logical API requests and their cache keys.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::http_client::HttpMethod;

/// A backend call described independently of base URL, auth and transport.
///
/// Query parameters live in a sorted map, so insertion order never changes
/// [`cache_key`](Self::cache_key) or the rendered URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: HttpMethod,
    path: String,
    query: BTreeMap<String, String>,
    body: Option<Value>,
    skip_cache: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
            skip_cache: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.insert(name.into(), value.to_string());
        self
    }

    pub fn with_query_opt<T: ToString>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.with_query(name, value),
            None => self,
        }
    }

    /// Bypass the cache read and write-through for this call.
    pub fn skip_cache(mut self, skip: bool) -> Self {
        self.skip_cache = self.skip_cache || skip;
        self
    }

    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub const fn skips_cache(&self) -> bool {
        self.skip_cache
    }

    /// Path plus percent-encoded query string.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }

    /// Deterministic identity of the request.
    ///
    /// `serde_json::Value` objects keep their keys sorted, so the body's
    /// serialization is canonical.
    pub fn cache_key(&self) -> String {
        let body = self
            .body
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        format!("{} {}|{body}", self.method.as_str(), self.path_and_query())
    }

    pub(crate) fn body_json(&self) -> Option<String> {
        self.body.as_ref().map(Value::to_string)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_order_does_not_change_the_key() {
        let left = ApiRequest::get("/stock/chart/AAPL")
            .with_query("period", "1y")
            .with_query("interval", "1d");
        let right = ApiRequest::get("/stock/chart/AAPL")
            .with_query("interval", "1d")
            .with_query("period", "1y");

        assert_eq!(left.cache_key(), right.cache_key());
        assert_eq!(left.path_and_query(), "/stock/chart/AAPL?interval=1d&period=1y");
    }

    #[test]
    fn body_key_order_does_not_change_the_key() {
        let left = ApiRequest::post("/stock/chat/AAPL", json!({"question": "q", "history": []}));
        let right = ApiRequest::post("/stock/chat/AAPL", json!({"history": [], "question": "q"}));
        assert_eq!(left.cache_key(), right.cache_key());
    }

    #[test]
    fn method_path_query_and_body_all_distinguish_keys() {
        let base = ApiRequest::get("/stock/news/AAPL").with_query("limit", 5);
        let keys = [
            base.cache_key(),
            ApiRequest::get("/stock/news/MSFT").with_query("limit", 5).cache_key(),
            ApiRequest::get("/stock/news/AAPL").with_query("limit", 6).cache_key(),
            ApiRequest::post("/stock/news/AAPL", json!({})).cache_key(),
        ];
        for (i, left) in keys.iter().enumerate() {
            for right in keys.iter().skip(i + 1) {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let request = ApiRequest::get("/stock/search").with_query("q", "apple inc&co");
        assert_eq!(request.path_and_query(), "/stock/search?q=apple%20inc%26co");
    }

    #[test]
    fn optional_query_is_omitted_when_absent() {
        let request = ApiRequest::get("/stock/ticker-tape/").with_query_opt::<u32>("limit", None);
        assert_eq!(request.path_and_query(), "/stock/ticker-tape/");
    }
}
