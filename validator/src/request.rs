//! Structured request data the validators read from and sanitizers write to

use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::location::Location;

/// Snapshot of one request's params, query, body and headers
#[derive(Debug, Clone, PartialEq)]
pub struct RequestData {
    params: Value,
    query: Value,
    body: Value,
    headers: Value,
}

impl Default for RequestData {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestData {
    pub fn new() -> Self {
        Self {
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Object(Map::new()),
            headers: Value::Object(Map::new()),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Header names are lower-cased so lookups match HTTP's case folding
    pub fn with_headers(mut self, headers: Value) -> Self {
        self.headers = match headers {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(name, value)| (name.to_ascii_lowercase(), value))
                    .collect(),
            ),
            other => other,
        };
        self
    }

    /// Convert an HTTP header map. A repeated header becomes one value joined
    /// with `", "`; values that are not valid UTF-8 are dropped.
    pub fn with_header_map(self, headers: &HeaderMap) -> Self {
        let mut map = Map::new();
        for name in headers.keys() {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            if !values.is_empty() {
                map.insert(name.as_str().to_string(), Value::String(values.join(", ")));
            }
        }
        self.with_headers(Value::Object(map))
    }

    pub fn get(&self, location: Location) -> &Value {
        match location {
            Location::Params => &self.params,
            Location::Query => &self.query,
            Location::Body => &self.body,
            Location::Headers => &self.headers,
        }
    }

    pub fn get_mut(&mut self, location: Location) -> &mut Value {
        match location {
            Location::Params => &mut self.params,
            Location::Query => &mut self.query,
            Location::Body => &mut self.body,
            Location::Headers => &mut self.headers,
        }
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn headers(&self) -> &Value {
        &self.headers
    }
}
