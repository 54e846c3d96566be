//! Request locations and the field locator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coerce::is_truthy;
use crate::path::FieldPath;
use crate::request::RequestData;

/// A bucket of request-derived data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Params,
    Query,
    Body,
    Headers,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Params,
        Location::Query,
        Location::Body,
        Location::Headers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Params => "params",
            Location::Query => "query",
            Location::Body => "body",
            Location::Headers => "headers",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "params" => Ok(Location::Params),
            "query" => Ok(Location::Query),
            "body" => Ok(Location::Body),
            "headers" => Ok(Location::Headers),
            other => Err(format!("unsupported location: {}", other)),
        }
    }
}

/// Default location used when evaluating a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaLocation {
    /// Locate each field at evaluation time
    Any,
    Fixed(Location),
}

impl From<Location> for SchemaLocation {
    fn from(location: Location) -> Self {
        SchemaLocation::Fixed(location)
    }
}

/// Find the location holding `path`.
///
/// Path params win when the value is present and truthy, then query, then
/// body. Headers are never searched; they must be named explicitly.
pub fn locate(request: &RequestData, path: &FieldPath) -> Option<Location> {
    if is_truthy(path.get(request.get(Location::Params))) {
        return Some(Location::Params);
    }
    if path.has(request.get(Location::Query)) {
        return Some(Location::Query);
    }
    if path.has(request.get(Location::Body)) {
        return Some(Location::Body);
    }
    None
}
