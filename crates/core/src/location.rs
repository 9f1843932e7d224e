//! In-app navigation target (path + query).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::path::normalize_path;

/// A navigation target inside the console.
///
/// The path is always normalised (see [`normalize_path`]). The query is kept
/// as an ordered map so that rendering is deterministic. Values are stored
/// verbatim; no percent-decoding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    query: BTreeMap<String, String>,
}

impl Location {
    /// Build a location from a path without a query.
    pub fn new(path: &str) -> DomainResult<Self> {
        Ok(Self {
            path: normalize_path(path)?,
            query: BTreeMap::new(),
        })
    }

    /// Parse a full path such as `/admin/users?page=2&sort=name`.
    pub fn parse(full_path: &str) -> DomainResult<Self> {
        let full_path = full_path.trim();
        let without_fragment = full_path.split('#').next().unwrap_or_default();
        let (path, raw_query) = match without_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_fragment, None),
        };

        let mut location = Self::new(path)?;
        if let Some(raw_query) = raw_query {
            for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                if key.is_empty() {
                    return Err(DomainError::invalid_location(
                        full_path,
                        "query parameter without a name",
                    ));
                }
                location.query.insert(key.to_string(), value.to_string());
            }
        }
        Ok(location)
    }

    /// Return a copy with one query parameter set.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Render `path?k=v&...` (just the path when the query is empty).
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.full_path())
    }
}

impl core::str::FromStr for Location {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_path_and_query() {
        let loc = Location::parse("/admin/users/?page=2&sort=name").unwrap();
        assert_eq!(loc.path(), "/admin/users");
        assert_eq!(loc.query_param("page"), Some("2"));
        assert_eq!(loc.query_param("sort"), Some("name"));
    }

    #[test]
    fn full_path_is_deterministic() {
        let loc = Location::new("/courses")
            .unwrap()
            .with_query("z", "1")
            .with_query("a", "2");
        assert_eq!(loc.full_path(), "/courses?a=2&z=1");
        assert_eq!(Location::parse(&loc.full_path()).unwrap(), loc);
    }

    #[test]
    fn fragment_is_dropped() {
        let loc = Location::parse("/profile#avatar").unwrap();
        assert_eq!(loc.full_path(), "/profile");
    }

    #[test]
    fn nameless_query_parameter_is_rejected() {
        assert!(Location::parse("/profile?=x").is_err());
        assert!(Location::parse("relative/path").is_err());
    }

    #[test]
    fn empty_query_is_not_serialized() {
        let json = serde_json::to_string(&Location::new("/login").unwrap()).unwrap();
        assert_eq!(json, r#"{"path":"/login"}"#);
    }
}
