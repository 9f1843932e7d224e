//! Path normalisation and segment-aware prefix matching.
//!
//! Every permission rule in the console is keyed by a path prefix. Matching
//! is done on whole segments so that `/users` covers `/users/42` but not
//! `/users2`. The root prefix `/` is special: it only ever matches the root
//! itself, otherwise it would cover every path in the application.

use crate::error::{DomainError, DomainResult};

/// The application root.
pub const ROOT: &str = "/";

/// Normalise an in-app path.
///
/// - must be non-empty and absolute (leading `/`)
/// - must not carry a query or fragment
/// - trailing slashes are removed (except for the root)
pub fn normalize_path(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_location(raw, "path is empty"));
    }
    if !trimmed.starts_with('/') {
        return Err(DomainError::invalid_location(raw, "path must start with '/'"));
    }
    if trimmed.contains(['?', '#']) {
        return Err(DomainError::invalid_location(
            raw,
            "path must not contain a query or fragment",
        ));
    }

    let without_trailing = trimmed.trim_end_matches('/');
    if without_trailing.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(without_trailing.to_string())
    }
}

/// Returns `true` if `prefix` covers `path` on a segment boundary.
///
/// Both arguments are expected to be normalised.
pub fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == ROOT {
        return path == ROOT;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Returns `true` if either prefix covers the other (including equality).
pub fn prefixes_overlap(a: &str, b: &str) -> bool {
    prefix_matches(a, b) || prefix_matches(b, a)
}
