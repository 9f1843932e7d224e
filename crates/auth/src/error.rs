use thiserror::Error;

use eduadmin_core::DomainError;

use crate::Role;

/// Fatal configuration error detected while building the route table or the
/// access policy.
///
/// None of these are recoverable: an application that hits one must not
/// serve any protected route.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyMisconfiguration {
    #[error("invalid prefix: {0}")]
    InvalidPrefix(#[from] DomainError),

    #[error("prefix '{0}' is registered more than once")]
    DuplicatePrefix(String),

    #[error("ambiguous route prefixes '{outer}' and '{inner}': one covers the other")]
    OverlappingPrefixes { outer: String, inner: String },

    #[error("route '{0}' restricts access to an empty role set")]
    EmptyRoleSet(String),

    #[error("protected route '{route}' is shadowed by whitelist prefix '{whitelist}'")]
    ShadowedByWhitelist { route: String, whitelist: String },

    #[error("home '{home}' of role '{role}' is not reachable by that role")]
    UnreachableHome { role: Role, home: String },

    #[error("fallback home '{0}' must be whitelisted")]
    FallbackNotWhitelisted(String),
}
