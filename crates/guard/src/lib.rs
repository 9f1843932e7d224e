//! `eduadmin-guard`: navigation guard for the admin console.
//!
//! Runs before every route change: reads the session, consults the access
//! policy and tells the navigation layer to proceed or redirect. Also owns
//! the login/logout handlers and the reaction to rejected tokens.

pub mod config;
pub mod guard;
pub mod identity;
pub mod navigator;
pub mod service;

pub use config::{GuardConfig, GuardConfigError};
pub use guard::{
    Decision, GuardFailure, GuardOutcome, NavigationAction, NavigationGuard, NavigationId,
    NavigationRequest, SessionEffect,
};
pub use identity::{CachedIdentity, IdentityError, IdentityProvider};
pub use navigator::{NavigationError, Navigator};
pub use service::{ServiceError, ServiceResult};
