//! `eduadmin-auth`: pure navigation authorization (roles, routes, policy).
//!
//! This crate is intentionally decoupled from storage and from any
//! navigation library.

pub mod error;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod route_table;

pub use error::PolicyMisconfiguration;
pub use policy::{
    AccessPolicy, AccessVerdict, MatchedRule, PolicyConfig, RoleHomes, VerdictExplanation,
};
pub use principal::Identity;
pub use roles::Role;
pub use route_table::{RouteAccess, RouteEntry, RouteTable, RouteTableBuilder};
