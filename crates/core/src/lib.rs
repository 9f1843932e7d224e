//! `eduadmin-core`: navigation primitives shared by every layer.
//!
//! This crate contains **pure** value types (no storage, no IO).

pub mod error;
pub mod location;
pub mod path;

pub use error::{DomainError, DomainResult};
pub use location::Location;
pub use path::{ROOT, normalize_path, prefix_matches, prefixes_overlap};
