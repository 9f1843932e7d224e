//! Static route registry.
//!
//! The table is an ordered list of [`RouteEntry`] values, built once at
//! startup and read-only afterwards. Construction validates that no two
//! prefixes are in a prefix relationship, so at most one entry ever matches a
//! concrete path and registration order never decides access.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use eduadmin_core::{normalize_path, prefix_matches, prefixes_overlap};

use crate::{PolicyMisconfiguration, Role};

/// Access requirement attached to a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
    /// Reachable without logging in.
    Public,
    /// Any authenticated role.
    Authenticated,
    /// Only the listed roles.
    Roles(BTreeSet<Role>),
}

impl RouteAccess {
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::Roles(roles.into_iter().collect())
    }
}

/// A single route declaration: prefix → view + access requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    prefix: String,
    view: String,
    access: RouteAccess,
}

impl RouteEntry {
    pub fn new(prefix: impl Into<String>, view: impl Into<String>, access: RouteAccess) -> Self {
        Self {
            prefix: prefix.into(),
            view: view.into(),
            access,
        }
    }

    pub fn public(prefix: impl Into<String>, view: impl Into<String>) -> Self {
        Self::new(prefix, view, RouteAccess::Public)
    }

    pub fn authenticated(prefix: impl Into<String>, view: impl Into<String>) -> Self {
        Self::new(prefix, view, RouteAccess::Authenticated)
    }

    pub fn restricted(
        prefix: impl Into<String>,
        view: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self::new(prefix, view, RouteAccess::roles(roles))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn access(&self) -> &RouteAccess {
        &self.access
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self.access, RouteAccess::Public)
    }

    /// `None` means "any authenticated role" (or no login at all for public routes).
    pub fn allowed_roles(&self) -> Option<&BTreeSet<Role>> {
        match &self.access {
            RouteAccess::Roles(roles) => Some(roles),
            _ => None,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        prefix_matches(&self.prefix, path)
    }
}

/// Validated, immutable route registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Build a table from already-declared entries (e.g. loaded from config).
    pub fn from_entries(
        entries: impl IntoIterator<Item = RouteEntry>,
    ) -> Result<Self, PolicyMisconfiguration> {
        entries
            .into_iter()
            .fold(Self::builder(), RouteTableBuilder::route)
            .build()
    }

    /// The education console's route set.
    pub fn standard() -> Self {
        Self {
            entries: standard_entries(),
        }
    }

    /// Find the entry covering `path` (longest prefix wins; validation
    /// guarantees there is at most one candidate).
    pub fn match_entry(&self, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.matches(path))
            .max_by_key(|entry| entry.prefix.len())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Collects route declarations and validates them on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
}

impl RouteTableBuilder {
    #[must_use]
    pub fn route(mut self, entry: RouteEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> Result<RouteTable, PolicyMisconfiguration> {
        let mut entries = Vec::with_capacity(self.entries.len());

        for mut entry in self.entries {
            entry.prefix = normalize_path(&entry.prefix)?;

            if let RouteAccess::Roles(roles) = &entry.access {
                if roles.is_empty() {
                    return Err(PolicyMisconfiguration::EmptyRoleSet(entry.prefix));
                }
            }

            for existing in &entries {
                check_disjoint(existing, &entry)?;
            }
            entries.push(entry);
        }

        tracing::debug!(routes = entries.len(), "route table validated");
        Ok(RouteTable { entries })
    }
}

fn check_disjoint(a: &RouteEntry, b: &RouteEntry) -> Result<(), PolicyMisconfiguration> {
    if a.prefix == b.prefix {
        return Err(PolicyMisconfiguration::DuplicatePrefix(b.prefix.clone()));
    }
    if prefixes_overlap(&a.prefix, &b.prefix) {
        let (outer, inner) = if a.prefix.len() < b.prefix.len() {
            (&a.prefix, &b.prefix)
        } else {
            (&b.prefix, &a.prefix)
        };
        return Err(PolicyMisconfiguration::OverlappingPrefixes {
            outer: outer.clone(),
            inner: inner.clone(),
        });
    }
    Ok(())
}

fn standard_entries() -> Vec<RouteEntry> {
    vec![
        RouteEntry::public("/", "Home"),
        RouteEntry::public("/login", "Login"),
        RouteEntry::public("/register", "Register"),
        RouteEntry::public("/forgot-password", "ForgotPassword"),
        RouteEntry::restricted("/admin", "AdminConsole", [Role::Admin]),
        RouteEntry::restricted("/courses", "Courses", [Role::Admin, Role::Teacher]),
        RouteEntry::restricted("/teacher", "TeacherWorkspace", [Role::Teacher]),
        RouteEntry::restricted("/student", "StudentWorkspace", [Role::Student]),
        RouteEntry::authenticated("/profile", "Profile"),
        RouteEntry::authenticated("/settings", "Settings"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_passes_validation() {
        let rebuilt = RouteTable::from_entries(standard_entries()).unwrap();
        assert_eq!(rebuilt, RouteTable::standard());
    }

    #[test]
    fn match_entry_uses_segment_prefixes() {
        let table = RouteTable::standard();
        assert_eq!(table.match_entry("/admin/users").unwrap().view(), "AdminConsole");
        assert_eq!(table.match_entry("/courses/7/resources").unwrap().view(), "Courses");
        assert!(table.match_entry("/administration").is_none());
        assert!(table.match_entry("/statistics").is_none());
        assert_eq!(table.match_entry("/").unwrap().view(), "Home");
    }

    #[test]
    fn requires_auth_and_allowed_roles_reflect_access() {
        let table = RouteTable::standard();
        let login = table.match_entry("/login").unwrap();
        assert!(!login.requires_auth());
        assert!(login.allowed_roles().is_none());

        let profile = table.match_entry("/profile").unwrap();
        assert!(profile.requires_auth());
        assert!(profile.allowed_roles().is_none());

        let courses = table.match_entry("/courses").unwrap();
        let roles = courses.allowed_roles().unwrap();
        assert!(roles.contains(&Role::Teacher) && roles.contains(&Role::Admin));
        assert!(!roles.contains(&Role::Student));
    }

    #[test]
    fn overlapping_prefixes_are_rejected() {
        let err = RouteTable::builder()
            .route(RouteEntry::restricted("/teacher/dashboard", "Dash", [Role::Teacher]))
            .route(RouteEntry::restricted("/teacher", "Workspace", [Role::Teacher]))
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            PolicyMisconfiguration::OverlappingPrefixes {
                outer: "/teacher".to_string(),
                inner: "/teacher/dashboard".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_prefixes_are_rejected_after_normalisation() {
        let err = RouteTable::builder()
            .route(RouteEntry::authenticated("/profile", "Profile"))
            .route(RouteEntry::authenticated("/profile/", "ProfileAgain"))
            .build()
            .unwrap_err();
        assert_eq!(err, PolicyMisconfiguration::DuplicatePrefix("/profile".to_string()));
    }

    #[test]
    fn empty_role_set_is_rejected() {
        let err = RouteTable::builder()
            .route(RouteEntry::restricted("/vault", "Vault", []))
            .build()
            .unwrap_err();
        assert!(matches!(err, PolicyMisconfiguration::EmptyRoleSet(p) if p == "/vault"));
    }

    #[test]
    fn relative_prefix_is_rejected() {
        let err = RouteTable::builder()
            .route(RouteEntry::public("login", "Login"))
            .build()
            .unwrap_err();
        assert!(matches!(err, PolicyMisconfiguration::InvalidPrefix(_)));
    }

    #[test]
    fn access_deserializes_from_config_shape() {
        let entry: RouteEntry = serde_json::from_str(
            r#"{"prefix":"/courses","view":"Courses","access":{"roles":["teacher","admin"]}}"#,
        )
        .unwrap();
        assert_eq!(entry, RouteEntry::restricted("/courses", "Courses", [Role::Admin, Role::Teacher]));

        let entry: RouteEntry =
            serde_json::from_str(r#"{"prefix":"/profile","view":"Profile","access":"authenticated"}"#)
                .unwrap();
        assert_eq!(entry.access(), &RouteAccess::Authenticated);
    }
}
