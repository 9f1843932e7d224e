use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use eduadmin_core::{ROOT, normalize_path, prefix_matches};

use crate::{PolicyMisconfiguration, Role, RouteAccess, RouteEntry, RouteTable};

/// Authorization outcome for a single navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum AccessVerdict {
    Allow,
    DenyRequireLogin,
    DenyInsufficientRole { redirect_home: String },
}

impl AccessVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessVerdict::Allow)
    }
}

/// Canonical landing page per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleHomes {
    pub admin: String,
    pub teacher: String,
    pub student: String,
    /// Landing page for requests without a role.
    pub fallback: String,
}

impl Default for RoleHomes {
    fn default() -> Self {
        Self {
            admin: "/admin/dashboard".to_string(),
            teacher: "/teacher/dashboard".to_string(),
            student: "/student/dashboard".to_string(),
            fallback: ROOT.to_string(),
        }
    }
}

impl RoleHomes {
    pub fn home_for(&self, role: Option<Role>) -> &str {
        match role {
            Some(Role::Admin) => &self.admin,
            Some(Role::Teacher) => &self.teacher,
            Some(Role::Student) => &self.student,
            None => &self.fallback,
        }
    }

    fn normalized(self) -> Result<Self, PolicyMisconfiguration> {
        Ok(Self {
            admin: normalize_path(&self.admin)?,
            teacher: normalize_path(&self.teacher)?,
            student: normalize_path(&self.student)?,
            fallback: normalize_path(&self.fallback)?,
        })
    }
}

/// Declarative policy source (config file shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub whitelist: Vec<String>,
    pub homes: RoleHomes,
    pub routes: Vec<RouteEntry>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            homes: RoleHomes::default(),
            routes: RouteTable::standard().entries().to_vec(),
        }
    }
}

fn default_whitelist() -> Vec<String> {
    ["/", "/login", "/register", "/forgot-password"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Which rule produced a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "prefix")]
pub enum MatchedRule {
    Whitelist(String),
    Route(String),
    /// No entry matched: "requires login, no role restriction".
    Default,
}

/// Detailed explanation of a verdict (audit/debug logging).
#[derive(Debug, Clone, Serialize)]
pub struct VerdictExplanation {
    pub path: String,
    pub role: Option<Role>,
    pub rule: MatchedRule,
    pub verdict: AccessVerdict,
    pub reason: String,
}

/// Pure access decision engine.
///
/// - No IO
/// - No panics
/// - Built once, validated, shared read-only
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    whitelist: Vec<String>,
    routes: RouteTable,
    homes: RoleHomes,
}

impl AccessPolicy {
    /// Build and validate a policy.
    pub fn new(
        whitelist: impl IntoIterator<Item = impl AsRef<str>>,
        routes: RouteTable,
        homes: RoleHomes,
    ) -> Result<Self, PolicyMisconfiguration> {
        let whitelist = whitelist
            .into_iter()
            .map(|prefix| normalize_path(prefix.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let policy = Self {
            whitelist,
            routes,
            homes: homes.normalized()?,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, PolicyMisconfiguration> {
        let routes = RouteTable::from_entries(config.routes.iter().cloned())?;
        Self::new(&config.whitelist, routes, config.homes.clone())
    }

    /// The console's built-in policy.
    pub fn standard() -> Result<Self, PolicyMisconfiguration> {
        Self::from_config(&PolicyConfig::default())
    }

    fn validate(&self) -> Result<(), PolicyMisconfiguration> {
        for entry in self.routes.entries().iter().filter(|e| e.requires_auth()) {
            if let Some(whitelist) = self.whitelist_prefix(entry.prefix()) {
                return Err(PolicyMisconfiguration::ShadowedByWhitelist {
                    route: entry.prefix().to_string(),
                    whitelist: whitelist.to_string(),
                });
            }
        }

        if !self.is_whitelisted(&self.homes.fallback) {
            return Err(PolicyMisconfiguration::FallbackNotWhitelisted(
                self.homes.fallback.clone(),
            ));
        }

        for role in Role::ALL {
            let home = self.homes.home_for(Some(role));
            if !self.decide(home, Some(role)).is_allowed() {
                return Err(PolicyMisconfiguration::UnreachableHome {
                    role,
                    home: home.to_string(),
                });
            }
        }

        Ok(())
    }

    fn whitelist_prefix(&self, path: &str) -> Option<&str> {
        self.whitelist
            .iter()
            .find(|prefix| prefix_matches(prefix, path))
            .map(String::as_str)
    }

    /// Whitelisted paths are navigable regardless of session state.
    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.whitelist_prefix(&normalized(path)).is_some()
    }

    /// `false` when the path can be reached without logging in.
    pub fn requires_auth(&self, path: &str) -> bool {
        let path = normalized(path);
        if self.whitelist_prefix(&path).is_some() {
            return false;
        }
        self.routes
            .match_entry(&path)
            .is_none_or(RouteEntry::requires_auth)
    }

    pub fn decide(&self, path: &str, role: Option<Role>) -> AccessVerdict {
        self.evaluate(path, role).0
    }

    /// Canonical post-login landing page. Total: unknown/absent roles land
    /// on the fallback (whitelisted) home.
    pub fn home_for(&self, role: Option<Role>) -> &str {
        self.homes.home_for(role)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn whitelist(&self) -> &[String] {
        &self.whitelist
    }

    pub fn explain(&self, path: &str, role: Option<Role>) -> VerdictExplanation {
        let (verdict, rule) = self.evaluate(path, role);
        let who = role.map_or_else(|| "an anonymous visitor".to_string(), |r| format!("role '{r}'"));

        let reason = match (&rule, &verdict) {
            (MatchedRule::Whitelist(prefix), _) => {
                format!("'{path}' is whitelisted by '{prefix}'")
            }
            (MatchedRule::Route(prefix), AccessVerdict::Allow) => {
                format!("route '{prefix}' admits {who}")
            }
            (MatchedRule::Route(prefix), AccessVerdict::DenyRequireLogin) => {
                format!("route '{prefix}' requires login")
            }
            (MatchedRule::Route(prefix), AccessVerdict::DenyInsufficientRole { redirect_home }) => {
                format!("route '{prefix}' does not admit {who}; redirecting to '{redirect_home}'")
            }
            (MatchedRule::Default, AccessVerdict::Allow) => {
                format!("no route matches '{path}'; {who} is logged in")
            }
            (MatchedRule::Default, _) => {
                format!("no route matches '{path}'; login is required by default")
            }
        };

        VerdictExplanation {
            path: path.to_string(),
            role,
            rule,
            verdict,
            reason,
        }
    }

    fn evaluate(&self, path: &str, role: Option<Role>) -> (AccessVerdict, MatchedRule) {
        let path = normalized(path);

        if let Some(prefix) = self.whitelist_prefix(&path) {
            return (AccessVerdict::Allow, MatchedRule::Whitelist(prefix.to_string()));
        }

        let Some(entry) = self.routes.match_entry(&path) else {
            return (login_required(role), MatchedRule::Default);
        };

        let verdict = match entry.access() {
            RouteAccess::Public => AccessVerdict::Allow,
            RouteAccess::Authenticated => login_required(role),
            RouteAccess::Roles(allowed) => match role {
                Some(role) if allowed.contains(&role) => AccessVerdict::Allow,
                Some(role) => AccessVerdict::DenyInsufficientRole {
                    redirect_home: self.home_for(Some(role)).to_string(),
                },
                None => AccessVerdict::DenyRequireLogin,
            },
        };

        (verdict, MatchedRule::Route(entry.prefix().to_string()))
    }
}

fn login_required(role: Option<Role>) -> AccessVerdict {
    if role.is_some() {
        AccessVerdict::Allow
    } else {
        AccessVerdict::DenyRequireLogin
    }
}

// Malformed input is matched verbatim: it can only hit the default rule.
fn normalized(path: &str) -> Cow<'_, str> {
    match normalize_path(path) {
        Ok(p) if p == path => Cow::Borrowed(path),
        Ok(p) => Cow::Owned(p),
        Err(_) => Cow::Borrowed(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AccessPolicy {
        AccessPolicy::standard().unwrap()
    }

    #[test]
    fn whitelist_allows_everyone() {
        let policy = policy();
        for path in ["/", "/login", "/register", "/forgot-password/step-2"] {
            assert_eq!(policy.decide(path, None), AccessVerdict::Allow, "{path}");
            assert_eq!(policy.decide(path, Some(Role::Student)), AccessVerdict::Allow, "{path}");
        }
    }

    #[test]
    fn root_whitelist_does_not_cover_everything() {
        let policy = policy();
        assert!(policy.is_whitelisted("/"));
        assert!(!policy.is_whitelisted("/profile"));
        assert_eq!(policy.decide("/profile", None), AccessVerdict::DenyRequireLogin);
    }

    #[test]
    fn teacher_is_sent_home_from_admin_pages() {
        assert_eq!(
            policy().decide("/admin/users", Some(Role::Teacher)),
            AccessVerdict::DenyInsufficientRole {
                redirect_home: "/teacher/dashboard".to_string()
            }
        );
    }

    #[test]
    fn shared_sections_admit_every_listed_role() {
        let policy = policy();
        assert!(policy.decide("/courses/12", Some(Role::Teacher)).is_allowed());
        assert!(policy.decide("/courses/12", Some(Role::Admin)).is_allowed());
        assert!(!policy.decide("/courses/12", Some(Role::Student)).is_allowed());
    }

    #[test]
    fn unmatched_paths_require_login_only() {
        let policy = policy();
        assert_eq!(policy.decide("/statistics", None), AccessVerdict::DenyRequireLogin);
        assert!(policy.decide("/statistics", Some(Role::Student)).is_allowed());
        assert!(policy.requires_auth("/statistics"));
    }

    #[test]
    fn requires_auth_is_false_for_public_paths() {
        let policy = policy();
        assert!(!policy.requires_auth("/login"));
        assert!(!policy.requires_auth("/"));
        assert!(policy.requires_auth("/admin"));
    }

    #[test]
    fn trailing_slash_does_not_change_the_verdict() {
        let policy = policy();
        assert_eq!(
            policy.decide("/admin/users/", Some(Role::Admin)),
            policy.decide("/admin/users", Some(Role::Admin))
        );
    }

    #[test]
    fn shadowed_protected_route_is_rejected() {
        let routes = RouteTable::builder()
            .route(RouteEntry::authenticated("/login/audit", "LoginAudit"))
            .route(RouteEntry::restricted("/admin", "Admin", [Role::Admin]))
            .route(RouteEntry::restricted("/teacher", "Teacher", [Role::Teacher]))
            .route(RouteEntry::restricted("/student", "Student", [Role::Student]))
            .build()
            .unwrap();

        let err = AccessPolicy::new(default_whitelist(), routes, RoleHomes::default()).unwrap_err();
        assert_eq!(
            err,
            PolicyMisconfiguration::ShadowedByWhitelist {
                route: "/login/audit".to_string(),
                whitelist: "/login".to_string(),
            }
        );
    }

    #[test]
    fn unreachable_home_is_rejected() {
        let homes = RoleHomes {
            student: "/admin/dashboard".to_string(),
            ..RoleHomes::default()
        };
        let err = AccessPolicy::new(default_whitelist(), RouteTable::standard(), homes).unwrap_err();
        assert_eq!(
            err,
            PolicyMisconfiguration::UnreachableHome {
                role: Role::Student,
                home: "/admin/dashboard".to_string(),
            }
        );
    }

    #[test]
    fn fallback_home_must_be_whitelisted() {
        let homes = RoleHomes {
            fallback: "/profile".to_string(),
            ..RoleHomes::default()
        };
        let err = AccessPolicy::new(default_whitelist(), RouteTable::standard(), homes).unwrap_err();
        assert_eq!(err, PolicyMisconfiguration::FallbackNotWhitelisted("/profile".to_string()));
    }

    #[test]
    fn explanation_names_the_rule() {
        let policy = policy();

        let explained = policy.explain("/admin/users", Some(Role::Teacher));
        assert_eq!(explained.rule, MatchedRule::Route("/admin".to_string()));
        assert!(explained.reason.contains("does not admit role 'teacher'"), "{}", explained.reason);

        let explained = policy.explain("/reports", None);
        assert_eq!(explained.rule, MatchedRule::Default);
        assert_eq!(explained.verdict, AccessVerdict::DenyRequireLogin);

        let explained = policy.explain("/login", None);
        assert_eq!(explained.rule, MatchedRule::Whitelist("/login".to_string()));
    }

    #[test]
    fn policy_config_round_trips_through_json() {
        let config = PolicyConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(AccessPolicy::from_config(&parsed).is_ok());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Option<Role>> {
            prop_oneof![
                Just(None),
                Just(Some(Role::Student)),
                Just(Some(Role::Teacher)),
                Just(Some(Role::Admin)),
            ]
        }

        fn segment() -> impl Strategy<Value = String> {
            "[a-z0-9-]{1,12}"
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: everything under a whitelist prefix is allowed for every role.
            #[test]
            fn whitelisted_paths_always_allowed(
                base in prop::sample::select(vec!["/login", "/register", "/forgot-password"]),
                tail in prop::collection::vec(segment(), 0..3),
                role in any_role(),
            ) {
                let path = std::iter::once(base.to_string()).chain(tail).collect::<Vec<_>>().join("/");
                prop_assert_eq!(policy().decide(&path, role), AccessVerdict::Allow);
            }

            /// Property: unrestricted sections need a login and nothing else.
            #[test]
            fn unrestricted_paths_need_only_login(
                base in prop::sample::select(vec!["/profile", "/settings", "/reports"]),
                tail in prop::collection::vec(segment(), 0..3),
                role in prop::sample::select(Role::ALL.to_vec()),
            ) {
                let path = std::iter::once(base.to_string()).chain(tail).collect::<Vec<_>>().join("/");
                let policy = policy();
                prop_assert_eq!(policy.decide(&path, None), AccessVerdict::DenyRequireLogin);
                prop_assert_eq!(policy.decide(&path, Some(role)), AccessVerdict::Allow);
            }

            /// Property: restricted sections admit exactly their role set.
            #[test]
            fn restricted_paths_admit_exactly_their_roles(
                section in prop::sample::select(vec!["/admin", "/courses", "/teacher", "/student"]),
                tail in prop::collection::vec(segment(), 0..3),
                role in prop::sample::select(Role::ALL.to_vec()),
            ) {
                let path = std::iter::once(section.to_string()).chain(tail).collect::<Vec<_>>().join("/");
                let policy = policy();
                let allowed = policy.routes().match_entry(&path).unwrap().allowed_roles().unwrap().clone();

                prop_assert_eq!(policy.decide(&path, None), AccessVerdict::DenyRequireLogin);
                let expected = if allowed.contains(&role) {
                    AccessVerdict::Allow
                } else {
                    AccessVerdict::DenyInsufficientRole {
                        redirect_home: policy.home_for(Some(role)).to_string(),
                    }
                };
                prop_assert_eq!(policy.decide(&path, Some(role)), expected);
            }

            /// Property: home_for is total and deterministic.
            #[test]
            fn home_for_is_deterministic(role in any_role()) {
                let policy = policy();
                let first = policy.home_for(role).to_string();
                prop_assert_eq!(policy.home_for(role), first.as_str());
                if role.is_none() {
                    prop_assert!(policy.is_whitelisted(&first));
                } else {
                    prop_assert!(policy.decide(&first, role).is_allowed());
                }
            }
        }
    }
}
