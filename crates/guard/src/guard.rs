//! Per-attempt navigation guard.
//!
//! `evaluate` is effect-free: it reads the session, asks the policy and
//! returns a [`Decision`]. `commit` applies the decision's session effect
//! and yields the navigation action. A decision whose attempt has been
//! superseded by a newer `evaluate` is dropped on commit without touching
//! the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use eduadmin_auth::{AccessPolicy, AccessVerdict, Identity, Role};
use eduadmin_core::{DomainError, Location};
use eduadmin_session::{Session, SessionError, SessionStore};

use crate::{GuardConfig, GuardConfigError, IdentityError, IdentityProvider, ServiceError};

/// Monotonic attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NavigationId(u64);

impl NavigationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub to: Location,
    pub from: Option<Location>,
}

impl NavigationRequest {
    pub fn new(to: Location) -> Self {
        Self { to, from: None }
    }

    #[must_use]
    pub fn with_from(mut self, from: Location) -> Self {
        self.from = Some(from);
        self
    }
}

/// What the navigation library should do with the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    Proceed,
    /// Abandon the attempt and navigate to `to` instead. With `replace` the
    /// current history entry is replaced rather than pushed.
    Redirect { to: Location, replace: bool },
}

#[derive(Debug, Error)]
pub enum GuardFailure {
    #[error("session read failed: {0}")]
    SessionRead(#[from] SessionError),

    #[error("identity lookup failed: {0}")]
    IdentityLookup(#[from] IdentityError),

    #[error("invalid redirect target: {0}")]
    InvalidRedirect(#[from] DomainError),
}

/// Terminal state of the per-attempt state machine.
#[derive(Debug)]
pub enum GuardOutcome {
    Proceeding,
    RedirectingToLogin,
    RedirectingHome,
    /// Resolved by the fail-closed rule.
    Failed(GuardFailure),
}

/// Session mutation deferred until commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    SavePendingTarget(Location),
    /// Redirect to the pending target if one is saved, else to `fallback`.
    ConsumePendingTarget { fallback: Location },
}

/// Uncommitted guard result.
#[derive(Debug)]
pub struct Decision {
    pub id: NavigationId,
    pub outcome: GuardOutcome,
    pub action: NavigationAction,
    pub effect: Option<SessionEffect>,
}

#[derive(Debug)]
struct HomeLocations {
    admin: Location,
    teacher: Location,
    student: Location,
    fallback: Location,
}

impl HomeLocations {
    fn resolve(policy: &AccessPolicy) -> Result<Self, GuardConfigError> {
        Ok(Self {
            admin: Location::new(policy.home_for(Some(Role::Admin)))?,
            teacher: Location::new(policy.home_for(Some(Role::Teacher)))?,
            student: Location::new(policy.home_for(Some(Role::Student)))?,
            fallback: Location::new(policy.home_for(None))?,
        })
    }

    fn get(&self, role: Option<Role>) -> &Location {
        match role {
            Some(Role::Admin) => &self.admin,
            Some(Role::Teacher) => &self.teacher,
            Some(Role::Student) => &self.student,
            None => &self.fallback,
        }
    }
}

pub struct NavigationGuard {
    policy: Arc<AccessPolicy>,
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    config: GuardConfig,
    login: Location,
    homes: HomeLocations,
    latest: AtomicU64,
}

impl core::fmt::Debug for NavigationGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NavigationGuard")
            .field("config", &self.config)
            .field("latest", &self.latest)
            .finish_non_exhaustive()
    }
}

impl NavigationGuard {
    pub fn new(
        policy: Arc<AccessPolicy>,
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        config: GuardConfig,
    ) -> Result<Self, GuardConfigError> {
        let config = config.validated(&policy)?;
        let login = Location::new(&config.login_path)?;
        let homes = HomeLocations::resolve(&policy)?;

        Ok(Self {
            policy,
            store,
            identity,
            config,
            login,
            homes,
            latest: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn login_location(&self) -> &Location {
        &self.login
    }

    pub fn home_location(&self, role: Option<Role>) -> &Location {
        self.homes.get(role)
    }

    pub fn is_auth_entry(&self, path: &str) -> bool {
        self.config.auth_entry_paths.iter().any(|p| p == path)
    }

    /// Start a new attempt, superseding any decision still in flight.
    fn begin(&self) -> NavigationId {
        NavigationId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_current(&self, id: NavigationId) -> bool {
        self.latest.load(Ordering::SeqCst) == id.0
    }

    /// Decide what to do with a navigation attempt. Never mutates the store.
    pub async fn evaluate(&self, request: NavigationRequest) -> Decision {
        let id = self.begin();
        let (outcome, action, effect) = match self.resolve(&request).await {
            Ok(planned) => planned,
            Err(failure) => self.fail_closed(&request.to, failure),
        };
        Decision {
            id,
            outcome,
            action,
            effect,
        }
    }

    async fn resolve(
        &self,
        request: &NavigationRequest,
    ) -> Result<(GuardOutcome, NavigationAction, Option<SessionEffect>), GuardFailure> {
        let to = &request.to;
        let session = self.store.get()?;
        let on_auth_entry = self.is_auth_entry(to.path());

        // A stored token only counts once the identity behind it resolves.
        let identity = if session.is_authenticated()
            && (on_auth_entry || self.policy.requires_auth(to.path()))
        {
            self.lookup_identity(&session).await?
        } else {
            session.identity().cloned()
        };
        let role = identity.as_ref().map(|i| i.role);

        if let Some(role) = role.filter(|_| on_auth_entry) {
            let home = self.homes.get(Some(role)).clone();
            let effect = (to.path() == self.login.path())
                .then(|| SessionEffect::ConsumePendingTarget { fallback: home.clone() });
            debug!(path = %to, home = %home, "authenticated user on auth entry page");
            return Ok((
                GuardOutcome::RedirectingHome,
                NavigationAction::Redirect { to: home, replace: true },
                effect,
            ));
        }

        let verdict = self.policy.decide(to.path(), role);
        debug!(path = %to, role = ?role, verdict = ?verdict, "navigation verdict");

        Ok(match verdict {
            AccessVerdict::Allow => (GuardOutcome::Proceeding, NavigationAction::Proceed, None),
            AccessVerdict::DenyRequireLogin => (
                GuardOutcome::RedirectingToLogin,
                self.login_redirect(to),
                Some(SessionEffect::SavePendingTarget(to.clone())),
            ),
            AccessVerdict::DenyInsufficientRole { redirect_home } => {
                let username = identity.as_ref().map_or("", |i| i.username.as_str());
                warn!(
                    username = %username,
                    role = ?role,
                    path = %to,
                    home = %redirect_home,
                    "insufficient role for navigation"
                );
                (
                    GuardOutcome::RedirectingHome,
                    NavigationAction::Redirect {
                        to: Location::new(&redirect_home)?,
                        replace: true,
                    },
                    None,
                )
            }
        })
    }

    async fn lookup_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError> {
        let lookup = self.identity.current_identity(session);
        match self.config.identity_timeout() {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .map_err(|_| IdentityError::Timeout(limit))?,
            None => lookup.await,
        }
    }

    fn fail_closed(
        &self,
        to: &Location,
        failure: GuardFailure,
    ) -> (GuardOutcome, NavigationAction, Option<SessionEffect>) {
        let whitelisted = self.policy.is_whitelisted(to.path());
        error!(error = %failure, path = %to, whitelisted, "navigation guard failed");

        if whitelisted {
            return (GuardOutcome::Failed(failure), NavigationAction::Proceed, None);
        }

        // The store is still usable when only the identity lookup failed.
        if matches!(failure, GuardFailure::IdentityLookup(_)) {
            return (
                GuardOutcome::Failed(failure),
                self.login_redirect(to),
                Some(SessionEffect::SavePendingTarget(to.clone())),
            );
        }

        let action = NavigationAction::Redirect {
            to: self.login.clone(),
            replace: false,
        };
        (GuardOutcome::Failed(failure), action, None)
    }

    fn login_redirect(&self, to: &Location) -> NavigationAction {
        NavigationAction::Redirect {
            to: self
                .login
                .clone()
                .with_query(self.config.redirect_param.as_str(), to.full_path()),
            replace: false,
        }
    }

    /// Apply a decision. Returns `None` when the attempt was superseded.
    pub fn commit(&self, decision: Decision) -> Option<NavigationAction> {
        if !self.is_current(decision.id) {
            debug!(attempt = decision.id.get(), "discarding superseded navigation decision");
            return None;
        }

        let action = match decision.effect {
            None => decision.action,
            Some(SessionEffect::SavePendingTarget(target)) => {
                if let Err(e) = self.store.save_pending_target(target.clone()) {
                    error!(error = %e, target = %target, "failed to save pending target");
                }
                decision.action
            }
            Some(SessionEffect::ConsumePendingTarget { fallback }) => NavigationAction::Redirect {
                to: self.take_pending_or(fallback),
                replace: true,
            },
        };
        Some(action)
    }

    /// Evaluate and immediately commit.
    pub async fn navigate(&self, request: NavigationRequest) -> Option<NavigationAction> {
        let decision = self.evaluate(request).await;
        self.commit(decision)
    }

    fn take_pending_or(&self, fallback: Location) -> Location {
        match self.store.take_pending_target() {
            Ok(Some(target)) => target,
            Ok(None) => fallback,
            Err(e) => {
                error!(error = %e, "failed to consume pending target");
                fallback
            }
        }
    }

    /// Login-completion handler: persist the session, then return where to
    /// go next (the pending target, or the role home).
    pub fn complete_login(&self, token: String, identity: Identity) -> Result<Location, SessionError> {
        self.begin();
        let home = self.homes.get(Some(identity.role)).clone();
        let username = identity.username.clone();

        self.store.set_authenticated(token, identity)?;
        let target = self.take_pending_or(home);
        info!(username = %username, target = %target, "login completed");
        Ok(target)
    }

    /// Clear the session and return the login page.
    pub fn logout(&self) -> Result<Location, SessionError> {
        self.begin();
        self.store.clear()?;
        info!("logged out");
        Ok(self.login.clone())
    }

    /// React to a collaborator failure.
    ///
    /// A 401 clears the session and sends the user to the login page unless
    /// they are already on an auth entry page. Anything else causes no
    /// navigation.
    pub fn handle_service_error(
        &self,
        err: &ServiceError,
        current: Option<&Location>,
    ) -> Result<Option<Location>, SessionError> {
        if !err.is_unauthorized() {
            debug!(error = %err, "service error needs no navigation");
            return Ok(None);
        }

        self.begin();
        self.store.clear()?;
        warn!(current = ?current.map(Location::full_path), "session rejected by service; cleared");

        if current.is_some_and(|loc| self.is_auth_entry(loc.path())) {
            return Ok(None);
        }
        Ok(Some(self.login.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CachedIdentity;
    use eduadmin_session::InMemorySessionStore;

    fn loc(path: &str) -> Location {
        Location::parse(path).unwrap()
    }

    fn guard() -> (NavigationGuard, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::in_memory());
        let guard = NavigationGuard::new(
            Arc::new(AccessPolicy::standard().unwrap()),
            store.clone(),
            Arc::new(CachedIdentity),
            GuardConfig::default(),
        )
        .unwrap();
        (guard, store)
    }

    #[tokio::test]
    async fn evaluate_does_not_touch_the_store() {
        let (guard, store) = guard();
        let decision = guard.evaluate(NavigationRequest::new(loc("/admin/users"))).await;

        assert!(matches!(decision.outcome, GuardOutcome::RedirectingToLogin));
        assert_eq!(
            decision.effect,
            Some(SessionEffect::SavePendingTarget(loc("/admin/users")))
        );
        assert_eq!(store.get().unwrap().pending_target(), None);
    }

    #[tokio::test]
    async fn login_redirect_carries_attempted_path() {
        let (guard, _) = guard();
        let action = guard
            .navigate(NavigationRequest::new(loc("/admin/users?page=2")))
            .await
            .unwrap();
        let NavigationAction::Redirect { to, replace } = action else {
            panic!("expected redirect");
        };
        assert_eq!(to.path(), "/login");
        assert_eq!(to.query_param("redirect"), Some("/admin/users?page=2"));
        assert!(!replace);
    }

    #[tokio::test]
    async fn whitelisted_paths_proceed_anonymously() {
        let (guard, _) = guard();
        for path in ["/", "/login", "/register", "/forgot-password"] {
            let action = guard.navigate(NavigationRequest::new(loc(path))).await;
            assert_eq!(action, Some(NavigationAction::Proceed), "{path}");
        }
    }

    #[tokio::test]
    async fn register_page_sends_authenticated_user_home_without_consuming() {
        let (guard, store) = guard();
        store.save_pending_target(loc("/profile")).unwrap();
        store
            .set_authenticated("t".to_string(), Identity::new("lin", Role::Teacher))
            .unwrap();

        let action = guard.navigate(NavigationRequest::new(loc("/register"))).await;
        assert_eq!(
            action,
            Some(NavigationAction::Redirect {
                to: loc("/teacher/dashboard"),
                replace: true
            })
        );
        assert_eq!(store.get().unwrap().pending_target(), Some(&loc("/profile")));
    }

    #[tokio::test]
    async fn insufficient_role_follows_configured_home() {
        let config = eduadmin_auth::PolicyConfig {
            homes: eduadmin_auth::RoleHomes {
                teacher: "/courses".to_string(),
                ..eduadmin_auth::RoleHomes::default()
            },
            ..eduadmin_auth::PolicyConfig::default()
        };
        let store = Arc::new(InMemorySessionStore::in_memory());
        let guard = NavigationGuard::new(
            Arc::new(AccessPolicy::from_config(&config).unwrap()),
            store.clone(),
            Arc::new(CachedIdentity),
            GuardConfig::default(),
        )
        .unwrap();
        store
            .set_authenticated("t".to_string(), Identity::new("lin", Role::Teacher))
            .unwrap();

        let action = guard.navigate(NavigationRequest::new(loc("/admin/users"))).await;
        assert_eq!(
            action,
            Some(NavigationAction::Redirect {
                to: loc("/courses"),
                replace: true
            })
        );
    }

    #[test]
    fn unrelated_service_errors_keep_the_session() {
        let (guard, store) = guard();
        store
            .set_authenticated("t".to_string(), Identity::new("a", Role::Admin))
            .unwrap();

        let next = guard
            .handle_service_error(&ServiceError::from_status(500, "boom"), None)
            .unwrap();
        assert_eq!(next, None);
        assert!(store.get().unwrap().is_authenticated());
    }

    #[test]
    fn unauthorized_on_login_page_clears_without_redirect() {
        let (guard, store) = guard();
        store
            .set_authenticated("t".to_string(), Identity::new("a", Role::Admin))
            .unwrap();

        let next = guard
            .handle_service_error(&ServiceError::Unauthorized, Some(&loc("/login")))
            .unwrap();
        assert_eq!(next, None);
        assert!(!store.get().unwrap().is_authenticated());
    }

    #[test]
    fn logout_clears_and_returns_login() {
        let (guard, store) = guard();
        store
            .set_authenticated("t".to_string(), Identity::new("a", Role::Admin))
            .unwrap();
        assert_eq!(guard.logout().unwrap(), loc("/login"));
        assert!(!store.get().unwrap().is_authenticated());
    }
}
