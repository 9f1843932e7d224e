//! Event loop around the guard: applies actions and follows redirects.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use eduadmin_auth::Identity;
use eduadmin_core::Location;
use eduadmin_session::SessionError;

use crate::{NavigationAction, NavigationGuard, NavigationRequest, ServiceError};

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("redirect loop: {}", chain.join(" -> "))]
    RedirectLoop { chain: Vec<String> },

    #[error("navigation superseded by a newer attempt")]
    Superseded,

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Current location plus history, driven one navigation at a time.
#[derive(Debug)]
pub struct Navigator {
    guard: Arc<NavigationGuard>,
    history: Vec<Location>,
}

impl Navigator {
    pub fn new(guard: Arc<NavigationGuard>) -> Self {
        Self {
            guard,
            history: Vec::new(),
        }
    }

    pub fn guard(&self) -> &Arc<NavigationGuard> {
        &self.guard
    }

    pub fn current(&self) -> Option<&Location> {
        self.history.last()
    }

    pub fn history(&self) -> &[Location] {
        &self.history
    }

    /// Navigate to `to`, following guard redirects. Returns where the
    /// navigation landed.
    pub async fn navigate(&mut self, to: Location) -> Result<Location, NavigationError> {
        self.run(to, false).await
    }

    pub async fn login(&mut self, token: String, identity: Identity) -> Result<Location, NavigationError> {
        let target = self.guard.complete_login(token, identity)?;
        self.run(target, true).await
    }

    pub async fn logout(&mut self) -> Result<Location, NavigationError> {
        let target = self.guard.logout()?;
        self.run(target, true).await
    }

    /// Returns the new location when the error forced a navigation.
    pub async fn report_service_error(
        &mut self,
        err: &ServiceError,
    ) -> Result<Option<Location>, NavigationError> {
        let next = self.guard.handle_service_error(err, self.current())?;
        match next {
            Some(target) => Ok(Some(self.run(target, true).await?)),
            None => Ok(None),
        }
    }

    async fn run(&mut self, to: Location, mut replace: bool) -> Result<Location, NavigationError> {
        let max_redirects = self.guard.config().max_redirects;
        let mut chain = vec![to.full_path()];
        let mut target = to;
        let mut redirects = 0;

        loop {
            let mut request = NavigationRequest::new(target.clone());
            if let Some(from) = self.current() {
                request = request.with_from(from.clone());
            }

            let decision = self.guard.evaluate(request).await;
            let action = self.guard.commit(decision).ok_or(NavigationError::Superseded)?;

            match action {
                NavigationAction::Proceed => {
                    self.enter(target.clone(), replace);
                    info!(location = %target, redirects, "navigated");
                    return Ok(target);
                }
                NavigationAction::Redirect { to, replace: redirect_replace } => {
                    chain.push(to.full_path());
                    if redirects == max_redirects {
                        return Err(NavigationError::RedirectLoop { chain });
                    }
                    debug!(from = %target, to = %to, "following guard redirect");
                    redirects += 1;
                    replace = redirect_replace;
                    target = to;
                }
            }
        }
    }

    fn enter(&mut self, location: Location, replace: bool) {
        if replace {
            self.history.pop();
        }
        self.history.push(location);
    }
}
