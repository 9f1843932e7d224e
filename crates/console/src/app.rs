//! Wiring and command execution for the interactive console.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use eduadmin_auth::{AccessPolicy, Identity};
use eduadmin_guard::{CachedIdentity, NavigationError, NavigationGuard, Navigator, ServiceError};
use eduadmin_session::{JsonFileStorage, PersistentSessionStore, SessionStore};

use crate::command::{Command, HELP};
use crate::config::ConsoleConfig;

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

#[derive(Debug)]
pub struct Console {
    navigator: Navigator,
}

impl Console {
    /// Build a console backed by the session file under the state dir.
    pub fn open(config: &ConsoleConfig) -> anyhow::Result<Self> {
        let session_file = config.session_file()?;
        let storage = JsonFileStorage::open(session_file.clone())
            .with_context(|| format!("failed to open session file {}", session_file.display()))?;
        info!(path = %session_file.display(), "session storage opened");
        Self::with_store(config, Arc::new(PersistentSessionStore::new(storage)))
    }

    pub fn with_store(config: &ConsoleConfig, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let policy = AccessPolicy::from_config(&config.policy).context("invalid access policy")?;
        info!(
            routes = policy.routes().len(),
            whitelist = ?policy.whitelist(),
            "access policy loaded"
        );

        let guard = NavigationGuard::new(
            Arc::new(policy),
            store,
            Arc::new(CachedIdentity),
            config.guard.clone(),
        )
        .context("invalid guard configuration")?;

        Ok(Self {
            navigator: Navigator::new(Arc::new(guard)),
        })
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub async fn execute(&mut self, command: Command) -> anyhow::Result<Reply> {
        let text = match command {
            Command::Go(to) => landed(self.navigator.navigate(to).await)?,
            Command::Login { username, role } => {
                let token = format!("{role}_token_{}", Utc::now().timestamp_millis());
                landed(self.navigator.login(token, Identity::new(username, role)).await)?
            }
            Command::Logout => landed(self.navigator.logout().await)?,
            Command::Unauthorized => {
                match self
                    .navigator
                    .report_service_error(&ServiceError::Unauthorized)
                    .await?
                {
                    Some(location) => format!("session rejected; now at {location}"),
                    None => "session rejected; staying on the current page".to_string(),
                }
            }
            Command::Whoami => self.whoami()?,
            Command::Explain(location) => {
                let guard = self.navigator.guard();
                let role = guard.store().get()?.role();
                let explanation = guard.policy().explain(location.path(), role);
                format!("{:?}: {}", explanation.verdict, explanation.reason)
            }
            Command::History => {
                let history = self.navigator.history();
                if history.is_empty() {
                    "(no history)".to_string()
                } else {
                    history
                        .iter()
                        .map(|l| l.full_path())
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    fn whoami(&self) -> anyhow::Result<String> {
        let session = self.navigator.guard().store().get()?;
        let who = match session.credentials() {
            Some(c) => format!(
                "{} (since {})",
                c.identity,
                c.authenticated_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => "anonymous".to_string(),
        };
        let pending = session
            .pending_target()
            .map_or_else(|| "none".to_string(), |t| t.full_path());
        let current = self
            .navigator
            .current()
            .map_or_else(|| "-".to_string(), |l| l.full_path());
        Ok(format!("{who}; at {current}; pending target: {pending}"))
    }
}

fn landed(result: Result<eduadmin_core::Location, NavigationError>) -> anyhow::Result<String> {
    Ok(format!("now at {}", result?))
}
