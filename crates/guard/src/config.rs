//! Guard configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use eduadmin_auth::AccessPolicy;
use eduadmin_core::{DomainError, normalize_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Where unauthenticated requests are sent.
    pub login_path: String,

    /// Login, registration and password-recovery pages. Authenticated users
    /// visiting one of these are sent to their role home.
    pub auth_entry_paths: Vec<String>,

    /// Query parameter carrying the attempted full path on the login redirect.
    pub redirect_param: String,

    /// Upper bound for the identity lookup; `None` waits indefinitely.
    pub identity_timeout_ms: Option<u64>,

    /// Redirect hops the navigator follows before reporting a loop.
    pub max_redirects: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            auth_entry_paths: vec![
                "/login".to_string(),
                "/register".to_string(),
                "/forgot-password".to_string(),
            ],
            redirect_param: "redirect".to_string(),
            identity_timeout_ms: Some(5_000),
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardConfigError {
    #[error("invalid guard path: {0}")]
    InvalidPath(#[from] DomainError),

    #[error("login path '{0}' must be whitelisted")]
    LoginNotWhitelisted(String),

    #[error("auth entry page '{0}' must be whitelisted")]
    EntryNotWhitelisted(String),

    #[error("max_redirects must be at least 1")]
    NoRedirectsAllowed,
}

impl GuardConfig {
    pub fn identity_timeout(&self) -> Option<Duration> {
        self.identity_timeout_ms.map(Duration::from_millis)
    }

    /// Normalise paths and check them against the policy.
    ///
    /// The login page itself is always an auth entry page.
    pub fn validated(mut self, policy: &AccessPolicy) -> Result<Self, GuardConfigError> {
        self.login_path = normalize_path(&self.login_path)?;
        if !policy.is_whitelisted(&self.login_path) {
            return Err(GuardConfigError::LoginNotWhitelisted(self.login_path));
        }

        let mut entries = Vec::with_capacity(self.auth_entry_paths.len() + 1);
        for raw in &self.auth_entry_paths {
            let path = normalize_path(raw)?;
            if !policy.is_whitelisted(&path) {
                return Err(GuardConfigError::EntryNotWhitelisted(path));
            }
            if !entries.contains(&path) {
                entries.push(path);
            }
        }
        if !entries.contains(&self.login_path) {
            entries.push(self.login_path.clone());
        }
        self.auth_entry_paths = entries;

        if self.max_redirects == 0 {
            return Err(GuardConfigError::NoRedirectsAllowed);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_against_standard_policy() {
        let policy = AccessPolicy::standard().unwrap();
        let config = GuardConfig::default().validated(&policy).unwrap();
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.auth_entry_paths.len(), 3);
        assert_eq!(config.identity_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn protected_login_page_is_rejected() {
        let policy = AccessPolicy::standard().unwrap();
        let config = GuardConfig {
            login_path: "/profile/login".to_string(),
            ..GuardConfig::default()
        };
        assert_eq!(
            config.validated(&policy).unwrap_err(),
            GuardConfigError::LoginNotWhitelisted("/profile/login".to_string())
        );
    }

    #[test]
    fn login_page_is_always_an_entry_page() {
        let policy = AccessPolicy::standard().unwrap();
        let config = GuardConfig {
            auth_entry_paths: vec!["/register/".to_string()],
            ..GuardConfig::default()
        }
        .validated(&policy)
        .unwrap();
        assert_eq!(config.auth_entry_paths, vec!["/register", "/login"]);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: GuardConfig = serde_json::from_str(r#"{"max_redirects": 3}"#).unwrap();
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.login_path, "/login");
    }
}
