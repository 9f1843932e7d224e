//! Console configuration (JSON file, optional).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use eduadmin_auth::PolicyConfig;
use eduadmin_guard::GuardConfig;
use eduadmin_observability::LogConfig;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "EDUADMIN_CONFIG";

const APP_DIR: &str = "eduadmin-console";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub guard: GuardConfig,
    pub policy: PolicyConfig,
    /// Where the session file lives. Defaults to the OS data directory.
    pub state_dir: Option<PathBuf>,
    pub log: LogConfig,
}

impl ConsoleConfig {
    /// Pick the config file: explicit flag first, then the environment.
    pub fn locate(flag: Option<PathBuf>, env: Option<OsString>) -> Option<PathBuf> {
        flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
    }

    /// Load from `path`, or fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Resolve the state directory: `{state_dir}` or `{app_data_dir}/eduadmin-console`.
    pub fn state_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }

        let base = dirs::data_dir()
            .or_else(|| {
                dirs::home_dir().map(|mut h| {
                    h.push(".local");
                    h.push("share");
                    h
                })
            })
            .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;
        Ok(base.join(APP_DIR))
    }

    pub fn session_file(&self) -> anyhow::Result<PathBuf> {
        Ok(self.state_dir()?.join(SESSION_FILE))
    }
}
