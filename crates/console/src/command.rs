//! Console command parsing.

use thiserror::Error;

use eduadmin_auth::Role;
use eduadmin_core::{DomainError, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(Location),
    Login { username: String, role: Role },
    Logout,
    /// Simulate a collaborator rejecting the session token (HTTP 401).
    Unauthorized,
    Whoami,
    Explain(Location),
    History,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Invalid(#[from] DomainError),
}

pub const HELP: &str = "\
commands:
  go <path>               navigate (e.g. go /admin/users?page=2)
  login <user> <role>     complete a login (role: admin, teacher, student)
  logout                  clear the session
  unauthorized            simulate a 401 from a backend service
  whoami                  show the session
  explain <path>          show how the policy decides <path>
  history                 list visited locations
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("go", [path]) => Command::Go(Location::parse(path)?),
            ("go", _) => return Err(CommandError::Usage("go <path>")),
            ("login", [username, role]) => Command::Login {
                username: (*username).to_string(),
                role: role.parse()?,
            },
            ("login", _) => return Err(CommandError::Usage("login <user> <role>")),
            ("logout", []) => Command::Logout,
            ("unauthorized", []) => Command::Unauthorized,
            ("whoami", []) => Command::Whoami,
            ("explain", [path]) => Command::Explain(Location::parse(path)?),
            ("explain", _) => return Err(CommandError::Usage("explain <path>")),
            ("history", []) => Command::History,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}
