//! `eduadmin-console`: interactive shell driving the navigation guard.

pub mod app;
pub mod command;
pub mod config;

pub use app::{Console, Reply};
pub use command::{Command, CommandError};
pub use config::{CONFIG_ENV, ConsoleConfig};
