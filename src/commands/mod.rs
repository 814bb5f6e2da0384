//! Command handlers for the drive-ledger CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod edit;
mod init;
mod periods;
mod show;

use crate::api::Mode;
use crate::error::{ErrorType, IntoResult};
use crate::repository::Repository;
use crate::{Config, Result};
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{auth, auth_verify};
pub use edit::edit;
pub use init::init;
pub use periods::periods;
pub use show::show;

/// The output type for a command: a message for the user and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Connects to the store for `mode` and loads the document named in `config`.
async fn load_repository(config: &Config, mode: Mode) -> Result<Repository> {
    let drive = crate::api::drive(config, mode)
        .await
        .context("Unable to connect to Google Drive")
        .pub_result(ErrorType::Auth)?;
    let repository = Repository::load(drive, config.file_id()).await?;
    Ok(repository.with_backup(config.backup()))
}

/// `period` when given, otherwise the most recent period of the document. `None` when the document
/// has no periods at all.
fn select_period(repository: &Repository, period: Option<&str>) -> Option<String> {
    match period {
        Some(p) => Some(p.to_string()),
        None => repository.available_periods().into_iter().next(),
    }
}
