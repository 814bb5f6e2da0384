//! Authentication command handlers for OAuth flow.
//!
//! This module implements the CLI commands for:
//! - `drive-ledger auth` - Initial OAuth consent flow
//! - `drive-ledger auth --verify` - Verify and refresh authentication

use crate::api::TokenProvider;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;

/// Handles the `drive-ledger auth` command - runs the OAuth consent flow.
///
/// This is the ONLY command that asks the user to open a browser for OAuth authentication. It
/// prints the consent URL, waits for Google to redirect back to a local callback server and saves
/// the tokens to `token.json`.
///
/// # Errors
/// Returns an error if the OAuth flow fails or if `client_secret.json` is missing.
pub async fn auth(config: &Config) -> Result<Out<()>> {
    let _ = TokenProvider::initialize(config.client_secret_path(), config.token_path())
        .await
        .pub_result(ErrorType::Auth)?;
    Ok("Authorization complete".into())
}

/// Handles the `drive-ledger auth --verify` command - verifies authentication.
///
/// This command NEVER starts the consent flow. It checks that the saved tokens exist, have the
/// required scopes, and can be refreshed. If any of that fails it tells the user to run
/// `drive-ledger auth`.
pub async fn auth_verify(config: &Config) -> Result<Out<()>> {
    let mut token_provider = TokenProvider::load(config.client_secret_path(), config.token_path())
        .await
        .context(
            "Unable to use the existing tokens found in the token JSON file. \n\n\
            You should run 'drive-ledger auth' (without the --verify flag).",
        )
        .pub_result(ErrorType::Auth)?;
    token_provider
        .refresh()
        .await
        .context("Unable to refresh the token")
        .pub_result(ErrorType::Auth)?;
    Ok("Your OAuth token is valid!".into())
}
