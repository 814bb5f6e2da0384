//! The remote document store and its implementations.
//!
//! The `Drive` trait is the only thing the rest of the program knows about remote storage: download
//! a whole document, ask for its current version, and replace a whole document. `GoogleDrive` talks
//! to the Google Drive v3 API. `TestDrive` keeps documents in memory so that the whole program can
//! run without Google.

mod files;
mod google_drive;
mod oauth;
mod test_drive;

use crate::error::Res;
use crate::Config;
use google_drive::GoogleDrive;
use std::fmt::Debug;

pub(crate) use oauth::TokenProvider;
pub use test_drive::{TestDrive, TestDriveState};

/// OAuth scope for reading and replacing files in Google Drive.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/drive"];

/// When this environment variable is set to a non-empty value the program uses `TestDrive`.
pub const TEST_MODE_ENV: &str = "DRIVE_LEDGER_IN_TEST_MODE";

/// The full content of a remote document along with the version it was read at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub bytes: Vec<u8>,
    /// An opaque token that changes every time the document is replaced. `None` when the store
    /// does not report versions.
    pub version: Option<String>,
}

/// A store that holds whole documents addressed by a file id.
#[async_trait::async_trait]
pub trait Drive: Debug + Send {
    /// Downloads the full current content of the document.
    async fn download(&mut self, file_id: &str) -> Res<Vec<u8>>;

    /// Downloads the document along with its version. The version is read before the content, so
    /// an upload that lands between the two requests leaves us holding an older version than the
    /// content and the next save reports a conflict instead of overwriting it.
    async fn fetch(&mut self, file_id: &str) -> Res<Document> {
        let version = self.version(file_id).await?;
        let bytes = self.download(file_id).await?;
        Ok(Document { bytes, version })
    }

    /// Returns the current version token of the document.
    async fn version(&mut self, file_id: &str) -> Res<Option<String>>;

    /// Overwrites the whole document with `bytes` and returns the new version token.
    async fn replace(&mut self, file_id: &str, bytes: &[u8]) -> Res<Option<String>>;
}

/// Which `Drive` implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Google,
    Test,
}

impl Mode {
    /// `Mode::Test` when `DRIVE_LEDGER_IN_TEST_MODE` is set and non-empty, otherwise `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Drive` for `mode`. In `Mode::Google` this loads the OAuth token and fails when it
/// is missing.
pub(crate) async fn drive(config: &Config, mode: Mode) -> Res<Box<dyn Drive + Send>> {
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(config.client_secret_path(), config.token_path()).await?;
            Ok(Box::new(GoogleDrive::new(token_provider)))
        }
        Mode::Test => Ok(Box::new(TestDrive::new(config.file_id()))),
    }
}
