//! Configuration file handling for drive-ledger.
//!
//! The configuration file is stored at `$DRIVE_LEDGER_HOME/config.json` and contains the address of
//! the Google Drive document, backup settings, and authentication file paths.

use crate::backup::Backup;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "drive-ledger";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const SECRETS: &str = ".secrets";
const BACKUPS: &str = ".backups";
const CLIENT_SECRET_JSON: &str = "client_secret.json";
const TOKEN_JSON: &str = "token.json";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$DRIVE_LEDGER_HOME` and from there it loads `config.json`. It provides paths to
/// other items that are either configurable or are expected in a certain location within the home
/// directory.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    file_id: String,
}

impl Config {
    /// Creates the data directory, its subdirectories and:
    /// - Creates an initial `config.json` file using `document_url` along with default settings
    /// - Moves `secret_file` into its default location in the data dir.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/drive-ledger`
    /// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
    ///   OAuth workflow.
    /// - `document_url` - The Google Drive URL, or bare file id, of the JSON document.
    ///
    /// # Errors
    /// - Returns an error if the file id cannot be found in `document_url` or if any file operation
    ///   fails.
    pub async fn create(
        dir: impl Into<PathBuf>,
        secret_file: &Path,
        document_url: &str,
    ) -> Result<Self> {
        Self::try_create(dir.into(), secret_file, document_url)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn try_create(
        maybe_relative: PathBuf,
        secret_file: &Path,
        document_url: &str,
    ) -> Res<Self> {
        // Fail before touching the filesystem if the URL is unusable
        let file_id = extract_file_id(document_url)?.to_string();

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the drive-ledger home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let backups = root.join(BACKUPS);
        utils::make_dir(&backups).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        let secret_destination = secrets.join(CLIENT_SECRET_JSON);
        utils::rename(secret_file, &secret_destination).await?;
        utils::restrict_permissions(&secret_destination)?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            document_url: document_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            backups,
            secrets,
            config_path,
            config_file,
            file_id,
        })
    }

    /// This will
    /// - validate that the home directory and the config file exist
    /// - load the config file
    /// - validate that the backups and secrets directories exist
    /// - return the loaded configuration object
    pub async fn load(home: impl Into<PathBuf>) -> Result<Self> {
        Self::try_load(home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn try_load(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The drive-ledger home directory is missing, run 'init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let file_id = extract_file_id(&config_file.document_url)?.to_string();

        let config = Self {
            backups: root.join(BACKUPS),
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            file_id,
        };
        if !config.backups.is_dir() {
            bail!(
                "The backups directory is missing '{}'",
                config.backups.display()
            )
        }
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn document_url(&self) -> &str {
        &self.config_file.document_url
    }

    /// The Google Drive file id of the document.
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }

    /// Returns the stored `client_secret_path` if it is absolute, otherwise resolves it against the
    /// home directory.
    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.config_file.client_secret_path())
    }

    /// Returns the stored `token_path` if it is absolute, otherwise resolves it against the home
    /// directory.
    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.config_file.token_path())
    }

    fn resolve(&self, p: PathBuf) -> PathBuf {
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "drive-ledger",
///   "config_version": 1,
///   "document_url": "https://drive.google.com/file/d/12kD7T6qg5J-A5dRpTm7wiQZjLqHzzQaP/view",
///   "backup_copies": 5,
///   "client_secret_path": ".secrets/client_secret.json",
///   "token_path": ".secrets/token.json"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "drive-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Google Drive URL or file id of the JSON document
    document_url: String,

    /// Number of backup copies to keep
    #[serde(default = "default_backup_copies")]
    backup_copies: u32,

    /// Path to the OAuth 2.0 client credentials file (relative to the home directory or absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret_path: Option<PathBuf>,

    /// Path to the OAuth token file (relative to the home directory or absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            document_url: String::new(),
            backup_copies: BACKUP_COPIES,
            client_secret_path: None,
            token_path: None,
        }
    }
}

fn default_backup_copies() -> u32 {
    BACKUP_COPIES
}

impl ConfigFile {
    async fn load(path: &Path) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path).await?;
        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    async fn save(&self, path: &Path) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path, data)
            .await
            .context("Unable to write config file")
    }

    fn client_secret_path(&self) -> PathBuf {
        self.client_secret_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CLIENT_SECRET_JSON))
    }

    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(TOKEN_JSON))
    }
}

/// Extracts the file id from a Google Drive URL or returns `url` itself when it is a bare id.
///
/// Accepted forms:
/// - `https://drive.google.com/file/d/FILE_ID/view?usp=sharing`
/// - `https://drive.google.com/open?id=FILE_ID`
/// - `https://drive.google.com/uc?id=FILE_ID&export=download`
/// - `FILE_ID`
fn extract_file_id(url: &str) -> Res<&str> {
    let url = url.trim();
    if url.is_empty() {
        bail!("The document URL is empty");
    }
    if !url.contains('/') && !url.contains('?') {
        return Ok(url);
    }

    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let parts: Vec<&str> = path.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "d" {
            if let Some(id) = parts.get(i + 1).map(|s| s.split('#').next().unwrap_or(s)) {
                if !id.is_empty() {
                    return Ok(id);
                }
            }
        }
    }

    if let Some(query) = query {
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("id=") {
                let id = id.split('#').next().unwrap_or(id);
                if !id.is_empty() {
                    return Ok(id);
                }
            }
        }
    }

    bail!(
        "Invalid Google Drive URL '{url}'. Expected https://drive.google.com/file/d/FILE_ID or a \
        bare file id"
    )
}
