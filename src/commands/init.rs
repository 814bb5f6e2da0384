use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `document_url` along with default settings
/// - Moves `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/drive-ledger`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow.
/// - `document_url` - The Google Drive URL (or file id) of the JSON document.
///
/// # Errors
/// - Returns an error if the URL has no file id or if any file operations fail.
pub async fn init(home: &Path, secret_file: &Path, document_url: &str) -> Result<Out<()>> {
    let config = Config::create(home, secret_file, document_url).await?;
    Ok(format!(
        "Successfully created the drive-ledger directory at {}. Run 'drive-ledger auth' next",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        let secret = dir.path().join("client_secret.json");
        std::fs::write(&secret, "{}").unwrap();
        let out = init(&home, &secret, "https://drive.google.com/open?id=F1le")
            .await
            .unwrap();
        assert!(out.message().contains("Successfully created"));
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.file_id(), "F1le");
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("client_secret.json");
        std::fs::write(&secret, "{}").unwrap();
        let err = init(dir.path(), &secret, "https://example.com/x")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }
}
