//! Local backups of the document, taken before it is overwritten in Google Drive.

use crate::error::Res;
use crate::{utils, Config};
use chrono::Local;
use std::path::PathBuf;

/// Prefix for the copy of the document taken before an edit is uploaded.
pub const PRE_SAVE: &str = "pre-save";

const EXTENSION: &str = "json";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Writes `bytes` verbatim to a backup file.
    ///
    /// The filename format is `{prefix}.YYYY-MM-DD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old backups, keeping only `backup_copies` files.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_bytes(&self, prefix: &str, bytes: &[u8]) -> Res<PathBuf> {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self
            .backups_dir
            .join(format!("{prefix}.{date}-{seq:03}.{EXTENSION}"));
        utils::write(&path, bytes).await?;
        self.rotate(prefix).await?;
        Ok(path)
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let max_seq = self
            .list(prefix)
            .await?
            .iter()
            .filter_map(|(_, name)| parse_sequence_number(name, prefix, date))
            .max()
            .unwrap_or(0);
        Ok(max_seq + 1)
    }

    /// Deletes the oldest backups with `prefix` until at most `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Res<()> {
        let mut files = self.list(prefix).await?;
        files.sort_by_cached_key(|(_, name)| backup_order(name, prefix));
        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Res<Vec<(PathBuf, String)>> {
        let mut files = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name, prefix) {
                files.push((entry.path(), name));
            }
        }
        Ok(files)
    }
}

/// Returns today's date in YYYY-MM-DD format.
fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses NNN out of `{prefix}.{date}-NNN.json`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{EXTENSION}"))?
        .parse()
        .ok()
}

/// Sort key of `{prefix}.YYYY-MM-DD-NNN.json`: the date, then the sequence number as a number.
/// Names that do not parse sort first.
fn backup_order(filename: &str, prefix: &str) -> Option<(String, u32)> {
    let stamp = filename
        .strip_prefix(&format!("{prefix}."))?
        .strip_suffix(&format!(".{EXTENSION}"))?;
    let (date, seq) = stamp.rsplit_once('-')?;
    Some((date.to_string(), seq.parse().ok()?))
}

fn is_backup_file(filename: &str, prefix: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(&format!(".{EXTENSION}"))
}
