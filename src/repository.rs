//! The `Repository` owns the records of one document for the length of a session, along with the
//! `Drive` they came from.

use crate::api::Drive;
use crate::backup::{Backup, PRE_SAVE};
use crate::error::{Error, ErrorType, IntoResult, Res};
use crate::model::{Record, RecordEdit, RecordSet};
use crate::Result;
use anyhow::{anyhow, Context};
use tracing::{debug, info};

/// The records loaded from the remote document. Loaded once per session and only replaced, as a
/// whole, after an upload succeeds.
#[derive(Debug)]
pub struct Repository {
    drive: Box<dyn Drive + Send>,
    file_id: String,
    records: RecordSet,
    /// The remote version observed at load time or returned by our last upload.
    version: Option<String>,
    /// The document bytes as they were fetched or last uploaded.
    remote_bytes: Vec<u8>,
    backup: Option<Backup>,
}

impl Repository {
    /// Downloads and parses the document `file_id`. No retry is attempted.
    pub async fn load(
        mut drive: Box<dyn Drive + Send>,
        file_id: impl Into<String>,
    ) -> Result<Self> {
        let file_id = file_id.into();
        let document = drive
            .fetch(&file_id)
            .await
            .context("Unable to download the document")
            .pub_result(ErrorType::Load)?;
        let records = RecordSet::parse(&document.bytes)
            .context("Unable to read the records in the document")
            .pub_result(ErrorType::Load)?;
        info!(
            "Loaded {} records from the document (version {})",
            records.len(),
            document.version.as_deref().unwrap_or("unknown")
        );
        Ok(Self {
            drive,
            file_id,
            records,
            version: document.version,
            remote_bytes: document.bytes,
            backup: None,
        })
    }

    /// Takes a backup of the remote document before every upload.
    pub fn with_backup(mut self, backup: Backup) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn available_periods(&self) -> Vec<String> {
        self.records.available_periods()
    }

    pub fn filter_by_period(&self, period: &str) -> Vec<&Record> {
        self.records.filter_by_period(period)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Record> {
        self.records.find_by_id(id)
    }

    /// Applies `edit` to the record `id` and uploads the whole document.
    ///
    /// The edit is made on a scratch copy. The live records and version change only after the
    /// upload succeeds, so on any error the repository is exactly as it was. Unless `force` is
    /// set, the upload is refused when the remote document changed since it was loaded.
    ///
    /// Returns the updated record.
    pub async fn commit_edit(
        &mut self,
        id: &str,
        edit: &RecordEdit,
        force: bool,
    ) -> Result<Record> {
        let mut scratch = self.records.clone();
        let updated = scratch
            .apply_edit(id, edit)
            .pub_result(ErrorType::NotFound)?
            .clone();
        let bytes = scratch.to_document().pub_result(ErrorType::Transport)?;

        if force {
            debug!("Skipping the remote version check");
        } else {
            self.check_version().await?;
        }

        if let Some(backup) = &self.backup {
            let path = backup
                .save_bytes(PRE_SAVE, &self.remote_bytes)
                .await
                .context("Unable to back up the document before saving")
                .pub_result(ErrorType::Transport)?;
            debug!("Backed up the document to {}", path.display());
        }

        let version = self
            .drive
            .replace(&self.file_id, &bytes)
            .await
            .context("Unable to upload the document")
            .pub_result(ErrorType::Transport)?;

        info!(
            "Saved record '{id}' ({} records written, version {})",
            scratch.len(),
            version.as_deref().unwrap_or("unknown")
        );
        self.records = scratch;
        self.version = version;
        self.remote_bytes = bytes;
        Ok(updated)
    }

    /// Fails with `ErrorType::Conflict` when the remote version differs from the one we hold.
    async fn check_version(&mut self) -> Result<()> {
        let remote = self
            .remote_version()
            .await
            .pub_result(ErrorType::Transport)?;
        match (self.version.as_deref(), remote.as_deref()) {
            (Some(ours), Some(theirs)) if ours != theirs => Err(Error::new(
                ErrorType::Conflict,
                anyhow!(
                    "The document was changed by someone else since it was loaded (loaded \
                    version {ours}, current version {theirs}). Load it again, or use --force to \
                    overwrite their changes"
                ),
            )),
            _ => Ok(()),
        }
    }

    async fn remote_version(&mut self) -> Res<Option<String>> {
        self.drive
            .version(&self.file_id)
            .await
            .context("Unable to check the remote version of the document")
    }
}
