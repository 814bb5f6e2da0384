//! The edit form: a record is opened from the current period's view, its fields are changed, and it
//! is either saved as a whole document write or dismissed.

use crate::error::{Error, ErrorType};
use crate::model::{Record, RecordEdit};
use crate::repository::Repository;
use crate::Result;
use anyhow::anyhow;
use tracing::debug;

/// The state of the edit form. At most one record is being edited at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditSession {
    #[default]
    Closed,
    Open {
        /// The identifier the record was opened with.
        id: String,
        /// The form fields, pre-populated from the record.
        form: RecordEdit,
    },
}

impl EditSession {
    /// Opens the record `id`, which must be in the view of `period`. Any form that was already
    /// open is discarded.
    pub fn open(&mut self, repository: &Repository, period: &str, id: &str) -> Result<()> {
        let in_view = repository
            .filter_by_period(period)
            .iter()
            .any(|r| r.has_id(id));
        let record = repository.find_by_id(id).filter(|_| in_view);
        let Some(record) = record else {
            return Err(Error::new(
                ErrorType::NotFound,
                anyhow!("Record not found: no record has the id '{id}' in period '{period}'"),
            ));
        };
        debug!("Opening record '{id}' for editing");
        *self = EditSession::Open {
            id: id.to_string(),
            form: RecordEdit::from(record),
        };
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditSession::Open { .. })
    }

    /// The identifier of the open record.
    pub fn id(&self) -> Option<&str> {
        match self {
            EditSession::Open { id, .. } => Some(id),
            EditSession::Closed => None,
        }
    }

    /// The form fields of the open record.
    pub fn form(&self) -> Option<&RecordEdit> {
        match self {
            EditSession::Open { form, .. } => Some(form),
            EditSession::Closed => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut RecordEdit> {
        match self {
            EditSession::Open { form, .. } => Some(form),
            EditSession::Closed => None,
        }
    }

    /// Saves the form. On success the session is closed and the updated record is returned. On
    /// failure the session stays open with the attempted form so that the save can be retried.
    pub async fn save(&mut self, repository: &mut Repository, force: bool) -> Result<Record> {
        let EditSession::Open { id, form } = self else {
            return Err(Error::new(
                ErrorType::NotFound,
                anyhow!("No record is open for editing"),
            ));
        };
        let updated = repository.commit_edit(id, form, force).await?;
        *self = EditSession::Closed;
        Ok(updated)
    }

    /// Closes the form without writing anything.
    pub fn dismiss(&mut self) {
        *self = EditSession::Closed;
    }
}
