//! Error types for the public surface of the crate.
//!
//! Internally, functions return `Res<T>`, which is an `anyhow::Result`. At the boundaries that are
//! visible to callers (commands, the repository and the edit session) errors are tagged with an
//! `ErrorType` so that callers can tell a failed download from a failed upload or a missing
//! record, while still carrying the full `anyhow` context chain for display.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categorizes what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The data directory or configuration file is missing or invalid.
    Config,
    /// OAuth credentials or tokens could not be obtained.
    Auth,
    /// The document could not be downloaded or is not a JSON array of records.
    Load,
    /// The document could not be uploaded.
    Transport,
    /// No record has the requested identifier.
    NotFound,
    /// The remote document changed after it was loaded.
    Conflict,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error with an `ErrorType` and its underlying cause.
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{:#}", self.source)
        } else {
            write!(f, "{}", self.source)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// Converts an internal `Res<T>` into a public `Result<T>` by tagging it with an `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[test]
fn test_pub_result_keeps_context() {
    use anyhow::Context;
    let res: Res<()> = Err(anyhow::anyhow!("connection reset")).context("Unable to upload");
    let err = res.pub_result(ErrorType::Transport).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Transport);
    assert_eq!(err.to_string(), "Unable to upload");
    assert_eq!(format!("{err:#}"), "Unable to upload: connection reset");
}

#[test]
fn test_error_type_display() {
    assert_eq!(ErrorType::NotFound.to_string(), "not_found");
    assert_eq!("conflict".parse::<ErrorType>().unwrap(), ErrorType::Conflict);
}
