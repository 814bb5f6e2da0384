//! drive-ledger: browse, summarize and correct financial records kept as a single JSON document in
//! Google Drive.
//!
//! The document is loaded once into a `Repository`. Views are filtered by period and summarized by
//! operation type, financial category and accounting account. Edits go through an `EditSession`
//! and are saved by replacing the whole document, only after the upload succeeds does the local
//! copy change.

mod api;
pub mod args;
mod backup;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod repository;
pub mod session;
pub mod summary;
mod utils;
pub mod view;

#[cfg(test)]
mod test;

pub use api::{Document, Drive, Mode, TestDrive, TestDriveState, TEST_MODE_ENV};
pub use backup::Backup;
pub use config::Config;
pub use error::{Error, ErrorType, Result};
