//! These structs provide the CLI interface for the drive-ledger CLI.

use crate::view::{Format, Tab};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// drive-ledger: browse and correct the financial records kept in a JSON document on Google Drive.
///
/// The document is a JSON array of transaction entries. Each entry belongs to a month ("Mês/Ano").
/// This program shows the entries of one month together with totals by operation type, financial
/// category and accounting account, and lets you correct a single entry. Every correction rewrites
/// the whole document in Google Drive.
///
/// You will need to set up Google OAuth credentials for this. Run `drive-ledger init` and then
/// `drive-ledger auth` to get started.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. You need two things beforehand:
    ///
    /// - The Google Drive URL of the JSON document, passed as --document-url. The bare file id
    ///   works too.
    ///
    /// - OAuth 2.0 "Desktop app" client credentials downloaded from Google Cloud Console, passed as
    ///   --client-secret. The file is moved into the data directory.
    Init(InitArgs),
    /// Authenticate with Google Drive via OAuth.
    Auth(AuthArgs),
    /// List the periods found in the document, most recent first.
    Periods,
    /// Show the records of a period and their totals.
    Show(ShowArgs),
    /// Correct one record and save the whole document back to Google Drive.
    Edit(EditArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where drive-ledger data and configuration is held. Defaults to ~/drive-ledger
    #[arg(long, env = "DRIVE_LEDGER_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `drive-ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The Google Drive URL of the JSON document. It looks like this:
    /// https://drive.google.com/file/d/12kD7T6qg5J-A5dRpTm7wiQZjLqHzzQaP/view
    #[arg(long)]
    document_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// default secrets location in the data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(document_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            document_url: document_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// Args for the `drive-ledger auth` command.
#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify and refresh the saved authentication without opening the consent flow.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn new(verify: bool) -> Self {
        Self { verify }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}

/// Args for the `drive-ledger show` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct ShowArgs {
    /// The period to show, e.g. 2025-10. Defaults to the most recent period.
    #[arg(long)]
    period: Option<String>,

    /// Which table to show.
    #[arg(long, value_enum, default_value_t = Tab::All)]
    tab: Tab,

    /// The output format.
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

impl ShowArgs {
    pub fn new(period: Option<String>, tab: Tab, format: Format) -> Self {
        Self {
            period,
            tab,
            format,
        }
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

/// Args for the `drive-ledger edit` command.
///
/// The record is opened with its current values. Only the fields passed here are changed.
#[derive(Debug, Default, Parser, Clone)]
pub struct EditArgs {
    /// The id of the record to edit.
    #[arg(long)]
    id: String,

    /// The period that the record belongs to. Defaults to the most recent period.
    #[arg(long)]
    period: Option<String>,

    /// New operation type ("TipoOperacao").
    #[arg(long)]
    operation_type: Option<String>,

    /// New category ("Categoria").
    #[arg(long)]
    category: Option<String>,

    /// New supplier ("Fornecedor").
    #[arg(long)]
    supplier: Option<String>,

    /// New description ("Descrição").
    #[arg(long)]
    description: Option<String>,

    /// New financial category ("Categoria Financeira").
    #[arg(long)]
    financial_category: Option<String>,

    /// New accounting account ("Conta Contábil").
    #[arg(long)]
    account: Option<String>,

    /// New value ("Valor"), e.g. 75.5. Text that is not a number is saved as 0.
    #[arg(long, allow_hyphen_values = true)]
    value: Option<String>,

    /// Save even if someone else changed the document since it was loaded, overwriting their
    /// changes.
    #[arg(long)]
    force: bool,
}

impl EditArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn operation_type(&self) -> Option<&str> {
        self.operation_type.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn financial_category(&self) -> Option<&str> {
        self.financial_category.as_deref()
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_operation_type(mut self, s: impl Into<String>) -> Self {
        self.operation_type = Some(s.into());
        self
    }

    pub fn with_category(mut self, s: impl Into<String>) -> Self {
        self.category = Some(s.into());
        self
    }

    pub fn with_supplier(mut self, s: impl Into<String>) -> Self {
        self.supplier = Some(s.into());
        self
    }

    pub fn with_description(mut self, s: impl Into<String>) -> Self {
        self.description = Some(s.into());
        self
    }

    pub fn with_financial_category(mut self, s: impl Into<String>) -> Self {
        self.financial_category = Some(s.into());
        self
    }

    pub fn with_account(mut self, s: impl Into<String>) -> Self {
        self.account = Some(s.into());
        self
    }

    pub fn with_value(mut self, s: impl Into<String>) -> Self {
        self.value = Some(s.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("drive-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or DRIVE_LEDGER_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("drive-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show() {
        let args = Args::try_parse_from([
            "drive-ledger",
            "--home",
            "/tmp/ledger",
            "show",
            "--period",
            "2025-09",
            "--tab",
            "financial-category",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/ledger"));
        let Command::Show(show) = args.command() else {
            panic!("expected show");
        };
        assert_eq!(show.period(), Some("2025-09"));
        assert_eq!(show.tab(), Tab::FinancialCategory);
        assert_eq!(show.format(), Format::Csv);
    }

    #[test]
    fn test_parse_edit() {
        let args = Args::try_parse_from([
            "drive-ledger",
            "--log-level",
            "debug",
            "edit",
            "--id",
            "7",
            "--value",
            "-12.5",
            "--description",
            "Conta de energia",
            "--force",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::Edit(edit) = args.command() else {
            panic!("expected edit");
        };
        assert_eq!(edit.id(), "7");
        assert_eq!(edit.value(), Some("-12.5"));
        assert_eq!(edit.description(), Some("Conta de energia"));
        assert_eq!(edit.category(), None);
        assert!(edit.force());
    }

    #[test]
    fn test_edit_requires_id() {
        assert!(Args::try_parse_from(["drive-ledger", "edit", "--value", "1"]).is_err());
    }
}
