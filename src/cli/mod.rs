pub mod export;
pub mod init;
pub mod refresh;
pub mod report;
pub mod sources;
pub mod status;

use clap::{Parser, Subcommand};

use crate::error::{RecountError, Result};

pub(crate) fn parse_date_opt(raw: &Option<String>) -> Result<Option<chrono::NaiveDate>> {
    match raw {
        Some(s) => crate::loader::parse_date_any(s).map(Some).ok_or_else(|| {
            RecountError::Other(format!("invalid date: '{s}' (expected YYYY-MM-DD)"))
        }),
        None => Ok(None),
    }
}

#[derive(Parser)]
#[command(
    name = "recount",
    about = "Project-financials reconciliation CLI for professional-services firms."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Recount: choose a data directory and initialize the database.
    Init {
        /// Path for Recount data (default: ~/Documents/recount)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Configure the four source spreadsheets.
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },
    /// Reload all sources and rebuild the project summary.
    Refresh {
        /// Only count invoices dated on/after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Only count invoices dated on/before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Render reports from the last refresh.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export result sets for downstream tools.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Show current configuration and refresh state.
    Status,
}

#[derive(Subcommand)]
pub enum SourcesCommands {
    /// Record the path of a source spreadsheet.
    Set {
        /// Source name: timesheet, rates, registry, invoices
        source: String,
        /// Path to the spreadsheet (CSV or XLSX)
        path: String,
        /// Local fallback copy, for a registry on a network share
        #[arg(long)]
        fallback: Option<String>,
    },
    /// List configured source paths.
    List,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// One row per project plus a trailing TOTAL row.
    Summary,
    /// Client-level rollup across projects.
    Clients,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Write the summary as a flat CSV row-set (exact numeric values).
    Summary {
        /// Output CSV path
        #[arg(long)]
        output: String,
    },
}
