//! Rendering reports for the terminal, for scripts and for spreadsheets.

mod formatter;

pub use formatter::ReportFormatter;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format for rendered pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}
