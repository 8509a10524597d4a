use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use crate::reports::{AdminPage, UserPage};
use crate::storage::MirrorView;

#[derive(Parser, Debug)]
#[command(name = "creditlens")]
#[command(about = "Warehouse credit usage dashboards with cost rollups and savings estimates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Usage mirror database path (overrides the configuration)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format (overrides the configuration)
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Inclusive date bounds; missing bounds come from the configured window.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render an account-wide cost page
    Admin {
        #[arg(value_enum)]
        page: AdminPage,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Render a usage page
    User {
        #[arg(value_enum)]
        page: UserPage,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// List every page
    Pages,

    /// Create the configuration file and an empty usage mirror
    Init,

    /// Load a CSV export of a usage view into the mirror
    Import {
        /// View the file was exported from
        #[arg(long, value_enum)]
        view: MirrorView,

        /// CSV file with a header row
        #[arg(long)]
        file: PathBuf,
    },

    /// Show row counts of the usage mirror
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_page_with_range() {
        let cli = Cli::parse_from([
            "creditlens",
            "admin",
            "cost-overview",
            "--start",
            "2024-03-01",
            "--end",
            "2024-03-07",
            "--format",
            "json",
        ]);

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Admin { page, range } => {
                assert_eq!(page, AdminPage::CostOverview);
                assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 3, 7));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_import() {
        let cli = Cli::parse_from([
            "creditlens",
            "import",
            "--view",
            "query-history",
            "--file",
            "export.csv",
        ]);

        match cli.command {
            Commands::Import { view, file } => {
                assert_eq!(view, MirrorView::QueryHistory);
                assert_eq!(file, PathBuf::from("export.csv"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result = Cli::try_parse_from(["creditlens", "user", "home", "--start", "03/01/2024"]);
        assert!(result.is_err());
    }
}
