use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};

use creditlens::app::{AppConfig, AppState};
use creditlens::cli::{Cli, Commands, RangeArgs};
use creditlens::logging::{init_bootstrap_logging, init_logging};
use creditlens::output::{OutputFormat, ReportFormatter};
use creditlens::platform::AppPaths;
use creditlens::reports::{Page, Table};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let bootstrap_guard = init_bootstrap_logging(cli.debug)?;

    let paths = AppPaths::new().context("Failed to resolve application directories")?;
    paths
        .ensure_dirs_exist()
        .context("Failed to create application directories")?;

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load(&paths)
            .await
            .context("Failed to load configuration")?,
    };
    if let Some(database) = &cli.database {
        config.source.database_path = Some(database.clone());
    }

    drop(bootstrap_guard);
    let _log_guard = init_logging(&config.logging, &paths.logs_dir(), cli.debug)?;
    info!("Starting creditlens v{}", env!("CARGO_PKG_VERSION"));

    let format = cli.format.unwrap_or(config.output.format);
    let formatter = ReportFormatter::new(format, config.output.max_column_width);

    match cli.command {
        Commands::Pages => {
            print!("{}", formatter.format_table(&page_listing())?);
            return Ok(());
        }
        Commands::Init => {
            if cli.config.is_none() {
                config.save(&paths).await?;
            }
            let state = AppState::new(config, paths).await?;
            println!("Configuration: {}", state.paths().config_file().display());
            println!("Usage mirror:  {}", state.database().path().display());
            state.close().await;
            return Ok(());
        }
        _ => {}
    }

    let state = AppState::new(config, paths)
        .await
        .context("Failed to open the usage mirror")?;

    let result = execute(&state, cli.command, &formatter, format).await;
    state.close().await;
    result
}

async fn execute(
    state: &AppState,
    command: Commands,
    formatter: &ReportFormatter,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Commands::Admin { page, range } => {
            render(state, Page::Admin(page), range, formatter).await?;
        }
        Commands::User { page, range } => {
            render(state, Page::User(page), range, formatter).await?;
        }
        Commands::Import { view, file } => {
            let summary = state
                .import(view, &file)
                .await
                .with_context(|| format!("Failed to import {}", file.display()))?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Imported {} rows into {}", summary.rows_imported, summary.view);
                if !summary.ignored_columns.is_empty() {
                    println!("Ignored columns: {}", summary.ignored_columns.join(", "));
                }
            }
        }
        Commands::Status => {
            let stats = state.statistics().await?;
            let mut table = Table::new("Usage mirror", &["view", "rows"]);
            for (view, rows) in [
                ("query_history", stats.query_history),
                ("query_attribution_history", stats.query_attribution_history),
                ("cortex_functions_query_usage_history", stats.cortex_functions_usage),
                ("cortex_analyst_usage_history", stats.cortex_analyst_usage),
            ] {
                table.push_row(vec![Value::from(view), Value::from(rows)]);
            }
            print!("{}", formatter.format_table(&table)?);
        }
        Commands::Pages | Commands::Init => {}
    }
    Ok(())
}

async fn render(
    state: &AppState,
    page: Page,
    range: RangeArgs,
    formatter: &ReportFormatter,
) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    let report = state
        .render_page(page, range.start, range.end, today)
        .await
        .with_context(|| format!("Failed to render {}", page))?;

    print!("{}", formatter.format_report(&report)?);
    Ok(())
}

fn page_listing() -> Table {
    let mut table = Table::new("Pages", &["page", "title"]);
    for page in Page::all() {
        table.push_row(vec![Value::from(page.slug()), Value::from(page.title())]);
    }
    table
}
