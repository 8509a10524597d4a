use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::app::config::AppConfig;
use crate::error::Result;
use crate::platform::AppPaths;
use crate::reports::{self, Page, Report};
use crate::rollup::DateRange;
use crate::storage::{
    import_csv_file, Database, ImportSummary, MirrorStatistics, MirrorView, QueryEngine,
    SqliteEngine,
};

pub struct AppState {
    config: AppConfig,
    paths: AppPaths,
    database: Database,
    engine: SqliteEngine,
}

impl AppState {
    pub async fn new(config: AppConfig, paths: AppPaths) -> Result<Self> {
        info!("Initializing application state");

        let db_path = config.database_path(&paths);
        let database = Database::open(&db_path, config.source.max_connections).await?;
        let engine = SqliteEngine::new(database.get_pool());

        Ok(Self {
            config,
            paths,
            database,
            engine,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn engine(&self) -> &dyn QueryEngine {
        &self.engine
    }

    /// The configured window: `default_lookback_days` before `today` through
    /// `today + default_end_offset_days`.
    pub fn default_range(&self, today: NaiveDate) -> Result<DateRange> {
        let analysis = &self.config.analysis;
        DateRange::trailing(
            today,
            analysis.default_lookback_days,
            analysis.default_end_offset_days,
        )
    }

    /// Render `page`, filling missing bounds from the default window.
    pub async fn render_page(
        &self,
        page: Page,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Report> {
        let default = self.default_range(today)?;
        let start = start.unwrap_or_else(|| default.start());
        let end = end.unwrap_or_else(|| default.end());
        debug!("Resolved range for {}: {} to {}", page, start, end);

        reports::render_dates(self.engine(), page, start, end, &self.config.analysis).await
    }

    pub async fn import(&self, view: MirrorView, file: &Path) -> Result<ImportSummary> {
        import_csv_file(self.database.pool(), view, file).await
    }

    pub async fn statistics(&self) -> Result<MirrorStatistics> {
        self.database.get_statistics().await
    }

    pub async fn close(self) {
        self.database.close().await;
    }
}
