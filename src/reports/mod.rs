//! Dashboard pages.
//!
//! Each page validates nothing itself: it receives an already valid
//! [`DateRange`], issues its queries one after another and folds the rows
//! into a [`Report`].

pub mod admin;
pub mod page;
pub mod queries;
pub mod report;
pub mod user;

pub use page::{AdminPage, Page, UserPage};
pub use report::{ChartKind, ChartSpec, Finding, Metric, Report, Severity, Table};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::app::config::AnalysisConfig;
use crate::error::Result;
use crate::rollup::DateRange;
use crate::storage::{fetch_optional_feature, range_params, QueryEngine, QueryParam, ResultSet};

/// Request-scoped inputs shared by every query of one page render.
pub struct PageContext<'a> {
    engine: &'a dyn QueryEngine,
    range: DateRange,
    settings: &'a AnalysisConfig,
}

impl<'a> PageContext<'a> {
    pub fn new(engine: &'a dyn QueryEngine, range: DateRange, settings: &'a AnalysisConfig) -> Self {
        Self {
            engine,
            range,
            settings,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn settings(&self) -> &AnalysisConfig {
        self.settings
    }

    fn params(&self, extra: &[QueryParam]) -> Vec<QueryParam> {
        let mut params = range_params(&self.range);
        params.extend_from_slice(extra);
        params
    }

    /// Run a range-filtered query. Failures are fatal for the page.
    pub async fn fetch(&self, sql: &str) -> Result<ResultSet> {
        self.fetch_with(sql, &[]).await
    }

    pub async fn fetch_with(&self, sql: &str, extra: &[QueryParam]) -> Result<ResultSet> {
        self.engine.fetch(sql, &self.params(extra)).await
    }

    /// Run a query against an optional view. When the view is missing a
    /// notice is added to `report` and `None` is returned.
    pub async fn fetch_optional(
        &self,
        feature: &str,
        sql: &str,
        report: &mut Report,
    ) -> Result<Option<ResultSet>> {
        self.fetch_optional_with(feature, sql, &[], report).await
    }

    pub async fn fetch_optional_with(
        &self,
        feature: &str,
        sql: &str,
        extra: &[QueryParam],
        report: &mut Report,
    ) -> Result<Option<ResultSet>> {
        match fetch_optional_feature(self.engine, feature, sql, &self.params(extra)).await {
            Ok(result) => Ok(Some(result)),
            Err(e) if e.is_degradable() => {
                report.notice(format!("{} is not available in this account; shown as 0.", feature));
                debug!("Degraded page {}: {}", report.page, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn limit(value: u32) -> QueryParam {
        QueryParam::Int(i64::from(value))
    }
}

/// Render one page for a validated range.
pub async fn render(
    engine: &dyn QueryEngine,
    page: Page,
    range: DateRange,
    settings: &AnalysisConfig,
) -> Result<Report> {
    info!("Rendering {} for {}", page, range);
    let ctx = PageContext::new(engine, range, settings);

    let report = match page {
        Page::Admin(page) => admin::render(&ctx, page).await?,
        Page::User(page) => user::render(&ctx, page).await?,
    };

    debug!(
        "{}: {} tables, {} findings, {} notices",
        report.page,
        report.tables.len(),
        report.findings.len(),
        report.notices.len()
    );
    Ok(report)
}

/// Validate `start <= end`, then render. An invalid range never reaches
/// the engine.
pub async fn render_dates(
    engine: &dyn QueryEngine,
    page: Page,
    start: NaiveDate,
    end: NaiveDate,
    settings: &AnalysisConfig,
) -> Result<Report> {
    let range = DateRange::new(start, end)?;
    render(engine, page, range, settings).await
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{Error, Result};
    use crate::storage::{QueryEngine, QueryParam, ResultSet};

    /// Delegates to an inner engine, failing any query that mentions one of
    /// the `broken` tables and counting every call.
    pub struct ScriptedEngine<E> {
        inner: E,
        broken: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl<E: QueryEngine> ScriptedEngine<E> {
        pub fn new(inner: E, broken: &[&'static str]) -> Self {
            Self {
                inner,
                broken: broken.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Answers each query with the first canned result whose marker appears
    /// in the SQL, or an empty result.
    #[derive(Default)]
    pub struct CannedEngine {
        answers: Vec<(&'static str, ResultSet)>,
    }

    impl CannedEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn answer(mut self, marker: &'static str, result: ResultSet) -> Self {
            self.answers.push((marker, result));
            self
        }
    }

    #[async_trait]
    impl QueryEngine for CannedEngine {
        async fn fetch(&self, sql: &str, _params: &[QueryParam]) -> Result<ResultSet> {
            Ok(self
                .answers
                .iter()
                .find(|(marker, _)| sql.contains(*marker))
                .map(|(_, result)| result.clone())
                .unwrap_or_default())
        }
    }

    #[async_trait]
    impl<E: QueryEngine> QueryEngine for ScriptedEngine<E> {
        async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<ResultSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(table) = self.broken.iter().find(|t| sql.contains(*t)) {
                return Err(Error::validation(format!("Object '{}' does not exist", table)));
            }
            self.inner.fetch(sql, params).await
        }
    }
}
