// Usage mirror storage and the query engine seam

pub mod database;
pub mod engine;
pub mod import;
pub mod result;

#[cfg(test)]
pub(crate) mod fixture;

pub use database::{Database, MirrorStatistics};
pub use engine::{fetch_optional_feature, range_params, QueryEngine, QueryParam, SqliteEngine};
pub use import::{import_csv, import_csv_file, ImportSummary, MirrorView};
pub use result::{ResultSet, UsageRow};
