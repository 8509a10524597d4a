pub mod config;
pub mod state;

pub use config::{AnalysisConfig, AppConfig, LoggingConfig, OutputConfig, SourceConfig};
pub use state::AppState;
