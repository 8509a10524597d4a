use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::platform::AppPaths;

/// Environment variables override file settings, e.g.
/// `CREDITLENS_ANALYSIS__DETAIL_ROW_LIMIT=500`.
pub const ENV_PREFIX: &str = "CREDITLENS";
const ENV_SEPARATOR: &str = "__";

/// Upper bound for the default window settings, about ten years.
const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Usage mirror location. Defaults to the data directory.
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub default_lookback_days: u32,
    pub default_end_offset_days: i64,
    pub detail_row_limit: u32,
    pub problem_query_limit: u32,
    pub large_scan_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub max_column_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file_logging: bool,
    /// Used when RUST_LOG is unset.
    pub level: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: 7,
            default_end_offset_days: 1,
            detail_row_limit: 1000,
            problem_query_limit: 50,
            large_scan_limit: 20,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            max_column_width: 32,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_logging: true,
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub async fn load(paths: &AppPaths) -> Result<Self> {
        let config_file = paths.config_file();

        if !config_file.exists() {
            info!("Config file not found, creating default configuration");
            Self::default().save_to(&config_file).await?;
        }

        Self::load_from(&config_file)
    }

    /// Layer `path` and `CREDITLENS_*` environment variables over the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    pub async fn save(&self, paths: &AppPaths) -> Result<()> {
        self.save_to(&paths.config_file()).await
    }

    pub async fn save_to(&self, config_file: &Path) -> Result<()> {
        info!("Saving configuration to: {:?}", config_file);

        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let config_content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        fs::write(config_file, config_content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.max_connections == 0 {
            return Err(Error::validation("source.max_connections must be at least 1"));
        }

        if let Some(path) = &self.source.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::validation("source.database_path is empty"));
            }
        }

        if self.analysis.default_lookback_days == 0 {
            return Err(Error::validation(
                "analysis.default_lookback_days must be at least 1",
            ));
        }

        if self.analysis.default_end_offset_days < 0 {
            return Err(Error::validation(
                "analysis.default_end_offset_days cannot be negative",
            ));
        }

        if self.analysis.default_lookback_days > MAX_WINDOW_DAYS {
            return Err(Error::validation(format!(
                "analysis.default_lookback_days cannot exceed {}",
                MAX_WINDOW_DAYS
            )));
        }

        if self.analysis.default_end_offset_days > i64::from(MAX_WINDOW_DAYS) {
            return Err(Error::validation(format!(
                "analysis.default_end_offset_days cannot exceed {}",
                MAX_WINDOW_DAYS
            )));
        }

        if self.analysis.detail_row_limit == 0
            || self.analysis.problem_query_limit == 0
            || self.analysis.large_scan_limit == 0
        {
            return Err(Error::validation("analysis row limits must be at least 1"));
        }

        if self.output.max_column_width < 8 {
            return Err(Error::validation("output.max_column_width must be at least 8"));
        }

        Ok(())
    }

    /// Mirror database path, falling back to the data directory.
    pub fn database_path(&self, paths: &AppPaths) -> PathBuf {
        self.source
            .database_path
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analysis.default_lookback_days, 7);
        assert_eq!(config.analysis.default_end_offset_days, 1);
        assert_eq!(config.analysis.detail_row_limit, 1000);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.logging.file_logging);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.analysis.default_lookback_days = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.source.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.max_column_width = 4;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::with_data_dir(temp_dir.path()).unwrap();

        let config = AppConfig::load(&paths).await.unwrap();
        assert!(paths.config_file().exists());
        assert_eq!(config.analysis.large_scan_limit, 20);
        assert_eq!(config.database_path(&paths), paths.database_file());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("partial.toml");
        std::fs::write(
            &file,
            "[analysis]\ndetail_row_limit = 250\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&file).unwrap();
        assert_eq!(config.analysis.detail_row_limit, 250);
        assert_eq!(config.analysis.default_lookback_days, 7);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.max_column_width, 32);
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.source.database_path = Some(temp_dir.path().join("mirror.db"));
        config.analysis.problem_query_limit = 10;
        config.save_to(&file).await.unwrap();

        let loaded = AppConfig::load_from(&file).unwrap();
        assert_eq!(loaded.analysis.problem_query_limit, 10);
        assert_eq!(
            loaded.source.database_path,
            Some(temp_dir.path().join("mirror.db"))
        );
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("bad.toml");
        std::fs::write(&file, "[analysis]\ndefault_lookback_days = 0\n").unwrap();

        assert!(matches!(
            AppConfig::load_from(&file),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("huge.toml");
        std::fs::write(&file, "[analysis]\ndefault_lookback_days = 4000000000\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&file),
            Err(Error::Validation(_))
        ));

        let mut config = AppConfig::default();
        config.analysis.default_lookback_days = 3650;
        config.analysis.default_end_offset_days = 3650;
        assert!(config.validate().is_ok());

        config.analysis.default_end_offset_days = 3651;
        assert!(config.validate().is_err());
    }
}
