use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

pub mod email;

use email::{EmailError, MandrillConfig};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub mandrill: MandrillConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, EmailError> {
        Ok(toml_edit::de::from_str::<Config>(content)?)
    }

    pub async fn load_from_file(path: &Path) -> Result<Self, EmailError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }
}

/// Builds the log filter. Directives from `RUST_LOG` win over `level` when
/// they parse.
pub fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()))
}
