#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use std::time::Duration;

#[cfg(feature = "cli")]
pub use cli::{exit_code, CliConfig, LogFormat};
pub use toml_config::{DispatcherConfig, ServiceSection, ServicesConfig};

/// In-memory settings for embedding the engine without a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    pub version_separator: String,
    pub per_service_timeout: Duration,
}

impl StaticConfig {
    pub fn new(version_separator: impl Into<String>, per_service_timeout: Duration) -> Self {
        Self {
            version_separator: version_separator.into(),
            per_service_timeout,
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self::new(
            toml_config::DEFAULT_VERSION_SEPARATOR,
            Duration::from_millis(toml_config::DEFAULT_PER_SERVICE_TIMEOUT_MS),
        )
    }
}

impl ConfigProvider for StaticConfig {
    fn version_separator(&self) -> &str {
        &self.version_separator
    }

    fn per_service_timeout(&self) -> Duration {
        self.per_service_timeout
    }
}
