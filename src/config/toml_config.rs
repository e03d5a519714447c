use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_VERSION_SEPARATOR: &str = "-";
pub const DEFAULT_PER_SERVICE_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub service: ServiceSection,
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_version_separator")]
    pub version_separator: String,
    #[serde(default = "default_per_service_timeout_ms")]
    pub per_service_timeout_ms: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            version_separator: default_version_separator(),
            per_service_timeout_ms: default_per_service_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub endpoint: String,
    /// Overall cap for a single backend request, on top of the service deadline.
    pub request_timeout_ms: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

fn default_version_separator() -> String {
    DEFAULT_VERSION_SEPARATOR.to_string()
}

fn default_per_service_timeout_ms() -> u64 {
    DEFAULT_PER_SERVICE_TIMEOUT_MS
}

impl ServicesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ServiceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ServiceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TRITON_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ServiceError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn endpoint(&self) -> &str {
        &self.dispatcher.endpoint
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.dispatcher.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.dispatcher.headers.clone().unwrap_or_default()
    }
}

impl Validate for ServicesConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("dispatcher.endpoint", &self.dispatcher.endpoint)?;
        validation::validate_non_empty_string(
            "service.version_separator",
            &self.service.version_separator,
        )?;
        validation::validate_positive_number(
            "service.per_service_timeout_ms",
            self.service.per_service_timeout_ms,
            1,
        )?;
        if let Some(request_timeout) = self.dispatcher.request_timeout_ms {
            validation::validate_positive_number("dispatcher.request_timeout_ms", request_timeout, 1)?;
        }
        for name in self.headers().keys() {
            validation::validate_non_empty_string("dispatcher.headers", name)?;
        }
        Ok(())
    }
}

impl ConfigProvider for ServicesConfig {
    fn version_separator(&self) -> &str {
        &self.service.version_separator
    }

    fn per_service_timeout(&self) -> Duration {
        Duration::from_millis(self.service.per_service_timeout_ms)
    }
}
