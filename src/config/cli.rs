use crate::domain::model::{DependencyMap, ServiceInput, ServiceKey, ServiceOutput};
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::Validate;
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "model-services")]
#[command(about = "Route one request through a registered inference service")]
pub struct CliConfig {
    #[arg(long, default_value = "services.toml")]
    pub config: PathBuf,

    #[arg(long, help = "api name of the service to call, e.g. sentiment-v1.0.0")]
    pub service: Option<String>,

    #[arg(long, help = "Request payload as inline JSON", conflicts_with = "payload_file")]
    pub payload: Option<String>,

    #[arg(long, help = "Read the request payload from a JSON file")]
    pub payload_file: Option<PathBuf>,

    #[arg(long, help = "JSON array of {name, version, output} upstream results")]
    pub deps_file: Option<PathBuf>,

    #[arg(long, help = "Override the per-service timeout (milliseconds)")]
    pub timeout_ms: Option<u64>,

    #[arg(long, help = "List registered services and exit")]
    pub list: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Process exit code for a failed run: 1 configuration, 2 timeout, 3 anything else.
pub fn exit_code(error: &ServiceError) -> i32 {
    match error {
        ServiceError::ServiceTimeout { .. } => 2,
        other if other.is_config_error() => 1,
        _ => 3,
    }
}

#[derive(Debug, serde::Deserialize)]
struct DependencyEntry {
    #[serde(flatten)]
    key: ServiceKey,
    output: ServiceOutput,
}

impl CliConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn load_payload(&self) -> Result<ServiceInput> {
        let raw = match (&self.payload, &self.payload_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(ServiceError::MissingConfigError {
                    field: "--payload or --payload-file".to_string(),
                })
            }
        };
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn load_deps(&self) -> Result<DependencyMap> {
        let Some(path) = &self.deps_file else {
            return Ok(HashMap::new());
        };
        let entries: Vec<DependencyEntry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Ok(entries.into_iter().map(|e| (e.key, e.output)).collect())
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(timeout_ms) = self.timeout_ms {
            crate::utils::validation::validate_positive_number("--timeout-ms", timeout_ms, 1)?;
        }
        if !self.list {
            crate::utils::validation::validate_required_field("--service", &self.service)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Version;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_arguments() {
        let cli = CliConfig::parse_from([
            "model-services",
            "--service",
            "sentiment-v1.0.0",
            "--payload",
            r#"{"texts": ["hi"]}"#,
            "--timeout-ms",
            "250",
        ]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cli.load_payload().unwrap().data, json!({"texts": ["hi"]}));
        assert!(cli.load_deps().unwrap().is_empty());
    }

    #[test]
    fn test_log_format_flag() {
        let cli = CliConfig::parse_from(["model-services", "--list"]);
        assert_eq!(cli.log_format, LogFormat::Compact);

        let cli = CliConfig::parse_from(["model-services", "--list", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(CliConfig::try_parse_from(["model-services", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        let timeout = ServiceError::ServiceTimeout {
            api_name: "sentiment-v1.0.0".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(exit_code(&timeout), 2);
        assert_eq!(
            exit_code(&ServiceError::MissingConfigError {
                field: "--payload or --payload-file".to_string()
            }),
            1
        );
        assert_eq!(
            exit_code(&ServiceError::UnknownService {
                api_name: "nope-v1.0.0".to_string()
            }),
            3
        );
    }

    #[test]
    fn test_malformed_payload_is_not_a_config_error() {
        let cli = CliConfig::parse_from([
            "model-services",
            "--service",
            "sentiment-v1.0.0",
            "--payload",
            "{not json",
        ]);
        let err = cli.load_payload().unwrap_err();
        assert!(matches!(err, ServiceError::SerializationError(_)));
        assert_eq!(exit_code(&err), 3);

        let cli = CliConfig::parse_from([
            "model-services",
            "--service",
            "moderation-v1.0.0",
            "--deps-file",
            "/nonexistent/deps.json",
        ]);
        let err = cli.load_deps().unwrap_err();
        assert!(matches!(err, ServiceError::IoError(_)));
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn test_service_required_unless_listing() {
        let cli = CliConfig::parse_from(["model-services"]);
        assert!(matches!(cli.validate(), Err(ServiceError::MissingConfigError { .. })));

        let cli = CliConfig::parse_from(["model-services", "--list"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_load_deps_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "sentiment", "version": "1.0.0", "output": {{"results": []}}}}]"#
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "model-services",
            "--service",
            "moderation-v1.0.0",
            "--deps-file",
            file.path().to_str().unwrap(),
        ]);
        let deps = cli.load_deps().unwrap();
        let key = ServiceKey::new("sentiment", Version::new(1, 0, 0));
        assert_eq!(deps.get(&key).unwrap().data, json!({"results": []}));
        assert!(matches!(cli.load_payload(), Err(ServiceError::MissingConfigError { .. })));
    }
}
