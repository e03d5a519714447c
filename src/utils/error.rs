use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service {api_name} timed out after {timeout:?}")]
    ServiceTimeout { api_name: String, timeout: Duration },

    #[error("Invalid service '{service}': {reason}")]
    InvalidService { service: String, reason: String },

    #[error("Service already registered: {api_name}")]
    DuplicateService { api_name: String },

    #[error("Unknown service: {api_name}")]
    UnknownService { api_name: String },

    #[error("Dependencies not satisfied for {api_name}: missing {}", .missing.join(", "))]
    DependenciesNotSatisfied { api_name: String, missing: Vec<String> },

    #[error("Preprocess error: {message}")]
    PreprocessError { message: String },

    #[error("Postprocess error: {message}")]
    PostprocessError { message: String },

    #[error("Backend error from model '{model}' (status {status}): {message}")]
    BackendError {
        model: String,
        status: u16,
        message: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid semantic version '{value}'")]
    InvalidVersion { value: String },
}

impl ServiceError {
    /// Whether this error means the call ran out of time, either our own
    /// deadline or a timeout raised by the HTTP client underneath it.
    pub fn is_timeout(&self) -> bool {
        match self {
            ServiceError::ServiceTimeout { .. } => true,
            ServiceError::ApiError(e) => e.is_timeout(),
            ServiceError::IoError(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ServiceError::ConfigError { .. }
                | ServiceError::ConfigValidationError { .. }
                | ServiceError::InvalidConfigValueError { .. }
                | ServiceError::MissingConfigError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
