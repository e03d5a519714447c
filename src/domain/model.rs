use crate::utils::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Semantic version (major.minor.patch, optional pre-release and build metadata).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ServiceError::InvalidVersion {
            value: value.to_string(),
        };

        let trimmed = value.trim().trim_start_matches('v');
        let (rest, build) = match trimmed.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (trimmed, None),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let numbers = core
            .split('.')
            .map(parse_numeric_identifier)
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(invalid)?;
        let &[major, minor, patch] = numbers.as_slice() else {
            return Err(invalid());
        };

        for extra in [pre, build].into_iter().flatten() {
            if !is_valid_dotted_identifier(extra) {
                return Err(invalid());
            }
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre: pre.map(str::to_string),
            build: build.map(str::to_string),
        })
    }
}

fn parse_numeric_identifier(part: &str) -> Option<u64> {
    if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
        return None;
    }
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn is_valid_dotted_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|id| {
            !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

/// Stable identity of a service, used as the key of a [`DependencyMap`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    pub name: String,
    pub version: Version,
}

impl ServiceKey {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    pub fn api_name(&self, separator: &str) -> String {
        format!("{}{}v{}", self.name, separator, self.version)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Request payload handed to a service. Its shape is up to each service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceInput {
    pub data: serde_json::Value,
}

impl ServiceInput {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }
}

/// Result of a service call after postprocessing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceOutput {
    pub data: serde_json::Value,
}

impl ServiceOutput {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }
}

/// Outputs of upstream services, keyed by their identity.
pub type DependencyMap = HashMap<ServiceKey, ServiceOutput>;

/// A named tensor in KServe v2 JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub name: String,
    pub datatype: String,
    pub shape: Vec<i64>,
    pub data: serde_json::Value,
}

impl Tensor {
    pub fn new(
        name: impl Into<String>,
        datatype: impl Into<String>,
        shape: Vec<i64>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            datatype: datatype.into(),
            shape,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedOutput {
    pub name: String,
}

impl RequestedOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One unit of backend work derived from a [`ServiceInput`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessOutput {
    /// Overrides the service's target model for this unit only.
    pub model_name: Option<String>,
    pub inputs: Vec<Tensor>,
    pub outputs: Vec<RequestedOutput>,
}

impl PreprocessOutput {
    pub fn new(inputs: Vec<Tensor>, outputs: Vec<RequestedOutput>) -> Self {
        Self {
            model_name: None,
            inputs,
            outputs,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }
}

/// Raw result of one dispatcher call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default)]
    pub outputs: Vec<Tensor>,
}

impl InferenceResult {
    pub fn output(&self, name: &str) -> Option<&Tensor> {
        self.outputs.iter().find(|t| t.name == name)
    }
}

/// Time budget of one service invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// The full timeout this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
