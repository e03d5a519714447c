pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::TritonDispatcher;
pub use config::{ServicesConfig, StaticConfig};
pub use crate::core::{
    engine::InferenceEngine, registry::ServiceRegistry, router::ServiceRouter, service::Service,
};
pub use domain::model::{
    Deadline, DependencyMap, InferenceResult, PreprocessOutput, RequestedOutput, ServiceInput,
    ServiceKey, ServiceOutput, Tensor, Version,
};
pub use domain::ports::{ConfigProvider, Dispatcher};
pub use utils::error::{Result, ServiceError};
