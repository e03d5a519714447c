pub mod engine;
pub mod registry;
pub mod router;
pub mod service;

pub use crate::domain::model::{
    Deadline, DependencyMap, InferenceResult, PreprocessOutput, RequestedOutput, ServiceInput,
    ServiceKey, ServiceOutput, Tensor, Version,
};
pub use crate::domain::ports::{ConfigProvider, Dispatcher};
pub use crate::utils::error::Result;
