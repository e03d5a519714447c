use crate::domain::model::{Deadline, InferenceResult, RequestedOutput, Tensor};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Settings every service call depends on.
pub trait ConfigProvider: Send + Sync {
    /// Joins a service name and its version string into an api name.
    fn version_separator(&self) -> &str;
    /// Timeout applied when the caller does not pass one.
    fn per_service_timeout(&self) -> Duration;
}

/// Backend that runs model inference.
///
/// Implementations must be safe to call from many concurrent service calls.
/// The deadline is informational: callers already race the returned future
/// against it, but implementations may use it to bound their own I/O.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn infer(
        &self,
        model_name: &str,
        inputs: &[Tensor],
        outputs: &[RequestedOutput],
        deadline: Deadline,
    ) -> Result<InferenceResult>;
}

#[async_trait]
impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    async fn infer(
        &self,
        model_name: &str,
        inputs: &[Tensor],
        outputs: &[RequestedOutput],
        deadline: Deadline,
    ) -> Result<InferenceResult> {
        (**self).infer(model_name, inputs, outputs, deadline).await
    }
}

impl<C: ConfigProvider + ?Sized> ConfigProvider for Arc<C> {
    fn version_separator(&self) -> &str {
        (**self).version_separator()
    }

    fn per_service_timeout(&self) -> Duration {
        (**self).per_service_timeout()
    }
}
