use crate::core::service::Service;
use crate::domain::model::{Deadline, DependencyMap, ServiceInput, ServiceOutput};
use crate::domain::ports::{ConfigProvider, Dispatcher};
use crate::utils::error::{Result, ServiceError};
use std::time::{Duration, Instant};

/// Drives one service call: preprocess, dispatch every unit in order, then
/// postprocess, with dispatch and postprocess sharing a single deadline.
pub struct InferenceEngine<D: Dispatcher, C: ConfigProvider> {
    dispatcher: D,
    config: C,
}

impl<D: Dispatcher, C: ConfigProvider> InferenceEngine<D, C> {
    pub fn new(dispatcher: D, config: C) -> Self {
        Self { dispatcher, config }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn api_name<S: Service + ?Sized>(&self, service: &S) -> String {
        service.api_name(self.config.version_separator())
    }

    /// Run `service` against `payload`.
    ///
    /// Errors from preprocess, postprocess and the dispatcher are returned
    /// as they are. The one exception is running out of time after
    /// preprocess: that always comes back as [`ServiceError::ServiceTimeout`]
    /// with the service's api name and the timeout that was applied
    /// (`timeout` if given and non-zero, otherwise the configured
    /// per-service timeout).
    pub async fn inference<S: Service + ?Sized>(
        &self,
        service: &S,
        payload: &ServiceInput,
        deps: &DependencyMap,
        timeout: Option<Duration>,
    ) -> Result<ServiceOutput> {
        let api_name = self.api_name(service);
        let started = Instant::now();

        tracing::debug!("[{}] preprocessing", api_name);
        let preprocess_results = service.preprocess(payload, deps)?;

        let effective_timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| self.config.per_service_timeout());
        let deadline = Deadline::after(effective_timeout);
        let timed_out = || ServiceError::ServiceTimeout {
            api_name: api_name.clone(),
            timeout: effective_timeout,
        };

        let mut inference_results = Vec::with_capacity(preprocess_results.len());
        for (index, unit) in preprocess_results.iter().enumerate() {
            let model_name = unit
                .model_name
                .as_deref()
                .unwrap_or_else(|| service.target_model_name());
            tracing::debug!(
                "[{}] dispatching unit {}/{} to model '{}'",
                api_name,
                index + 1,
                preprocess_results.len(),
                model_name
            );

            let call = self
                .dispatcher
                .infer(model_name, &unit.inputs, &unit.outputs, deadline);
            match tokio::time::timeout_at(deadline.expires_at(), call).await {
                Ok(Ok(result)) => inference_results.push(result),
                Ok(Err(e)) if e.is_timeout() => {
                    tracing::warn!("⏱️ [{}] dispatcher timed out on unit {}: {}", api_name, index + 1, e);
                    return Err(timed_out());
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::warn!(
                        "⏱️ [{}] deadline of {:?} elapsed while dispatching unit {}",
                        api_name,
                        effective_timeout,
                        index + 1
                    );
                    return Err(timed_out());
                }
            }
        }

        tracing::debug!("[{}] postprocessing {} results", api_name, inference_results.len());
        let output = service.postprocess(payload, deps, &preprocess_results, inference_results)?;

        // postprocess cannot be interrupted, so the deadline is enforced on its way out
        if deadline.is_expired() {
            tracing::warn!(
                "⏱️ [{}] deadline of {:?} elapsed during postprocess",
                api_name,
                effective_timeout
            );
            return Err(timed_out());
        }

        tracing::info!(
            "✅ [{}] completed {} dispatch calls in {:?}",
            api_name,
            preprocess_results.len(),
            started.elapsed()
        );
        Ok(output)
    }
}
