use crate::core::engine::InferenceEngine;
use crate::core::registry::ServiceRegistry;
use crate::core::service::Service;
use crate::domain::model::{DependencyMap, ServiceInput, ServiceOutput};
use crate::domain::ports::{ConfigProvider, Dispatcher};
use crate::utils::error::{Result, ServiceError};
use std::sync::Arc;
use std::time::Duration;

/// Routes a request to the service registered under an api name.
pub struct ServiceRouter<D: Dispatcher, C: ConfigProvider> {
    registry: ServiceRegistry,
    engine: InferenceEngine<D, C>,
}

impl<D: Dispatcher, C: ConfigProvider> ServiceRouter<D, C> {
    pub fn new(engine: InferenceEngine<D, C>) -> Self {
        let registry = ServiceRegistry::new(engine.config().version_separator());
        Self { registry, engine }
    }

    pub fn register(&mut self, service: Arc<dyn Service>) -> Result<String> {
        self.registry.register(service)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.registry
    }

    pub fn engine(&self) -> &InferenceEngine<D, C> {
        &self.engine
    }

    /// Look up `api_name`, check its direct dependencies are in `deps`, then
    /// run it through the engine.
    pub async fn route(
        &self,
        api_name: &str,
        payload: &ServiceInput,
        deps: &DependencyMap,
        timeout: Option<Duration>,
    ) -> Result<ServiceOutput> {
        let service = self
            .registry
            .get(api_name)
            .ok_or_else(|| ServiceError::UnknownService {
                api_name: api_name.to_string(),
            })?;

        if !service.deps_satisfied(deps) {
            let missing: Vec<String> = service
                .missing_dependencies(deps)
                .iter()
                .map(ToString::to_string)
                .collect();
            tracing::warn!("[{}] missing dependencies: {}", api_name, missing.join(", "));
            return Err(ServiceError::DependenciesNotSatisfied {
                api_name: api_name.to_string(),
                missing,
            });
        }

        self.engine
            .inference(service.as_ref(), payload, deps, timeout)
            .await
    }
}
