use crate::core::service::Service;
use crate::utils::error::{Result, ServiceError};
use std::collections::HashMap;
use std::sync::Arc;

/// Services addressable by api name. Registration validates each service so
/// that malformed ones are rejected before any request reaches them.
pub struct ServiceRegistry {
    separator: String,
    services: HashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            services: HashMap::new(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Register a service, returning its api name.
    pub fn register(&mut self, service: Arc<dyn Service>) -> Result<String> {
        self.check_service(service.as_ref())?;

        let api_name = service.api_name(&self.separator);
        if self.services.contains_key(&api_name) {
            return Err(ServiceError::DuplicateService { api_name });
        }

        tracing::info!(
            "📦 Registered service {} (model: {}, dependencies: {})",
            api_name,
            service.target_model_name(),
            service.dependencies().len()
        );
        self.services.insert(api_name.clone(), service);
        Ok(api_name)
    }

    fn check_service(&self, service: &dyn Service) -> Result<()> {
        let invalid = |reason: &str| ServiceError::InvalidService {
            service: service.name().to_string(),
            reason: reason.to_string(),
        };

        if service.name().trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if service.name().contains(self.separator.as_str()) {
            return Err(invalid("name must not contain the version separator"));
        }
        if service.target_model_name().trim().is_empty() {
            return Err(invalid("target model name must not be empty"));
        }
        if service.dependencies().contains(&service.key()) {
            return Err(invalid("service cannot depend on itself"));
        }
        Ok(())
    }

    pub fn get(&self, api_name: &str) -> Option<Arc<dyn Service>> {
        self.services.get(api_name).cloned()
    }

    /// Registered api names, sorted.
    pub fn api_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        DependencyMap, InferenceResult, PreprocessOutput, ServiceInput, ServiceKey, ServiceOutput,
        Version,
    };
    use std::collections::HashSet;

    struct Named {
        name: &'static str,
        version: Version,
        model: &'static str,
        self_dependent: bool,
    }

    fn named(name: &'static str, version: Version) -> Arc<dyn Service> {
        Arc::new(Named {
            name,
            version,
            model: "some_model",
            self_dependent: false,
        })
    }

    impl Service for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn version(&self) -> Version {
            self.version.clone()
        }

        fn target_model_name(&self) -> &str {
            self.model
        }

        fn preprocess(
            &self,
            _payload: &ServiceInput,
            _deps: &DependencyMap,
        ) -> Result<Vec<PreprocessOutput>> {
            Ok(Vec::new())
        }

        fn postprocess(
            &self,
            _payload: &ServiceInput,
            _deps: &DependencyMap,
            _preprocess_results: &[PreprocessOutput],
            _inference_results: Vec<InferenceResult>,
        ) -> Result<ServiceOutput> {
            Ok(ServiceOutput::default())
        }

        fn dependencies(&self) -> HashSet<ServiceKey> {
            if self.self_dependent {
                HashSet::from([self.key()])
            } else {
                HashSet::new()
            }
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ServiceRegistry::new("-");
        assert!(registry.is_empty());

        let api_name = registry.register(named("foo", Version::new(1, 0, 0))).unwrap();
        assert_eq!(api_name, "foo-v1.0.0");
        registry.register(named("foo", Version::new(1, 1, 0))).unwrap();
        registry.register(named("bar", Version::new(0, 3, 2))).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.api_names(),
            vec!["bar-v0.3.2", "foo-v1.0.0", "foo-v1.1.0"]
        );
        assert_eq!(registry.get("foo-v1.1.0").unwrap().version(), Version::new(1, 1, 0));
        assert!(registry.get("foo-v2.0.0").is_none());
    }

    #[test]
    fn test_duplicate_api_name_rejected() {
        let mut registry = ServiceRegistry::new("-");
        registry.register(named("foo", Version::new(1, 0, 0))).unwrap();

        let err = registry.register(named("foo", Version::new(1, 0, 0))).unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateService { ref api_name } if api_name == "foo-v1.0.0"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_services_rejected() {
        let mut registry = ServiceRegistry::new("-");

        for service in [
            named("", Version::new(1, 0, 0)),
            named("has-dash", Version::new(1, 0, 0)),
            Arc::new(Named {
                name: "nomodel",
                version: Version::new(1, 0, 0),
                model: " ",
                self_dependent: false,
            }) as Arc<dyn Service>,
            Arc::new(Named {
                name: "selfish",
                version: Version::new(1, 0, 0),
                model: "m",
                self_dependent: true,
            }) as Arc<dyn Service>,
        ] {
            assert!(matches!(
                registry.register(service),
                Err(ServiceError::InvalidService { .. })
            ));
        }
        assert!(registry.is_empty());
    }
}
