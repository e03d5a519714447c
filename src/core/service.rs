use crate::domain::model::{
    DependencyMap, InferenceResult, PreprocessOutput, ServiceInput, ServiceKey, ServiceOutput,
    Version,
};
use crate::utils::error::Result;
use std::collections::HashSet;

/// A named, versioned unit that turns a request into backend inference calls
/// and folds the raw results back into an output.
///
/// `preprocess` and `postprocess` run synchronously and must not block on
/// I/O; only the dispatcher calls in between are awaited. See
/// [`InferenceEngine::inference`](crate::core::engine::InferenceEngine::inference).
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> Version;

    /// Model invoked for every preprocess unit that does not name its own.
    fn target_model_name(&self) -> &str;

    /// Split a request into units of backend work, in dispatch order.
    fn preprocess(&self, payload: &ServiceInput, deps: &DependencyMap)
        -> Result<Vec<PreprocessOutput>>;

    /// Build the output from the preprocess units and their inference
    /// results. `inference_results[i]` belongs to `preprocess_results[i]`.
    fn postprocess(
        &self,
        payload: &ServiceInput,
        deps: &DependencyMap,
        preprocess_results: &[PreprocessOutput],
        inference_results: Vec<InferenceResult>,
    ) -> Result<ServiceOutput>;

    /// Services whose outputs must be present in the dependency map.
    fn dependencies(&self) -> HashSet<ServiceKey> {
        HashSet::new()
    }

    fn key(&self) -> ServiceKey {
        ServiceKey::new(self.name(), self.version())
    }

    fn version_str(&self) -> String {
        format!("v{}", self.version())
    }

    fn api_name(&self, separator: &str) -> String {
        format!("{}{}{}", self.name(), separator, self.version_str())
    }

    /// Flat membership check: every declared dependency is a key of `deps`.
    /// Transitive dependencies and cycles are not looked at.
    fn deps_satisfied(&self, deps: &DependencyMap) -> bool {
        self.dependencies().iter().all(|d| deps.contains_key(d))
    }

    /// Declared dependencies absent from `deps`, sorted for stable messages.
    fn missing_dependencies(&self, deps: &DependencyMap) -> Vec<ServiceKey> {
        let mut missing: Vec<ServiceKey> = self
            .dependencies()
            .into_iter()
            .filter(|d| !deps.contains_key(d))
            .collect();
        missing.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.version.to_string().cmp(&b.version.to_string()))
        });
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Foo {
        deps: HashSet<ServiceKey>,
    }

    impl Foo {
        fn new() -> Self {
            Self {
                deps: HashSet::new(),
            }
        }

        fn depending_on(keys: &[ServiceKey]) -> Self {
            Self {
                deps: keys.iter().cloned().collect(),
            }
        }
    }

    impl Service for Foo {
        fn name(&self) -> &str {
            "foo"
        }

        fn version(&self) -> Version {
            Version::new(1, 0, 0)
        }

        fn target_model_name(&self) -> &str {
            "foo_model"
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
            self.deps.clone()
        }
    }

    fn key(name: &str) -> ServiceKey {
        ServiceKey::new(name, Version::new(1, 0, 0))
    }

    fn output() -> ServiceOutput {
        ServiceOutput::new(json!({"ok": true}))
    }

    #[test]
    fn test_api_name_joins_name_separator_and_version() {
        let foo = Foo::new();
        assert_eq!(foo.version_str(), "v1.0.0");
        assert_eq!(foo.api_name("-"), "foo-v1.0.0");
        assert_eq!(foo.api_name("__"), "foo__v1.0.0");
        assert_eq!(foo.api_name("-"), foo.api_name("-"));
        assert_eq!(foo.key().api_name("-"), foo.api_name("-"));
    }

    #[test]
    fn test_no_dependencies_always_satisfied() {
        let foo = Foo::new();
        assert!(foo.deps_satisfied(&DependencyMap::new()));

        let mut deps = DependencyMap::new();
        deps.insert(key("other"), output());
        assert!(foo.deps_satisfied(&deps));
    }

    #[test]
    fn test_deps_satisfied_requires_every_key() {
        let foo = Foo::depending_on(&[key("a"), key("b")]);
        let mut deps = DependencyMap::new();
        assert!(!foo.deps_satisfied(&deps));

        deps.insert(key("a"), output());
        assert!(!foo.deps_satisfied(&deps));
        assert_eq!(foo.missing_dependencies(&deps), vec![key("b")]);

        deps.insert(key("b"), output());
        deps.insert(key("extra"), output());
        assert!(foo.deps_satisfied(&deps));
        assert!(foo.missing_dependencies(&deps).is_empty());
    }

    #[test]
    fn test_deps_keyed_by_version_too() {
        let foo = Foo::depending_on(&[key("a")]);
        let mut deps = DependencyMap::new();
        deps.insert(ServiceKey::new("a", Version::new(2, 0, 0)), output());
        assert!(!foo.deps_satisfied(&deps));
    }
}
