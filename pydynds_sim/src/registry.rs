//! Name → algorithm factory lookup used by `setup`.

use crate::algorithm::{Algorithm, AlgorithmArgs, AlgorithmWorker};
use crate::algorithms::{RandomExchange, SampleAlgorithm};
use crate::error::SimError;

use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a solver from the setup arguments.
pub type AlgorithmFactory = Arc<dyn Fn(&AlgorithmArgs) -> Box<dyn Algorithm> + Send + Sync>;

/// Registered algorithm variants keyed by name.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    factories: BTreeMap<String, AlgorithmFactory>,
}

impl AlgorithmRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in algorithms.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(SampleAlgorithm::NAME, SampleAlgorithm::build);
        registry.register(RandomExchange::NAME, RandomExchange::build);
        registry
    }

    /// Adds or replaces the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&AlgorithmArgs) -> Box<dyn Algorithm> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiates the worker for `name`.
    pub fn build(&self, name: &str, args: AlgorithmArgs) -> Result<Arc<AlgorithmWorker>, SimError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| SimError::UnknownVariant(name.to_string()))?;
        let algorithm = factory(&args);
        Ok(Arc::new(AlgorithmWorker::new(algorithm, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = AlgorithmRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["random_exchange", "sample_algorithm"]);
        assert!(registry.contains("sample_algorithm"));
    }

    #[test]
    fn test_build_known_variant() {
        let registry = AlgorithmRegistry::with_builtin();
        let worker = registry
            .build("sample_algorithm", AlgorithmArgs::standalone(None))
            .unwrap();
        assert_eq!(worker.algorithm_name(), "sample_algorithm");
    }

    #[test]
    fn test_unknown_variant() {
        let registry = AlgorithmRegistry::with_builtin();
        let err = registry
            .build("dpop", AlgorithmArgs::standalone(None))
            .err()
            .unwrap();
        assert!(matches!(err, SimError::UnknownVariant(name) if name == "dpop"));
    }

    #[test]
    fn test_register_custom() {
        let mut registry = AlgorithmRegistry::new();
        registry.register("custom", SampleAlgorithm::build);
        assert_eq!(registry.names(), vec!["custom"]);
    }
}
