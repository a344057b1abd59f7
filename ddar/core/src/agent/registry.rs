//! Named agent factories

use super::{Agent, BreadthFirstAgent};
use crate::error::{EngineError, EngineResult};
use std::collections::BTreeMap;

/// Builds a fresh agent for one run
pub type AgentFactory = Box<dyn Fn() -> Box<dyn Agent>>;

/// Agents available to a solver, by name
///
/// Created by the caller and handed to [`super::solve`]; nothing is
/// registered globally.
#[derive(Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, AgentFactory>,
}

impl AgentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in agents
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("bfs", || Box::new(BreadthFirstAgent::new()));
        registry
    }

    /// Add or replace the factory registered under `name`
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Agent> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn create(&self, name: &str) -> EngineResult<Box<dyn Agent>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| EngineError::Config(format!("unknown agent `{name}`")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = AgentRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["bfs"]);
        assert_eq!(registry.create("bfs").unwrap().name(), "bfs");
    }

    #[test]
    fn test_unknown_agent() {
        let registry = AgentRegistry::new();
        assert!(!registry.contains("bfs"));
        assert!(matches!(registry.create("bfs"), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut first = AgentRegistry::with_defaults();
        first.register("greedy", || Box::new(BreadthFirstAgent::new()));
        let second = AgentRegistry::with_defaults();
        assert_eq!(first.names(), vec!["bfs", "greedy"]);
        assert_eq!(second.names(), vec!["bfs"]);
    }
}
