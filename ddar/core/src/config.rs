//! Engine and run configuration

use crate::error::{EngineError, EngineResult};
use crate::ir::Tolerance;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tolerance shared by every numeric check
    pub tolerance: Tolerance,

    /// Rule names skipped during matching
    pub disabled_rules: Vec<String>,

    /// Maximum number of bindings taken from one match action
    pub max_matches_per_rule: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            disabled_rules: Vec::new(),
            max_matches_per_rule: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn is_disabled(&self, rule: &str) -> bool {
        self.disabled_rules.iter().any(|r| r == rule)
    }
}

/// Limits enforced by the driver loop between steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunBudget {
    /// Maximum number of actions
    pub max_steps: usize,

    /// Wall-clock limit in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for RunBudget {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            timeout_ms: None,
        }
    }
}

impl RunBudget {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"disabled_rules": ["aa_similarity"]}"#).unwrap();
        assert!(config.is_disabled("aa_similarity"));
        assert!(!config.is_disabled("sas_similarity"));
        assert_eq!(config.max_matches_per_rule, EngineConfig::default().max_matches_per_rule);
        assert_eq!(config.tolerance, Tolerance::default());
    }

    #[test]
    fn test_bad_config_is_reported() {
        let err = EngineConfig::from_json(r#"{"max_matches_per_rule": "many"}"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_budget_timeout() {
        let budget: RunBudget = serde_json::from_str(r#"{"timeout_ms": 250}"#).unwrap();
        assert_eq!(budget.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(budget.max_steps, RunBudget::default().max_steps);
    }
}
