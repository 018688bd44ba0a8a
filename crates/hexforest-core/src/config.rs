//! Run configuration, loadable from JSON

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::ForestError;

/// Configuration for random forest runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Agents to place
    pub agents: usize,
    pub sources: usize,
    pub targets: usize,
    /// Side length of the square grid the region grows in
    pub grid_size: u32,
    /// Fixed seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Activation budget before a run counts as stalled
    pub max_activations: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            agents: 120,
            sources: 3,
            targets: 5,
            grid_size: 40,
            seed: None,
            max_activations: 1_000_000,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), ForestError> {
        let invalid = |msg: String| Err(ForestError::InvalidConfig(msg));
        if self.agents == 0 {
            return invalid("agents must be positive".into());
        }
        if self.sources == 0 {
            return invalid("at least one source is required".into());
        }
        if self.sources + self.targets > self.agents {
            return invalid(format!(
                "{} sources and {} targets do not fit in {} agents",
                self.sources, self.targets, self.agents
            ));
        }
        if self.grid_size < 3 {
            return invalid(format!("grid size {} leaves no interior", self.grid_size));
        }
        let interior = (self.grid_size as usize - 2).pow(2);
        if self.agents > interior {
            return invalid(format!(
                "{} agents do not fit in a grid of size {}",
                self.agents, self.grid_size
            ));
        }
        if self.max_activations == 0 {
            return invalid("max_activations must be positive".into());
        }
        Ok(())
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Errors that can occur loading a config file
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ForestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let too_many_roles = ForestConfig {
            agents: 4,
            sources: 3,
            targets: 2,
            ..ForestConfig::default()
        };
        assert!(too_many_roles.validate().is_err());

        let cramped = ForestConfig {
            agents: 50,
            grid_size: 6,
            ..ForestConfig::default()
        };
        assert!(cramped.validate().is_err());

        let no_budget = ForestConfig {
            max_activations: 0,
            ..ForestConfig::default()
        };
        assert!(no_budget.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ForestConfig = serde_json::from_str(r#"{"agents": 30, "seed": 9}"#).unwrap();
        assert_eq!(config.agents, 30);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.sources, ForestConfig::default().sources);
    }

    #[test]
    fn test_missing_file() {
        let result = ForestConfig::from_json_file("/nonexistent/hexforest.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
