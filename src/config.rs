//! Rules and service configuration, loaded from RON.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a RON config file.
pub const CONFIG_ENV_VAR: &str = "PVE_CONFIG";

/// Numeric rules of a battle. Carried by every [`crate::battle::context::BattleContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub bench_size: usize,
    pub opening_hand: usize,
    pub max_deck_size: usize,
    /// Knockouts a side needs to win.
    pub prizes_to_win: u8,
    pub max_energy_per_card: usize,
    /// Upper bound on decisions the AI makes in a single turn.
    pub max_ai_steps: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            bench_size: 3,
            opening_hand: 5,
            max_deck_size: 10,
            prizes_to_win: 2,
            max_energy_per_card: 10,
            max_ai_steps: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Upper bound on AI turns driven by one inbound action.
    pub max_ai_turns_per_action: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_ai_turns_per_action: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PveConfig {
    pub rules: RulesConfig,
    pub service: ServiceConfig,
}

impl PveConfig {
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Loads the file named by `PVE_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!(path = ?path, "loading PvE config");
                Self::load(Path::new(&path))
            }
            None => Ok(Self::default()),
        }
    }
}
