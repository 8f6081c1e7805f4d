//! Runtime Configuration

use match_core::{MatchRules, Mode};
use serde::{Deserialize, Serialize};

use crate::{COMMAND_BUFFER, EVENT_BUFFER, PREP_TICK_MS};

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Countdown tick interval in milliseconds
    pub prep_tick_ms: u64,
    /// Intent queue depth per room
    pub command_buffer: usize,
    /// Event buffer per room subscriber
    pub event_buffer: usize,
    /// Mode used when the opening joiner does not state one
    pub default_mode: Mode,
    /// Rules applied to every new session
    pub rules: MatchRules,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prep_tick_ms: PREP_TICK_MS,
            command_buffer: COMMAND_BUFFER,
            event_buffer: EVENT_BUFFER,
            default_mode: Mode::Duel,
            rules: MatchRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"prep_tick_ms": 100, "rules": {"roundCount": 3}}"#).unwrap();
        assert_eq!(config.prep_tick_ms, 100);
        assert_eq!(config.command_buffer, COMMAND_BUFFER);
        assert_eq!(config.rules.round_count, 3);
        assert_eq!(config.rules.prep_duration_ms, 15_000);
        assert_eq!(config.default_mode, Mode::Duel);
    }
}
