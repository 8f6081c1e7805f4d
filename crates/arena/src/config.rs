//! Arena Configuration

use std::path::Path;

use anyhow::Context;
use match_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// WebSocket bind address
    pub ws_addr: String,
    /// HTTP bind address
    pub http_addr: String,
    /// Treat a dropped connection as a `leave`
    pub leave_on_disconnect: bool,
    /// Room and match settings
    pub runtime: RuntimeConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ws_addr: "127.0.0.1:9100".to_string(),
            http_addr: "127.0.0.1:9101".to_string(),
            leave_on_disconnect: true,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }
}
