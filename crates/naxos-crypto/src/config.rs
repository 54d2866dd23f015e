//! Configuration resolution.
//!
//! Hierarchical, lowest priority first:
//! 1. Built-in defaults (RFC 3526 group, identities `Alice`/`Bob`)
//! 2. JSON config file
//! 3. Environment variables (`NAXOS_*`)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NaxosError, Result};
use crate::group::GroupParameters;
use crate::session::SessionIdentity;

/// Default group preset.
pub const DEFAULT_GROUP_PRESET: &str = "modp2048";

/// Complete NAXOS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            group: GroupConfig::default(),
            session: SessionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Group selection: a named preset, or an explicit hex triple which wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupConfig {
    pub preset: Option<String>,
    pub modulus: Option<String>,
    pub order: Option<String>,
    pub generator: Option<String>,
}

/// Identities in their agreed `(initiator, responder)` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub initiator_id: String,
    pub responder_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initiator_id: "Alice".to_string(),
            responder_id: "Bob".to_string(),
        }
    }
}

impl Config {
    /// Resolve and validate the configured group.
    pub fn group_parameters(&self) -> Result<GroupParameters> {
        let group = &self.group;
        match (&group.modulus, &group.order, &group.generator) {
            (Some(p), Some(q), Some(g)) => GroupParameters::from_hex(p, q, g),
            (None, None, None) => {
                GroupParameters::preset(group.preset.as_deref().unwrap_or(DEFAULT_GROUP_PRESET))
            }
            _ => Err(NaxosError::Config(
                "group.modulus, group.order and group.generator must be given together".into(),
            )),
        }
    }

    pub fn session_identity(&self) -> Result<SessionIdentity> {
        let session = &self.session;
        if session.initiator_id.is_empty() || session.responder_id.is_empty() {
            return Err(NaxosError::Config("identities must not be empty".into()));
        }
        Ok(SessionIdentity::new(
            session.initiator_id.clone(),
            session.responder_id.clone(),
        ))
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        NaxosError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        NaxosError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("NAXOS_GROUP") {
        // A preset from the environment replaces any explicit triple.
        config.group = GroupConfig {
            preset: Some(val),
            ..GroupConfig::default()
        };
    }
    if let Some(val) = var("NAXOS_INITIATOR_ID") {
        config.session.initiator_id = val;
    }
    if let Some(val) = var("NAXOS_RESPONDER_ID") {
        config.session.responder_id = val;
    }
    if let Some(val) = var("NAXOS_LOG_LEVEL") {
        config.log_level = val;
    }
}
