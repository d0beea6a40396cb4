use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::massing::MassingParams;
use crate::models::CampusMode;
use crate::thresholds::{ThresholdSet, ThresholdStore};

pub const CONFIG_ENV_VAR: &str = "FACILITY_FLOW_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub thresholds: ThresholdSet,
    pub campus_mode: CampusMode,
    pub massing: MassingParams,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    pub fn threshold_store(&self) -> ThresholdStore {
        ThresholdStore::new(self.thresholds, self.campus_mode)
    }
}

fn resolve_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `--config`, then `FACILITY_FLOW_CONFIG`, then built-in defaults. A named
/// file that cannot be read is an error.
pub fn load(cli_arg: Option<&Path>) -> anyhow::Result<AppConfig> {
    let Some(path) = resolve_path(cli_arg) else {
        tracing::info!("no configuration file given, using defaults");
        return Ok(AppConfig::default());
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = AppConfig::from_toml(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");

    for warning in config.thresholds.policy_warnings() {
        tracing::warn!(path = %path.display(), "{warning}");
    }
    Ok(config)
}
