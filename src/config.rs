use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engines::RiskFlag;
use crate::error::{ModelError, Result};
use crate::team_profiles::{TeamProfile, TeamProfileStore};

pub const CONFIG_ENV: &str = "COURTLINE_CONFIG";

const BUILTIN_CONFIG: &str = include_str!("../config/default_model.json");

static BUILTIN: OnceCell<ModelConfig> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadTotalBaselines {
    pub default_total: f64,
    pub home_edge: f64,
    pub pace_spread_scale: f64,
    pub pace_total_scale: f64,
    pub power_spread_scale: f64,
}

impl SpreadTotalBaselines {
    fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("default_total", self.default_total),
            ("home_edge", self.home_edge),
            ("pace_spread_scale", self.pace_spread_scale),
            ("pace_total_scale", self.pace_total_scale),
            ("power_spread_scale", self.power_spread_scale),
        ]
    }
}

/// Tier cutoffs for the raw 0–10 `chaos` and `volatility` ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChaosVolatilityThresholds {
    pub chaos_low: f64,
    pub chaos_high: f64,
    pub vol_low: f64,
    pub vol_high: f64,
}

impl ChaosVolatilityThresholds {
    pub fn chaos_tier(&self, rating: f64) -> RiskFlag {
        tier(rating, self.chaos_low, self.chaos_high)
    }

    pub fn volatility_tier(&self, rating: f64) -> RiskFlag {
        tier(rating, self.vol_low, self.vol_high)
    }
}

fn tier(value: f64, low: f64, high: f64) -> RiskFlag {
    if value >= high {
        RiskFlag::High
    } else if value <= low {
        RiskFlag::Low
    } else {
        RiskFlag::Medium
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    model_version: String,
    team_profiles: BTreeMap<String, TeamProfile>,
    spread_total_baselines: SpreadTotalBaselines,
    chaos_volatility_thresholds: ChaosVolatilityThresholds,
}

/// Immutable model configuration. Loaded once and handed to the engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_version: String,
    pub profiles: TeamProfileStore,
    pub baselines: SpreadTotalBaselines,
    pub thresholds: ChaosVolatilityThresholds,
}

impl ModelConfig {
    pub fn builtin() -> Result<ModelConfig> {
        BUILTIN
            .get_or_try_init(|| Self::from_json_str(BUILTIN_CONFIG, "built-in config"))
            .cloned()
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<ModelConfig> {
        let file: ConfigFile = serde_json::from_str(raw)
            .map_err(|e| ModelError::config(format!("malformed {origin}: {e}")))?;
        let config = ModelConfig {
            model_version: file.model_version,
            profiles: TeamProfileStore::from_map(file.team_profiles),
            baselines: file.spread_total_baselines,
            thresholds: file.chaos_volatility_thresholds,
        };
        config.validate()?;
        debug!(origin, teams = config.profiles.len(), "model config parsed");
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<ModelConfig> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ModelError::config(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw, &path.display().to_string())
    }

    /// Explicit path first, then `COURTLINE_CONFIG`, then the built-in profiles.
    pub fn load(explicit: Option<&Path>) -> Result<ModelConfig> {
        let path = explicit.map(Path::to_path_buf).or_else(config_path_from_env);
        let config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::builtin()?,
        };
        info!(
            model_version = %config.model_version,
            teams = config.profiles.len(),
            "model config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_version.trim().is_empty() {
            return Err(ModelError::config("model_version must be a non-empty string"));
        }
        self.profiles.validate()?;
        for (key, value) in self.baselines.fields() {
            if !value.is_finite() {
                return Err(ModelError::config(format!(
                    "expected finite numeric value for spread_total_baselines['{key}']"
                )));
            }
        }
        let t = &self.thresholds;
        for (name, low, high) in [("chaos", t.chaos_low, t.chaos_high), ("vol", t.vol_low, t.vol_high)] {
            if !low.is_finite() || !high.is_finite() {
                return Err(ModelError::config(format!(
                    "chaos_volatility_thresholds['{name}_low'/'{name}_high'] must be finite"
                )));
            }
            if low > high {
                return Err(ModelError::config(format!(
                    "chaos_volatility_thresholds: {name}_low ({low}) exceeds {name}_high ({high})"
                )));
            }
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    let raw = std::env::var(CONFIG_ENV).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
