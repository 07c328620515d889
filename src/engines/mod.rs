use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod chaos;
pub mod identity;
pub mod registry;
pub mod volatility;

pub use chaos::{ChaosEngine, ChaosResult};
pub use identity::{IdentityEngine, IdentityResult};
pub use registry::{EngineId, EngineSpec, available_engines, lookup_engine, run_engine};
pub use volatility::{VolatilityEngine, VolatilityResult};

pub type DebugMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFlag {
    Low,
    Medium,
    High,
}

impl RiskFlag {
    /// Strictly-greater cutoffs: `value > high` is High, `value > medium` is Medium.
    pub fn classify(value: f64, high: f64, medium: f64) -> RiskFlag {
        if value > high {
            RiskFlag::High
        } else if value > medium {
            RiskFlag::Medium
        } else {
            RiskFlag::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskFlag::Low => "low",
            RiskFlag::Medium => "medium",
            RiskFlag::High => "high",
        }
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum EngineOutput {
    Identity(IdentityResult),
    Chaos(ChaosResult),
    Volatility(VolatilityResult),
}

impl EngineOutput {
    pub fn engine(&self) -> EngineId {
        match self {
            EngineOutput::Identity(_) => EngineId::Identity,
            EngineOutput::Chaos(_) => EngineId::Chaos,
            EngineOutput::Volatility(_) => EngineId::Volatility,
        }
    }

    pub fn flag(&self) -> Option<RiskFlag> {
        match self {
            EngineOutput::Identity(_) => None,
            EngineOutput::Chaos(r) => Some(r.chaos_flag),
            EngineOutput::Volatility(r) => Some(r.volatility_flag),
        }
    }

    pub fn debug(&self) -> &DebugMap {
        match self {
            EngineOutput::Identity(r) => &r.debug,
            EngineOutput::Chaos(r) => &r.debug,
            EngineOutput::Volatility(r) => &r.debug,
        }
    }

    pub fn as_chaos(&self) -> Option<&ChaosResult> {
        match self {
            EngineOutput::Chaos(r) => Some(r),
            _ => None,
        }
    }
}

pub(crate) fn mean2(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}
