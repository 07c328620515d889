use serde::Serialize;
use serde_json::Value;

use crate::engines::{ChaosResult, DebugMap, RiskFlag, mean2};
use crate::team_profiles::TeamProfile;

pub const VOLATILITY_HIGH: f64 = 0.45;
pub const VOLATILITY_MEDIUM: f64 = 0.25;

const MINUTES_WEIGHT: f64 = 0.6;
const INJURY_WEIGHT: f64 = 0.4;
const CHAOS_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityResult {
    pub volatility_score: f64,
    pub volatility_flag: RiskFlag,
    pub debug: DebugMap,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityEngine;

impl VolatilityEngine {
    /// Needs the chaos output of the same matchup, so it always runs after the chaos stage.
    pub fn compute(
        &self,
        home: &TeamProfile,
        away: &TeamProfile,
        chaos: &ChaosResult,
    ) -> VolatilityResult {
        let minutes = mean2(
            home.attribute("minutes_variance"),
            away.attribute("minutes_variance"),
        );
        let injury = mean2(home.attribute("injury_risk"), away.attribute("injury_risk"));
        let volatility_score =
            MINUTES_WEIGHT * minutes + INJURY_WEIGHT * injury + CHAOS_WEIGHT * chaos.chaos_prob;
        let volatility_flag =
            RiskFlag::classify(volatility_score, VOLATILITY_HIGH, VOLATILITY_MEDIUM);

        let mut debug = DebugMap::new();
        debug.insert("minutes_variance_avg".to_string(), Value::from(minutes));
        debug.insert("injury_risk_avg".to_string(), Value::from(injury));
        debug.insert("chaos_prob".to_string(), Value::from(chaos.chaos_prob));

        VolatilityResult {
            volatility_score,
            volatility_flag,
            debug,
        }
    }
}
