use serde::Serialize;
use serde_json::Value;

use crate::engines::{DebugMap, RiskFlag, mean2};
use crate::team_profiles::TeamProfile;

pub const CHAOS_HIGH: f64 = 0.30;
pub const CHAOS_MEDIUM: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChaosResult {
    pub chaos_prob: f64,
    pub foul_variance: f64,
    pub chaos_flag: RiskFlag,
    pub debug: DebugMap,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChaosEngine;

impl ChaosEngine {
    // Notes are recorded for debugging only; they never move the score.
    pub fn compute(&self, home: &TeamProfile, away: &TeamProfile, notes: Option<&str>) -> ChaosResult {
        let home_rate = home.attribute("chaos_rate");
        let away_rate = away.attribute("chaos_rate");
        let home_fouls = home.attribute("foul_variance");
        let away_fouls = away.attribute("foul_variance");

        let chaos_prob = mean2(home_rate, away_rate);
        let foul_variance = mean2(home_fouls, away_fouls);
        let chaos_flag = RiskFlag::classify(chaos_prob, CHAOS_HIGH, CHAOS_MEDIUM);

        let mut debug = DebugMap::new();
        debug.insert("home_chaos_rate".to_string(), Value::from(home_rate));
        debug.insert("away_chaos_rate".to_string(), Value::from(away_rate));
        debug.insert("home_foul_variance".to_string(), Value::from(home_fouls));
        debug.insert("away_foul_variance".to_string(), Value::from(away_fouls));
        debug.insert(
            "notes".to_string(),
            notes.map(Value::from).unwrap_or(Value::Null),
        );

        ChaosResult {
            chaos_prob,
            foul_variance,
            chaos_flag,
            debug,
        }
    }
}
