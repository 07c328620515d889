use serde::Serialize;
use serde_json::Value;

use crate::config::ChaosVolatilityThresholds;
use crate::engines::{DebugMap, mean2};
use crate::team_profiles::{Rating, TeamProfile};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityResult {
    pub home_identity_score: f64,
    pub away_identity_score: f64,
    pub pace_avg: f64,
    pub power_diff: f64,
    pub debug: DebugMap,
}

/// Offense/defense differential and tempo baseline for a matchup.
#[derive(Debug, Clone, Copy)]
pub struct IdentityEngine {
    thresholds: ChaosVolatilityThresholds,
}

impl IdentityEngine {
    pub fn new(thresholds: ChaosVolatilityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn compute(&self, home: &TeamProfile, away: &TeamProfile) -> IdentityResult {
        let home_identity_score = identity_score(home);
        let away_identity_score = identity_score(away);
        let pace_avg = mean2(home.rating(Rating::Pace), away.rating(Rating::Pace));
        let power_diff = home.rating(Rating::BasePower) - away.rating(Rating::BasePower);

        let mut debug = DebugMap::new();
        debug.insert("home".to_string(), self.side_debug(home));
        debug.insert("away".to_string(), self.side_debug(away));

        IdentityResult {
            home_identity_score,
            away_identity_score,
            pace_avg,
            power_diff,
            debug,
        }
    }

    fn side_debug(&self, team: &TeamProfile) -> Value {
        serde_json::json!({
            "code": team.code,
            "offense": team.rating(Rating::Offense),
            "defense": team.rating(Rating::Defense),
            "pace": team.rating(Rating::Pace),
            "chaos_tier": self.thresholds.chaos_tier(team.rating(Rating::Chaos)),
            "volatility_tier": self.thresholds.volatility_tier(team.rating(Rating::Volatility)),
        })
    }
}

fn identity_score(team: &TeamProfile) -> f64 {
    (team.rating(Rating::Offense) - team.rating(Rating::Defense)) / 10.0
}
