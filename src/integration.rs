use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ModelConfig, SpreadTotalBaselines};
use crate::engines::registry::{EngineId, run_engine};
use crate::engines::{ChaosResult, DebugMap, EngineOutput, IdentityResult, RiskFlag, VolatilityResult};
use crate::error::{ModelError, Result};
use crate::team_profiles::normalize_code;

pub const ENGINE_VERSION: &str = "courtline-0.1-integration";

const CHAOS_SPREAD_PENALTY: f64 = 2.0;
const VOLATILITY_SPREAD_PENALTY: f64 = 3.0;
const PACE_TOTAL_MULTIPLIER: f64 = 2.2;
const FOUL_TOTAL_MULTIPLIER: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchupContext {
    home_team: String,
    away_team: String,
    notes: Option<String>,
}

impl MatchupContext {
    /// Codes are trimmed and upper-cased; a team can't play itself.
    pub fn new(home_team: &str, away_team: &str, notes: Option<&str>) -> Result<Self> {
        let home_team = normalize_code(home_team);
        let away_team = normalize_code(away_team);
        if home_team.is_empty() || away_team.is_empty() {
            return Err(ModelError::invalid_input(
                "home_team and away_team must be non-empty team codes",
            ));
        }
        if home_team == away_team {
            return Err(ModelError::invalid_input(format!(
                "home_team and away_team must be different teams (got {home_team} twice)"
            )));
        }
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(Self {
            home_team,
            away_team,
            notes,
        })
    }

    pub fn home_team(&self) -> &str {
        &self.home_team
    }

    pub fn away_team(&self) -> &str {
        &self.away_team
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    // Inverse of volatility risk.
    pub fn from_volatility(flag: RiskFlag) -> Confidence {
        match flag {
            RiskFlag::High => Confidence::Low,
            RiskFlag::Medium => Confidence::Medium,
            RiskFlag::Low => Confidence::High,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub base_spread: f64,
    pub base_total: f64,
    pub pace_factor: f64,
    pub power_diff: f64,
    pub chaos_flag: RiskFlag,
    pub chaos_score: f64,
    pub volatility_flag: RiskFlag,
    pub volatility_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDebug {
    pub input: MatchupContext,
    pub home_profile: String,
    pub away_profile: String,
    pub model_version: String,
    pub baselines: SpreadTotalBaselines,
    pub identity_debug: DebugMap,
    pub chaos_debug: DebugMap,
    pub volatility_debug: DebugMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegratedState {
    pub engine_version: String,
    pub home_team: String,
    pub away_team: String,
    pub summary: StateSummary,
    pub model_spread: f64,
    pub model_total: f64,
    pub confidence: Confidence,
    pub identity: IdentityResult,
    pub chaos: ChaosResult,
    pub volatility: VolatilityResult,
    pub debug: StateDebug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub engine_version: String,
    pub home_team: String,
    pub away_team: String,
    pub model_spread: f64,
    pub model_total: f64,
    pub confidence: Confidence,
    pub volatility_flag: RiskFlag,
    pub notes: String,
}

impl IntegratedState {
    pub fn prediction(&self) -> PredictionResult {
        let mut notes = format!(
            "chaos {} ({:.3}), volatility {} ({:.3})",
            self.summary.chaos_flag,
            self.summary.chaos_score,
            self.summary.volatility_flag,
            self.summary.volatility_score
        );
        if let Some(extra) = self.debug.input.notes() {
            notes.push_str("; ");
            notes.push_str(extra);
        }
        PredictionResult {
            engine_version: self.engine_version.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            model_spread: self.model_spread,
            model_total: self.model_total,
            confidence: self.confidence,
            volatility_flag: self.summary.volatility_flag,
            notes,
        }
    }
}

/// The one entry point for the prediction pipeline. Stages run in the order the
/// engine registry plans for `integration`; their outputs merge into a single state.
#[derive(Debug, Clone)]
pub struct IntegrationEngine {
    config: ModelConfig,
}

impl IntegrationEngine {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn predict(&self, home_team: &str, away_team: &str) -> Result<PredictionResult> {
        let ctx = MatchupContext::new(home_team, away_team, None)?;
        Ok(self.compute_integrated_state(&ctx)?.prediction())
    }

    pub fn predict_with_notes(
        &self,
        home_team: &str,
        away_team: &str,
        notes: Option<&str>,
    ) -> Result<PredictionResult> {
        let ctx = MatchupContext::new(home_team, away_team, notes)?;
        Ok(self.compute_integrated_state(&ctx)?.prediction())
    }

    pub fn compute_integrated_state(&self, ctx: &MatchupContext) -> Result<IntegratedState> {
        let home = self.config.profiles.get_profile(ctx.home_team())?;
        let away = self.config.profiles.get_profile(ctx.away_team())?;

        let (mut identity, mut chaos, mut volatility) = (None, None, None);
        for output in run_engine(&self.config, EngineId::Integration, ctx)? {
            match output {
                EngineOutput::Identity(r) => identity = Some(r),
                EngineOutput::Chaos(r) => chaos = Some(r),
                EngineOutput::Volatility(r) => volatility = Some(r),
            }
        }
        let (Some(identity), Some(chaos), Some(volatility)) = (identity, chaos, volatility) else {
            return Err(ModelError::Calculation(
                "integration plan did not produce every stage".to_string(),
            ));
        };

        let base_spread = identity.home_identity_score - identity.away_identity_score;
        let chaos_penalty = chaos.chaos_prob * CHAOS_SPREAD_PENALTY;
        let volatility_penalty = volatility.volatility_score * VOLATILITY_SPREAD_PENALTY;
        let base_total = identity.pace_avg * PACE_TOTAL_MULTIPLIER;

        let model_spread = round2(base_spread - chaos_penalty - volatility_penalty);
        let model_total = round2(base_total + chaos.foul_variance * FOUL_TOTAL_MULTIPLIER);
        ensure_finite("model_spread", model_spread)?;
        ensure_finite("model_total", model_total)?;

        let confidence = Confidence::from_volatility(volatility.volatility_flag);
        debug!(
            home = ctx.home_team(),
            away = ctx.away_team(),
            base_spread,
            chaos_penalty,
            volatility_penalty,
            "spread components"
        );
        info!(
            home = ctx.home_team(),
            away = ctx.away_team(),
            model_spread,
            model_total,
            %confidence,
            "matchup predicted"
        );

        let summary = StateSummary {
            base_spread,
            base_total,
            pace_factor: identity.pace_avg,
            power_diff: identity.power_diff,
            chaos_flag: chaos.chaos_flag,
            chaos_score: chaos.chaos_prob,
            volatility_flag: volatility.volatility_flag,
            volatility_score: volatility.volatility_score,
        };
        let debug = StateDebug {
            input: ctx.clone(),
            home_profile: home.code.clone(),
            away_profile: away.code.clone(),
            model_version: self.config.model_version.clone(),
            baselines: self.config.baselines,
            identity_debug: identity.debug.clone(),
            chaos_debug: chaos.debug.clone(),
            volatility_debug: volatility.debug.clone(),
        };

        Ok(IntegratedState {
            engine_version: ENGINE_VERSION.to_string(),
            home_team: ctx.home_team().to_string(),
            away_team: ctx.away_team().to_string(),
            summary,
            model_spread,
            model_total,
            confidence,
            identity,
            chaos,
            volatility,
            debug,
        })
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ensure_finite(label: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::Calculation(format!("{label} is not finite ({value})")))
    }
}
