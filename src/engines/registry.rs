use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::config::ModelConfig;
use crate::engines::{ChaosEngine, EngineOutput, IdentityEngine, VolatilityEngine};
use crate::error::{ModelError, Result};
use crate::integration::MatchupContext;
use crate::team_profiles::TeamProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    Identity,
    Chaos,
    Volatility,
    Integration,
}

impl EngineId {
    pub fn spec(self) -> &'static EngineSpec {
        match self {
            EngineId::Identity => &ENGINE_REGISTRY[0],
            EngineId::Chaos => &ENGINE_REGISTRY[1],
            EngineId::Volatility => &ENGINE_REGISTRY[2],
            EngineId::Integration => &ENGINE_REGISTRY[3],
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        lookup_engine(s).map(|spec| spec.id)
    }
}

/// Everything a single stage may read. `prior` holds the outputs of the stages
/// that already ran for this matchup, in run order.
pub struct StageInput<'a> {
    pub config: &'a ModelConfig,
    pub home: &'a TeamProfile,
    pub away: &'a TeamProfile,
    pub notes: Option<&'a str>,
    pub prior: &'a [EngineOutput],
}

pub type StageFn = fn(&StageInput<'_>) -> Result<EngineOutput>;

#[derive(Serialize)]
pub struct EngineSpec {
    pub id: EngineId,
    pub name: &'static str,
    pub version: &'static str,
    pub depends_on: &'static [EngineId],
    pub description: &'static str,
    #[serde(skip)]
    pub run: Option<StageFn>,
}

impl fmt::Debug for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSpec")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

pub static ENGINE_REGISTRY: [EngineSpec; 4] = [
    EngineSpec {
        id: EngineId::Identity,
        name: "identity",
        version: "1.0",
        depends_on: &[],
        description: "offense/defense differential and pace baseline",
        run: Some(run_identity),
    },
    EngineSpec {
        id: EngineId::Chaos,
        name: "chaos",
        version: "1.0",
        depends_on: &[],
        description: "chaos probability and foul variance",
        run: Some(run_chaos),
    },
    EngineSpec {
        id: EngineId::Volatility,
        name: "volatility",
        version: "1.0",
        depends_on: &[EngineId::Chaos],
        description: "minutes/injury volatility blended with chaos",
        run: Some(run_volatility),
    },
    EngineSpec {
        id: EngineId::Integration,
        name: "integration",
        version: "1.0",
        depends_on: &[EngineId::Identity, EngineId::Chaos, EngineId::Volatility],
        description: "merges all stages into spread, total and confidence",
        run: None,
    },
];

pub fn lookup_engine(name: &str) -> Result<&'static EngineSpec> {
    let key = name.trim().to_ascii_lowercase();
    ENGINE_REGISTRY
        .iter()
        .find(|spec| spec.name == key)
        .ok_or_else(|| ModelError::UnknownEngine {
            name: name.to_string(),
            known: available_engines().join(", "),
        })
}

pub fn available_engines() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = ENGINE_REGISTRY.iter().map(|s| s.name).collect();
    names.sort_unstable();
    names
}

/// Dependencies first, each engine once, ending with `id`.
pub fn execution_plan(id: EngineId) -> Vec<EngineId> {
    fn visit(id: EngineId, out: &mut Vec<EngineId>) {
        if out.contains(&id) {
            return;
        }
        for dep in id.spec().depends_on {
            visit(*dep, out);
        }
        out.push(id);
    }
    let mut out = Vec::new();
    visit(id, &mut out);
    out
}

/// Runs `id` and every stage it depends on for one matchup. Composite engines
/// (integration) contribute no output of their own.
pub fn run_engine(config: &ModelConfig, id: EngineId, ctx: &MatchupContext) -> Result<Vec<EngineOutput>> {
    let home = config.profiles.get_profile(ctx.home_team())?;
    let away = config.profiles.get_profile(ctx.away_team())?;

    let mut outputs: Vec<EngineOutput> = Vec::new();
    for stage in execution_plan(id) {
        let Some(run) = stage.spec().run else {
            continue;
        };
        let input = StageInput {
            config,
            home,
            away,
            notes: ctx.notes(),
            prior: &outputs,
        };
        let output = run(&input)?;
        debug!(engine = %stage, flag = ?output.flag(), "stage complete");
        outputs.push(output);
    }
    Ok(outputs)
}

fn run_identity(input: &StageInput<'_>) -> Result<EngineOutput> {
    let engine = IdentityEngine::new(input.config.thresholds);
    Ok(EngineOutput::Identity(engine.compute(input.home, input.away)))
}

fn run_chaos(input: &StageInput<'_>) -> Result<EngineOutput> {
    Ok(EngineOutput::Chaos(ChaosEngine.compute(
        input.home,
        input.away,
        input.notes,
    )))
}

fn run_volatility(input: &StageInput<'_>) -> Result<EngineOutput> {
    let chaos = input
        .prior
        .iter()
        .find_map(EngineOutput::as_chaos)
        .ok_or_else(|| ModelError::Calculation("volatility stage ran before chaos".to_string()))?;
    Ok(EngineOutput::Volatility(VolatilityEngine.compute(
        input.home,
        input.away,
        chaos,
    )))
}
