use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use courtline::calibration::{CalibrationAccumulator, CalibrationContext, compute_game_calibration};
use courtline::config::ModelConfig;
use courtline::engines::registry::{ENGINE_REGISTRY, run_engine};
use courtline::engines::{EngineId, lookup_engine};
use courtline::export::json::{dump_to_path, dumps, ensure_finite_fields, load_path, to_canonical};
use courtline::export::validate::PREDICTION_EXPORT_KEYS;
use courtline::export::{build_audited_export, diff_exports, hash_export, write_export_snapshot};
use courtline::integration::{IntegrationEngine, MatchupContext};
use courtline::logging::{init_logging, load_dotenv};
use courtline::market_log::{
    load_market_log, market_calibration_inputs, model_calibration_inputs, snapshot_dataset,
};
use courtline::paths;
use courtline::team_profiles::GENERIC_CODE;

#[derive(Parser)]
#[command(name = "courtline")]
#[command(version)]
#[command(about = "Matchup spread/total model and calibration tooling", long_about = None)]
struct Cli {
    /// Model config JSON (falls back to $COURTLINE_CONFIG, then the built-in profiles)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict spread and total for a matchup
    Predict {
        home: String,
        away: String,
        #[arg(long)]
        notes: Option<String>,
        /// Print the full integrated state instead of the prediction
        #[arg(long)]
        state: bool,
        #[arg(long)]
        pretty: bool,
    },
    /// List the registered engines
    Engines,
    /// Run a single engine (and whatever it depends on)
    Engine {
        name: String,
        home: String,
        away: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Load and validate the model config
    ValidateConfig,
    /// Grade a market log against the model (or the closing lines)
    Calibrate {
        csv: PathBuf,
        #[arg(long, default_value = "calibration")]
        context: String,
        /// Team codes to summarise, comma separated (defaults to every configured team)
        #[arg(long, value_delimiter = ',')]
        teams: Vec<String>,
        /// Use the closing spread/total as the prediction
        #[arg(long)]
        market: bool,
    },
    /// Write a sorted, hashed snapshot of a market log
    SnapshotDataset {
        csv: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build an audited export for a matchup
    Export {
        home: String,
        away: String,
        #[arg(long)]
        notes: Option<String>,
        /// Write the bundle to this file
        #[arg(long)]
        write: Option<PathBuf>,
        /// Write a dated snapshot directory under --base
        #[arg(long)]
        snapshot: bool,
        #[arg(long)]
        base: Option<PathBuf>,
        /// Snapshot date (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// SHA-256 of a JSON file's canonical form
    Hash { path: PathBuf },
    /// Structural diff of two JSON exports
    Diff { a: PathBuf, b: PathBuf },
}

fn main() -> Result<()> {
    load_dotenv();
    init_logging();

    let cli = Cli::parse();
    let config = || ModelConfig::load(cli.config.as_deref()).context("unable to load model config");

    match cli.command {
        Commands::Predict {
            ref home,
            ref away,
            ref notes,
            state,
            pretty,
        } => {
            let engine = IntegrationEngine::new(config()?);
            let ctx = MatchupContext::new(home, away, notes.as_deref())?;
            let integrated = engine.compute_integrated_state(&ctx)?;
            if state {
                print_json(&integrated, pretty)
            } else {
                print_json(&integrated.prediction(), pretty)
            }
        }
        Commands::Engines => {
            for spec in &ENGINE_REGISTRY {
                let deps: Vec<&str> = spec.depends_on.iter().map(|d| d.name()).collect();
                println!(
                    "{:<11} v{} deps=[{}] {}",
                    spec.name,
                    spec.version,
                    deps.join(","),
                    spec.description
                );
            }
            Ok(())
        }
        Commands::Engine {
            ref name,
            ref home,
            ref away,
            ref notes,
        } => {
            let spec = lookup_engine(name)?;
            let config = config()?;
            let ctx = MatchupContext::new(home, away, notes.as_deref())?;
            if spec.id == EngineId::Integration {
                let integrated = IntegrationEngine::new(config).compute_integrated_state(&ctx)?;
                return print_json(&integrated, true);
            }
            let outputs = run_engine(&config, spec.id, &ctx)?;
            print_json(&outputs, true)
        }
        Commands::ValidateConfig => {
            let config = config()?;
            let codes: Vec<&str> = config.profiles.codes().collect();
            println!("model_version={} teams={}", config.model_version, codes.len());
            println!("{}", codes.join(" "));
            Ok(())
        }
        Commands::Calibrate {
            ref csv,
            ref context,
            ref teams,
            market,
        } => calibrate(&config()?, csv, context, teams, market),
        Commands::SnapshotDataset { ref csv, ref out } => {
            let rows = load_market_log(csv)?;
            let out = out
                .clone()
                .unwrap_or_else(|| csv.with_extension("snapshot.json"));
            let metadata = snapshot_dataset(&rows, &out)
                .with_context(|| format!("unable to write {}", out.display()))?;
            println!(
                "rows={} hash={} path={}",
                metadata.row_count,
                metadata.dataset_hash,
                out.display()
            );
            Ok(())
        }
        Commands::Export {
            ref home,
            ref away,
            ref notes,
            ref write,
            snapshot,
            ref base,
            date,
        } => {
            let engine = IntegrationEngine::new(config()?);
            let prediction = engine.predict_with_notes(home, away, notes.as_deref())?;
            ensure_finite_fields(&[
                ("model_spread", prediction.model_spread),
                ("model_total", prediction.model_total),
            ])?;

            let mut cli_warnings = Vec::new();
            for code in [&prediction.home_team, &prediction.away_team] {
                if !engine.config().profiles.contains(code) {
                    cli_warnings.push(format!("profile_fallback:{code}->{GENERIC_CODE}"));
                }
            }
            let bundle = build_audited_export(
                to_canonical(&prediction)?,
                &PREDICTION_EXPORT_KEYS,
                cli_warnings,
            )?;

            if snapshot {
                let base = match base {
                    Some(base) => base.clone(),
                    None => paths::exports_dir().context("unable to resolve exports directory")?,
                };
                paths::ensure_dir(&base)
                    .with_context(|| format!("unable to create {}", base.display()))?;
                let outcome = write_export_snapshot(&bundle, &base, date)?;
                print_json(&outcome, true)?;
                if !outcome.ok {
                    return Err(anyhow!("export failed validation"));
                }
                return Ok(());
            }
            let value = to_canonical(&bundle)?;
            match write {
                Some(path) => {
                    dump_to_path(&value, path)?;
                    info!(path = %path.display(), hash = %bundle.export_hash, "export written");
                    Ok(())
                }
                None => print_json(&value, false),
            }
        }
        Commands::Hash { ref path } => {
            let value = read_json(path)?;
            println!("{}", hash_export(&value)?);
            Ok(())
        }
        Commands::Diff { ref a, ref b } => {
            let diff = diff_exports(&read_json(a)?, &read_json(b)?);
            print_json(&diff, true)
        }
    }
}

fn calibrate(
    config: &ModelConfig,
    csv: &Path,
    context: &str,
    teams: &[String],
    market: bool,
) -> Result<()> {
    let rows = load_market_log(csv)?;
    if rows.is_empty() {
        return Err(anyhow!("market log {} has no rows", csv.display()));
    }

    let (inputs, context) = if market {
        (
            market_calibration_inputs(&config.profiles, &rows),
            CalibrationContext::Market,
        )
    } else {
        let context = CalibrationContext::from(context);
        let engine = IntegrationEngine::new(config.clone());
        (model_calibration_inputs(&engine, &rows, &context)?, context)
    };

    let acc: CalibrationAccumulator = inputs.into_iter().map(compute_game_calibration).collect();
    let teams: Vec<String> = if teams.is_empty() {
        config
            .profiles
            .codes()
            .filter(|c| *c != GENERIC_CODE)
            .map(str::to_string)
            .collect()
    } else {
        teams.iter().map(|t| t.trim().to_uppercase()).collect()
    };

    let report = json!({
        "context": context,
        "games": acc.len(),
        "overall": acc.summary(Some(&context)),
        "teams": acc.core_teams_summary(&teams, Some(&context)),
    });
    print_json(&report, true)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    load_path(path).with_context(|| format!("unable to read JSON from {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let value = to_canonical(value)?;
    let out = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        dumps(&value)?
    };
    println!("{out}");
    Ok(())
}
