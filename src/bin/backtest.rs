use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use courtline::calibration::{
    CalibrationAccumulator, CalibrationContext, CalibrationSummary, compute_game_calibration,
};
use courtline::config::ModelConfig;
use courtline::integration::IntegrationEngine;
use courtline::logging::{init_logging, load_dotenv};
use courtline::market_log::{load_market_log, market_calibration_inputs, model_calibration_inputs};
use courtline::team_profiles::GENERIC_CODE;

/// Grades the model and the closing market line on the same games.
#[derive(Parser)]
#[command(name = "backtest")]
struct Args {
    #[arg(default_value = "tests/fixtures/market_log.csv")]
    csv: PathBuf,
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
}

struct TeamReport {
    team: String,
    model: CalibrationSummary,
    market: CalibrationSummary,
}

fn main() -> Result<()> {
    load_dotenv();
    init_logging();
    let args = Args::parse();

    let config = ModelConfig::load(args.config.as_deref()).context("unable to load model config")?;
    let rows = load_market_log(&args.csv)
        .with_context(|| format!("unable to load {}", args.csv.display()))?;
    if rows.is_empty() {
        return Err(anyhow!("no games in {}", args.csv.display()));
    }

    let model_ctx = CalibrationContext::Calibration;
    let engine = IntegrationEngine::new(config.clone());
    let mut acc = CalibrationAccumulator::new();
    acc.extend(
        model_calibration_inputs(&engine, &rows, &model_ctx)?
            .into_iter()
            .map(compute_game_calibration),
    );
    acc.extend(
        market_calibration_inputs(&config.profiles, &rows)
            .into_iter()
            .map(compute_game_calibration),
    );

    let teams: Vec<String> = if args.teams.is_empty() {
        config
            .profiles
            .codes()
            .filter(|c| *c != GENERIC_CODE)
            .map(str::to_string)
            .collect()
    } else {
        args.teams.iter().map(|t| t.trim().to_uppercase()).collect()
    };

    let market_ctx = CalibrationContext::Market;
    let reports: Vec<TeamReport> = teams
        .into_iter()
        .map(|team| TeamReport {
            model: acc.team_summary(&team, Some(&model_ctx)),
            market: acc.team_summary(&team, Some(&market_ctx)),
            team,
        })
        .collect();

    println!("Backtest: {} games from {}", rows.len(), args.csv.display());
    println!();
    for r in &reports {
        if r.model.count == 0 {
            println!("{:<8} no games", r.team);
            continue;
        }
        println!(
            "{:<8} n={:<3} spread bias model={:+.2} market={:+.2} mae model={:.2} market={:.2} | total bias model={:+.2} market={:+.2} mae model={:.2} market={:.2}",
            r.team,
            r.model.count,
            r.model.avg_spread_error,
            r.market.avg_spread_error,
            r.model.mae_spread,
            r.market.mae_spread,
            r.model.avg_total_error,
            r.market.avg_total_error,
            r.model.mae_total,
            r.market.mae_total,
        );
    }

    let model = acc.summary(Some(&model_ctx));
    let market = acc.summary(Some(&market_ctx));
    println!();
    println!(
        "aggregate n={} mae_spread model={:.3} market={:.3} edge={:+.3} mae_total model={:.3} market={:.3} edge={:+.3}",
        model.count,
        model.mae_spread,
        market.mae_spread,
        market.mae_spread - model.mae_spread,
        model.mae_total,
        market.mae_total,
        market.mae_total - model.mae_total,
    );

    Ok(())
}
