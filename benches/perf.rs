use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use courtline::calibration::{
    CalibrationAccumulator, CalibrationContext, GameCalibrationInput, compute_game_calibration,
};
use courtline::config::ModelConfig;
use courtline::export::{diff_exports, hash_export};
use courtline::export::json::to_canonical;
use courtline::integration::{IntegrationEngine, MatchupContext};
use courtline::market_log::read_market_log;

const TEAMS: [&str; 5] = ["HOR", "DEN", "NYK", "DET", "OKC"];

fn synthetic_games(n: usize) -> CalibrationAccumulator {
    let mut rng = StdRng::seed_from_u64(26);
    (0..n)
        .map(|i| {
            let home = TEAMS[i % TEAMS.len()];
            let away = TEAMS[(i + 1 + rng.gen_range(0..TEAMS.len() - 1)) % TEAMS.len()];
            let input = GameCalibrationInput::new(
                home,
                away,
                rng.gen_range(-12.0..12.0),
                rng.gen_range(200.0..245.0),
                rng.gen_range(85..135),
                rng.gen_range(85..135),
            )
            .with_context(if i % 3 == 0 { "real_bet" } else { "calibration" });
            compute_game_calibration(input)
        })
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let engine = IntegrationEngine::new(ModelConfig::builtin().unwrap());
    c.bench_function("predict_matchup", |b| {
        b.iter(|| {
            let result = engine.predict(black_box("HOR"), black_box("DEN")).unwrap();
            black_box(result.model_spread);
        })
    });

    let ctx = MatchupContext::new("OKC", "NYK", Some("back-to-back")).unwrap();
    c.bench_function("integrated_state", |b| {
        b.iter(|| {
            let state = engine.compute_integrated_state(black_box(&ctx)).unwrap();
            black_box(state.summary.volatility_score);
        })
    });
}

fn bench_calibration_summaries(c: &mut Criterion) {
    let acc = synthetic_games(5_000);
    let bets = CalibrationContext::RealBet;
    c.bench_function("calibration_summary_5k", |b| {
        b.iter(|| black_box(acc.summary(Some(&bets))))
    });
    c.bench_function("core_teams_summary_5k", |b| {
        b.iter(|| black_box(acc.core_teams_summary(&TEAMS, None)))
    });
}

fn bench_market_log_parse(c: &mut Criterion) {
    c.bench_function("market_log_parse", |b| {
        b.iter(|| {
            let rows = read_market_log(black_box(MARKET_LOG_CSV.as_bytes())).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_export_hash_and_diff(c: &mut Criterion) {
    let engine = IntegrationEngine::new(ModelConfig::builtin().unwrap());
    let ctx = MatchupContext::new("HOR", "DEN", None).unwrap();
    let a = to_canonical(&engine.compute_integrated_state(&ctx).unwrap()).unwrap();
    let ctx = MatchupContext::new("DET", "OKC", None).unwrap();
    let b_state = to_canonical(&engine.compute_integrated_state(&ctx).unwrap()).unwrap();

    c.bench_function("export_hash_state", |b| {
        b.iter(|| black_box(hash_export(black_box(&a)).unwrap()))
    });
    c.bench_function("export_diff_state", |b| {
        b.iter(|| black_box(diff_exports(black_box(&a), black_box(&b_state)).summary))
    });
}

criterion_group!(
    perf,
    bench_predict,
    bench_calibration_summaries,
    bench_market_log_parse,
    bench_export_hash_and_diff
);
criterion_main!(perf);

static MARKET_LOG_CSV: &str = include_str!("../tests/fixtures/market_log.csv");
