use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;

use courtline::config::ModelConfig;
use courtline::export::json::{dump_to_path, dumps, load_path, to_canonical};
use courtline::export::snapshot::{EXPORT_FILE, SUMMARY_FILE};
use courtline::export::validate::PREDICTION_EXPORT_KEYS;
use courtline::export::{
    build_audited_export, check_bundle_shape, diff_exports, hash_export, write_export_snapshot,
};
use courtline::integration::IntegrationEngine;
use courtline::market_log::{dataset_hash, load_market_log, snapshot_dataset};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn prediction_value(home: &str, away: &str) -> Value {
    let engine = IntegrationEngine::new(ModelConfig::builtin().unwrap());
    to_canonical(&engine.predict(home, away).unwrap()).unwrap()
}

#[test]
fn prediction_export_is_byte_stable() {
    let a = prediction_value("HOR", "DEN");
    let b = prediction_value("hor", "den");
    assert_eq!(dumps(&a).unwrap(), dumps(&b).unwrap());
    assert_eq!(hash_export(&a).unwrap(), hash_export(&b).unwrap());

    let raw = dumps(&a).unwrap();
    assert!(raw.starts_with(r#"{"away_team":"DEN","confidence":"medium","#), "{raw}");
    assert!(!raw.contains("\": "));
}

#[test]
fn dump_to_path_round_trips_with_trailing_newline() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("prediction.json");
    let value = prediction_value("NYK", "OKC");
    dump_to_path(&value, &path).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.ends_with("}\n"));
    assert_eq!(load_path(&path).unwrap(), value);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn diff_between_matchups_names_changed_fields() {
    let a = prediction_value("HOR", "DEN");
    let b = prediction_value("HOR", "OKC");
    let diff = diff_exports(&a, &b);
    assert!(diff.changed.contains_key("away_team"));
    assert!(diff.changed.contains_key("model_total"));
    assert!(!diff.changed.contains_key("home_team"));
    assert!(diff.added.is_empty() && diff.removed.is_empty());
    assert_eq!(diff.summary.changed_count, diff.changed.len());
}

#[test]
fn snapshot_writes_bundle_and_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let export = prediction_value("DET", "HOR");
    let bundle = build_audited_export(export.clone(), &PREDICTION_EXPORT_KEYS, vec![]).unwrap();
    assert!(bundle.validation.ok);

    let date = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
    let outcome = write_export_snapshot(&bundle, tmp.path(), Some(date)).unwrap();
    assert!(outcome.ok);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.snapshot_dir, tmp.path().join("2025-12-21"));
    assert_eq!(outcome.export_path, outcome.snapshot_dir.join(EXPORT_FILE));

    let written = load_path(&outcome.export_path).unwrap();
    assert!(check_bundle_shape(&written).is_empty());
    assert_eq!(written["export"], export);
    assert_eq!(written["export_hash"], hash_export(&export).unwrap());

    let summary = load_path(&outcome.snapshot_dir.join(SUMMARY_FILE)).unwrap();
    assert_eq!(summary["validation_ok"], true);
    assert_eq!(summary["errors_n"], 0);
    assert_eq!(summary["snapshot_date"], "2025-12-21");
    assert_eq!(summary["export_version"], export["engine_version"]);
    let prefix = summary["hash_prefix"].as_str().unwrap();
    assert_eq!(prefix.len(), 12);
    assert!(bundle.export_hash.starts_with(prefix));
}

#[test]
fn invalid_export_snapshot_is_flagged() {
    let tmp = tempfile::tempdir().unwrap();
    let bundle =
        build_audited_export(serde_json::json!({"engine_version": 3}), &PREDICTION_EXPORT_KEYS, vec![])
            .unwrap();
    assert!(!bundle.validation.ok);
    assert!(
        bundle
            .validation
            .warnings
            .contains(&"top-level 'engine_version' is not a string".to_string())
    );
    let outcome = write_export_snapshot(&bundle, tmp.path(), None).unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.warnings, vec!["validation_failed".to_string()]);
    assert!(outcome.export_path.exists());
}

#[test]
fn dataset_snapshot_is_sorted_and_hashed() {
    let rows = load_market_log(&fixture_path("market_log.csv")).unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("market_log.snapshot.json");
    let meta = snapshot_dataset(&rows, &out).unwrap();
    assert_eq!(meta.row_count, 6);
    assert_eq!(meta.dataset_hash, dataset_hash(&rows).unwrap());

    let written = load_path(&out).unwrap();
    assert_eq!(written["metadata"]["dataset_hash"], meta.dataset_hash.as_str());
    let dates: Vec<&str> = written["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["date"].as_str().unwrap())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);
    assert_eq!(dates[0], "2025-12-21");
}
