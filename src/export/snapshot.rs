use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ExportError;
use crate::export::hash::hash_export;
use crate::export::json::{dump_to_path, to_canonical};
use crate::export::validate::{ValidationReport, check_bundle_shape, validate_export};

pub const AUDITED_EXPORT_VERSION: &str = "export_audited_v1";

pub const EXPORT_FILE: &str = "export_audited.json";
pub const SUMMARY_FILE: &str = "summary.json";

const HASH_PREFIX_LEN: usize = 12;

/// An export together with its validation report and content hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditedExport {
    pub export: Value,
    pub validation: ValidationReport,
    pub export_hash: String,
    pub cli_warnings: Vec<String>,
    pub version: &'static str,
}

pub fn build_audited_export(
    export: Value,
    required_keys: &[&str],
    cli_warnings: Vec<String>,
) -> Result<AuditedExport, ExportError> {
    let validation = validate_export(&export, required_keys);
    let export_hash = hash_export(&export)?;
    let mut cli_warnings = cli_warnings;
    cli_warnings.sort();
    cli_warnings.dedup();
    Ok(AuditedExport {
        export,
        validation,
        export_hash,
        cli_warnings,
        version: AUDITED_EXPORT_VERSION,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub export_version: Option<String>,
    pub validation_ok: bool,
    pub errors_n: usize,
    pub warnings_n: usize,
    pub hash_prefix: String,
    pub cli_warnings_n: usize,
    pub snapshot_date: String,
}

impl SnapshotSummary {
    fn of(bundle: &AuditedExport, date: NaiveDate) -> Self {
        let export_version = ["version", "engine_version"]
            .iter()
            .find_map(|k| bundle.export.get(*k).and_then(Value::as_str))
            .map(str::to_string);
        Self {
            export_version,
            validation_ok: bundle.validation.ok,
            errors_n: bundle.validation.errors.len(),
            warnings_n: bundle.validation.warnings.len(),
            hash_prefix: bundle.export_hash.chars().take(HASH_PREFIX_LEN).collect(),
            cli_warnings_n: bundle.cli_warnings.len(),
            snapshot_date: date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotOutcome {
    pub ok: bool,
    pub snapshot_dir: PathBuf,
    pub export_path: PathBuf,
    pub summary_path: PathBuf,
    pub warnings: Vec<String>,
}

/// Writes `<base>/<YYYY-MM-DD>/export_audited.json` and `summary.json`. `ok` is
/// false when the export failed validation; the files are written either way.
pub fn write_export_snapshot(
    bundle: &AuditedExport,
    base_dir: &Path,
    date: Option<NaiveDate>,
) -> Result<SnapshotOutcome, ExportError> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let snapshot_dir = base_dir.join(date.format("%Y-%m-%d").to_string());
    let export_path = snapshot_dir.join(EXPORT_FILE);
    let summary_path = snapshot_dir.join(SUMMARY_FILE);

    let bundle_value = to_canonical(bundle)?;
    let mut warnings = check_bundle_shape(&bundle_value);
    if !bundle.validation.ok {
        warnings.push("validation_failed".to_string());
    }

    dump_to_path(&bundle_value, &export_path)?;
    dump_to_path(&to_canonical(&SnapshotSummary::of(bundle, date))?, &summary_path)?;

    if warnings.is_empty() {
        info!(dir = %snapshot_dir.display(), "export snapshot written");
    } else {
        warn!(dir = %snapshot_dir.display(), ?warnings, "export snapshot written with warnings");
    }

    Ok(SnapshotOutcome {
        ok: bundle.validation.ok,
        snapshot_dir,
        export_path,
        summary_path,
        warnings,
    })
}
