use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::export::diff::type_name;

/// Top-level keys every prediction export carries.
pub const PREDICTION_EXPORT_KEYS: [&str; 6] = [
    "engine_version",
    "home_team",
    "away_team",
    "model_spread",
    "model_total",
    "confidence",
];

pub const BUNDLE_KEYS: [&str; 5] = ["export", "validation", "export_hash", "cli_warnings", "version"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn finish(errors: BTreeSet<String>, warnings: BTreeSet<String>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors: errors.into_iter().collect(),
            warnings: warnings.into_iter().collect(),
        }
    }
}

pub fn validate_export(export: &Value, required_keys: &[&str]) -> ValidationReport {
    let mut errors = BTreeSet::new();
    let mut warnings = BTreeSet::new();

    let Value::Object(map) = export else {
        errors.insert(format!("export is not an object (got {})", type_name(export)));
        return ValidationReport::finish(errors, warnings);
    };

    for key in required_keys {
        if !map.contains_key(*key) {
            errors.insert(format!("missing top-level key: '{key}'"));
        }
    }
    for key in ["version", "engine_version"] {
        if let Some(v) = map.get(key)
            && !v.is_string()
        {
            warnings.insert(format!("top-level '{key}' is not a string"));
        }
    }
    if let Some(w) = map.get("warnings")
        && !(w.is_null() || w.is_array())
    {
        warnings.insert("top-level 'warnings' is not a list (or null)".to_string());
    }

    ValidationReport::finish(errors, warnings)
}

/// Non-fatal shape check for an audited bundle: `missing_key:<k>` in expected
/// order, then `extra_key:<k>` sorted.
pub fn check_bundle_shape(bundle: &Value) -> Vec<String> {
    let Value::Object(map) = bundle else {
        return vec!["bundle_not_object".to_string()];
    };
    let mut out: Vec<String> = BUNDLE_KEYS
        .iter()
        .filter(|k| !map.contains_key(**k))
        .map(|k| format!("missing_key:{k}"))
        .collect();
    // serde_json maps iterate in key order.
    out.extend(
        map.keys()
            .filter(|k| !BUNDLE_KEYS.contains(&k.as_str()))
            .map(|k| format!("extra_key:{k}")),
    );
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn complete_export_passes() {
        let export = json!({
            "engine_version": "v", "home_team": "HOR", "away_team": "DEN",
            "model_spread": -1.0, "model_total": 220.0, "confidence": "high",
        });
        let report = validate_export(&export, &PREDICTION_EXPORT_KEYS);
        assert!(report.ok);
        assert!(report.errors.is_empty() && report.warnings.is_empty());
    }

    #[test]
    fn missing_keys_are_sorted_errors() {
        let report = validate_export(&json!({"version": 3, "warnings": "none"}), &["zeta", "alpha"]);
        assert!(!report.ok);
        assert_eq!(
            report.errors,
            vec!["missing top-level key: 'alpha'", "missing top-level key: 'zeta'"]
        );
        assert_eq!(
            report.warnings,
            vec![
                "top-level 'version' is not a string",
                "top-level 'warnings' is not a list (or null)"
            ]
        );
    }

    #[test]
    fn non_object_export_is_an_error() {
        let report = validate_export(&json!([1, 2]), &[]);
        assert!(!report.ok);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn bundle_shape_lists_missing_then_extra() {
        let bundle = json!({"export": {}, "version": "x", "stamp": 1, "aaa": 2});
        assert_eq!(
            check_bundle_shape(&bundle),
            vec![
                "missing_key:validation",
                "missing_key:export_hash",
                "missing_key:cli_warnings",
                "extra_key:aaa",
                "extra_key:stamp"
            ]
        );
    }
}
