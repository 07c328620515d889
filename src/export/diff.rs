use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

pub const EXPORT_DIFF_VERSION: &str = "export_diff_v1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub from: Value,
    pub to: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub changed_count: usize,
    pub added_count: usize,
    pub removed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDiff {
    pub version: &'static str,
    pub summary: DiffSummary,
    pub changed: BTreeMap<String, ValueChange>,
    pub added: BTreeMap<String, Value>,
    pub removed: BTreeMap<String, Value>,
    pub warnings: Vec<String>,
}

impl ExportDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Default)]
struct Collector {
    changed: BTreeMap<String, ValueChange>,
    added: BTreeMap<String, Value>,
    removed: BTreeMap<String, Value>,
    warnings: BTreeSet<String>,
}

/// Structural diff of two exports, keyed by paths like `a.b[2].c`. Inputs that
/// are not both objects are compared under a synthetic `_root` key.
pub fn diff_exports(a: &Value, b: &Value) -> ExportDiff {
    let mut c = Collector::default();
    match (a, b) {
        (Value::Object(_), Value::Object(_)) => c.node("", a, b),
        _ => {
            c.warnings
                .insert("root inputs are not both objects; compared under '_root'".to_string());
            let wrap = |v: &Value| {
                let mut m = Map::new();
                m.insert("_root".to_string(), v.clone());
                Value::Object(m)
            };
            c.node("", &wrap(a), &wrap(b));
        }
    }

    ExportDiff {
        version: EXPORT_DIFF_VERSION,
        summary: DiffSummary {
            changed_count: c.changed.len(),
            added_count: c.added.len(),
            removed_count: c.removed.len(),
        },
        changed: c.changed,
        added: c.added,
        removed: c.removed,
        warnings: c.warnings.into_iter().collect(),
    }
}

impl Collector {
    fn node(&mut self, path: &str, a: &Value, b: &Value) {
        if type_name(a) != type_name(b) {
            self.warnings.insert(format!(
                "type change at '{path}': {} -> {}",
                type_name(a),
                type_name(b)
            ));
        }

        match (a, b) {
            (Value::Object(am), Value::Object(bm)) => {
                for (k, v) in am {
                    let p = join_key(path, k);
                    match bm.get(k) {
                        Some(bv) => self.node(&p, v, bv),
                        None => {
                            self.removed.insert(p, v.clone());
                        }
                    }
                }
                for (k, v) in bm.iter().filter(|(k, _)| !am.contains_key(*k)) {
                    self.added.insert(join_key(path, k), v.clone());
                }
            }
            (Value::Array(al), Value::Array(bl)) => {
                let shared = al.len().min(bl.len());
                for i in 0..shared {
                    self.node(&join_index(path, i), &al[i], &bl[i]);
                }
                for (i, v) in al.iter().enumerate().skip(shared) {
                    self.removed.insert(join_index(path, i), v.clone());
                }
                for (i, v) in bl.iter().enumerate().skip(shared) {
                    self.added.insert(join_index(path, i), v.clone());
                }
            }
            _ => {
                if !same_scalar(a, b) {
                    self.changed.insert(
                        path.to_string(),
                        ValueChange {
                            from: a.clone(),
                            to: b.clone(),
                        },
                    );
                }
            }
        }
    }
}

// 1 and 1.0 are the same number once written out.
fn same_scalar(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn join_key(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

fn join_index(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

pub(crate) fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identical_exports_have_no_differences() {
        let a = json!({"model_spread": -1.5, "nested": {"list": [1, 2, 3]}});
        let d = diff_exports(&a, &a.clone());
        assert!(d.is_empty());
        assert!(d.warnings.is_empty());
        assert_eq!(d.summary, DiffSummary::default());
    }

    #[test]
    fn reports_changed_added_and_removed_paths() {
        let a = json!({"a": {"b": [1, {"c": 1}, 3]}, "gone": true, "same": "x"});
        let b = json!({"a": {"b": [1, {"c": 2}]}, "new": null, "same": "x"});
        let d = diff_exports(&a, &b);
        assert_eq!(d.changed["a.b[1].c"], ValueChange { from: json!(1), to: json!(2) });
        assert_eq!(d.removed["a.b[2]"], json!(3));
        assert_eq!(d.removed["gone"], json!(true));
        assert_eq!(d.added["new"], Value::Null);
        assert_eq!(
            d.summary,
            DiffSummary {
                changed_count: 1,
                added_count: 1,
                removed_count: 2
            }
        );
    }

    #[test]
    fn type_changes_warn_and_record_the_change() {
        let a = json!({"flag": "low"});
        let b = json!({"flag": 1});
        let d = diff_exports(&a, &b);
        assert_eq!(d.warnings, vec!["type change at 'flag': string -> number".to_string()]);
        assert!(d.changed.contains_key("flag"));
    }

    #[test]
    fn non_object_roots_are_wrapped() {
        let d = diff_exports(&json!([1, 2]), &json!([1, 3]));
        assert!(d.changed.contains_key("_root[1]"));
        assert_eq!(d.warnings.len(), 1);
    }

    #[test]
    fn integer_and_float_forms_compare_equal() {
        let d = diff_exports(&json!({"total": 220}), &json!({"total": 220.0}));
        assert!(d.changed.is_empty());
    }
}
