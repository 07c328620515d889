use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::ExportError;

/// Converts any serializable record into a JSON value whose object keys are
/// sorted. Maps with keys that can't become strings are rejected by serde_json.
pub fn to_canonical<T: Serialize>(value: &T) -> Result<Value, ExportError> {
    Ok(serde_json::to_value(value)?)
}

/// Compact form with `,` and `:` separators and sorted keys. Hashing and diffing
/// both go through this, so it must stay byte-stable.
pub fn dumps(value: &Value) -> Result<String, ExportError> {
    Ok(serde_json::to_string(value)?)
}

pub fn dump_to_path(value: &Value, path: &Path) -> Result<(), ExportError> {
    let mut out = dumps(value)?;
    out.push('\n');
    write_atomic(path, out.as_bytes())
}

pub fn dump_pretty_to_path(value: &Value, path: &Path) -> Result<(), ExportError> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    write_atomic(path, out.as_bytes())
}

pub fn load_path(path: &Path) -> Result<Value, ExportError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// serde_json quietly turns NaN and infinities into `null`, so records are
/// checked before they are serialized.
pub fn ensure_finite_fields(fields: &[(&str, f64)]) -> Result<(), ExportError> {
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((path, _)) => Err(ExportError::NonFinite {
            path: path.to_string(),
        }),
        None => Ok(()),
    }
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn keys_come_out_sorted_and_compact() {
        let mut map = HashMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        map.insert("mid", 3);
        let value = to_canonical(&map).unwrap();
        assert_eq!(dumps(&value).unwrap(), r#"{"alpha":2,"mid":3,"zeta":1}"#);
    }

    #[test]
    fn nested_objects_are_sorted_too() {
        let value = serde_json::json!({"b": {"y": 1, "x": [{"d": 0, "c": 1}]}, "a": null});
        assert_eq!(
            dumps(&value).unwrap(),
            r#"{"a":null,"b":{"x":[{"c":1,"d":0}],"y":1}}"#
        );
    }

    #[test]
    fn non_finite_fields_are_named() {
        assert!(ensure_finite_fields(&[("model_spread", -1.5)]).is_ok());
        let err = ensure_finite_fields(&[("model_spread", 1.0), ("model_total", f64::INFINITY)])
            .unwrap_err();
        assert!(matches!(err, ExportError::NonFinite { ref path } if path == "model_total"));
    }
}
