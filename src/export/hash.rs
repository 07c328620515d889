use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ExportError;
use crate::export::json::dumps;

pub fn hash_export(value: &Value) -> Result<String, ExportError> {
    Ok(sha256_hex(dumps(value)?.as_bytes()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
