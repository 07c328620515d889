use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "COURTLINE_HOME";

const APP_DIR: &str = "courtline";
const EXPORTS_DIR: &str = "exports";

/// `COURTLINE_HOME`, then `$XDG_DATA_HOME/courtline`, then
/// `~/.local/share/courtline`.
pub fn data_dir() -> Option<PathBuf> {
    if let Some(home) = non_empty_env(HOME_ENV) {
        return Some(PathBuf::from(home));
    }
    if let Some(base) = non_empty_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = non_empty_env("HOME")?;
    Some(PathBuf::from(home).join(".local").join("share").join(APP_DIR))
}

pub fn exports_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join(EXPORTS_DIR))
}

pub fn ensure_dir(path: &Path) -> io::Result<&Path> {
    fs::create_dir_all(path)?;
    Ok(path)
}

fn non_empty_env(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.trim().is_empty() {
        return None;
    }
    Some(value)
}
