//! Closing-line market logs: one CSV row per finished game with the closing
//! spread/total and the final score.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calibration::{CalibrationContext, GameCalibrationInput};
use crate::error::{ExportError, MarketLogError, ModelError};
use crate::export::hash::sha256_hex;
use crate::export::json::{dump_pretty_to_path, dumps, to_canonical};
use crate::integration::IntegrationEngine;
use crate::team_profiles::{TeamProfileStore, normalize_code};

pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Date",
    "Away Team",
    "Home Team",
    "Closing Spread",
    "Closing Total",
    "Away Score",
    "Home Score",
    "Spread Result",
    "Total Result",
];

const DATE_FORMATS: [&str; 5] = ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadResult {
    Covered,
    Not,
    Push,
}

impl FromStr for SpreadResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "covered" => Ok(SpreadResult::Covered),
            "not" => Ok(SpreadResult::Not),
            "push" => Ok(SpreadResult::Push),
            other => Err(format!("invalid spread result: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalResult {
    Over,
    Under,
    Push,
}

impl FromStr for TotalResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "over" => Ok(TotalResult::Over),
            "under" => Ok(TotalResult::Under),
            "push" => Ok(TotalResult::Push),
            other => Err(format!("invalid total result: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketLogRow {
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub away_team: String,
    pub home_team: String,
    /// Negative means the home side was favored.
    pub home_spread: f64,
    pub closing_total: f64,
    pub away_score: u32,
    pub home_score: u32,
    pub spread_result: SpreadResult,
    pub total_result: TotalResult,
}

impl MarketLogRow {
    pub fn to_calibration_input(
        &self,
        predicted_spread: f64,
        predicted_total: f64,
        context: CalibrationContext,
    ) -> GameCalibrationInput {
        GameCalibrationInput::new(
            &self.home_team,
            &self.away_team,
            predicted_spread,
            predicted_total,
            self.home_score,
            self.away_score,
        )
        .with_context(context)
        .with_notes(&format!("market log {}", self.date))
    }

    /// Grades the closing line itself as if it were the prediction.
    pub fn market_calibration_input(&self) -> GameCalibrationInput {
        self.to_calibration_input(self.home_spread, self.closing_total, CalibrationContext::Market)
    }

    /// Logs carry nicknames ("Knicks"); map them onto profile codes where the
    /// store knows the team, otherwise keep the normalized name.
    pub fn team_codes(&self, profiles: &TeamProfileStore) -> (String, String) {
        let code = |name: &str| {
            profiles
                .resolve_code(name)
                .map(str::to_string)
                .unwrap_or_else(|| normalize_code(name))
        };
        (code(&self.home_team), code(&self.away_team))
    }
}

/// Runs every row through the model and pairs the prediction with the final
/// score. Team names are replaced by profile codes.
pub fn model_calibration_inputs(
    engine: &IntegrationEngine,
    rows: &[MarketLogRow],
    context: &CalibrationContext,
) -> Result<Vec<GameCalibrationInput>, ModelError> {
    rows.iter()
        .map(|row| {
            let (home, away) = row.team_codes(&engine.config().profiles);
            let prediction = engine.predict(&home, &away)?;
            let mut input =
                row.to_calibration_input(prediction.model_spread, prediction.model_total, context.clone());
            input.home_team = home;
            input.away_team = away;
            Ok(input)
        })
        .collect()
}

/// Same as [`MarketLogRow::market_calibration_input`], with profile codes.
pub fn market_calibration_inputs(
    profiles: &TeamProfileStore,
    rows: &[MarketLogRow],
) -> Vec<GameCalibrationInput> {
    rows.iter()
        .map(|row| {
            let (home, away) = row.team_codes(profiles);
            let mut input = row.market_calibration_input();
            input.home_team = home;
            input.away_team = away;
            input
        })
        .collect()
}

impl fmt::Display for MarketLogRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} ({}-{})",
            self.date, self.away_team, self.home_team, self.away_score, self.home_score
        )
    }
}

pub fn load_market_log(path: &Path) -> Result<Vec<MarketLogRow>, MarketLogError> {
    let file = File::open(path).map_err(csv::Error::from)?;
    let rows = read_market_log(file)?;
    info!(path = %path.display(), rows = rows.len(), "market log loaded");
    Ok(rows)
}

/// Any bad row fails the whole load. Row numbers are 1-based and skip the header.
pub fn read_market_log<R: Read>(reader: R) -> Result<Vec<MarketLogRow>, MarketLogError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers)?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record.map_err(|e| MarketLogError::Row {
            row,
            reason: e.to_string(),
        })?;
        let parsed = columns
            .parse(&record)
            .map_err(|reason| MarketLogError::Row { row, reason })?;
        rows.push(parsed);
    }
    debug!(rows = rows.len(), "market log parsed");
    Ok(rows)
}

struct ColumnIndex([usize; 9]);

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, MarketLogError> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let mut idx = [0usize; 9];
        let mut missing = Vec::new();
        for (slot, column) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            match names.iter().position(|n| *n == column) {
                Some(pos) => *slot = pos,
                None => missing.push(column.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(MarketLogError::MissingColumns(missing));
        }
        Ok(Self(idx))
    }

    fn field<'r>(&self, record: &'r StringRecord, col: usize) -> Result<&'r str, String> {
        let label = REQUIRED_COLUMNS[col];
        let value = record.get(self.0[col]).unwrap_or("").trim();
        if value.is_empty() {
            return Err(format!("{label} is empty"));
        }
        Ok(value)
    }

    fn parse(&self, record: &StringRecord) -> Result<MarketLogRow, String> {
        Ok(MarketLogRow {
            date: normalize_date(self.field(record, 0)?)?,
            away_team: self.field(record, 1)?.to_string(),
            home_team: self.field(record, 2)?.to_string(),
            home_spread: parse_spread(self.field(record, 3)?)?,
            closing_total: parse_finite(self.field(record, 4)?, REQUIRED_COLUMNS[4])?,
            away_score: parse_score(self.field(record, 5)?, REQUIRED_COLUMNS[5])?,
            home_score: parse_score(self.field(record, 6)?, REQUIRED_COLUMNS[6])?,
            spread_result: self.field(record, 7)?.parse()?,
            total_result: self.field(record, 8)?.parse()?,
        })
    }
}

/// Accepts `December 21, 2025`, `Dec 21, 2025`, `2025-12-21`, `12/21/2025` and
/// `12/21/25`; returns ISO `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Result<String, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("Date is empty".to_string());
    }
    DATE_FORMATS
        .iter()
        .filter(|fmt| has_four_digit_year(s, fmt))
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| format!("invalid date format: {raw}"))
}

// chrono's %Y takes any digit count; the year token must be exactly four digits.
fn has_four_digit_year(s: &str, fmt: &str) -> bool {
    if !fmt.contains("%Y") {
        return true;
    }
    let token = if fmt.starts_with("%Y") {
        s.split('-').next()
    } else {
        s.rsplit(|c: char| c == ' ' || c == '/').next()
    };
    token.is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
}

/// `Knicks -7.5` -> -7.5. Exactly two tokens; the second is the home spread.
pub fn parse_spread(raw: &str) -> Result<f64, String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let [_, number] = parts.as_slice() else {
        return Err(format!("invalid spread format: {raw}"));
    };
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid spread number: {number}"))?;
    if !value.is_finite() {
        return Err(format!("non-finite spread value: {number}"));
    }
    Ok(value)
}

fn parse_finite(raw: &str, label: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{label} must be a number: {raw}"))?;
    if !value.is_finite() {
        return Err(format!("{label} must be finite: {raw}"));
    }
    Ok(value)
}

fn parse_score(raw: &str, label: &str) -> Result<u32, String> {
    let value: i64 = raw
        .parse()
        .map_err(|_| format!("{label} must be an integer: {raw}"))?;
    u32::try_from(value).map_err(|_| format!("{label} must be >= 0: {value}"))
}

fn sorted_rows(rows: &[MarketLogRow]) -> Vec<&MarketLogRow> {
    let mut sorted: Vec<&MarketLogRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.date, &a.home_team, &a.away_team).cmp(&(&b.date, &b.home_team, &b.away_team))
    });
    sorted
}

/// SHA-256 over the canonical JSON of the rows sorted by (date, home, away), so
/// file order does not change the hash.
pub fn dataset_hash(rows: &[MarketLogRow]) -> Result<String, ExportError> {
    let value = to_canonical(&sorted_rows(rows))?;
    Ok(sha256_hex(dumps(&value)?.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetMetadata {
    pub row_count: usize,
    pub snapshot_timestamp_utc: String,
    pub dataset_hash: String,
}

#[derive(Serialize)]
struct DatasetSnapshot<'a> {
    metadata: &'a DatasetMetadata,
    data: Vec<&'a MarketLogRow>,
}

pub fn snapshot_dataset(rows: &[MarketLogRow], path: &Path) -> Result<DatasetMetadata, ExportError> {
    let metadata = DatasetMetadata {
        row_count: rows.len(),
        snapshot_timestamp_utc: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        dataset_hash: dataset_hash(rows)?,
    };
    let snapshot = DatasetSnapshot {
        metadata: &metadata,
        data: sorted_rows(rows),
    };
    dump_pretty_to_path(&to_canonical(&snapshot)?, path)?;
    info!(path = %path.display(), rows = metadata.row_count, hash = %metadata.dataset_hash, "dataset snapshot written");
    Ok(metadata)
}
