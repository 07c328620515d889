use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ModelError, Result};

pub const GENERIC_CODE: &str = "GENERIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    BasePower,
    Offense,
    Defense,
    Pace,
    Chaos,
    Volatility,
}

impl Rating {
    pub const ALL: [Rating; 6] = [
        Rating::BasePower,
        Rating::Offense,
        Rating::Defense,
        Rating::Pace,
        Rating::Chaos,
        Rating::Volatility,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Rating::BasePower => "base_power",
            Rating::Offense => "offense",
            Rating::Defense => "defense",
            Rating::Pace => "pace",
            Rating::Chaos => "chaos",
            Rating::Volatility => "volatility",
        }
    }
}

/// A team's static rating card. Ratings sit on a 0–10 scale; anything the
/// engines read beyond the six core ratings lives in `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    #[serde(skip)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl TeamProfile {
    pub fn new(code: &str, name: &str, ratings: [f64; 6]) -> Self {
        let [base_power, offense, defense, pace, chaos, volatility] = ratings;
        Self {
            code: normalize_code(code),
            name: Some(name.to_string()),
            base_power: Some(base_power),
            offense: Some(offense),
            defense: Some(defense),
            pace: Some(pace),
            chaos: Some(chaos),
            volatility: Some(volatility),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: f64) -> Self {
        self.attributes.insert(key.to_string(), Value::from(value));
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }

    pub fn rating_opt(&self, rating: Rating) -> Option<f64> {
        match rating {
            Rating::BasePower => self.base_power,
            Rating::Offense => self.offense,
            Rating::Defense => self.defense,
            Rating::Pace => self.pace,
            Rating::Chaos => self.chaos,
            Rating::Volatility => self.volatility,
        }
    }

    // Missing ratings read as zero so scoring never fails on a sparse card.
    pub fn rating(&self, rating: Rating) -> f64 {
        self.rating_opt(rating).unwrap_or(0.0)
    }

    pub fn attribute(&self, key: &str) -> f64 {
        match self.attributes.get(key).and_then(Value::as_f64) {
            Some(v) => v,
            None => {
                debug!(team = %self.code, attribute = key, "attribute missing, using 0");
                0.0
            }
        }
    }

    fn check(&self) -> Result<()> {
        let ctx = format!("team_profiles['{}']", self.code);
        match self.name.as_deref() {
            None => return Err(ModelError::config(format!("missing key 'name' in {ctx}"))),
            Some(name) if name.trim().is_empty() => {
                return Err(ModelError::config(format!("'name' in {ctx} must be non-empty")));
            }
            Some(_) => {}
        }
        for rating in Rating::ALL {
            let Some(value) = self.rating_opt(rating) else {
                return Err(ModelError::config(format!(
                    "missing key '{}' in {ctx}",
                    rating.key()
                )));
            };
            if !value.is_finite() {
                return Err(ModelError::config(format!(
                    "expected finite numeric value for {ctx}['{}'], got {value}",
                    rating.key()
                )));
            }
        }
        for (key, value) in &self.attributes {
            if !value.is_number() {
                return Err(ModelError::config(format!(
                    "expected numeric value for {ctx}['{key}'], got {value}"
                )));
            }
        }
        Ok(())
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamProfileStore {
    profiles: BTreeMap<String, TeamProfile>,
}

impl TeamProfileStore {
    pub fn new(profiles: impl IntoIterator<Item = TeamProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|mut p| {
                p.code = normalize_code(&p.code);
                (p.code.clone(), p)
            })
            .collect();
        Self { profiles }
    }

    pub fn from_map(map: BTreeMap<String, TeamProfile>) -> Self {
        Self::new(map.into_iter().map(|(code, mut p)| {
            p.code = code;
            p
        }))
    }

    pub fn get_profile(&self, code: &str) -> Result<&TeamProfile> {
        let key = normalize_code(code);
        if let Some(profile) = self.profiles.get(&key) {
            return Ok(profile);
        }
        match self.profiles.get(GENERIC_CODE) {
            Some(generic) => {
                debug!(code = %key, "unknown team code, using GENERIC profile");
                Ok(generic)
            }
            None => Err(ModelError::UnknownTeam { code: key }),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.profiles.contains_key(&normalize_code(code))
    }

    /// Resolves a team code or a display name ("Knicks", "New York Knicks") to a
    /// configured code. GENERIC is never returned here.
    pub fn resolve_code(&self, code_or_name: &str) -> Option<&str> {
        let needle = code_or_name.trim();
        if needle.is_empty() {
            return None;
        }
        let key = normalize_code(needle);
        if key != GENERIC_CODE
            && let Some((code, _)) = self.profiles.get_key_value(&key)
        {
            return Some(code.as_str());
        }
        let lowered = needle.to_lowercase();
        self.profiles
            .values()
            .filter(|p| p.code != GENERIC_CODE)
            .find(|p| {
                let Some(name) = p.name.as_deref() else {
                    return false;
                };
                let name = name.to_lowercase();
                name == lowered || name.split_whitespace().last() == Some(lowered.as_str())
            })
            .map(|p| p.code.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            return Err(ModelError::config("team_profiles is empty"));
        }
        for profile in self.profiles.values() {
            profile.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TeamProfileStore {
        TeamProfileStore::new([
            TeamProfile::new("nyk", "New York Knicks", [7.5, 7.0, 7.8, 4.8, 4.0, 4.5]),
            TeamProfile::new("GENERIC", "Generic Team", [6.0, 6.0, 6.0, 5.5, 5.0, 5.0]),
        ])
    }

    #[test]
    fn lookup_normalizes_and_falls_back_to_generic() {
        let store = store();
        assert_eq!(store.get_profile(" nyk ").unwrap().code, "NYK");
        assert_eq!(store.get_profile("ZZZ").unwrap().code, GENERIC_CODE);
    }

    #[test]
    fn lookup_without_generic_fails() {
        let store = TeamProfileStore::new([TeamProfile::new(
            "NYK",
            "New York Knicks",
            [7.5, 7.0, 7.8, 4.8, 4.0, 4.5],
        )]);
        let err = store.get_profile("zzz").unwrap_err();
        assert_eq!(err, ModelError::UnknownTeam { code: "ZZZ".to_string() });
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let mut broken = TeamProfile::new("DET", "Detroit Pistons", [4.0, 4.3, 4.2, 6.0, 6.5, 6.8]);
        broken.defense = None;
        broken.pace = None;
        let store = TeamProfileStore::new([broken]);
        let err = store.validate().unwrap_err();
        assert!(err.to_string().contains("'defense'"), "{err}");
    }

    #[test]
    fn validate_rejects_missing_name_and_non_numeric_attribute() {
        let mut nameless = TeamProfile::new("DET", "x", [4.0, 4.3, 4.2, 6.0, 6.5, 6.8]);
        nameless.name = None;
        let err = TeamProfileStore::new([nameless]).validate().unwrap_err();
        assert!(err.to_string().contains("'name'"));

        let mut odd = TeamProfile::new("DET", "Detroit", [4.0, 4.3, 4.2, 6.0, 6.5, 6.8]);
        odd.attributes
            .insert("chaos_rate".to_string(), Value::from("high"));
        let err = TeamProfileStore::new([odd]).validate().unwrap_err();
        assert!(err.to_string().contains("chaos_rate"));
    }

    #[test]
    fn missing_values_read_as_zero() {
        let mut p = TeamProfile::new("DET", "Detroit Pistons", [4.0, 4.3, 4.2, 6.0, 6.5, 6.8]);
        p.offense = None;
        assert_eq!(p.rating(Rating::Offense), 0.0);
        assert_eq!(p.attribute("injury_risk"), 0.0);
        let p = p.with_attribute("injury_risk", 0.25);
        assert_eq!(p.attribute("injury_risk"), 0.25);
    }

    #[test]
    fn resolve_code_matches_codes_and_names() {
        let store = store();
        assert_eq!(store.resolve_code("nyk"), Some("NYK"));
        assert_eq!(store.resolve_code("Knicks"), Some("NYK"));
        assert_eq!(store.resolve_code("new york knicks"), Some("NYK"));
        assert_eq!(store.resolve_code("Generic"), None);
        assert_eq!(store.resolve_code("GENERIC"), None);
    }
}
