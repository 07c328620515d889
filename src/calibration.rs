use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CalibrationContext {
    #[default]
    Calibration,
    RealBet,
    Market,
    Other(String),
}

impl CalibrationContext {
    pub fn as_str(&self) -> &str {
        match self {
            CalibrationContext::Calibration => "calibration",
            CalibrationContext::RealBet => "real_bet",
            CalibrationContext::Market => "market",
            CalibrationContext::Other(s) => s,
        }
    }
}

impl From<&str> for CalibrationContext {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "calibration" => CalibrationContext::Calibration,
            "real_bet" => CalibrationContext::RealBet,
            "market" => CalibrationContext::Market,
            other => CalibrationContext::Other(other.to_string()),
        }
    }
}

impl From<String> for CalibrationContext {
    fn from(raw: String) -> Self {
        CalibrationContext::from(raw.as_str())
    }
}

impl From<CalibrationContext> for String {
    fn from(ctx: CalibrationContext) -> Self {
        ctx.as_str().to_string()
    }
}

impl fmt::Display for CalibrationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finished game: the line the model (or market) posted, and the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCalibrationInput {
    pub home_team: String,
    pub away_team: String,
    pub predicted_spread: f64,
    pub predicted_total: f64,
    pub actual_home_score: u32,
    pub actual_away_score: u32,
    #[serde(default)]
    pub context: CalibrationContext,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl GameCalibrationInput {
    pub fn new(
        home_team: &str,
        away_team: &str,
        predicted_spread: f64,
        predicted_total: f64,
        actual_home_score: u32,
        actual_away_score: u32,
    ) -> Self {
        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            predicted_spread,
            predicted_total,
            actual_home_score,
            actual_away_score,
            context: CalibrationContext::default(),
            tag: None,
            notes: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<CalibrationContext>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameCalibrationResult {
    pub home_team: String,
    pub away_team: String,
    pub predicted_spread: f64,
    pub predicted_total: f64,
    pub actual_home_score: u32,
    pub actual_away_score: u32,
    pub actual_spread: f64,
    pub actual_total: f64,
    // Errors are predicted minus actual.
    pub spread_error: f64,
    pub total_error: f64,
    pub abs_spread_error: f64,
    pub abs_total_error: f64,
    pub context: CalibrationContext,
    pub tag: Option<String>,
    pub notes: Option<String>,
}

impl GameCalibrationResult {
    pub fn involves(&self, team: &str) -> bool {
        let team = team.trim();
        self.home_team.trim().eq_ignore_ascii_case(team)
            || self.away_team.trim().eq_ignore_ascii_case(team)
    }
}

pub fn compute_game_calibration(game: GameCalibrationInput) -> GameCalibrationResult {
    let actual_spread = f64::from(game.actual_home_score) - f64::from(game.actual_away_score);
    let actual_total = f64::from(game.actual_home_score) + f64::from(game.actual_away_score);
    let spread_error = game.predicted_spread - actual_spread;
    let total_error = game.predicted_total - actual_total;

    GameCalibrationResult {
        home_team: game.home_team,
        away_team: game.away_team,
        predicted_spread: game.predicted_spread,
        predicted_total: game.predicted_total,
        actual_home_score: game.actual_home_score,
        actual_away_score: game.actual_away_score,
        actual_spread,
        actual_total,
        spread_error,
        total_error,
        abs_spread_error: spread_error.abs(),
        abs_total_error: total_error.abs(),
        context: game.context,
        tag: game.tag,
        notes: game.notes,
    }
}

/// Bias (signed mean) and MAE over a filtered set of games. All zeros when
/// nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub count: usize,
    pub avg_spread_error: f64,
    pub avg_total_error: f64,
    pub mae_spread: f64,
    pub mae_total: f64,
}

impl CalibrationSummary {
    fn from_games<'a>(games: impl Iterator<Item = &'a GameCalibrationResult>) -> Self {
        let mut count = 0usize;
        let mut spread = 0.0;
        let mut total = 0.0;
        let mut abs_spread = 0.0;
        let mut abs_total = 0.0;
        for g in games {
            count += 1;
            spread += g.spread_error;
            total += g.total_error;
            abs_spread += g.abs_spread_error;
            abs_total += g.abs_total_error;
        }
        if count == 0 {
            return Self::default();
        }
        let n = count as f64;
        Self {
            count,
            avg_spread_error: spread / n,
            avg_total_error: total / n,
            mae_spread: abs_spread / n,
            mae_total: abs_total / n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamCalibrationSummary {
    pub team: String,
    pub summary: CalibrationSummary,
}

/// Append-only store of graded games. Summaries are recomputed on every call.
#[derive(Debug, Clone, Default)]
pub struct CalibrationAccumulator {
    games: Vec<GameCalibrationResult>,
}

impl CalibrationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_game(&mut self, result: GameCalibrationResult) {
        self.games.push(result);
    }

    pub fn games(&self) -> &[GameCalibrationResult] {
        &self.games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn summary(&self, context: Option<&CalibrationContext>) -> CalibrationSummary {
        CalibrationSummary::from_games(self.filtered(context))
    }

    pub fn team_summary(&self, team: &str, context: Option<&CalibrationContext>) -> CalibrationSummary {
        CalibrationSummary::from_games(self.filtered(context).filter(|g| g.involves(team)))
    }

    pub fn tag_summary(&self, tag: &str, context: Option<&CalibrationContext>) -> CalibrationSummary {
        CalibrationSummary::from_games(
            self.filtered(context)
                .filter(|g| g.tag.as_deref() == Some(tag)),
        )
    }

    /// One summary per code, in the order given.
    pub fn core_teams_summary<S: AsRef<str>>(
        &self,
        codes: &[S],
        context: Option<&CalibrationContext>,
    ) -> Vec<TeamCalibrationSummary> {
        codes
            .iter()
            .map(|code| TeamCalibrationSummary {
                team: code.as_ref().to_string(),
                summary: self.team_summary(code.as_ref(), context),
            })
            .collect()
    }

    fn filtered<'a>(
        &'a self,
        context: Option<&'a CalibrationContext>,
    ) -> impl Iterator<Item = &'a GameCalibrationResult> + 'a {
        self.games
            .iter()
            .filter(move |g| context.is_none_or(|c| &g.context == c))
    }
}

impl Extend<GameCalibrationResult> for CalibrationAccumulator {
    fn extend<I: IntoIterator<Item = GameCalibrationResult>>(&mut self, iter: I) {
        self.games.extend(iter);
    }
}

impl FromIterator<GameCalibrationResult> for CalibrationAccumulator {
    fn from_iter<I: IntoIterator<Item = GameCalibrationResult>>(iter: I) -> Self {
        Self {
            games: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(home: &str, away: &str, spread: f64, total: f64, hs: u32, aws: u32) -> GameCalibrationResult {
        compute_game_calibration(GameCalibrationInput::new(home, away, spread, total, hs, aws))
    }

    #[test]
    fn derives_actual_lines_and_errors() {
        let r = game("HOR", "DEN", -3.5, 225.0, 105, 110);
        assert_eq!(r.actual_spread, -5.0);
        assert_eq!(r.actual_total, 215.0);
        assert_eq!(r.spread_error, 1.5);
        assert_eq!(r.total_error, 10.0);
        assert_eq!(r.abs_spread_error, 1.5);
        assert_eq!(r.abs_total_error, 10.0);
        assert_eq!(r.context, CalibrationContext::Calibration);
    }

    #[test]
    fn empty_filters_give_zero_summary() {
        let mut acc = CalibrationAccumulator::new();
        assert_eq!(acc.summary(None), CalibrationSummary::default());
        acc.add_game(game("HOR", "DEN", -3.5, 225.0, 105, 110));
        let bets = CalibrationContext::RealBet;
        assert_eq!(acc.summary(Some(&bets)).count, 0);
        assert_eq!(acc.summary(Some(&bets)).mae_total, 0.0);
        assert_eq!(acc.team_summary("NYK", None), CalibrationSummary::default());
    }

    #[test]
    fn team_summary_counts_home_and_away_games() {
        let mut acc = CalibrationAccumulator::new();
        acc.add_game(game("HOR", "DEN", -3.5, 225.0, 105, 110));
        acc.add_game(game("NYK", "HOR", 2.0, 220.0, 100, 100));
        acc.add_game(game("NYK", "DET", -6.0, 215.0, 120, 101));
        assert_eq!(acc.team_summary("HOR", None).count, 2);
        assert_eq!(acc.team_summary(" hor ", None).count, 2);
        assert_eq!(acc.team_summary("DET", None).count, 1);
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn signed_and_absolute_errors_average_separately() {
        let acc: CalibrationAccumulator = [
            game("HOR", "DEN", 2.0, 210.0, 100, 100),
            game("HOR", "DEN", -2.0, 190.0, 100, 100),
        ]
        .into_iter()
        .collect();
        let s = acc.summary(None);
        assert_eq!(s.count, 2);
        assert_eq!(s.avg_spread_error, 0.0);
        assert_eq!(s.mae_spread, 2.0);
        assert_eq!(s.avg_total_error, 0.0);
        assert_eq!(s.mae_total, 10.0);
    }

    #[test]
    fn context_and_tag_filters() {
        let mut acc = CalibrationAccumulator::new();
        acc.add_game(compute_game_calibration(
            GameCalibrationInput::new("HOR", "DEN", -1.0, 220.0, 100, 98)
                .with_context("real_bet")
                .with_tag("back_to_back"),
        ));
        acc.add_game(game("HOR", "DEN", -1.0, 220.0, 100, 98));
        assert_eq!(acc.summary(Some(&CalibrationContext::RealBet)).count, 1);
        assert_eq!(acc.tag_summary("back_to_back", None).count, 1);
        assert_eq!(
            acc.tag_summary("back_to_back", Some(&CalibrationContext::Calibration)).count,
            0
        );
    }

    #[test]
    fn core_teams_keep_caller_order() {
        let mut acc = CalibrationAccumulator::new();
        acc.add_game(game("HOR", "DEN", -3.5, 225.0, 105, 110));
        let rows = acc.core_teams_summary(&["OKC", "HOR", "DEN"], None);
        let teams: Vec<&str> = rows.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(teams, ["OKC", "HOR", "DEN"]);
        assert_eq!(rows[0].summary.count, 0);
        assert_eq!(rows[1].summary.count, 1);
    }

    #[test]
    fn context_serializes_as_plain_string() {
        let ctx = CalibrationContext::from("playoffs");
        assert_eq!(serde_json::to_string(&ctx).unwrap(), "\"playoffs\"");
        let back: CalibrationContext = serde_json::from_str("\"real_bet\"").unwrap();
        assert_eq!(back, CalibrationContext::RealBet);
    }
}
