use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{collections::HashSet, fmt};

// ── Constants ──────────────────────────────────────────────────────────

/// Smallest playoff alliance the engine can identify. Two-robot alliances
/// cannot satisfy the overlap rule once a backup is on the field.
pub const MIN_ALLIANCE_SIZE: usize = 3;
/// Teams two lineups must share to be the same tournament alliance.
pub const SAME_ALLIANCE_OVERLAP: usize = 2;
/// The average-score season: no ties, no best-of-3 before the finals.
pub const AVG_SCORE_SEASON: i32 = 2015;
pub const DEFAULT_TEAM_KEY_PREFIX: &str = "frc";

// ── Competition levels & colors ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompLevel {
    Qm,
    Ef,
    Qf,
    Sf,
    F,
}

impl CompLevel {
    /// Playoff levels, highest first.
    pub const PLAYOFFS_DESC: [CompLevel; 4] = [CompLevel::F, CompLevel::Sf, CompLevel::Qf, CompLevel::Ef];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompLevel::Qm => "qm",
            CompLevel::Ef => "ef",
            CompLevel::Qf => "qf",
            CompLevel::Sf => "sf",
            CompLevel::F => "f",
        }
    }

    pub fn is_playoff(&self) -> bool {
        !matches!(self, CompLevel::Qm)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CompLevel::Qm => "Qualifications",
            CompLevel::Ef => "Octofinals",
            CompLevel::Qf => "Quarterfinals",
            CompLevel::Sf => "Semifinals",
            CompLevel::F => "Finals",
        }
    }
}

impl fmt::Display for CompLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    pub const BOTH: [Color; 2] = [Color::Red, Color::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Blue => "blue",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of `winning_alliance`: `"red"`, `"blue"` or `""` for a tie.
/// A missing/null value means the match has not been played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinningAlliance {
    #[serde(rename = "red")]
    Red,
    #[serde(rename = "blue")]
    Blue,
    #[serde(rename = "")]
    Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Color),
    Tie,
    Unplayed,
}

// ── Match data ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllianceInMatch {
    pub teams: Vec<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub surrogates: Vec<String>,
    #[serde(default)]
    pub dqs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAlliances {
    pub red: AllianceInMatch,
    pub blue: AllianceInMatch,
}

impl MatchAlliances {
    pub fn get(&self, color: Color) -> &AllianceInMatch {
        match color {
            Color::Red => &self.red,
            Color::Blue => &self.blue,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(default)]
    pub red: Map<String, Value>,
    #[serde(default)]
    pub blue: Map<String, Value>,
}

impl ScoreBreakdown {
    pub fn get(&self, color: Color) -> &Map<String, Value> {
        match color {
            Color::Red => &self.red,
            Color::Blue => &self.blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub event_key: String,
    pub comp_level: CompLevel,
    pub set_number: u32,
    pub match_number: u32,
    pub alliances: MatchAlliances,
    #[serde(default)]
    pub winning_alliance: Option<WinningAlliance>,
    #[serde(default)]
    pub score_breakdown: Option<ScoreBreakdown>,
}

impl Match {
    pub fn key(&self) -> String {
        if self.comp_level == CompLevel::Qm {
            format!("{}_qm{}", self.event_key, self.match_number)
        } else {
            format!(
                "{}_{}{}m{}",
                self.event_key, self.comp_level, self.set_number, self.match_number
            )
        }
    }

    /// Both scores posted (the legacy `-1` counts as missing) and a result recorded.
    pub fn has_been_played(&self) -> bool {
        let posted = |score: Option<i64>| score.map(|s| s >= 0).unwrap_or(false);
        self.winning_alliance.is_some()
            && posted(self.alliances.red.score)
            && posted(self.alliances.blue.score)
    }

    pub fn outcome(&self) -> Outcome {
        if !self.has_been_played() {
            return Outcome::Unplayed;
        }
        match self.winning_alliance {
            Some(WinningAlliance::Red) => Outcome::Winner(Color::Red),
            Some(WinningAlliance::Blue) => Outcome::Winner(Color::Blue),
            Some(WinningAlliance::Tie) => Outcome::Tie,
            None => Outcome::Unplayed,
        }
    }

    pub fn teams(&self, color: Color) -> &[String] {
        &self.alliances.get(color).teams
    }

    pub fn score(&self, color: Color) -> Option<i64> {
        self.alliances.get(color).score.filter(|s| *s >= 0)
    }

    pub fn color_of(&self, team_key: &str) -> Option<Color> {
        Color::BOTH
            .into_iter()
            .find(|color| self.teams(*color).iter().any(|t| t == team_key))
    }

    pub fn is_surrogate(&self, color: Color, team_key: &str) -> bool {
        self.alliances.get(color).surrogates.iter().any(|t| t == team_key)
    }

    pub fn is_disqualified(&self, color: Color, team_key: &str) -> bool {
        self.alliances.get(color).dqs.iter().any(|t| t == team_key)
    }

    /// Integer value of a score-breakdown field; fractional values are rounded.
    pub fn breakdown_value(&self, color: Color, field: &str) -> Option<i64> {
        let value = self.score_breakdown.as_ref()?.get(color).get(field)?;
        value.as_i64().or_else(|| value.as_f64().map(|v| v.round() as i64))
    }

    fn play_order(&self) -> (CompLevel, u32, u32) {
        (self.comp_level, self.set_number, self.match_number)
    }
}

/// Matches sorted into play order with duplicate keys collapsed, so every
/// computation sees the same sequence regardless of how the caller ordered them.
/// Of several snapshots of one match, a played one wins; remaining ties go to
/// the smallest serialized form.
pub fn canonical_order(matches: &[Match]) -> Vec<&Match> {
    let mut ordered = matches.iter().collect::<Vec<_>>();
    ordered.sort_by_cached_key(|m| {
        (
            m.play_order(),
            m.event_key.clone(),
            !m.has_been_played(),
            serde_json::to_string(m).unwrap_or_default(),
        )
    });
    let mut seen = HashSet::new();
    ordered.retain(|m| seen.insert(m.key()));
    ordered
}

// ── Alliances ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub out: String,
    #[serde(rename = "in")]
    pub in_team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentAlliance {
    pub picks: Vec<String>,
    #[serde(default)]
    pub backup: Option<Backup>,
    #[serde(default)]
    pub name: Option<String>,
    /// Seed; the list position for official selections, inferred from the
    /// first-round bracket slot for reconstructed alliances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

impl TournamentAlliance {
    /// Picks followed by the backup that came in, if any.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.picks
            .iter()
            .map(String::as_str)
            .chain(self.backup.iter().map(|b| b.in_team.as_str()))
    }

    pub fn contains(&self, team_key: &str) -> bool {
        self.members().any(|t| t == team_key)
    }

    pub fn display_name(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.number.map(|n| format!("Alliance {}", n)))
    }
}

// ── Rankings ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Record {
    pub fn new(wins: u32, losses: u32, ties: u32) -> Self {
        Record { wins, losses, ties }
    }

    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.wins, self.losses, self.ties)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialRanking {
    pub team_key: String,
    pub rank: u32,
    #[serde(default)]
    pub record: Option<Record>,
    #[serde(default)]
    pub qual_average: Option<f64>,
    #[serde(default)]
    pub matches_played: u32,
    #[serde(default)]
    pub dq: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{played, scheduled};

    #[test]
    fn test_played_snapshot_wins_over_scheduled() {
        let red = ["frc1", "frc2", "frc3"];
        let blue = ["frc4", "frc5", "frc6"];
        let pending = scheduled(CompLevel::Qf, 1, 2, &red, &blue);
        let result = played(CompLevel::Qf, 1, 2, &red, &blue, 60, 40);
        let first = vec![pending.clone(), result.clone()];
        let second = vec![result.clone(), pending];
        for matches in [first, second] {
            let ordered = canonical_order(&matches);
            assert_eq!(ordered.len(), 1);
            assert_eq!(*ordered[0], result);
        }
    }

    #[test]
    fn test_conflicting_results_pick_the_same_copy() {
        let red = ["frc1", "frc2", "frc3"];
        let blue = ["frc4", "frc5", "frc6"];
        let a = played(CompLevel::F, 1, 1, &red, &blue, 60, 40);
        let b = played(CompLevel::F, 1, 1, &red, &blue, 40, 60);
        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];
        assert_eq!(canonical_order(&forward), canonical_order(&backward));
    }

    #[test]
    fn test_match_keys() {
        let m = scheduled(CompLevel::Sf, 2, 3, &[], &[]);
        assert_eq!(m.key(), "2019test_sf2m3");
        let q = scheduled(CompLevel::Qm, 1, 14, &[], &[]);
        assert_eq!(q.key(), "2019test_qm14");
    }
}
