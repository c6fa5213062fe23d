pub mod alliances;
pub mod bracket;
pub mod config;
pub mod error;
pub mod format;
pub mod standings;
pub mod status;
pub mod status_text;
pub mod types;
#[cfg(test)]
mod testutil;

pub use alliances::{resolve, same_alliance, AllianceBook, Resolution};
pub use bracket::{BracketSetState, BracketTable};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use format::PlayoffFormat;
pub use standings::{StandingsRow, StandingsTable};
pub use status::{status_for, StatusContext, TeamEventStatus};
pub use types::*;

use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

// ── Event input ────────────────────────────────────────────────────────

/// A playoff format given either by its numeric code or its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatRef {
    Code(i64),
    Name(String),
}

impl FormatRef {
    pub fn resolve(&self) -> Result<PlayoffFormat> {
        match self {
            FormatRef::Code(code) => PlayoffFormat::from_code(*code),
            FormatRef::Name(name) => name.parse(),
        }
    }
}

impl From<PlayoffFormat> for FormatRef {
    fn from(format: PlayoffFormat) -> Self {
        FormatRef::Code(format.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub event_key: String,
    pub year: i32,
    pub playoff_type: FormatRef,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub alliance_selections: Option<Vec<TournamentAlliance>>,
    #[serde(default)]
    pub rankings: Option<Vec<OfficialRanking>>,
}

// ── Event report ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event_key: String,
    pub year: i32,
    pub format: PlayoffFormat,
    pub alliances: Vec<TournamentAlliance>,
    pub bracket: BracketTable,
    pub standings: Vec<StandingsTable>,
    #[serde(serialize_with = "issue_messages")]
    pub issues: Vec<EngineError>,
    #[serde(skip)]
    book: AllianceBook,
    #[serde(skip)]
    qual_matches: Vec<Match>,
    #[serde(skip)]
    playoff_matches: Vec<Match>,
    #[serde(skip)]
    rankings: Option<Vec<OfficialRanking>>,
    #[serde(skip)]
    config: EngineConfig,
}

fn issue_messages<S: Serializer>(issues: &[EngineError], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(issues.iter().map(|issue| issue.to_string()))
}

impl EventReport {
    pub fn alliance_book(&self) -> &AllianceBook {
        &self.book
    }

    pub fn context(&self) -> StatusContext<'_> {
        StatusContext::new(
            self.year,
            self.format,
            &self.qual_matches,
            &self.playoff_matches,
            self.rankings.as_deref(),
            &self.book,
        )
    }

    /// Status for one team. Bare numbers and mixed-case keys are accepted.
    pub fn team_status(&self, team_key: &str) -> TeamEventStatus {
        let key = self
            .config
            .normalize_team_key(team_key)
            .unwrap_or_else(|| team_key.to_string());
        status_for(&key, &self.context(), &self.config)
    }

    /// Status for every team that appears in a match, the rankings or an alliance.
    pub fn team_statuses(&self) -> BTreeMap<String, TeamEventStatus> {
        let ctx = self.context();
        self.team_keys()
            .into_iter()
            .map(|team| {
                let status = status_for(&team, &ctx, &self.config);
                (team, status)
            })
            .collect()
    }

    pub fn team_keys(&self) -> BTreeSet<String> {
        let mut teams = BTreeSet::new();
        for m in self.qual_matches.iter().chain(self.playoff_matches.iter()) {
            for color in Color::BOTH {
                teams.extend(m.teams(color).iter().cloned());
            }
        }
        for ranking in self.rankings.iter().flatten() {
            teams.insert(ranking.team_key.clone());
        }
        for alliance in self.book.alliances() {
            teams.extend(alliance.members().map(str::to_string));
        }
        teams.retain(|team| !team.trim().is_empty());
        teams
    }
}

/// Runs the whole pipeline for one event: alliances, bracket, standings.
/// Team statuses are computed on demand from the report.
pub fn compute_event(input: &EventInput, config: &EngineConfig) -> Result<EventReport> {
    let format = input.playoff_type.resolve()?;

    let (mine, foreign): (Vec<&Match>, Vec<&Match>) = input
        .matches
        .iter()
        .partition(|m| m.event_key == input.event_key);
    if !foreign.is_empty() {
        warn!("{}: ignoring {} matches from other events", input.event_key, foreign.len());
    }
    let (qual_matches, playoff_matches): (Vec<Match>, Vec<Match>) = mine
        .into_iter()
        .cloned()
        .partition(|m| m.comp_level == CompLevel::Qm);

    let Resolution { mut book, mut issues } = resolve(&playoff_matches, input.alliance_selections.as_deref());
    book.assign_seeds(&playoff_matches, format);
    let bracket = bracket::build(&playoff_matches, &book, format);
    let standings = standings::build(&playoff_matches, &book, format, input.year);
    issues.extend(standings.issues);

    debug!(
        "{} ({}): {} qual, {} playoff matches, {} alliances, {} issues",
        input.event_key,
        format,
        qual_matches.len(),
        playoff_matches.len(),
        book.len(),
        issues.len()
    );

    Ok(EventReport {
        event_key: input.event_key.clone(),
        year: input.year,
        format,
        alliances: book.alliances().to_vec(),
        bracket,
        standings: standings.tables,
        issues,
        book,
        qual_matches,
        playoff_matches,
        rankings: input.rankings.clone(),
        config: config.clone(),
    })
}
