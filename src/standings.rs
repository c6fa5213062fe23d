use crate::alliances::AllianceBook;
use crate::error::EngineError;
use crate::format::{PlayoffFormat, TiebreakMetric};
use crate::types::{canonical_order, Color, CompLevel, Match, Outcome, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const WIN_POINTS: u32 = 2;
const TIE_POINTS: u32 = 1;

/// One played match as seen by one alliance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
  pub match_key: String,
  pub score: i64,
  pub points: u32,
  pub tiebreaker1: i64,
  pub tiebreaker2: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowMetric {
  Average {
    average: f64,
  },
  RoundRobin {
    points: u32,
    tiebreaker1: i64,
    tiebreaker2: i64,
    record: Record,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
  /// Position of the alliance in the resolved book.
  #[serde(skip)]
  pub alliance_index: usize,
  pub alliance_name: Option<String>,
  pub picks: Vec<String>,
  pub samples: Vec<Sample>,
  #[serde(flatten)]
  pub metric: RowMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsTable {
  pub comp_level: CompLevel,
  /// Best first.
  pub rows: Vec<StandingsRow>,
  pub round_complete: bool,
}

impl StandingsTable {
  /// 1-based position of an alliance in this table.
  pub fn rank_of(&self, alliance_index: usize) -> Option<usize> {
    self
      .rows
      .iter()
      .position(|row| row.alliance_index == alliance_index)
      .map(|pos| pos + 1)
  }

  pub fn row_of(&self, alliance_index: usize) -> Option<&StandingsRow> {
    self.rows.iter().find(|row| row.alliance_index == alliance_index)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingsBuild {
  pub tables: Vec<StandingsTable>,
  pub issues: Vec<EngineError>,
}

impl StandingsBuild {
  pub fn table(&self, level: CompLevel) -> Option<&StandingsTable> {
    self.tables.iter().find(|table| table.comp_level == level)
  }
}

/// Ranked tables for every level the format plays as a table rather than a
/// bracket.
pub fn build(matches: &[Match], alliances: &AllianceBook, format: PlayoffFormat, year: i32) -> StandingsBuild {
  let mut out = StandingsBuild::default();
  for level in format.standings_levels() {
    let table = build_level(matches, alliances, format, year, level, &mut out.issues);
    debug!(
      "{} standings: {} rows, complete={}",
      level,
      table.rows.len(),
      table.round_complete
    );
    out.tables.push(table);
  }
  out
}

fn build_level(
  matches: &[Match],
  alliances: &AllianceBook,
  format: PlayoffFormat,
  year: i32,
  level: CompLevel,
  issues: &mut Vec<EngineError>,
) -> StandingsTable {
  let level_matches = canonical_order(matches)
    .into_iter()
    .filter(|m| m.comp_level == level)
    .collect::<Vec<_>>();
  let round_complete = !level_matches.is_empty() && level_matches.iter().all(|m| m.has_been_played());
  let tiebreaks = format.tiebreak_fields(year);

  let mut samples: BTreeMap<usize, Vec<Sample>> = BTreeMap::new();
  for m in &level_matches {
    let outcome = m.outcome();
    if outcome == Outcome::Unplayed {
      continue;
    }
    for color in Color::BOTH {
      let Some(index) = alliances.find(m.teams(color)) else {
        debug!("{} {} has no known alliance, left out of the table", m.key(), color);
        continue;
      };
      let score = m.score(color).unwrap_or(0);
      let points = match outcome {
        Outcome::Winner(winner) if winner == color => WIN_POINTS,
        Outcome::Tie => TIE_POINTS,
        _ => 0,
      };
      let (tiebreaker1, tiebreaker2) = tiebreak_values(m, color, tiebreaks, score, issues);
      samples.entry(index).or_default().push(Sample {
        match_key: m.key(),
        score,
        points,
        tiebreaker1,
        tiebreaker2,
      });
    }
  }

  let mut rows = samples
    .into_iter()
    .filter_map(|(index, samples)| {
      let alliance = alliances.get(index)?;
      let metric = match format {
        PlayoffFormat::RoundRobin6Team => round_robin_metric(&samples),
        _ => average_metric(&samples),
      };
      Some(StandingsRow {
        alliance_index: index,
        alliance_name: alliance.display_name(),
        picks: alliance.members().map(str::to_string).collect(),
        samples,
        metric,
      })
    })
    .collect::<Vec<_>>();
  rows.sort_by(|a, b| compare_metric(&a.metric, &b.metric).then(a.alliance_index.cmp(&b.alliance_index)));

  StandingsTable {
    comp_level: level,
    rows,
    round_complete,
  }
}

fn tiebreak_values(
  m: &Match,
  color: Color,
  (first, second): (TiebreakMetric, TiebreakMetric),
  score: i64,
  issues: &mut Vec<EngineError>,
) -> (i64, i64) {
  let mut missing = None;
  let mut value = |metric: TiebreakMetric| match metric {
    TiebreakMetric::AllianceScore => Some(score),
    TiebreakMetric::Zero => Some(0),
    TiebreakMetric::Breakdown(field) => {
      let found = m.breakdown_value(color, field);
      if found.is_none() && missing.is_none() {
        missing = Some(field);
      }
      found
    }
  };
  let values = (value(first), value(second));
  match (values, missing) {
    ((Some(a), Some(b)), _) => (a, b),
    (_, field) => {
      let field = field.unwrap_or_default();
      warn!("{} {} score breakdown missing '{}', ranking by score", m.key(), color, field);
      issues.push(EngineError::MissingTiebreakField {
        match_key: m.key(),
        color,
        field: field.to_string(),
      });
      (score, 0)
    }
  }
}

fn average_metric(samples: &[Sample]) -> RowMetric {
  let total: i64 = samples.iter().map(|s| s.score).sum();
  RowMetric::Average {
    average: total as f64 / samples.len().max(1) as f64,
  }
}

fn round_robin_metric(samples: &[Sample]) -> RowMetric {
  let mut record = Record::default();
  for sample in samples {
    match sample.points {
      WIN_POINTS => record.wins += 1,
      TIE_POINTS => record.ties += 1,
      _ => record.losses += 1,
    }
  }
  RowMetric::RoundRobin {
    points: samples.iter().map(|s| s.points).sum(),
    tiebreaker1: samples.iter().map(|s| s.tiebreaker1).sum(),
    tiebreaker2: samples.iter().map(|s| s.tiebreaker2).sum(),
    record,
  }
}

/// Best first.
fn compare_metric(a: &RowMetric, b: &RowMetric) -> Ordering {
  match (a, b) {
    (RowMetric::Average { average: a }, RowMetric::Average { average: b }) => b.total_cmp(a),
    (
      RowMetric::RoundRobin {
        points: pa,
        tiebreaker1: a1,
        tiebreaker2: a2,
        ..
      },
      RowMetric::RoundRobin {
        points: pb,
        tiebreaker1: b1,
        tiebreaker2: b2,
        ..
      },
    ) => (pb, b1, b2).cmp(&(pa, a1, a2)),
    _ => Ordering::Equal,
  }
}
