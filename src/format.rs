use crate::error::{EngineError, Result};
use crate::types::{Color, CompLevel};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use CompLevel::{Ef, Qf, Sf, F};

/// Round-robin matches before the finals band starts.
pub const ROUND_ROBIN_CUTOVER: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlayoffFormat {
  #[serde(rename = "BRACKET_8_TEAM")]
  Bracket8Team,
  #[serde(rename = "BRACKET_16_TEAM")]
  Bracket16Team,
  #[serde(rename = "BRACKET_4_TEAM")]
  Bracket4Team,
  #[serde(rename = "AVG_SCORE_8_TEAM")]
  AvgScore8Team,
  #[serde(rename = "ROUND_ROBIN_6_TEAM")]
  RoundRobin6Team,
  #[serde(rename = "DOUBLE_ELIM_8_TEAM")]
  DoubleElim8Team,
  #[serde(rename = "BO5_FINALS")]
  Bo5Finals,
  #[serde(rename = "BO3_FINALS")]
  Bo3Finals,
}

/// One side of a tie-break: a score-breakdown field, the raw alliance score, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiebreakMetric {
  Breakdown(&'static str),
  AllianceScore,
  Zero,
}

#[derive(Debug)]
enum Slots {
  Table(&'static [(CompLevel, u32, u32)]),
  /// No bracket sets: set 1, match counted from the start of the band.
  Sequential,
}

#[derive(Debug)]
struct FormatSpec {
  code: i64,
  name: &'static str,
  title: &'static str,
  /// Play order.
  levels: &'static [CompLevel],
  /// Levels ranked as a table, with how many alliances advance out of each.
  standings: &'static [(CompLevel, usize)],
  /// First match number of each band.
  bands: &'static [(u32, CompLevel)],
  /// Numbers up to `.0` are shifted by `.1` before lookup.
  offset: Option<(u32, u32)>,
  slots: Slots,
  win_threshold: u32,
  max_match_number: u32,
  /// Opening level and the number of alliances seeded into it.
  first_round: Option<(CompLevel, u32)>,
}

const ELIM_SLOTS: [(CompLevel, u32, u32); 24] = [
  (Qf, 1, 1), (Qf, 2, 1), (Qf, 3, 1), (Qf, 4, 1),
  (Qf, 1, 2), (Qf, 2, 2), (Qf, 3, 2), (Qf, 4, 2),
  (Qf, 1, 3), (Qf, 2, 3), (Qf, 3, 3), (Qf, 4, 3),
  (Sf, 1, 1), (Sf, 2, 1), (Sf, 1, 2), (Sf, 2, 2), (Sf, 1, 3), (Sf, 2, 3),
  (F, 1, 1), (F, 1, 2), (F, 1, 3), (F, 1, 4), (F, 1, 5), (F, 1, 6),
];

const OCTO_ELIM_SLOTS: [(CompLevel, u32, u32); 48] = [
  (Ef, 1, 1), (Ef, 2, 1), (Ef, 3, 1), (Ef, 4, 1), (Ef, 5, 1), (Ef, 6, 1), (Ef, 7, 1), (Ef, 8, 1),
  (Ef, 1, 2), (Ef, 2, 2), (Ef, 3, 2), (Ef, 4, 2), (Ef, 5, 2), (Ef, 6, 2), (Ef, 7, 2), (Ef, 8, 2),
  (Ef, 1, 3), (Ef, 2, 3), (Ef, 3, 3), (Ef, 4, 3), (Ef, 5, 3), (Ef, 6, 3), (Ef, 7, 3), (Ef, 8, 3),
  (Qf, 1, 1), (Qf, 2, 1), (Qf, 3, 1), (Qf, 4, 1),
  (Qf, 1, 2), (Qf, 2, 2), (Qf, 3, 2), (Qf, 4, 2),
  (Qf, 1, 3), (Qf, 2, 3), (Qf, 3, 3), (Qf, 4, 3),
  (Sf, 1, 1), (Sf, 2, 1), (Sf, 1, 2), (Sf, 2, 2), (Sf, 1, 3), (Sf, 2, 3),
  (F, 1, 1), (F, 1, 2), (F, 1, 3), (F, 1, 4), (F, 1, 5), (F, 1, 6),
];

const DOUBLE_ELIM_SLOTS: [(CompLevel, u32, u32); 19] = [
  (Sf, 1, 1), (Sf, 2, 1), (Sf, 3, 1), (Sf, 4, 1),
  (Sf, 5, 1), (Sf, 6, 1), (Sf, 7, 1), (Sf, 8, 1),
  (Sf, 9, 1), (Sf, 10, 1),
  (Sf, 11, 1), (Sf, 12, 1),
  (Sf, 13, 1),
  (F, 1, 1), (F, 1, 2), (F, 1, 3), (F, 1, 4), (F, 1, 5), (F, 1, 6),
];

/// Last match number of each double-elimination round.
const DOUBLE_ELIM_ROUND_ENDS: [u32; 5] = [4, 8, 10, 12, 13];

const ELIM_BANDS: [(u32, CompLevel); 3] = [(1, Qf), (13, Sf), (19, F)];
const FINALS_BAND: [(u32, CompLevel); 1] = [(1, F)];

static BRACKET_8: FormatSpec = FormatSpec {
  code: 0,
  name: "BRACKET_8_TEAM",
  title: "Elimination Bracket (8 Alliances)",
  levels: &[Qf, Sf, F],
  standings: &[],
  bands: &ELIM_BANDS,
  offset: None,
  slots: Slots::Table(&ELIM_SLOTS),
  win_threshold: 2,
  max_match_number: 24,
  first_round: Some((Qf, 8)),
};

static BRACKET_16: FormatSpec = FormatSpec {
  code: 1,
  name: "BRACKET_16_TEAM",
  title: "Elimination Bracket (16 Alliances)",
  levels: &[Ef, Qf, Sf, F],
  standings: &[],
  bands: &[(1, Ef), (25, Qf), (37, Sf), (43, F)],
  offset: None,
  slots: Slots::Table(&OCTO_ELIM_SLOTS),
  win_threshold: 2,
  max_match_number: 48,
  first_round: Some((Ef, 16)),
};

static BRACKET_4: FormatSpec = FormatSpec {
  code: 2,
  name: "BRACKET_4_TEAM",
  title: "Elimination Bracket (4 Alliances)",
  levels: &[Sf, F],
  standings: &[],
  bands: &ELIM_BANDS,
  offset: Some((12, 12)),
  slots: Slots::Table(&ELIM_SLOTS),
  win_threshold: 2,
  max_match_number: 24,
  first_round: Some((Sf, 4)),
};

static AVG_SCORE_8: FormatSpec = FormatSpec {
  code: 3,
  name: "AVG_SCORE_8_TEAM",
  title: "Average Score (8 Alliances)",
  levels: &[Qf, Sf, F],
  standings: &[(Qf, 4), (Sf, 2)],
  bands: &[(1, Qf), (9, Sf), (15, F)],
  offset: None,
  slots: Slots::Sequential,
  win_threshold: 2,
  max_match_number: 20,
  first_round: None,
};

static ROUND_ROBIN_6: FormatSpec = FormatSpec {
  code: 4,
  name: "ROUND_ROBIN_6_TEAM",
  title: "Round Robin (6 Alliances)",
  levels: &[Sf, F],
  standings: &[(Sf, 2)],
  bands: &[(1, Sf), (ROUND_ROBIN_CUTOVER + 1, F)],
  offset: None,
  slots: Slots::Sequential,
  win_threshold: 2,
  max_match_number: ROUND_ROBIN_CUTOVER + 6,
  first_round: None,
};

static DOUBLE_ELIM_8: FormatSpec = FormatSpec {
  code: 5,
  name: "DOUBLE_ELIM_8_TEAM",
  title: "Double Elimination Bracket (8 Alliances)",
  levels: &[Sf, F],
  standings: &[],
  bands: &[(1, Sf), (14, F)],
  offset: None,
  slots: Slots::Table(&DOUBLE_ELIM_SLOTS),
  win_threshold: 2,
  max_match_number: 19,
  first_round: Some((Sf, 8)),
};

static BO5_FINALS: FormatSpec = FormatSpec {
  code: 6,
  name: "BO5_FINALS",
  title: "Best of 5 Finals",
  levels: &[F],
  standings: &[],
  bands: &FINALS_BAND,
  offset: None,
  slots: Slots::Sequential,
  win_threshold: 3,
  max_match_number: 8,
  first_round: None,
};

static BO3_FINALS: FormatSpec = FormatSpec {
  code: 7,
  name: "BO3_FINALS",
  title: "Best of 3 Finals",
  levels: &[F],
  standings: &[],
  bands: &FINALS_BAND,
  offset: None,
  slots: Slots::Sequential,
  win_threshold: 2,
  max_match_number: 6,
  first_round: None,
};

impl PlayoffFormat {
  pub const ALL: [PlayoffFormat; 8] = [
    PlayoffFormat::Bracket8Team,
    PlayoffFormat::Bracket16Team,
    PlayoffFormat::Bracket4Team,
    PlayoffFormat::AvgScore8Team,
    PlayoffFormat::RoundRobin6Team,
    PlayoffFormat::DoubleElim8Team,
    PlayoffFormat::Bo5Finals,
    PlayoffFormat::Bo3Finals,
  ];

  fn spec(&self) -> &'static FormatSpec {
    match self {
      PlayoffFormat::Bracket8Team => &BRACKET_8,
      PlayoffFormat::Bracket16Team => &BRACKET_16,
      PlayoffFormat::Bracket4Team => &BRACKET_4,
      PlayoffFormat::AvgScore8Team => &AVG_SCORE_8,
      PlayoffFormat::RoundRobin6Team => &ROUND_ROBIN_6,
      PlayoffFormat::DoubleElim8Team => &DOUBLE_ELIM_8,
      PlayoffFormat::Bo5Finals => &BO5_FINALS,
      PlayoffFormat::Bo3Finals => &BO3_FINALS,
    }
  }

  pub fn from_code(code: i64) -> Result<Self> {
    PlayoffFormat::ALL
      .into_iter()
      .find(|format| format.spec().code == code)
      .ok_or_else(|| EngineError::UnsupportedFormat { format: code.to_string() })
  }

  pub fn code(&self) -> i64 {
    self.spec().code
  }

  pub fn name(&self) -> &'static str {
    self.spec().name
  }

  pub fn title(&self) -> &'static str {
    self.spec().title
  }

  pub fn levels(&self) -> &'static [CompLevel] {
    self.spec().levels
  }

  pub fn standings_levels(&self) -> impl Iterator<Item = CompLevel> {
    self.spec().standings.iter().map(|(level, _)| *level)
  }

  /// Levels played as best-of-N sets.
  pub fn bracket_levels(&self) -> impl Iterator<Item = CompLevel> + '_ {
    let standings = self.spec().standings;
    self
      .levels()
      .iter()
      .copied()
      .filter(move |level| !standings.iter().any(|(l, _)| l == level))
  }

  pub fn is_standings_level(&self, level: CompLevel) -> bool {
    self.spec().standings.iter().any(|(l, _)| *l == level)
  }

  /// Alliances that leave a standings level alive.
  pub fn advancing_count(&self, level: CompLevel) -> Option<usize> {
    self
      .spec()
      .standings
      .iter()
      .find(|(l, _)| *l == level)
      .map(|(_, count)| *count)
  }

  pub fn max_match_number(&self) -> u32 {
    self.spec().max_match_number
  }

  pub fn win_threshold(&self) -> u32 {
    self.spec().win_threshold
  }

  /// Wins that close a set at `level`. Double-elimination bracket sets are a
  /// single match.
  pub fn set_win_threshold(&self, level: CompLevel) -> u32 {
    match (self, level) {
      (PlayoffFormat::DoubleElim8Team, CompLevel::Sf) => 1,
      _ => self.win_threshold(),
    }
  }

  pub fn tiebreak_fields(&self, year: i32) -> (TiebreakMetric, TiebreakMetric) {
    match (self, year) {
      (PlayoffFormat::RoundRobin6Team, 2018) => (
        TiebreakMetric::Breakdown("endgamePoints"),
        TiebreakMetric::Breakdown("autoPoints"),
      ),
      (PlayoffFormat::RoundRobin6Team, 2019) => (
        TiebreakMetric::Breakdown("cargoPoints"),
        TiebreakMetric::Breakdown("hatchPanelPoints"),
      ),
      _ => (TiebreakMetric::AllianceScore, TiebreakMetric::Zero),
    }
  }

  fn shifted(&self, match_number: u32) -> u32 {
    match self.spec().offset {
      Some((up_to, add)) if match_number <= up_to => match_number + add,
      _ => match_number,
    }
  }

  fn band(&self, match_number: u32) -> (u32, CompLevel) {
    let bands = self.spec().bands;
    bands
      .iter()
      .rev()
      .find(|(start, _)| *start <= match_number)
      .copied()
      .unwrap_or(bands[0])
  }

  pub fn get_comp_level(&self, is_qualification: bool, match_number: u32) -> CompLevel {
    if is_qualification {
      return CompLevel::Qm;
    }
    self.band(self.shifted(match_number)).1
  }

  pub fn get_set_match_number(&self, comp_level: CompLevel, match_number: u32) -> Result<(u32, u32)> {
    if comp_level == CompLevel::Qm {
      return Ok((1, match_number));
    }
    if match_number == 0 || match_number > self.max_match_number() {
      return Err(EngineError::MatchNumberOutOfRange { format: *self, match_number });
    }
    let shifted = self.shifted(match_number);
    let (expected, set, number) = match self.spec().slots {
      Slots::Table(table) => {
        let Some(slot) = table.get(shifted as usize - 1).copied() else {
          return Err(EngineError::MatchNumberOutOfRange { format: *self, match_number });
        };
        slot
      }
      Slots::Sequential => {
        let (start, level) = self.band(shifted);
        (level, 1, shifted - start + 1)
      }
    };
    if expected != comp_level {
      return Err(EngineError::SlotMismatch {
        format: *self,
        match_number,
        expected,
        found: comp_level,
      });
    }
    Ok((set, number))
  }

  /// Smallest playoff match number that lands on the given slot.
  pub fn playoff_match_number(&self, comp_level: CompLevel, set: u32, number: u32) -> Option<u32> {
    (1..=self.max_match_number()).find(|n| {
      self.get_comp_level(false, *n) == comp_level
        && self.get_set_match_number(comp_level, *n).ok() == Some((set, number))
    })
  }

  /// Round (1-5) of a double-elimination bracket match; `None` for finals and
  /// other formats.
  pub fn double_elim_round(&self, match_number: u32) -> Option<u32> {
    if *self != PlayoffFormat::DoubleElim8Team || match_number == 0 {
      return None;
    }
    DOUBLE_ELIM_ROUND_ENDS
      .iter()
      .position(|end| match_number <= *end)
      .map(|idx| idx as u32 + 1)
  }

  /// Seed that opens the bracket in this slot; red holds the higher seed.
  pub fn first_round_seed(&self, comp_level: CompLevel, set: u32, color: Color) -> Option<u32> {
    let (level, size) = self.spec().first_round?;
    if level != comp_level || set == 0 || set > size / 2 {
      return None;
    }
    let seeds = seed_positions(size);
    let slot = (set as usize - 1) * 2;
    match color {
      Color::Red => seeds.get(slot).copied(),
      Color::Blue => seeds.get(slot + 1).copied(),
    }
  }
}

/// Standard bracket order: each seed is followed by the one it meets first.
fn seed_positions(size: u32) -> Vec<u32> {
  let mut seeds = vec![1u32];
  while seeds.len() < size as usize {
    let n = seeds.len() as u32;
    let mut next = Vec::with_capacity(seeds.len() * 2);
    for seed in seeds.iter().copied() {
      next.push(seed);
      next.push((n * 2 + 1).saturating_sub(seed));
    }
    seeds = next;
  }
  seeds
}

impl fmt::Display for PlayoffFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for PlayoffFormat {
  type Err = EngineError;

  /// Accepts either the format name or its numeric code.
  fn from_str(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if let Ok(code) = trimmed.parse::<i64>() {
      return PlayoffFormat::from_code(code);
    }
    PlayoffFormat::ALL
      .into_iter()
      .find(|format| format.name().eq_ignore_ascii_case(trimmed))
      .ok_or_else(|| EngineError::UnsupportedFormat { format: trimmed.to_string() })
  }
}
