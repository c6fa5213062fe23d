use crate::alliances::AllianceBook;
use crate::format::PlayoffFormat;
use crate::types::{canonical_order, Color, CompLevel, Match, Outcome, TournamentAlliance};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSetState {
  pub red_alliance: Vec<String>,
  pub blue_alliance: Vec<String>,
  pub red_wins: u32,
  pub blue_wins: u32,
  pub winning_alliance: Option<Color>,
}

impl BracketSetState {
  pub fn wins(&self, color: Color) -> u32 {
    match color {
      Color::Red => self.red_wins,
      Color::Blue => self.blue_wins,
    }
  }

  pub fn lineup(&self, color: Color) -> &[String] {
    match color {
      Color::Red => &self.red_alliance,
      Color::Blue => &self.blue_alliance,
    }
  }

  pub fn is_decided(&self) -> bool {
    self.winning_alliance.is_some()
  }

  fn record_win(&mut self, color: Color, threshold: u32) {
    match color {
      Color::Red => self.red_wins += 1,
      Color::Blue => self.blue_wins += 1,
    }
    if self.winning_alliance.is_none() && self.wins(color) >= threshold {
      self.winning_alliance = Some(color);
    }
  }
}

pub type BracketTable = BTreeMap<CompLevel, BTreeMap<u32, BracketSetState>>;

/// Per-set win/loss table for the format's best-of-N levels.
pub fn build(matches: &[Match], alliances: &AllianceBook, format: PlayoffFormat) -> BracketTable {
  let levels = format.bracket_levels().collect::<Vec<_>>();
  let mut table = BracketTable::new();
  let mut slot_alliance: HashMap<(CompLevel, u32, Color), usize> = HashMap::new();

  for m in canonical_order(matches) {
    if !levels.contains(&m.comp_level) {
      if m.comp_level.is_playoff() && !format.is_standings_level(m.comp_level) {
        debug!("{} is not part of a {} bracket", m.key(), format);
      }
      continue;
    }
    let state = table
      .entry(m.comp_level)
      .or_default()
      .entry(m.set_number)
      .or_default();

    for color in Color::BOTH {
      let teams = m.teams(color);
      let resolved = alliances.find(teams);
      let slot = (m.comp_level, m.set_number, color);
      match (slot_alliance.get(&slot), resolved) {
        (None, Some(index)) => {
          slot_alliance.insert(slot, index);
        }
        (Some(first), Some(index)) if *first != index => {
          warn!("{} {} lineup does not match the alliance already in that slot", m.key(), color);
        }
        _ => {}
      }
      let owner = slot_alliance.get(&slot).and_then(|index| alliances.get(*index));
      let lineup = match color {
        Color::Red => &mut state.red_alliance,
        Color::Blue => &mut state.blue_alliance,
      };
      merge_lineup(lineup, teams, owner);
    }

    if let Outcome::Winner(color) = m.outcome() {
      if state.is_decided() {
        debug!("{} played after the set was decided", m.key());
      }
      state.record_win(color, format.set_win_threshold(m.comp_level));
    }
  }

  table
}

/// Union of the teams seen in a slot, in alliance order (picks, then the
/// backup). Teams the alliance doesn't know about trail in first-seen order.
fn merge_lineup(lineup: &mut Vec<String>, teams: &[String], owner: Option<&TournamentAlliance>) {
  let mut present = lineup.clone();
  for team in teams {
    if !team.is_empty() && !present.contains(team) {
      present.push(team.clone());
    }
  }
  let Some(alliance) = owner else {
    *lineup = present;
    return;
  };
  let mut ordered = alliance
    .members()
    .filter(|member| present.iter().any(|t| t == member))
    .map(str::to_string)
    .collect::<Vec<_>>();
  for team in present {
    if !ordered.contains(&team) {
      ordered.push(team);
    }
  }
  *lineup = ordered;
}
