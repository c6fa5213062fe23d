use crate::error::EngineError;
use crate::format::PlayoffFormat;
use crate::types::{canonical_order, Backup, Color, Match, TournamentAlliance, MIN_ALLIANCE_SIZE, SAME_ALLIANCE_OVERLAP};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Number of teams two lineups have in common.
pub fn overlap<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> usize {
  let left = a.iter().map(|t| t.as_ref()).collect::<HashSet<_>>();
  let right = b.iter().map(|t| t.as_ref()).collect::<HashSet<_>>();
  left.intersection(&right).count()
}

/// A legal substitution always leaves at least two original robots on the
/// field, so two lineups sharing two teams are the same tournament alliance.
pub fn same_alliance<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
  overlap(a, b) >= SAME_ALLIANCE_OVERLAP
}

/// Tournament alliances plus a `team -> alliance` index over their members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllianceBook {
  alliances: Vec<TournamentAlliance>,
  team_index: BTreeMap<String, usize>,
  official: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
  pub book: AllianceBook,
  pub issues: Vec<EngineError>,
}

impl AllianceBook {
  pub fn alliances(&self) -> &[TournamentAlliance] {
    &self.alliances
  }

  pub fn get(&self, index: usize) -> Option<&TournamentAlliance> {
    self.alliances.get(index)
  }

  pub fn len(&self) -> usize {
    self.alliances.len()
  }

  pub fn is_empty(&self) -> bool {
    self.alliances.is_empty()
  }

  /// Whether the alliances came from the official selections.
  pub fn is_official(&self) -> bool {
    self.official
  }

  pub fn index_of_team(&self, team_key: &str) -> Option<usize> {
    self.team_index.get(team_key).copied()
  }

  pub fn alliance_of(&self, team_key: &str) -> Option<(usize, &TournamentAlliance)> {
    let index = self.index_of_team(team_key)?;
    self.alliances.get(index).map(|alliance| (index, alliance))
  }

  /// Alliance sharing at least two members with `teams`. When a malformed
  /// lineup touches two alliances equally, the earlier one wins.
  pub fn find<T: AsRef<str>>(&self, teams: &[T]) -> Option<usize> {
    let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
    let mut seen = HashSet::new();
    for team in teams {
      let team = team.as_ref();
      if !seen.insert(team) {
        continue;
      }
      if let Some(index) = self.team_index.get(team) {
        *votes.entry(*index).or_default() += 1;
      }
    }
    votes
      .into_iter()
      .filter(|(_, count)| *count >= SAME_ALLIANCE_OVERLAP)
      .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
      .map(|(index, _)| index)
  }

  /// Gives reconstructed alliances their seed from first-round bracket slots.
  pub fn assign_seeds(&mut self, matches: &[Match], format: PlayoffFormat) {
    if self.official {
      return;
    }
    for m in canonical_order(matches) {
      for color in Color::BOTH {
        let Some(seed) = format.first_round_seed(m.comp_level, m.set_number, color) else {
          continue;
        };
        let Some(index) = self.find(m.teams(color)) else {
          continue;
        };
        let taken = self.alliances.iter().any(|a| a.number == Some(seed));
        let alliance = &mut self.alliances[index];
        if alliance.number.is_none() && !taken {
          debug!("{} seeded {} from {}", alliance.picks.join(","), seed, m.key());
          alliance.number = Some(seed);
        }
      }
    }
  }

  fn push(&mut self, alliance: TournamentAlliance) -> usize {
    let index = self.alliances.len();
    for team in alliance.members() {
      if let Some(existing) = self.team_index.get(team) {
        warn!("{team} already belongs to alliance #{}; keeping that assignment", existing + 1);
        continue;
      }
      self.team_index.insert(team.to_string(), index);
    }
    self.alliances.push(alliance);
    index
  }

  /// Adds the unseen teams of a lineup to an alliance it already matched.
  ///
  /// The first newcomer to an alliance of three or more picks is recorded as
  /// the backup for the first pick missing from that lineup. Match data alone
  /// cannot tell a backup from a fourth pick rotating in, so `[A,B,C]` then
  /// `[A,B,D]` always reads as D in for C.
  fn absorb(&mut self, index: usize, teams: &[String], m: &Match, color: Color, issues: &mut Vec<EngineError>) {
    for team in teams {
      match self.team_index.get(team) {
        Some(existing) if *existing == index => continue,
        Some(existing) => {
          warn!("{team} in {} already plays for alliance #{}", m.key(), existing + 1);
          issues.push(unresolvable(m, color, teams, format!("{team} already plays for another alliance")));
          continue;
        }
        None => {}
      }
      let alliance = &mut self.alliances[index];
      let missing = alliance.picks.iter().find(|pick| !teams.contains(*pick)).cloned();
      match missing {
        Some(out) if alliance.backup.is_none() && alliance.picks.len() >= MIN_ALLIANCE_SIZE => {
          debug!("{} replaces {} on alliance #{} in {}", team, out, index + 1, m.key());
          alliance.backup = Some(Backup { out, in_team: team.clone() });
        }
        _ => {
          debug!("{} joins alliance #{} in {}", team, index + 1, m.key());
          alliance.picks.push(team.clone());
        }
      }
      self.team_index.insert(team.clone(), index);
    }
  }
}

/// Tournament alliances for an event. Official selections are taken as-is
/// (backups normalized); otherwise they are rebuilt from the playoff matches.
/// Lineups that cannot be placed are reported and skipped.
pub fn resolve(matches: &[Match], official: Option<&[TournamentAlliance]>) -> Resolution {
  let mut book = AllianceBook::default();
  let mut issues = Vec::new();

  if let Some(selections) = official {
    book.official = true;
    for (idx, selection) in selections.iter().enumerate() {
      let mut alliance = normalize_selection(selection);
      alliance.number = Some(idx as u32 + 1);
      book.push(alliance);
    }
  }

  for m in canonical_order(matches) {
    if !m.comp_level.is_playoff() {
      continue;
    }
    for color in Color::BOTH {
      let teams = lineup(m.teams(color));
      if teams.is_empty() {
        continue;
      }
      if teams.len() < MIN_ALLIANCE_SIZE {
        warn!("{} {} lineup {:?} is too small to identify", m.key(), color, teams);
        issues.push(unresolvable(m, color, &teams, format!("fewer than {MIN_ALLIANCE_SIZE} teams")));
        continue;
      }
      match book.find(&teams) {
        Some(_) if book.official => {}
        Some(index) => book.absorb(index, &teams, m, color, &mut issues),
        None if book.official => {
          warn!("{} {} lineup {:?} matches no selected alliance", m.key(), color, teams);
          issues.push(unresolvable(m, color, &teams, "no selected alliance shares two teams".to_string()));
        }
        None => {
          book.push(TournamentAlliance { picks: teams, ..Default::default() });
        }
      }
    }
  }

  debug!("resolved {} alliances ({} issues)", book.len(), issues.len());
  Resolution { book, issues }
}

fn lineup(teams: &[String]) -> Vec<String> {
  let mut seen = HashSet::new();
  teams
    .iter()
    .map(|t| t.trim())
    .filter(|t| !t.is_empty() && seen.insert(*t))
    .map(str::to_string)
    .collect()
}

fn normalize_selection(selection: &TournamentAlliance) -> TournamentAlliance {
  let picks = lineup(&selection.picks);
  let backup = selection.backup.as_ref().and_then(|backup| {
    let out = backup.out.trim();
    let in_team = backup.in_team.trim();
    if out.is_empty() || in_team.is_empty() || picks.iter().any(|p| p == in_team) {
      return None;
    }
    Some(Backup { out: out.to_string(), in_team: in_team.to_string() })
  });
  let name = selection
    .name
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(str::to_string);
  TournamentAlliance { picks, backup, name, number: selection.number }
}

fn unresolvable(m: &Match, color: Color, teams: &[String], reason: String) -> EngineError {
  EngineError::UnresolvableAlliance {
    match_key: m.key(),
    color,
    teams: teams.to_vec(),
    reason,
  }
}
