use crate::alliances::AllianceBook;
use crate::config::EngineConfig;
use crate::format::PlayoffFormat;
use crate::standings::{self, RowMetric, StandingsBuild};
use crate::status_text;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Losses that knock an alliance out of the double-elimination bracket.
const DOUBLE_ELIM_LIVES: u32 = 2;

// ── Status types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualProgress {
    NotStarted,
    Playing,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualStatus {
    pub status: QualProgress,
    pub rank: Option<u32>,
    pub max_rank: Option<u32>,
    pub record: Option<Record>,
    pub qual_average: Option<f64>,
    pub matches_played: u32,
    pub dq: u32,
    /// Taken from the official rankings rather than counted from matches.
    pub official: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceStatus {
    /// 0 captain, -1 backup that came in, else the 1-based pick.
    pub pick: i32,
    pub pick_label: String,
    pub name: Option<String>,
    pub number: Option<u32>,
    pub backup: Option<Backup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayoffProgress {
    Won,
    Eliminated,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoffStatus {
    pub level: CompLevel,
    pub level_name: String,
    pub status: PlayoffProgress,
    /// Record at `level` only.
    pub record: Record,
    pub overall_record: Record,
    /// Table position at standings levels.
    pub rank: Option<u32>,
    pub playoff_average: Option<f64>,
    pub double_elim_round: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEventStatus {
    pub qual: Option<QualStatus>,
    pub alliance: Option<AllianceStatus>,
    pub playoff: Option<PlayoffStatus>,
    pub display_string: String,
}

// ── Context ────────────────────────────────────────────────────────────

/// Everything a status needs about one event. Standings are computed once
/// here and shared by every team lookup.
#[derive(Debug, Clone)]
pub struct StatusContext<'a> {
    pub year: i32,
    pub format: PlayoffFormat,
    pub qual_matches: &'a [Match],
    pub playoff_matches: &'a [Match],
    pub rankings: Option<&'a [OfficialRanking]>,
    pub alliances: &'a AllianceBook,
    pub standings: StandingsBuild,
}

impl<'a> StatusContext<'a> {
    pub fn new(
        year: i32,
        format: PlayoffFormat,
        qual_matches: &'a [Match],
        playoff_matches: &'a [Match],
        rankings: Option<&'a [OfficialRanking]>,
        alliances: &'a AllianceBook,
    ) -> Self {
        let standings = standings::build(playoff_matches, alliances, format, year);
        Self {
            year,
            format,
            qual_matches,
            playoff_matches,
            rankings,
            alliances,
            standings,
        }
    }
}

pub fn status_for(team_key: &str, ctx: &StatusContext<'_>, config: &EngineConfig) -> TeamEventStatus {
    let qual = qual_status(team_key, ctx);
    let alliance = alliance_status(team_key, ctx);
    let playoff = playoff_status(team_key, ctx);
    let display_string = status_text::render(
        team_key,
        qual.as_ref(),
        alliance.as_ref(),
        playoff.as_ref(),
        config,
    );
    debug!("{team_key}: {display_string}");
    TeamEventStatus {
        qual,
        alliance,
        playoff,
        display_string,
    }
}

// ── Qualification ──────────────────────────────────────────────────────

fn qual_status(team_key: &str, ctx: &StatusContext<'_>) -> Option<QualStatus> {
    let quals = canonical_order(ctx.qual_matches)
        .into_iter()
        .filter(|m| m.comp_level == CompLevel::Qm)
        .collect::<Vec<_>>();
    let mine = quals
        .iter()
        .filter_map(|m| {
            let color = m.color_of(team_key)?;
            (!m.is_surrogate(color, team_key)).then_some((*m, color))
        })
        .collect::<Vec<_>>();
    let played = mine.iter().filter(|(m, _)| m.has_been_played()).count();
    let progress = if played == 0 {
        QualProgress::NotStarted
    } else if played < mine.len() {
        QualProgress::Playing
    } else {
        QualProgress::Complete
    };

    if let Some(rankings) = ctx.rankings {
        if let Some(ranking) = rankings.iter().find(|r| r.team_key == team_key) {
            let status = if mine.is_empty() && ranking.matches_played > 0 {
                QualProgress::Complete
            } else {
                progress
            };
            return Some(QualStatus {
                status,
                rank: Some(ranking.rank),
                max_rank: Some(rankings.len() as u32),
                record: ranking.record,
                qual_average: ranking.qual_average,
                matches_played: ranking.matches_played,
                dq: ranking.dq,
                official: true,
            });
        }
    }

    if mine.is_empty() {
        if !quals.is_empty() {
            return None;
        }
        return Some(QualStatus {
            status: QualProgress::NotStarted,
            rank: None,
            max_rank: None,
            record: None,
            qual_average: None,
            matches_played: 0,
            dq: 0,
            official: false,
        });
    }

    let mut record = Record::default();
    let mut scores = Vec::new();
    let mut dq = 0;
    for (m, color) in &mine {
        match m.outcome() {
            Outcome::Unplayed => continue,
            Outcome::Winner(winner) if winner == *color => record.wins += 1,
            Outcome::Winner(_) => record.losses += 1,
            Outcome::Tie => record.ties += 1,
        }
        scores.extend(m.score(*color));
        if m.is_disqualified(*color, team_key) {
            dq += 1;
        }
    }
    let average_season = ctx.year == AVG_SCORE_SEASON;
    Some(QualStatus {
        status: progress,
        rank: None,
        max_rank: None,
        record: (!average_season).then_some(record),
        qual_average: if average_season { mean(&scores) } else { None },
        matches_played: played as u32,
        dq,
        official: false,
    })
}

// ── Alliance ───────────────────────────────────────────────────────────

fn alliance_status(team_key: &str, ctx: &StatusContext<'_>) -> Option<AllianceStatus> {
    let (_, alliance) = ctx.alliances.alliance_of(team_key)?;
    let is_backup = alliance
        .backup
        .as_ref()
        .map(|backup| backup.in_team == team_key)
        .unwrap_or(false);
    let pick = if is_backup {
        -1
    } else {
        alliance.picks.iter().position(|t| t == team_key)? as i32
    };
    Some(AllianceStatus {
        pick,
        pick_label: pick_label(pick),
        name: alliance.display_name(),
        number: alliance.number,
        backup: alliance.backup.clone(),
    })
}

pub fn pick_label(pick: i32) -> String {
    match pick {
        0 => "Captain".to_string(),
        p if p < 0 => "Backup".to_string(),
        p => format!("{} Pick", status_text::ordinal(p as u32)),
    }
}

// ── Playoffs ───────────────────────────────────────────────────────────

#[derive(Default)]
struct LevelTally<'m> {
    record: Record,
    last: Option<&'m Match>,
}

fn playoff_status(team_key: &str, ctx: &StatusContext<'_>) -> Option<PlayoffStatus> {
    let (index, _) = ctx.alliances.alliance_of(team_key)?;
    let record_ties = ctx.year != AVG_SCORE_SEASON;

    let mut levels: BTreeMap<CompLevel, LevelTally> = BTreeMap::new();
    let mut overall = Record::default();
    for m in canonical_order(ctx.playoff_matches) {
        if !m.comp_level.is_playoff() {
            continue;
        }
        let Some(color) = Color::BOTH
            .into_iter()
            .find(|color| ctx.alliances.find(m.teams(*color)) == Some(index))
        else {
            continue;
        };
        let tally = levels.entry(m.comp_level).or_default();
        tally.last = Some(m);
        match m.outcome() {
            Outcome::Unplayed => continue,
            Outcome::Winner(winner) if winner == color => {
                tally.record.wins += 1;
                overall.wins += 1;
            }
            Outcome::Winner(_) => {
                tally.record.losses += 1;
                overall.losses += 1;
            }
            Outcome::Tie if record_ties => {
                tally.record.ties += 1;
                overall.ties += 1;
            }
            Outcome::Tie => {}
        }
    }

    let level = CompLevel::PLAYOFFS_DESC
        .into_iter()
        .find(|level| levels.contains_key(level))?;
    let tally = levels.get(&level)?;
    let format = ctx.format;
    let mut rank = None;
    let mut playoff_average = None;
    let mut double_elim_round = None;

    let status = if format.is_standings_level(level) {
        let table = ctx.standings.table(level);
        rank = table.and_then(|t| t.rank_of(index)).map(|r| r as u32);
        if let Some(RowMetric::Average { average }) = table.and_then(|t| t.row_of(index)).map(|row| &row.metric) {
            playoff_average = Some(*average);
        }
        let advancing = format.advancing_count(level).unwrap_or(0) as u32;
        match table {
            Some(t) if t.round_complete => match rank {
                Some(r) if r <= advancing => PlayoffProgress::Won,
                _ => PlayoffProgress::Eliminated,
            },
            _ => PlayoffProgress::Playing,
        }
    } else if ctx.year == AVG_SCORE_SEASON && level == CompLevel::F {
        if tally.record.wins >= format.set_win_threshold(level) {
            PlayoffProgress::Won
        } else if tally.record.played() > 0 {
            PlayoffProgress::Eliminated
        } else {
            PlayoffProgress::Playing
        }
    } else if format == PlayoffFormat::DoubleElim8Team && level == CompLevel::Sf {
        double_elim_round = tally
            .last
            .and_then(|m| format.playoff_match_number(m.comp_level, m.set_number, m.match_number))
            .and_then(|n| format.double_elim_round(n));
        if tally.record.losses >= DOUBLE_ELIM_LIVES {
            PlayoffProgress::Eliminated
        } else {
            PlayoffProgress::Playing
        }
    } else {
        let threshold = format.set_win_threshold(level);
        if tally.record.wins >= threshold {
            PlayoffProgress::Won
        } else if tally.record.losses >= threshold {
            PlayoffProgress::Eliminated
        } else {
            PlayoffProgress::Playing
        }
    };

    Some(PlayoffStatus {
        level,
        level_name: level_name(format, level).to_string(),
        status,
        record: tally.record,
        overall_record: overall,
        rank,
        playoff_average,
        double_elim_round,
    })
}

fn level_name(format: PlayoffFormat, level: CompLevel) -> &'static str {
    match (format, level) {
        (PlayoffFormat::RoundRobin6Team, CompLevel::Sf) => "Round Robin",
        (PlayoffFormat::DoubleElim8Team, CompLevel::Sf) => "Double Elimination Bracket",
        _ => level.display_name(),
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alliances::resolve;
    use crate::testutil::{played, scheduled};
    use proptest::prelude::*;

    const ONE: [&str; 3] = ["frc1", "frc2", "frc3"];
    const TWO: [&str; 3] = ["frc4", "frc5", "frc6"];
    const THREE: [&str; 3] = ["frc7", "frc8", "frc9"];
    const FOUR: [&str; 3] = ["frc10", "frc11", "frc12"];

    fn status(
        team: &str,
        year: i32,
        format: PlayoffFormat,
        quals: &[Match],
        playoffs: &[Match],
        rankings: Option<&[OfficialRanking]>,
    ) -> TeamEventStatus {
        let book = resolve(playoffs, None).book;
        let ctx = StatusContext::new(year, format, quals, playoffs, rankings, &book);
        status_for(team, &ctx, &EngineConfig::default())
    }

    fn finals_loss() -> Vec<Match> {
        vec![
            played(CompLevel::Sf, 1, 1, &ONE, &THREE, 80, 40),
            played(CompLevel::Sf, 1, 2, &ONE, &THREE, 75, 50),
            played(CompLevel::Sf, 2, 1, &TWO, &FOUR, 60, 55),
            played(CompLevel::Sf, 2, 2, &TWO, &FOUR, 70, 30),
            played(CompLevel::F, 1, 1, &ONE, &TWO, 90, 60),
            played(CompLevel::F, 1, 2, &ONE, &TWO, 50, 60),
            played(CompLevel::F, 1, 3, &ONE, &TWO, 40, 80),
        ]
    }

    #[test]
    fn test_captain_eliminated_in_finals() {
        let result = status("frc1", 2019, PlayoffFormat::Bracket8Team, &[], &finals_loss(), None);
        let playoff = result.playoff.unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Eliminated);
        assert_eq!(playoff.level, CompLevel::F);
        assert_eq!(playoff.record, Record::new(1, 2, 0));
        assert_eq!(playoff.overall_record, Record::new(3, 2, 0));
        let alliance = result.alliance.unwrap();
        assert_eq!((alliance.pick, alliance.pick_label.as_str()), (0, "Captain"));
    }

    #[test]
    fn test_finals_winner() {
        let result = status("frc5", 2019, PlayoffFormat::Bracket8Team, &[], &finals_loss(), None);
        let playoff = result.playoff.unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Won);
        assert_eq!(playoff.record, Record::new(2, 1, 0));
        assert_eq!(result.alliance.unwrap().pick_label, "1st Pick");
    }

    #[test]
    fn test_semifinal_loser_stops_at_semifinals() {
        let result = status("frc9", 2019, PlayoffFormat::Bracket8Team, &[], &finals_loss(), None);
        let playoff = result.playoff.unwrap();
        assert_eq!(playoff.level, CompLevel::Sf);
        assert_eq!(playoff.status, PlayoffProgress::Eliminated);
        assert_eq!(result.alliance.unwrap().pick, 2);
    }

    #[test]
    fn test_backup_inherits_alliance_status() {
        let mut matches = finals_loss();
        matches.push(played(CompLevel::F, 1, 4, &["frc1", "frc2", "frc13"], &TWO, 0, 1));
        let result = status("frc13", 2019, PlayoffFormat::Bracket8Team, &[], &matches, None);
        let alliance = result.alliance.unwrap();
        assert_eq!(alliance.pick, -1);
        assert_eq!(alliance.pick_label, "Backup");
        assert_eq!(alliance.backup.map(|b| b.out), Some("frc3".to_string()));
        assert_eq!(result.playoff.unwrap().record, Record::new(1, 3, 0));
    }

    #[test]
    fn test_playing_with_unplayed_match() {
        let matches = vec![
            played(CompLevel::Qf, 1, 1, &ONE, &TWO, 10, 20),
            scheduled(CompLevel::Qf, 1, 2, &ONE, &TWO),
        ];
        let playoff = status("frc2", 2019, PlayoffFormat::Bracket8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Playing);
        assert_eq!(playoff.record, Record::new(0, 1, 0));
    }

    #[test]
    fn test_official_rankings_used_verbatim() {
        let rankings = vec![
            OfficialRanking {
                team_key: "frc1".into(),
                rank: 3,
                record: Some(Record::new(8, 2, 0)),
                qual_average: None,
                matches_played: 10,
                dq: 0,
            },
            OfficialRanking {
                team_key: "frc4".into(),
                rank: 1,
                record: Some(Record::new(9, 1, 0)),
                qual_average: None,
                matches_played: 10,
                dq: 0,
            },
        ];
        let qual = status("frc1", 2019, PlayoffFormat::Bracket8Team, &[], &[], Some(rankings.as_slice()))
            .qual
            .unwrap();
        assert_eq!(qual.rank, Some(3));
        assert_eq!(qual.max_rank, Some(2));
        assert_eq!(qual.record, Some(Record::new(8, 2, 0)));
        assert_eq!(qual.status, QualProgress::Complete);
        assert!(qual.official);
    }

    #[test]
    fn test_qual_record_skips_surrogate_matches() {
        let mut surrogate = played(CompLevel::Qm, 1, 2, &["frc1", "frc4", "frc5"], &TWO, 0, 50);
        surrogate.alliances.red.surrogates = vec!["frc1".into()];
        let quals = vec![
            played(CompLevel::Qm, 1, 1, &ONE, &TWO, 50, 40),
            surrogate,
            played(CompLevel::Qm, 1, 3, &THREE, &["frc1", "frc10", "frc11"], 30, 30),
            scheduled(CompLevel::Qm, 1, 4, &ONE, &FOUR),
        ];
        let qual = status("frc1", 2019, PlayoffFormat::Bracket8Team, &quals, &[], None)
            .qual
            .unwrap();
        assert_eq!(qual.status, QualProgress::Playing);
        assert_eq!(qual.record, Some(Record::new(1, 0, 1)));
        assert_eq!(qual.matches_played, 2);
        assert!(!qual.official);
    }

    #[test]
    fn test_qual_not_started_and_absent() {
        let none = status("frc1", 2019, PlayoffFormat::Bracket8Team, &[], &[], None);
        assert_eq!(none.qual.unwrap().status, QualProgress::NotStarted);
        assert!(none.alliance.is_none());
        assert!(none.playoff.is_none());

        let quals = vec![played(CompLevel::Qm, 1, 1, &ONE, &TWO, 50, 40)];
        assert!(status("frc99", 2019, PlayoffFormat::Bracket8Team, &quals, &[], None)
            .qual
            .is_none());
    }

    #[test]
    fn test_average_season_quals() {
        let quals = vec![
            played(CompLevel::Qm, 1, 1, &ONE, &TWO, 50, 40),
            played(CompLevel::Qm, 1, 2, &TWO, &ONE, 10, 70),
        ];
        let qual = status("frc1", 2015, PlayoffFormat::AvgScore8Team, &quals, &[], None)
            .qual
            .unwrap();
        assert_eq!(qual.record, None);
        assert_eq!(qual.qual_average, Some(60.0));
    }

    #[test]
    fn test_average_season_finals_single_loss() {
        let matches = vec![played(CompLevel::F, 1, 1, &ONE, &TWO, 100, 120)];
        let playoff = status("frc1", 2015, PlayoffFormat::AvgScore8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Eliminated);
    }

    #[test]
    fn test_average_season_playoff_ties_not_recorded() {
        let matches = vec![
            played(CompLevel::F, 1, 1, &ONE, &TWO, 80, 80),
            played(CompLevel::F, 1, 2, &ONE, &TWO, 90, 60),
        ];
        let playoff = status("frc1", 2015, PlayoffFormat::AvgScore8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.record, Record::new(1, 0, 0));
        assert_eq!(playoff.overall_record.ties, 0);

        let playoff = status("frc1", 2019, PlayoffFormat::Bracket8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.record, Record::new(1, 0, 1));
        assert_eq!(playoff.overall_record.ties, 1);
    }

    #[test]
    fn test_average_score_quarterfinal_advancement() {
        let alliances = [
            ["frc1", "frc2", "frc3"],
            ["frc4", "frc5", "frc6"],
            ["frc7", "frc8", "frc9"],
            ["frc10", "frc11", "frc12"],
            ["frc13", "frc14", "frc15"],
            ["frc16", "frc17", "frc18"],
        ];
        let matches = vec![
            played(CompLevel::Qf, 1, 1, &alliances[0], &alliances[1], 100, 90),
            played(CompLevel::Qf, 1, 2, &alliances[2], &alliances[3], 80, 70),
            played(CompLevel::Qf, 1, 3, &alliances[4], &alliances[5], 60, 50),
        ];
        let leader = status("frc1", 2015, PlayoffFormat::AvgScore8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(leader.status, PlayoffProgress::Won);
        assert_eq!(leader.rank, Some(1));
        assert_eq!(leader.playoff_average, Some(100.0));
        let fifth = status("frc13", 2015, PlayoffFormat::AvgScore8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(fifth.status, PlayoffProgress::Eliminated);
        assert_eq!(fifth.rank, Some(5));
    }

    #[test]
    fn test_round_robin_in_progress() {
        let matches = vec![
            played(CompLevel::Sf, 1, 1, &ONE, &TWO, 100, 90),
            scheduled(CompLevel::Sf, 1, 2, &TWO, &THREE),
        ];
        let playoff = status("frc1", 2017, PlayoffFormat::RoundRobin6Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Playing);
        assert_eq!(playoff.level_name, "Round Robin");
        assert_eq!(playoff.rank, Some(1));
    }

    #[test]
    fn test_double_elim_two_losses() {
        // Round 1 set 2 loss, then the round 2 lower-bracket loss in set 5.
        let matches = vec![
            played(CompLevel::Sf, 2, 1, &ONE, &TWO, 10, 20),
            played(CompLevel::Sf, 5, 1, &ONE, &THREE, 10, 20),
        ];
        let playoff = status("frc1", 2023, PlayoffFormat::DoubleElim8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(playoff.status, PlayoffProgress::Eliminated);
        assert_eq!(playoff.double_elim_round, Some(2));

        let alive = status("frc7", 2023, PlayoffFormat::DoubleElim8Team, &[], &matches, None)
            .playoff
            .unwrap();
        assert_eq!(alive.status, PlayoffProgress::Playing);
        assert_eq!(alive.level_name, "Double Elimination Bracket");
    }

    proptest! {
        #[test]
        fn prop_status_ignores_match_order(shuffled in Just(finals_loss()).prop_shuffle()) {
            for team in ["frc1", "frc5", "frc9", "frc12"] {
                prop_assert_eq!(
                    status(team, 2019, PlayoffFormat::Bracket8Team, &[], &shuffled, None),
                    status(team, 2019, PlayoffFormat::Bracket8Team, &[], &finals_loss(), None)
                );
            }
        }
    }
}
