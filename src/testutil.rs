use crate::types::{AllianceInMatch, CompLevel, Match, MatchAlliances, ScoreBreakdown, WinningAlliance};
use serde_json::Value;

pub const TEST_EVENT: &str = "2019test";

pub fn keys(teams: &[&str]) -> Vec<String> {
    teams.iter().map(|t| t.to_string()).collect()
}

pub fn scheduled(level: CompLevel, set: u32, number: u32, red: &[&str], blue: &[&str]) -> Match {
    Match {
        event_key: TEST_EVENT.to_string(),
        comp_level: level,
        set_number: set,
        match_number: number,
        alliances: MatchAlliances {
            red: AllianceInMatch { teams: keys(red), ..Default::default() },
            blue: AllianceInMatch { teams: keys(blue), ..Default::default() },
        },
        winning_alliance: None,
        score_breakdown: None,
    }
}

/// Played match; the winner follows the scores.
pub fn played(
    level: CompLevel,
    set: u32,
    number: u32,
    red: &[&str],
    blue: &[&str],
    red_score: i64,
    blue_score: i64,
) -> Match {
    let mut m = scheduled(level, set, number, red, blue);
    m.alliances.red.score = Some(red_score);
    m.alliances.blue.score = Some(blue_score);
    m.winning_alliance = Some(if red_score > blue_score {
        WinningAlliance::Red
    } else if blue_score > red_score {
        WinningAlliance::Blue
    } else {
        WinningAlliance::Tie
    });
    m
}

pub fn with_breakdown(mut m: Match, red: Value, blue: Value) -> Match {
    let as_map = |value: Value| match value {
        Value::Object(map) => map,
        _ => Default::default(),
    };
    m.score_breakdown = Some(ScoreBreakdown { red: as_map(red), blue: as_map(blue) });
    m
}
