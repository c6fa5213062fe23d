use crate::config::EngineConfig;
use crate::status::{AllianceStatus, PlayoffProgress, PlayoffStatus, QualProgress, QualStatus};
use crate::types::CompLevel;
use std::fmt::Display;

pub fn ordinal(n: u32) -> String {
  let suffix = if (11..=13).contains(&(n % 100)) {
    "th"
  } else {
    match n % 10 {
      1 => "st",
      2 => "nd",
      3 => "rd",
      _ => "th",
    }
  };
  format!("{n}{suffix}")
}

/// "A", "A and B", "A, B, and C".
pub fn join_clauses(clauses: &[String]) -> String {
  match clauses {
    [] => String::new(),
    [only] => only.clone(),
    [first, second] => format!("{first} and {second}"),
    [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
  }
}

struct Style {
  html: bool,
}

impl Style {
  fn bold(&self, text: impl Display) -> String {
    if self.html {
      format!("<b>{text}</b>")
    } else {
      text.to_string()
    }
  }
}

/// Builds the sentence shown for a team. Only the structured statuses feed
/// it, so the text and the fields cannot disagree.
pub fn render(
  team_key: &str,
  qual: Option<&QualStatus>,
  alliance: Option<&AllianceStatus>,
  playoff: Option<&PlayoffStatus>,
  config: &EngineConfig,
) -> String {
  let style = Style {
    html: config.html_status,
  };
  let mut clauses = Vec::new();
  if let Some(qual) = qual {
    clauses.push(qual_clause(qual, &style));
  }
  if let Some(alliance) = alliance {
    clauses.push(alliance_clause(alliance, playoff, &style));
  }
  if let Some(playoff) = playoff {
    clauses.push(playoff_clause(playoff, &style));
  }
  let body = if clauses.is_empty() {
    "has no status at this event yet".to_string()
  } else {
    join_clauses(&clauses)
  };
  if config.include_team {
    format!("Team {} {}.", config.team_number(team_key), body)
  } else {
    format!("{body}.")
  }
}

fn qual_clause(qual: &QualStatus, style: &Style) -> String {
  let done = qual.status == QualProgress::Complete;
  let (is, has) = if done { ("was", "had") } else { ("is", "has") };

  if let Some(rank) = qual.rank {
    let position = match qual.max_rank {
      Some(max) => format!("Rank {rank}/{max}"),
      None => format!("Rank {rank}"),
    };
    let detail = match (qual.record, qual.qual_average) {
      (Some(record), _) => format!(" with a record of {}", style.bold(record)),
      (None, Some(average)) => format!(" with an average score of {}", style.bold(format!("{average:.2}"))),
      (None, None) => String::new(),
    };
    return format!("{is} {}{detail} in quals", style.bold(position));
  }

  match (qual.status, qual.record, qual.qual_average) {
    (QualProgress::NotStarted, _, _) => "is waiting for qualification matches to begin".to_string(),
    (_, Some(record), _) => format!("{has} a record of {} in quals", style.bold(record)),
    (_, None, Some(average)) => format!("{has} an average score of {} in quals", style.bold(format!("{average:.2}"))),
    (_, None, None) => format!("{has} played {} qualification matches", qual.matches_played),
  }
}

fn alliance_clause(alliance: &AllianceStatus, playoff: Option<&PlayoffStatus>, style: &Style) -> String {
  let finished = playoff
    .map(|p| p.status != PlayoffProgress::Playing)
    .unwrap_or(false);
  let verb = if finished { "was" } else { "is" };
  let of = match &alliance.name {
    Some(name) => style.bold(name),
    None => "an unseeded alliance".to_string(),
  };
  format!("{verb} the {} of {of}", style.bold(&alliance.pick_label))
}

fn playoff_clause(playoff: &PlayoffStatus, style: &Style) -> String {
  let level = style.bold(&playoff.level_name);
  match playoff.status {
    PlayoffProgress::Won if playoff.level == CompLevel::F => format!(
      "{} with a playoff record of {}",
      style.bold("won the event"),
      style.bold(playoff.overall_record)
    ),
    PlayoffProgress::Won => match playoff.rank {
      Some(rank) => format!("advanced from the {level} as {}", style.bold(format!("Rank {rank}"))),
      None => format!(
        "won the {level} with a playoff record of {}",
        style.bold(playoff.overall_record)
      ),
    },
    PlayoffProgress::Eliminated => format!(
      "was {} in the {level} with a playoff record of {}",
      style.bold("eliminated"),
      style.bold(playoff.overall_record)
    ),
    PlayoffProgress::Playing => {
      if let Some(round) = playoff.double_elim_round {
        return format!(
          "is {} in {} of the {level}",
          style.bold(playoff.record),
          style.bold(format!("Round {round}"))
        );
      }
      match (playoff.rank, playoff.playoff_average) {
        (Some(rank), Some(average)) => format!(
          "is {} in the {level} with an average score of {}",
          style.bold(format!("Rank {rank}")),
          style.bold(format!("{average:.2}"))
        ),
        (Some(rank), None) => format!("is {} in the {level}", style.bold(format!("Rank {rank}"))),
        (None, _) => format!("is {} in the {level}", style.bold(playoff.record)),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{Backup, Record};

  fn qual(status: QualProgress) -> QualStatus {
    QualStatus {
      status,
      rank: Some(4),
      max_rank: Some(40),
      record: Some(Record::new(7, 3, 0)),
      qual_average: None,
      matches_played: 10,
      dq: 0,
      official: true,
    }
  }

  fn captain() -> AllianceStatus {
    AllianceStatus {
      pick: 0,
      pick_label: "Captain".into(),
      name: Some("Alliance 2".into()),
      number: Some(2),
      backup: None,
    }
  }

  fn playoff(level: CompLevel, status: PlayoffProgress) -> PlayoffStatus {
    PlayoffStatus {
      level,
      level_name: level.display_name().into(),
      status,
      record: Record::new(1, 2, 0),
      overall_record: Record::new(5, 2, 0),
      rank: None,
      playoff_average: None,
      double_elim_round: None,
    }
  }

  #[test]
  fn test_ordinal_suffixes() {
    let got = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 101, 111, 112]
      .map(ordinal)
      .to_vec();
    assert_eq!(
      got,
      vec!["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "23rd", "101st", "111th", "112th"]
    );
  }

  #[test]
  fn test_join_clauses_grammar() {
    let clauses = ["A", "B", "C", "D"].map(String::from);
    assert_eq!(join_clauses(&clauses[..1]), "A");
    assert_eq!(join_clauses(&clauses[..2]), "A and B");
    assert_eq!(join_clauses(&clauses[..3]), "A, B, and C");
    assert_eq!(join_clauses(&clauses), "A, B, C, and D");
  }

  #[test]
  fn test_full_sentence() {
    let text = render(
      "frc254",
      Some(&qual(QualProgress::Complete)),
      Some(&captain()),
      Some(&playoff(CompLevel::F, PlayoffProgress::Eliminated)),
      &EngineConfig::default(),
    );
    assert_eq!(
      text,
      "Team 254 was Rank 4/40 with a record of 7-3-0 in quals, was the Captain of Alliance 2, \
       and was eliminated in the Finals with a playoff record of 5-2-0."
    );
  }

  #[test]
  fn test_two_clauses_and_html() {
    let config = EngineConfig {
      html_status: true,
      ..EngineConfig::default()
    };
    let backup = AllianceStatus {
      pick: -1,
      pick_label: "Backup".into(),
      name: None,
      number: None,
      backup: Some(Backup {
        out: "frc1".into(),
        in_team: "frc2".into(),
      }),
    };
    let text = render("frc2", Some(&qual(QualProgress::Playing)), Some(&backup), None, &config);
    assert_eq!(
      text,
      "Team 2 is <b>Rank 4/40</b> with a record of <b>7-3-0</b> in quals and is the <b>Backup</b> of an unseeded alliance."
    );
  }

  #[test]
  fn test_without_team_prefix() {
    let config = EngineConfig {
      include_team: false,
      ..EngineConfig::default()
    };
    let text = render("frc1", None, None, Some(&playoff(CompLevel::F, PlayoffProgress::Won)), &config);
    assert_eq!(text, "won the event with a playoff record of 5-2-0.");
    assert_eq!(render("frc9", None, None, None, &EngineConfig::default()), "Team 9 has no status at this event yet.");
  }

  #[test]
  fn test_playing_clauses() {
    let mut de = playoff(CompLevel::Sf, PlayoffProgress::Playing);
    de.level_name = "Double Elimination Bracket".into();
    de.double_elim_round = Some(3);
    assert_eq!(playoff_clause(&de, &Style { html: false }), "is 1-2-0 in Round 3 of the Double Elimination Bracket");

    let mut avg = playoff(CompLevel::Qf, PlayoffProgress::Playing);
    avg.rank = Some(2);
    avg.playoff_average = Some(101.5);
    assert_eq!(
      playoff_clause(&avg, &Style { html: false }),
      "is Rank 2 in the Quarterfinals with an average score of 101.50"
    );
  }
}
