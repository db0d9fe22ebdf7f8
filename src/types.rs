use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sections::GameplaySections;

// Data structures shared by the repository, the watcher and the display

pub const DEFAULT_DDRAGON_VERSION: &str = "15.9.1";

pub const UNKNOWN_DIFFICULTY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionMatchup {
  pub champion_name: String,
  pub difficulty: String,
  pub overview: String,
  pub early_game: String,
  pub how_to_trade: String,
  pub what_to_watch_out_for: String,
  pub tips: String,
  #[serde(default)]
  pub runes: String,
  #[serde(default)]
  pub summoner_spell: String,
}

impl ChampionMatchup {
  /// Build a record from the raw cell values read out of one sheet row.
  /// Returns `None` when the champion name is blank; such rows are never indexed.
  pub fn from_cells(
    champion_name: &str,
    difficulty: &str,
    overview: &str,
    sections: GameplaySections,
    runes: &str,
    summoner_spell: &str,
  ) -> Option<Self> {
    let champion_name = champion_name.trim();
    if champion_name.is_empty() {
      return None;
    }
    let difficulty = difficulty.trim();
    Some(Self {
      champion_name: champion_name.to_string(),
      difficulty: if difficulty.is_empty() {
        UNKNOWN_DIFFICULTY.to_string()
      } else {
        difficulty.to_string()
      },
      overview: overview.trim().to_string(),
      early_game: sections.early_game,
      how_to_trade: sections.how_to_trade,
      what_to_watch_out_for: sections.what_to_watch_out_for,
      tips: sections.tips,
      runes: runes.trim().to_string(),
      summoner_spell: summoner_spell.trim().to_string(),
    })
  }

  /// Record shown when a champion is inspected manually but the sheet has no row for it.
  pub fn placeholder(champion_name: &str) -> Self {
    Self {
      champion_name: champion_name.trim().to_string(),
      difficulty: UNKNOWN_DIFFICULTY.to_string(),
      overview: "No matchup information available.".to_string(),
      early_game: String::new(),
      how_to_trade: String::new(),
      what_to_watch_out_for: String::new(),
      tips: String::new(),
      runes: String::new(),
      summoner_spell: String::new(),
    }
  }

  pub fn image_url(&self, ddragon_version: &str) -> String {
    format!(
      "https://ddragon.leagueoflegends.com/cdn/{}/img/champion/{}.png",
      ddragon_version,
      ddragon_key(&self.champion_name)
    )
  }
}

/// Data Dragon asset key for a display name ("Kai'Sa" -> "KaiSa", "Dr. Mundo" -> "DrMundo").
pub fn ddragon_key(champion_name: &str) -> String {
  let trimmed = champion_name.trim();
  match trimmed {
    "Wukong" => return "MonkeyKing".to_string(),
    "Renata Glasc" => return "Renata".to_string(),
    "Nunu & Willump" => return "Nunu".to_string(),
    _ => {}
  }
  trimmed
    .chars()
    .filter(|c| !matches!(c, ' ' | '\'' | '.'))
    .collect()
}

/// Gameflow phase as reported by the League client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientPhase {
  None,
  Lobby,
  Matchmaking,
  ReadyCheck,
  ChampSelect,
  InProgress,
  Reconnect,
  WaitingForStats,
  PreEndOfGame,
  EndOfGame,
  Other(String),
}

impl ClientPhase {
  pub fn parse(raw: &str) -> Self {
    match raw.trim().trim_matches('"') {
      "None" | "" => Self::None,
      "Lobby" => Self::Lobby,
      "Matchmaking" => Self::Matchmaking,
      "ReadyCheck" => Self::ReadyCheck,
      "ChampSelect" => Self::ChampSelect,
      "InProgress" => Self::InProgress,
      "Reconnect" => Self::Reconnect,
      "WaitingForStats" => Self::WaitingForStats,
      "PreEndOfGame" => Self::PreEndOfGame,
      "EndOfGame" => Self::EndOfGame,
      other => Self::Other(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::None => "None",
      Self::Lobby => "Lobby",
      Self::Matchmaking => "Matchmaking",
      Self::ReadyCheck => "ReadyCheck",
      Self::ChampSelect => "ChampSelect",
      Self::InProgress => "InProgress",
      Self::Reconnect => "Reconnect",
      Self::WaitingForStats => "WaitingForStats",
      Self::PreEndOfGame => "PreEndOfGame",
      Self::EndOfGame => "EndOfGame",
      Self::Other(s) => s.as_str(),
    }
  }

  pub fn is_champ_select(&self) -> bool {
    matches!(self, Self::ChampSelect)
  }
}

impl fmt::Display for ClientPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Everything the display layer knows how to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderableMatchup {
  PlainMessage { title: String, body: String },
  Structured(ChampionMatchup),
}

impl RenderableMatchup {
  pub fn message(title: impl Into<String>, body: impl Into<String>) -> Self {
    Self::PlainMessage {
      title: title.into(),
      body: body.into(),
    }
  }

  pub fn title(&self) -> &str {
    match self {
      Self::PlainMessage { title, .. } => title,
      Self::Structured(m) => &m.champion_name,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ddragon_key_strips_punctuation_and_maps_special_cases() {
    assert_eq!(ddragon_key("Kai'Sa"), "KaiSa");
    assert_eq!(ddragon_key("Dr. Mundo"), "DrMundo");
    assert_eq!(ddragon_key("Aurelion Sol"), "AurelionSol");
    assert_eq!(ddragon_key(" Wukong "), "MonkeyKing");
    assert_eq!(ddragon_key("Nunu & Willump"), "Nunu");
    assert_eq!(ddragon_key("Renata Glasc"), "Renata");
  }

  #[test]
  fn image_url_uses_version() {
    let m = ChampionMatchup::placeholder("Darius");
    assert_eq!(
      m.image_url("14.1.1"),
      "https://ddragon.leagueoflegends.com/cdn/14.1.1/img/champion/Darius.png"
    );
  }

  #[test]
  fn blank_name_is_rejected() {
    assert!(ChampionMatchup::from_cells("   ", "Hard", "", GameplaySections::default(), "", "").is_none());
  }

  #[test]
  fn empty_difficulty_becomes_unknown() {
    let m = ChampionMatchup::from_cells(" Garen ", "", "tank", GameplaySections::default(), "", "")
      .expect("valid row");
    assert_eq!(m.champion_name, "Garen");
    assert_eq!(m.difficulty, UNKNOWN_DIFFICULTY);
  }

  #[test]
  fn phase_parsing_handles_quotes_and_unknowns() {
    assert_eq!(ClientPhase::parse("\"ChampSelect\""), ClientPhase::ChampSelect);
    assert_eq!(ClientPhase::parse(""), ClientPhase::None);
    assert_eq!(
      ClientPhase::parse("TerminatedInError"),
      ClientPhase::Other("TerminatedInError".to_string())
    );
    assert!(ClientPhase::parse("ChampSelect").is_champ_select());
  }
}
