// Splits the free-text gameplay cell into its labeled sections

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameplaySections {
  pub early_game: String,
  pub how_to_trade: String,
  pub what_to_watch_out_for: String,
  pub tips: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
  EarlyGame,
  HowToTrade,
  WatchOutFor,
  Tips,
}

// Group order matters: within one alternation the longer synonym must come first.
const SECTION_GROUPS: [(Section, &str); 4] = [
  (Section::EarlyGame, r"EARLY\s*GAME|EARLY"),
  (Section::HowToTrade, r"HOW\s*TO\s*TRADE|TRADING"),
  (Section::WatchOutFor, r"WHAT\s*TO\s*WATCH\s*OUT\s*FOR|WATCH\s*OUT"),
  (Section::Tips, r"TIPS"),
];

static HEADER_PATTERN: Lazy<Regex> = Lazy::new(|| {
  let alternation = SECTION_GROUPS
    .iter()
    .enumerate()
    .map(|(i, (_, synonyms))| format!("(?P<g{}>{})", i, synonyms))
    .collect::<Vec<_>>()
    .join("|");
  Regex::new(&format!("(?i){}", alternation)).expect("section header pattern is valid")
});

struct Header {
  section: Section,
  start: usize,
  end: usize,
}

fn find_headers(text: &str) -> Vec<Header> {
  let mut headers: Vec<Header> = Vec::new();
  // captures_iter is leftmost-first and non-overlapping, so the earlier-starting
  // header always wins an overlap regardless of group order.
  for caps in HEADER_PATTERN.captures_iter(text) {
    let Some((section, m)) = SECTION_GROUPS
      .iter()
      .enumerate()
      .find_map(|(i, (section, _))| caps.name(&format!("g{}", i)).map(|m| (*section, m)))
    else {
      continue;
    };
    // Repeated headers stay inside the first section of their group.
    if headers.iter().any(|h| h.section == section) {
      continue;
    }
    headers.push(Header {
      section,
      start: m.start(),
      end: m.end(),
    });
  }
  headers
}

fn clean(content: &str) -> String {
  let content = content.trim();
  content
    .strip_prefix(':')
    .map(str::trim)
    .unwrap_or(content)
    .to_string()
}

/// Parse the gameplay text into four sections. Text without any recognised header
/// goes entirely into `early_game`.
pub fn parse(raw_text: &str) -> GameplaySections {
  let mut sections = GameplaySections::default();
  if raw_text.trim().is_empty() {
    return sections;
  }

  let headers = find_headers(raw_text);
  if headers.is_empty() {
    sections.early_game = raw_text.trim().to_string();
    return sections;
  }

  for (i, header) in headers.iter().enumerate() {
    let end = headers
      .get(i + 1)
      .map(|next| next.start)
      .unwrap_or(raw_text.len());
    let content = clean(&raw_text[header.end..end]);
    let slot = match header.section {
      Section::EarlyGame => &mut sections.early_game,
      Section::HowToTrade => &mut sections.how_to_trade,
      Section::WatchOutFor => &mut sections.what_to_watch_out_for,
      Section::Tips => &mut sections.tips,
    };
    *slot = content;
  }

  sections
}
