use crate::types::{RenderableMatchup, UNKNOWN_DIFFICULTY};

mod console;
mod portraits;

pub use console::{ConsoleView, ViewHandle};
pub use portraits::PortraitCache;

// Presentation: turns renderable matchups into cards and hands them to a view

pub const NO_DETAILS_NOTE: &str = "No detailed information available for this matchup.";

/// Sink for everything the poller wants the user to see.
pub trait MatchupView: Send + Sync {
    /// Window-title-like status line, e.g. `Matchup Helper - State: Lobby`.
    fn set_status(&self, status: &str);
    fn clear(&self);
    /// Replace the visible cards with `items`.
    fn show(&self, items: &[RenderableMatchup]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTab {
    pub label: &'static str,
    pub heading: &'static str,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchupCard {
    pub title: String,
    pub difficulty: String,
    pub overview: String,
    pub image_url: Option<String>,
    pub tabs: Vec<CardTab>,
    pub note: Option<&'static str>,
}

fn tab(label: &'static str, heading: &'static str, body: &str) -> Option<CardTab> {
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(CardTab {
            label,
            heading,
            body: body.to_string(),
        })
    }
}

impl MatchupCard {
    pub fn from_renderable(item: &RenderableMatchup, ddragon_version: &str) -> Self {
        match item {
            RenderableMatchup::PlainMessage { title, body } => Self {
                title: title.clone(),
                difficulty: UNKNOWN_DIFFICULTY.to_string(),
                overview: body.clone(),
                image_url: None,
                tabs: Vec::new(),
                note: None,
            },
            RenderableMatchup::Structured(m) => {
                let mut extras = Vec::new();
                if !m.tips.trim().is_empty() {
                    extras.push(m.tips.trim().to_string());
                }
                if !m.runes.trim().is_empty() {
                    extras.push(format!("Runes: {}", m.runes.trim()));
                }
                if !m.summoner_spell.trim().is_empty() {
                    extras.push(format!("Summoner Spell: {}", m.summoner_spell.trim()));
                }

                let tabs: Vec<CardTab> = [
                    tab("Gameplan", "Early Game Strategy", &m.early_game),
                    tab("Trading", "How to Trade", &m.how_to_trade),
                    tab("Watchouts", "What to Watch Out For", &m.what_to_watch_out_for),
                    tab("Tips & Runes", "Tips & Runes", &extras.join("\n")),
                ]
                .into_iter()
                .flatten()
                .collect();

                let note = if tabs.is_empty() {
                    Some(NO_DETAILS_NOTE)
                } else {
                    None
                };
                Self {
                    title: m.champion_name.clone(),
                    difficulty: m.difficulty.clone(),
                    overview: m.overview.clone(),
                    image_url: Some(m.image_url(ddragon_version)),
                    tabs,
                    note,
                }
            }
        }
    }

    pub fn is_message(&self) -> bool {
        self.image_url.is_none()
    }

    /// Plain-text rendering used by the console view and `show`.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.is_message() {
            out.push_str(&format!("== {} ==\n", self.title));
            if !self.overview.is_empty() {
                out.push_str(&self.overview);
                out.push('\n');
            }
            return out;
        }

        out.push_str(&format!("== {} ({}) ==\n", self.title, self.difficulty));
        if !self.overview.trim().is_empty() {
            out.push_str(self.overview.trim());
            out.push('\n');
        }
        for tab in &self.tabs {
            out.push_str(&format!("\n[{}] {}\n{}\n", tab.label, tab.heading, tab.body));
        }
        if let Some(note) = self.note {
            out.push_str(&format!("\n{}\n", note));
        }
        out
    }
}
