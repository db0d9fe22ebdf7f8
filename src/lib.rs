// Matchup Helper: champion matchup notes from a Google Sheet, shown during League champ select

pub mod config;
pub mod display;
pub mod error;
pub mod lcu;
pub mod logging;
pub mod sections;
pub mod sheets;
pub mod types;
pub mod watcher;
