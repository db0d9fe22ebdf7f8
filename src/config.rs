use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::DEFAULT_DDRAGON_VERSION;

// Configuration management: config.json in the app data dir, then env, then CLI flags

pub const APP_DIR_NAME: &str = "matchup-helper";

pub const DEFAULT_SHEET_ID: &str = "1wcrN6SRX1EsEce4s2HL8GBIa1CjPVG5L32mW9ml7K3s";
pub const DEFAULT_SHEET_RANGE: &str = "Matchups!A1:Z100";

pub const DEFAULT_BAN_SUGGESTIONS: [&str; 9] = [
    "Rumble",
    "Ambessa",
    "Vayne",
    "Mordekaiser",
    "Olaf",
    "Illaoi",
    "Gnar",
    "Jayce",
    "K'Sante",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sheet_id: String,
    pub sheet_range: String,
    /// API key for public sheets; used when no OAuth token is available.
    pub api_key: Option<String>,
    /// Token file written by the external OAuth flow. Relative paths resolve against the config dir.
    pub token_file: PathBuf,
    pub league_path: Option<PathBuf>,
    pub check_interval_ms: u64,
    pub roster_interval_ms: u64,
    pub min_request_interval_ms: u64,
    pub max_retries: u32,
    pub ddragon_version: String,
    pub runes_column: Option<usize>,
    pub summoner_spell_column: Option<usize>,
    pub ban_suggestions: Vec<String>,
    pub download_portraits: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_id: DEFAULT_SHEET_ID.to_string(),
            sheet_range: DEFAULT_SHEET_RANGE.to_string(),
            api_key: None,
            token_file: PathBuf::from("token.json"),
            league_path: None,
            check_interval_ms: 2000,
            roster_interval_ms: 5000,
            min_request_interval_ms: 1000,
            max_retries: 3,
            ddragon_version: DEFAULT_DDRAGON_VERSION.to_string(),
            runes_column: None,
            summoner_spell_column: None,
            ban_suggestions: DEFAULT_BAN_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            download_portraits: false,
        }
    }
}

impl AppConfig {
    /// Load `config.json` from `config_dir`. A missing file yields the defaults.
    pub fn load_from(config_dir: &Path) -> Result<Self, ConfigError> {
        let file = config_dir.join("config.json");
        if !file.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&file)?;
        let config = serde_json::from_str::<Self>(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir)?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join("config.json"), data)?;
        Ok(())
    }

    /// Apply `SHEET_ID`, `SHEETS_API_KEY` and `LEAGUE_PATH` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("SHEET_ID").filter(|v| !v.trim().is_empty()) {
            self.sheet_id = id.trim().to_string();
        }
        if let Some(key) = lookup("SHEETS_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(path) = lookup("LEAGUE_PATH").filter(|v| !v.trim().is_empty()) {
            self.league_path = Some(PathBuf::from(path.trim()));
        }
    }

    pub fn token_path(&self, config_dir: &Path) -> PathBuf {
        if self.token_file.is_absolute() {
            self.token_file.clone()
        } else {
            config_dir.join(&self.token_file)
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(100))
    }

    pub fn roster_interval(&self) -> Duration {
        Duration::from_millis(self.roster_interval_ms.max(100))
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// Resolve the application data directory.
///
/// Order: `MATCHUP_HELPER_HOME`, `%APPDATA%/matchup-helper`, `$HOME/.matchup-helper`, `.`.
pub fn resolve_data_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(home) = lookup("MATCHUP_HELPER_HOME") {
        return PathBuf::from(home);
    }
    if let Some(appdata) = lookup("APPDATA") {
        return PathBuf::from(appdata).join(APP_DIR_NAME);
    }
    if let Some(home) = lookup("HOME") {
        return PathBuf::from(home).join(format!(".{}", APP_DIR_NAME));
    }
    PathBuf::from(".")
}

pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |k| map.get(k).map(|v| v.to_string())
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.check_interval(), Duration::from_secs(2));
        assert_eq!(cfg.roster_interval(), Duration::from_secs(5));
        assert_eq!(cfg.ban_suggestions.len(), 9);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{ "sheet_id": "abc", "check_interval_ms": 500 }"#,
        )
        .unwrap();
        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(cfg.sheet_id, "abc");
        assert_eq!(cfg.check_interval_ms, 500);
        assert_eq!(cfg.sheet_range, DEFAULT_SHEET_RANGE);
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from(dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.runes_column = Some(5);
        cfg.save_to(dir.path()).unwrap();
        assert_eq!(AppConfig::load_from(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn env_overrides_apply_and_blank_values_are_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(lookup_from(HashMap::from([
            ("SHEET_ID", " sheet-2 "),
            ("SHEETS_API_KEY", "  "),
            ("LEAGUE_PATH", "C:/Riot Games/League of Legends"),
        ])));
        assert_eq!(cfg.sheet_id, "sheet-2");
        assert_eq!(cfg.api_key, None);
        assert_eq!(
            cfg.league_path,
            Some(PathBuf::from("C:/Riot Games/League of Legends"))
        );
    }

    #[test]
    fn data_dir_resolution_order() {
        assert_eq!(
            resolve_data_dir(lookup_from(HashMap::from([
                ("MATCHUP_HELPER_HOME", "/opt/mh"),
                ("APPDATA", "/appdata"),
            ]))),
            PathBuf::from("/opt/mh")
        );
        assert_eq!(
            resolve_data_dir(lookup_from(HashMap::from([("APPDATA", "/appdata")]))),
            PathBuf::from("/appdata").join(APP_DIR_NAME)
        );
        assert_eq!(
            resolve_data_dir(lookup_from(HashMap::from([("HOME", "/home/u")]))),
            PathBuf::from("/home/u/.matchup-helper")
        );
        assert_eq!(resolve_data_dir(|_| None), PathBuf::from("."));
    }

    #[test]
    fn relative_token_file_resolves_against_config_dir() {
        let cfg = AppConfig::default();
        assert_eq!(
            cfg.token_path(Path::new("/cfg")),
            PathBuf::from("/cfg/token.json")
        );
    }
}
