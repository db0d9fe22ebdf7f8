// Lockfile discovery for the local League client

use std::fs;
use std::path::{Path, PathBuf};

pub const LOCKFILE_NAMES: [&str; 3] = ["lockfile", "LeagueClientUx.lockfile", "LeagueClient.lockfile"];

// Common League of Legends installation paths on Windows
pub const COMMON_INSTALL_PATHS: [&str; 3] = [
  r"C:\Riot Games\League of Legends",
  r"C:\Program Files\Riot Games\League of Legends",
  r"C:\Program Files (x86)\Riot Games\League of Legends",
];

/// Contents of `name:pid:port:password:protocol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockfileInfo {
  pub name: String,
  pub pid: u32,
  pub port: u16,
  pub password: String,
  pub protocol: String,
  pub path: PathBuf,
}

impl LockfileInfo {
  pub fn base_url(&self) -> String {
    format!("{}://127.0.0.1:{}", self.protocol, self.port)
  }
}

pub fn parse_lockfile(content: &str, path: &Path) -> Option<LockfileInfo> {
  let parts: Vec<&str> = content.trim().split(':').collect();
  if parts.len() < 5 {
    return None;
  }
  let port = parts[2].parse::<u16>().ok()?;
  let password = parts[3].to_string();
  if password.is_empty() {
    return None;
  }
  let protocol = match parts[4].trim() {
    "" => "https".to_string(),
    p => p.to_string(),
  };
  Some(LockfileInfo {
    name: parts[0].to_string(),
    pid: parts[1].parse().unwrap_or(0),
    port,
    password,
    protocol,
    path: path.to_path_buf(),
  })
}

/// First readable lockfile in `league_dir`, if the client is running.
pub fn read_lockfile(league_dir: &Path) -> Option<LockfileInfo> {
  for name in LOCKFILE_NAMES {
    let path = league_dir.join(name);
    if let Ok(content) = fs::read_to_string(&path) {
      match parse_lockfile(&content, &path) {
        Some(info) => return Some(info),
        None => tracing::warn!("[LCU Watcher] Ignoring malformed lockfile at {}", path.display()),
      }
    }
  }
  None
}

/// First candidate that contains `LeagueClient.exe`.
pub fn detect_league_dir_in<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
  candidates
    .iter()
    .map(|p| p.as_ref())
    .find(|p| p.join("LeagueClient.exe").exists())
    .map(Path::to_path_buf)
}

pub fn auto_detect_league_dir() -> Option<PathBuf> {
  let found = detect_league_dir_in(&COMMON_INSTALL_PATHS);
  match &found {
    Some(dir) => tracing::info!("[LCU Watcher] Detected League install at {}", dir.display()),
    None => tracing::debug!("[LCU Watcher] No League install found in common paths"),
  }
  found
}
