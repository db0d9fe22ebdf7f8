use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use super::lockfile::{auto_detect_league_dir, read_lockfile};
use super::session::enemy_champion_ids;
use super::ClientOracle;
use crate::error::OracleError;
use crate::types::ClientPhase;

// HTTP access to the League client API, rediscovered from the lockfile while disconnected

#[derive(Debug, Clone)]
struct Connection {
  base_url: String,
  auth: String,
}

#[derive(Debug, Deserialize)]
struct ChampionSummary {
  name: String,
}

pub struct LcuClient {
  league_dir: Option<PathBuf>,
  http: reqwest::Client,
  connection: Mutex<Option<Connection>>,
  champion_names: Mutex<HashMap<i64, String>>,
}

impl LcuClient {
  pub fn new(league_dir: Option<PathBuf>) -> Result<Self, OracleError> {
    let http = reqwest::Client::builder()
      .danger_accept_invalid_certs(true)
      .timeout(Duration::from_secs(5))
      .connect_timeout(Duration::from_secs(2))
      .pool_max_idle_per_host(2)
      .build()
      .map_err(|e| OracleError::Request(format!("failed to build HTTP client: {}", e)))?;
    Ok(Self {
      league_dir,
      http,
      connection: Mutex::new(None),
      champion_names: Mutex::new(HashMap::new()),
    })
  }

  fn connection(&self) -> Result<Connection, OracleError> {
    if let Ok(guard) = self.connection.lock() {
      if let Some(conn) = guard.as_ref() {
        return Ok(conn.clone());
      }
    }

    let dir = match self.league_dir.clone().or_else(auto_detect_league_dir) {
      Some(dir) => dir,
      None => {
        return Err(OracleError::ClientNotRunning(
          "League install directory not found".to_string(),
        ))
      }
    };
    let info = read_lockfile(&dir).ok_or_else(|| {
      OracleError::ClientNotRunning(format!("no lockfile in {}", dir.display()))
    })?;

    let auth = general_purpose::STANDARD.encode(format!("riot:{}", info.password));
    let conn = Connection {
      base_url: info.base_url(),
      auth,
    };
    tracing::info!("[LCU Watcher] Found lockfile, connecting to port {}", info.port);
    if let Ok(mut guard) = self.connection.lock() {
      *guard = Some(conn.clone());
    }
    Ok(conn)
  }

  fn forget_connection(&self) {
    if let Ok(mut guard) = self.connection.lock() {
      if guard.take().is_some() {
        tracing::info!("[LCU Watcher] Lost connection to League client");
      }
    }
  }

  async fn get_json(&self, path: &str) -> Result<Value, OracleError> {
    let conn = self.connection()?;
    let resp = self
      .http
      .get(format!("{}{}", conn.base_url, path))
      .header("Authorization", format!("Basic {}", conn.auth))
      .send()
      .await
      .map_err(|e| {
        if e.is_connect() {
          self.forget_connection();
          OracleError::ClientNotRunning(e.to_string())
        } else {
          OracleError::Request(format!("{}: {}", path, e))
        }
      })?;

    let status = resp.status();
    if !status.is_success() {
      return Err(OracleError::Request(format!("{} returned {}", path, status)));
    }
    resp
      .json::<Value>()
      .await
      .map_err(|e| OracleError::Decode(format!("{}: {}", path, e)))
  }

  async fn champion_name(&self, champion_id: i64) -> Result<String, OracleError> {
    if let Some(name) = self
      .champion_names
      .lock()
      .ok()
      .and_then(|cache| cache.get(&champion_id).cloned())
    {
      return Ok(name);
    }
    let value = self
      .get_json(&format!("/lol-champions/v1/champions/{}", champion_id))
      .await?;
    let summary: ChampionSummary =
      serde_json::from_value(value).map_err(|e| OracleError::Decode(e.to_string()))?;
    if let Ok(mut cache) = self.champion_names.lock() {
      cache.insert(champion_id, summary.name.clone());
    }
    Ok(summary.name)
  }
}

#[async_trait]
impl ClientOracle for LcuClient {
  async fn get_phase(&self) -> Result<Option<ClientPhase>, OracleError> {
    match self.get_json("/lol-gameflow/v1/gameflow-phase").await {
      Ok(Value::String(phase)) => return Ok(Some(ClientPhase::parse(&phase))),
      Ok(other) => tracing::debug!("[LCU Watcher] Unexpected gameflow-phase payload: {}", other),
      Err(e) if e.is_not_running() => return Err(e),
      Err(e) => tracing::debug!("[LCU Watcher] gameflow-phase failed, trying session: {}", e),
    }

    let session = self.get_json("/lol-gameflow/v1/session").await?;
    Ok(
      session
        .get("phase")
        .and_then(|v| v.as_str())
        .map(ClientPhase::parse),
    )
  }

  async fn get_enemy_champion_names(&self) -> Result<Vec<String>, OracleError> {
    let session = self.get_json("/lol-champ-select/v1/session").await?;
    let mut names = Vec::new();
    for id in enemy_champion_ids(&session) {
      match self.champion_name(id).await {
        Ok(name) => names.push(name),
        Err(e) if e.is_not_running() => return Err(e),
        Err(e) => tracing::warn!("[LCU Watcher] Failed to resolve champion {}: {}", id, e),
      }
    }
    Ok(names)
  }
}
