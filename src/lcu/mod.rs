// Game-client oracle: gameflow phase and enemy roster from the local League client

use async_trait::async_trait;

use crate::error::OracleError;
use crate::types::ClientPhase;

mod client;
mod lockfile;
mod session;

pub use client::LcuClient;
pub use lockfile::{
  auto_detect_league_dir, detect_league_dir_in, parse_lockfile, read_lockfile, LockfileInfo,
  COMMON_INSTALL_PATHS, LOCKFILE_NAMES,
};
pub use session::{enemy_champion_ids, local_team_is_my_team};

/// What the poller needs from the game client.
#[async_trait]
pub trait ClientOracle: Send + Sync {
  /// `Ok(None)` means the client answered but reported no phase.
  async fn get_phase(&self) -> Result<Option<ClientPhase>, OracleError>;

  /// Display names of the enemy team's locked or hovered champions.
  async fn get_enemy_champion_names(&self) -> Result<Vec<String>, OracleError>;
}
