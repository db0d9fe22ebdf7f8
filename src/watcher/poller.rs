// Client poller: one task driving phase checks, champ-select roster polls and user commands

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::{PollAction, PollState};
use crate::config::AppConfig;
use crate::display::MatchupView;
use crate::lcu::ClientOracle;
use crate::sheets::MatchupRepository;
use crate::types::{ChampionMatchup, RenderableMatchup};

pub const STATUS_PREFIX: &str = "Matchup Helper";
pub const WAITING_FOR_CLIENT_TITLE: &str = "Waiting for League client";
pub const WAITING_FOR_CLIENT_BODY: &str = "Start League of Legends. The app will connect automatically.";
pub const WAITING_FOR_ENEMIES_TITLE: &str = "Waiting for enemy champions...";
pub const WAITING_FOR_ENEMIES_BODY: &str = "The app will update when champion select starts.";
pub const RECOMMENDED_BAN: &str = "Recommended ban";

pub fn status_line(detail: &str) -> String {
  format!("{} - {}", STATUS_PREFIX, detail)
}

pub fn missing_matchup_message(champion: &str) -> String {
  format!("No matchup information found for {}.", champion)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerCommand {
  /// Show one champion and suspend automatic polling.
  Inspect(String),
  /// Leave manual override; the next tick starts from a clean phase memory.
  Resume,
  Refresh,
  Shutdown,
}

/// Clears the in-flight flag when a tick ends, however it ends.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
  fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
    if flag.swap(true, Ordering::SeqCst) {
      None
    } else {
      Some(Self(flag.clone()))
    }
  }
}

impl Drop for InFlight {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

async fn next_roster_tick(timer: &mut Option<Interval>) {
  match timer {
    Some(t) => {
      t.tick().await;
    }
    None => std::future::pending::<()>().await,
  }
}

pub struct ClientPoller {
  oracle: Arc<dyn ClientOracle>,
  repository: Arc<MatchupRepository>,
  view: Arc<dyn MatchupView>,
  config: Arc<AppConfig>,
  state: PollState,
  manual_override: Option<String>,
  in_flight: Arc<AtomicBool>,
  last_rendered: Option<Vec<RenderableMatchup>>,
}

impl ClientPoller {
  pub fn new(
    oracle: Arc<dyn ClientOracle>,
    repository: Arc<MatchupRepository>,
    view: Arc<dyn MatchupView>,
    config: Arc<AppConfig>,
  ) -> Self {
    Self {
      oracle,
      repository,
      view,
      config,
      state: PollState::new(),
      manual_override: None,
      in_flight: Arc::new(AtomicBool::new(false)),
      last_rendered: None,
    }
  }

  pub fn state(&self) -> &PollState {
    &self.state
  }

  pub fn manual_override(&self) -> Option<&str> {
    self.manual_override.as_deref()
  }

  pub fn spawn(
    self,
    commands: mpsc::Receiver<PollerCommand>,
    cancel: CancellationToken,
  ) -> JoinHandle<()> {
    tokio::spawn(self.run(commands, cancel))
  }

  /// Run until cancelled or told to shut down. Tick failures never end the loop.
  pub async fn run(mut self, mut commands: mpsc::Receiver<PollerCommand>, cancel: CancellationToken) {
    let mut check = interval(self.config.check_interval());
    check.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut roster: Option<Interval> = None;
    tracing::info!(
      "[LCU Watcher] Poller started (check every {:?}, roster every {:?})",
      self.config.check_interval(),
      self.config.roster_interval()
    );

    loop {
      tokio::select! {
        _ = cancel.cancelled() => break,
        cmd = commands.recv() => {
          let Some(cmd) = cmd else { break };
          if !self.handle_command(cmd).await {
            break;
          }
        }
        _ = check.tick(), if self.manual_override.is_none() => {
          for action in self.tick().await {
            if action == PollAction::StartFastPoll {
              let mut timer = interval(self.config.roster_interval());
              timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
              // The immediate first tick would duplicate FetchRoster
              timer.reset();
              roster = Some(timer);
            }
          }
        }
        _ = next_roster_tick(&mut roster), if roster.is_some() && self.manual_override.is_none() => {
          if self.state.in_champ_select() {
            self.render_roster().await;
          }
        }
      }
      if !self.state.fast_poll_active() {
        roster = None;
      }
    }

    tracing::info!("[LCU Watcher] Poller stopped");
  }

  /// One phase check. Returns the actions taken (empty if a tick was already running).
  pub async fn tick(&mut self) -> Vec<PollAction> {
    let Some(_guard) = InFlight::acquire(&self.in_flight) else {
      tracing::debug!("[LCU Watcher] Tick already in flight, skipping");
      return Vec::new();
    };

    let result = self.oracle.get_phase().await;
    match &result {
      Err(e) if e.is_not_running() => tracing::debug!("[LCU Watcher] {}", e),
      Err(e) => tracing::warn!("[LCU Watcher] Phase check failed: {}", e),
      Ok(_) => {}
    }

    let actions = self.state.on_phase_result(&result);
    for action in &actions {
      self.apply(action).await;
    }
    actions
  }

  async fn apply(&mut self, action: &PollAction) {
    match action {
      PollAction::PhaseChanged { from, to } => {
        match from {
          Some(from) => tracing::info!("[LCU Watcher] Phase changed: {} -> {}", from, to),
          None => tracing::info!("[LCU Watcher] Connected, phase: {}", to),
        }
        self.view.set_status(&status_line(&format!("State: {}", to)));
      }
      PollAction::ShowWaitingForClient => {
        tracing::info!("[LCU Watcher] League client not running, waiting");
        self.view.set_status(&status_line("Waiting for League Client"));
        self.render(vec![RenderableMatchup::message(
          WAITING_FOR_CLIENT_TITLE,
          WAITING_FOR_CLIENT_BODY,
        )]);
      }
      PollAction::ShowWaitingForChampSelect => {
        self.view.set_status(&status_line("Waiting for Champion Select"));
        self.render(vec![RenderableMatchup::message(
          WAITING_FOR_ENEMIES_TITLE,
          WAITING_FOR_ENEMIES_BODY,
        )]);
      }
      PollAction::FetchRoster => self.render_roster().await,
      PollAction::StartFastPoll => tracing::debug!("[LCU Watcher] Starting champ select polling"),
      PollAction::StopFastPoll => tracing::debug!("[LCU Watcher] Stopping champ select polling"),
    }
  }

  fn render(&mut self, items: Vec<RenderableMatchup>) {
    if self.last_rendered.as_ref() == Some(&items) {
      return;
    }
    self.view.show(&items);
    self.last_rendered = Some(items);
  }

  /// Lazy load when nothing is cached. A configuration failure waits for an
  /// explicit `Refresh`.
  async fn ensure_repository_loaded(&mut self) {
    if self.repository.needs_load() {
      self.repository.refresh().await;
    }
    self.surface_configuration_error();
  }

  fn surface_configuration_error(&mut self) {
    if let Some(err) = self.repository.take_configuration_error() {
      self.view.set_status(&status_line("Configuration Error"));
      self.render(vec![RenderableMatchup::message("Google Sheets configuration error", err)]);
    }
  }

  /// Fetch the enemy roster and render it.
  pub async fn render_roster(&mut self) {
    self.ensure_repository_loaded().await;

    let names = match self.oracle.get_enemy_champion_names().await {
      Ok(names) => names,
      Err(e) => {
        tracing::error!("[LCU Watcher] Failed to read champion select: {}", e);
        self.render(vec![RenderableMatchup::message(
          "Error",
          format!("Could not read champion select: {}", e),
        )]);
        return;
      }
    };

    if names.is_empty() {
      self.view.set_status(&status_line("Ban Phase"));
      let bans = self
        .config
        .ban_suggestions
        .iter()
        .map(|name| RenderableMatchup::message(name.clone(), RECOMMENDED_BAN))
        .collect();
      self.render(bans);
      return;
    }

    tracing::info!("[LCU Watcher] Enemy champions: {}", names.join(", "));
    self.view.set_status(&status_line(&format!("vs {}", names.join(", "))));
    let items = names
      .iter()
      .map(|name| match self.repository.get_matchup(name) {
        Some(matchup) => RenderableMatchup::Structured(matchup),
        None => RenderableMatchup::message(name.clone(), missing_matchup_message(name)),
      })
      .collect();
    self.render(items);
  }

  async fn inspect(&mut self, champion: &str) {
    self.ensure_repository_loaded().await;
    let matchup = self
      .repository
      .get_matchup(champion)
      .unwrap_or_else(|| ChampionMatchup::placeholder(champion));
    self.view.set_status(&status_line(&format!("Viewing {}", matchup.champion_name)));
    self.render(vec![RenderableMatchup::Structured(matchup)]);
  }

  /// Returns `false` when the loop should stop.
  pub async fn handle_command(&mut self, command: PollerCommand) -> bool {
    match command {
      PollerCommand::Inspect(name) => {
        let name = name.trim().to_string();
        if name.is_empty() {
          return true;
        }
        tracing::info!("[LCU Watcher] Manual override: viewing {}", name);
        self.manual_override = Some(name.clone());
        self.inspect(&name).await;
      }
      PollerCommand::Resume => {
        if self.manual_override.take().is_some() {
          tracing::info!("[LCU Watcher] Resuming automatic polling");
        }
        self.state.reset();
        self.last_rendered = None;
      }
      PollerCommand::Refresh => {
        tracing::info!("[Sheets] Manual refresh requested");
        self.repository.refresh().await;
        self.surface_configuration_error();
        self.last_rendered = None;
        if let Some(name) = self.manual_override.clone() {
          self.inspect(&name).await;
        } else if self.state.in_champ_select() {
          self.render_roster().await;
        }
      }
      PollerCommand::Shutdown => return false,
    }
    true
  }
}
