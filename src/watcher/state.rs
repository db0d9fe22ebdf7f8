// Phase state machine. Pure: takes the result of a phase query, returns what to do.

use crate::error::OracleError;
use crate::types::ClientPhase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
  Disconnected,
  Connected { phase: ClientPhase },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
  ShowWaitingForClient,
  ShowWaitingForChampSelect,
  FetchRoster,
  StartFastPoll,
  StopFastPoll,
  PhaseChanged {
    from: Option<ClientPhase>,
    to: ClientPhase,
  },
}

/// Phase memory of the poller. `current` is `None` until the first query (and
/// again after `reset`), so the next result is always treated as new.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
  current: Option<ConnectionState>,
  fast_poll: bool,
}

impl PollState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn connection(&self) -> Option<&ConnectionState> {
    self.current.as_ref()
  }

  pub fn phase(&self) -> Option<&ClientPhase> {
    match &self.current {
      Some(ConnectionState::Connected { phase }) => Some(phase),
      _ => None,
    }
  }

  pub fn is_disconnected(&self) -> bool {
    matches!(self.current, Some(ConnectionState::Disconnected))
  }

  pub fn in_champ_select(&self) -> bool {
    self.phase().is_some_and(ClientPhase::is_champ_select)
  }

  pub fn fast_poll_active(&self) -> bool {
    self.fast_poll
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  fn stop_fast_poll(&mut self, actions: &mut Vec<PollAction>) {
    if self.fast_poll {
      self.fast_poll = false;
      actions.push(PollAction::StopFastPoll);
    }
  }

  pub fn on_phase_result(
    &mut self,
    result: &Result<Option<ClientPhase>, OracleError>,
  ) -> Vec<PollAction> {
    let mut actions = Vec::new();

    let phase = match result {
      Ok(phase) => phase.clone().unwrap_or(ClientPhase::None),
      Err(_) => {
        self.stop_fast_poll(&mut actions);
        if !self.is_disconnected() {
          self.current = Some(ConnectionState::Disconnected);
          actions.push(PollAction::ShowWaitingForClient);
        }
        return actions;
      }
    };

    let previous = self.phase().cloned();
    let changed = previous.as_ref() != Some(&phase);
    if changed {
      actions.push(PollAction::PhaseChanged {
        from: previous.clone(),
        to: phase.clone(),
      });
    }
    self.current = Some(ConnectionState::Connected {
      phase: phase.clone(),
    });

    if phase.is_champ_select() {
      if changed {
        actions.push(PollAction::FetchRoster);
        if !self.fast_poll {
          self.fast_poll = true;
          actions.push(PollAction::StartFastPoll);
        }
      }
    } else {
      self.stop_fast_poll(&mut actions);
      if changed {
        actions.push(PollAction::ShowWaitingForChampSelect);
      }
    }
    actions
  }
}
