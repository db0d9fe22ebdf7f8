// Client watcher: phase state machine plus the poll loop that drives it

mod poller;
mod state;

#[cfg(test)]
mod tests;

pub use poller::{
  missing_matchup_message, status_line, ClientPoller, PollerCommand, RECOMMENDED_BAN, STATUS_PREFIX,
  WAITING_FOR_CLIENT_BODY, WAITING_FOR_CLIENT_TITLE, WAITING_FOR_ENEMIES_BODY,
  WAITING_FOR_ENEMIES_TITLE,
};
pub use state::{ConnectionState, PollAction, PollState};
