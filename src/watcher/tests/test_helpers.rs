// Test helpers and mocks for the poller tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::display::MatchupView;
use crate::error::{OracleError, SheetsError};
use crate::lcu::ClientOracle;
use crate::sheets::{Columns, MatchupRepository, SheetSource};
use crate::types::{ClientPhase, RenderableMatchup};
use crate::watcher::ClientPoller;

/// Oracle whose answers are set by the test.
pub struct MockOracle {
    phase: Mutex<Result<Option<ClientPhase>, OracleError>>,
    roster: Mutex<Result<Vec<String>, OracleError>>,
    pub phase_calls: AtomicUsize,
    pub roster_calls: AtomicUsize,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Err(OracleError::ClientNotRunning("mock".into()))),
            roster: Mutex::new(Ok(Vec::new())),
            phase_calls: AtomicUsize::new(0),
            roster_calls: AtomicUsize::new(0),
        }
    }
}

impl MockOracle {
    pub fn set_phase(&self, phase: ClientPhase) {
        *self.phase.lock().unwrap() = Ok(Some(phase));
    }

    pub fn set_not_running(&self) {
        *self.phase.lock().unwrap() = Err(OracleError::ClientNotRunning("mock".into()));
    }

    pub fn set_roster(&self, names: &[&str]) {
        *self.roster.lock().unwrap() = Ok(names.iter().map(|n| n.to_string()).collect());
    }

    pub fn set_roster_error(&self, message: &str) {
        *self.roster.lock().unwrap() = Err(OracleError::Request(message.to_string()));
    }

    pub fn phase_calls(&self) -> usize {
        self.phase_calls.load(Ordering::SeqCst)
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientOracle for MockOracle {
    async fn get_phase(&self) -> Result<Option<ClientPhase>, OracleError> {
        self.phase_calls.fetch_add(1, Ordering::SeqCst);
        self.phase.lock().unwrap().clone()
    }

    async fn get_enemy_champion_names(&self) -> Result<Vec<String>, OracleError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        self.roster.lock().unwrap().clone()
    }
}

/// View that records everything it is asked to show.
#[derive(Default)]
pub struct RecordingView {
    pub statuses: Mutex<Vec<String>>,
    pub shows: Mutex<Vec<Vec<RenderableMatchup>>>,
    pub clears: AtomicUsize,
}

impl RecordingView {
    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn last_show(&self) -> Vec<RenderableMatchup> {
        self.shows.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn show_count(&self) -> usize {
        self.shows.lock().unwrap().len()
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.statuses.lock().unwrap().iter().any(|s| s == status)
    }
}

impl MatchupView for RecordingView {
    fn set_status(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn show(&self, items: &[RenderableMatchup]) {
        self.shows.lock().unwrap().push(items.to_vec());
    }
}

/// Sheet held in memory.
pub struct InMemorySheetSource {
    rows: Mutex<Result<Vec<Vec<String>>, String>>,
    pub calls: AtomicUsize,
}

impl InMemorySheetSource {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(Ok(rows)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing_credentials() -> Self {
        Self {
            rows: Mutex::new(Err("creds".into())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_rows(&self, rows: Vec<Vec<String>>) {
        *self.rows.lock().unwrap() = Ok(rows);
    }
}

#[async_trait]
impl SheetSource for InMemorySheetSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.rows.lock().unwrap() {
            Ok(rows) => Ok(rows.clone()),
            Err(msg) => Err(SheetsError::MissingCredentials(msg.clone())),
        }
    }
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Header rows followed by Aatrox, Darius and Garen.
pub fn sample_rows() -> Vec<Vec<String>> {
    vec![
        row(&["", "Champion", "Difficulty", "Overview", "Gameplay"]),
        row(&["", "Aatrox", "Hard", "Respect the sweet spots", "EARLY GAME: space out Q"]),
        row(&[
            "",
            "Darius",
            "Hard",
            "Do not fight at five stacks",
            "EARLY GAME: give up CS HOW TO TRADE: short trades WATCH OUT: ghost",
        ]),
        row(&["", "Garen", "Easy", "Free lane", "TIPS: punish his Q"]),
    ]
}

pub struct Harness {
    pub poller: ClientPoller,
    pub oracle: Arc<MockOracle>,
    pub view: Arc<RecordingView>,
    pub sheet: Arc<InMemorySheetSource>,
    pub repository: Arc<MatchupRepository>,
}

pub fn harness_with_sheet(sheet: InMemorySheetSource) -> Harness {
    let oracle = Arc::new(MockOracle::default());
    let view = Arc::new(RecordingView::default());
    let sheet = Arc::new(sheet);
    let repository = Arc::new(MatchupRepository::new(sheet.clone(), Columns::default()));
    let poller = ClientPoller::new(
        oracle.clone(),
        repository.clone(),
        view.clone(),
        Arc::new(AppConfig::default()),
    );
    Harness {
        poller,
        oracle,
        view,
        sheet,
        repository,
    }
}

pub fn harness() -> Harness {
    harness_with_sheet(InMemorySheetSource::new(sample_rows()))
}

pub fn structured_names(items: &[RenderableMatchup]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            RenderableMatchup::Structured(m) => Some(m.champion_name.clone()),
            RenderableMatchup::PlainMessage { .. } => None,
        })
        .collect()
}
