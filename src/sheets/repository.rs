use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::client::SheetSource;
use crate::error::SheetsError;
use crate::sections::{self, GameplaySections};
use crate::types::{ChampionMatchup, UNKNOWN_DIFFICULTY};

// In-memory matchup table. Readers always see one whole snapshot; refresh swaps it.

/// Names that mark the first data row when they appear in column B.
pub const KNOWN_FIRST_CHAMPIONS: [&str; 4] = ["aatrox", "ahri", "akali", "alistar"];

const HEADER_SCAN_ROWS: usize = 10;

/// Fixed column layout of the matchup sheet (0-based cell indices, A = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub champion: usize,
    pub difficulty: usize,
    pub overview: usize,
    pub gameplay: usize,
    pub runes: Option<usize>,
    pub summoner_spell: Option<usize>,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            champion: 1,
            difficulty: 2,
            overview: 3,
            gameplay: 4,
            runes: None,
            summoner_spell: None,
        }
    }
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct RepositorySnapshot {
    rows: Vec<Vec<String>>,
    columns: Columns,
    start_row: usize,
    champions: Vec<String>,
    index: HashMap<String, usize>,
    records: HashMap<usize, ChampionMatchup>,
}

impl RepositorySnapshot {
    pub fn build(rows: Vec<Vec<String>>, columns: Columns) -> Self {
        let start_row = rows
            .iter()
            .take(HEADER_SCAN_ROWS)
            .position(|row| KNOWN_FIRST_CHAMPIONS.contains(&normalize(cell(row, columns.champion)).as_str()))
            .unwrap_or(0);

        let mut champions = Vec::new();
        let mut index = HashMap::new();
        let mut records = HashMap::new();

        for (idx, row) in rows.iter().enumerate().skip(start_row) {
            let name = cell(row, columns.champion).trim();
            if name.is_empty() {
                continue;
            }
            let key = normalize(name);
            let record = ChampionMatchup::from_cells(
                name,
                cell(row, columns.difficulty),
                cell(row, columns.overview),
                sections::parse(cell(row, columns.gameplay)),
                columns.runes.map(|c| cell(row, c)).unwrap_or(""),
                columns.summoner_spell.map(|c| cell(row, c)).unwrap_or(""),
            );
            if let Some(record) = record {
                match index.insert(key, idx) {
                    Some(previous) => {
                        tracing::warn!(
                            "[Sheets] Duplicate champion row for '{}' at row {}; it replaces row {}",
                            name,
                            idx,
                            previous
                        );
                        records.remove(&previous);
                    }
                    None => champions.push(name.to_string()),
                }
                records.insert(idx, record);
            }
        }

        tracing::debug!(
            "[Sheets] Indexed {} champions starting at row {}",
            champions.len(),
            start_row
        );

        Self {
            rows,
            columns,
            start_row,
            champions,
            index,
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn start_row(&self) -> usize {
        self.start_row
    }

    pub fn champions(&self) -> &[String] {
        &self.champions
    }

    /// Row position of `champion`. Falls back to scanning every row when the
    /// index misses.
    pub fn find_row(&self, champion: &str) -> Option<usize> {
        let key = normalize(champion);
        if key.is_empty() {
            return None;
        }
        if let Some(&idx) = self.index.get(&key) {
            return Some(idx);
        }
        let found = self
            .rows
            .iter()
            .position(|row| normalize(cell(row, self.columns.champion)) == key);
        if found.is_none() {
            tracing::debug!("[Sheets] Champion '{}' not found in any row", champion.trim());
        }
        found
    }

    fn column_value(&self, champion: &str, col: usize) -> &str {
        self.find_row(champion)
            .and_then(|idx| self.rows.get(idx))
            .map(|row| cell(row, col))
            .unwrap_or("")
    }

    pub fn difficulty(&self, champion: &str) -> String {
        let value = self.column_value(champion, self.columns.difficulty).trim();
        if value.is_empty() {
            UNKNOWN_DIFFICULTY.to_string()
        } else {
            value.to_string()
        }
    }

    pub fn overview(&self, champion: &str) -> String {
        self.column_value(champion, self.columns.overview).to_string()
    }

    pub fn gameplay_text(&self, champion: &str) -> String {
        self.column_value(champion, self.columns.gameplay).to_string()
    }

    pub fn runes(&self, champion: &str) -> String {
        self.columns
            .runes
            .map(|c| self.column_value(champion, c).trim().to_string())
            .unwrap_or_default()
    }

    pub fn summoner_spell(&self, champion: &str) -> String {
        self.columns
            .summoner_spell
            .map(|c| self.column_value(champion, c).trim().to_string())
            .unwrap_or_default()
    }

    pub fn matchup(&self, champion: &str) -> Option<ChampionMatchup> {
        let idx = self.find_row(champion)?;
        if let Some(record) = self.records.get(&idx) {
            return Some(record.clone());
        }
        // Row found by the fallback scan (outside the indexed region)
        let row = self.rows.get(idx)?;
        ChampionMatchup::from_cells(
            cell(row, self.columns.champion),
            cell(row, self.columns.difficulty),
            cell(row, self.columns.overview),
            sections::parse(cell(row, self.columns.gameplay)),
            &self.runes(champion),
            &self.summoner_spell(champion),
        )
    }
}

/// Champion-keyed view over the backing sheet.
pub struct MatchupRepository {
    source: Arc<dyn SheetSource>,
    columns: Columns,
    snapshot: RwLock<Arc<RepositorySnapshot>>,
    refresh_lock: tokio::sync::Mutex<()>,
    pending_config_error: Mutex<Option<String>>,
    config_error_surfaced: AtomicBool,
    config_blocked: AtomicBool,
}

impl MatchupRepository {
    pub fn new(source: Arc<dyn SheetSource>, columns: Columns) -> Self {
        Self {
            source,
            columns,
            snapshot: RwLock::new(Arc::new(RepositorySnapshot::default())),
            refresh_lock: tokio::sync::Mutex::new(()),
            pending_config_error: Mutex::new(None),
            config_error_surfaced: AtomicBool::new(false),
            config_blocked: AtomicBool::new(false),
        }
    }

    /// Current snapshot. Holding the returned `Arc` keeps a consistent view even
    /// if a refresh swaps in new data meanwhile.
    pub fn snapshot(&self) -> Arc<RepositorySnapshot> {
        match self.snapshot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_snapshot(&self, next: RepositorySnapshot) {
        let next = Arc::new(next);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Reload everything in one bulk read and swap the snapshot. Returns the
    /// number of indexed champions. On failure the snapshot is emptied.
    pub async fn try_refresh(&self) -> Result<usize, SheetsError> {
        let _guard = self.refresh_lock.lock().await;
        let rows = match self.source.fetch_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                self.config_blocked.store(e.is_configuration(), Ordering::SeqCst);
                self.replace_snapshot(RepositorySnapshot::default());
                return Err(e);
            }
        };
        self.config_blocked.store(false, Ordering::SeqCst);
        let next = RepositorySnapshot::build(rows, self.columns);
        let count = next.len();
        self.replace_snapshot(next);
        tracing::info!("[Sheets] Matchup snapshot refreshed with {} champions", count);
        Ok(count)
    }

    /// Best-effort refresh: failures are logged and leave an empty snapshot.
    pub async fn refresh(&self) {
        if let Err(e) = self.try_refresh().await {
            if e.is_configuration() {
                tracing::error!("[Sheets] Configuration problem, not retrying automatically: {}", e);
                if !self.config_error_surfaced.load(Ordering::SeqCst) {
                    if let Ok(mut pending) = self.pending_config_error.lock() {
                        *pending = Some(e.to_string());
                    }
                }
            } else {
                tracing::error!("[Sheets] Error loading sheet data: {}", e);
            }
        }
    }

    /// Configuration failure recorded by `refresh`, handed out at most once.
    pub fn take_configuration_error(&self) -> Option<String> {
        let taken = self.pending_config_error.lock().ok()?.take();
        if taken.is_some() {
            self.config_error_surfaced.store(true, Ordering::SeqCst);
        }
        taken
    }

    /// True after a configuration failure, until a refresh succeeds.
    pub fn has_configuration_error(&self) -> bool {
        self.config_blocked.load(Ordering::SeqCst)
    }

    /// Whether a read should trigger a lazy load. Configuration failures only
    /// clear on an explicit refresh.
    pub fn needs_load(&self) -> bool {
        self.snapshot().is_empty() && !self.has_configuration_error()
    }

    /// Champion names in sheet order, loading the sheet first if nothing is cached.
    pub async fn get_all_champion_names(&self) -> Vec<String> {
        if self.needs_load() {
            self.refresh().await;
        }
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            tracing::error!("[Sheets] Failed to load champions list");
        }
        snapshot.champions().to_vec()
    }

    pub fn find_row(&self, champion: &str) -> Option<usize> {
        self.snapshot().find_row(champion)
    }

    pub fn get_difficulty(&self, champion: &str) -> String {
        self.snapshot().difficulty(champion)
    }

    pub fn get_overview(&self, champion: &str) -> String {
        self.snapshot().overview(champion)
    }

    pub fn get_gameplay_text(&self, champion: &str) -> String {
        self.snapshot().gameplay_text(champion)
    }

    pub fn get_runes(&self, champion: &str) -> String {
        self.snapshot().runes(champion)
    }

    pub fn get_summoner_spell(&self, champion: &str) -> String {
        self.snapshot().summoner_spell(champion)
    }

    pub fn gameplay_sections(&self, champion: &str) -> GameplaySections {
        sections::parse(&self.get_gameplay_text(champion))
    }

    pub fn get_matchup(&self, champion: &str) -> Option<ChampionMatchup> {
        self.snapshot().matchup(champion)
    }
}
