use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{MatchupCard, MatchupView, PortraitCache};
use crate::types::RenderableMatchup;

// Terminal view. Cards go to stdout (or any writer); portraits download in the background.

/// Liveness of a view. Async completions check it before touching the view, and
/// `close` also cancels whatever is still downloading.
#[derive(Clone, Debug)]
pub struct ViewHandle {
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Default for ViewHandle {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            cancel: CancellationToken::new(),
        }
    }
}

impl ViewHandle {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

pub struct ConsoleView {
    out: Mutex<Box<dyn Write + Send>>,
    handle: ViewHandle,
    ddragon_version: String,
    portraits: Option<Arc<PortraitCache>>,
    last_status: Mutex<String>,
}

impl ConsoleView {
    pub fn new(ddragon_version: impl Into<String>) -> Self {
        Self::with_writer(Box::new(io::stdout()), ddragon_version)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, ddragon_version: impl Into<String>) -> Self {
        Self {
            out: Mutex::new(out),
            handle: ViewHandle::default(),
            ddragon_version: ddragon_version.into(),
            portraits: None,
            last_status: Mutex::new(String::new()),
        }
    }

    pub fn with_portraits(mut self, cache: Arc<PortraitCache>) -> Self {
        self.portraits = Some(cache);
        self
    }

    pub fn handle(&self) -> ViewHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> String {
        self.last_status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn write(&self, text: &str) {
        if let Ok(mut out) = self.out.lock() {
            // Non-fatal: a closed stdout just loses the card
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    fn spawn_portrait(&self, card: &MatchupCard) {
        let (Some(cache), Some(url)) = (self.portraits.clone(), card.image_url.clone()) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let handle = self.handle.clone();
        let champion = card.title.clone();
        runtime.spawn(async move {
            let result = cache.fetch(&champion, &url, handle.cancel_token()).await;
            if !handle.is_alive() {
                return;
            }
            match result {
                Ok(Some(path)) => tracing::debug!("[Portraits] {} ready at {}", champion, path.display()),
                Ok(None) => {}
                Err(e) => tracing::warn!("[Portraits] Failed to download {}: {}", champion, e),
            }
        });
    }
}

impl MatchupView for ConsoleView {
    fn set_status(&self, status: &str) {
        if !self.handle.is_alive() {
            return;
        }
        if let Ok(mut last) = self.last_status.lock() {
            if *last == status {
                return;
            }
            *last = status.to_string();
        }
        self.write(&format!("\n## {}\n", status));
    }

    fn clear(&self) {
        if self.handle.is_alive() {
            self.write("\n----------------------------------------\n");
        }
    }

    fn show(&self, items: &[RenderableMatchup]) {
        if !self.handle.is_alive() {
            tracing::debug!("[Display] View closed, dropping {} items", items.len());
            return;
        }
        self.clear();
        for item in items {
            let card = MatchupCard::from_renderable(item, &self.ddragon_version);
            self.write(&card.render_text());
            self.write("\n");
            self.spawn_portrait(&card);
        }
    }
}

impl Drop for ConsoleView {
    fn drop(&mut self) {
        self.handle.close();
    }
}
