// Logging: tracing to stderr plus an on-disk live log and a bounded in-memory buffer

use chrono::Utc;
use copypasta::{ClipboardContext, ClipboardProvider};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub const MAX_BUFFERED_LINES: usize = 2000;
pub const LIVE_LOG_NAME: &str = "matchup-helper-live.log";

/// Shared sink behind the file layer. Cloned into the subscriber and kept by the
/// caller so logs can be exported later.
#[derive(Clone)]
pub struct LiveLog {
  inner: Arc<LiveLogInner>,
}

struct LiveLogInner {
  path: Option<PathBuf>,
  file: Mutex<Option<File>>,
  buffer: Mutex<VecDeque<String>>,
}

impl LiveLog {
  /// Open (append) `<logs_dir>/matchup-helper-live.log`. If the directory can't be
  /// created the sink keeps working from memory only.
  pub fn open(logs_dir: &Path) -> Self {
    let (path, file) = match fs::create_dir_all(logs_dir) {
      Ok(()) => {
        let path = logs_dir.join(LIVE_LOG_NAME);
        let file = File::options().create(true).append(true).open(&path);
        match file {
          Ok(f) => (Some(path), Some(f)),
          Err(e) => {
            eprintln!("[Logging] Failed to open live log {}: {}", path.display(), e);
            (None, None)
          }
        }
      }
      Err(e) => {
        eprintln!("[Logging] Failed to ensure logs dir exists: {}", e);
        (None, None)
      }
    };
    Self {
      inner: Arc::new(LiveLogInner {
        path,
        file: Mutex::new(file),
        buffer: Mutex::new(VecDeque::new()),
      }),
    }
  }

  pub fn in_memory() -> Self {
    Self {
      inner: Arc::new(LiveLogInner {
        path: None,
        file: Mutex::new(None),
        buffer: Mutex::new(VecDeque::new()),
      }),
    }
  }

  pub fn path(&self) -> Option<&Path> {
    self.inner.path.as_deref()
  }

  pub fn append(&self, message: &str) {
    if let Ok(mut buf) = self.inner.buffer.lock() {
      for line in message.lines() {
        buf.push_back(line.to_string());
      }
      while buf.len() > MAX_BUFFERED_LINES {
        buf.pop_front();
      }
    }
    if let Ok(mut guard) = self.inner.file.lock() {
      if let Some(f) = guard.as_mut() {
        // Non-fatal: the in-memory buffer still has the line
        let _ = f.write_all(message.as_bytes());
      }
    }
  }

  pub fn buffered_lines(&self) -> Vec<String> {
    self
      .inner
      .buffer
      .lock()
      .map(|b| b.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// Full log contents: the live file if readable, else the buffer.
  pub fn contents(&self) -> Option<String> {
    if let Some(path) = self.path() {
      if let Ok(s) = fs::read_to_string(path) {
        if !s.is_empty() {
          return Some(s);
        }
      }
    }
    let lines = self.buffered_lines();
    if lines.is_empty() {
      None
    } else {
      Some(lines.join("\n"))
    }
  }
}

pub struct LiveLogWriter {
  sink: LiveLog,
  pending: Vec<u8>,
}

impl Write for LiveLogWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.pending.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    if !self.pending.is_empty() {
      let text = String::from_utf8_lossy(&self.pending).into_owned();
      self.sink.append(&text);
      self.pending.clear();
    }
    Ok(())
  }
}

impl Drop for LiveLogWriter {
  fn drop(&mut self) {
    let _ = self.flush();
  }
}

impl<'a> MakeWriter<'a> for LiveLog {
  type Writer = LiveLogWriter;

  fn make_writer(&'a self) -> Self::Writer {
    LiveLogWriter {
      sink: self.clone(),
      pending: Vec::new(),
    }
  }
}

/// Install the global subscriber: stderr (filtered by `RUST_LOG`, default `info`)
/// plus the live log without ANSI colours.
pub fn init_logging(data_dir: &Path) -> Result<LiveLog, AppError> {
  let live = LiveLog::open(&data_dir.join("logs"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr),
    )
    .with(
      tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(live.clone()),
    )
    .try_init()
    .map_err(|e| AppError::Logging(e.to_string()))?;

  Ok(live)
}

/// Write the collected logs to a timestamped file in `out_dir` and copy them to
/// the clipboard. Returns the exported file path.
pub fn export_logs(live: &LiveLog, out_dir: &Path) -> Result<PathBuf, AppError> {
  let contents = live
    .contents()
    .ok_or_else(|| AppError::Logging("No logs available".to_string()))?;

  fs::create_dir_all(out_dir)?;
  let filename = format!("matchup-helper-logs-{}.txt", Utc::now().format("%Y%m%d-%H%M%S"));
  let out_path = out_dir.join(filename);
  fs::write(&out_path, &contents)?;

  match ClipboardContext::new() {
    Ok(mut ctx) => {
      if let Err(e) = ctx.set_contents(contents) {
        tracing::warn!("[Logging] Clipboard write failed: {}", e);
      }
    }
    Err(e) => tracing::warn!("[Logging] Clipboard init failed: {}", e),
  }

  Ok(out_path)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buffer_is_bounded() {
    let live = LiveLog::in_memory();
    for i in 0..(MAX_BUFFERED_LINES + 25) {
      live.append(&format!("line {}\n", i));
    }
    let lines = live.buffered_lines();
    assert_eq!(lines.len(), MAX_BUFFERED_LINES);
    assert_eq!(lines[0], "line 25");
  }

  #[test]
  fn writer_flushes_on_drop_to_file_and_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveLog::open(dir.path());
    {
      let mut w = live.make_writer();
      writeln!(w, "[LCU Watcher] connected").unwrap();
    }
    assert_eq!(live.buffered_lines(), vec!["[LCU Watcher] connected".to_string()]);
    let on_disk = fs::read_to_string(dir.path().join(LIVE_LOG_NAME)).unwrap();
    assert!(on_disk.contains("[LCU Watcher] connected"));
  }

  #[test]
  fn contents_without_anything_logged_is_none() {
    assert!(LiveLog::in_memory().contents().is_none());
  }

  #[test]
  fn export_without_logs_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = export_logs(&LiveLog::in_memory(), dir.path()).unwrap_err();
    assert!(err.to_string().contains("No logs available"));
  }
}
