use futures_util::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::PortraitError;
use crate::types::ddragon_key;

// Champion portrait downloads, once per champion, into <data_dir>/portraits

pub struct PortraitCache {
    dir: PathBuf,
    http: reqwest::Client,
    in_progress: Mutex<HashSet<String>>,
}

/// Removes the in-progress marker however the download ends.
struct InProgress<'a> {
    set: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.key);
        }
    }
}

/// Deletes the `.part` file unless the download was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl PortraitCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PortraitError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            dir: dir.into(),
            http,
            in_progress: Mutex::new(HashSet::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, champion_name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", ddragon_key(champion_name)))
    }

    /// Download `url` for `champion_name` unless it is already on disk.
    ///
    /// Returns `Ok(None)` when cancelled or when another download of the same
    /// portrait is already running.
    pub async fn fetch(
        &self,
        champion_name: &str,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>, PortraitError> {
        let path = self.path_for(champion_name);
        if path.exists() {
            return Ok(Some(path));
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let key = ddragon_key(champion_name);
        {
            let mut set = match self.in_progress.lock() {
                Ok(set) => set,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !set.insert(key.clone()) {
                return Ok(None);
            }
        }
        let _marker = InProgress {
            set: &self.in_progress,
            key,
        };

        async_fs::create_dir_all(&self.dir).await?;
        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            resp = self.http.get(url).send() => resp?,
        };
        if !response.status().is_success() {
            return Err(PortraitError::Status(response.status().as_u16()));
        }

        let mut partial = PartialFile {
            path: path.with_extension("png.part"),
            committed: false,
        };
        let mut file = async_fs::File::create(&partial.path).await?;
        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                chunk = stream.next() => match chunk {
                    Some(bytes) => file.write_all(&bytes?).await?,
                    None => break,
                }
            }
        }
        file.flush().await?;
        drop(file);
        async_fs::rename(&partial.path, &path).await?;
        partial.committed = true;
        tracing::debug!("[Portraits] Saved {}", path.display());
        Ok(Some(path))
    }
}
