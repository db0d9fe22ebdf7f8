use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

// Credential lookup. Acquiring tokens is someone else's job; we only read them.

pub trait CredentialStore: Send + Sync {
    /// Bearer token usable right now, if any.
    fn access_token(&self) -> Option<String>;

    fn has_usable_credential(&self) -> bool {
        self.access_token().is_some()
    }
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expiry: Option<String>,
}

/// Reads the token file written by the OAuth flow (`token.json`).
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_at(&self, now: DateTime<Utc>) -> Option<String> {
        let data = fs::read_to_string(&self.path).ok()?;
        let parsed: TokenFile = match serde_json::from_str(&data) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("[Sheets] Ignoring unreadable token file {}: {}", self.path.display(), e);
                return None;
            }
        };
        let token = parsed
            .token
            .or(parsed.access_token)
            .filter(|t| !t.trim().is_empty())?;

        // Unparseable expiry: let the API decide
        if let Some(expiry) = parsed.expiry.as_deref() {
            if let Ok(at) = DateTime::parse_from_rfc3339(expiry) {
                if at.with_timezone(&Utc) <= now {
                    tracing::debug!("[Sheets] Token in {} expired at {}", self.path.display(), expiry);
                    return None;
                }
            }
        }
        Some(token)
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.read_at(Utc::now())
    }
}

/// Fixed credential, for `--token` and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore(pub Option<String>);

impl CredentialStore for StaticCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}
