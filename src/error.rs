use std::io;
use thiserror::Error;

// Error taxonomy for the spreadsheet backend, the game client and configuration

#[derive(Debug, Error)]
pub enum SheetsError {
    /// No token and no API key. Surfaced once to the user, never retried.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    #[error("Rate limited by Google Sheets after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("HTTP error talking to Google Sheets: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Google Sheets returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode sheet response: {0}")]
    Decode(String),
    #[error("Invalid spreadsheet location: {0}")]
    InvalidUrl(String),
}

impl SheetsError {
    /// Configuration-class failures interrupt the user-visible flow; everything
    /// else is retried on the next refresh.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredentials(_) | Self::InvalidUrl(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("League client is not running: {0}")]
    ClientNotRunning(String),
    #[error("LCU request failed: {0}")]
    Request(String),
    #[error("Failed to decode LCU response: {0}")]
    Decode(String),
}

impl OracleError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, Self::ClientNotRunning(_))
    }
}

#[derive(Debug, Error)]
pub enum PortraitError {
    #[error("Portrait download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Portrait download returned status {0}")]
    Status(u16),
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse config.json: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Logging error: {0}")]
    Logging(String),
}
