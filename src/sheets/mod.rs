// Google Sheets backed matchup data: credentials, HTTP client and the in-memory repository

mod client;
mod credentials;
mod repository;

pub use client::{GoogleSheetsClient, RetryPolicy, SheetSource};
pub use credentials::{CredentialStore, FileCredentialStore, StaticCredentialStore};
pub use repository::{Columns, MatchupRepository, RepositorySnapshot, KNOWN_FIRST_CHAMPIONS};
