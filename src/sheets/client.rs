use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::credentials::CredentialStore;
use crate::error::SheetsError;

// Bulk reads from the Google Sheets values API, with request spacing and 429 backoff

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(32);

/// Anything that can hand over the whole matchup table in one read.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub min_request_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: INITIAL_RETRY_DELAY,
            max_delay: MAX_RETRY_DELAY,
            min_request_interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): 1s, 2s, 4s, ... capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Keeps consecutive requests at least `min_interval` apart.
#[derive(Debug, Default)]
pub struct RequestSpacer {
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    pub async fn wait(&self, min_interval: Duration) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Run `op` under the policy: rate-limited responses are retried with
/// exponential backoff, everything else returns after one attempt.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    spacer: &RequestSpacer,
    mut op: F,
) -> Result<T, SheetsError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SheetsError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        spacer.wait(policy.min_request_interval).await;
        match op().await {
            Err(SheetsError::RateLimited { .. }) if attempt < max_attempts => {
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    "[Sheets] Rate limit exceeded, retrying in {:?} (attempt {}/{})",
                    delay,
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }
            Err(SheetsError::RateLimited { .. }) => {
                return Err(SheetsError::RateLimited { attempts: attempt });
            }
            other => return other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    sheet_id: String,
    range: String,
    api_key: Option<String>,
    credentials: Arc<dyn CredentialStore>,
    policy: RetryPolicy,
    spacer: RequestSpacer,
}

impl GoogleSheetsClient {
    pub fn new(
        sheet_id: impl Into<String>,
        range: impl Into<String>,
        api_key: Option<String>,
        credentials: Arc<dyn CredentialStore>,
        policy: RetryPolicy,
    ) -> Result<Self, SheetsError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("matchup-helper/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: SHEETS_API_BASE.to_string(),
            sheet_id: sheet_id.into(),
            range: range.into(),
            api_key,
            credentials,
            policy,
            spacer: RequestSpacer::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn values_url(&self) -> Result<url::Url, SheetsError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.sheet_id.as_str(), "values", self.range.as_str()]);
        Ok(url)
    }

    async fn fetch_once(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        let token = self.credentials.access_token();
        if token.is_none() && self.api_key.is_none() {
            return Err(SheetsError::MissingCredentials(
                "no usable token and no api_key configured".to_string(),
            ));
        }

        let url = self.values_url()?;
        let mut request = self.http.get(url);
        request = match (token, self.api_key.as_deref()) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Some(key)) => request.query(&[("key", key)]),
            (None, None) => request,
        };

        let resp = request.send().await?;
        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(SheetsError::RateLimited { attempts: 1 });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await?;
        let range: ValueRange =
            serde_json::from_str(&text).map_err(|e| SheetsError::Decode(e.to_string()))?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsClient {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        tracing::info!("[Sheets] Loading all matchup data from range {}", self.range);
        let rows = execute_with_retry(&self.policy, &self.spacer, || self.fetch_once()).await?;
        tracing::info!("[Sheets] Loaded {} rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticCredentialStore;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            min_request_interval: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(0), Duration::from_secs(1));
        assert_eq!(p.delay_for(1), Duration::from_secs(2));
        assert_eq!(p.delay_for(2), Duration::from_secs(4));
        assert_eq!(p.delay_for(5), Duration::from_secs(32));
        assert_eq!(p.delay_for(40), Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_requests_back_off_then_give_up() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<(), SheetsError> =
            execute_with_retry(&quick_policy(), &RequestSpacer::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SheetsError::RateLimited { attempts: 1 })
            })
            .await;
        assert!(matches!(result, Err(SheetsError::RateLimited { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff between the three attempts
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_then_success() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(&quick_policy(), &RequestSpacer::default(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SheetsError::RateLimited { attempts: 1 })
            } else {
                Ok(vec![vec!["x".to_string()]])
            }
        })
        .await
        .unwrap();
        assert_eq!(result, vec![vec!["x".to_string()]]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_errors_fail_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SheetsError> =
            execute_with_retry(&quick_policy(), &RequestSpacer::default(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SheetsError::Status {
                    status: 500,
                    body: "boom".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(SheetsError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spacer_enforces_minimum_interval() {
        let spacer = RequestSpacer::default();
        let started = Instant::now();
        spacer.wait(Duration::from_secs(1)).await;
        spacer.wait(Duration::from_secs(1)).await;
        spacer.wait(Duration::from_secs(1)).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[test]
    fn values_url_encodes_range() {
        let client = GoogleSheetsClient::new(
            "abc",
            "My Sheet!A1:Z100",
            None,
            Arc::new(StaticCredentialStore::default()),
            RetryPolicy::default(),
        )
        .unwrap();
        let url = client.values_url().unwrap().to_string();
        assert!(url.starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/"));
        assert!(url.contains("My%20Sheet"));
    }

    #[tokio::test]
    async fn missing_credentials_fail_without_network() {
        let client = GoogleSheetsClient::new(
            "abc",
            "Matchups!A1:Z100",
            None,
            Arc::new(StaticCredentialStore::default()),
            quick_policy(),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
        let err = client.fetch_rows().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn non_string_cells_are_stringified() {
        assert_eq!(cell_to_string(serde_json::json!(3)), "3");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
        assert_eq!(cell_to_string(serde_json::json!("Hard")), "Hard");
    }

    /// Local stand-in for the values API answering every request with the
    /// same status and body.
    async fn serve(status: u16, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => return,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (format!("http://127.0.0.1:{}", port), hits)
    }

    fn local_client(base_url: String) -> GoogleSheetsClient {
        let policy = RetryPolicy {
            initial_delay: Duration::from_millis(10),
            min_request_interval: Duration::ZERO,
            ..RetryPolicy::default()
        };
        GoogleSheetsClient::new(
            "abc",
            "Matchups!A1:Z100",
            None,
            Arc::new(StaticCredentialStore(Some("token".to_string()))),
            policy,
        )
        .unwrap()
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn values_are_read_from_the_response() {
        let (base, hits) = serve(
            200,
            r#"{"range":"Matchups!A1:Z100","values":[["","Aatrox","Hard"],["","Ahri"]]}"#,
        )
        .await;
        let rows = local_client(base).fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["", "Aatrox", "Hard"]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn response_without_values_is_an_empty_table() {
        let (base, _) = serve(200, "{}").await;
        let rows = local_client(base).fetch_rows().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn http_429_is_retried_until_attempts_run_out() {
        let (base, hits) = serve(429, r#"{"error":{"code":429}}"#).await;
        let err = local_client(base).fetch_rows().await.unwrap_err();
        assert!(matches!(err, SheetsError::RateLimited { attempts: 3 }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn server_error_is_reported_after_one_request() {
        let (base, hits) = serve(500, "backend error").await;
        let err = local_client(base).fetch_rows().await.unwrap_err();
        match err {
            SheetsError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "backend error");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
