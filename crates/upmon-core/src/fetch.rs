//! Network reads and downloads with bounded, fixed-delay retries.
//!
//! `RemoteSource` is the port for "GET this URL"; `HttpSource` implements it
//! with reqwest. `RetryingFetcher` wraps any source with the retry discipline
//! and the atomic file replacement used for artifact downloads.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, time::sleep};
use tracing::{error, info, warn};

use crate::{errors::Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Fixed pause between attempts (no backoff growth).
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// One attempt, no delay.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

/// Record of one attempt inside a single fetch call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadAttempt {
    pub attempt: u32,
    pub max_attempts: u32,
    /// Pause taken after this attempt, if any.
    pub delay: Option<Duration>,
    pub outcome: AttemptOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchReport {
    pub url: String,
    pub attempts: Vec<DownloadAttempt>,
    pub bytes: usize,
}

impl FetchReport {
    pub fn delays(&self) -> usize {
        count_delays(&self.attempts)
    }
}

pub fn count_delays(attempts: &[DownloadAttempt]) -> usize {
    attempts.iter().filter(|a| a.delay.is_some()).count()
}

/// Port for fetching raw bytes from a remote location.
///
/// Implementations return `Err` for transport failures and for any non-2xx
/// status; both count as retryable failures.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// reqwest-backed source with a per-request timeout.
#[derive(Clone, Debug)]
pub struct HttpSource {
    http: reqwest::Client,
    bearer: Option<String>,
}

impl HttpSource {
    pub fn new(timeout: Duration, bearer: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("upmon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self { http, bearer })
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let mut req = self.http.get(url);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::External(format!("unexpected status {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::External(format!("body read error: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Clone)]
pub struct RetryingFetcher {
    source: Arc<dyn RemoteSource>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn RemoteSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch remote text for comparison. Nothing is written to disk.
    pub async fn fetch_text(&self, url: &str) -> Result<(String, FetchReport)> {
        let (bytes, report) = self
            .retry(url, |source| async move { source.get(url).await })
            .await?;
        Ok((String::from_utf8_lossy(&bytes).into_owned(), report))
    }

    /// Download `url` and atomically replace `destination` with the body.
    ///
    /// A failed write counts as a failed attempt; `destination` is either the
    /// old file or the complete new one, never a partial write.
    pub async fn fetch_to_file(&self, url: &str, destination: &Path) -> Result<FetchReport> {
        let (_, report) = self
            .retry(url, |source| async move {
                let bytes = source.get(url).await?;
                write_atomic(destination, &bytes).await?;
                Ok(bytes)
            })
            .await?;
        info!("Downloaded {url} to {}", destination.display());
        Ok(report)
    }

    async fn retry<'a, F, Fut>(&'a self, url: &str, mut op: F) -> Result<(Vec<u8>, FetchReport)>
    where
        F: FnMut(&'a dyn RemoteSource) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<u8>>>,
    {
        let max = self.policy.max_attempts;
        let mut attempts: Vec<DownloadAttempt> = Vec::with_capacity(max as usize);

        for attempt in 1..=max {
            info!("Attempt {attempt}/{max} to fetch {url}");
            match op(self.source.as_ref()).await {
                Ok(bytes) => {
                    attempts.push(DownloadAttempt {
                        attempt,
                        max_attempts: max,
                        delay: None,
                        outcome: AttemptOutcome::Success,
                    });
                    let report = FetchReport {
                        url: url.to_string(),
                        attempts,
                        bytes: bytes.len(),
                    };
                    return Ok((bytes, report));
                }
                Err(e) => {
                    let cause = e.to_string();
                    warn!("Attempt {attempt}/{max} failed: {cause}");

                    if attempt == max {
                        attempts.push(DownloadAttempt {
                            attempt,
                            max_attempts: max,
                            delay: None,
                            outcome: AttemptOutcome::Failure(cause.clone()),
                        });
                        error!("All {max} attempts to fetch {url} exhausted");
                        return Err(Error::Fetch {
                            url: url.to_string(),
                            attempts,
                            cause,
                        });
                    }

                    attempts.push(DownloadAttempt {
                        attempt,
                        max_attempts: max,
                        delay: Some(self.policy.delay),
                        outcome: AttemptOutcome::Failure(cause),
                    });
                    sleep(self.policy.delay).await;
                }
            }
        }

        // max_attempts >= 1, so the loop always returns.
        Err(Error::Fetch {
            url: url.to_string(),
            attempts,
            cause: "no attempts made".to_string(),
        })
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    destination.with_file_name(format!(".{name}.upmon-tmp"))
}

/// Write to a sibling temp file, fsync, then rename over `destination`.
pub async fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path_for(destination);

    let res = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, destination).await
    }
    .await;

    if let Err(e) = res {
        let _ = fs::remove_file(&tmp).await;
        return Err(Error::Io(e));
    }
    Ok(())
}
