use std::future::Future;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::error;

use crate::Result;

/// Spawn a fire-and-forget task whose error is logged instead of dropped.
pub fn spawn_logged<F>(what: &'static str, fut: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            error!("{what} failed: {e}");
        }
    })
}

/// Listener for the service manager's stop request (SIGTERM).
///
/// Never fires on targets without Unix signals.
pub struct TerminateSignal {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

impl TerminateSignal {
    /// Must be installed before the signal can arrive; later deliveries are buffered.
    pub fn install() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                inner: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    pub async fn recv(&mut self) {
        #[cfg(unix)]
        {
            self.inner.recv().await;
        }
        #[cfg(not(unix))]
        {
            std::future::pending::<()>().await
        }
    }
}

/// `dd-mm-YYYY HH:MM:SS` in the configured timezone.
pub fn format_local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%d-%m-%Y %H:%M:%S").to_string()
}

pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_in_configured_timezone() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 21, 30, 5).unwrap();
        assert_eq!(format_local(ts, chrono_tz::Europe::Moscow), "02-03-2026 00:30:05");
        assert_eq!(format_local(ts, chrono_tz::UTC), "01-03-2026 21:30:05");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("привет", 10), "привет");
        assert_eq!(truncate_text("привет", 3), "при...");
    }

    #[tokio::test]
    async fn spawn_logged_swallows_errors() {
        let handle = spawn_logged("test task", async {
            Err(crate::Error::Notification("boom".to_string()))
        });
        assert!(handle.await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_signal_is_received() {
        let mut term = TerminateSignal::install().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(std::time::Duration::from_secs(5), term.recv())
            .await
            .expect("SIGTERM not delivered");
    }
}
