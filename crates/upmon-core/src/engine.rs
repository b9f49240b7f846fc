//! Update monitor: check → (download → notify → reload) cycles.
//!
//! One `SyncEngine` owns one local artifact. Every operation that reads the
//! local version and may overwrite the file holds `artifact` for its whole
//! duration, so periodic and on-demand cycles serialize and never interleave
//! writes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{
    sync::{watch, Mutex, RwLock},
    task::JoinHandle,
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    compare::{compare, Comparison},
    config::Config,
    domain::Trigger,
    errors::Error,
    fetch::{FetchReport, RemoteSource, RetryingFetcher},
    history::{ActivityEntry, ActivityKind, ActivityLog, CheckOutcome},
    messages::{MessageTemplates, Step},
    messaging::port::NotificationSink,
    utils::format_local,
    version::{extract_from_content, extract_from_file, VersionToken},
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Checking,
    UpToDate,
    Downloading,
    Notifying,
    ReloadingDependent,
}

#[derive(Clone, Debug)]
pub enum CycleReport {
    UpToDate(CheckOutcome),
    Updated {
        outcome: CheckOutcome,
        /// Version read back from the freshly written file.
        installed: VersionToken,
        download: FetchReport,
        notified: bool,
        reloaded: bool,
    },
}

impl CycleReport {
    pub fn outcome(&self) -> &CheckOutcome {
        match self {
            CycleReport::UpToDate(o) => o,
            CycleReport::Updated { outcome, .. } => outcome,
        }
    }
}

/// Which phase a failed cycle died in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Check,
    Download,
}

pub struct SyncEngine {
    cfg: Arc<Config>,
    fetcher: RetryingFetcher,
    notifier: Arc<dyn NotificationSink>,
    dependent: Arc<dyn NotificationSink>,
    templates: MessageTemplates,

    artifact: Mutex<()>,
    cached: RwLock<Option<VersionToken>>,
    phase: watch::Sender<Phase>,
    history: Mutex<ActivityLog>,
}

impl SyncEngine {
    pub fn new(
        cfg: Arc<Config>,
        source: Arc<dyn RemoteSource>,
        notifier: Arc<dyn NotificationSink>,
        dependent: Arc<dyn NotificationSink>,
    ) -> Self {
        let fetcher = RetryingFetcher::new(source, cfg.retry_policy());
        let templates = MessageTemplates::new(cfg.language);
        let history = ActivityLog::new(cfg.history_limit);
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            cfg,
            fetcher,
            notifier,
            dependent,
            templates,
            artifact: Mutex::new(()),
            cached: RwLock::new(None),
            phase,
            history: Mutex::new(history),
        }
    }

    pub fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    pub fn fetcher(&self) -> &RetryingFetcher {
        &self.fetcher
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Last local version observed by a cycle, without waiting on the artifact lock.
    pub async fn cached_version(&self) -> Option<VersionToken> {
        self.cached.read().await.clone()
    }

    // ============== Cycles ==============

    /// Run one full cycle. Fetch failures abort the cycle and are returned.
    pub async fn run_cycle(&self, trigger: Trigger) -> Result<CycleReport> {
        let _guard = self.artifact.lock().await;
        let res = self.cycle_locked(trigger).await;
        self.set_phase(Phase::Idle);
        res.map_err(|(_, e)| e)
    }

    async fn cycle_locked(
        &self,
        trigger: Trigger,
    ) -> std::result::Result<CycleReport, (Stage, Error)> {
        let (outcome, _) = self
            .check_locked(trigger)
            .await
            .map_err(|e| (Stage::Check, e))?;

        if !outcome.changed {
            self.set_phase(Phase::UpToDate);
            info!(
                "No updates found ({trigger}). Local version: {}",
                outcome.local
            );
            return Ok(CycleReport::UpToDate(outcome));
        }

        info!(
            "Version changed ({trigger}): local {} / remote {}",
            outcome.local, outcome.remote
        );

        let (download, installed) = self
            .download_locked(trigger, &outcome.local)
            .await
            .map_err(|e| (Stage::Download, e))?;
        if installed != outcome.remote {
            warn!(
                "Downloaded artifact reports {installed}, expected {}",
                outcome.remote
            );
        }

        let (notified, reloaded) = self
            .announce_update(trigger, &outcome.local, &outcome.remote)
            .await;

        Ok(CycleReport::Updated {
            outcome,
            installed,
            download,
            notified,
            reloaded,
        })
    }

    /// Checking phase: local extraction, remote fetch + extraction, comparison.
    async fn check_locked(&self, trigger: Trigger) -> Result<(CheckOutcome, Comparison)> {
        self.set_phase(Phase::Checking);

        let local = self.read_local_version().await;
        let remote = match self.fetch_remote_version().await {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to fetch remote version: {e}");
                self.record(trigger, ActivityKind::CheckFailed(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let comparison = compare(&local, &remote);
        let outcome = CheckOutcome {
            local,
            remote,
            changed: !comparison.equal,
            timestamp: Utc::now(),
        };
        self.record(trigger, ActivityKind::Checked(outcome.clone()))
            .await;
        Ok((outcome, comparison))
    }

    /// Downloading phase. Returns the fetch report and the re-extracted version.
    async fn download_locked(
        &self,
        trigger: Trigger,
        previous: &VersionToken,
    ) -> Result<(FetchReport, VersionToken)> {
        self.set_phase(Phase::Downloading);

        let url = self.cfg.artifact_download_url();
        let report = match self
            .fetcher
            .fetch_to_file(&url, &self.cfg.local_artifact_path)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Artifact download failed: {e}");
                self.record(trigger, ActivityKind::DownloadFailed(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let installed = self.read_local_version().await;
        info!("Update downloaded. Local version is now: {installed}");
        self.record(
            trigger,
            ActivityKind::Downloaded {
                from: previous.clone(),
                to: installed.clone(),
            },
        )
        .await;
        Ok((report, installed))
    }

    /// Notifying + ReloadingDependent phases. Both are best-effort.
    async fn announce_update(
        &self,
        trigger: Trigger,
        old: &VersionToken,
        new: &VersionToken,
    ) -> (bool, bool) {
        self.set_phase(Phase::Notifying);
        let text = self.templates.update_downloaded(old, new);
        let notified = match self.notifier.send(&text).await {
            Ok(()) => {
                self.record(trigger, ActivityKind::Notified).await;
                true
            }
            Err(e) => {
                error!("Failed to send update notification: {e}");
                self.record(trigger, ActivityKind::NotificationFailed(e.to_string()))
                    .await;
                false
            }
        };

        self.set_phase(Phase::ReloadingDependent);
        let reloaded = self.send_reload(trigger).await.is_ok();
        (notified, reloaded)
    }

    async fn send_reload(&self, trigger: Trigger) -> Result<()> {
        match self.dependent.send(&self.cfg.reload_command).await {
            Ok(()) => {
                info!("Reload command sent to chat {}", self.cfg.dependent.chat_id);
                self.record(trigger, ActivityKind::ReloadSent).await;
                Ok(())
            }
            Err(e) => {
                error!("Error sending reload command: {e}");
                self.record(trigger, ActivityKind::ReloadFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn read_local_version(&self) -> VersionToken {
        let token =
            extract_from_file(&self.cfg.local_artifact_path, self.cfg.local_artifact_line).await;
        *self.cached.write().await = Some(token.clone());
        token
    }

    async fn fetch_remote_version(&self) -> Result<VersionToken> {
        let (content, _) = self
            .fetcher
            .fetch_text(&self.cfg.remote_content_url())
            .await?;
        let version = extract_from_content(&content);
        info!("Remote file version: {version}");
        Ok(version)
    }

    // ============== On-demand entry points ==============

    /// Compare local and remote versions without downloading.
    pub async fn check_version(&self) -> String {
        let _guard = self.artifact.lock().await;
        let res = self.check_locked(Trigger::OnDemand).await;
        self.set_phase(Phase::Idle);
        match res {
            Ok((outcome, comparison)) => {
                self.templates
                    .check_report(&outcome.local, &outcome.remote, &comparison)
            }
            Err(e) => self.templates.check_failed(&e.to_string()),
        }
    }

    /// Full cycle on demand.
    pub async fn sync_now(&self) -> String {
        let _guard = self.artifact.lock().await;
        let res = self.cycle_locked(Trigger::OnDemand).await;
        self.set_phase(Phase::Idle);
        match res {
            Ok(CycleReport::UpToDate(outcome)) => self.templates.sync_up_to_date(&outcome.local),
            Ok(CycleReport::Updated {
                outcome, reloaded, ..
            }) => self
                .templates
                .sync_updated(&outcome.local, &outcome.remote, reloaded),
            Err((Stage::Check, e)) => self.templates.check_failed(&e.to_string()),
            Err((Stage::Download, e)) => self.templates.download_failed(&e.to_string()),
        }
    }

    /// Download the remote artifact regardless of the current version.
    ///
    /// When the downloaded version differs from the previous one the update
    /// is announced exactly like a cycle would.
    pub async fn force_download(&self) -> String {
        let _guard = self.artifact.lock().await;
        let res = self.force_download_locked().await;
        self.set_phase(Phase::Idle);
        match res {
            Ok((before, after)) if before == after => self.templates.forced_up_to_date(&after),
            Ok((_, after)) => self.templates.forced_downloaded(&after),
            Err(e) => self.templates.download_failed(&e.to_string()),
        }
    }

    async fn force_download_locked(&self) -> Result<(VersionToken, VersionToken)> {
        let before = self.read_local_version().await;
        let (_, after) = self.download_locked(Trigger::OnDemand, &before).await?;
        if before != after {
            self.announce_update(Trigger::OnDemand, &before, &after)
                .await;
        } else {
            info!("Forced download kept version {after}");
        }
        Ok((before, after))
    }

    /// Activity log entries at or after `since`, rendered for a chat message.
    pub async fn list_recent_activity(&self, since: DateTime<Utc>) -> String {
        let entries = self.history.lock().await.since(since);
        let since_str = format_local(since, self.cfg.timezone);
        if entries.is_empty() {
            return self.templates.history_empty(&since_str);
        }

        let mut lines = vec![self.templates.history_header(&since_str, entries.len())];
        lines.extend(entries.iter().map(|e| self.describe(e)));
        lines.join("\n")
    }

    /// Send the reload command to the dependent bot.
    pub async fn trigger_reload(&self) -> String {
        match self.send_reload(Trigger::OnDemand).await {
            Ok(()) => self.templates.reload_sent(),
            Err(e) => self.templates.reload_failed(&e.to_string()),
        }
    }

    /// Start-screen summary with both versions and the check interval.
    pub async fn welcome(&self) -> String {
        let _guard = self.artifact.lock().await;
        let res = self.check_locked(Trigger::OnDemand).await;
        self.set_phase(Phase::Idle);

        let (local, remote, status) = match res {
            Ok((outcome, comparison)) => {
                let status = self.templates.status_line(&comparison);
                (outcome.local, outcome.remote.to_string(), status)
            }
            Err(e) => {
                let local = self
                    .cached_version()
                    .await
                    .unwrap_or(VersionToken::Unknown);
                let status = self.templates.check_failed(&e.to_string());
                (local, self.templates.version_unavailable(), status)
            }
        };

        self.templates.welcome(
            env!("CARGO_PKG_VERSION"),
            &local,
            &remote,
            &status,
            self.cfg.check_interval,
        )
    }

    // ============== Periodic loop ==============

    /// Check every `check_interval` until `cancel` fires.
    ///
    /// Cancellation is only observed between cycles, so an in-flight
    /// download always finishes its current attempt.
    pub async fn run_periodic(&self, cancel: CancellationToken) {
        let interval = self.cfg.check_interval;
        info!("Periodic update check every {}s", interval.as_secs());

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.run_cycle(Trigger::Periodic).await {
                Ok(CycleReport::Updated { installed, .. }) => {
                    info!("Periodic update installed {installed}")
                }
                Ok(CycleReport::UpToDate(_)) => {}
                Err(e) => error!("Periodic update check failed: {e}"),
            }

            match next_check_at(Utc::now(), interval) {
                Some(next) => info!(
                    "Next update check at: {}",
                    format_local(next, self.cfg.timezone)
                ),
                None => warn!(
                    "Next update check is {}s away, beyond any representable date",
                    interval.as_secs()
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }

        info!("Periodic update check stopped");
    }

    pub fn spawn_periodic(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_periodic(cancel).await })
    }

    // ============== Helpers ==============

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }

    async fn record(&self, trigger: Trigger, kind: ActivityKind) {
        self.history.lock().await.record(trigger, kind);
    }

    fn describe(&self, entry: &ActivityEntry) -> String {
        let t = &self.templates;
        let text = match &entry.kind {
            ActivityKind::Checked(o) => t.activity_checked(&o.local, &o.remote, o.changed),
            ActivityKind::CheckFailed(r) => t.activity_failed(Step::Check, r),
            ActivityKind::Downloaded { from, to } => t.activity_downloaded(from, to),
            ActivityKind::DownloadFailed(r) => t.activity_failed(Step::Download, r),
            ActivityKind::Notified => t.activity_notified(),
            ActivityKind::NotificationFailed(r) => t.activity_failed(Step::Notification, r),
            ActivityKind::ReloadSent => t.activity_reload_sent(),
            ActivityKind::ReloadFailed(r) => t.activity_failed(Step::Reload, r),
        };
        format!(
            "{} [{}] {}",
            format_local(entry.timestamp, self.cfg.timezone),
            t.trigger_label(entry.trigger),
            text
        )
    }
}

/// `None` when `now + interval` does not fit in a `DateTime`.
fn next_check_at(now: DateTime<Utc>, interval: std::time::Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}
