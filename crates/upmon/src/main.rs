use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use upmon_core::{
    config::Config,
    engine::SyncEngine,
    fetch::{HttpSource, RemoteSource},
    messaging::{
        port::NotificationSink,
        throttled::{ThrottleConfig, ThrottledSink},
    },
    utils::{spawn_logged, TerminateSignal},
};
use upmon_telegram::{router::AppState, TelegramNotifier};

#[tokio::main]
async fn main() -> Result<(), upmon_core::Error> {
    upmon_core::logging::init("upmon")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        "Monitoring {} (line {}) against {}",
        cfg.local_artifact_path.display(),
        cfg.local_artifact_line,
        cfg.remote_content_url()
    );

    let source: Arc<dyn RemoteSource> = Arc::new(HttpSource::new(
        cfg.request_timeout,
        cfg.remote_token.clone(),
    )?);

    // Throttle both bots; keep the 429 RetryAfter retry inside the adapter.
    let operator = TelegramNotifier::for_destination(&cfg.notification);
    let bot = operator.bot();
    let notifier: Arc<dyn NotificationSink> = Arc::new(ThrottledSink::new(
        Arc::new(operator),
        ThrottleConfig::default(),
    ));
    let dependent: Arc<dyn NotificationSink> = Arc::new(ThrottledSink::new(
        Arc::new(TelegramNotifier::for_destination(&cfg.dependent)),
        ThrottleConfig::default(),
    ));

    let engine = Arc::new(SyncEngine::new(cfg.clone(), source, notifier.clone(), dependent));

    let cancel = CancellationToken::new();
    let mut terminate = TerminateSignal::install()?;
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = terminate.recv() => {
                    info!("SIGTERM received");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }
    let periodic = engine.spawn_periodic(cancel.clone());

    {
        let text = engine
            .templates()
            .started(env!("CARGO_PKG_VERSION"), cfg.check_interval);
        spawn_logged("startup notification", async move { notifier.send(&text).await });
    }

    let state = Arc::new(AppState::new(cfg, engine));
    let res = upmon_telegram::router::run_polling(bot, state, cancel.clone()).await;

    info!("Shutting down");
    cancel.cancel();
    if let Err(e) = periodic.await {
        error!("Periodic update task failed: {e}");
    }

    res.map_err(|e| upmon_core::Error::External(format!("telegram bot failed: {e}")))
}
