use std::{sync::Arc, time::Duration};

use teloxide::{
    dispatching::{Dispatcher, ShutdownToken},
    dptree,
    prelude::*,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use upmon_core::{
    commits::CommitLister, config::Config, engine::SyncEngine, messages::MessageTemplates,
};

use crate::handlers;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Arc<SyncEngine>,
    /// `None` when no GitHub repository is configured.
    pub commits: Option<Arc<CommitLister>>,
    pub templates: MessageTemplates,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, engine: Arc<SyncEngine>) -> Self {
        let commits = cfg.github_repo.as_deref().map(|repo| {
            Arc::new(CommitLister::new(
                engine.fetcher().clone(),
                &cfg.github_api_url,
                repo,
                cfg.timezone,
            ))
        });
        let templates = *engine.templates();
        Self {
            cfg,
            engine,
            commits,
            templates,
        }
    }
}

/// Serve commands and button presses until Ctrl-C or until `shutdown` fires.
pub async fn run_polling(
    bot: Bot,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => info!("upmon started: @{}", me.username()),
        Err(e) => warn!("getMe failed: {e}"),
    }
    info!(
        "Notification chat: {}, dependent chat: {}, allowed users: {}",
        state.cfg.notification.chat_id,
        state.cfg.dependent.chat_id,
        state.cfg.allowed_users.len()
    );

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    let watcher = tokio::spawn(stop_on_cancel(dispatcher.shutdown_token(), shutdown));
    dispatcher.dispatch().await;
    watcher.abort();

    Ok(())
}

async fn stop_on_cancel(token: ShutdownToken, shutdown: CancellationToken) {
    shutdown.cancelled().await;
    info!("Stopping update polling");
    loop {
        match token.shutdown() {
            Ok(done) => {
                done.await;
                return;
            }
            // The dispatcher has not started polling yet.
            Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}
