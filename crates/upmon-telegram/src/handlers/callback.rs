use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use upmon_core::messages::buttons;

use crate::router::AppState;

use super::{authorized, perform, Action};

pub(crate) fn action_for_button(data: &str) -> Option<Action> {
    match data {
        buttons::CHECK_VERSION => Some(Action::Check),
        buttons::SYNC_NOW => Some(Action::Sync),
        buttons::DOWNLOAD_FILE => Some(Action::ForceDownload),
        buttons::CHECK_COMMITS => Some(Action::Commits),
        buttons::RELOAD_DEPENDENT => Some(Action::Reload),
        _ => None,
    }
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let chat_id = q.message.as_ref().map(|m| m.chat.id);
    let data = q.data.clone().unwrap_or_default();

    let Some(chat_id) = chat_id else {
        let _ = bot.answer_callback_query(cb_id).await;
        return Ok(());
    };

    // Auth check.
    if !authorized(&state, chat_id.0, Some(q.from.id.0 as i64)) {
        warn!("Rejected button press from user {}", q.from.id.0);
        let _ = bot
            .answer_callback_query(cb_id)
            .text(state.templates.unauthorized())
            .await;
        return Ok(());
    }

    // Answer first so the client stops its spinner while the action runs.
    let _ = bot.answer_callback_query(cb_id).await;

    match action_for_button(&data) {
        Some(action) => perform(&bot, chat_id, action, &state).await,
        None => {
            warn!("Unknown callback data: {data:?}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upmon_core::messages::{Language, MessageTemplates};

    #[test]
    fn every_keyboard_button_has_an_action() {
        for (id, _) in MessageTemplates::new(Language::Ru).keyboard() {
            assert!(action_for_button(id).is_some(), "{id}");
        }
        assert_eq!(action_for_button("askuser:1:2"), None);
    }
}
