//! Telegram update handlers.
//!
//! Commands and inline buttons both resolve to an `Action`; `perform` runs
//! it against the engine and sends the reply.

use std::sync::Arc;

use chrono::{Duration, Utc};
use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, Message},
};
use tracing::{debug, info, warn};

use upmon_core::{
    domain::ChatId, messages::MessageTemplates, security::is_authorized, utils::truncate_text,
};

use crate::router::AppState;

mod callback;
mod commands;

/// Telegram rejects messages above 4096 characters.
const MAX_REPLY_CHARS: usize = 4000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Welcome,
    Check,
    Sync,
    ForceDownload,
    History { hours: i64 },
    Reload,
    Commits,
    Help,
    Unknown(String),
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = command_text(msg.text()) else {
        debug!("Ignoring non-command message in chat {}", msg.chat.id.0);
        return Ok(());
    };

    let user_id = msg.from().map(|u| u.id.0 as i64);
    if !authorized(&state, msg.chat.id.0, user_id) {
        warn!(
            "Rejected command from chat {} (user {:?})",
            msg.chat.id.0, user_id
        );
        let _ = bot
            .send_message(msg.chat.id, state.templates.unauthorized())
            .await;
        return Ok(());
    }

    commands::handle_command(bot, msg.chat.id, text, &state).await
}

/// Only `/`-prefixed text is a command; everything else is ignored silently.
pub(crate) fn command_text(text: Option<&str>) -> Option<&str> {
    text.filter(|t| t.starts_with('/'))
}

pub(crate) fn authorized(state: &AppState, chat_id: i64, user_id: Option<i64>) -> bool {
    is_authorized(
        ChatId(chat_id),
        user_id,
        state.cfg.notification.chat_id,
        &state.cfg.allowed_users,
    )
}

/// Run `action` and reply in `chat`.
pub(crate) async fn perform(
    bot: &Bot,
    chat: teloxide::types::ChatId,
    action: Action,
    state: &AppState,
) -> ResponseResult<()> {
    info!("Chat {}: {:?}", chat.0, action);

    // Best-effort: most actions hit the network for several seconds.
    let _ = bot.send_chat_action(chat, ChatAction::Typing).await;

    let text = match action {
        Action::Welcome => {
            let text = state.engine.welcome().await;
            bot.send_message(chat, truncate_text(&text, MAX_REPLY_CHARS))
                .reply_markup(keyboard_markup(&state.templates))
                .await?;
            return Ok(());
        }
        Action::Check => state.engine.check_version().await,
        Action::Sync => state.engine.sync_now().await,
        Action::ForceDownload => state.engine.force_download().await,
        Action::History { hours } => {
            let since = Utc::now() - Duration::hours(hours);
            state.engine.list_recent_activity(since).await
        }
        Action::Reload => state.engine.trigger_reload().await,
        Action::Commits => match &state.commits {
            Some(lister) => lister.render(&state.templates).await,
            None => state.templates.commits_unavailable(),
        },
        Action::Help => state.templates.help(),
        Action::Unknown(cmd) => state.templates.unknown_command(&cmd),
    };

    bot.send_message(chat, truncate_text(&text, MAX_REPLY_CHARS))
        .await?;
    Ok(())
}

pub(crate) fn keyboard_markup(templates: &MessageTemplates) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = templates
        .keyboard()
        .into_iter()
        .map(|(id, label)| vec![InlineKeyboardButton::callback(label, id)])
        .collect();
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;
    use upmon_core::messages::{buttons, Language};

    #[test]
    fn keyboard_has_one_button_per_row() {
        let markup = keyboard_markup(&MessageTemplates::new(Language::En));
        assert_eq!(markup.inline_keyboard.len(), 5);
        assert!(markup.inline_keyboard.iter().all(|row| row.len() == 1));

        let first = &markup.inline_keyboard[0][0];
        assert_eq!(first.text, "🔍 Check file version");
        assert!(matches!(
            &first.kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == buttons::CHECK_VERSION
        ));
    }

    #[test]
    fn only_slash_text_reaches_the_auth_gate() {
        assert_eq!(command_text(Some("/check")), Some("/check"));
        assert_eq!(command_text(Some("/history 6")), Some("/history 6"));
        assert_eq!(command_text(Some("hello there")), None);
        assert_eq!(command_text(Some("")), None);
        assert_eq!(command_text(None), None);
    }
}
