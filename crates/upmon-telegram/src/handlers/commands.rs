use teloxide::prelude::*;

use crate::router::AppState;

use super::{perform, Action};

const DEFAULT_HISTORY_HOURS: i64 = 24;
const MAX_HISTORY_HOURS: i64 = 24 * 30;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// `/history [hours]`; garbage falls back to the default window.
fn parse_hours(arg: &str) -> i64 {
    arg.split_whitespace()
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .filter(|h| *h > 0)
        .map(|h| h.min(MAX_HISTORY_HOURS))
        .unwrap_or(DEFAULT_HISTORY_HOURS)
}

pub(crate) fn action_for(text: &str) -> Action {
    let (cmd, arg) = parse_command(text);
    match cmd.as_str() {
        "start" => Action::Welcome,
        "check" | "version" => Action::Check,
        "sync" => Action::Sync,
        "download" => Action::ForceDownload,
        "history" => Action::History {
            hours: parse_hours(&arg),
        },
        "reload" => Action::Reload,
        "commits" => Action::Commits,
        "help" => Action::Help,
        _ => Action::Unknown(cmd),
    }
}

pub async fn handle_command(
    bot: Bot,
    chat: teloxide::types::ChatId,
    text: &str,
    state: &AppState,
) -> ResponseResult<()> {
    perform(&bot, chat, action_for(text), state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bot_mention_and_splits_argument() {
        assert_eq!(
            parse_command("/History@upmon_bot  48 "),
            ("history".to_string(), "48".to_string())
        );
        assert_eq!(parse_command("/sync"), ("sync".to_string(), String::new()));
    }

    #[test]
    fn maps_commands_to_actions() {
        assert_eq!(action_for("/start"), Action::Welcome);
        assert_eq!(action_for("/check"), Action::Check);
        assert_eq!(action_for("/sync"), Action::Sync);
        assert_eq!(action_for("/download"), Action::ForceDownload);
        assert_eq!(action_for("/reload"), Action::Reload);
        assert_eq!(action_for("/commits"), Action::Commits);
        assert_eq!(action_for("/help"), Action::Help);
        assert_eq!(
            action_for("/frobnicate now"),
            Action::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn history_window_defaults_and_clamps() {
        assert_eq!(action_for("/history"), Action::History { hours: 24 });
        assert_eq!(action_for("/history 6"), Action::History { hours: 6 });
        assert_eq!(action_for("/history -3"), Action::History { hours: 24 });
        assert_eq!(action_for("/history lots"), Action::History { hours: 24 });
        assert_eq!(
            action_for("/history 100000"),
            Action::History { hours: 720 }
        );
    }
}
