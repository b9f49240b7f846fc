//! User-visible text, per language.
//!
//! Every string the bot sends goes through `MessageTemplates`, so adding a
//! language means adding match arms here and nothing else.

use std::time::Duration;

use crate::{
    compare::{Comparison, UpdateStatus},
    domain::Trigger,
    version::VersionToken,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    En,
    Ru,
}

impl Language {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "en" | "eng" | "english" => Some(Language::En),
            "ru" | "rus" | "russian" => Some(Language::Ru),
            _ => None,
        }
    }
}

/// Cycle step named in failed activity entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Check,
    Download,
    Notification,
    Reload,
}

/// Inline button ids shared between the keyboard and the callback router.
pub mod buttons {
    pub const CHECK_VERSION: &str = "check_version";
    pub const DOWNLOAD_FILE: &str = "download_file";
    pub const CHECK_COMMITS: &str = "check_commits";
    pub const RELOAD_DEPENDENT: &str = "reload_dependent";
    pub const SYNC_NOW: &str = "sync_now";
}

#[derive(Clone, Copy, Debug)]
pub struct MessageTemplates {
    lang: Language,
}

impl MessageTemplates {
    pub fn new(lang: Language) -> Self {
        Self { lang }
    }

    // ============== Update cycle ==============

    pub fn update_downloaded(&self, old: &VersionToken, new: &VersionToken) -> String {
        match self.lang {
            Language::En => format!(
                "✅ Update found! New version: {new} successfully downloaded (was {old}).\n\nReloading the dependent bot..."
            ),
            Language::Ru => format!(
                "✅ Найдено обновление! Новая версия: {new} успешно загружена (была {old}).\n\nПерезапускаем зависимого бота..."
            ),
        }
    }

    pub fn status_line(&self, comparison: &Comparison) -> String {
        match (&comparison.status, self.lang) {
            (UpdateStatus::NoUpdate, Language::En) => "✅ No updates found".to_string(),
            (UpdateStatus::NoUpdate, Language::Ru) => "✅ Обновлений не обнаружено".to_string(),
            (UpdateStatus::UpdateAvailable(v), Language::En) => {
                format!("📥 New version found on the server: {v}")
            }
            (UpdateStatus::UpdateAvailable(v), Language::Ru) => {
                format!("📥 Обнаружена новая версия на сервере: {v}")
            }
        }
    }

    pub fn check_report(
        &self,
        local: &VersionToken,
        remote: &VersionToken,
        comparison: &Comparison,
    ) -> String {
        let status = self.status_line(comparison);
        match self.lang {
            Language::En => format!(
                "🗂️ Local file version: {local}\n🌐 Version on server: {remote}\n{status}"
            ),
            Language::Ru => format!(
                "🗂️ Версия локального файла: {local}\n🌐 Версия на сервере: {remote}\n{status}"
            ),
        }
    }

    pub fn check_failed(&self, err: &str) -> String {
        match self.lang {
            Language::En => format!("❌ Failed to get the version from the server: {err}"),
            Language::Ru => format!("❌ Не удалось получить версию с сервера: {err}"),
        }
    }

    pub fn sync_up_to_date(&self, version: &VersionToken) -> String {
        match self.lang {
            Language::En => format!("✅ Already up to date ({version})."),
            Language::Ru => format!("✅ Версия актуальна ({version})."),
        }
    }

    pub fn sync_updated(&self, old: &VersionToken, new: &VersionToken, reloaded: bool) -> String {
        match (self.lang, reloaded) {
            (Language::En, true) => format!("✅ Updated {old} → {new}. Reload command sent."),
            (Language::En, false) => format!(
                "✅ Updated {old} → {new}.\n❌ The reload command could not be sent, see logs."
            ),
            (Language::Ru, true) => {
                format!("✅ Обновлено {old} → {new}. Команда перезапуска отправлена.")
            }
            (Language::Ru, false) => format!(
                "✅ Обновлено {old} → {new}.\n❌ Не удалось отправить команду перезапуска, см. логи."
            ),
        }
    }

    // ============== Forced download ==============

    pub fn forced_up_to_date(&self, version: &VersionToken) -> String {
        match self.lang {
            Language::En => format!(
                "The local file version ({version}) is up to date. No update needed."
            ),
            Language::Ru => format!(
                "Версия локального файла ({version}) актуальна. Обновление не требуется."
            ),
        }
    }

    pub fn forced_downloaded(&self, version: &VersionToken) -> String {
        match self.lang {
            Language::En => format!("✅ New version ({version}) successfully downloaded!"),
            Language::Ru => format!("✅ Новая версия ({version}) успешно загружена!"),
        }
    }

    pub fn download_failed(&self, err: &str) -> String {
        match self.lang {
            Language::En => format!("❌ Failed to download the file: {err}"),
            Language::Ru => format!("❌ Не удалось загрузить файл: {err}"),
        }
    }

    // ============== Reload ==============

    pub fn reload_sent(&self) -> String {
        match self.lang {
            Language::En => "🔄 The reload command has been sent.".to_string(),
            Language::Ru => "🔄 Команда перезапуска отправлена.".to_string(),
        }
    }

    pub fn reload_failed(&self, err: &str) -> String {
        match self.lang {
            Language::En => format!("❌ Failed to send the command: {err}"),
            Language::Ru => format!("❌ Не удалось отправить команду: {err}"),
        }
    }

    // ============== History ==============

    pub fn history_header(&self, since: &str, count: usize) -> String {
        match self.lang {
            Language::En => format!("🕘 Activity since {since} ({count} events)"),
            Language::Ru => format!("🕘 События с {since} ({count})"),
        }
    }

    pub fn history_empty(&self, since: &str) -> String {
        match self.lang {
            Language::En => format!("No activity since {since}."),
            Language::Ru => format!("Нет событий с {since}."),
        }
    }

    pub fn activity_checked(&self, local: &VersionToken, remote: &VersionToken, changed: bool) -> String {
        match (self.lang, changed) {
            (Language::En, false) => format!("checked: up to date ({local})"),
            (Language::En, true) => format!("checked: {local} → {remote}"),
            (Language::Ru, false) => format!("проверка: актуально ({local})"),
            (Language::Ru, true) => format!("проверка: {local} → {remote}"),
        }
    }

    pub fn activity_downloaded(&self, from: &VersionToken, to: &VersionToken) -> String {
        match self.lang {
            Language::En => format!("downloaded: {from} → {to}"),
            Language::Ru => format!("загружено: {from} → {to}"),
        }
    }

    pub fn trigger_label(&self, trigger: Trigger) -> &'static str {
        match (self.lang, trigger) {
            (Language::En, Trigger::Periodic) => "periodic",
            (Language::En, Trigger::OnDemand) => "on-demand",
            (Language::Ru, Trigger::Periodic) => "по расписанию",
            (Language::Ru, Trigger::OnDemand) => "по запросу",
        }
    }

    pub fn activity_failed(&self, step: Step, reason: &str) -> String {
        let step = match (self.lang, step) {
            (Language::En, Step::Check) => "check",
            (Language::En, Step::Download) => "download",
            (Language::En, Step::Notification) => "notification",
            (Language::En, Step::Reload) => "reload",
            (Language::Ru, Step::Check) => "проверка",
            (Language::Ru, Step::Download) => "загрузка",
            (Language::Ru, Step::Notification) => "уведомление",
            (Language::Ru, Step::Reload) => "перезапуск",
        };
        match self.lang {
            Language::En => format!("{step} failed: {reason}"),
            Language::Ru => format!("{step}: ошибка: {reason}"),
        }
    }

    pub fn activity_notified(&self) -> String {
        match self.lang {
            Language::En => "update notification sent".to_string(),
            Language::Ru => "уведомление отправлено".to_string(),
        }
    }

    pub fn activity_reload_sent(&self) -> String {
        match self.lang {
            Language::En => "reload command sent".to_string(),
            Language::Ru => "команда перезапуска отправлена".to_string(),
        }
    }

    // ============== Commits ==============

    pub fn commits_header(&self, date: &str, count: usize) -> String {
        match self.lang {
            Language::En => format!("📜 Latest commits from {date} ({count} commits)"),
            Language::Ru => format!("📜 Последние коммиты от {date} ({count} коммитов)"),
        }
    }

    pub fn commits_empty(&self) -> String {
        match self.lang {
            Language::En => "No commits in the repository.".to_string(),
            Language::Ru => "Нет коммитов в репозитории.".to_string(),
        }
    }

    pub fn commits_failed(&self, err: &str) -> String {
        match self.lang {
            Language::En => format!("❌ Error while retrieving commits: {err}"),
            Language::Ru => format!("❌ Ошибка при получении коммитов: {err}"),
        }
    }

    pub fn commits_unavailable(&self) -> String {
        match self.lang {
            Language::En => "Commit listing is not configured (set GITHUB_REPO).".to_string(),
            Language::Ru => "Список коммитов не настроен (укажите GITHUB_REPO).".to_string(),
        }
    }

    // ============== Start screen ==============

    pub fn version_unavailable(&self) -> String {
        match self.lang {
            Language::En => "unavailable".to_string(),
            Language::Ru => "недоступна".to_string(),
        }
    }

    pub fn format_interval(&self, interval: Duration) -> String {
        let total = interval.as_secs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        let (h, m, s) = match self.lang {
            Language::En => ("hrs", "min", "sec"),
            Language::Ru => ("ч.", "мин.", "сек."),
        };
        if hours > 0 {
            format!("{hours} {h} {minutes} {m} {seconds} {s}")
        } else if minutes > 0 {
            format!("{minutes} {m} {seconds} {s}")
        } else {
            format!("{seconds} {s}")
        }
    }

    pub fn welcome(
        &self,
        bot_version: &str,
        local: &VersionToken,
        remote: &str,
        status: &str,
        interval: Duration,
    ) -> String {
        let interval = self.format_interval(interval);
        match self.lang {
            Language::En => format!(
                "🤖 Welcome!\n\
                 Bot version: {bot_version}\n\
                 This bot monitors updates of the strategy file.\n\n\
                 📊 Initial information:\n\
                 📂 Local file version: {local}\n\
                 🌐 Server version: {remote}\n\
                 {status}\n\
                 🕒 Update check interval: {interval}\n\n\
                 📌 Main functions:\n\
                 1️⃣ Check the current file version.\n\
                 2️⃣ Download strategy updates.\n\
                 3️⃣ Display the latest commits.\n\
                 4️⃣ Reload the dependent bot after updating.\n\n\
                 Use the buttons below to manage."
            ),
            Language::Ru => format!(
                "🤖 Добро пожаловать!\n\
                 Версия бота: {bot_version}\n\
                 Этот бот следит за обновлениями файла стратегии.\n\n\
                 📊 Стартовая информация:\n\
                 📂 Версия локального файла: {local}\n\
                 🌐 Версия на сервере: {remote}\n\
                 {status}\n\
                 🕒 Интервал проверки обновлений: {interval}\n\n\
                 📌 Основные функции:\n\
                 1️⃣ Проверка актуальной версии файла.\n\
                 2️⃣ Загрузка обновлений стратегии.\n\
                 3️⃣ Отображение последних коммитов.\n\
                 4️⃣ Перезапуск зависимого бота после обновления.\n\n\
                 Используйте кнопки ниже для управления."
            ),
        }
    }

    pub fn started(&self, bot_version: &str, interval: Duration) -> String {
        let interval = self.format_interval(interval);
        match self.lang {
            Language::En => {
                format!("🚀 Update monitor {bot_version} started. Checking every {interval}.")
            }
            Language::Ru => {
                format!("🚀 Монитор обновлений {bot_version} запущен. Проверка каждые {interval}.")
            }
        }
    }

    /// `(callback id, label)` pairs, one button per row.
    pub fn keyboard(&self) -> Vec<(&'static str, &'static str)> {
        match self.lang {
            Language::En => vec![
                (buttons::CHECK_VERSION, "🔍 Check file version"),
                (buttons::SYNC_NOW, "♻️ Sync now"),
                (buttons::DOWNLOAD_FILE, "📥 Download update"),
                (buttons::CHECK_COMMITS, "📜 Latest commits"),
                (buttons::RELOAD_DEPENDENT, "🔄 Reload dependent bot"),
            ],
            Language::Ru => vec![
                (buttons::CHECK_VERSION, "🔍 Проверить версию файла"),
                (buttons::SYNC_NOW, "♻️ Синхронизировать"),
                (buttons::DOWNLOAD_FILE, "📥 Скачать обновление"),
                (buttons::CHECK_COMMITS, "📜 Последние коммиты"),
                (buttons::RELOAD_DEPENDENT, "🔄 Перезапустить зависимого бота"),
            ],
        }
    }

    pub fn help(&self) -> String {
        match self.lang {
            Language::En => "Commands:\n\
                /start - Welcome screen with buttons\n\
                /check - Compare local and server versions\n\
                /sync - Run a full update cycle now\n\
                /download - Force download of the server file\n\
                /history [hours] - Recent activity (default 24h)\n\
                /commits - Latest commits\n\
                /reload - Send the reload command\n\
                /help - This message"
                .to_string(),
            Language::Ru => "Команды:\n\
                /start - Приветствие и кнопки\n\
                /check - Сравнить локальную и серверную версии\n\
                /sync - Запустить цикл обновления сейчас\n\
                /download - Принудительно скачать файл с сервера\n\
                /history [часы] - Последние события (по умолчанию 24ч)\n\
                /commits - Последние коммиты\n\
                /reload - Отправить команду перезапуска\n\
                /help - Эта справка"
                .to_string(),
        }
    }

    pub fn unknown_command(&self, cmd: &str) -> String {
        match self.lang {
            Language::En => format!("Unknown command: /{cmd}"),
            Language::Ru => format!("Неизвестная команда: /{cmd}"),
        }
    }

    pub fn unauthorized(&self) -> String {
        match self.lang {
            Language::En => "Unauthorized. Contact the bot owner for access.".to_string(),
            Language::Ru => "Нет доступа. Обратитесь к владельцу бота.".to_string(),
        }
    }
}
