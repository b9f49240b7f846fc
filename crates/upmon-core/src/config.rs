use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono_tz::Tz;

use crate::{
    domain::{ChatId, Credential, Destination},
    errors::Error,
    fetch::RetryPolicy,
    messages::Language,
    Result,
};

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_RELOAD_COMMAND: &str = "/reload_config";
const RAW_GITHUB_BASE: &str = "https://raw.githubusercontent.com";

/// Typed configuration, loaded once at startup and shared as `Arc<Config>`.
#[derive(Clone, Debug)]
pub struct Config {
    // Notification sink
    pub notification: Destination,
    pub dependent: Destination,
    pub reload_command: String,
    pub allowed_users: Vec<i64>,

    // Local artifact
    pub local_artifact_path: PathBuf,
    pub local_artifact_line: usize,

    // Remote artifact
    pub remote_base_url: String,
    pub remote_relative_path: String,
    pub artifact_url: Option<String>,
    pub remote_token: Option<String>,
    pub request_timeout: Duration,

    // Scheduling / retries
    pub check_interval: Duration,
    pub retry_limit: u32,
    pub retry_delay: Duration,

    // Presentation
    pub timezone: Tz,
    pub language: Language,
    pub history_limit: usize,

    // Commit listing
    pub github_repo: Option<String>,
    pub github_api_url: String,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required env vars
        let telegram_token = require(&get, "TELEGRAM_TOKEN")?;
        let chat_id = parse_chat_id("CHAT_ID", &require(&get, "CHAT_ID")?)?;

        let dependent_token = get("DEPENDENT_BOT_TOKEN")
            .or_else(|| get("FREQTRADE_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config(
                    "DEPENDENT_BOT_TOKEN environment variable is required".to_string(),
                )
            })?;
        let dependent_chat_id = match get("DEPENDENT_CHAT_ID").or_else(|| get("FREQTRADE_CHAT_ID"))
        {
            Some(raw) => parse_chat_id("DEPENDENT_CHAT_ID", &raw)?,
            None => chat_id,
        };

        let local_artifact_path = PathBuf::from(require(&get, "LOCAL_FILE_PATH")?);
        let local_artifact_line = parse_required::<usize>(&get, "LINE_NUMBER")?;
        if local_artifact_line == 0 {
            return Err(Error::Config("LINE_NUMBER must be >= 1".to_string()));
        }

        // Remote location: explicit base URL wins; otherwise derive it from REPO_URL.
        let repo = get("REPO_URL").map(|r| normalize_repo(&r));
        let branch = get("REMOTE_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        let remote_base_url = match (get("REMOTE_BASE_URL"), repo.as_deref()) {
            (Some(base), _) => base.trim_end_matches('/').to_string(),
            (None, Some(repo)) => format!("{RAW_GITHUB_BASE}/{repo}/{branch}"),
            (None, None) => {
                return Err(Error::Config(
                    "REMOTE_BASE_URL (or REPO_URL) environment variable is required".to_string(),
                ))
            }
        };
        let remote_relative_path = require(&get, "REMOTE_FILE_PATH")?
            .trim_start_matches('/')
            .to_string();
        let artifact_url = get("FILE_URL");
        let remote_token = get("REMOTE_TOKEN");
        let request_timeout =
            Duration::from_secs(parse_optional::<u64>(&get, "REQUEST_TIMEOUT_SECS")?.unwrap_or(30));

        let check_interval_secs = parse_required::<u64>(&get, "CHECK_INTERVAL")?;
        if check_interval_secs == 0 {
            return Err(Error::Config("CHECK_INTERVAL must be > 0".to_string()));
        }
        let retry_limit = parse_required::<u32>(&get, "RETRY_LIMIT")?;
        if retry_limit == 0 {
            return Err(Error::Config("RETRY_LIMIT must be >= 1".to_string()));
        }
        let retry_delay = Duration::from_secs(parse_required::<u64>(&get, "RETRY_DELAY")?);

        let tz_raw = require(&get, "TIMEZONE")?;
        let timezone = tz_raw
            .trim()
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("invalid TIMEZONE {tz_raw:?}: {e}")))?;

        let language = match get("LANGUAGE") {
            Some(raw) => Language::parse(&raw)
                .ok_or_else(|| Error::Config(format!("unsupported LANGUAGE: {raw}")))?,
            None => Language::En,
        };

        let reload_command =
            get("RELOAD_COMMAND").unwrap_or_else(|| DEFAULT_RELOAD_COMMAND.to_string());
        let allowed_users = parse_csv_i64(get("ALLOWED_USERS"));
        let history_limit = parse_optional::<usize>(&get, "HISTORY_LIMIT")?
            .unwrap_or(100)
            .max(1);

        let github_repo = get("GITHUB_REPO").map(|r| normalize_repo(&r)).or(repo);
        let github_api_url = get("GITHUB_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string());

        Ok(Self {
            notification: Destination {
                chat_id,
                credential: Credential::new(telegram_token),
            },
            dependent: Destination {
                chat_id: dependent_chat_id,
                credential: Credential::new(dependent_token),
            },
            reload_command,
            allowed_users,
            local_artifact_path,
            local_artifact_line,
            remote_base_url,
            remote_relative_path,
            artifact_url,
            remote_token,
            request_timeout,
            check_interval: Duration::from_secs(check_interval_secs),
            retry_limit,
            retry_delay,
            timezone,
            language,
            history_limit,
            github_repo,
            github_api_url,
        })
    }

    /// URL whose text is parsed for the remote version.
    pub fn remote_content_url(&self) -> String {
        format!("{}/{}", self.remote_base_url, self.remote_relative_path)
    }

    /// URL the artifact is downloaded from; defaults to the content URL.
    pub fn artifact_download_url(&self) -> String {
        self.artifact_url
            .clone()
            .unwrap_or_else(|| self.remote_content_url())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_limit, self.retry_delay)
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn parse_required<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<T> {
    let raw = require(get, key)?;
    raw.trim()
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn parse_optional<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
        None => Ok(None),
    }
}

fn parse_chat_id(key: &str, raw: &str) -> Result<ChatId> {
    raw.trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::Config(format!("{key} must be a numeric chat id, got {raw:?}")))
}

/// Accept `owner/name`, `https://github.com/owner/name(.git)`.
fn normalize_repo(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let stripped = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .unwrap_or(trimmed);
    stripped.trim_end_matches(".git").to_string()
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("TELEGRAM_TOKEN", "123:abc".to_string()),
            ("CHAT_ID", "-1001".to_string()),
            ("FREQTRADE_BOT_TOKEN", "456:def".to_string()),
            ("LOCAL_FILE_PATH", "/tmp/strategy.py".to_string()),
            ("LINE_NUMBER", "69".to_string()),
            ("REPO_URL", "iterativv/NostalgiaForInfinity".to_string()),
            ("REMOTE_FILE_PATH", "NostalgiaForInfinityX5.py".to_string()),
            ("CHECK_INTERVAL", "600".to_string()),
            ("RETRY_LIMIT", "3".to_string()),
            ("RETRY_DELAY", "5".to_string()),
            ("TIMEZONE", "Europe/Moscow".to_string()),
        ])
    }

    pub(crate) fn config_from(env: &HashMap<&'static str, String>) -> Result<Config> {
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn loads_required_settings_and_defaults() {
        let cfg = config_from(&base_env()).unwrap();
        assert_eq!(cfg.notification.chat_id, ChatId(-1001));
        assert_eq!(cfg.notification.credential.expose(), "123:abc");
        // Dependent chat falls back to CHAT_ID.
        assert_eq!(cfg.dependent.chat_id, ChatId(-1001));
        assert_eq!(cfg.dependent.credential.expose(), "456:def");
        assert_eq!(cfg.local_artifact_line, 69);
        assert_eq!(
            cfg.remote_content_url(),
            "https://raw.githubusercontent.com/iterativv/NostalgiaForInfinity/main/NostalgiaForInfinityX5.py"
        );
        assert_eq!(cfg.artifact_download_url(), cfg.remote_content_url());
        assert_eq!(cfg.check_interval, Duration::from_secs(600));
        assert_eq!(cfg.retry_policy(), RetryPolicy::new(3, Duration::from_secs(5)));
        assert_eq!(cfg.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(cfg.language, Language::En);
        assert_eq!(cfg.reload_command, "/reload_config");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(
            cfg.github_repo.as_deref(),
            Some("iterativv/NostalgiaForInfinity")
        );
    }

    #[test]
    fn explicit_base_url_and_file_url_win() {
        let mut env = base_env();
        env.insert("REMOTE_BASE_URL", "http://mirror.local/files/".to_string());
        env.insert("FILE_URL", "http://mirror.local/dl/x5.py".to_string());
        env.insert("DEPENDENT_CHAT_ID", "42".to_string());
        env.insert("LANGUAGE", "ru".to_string());
        let cfg = config_from(&env).unwrap();
        assert_eq!(
            cfg.remote_content_url(),
            "http://mirror.local/files/NostalgiaForInfinityX5.py"
        );
        assert_eq!(cfg.artifact_download_url(), "http://mirror.local/dl/x5.py");
        assert_eq!(cfg.dependent.chat_id, ChatId(42));
        assert_eq!(cfg.language, Language::Ru);
    }

    #[test]
    fn missing_required_setting_is_a_config_error() {
        for key in ["TELEGRAM_TOKEN", "CHAT_ID", "LOCAL_FILE_PATH", "TIMEZONE", "RETRY_LIMIT"] {
            let mut env = base_env();
            env.remove(key);
            let err = config_from(&env).unwrap_err();
            assert!(
                matches!(&err, Error::Config(msg) if msg.contains(key)),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn rejects_invalid_values() {
        let mut env = base_env();
        env.insert("TIMEZONE", "Mars/Olympus".to_string());
        assert!(matches!(config_from(&env), Err(Error::Config(_))));

        let mut env = base_env();
        env.insert("LINE_NUMBER", "0".to_string());
        assert!(matches!(config_from(&env), Err(Error::Config(_))));

        let mut env = base_env();
        env.insert("RETRY_LIMIT", "many".to_string());
        assert!(matches!(config_from(&env), Err(Error::Config(_))));

        let mut env = base_env();
        env.remove("REPO_URL");
        assert!(matches!(config_from(&env), Err(Error::Config(_))));
    }

    #[test]
    fn normalizes_github_repo_urls() {
        assert_eq!(normalize_repo("https://github.com/a/b.git"), "a/b");
        assert_eq!(normalize_repo("a/b/"), "a/b");
    }
}
