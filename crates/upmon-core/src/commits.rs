//! "Latest commits" listing for the upstream repository.
//!
//! Fetches the newest 100 commits, keeps those authored on the most recent
//! (UTC) day and renders them with times in the configured timezone.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::{fetch::RetryingFetcher, messages::MessageTemplates, Result};

#[derive(Debug, Deserialize)]
struct ApiCommit {
    sha: String,
    commit: ApiCommitBody,
}

#[derive(Debug, Deserialize)]
struct ApiCommitBody {
    message: String,
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    date: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitLine {
    pub short_sha: String,
    pub summary: String,
    pub authored: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitDigest {
    pub date: NaiveDate,
    pub commits: Vec<CommitLine>,
}

pub struct CommitLister {
    fetcher: RetryingFetcher,
    api_url: String,
    repo: String,
    tz: Tz,
}

impl CommitLister {
    pub fn new(fetcher: RetryingFetcher, api_url: &str, repo: &str, tz: Tz) -> Self {
        Self {
            fetcher,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            tz,
        }
    }

    pub async fn latest_day(&self) -> Result<Option<CommitDigest>> {
        let url = format!("{}/repos/{}/commits?per_page=100", self.api_url, self.repo);
        let (body, _) = self.fetcher.fetch_text(&url).await?;
        parse_latest_day(&body)
    }

    /// Rendered message; errors become user-facing text.
    pub async fn render(&self, templates: &MessageTemplates) -> String {
        match self.latest_day().await {
            Ok(Some(digest)) => render_digest(&digest, templates, self.tz),
            Ok(None) => templates.commits_empty(),
            Err(e) => {
                tracing::error!("Failed to list commits for {}: {e}", self.repo);
                templates.commits_failed(&e.to_string())
            }
        }
    }
}

fn parse_latest_day(body: &str) -> Result<Option<CommitDigest>> {
    let raw: Vec<ApiCommit> = serde_json::from_str(body)?;

    let mut commits: Vec<CommitLine> = raw
        .into_iter()
        .filter_map(|c| {
            let authored = DateTime::parse_from_rfc3339(&c.commit.author?.date)
                .ok()?
                .with_timezone(&Utc);
            Some(CommitLine {
                short_sha: c.sha.chars().take(7).collect(),
                summary: c.commit.message.lines().next().unwrap_or("").to_string(),
                authored,
            })
        })
        .collect();

    commits.sort_by(|a, b| b.authored.cmp(&a.authored));

    let Some(latest) = commits.first().map(|c| c.authored.date_naive()) else {
        return Ok(None);
    };
    commits.retain(|c| c.authored.date_naive() == latest);

    Ok(Some(CommitDigest {
        date: latest,
        commits,
    }))
}

pub fn render_digest(digest: &CommitDigest, templates: &MessageTemplates, tz: Tz) -> String {
    let mut lines = vec![templates.commits_header(&digest.date.to_string(), digest.commits.len())];
    for c in &digest.commits {
        lines.push(format!(
            "{} {} at {}",
            c.short_sha,
            c.summary,
            c.authored.with_timezone(&tz).format("%H:%M:%S")
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::{HttpSource, RetryPolicy},
        messages::Language,
    };
    use std::{sync::Arc, time::Duration};

    const BODY: &str = r#"[
      {"sha": "aaaaaaaa1111", "commit": {"message": "X5: tune grind\n\nlong body", "author": {"date": "2026-02-02T08:00:00Z"}}},
      {"sha": "bbbbbbbb2222", "commit": {"message": "X5: bump version", "author": {"date": "2026-02-02T21:15:30Z"}}},
      {"sha": "cccccccc3333", "commit": {"message": "older", "author": {"date": "2026-02-01T23:59:59Z"}}}
    ]"#;

    #[test]
    fn keeps_only_the_latest_day_newest_first() {
        let digest = parse_latest_day(BODY).unwrap().unwrap();
        assert_eq!(digest.date, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        let shas: Vec<_> = digest.commits.iter().map(|c| c.short_sha.as_str()).collect();
        assert_eq!(shas, vec!["bbbbbbb", "aaaaaaa"]);
        assert_eq!(digest.commits[1].summary, "X5: tune grind");
    }

    #[test]
    fn empty_repository_has_no_digest() {
        assert_eq!(parse_latest_day("[]").unwrap(), None);
    }

    #[test]
    fn renders_times_in_configured_timezone() {
        let digest = parse_latest_day(BODY).unwrap().unwrap();
        let text = render_digest(
            &digest,
            &MessageTemplates::new(Language::En),
            chrono_tz::Europe::Moscow,
        );
        assert!(text.starts_with("📜 Latest commits from 2026-02-02 (2 commits)"));
        assert!(text.contains("bbbbbbb X5: bump version at 00:15:30"));
        assert!(text.contains("aaaaaaa X5: tune grind at 11:00:00"));
    }

    #[tokio::test]
    async fn fetches_from_the_github_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/repos/owner/strategies/commits".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let source = Arc::new(HttpSource::new(Duration::from_secs(5), None).unwrap());
        let lister = CommitLister::new(
            RetryingFetcher::new(source, RetryPolicy::once()),
            &server.url(),
            "owner/strategies",
            chrono_tz::UTC,
        );
        let text = lister.render(&MessageTemplates::new(Language::En)).await;

        mock.assert_async().await;
        assert!(text.contains("bbbbbbb X5: bump version at 21:15:30"));
    }
}
