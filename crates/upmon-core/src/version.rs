//! Version token extraction.
//!
//! The monitored artifact carries its version in a line like
//! `return "v15.1.204"`. Extraction never fails: problems are folded into
//! sentinel tokens so a check cycle can still proceed.

use std::{fmt, io::ErrorKind, path::Path, sync::OnceLock};

use regex::Regex;
use tracing::warn;

/// Version string pulled out of an artifact, or the reason there is none.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionToken {
    Version(String),
    /// Content was read but no version line matched.
    Unknown,
    /// File missing, or shorter than the configured line number.
    NotFound,
    /// Reading or decoding the file failed.
    ExtractionError,
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionToken::Version(v) => f.write_str(v),
            VersionToken::Unknown => f.write_str("Unknown version"),
            VersionToken::NotFound => f.write_str("File not found"),
            VersionToken::ExtractionError => f.write_str("Version extraction error"),
        }
    }
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"return\s+['"](v[\d.]+)['"]"#).expect("version regex"))
}

/// First `return "v..."` match anywhere in `content`.
pub fn extract_from_content(content: &str) -> VersionToken {
    version_re()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| VersionToken::Version(m.as_str().to_string()))
        .unwrap_or(VersionToken::Unknown)
}

/// Extract from exactly the 1-based `line_number` of the file at `path`.
pub async fn extract_from_file(path: &Path, line_number: usize) -> VersionToken {
    if line_number == 0 {
        return VersionToken::NotFound;
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return VersionToken::NotFound,
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            return VersionToken::ExtractionError;
        }
    };

    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => {
            warn!("{} is not valid UTF-8: {e}", path.display());
            return VersionToken::ExtractionError;
        }
    };

    match text.lines().nth(line_number - 1) {
        Some(line) => extract_from_content(line.trim()),
        None => VersionToken::NotFound,
    }
}
