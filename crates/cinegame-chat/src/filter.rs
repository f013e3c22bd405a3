//! Denylist-based profanity masking and where the denylist comes from.

use std::path::PathBuf;
use std::time::Duration;

use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, error, info, warn};

use crate::ChatError;

/// Masks denylisted words with `*`, one per character.
///
/// Matching is case-insensitive and whole-word. A disabled filter passes
/// text through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfanityFilter {
    pattern: Option<Regex>,
}

impl ProfanityFilter {
    /// A filter that masks nothing.
    pub fn disabled() -> Self {
        Self { pattern: None }
    }

    /// Builds a filter from a list of words. An empty list gives a disabled
    /// filter.
    pub fn from_words<I, S>(words: I) -> Result<Self, ChatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(Self::disabled());
        }
        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Parses a denylist document: one word per line, blank lines and
    /// `#` comments skipped.
    pub fn from_denylist(text: &str) -> Result<Self, ChatError> {
        Self::from_words(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn filter(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &Captures<'_>| "*".repeat(caps[0].chars().count()))
                .into_owned(),
            None => text.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Where the denylist is fetched from and cached.
#[derive(Debug, Clone)]
pub struct DenylistSource {
    /// Per-market download URL. `None` skips straight to the cache.
    pub url: Option<String>,
    /// Local copy refreshed after each successful download.
    pub cache_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for DenylistSource {
    fn default() -> Self {
        Self {
            url: None,
            cache_path: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl DenylistSource {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }
}

/// Which source the active filter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrigin {
    Remote,
    Cache,
    /// Neither source worked; chat is unfiltered.
    Unavailable,
}

/// Loads the denylist: download first, then the cached copy. When both
/// fail the returned filter is disabled and the origin says so.
pub async fn load_filter(source: &DenylistSource) -> (ProfanityFilter, FilterOrigin) {
    if let Some(url) = &source.url {
        match download(url, source.timeout).await {
            Ok(text) => match ProfanityFilter::from_denylist(&text) {
                Ok(filter) => {
                    if let Some(path) = &source.cache_path {
                        if let Err(e) = tokio::fs::write(path, &text).await {
                            warn!(path = %path.display(), error = %e, "failed to refresh denylist cache");
                        }
                    }
                    info!(%url, "chat denylist loaded");
                    return (filter, FilterOrigin::Remote);
                }
                Err(e) => warn!(%url, error = %e, "downloaded denylist is invalid"),
            },
            Err(e) => warn!(%url, error = %e, "denylist download failed"),
        }
    }

    if let Some(path) = &source.cache_path {
        match read_cache(path).await {
            Ok(filter) => {
                info!(path = %path.display(), "chat denylist loaded from cache");
                return (filter, FilterOrigin::Cache);
            }
            Err(e) => debug!(path = %path.display(), error = %e, "no usable denylist cache"),
        }
    }

    error!("chat filter unavailable: chat text will NOT be filtered");
    (ProfanityFilter::disabled(), FilterOrigin::Unavailable)
}

async fn download(url: &str, timeout: Duration) -> Result<String, ChatError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ChatError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

async fn read_cache(path: &std::path::Path) -> Result<ProfanityFilter, ChatError> {
    let text = tokio::fs::read_to_string(path).await?;
    ProfanityFilter::from_denylist(&text)
}
