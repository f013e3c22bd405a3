//! Error types for chat filtering.

/// Why a denylist could not be built or fetched.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid denylist pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("denylist request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("denylist request returned HTTP {0}")]
    Status(u16),

    #[error("denylist cache: {0}")]
    Cache(#[from] std::io::Error),
}
