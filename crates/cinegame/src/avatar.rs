//! Avatar identifiers: URL allow-listing, logical names and downloads.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

use crate::{AvatarFetcher, BackendError};

/// Why an avatar identifier was not fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvatarRejection {
    #[error("avatar host {0:?} is not trusted")]
    UntrustedHost(String),
    #[error("malformed avatar URL {0:?}")]
    MalformedUrl(String),
    #[error("unknown avatar {0:?}")]
    UnknownName(String),
}

/// Turns an avatar identifier into a URL to download.
///
/// Absolute `http(s)` URLs must point at a trusted host or a subdomain of
/// one. Anything else is looked up as a logical name in `options`, whose
/// URLs come from the backend and are used as given.
pub fn resolve_avatar_url(
    avatar: &str,
    options: &BTreeMap<String, String>,
    trusted_hosts: &[String],
) -> Result<String, AvatarRejection> {
    let rest = avatar
        .strip_prefix("https://")
        .or_else(|| avatar.strip_prefix("http://"));
    let Some(rest) = rest else {
        return options
            .get(avatar)
            .cloned()
            .ok_or_else(|| AvatarRejection::UnknownName(avatar.to_string()));
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() || authority.contains('@') {
        return Err(AvatarRejection::MalformedUrl(avatar.to_string()));
    }
    let host = authority
        .split(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let trusted = trusted_hosts.iter().any(|t| {
        let t = t.to_ascii_lowercase();
        host == t || host.ends_with(&format!(".{t}"))
    });
    if trusted {
        Ok(avatar.to_string())
    } else {
        Err(AvatarRejection::UntrustedHost(host))
    }
}

/// Mip levels for a full chain down to 1×1, from a PNG header. Images
/// whose size can't be read get 1.
pub fn mip_levels(image: &[u8]) -> u32 {
    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
    if image.len() < 24 || image[..8] != PNG_SIGNATURE || &image[12..16] != b"IHDR" {
        return 1;
    }
    let width = u32::from_be_bytes([image[16], image[17], image[18], image[19]]);
    let height = u32::from_be_bytes([image[20], image[21], image[22], image[23]]);
    let largest = width.max(height);
    if largest == 0 {
        return 1;
    }
    32 - largest.leading_zeros()
}

/// Downloads `url`, retrying up to `retries` more times on connection
/// errors. Other errors end the attempt at once.
pub(crate) async fn fetch_with_retry<F: AvatarFetcher>(
    fetcher: &F,
    url: &str,
    retries: u32,
    delay: Duration,
) -> Result<Vec<u8>, BackendError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch_avatar(url).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.is_connection() && attempt < retries => {
                attempt += 1;
                warn!(%url, attempt, error = %e, "avatar download failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
