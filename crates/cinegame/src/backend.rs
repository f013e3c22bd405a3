//! The backend HTTP API: game creation, result reporting, avatar images.

use std::future::Future;
use std::time::Duration;

use cinegame_protocol::{CreateGameRequest, CreateGameResponse, EndGameRequest};
use serde::Serialize;
use tracing::debug;

use crate::{ErrorKind, SdkConfig};

/// Why a backend request failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// HTTP 401. The token must be refreshed before trying again.
    #[error("backend rejected credentials (HTTP 401)")]
    Authentication,

    /// HTTP 5xx.
    #[error("backend unavailable (HTTP {status})")]
    Server { status: u16 },

    /// Any other non-200 status.
    #[error("backend refused request (HTTP {status})")]
    ClientRequest { status: u16 },

    /// The server could not be reached or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body was not what we expected.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            500..=599 => Self::Server { status },
            _ => Self::ClientRequest { status },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication => Some(401),
            Self::Server { status } | Self::ClientRequest { status } => Some(*status),
            Self::Connection(_) | Self::Decode(_) => None,
        }
    }

    /// Worth retrying as is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Connection(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication => ErrorKind::Authentication,
            Self::Server { .. } | Self::Connection(_) => ErrorKind::TransientBackend,
            Self::ClientRequest { .. } | Self::Decode(_) => ErrorKind::ClientRequest,
        }
    }

    /// The numeric code reported with error events: the HTTP status, or 0
    /// when there was none.
    pub fn code(&self) -> i32 {
        self.status().map(i32::from).unwrap_or(0)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::from_status(status.as_u16())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The game-session endpoints of the backend.
///
/// Implementations must only return `Ok` for an HTTP 200.
pub trait BackendApi: Send + Sync + 'static {
    fn create_game(
        &self,
        request: &CreateGameRequest,
    ) -> impl Future<Output = Result<CreateGameResponse, BackendError>> + Send;

    fn end_game(
        &self,
        request: &EndGameRequest,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Downloads avatar images.
pub trait AvatarFetcher: Send + Sync + 'static {
    fn fetch_avatar(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`BackendApi`] over HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
    webgl: bool,
}

impl HttpBackend {
    pub fn new(config: &SdkConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            webgl: config.webgl,
        })
    }

    /// `{api}/game/{action}`, with `/webgl` appended for WebGL hosts.
    pub fn endpoint(&self, action: &str) -> String {
        let suffix = if self.webgl { "/webgl" } else { "" };
        format!("{}/game/{action}{suffix}", self.api_url)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.endpoint(action);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        debug!(%url, status, "backend response");
        if status != 200 {
            return Err(BackendError::from_status(status));
        }
        Ok(response)
    }
}

impl BackendApi for HttpBackend {
    async fn create_game(
        &self,
        request: &CreateGameRequest,
    ) -> Result<CreateGameResponse, BackendError> {
        let response = self.post("create", request).await?;
        Ok(response.json().await?)
    }

    async fn end_game(&self, request: &EndGameRequest) -> Result<(), BackendError> {
        self.post("end", request).await?;
        Ok(())
    }
}

impl AvatarFetcher for HttpBackend {
    async fn fetch_avatar(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(BackendError::from_status(status));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
