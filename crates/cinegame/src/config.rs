//! SDK configuration, usually read from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use cinegame_chat::DenylistSource;
use cinegame_protocol::CreateGameRequest;
use cinegame_session::SessionConfig;

use crate::ConfigError;

/// Hosts avatar URLs may point at when no others are configured.
pub const DEFAULT_TRUSTED_AVATAR_HOSTS: [&str; 2] = ["cinegame.io", "cinegamecore.blob.core.windows.net"];

/// Everything the host SDK needs to know before the backend answers.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Backend API base, without a trailing `/game`.
    pub api_url: String,
    /// Bearer token. Supplied by whoever logged the host in.
    pub token: Option<String>,
    pub game_type: String,
    pub host_name: String,
    pub device_id: String,
    pub mac: String,
    pub platform: String,
    pub show_id: String,
    pub block_id: String,
    pub device_info: String,
    /// Market code, used to pick the chat denylist.
    pub market: String,
    /// Use the `/webgl` backend endpoints.
    pub webgl: bool,
    pub is_test: bool,
    pub max_players: u32,
    /// Denylist download URL; `{market}` is replaced by [`market`](Self::market).
    pub denylist_url: Option<String>,
    pub denylist_cache: Option<PathBuf>,
    /// Bots to run alongside real players. 0 disables the harness.
    pub bots: usize,
    /// Fixed bot RNG seed, for reproducible runs.
    pub bot_seed: Option<u64>,
    /// Avatar URLs must point at one of these hosts or a subdomain of one.
    pub trusted_avatar_hosts: Vec<String>,
    pub session: SessionConfig,
    /// Delay between create-game attempts after a transient failure.
    pub create_retry_delay: Duration,
    /// Transient create-game failures before game logic is told.
    pub create_escalate_after: u32,
    /// Delay between end-game report attempts.
    pub end_retry_delay: Duration,
    /// Extra avatar download attempts after a connection error.
    pub avatar_retries: u32,
    pub avatar_retry_delay: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.cinegame.io/api".to_string(),
            token: None,
            game_type: String::new(),
            host_name: "host".to_string(),
            device_id: String::new(),
            mac: String::new(),
            platform: std::env::consts::OS.to_string(),
            show_id: String::new(),
            block_id: String::new(),
            device_info: String::new(),
            market: "dk".to_string(),
            webgl: false,
            is_test: false,
            max_players: 100,
            denylist_url: None,
            denylist_cache: None,
            bots: 0,
            bot_seed: None,
            trusted_avatar_hosts: DEFAULT_TRUSTED_AVATAR_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            session: SessionConfig::default(),
            create_retry_delay: Duration::from_secs(1),
            create_escalate_after: 3,
            end_retry_delay: Duration::from_secs(1),
            avatar_retries: 3,
            avatar_retry_delay: Duration::from_millis(500),
        }
    }
}

impl SdkConfig {
    /// Reads `CINEGAME_*` variables from the process environment. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let text = |key: &str, slot: &mut String| {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        };
        text("CINEGAME_API_URL", &mut config.api_url);
        text("CINEGAME_GAME_TYPE", &mut config.game_type);
        text("CINEGAME_HOST_NAME", &mut config.host_name);
        text("CINEGAME_DEVICE_ID", &mut config.device_id);
        text("CINEGAME_MAC", &mut config.mac);
        text("CINEGAME_PLATFORM", &mut config.platform);
        text("CINEGAME_SHOW_ID", &mut config.show_id);
        text("CINEGAME_BLOCK_ID", &mut config.block_id);
        text("CINEGAME_MARKET", &mut config.market);

        config.token = lookup("CINEGAME_TOKEN").filter(|t| !t.is_empty());
        config.denylist_url = lookup("CINEGAME_DENYLIST_URL").filter(|u| !u.is_empty());
        config.denylist_cache = lookup("CINEGAME_DENYLIST_CACHE")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if let Some(value) = lookup("CINEGAME_WEBGL") {
            config.webgl = parse_bool("CINEGAME_WEBGL", &value)?;
        }
        if let Some(value) = lookup("CINEGAME_IS_TEST") {
            config.is_test = parse_bool("CINEGAME_IS_TEST", &value)?;
        }
        if let Some(value) = lookup("CINEGAME_BOTS") {
            config.bots = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CINEGAME_BOTS",
                value,
            })?;
        }
        if let Some(value) = lookup("CINEGAME_TRUSTED_AVATAR_HOSTS") {
            config.trusted_avatar_hosts = value
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }
        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_game_type(mut self, game_type: impl Into<String>) -> Self {
        self.game_type = game_type.into();
        self
    }

    pub fn with_bots(mut self, count: usize, seed: Option<u64>) -> Self {
        self.bots = count;
        self.bot_seed = seed;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// The create-game body this host sends.
    pub fn create_request(&self) -> CreateGameRequest {
        CreateGameRequest {
            host_name: self.host_name.clone(),
            game_type: self.game_type.clone(),
            mac: self.mac.clone(),
            device_id: self.device_id.clone(),
            platform: self.platform.clone(),
            show_id: self.show_id.clone(),
            block_id: self.block_id.clone(),
            device_info: self.device_info.clone(),
        }
    }

    pub fn denylist_source(&self) -> DenylistSource {
        DenylistSource {
            url: self
                .denylist_url
                .as_ref()
                .map(|url| url.replace("{market}", &self.market)),
            cache_path: self.denylist_cache.clone(),
            ..DenylistSource::default()
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
