//! The active game session and what game logic hands back at the end.

use std::collections::BTreeMap;

use cinegame_protocol::{BackendId, CreateGameResponse, EndGameRequest};
use cinegame_session::LagConfig;
use tokio::time::Instant;

/// Credits the backend awards, as configured for this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewards {
    pub participating: Option<i64>,
    pub supporter_participating: Option<i64>,
    pub winning: Option<i64>,
    pub supporter_winning: Option<i64>,
}

/// Optional features switched on by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub wifi_name: Option<String>,
    pub wifi_code: Option<String>,
    pub giphy_key: Option<String>,
    pub tenor_key: Option<String>,
    pub chat_gif_size: Option<u32>,
    /// Seconds.
    pub chat_gif_duration: Option<f32>,
}

/// One backend-issued game session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub code: String,
    pub server: String,
    pub zone: String,
    pub secure: bool,
    pub max_players: u32,
    /// Total spectator slots: supporters per player × players.
    pub max_spectators: u32,
    pub rewards: Rewards,
    pub features: Features,
    pub created_at: Instant,
}

impl SessionInfo {
    pub(crate) fn from_response(
        response: &CreateGameResponse,
        max_players: u32,
        now: Instant,
    ) -> Self {
        let supporters = response.max_supporters_per_player.unwrap_or(0);
        Self {
            code: response.game_code.clone(),
            server: response.game_server.clone(),
            zone: response.game_zone.clone(),
            secure: response.web_gl_secure.unwrap_or(false),
            max_players,
            max_spectators: supporters.saturating_mul(max_players),
            rewards: Rewards {
                participating: response.credits_for_participating,
                supporter_participating: response.credits_for_supporter_participating,
                winning: response.credits_for_winning,
                supporter_winning: response.credits_for_supporter_winning,
            },
            features: Features {
                wifi_name: response.wifi_name.clone(),
                wifi_code: response.wifi_code.clone(),
                giphy_key: response.giphy_key.clone(),
                tenor_key: response.tenor_key.clone(),
                chat_gif_size: response.chat_gif_size,
                chat_gif_duration: response.chat_gif_duration,
            },
            created_at: now,
        }
    }
}

/// Lag monitor settings from the response, or `None` when the backend
/// sent none of them.
pub(crate) fn lag_config(response: &CreateGameResponse) -> Option<LagConfig> {
    if response.lag_warning_threshold.is_none()
        && response.lag_monitor_interval.is_none()
        && response.lag_samples_per_interval.is_none()
    {
        return None;
    }
    let mut lag = LagConfig::default();
    if let Some(ms) = response.lag_warning_threshold {
        lag.warning_threshold = std::time::Duration::from_millis(u64::from(ms));
    }
    if let Some(secs) = response.lag_monitor_interval.filter(|s| *s > 0) {
        lag.interval = std::time::Duration::from_secs(u64::from(secs));
    }
    if let Some(samples) = response.lag_samples_per_interval.filter(|s| *s > 0) {
        lag.samples = samples;
    }
    Some(lag)
}

/// Results reported when a game ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameResults {
    pub points: Option<BTreeMap<BackendId, i64>>,
    pub winners: Option<Vec<BackendId>>,
    /// Mini-game wins per participant.
    pub subgame_wins: Option<BTreeMap<BackendId, u32>>,
}

impl GameResults {
    pub(crate) fn into_request(self, game_code: String) -> EndGameRequest {
        EndGameRequest {
            game_code,
            user_points: self.points,
            winners: self.winners,
            user_subgame_wins: self.subgame_wins,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn response() -> CreateGameResponse {
        CreateGameResponse {
            game_code: "ABC123".into(),
            game_server: "sfs.example.com".into(),
            game_zone: "Game".into(),
            web_gl_secure: Some(false),
            max_supporters_per_player: Some(2),
            credits_for_winning: Some(50),
            ..Default::default()
        }
    }

    #[test]
    fn test_session_info_spectators_scale_with_players() {
        let info = SessionInfo::from_response(&response(), 10, Instant::now());
        assert_eq!(info.code, "ABC123");
        assert_eq!(info.max_spectators, 20);
        assert_eq!(info.rewards.winning, Some(50));
        assert!(!info.secure);
    }

    #[test]
    fn test_session_info_secure_flag() {
        let mut resp = response();
        let now = Instant::now();
        assert!(!SessionInfo::from_response(&resp, 10, now).secure);
        resp.web_gl_secure = Some(true);
        assert!(SessionInfo::from_response(&resp, 10, now).secure);
        resp.web_gl_secure = None;
        assert!(!SessionInfo::from_response(&resp, 10, now).secure);
    }

    #[test]
    fn test_lag_config_absent_and_partial() {
        assert!(lag_config(&response()).is_none());

        let mut resp = response();
        resp.lag_warning_threshold = Some(250);
        let lag = lag_config(&resp).unwrap();
        assert_eq!(lag.warning_threshold, Duration::from_millis(250));
        assert_eq!(lag.interval, LagConfig::default().interval);
    }

    #[test]
    fn test_results_into_request() {
        let results = GameResults {
            winners: Some(vec![BackendId(4)]),
            ..Default::default()
        };
        let req = results.into_request("ABC123".into());
        assert_eq!(req.game_code, "ABC123");
        assert_eq!(req.winners, Some(vec![BackendId(4)]));
        assert!(req.user_points.is_none());
    }
}
