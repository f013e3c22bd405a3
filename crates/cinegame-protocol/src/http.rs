//! Request and response bodies of the backend HTTP API.
//!
//! `POST {api}/game/create` hands out a session code plus feature config;
//! `POST {api}/game/end` reports the results. Field names are camelCase on
//! the wire. Response keys this SDK doesn't know are ignored, so the backend
//! can add config without breaking older hosts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::BackendId;

/// Body of `POST {api}/game/create`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub host_name: String,
    pub game_type: String,
    pub mac: String,
    pub device_id: String,
    pub platform: String,
    pub show_id: String,
    pub block_id: String,
    pub device_info: String,
}

/// Body of a 200 response to `POST {api}/game/create`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game_code: String,
    pub game_zone: String,
    /// `host` or `host:port`.
    pub game_server: String,
    pub web_gl_secure: Option<bool>,
    pub credits_for_participating: Option<i64>,
    pub credits_for_supporter_participating: Option<i64>,
    pub credits_for_winning: Option<i64>,
    pub credits_for_supporter_winning: Option<i64>,
    pub max_supporters_per_player: Option<u32>,
    /// Logical avatar name → image URL.
    pub avatar_options: Option<BTreeMap<String, String>>,
    pub wifi_name: Option<String>,
    pub wifi_code: Option<String>,
    /// Milliseconds.
    pub lag_warning_threshold: Option<u32>,
    /// Seconds between lag probes.
    pub lag_monitor_interval: Option<u32>,
    pub lag_samples_per_interval: Option<u32>,
    /// GIF provider key (Giphy).
    #[serde(rename = "_g")]
    pub giphy_key: Option<String>,
    /// GIF provider key (Tenor).
    #[serde(rename = "_t")]
    pub tenor_key: Option<String>,
    pub chat_gif_size: Option<u32>,
    /// Seconds a chat GIF stays on screen.
    pub chat_gif_duration: Option<f32>,
}

/// Body of `POST {api}/game/end`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameRequest {
    pub game_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_points: Option<BTreeMap<BackendId, i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<BackendId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_subgame_wins: Option<BTreeMap<BackendId, u32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_uses_camel_case() {
        let req = CreateGameRequest {
            host_name: "lobby-pc".into(),
            game_type: "quiz".into(),
            device_id: "dev-1".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["hostName"], "lobby-pc");
        assert_eq!(json["gameType"], "quiz");
        assert_eq!(json["deviceId"], "dev-1");
        assert!(json.get("deviceInfo").is_some());
    }

    #[test]
    fn test_create_response_minimal_body() {
        let json = r#"{"gameCode":"ABC123","gameServer":"sfs.example.com","gameZone":"Game","webGlSecure":false}"#;
        let resp: CreateGameResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.game_code, "ABC123");
        assert_eq!(resp.game_server, "sfs.example.com");
        assert_eq!(resp.web_gl_secure, Some(false));
        assert!(resp.max_supporters_per_player.is_none());
    }

    #[test]
    fn test_create_response_ignores_unknown_keys() {
        let json = r#"{
            "gameCode": "X", "gameServer": "s", "gameZone": "z",
            "someFutureFlag": {"nested": true},
            "_g": "giphy-key", "_t": "tenor-key",
            "avatarOptions": {"fox": "https://cdn.example/fox.png"},
            "lagWarningThreshold": 250
        }"#;
        let resp: CreateGameResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.giphy_key.as_deref(), Some("giphy-key"));
        assert_eq!(resp.tenor_key.as_deref(), Some("tenor-key"));
        assert_eq!(resp.lag_warning_threshold, Some(250));
        assert_eq!(
            resp.avatar_options.unwrap()["fox"],
            "https://cdn.example/fox.png"
        );
    }

    #[test]
    fn test_end_request_omits_absent_fields() {
        let req = EndGameRequest {
            game_code: "ABC123".into(),
            winners: Some(vec![BackendId(4), BackendId(9)]),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["gameCode"], "ABC123");
        assert_eq!(json["winners"], serde_json::json!([4, 9]));
        assert!(json.get("userPoints").is_none());
    }

    #[test]
    fn test_end_request_points_keyed_by_id() {
        let mut points = BTreeMap::new();
        points.insert(BackendId(4), 120);
        let req = EndGameRequest {
            game_code: "ABC123".into(),
            user_points: Some(points),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["userPoints"]["4"], 120);
    }
}
