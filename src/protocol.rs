//! Wire protocol for the soup game server
//!
//! JSON over HTTP POST, two endpoints relative to the configured base URL:
//! `/cmd` for mutating commands and `/update` for polling.

use serde::{Deserialize, Serialize};

/// Endpoint paths
pub mod endpoints {
    pub const COMMAND: &str = "/cmd";
    pub const UPDATE: &str = "/update";
}

/// Command names understood by `/cmd` and `/update`
pub mod commands {
    pub const NEW_GAME: &str = "new_game";
    pub const END_GAME: &str = "end_game";
    pub const ASK: &str = "ask";
    pub const ANSWER: &str = "answer";
    pub const GET_INFO: &str = "get_info";
}

/// Game id sent before any game has been observed. The server never returns it.
pub const NO_GAME_ID: i64 = -1;

/// Status code of a successful command
pub const CODE_OK: i64 = 0;

/// Request body for `/cmd`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl CommandRequest {
    pub fn new_game() -> Self {
        Self::bare(commands::NEW_GAME)
    }

    pub fn end_game() -> Self {
        Self::bare(commands::END_GAME)
    }

    pub fn ask(content: &str, speaker: &str) -> Self {
        Self::with_text(commands::ASK, content, speaker)
    }

    pub fn answer(content: &str, speaker: &str) -> Self {
        Self::with_text(commands::ANSWER, content, speaker)
    }

    fn bare(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            content: None,
            speaker: None,
        }
    }

    fn with_text(cmd: &str, content: &str, speaker: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            content: Some(content.to_string()),
            speaker: Some(speaker.to_string()),
        }
    }
}

/// Response body of `/cmd`
///
/// `code` is required: a reply without it does not decode and is dropped
/// as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub soup_question: Option<String>,
}

impl CommandResponse {
    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }

    /// Text to show the user when the command failed
    pub fn error_text(&self) -> String {
        match self.msg.as_deref().map(str::trim) {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => format!("command failed with code {}", self.code),
        }
    }
}

/// Request body for `/update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub cmd: String,
    pub game_id: i64,
    pub chat_id: u64,
}

impl UpdateRequest {
    pub fn get_info(game_id: i64, chat_id: u64) -> Self {
        Self {
            cmd: commands::GET_INFO.to_string(),
            game_id,
            chat_id,
        }
    }
}

/// One chat line as the server sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireChat {
    pub sayer: String,
    pub content: String,
}

/// Response body of `/update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub game_id: i64,
    pub ai_running: bool,
    #[serde(default)]
    pub current_soup: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_chats: Vec<WireChat>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_command_omits_payload_fields() {
        let json = serde_json::to_value(CommandRequest::end_game()).unwrap();
        assert_eq!(json, serde_json::json!({ "cmd": "end_game" }));
    }

    #[test]
    fn test_ask_carries_content_and_speaker() {
        let json = serde_json::to_value(CommandRequest::ask("Is he alive?", "Mia")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "cmd": "ask", "content": "Is he alive?", "speaker": "Mia" })
        );
    }

    #[test]
    fn test_command_response_requires_code() {
        let parsed = serde_json::from_str::<CommandResponse>(
            r#"{"msg": "New game started.", "soup_question": "Q9"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_command_response_optional_fields() {
        let resp: CommandResponse = serde_json::from_str(r#"{"code": 0}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.msg, None);
        assert_eq!(resp.soup_question, None);

        let resp: CommandResponse =
            serde_json::from_str(r#"{"code": 1, "msg": "Game is not running."}"#).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.error_text(), "Game is not running.");
    }

    #[test]
    fn test_error_text_falls_back_to_code() {
        let resp = CommandResponse {
            code: 3,
            msg: Some("  ".to_string()),
            soup_question: None,
        };
        assert_eq!(resp.error_text(), "command failed with code 3");
    }

    #[test]
    fn test_update_response_defaults() {
        let resp: UpdateResponse =
            serde_json::from_str(r#"{"game_id": 2, "ai_running": false}"#).unwrap();
        assert!(resp.new_chats.is_empty());
        assert!(resp.current_soup.is_none());
    }

    #[test]
    fn test_update_response_null_chats() {
        let resp: UpdateResponse = serde_json::from_str(
            r#"{"game_id": 2, "ai_running": false, "current_soup": null, "new_chats": null}"#,
        )
        .unwrap();
        assert!(resp.new_chats.is_empty());
    }

    #[test]
    fn test_update_response_requires_game_id() {
        let parsed = serde_json::from_str::<UpdateResponse>(r#"{"ai_running": true}"#);
        assert!(parsed.is_err());
    }
}
