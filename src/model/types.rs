use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the conversation as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Inbound body of `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub conversation_id: Option<String>,
    pub history: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Reads the request fields from a JSON body.
    ///
    /// `message` and `conversationId` are only taken when they are non-empty
    /// strings; anything else reads as absent. A present but malformed
    /// `history` is rejected.
    pub fn from_json(body: &Value) -> Result<Self, RelayError> {
        let message = non_empty_str(body.get("message"));
        let conversation_id = non_empty_str(body.get("conversationId"));

        let history = match body.get("history") {
            None | Some(Value::Null) => Vec::new(),
            Some(raw) => serde_json::from_value::<Vec<ChatMessage>>(raw.clone())
                .map_err(|e| RelayError::bad_request(&format!("invalid history: {}", e)))?,
        };

        Ok(Self {
            message,
            conversation_id,
            history,
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
