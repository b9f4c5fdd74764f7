//! Wire DTOs for the backend's REST payloads.
//!
//! The backend speaks in its own field vocabulary (`is_active`, free-form
//! metadata dicts, `"success"` delivery status); these types absorb that
//! and convert into the domain models the rest of the client uses.

use serde::Deserialize;
use serde_json::Value;

use claudia_core::conversation::{
    Conversation, DeliveryStatus, Message, MessageMetadata, MessageRole,
};

/// Payload of `GET /api/ai/status`. Extra fields (model info,
/// capabilities) are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusDto {
    pub status: String,
}

/// A conversation as the backend serializes it.
#[derive(Debug, Deserialize)]
pub(crate) struct ConversationDto {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub message_count: i64,
    /// Present only on `GET /api/conversations/{id}`
    #[serde(default)]
    pub messages: Option<Vec<MessageDto>>,
}

fn default_true() -> bool {
    true
}

impl ConversationDto {
    pub fn into_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_archived: !self.is_active,
            message_count: self.message_count,
        }
    }
}

/// A message as the backend serializes it. Metadata is a free-form dict
/// holding `model` and `status` when present.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageDto {
    pub id: i64,
    #[serde(default)]
    pub conversation_id: i64,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub tokens: i64,
    #[serde(default)]
    pub metadata: Value,
}

impl MessageDto {
    pub fn into_domain(self) -> Message {
        let role = match self.role.as_str() {
            "user" => MessageRole::User,
            _ => MessageRole::Assistant,
        };
        let model = self
            .metadata
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status = self
            .metadata
            .get("status")
            .and_then(Value::as_str)
            .map(delivery_status_from_wire)
            .unwrap_or_default();

        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role,
            content: self.content,
            created_at: self.created_at.unwrap_or_default(),
            tokens: self.tokens,
            metadata: MessageMetadata { model, status },
        }
    }
}

/// The backend reports `"success"` where the client records `ok`.
fn delivery_status_from_wire(status: &str) -> DeliveryStatus {
    match status {
        "demo" => DeliveryStatus::Demo,
        "error" => DeliveryStatus::Error,
        _ => DeliveryStatus::Ok,
    }
}
