//! Conversation message types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// How a message was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Real reply from the backend.
    #[default]
    Ok,
    /// Locally synthesized reply, backend unreachable.
    Demo,
    /// Canned apology after a backend rejection.
    Error,
}

/// Metadata attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Model that produced the reply, when the backend reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Delivery status of the reply.
    #[serde(default)]
    pub status: DeliveryStatus,
}

/// A single message in a conversation transcript.
///
/// Immutable once created; appended to the transcript in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier
    pub id: i64,
    /// Conversation this message belongs to
    pub conversation_id: i64,
    /// The role of the message sender
    pub role: MessageRole,
    /// The content of the message
    pub content: String,
    /// Timestamp when the message was created (RFC 3339)
    pub created_at: String,
    /// Token usage reported for this message
    #[serde(default)]
    pub tokens: i64,
    /// Delivery metadata
    #[serde(default)]
    pub metadata: MessageMetadata,
}

impl Message {
    /// Builds a locally authored user message with a timestamp id.
    pub fn from_user(conversation_id: i64, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            conversation_id,
            role: MessageRole::User,
            content: content.into(),
            created_at: now.to_rfc3339(),
            tokens: 0,
            metadata: MessageMetadata::default(),
        }
    }

    /// Builds an assistant message appended by the controller.
    pub fn from_assistant(
        conversation_id: i64,
        content: impl Into<String>,
        tokens: i64,
        metadata: MessageMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            conversation_id,
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: now.to_rfc3339(),
            tokens,
            metadata,
        }
    }
}
