//! Conversation domain model.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Title given to a conversation before the first exchange names it.
pub const DEFAULT_TITLE: &str = "Nova Conversa";

/// Maximum derived-title length before the ellipsis is applied.
const TITLE_MAX_CHARS: usize = 50;

/// A single conversation thread.
///
/// Created locally when the user requests a new conversation and/or
/// mirrored from the backend. The message transcript itself is held by
/// the session controller; the `message_count` here is whatever the
/// backend last reported for its list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Human-readable title, auto-derived from the first user message
    /// while it still carries the default
    pub title: String,
    /// Timestamp when the conversation was created (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Timestamp when the conversation was last updated (RFC 3339)
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Whether the conversation has been archived
    #[serde(default)]
    pub is_archived: bool,
    /// Message count as last reported by the backend
    #[serde(default)]
    pub message_count: i64,
}

impl Conversation {
    /// Builds a conversation that exists only on this client.
    ///
    /// Used when the create call cannot be persisted: the conversation is
    /// optimistically usable and carries a millisecond-timestamp id, the
    /// same scheme the backend-less client used.
    pub fn new_local(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis(),
            user_id,
            title: DEFAULT_TITLE.to_string(),
            created_at: Some(now.to_rfc3339()),
            updated_at: Some(now.to_rfc3339()),
            is_archived: false,
            message_count: 0,
        }
    }

    /// Whether the title is still the placeholder.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }
}

/// Derives a conversation title from the first user message.
///
/// The text is used verbatim up to 50 characters; longer texts are cut at
/// 50 characters and marked with an ellipsis.
pub fn derive_title(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}
