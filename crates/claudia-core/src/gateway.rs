//! Backend gateway port.
//!
//! Defines the interface through which the session controller reaches the
//! backend collaborator, decoupling the controller from the concrete HTTP
//! transport. The reqwest implementation lives in `claudia-backend`; tests
//! substitute in-memory mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::{Conversation, Message};
use crate::error::Result;
use crate::user::{NewUser, User};

/// Payload for `POST /api/ai/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub message: String,
    pub conversation_id: i64,
    pub user_id: i64,
}

/// Successful reply from `POST /api/ai/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReply {
    /// Assistant reply text
    pub response: String,
    /// Model that produced the reply
    #[serde(default)]
    pub model: Option<String>,
    /// Backend-side delivery status string (e.g. "success", "demo")
    #[serde(default)]
    pub status: Option<String>,
    /// Token usage for the reply
    #[serde(default)]
    pub tokens: Option<i64>,
}

/// A conversation together with its full transcript, as returned by
/// `GET /api/conversations/{id}`.
#[derive(Debug, Clone)]
pub struct ConversationWithMessages {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// An abstract gateway to the backend collaborator.
///
/// Every method maps to one HTTP call of the backend's REST surface. All
/// methods share the error contract of [`crate::ClaudiaError`]: a
/// `Transport` error means the backend was never reached, `Rejected`
/// means it answered with a non-success status, `Serialization` means the
/// response body was unusable.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Fetches the backend's self-reported AI status string.
    ///
    /// # Returns
    ///
    /// - `Ok(status)`: the raw `status` field of the payload
    /// - `Err(_)`: the backend is unreachable or rejected the call
    async fn ai_status(&self) -> Result<String>;

    /// Lists all known users.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Provisions a new user.
    async fn create_user(&self, new_user: &NewUser) -> Result<User>;

    /// Lists all conversations, most recently updated first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    /// Fetches one conversation with its full transcript.
    async fn fetch_conversation(&self, conversation_id: i64) -> Result<ConversationWithMessages>;

    /// Creates a conversation for the given user.
    async fn create_conversation(&self, user_id: i64, title: &str) -> Result<Conversation>;

    /// Renames a conversation.
    async fn rename_conversation(&self, conversation_id: i64, title: &str) -> Result<Conversation>;

    /// Deletes a conversation.
    async fn delete_conversation(&self, conversation_id: i64) -> Result<()>;

    /// Asks the backend for an assistant reply to a user message.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply>;

    /// Records user feedback on a message. Rating is 1..=5.
    async fn add_feedback(
        &self,
        message_id: i64,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<()>;
}
