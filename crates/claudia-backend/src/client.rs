//! HTTP implementation of the backend gateway.
//!
//! Talks to the Claudia backend's REST surface with a single shared
//! reqwest client. Error mapping follows the controller's needs: send
//! failures become `Transport`, non-2xx responses become `Rejected` with
//! the response body attached, unusable bodies become `Serialization`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use claudia_core::conversation::Conversation;
use claudia_core::error::{ClaudiaError, Result};
use claudia_core::gateway::{
    BackendGateway, ConversationWithMessages, GenerateReply, GenerateRequest,
};
use claudia_core::user::{NewUser, User};

use crate::config::ClaudiaConfig;
use crate::dto::{ConversationDto, MessageDto, StatusDto};

/// Gateway implementation backed by the Claudia REST API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Creates a client against the configured base URL.
    pub fn new(config: &ClaudiaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClaudiaError::transport(e.to_string()))?;
        Self::parse(Self::check(response).await?).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClaudiaError::transport(e.to_string()))?;
        Self::parse(Self::check(response).await?).await
    }

    /// Maps a non-success response to a `Rejected` error carrying the
    /// body the backend answered with.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClaudiaError::rejected(status.as_u16(), error_text));
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| ClaudiaError::Serialization {
            format: "JSON".to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BackendGateway for HttpBackend {
    async fn ai_status(&self) -> Result<String> {
        let status: StatusDto = self.get_json("/ai/status").await?;
        Ok(status.status)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.get_json("/users").await
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User> {
        self.post_json("/users", new_user).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let conversations: Vec<ConversationDto> = self.get_json("/conversations").await?;
        Ok(conversations
            .into_iter()
            .map(ConversationDto::into_domain)
            .collect())
    }

    async fn fetch_conversation(&self, conversation_id: i64) -> Result<ConversationWithMessages> {
        let mut dto: ConversationDto = self
            .get_json(&format!("/conversations/{}", conversation_id))
            .await?;
        let messages: Vec<_> = dto
            .messages
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(MessageDto::into_domain)
            .collect();
        tracing::debug!(
            target: "backend",
            "Fetched conversation {} ({} messages)",
            conversation_id,
            messages.len()
        );
        Ok(ConversationWithMessages {
            conversation: dto.into_domain(),
            messages,
        })
    }

    async fn create_conversation(&self, user_id: i64, title: &str) -> Result<Conversation> {
        #[derive(Serialize)]
        struct CreateConversationRequest<'a> {
            user_id: i64,
            title: &'a str,
        }

        let dto: ConversationDto = self
            .post_json("/conversations", &CreateConversationRequest { user_id, title })
            .await?;
        Ok(dto.into_domain())
    }

    async fn rename_conversation(&self, conversation_id: i64, title: &str) -> Result<Conversation> {
        #[derive(Serialize)]
        struct RenameRequest<'a> {
            title: &'a str,
        }

        let response = self
            .client
            .put(self.url(&format!("/conversations/{}", conversation_id)))
            .json(&RenameRequest { title })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClaudiaError::transport(e.to_string()))?;
        let dto: ConversationDto = Self::parse(Self::check(response).await?).await?;
        Ok(dto.into_domain())
    }

    async fn delete_conversation(&self, conversation_id: i64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/conversations/{}", conversation_id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClaudiaError::transport(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply> {
        self.post_json("/ai/generate", request).await
    }

    async fn add_feedback(
        &self,
        message_id: i64,
        rating: i32,
        comment: Option<&str>,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct FeedbackRequest<'a> {
            rating: i32,
            #[serde(skip_serializing_if = "Option::is_none")]
            comment: Option<&'a str>,
        }

        let response = self
            .client
            .post(self.url(&format!("/messages/{}/feedback", message_id)))
            .json(&FeedbackRequest { rating, comment })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClaudiaError::transport(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}
