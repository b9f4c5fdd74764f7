//! Session controller.
//!
//! Single source of truth for session state: the conversation list, the
//! active conversation, its transcript, the resolved user, and the
//! backend status. Every state transition goes through here, and no
//! backend failure escapes as an error; each one degrades to a silent
//! no-op or a synthesized transcript entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use claudia_backend::ClaudiaConfig;
use claudia_core::BackendStatus;
use claudia_core::conversation::{
    Conversation, DEFAULT_TITLE, DeliveryStatus, Message, MessageMetadata, derive_title,
};
use claudia_core::gateway::{BackendGateway, GenerateRequest};
use claudia_core::user::{NewUser, User};

/// Token estimate attached to synthesized demo replies.
const DEMO_REPLY_TOKENS: i64 = 45;

/// Canned apology appended when the backend rejected a generate call.
const ERROR_REPLY: &str =
    "Sorry, something went wrong while processing your message. Please try again.";

/// Canned demo reply echoing the user's text. Used when the backend is
/// unreachable so the conversation stays alive offline.
fn demo_reply_text(text: &str) -> String {
    format!(
        "Thanks for your message! You said: \"{}\". I'm running in demo mode, \
         so this is a simulated reply. Once the backend is reachable I'll answer \
         with a real language model!",
        text
    )
}

/// Resets the sending flag when a send finishes, on every exit path.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Mediates every session state transition and reconciles optimistic
/// local updates with backend responses or fallback behavior.
///
/// Presentation reads cloned snapshots and calls back into the
/// operations here; it never mutates shared state directly. Sends are
/// serialized: while one is in flight, further sends are ignored.
pub struct SessionController {
    backend: Arc<dyn BackendGateway>,
    config: ClaudiaConfig,
    user: RwLock<Option<User>>,
    conversations: RwLock<Vec<Conversation>>,
    active: RwLock<Option<Conversation>>,
    messages: RwLock<Vec<Message>>,
    status: RwLock<BackendStatus>,
    sending: AtomicBool,
}

impl SessionController {
    /// Creates a controller over the given gateway.
    pub fn new(backend: Arc<dyn BackendGateway>, config: ClaudiaConfig) -> Self {
        Self {
            backend,
            config,
            user: RwLock::new(None),
            conversations: RwLock::new(Vec::new()),
            active: RwLock::new(None),
            messages: RwLock::new(Vec::new()),
            status: RwLock::new(BackendStatus::Connecting),
            sending: AtomicBool::new(false),
        }
    }

    /// Runs the startup sequence: status check, user resolution,
    /// conversation list load. Message sending is permitted afterwards.
    pub async fn initialize(&self) {
        self.check_backend_status().await;
        self.ensure_user().await;
        self.load_conversations().await;
    }

    /// Checks backend reachability and updates the status field.
    ///
    /// Mutates nothing but the status: a reachable backend maps its
    /// reported state to online/demo, any failure maps to offline.
    pub async fn check_backend_status(&self) -> BackendStatus {
        let status = match self.backend.ai_status().await {
            Ok(reported) => BackendStatus::from_report(&reported),
            Err(e) => {
                tracing::debug!(target: "controller", "Status check failed: {}", e);
                BackendStatus::Offline
            }
        };
        *self.status.write().await = status;
        status
    }

    /// Resolves the session user: first existing user, else a freshly
    /// provisioned default one, else the local fallback. Idempotent.
    pub async fn ensure_user(&self) -> User {
        if let Some(user) = self.user.read().await.clone() {
            return user;
        }

        let resolved = match self.resolve_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(target: "controller", "Using local fallback user: {}", e);
                User::local_fallback()
            }
        };

        *self.user.write().await = Some(resolved.clone());
        resolved
    }

    async fn resolve_user(&self) -> claudia_core::Result<User> {
        let users = self.backend.list_users().await?;
        if let Some(user) = users.into_iter().next() {
            return Ok(user);
        }
        self.backend.create_user(&NewUser::default()).await
    }

    /// Refreshes the conversation list. On failure the existing list is
    /// left unchanged.
    pub async fn load_conversations(&self) {
        match self.backend.list_conversations().await {
            Ok(conversations) => *self.conversations.write().await = conversations,
            Err(e) => {
                tracing::warn!(target: "controller", "Could not load conversations: {}", e);
            }
        }
    }

    /// Creates a conversation with the default title, makes it active and
    /// clears the transcript.
    ///
    /// Requires a resolved user (no-op otherwise). When the persist call
    /// fails the conversation still exists locally and stays usable.
    pub async fn create_conversation(&self) -> Option<Conversation> {
        let Some(user) = self.user.read().await.clone() else {
            tracing::debug!(target: "controller", "No resolved user, skipping conversation creation");
            return None;
        };

        let conversation = match self.backend.create_conversation(user.id, DEFAULT_TITLE).await {
            Ok(conversation) => conversation,
            Err(e) => {
                tracing::warn!(target: "controller", "Conversation not persisted, keeping it local: {}", e);
                Conversation::new_local(user.id)
            }
        };

        self.conversations.write().await.insert(0, conversation.clone());
        *self.active.write().await = Some(conversation.clone());
        self.messages.write().await.clear();
        Some(conversation)
    }

    /// Makes the given conversation active and loads its transcript,
    /// replacing the in-memory message list (empty on failure).
    pub async fn select_conversation(&self, conversation: &Conversation) {
        *self.active.write().await = Some(conversation.clone());

        let messages = match self.backend.fetch_conversation(conversation.id).await {
            Ok(detail) => detail.messages,
            Err(e) => {
                tracing::warn!(target: "controller", "Could not load messages for {}: {}", conversation.id, e);
                Vec::new()
            }
        };

        // Discard a stale result if the selection moved on meanwhile.
        let still_active =
            self.active.read().await.as_ref().map(|c| c.id) == Some(conversation.id);
        if still_active {
            *self.messages.write().await = messages;
        }
    }

    /// Deletes a conversation via the backend, then removes it locally.
    ///
    /// No optimistic removal: a failed delete leaves the list untouched.
    /// Deleting the active conversation clears the active pointer and the
    /// transcript.
    pub async fn delete_conversation(&self, conversation_id: i64) {
        if let Err(e) = self.backend.delete_conversation(conversation_id).await {
            tracing::warn!(target: "controller", "Delete of {} failed, keeping it: {}", conversation_id, e);
            return;
        }

        self.conversations
            .write()
            .await
            .retain(|c| c.id != conversation_id);

        let was_active =
            self.active.read().await.as_ref().map(|c| c.id) == Some(conversation_id);
        if was_active {
            *self.active.write().await = None;
            self.messages.write().await.clear();
        }
    }

    /// Sends a user message through the backend and appends the reply.
    ///
    /// With no active conversation (or no resolved user) a fresh
    /// conversation is prepared instead and nothing is sent; the user
    /// resends into it. The user's message is appended optimistically
    /// before the network round trip and is never rolled back. Failures
    /// append a synthesized reply: a delayed demo echo when the backend
    /// was unreachable, the canned apology when it rejected the call.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let active = self.active.read().await.clone();
        let user = self.user.read().await.clone();
        let (Some(conversation), Some(user)) = (active, user) else {
            self.create_conversation().await;
            return;
        };

        if self.sending.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "controller", "Send already in flight, ignoring");
            return;
        }
        let _guard = SendingGuard(&self.sending);

        let was_first_exchange = self.messages.read().await.is_empty();

        let user_message = Message::from_user(conversation.id, text);
        self.messages.write().await.push(user_message);

        let request = GenerateRequest {
            message: text.to_string(),
            conversation_id: conversation.id,
            user_id: user.id,
        };

        match self.backend.generate(&request).await {
            Ok(reply) => {
                let metadata = MessageMetadata {
                    model: reply.model.clone(),
                    status: DeliveryStatus::Ok,
                };
                let assistant = Message::from_assistant(
                    conversation.id,
                    reply.response,
                    reply.tokens.unwrap_or(0),
                    metadata,
                );
                self.messages.write().await.push(assistant);

                if was_first_exchange {
                    self.apply_derived_title(&conversation, text).await;
                }
            }
            Err(e) if e.backend_reached() => {
                tracing::warn!(target: "controller", "Generate rejected by backend: {}", e);
                let metadata = MessageMetadata {
                    model: None,
                    status: DeliveryStatus::Error,
                };
                let assistant =
                    Message::from_assistant(conversation.id, ERROR_REPLY, 0, metadata);
                self.messages.write().await.push(assistant);
            }
            Err(e) => {
                tracing::warn!(target: "controller", "Backend unreachable, synthesizing demo reply: {}", e);
                tokio::time::sleep(self.config.demo_reply_delay).await;
                let metadata = MessageMetadata {
                    model: None,
                    status: DeliveryStatus::Demo,
                };
                let assistant = Message::from_assistant(
                    conversation.id,
                    demo_reply_text(text),
                    DEMO_REPLY_TOKENS,
                    metadata,
                );
                self.messages.write().await.push(assistant);
            }
        }
    }

    /// Propagates a title derived from the first user message into the
    /// active conversation and the list, then pushes it to the backend
    /// best-effort (local state already carries it).
    async fn apply_derived_title(&self, conversation: &Conversation, text: &str) {
        let title = derive_title(text);

        {
            let mut active = self.active.write().await;
            if let Some(active) = active.as_mut()
                && active.id == conversation.id
            {
                active.title = title.clone();
            }
        }
        {
            let mut conversations = self.conversations.write().await;
            if let Some(entry) = conversations.iter_mut().find(|c| c.id == conversation.id) {
                entry.title = title.clone();
            }
        }

        if let Err(e) = self.backend.rename_conversation(conversation.id, &title).await {
            tracing::debug!(target: "controller", "Title push-back failed: {}", e);
        }
    }

    /// Records feedback on a message. Rating must be within 1..=5; the
    /// backend enforces the same bound.
    pub async fn rate_message(
        &self,
        message_id: i64,
        rating: i32,
        comment: Option<&str>,
    ) -> claudia_core::Result<()> {
        if !(1..=5).contains(&rating) {
            return Err(claudia_core::ClaudiaError::invalid_input(format!(
                "rating {} out of range 1..=5",
                rating
            )));
        }
        self.backend
            .add_feedback(message_id, rating, comment)
            .await
            .inspect_err(|e| {
                tracing::warn!(target: "controller", "Feedback not recorded: {}", e);
            })
    }

    // ============================================================================
    // Read-only snapshots for presentation
    // ============================================================================

    /// Current backend reachability.
    pub async fn status(&self) -> BackendStatus {
        *self.status.read().await
    }

    /// The resolved session user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    /// Snapshot of the conversation list.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().await.clone()
    }

    /// Snapshot of the active conversation.
    pub async fn active_conversation(&self) -> Option<Conversation> {
        self.active.read().await.clone()
    }

    /// Snapshot of the active transcript.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// Whether a send is currently in flight.
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claudia_core::ClaudiaError;
    use claudia_core::gateway::{ConversationWithMessages, GenerateReply};
    use claudia_core::conversation::MessageRole;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_user() -> User {
        User::local_fallback()
    }

    fn test_conversation(id: i64) -> Conversation {
        Conversation {
            id,
            user_id: 1,
            title: DEFAULT_TITLE.to_string(),
            created_at: None,
            updated_at: None,
            is_archived: false,
            message_count: 0,
        }
    }

    fn ok_reply() -> GenerateReply {
        GenerateReply {
            response: "Hi there".to_string(),
            model: Some("m1".to_string()),
            status: Some("success".to_string()),
            tokens: Some(12),
        }
    }

    fn transport_err<T>() -> claudia_core::Result<T> {
        Err(ClaudiaError::transport("connection refused"))
    }

    fn rejected_err<T>() -> claudia_core::Result<T> {
        Err(ClaudiaError::rejected(500, "Erro interno do servidor"))
    }

    /// Scripted gateway: every call answers with its preset result and
    /// counts invocations.
    struct MockBackend {
        ai_status: Mutex<claudia_core::Result<String>>,
        users: Mutex<claudia_core::Result<Vec<User>>>,
        created_user: Mutex<claudia_core::Result<User>>,
        conversations: Mutex<claudia_core::Result<Vec<Conversation>>>,
        conversation_detail: Mutex<claudia_core::Result<ConversationWithMessages>>,
        created_conversation: Mutex<claudia_core::Result<Conversation>>,
        renamed_conversation: Mutex<claudia_core::Result<Conversation>>,
        delete_result: Mutex<claudia_core::Result<()>>,
        generate_reply: Mutex<claudia_core::Result<GenerateReply>>,
        feedback_result: Mutex<claudia_core::Result<()>>,
        status_calls: AtomicUsize,
        create_user_calls: AtomicUsize,
        generate_calls: AtomicUsize,
        create_conversation_calls: AtomicUsize,
        rename_calls: AtomicUsize,
        feedback_calls: AtomicUsize,
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self {
                ai_status: Mutex::new(Ok("online".to_string())),
                users: Mutex::new(Ok(vec![test_user()])),
                created_user: Mutex::new(Ok(test_user())),
                conversations: Mutex::new(Ok(Vec::new())),
                conversation_detail: Mutex::new(Ok(ConversationWithMessages {
                    conversation: test_conversation(100),
                    messages: Vec::new(),
                })),
                created_conversation: Mutex::new(Ok(test_conversation(100))),
                renamed_conversation: Mutex::new(Ok(test_conversation(100))),
                delete_result: Mutex::new(Ok(())),
                generate_reply: Mutex::new(Ok(ok_reply())),
                feedback_result: Mutex::new(Ok(())),
                status_calls: AtomicUsize::new(0),
                create_user_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
                create_conversation_calls: AtomicUsize::new(0),
                rename_calls: AtomicUsize::new(0),
                feedback_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BackendGateway for MockBackend {
        async fn ai_status(&self) -> claudia_core::Result<String> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.ai_status.lock().unwrap().clone()
        }

        async fn list_users(&self) -> claudia_core::Result<Vec<User>> {
            self.users.lock().unwrap().clone()
        }

        async fn create_user(&self, _new_user: &NewUser) -> claudia_core::Result<User> {
            self.create_user_calls.fetch_add(1, Ordering::SeqCst);
            self.created_user.lock().unwrap().clone()
        }

        async fn list_conversations(&self) -> claudia_core::Result<Vec<Conversation>> {
            self.conversations.lock().unwrap().clone()
        }

        async fn fetch_conversation(
            &self,
            _conversation_id: i64,
        ) -> claudia_core::Result<ConversationWithMessages> {
            self.conversation_detail.lock().unwrap().clone()
        }

        async fn create_conversation(
            &self,
            _user_id: i64,
            _title: &str,
        ) -> claudia_core::Result<Conversation> {
            self.create_conversation_calls.fetch_add(1, Ordering::SeqCst);
            self.created_conversation.lock().unwrap().clone()
        }

        async fn rename_conversation(
            &self,
            _conversation_id: i64,
            _title: &str,
        ) -> claudia_core::Result<Conversation> {
            self.rename_calls.fetch_add(1, Ordering::SeqCst);
            self.renamed_conversation.lock().unwrap().clone()
        }

        async fn delete_conversation(&self, _conversation_id: i64) -> claudia_core::Result<()> {
            self.delete_result.lock().unwrap().clone()
        }

        async fn generate(
            &self,
            _request: &GenerateRequest,
        ) -> claudia_core::Result<GenerateReply> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generate_reply.lock().unwrap().clone()
        }

        async fn add_feedback(
            &self,
            _message_id: i64,
            _rating: i32,
            _comment: Option<&str>,
        ) -> claudia_core::Result<()> {
            self.feedback_calls.fetch_add(1, Ordering::SeqCst);
            self.feedback_result.lock().unwrap().clone()
        }
    }

    fn controller_with(backend: Arc<MockBackend>) -> SessionController {
        let config = ClaudiaConfig {
            demo_reply_delay: Duration::ZERO,
            ..ClaudiaConfig::default()
        };
        SessionController::new(backend, config)
    }

    /// Controller with a resolved user and an active empty conversation.
    async fn ready_controller(backend: Arc<MockBackend>) -> SessionController {
        let controller = controller_with(backend);
        controller.ensure_user().await;
        controller.create_conversation().await;
        controller
    }

    #[tokio::test]
    async fn test_send_without_active_creates_conversation_and_skips_send() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());
        controller.ensure_user().await;

        controller.send_message("Hello").await;

        assert_eq!(backend.create_conversation_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
        assert!(controller.active_conversation().await.is_some());
        assert!(controller.messages().await.is_empty());
        assert_eq!(controller.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_successful_send_appends_user_then_assistant() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend.clone()).await;

        controller.send_message("Hello").await;

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Hi there");
        assert_eq!(messages[1].tokens, 12);
        assert_eq!(messages[1].metadata.model.as_deref(), Some("m1"));
        assert_eq!(messages[1].metadata.status, DeliveryStatus::Ok);
        assert!(!controller.is_sending());
    }

    #[tokio::test]
    async fn test_assistant_timestamp_not_earlier_than_user() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend).await;

        controller.send_message("Hello").await;

        let messages = controller.messages().await;
        let user_ts = chrono::DateTime::parse_from_rfc3339(&messages[0].created_at).unwrap();
        let assistant_ts = chrono::DateTime::parse_from_rfc3339(&messages[1].created_at).unwrap();
        assert!(assistant_ts >= user_ts);
    }

    #[tokio::test]
    async fn test_first_exchange_derives_and_propagates_title() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend.clone()).await;

        controller.send_message("Hello").await;

        assert_eq!(controller.active_conversation().await.unwrap().title, "Hello");
        assert_eq!(controller.conversations().await[0].title, "Hello");
        assert_eq!(backend.rename_calls.load(Ordering::SeqCst), 1);

        // Second exchange leaves the title alone
        controller.send_message("Something else").await;
        assert_eq!(controller.active_conversation().await.unwrap().title, "Hello");
        assert_eq!(backend.rename_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_long_first_message_is_truncated_with_ellipsis() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend).await;

        let text = "x".repeat(60);
        controller.send_message(&text).await;

        let title = controller.active_conversation().await.unwrap().title;
        assert_eq!(title, format!("{}...", "x".repeat(50)));
    }

    #[tokio::test]
    async fn test_transport_failure_appends_demo_reply() {
        let backend = Arc::new(MockBackend::default());
        *backend.generate_reply.lock().unwrap() = transport_err();
        let controller = ready_controller(backend.clone()).await;

        controller.send_message("Hello").await;

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(messages[1].content.contains("Hello"));
        assert_eq!(messages[1].metadata.status, DeliveryStatus::Demo);
        assert_eq!(messages[1].tokens, DEMO_REPLY_TOKENS);
        assert!(!controller.is_sending());
        // Title derivation is tied to a successful exchange
        assert_eq!(
            controller.active_conversation().await.unwrap().title,
            DEFAULT_TITLE
        );
        assert_eq!(backend.rename_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_rejection_appends_error_reply() {
        let backend = Arc::new(MockBackend::default());
        *backend.generate_reply.lock().unwrap() = rejected_err();
        let controller = ready_controller(backend).await;

        controller.send_message("Hello").await;

        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, ERROR_REPLY);
        assert_eq!(messages[1].metadata.status, DeliveryStatus::Error);
        assert!(!controller.is_sending());
    }

    #[tokio::test]
    async fn test_status_check_is_idempotent() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());

        for _ in 0..3 {
            assert_eq!(controller.check_backend_status().await, BackendStatus::Online);
        }

        assert_eq!(backend.status_calls.load(Ordering::SeqCst), 3);
        // Nothing but the status field changed
        assert!(controller.conversations().await.is_empty());
        assert!(controller.messages().await.is_empty());
        assert!(controller.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_status_maps_demo_and_offline() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());

        *backend.ai_status.lock().unwrap() = Ok("demo_mode".to_string());
        assert_eq!(controller.check_backend_status().await, BackendStatus::Demo);

        *backend.ai_status.lock().unwrap() = transport_err();
        assert_eq!(controller.check_backend_status().await, BackendStatus::Offline);
        assert_eq!(controller.status().await, BackendStatus::Offline);
    }

    #[tokio::test]
    async fn test_offline_startup_falls_back_to_demo_echo() {
        let backend = Arc::new(MockBackend::default());
        *backend.ai_status.lock().unwrap() = transport_err();
        *backend.users.lock().unwrap() = transport_err();
        *backend.conversations.lock().unwrap() = transport_err();
        *backend.created_conversation.lock().unwrap() = transport_err();
        *backend.generate_reply.lock().unwrap() = transport_err();
        let controller = controller_with(backend);

        controller.initialize().await;
        assert_eq!(controller.status().await, BackendStatus::Offline);

        // Local fallback user keeps the session usable
        let conversation = controller.create_conversation().await.unwrap();
        assert!(conversation.id > 0);

        controller.send_message("Hello").await;
        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Hello"));
        assert_eq!(messages[1].metadata.status, DeliveryStatus::Demo);
    }

    #[tokio::test]
    async fn test_delete_active_conversation_clears_state() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend).await;
        controller.send_message("Hello").await;

        controller.delete_conversation(100).await;

        assert!(controller.active_conversation().await.is_none());
        assert!(controller.messages().await.is_empty());
        assert!(controller.conversations().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_conversation() {
        let backend = Arc::new(MockBackend::default());
        *backend.delete_result.lock().unwrap() = transport_err();
        let controller = ready_controller(backend).await;

        controller.delete_conversation(100).await;

        assert_eq!(controller.conversations().await.len(), 1);
        assert!(controller.active_conversation().await.is_some());
    }

    #[tokio::test]
    async fn test_create_conversation_requires_user() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());

        assert!(controller.create_conversation().await.is_none());
        assert_eq!(backend.create_conversation_calls.load(Ordering::SeqCst), 0);
        assert!(controller.conversations().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_conversation_survives_persist_failure() {
        let backend = Arc::new(MockBackend::default());
        *backend.created_conversation.lock().unwrap() = rejected_err();
        let controller = controller_with(backend);
        controller.ensure_user().await;

        let conversation = controller.create_conversation().await.unwrap();

        assert!(conversation.has_default_title());
        assert_eq!(
            controller.active_conversation().await.unwrap().id,
            conversation.id
        );
    }

    #[tokio::test]
    async fn test_select_conversation_replaces_transcript() {
        let backend = Arc::new(MockBackend::default());
        *backend.conversation_detail.lock().unwrap() = Ok(ConversationWithMessages {
            conversation: test_conversation(7),
            messages: vec![
                Message::from_user(7, "old question"),
                Message::from_assistant(7, "old answer", 3, MessageMetadata::default()),
            ],
        });
        let controller = ready_controller(backend.clone()).await;
        controller.send_message("Hello").await;
        assert_eq!(controller.messages().await.len(), 2);

        controller.select_conversation(&test_conversation(7)).await;

        assert_eq!(controller.active_conversation().await.unwrap().id, 7);
        let messages = controller.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "old question");
    }

    #[tokio::test]
    async fn test_select_conversation_failure_empties_transcript() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend.clone()).await;
        controller.send_message("Hello").await;

        *backend.conversation_detail.lock().unwrap() = transport_err();
        controller.select_conversation(&test_conversation(7)).await;

        assert!(controller.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_user_prefers_existing() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());

        let user = controller.ensure_user().await;

        assert_eq!(user.id, 1);
        assert_eq!(backend.create_user_calls.load(Ordering::SeqCst), 0);

        // Idempotent: a second call resolves from memory
        controller.ensure_user().await;
        assert_eq!(backend.create_user_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_user_provisions_when_none_exist() {
        let backend = Arc::new(MockBackend::default());
        *backend.users.lock().unwrap() = Ok(Vec::new());
        let controller = controller_with(backend.clone());

        controller.ensure_user().await;

        assert_eq!(backend.create_user_calls.load(Ordering::SeqCst), 1);
        assert!(controller.current_user().await.is_some());
    }

    #[tokio::test]
    async fn test_ensure_user_falls_back_locally() {
        let backend = Arc::new(MockBackend::default());
        *backend.users.lock().unwrap() = Ok(Vec::new());
        *backend.created_user.lock().unwrap() = rejected_err();
        let controller = controller_with(backend);

        let user = controller.ensure_user().await;

        assert_eq!(user.username, "usuario_claudia");
        assert!(controller.current_user().await.is_some());
    }

    #[tokio::test]
    async fn test_load_conversations_failure_keeps_list() {
        let backend = Arc::new(MockBackend::default());
        *backend.conversations.lock().unwrap() = Ok(vec![test_conversation(5)]);
        let controller = controller_with(backend.clone());

        controller.load_conversations().await;
        assert_eq!(controller.conversations().await.len(), 1);

        *backend.conversations.lock().unwrap() = transport_err();
        controller.load_conversations().await;
        assert_eq!(controller.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_message_validates_rating() {
        let backend = Arc::new(MockBackend::default());
        let controller = controller_with(backend.clone());

        assert!(controller.rate_message(1, 0, None).await.is_err());
        assert!(controller.rate_message(1, 6, None).await.is_err());
        assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 0);

        assert!(controller.rate_message(1, 5, Some("great")).await.is_ok());
        assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);

        *backend.feedback_result.lock().unwrap() = rejected_err();
        assert!(controller.rate_message(1, 3, None).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_message_is_ignored() {
        let backend = Arc::new(MockBackend::default());
        let controller = ready_controller(backend.clone()).await;

        controller.send_message("   ").await;

        assert!(controller.messages().await.is_empty());
        assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
    }
}
