//! Conversation domain module.
//!
//! Contains the conversation and message models the session controller
//! operates on, plus title derivation for fresh conversations.

mod message;
mod model;

pub use message::{DeliveryStatus, Message, MessageMetadata, MessageRole};
pub use model::{Conversation, DEFAULT_TITLE, derive_title};
