//! User domain model.
//!
//! Represents the account a session acts on behalf of. A user is resolved
//! once at session start (fetched or provisioned via the backend) and is
//! immutable for the rest of the session.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Preference bag attached to a user.
///
/// The backend may answer with an empty bag; both fields fall back to the
/// seed values the original client provisioned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// UI theme name
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Preferred locale
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_theme() -> String {
    "green".to_string()
}

fn default_language() -> String {
    "pt-BR".to_string()
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: default_language(),
        }
    }
}

/// A Claudia user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier (assigned by the backend)
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Timestamp when the account was created (RFC 3339)
    #[serde(default)]
    pub created_at: Option<String>,
    /// Timestamp when the account was last updated (RFC 3339)
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Whether the account is active
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_is_active() -> bool {
    true
}

impl User {
    /// Builds the locally synthesized default user.
    ///
    /// Used when the backend can neither list nor create users, so the
    /// session stays usable without one.
    pub fn local_fallback() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: 1,
            username: "usuario_claudia".to_string(),
            email: "usuario@claudia.ai".to_string(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            is_active: true,
            preferences: UserPreferences::default(),
        }
    }
}

/// Payload for provisioning a user via `POST /api/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub preferences: UserPreferences,
}

impl Default for NewUser {
    fn default() -> Self {
        Self {
            username: "usuario_claudia".to_string(),
            email: "usuario@claudia.ai".to_string(),
            preferences: UserPreferences::default(),
        }
    }
}
