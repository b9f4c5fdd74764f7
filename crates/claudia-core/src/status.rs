//! Backend reachability status.

use serde::{Deserialize, Serialize};

/// Reachability of the backend collaborator, as shown in the status badge.
///
/// Starts at `Connecting` and is recomputed by the periodic status poll:
/// a successful status call maps the backend's reported state to `Online`
/// or `Demo`, any failure maps to `Offline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// Initial state before the first status check completes.
    Connecting,
    /// Backend is reachable and a real model is serving.
    Online,
    /// Backend is reachable but answering with canned demo responses.
    Demo,
    /// Backend is unreachable.
    Offline,
}

impl BackendStatus {
    /// Maps the status string reported by `GET /api/ai/status`.
    ///
    /// Anything other than `"online"` on a successful response means the
    /// backend is up but running its demo model.
    pub fn from_report(reported: &str) -> Self {
        if reported == "online" {
            Self::Online
        } else {
            Self::Demo
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Online => "online",
            Self::Demo => "demo",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
