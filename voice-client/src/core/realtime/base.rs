//! Base types for the realtime voice session.
//!
//! This module defines the error taxonomy, the externally observable status
//! enum, transcript fragments and the callback/event types the session client
//! emits to its observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime voice operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// The token endpoint refused to issue an ephemeral credential
    #[error("Credential error: {0}")]
    CredentialError(String),

    /// Transport creation or SDP negotiation failed
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Operation requires a connected session
    #[error("Voice service not connected")]
    NotConnected,

    /// Error event reported by the realtime service
    #[error("{0}")]
    RemoteError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation not allowed in the current connection state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Initialization was cancelled by a concurrent disconnect
    #[error("Initialization cancelled")]
    Cancelled,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport
    #[default]
    Disconnected,
    /// Credential fetch or negotiation in flight
    Connecting,
    /// Transport negotiated
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// What the voice agent is currently doing.
///
/// Not stored by the session; emitted as a stream of transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Connecting,
    Connected,
    Disconnected,
}

impl Status {
    /// Lowercase wire name of the status.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Listening => "listening",
            Status::Thinking => "thinking",
            Status::Speaking => "speaking",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
            Status::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transcript
// =============================================================================

/// Role of the speaker in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// User speech transcript
    User,
    /// Assistant speech transcript
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single appended transcript fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptDelta {
    /// Text appended to the transcript
    pub text: String,
    /// Who produced the text
    pub role: TranscriptRole,
}

impl TranscriptDelta {
    pub fn new(text: impl Into<String>, role: TranscriptRole) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }
}

// =============================================================================
// Callbacks and Events
// =============================================================================

/// Callback type for status transitions.
pub type StatusCallback = Arc<dyn Fn(Status) + Send + Sync>;

/// Callback type for transcript fragments.
pub type TranscriptCallback = Arc<dyn Fn(TranscriptDelta) + Send + Sync>;

/// Callback type for error events.
pub type RealtimeErrorCallback = Arc<dyn Fn(RealtimeError) + Send + Sync>;

/// Event broadcast to every subscriber of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(Status),
    Transcript(TranscriptDelta),
    Error(RealtimeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Idle.to_string(), "idle");
        assert_eq!(Status::Speaking.to_string(), "speaking");
        assert_eq!(Status::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&Status::Listening).unwrap();
        assert_eq!(json, "\"listening\"");
        let status: Status = serde_json::from_str("\"thinking\"").unwrap();
        assert_eq!(status, Status::Thinking);
    }

    #[test]
    fn test_transcript_role_display() {
        assert_eq!(TranscriptRole::User.to_string(), "user");
        assert_eq!(TranscriptRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_error_display() {
        let err = RealtimeError::CredentialError("401 Unauthorized".to_string());
        assert!(err.to_string().contains("401 Unauthorized"));

        assert_eq!(
            RealtimeError::NotConnected.to_string(),
            "Voice service not connected"
        );

        // Remote errors carry the service message verbatim
        let err = RealtimeError::RemoteError("Invalid audio".to_string());
        assert_eq!(err.to_string(), "Invalid audio");
    }
}
