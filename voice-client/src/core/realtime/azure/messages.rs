//! Azure OpenAI realtime message types.
//!
//! Control channel events are JSON objects discriminated by their `type` field.
//!
//! # Protocol Overview
//!
//! Client events (sent over the control channel):
//! - session.update - Send the session instructions
//! - response.create - Ask the assistant to respond
//!
//! Server events handled by the session:
//! - session.created - Remote session created
//! - session.updated - Session configuration applied
//! - input_audio_buffer.speech_started - Speech detection started
//! - input_audio_buffer.speech_stopped - Speech detection stopped
//! - conversation.item.input_audio_transcription.completed - User transcript
//! - response.audio_transcript.delta - Assistant transcript chunk
//! - response.audio_transcript.done - Assistant transcript complete
//! - response.audio.delta - Assistant audio playing
//! - response.audio.done - Assistant audio complete
//! - error - Error occurred
//!
//! Every other event type decodes to [`ServerEvent::Unknown`].
//!
//! The HTTP signaling bodies for the sessions endpoint live here as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::RealtimeVoice;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// System instructions for the assistant
    pub instructions: String,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent over the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Configure the session
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },

    /// Request a response from the assistant
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Build a `session.update` carrying the instructions.
    pub fn session_update(instructions: impl Into<String>, transcription_model: Option<&str>) -> Self {
        Self::SessionUpdate {
            session: SessionUpdate {
                instructions: instructions.into(),
                input_audio_transcription: transcription_model.map(|model| {
                    InputAudioTranscription {
                        model: model.to_string(),
                    }
                }),
            },
        }
    }

    /// Wire `type` of the event, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::ResponseCreate => "response.create",
        }
    }

    /// Encode as a control channel text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received over the control channel.
///
/// Only the fields the session acts on are decoded. Payloads it merely
/// inspects (`error`, `session`) stay as raw JSON so an unexpected field type
/// cannot make the whole frame undecodable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<Value>,
    },

    /// Remote session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: Option<Value>,
    },

    /// Session configuration applied
    #[serde(rename = "session.updated")]
    SessionUpdated,

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        #[serde(default)]
        transcript: Option<String>,
    },

    /// Assistant transcript chunk
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        #[serde(default)]
        delta: Option<String>,
    },

    /// Assistant transcript complete
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone,

    /// Assistant audio chunk is playing
    #[serde(rename = "response.audio.delta")]
    AudioDelta,

    /// Assistant audio complete
    #[serde(rename = "response.audio.done")]
    AudioDone,

    /// Any event the session does not act on
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode a control channel text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Remote session id carried by `session.created`.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ServerEvent::SessionCreated { session } => {
                session.as_ref()?.get("id")?.as_str()
            }
            _ => None,
        }
    }
}

/// Whether an undecodable frame still announces itself as an `error` event.
pub fn is_error_frame(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "error"))
        .unwrap_or(false)
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information read from an `error` event payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiError {
    /// Error type
    pub error_type: Option<String>,
    /// Error code
    pub code: Option<String>,
    /// Error message
    pub message: Option<String>,
}

impl ApiError {
    /// Read the known fields leniently. Numeric values are stringified;
    /// anything else, including a non-object payload, is treated as absent.
    pub fn from_payload(payload: Option<&Value>) -> Self {
        let field = |name: &str| match payload.and_then(|p| p.get(name)) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Self {
            error_type: field("type"),
            code: field("code"),
            message: field("message"),
        }
    }

    /// Message to surface to observers.
    pub fn display_message(&self) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("Unknown error")
            .to_string()
    }
}

// =============================================================================
// Signaling Bodies
// =============================================================================

/// Body of the ephemeral session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralSessionRequest {
    /// Realtime deployment name
    pub model: String,
    /// Output voice
    pub voice: RealtimeVoice,
}

/// Body returned by the sessions endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EphemeralSessionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<ClientSecret>,
}

/// The short-lived credential inside [`EphemeralSessionResponse`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSecret {
    #[serde(default)]
    pub value: Option<String>,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,
}
