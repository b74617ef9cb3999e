//! Media transport abstractions.
//!
//! The session client never touches peer-connection or audio device APIs
//! directly. A host supplies a [`MediaBackend`] that creates peer transports,
//! acquires the local microphone track and provides the sink that plays the
//! remote audio. This keeps the negotiation logic testable without media
//! hardware.
//!
//! Inbound control channel traffic is delivered as [`ChannelEvent`]s on an
//! mpsc receiver so the session can process it strictly in arrival order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::base::RealtimeResult;

/// Label of the control channel opened on the peer transport.
pub const DEFAULT_CONTROL_CHANNEL_LABEL: &str = "realtime-channel";

// =============================================================================
// Session Descriptions
// =============================================================================

/// Kind of a session description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Answer => write!(f, "answer"),
        }
    }
}

/// Session description exchanged during negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

// =============================================================================
// Audio Tracks
// =============================================================================

/// Handle to an audio track owned by the media backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// Backend-specific track identifier
    pub id: String,
    /// Human readable device or stream label
    pub label: Option<String>,
}

impl AudioTrack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }
}

/// Destination for the remote assistant audio.
pub trait AudioSink: Send + Sync {
    /// Start playing an inbound remote track.
    fn attach(&self, track: AudioTrack);

    /// Stop playback and release the output.
    fn detach(&self);
}

// =============================================================================
// Control Channel
// =============================================================================

/// Inbound control channel lifecycle and traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Channel is open and ready to send
    Open,
    /// Text frame received from the remote side
    Message(String),
    /// Channel closed (locally or remotely)
    Close,
}

/// Outbound half of the control channel.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Send a text frame.
    async fn send(&self, text: String) -> RealtimeResult<()>;

    /// Close the channel.
    async fn close(&self) -> RealtimeResult<()>;
}

/// A freshly created control channel: the sending half plus its inbound events.
pub struct ControlChannelHandle {
    pub sender: Arc<dyn ControlChannel>,
    pub events: mpsc::Receiver<ChannelEvent>,
}

// =============================================================================
// Peer Transport
// =============================================================================

/// Peer-to-peer audio transport.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Route any inbound remote audio track to `sink`.
    fn route_remote_audio(&self, sink: Arc<dyn AudioSink>);

    /// Attach the local microphone track.
    async fn add_local_audio(&self, track: AudioTrack) -> RealtimeResult<()>;

    /// Open a control channel carried over this transport.
    async fn create_control_channel(&self, label: &str) -> RealtimeResult<ControlChannelHandle>;

    /// Create the local offer.
    async fn create_offer(&self) -> RealtimeResult<SessionDescription>;

    /// Apply the local description.
    async fn set_local_description(&self, description: SessionDescription) -> RealtimeResult<()>;

    /// Apply the remote answer.
    async fn set_remote_description(&self, description: SessionDescription)
    -> RealtimeResult<()>;

    /// Close the transport and every track attached to it.
    async fn close(&self) -> RealtimeResult<()>;
}

/// Factory for the platform media stack.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Create a new, unconnected peer transport.
    async fn create_transport(&self) -> RealtimeResult<Arc<dyn PeerTransport>>;

    /// Acquire the local microphone. May wait on a user permission prompt.
    async fn acquire_local_audio(&self) -> RealtimeResult<AudioTrack>;

    /// Create the sink that plays the remote audio.
    fn create_audio_sink(&self) -> Arc<dyn AudioSink>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_description_serialization() {
        let offer = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["sdp"], "v=0\r\n");

        let answer: SessionDescription =
            serde_json::from_str(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(answer.sdp_type, SdpType::Answer);
    }

    #[test]
    fn test_sdp_type_display() {
        assert_eq!(SdpType::Offer.to_string(), "offer");
        assert_eq!(SdpType::Answer.to_string(), "answer");
    }

    #[test]
    fn test_default_label() {
        assert_eq!(DEFAULT_CONTROL_CHANNEL_LABEL, "realtime-channel");
    }
}
