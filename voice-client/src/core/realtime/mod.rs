//! Realtime voice session module.
//!
//! This module provides the session client that drives a realtime
//! speech-to-speech conversation with Azure OpenAI.
//!
//! # Architecture
//!
//! - `base`: errors, status and transcript types, callbacks
//! - `transport`: the media seam (`MediaBackend`, `PeerTransport`,
//!   `ControlChannel`, `AudioSink`) a host implements on its WebRTC stack
//! - `azure`: signaling, control channel messages and the session client
//!
//! # Example
//!
//! ```rust,ignore
//! use helly_voice::config::VoiceConfig;
//! use helly_voice::core::realtime::{AzureVoiceClient, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = AzureVoiceClient::new(VoiceConfig::from_env().unwrap(), backend).unwrap();
//!     let mut events = client.subscribe();
//!
//!     if client.initialize().await {
//!         while let Ok(event) = events.recv().await {
//!             if let SessionEvent::Transcript(delta) = event {
//!                 print!("{}", delta.text);
//!             }
//!         }
//!     }
//! }
//! ```

pub mod azure;
mod base;
pub mod transport;

pub use azure::{AzureVoiceClient, RealtimeSignaling, RealtimeVoice};
pub use base::{
    ConnectionState, RealtimeError, RealtimeErrorCallback, RealtimeResult, SessionEvent, Status,
    StatusCallback, TranscriptCallback, TranscriptDelta, TranscriptRole,
};
pub use transport::{
    AudioSink, AudioTrack, ChannelEvent, ControlChannel, ControlChannelHandle,
    DEFAULT_CONTROL_CHANNEL_LABEL, MediaBackend, PeerTransport, SdpType, SessionDescription,
};
