//! Azure OpenAI realtime voice module.
//!
//! Realtime speech over a peer-to-peer audio transport negotiated against the
//! Azure OpenAI realtime service.
//!
//! # Features
//!
//! - Ephemeral credential minting per session
//! - SDP offer/answer exchange over HTTP
//! - Control channel configuration and event dispatch
//! - Assistant and (optionally) user transcripts
//!
//! # Supported Voices
//!
//! alloy, ash, ballad, coral, echo, sage, shimmer, verse

mod client;
mod config;
mod messages;
mod signaling;

pub use client::AzureVoiceClient;
pub use config::{
    AZURE_REALTIME_SESSIONS_PATH, AZURE_REALTIME_WEBRTC_URL, DEFAULT_DEPLOYMENT,
    DEFAULT_INSTRUCTIONS, RealtimeVoice, sessions_url_for_endpoint,
};
pub use messages::{
    ApiError, ClientEvent, ClientSecret, EphemeralSessionRequest, EphemeralSessionResponse,
    InputAudioTranscription, ServerEvent, SessionUpdate, is_error_frame,
};
pub use signaling::{EphemeralKey, RealtimeSignaling};
