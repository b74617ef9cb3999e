pub mod realtime;

// Re-export commonly used types for convenience
pub use realtime::{
    AzureVoiceClient, ConnectionState, MediaBackend, RealtimeError, RealtimeResult, SessionEvent,
    Status, TranscriptDelta, TranscriptRole,
};
