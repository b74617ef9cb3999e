//! In-memory media backend
//!
//! Stands in for a WebRTC stack: records every call made by the session
//! client and lets a test inject control channel traffic.
//!
//! Also provides the wiremock fixtures for the two signaling endpoints.

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helly_voice::config::{Secret, VoiceConfig};
use helly_voice::core::realtime::{
    AudioSink, AudioTrack, AzureVoiceClient, ChannelEvent, ControlChannel, ControlChannelHandle,
    MediaBackend, PeerTransport, RealtimeError, RealtimeResult, SessionDescription, SessionEvent,
    Status, TranscriptDelta,
};

pub const MOCK_OFFER_SDP: &str = "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\ns=helly-offer\r\n";
pub const MOCK_ANSWER_SDP: &str = "v=0\r\no=- 3 4 IN IP4 127.0.0.1\r\ns=helly-answer\r\n";
pub const SESSIONS_PATH: &str = "/openai/realtimeapi/sessions";
pub const RTC_PATH: &str = "/v1/realtimertc";
pub const TEST_API_KEY: &str = "test-resource-key";
pub const TEST_EPHEMERAL_KEY: &str = "ek_test_123";
pub const TEST_SESSION_ID: &str = "sess_123";

// =============================================================================
// Control Channel
// =============================================================================

#[derive(Default)]
pub struct MockControlChannel {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockControlChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// `type` of every frame sent so far.
    pub fn sent_types(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|frame| serde_json::from_str::<serde_json::Value>(frame).ok())
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlChannel for MockControlChannel {
    async fn send(&self, text: String) -> RealtimeResult<()> {
        if self.is_closed() {
            return Err(RealtimeError::TransportError("channel closed".to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Audio Sink
// =============================================================================

#[derive(Default)]
pub struct MockSink {
    attached: Mutex<Vec<AudioTrack>>,
    detached: AtomicUsize,
}

impl MockSink {
    pub fn attached(&self) -> Vec<AudioTrack> {
        self.attached.lock().clone()
    }

    pub fn detach_count(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

impl AudioSink for MockSink {
    fn attach(&self, track: AudioTrack) {
        self.attached.lock().push(track);
    }

    fn detach(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Peer Transport
// =============================================================================

#[derive(Default)]
pub struct MockTransport {
    pub channel: Arc<MockControlChannel>,
    events: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
    labels: Mutex<Vec<String>>,
    local_tracks: Mutex<Vec<AudioTrack>>,
    local_description: Mutex<Option<SessionDescription>>,
    remote_description: Mutex<Option<SessionDescription>>,
    remote_audio: Mutex<Option<Arc<dyn AudioSink>>>,
    closed: AtomicBool,
}

impl MockTransport {
    /// Deliver an inbound control channel event.
    pub async fn emit(&self, event: ChannelEvent) {
        let sender = self.events.lock().clone();
        if let Some(sender) = sender {
            // The dispatcher may already be gone; that is part of what tests check
            let _ = sender.send(event).await;
        }
    }

    pub async fn emit_json(&self, value: serde_json::Value) {
        self.emit(ChannelEvent::Message(value.to_string())).await;
    }

    /// Simulate the remote side delivering an audio track.
    pub fn deliver_remote_track(&self, track: AudioTrack) {
        let sink = self.remote_audio.lock().clone();
        if let Some(sink) = sink {
            sink.attach(track);
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().clone()
    }

    pub fn local_tracks(&self) -> Vec<AudioTrack> {
        self.local_tracks.lock().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.local_description.lock().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.remote_description.lock().clone()
    }

    pub fn has_remote_audio_route(&self) -> bool {
        self.remote_audio.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    fn route_remote_audio(&self, sink: Arc<dyn AudioSink>) {
        *self.remote_audio.lock() = Some(sink);
    }

    async fn add_local_audio(&self, track: AudioTrack) -> RealtimeResult<()> {
        self.local_tracks.lock().push(track);
        Ok(())
    }

    async fn create_control_channel(&self, label: &str) -> RealtimeResult<ControlChannelHandle> {
        self.labels.lock().push(label.to_string());
        let (tx, rx) = mpsc::channel(32);
        *self.events.lock() = Some(tx);
        Ok(ControlChannelHandle {
            sender: self.channel.clone(),
            events: rx,
        })
    }

    async fn create_offer(&self) -> RealtimeResult<SessionDescription> {
        Ok(SessionDescription::offer(MOCK_OFFER_SDP))
    }

    async fn set_local_description(&self, description: SessionDescription) -> RealtimeResult<()> {
        *self.local_description.lock() = Some(description);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> RealtimeResult<()> {
        *self.remote_description.lock() = Some(description);
        Ok(())
    }

    async fn close(&self) -> RealtimeResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Media Backend
// =============================================================================

#[derive(Default)]
pub struct MockMedia {
    transports: Mutex<Vec<Arc<MockTransport>>>,
    sinks: Mutex<Vec<Arc<MockSink>>>,
    microphone_denied: AtomicBool,
}

impl MockMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `acquire_local_audio` fail like a denied permission prompt.
    pub fn deny_microphone(&self) {
        self.microphone_denied.store(true, Ordering::SeqCst);
    }

    pub fn transport_count(&self) -> usize {
        self.transports.lock().len()
    }

    pub fn transport(&self, index: usize) -> Arc<MockTransport> {
        self.transports.lock()[index].clone()
    }

    pub fn last_transport(&self) -> Arc<MockTransport> {
        self.transports
            .lock()
            .last()
            .cloned()
            .expect("no transport created")
    }

    pub fn last_sink(&self) -> Arc<MockSink> {
        self.sinks.lock().last().cloned().expect("no sink created")
    }
}

#[async_trait]
impl MediaBackend for MockMedia {
    async fn create_transport(&self) -> RealtimeResult<Arc<dyn PeerTransport>> {
        let transport = Arc::new(MockTransport::default());
        self.transports.lock().push(transport.clone());
        Ok(transport)
    }

    async fn acquire_local_audio(&self) -> RealtimeResult<AudioTrack> {
        if self.microphone_denied.load(Ordering::SeqCst) {
            return Err(RealtimeError::InvalidState(
                "Permission denied".to_string(),
            ));
        }
        Ok(AudioTrack {
            id: "mic-0".to_string(),
            label: Some("Default Microphone".to_string()),
        })
    }

    fn create_audio_sink(&self) -> Arc<dyn AudioSink> {
        let sink = Arc::new(MockSink::default());
        self.sinks.lock().push(sink.clone());
        sink
    }
}

// =============================================================================
// Signaling Fixtures
// =============================================================================

pub fn test_config(server: &MockServer) -> VoiceConfig {
    VoiceConfig {
        api_key: Secret::from(TEST_API_KEY),
        sessions_url: format!(
            "{}{}?api-version=2025-04-01-preview",
            server.uri(),
            SESSIONS_PATH
        ),
        webrtc_url: format!("{}{}", server.uri(), RTC_PATH),
        instructions: "You are a test assistant.".to_string(),
        auto_listen_delay_ms: 20,
        ..Default::default()
    }
}

pub fn session_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": TEST_SESSION_ID,
        "object": "realtime.session",
        "model": "gpt-realtime",
        "client_secret": {
            "value": TEST_EPHEMERAL_KEY,
            "expires_at": 1_900_000_000
        }
    }))
}

pub async fn mount_sessions(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(SESSIONS_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_negotiation(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(RTC_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Both endpoints succeed.
pub async fn mount_success(server: &MockServer) {
    mount_sessions(server, session_response()).await;
    mount_negotiation(
        server,
        ResponseTemplate::new(201).set_body_string(MOCK_ANSWER_SDP),
    )
    .await;
}

/// Sessions endpoint that never answers in test time.
pub fn hanging_session_response() -> ResponseTemplate {
    session_response().set_delay(Duration::from_secs(30))
}

// =============================================================================
// Observation Helpers
// =============================================================================

/// Records every emission made through the single-subscriber slots.
#[derive(Clone, Default)]
pub struct Recorder {
    pub statuses: Arc<Mutex<Vec<Status>>>,
    pub transcripts: Arc<Mutex<Vec<TranscriptDelta>>>,
    pub errors: Arc<Mutex<Vec<RealtimeError>>>,
}

impl Recorder {
    pub fn attach(client: &AzureVoiceClient) -> Self {
        let recorder = Self::default();

        let statuses = recorder.statuses.clone();
        client.on_status_change(Arc::new(move |s| statuses.lock().push(s)));

        let transcripts = recorder.transcripts.clone();
        client.on_transcript_update(Arc::new(move |d| transcripts.lock().push(d)));

        let errors = recorder.errors.clone();
        client.on_error(Arc::new(move |e| errors.lock().push(e)));

        recorder
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().clone()
    }

    pub fn transcripts(&self) -> Vec<TranscriptDelta> {
        self.transcripts.lock().clone()
    }

    pub fn errors(&self) -> Vec<RealtimeError> {
        self.errors.lock().clone()
    }

    pub fn clear(&self) {
        self.statuses.lock().clear();
        self.transcripts.lock().clear();
        self.errors.lock().clear();
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Give the dispatcher a chance to drain already delivered events.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Drain everything currently buffered on a broadcast subscription.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
