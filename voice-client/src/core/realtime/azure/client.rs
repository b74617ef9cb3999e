//! Azure OpenAI realtime voice session client.
//!
//! Owns the lifecycle of a single voice session:
//!
//! 1. mint an ephemeral credential over HTTP,
//! 2. build a peer transport through the [`MediaBackend`], route remote audio
//!    to a sink and attach the microphone,
//! 3. open the control channel and negotiate SDP with the service,
//! 4. dispatch inbound control events, one at a time, into status,
//!    transcript and error emissions.
//!
//! # Example
//!
//! ```rust,ignore
//! use helly_voice::config::VoiceConfig;
//! use helly_voice::core::realtime::AzureVoiceClient;
//! use std::sync::Arc;
//!
//! let client = AzureVoiceClient::new(VoiceConfig::from_env()?, media_backend)?;
//! client.on_status_change(Arc::new(|status| println!("status: {status}")));
//!
//! if client.initialize().await {
//!     client.start_listening();
//! }
//! // ...
//! client.disconnect().await;
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::messages::{ApiError, ClientEvent, ServerEvent, is_error_frame};
use super::signaling::RealtimeSignaling;
use crate::config::VoiceConfig;
use crate::core::realtime::base::{
    ConnectionState, RealtimeError, RealtimeErrorCallback, RealtimeResult, SessionEvent, Status,
    StatusCallback, TranscriptCallback, TranscriptDelta, TranscriptRole,
};
use crate::core::realtime::transport::{
    AudioSink, ChannelEvent, ControlChannel, ControlChannelHandle, MediaBackend, PeerTransport,
    SessionDescription,
};

/// Buffered events per broadcast subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Session State
// =============================================================================

/// Resources of the live session.
struct ActiveSession {
    session_id: Option<String>,
    transport: Arc<dyn PeerTransport>,
    channel: Arc<dyn ControlChannel>,
    sink: Arc<dyn AudioSink>,
    dispatcher: Option<JoinHandle<()>>,
    channel_open: bool,
    instructions_sent: bool,
}

impl ActiveSession {
    async fn release(mut self) {
        if let Some(handle) = self.dispatcher.take() {
            handle.abort();
        }
        release_resources(
            Some(&self.channel),
            Some(&self.transport),
            Some(&self.sink),
        )
        .await;
    }
}

/// Resources created by an `initialize` that has not committed yet.
#[derive(Default)]
struct PendingSession {
    transport: Option<Arc<dyn PeerTransport>>,
    channel: Option<Arc<dyn ControlChannel>>,
    sink: Option<Arc<dyn AudioSink>>,
}

impl PendingSession {
    async fn release(self) {
        release_resources(
            self.channel.as_ref(),
            self.transport.as_ref(),
            self.sink.as_ref(),
        )
        .await;
    }
}

/// Everything a successful negotiation produced.
struct Established {
    session_id: Option<String>,
    transport: Arc<dyn PeerTransport>,
    channel: Arc<dyn ControlChannel>,
    sink: Arc<dyn AudioSink>,
    events: mpsc::Receiver<ChannelEvent>,
}

async fn release_resources(
    channel: Option<&Arc<dyn ControlChannel>>,
    transport: Option<&Arc<dyn PeerTransport>>,
    sink: Option<&Arc<dyn AudioSink>>,
) {
    if let Some(channel) = channel
        && let Err(e) = channel.close().await
    {
        debug!("Control channel close failed: {}", e);
    }
    if let Some(transport) = transport
        && let Err(e) = transport.close().await
    {
        debug!("Transport close failed: {}", e);
    }
    if let Some(sink) = sink {
        sink.detach();
    }
}

#[derive(Default)]
struct SessionState {
    connection_state: ConnectionState,
    /// Bumped whenever a session is torn down; dispatchers of older epochs are ignored
    epoch: u64,
    listening: bool,
    status: Option<Status>,
    session: Option<ActiveSession>,
    transcript: Vec<TranscriptDelta>,
    /// Cancels the in-flight `initialize`
    cancel: Option<CancellationToken>,
}

struct Shared {
    config: VoiceConfig,
    signaling: RealtimeSignaling,
    media: Arc<dyn MediaBackend>,
    state: Mutex<SessionState>,
    status_callback: Mutex<Option<StatusCallback>>,
    transcript_callback: Mutex<Option<TranscriptCallback>>,
    error_callback: Mutex<Option<RealtimeErrorCallback>>,
    events: broadcast::Sender<SessionEvent>,
}

// =============================================================================
// AzureVoiceClient
// =============================================================================

/// Realtime voice session client for Azure OpenAI.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct AzureVoiceClient {
    shared: Arc<Shared>,
}

impl AzureVoiceClient {
    /// Create a client. No network or media activity happens until [`initialize`].
    ///
    /// [`initialize`]: AzureVoiceClient::initialize
    pub fn new(config: VoiceConfig, media: Arc<dyn MediaBackend>) -> RealtimeResult<Self> {
        config
            .validate()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        let signaling = RealtimeSignaling::new(&config)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                signaling,
                media,
                state: Mutex::new(SessionState::default()),
                status_callback: Mutex::new(None),
                transcript_callback: Mutex::new(None),
                error_callback: Mutex::new(None),
                events,
            }),
        })
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.shared.config
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Establish the session.
    ///
    /// Returns `true` once connected (immediately if already connected). On
    /// failure every resource created so far is released, one error and a
    /// `disconnected` status are emitted and `false` is returned. A concurrent
    /// [`disconnect`](AzureVoiceClient::disconnect) cancels the attempt, which
    /// then returns `false` without emitting anything.
    pub async fn initialize(&self) -> bool {
        let (epoch, token, stale) = {
            let mut state = self.shared.state.lock();
            match state.connection_state {
                ConnectionState::Connected => return true,
                ConnectionState::Connecting => {
                    drop(state);
                    warn!("initialize called while another initialize is in flight");
                    self.shared.emit_error(RealtimeError::InvalidState(
                        "initialize already in progress".to_string(),
                    ));
                    return false;
                }
                ConnectionState::Disconnected => {}
            }

            let stale = state.session.take();
            state.epoch += 1;
            state.connection_state = ConnectionState::Connecting;
            state.listening = false;
            state.transcript.clear();
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            (state.epoch, token, stale)
        };

        if let Some(stale) = stale {
            debug!("Releasing transport left by a remote close");
            stale.release().await;
        }

        info!("Connecting to Azure realtime service");
        self.shared.emit_status(Status::Connecting);

        let mut pending = PendingSession::default();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => Err(RealtimeError::Cancelled),
            result = self.establish(&mut pending) => result,
        };

        if token.is_cancelled() {
            pending.release().await;
            info!("Initialization cancelled by disconnect");
            return false;
        }

        match outcome {
            Ok(established) => self.commit(epoch, established, pending).await,
            Err(err) => {
                pending.release().await;
                {
                    let mut state = self.shared.state.lock();
                    if state.epoch == epoch {
                        state.connection_state = ConnectionState::Disconnected;
                        state.listening = false;
                        state.cancel = None;
                    }
                }
                error!("Failed to initialize voice session: {}", err);
                self.shared.emit_error(err);
                self.shared.emit_status(Status::Disconnected);
                false
            }
        }
    }

    async fn establish(&self, pending: &mut PendingSession) -> RealtimeResult<Established> {
        let shared = &self.shared;

        let key = shared.signaling.fetch_ephemeral_key().await?;

        let transport = shared
            .media
            .create_transport()
            .await
            .map_err(into_transport_error)?;
        pending.transport = Some(transport.clone());

        let sink = shared.media.create_audio_sink();
        pending.sink = Some(sink.clone());
        transport.route_remote_audio(sink.clone());

        let track = shared.media.acquire_local_audio().await.map_err(|e| {
            RealtimeError::TransportError(format!("microphone unavailable: {}", error_detail(&e)))
        })?;
        debug!(track = %track.id, "Local audio acquired");
        transport
            .add_local_audio(track)
            .await
            .map_err(into_transport_error)?;

        let ControlChannelHandle { sender, events } = transport
            .create_control_channel(&shared.config.control_channel_label)
            .await
            .map_err(into_transport_error)?;
        pending.channel = Some(sender.clone());

        let offer = transport
            .create_offer()
            .await
            .map_err(into_transport_error)?;
        transport
            .set_local_description(offer.clone())
            .await
            .map_err(into_transport_error)?;

        let answer_sdp = shared.signaling.exchange_sdp(&key, &offer.sdp).await?;
        transport
            .set_remote_description(SessionDescription::answer(answer_sdp))
            .await
            .map_err(into_transport_error)?;

        Ok(Established {
            session_id: key.session_id,
            transport,
            channel: sender,
            sink,
            events,
        })
    }

    async fn commit(&self, epoch: u64, established: Established, pending: PendingSession) -> bool {
        let Established {
            session_id,
            transport,
            channel,
            sink,
            events,
        } = established;

        {
            let mut state = self.shared.state.lock();
            if state.epoch == epoch {
                let dispatcher = tokio::spawn(run_dispatcher(
                    Arc::downgrade(&self.shared),
                    epoch,
                    events,
                ));
                state.session = Some(ActiveSession {
                    session_id: session_id.clone(),
                    transport,
                    channel,
                    sink,
                    dispatcher: Some(dispatcher),
                    channel_open: false,
                    instructions_sent: false,
                });
                state.connection_state = ConnectionState::Connected;
                state.cancel = None;
                drop(state);

                drop(pending);
                info!(
                    session_id = session_id.as_deref().unwrap_or("-"),
                    "Voice session connected"
                );
                self.shared.emit_status(Status::Connected);
                return true;
            }
        }

        // A disconnect landed between negotiation and commit
        pending.release().await;
        false
    }

    /// Tear the session down. Idempotent; emits `disconnected` on every call.
    pub async fn disconnect(&self) {
        let (session, token) = {
            let mut state = self.shared.state.lock();
            state.epoch += 1;
            state.connection_state = ConnectionState::Disconnected;
            state.listening = false;
            state.transcript.clear();
            (state.session.take(), state.cancel.take())
        };

        if let Some(token) = token {
            token.cancel();
        }
        if let Some(session) = session {
            session.release().await;
        }

        info!("Disconnected from Azure realtime service");
        self.shared.emit_status(Status::Disconnected);
    }

    // -------------------------------------------------------------------------
    // Listening
    // -------------------------------------------------------------------------

    /// Mark the session as listening. Emits `NotConnected` when there is no session.
    pub fn start_listening(&self) {
        let connected = {
            let mut state = self.shared.state.lock();
            if state.connection_state == ConnectionState::Connected {
                state.listening = true;
                true
            } else {
                false
            }
        };

        if connected {
            self.shared.emit_status(Status::Listening);
        } else {
            warn!("start_listening called without a connected session");
            self.shared.emit_error(RealtimeError::NotConnected);
        }
    }

    pub fn stop_listening(&self) {
        self.shared.state.lock().listening = false;
        self.shared.emit_status(Status::Idle);
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Register the status observer. Replaces any previous one.
    pub fn on_status_change(&self, callback: StatusCallback) {
        *self.shared.status_callback.lock() = Some(callback);
    }

    /// Register the transcript observer. Replaces any previous one.
    pub fn on_transcript_update(&self, callback: TranscriptCallback) {
        *self.shared.transcript_callback.lock() = Some(callback);
    }

    /// Register the error observer. Replaces any previous one.
    pub fn on_error(&self, callback: RealtimeErrorCallback) {
        *self.shared.error_callback.lock() = Some(callback);
    }

    /// Subscribe to every emission. Any number of subscribers may coexist.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.lock().connection_state
    }

    /// Last emitted status.
    pub fn status(&self) -> Option<Status> {
        self.shared.state.lock().status
    }

    pub fn is_listening(&self) -> bool {
        self.shared.state.lock().listening
    }

    pub fn session_id(&self) -> Option<String> {
        self.shared
            .state
            .lock()
            .session
            .as_ref()
            .and_then(|s| s.session_id.clone())
    }

    pub fn transcript(&self) -> Vec<TranscriptDelta> {
        self.shared.state.lock().transcript.clone()
    }

    /// Transcript fragments concatenated in arrival order.
    pub fn transcript_text(&self) -> String {
        self.shared
            .state
            .lock()
            .transcript
            .iter()
            .map(|d| d.text.as_str())
            .collect()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

async fn run_dispatcher(
    shared: Weak<Shared>,
    epoch: u64,
    mut events: mpsc::Receiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match event {
            ChannelEvent::Open => shared.handle_channel_open(epoch).await,
            ChannelEvent::Message(text) => shared.handle_message(epoch, &text).await,
            ChannelEvent::Close => {
                shared.handle_channel_close(epoch);
                return;
            }
        }
    }

    // Backend dropped the channel without a close event
    if let Some(shared) = shared.upgrade() {
        shared.handle_channel_close(epoch);
    }
}

impl Shared {
    fn is_current(&self, epoch: u64) -> bool {
        self.state.lock().epoch == epoch
    }

    async fn handle_channel_open(&self, epoch: u64) {
        let channel = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            let Some(session) = state.session.as_mut() else {
                return;
            };
            session.channel_open = true;
            if session.instructions_sent {
                debug!("Control channel reopened; instructions already sent");
                return;
            }
            session.instructions_sent = true;
            session.channel.clone()
        };

        info!("Control channel open, sending session instructions");
        let event = ClientEvent::session_update(
            self.config.instructions.as_str(),
            self.config.input_audio_transcription_model.as_deref(),
        );
        if let Err(e) = send_event(&channel, &event).await {
            error!("Failed to send session.update: {}", e);
            self.emit_error(e);
        }
    }

    async fn handle_message(&self, epoch: u64, text: &str) {
        if !self.is_current(epoch) {
            debug!("Dropping control event from a torn down session");
            return;
        }

        let event = match ServerEvent::parse(text) {
            Ok(event) => event,
            Err(e) if is_error_frame(text) => {
                warn!(bytes = text.len(), "Undecodable error event: {}", e);
                self.emit_error(RealtimeError::RemoteError(
                    ApiError::default().display_message(),
                ));
                return;
            }
            Err(e) => {
                warn!(bytes = text.len(), "Failed to parse control event: {}", e);
                return;
            }
        };

        match event {
            ServerEvent::SessionCreated { .. } => {
                let id = event.session_id().map(str::to_string);
                info!(
                    session_id = id.as_deref().unwrap_or("-"),
                    "Realtime session created"
                );
                if let Some(id) = id {
                    let mut state = self.state.lock();
                    if let Some(active) = state.session.as_mut() {
                        active.session_id = Some(id);
                    }
                }
            }

            ServerEvent::SessionUpdated => {
                debug!("Realtime session updated");
                self.emit_status(Status::Thinking);
                self.request_response(epoch).await;
            }

            ServerEvent::TranscriptionCompleted { transcript } => {
                if let Some(text) = transcript.filter(|t| !t.is_empty()) {
                    debug!("User transcript: {}", text);
                    self.append_transcript(
                        epoch,
                        TranscriptDelta::new(format!("You: {text}\n"), TranscriptRole::User),
                    );
                }
            }

            ServerEvent::AudioTranscriptDelta { delta } => {
                if let Some(delta) = delta.filter(|d| !d.is_empty()) {
                    self.append_transcript(
                        epoch,
                        TranscriptDelta::new(delta, TranscriptRole::Assistant),
                    );
                }
            }

            ServerEvent::AudioTranscriptDone => {
                self.append_transcript(epoch, TranscriptDelta::new("\n", TranscriptRole::Assistant));
            }

            ServerEvent::SpeechStarted => self.emit_status(Status::Listening),
            ServerEvent::SpeechStopped => self.emit_status(Status::Thinking),
            ServerEvent::AudioDelta => self.emit_status(Status::Speaking),
            ServerEvent::AudioDone => self.emit_status(Status::Idle),

            ServerEvent::Error { error } => {
                let message = ApiError::from_payload(error.as_ref()).display_message();
                error!("Azure realtime error: {}", message);
                self.emit_error(RealtimeError::RemoteError(message));
            }

            ServerEvent::Unknown => {
                debug!("Ignoring control event");
            }
        }
    }

    async fn request_response(&self, epoch: u64) {
        let channel = {
            let state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            match state.session.as_ref() {
                Some(session) if session.channel_open && session.instructions_sent => {
                    session.channel.clone()
                }
                _ => {
                    debug!("Skipping response.create: control channel not ready");
                    return;
                }
            }
        };

        if let Err(e) = send_event(&channel, &ClientEvent::ResponseCreate).await {
            error!("Failed to send response.create: {}", e);
            self.emit_error(e);
        }
    }

    fn handle_channel_close(&self, epoch: u64) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            if let Some(session) = state.session.as_mut() {
                session.channel_open = false;
                session.dispatcher = None;
            }
            state.connection_state = ConnectionState::Disconnected;
            state.listening = false;
        }

        info!("Control channel closed by remote");
        self.emit_status(Status::Disconnected);
    }

    fn append_transcript(&self, epoch: u64, delta: TranscriptDelta) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.transcript.push(delta.clone());
        }

        let callback = self.transcript_callback.lock().clone();
        if let Some(callback) = callback {
            callback(delta.clone());
        }
        let _ = self.events.send(SessionEvent::Transcript(delta));
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    fn emit_status(&self, status: Status) {
        self.state.lock().status = Some(status);
        debug!(status = %status, "Status");

        let callback = self.status_callback.lock().clone();
        if let Some(callback) = callback {
            callback(status);
        }
        let _ = self.events.send(SessionEvent::Status(status));
    }

    fn emit_error(&self, error: RealtimeError) {
        let callback = self.error_callback.lock().clone();
        if let Some(callback) = callback {
            callback(error.clone());
        }
        let _ = self.events.send(SessionEvent::Error(error));
    }
}

async fn send_event(channel: &Arc<dyn ControlChannel>, event: &ClientEvent) -> RealtimeResult<()> {
    let json = event
        .to_json()
        .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
    debug!(event = event.event_type(), "Sending control event");
    channel.send(json).await
}

fn into_transport_error(err: RealtimeError) -> RealtimeError {
    match err {
        RealtimeError::TransportError(_) => err,
        other => RealtimeError::TransportError(error_detail(&other)),
    }
}

fn error_detail(err: &RealtimeError) -> String {
    match err {
        RealtimeError::TransportError(msg)
        | RealtimeError::CredentialError(msg)
        | RealtimeError::RemoteError(msg)
        | RealtimeError::InvalidConfiguration(msg)
        | RealtimeError::InvalidState(msg)
        | RealtimeError::SerializationError(msg) => msg.clone(),
        other => other.to_string(),
    }
}
