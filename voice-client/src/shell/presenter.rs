//! Presentation shell.
//!
//! Holds one [`AzureVoiceClient`], projects its emissions onto the display
//! state the landing page renders, and drives the voice modal.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::avatar::{AvatarColor, AvatarState};
use crate::core::realtime::{AzureVoiceClient, RealtimeError, Status, TranscriptDelta};

/// Error shown when `open_modal` cannot connect.
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect to voice service";

/// Everything the page renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    pub avatar: AvatarState,
    pub color: AvatarColor,
    pub modal_open: bool,
    pub voice_active: bool,
    pub connecting: bool,
    pub transcript: String,
    pub error: Option<String>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            avatar: AvatarState::Idle,
            color: AvatarColor::Blue,
            modal_open: false,
            voice_active: false,
            connecting: false,
            transcript: String::new(),
            error: None,
        }
    }
}

impl ShellState {
    pub fn apply_status(&mut self, status: Status) {
        self.avatar = AvatarState::for_status(status);
        match status {
            Status::Connecting => self.connecting = true,
            Status::Connected => {
                self.voice_active = true;
                self.connecting = false;
            }
            Status::Disconnected => {
                self.voice_active = false;
                self.connecting = false;
            }
            Status::Idle | Status::Listening | Status::Thinking | Status::Speaking => {}
        }
    }

    pub fn apply_transcript(&mut self, delta: &TranscriptDelta) {
        self.transcript.push_str(&delta.text);
    }

    pub fn apply_error(&mut self, error: &RealtimeError) {
        self.error = Some(error.to_string());
        self.avatar = AvatarState::Idle;
        self.connecting = false;
        self.voice_active = false;
    }
}

/// The landing page voice modal.
pub struct PresentationShell {
    client: AzureVoiceClient,
    state: Arc<Mutex<ShellState>>,
    auto_listen: Mutex<Option<JoinHandle<()>>>,
    auto_listen_delay: Duration,
}

impl PresentationShell {
    /// Wrap `client` and register the shell as its observer.
    pub fn new(client: AzureVoiceClient) -> Self {
        let state = Arc::new(Mutex::new(ShellState::default()));

        let on_status = state.clone();
        client.on_status_change(Arc::new(move |status| {
            on_status.lock().apply_status(status);
        }));

        let on_transcript = state.clone();
        client.on_transcript_update(Arc::new(move |delta| {
            on_transcript.lock().apply_transcript(&delta);
        }));

        let on_error = state.clone();
        client.on_error(Arc::new(move |error| {
            on_error.lock().apply_error(&error);
        }));

        let auto_listen_delay = client.config().auto_listen_delay();

        Self {
            client,
            state,
            auto_listen: Mutex::new(None),
            auto_listen_delay,
        }
    }

    pub fn client(&self) -> &AzureVoiceClient {
        &self.client
    }

    pub fn set_color(&self, color: AvatarColor) {
        self.state.lock().color = color;
    }

    /// Open the modal and start (or resume) the voice session.
    pub async fn open_modal(&self) {
        let voice_active = {
            let mut state = self.state.lock();
            state.modal_open = true;
            state.error = None;
            state.transcript.clear();
            state.voice_active
        };

        if voice_active {
            self.client.start_listening();
            return;
        }

        self.state.lock().connecting = true;

        if self.client.initialize().await {
            if !self.state.lock().modal_open {
                debug!("Modal closed while connecting; auto-listen skipped");
                return;
            }
            self.schedule_auto_listen();
        } else {
            let mut state = self.state.lock();
            // A close_modal during connect cancels the attempt; nothing to report then
            if state.modal_open {
                state.error = Some(CONNECT_FAILED_MESSAGE.to_string());
            }
            state.connecting = false;
        }
    }

    /// Start listening after the configured delay, unless the modal closed meanwhile.
    fn schedule_auto_listen(&self) {
        let client = self.client.clone();
        let state = self.state.clone();
        let delay = self.auto_listen_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.lock().modal_open {
                client.start_listening();
            } else {
                debug!("Modal closed before auto-listen fired");
            }
        });
        if let Some(previous) = self.auto_listen.lock().replace(handle) {
            previous.abort();
        }
        debug!(delay_ms = delay.as_millis() as u64, "Auto-listen scheduled");
    }

    /// Close the modal and tear the session down.
    pub async fn close_modal(&self) {
        {
            let mut state = self.state.lock();
            state.modal_open = false;
            state.transcript.clear();
            state.error = None;
        }
        self.cancel_auto_listen();

        self.client.disconnect().await;

        let mut state = self.state.lock();
        state.voice_active = false;
        state.avatar = AvatarState::Idle;
        state.connecting = false;
        info!("Voice modal closed");
    }

    pub fn snapshot(&self) -> ShellState {
        self.state.lock().clone()
    }

    fn cancel_auto_listen(&self) {
        if let Some(handle) = self.auto_listen.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for PresentationShell {
    fn drop(&mut self) {
        self.cancel_auto_listen();
    }
}
