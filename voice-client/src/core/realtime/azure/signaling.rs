//! HTTP signaling for the Azure realtime service.
//!
//! Two calls set up a session:
//!
//! 1. `POST <sessions_url>` with the resource `api-key` mints an ephemeral
//!    credential for the chosen deployment and voice.
//! 2. `POST <webrtc_url>?model=<deployment>` with that credential as a bearer
//!    token exchanges the local SDP offer for the remote answer.

use std::time::Duration;

use tracing::{debug, info};

use super::config::RealtimeVoice;
use super::messages::{EphemeralSessionRequest, EphemeralSessionResponse};
use crate::config::{Secret, VoiceConfig};
use crate::core::realtime::base::{RealtimeError, RealtimeResult};

/// Short-lived credential scoped to one negotiation.
#[derive(Debug, Clone)]
pub struct EphemeralKey {
    /// Remote session id, when the service reports one
    pub session_id: Option<String>,
    pub value: Secret,
    /// Unix timestamp (seconds)
    pub expires_at: Option<i64>,
}

/// Client for the sessions and negotiation endpoints.
#[derive(Debug, Clone)]
pub struct RealtimeSignaling {
    client: reqwest::Client,
    api_key: Secret,
    sessions_url: String,
    webrtc_url: String,
    deployment: String,
    voice: RealtimeVoice,
}

impl RealtimeSignaling {
    /// Build a signaling client from the voice configuration.
    pub fn new(config: &VoiceConfig) -> RealtimeResult<Self> {
        let mut builder = reqwest::Client::builder().pool_idle_timeout(Duration::from_secs(90));
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            RealtimeError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            sessions_url: config.sessions_url.clone(),
            webrtc_url: config.webrtc_url.clone(),
            deployment: config.deployment.clone(),
            voice: config.voice,
        })
    }

    /// Mint an ephemeral credential.
    ///
    /// # Errors
    /// `CredentialError` on transport failure, non-2xx status or a body
    /// without `client_secret.value`.
    pub async fn fetch_ephemeral_key(&self) -> RealtimeResult<EphemeralKey> {
        let request = EphemeralSessionRequest {
            model: self.deployment.clone(),
            voice: self.voice,
        };

        debug!(
            deployment = %self.deployment,
            voice = %self.voice,
            "Requesting ephemeral key"
        );

        let response = self
            .client
            .post(&self.sessions_url)
            .header("api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RealtimeError::CredentialError(format!("Failed to get ephemeral key: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::CredentialError(format!(
                "Failed to get ephemeral key: {status}"
            )));
        }

        let body: EphemeralSessionResponse = response.json().await.map_err(|e| {
            RealtimeError::CredentialError(format!("Failed to parse ephemeral key response: {e}"))
        })?;

        let secret = body.client_secret.unwrap_or_default();
        let value = secret
            .value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                RealtimeError::CredentialError(
                    "Ephemeral key response missing client_secret.value".to_string(),
                )
            })?;

        info!(
            session_id = body.id.as_deref().unwrap_or("-"),
            "Ephemeral key obtained"
        );

        Ok(EphemeralKey {
            session_id: body.id,
            value: Secret::from(value),
            expires_at: secret.expires_at,
        })
    }

    /// Exchange the local offer SDP for the remote answer SDP.
    ///
    /// # Errors
    /// `TransportError` on transport failure or non-2xx status.
    pub async fn exchange_sdp(&self, key: &EphemeralKey, offer_sdp: &str) -> RealtimeResult<String> {
        debug!(bytes = offer_sdp.len(), "Posting SDP offer");

        let response = self
            .client
            .post(&self.webrtc_url)
            .query(&[("model", self.deployment.as_str())])
            .bearer_auth(key.value.expose())
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .body(offer_sdp.to_string())
            .send()
            .await
            .map_err(|e| RealtimeError::TransportError(format!("WebRTC connection failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::TransportError(format!(
                "WebRTC connection failed: {status}"
            )));
        }

        response.text().await.map_err(|e| {
            RealtimeError::TransportError(format!("Failed to read SDP answer: {e}"))
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_copies_config() {
        let config = VoiceConfig {
            api_key: Secret::from("key"),
            sessions_url: "https://res.example.com/sessions".to_string(),
            deployment: "dep".to_string(),
            http_timeout_seconds: Some(5),
            ..Default::default()
        };
        let signaling = RealtimeSignaling::new(&config).unwrap();
        assert_eq!(signaling.deployment(), "dep");
        assert_eq!(signaling.voice, RealtimeVoice::Alloy);
    }

    #[tokio::test]
    async fn test_unreachable_sessions_endpoint_is_credential_error() {
        let config = VoiceConfig {
            api_key: Secret::from("key"),
            // Port 9 (discard) on loopback refuses connections
            sessions_url: "http://127.0.0.1:9/sessions".to_string(),
            ..Default::default()
        };
        let signaling = RealtimeSignaling::new(&config).unwrap();
        let err = signaling.fetch_ephemeral_key().await.unwrap_err();
        assert!(matches!(err, RealtimeError::CredentialError(_)));
    }
}
