//! Speech synthesis backends
//!
//! [`SynthesisBackend`] is the capability the speaker pipeline consumes.
//! [`OpenAiSpeech`] implements it over an OpenAI-compatible `/audio/speech`
//! endpoint, streaming response bytes so playback can begin before the
//! whole clip is synthesized.

use crate::config::SpeechConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Default speech API base URL
pub const DEFAULT_SPEECH_API_BASE: &str = "https://api.openai.com/v1";

/// Capacity of the streamed-audio channel
const AUDIO_CHANNEL_CAPACITY: usize = 32;

/// Capability to turn text into audio
#[async_trait]
pub trait SynthesisBackend: Send + Sync {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Synthesize a whole clip
    async fn synthesize(&self, text: &str) -> Result<Bytes>;

    /// Synthesize as a stream of audio byte chunks
    async fn synthesize_stream(&self, text: &str) -> Result<mpsc::Receiver<Result<Bytes>>>;
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// OpenAI-compatible speech synthesis backend
pub struct OpenAiSpeech {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
}

impl OpenAiSpeech {
    /// Create a backend from speech configuration and the environment
    pub fn from_env(config: &SpeechConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::NotEnabled("TTS requires OPENAI_API_KEY".to_string()))?;
        let base_url = std::env::var("OKULO_SPEECH_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SPEECH_API_BASE.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        info!(
            voice = %config.voice,
            model = %config.speech_model,
            "speech synthesis initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url,
            model: config.speech_model.clone(),
            voice: config.voice.clone(),
        })
    }

    /// The configured voice
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    async fn request(&self, text: &str) -> Result<reqwest::Response> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
        };

        debug!(chars = text.len(), "synthesizing speech");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Tts(format!("speech request failed: {status}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl SynthesisBackend for OpenAiSpeech {
    fn name(&self) -> &str {
        "openai-speech"
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        let response = self.request(text).await?;
        response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    async fn synthesize_stream(&self, text: &str) -> Result<mpsc::Receiver<Result<Bytes>>> {
        let response = self.request(text).await?;
        let (tx, rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let item = chunk.map_err(|e| Error::Network(e.to_string()));
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    return;
                }
            }
        });

        Ok(rx)
    }
}
