//! Speech-to-text via the OpenAI Whisper API

use crate::error::{Error, Result};
use async_openai::{
    config::OpenAIConfig,
    types::audio::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs},
    Client,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Capability to turn captured audio into text
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribe a WAV clip
    async fn transcribe(&self, audio_bytes: &[u8]) -> Result<String>;
}

/// Speech-to-text engine using the Whisper API
pub struct SpeechToText {
    client: Option<Client<OpenAIConfig>>,
    language: String,
}

impl SpeechToText {
    /// Create a new STT engine.
    ///
    /// If `OPENAI_API_KEY` is not set, transcription is disabled and every
    /// call returns a `NotEnabled` error.
    #[must_use]
    pub fn new(language: &str) -> Self {
        let client = if std::env::var("OPENAI_API_KEY").is_ok() {
            info!("STT initialized (language: {})", language);
            Some(Client::new())
        } else {
            warn!("OPENAI_API_KEY not set - STT disabled");
            None
        };

        Self {
            client,
            language: language.to_string(),
        }
    }

    /// Check if transcription is available
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Get the configured language
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Transcribe WAV audio to text
    pub async fn transcribe(&self, audio_bytes: &[u8]) -> Result<String> {
        // Basic WAV validation before spending a network call.
        if audio_bytes.len() < 44 {
            return Err(Error::Stt("Audio data too short".to_string()));
        }
        if &audio_bytes[0..4] != b"RIFF" || &audio_bytes[8..12] != b"WAVE" {
            return Err(Error::Stt("Invalid WAV format".to_string()));
        }

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| Error::NotEnabled("STT requires OPENAI_API_KEY".to_string()))?;

        debug!("Transcribing {} bytes", audio_bytes.len());

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(
                "audio.wav".to_string(),
                audio_bytes.to_vec(),
            ))
            .model("whisper-1")
            .language(&self.language)
            .response_format(AudioResponseFormat::Text)
            .build()
            .map_err(|e| Error::Stt(format!("Failed to build request: {e}")))?;

        let response = client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e| Error::Stt(format!("Transcription failed: {e}")))?;

        let text = response.text.trim().to_string();
        debug!("Transcription result: {}", text);

        Ok(text)
    }
}

#[async_trait]
impl TranscriptionClient for SpeechToText {
    async fn transcribe(&self, audio_bytes: &[u8]) -> Result<String> {
        SpeechToText::transcribe(self, audio_bytes).await
    }
}
