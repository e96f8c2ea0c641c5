//! Speech-to-Text provider abstraction and implementations.

mod whisper;

pub use whisper::WhisperStt;

use {anyhow::Result, async_trait::async_trait, bytes::Bytes, serde::Deserialize};

use crate::tts::AudioFormat;

/// Request to transcribe audio to text.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// Raw audio data.
    pub audio: Bytes,
    /// Audio format.
    pub format: AudioFormat,
    /// Spoken language (ISO 639-1 code). The orchestrator pins this to the
    /// configured language; transcription never auto-detects.
    pub language: String,
}

/// Transcription result.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcript {
    /// Transcribed text.
    pub text: String,
    /// Detected language, if the provider reports one.
    #[serde(default)]
    pub language: Option<String>,
    /// Duration of the audio in seconds, if known.
    #[serde(default)]
    pub duration_seconds: Option<f32>,
}

/// Speech-to-Text provider trait.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Provider identifier (e.g., "whisper").
    fn id(&self) -> &'static str;

    /// Check if the provider is configured and ready.
    fn is_configured(&self) -> bool;

    /// Transcribe audio to text.
    async fn transcribe(&self, request: TranscribeRequest) -> Result<Transcript>;
}
