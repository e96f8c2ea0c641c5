//! Text-to-Speech provider abstraction and implementations.

mod openai;

pub use openai::OpenAiTts;

use {
    anyhow::Result,
    async_trait::async_trait,
    bytes::Bytes,
    serde::{Deserialize, Serialize},
};

/// Audio format used for both inbound media and synthesized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3 format (widely compatible).
    Mp3,
    /// Opus in OGG container (the voice-note format of messaging gateways).
    #[default]
    Opus,
    /// AAC format.
    Aac,
}

impl AudioFormat {
    /// MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/ogg",
            Self::Aac => "audio/aac",
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "ogg",
            Self::Aac => "aac",
        }
    }

    /// Best-effort guess from a MIME type string. Defaults to Opus, the
    /// voice-note format.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.split(';').next().unwrap_or("").trim() {
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/aac" => Self::Aac,
            _ => Self::Opus,
        }
    }
}

/// Request to synthesize speech from text.
#[derive(Debug, Clone, Default)]
pub struct SynthesizeRequest {
    /// Text to convert to speech. Expected to already be normalized for
    /// speech (see [`crate::speech`]).
    pub text: String,
    /// Voice ID (provider-specific).
    pub voice_id: Option<String>,
    /// Model to use (provider-specific).
    pub model: Option<String>,
    /// Output audio format.
    pub output_format: AudioFormat,
}

/// Audio output from TTS synthesis.
#[derive(Debug, Clone)]
pub struct AudioOutput {
    /// Raw audio data.
    pub data: Bytes,
    /// Audio format.
    pub format: AudioFormat,
}

/// Text-to-Speech provider trait.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Provider identifier (e.g., "openai").
    fn id(&self) -> &'static str;

    /// Check if the provider is configured and ready.
    fn is_configured(&self) -> bool;

    /// Convert text to speech.
    async fn synthesize(&self, request: SynthesizeRequest) -> Result<AudioOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_and_extension_agree() {
        assert_eq!(AudioFormat::Opus.mime_type(), "audio/ogg");
        assert_eq!(AudioFormat::Opus.extension(), "ogg");
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
    }

    #[test]
    fn from_mime_defaults_to_opus() {
        assert_eq!(AudioFormat::from_mime("audio/mpeg"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_mime("audio/ogg; codecs=opus"), AudioFormat::Opus);
        assert_eq!(AudioFormat::from_mime("application/pdf"), AudioFormat::Opus);
    }
}
