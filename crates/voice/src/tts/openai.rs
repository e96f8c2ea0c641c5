//! OpenAI-style TTS provider (`/audio/speech`).

use {
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::debug,
};

use super::{AudioFormat, AudioOutput, SynthesizeRequest, TtsProvider};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default voice.
const DEFAULT_VOICE: &str = "alloy";

/// Default model (real-time optimized).
const DEFAULT_MODEL: &str = "tts-1";

/// OpenAI-style TTS provider.
#[derive(Clone)]
pub struct OpenAiTts {
    client: Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    default_voice: String,
    default_model: String,
}

impl std::fmt::Debug for OpenAiTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTts")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("default_voice", &self.default_voice)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenAiTts {
    /// Create a new provider with optional overrides.
    #[must_use]
    pub fn new(
        api_key: Option<Secret<String>>,
        base_url: Option<String>,
        voice: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            default_voice: voice.unwrap_or_else(|| DEFAULT_VOICE.into()),
            default_model: model.unwrap_or_else(|| DEFAULT_MODEL.into()),
        }
    }

    fn get_api_key(&self) -> Result<&Secret<String>> {
        self.api_key
            .as_ref()
            .ok_or_else(|| anyhow!("TTS API key not configured"))
    }

    fn response_format(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
        }
    }
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(&self, request: SynthesizeRequest) -> Result<AudioOutput> {
        let api_key = self.get_api_key()?;
        let voice = request.voice_id.as_deref().unwrap_or(&self.default_voice);
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = TtsRequest {
            model,
            input: &request.text,
            voice,
            response_format: Self::response_format(request.output_format),
        };

        debug!(voice = %voice, model = %model, chars = request.text.len(), "synthesis request");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .context("failed to send synthesis request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("synthesis request failed: {status} - {body}"));
        }

        let data = response
            .bytes()
            .await
            .context("failed to read synthesis response")?;

        Ok(AudioOutput {
            data,
            format: request.output_format,
        })
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}
