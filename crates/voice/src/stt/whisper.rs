//! Whisper-compatible STT provider.
//!
//! Targets the OpenAI `/audio/transcriptions` endpoint shape, which several
//! hosted Whisper deployments expose.

use {
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    reqwest::{
        Client,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use super::{SttProvider, TranscribeRequest, Transcript};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default transcription model.
const DEFAULT_MODEL: &str = "whisper-large-v3-turbo";

/// Whisper-compatible STT provider.
#[derive(Clone)]
pub struct WhisperStt {
    client: Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for WhisperStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperStt")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl WhisperStt {
    /// Create a new provider with optional base-URL and model overrides.
    #[must_use]
    pub fn new(
        api_key: Option<Secret<String>>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.into()),
        }
    }

    fn get_api_key(&self) -> Result<&Secret<String>> {
        self.api_key
            .as_ref()
            .ok_or_else(|| anyhow!("STT API key not configured"))
    }
}

#[async_trait]
impl SttProvider for WhisperStt {
    fn id(&self) -> &'static str {
        "whisper"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(&self, request: TranscribeRequest) -> Result<Transcript> {
        let api_key = self.get_api_key()?;

        let filename = format!("audio.{}", request.format.extension());
        let file_part = Part::bytes(request.audio.to_vec())
            .file_name(filename)
            .mime_str(request.format.mime_type())
            .context("failed to create file part")?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", request.language.clone())
            .text("response_format", "verbose_json");

        debug!(model = %self.model, language = %request.language, "transcription request");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await
            .context("failed to send transcription request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("transcription request failed: {status} - {body}"));
        }

        let payload: WhisperResponse = response
            .json()
            .await
            .context("failed to parse transcription response")?;

        Ok(Transcript {
            text: payload.text,
            language: payload.language,
            duration_seconds: payload.duration,
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        bytes::Bytes,
        wiremock::{
            Mock, MockServer, ResponseTemplate,
            matchers::{method, path},
        },
    };

    use {super::*, crate::tts::AudioFormat};

    fn request() -> TranscribeRequest {
        TranscribeRequest {
            audio: Bytes::from_static(b"fake audio"),
            format: AudioFormat::Opus,
            language: "pt".into(),
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let provider = WhisperStt::new(Some(Secret::new("super-secret".into())), None, None);
        let output = format!("{provider:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret"));
    }

    #[tokio::test]
    async fn transcribe_without_api_key_fails() {
        let provider = WhisperStt::new(None, None, None);
        assert!(!provider.is_configured());
        let err = provider.transcribe(request()).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn transcribe_parses_verbose_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "qual foi o faturamento de ontem",
                "language": "pt",
                "duration": 3.2
            })))
            .mount(&server)
            .await;

        let provider = WhisperStt::new(
            Some(Secret::new("key".into())),
            Some(server.uri()),
            None,
        );
        let transcript = provider.transcribe(request()).await.unwrap();
        assert_eq!(transcript.text, "qual foi o faturamento de ontem");
        assert_eq!(transcript.language.as_deref(), Some("pt"));
    }

    #[tokio::test]
    async fn transcribe_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider = WhisperStt::new(
            Some(Secret::new("key".into())),
            Some(server.uri()),
            None,
        );
        let err = provider.transcribe(request()).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
