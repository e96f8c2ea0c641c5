//! Config schema types (server, store, llm, speech, analytics, agent).

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxbiConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub analytics: AnalyticsConfig,
    pub agent: AgentConfig,
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8478,
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite connection URL, e.g. `sqlite://voxbi.db`.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://voxbi.db".into(),
        }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider kind: "anthropic" or "openai" (any OpenAI-compatible endpoint).
    pub provider: String,

    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,

    /// Override the base URL (for OpenAI-compatible gateways).
    pub base_url: Option<String>,

    /// Model ID.
    pub model: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".into(),
            api_key: None,
            base_url: None,
            model: "claude-sonnet-4-20250514".into(),
        }
    }
}

/// Speech bridge configuration (transcription + synthesis).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Spoken language for both transcription and normalization (ISO 639-1).
    pub language: String,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    /// Hard character ceiling applied to text before synthesis.
    pub max_speech_chars: usize,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "pt".into(),
            stt: SttConfig::default(),
            tts: TtsConfig::default(),
            max_speech_chars: 900,
        }
    }
}

/// Speech-to-text provider configuration (Whisper-compatible API).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub base_url: Option<String>,
    pub model: String,
}

impl std::fmt::Debug for SttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "whisper-large-v3-turbo".into(),
        }
    }
}

/// Text-to-speech provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub base_url: Option<String>,
    pub model: String,
    pub voice: String,
}

impl std::fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish()
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: "tts-1".into(),
            voice: "alloy".into(),
        }
    }
}

/// Analytics engine configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Engine base URL.
    pub base_url: String,
    pub client_id: String,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for AnalyticsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            client_id: String::new(),
            client_secret: None,
            timeout_seconds: 60,
        }
    }
}

/// Agent loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Assistant display name used in the system prompt and message log.
    pub persona_name: String,
    /// Byte cap applied to each tool result before it enters the transcript.
    pub max_tool_result_bytes: usize,
    /// Byte cap applied to the model documentation blob.
    pub model_doc_max_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona_name: "Voxbi".into(),
            max_tool_result_bytes: 24_000,
            model_doc_max_bytes: 16_000,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
