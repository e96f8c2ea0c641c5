//! Inbound webhook envelope parsing and normalization.
//!
//! The gateway posts one envelope per event. Only "message.received" events
//! from other parties carry work; everything else is classified and
//! dropped before any store access happens.

use {
    base64::Engine as _,
    bytes::Bytes,
    serde::Deserialize,
};

/// Raw webhook envelope as posted by the messaging gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    /// Gateway sender id, e.g. "5511998765432@s.whatsapp.net".
    pub sender_id: String,
    #[serde(default)]
    pub from_self: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<AudioPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioPayload {
    /// Base64-encoded audio bytes, when the gateway inlines the media.
    #[serde(default)]
    pub data_base64: Option<String>,
    /// Media id to fetch from the gateway otherwise.
    #[serde(default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Reference to the audio of an inbound voice note.
#[derive(Debug, Clone)]
pub enum AudioRef {
    /// Bytes arrived inline in the webhook.
    Inline { data: Bytes, mime_type: String },
    /// Bytes must be fetched through the channel's media endpoint.
    Media {
        media_id: String,
        mime_type: Option<String>,
    },
}

/// Why an event produced no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    WrongEventType,
    FromSelf,
    EmptyPayload,
}

impl IgnoreReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongEventType => "ignored_event_type",
            Self::FromSelf => "ignored_from_self",
            Self::EmptyPayload => "ignored_empty_payload",
        }
    }
}

/// A normalized inbound event.
#[derive(Debug, Clone)]
pub enum Inbound {
    Text { phone: String, text: String },
    Audio { phone: String, audio: AudioRef },
    Ignored(IgnoreReason),
}

/// The only event type that carries user messages.
const MESSAGE_RECEIVED: &str = "message.received";

/// Extract the bare phone number from a gateway sender id.
fn phone_from_sender(sender_id: &str) -> String {
    let head = sender_id.split('@').next().unwrap_or(sender_id);
    head.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a webhook envelope into work (or a classified no-op).
#[must_use]
pub fn normalize(event: WebhookEvent) -> Inbound {
    if event.event_type != MESSAGE_RECEIVED {
        return Inbound::Ignored(IgnoreReason::WrongEventType);
    }
    let Some(message) = event.message else {
        return Inbound::Ignored(IgnoreReason::EmptyPayload);
    };
    if message.from_self {
        return Inbound::Ignored(IgnoreReason::FromSelf);
    }

    let phone = phone_from_sender(&message.sender_id);
    if phone.is_empty() {
        return Inbound::Ignored(IgnoreReason::EmptyPayload);
    }

    if let Some(audio) = message.audio {
        if let Some(data_base64) = audio.data_base64 {
            match base64::engine::general_purpose::STANDARD.decode(data_base64.trim()) {
                Ok(data) if !data.is_empty() => {
                    return Inbound::Audio {
                        phone,
                        audio: AudioRef::Inline {
                            data: Bytes::from(data),
                            mime_type: audio
                                .mime_type
                                .unwrap_or_else(|| "audio/ogg".into()),
                        },
                    };
                },
                _ => return Inbound::Ignored(IgnoreReason::EmptyPayload),
            }
        }
        if let Some(media_id) = audio.media_id {
            return Inbound::Audio {
                phone,
                audio: AudioRef::Media {
                    media_id,
                    mime_type: audio.mime_type,
                },
            };
        }
        return Inbound::Ignored(IgnoreReason::EmptyPayload);
    }

    match message.text {
        Some(text) if !text.trim().is_empty() => Inbound::Text {
            phone,
            text: text.trim().to_string(),
        },
        _ => Inbound::Ignored(IgnoreReason::EmptyPayload),
    }
}
