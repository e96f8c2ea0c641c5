//! HTTP client for the WhatsApp messaging gateway.
//!
//! Each channel instance carries its own endpoint and credential; this
//! client is stateless across instances.

use {
    async_trait::async_trait,
    base64::Engine as _,
    bytes::Bytes,
    reqwest::Client,
    tracing::{debug, warn},
};

use crate::{
    Result,
    error::Error,
    outbound::{ChannelOutbound, InstanceRef},
};

pub struct WhatsAppGateway {
    http: Client,
}

impl Default for WhatsAppGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatsAppGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    async fn post_json(
        &self,
        instance: &InstanceRef,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<()> {
        let url = format!("{}/{path}", instance.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&instance.credential)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::external(format!("POST {path}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelOutbound for WhatsAppGateway {
    async fn send_text(&self, instance: &InstanceRef, to: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Err(Error::invalid_input("empty text"));
        }
        debug!(instance = %instance.id, to = %to, chars = text.len(), "sending text");
        self.post_json(
            instance,
            "messages/text",
            &serde_json::json!({ "to": to, "text": text }),
        )
        .await
    }

    async fn send_audio(
        &self,
        instance: &InstanceRef,
        to: &str,
        audio: Bytes,
        mime_type: &str,
    ) -> Result<()> {
        if audio.is_empty() {
            return Err(Error::invalid_input("empty audio payload"));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&audio);
        let body = serde_json::json!({
            "to": to,
            "audio_base64": encoded,
            "mime_type": mime_type,
            "voice_note": true,
        });

        debug!(instance = %instance.id, to = %to, bytes = audio.len(), "sending voice note");
        match self.post_json(instance, "messages/voice", &body).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Some gateway versions lack the dedicated voice operation;
                // retry through the generic media endpoint.
                warn!(instance = %instance.id, error = %e, "voice send failed, trying generic media");
                self.post_json(
                    instance,
                    "messages/media",
                    &serde_json::json!({
                        "to": to,
                        "media_base64": encoded,
                        "mime_type": mime_type,
                    }),
                )
                .await
            },
        }
    }

    async fn fetch_media(&self, instance: &InstanceRef, media_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/media/{media_id}",
            instance.endpoint.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&instance.credential)
            .send()
            .await
            .map_err(|e| Error::external("GET media", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway {
                status: status.as_u16(),
                body,
            });
        }
        response
            .bytes()
            .await
            .map_err(|e| Error::external("read media body", e))
    }

    async fn send_typing(&self, instance: &InstanceRef, to: &str) -> Result<()> {
        self.post_json(
            instance,
            "presence",
            &serde_json::json!({ "to": to, "state": "composing" }),
        )
        .await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn instance(server: &MockServer) -> InstanceRef {
        InstanceRef {
            id: "wa-1".into(),
            endpoint: server.uri(),
            credential: "tok-abc".into(),
        }
    }

    #[tokio::test]
    async fn send_text_posts_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/text"))
            .and(header("authorization", "Bearer tok-abc"))
            .and(body_partial_json(serde_json::json!({
                "to": "5511998765432",
                "text": "olá"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = WhatsAppGateway::new();
        gateway
            .send_text(&instance(&server), "5511998765432", "olá")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_audio_falls_back_to_generic_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/voice"))
            .respond_with(ResponseTemplate::new(501))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages/media"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = WhatsAppGateway::new();
        gateway
            .send_audio(
                &instance(&server),
                "5511998765432",
                Bytes::from_static(b"OggS"),
                "audio/ogg",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_media_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/media-123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OggS...".to_vec()))
            .mount(&server)
            .await;

        let gateway = WhatsAppGateway::new();
        let bytes = gateway
            .fetch_media(&instance(&server), "media-123")
            .await
            .unwrap();
        assert_eq!(&bytes[..4], b"OggS");
    }

    #[tokio::test]
    async fn gateway_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages/text"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad credential"))
            .mount(&server)
            .await;

        let gateway = WhatsAppGateway::new();
        let err = gateway
            .send_text(&instance(&server), "551199", "olá")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gateway { status: 403, .. }));
    }
}
