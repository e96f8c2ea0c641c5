use {async_trait::async_trait, bytes::Bytes};

use crate::Result;

/// The endpoint and credential of one channel instance, resolved by the
/// caller from the durable store.
#[derive(Debug, Clone)]
pub struct InstanceRef {
    pub id: String,
    pub endpoint: String,
    pub credential: String,
}

/// Send messages through a channel instance.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, instance: &InstanceRef, to: &str, text: &str) -> Result<()>;

    /// Send an audio voice note. Implementations fall back to a generic
    /// media send when the dedicated voice operation fails.
    async fn send_audio(
        &self,
        instance: &InstanceRef,
        to: &str,
        audio: Bytes,
        mime_type: &str,
    ) -> Result<()>;

    /// Fetch media referenced by a webhook but not inlined in it.
    async fn fetch_media(&self, instance: &InstanceRef, media_id: &str) -> Result<Bytes>;

    /// Send a "typing" indicator. Best-effort; no-op by default.
    async fn send_typing(&self, _instance: &InstanceRef, _to: &str) -> Result<()> {
        Ok(())
    }
}
