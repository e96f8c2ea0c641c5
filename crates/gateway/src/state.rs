//! Shared orchestrator state.

use std::sync::Arc;

use {dashmap::DashMap, tokio::sync::Mutex};

use {
    voxbi_agents::model::LlmProvider,
    voxbi_analytics::AnalyticsClient,
    voxbi_channel::outbound::ChannelOutbound,
    voxbi_config::VoxbiConfig,
    voxbi_store::Store,
    voxbi_voice::{stt::SttProvider, tts::TtsProvider},
};

/// Everything a turn needs. Cross-turn state lives in the store; this
/// struct only carries clients and configuration.
pub struct AppState {
    pub config: VoxbiConfig,
    pub store: Store,
    pub llm: Arc<dyn LlmProvider>,
    pub stt: Arc<dyn SttProvider>,
    pub tts: Arc<dyn TtsProvider>,
    pub outbound: Arc<dyn ChannelOutbound>,
    pub analytics: Arc<AnalyticsClient>,
    /// Per-sender advisory locks serializing turns within this process.
    /// Concurrent deliveries for the same sender otherwise race on the
    /// conversation-context upsert; across processes the upsert still
    /// converges by key.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: VoxbiConfig,
        store: Store,
        llm: Arc<dyn LlmProvider>,
        stt: Arc<dyn SttProvider>,
        tts: Arc<dyn TtsProvider>,
        outbound: Arc<dyn ChannelOutbound>,
        analytics: Arc<AnalyticsClient>,
    ) -> Self {
        Self {
            config,
            store,
            llm,
            stt,
            tts,
            outbound,
            analytics,
            turn_locks: DashMap::new(),
        }
    }

    /// The advisory lock for one sender.
    #[must_use]
    pub fn turn_lock(&self, phone: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
