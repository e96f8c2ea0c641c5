//! End-to-end turn pipeline tests over an in-memory store and fake
//! collaborators for the channel, speech services, and LLM.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    tokio::sync::Mutex,
};

use {
    voxbi_agents::model::{ChatMessage, CompletionResponse, LlmProvider, Usage},
    voxbi_analytics::AnalyticsClient,
    voxbi_channel::{
        outbound::{ChannelOutbound, InstanceRef},
        webhook::{AudioRef, Inbound},
    },
    voxbi_config::VoxbiConfig,
    voxbi_gateway::{
        phrases,
        state::AppState,
        turn::{TurnStatus, handle_inbound},
    },
    voxbi_store::{Direction, Store},
    voxbi_voice::{
        stt::{SttProvider, TranscribeRequest, Transcript},
        tts::{AudioOutput, SynthesizeRequest, TtsProvider},
    },
};

const PHONE: &str = "5511998765432";

// ── Fakes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Sent {
    Text { instance: String, text: String },
    Audio { instance: String, bytes: usize },
}

#[derive(Default)]
struct FakeOutbound {
    sent: Mutex<Vec<Sent>>,
    fail_audio: AtomicBool,
    media: Mutex<Option<Bytes>>,
}

impl FakeOutbound {
    async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text.clone()),
                Sent::Audio { .. } => None,
            })
            .collect()
    }

    async fn all(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChannelOutbound for FakeOutbound {
    async fn send_text(
        &self,
        instance: &InstanceRef,
        _to: &str,
        text: &str,
    ) -> voxbi_channel::Result<()> {
        self.sent.lock().await.push(Sent::Text {
            instance: instance.id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_audio(
        &self,
        instance: &InstanceRef,
        _to: &str,
        audio: Bytes,
        _mime_type: &str,
    ) -> voxbi_channel::Result<()> {
        if self.fail_audio.load(Ordering::SeqCst) {
            return Err(voxbi_channel::Error::Gateway {
                status: 500,
                body: "audio unavailable".into(),
            });
        }
        self.sent.lock().await.push(Sent::Audio {
            instance: instance.id.clone(),
            bytes: audio.len(),
        });
        Ok(())
    }

    async fn fetch_media(
        &self,
        _instance: &InstanceRef,
        _media_id: &str,
    ) -> voxbi_channel::Result<Bytes> {
        Ok(self
            .media
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| Bytes::from_static(b"OggS")))
    }
}

struct FakeStt {
    transcript: Option<String>,
}

#[async_trait]
impl SttProvider for FakeStt {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn transcribe(&self, _request: TranscribeRequest) -> anyhow::Result<Transcript> {
        match &self.transcript {
            Some(text) => Ok(Transcript {
                text: text.clone(),
                language: Some("pt".into()),
                duration_seconds: Some(2.0),
            }),
            None => anyhow::bail!("speech service unavailable"),
        }
    }
}

struct FakeTts {
    fail: bool,
}

#[async_trait]
impl TtsProvider for FakeTts {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn synthesize(&self, request: SynthesizeRequest) -> anyhow::Result<AudioOutput> {
        if self.fail {
            anyhow::bail!("synthesis unavailable");
        }
        Ok(AudioOutput {
            data: Bytes::from(request.text.into_bytes()),
            format: request.output_format,
        })
    }
}

struct ScriptedLlm {
    responses: Mutex<Vec<CompletionResponse>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(mut responses: Vec<CompletionResponse>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        }
    }

    fn answering(text: &str) -> Self {
        Self::new(vec![CompletionResponse {
            text: Some(text.into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }])
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn id(&self) -> &str {
        "scripted-1"
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _tools: &[serde_json::Value],
    ) -> anyhow::Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop()
            .ok_or_else(|| anyhow::anyhow!("llm unavailable"))
    }
}

// ── Harness ─────────────────────────────────────────────────────────────

struct Harness {
    state: AppState,
    outbound: Arc<FakeOutbound>,
    llm: Arc<ScriptedLlm>,
}

async fn harness(llm: ScriptedLlm, stt: FakeStt, tts: FakeTts) -> Harness {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    let store = Store::with_pool(pool).await.unwrap();
    let outbound = Arc::new(FakeOutbound::default());
    let llm = Arc::new(llm);
    let analytics = Arc::new(
        AnalyticsClient::from_config(&voxbi_config::AnalyticsConfig {
            base_url: "http://127.0.0.1:1".into(),
            client_id: "test".into(),
            client_secret: Some(secrecy::Secret::new("s".into())),
            timeout_seconds: 1,
        })
        .unwrap(),
    );
    let state = AppState::new(
        VoxbiConfig::default(),
        store,
        llm.clone(),
        Arc::new(stt),
        Arc::new(tts),
        outbound.clone(),
        analytics,
    );
    Harness {
        state,
        outbound,
        llm,
    }
}

async fn seed_contact(store: &Store, tenant: &str, instance_id: &str, instance_name: &str) {
    sqlx::query(
        "INSERT INTO authorized_contacts (phone, tenant_id, instance_id, active)
         VALUES (?, ?, ?, 1)",
    )
    .bind(PHONE)
    .bind(tenant)
    .bind(instance_id)
    .execute(store.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT OR IGNORE INTO channel_instances (id, name, endpoint, credential, connected)
         VALUES (?, ?, 'https://gw.local', 'tok', 1)",
    )
    .bind(instance_id)
    .bind(instance_name)
    .execute(store.pool())
    .await
    .unwrap();
}

async fn seed_binding(store: &Store, tenant: &str, dataset_id: &str, name: &str, position: i64) {
    sqlx::query(
        "INSERT INTO dataset_bindings
         (phone, tenant_id, connection_id, dataset_id, dataset_name, position)
         VALUES (?, ?, 'conn-1', ?, ?, ?)",
    )
    .bind(PHONE)
    .bind(tenant)
    .bind(dataset_id)
    .bind(name)
    .bind(position)
    .execute(store.pool())
    .await
    .unwrap();
}

fn text_inbound(text: &str) -> Inbound {
    Inbound::Text {
        phone: PHONE.into(),
        text: text.into(),
    }
}

fn audio_inbound() -> Inbound {
    Inbound::Audio {
        phone: PHONE.into(),
        audio: AudioRef::Inline {
            data: Bytes::from_static(b"OggS"),
            mime_type: "audio/ogg".into(),
        },
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_sender_gets_no_reply() {
    let h = harness(
        ScriptedLlm::answering("never"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;

    let status = handle_inbound(&h.state, text_inbound("qual o total?")).await;
    assert_eq!(status, TurnStatus::Unauthorized);
    assert!(h.outbound.all().await.is_empty());
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn single_contact_single_dataset_is_answered_without_menus() {
    let h = harness(
        ScriptedLlm::answering("O faturamento de ontem foi de quinze mil reais."),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, text_inbound("faturamento de ontem")).await;
    assert_eq!(status, TurnStatus::Answered);

    let texts = h.outbound.texts().await;
    assert_eq!(texts.len(), 1, "no menu, no filler for a quick question");
    assert!(texts[0].contains("quinze mil reais"));

    // The auto-bound dataset persisted into the same-day context.
    let now = chrono::Utc::now().timestamp();
    let ctx = h.state.store.context(PHONE, now).await.unwrap().unwrap();
    assert_eq!(
        ctx.dataset.as_ref().map(|d| d.dataset_id.as_str()),
        Some("ds-1")
    );

    // Both directions were logged.
    let log = h.state.store.recent_messages(PHONE, 10).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].direction, Direction::In);
    assert_eq!(log[1].direction, Direction::Out);
}

#[tokio::test]
async fn multiple_instances_run_the_menu_flow() {
    let h = harness(
        ScriptedLlm::answering("nunca chega aqui"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_contact(&h.state.store, "globex", "wa-2", "Globex").await;

    // First contact renders the menu and ends the turn.
    let status = handle_inbound(&h.state, text_inbound("oi, qual o total?")).await;
    assert_eq!(status, TurnStatus::MenuSent);
    let texts = h.outbound.texts().await;
    assert!(texts[0].contains("1. Acme"));
    assert!(texts[0].contains("2. Globex"));
    assert_eq!(h.llm.calls(), 0);

    // An out-of-range digit re-renders the menu and persists nothing.
    let status = handle_inbound(&h.state, text_inbound("7")).await;
    assert_eq!(status, TurnStatus::MenuSent);
    let now = chrono::Utc::now().timestamp();
    assert!(h.state.store.context(PHONE, now).await.unwrap().is_none());

    // A valid digit selects, confirms, and ends the turn.
    let status = handle_inbound(&h.state, text_inbound("2")).await;
    assert_eq!(status, TurnStatus::SelectionSaved);
    let texts = h.outbound.texts().await;
    assert!(texts.last().unwrap().contains("Globex"));
    let ctx = h.state.store.context(PHONE, now).await.unwrap().unwrap();
    assert_eq!(ctx.instance_id.as_deref(), Some("wa-2"));
}

#[tokio::test]
async fn reserved_keyword_reopens_the_instance_menu() {
    let h = harness(
        ScriptedLlm::answering("nunca"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_contact(&h.state.store, "globex", "wa-2", "Globex").await;

    let now = chrono::Utc::now().timestamp();
    h.state
        .store
        .save_instance_selection(PHONE, "wa-1", now)
        .await
        .unwrap();

    let status = handle_inbound(&h.state, text_inbound("trocar")).await;
    assert_eq!(status, TurnStatus::MenuSent);
    assert!(h.outbound.texts().await[0].contains("1. Acme"));
}

#[tokio::test]
async fn dataset_menu_flow_selects_and_answers() {
    let h = harness(
        ScriptedLlm::new(vec![CompletionResponse {
            text: Some("O estoque está em dois mil itens.".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;
    seed_binding(&h.state.store, "acme", "ds-2", "Estoque", 1).await;

    let status = handle_inbound(&h.state, text_inbound("como está o estoque?")).await;
    assert_eq!(status, TurnStatus::MenuSent);
    let texts = h.outbound.texts().await;
    assert!(texts[0].contains("1. Vendas"));
    assert!(texts[0].contains("2. Estoque"));

    let status = handle_inbound(&h.state, text_inbound("2")).await;
    assert_eq!(status, TurnStatus::SelectionSaved);
    assert!(h.outbound.texts().await.last().unwrap().contains("Estoque"));

    let status = handle_inbound(&h.state, text_inbound("quantos itens temos?")).await;
    assert_eq!(status, TurnStatus::Answered);
    assert!(
        h.outbound
            .texts()
            .await
            .last()
            .unwrap()
            .contains("dois mil itens")
    );
}

#[tokio::test]
async fn no_bindings_informs_the_user() {
    let h = harness(
        ScriptedLlm::answering("nunca"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;

    let status = handle_inbound(&h.state, text_inbound("qual o total?")).await;
    assert_eq!(status, TurnStatus::NoDatasets);
    assert_eq!(h.outbound.texts().await, vec![phrases::NO_DATASETS.to_string()]);
}

#[tokio::test]
async fn involved_question_sends_a_filler_notice_first() {
    let h = harness(
        ScriptedLlm::answering(
            "A comparação mostra crescimento de doze por cento entre as lojas.",
        ),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(
        &h.state,
        text_inbound("compare a evolução de vendas entre as lojas"),
    )
    .await;
    assert_eq!(status, TurnStatus::Answered);
    let texts = h.outbound.texts().await;
    assert_eq!(texts.len(), 2, "filler then answer");
    assert!(texts[1].contains("doze por cento"));
}

#[tokio::test]
async fn audio_turn_is_answered_with_a_voice_note() {
    let h = harness(
        ScriptedLlm::answering(
            "O faturamento do mês passado foi de R$ 1.500.000,00, um ótimo resultado.",
        ),
        FakeStt {
            transcript: Some("qual foi o faturamento do mês passado".into()),
        },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, audio_inbound()).await;
    assert_eq!(status, TurnStatus::Answered);

    let sent = h.outbound.all().await;
    assert!(
        sent.iter().any(|s| matches!(s, Sent::Audio { .. })),
        "expected a voice note, got {sent:?}"
    );

    // The transcript, not the audio, is what lands in the log.
    let log = h.state.store.recent_messages(PHONE, 10).await.unwrap();
    assert!(log[0].content.contains("faturamento do mês passado"));
}

#[tokio::test]
async fn synthesis_failure_falls_back_to_text() {
    let h = harness(
        ScriptedLlm::answering("O faturamento de ontem somou quarenta e cinco mil reais."),
        FakeStt {
            transcript: Some("faturamento de ontem".into()),
        },
        FakeTts { fail: true },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, audio_inbound()).await;
    assert_eq!(status, TurnStatus::Answered);

    let sent = h.outbound.all().await;
    assert!(sent.iter().all(|s| matches!(s, Sent::Text { .. })));
    assert!(
        h.outbound
            .texts()
            .await
            .last()
            .unwrap()
            .contains("quarenta e cinco mil")
    );
}

#[tokio::test]
async fn audio_send_failure_falls_back_to_text() {
    let h = harness(
        ScriptedLlm::answering("O total de pedidos de hoje chegou a trezentos."),
        FakeStt {
            transcript: Some("quantos pedidos hoje".into()),
        },
        FakeTts { fail: false },
    )
    .await;
    h.outbound.fail_audio.store(true, Ordering::SeqCst);
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, audio_inbound()).await;
    assert_eq!(status, TurnStatus::Answered);
    assert!(
        h.outbound
            .texts()
            .await
            .last()
            .unwrap()
            .contains("trezentos")
    );
}

#[tokio::test]
async fn transcription_failure_aborts_before_the_agent_loop() {
    let h = harness(
        ScriptedLlm::answering("nunca"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, audio_inbound()).await;
    assert_eq!(status, TurnStatus::TranscriptionFailed);
    assert_eq!(
        h.outbound.texts().await,
        vec![phrases::TRANSCRIPTION_APOLOGY.to_string()]
    );
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn llm_failure_yields_the_generic_apology() {
    let h = harness(
        ScriptedLlm::new(vec![]),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    seed_contact(&h.state.store, "acme", "wa-1", "Acme").await;
    seed_binding(&h.state.store, "acme", "ds-1", "Vendas", 0).await;

    let status = handle_inbound(&h.state, text_inbound("faturamento de ontem")).await;
    assert_eq!(status, TurnStatus::Failed);
    assert_eq!(
        h.outbound.texts().await,
        vec![phrases::GENERIC_FAILURE.to_string()]
    );
}

#[tokio::test]
async fn ignored_events_produce_no_work() {
    let h = harness(
        ScriptedLlm::answering("nunca"),
        FakeStt { transcript: None },
        FakeTts { fail: false },
    )
    .await;
    let status = handle_inbound(
        &h.state,
        Inbound::Ignored(voxbi_channel::webhook::IgnoreReason::FromSelf),
    )
    .await;
    assert_eq!(status, TurnStatus::Ignored(voxbi_channel::webhook::IgnoreReason::FromSelf));
    assert!(h.outbound.all().await.is_empty());
}
