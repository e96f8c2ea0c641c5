//! The per-turn pipeline: resolution, speech decode, classification, the
//! agent loop, sanitization, delivery, and logging.
//!
//! A turn is one webhook delivery processed end to end. Turns for the same
//! sender are serialized by an advisory lock; everything else is stateless
//! against the durable store.

use {
    bytes::Bytes,
    tracing::{debug, info, warn},
};

use {
    voxbi_agents::{
        prompt::{HistoryEntry, PromptContext, build_system_prompt, render_history},
        runner::run_agent_loop,
    },
    voxbi_analytics::QueryDatasetTool,
    voxbi_channel::{
        outbound::InstanceRef,
        webhook::{AudioRef, IgnoreReason, Inbound},
    },
    voxbi_store::{AuthorizedContact, ChannelInstance, Direction, NewMessage},
    voxbi_voice::{
        speech::normalize_for_speech,
        stt::TranscribeRequest,
        tts::{AudioFormat, SynthesizeRequest},
    },
};

use crate::{
    classifier::classify,
    phrases,
    sanitize::sanitize_response,
    selector::{Resolution, render_menu, resolve},
    state::AppState,
};

/// Reserved keywords that reopen the channel-instance menu.
const CHANNEL_RESERVED: &[&str] = &["trocar", "mudar", "menu", "sair"];

/// Reserved keywords that reopen the dataset menu.
const DATASET_RESERVED: &[&str] = &["0", "menu"];

/// Classified outcome of one turn, reported in the webhook response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Ignored(IgnoreReason),
    Unauthorized,
    MenuSent,
    SelectionSaved,
    NoDatasets,
    TranscriptionFailed,
    Answered,
    Failed,
}

impl TurnStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignored(reason) => reason.as_str(),
            Self::Unauthorized => "unauthorized",
            Self::MenuSent => "menu_sent",
            Self::SelectionSaved => "selection_saved",
            Self::NoDatasets => "no_datasets",
            Self::TranscriptionFailed => "transcription_failed",
            Self::Answered => "answered",
            Self::Failed => "failed",
        }
    }
}

/// The message payload after normalization.
enum Payload {
    Text(String),
    Audio(AudioRef),
}

impl Payload {
    /// Text used by the selection state machines. Audio turns carry none:
    /// menus are answered by typing the number.
    fn selection_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Audio(_) => "",
        }
    }
}

/// Handle one normalized inbound event end to end.
pub async fn handle_inbound(state: &AppState, inbound: Inbound) -> TurnStatus {
    let (phone, payload) = match inbound {
        Inbound::Ignored(reason) => {
            debug!(reason = reason.as_str(), "dropping inbound event");
            return TurnStatus::Ignored(reason);
        },
        Inbound::Text { phone, text } => (phone, Payload::Text(text)),
        Inbound::Audio { phone, audio } => (phone, Payload::Audio(audio)),
    };

    let lock = state.turn_lock(&phone);
    let _guard = lock.lock().await;

    match run_turn(state, &phone, payload).await {
        Ok(status) => status,
        Err(e) => {
            warn!(phone = %phone, error = %e, "turn failed before resolution");
            TurnStatus::Failed
        },
    }
}

/// Resolution and the selection sub-flows. Failures before an instance is
/// resolved cannot be answered anywhere, so they bubble up silently.
async fn run_turn(state: &AppState, phone: &str, payload: Payload) -> anyhow::Result<TurnStatus> {
    let now = chrono::Utc::now().timestamp();

    let contacts = state.store.contacts_for_phone(phone).await?;
    if contacts.is_empty() {
        // Silent no-op: an unknown sender learns nothing, not even that
        // this number is an assistant.
        info!(phone = %phone, "unauthorized sender, no reply");
        return Ok(TurnStatus::Unauthorized);
    }

    // Candidates are (authorization, instance) pairs; contacts whose
    // instance vanished from the store are skipped.
    let mut candidates: Vec<(AuthorizedContact, ChannelInstance)> = Vec::new();
    for contact in contacts {
        match state.store.instance(&contact.instance_id).await? {
            Some(instance) => candidates.push((contact, instance)),
            None => {
                warn!(instance_id = %contact.instance_id, "contact references missing instance")
            },
        }
    }
    if candidates.is_empty() {
        return Ok(TurnStatus::Unauthorized);
    }

    let context = state.store.context(phone, now).await?;
    let saved_instance = context.as_ref().and_then(|ctx| {
        let id = ctx.instance_id.as_deref()?;
        candidates.iter().position(|(_, inst)| inst.id == id)
    });

    let selection_text = payload.selection_text();
    let (contact, instance) = match resolve(
        candidates.len(),
        saved_instance,
        selection_text,
        CHANNEL_RESERVED,
    ) {
        Resolution::None => return Ok(TurnStatus::Unauthorized),
        Resolution::Selected(i) => {
            let (contact, instance) = candidates.swap_remove(i);
            (contact, instance)
        },
        Resolution::Chosen(i) => {
            let (_, instance) = &candidates[i];
            state
                .store
                .save_instance_selection(phone, &instance.id, now)
                .await?;
            let reply = phrases::channel_selected(&instance.name);
            state
                .outbound
                .send_text(&instance_ref(instance), phone, &reply)
                .await?;
            return Ok(TurnStatus::SelectionSaved);
        },
        Resolution::Menu => {
            let labels: Vec<String> =
                candidates.iter().map(|(_, inst)| inst.name.clone()).collect();
            let menu = render_menu(phrases::CHANNEL_MENU_HEADER, &labels, phrases::MENU_FOOTER);
            // The sender is not bound to an instance yet; the menu goes out
            // through the first candidate's connection.
            state
                .outbound
                .send_text(&instance_ref(&candidates[0].1), phone, &menu)
                .await?;
            return Ok(TurnStatus::MenuSent);
        },
    };

    let instance_ref = instance_ref(&instance);
    match resolved_turn(state, phone, &payload, &contact, &instance_ref, now).await {
        Ok(status) => Ok(status),
        Err(e) => {
            // Outer boundary: never leak raw errors, never leave the user
            // without a reply once we know where to send one.
            warn!(phone = %phone, tenant = %contact.tenant_id, error = %e, "turn failed");
            if let Err(send_err) = state
                .outbound
                .send_text(&instance_ref, phone, phrases::GENERIC_FAILURE)
                .await
            {
                warn!(error = %send_err, "failed to deliver failure apology");
            }
            Ok(TurnStatus::Failed)
        },
    }
}

/// Everything after the channel instance is resolved.
async fn resolved_turn(
    state: &AppState,
    phone: &str,
    payload: &Payload,
    contact: &AuthorizedContact,
    instance: &InstanceRef,
    now: i64,
) -> anyhow::Result<TurnStatus> {
    // ── Dataset selection ───────────────────────────────────────────────
    let bindings = state
        .store
        .bindings_for(phone, &contact.tenant_id)
        .await?;

    let context = state.store.context(phone, now).await?;
    let saved_dataset = context.as_ref().and_then(|ctx| {
        let ds = ctx.dataset.as_ref()?;
        bindings.iter().position(|b| {
            b.dataset.connection_id == ds.connection_id && b.dataset.dataset_id == ds.dataset_id
        })
    });

    let selection_text = payload.selection_text();
    let dataset = match resolve(
        bindings.len(),
        saved_dataset,
        selection_text,
        DATASET_RESERVED,
    ) {
        Resolution::None => {
            state
                .outbound
                .send_text(instance, phone, phrases::NO_DATASETS)
                .await?;
            return Ok(TurnStatus::NoDatasets);
        },
        Resolution::Selected(i) => {
            let dataset = bindings[i].dataset.clone();
            // Auto-bind persists the same-day context on first contact.
            if saved_dataset != Some(i) {
                state
                    .store
                    .save_dataset_selection(phone, &instance.id, &dataset, now)
                    .await?;
            }
            dataset
        },
        Resolution::Chosen(i) => {
            let dataset = bindings[i].dataset.clone();
            state
                .store
                .save_dataset_selection(phone, &instance.id, &dataset, now)
                .await?;
            let reply = phrases::dataset_selected(&dataset.dataset_name);
            state.outbound.send_text(instance, phone, &reply).await?;
            return Ok(TurnStatus::SelectionSaved);
        },
        Resolution::Menu => {
            let labels: Vec<String> = bindings
                .iter()
                .map(|b| b.dataset.dataset_name.clone())
                .collect();
            let menu = render_menu(phrases::DATASET_MENU_HEADER, &labels, phrases::MENU_FOOTER);
            state.outbound.send_text(instance, phone, &menu).await?;
            return Ok(TurnStatus::MenuSent);
        },
    };

    // ── Speech decode ───────────────────────────────────────────────────
    let (question, was_audio) = match payload {
        Payload::Text(text) => (text.clone(), false),
        Payload::Audio(audio) => match decode_audio(state, instance, audio).await {
            Ok(text) => (text, true),
            Err(e) => {
                warn!(phone = %phone, error = %e, "transcription failed");
                state
                    .outbound
                    .send_text(instance, phone, phrases::TRANSCRIPTION_APOLOGY)
                    .await?;
                return Ok(TurnStatus::TranscriptionFailed);
            },
        },
    };

    // ── Effort tier and notices ─────────────────────────────────────────
    let tier = classify(&question);
    info!(phone = %phone, tenant = %contact.tenant_id, tier = ?tier, "classified question");

    // Rolling history is read before this turn's message is logged, so the
    // transcript never carries the question twice.
    let history = state
        .store
        .recent_messages(phone, tier.history_depth())
        .await?;
    let history: Vec<HistoryEntry> = history
        .into_iter()
        .map(|m| HistoryEntry {
            from_user: m.direction == Direction::In,
            content: m.content,
        })
        .collect();

    state
        .store
        .append_message(NewMessage {
            tenant_id: contact.tenant_id.clone(),
            phone: phone.to_string(),
            content: question.clone(),
            direction: Direction::In,
            sender_label: phone.to_string(),
            created_at: now,
        })
        .await?;

    if tier.sends_filler() {
        if let Err(e) = state
            .outbound
            .send_text(instance, phone, phrases::filler_notice())
            .await
        {
            warn!(error = %e, "failed to send filler notice");
        }
    }
    if let Err(e) = state.outbound.send_typing(instance, phone).await {
        debug!(error = %e, "typing indicator failed");
    }

    // ── Agent loop ──────────────────────────────────────────────────────
    let model_doc = state
        .store
        .model_doc(
            &dataset.connection_id,
            state.config.agent.model_doc_max_bytes,
        )
        .await?;

    let mut tools = voxbi_agents::ToolRegistry::new();
    tools.register(std::sync::Arc::new(QueryDatasetTool::new(
        state.analytics.clone(),
        dataset.clone(),
    )));

    let system_prompt = build_system_prompt(&PromptContext {
        persona_name: &state.config.agent.persona_name,
        dataset_name: &dataset.dataset_name,
        model_doc: model_doc.as_deref(),
        tier,
    });

    let result = run_agent_loop(
        state.llm.as_ref(),
        &tools,
        &system_prompt,
        render_history(&history),
        &question,
        tier,
        state.config.agent.max_tool_result_bytes,
    )
    .await?;

    info!(
        rounds = result.rounds,
        tool_calls = result.tool_calls_made,
        "agent loop finished"
    );

    let answer = sanitize_response(&result.text, tier.answer_ceiling());

    // ── Delivery ────────────────────────────────────────────────────────
    if was_audio {
        deliver_as_audio(state, instance, phone, &answer).await?;
    } else {
        state.outbound.send_text(instance, phone, &answer).await?;
    }

    state
        .store
        .append_message(NewMessage {
            tenant_id: contact.tenant_id.clone(),
            phone: phone.to_string(),
            content: answer,
            direction: Direction::Out,
            sender_label: state.config.agent.persona_name.clone(),
            created_at: chrono::Utc::now().timestamp(),
        })
        .await?;

    Ok(TurnStatus::Answered)
}

/// Fetch (if needed) and transcribe inbound audio, pinned to the
/// configured spoken language.
async fn decode_audio(
    state: &AppState,
    instance: &InstanceRef,
    audio: &AudioRef,
) -> anyhow::Result<String> {
    let (data, mime) = match audio {
        AudioRef::Inline { data, mime_type } => (data.clone(), mime_type.clone()),
        AudioRef::Media {
            media_id,
            mime_type,
        } => {
            let data: Bytes = state.outbound.fetch_media(instance, media_id).await?;
            (data, mime_type.clone().unwrap_or_else(|| "audio/ogg".into()))
        },
    };

    let transcript = state
        .stt
        .transcribe(TranscribeRequest {
            audio: data,
            format: AudioFormat::from_mime(&mime),
            language: state.config.speech.language.clone(),
        })
        .await?;

    let text = transcript.text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("empty transcript");
    }
    Ok(text)
}

/// Normalize, synthesize, and send the answer as a voice note, falling
/// back to plain text when synthesis or the audio send fails.
async fn deliver_as_audio(
    state: &AppState,
    instance: &InstanceRef,
    phone: &str,
    answer: &str,
) -> anyhow::Result<()> {
    let speech_text = normalize_for_speech(answer, state.config.speech.max_speech_chars);
    if speech_text.is_empty() {
        state.outbound.send_text(instance, phone, answer).await?;
        return Ok(());
    }

    let request = SynthesizeRequest {
        text: speech_text,
        voice_id: Some(state.config.speech.tts.voice.clone()),
        model: Some(state.config.speech.tts.model.clone()),
        output_format: AudioFormat::Opus,
    };

    match state.tts.synthesize(request).await {
        Ok(audio) => {
            match state
                .outbound
                .send_audio(instance, phone, audio.data, audio.format.mime_type())
                .await
            {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(error = %e, "audio send failed, delivering text");
                    state.outbound.send_text(instance, phone, answer).await?;
                    Ok(())
                },
            }
        },
        Err(e) => {
            warn!(error = %e, "synthesis failed, delivering text");
            state.outbound.send_text(instance, phone, answer).await?;
            Ok(())
        },
    }
}

fn instance_ref(instance: &ChannelInstance) -> InstanceRef {
    InstanceRef {
        id: instance.id.clone(),
        endpoint: instance.endpoint.clone(),
        credential: instance.credential.clone(),
    }
}
