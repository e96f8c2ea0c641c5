//! System prompt construction for the analytics agent.

use std::fmt::Write as _;

use crate::{model::ChatMessage, tier::EffortTier};

/// One entry of rolling conversation history, already scoped and windowed
/// by the caller.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// True for the end user's messages, false for the assistant's.
    pub from_user: bool,
    pub content: String,
}

/// Everything the system prompt is built from.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// Assistant display name.
    pub persona_name: &'a str,
    /// Dataset name shown to the model (never the internal ids).
    pub dataset_name: &'a str,
    /// Tenant's model documentation blob, already size-capped.
    pub model_doc: Option<&'a str>,
    pub tier: EffortTier,
}

/// Build the system prompt: persona, hard rules, and grounding material.
///
/// The hard rules are the contract that makes answers trustworthy: the
/// model may only state figures that came out of the query tool, and it
/// never sees or reveals internal identifiers.
#[must_use]
pub fn build_system_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = format!(
        "Você é {persona}, assistente de indicadores de negócio. Você responde \
         perguntas sobre o conjunto de dados \"{dataset}\" consultando-o através \
         da ferramenta query_dataset.\n\n\
         Regras obrigatórias:\n\
         - NUNCA invente um número. Todo valor, total ou percentual citado na \
         resposta deve vir de um resultado da ferramenta query_dataset desta \
         conversa.\n\
         - Se a ferramenta retornar erro, ajuste a consulta e tente de novo, ou \
         explique em linguagem simples que não foi possível consultar agora. \
         Nunca repita o texto do erro.\n\
         - Nunca mencione identificadores internos, nomes de conexão, de \
         empresa ou de sistema.\n\
         - Responda sempre em português do Brasil, em tom direto e cordial.\n",
        persona = ctx.persona_name,
        dataset = ctx.dataset_name,
    );

    let _ = write!(
        prompt,
        "- Limite a resposta a cerca de {} caracteres.\n",
        ctx.tier.answer_ceiling()
    );

    match ctx.tier {
        EffortTier::Quick | EffortTier::Standard => {
            prompt.push_str(
                "- Vá direto ao número pedido, sem listas nem seções.\n",
            );
        },
        EffortTier::Involved | EffortTier::Deep => {
            prompt.push_str(
                "- Estruture a resposta em frases curtas; destaque comparações e \
                 tendências relevantes que os resultados sustentem.\n",
            );
        },
    }

    if let Some(doc) = ctx.model_doc {
        let _ = write!(
            prompt,
            "\nDocumentação do modelo de dados (use para escrever consultas \
             melhores):\n{doc}\n"
        );
    }

    prompt
}

/// Render rolling history as alternating user/assistant messages.
#[must_use]
pub fn render_history(entries: &[HistoryEntry]) -> Vec<ChatMessage> {
    entries
        .iter()
        .map(|e| {
            if e.from_user {
                ChatMessage::user(e.content.clone())
            } else {
                ChatMessage::assistant(e.content.clone())
            }
        })
        .collect()
}
