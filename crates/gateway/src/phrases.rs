//! Fixed user-facing phrases, all in Brazilian Portuguese.
//!
//! Errors never leak internal identifiers or raw error text; these strings
//! are the whole vocabulary of failure the user can see.

use rand::seq::IndexedRandom as _;

/// Sent before long turns so the wait feels intentional. Picked at random
/// to avoid robotic repetition.
const FILLER_NOTICES: &[&str] = &[
    "Deixa eu consultar os dados, um instante… 🔎",
    "Boa pergunta! Já estou levantando os números.",
    "Um momento enquanto eu analiso isso para você.",
    "Consultando a base, já te respondo.",
];

/// Apology when transcription fails; the turn stops here.
pub const TRANSCRIPTION_APOLOGY: &str =
    "Desculpe, não consegui entender o áudio. Pode tentar de novo ou mandar por texto?";

/// Generic apology for unrecoverable failures at the outer boundary.
pub const GENERIC_FAILURE: &str =
    "Desculpe, tive um problema para processar sua mensagem agora. Pode tentar novamente em instantes?";

/// Substituted when the cleaned answer comes out empty or degenerate.
pub const FALLBACK_ANSWER: &str =
    "Desculpe, não consegui montar uma resposta com os dados agora. Pode reformular a pergunta?";

/// Sent when the resolved contact has no datasets bound.
pub const NO_DATASETS: &str =
    "Seu acesso ainda não tem nenhum conjunto de dados liberado. Fale com o administrador da sua conta.";

/// Header of the channel-instance menu.
pub const CHANNEL_MENU_HEADER: &str =
    "Você tem acesso a mais de uma conta. Com qual delas quer falar hoje?";

/// Header of the dataset menu.
pub const DATASET_MENU_HEADER: &str =
    "Qual conjunto de dados você quer consultar?";

/// Footer shared by both menus.
pub const MENU_FOOTER: &str = "Responda só com o número da opção.";

/// Pick a filler notice at random.
#[must_use]
pub fn filler_notice() -> &'static str {
    FILLER_NOTICES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FILLER_NOTICES[0])
}

/// Confirmation after a channel-instance selection.
#[must_use]
pub fn channel_selected(label: &str) -> String {
    format!("Perfeito, agora você está falando com {label}. Pode mandar sua pergunta!")
}

/// Confirmation after a dataset selection.
#[must_use]
pub fn dataset_selected(label: &str) -> String {
    format!("Certo, vamos consultar \"{label}\". O que você quer saber?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filler_comes_from_the_fixed_set() {
        for _ in 0..20 {
            assert!(FILLER_NOTICES.contains(&filler_notice()));
        }
    }

    #[test]
    fn confirmations_embed_the_label() {
        assert!(channel_selected("Acme").contains("Acme"));
        assert!(dataset_selected("Vendas").contains("Vendas"));
    }
}
