//! Heuristic complexity classifier.
//!
//! Scores the user's question against a fixed vocabulary of analytical
//! intents and maps the score to an effort tier. The vocabulary is
//! deliberately coarse: it only has to separate "qual o total de ontem"
//! from "compare a evolução de todas as lojas desde 2023".

use {once_cell::sync::Lazy, regex::Regex, voxbi_agents::EffortTier};

/// Analytical-intent keyword categories. Each category counts at most once.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("comparison", &[
        "compar", "versus", "diferença entre", "diferenca entre",
    ]),
    ("trend", &[
        "tendência", "tendencia", "evolução", "evolucao", "crescimento", "queda", "ao longo",
    ]),
    ("causal", &[
        "por que", "por quê", "porque", "motivo", "razão", "razao", "o que explica",
    ]),
    ("range", &[
        "histórico", "historico", "últimos", "ultimos", "desde", "período", "periodo",
    ]),
    ("variance", &["variação", "variacao", "desvio", "oscilação", "oscilacao"]),
    ("projection", &[
        "projeção", "projecao", "previsão", "previsao", "estimativa", "expectativa",
    ]),
    ("ranking", &["maior", "menor", "melhores", "piores", "ranking", "top"]),
    ("aggregation", &["média", "media", "total", "soma", "acumulado"]),
];

/// Universal quantifiers that widen the scope of a question.
const QUANTIFIERS: &[&str] = &["todos", "todas", "cada", "all", "every"];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern")
});

/// Score a message: one point per matched category, plus bonuses for an
/// explicit versus-comparison, a 4-digit year, and universal quantifiers.
#[must_use]
pub fn complexity_score(text: &str) -> u32 {
    let lowered = text.to_lowercase();
    let mut score = 0;

    for (_, keywords) in CATEGORIES {
        if keywords.iter().any(|k| lowered.contains(k)) {
            score += 1;
        }
    }

    if lowered.contains("versus") || has_word(&lowered, "vs") {
        score += 1;
    }
    if YEAR_RE.is_match(&lowered) {
        score += 1;
    }
    if QUANTIFIERS.iter().any(|q| has_word(&lowered, q)) {
        score += 1;
    }

    score
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|w| w == word)
}

/// Classify a message into an effort tier.
#[must_use]
pub fn classify(text: &str) -> EffortTier {
    EffortTier::from_score(complexity_score(text))
}
