//! Effort tiers: discrete resource budgets chosen from the complexity score.
//!
//! A tier bounds everything that costs money or latency in a turn: how much
//! rolling history the LLM sees, how many tool-call rounds it may spend
//! against the analytics engine, and how long the final answer may be.

use serde::{Deserialize, Serialize};

/// Discrete effort tier, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortTier {
    /// Simple lookups ("qual foi o total de ontem").
    Quick,
    /// Single-dimension questions.
    Standard,
    /// Comparisons, trends, multi-dimension questions.
    Involved,
    /// Broad historical or multi-factor analysis.
    Deep,
}

impl EffortTier {
    /// Map a complexity score to a tier.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        match score {
            0 => Self::Quick,
            1 => Self::Standard,
            2 | 3 => Self::Involved,
            _ => Self::Deep,
        }
    }

    /// Maximum LLM completion rounds in one agent loop execution. The query
    /// tool is billed per call; this cap is what keeps a turn bounded.
    #[must_use]
    pub fn max_rounds(&self) -> usize {
        match self {
            Self::Quick => 2,
            Self::Standard => 3,
            Self::Involved => 4,
            Self::Deep => 5,
        }
    }

    /// How many recent messages of rolling history the transcript carries.
    #[must_use]
    pub fn history_depth(&self) -> u32 {
        match self {
            Self::Quick => 4,
            Self::Standard => 8,
            Self::Involved => 12,
            Self::Deep => 20,
        }
    }

    /// Character ceiling for the final answer.
    #[must_use]
    pub fn answer_ceiling(&self) -> usize {
        match self {
            Self::Quick => 600,
            Self::Standard => 900,
            Self::Involved => 1200,
            Self::Deep => 1600,
        }
    }

    /// Whether a "this may take a moment" notice is sent before the loop.
    #[must_use]
    pub fn sends_filler(&self) -> bool {
        *self > Self::Quick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_mapping_is_monotonic() {
        assert_eq!(EffortTier::from_score(0), EffortTier::Quick);
        assert_eq!(EffortTier::from_score(1), EffortTier::Standard);
        assert_eq!(EffortTier::from_score(2), EffortTier::Involved);
        assert_eq!(EffortTier::from_score(3), EffortTier::Involved);
        assert_eq!(EffortTier::from_score(4), EffortTier::Deep);
        assert_eq!(EffortTier::from_score(99), EffortTier::Deep);
    }

    #[test]
    fn budgets_grow_with_tier() {
        assert_eq!(EffortTier::Quick.max_rounds(), 2);
        assert_eq!(EffortTier::Deep.max_rounds(), 5);
        assert!(EffortTier::Quick.history_depth() < EffortTier::Deep.history_depth());
        assert!(EffortTier::Quick.answer_ceiling() < EffortTier::Deep.answer_ceiling());
    }

    #[test]
    fn only_quick_skips_the_filler() {
        assert!(!EffortTier::Quick.sends_filler());
        assert!(EffortTier::Standard.sends_filler());
        assert!(EffortTier::Deep.sends_filler());
    }
}
