use serde::{Deserialize, Serialize};

use crate::{Band, BandMap, BroadBandMap, JlptLevel, JlptLevelMap, Token};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct MatchedPattern {
    pub pattern: String,
    pub level: JlptLevel,
    #[serde(default)]
    pub definition: String,
    /// The substring that was found in the text.
    pub matched_text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct GrammarProfile {
    pub total_matches: usize,
    pub counts_by_level: JlptLevelMap<usize>,
    pub matched_patterns: Vec<MatchedPattern>,
    /// Formatted as `pattern (level)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardest_pattern: Option<String>,
    #[serde(default)]
    pub unrecognized_patterns: Vec<String>,
}

impl GrammarProfile {
    pub fn hardest_level(&self) -> Option<JlptLevel> {
        JlptLevel::hardest_first().find(|level| *self.counts_by_level.get(level) > 0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct DifficultySummary {
    pub vocab_level: JlptLevel,
    pub vocab_hardest: Vec<String>,
    pub grammar_level: JlptLevel,
    pub grammar_hardest: Vec<String>,
    pub overall_level: JlptLevel,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct LexicalProfile {
    pub total_tokens: usize,
    /// Distinct lemmas.
    pub unique_tokens: usize,
    pub content_word_count: usize,
    pub function_word_count: usize,
    pub proper_noun_count: usize,
    /// Fractions over content words that are not proper nouns. Either sums to 1
    /// or is all zero when there are no such words.
    pub band_fractions: BroadBandMap<f64>,
    /// Known content words over content words, proper nouns excluded from both.
    pub coverage: f64,
    pub tokens: Vec<Token>,
    pub unknown_words: Vec<String>,
    pub grammar_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar: Option<GrammarProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_summary: Option<DifficultySummary>,
}

impl LexicalProfile {
    pub fn empty() -> Self {
        Self {
            total_tokens: 0,
            unique_tokens: 0,
            content_word_count: 0,
            function_word_count: 0,
            proper_noun_count: 0,
            band_fractions: BroadBandMap::default(),
            coverage: 0.0,
            tokens: Vec::new(),
            unknown_words: Vec::new(),
            grammar_tokens: Vec::new(),
            grammar: None,
            difficulty_summary: None,
        }
    }

    /// Distribution over the known bands only, the shape stored on practice items.
    /// Falls back to a near-uniform split when nothing is known.
    pub fn known_band_distribution(&self) -> BandMap<f64> {
        let known: f64 = Band::ALL
            .iter()
            .map(|band| self.band_fraction(*band))
            .sum();
        if known <= 0.0 {
            return BandMap {
                beginner: 0.33,
                intermediate: 0.34,
                advanced: 0.33,
            };
        }
        BandMap::from_fn(|band| self.band_fraction(band) / known)
    }

    pub fn band_fraction(&self, band: Band) -> f64 {
        match band {
            Band::Beginner => self.band_fractions.beginner,
            Band::Intermediate => self.band_fractions.intermediate,
            Band::Advanced => self.band_fractions.advanced,
        }
    }
}
