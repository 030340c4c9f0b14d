//! Per-word probability that a user already knows a word, and the article-level
//! estimates built from it.
//!
//! Each word starts from a prior set by its level, frequency and script, then
//! the user's history with the word shifts the odds.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use language_utils::script::{has_kanji, is_katakana_only};
use language_utils::{JlptLevel, Language, Token};
use serde::{Deserialize, Serialize};

const UNLEVELED_PRIOR: f64 = 0.40;
const UNRANKED_FREQUENCY_FACTOR: f64 = 0.80;

/// (highest rank, factor). Ranks past the last entry use [`RARE_FREQUENCY_FACTOR`].
const FREQUENCY_FACTORS: &[(u32, f64)] = &[
    (500, 1.3),
    (1000, 1.2),
    (3000, 1.1),
    (5000, 1.0),
    (10_000, 0.85),
    (15_000, 0.70),
];
const RARE_FREQUENCY_FACTOR: f64 = 0.55;

/// Days until an unreviewed word drops to 1/e retention.
const BASE_STABILITY_DAYS: f64 = 5.0;
const STABILITY_GROWTH: f64 = 0.5;

fn level_prior(level: Option<JlptLevel>) -> f64 {
    match level {
        Some(JlptLevel::N5) => 0.92,
        Some(JlptLevel::N4) => 0.82,
        Some(JlptLevel::N3) => 0.60,
        Some(JlptLevel::N2) => 0.35,
        Some(JlptLevel::N1) => 0.18,
        None => UNLEVELED_PRIOR,
    }
}

fn frequency_factor(rank: Option<u32>) -> f64 {
    match rank.filter(|rank| *rank > 0) {
        None => UNRANKED_FREQUENCY_FACTOR,
        Some(rank) => FREQUENCY_FACTORS
            .iter()
            .find(|(max_rank, _)| rank <= *max_rank)
            .map_or(RARE_FREQUENCY_FACTOR, |(_, factor)| *factor),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WordFeatures {
    pub surface: String,
    pub level: Option<JlptLevel>,
    pub frequency_rank: Option<u32>,
    pub is_kanji: bool,
    /// Written entirely in katakana.
    pub is_loanword: bool,
    /// In characters.
    pub length: usize,
}

impl WordFeatures {
    pub fn new(surface: &str, level: Option<JlptLevel>, frequency_rank: Option<u32>) -> Self {
        Self {
            surface: surface.to_string(),
            level,
            frequency_rank,
            is_kanji: has_kanji(surface),
            is_loanword: is_katakana_only(surface),
            length: surface.chars().count(),
        }
    }

    pub fn from_token(token: &Token, frequency_rank: Option<u32>) -> Self {
        let level = token.proficiency_label.and_then(|label| label.jlpt());
        Self::new(&token.surface, level, frequency_rank)
    }
}

/// A user's history with one word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WordEvidence {
    #[serde(default)]
    pub marked_unknown: bool,
    #[serde(default)]
    pub marked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exposure_count: u32,
    #[serde(default)]
    pub not_marked_count: u32,
    #[serde(default)]
    pub first_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WordPrediction {
    pub word: String,
    pub known_probability: f64,
    pub confidence: Confidence,
    pub level_factor: f64,
    pub frequency_factor: f64,
    pub evidence_factor: f64,
}

/// P(known) before looking at the user's history with the word.
pub fn prior(word: &WordFeatures, native_language: Option<Language>) -> f64 {
    let mut prior = level_prior(word.level) * frequency_factor(word.frequency_rank);

    match native_language {
        Some(Language::Chinese) if word.is_kanji => prior = (prior + 0.12).min(1.0),
        Some(Language::English) if word.is_loanword => prior = (prior + 0.08).min(1.0),
        _ => {}
    }

    if word.length == 1 {
        prior = (prior + 0.10).min(1.0);
    } else if word.length >= 5 {
        prior = (prior - 0.05).max(0.0);
    }

    prior.clamp(0.01, 0.99)
}

fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - earlier).num_seconds().max(0) as f64 / 86_400.0
}

/// Multiplier on the prior odds from the user's history.
///
/// Marking a word unknown is strong evidence that fades over a month, and
/// later unmarked sightings recover it. Unmarked exposures raise the odds with
/// diminishing returns, damped by a forgetting curve whose stability grows with
/// each exposure.
pub fn likelihood(evidence: Option<&WordEvidence>, now: DateTime<Utc>) -> f64 {
    let Some(evidence) = evidence else {
        return 1.0;
    };

    if evidence.marked_unknown {
        let days = evidence
            .marked_at
            .map_or(0.0, |marked_at| days_between(marked_at, now));
        let seen_since = evidence.not_marked_count as f64;
        return if days < 1.0 {
            0.10
        } else if days < 7.0 {
            0.15
        } else if days < 30.0 {
            0.25 + (seen_since * 0.1).min(0.5)
        } else {
            0.40 + (seen_since * 0.15).min(0.6)
        };
    }

    if evidence.exposure_count == 0 {
        return 1.0;
    }

    let exposures = evidence.exposure_count as f64;
    let exposure_factor = 1.0 + (exposures + 1.0).ln() * 0.4;
    let stability =
        BASE_STABILITY_DAYS * (1.0 + STABILITY_GROWTH).powi(evidence.exposure_count.min(10) as i32);
    let days = evidence
        .last_seen_at
        .or(evidence.first_seen_at)
        .map_or(0.0, |seen| days_between(seen, now));
    let retention = (-days / stability).exp();
    // Having seen a word at all leaves some trace
    let smoothed_retention = 0.4 + 0.6 * retention;

    1.0 + (exposure_factor - 1.0) * smoothed_retention
}

pub fn predict_word(
    word: &WordFeatures,
    native_language: Option<Language>,
    evidence: Option<&WordEvidence>,
    now: DateTime<Utc>,
) -> WordPrediction {
    let prior = prior(word, native_language);
    let likelihood = likelihood(evidence, now);

    let posterior_odds = prior / (1.0 - prior) * likelihood;
    let known_probability = (posterior_odds / (1.0 + posterior_odds)).clamp(0.01, 0.99);

    let confidence = match evidence {
        Some(evidence) if evidence.marked_unknown || evidence.exposure_count >= 3 => {
            Confidence::High
        }
        Some(evidence) if evidence.exposure_count >= 1 => Confidence::Medium,
        Some(_) => Confidence::Low,
        None => match word.frequency_rank {
            Some(rank) if rank > 0 && rank <= 3000 => Confidence::Medium,
            _ => Confidence::Low,
        },
    };

    WordPrediction {
        word: word.surface.clone(),
        known_probability,
        confidence,
        level_factor: level_prior(word.level),
        frequency_factor: frequency_factor(word.frequency_rank),
        evidence_factor: likelihood,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ArticlePrediction {
    pub predictions: Vec<WordPrediction>,
    pub expected_unknown_count: f64,
    pub predicted_unknown_rate: f64,
    /// Words the user very likely does not know, on solid evidence.
    pub high_confidence_unknown: Vec<String>,
    /// Words with a middling prediction and little evidence either way.
    pub uncertain_words: Vec<String>,
}

/// Predicts each distinct content word of an analyzed item. Evidence is looked
/// up by surface form, then by lemma. Proper nouns are skipped.
pub fn predict_article(
    tokens: &[Token],
    native_language: Option<Language>,
    evidence: &HashMap<String, WordEvidence>,
    frequency_ranks: &HashMap<String, u32>,
    now: DateTime<Utc>,
) -> ArticlePrediction {
    let predictions: Vec<WordPrediction> = tokens
        .iter()
        .filter(|token| token.is_content_word && !token.is_proper_noun)
        .unique_by(|token| token.surface.as_str())
        .map(|token| {
            let rank = frequency_ranks
                .get(&token.surface)
                .or_else(|| frequency_ranks.get(&token.lemma))
                .copied();
            let features = WordFeatures::from_token(token, rank);
            let history = evidence
                .get(&token.surface)
                .or_else(|| evidence.get(&token.lemma));
            predict_word(&features, native_language, history, now)
        })
        .collect();

    let expected_unknown_count: f64 = predictions
        .iter()
        .map(|prediction| 1.0 - prediction.known_probability)
        .sum();
    let predicted_unknown_rate = if predictions.is_empty() {
        0.0
    } else {
        expected_unknown_count / predictions.len() as f64
    };

    let high_confidence_unknown = predictions
        .iter()
        .filter(|p| p.known_probability < 0.3 && p.confidence == Confidence::High)
        .map(|p| p.word.clone())
        .collect();
    let uncertain_words = predictions
        .iter()
        .filter(|p| {
            p.confidence == Confidence::Low && p.known_probability > 0.3 && p.known_probability < 0.7
        })
        .map(|p| p.word.clone())
        .collect();

    ArticlePrediction {
        predictions,
        expected_unknown_count,
        predicted_unknown_rate,
        high_confidence_unknown,
        uncertain_words,
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AudienceTier {
    Beginner,
    Intermediate,
    Advanced,
    Proficient,
}

/// Difficulty on the 1.0 to 6.0 item scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ArticleDifficulty {
    pub vocab_difficulty: f64,
    pub grammar_difficulty: f64,
    pub overall_difficulty: f64,
    /// Share of predictions backed by strong evidence.
    pub confidence: f64,
    pub audience: AudienceTier,
}

/// Piecewise map from predicted unknown rate to difficulty: 0-2% is 1.0,
/// 5% is 2.0, 15% is 3.5, 30% is 5.0, capped at 6.0.
fn vocab_difficulty(unknown_rate: f64) -> f64 {
    if unknown_rate < 0.02 {
        1.0
    } else if unknown_rate < 0.05 {
        1.0 + (unknown_rate - 0.02) / 0.03
    } else if unknown_rate < 0.15 {
        2.0 + (unknown_rate - 0.05) / 0.10 * 1.5
    } else if unknown_rate < 0.30 {
        3.5 + (unknown_rate - 0.15) / 0.15 * 1.5
    } else {
        (5.0 + (unknown_rate - 0.30) / 0.20).min(6.0)
    }
}

fn grammar_difficulty(level: Option<JlptLevel>) -> f64 {
    match level {
        Some(JlptLevel::N5) => 1.5,
        Some(JlptLevel::N4) => 2.5,
        Some(JlptLevel::N3) => 3.5,
        Some(JlptLevel::N2) => 4.5,
        Some(JlptLevel::N1) => 5.5,
        None => 3.0,
    }
}

/// Combines vocabulary and grammar difficulty 60/40.
pub fn article_difficulty(
    prediction: &ArticlePrediction,
    grammar_level: Option<JlptLevel>,
) -> ArticleDifficulty {
    let vocab_difficulty = vocab_difficulty(prediction.predicted_unknown_rate);
    let grammar_difficulty = grammar_difficulty(grammar_level);
    let overall_difficulty = 0.6 * vocab_difficulty + 0.4 * grammar_difficulty;

    let high = prediction
        .predictions
        .iter()
        .filter(|p| p.confidence == Confidence::High)
        .count();
    let confidence = if prediction.predictions.is_empty() {
        0.0
    } else {
        high as f64 / prediction.predictions.len() as f64
    };

    let audience = if overall_difficulty < 2.5 {
        AudienceTier::Beginner
    } else if overall_difficulty < 4.0 {
        AudienceTier::Intermediate
    } else if overall_difficulty < 5.0 {
        AudienceTier::Advanced
    } else {
        AudienceTier::Proficient
    };

    ArticleDifficulty {
        vocab_difficulty,
        grammar_difficulty,
        overall_difficulty,
        confidence,
        audience,
    }
}
