//! Per-user ability state and the records that flow into and out of it.

use serde::{Deserialize, Serialize};

use crate::{BandMap, JlptLevelMap, Language, ProficiencyLabel};

/// Which recommendation band a practice item is drawn from.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetBand {
    /// Consolidation: easier than the user's level.
    Down,
    Main,
    /// Challenge: harder than the user's level.
    Up,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, schemars::JsonSchema)]
pub struct ExploreConfig {
    pub main_ratio: f64,
    pub down_ratio: f64,
    pub up_ratio: f64,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            main_ratio: 0.6,
            down_ratio: 0.2,
            up_ratio: 0.2,
        }
    }
}

impl ExploreConfig {
    pub fn ratio(&self, band: TargetBand) -> f64 {
        match band {
            TargetBand::Down => self.down_ratio,
            TargetBand::Main => self.main_ratio,
            TargetBand::Up => self.up_ratio,
        }
    }

    pub fn total(&self) -> f64 {
        self.main_ratio + self.down_ratio + self.up_ratio
    }
}

/// Mastery estimates on the JLPT ladder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct BayesianProfile {
    /// Probability of knowing a word at each level.
    pub mastery: JlptLevelMap<f64>,
    /// 1.0 to 6.0.
    pub estimated_level: f64,
    pub evidence_count: u32,
    /// Frequency rank below which words are assumed known.
    pub frequency_threshold: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct UserAbilityState {
    /// 1.0 to 6.0.
    pub level: f64,
    /// Probability that a content word in each band is new to the user.
    pub unknown_rate_by_band: BandMap<f64>,
    /// Exponential moving average of quiz accuracy.
    pub comprehension_rate: f64,
    pub explore: ExploreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bayesian: Option<BayesianProfile>,
}

impl Default for UserAbilityState {
    fn default() -> Self {
        Self {
            level: 1.0,
            unknown_rate_by_band: BandMap {
                beginner: 0.1,
                intermediate: 0.3,
                advanced: 0.6,
            },
            comprehension_rate: 0.8,
            explore: ExploreConfig::default(),
            bayesian: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct ItemMetadata {
    pub id: String,
    /// 1.0 to 6.0.
    pub level: f64,
    /// Known-band distribution of the item's content words.
    pub lex_profile: BandMap<f64>,
    pub language: Language,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SelfReport {
    TooEasy,
    JustRight,
    ABitHard,
    TooHard,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PracticeStatus {
    #[default]
    NotStarted,
    Draft,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, schemars::JsonSchema)]
pub struct SentenceRecord {
    /// 0 to 100.
    pub first_score: f64,
    pub best_score: f64,
    pub attempts: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct NewWord {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<ProficiencyLabel>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, schemars::JsonSchema)]
pub struct QuizResult {
    pub correct: u32,
    pub total: u32,
}

impl QuizResult {
    pub fn correct_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, schemars::JsonSchema)]
pub struct PracticeSession {
    pub user_id: String,
    pub item_id: String,
    pub item_level: f64,
    pub sentence_records: Vec<SentenceRecord>,
    #[serde(default)]
    pub total_time_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_reported_difficulty: Option<SelfReport>,
    #[serde(default)]
    pub new_words: Vec<NewWord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_lex_profile: Option<BandMap<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_result: Option<QuizResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_consistent() {
        let state = UserAbilityState::default();
        assert!((state.explore.total() - 1.0).abs() < 1e-9);
        assert!(state.bayesian.is_none());
    }

    #[test]
    fn test_session_deserializes_with_missing_optionals() {
        let json = r#"{
            "user_id": "u1",
            "item_id": "i1",
            "item_level": 2.5,
            "sentence_records": [{"first_score": 80, "best_score": 95, "attempts": 2}],
            "self_reported_difficulty": "a_bit_hard",
            "new_words": [{"word": "対立", "level": "N2"}]
        }"#;
        let session: PracticeSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.self_reported_difficulty, Some(SelfReport::ABitHard));
        assert!(session.quiz_result.is_none());
        assert_eq!(session.new_words[0].level.map(|l| l.to_string()), Some("N2".to_string()));
    }

    #[test]
    fn test_quiz_rate_guards_zero_total() {
        assert_eq!(QuizResult { correct: 0, total: 0 }.correct_rate(), None);
        assert_eq!(QuizResult { correct: 8, total: 10 }.correct_rate(), Some(0.8));
    }
}
