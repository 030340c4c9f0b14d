//! Choosing what to practice next.
//!
//! Two entry points: [`select_next`] picks a single follow-up item after a
//! session, weighing interest, difficulty and practice history.
//! [`recommend_for_band`] ranks candidates inside one band's level range with
//! the band [`score`].

use std::collections::HashMap;
use std::ops::RangeInclusive;

use itertools::Itertools;
use language_utils::{
    BandMap, ItemMetadata, Language, PracticeStatus, TargetBand, UserAbilityState,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scorer::{
    expected_unknown_ratio, interpolated_unknown_rate, level_range_for_band, pick_target_band,
    score, sweet_spot_score,
};

/// Interest weight for items whose theme has no scene overlap on record.
pub const FALLBACK_THEME_WEIGHT: f64 = 0.3;
/// Interest weight at which a suggestion is explained by the user's scenes.
const INTEREST_REASON_THRESHOLD: f64 = 0.6;
const TOP_SCENES: usize = 2;

/// A practice item offered for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Candidate {
    pub item: ItemMetadata,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_title: Option<String>,
    #[serde(default)]
    pub status: PracticeStatus,
}

impl Candidate {
    /// Preference for items not yet practiced.
    pub fn recency_weight(&self) -> f64 {
        match self.status {
            PracticeStatus::NotStarted => 1.0,
            PracticeStatus::Draft => 0.7,
            PracticeStatus::Completed => 0.1,
        }
    }
}

/// How strongly a user cares about a scene (a topic tag shared by users and
/// themes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ScenePreference {
    pub scene_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub weight: f64,
}

/// How much of a theme is about a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ThemeScene {
    pub theme_id: String,
    pub scene_id: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ThemeWeight {
    pub weight: f64,
    /// Names of the scenes that contributed most, strongest first.
    pub top_scenes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ThemeWeights(pub HashMap<String, ThemeWeight>);

impl ThemeWeights {
    /// Scores each theme by the dot product of the user's scene weights and
    /// the theme's scene vector, clamped to `[0, 1]`.
    pub fn from_scenes(user: &[ScenePreference], themes: &[ThemeScene]) -> Self {
        let user: HashMap<&str, &ScenePreference> = user
            .iter()
            .map(|preference| (preference.scene_id.as_str(), preference))
            .collect();

        let mut contributions: HashMap<&str, Vec<(f64, &str)>> = HashMap::new();
        for row in themes {
            let Some(preference) = user.get(row.scene_id.as_str()) else {
                continue;
            };
            let u = preference.weight.clamp(0.0, 1.0);
            let w = row.weight.clamp(0.0, 1.0);
            if u <= 0.0 || w <= 0.0 {
                continue;
            }
            let name = preference.name.as_deref().unwrap_or(&preference.scene_id);
            contributions
                .entry(row.theme_id.as_str())
                .or_default()
                .push((u * w, name));
        }

        let weights = contributions
            .into_iter()
            .map(|(theme_id, contributions)| {
                let weight = contributions.iter().map(|(c, _)| c).sum::<f64>().clamp(0.0, 1.0);
                let top_scenes = contributions
                    .into_iter()
                    .sorted_by(|a, b| b.0.total_cmp(&a.0))
                    .take(TOP_SCENES)
                    .map(|(_, name)| name.to_string())
                    .collect();
                (theme_id.to_string(), ThemeWeight { weight, top_scenes })
            })
            .collect();
        ThemeWeights(weights)
    }

    pub fn get(&self, theme_id: Option<&str>) -> Option<&ThemeWeight> {
        theme_id.and_then(|id| self.0.get(id))
    }

    pub fn weight(&self, theme_id: Option<&str>) -> f64 {
        self.get(theme_id)
            .map_or(FALLBACK_THEME_WEIGHT, |theme| theme.weight.clamp(0.0, 1.0))
    }
}

/// Why an item was suggested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Rationale {
    SharedInterest(Vec<String>),
    /// Expected new-word percentage.
    VocabularyFit(u32),
    Theme(String),
    Level(f64),
}

impl std::fmt::Display for Rationale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rationale::SharedInterest(scenes) => {
                write!(f, "Matches your interest in {}", scenes.join(" and "))
            }
            Rationale::VocabularyFit(percent) => {
                write!(f, "About {percent}% new words, right at your learning edge")
            }
            Rationale::Theme(title) => write!(f, "Continues the theme \"{title}\""),
            Rationale::Level(level) => write!(f, "Level {level} suits your current ability"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Suggestion {
    pub candidate: Candidate,
    pub score: f64,
    pub reason: Rationale,
}

/// 1 on the target level, 0.4 less per level away, 0 from two levels out.
pub fn level_term(item_level: f64, target_level: f64) -> f64 {
    let distance = (item_level - target_level).abs();
    if distance >= 2.0 {
        0.0
    } else {
        (1.0 - 0.4 * distance).max(0.0)
    }
}

fn expected_unknown(item: &ItemMetadata, unknown_rates: &BandMap<f64>) -> f64 {
    if item.lex_profile.values().sum::<f64>() > 0.0 {
        expected_unknown_ratio(unknown_rates, &item.lex_profile)
    } else {
        interpolated_unknown_rate(item.level, unknown_rates)
    }
}

/// Picks the item to offer after `current_item_id`.
///
/// Only same-language items other than the current one are considered, and
/// uncompleted ones are preferred whenever any remain. Ties keep the earlier
/// candidate.
pub fn select_next(
    current_item_id: Option<&str>,
    candidates: &[Candidate],
    theme_weights: &ThemeWeights,
    target_level: f64,
    language: Language,
    unknown_rates: &BandMap<f64>,
) -> Option<Suggestion> {
    let pool: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.item.language == language)
        .filter(|c| Some(c.item.id.as_str()) != current_item_id)
        .collect();
    let uncompleted: Vec<&Candidate> = pool
        .iter()
        .copied()
        .filter(|c| c.status != PracticeStatus::Completed)
        .collect();
    let pool = if uncompleted.is_empty() { pool } else { uncompleted };

    let mut best: Option<(&Candidate, f64, f64, f64)> = None;
    for candidate in pool {
        let theme = theme_weights.weight(candidate.theme_id.as_deref());
        let unknown = expected_unknown(&candidate.item, unknown_rates);
        let sweet_spot = sweet_spot_score(unknown);
        let difficulty = 0.6 * level_term(candidate.item.level, target_level) + 0.4 * sweet_spot;
        let total = 0.4 * theme + 0.4 * difficulty + 0.2 * candidate.recency_weight();
        if best.is_none_or(|(_, best_score, _, _)| total > best_score) {
            best = Some((candidate, total, unknown, sweet_spot));
        }
    }

    let (candidate, score, unknown, sweet_spot) = best?;
    let reason = rationale(candidate, theme_weights, unknown, sweet_spot);
    log::debug!("next after {current_item_id:?}: {} ({score:.3}, {reason})", candidate.item.id);
    Some(Suggestion {
        candidate: candidate.clone(),
        score,
        reason,
    })
}

fn rationale(
    candidate: &Candidate,
    theme_weights: &ThemeWeights,
    unknown: f64,
    sweet_spot: f64,
) -> Rationale {
    if let Some(theme) = theme_weights.get(candidate.theme_id.as_deref()) {
        if theme.weight >= INTEREST_REASON_THRESHOLD && !theme.top_scenes.is_empty() {
            return Rationale::SharedInterest(theme.top_scenes.clone());
        }
    }
    if sweet_spot >= 1.0 {
        return Rationale::VocabularyFit((unknown * 100.0).round() as u32);
    }
    if let Some(title) = &candidate.theme_title {
        return Rationale::Theme(title.clone());
    }
    Rationale::Level(candidate.item.level)
}

pub fn band_reason(band: TargetBand) -> &'static str {
    match band {
        TargetBand::Down => "Consolidation: easier material to reinforce the basics",
        TargetBand::Main => "Steady progress at your current level",
        TargetBand::Up => "Challenge: harder material to push past a plateau",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BandRecommendation {
    pub band: TargetBand,
    pub min_level: u8,
    pub max_level: u8,
    pub reason: String,
    /// Best first.
    pub ranked: Vec<RankedCandidate>,
}

impl BandRecommendation {
    pub fn level_range(&self) -> RangeInclusive<u8> {
        self.min_level..=self.max_level
    }
}

/// Ranks same-language candidates within `band`'s level range by band fit.
pub fn recommend_for_band(
    user: &UserAbilityState,
    candidates: &[Candidate],
    language: Language,
    band: TargetBand,
) -> BandRecommendation {
    let range = level_range_for_band(user.level, band);
    let (min_level, max_level) = (*range.start(), *range.end());

    let ranked = candidates
        .iter()
        .filter(|c| c.item.language == language)
        .filter(|c| c.item.level >= min_level as f64 && c.item.level <= max_level as f64)
        .map(|candidate| RankedCandidate {
            score: score(user, &candidate.item, band),
            candidate: candidate.clone(),
        })
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .collect();

    BandRecommendation {
        band,
        min_level,
        max_level,
        reason: band_reason(band).to_string(),
        ranked,
    }
}

/// Draws a band from the user's explore ratios and ranks candidates in it.
pub fn recommend<R: Rng>(
    user: &UserAbilityState,
    candidates: &[Candidate],
    language: Language,
    rng: &mut R,
) -> BandRecommendation {
    let band = pick_target_band(&user.explore, rng);
    recommend_for_band(user, candidates, language, band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use language_utils::ExploreConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn candidate(id: &str, level: f64, language: Language, status: PracticeStatus) -> Candidate {
        Candidate {
            item: ItemMetadata {
                id: id.to_string(),
                level,
                lex_profile: BandMap::default(),
                language,
            },
            title: id.to_string(),
            theme_id: None,
            theme_title: None,
            status,
        }
    }

    fn rates() -> BandMap<f64> {
        UserAbilityState::default().unknown_rate_by_band
    }

    #[test]
    fn test_level_term() {
        assert_eq!(level_term(3.0, 3.0), 1.0);
        assert!((level_term(4.0, 3.0) - 0.6).abs() < 1e-9);
        assert!((level_term(1.5, 3.0) - 0.4).abs() < 1e-9);
        assert_eq!(level_term(5.0, 3.0), 0.0);
    }

    #[test]
    fn test_filters_language_and_current_item() {
        let candidates = vec![
            candidate("current", 3.0, Language::Japanese, PracticeStatus::NotStarted),
            candidate("english", 3.0, Language::English, PracticeStatus::NotStarted),
            candidate("other", 5.0, Language::Japanese, PracticeStatus::NotStarted),
        ];
        let suggestion = select_next(
            Some("current"),
            &candidates,
            &ThemeWeights::default(),
            3.0,
            Language::Japanese,
            &rates(),
        )
        .unwrap();
        assert_eq!(suggestion.candidate.item.id, "other");
    }

    #[test]
    fn test_prefers_uncompleted() {
        let candidates = vec![
            candidate("done", 3.0, Language::Japanese, PracticeStatus::Completed),
            candidate("far", 5.5, Language::Japanese, PracticeStatus::NotStarted),
        ];
        let suggestion = select_next(
            None,
            &candidates,
            &ThemeWeights::default(),
            3.0,
            Language::Japanese,
            &rates(),
        )
        .unwrap();
        assert_eq!(suggestion.candidate.item.id, "far");

        // Everything completed still yields a suggestion
        let candidates = vec![candidate("done", 3.0, Language::Japanese, PracticeStatus::Completed)];
        assert!(
            select_next(None, &candidates, &ThemeWeights::default(), 3.0, Language::Japanese, &rates())
                .is_some()
        );
    }

    #[test]
    fn test_nothing_to_suggest() {
        let candidates = vec![candidate("only", 3.0, Language::Japanese, PracticeStatus::NotStarted)];
        assert!(
            select_next(
                Some("only"),
                &candidates,
                &ThemeWeights::default(),
                3.0,
                Language::Japanese,
                &rates()
            )
            .is_none()
        );
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let candidates = vec![
            candidate("a", 3.0, Language::English, PracticeStatus::NotStarted),
            candidate("b", 3.0, Language::English, PracticeStatus::NotStarted),
        ];
        let suggestion = select_next(
            None,
            &candidates,
            &ThemeWeights::default(),
            3.0,
            Language::English,
            &rates(),
        )
        .unwrap();
        assert_eq!(suggestion.candidate.item.id, "a");
    }

    #[test]
    fn test_draft_beats_completed() {
        let mut draft = candidate("draft", 3.0, Language::English, PracticeStatus::Draft);
        draft.item.lex_profile = BandMap {
            beginner: 1.0,
            intermediate: 0.0,
            advanced: 0.0,
        };
        // 0.4 × 0.3 + 0.4 × (0.6 + 0.4) + 0.2 × 0.7
        let suggestion = select_next(
            None,
            &[draft],
            &ThemeWeights::default(),
            3.0,
            Language::English,
            &rates(),
        )
        .unwrap();
        assert!((suggestion.score - 0.66).abs() < 1e-9);
        assert_eq!(suggestion.reason, Rationale::VocabularyFit(10));
    }

    #[test]
    fn test_theme_weights_from_scenes() {
        let user = vec![
            ScenePreference {
                scene_id: "travel".to_string(),
                name: Some("Travel".to_string()),
                weight: 0.9,
            },
            ScenePreference {
                scene_id: "food".to_string(),
                name: None,
                weight: 0.5,
            },
            ScenePreference {
                scene_id: "work".to_string(),
                name: Some("Work".to_string()),
                weight: 0.2,
            },
        ];
        let themes = vec![
            ThemeScene {
                theme_id: "trip".to_string(),
                scene_id: "travel".to_string(),
                weight: 0.6,
            },
            ThemeScene {
                theme_id: "trip".to_string(),
                scene_id: "food".to_string(),
                weight: 0.4,
            },
            ThemeScene {
                theme_id: "trip".to_string(),
                scene_id: "work".to_string(),
                weight: 0.1,
            },
            ThemeScene {
                theme_id: "office".to_string(),
                scene_id: "sports".to_string(),
                weight: 1.0,
            },
        ];
        let weights = ThemeWeights::from_scenes(&user, &themes);

        let trip = weights.get(Some("trip")).unwrap();
        // 0.54 + 0.20 + 0.02
        assert!((trip.weight - 0.76).abs() < 1e-9);
        // Unnamed scenes fall back to their id
        assert_eq!(trip.top_scenes, vec!["Travel".to_string(), "food".to_string()]);

        // No overlap, no entry
        assert!(weights.get(Some("office")).is_none());
        assert_eq!(weights.weight(Some("office")), FALLBACK_THEME_WEIGHT);
        assert_eq!(weights.weight(None), FALLBACK_THEME_WEIGHT);
    }

    #[test]
    fn test_interest_rationale_wins() {
        let mut weights = ThemeWeights::default();
        weights.0.insert(
            "trip".to_string(),
            ThemeWeight {
                weight: 0.8,
                top_scenes: vec!["Travel".to_string()],
            },
        );
        let mut item = candidate("trip-1", 3.0, Language::English, PracticeStatus::NotStarted);
        item.theme_id = Some("trip".to_string());
        item.theme_title = Some("Weekend trips".to_string());

        let suggestion =
            select_next(None, &[item.clone()], &weights, 3.0, Language::English, &rates()).unwrap();
        assert_eq!(suggestion.reason.to_string(), "Matches your interest in Travel");

        // Below the interest threshold with an off-target level, the theme title explains it
        weights.0.get_mut("trip").unwrap().weight = 0.4;
        item.item.level = 6.0;
        let suggestion =
            select_next(None, &[item], &weights, 3.0, Language::English, &rates()).unwrap();
        assert_eq!(suggestion.reason, Rationale::Theme("Weekend trips".to_string()));
    }

    #[test]
    fn test_level_rationale_fallback() {
        // Level 6 reads as 60% unknown, far outside the sweet spot
        let item = candidate("hard", 6.0, Language::English, PracticeStatus::NotStarted);
        let suggestion =
            select_next(None, &[item], &ThemeWeights::default(), 3.0, Language::English, &rates())
                .unwrap();
        assert_eq!(suggestion.reason, Rationale::Level(6.0));
    }

    #[test]
    fn test_recommend_for_band_filters_and_ranks() {
        let user = UserAbilityState {
            level: 3.0,
            ..Default::default()
        };
        let candidates = vec![
            candidate("too-easy", 1.0, Language::English, PracticeStatus::NotStarted),
            candidate("near", 3.5, Language::English, PracticeStatus::NotStarted),
            candidate("ideal", 3.2, Language::English, PracticeStatus::NotStarted),
            candidate("japanese", 3.2, Language::Japanese, PracticeStatus::NotStarted),
        ];
        let recommendation = recommend_for_band(&user, &candidates, Language::English, TargetBand::Main);
        assert_eq!(recommendation.level_range(), 2..=4);
        let ids: Vec<&str> = recommendation
            .ranked
            .iter()
            .map(|r| r.candidate.item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ideal", "near"]);
        assert_eq!(recommendation.reason, band_reason(TargetBand::Main));
    }

    #[test]
    fn test_candidate_json() {
        let json = r#"{
            "item": {
                "id": "a",
                "level": 2.5,
                "lex_profile": {"beginner": 0.7, "intermediate": 0.3, "advanced": 0.0},
                "language": "Japanese"
            }
        }"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        // Status defaults to not started
        assert_eq!(candidate.status, PracticeStatus::NotStarted);
        assert!(candidate.theme_id.is_none());

        let reason = serde_json::to_value(Rationale::VocabularyFit(12)).unwrap();
        assert_eq!(reason, serde_json::json!({"kind": "vocabulary_fit", "detail": 12}));
    }

    #[test]
    fn test_recommend_draws_band() {
        let user = UserAbilityState {
            level: 3.0,
            explore: ExploreConfig {
                main_ratio: 0.0,
                down_ratio: 0.0,
                up_ratio: 1.0,
            },
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let recommendation = recommend(&user, &[], Language::English, &mut rng);
        assert_eq!(recommendation.band, TargetBand::Up);
        assert!(recommendation.ranked.is_empty());
    }
}
