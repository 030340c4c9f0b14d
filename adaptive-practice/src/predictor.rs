//! Mastery-based comprehension prediction on the JLPT ladder.
//!
//! Items only carry a three-band lexical profile, so predictions first spread
//! each band over the ladder levels it covers ([`LadderSplit`]) and then weigh
//! the user's per-level mastery.

use language_utils::{Band, BandMap, BayesianProfile, BroadBandMap, JlptLevel, JlptLevelMap};
use serde::{Deserialize, Serialize};

/// How each band's share of an item is spread over ladder levels. Each band's
/// shares sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderSplit(pub BandMap<&'static [(JlptLevel, f64)]>);

pub const DEFAULT_LADDER_SPLIT: LadderSplit = LadderSplit(BandMap {
    beginner: &[(JlptLevel::N5, 0.6), (JlptLevel::N4, 0.4)],
    intermediate: &[(JlptLevel::N3, 0.6), (JlptLevel::N2, 0.4)],
    advanced: &[(JlptLevel::N1, 1.0)],
});

impl LadderSplit {
    /// Ladder weights for an item's band profile, normalized by the profile's
    /// total. `None` when the profile is empty.
    pub fn ladder_weights(&self, lex_profile: &BandMap<f64>) -> Option<JlptLevelMap<f64>> {
        let total: f64 = lex_profile.values().map(|share| share.max(0.0)).sum();
        if total <= 0.0 {
            return None;
        }
        let mut weights = JlptLevelMap::<f64>::default();
        for band in Band::ALL {
            let share = lex_profile.get(&band).max(0.0) / total;
            for (level, split) in self.0.get(&band).iter() {
                *weights.get_mut(level) += share * split;
            }
        }
        Some(weights)
    }
}

/// Expected fraction of an item's words the user knows, in `[0, 1]`. 0.5 when
/// the item has no band profile.
pub fn predict_comprehension(profile: &BayesianProfile, lex_profile: &BandMap<f64>) -> f64 {
    predict_comprehension_with(&DEFAULT_LADDER_SPLIT, profile, lex_profile)
}

pub fn predict_comprehension_with(
    split: &LadderSplit,
    profile: &BayesianProfile,
    lex_profile: &BandMap<f64>,
) -> f64 {
    let Some(weights) = split.ladder_weights(lex_profile) else {
        return 0.5;
    };
    let comprehension: f64 = JlptLevel::ALL
        .iter()
        .map(|level| weights.get(level) * profile.mastery.get(level))
        .sum();
    comprehension.clamp(0.0, 1.0)
}

/// Mastery assumed for a level until enough words at it have been seen.
pub const PRIOR_MASTERY: JlptLevelMap<f64> = JlptLevelMap {
    n5: 0.85,
    n4: 0.65,
    n3: 0.40,
    n2: 0.20,
    n1: 0.10,
};

const MIN_EXPOSURES_PER_LEVEL: u32 = 5;
const MIN_KNOWN_FOR_THRESHOLD: usize = 10;
const DEFAULT_FREQUENCY_THRESHOLD: u32 = 5000;

/// What is on record about one word for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WordKnowledge {
    pub word: String,
    #[serde(default)]
    pub level: Option<JlptLevel>,
    #[serde(default)]
    pub frequency_rank: Option<u32>,
    #[serde(default)]
    pub marked_unknown: bool,
    /// Times the word appeared in practiced items.
    #[serde(default)]
    pub exposure_count: u32,
    /// Of those, times the user did not mark it as unknown.
    #[serde(default)]
    pub not_marked_count: u32,
}

/// Profile for a user with no history.
pub fn default_profile() -> BayesianProfile {
    BayesianProfile {
        mastery: JlptLevelMap {
            n5: 0.70,
            n4: 0.45,
            n3: 0.25,
            n2: 0.10,
            n1: 0.05,
        },
        estimated_level: 2.5,
        evidence_count: 0,
        frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
    }
}

/// `1 + 5 × mastery weighted by ladder rank`, clamped to `[1, 6]`.
pub fn estimated_level(mastery: &JlptLevelMap<f64>) -> f64 {
    let (weighted, total) = JlptLevel::ALL
        .iter()
        .fold((0.0, 0.0), |(weighted, total), level| {
            let weight = level.rank() as f64;
            (weighted + mastery.get(level) * weight, total + weight)
        });
    (1.0 + weighted / total * 5.0).clamp(1.0, 6.0)
}

/// Builds a profile from per-word history.
///
/// A level's mastery is the share of exposures the user let pass without
/// marking, once at least five exposures at that level are on record. The
/// frequency threshold is the median rank of words the user evidently knows.
pub fn profile_from_evidence(rows: &[WordKnowledge]) -> BayesianProfile {
    let mut exposed = JlptLevelMap::<u32>::default();
    let mut not_marked = JlptLevelMap::<u32>::default();
    let mut known_ranks = Vec::new();

    for row in rows {
        if let Some(level) = row.level {
            *exposed.get_mut(&level) += row.exposure_count.max(1);
            *not_marked.get_mut(&level) += row.not_marked_count;
        }
        if !row.marked_unknown && row.not_marked_count > 0 {
            if let Some(rank) = row.frequency_rank.filter(|rank| *rank > 0) {
                known_ranks.push(rank);
            }
        }
    }

    let mastery = JlptLevelMap::from_fn(|level| {
        let seen = *exposed.get(&level);
        if seen >= MIN_EXPOSURES_PER_LEVEL {
            (*not_marked.get(&level) as f64 / seen as f64).min(1.0)
        } else {
            *PRIOR_MASTERY.get(&level)
        }
    });

    let frequency_threshold = if known_ranks.len() >= MIN_KNOWN_FOR_THRESHOLD {
        known_ranks.sort_unstable();
        known_ranks[known_ranks.len() / 2]
    } else {
        DEFAULT_FREQUENCY_THRESHOLD
    };

    BayesianProfile {
        estimated_level: estimated_level(&mastery),
        mastery,
        evidence_count: rows.len() as u32,
        frequency_threshold,
    }
}

/// Assumed unknown rate for words no dictionary could place.
const UNLISTED_UNKNOWN_RATE: f64 = 0.8;

/// Expected share of an item's content words the user does not know, from the
/// item's per-band word counts (or fractions) and the user's mastery.
pub fn precise_unknown_rate(band_counts: &BroadBandMap<f64>, profile: &BayesianProfile) -> f64 {
    let mastery = &profile.mastery;
    let unknown_rates = BroadBandMap {
        beginner: 1.0 - (mastery.n5 + mastery.n4) / 2.0,
        intermediate: 1.0 - mastery.n3,
        advanced: 1.0 - (mastery.n2 + mastery.n1) / 2.0,
        unknown: UNLISTED_UNKNOWN_RATE,
    };

    let total: f64 = band_counts.values().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = band_counts
        .iter()
        .map(|(band, count)| count * unknown_rates.get(&band))
        .sum();
    (weighted / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(mastery: JlptLevelMap<f64>) -> BayesianProfile {
        BayesianProfile {
            estimated_level: estimated_level(&mastery),
            mastery,
            evidence_count: 0,
            frequency_threshold: DEFAULT_FREQUENCY_THRESHOLD,
        }
    }

    #[test]
    fn test_default_split_shares_sum_to_one() {
        for band in Band::ALL {
            let total: f64 = DEFAULT_LADDER_SPLIT.0.get(&band).iter().map(|(_, share)| share).sum();
            assert!((total - 1.0).abs() < 1e-9, "{band:?}");
        }
    }

    #[test]
    fn test_comprehension_is_weighted_mastery() {
        let profile = profile(JlptLevelMap {
            n5: 1.0,
            n4: 0.5,
            n3: 0.5,
            n2: 0.0,
            n1: 0.0,
        });
        let lex = BandMap {
            beginner: 0.5,
            intermediate: 0.25,
            advanced: 0.25,
        };
        // 0.5 × (0.6 + 0.4 × 0.5) + 0.25 × (0.6 × 0.5) = 0.4 + 0.075
        let predicted = predict_comprehension(&profile, &lex);
        assert!((predicted - 0.475).abs() < 1e-9);
    }

    #[test]
    fn test_profile_weights_are_normalized() {
        let profile = default_profile();
        let halves = BandMap {
            beginner: 0.5,
            intermediate: 0.0,
            advanced: 0.0,
        };
        let whole = BandMap {
            beginner: 1.0,
            intermediate: 0.0,
            advanced: 0.0,
        };
        assert!(
            (predict_comprehension(&profile, &halves) - predict_comprehension(&profile, &whole)).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_empty_item_profile_is_neutral() {
        assert_eq!(predict_comprehension(&default_profile(), &BandMap::default()), 0.5);
    }

    #[test]
    fn test_custom_split() {
        // Everything intermediate lands on N3
        let split = LadderSplit(BandMap {
            beginner: &[(JlptLevel::N5, 1.0)],
            intermediate: &[(JlptLevel::N3, 1.0)],
            advanced: &[(JlptLevel::N1, 1.0)],
        });
        let lex = BandMap {
            beginner: 0.0,
            intermediate: 1.0,
            advanced: 0.0,
        };
        let profile = default_profile();
        assert!((predict_comprehension_with(&split, &profile, &lex) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_profile_from_evidence() {
        let mut rows: Vec<WordKnowledge> = (0..12)
            .map(|i| WordKnowledge {
                word: format!("n5-{i}"),
                level: Some(JlptLevel::N5),
                frequency_rank: Some(100 * (i + 1)),
                marked_unknown: false,
                exposure_count: 1,
                not_marked_count: 1,
            })
            .collect();
        rows.push(WordKnowledge {
            word: "rare".to_string(),
            level: Some(JlptLevel::N1),
            frequency_rank: Some(20_000),
            marked_unknown: true,
            exposure_count: 2,
            not_marked_count: 0,
        });

        let profile = profile_from_evidence(&rows);
        // Twelve N5 exposures, all passed
        assert_eq!(profile.mastery.n5, 1.0);
        // Two N1 exposures is not enough evidence
        assert_eq!(profile.mastery.n1, PRIOR_MASTERY.n1);
        assert_eq!(profile.evidence_count, 13);
        // Median of 100..=1200
        assert_eq!(profile.frequency_threshold, 700);
        assert!((1.0..=6.0).contains(&profile.estimated_level));
    }

    #[test]
    fn test_sparse_evidence_keeps_defaults() {
        let profile = profile_from_evidence(&[]);
        assert_eq!(profile.mastery, PRIOR_MASTERY);
        assert_eq!(profile.frequency_threshold, DEFAULT_FREQUENCY_THRESHOLD);
    }

    #[test]
    fn test_estimated_level_bounds() {
        assert_eq!(estimated_level(&JlptLevelMap::from_fn(|_| 0.0)), 1.0);
        assert_eq!(estimated_level(&JlptLevelMap::from_fn(|_| 1.0)), 6.0);
    }

    #[test]
    fn test_precise_unknown_rate() {
        let profile = profile(JlptLevelMap {
            n5: 0.9,
            n4: 0.7,
            n3: 0.5,
            n2: 0.2,
            n1: 0.0,
        });
        let counts = BroadBandMap {
            beginner: 10.0,
            intermediate: 0.0,
            advanced: 0.0,
            unknown: 0.0,
        };
        assert!((precise_unknown_rate(&counts, &profile) - 0.2).abs() < 1e-9);

        let counts = BroadBandMap {
            beginner: 0.0,
            intermediate: 0.0,
            advanced: 0.0,
            unknown: 4.0,
        };
        assert!((precise_unknown_rate(&counts, &profile) - 0.8).abs() < 1e-9);
        assert_eq!(precise_unknown_rate(&BroadBandMap::default(), &profile), 0.0);
    }
}
