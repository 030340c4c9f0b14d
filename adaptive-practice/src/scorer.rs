//! How well an item fits a user for a chosen recommendation band.

use std::ops::RangeInclusive;

use language_utils::{BandMap, ExploreConfig, ItemMetadata, TargetBand, UserAbilityState};
use rand::Rng;

use crate::predictor::predict_comprehension;

/// Predicted comprehension a band aims for, and how far off still scores well.
pub fn comprehension_target(band: TargetBand) -> (f64, f64) {
    match band {
        TargetBand::Down => (0.97, 0.05),
        TargetBand::Main => (0.85, 0.10),
        TargetBand::Up => (0.68, 0.12),
    }
}

/// 0.8 to 1.0 inside the tolerance, falling by 3 per unit of excess outside it.
pub fn comprehension_match(predicted: f64, band: TargetBand) -> f64 {
    let (ideal, tolerance) = comprehension_target(band);
    let distance = (predicted - ideal).abs();
    if distance <= tolerance {
        1.0 - distance / tolerance * 0.2
    } else {
        (0.8 - (distance - tolerance) * 3.0).max(0.0)
    }
}

/// Item level minus user level that a band aims for.
pub fn ideal_level_delta(band: TargetBand) -> f64 {
    match band {
        TargetBand::Main => 0.2,
        TargetBand::Down => -0.5,
        TargetBand::Up => 0.6,
    }
}

pub fn level_match(user_level: f64, item_level: f64, band: TargetBand) -> f64 {
    let delta = item_level - user_level;
    (1.0 - (delta - ideal_level_delta(band)).abs()).clamp(0.0, 1.0)
}

/// Share of an item's words the user is expected not to know, from the item's
/// band profile and the user's per-band unknown rates.
pub fn expected_unknown_ratio(unknown_rates: &BandMap<f64>, lex_profile: &BandMap<f64>) -> f64 {
    lex_profile
        .iter()
        .map(|(band, share)| share * unknown_rates.get(&band))
        .sum()
}

/// Rewards 5-20% new words. Easier texts score 0.5, harder ones 0.4.
pub fn sweet_spot_score(unknown_ratio: f64) -> f64 {
    if unknown_ratio < 0.02 {
        0.5
    } else if unknown_ratio > 0.30 {
        0.4
    } else if (0.05..=0.20).contains(&unknown_ratio) {
        1.0
    } else {
        0.8
    }
}

/// Fit of `item` for `user` within `band`, in `[0, 1]`.
///
/// Users with a mastery profile are scored on predicted comprehension when the
/// item's language has a mastery ladder. Everyone else is scored 70/30 on level
/// distance and expected share of new words.
pub fn score(user: &UserAbilityState, item: &ItemMetadata, band: TargetBand) -> f64 {
    match &user.bayesian {
        Some(profile) if item.language.proficiency_scale().has_ladder() => {
            comprehension_match(predict_comprehension(profile, &item.lex_profile), band)
        }
        _ => {
            let level = level_match(user.level, item.level, band);
            let lexical = sweet_spot_score(expected_unknown_ratio(
                &user.unknown_rate_by_band,
                &item.lex_profile,
            ));
            0.7 * level + 0.3 * lexical
        }
    }
}

/// Draws a band in proportion to the explore ratios.
pub fn pick_target_band<R: Rng>(explore: &ExploreConfig, rng: &mut R) -> TargetBand {
    let draw = rng.random::<f64>() * explore.total();
    if draw < explore.down_ratio {
        TargetBand::Down
    } else if draw < explore.down_ratio + explore.main_ratio {
        TargetBand::Main
    } else {
        TargetBand::Up
    }
}

/// Whole item levels worth searching for a band, within 1 to 6.
pub fn level_range_for_band(level: f64, band: TargetBand) -> RangeInclusive<u8> {
    let level = level.clamp(1.0, 6.0);
    let floor = level.floor() as u8;
    let ceil = level.ceil() as u8;
    match band {
        TargetBand::Down => floor.saturating_sub(1).max(1)..=floor,
        TargetBand::Main => floor.saturating_sub(1).max(1)..=(ceil + 1).min(6),
        TargetBand::Up => ceil..=(ceil + 2).min(6),
    }
}

/// Unknown rate for an item known only by level: flat within a band's level
/// span, linear between neighbouring bands.
pub fn interpolated_unknown_rate(level: f64, unknown_rates: &BandMap<f64>) -> f64 {
    let BandMap {
        beginner,
        intermediate,
        advanced,
    } = *unknown_rates;
    if level <= 1.0 {
        beginner
    } else if level <= 2.0 {
        beginner + (intermediate - beginner) * (level - 1.0)
    } else if level <= 3.0 {
        intermediate
    } else if level <= 4.0 {
        intermediate + (advanced - intermediate) * (level - 3.0)
    } else {
        advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::default_profile;
    use language_utils::Language;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(level: f64, language: Language, lex_profile: BandMap<f64>) -> ItemMetadata {
        ItemMetadata {
            id: "item".to_string(),
            level,
            lex_profile,
            language,
        }
    }

    fn lex(beginner: f64, intermediate: f64, advanced: f64) -> BandMap<f64> {
        BandMap {
            beginner,
            intermediate,
            advanced,
        }
    }

    #[test]
    fn test_comprehension_match() {
        // Dead on the ideal
        assert_eq!(comprehension_match(0.85, TargetBand::Main), 1.0);
        // Edge of tolerance
        assert!((comprehension_match(0.95, TargetBand::Main) - 0.8).abs() < 1e-9);
        // 0.1 past tolerance
        assert!((comprehension_match(0.55, TargetBand::Up) - 0.5).abs() < 1e-9);
        assert_eq!(comprehension_match(0.0, TargetBand::Down), 0.0);
    }

    #[test]
    fn test_sweet_spot() {
        assert_eq!(sweet_spot_score(0.01), 0.5);
        assert_eq!(sweet_spot_score(0.03), 0.8);
        assert_eq!(sweet_spot_score(0.10), 1.0);
        assert_eq!(sweet_spot_score(0.25), 0.8);
        assert_eq!(sweet_spot_score(0.50), 0.4);
    }

    #[test]
    fn test_fallback_path() {
        let user = UserAbilityState {
            level: 3.0,
            ..Default::default()
        };
        // Level 3.2 is the main band's ideal; all-beginner words give a 10% unknown ratio
        let english = item(3.2, Language::English, lex(1.0, 0.0, 0.0));
        assert!((score(&user, &english, TargetBand::Main) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ladder_path_only_with_profile_and_ladder() {
        let mut user = UserAbilityState {
            level: 3.0,
            ..Default::default()
        };
        let japanese = item(3.2, Language::Japanese, lex(1.0, 0.0, 0.0));
        let fallback = score(&user, &japanese, TargetBand::Main);

        user.bayesian = Some(default_profile());
        // Default mastery reads an all-beginner item at 0.6 × 0.70 + 0.4 × 0.45
        let ladder = score(&user, &japanese, TargetBand::Main);
        let expected = comprehension_match(0.60, TargetBand::Main);
        assert!((ladder - expected).abs() < 1e-9);
        assert!((ladder - fallback).abs() > 1e-6);

        // English has no ladder even with a profile
        let english = item(3.2, Language::English, lex(1.0, 0.0, 0.0));
        let without_profile = UserAbilityState {
            bayesian: None,
            ..user.clone()
        };
        assert_eq!(
            score(&user, &english, TargetBand::Main),
            score(&without_profile, &english, TargetBand::Main)
        );
    }

    #[test]
    fn test_pick_target_band_follows_ratios() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let explore = ExploreConfig::default();
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            match pick_target_band(&explore, &mut rng) {
                TargetBand::Down => counts[0] += 1,
                TargetBand::Main => counts[1] += 1,
                TargetBand::Up => counts[2] += 1,
            }
        }
        // 20/60/20 within a couple of points
        assert!((1800..2200).contains(&counts[0]));
        assert!((5800..6200).contains(&counts[1]));
        assert!((1800..2200).contains(&counts[2]));
    }

    #[test]
    fn test_level_ranges() {
        assert_eq!(level_range_for_band(3.4, TargetBand::Down), 2..=3);
        assert_eq!(level_range_for_band(3.4, TargetBand::Main), 2..=5);
        assert_eq!(level_range_for_band(3.4, TargetBand::Up), 4..=6);
        // Clamped at the ends of the scale
        assert_eq!(level_range_for_band(1.0, TargetBand::Down), 1..=1);
        assert_eq!(level_range_for_band(6.0, TargetBand::Main), 5..=6);
        assert_eq!(level_range_for_band(6.0, TargetBand::Up), 6..=6);
    }

    #[test]
    fn test_interpolated_unknown_rate() {
        let rates = lex(0.1, 0.3, 0.6);
        assert_eq!(interpolated_unknown_rate(0.5, &rates), 0.1);
        assert!((interpolated_unknown_rate(1.5, &rates) - 0.2).abs() < 1e-9);
        assert_eq!(interpolated_unknown_rate(2.5, &rates), 0.3);
        assert!((interpolated_unknown_rate(3.5, &rates) - 0.45).abs() < 1e-9);
        assert_eq!(interpolated_unknown_rate(5.0, &rates), 0.6);
    }
}
