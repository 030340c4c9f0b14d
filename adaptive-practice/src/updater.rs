//! Folding one practice session into a user's ability state.
//!
//! [`update`] is pure: the caller owns persistence.

use language_utils::{
    Band, BandMap, ExploreConfig, PracticeSession, QuizResult, SelfReport, UserAbilityState,
};

const LEVEL_STEP: f64 = 0.08;
const UNKNOWN_RATE_ALPHA: f64 = 0.2;
const COMPREHENSION_ALPHA: f64 = 0.3;
const EXPLORE_STEP: f64 = 0.05;
const EXPLORE_CAP: f64 = 0.4;
const EXPLORE_FLOOR: f64 = 0.1;
/// Minimum estimated tokens in a band before its unknown rate moves.
const MIN_BAND_TOKENS: f64 = 5.0;
const EPSILON: f64 = 1e-9;

/// Returns the state after `session`. `total_tokens` is the item's token
/// count; 0 disables the new-word signals.
pub fn update(
    state: &UserAbilityState,
    session: &PracticeSession,
    total_tokens: usize,
) -> UserAbilityState {
    let skill = session_skill(session, total_tokens);
    let level = match skill {
        Some(skill) => update_ability_level(state.level, session.item_level, skill),
        None => state.level,
    };
    let unknown_rate_by_band =
        update_unknown_rates(&state.unknown_rate_by_band, session, total_tokens);
    let comprehension_rate =
        update_comprehension_rate(state.comprehension_rate, session.quiz_result.as_ref());
    let explore = update_explore_config(&state.explore, comprehension_rate);

    log::debug!(
        "session {} for {}: skill {skill:?}, level {:.2} -> {level:.2}, comprehension {:.2} -> {comprehension_rate:.2}",
        session.item_id,
        session.user_id,
        state.level,
        state.comprehension_rate,
    );

    UserAbilityState {
        level,
        unknown_rate_by_band,
        comprehension_rate,
        explore,
        bayesian: state.bayesian.clone(),
    }
}

pub fn self_report_factor(report: Option<SelfReport>) -> f64 {
    match report {
        Some(SelfReport::TooEasy) => 1.1,
        Some(SelfReport::JustRight) | None => 1.0,
        Some(SelfReport::ABitHard) => 0.95,
        Some(SelfReport::TooHard) => 0.8,
    }
}

pub fn new_word_factor(new_words: usize, total_tokens: usize) -> f64 {
    if total_tokens == 0 {
        return 1.0;
    }
    let ratio = new_words as f64 / total_tokens as f64;
    if ratio < 0.03 {
        0.9
    } else if ratio <= 0.25 {
        1.05
    } else {
        0.8
    }
}

pub fn quiz_factor(quiz: Option<&QuizResult>) -> f64 {
    match quiz.and_then(QuizResult::correct_rate) {
        None => 1.0,
        Some(rate) if rate >= 1.0 => 1.1,
        Some(rate) if rate >= 0.7 => 1.0,
        Some(rate) if rate >= 0.5 => 0.9,
        Some(_) => 0.8,
    }
}

/// Performance on one session, nominally in `[0, 1.1]`. `None` when the
/// session has no sentence records to score.
pub fn session_skill(session: &PracticeSession, total_tokens: usize) -> Option<f64> {
    let records = &session.sentence_records;
    if records.is_empty() {
        return None;
    }
    let count = records.len() as f64;
    let first_score = records.iter().map(|r| r.first_score / 100.0).sum::<f64>() / count;
    let attempts = records.iter().map(|r| r.attempts as f64).sum::<f64>() / count;
    let attempts_factor = (1.0 - 0.15 * (attempts - 1.0)).max(0.6);

    Some(
        first_score
            * attempts_factor
            * self_report_factor(session.self_reported_difficulty)
            * new_word_factor(session.new_words.len(), total_tokens)
            * quiz_factor(session.quiz_result.as_ref()),
    )
}

/// Moves the level one step on a strong or weak session. Items more than half
/// a level below the user never move it.
pub fn update_ability_level(level: f64, item_level: f64, skill: f64) -> f64 {
    let mut next = level;
    if item_level >= level - 0.5 {
        if skill > 0.9 {
            next += LEVEL_STEP;
        } else if skill < 0.5 {
            next -= LEVEL_STEP;
        }
    }
    next.clamp(1.0, 6.0)
}

/// EMA of the observed share of new words per band, for bands the item had
/// enough words in. Words without a level count as intermediate.
pub fn update_unknown_rates(
    rates: &BandMap<f64>,
    session: &PracticeSession,
    total_tokens: usize,
) -> BandMap<f64> {
    let Some(lex_profile) = &session.item_lex_profile else {
        return *rates;
    };
    if total_tokens == 0 {
        return *rates;
    }

    let mut new_counts = BandMap::<usize>::default();
    for word in &session.new_words {
        let band = word.level.map_or(Band::Intermediate, |label| label.band());
        *new_counts.get_mut(&band) += 1;
    }

    BandMap::from_fn(|band| {
        let current = *rates.get(&band);
        let band_tokens = total_tokens as f64 * lex_profile.get(&band);
        if band_tokens > MIN_BAND_TOKENS {
            let observed = *new_counts.get(&band) as f64 / band_tokens;
            ((1.0 - UNKNOWN_RATE_ALPHA) * current + UNKNOWN_RATE_ALPHA * observed).clamp(0.0, 1.0)
        } else {
            current
        }
    })
}

/// EMA against the quiz's correct rate. Unchanged without a usable quiz.
pub fn update_comprehension_rate(current: f64, quiz: Option<&QuizResult>) -> f64 {
    match quiz.and_then(QuizResult::correct_rate) {
        Some(observed) => {
            ((1.0 - COMPREHENSION_ALPHA) * current + COMPREHENSION_ALPHA * observed).clamp(0.0, 1.0)
        }
        None => current,
    }
}

/// Shifts one step toward challenge above 80% comprehension and toward
/// consolidation below 60%, then renormalizes.
pub fn update_explore_config(explore: &ExploreConfig, comprehension_rate: f64) -> ExploreConfig {
    let ExploreConfig {
        mut main_ratio,
        mut down_ratio,
        mut up_ratio,
    } = *explore;

    if comprehension_rate > 0.8 {
        if up_ratio < EXPLORE_CAP - EPSILON {
            up_ratio += EXPLORE_STEP;
            if down_ratio > EXPLORE_FLOOR + EPSILON {
                down_ratio -= EXPLORE_STEP;
            } else {
                main_ratio -= EXPLORE_STEP;
            }
        }
    } else if comprehension_rate < 0.6 && down_ratio < EXPLORE_CAP - EPSILON {
        down_ratio += EXPLORE_STEP;
        if up_ratio > EXPLORE_FLOOR + EPSILON {
            up_ratio -= EXPLORE_STEP;
        } else {
            main_ratio -= EXPLORE_STEP;
        }
    }

    normalize(ExploreConfig {
        main_ratio: main_ratio.max(0.0),
        down_ratio: down_ratio.max(0.0),
        up_ratio: up_ratio.max(0.0),
    })
}

fn normalize(explore: ExploreConfig) -> ExploreConfig {
    let total = explore.total();
    if total <= 0.0 {
        return ExploreConfig::default();
    }
    ExploreConfig {
        main_ratio: explore.main_ratio / total,
        down_ratio: explore.down_ratio / total,
        up_ratio: explore.up_ratio / total,
    }
}
