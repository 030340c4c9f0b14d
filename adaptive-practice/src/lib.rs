//! Adaptive practice: estimating what a learner knows, scoring items against
//! that, folding sessions back into the estimate and picking what comes next.

pub mod posterior;
pub mod predictor;
pub mod scorer;
pub mod selector;
pub mod updater;

pub use posterior::{
    ArticleDifficulty, ArticlePrediction, AudienceTier, Confidence, WordEvidence, WordFeatures,
    WordPrediction, article_difficulty, predict_article, predict_word,
};
pub use predictor::{
    DEFAULT_LADDER_SPLIT, LadderSplit, WordKnowledge, default_profile, predict_comprehension,
    precise_unknown_rate, profile_from_evidence,
};
pub use scorer::{
    interpolated_unknown_rate, level_range_for_band, pick_target_band, score, sweet_spot_score,
};
pub use selector::{
    BandRecommendation, Candidate, Rationale, RankedCandidate, ScenePreference, Suggestion,
    ThemeScene, ThemeWeight, ThemeWeights, recommend, recommend_for_band, select_next,
};
pub use updater::{session_skill, update};
