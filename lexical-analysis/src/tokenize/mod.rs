//! Segmenters turn preprocessed text into raw tokens. Classification against
//! dictionaries happens afterwards in [`crate::classify`].

pub mod english;
pub mod longest_match;
pub mod merge;
pub mod morphological;
pub mod script_run;
pub mod words;

use language_utils::PartOfSpeech;

use crate::error::TokenizerError;

pub use english::EnglishTagger;
pub use longest_match::LongestMatchSegmenter;
pub use merge::{JAPANESE_MERGE_RULES, MergeRule, apply_merge_rules};
pub use morphological::MorphologicalSegmenter;
pub use script_run::ScriptRunSegmenter;
pub use words::WordSegmenter;

/// What a backend knows about a token's word class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosTag {
    /// IPADIC-style major class and first sub-class, e.g. `名詞` / `サ変接続`.
    Ipadic { major: String, minor: String },
    Universal(PartOfSpeech),
    /// Found as a whole entry by dictionary longest match.
    DictionaryMatch,
    Untagged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub surface: String,
    pub lemma: Option<String>,
    pub tag: PosTag,
}

impl RawToken {
    pub fn untagged(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            lemma: None,
            tag: PosTag::Untagged,
        }
    }

    pub fn ipadic(
        surface: impl Into<String>,
        lemma: impl Into<String>,
        major: impl Into<String>,
        minor: impl Into<String>,
    ) -> Self {
        Self {
            surface: surface.into(),
            lemma: Some(lemma.into()),
            tag: PosTag::Ipadic {
                major: major.into(),
                minor: minor.into(),
            },
        }
    }

    pub fn lemma_or_surface(&self) -> &str {
        self.lemma.as_deref().unwrap_or(&self.surface)
    }

    pub fn ipadic_major(&self) -> Option<&str> {
        match &self.tag {
            PosTag::Ipadic { major, .. } => Some(major),
            _ => None,
        }
    }

    pub fn ipadic_minor(&self) -> Option<&str> {
        match &self.tag {
            PosTag::Ipadic { minor, .. } => Some(minor),
            _ => None,
        }
    }
}

pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str;

    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError>;
}

/// Runs `primary`, falling back to `fallback` when it is missing or fails.
/// Never fails itself: the fallback's own errors yield no tokens.
pub fn segment_with_fallback(
    primary: Option<&dyn Segmenter>,
    fallback: &dyn Segmenter,
    text: &str,
) -> Vec<RawToken> {
    if let Some(primary) = primary {
        match primary.segment(text) {
            Ok(tokens) => return tokens,
            Err(err) => {
                log::warn!("{err}; falling back to {}", fallback.name());
            }
        }
    }
    fallback
        .segment(text)
        .inspect_err(|err| log::error!("{err}"))
        .unwrap_or_default()
}
