//! lindera-backed morphological analysis for Japanese (IPADIC) and Chinese
//! (CC-CEDICT). Only available with the `lindera` feature.

use language_utils::Language;

use super::{RawToken, Segmenter};
use crate::error::TokenizerError;

const BACKEND: &str = "lindera";

pub struct MorphologicalSegmenter {
    language: Language,
    #[cfg(feature = "lindera")]
    inner: lindera::segmenter::Segmenter,
}

impl MorphologicalSegmenter {
    #[cfg(feature = "lindera")]
    pub fn load(language: Language, dictionary_uri: Option<&str>) -> Result<Self, TokenizerError> {
        let unavailable = |reason: String| TokenizerError::BackendUnavailable {
            backend: BACKEND,
            reason,
        };
        let uri = dictionary_uri
            .ok_or_else(|| unavailable(format!("no morphological dictionary configured for {language}")))?;
        let dictionary = lindera::dictionary::load_dictionary(uri)
            .map_err(|err| unavailable(format!("failed to load {uri}: {err}")))?;
        let inner = lindera::segmenter::Segmenter::new(lindera::mode::Mode::Normal, dictionary, None);
        log::info!("loaded {language} morphological dictionary from {uri}");
        Ok(Self { language, inner })
    }

    #[cfg(not(feature = "lindera"))]
    pub fn load(language: Language, _dictionary_uri: Option<&str>) -> Result<Self, TokenizerError> {
        Err(TokenizerError::BackendUnavailable {
            backend: BACKEND,
            reason: format!("built without the `lindera` feature, cannot analyze {language}"),
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// Maps IPADIC feature columns (`品詞, 品詞細分類1, ..., 原形, ...`) onto a raw token.
/// Unknown words carry fewer columns and come out untagged.
pub fn from_ipadic_details(surface: &str, details: &[&str]) -> RawToken {
    match details {
        [major, minor, _, _, _, _, base, ..] => {
            let lemma = if *base == "*" { surface } else { *base };
            RawToken::ipadic(surface, lemma, *major, *minor)
        }
        _ => RawToken::untagged(surface),
    }
}

impl Segmenter for MorphologicalSegmenter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[cfg(feature = "lindera")]
    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        let tokens = self
            .inner
            .segment(std::borrow::Cow::Borrowed(text))
            .map_err(|err| TokenizerError::Segmentation {
                backend: BACKEND,
                reason: err.to_string(),
            })?;

        Ok(tokens
            .into_iter()
            .filter(|token| !token.surface.trim().is_empty())
            .map(|mut token| {
                let surface = token.surface.to_string();
                match self.language {
                    Language::Japanese => from_ipadic_details(&surface, &token.details()),
                    // CC-CEDICT details carry pinyin and glosses, not word classes
                    _ => RawToken::untagged(surface),
                }
            })
            .collect())
    }

    #[cfg(not(feature = "lindera"))]
    fn segment(&self, _text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        Err(TokenizerError::BackendUnavailable {
            backend: BACKEND,
            reason: "built without the `lindera` feature".to_string(),
        })
    }
}
