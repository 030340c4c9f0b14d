use unicode_segmentation::UnicodeSegmentation;

use super::{RawToken, Segmenter};
use crate::error::TokenizerError;

/// Splits on Unicode word boundaries. No tags, lemma is the lowercased word.
pub struct WordSegmenter;

impl Segmenter for WordSegmenter {
    fn name(&self) -> &'static str {
        "words"
    }

    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        Ok(text
            .unicode_words()
            .map(|word| RawToken {
                surface: word.to_string(),
                lemma: Some(word.to_lowercase()),
                tag: super::PosTag::Untagged,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words() {
        let tokens = WordSegmenter.segment("Der Hund, die Katze.").unwrap();
        let lemmas: Vec<&str> = tokens.iter().map(|t| t.lemma_or_surface()).collect();
        assert_eq!(lemmas, vec!["der", "hund", "die", "katze"]);
    }
}
