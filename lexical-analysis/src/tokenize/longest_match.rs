use language_utils::Language;

use super::{PosTag, RawToken, Segmenter};
use crate::dictionary::Lexicon;
use crate::error::TokenizerError;

/// Dictionary-driven segmentation for unspaced scripts: at each position take
/// the longest known word, else a single character.
pub struct LongestMatchSegmenter {
    lexicon: Lexicon,
    max_window: usize,
}

impl LongestMatchSegmenter {
    pub fn new(lexicon: Lexicon, max_window: usize) -> Self {
        Self {
            lexicon,
            max_window: max_window.max(1),
        }
    }

    pub fn for_language(lexicon: Lexicon) -> Self {
        let window = match lexicon.language() {
            Language::Japanese => 6,
            _ => 4,
        };
        Self::new(lexicon, window)
    }
}

impl Segmenter for LongestMatchSegmenter {
    fn name(&self) -> &'static str {
        "longest-match"
    }

    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        let chars: Vec<char> = text.chars().filter(|c| c.is_alphanumeric()).collect();
        let mut tokens = Vec::new();
        let mut candidate = String::new();

        let mut i = 0;
        while i < chars.len() {
            let longest = self.max_window.min(chars.len() - i);
            let matched = (1..=longest).rev().find_map(|len| {
                candidate.clear();
                candidate.extend(&chars[i..i + len]);
                self.lexicon.knows(&candidate).then_some(len)
            });

            match matched {
                Some(len) => {
                    tokens.push(RawToken {
                        surface: chars[i..i + len].iter().collect(),
                        lemma: None,
                        tag: PosTag::DictionaryMatch,
                    });
                    i += len;
                }
                None => {
                    tokens.push(RawToken::untagged(chars[i]));
                    i += 1;
                }
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayPrecedence;
    use crate::dictionary::Dictionary;
    use crate::overlay::DiscoveredRules;
    use language_utils::ProficiencyLabel;
    use std::sync::Arc;

    fn chinese_lexicon(words: &[&str]) -> Lexicon {
        let dictionary = Dictionary::from_entries(
            Language::Chinese,
            words.iter().map(|word| (*word, ProficiencyLabel::Hsk(1))),
        );
        Lexicon::new(
            Arc::new(dictionary),
            Arc::new(DiscoveredRules::default()),
            OverlayPrecedence::BeforeDictionary,
        )
    }

    #[test]
    fn test_prefers_longest_entry() {
        let segmenter = LongestMatchSegmenter::for_language(chinese_lexicon(&["中国", "中国人", "人"]));
        let tokens = segmenter.segment("中国人，好").unwrap();
        let surfaces: Vec<&str> = tokens.iter().map(|t| t.surface.as_str()).collect();
        assert_eq!(surfaces, vec!["中国人", "好"]);
        assert_eq!(tokens[0].tag, PosTag::DictionaryMatch);
        // Unmatched characters come out one at a time, untagged
        assert_eq!(tokens[1].tag, PosTag::Untagged);
    }

    #[test]
    fn test_window_limits_match_length() {
        let lexicon = chinese_lexicon(&["中华人民共和国"]);
        let tokens = LongestMatchSegmenter::new(lexicon, 4).segment("中华人民共和国").unwrap();
        // A seven-character entry is out of reach of a four-character window
        assert_eq!(tokens.len(), 7);
    }

    #[test]
    fn test_curated_words_are_matched() {
        let lexicon = Lexicon::new(
            Arc::new(Dictionary::empty(Language::Japanese)),
            Arc::new(DiscoveredRules::default()),
            OverlayPrecedence::BeforeDictionary,
        );
        let tokens = LongestMatchSegmenter::for_language(lexicon).segment("日本語").unwrap();
        assert_eq!(tokens.len(), 1);
    }
}
