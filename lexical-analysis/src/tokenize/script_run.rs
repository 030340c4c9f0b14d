use language_utils::script::{ScriptClass, classify_char};

use super::{RawToken, Segmenter};
use crate::error::TokenizerError;

/// Lightweight Japanese segmenter: cuts wherever the script class changes.
///
/// `私は学生です` becomes `私 / は / 学生 / です`. Inflected verbs split at the
/// okurigana (`食 / べる`), which is the accuracy this backend trades for speed.
pub struct ScriptRunSegmenter;

impl Segmenter for ScriptRunSegmenter {
    fn name(&self) -> &'static str {
        "script-run"
    }

    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        let mut current_class = ScriptClass::Other;

        for ch in text.chars() {
            let class = classify_char(ch);
            // the long-vowel mark extends whatever run it follows
            if ch == 'ー' && !current.is_empty() {
                current.push(ch);
                continue;
            }
            if class != current_class && !current.is_empty() {
                tokens.push(RawToken::untagged(std::mem::take(&mut current)));
            }
            current_class = class;
            if class != ScriptClass::Other {
                current.push(ch);
            }
        }
        if !current.is_empty() {
            tokens.push(RawToken::untagged(current));
        }

        Ok(tokens)
    }
}
