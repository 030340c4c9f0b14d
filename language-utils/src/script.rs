//! Character script classes for CJK text.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptClass {
    Kanji,
    Hiragana,
    Katakana,
    Latin,
    Digit,
    /// Whitespace, punctuation and symbols.
    Other,
}

pub fn classify_char(c: char) -> ScriptClass {
    match c {
        '々' | '〆' | '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}' | '\u{F900}'..='\u{FAFF}' => {
            ScriptClass::Kanji
        }
        '\u{3041}'..='\u{309F}' => ScriptClass::Hiragana,
        '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
            ScriptClass::Katakana
        }
        '0'..='9' | '\u{FF10}'..='\u{FF19}' => ScriptClass::Digit,
        'a'..='z' | 'A'..='Z' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
            ScriptClass::Latin
        }
        c if c.is_alphabetic() => ScriptClass::Latin,
        _ => ScriptClass::Other,
    }
}

pub fn is_kanji(c: char) -> bool {
    classify_char(c) == ScriptClass::Kanji
}

pub fn has_kanji(word: &str) -> bool {
    word.chars().any(is_kanji)
}

pub fn has_katakana(word: &str) -> bool {
    word.chars()
        .any(|c| classify_char(c) == ScriptClass::Katakana && c != 'ー')
}

pub fn is_hiragana_only(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| classify_char(c) == ScriptClass::Hiragana || c == 'ー')
}

/// Katakana loanword spelling, long-vowel marks included.
pub fn is_katakana_only(word: &str) -> bool {
    has_katakana(word) && word.chars().all(|c| classify_char(c) == ScriptClass::Katakana)
}
