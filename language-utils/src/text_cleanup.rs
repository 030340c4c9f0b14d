//! Text cleanup applied before segmentation.
//!
//! Analysis input is often dialogue copied from scripts or chat logs, so the
//! cleanup removes structural noise (speaker prefixes, line breaks, ellipses)
//! that segmenters would otherwise merge into neighbouring words.

use crate::Language;

/// Punctuation removed from unspaced text before dictionary and pattern matching.
const MATCHING_PUNCTUATION: &[char] = &[
    '。', '、', '！', '？', '「', '」', '『', '』', '（', '）', '.', '!', '?', ',', ';', ':', '[',
    ']', '(', ')', '{', '}', '“', '”', '‘', '’', '《', '》', '【', '】', '"', '\'', '，', '：', '；',
];

/// Characters from a neighbouring script that show up in Japanese text, usually
/// from IME slips or copy-paste out of Chinese sources.
const JAPANESE_HOMOGLYPHS: &[(char, &str)] = &[('对', "対"), ('为', "為"), ('这', "これ"), ('那', "あれ")];

/// Full cleanup pipeline for a piece of learner text.
///
/// - Strips dialogue speaker prefixes (`A: `, `Ken: `) at line starts
/// - For Japanese: replaces cross-script homoglyphs
/// - Turns line breaks and ellipses into sentence-terminal punctuation
/// - For English: normalizes quote variants and expands contractions
pub fn preprocess_for_analysis(text: &str, language: Language) -> String {
    let text = strip_dialogue_speakers(text);
    let writing_system = language.writing_system();

    let text = if language == Language::Japanese {
        replace_homoglyphs(&text, JAPANESE_HOMOGLYPHS)
    } else {
        text
    };

    if writing_system.is_unspaced() {
        normalize_sentence_breaks(&text, "。").trim().to_string()
    } else {
        let text = normalize_sentence_breaks(&normalize_punctuation_variants(&text), ". ");
        let text = if language == Language::English {
            expand_english_contractions(&text)
        } else {
            text
        };
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Remove `Name:` prefixes at the start of each line.
///
/// Only ASCII alphanumeric names are recognized (`A`, `B2`, `Ken`), followed by
/// an ASCII or full-width colon.
pub fn strip_dialogue_speakers(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            let name_len = trimmed
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric())
                .count();
            if name_len == 0 {
                return line;
            }
            let rest = &trimmed[name_len..];
            let after_colon = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：'));
            match after_colon {
                Some(remainder) => remainder.trim_start_matches([' ', '\t', '\u{3000}']),
                None => line,
            }
        })
        .collect()
}

/// Replace ellipses (`…`, `...`) and runs of line breaks with `terminal`.
pub fn normalize_sentence_breaks(text: &str, terminal: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];

        if ch == '…' {
            i = run_end(&chars, i, |c| c == '…');
            result.push_str(terminal);
        } else if ch == '.' && run_end(&chars, i, |c| c == '.') - i >= 3 {
            i = run_end(&chars, i, |c| c == '.');
            result.push_str(terminal);
        } else if ch == '\r' || ch == '\n' {
            i = run_end(&chars, i, |c| c == '\r' || c == '\n');
            // don't double up when the line already ended a sentence
            let already_terminated = result
                .trim_end()
                .ends_with(['。', '.', '!', '?', '！', '？']);
            if result.trim().is_empty() {
                continue;
            }
            if already_terminated {
                result.push_str(&terminal[terminal.trim_end().len()..]);
            } else {
                result.push_str(terminal);
            }
        } else {
            result.push(ch);
            i += 1;
        }
    }

    result
}

fn run_end(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
    chars[start..]
        .iter()
        .position(|c| !pred(*c))
        .map_or(chars.len(), |offset| start + offset)
}

fn replace_homoglyphs(text: &str, table: &[(char, &str)]) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match table.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => result.push_str(to),
            None => result.push(ch),
        }
    }
    result
}

/// Remove whitespace and punctuation so unspaced text can be matched against
/// dictionary entries and grammar patterns as one continuous string.
pub fn strip_for_matching(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !MATCHING_PUNCTUATION.contains(c))
        .collect()
}

/// Replace Unicode quote and hyphen variants with their ASCII equivalents.
pub fn normalize_punctuation_variants(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            // Single quote variants: ' (U+2018), ' (U+2019), ‚ (U+201A), ‛ (U+201B),
            // ′ (U+2032), ‵ (U+2035), ❛ (U+275B), ❜ (U+275C), ＇ (U+FF07),
            // ʻ (U+02BB), ʼ (U+02BC), ʽ (U+02BD), ʹ (U+02B9), `, ´ (U+00B4)
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{2035}'
            | '\u{275B}' | '\u{275C}' | '\u{FF07}' | '\u{02BB}' | '\u{02BC}' | '\u{02BD}'
            | '\u{02B9}' | '`' | '\u{00B4}' => '\'',

            // Double quote variants: " (U+201C), " (U+201D), „ (U+201E), ‟ (U+201F),
            // ″ (U+2033), ‶ (U+2036), ❝ (U+275D), ❞ (U+275E), ＂ (U+FF02)
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{2036}'
            | '\u{275D}' | '\u{275E}' | '\u{FF02}' => '"',

            // Hyphen variants, but not the em/en dashes used as sentence punctuation
            '\u{2010}' | '\u{2011}' | '\u{2212}' | '\u{FE63}' | '\u{FF0D}' => '-',

            _ => c,
        })
        .collect()
}

/// Expand English contractions so auxiliaries and negation become separate
/// function words. Case is preserved on the first letter.
pub fn expand_english_contractions(text: &str) -> String {
    const CONTRACTIONS: &[(&str, &str)] = &[
        ("won't", "will not"),
        ("can't", "cannot"),
        ("i'm", "i am"),
        ("you're", "you are"),
        ("we're", "we are"),
        ("they're", "they are"),
        ("it's", "it is"),
        ("that's", "that is"),
        ("what's", "what is"),
        ("there's", "there is"),
        ("he's", "he is"),
        ("she's", "she is"),
        ("i've", "i have"),
        ("you've", "you have"),
        ("we've", "we have"),
        ("they've", "they have"),
        ("i'd", "i would"),
        ("you'd", "you would"),
        ("i'll", "i will"),
        ("you'll", "you will"),
        ("we'll", "we will"),
        ("they'll", "they will"),
        ("wouldn't", "would not"),
        ("shouldn't", "should not"),
        ("couldn't", "could not"),
        ("don't", "do not"),
        ("doesn't", "does not"),
        ("didn't", "did not"),
        ("isn't", "is not"),
        ("aren't", "are not"),
        ("wasn't", "was not"),
        ("weren't", "were not"),
        ("hasn't", "has not"),
        ("haven't", "have not"),
        ("hadn't", "had not"),
    ];

    text.split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            let core = lower.trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '\'');
            let Some((_, expansion)) = CONTRACTIONS.iter().find(|(from, _)| *from == core) else {
                return word.to_string();
            };
            let trailing = word.get(core.len()..).unwrap_or("");
            let mut expanded = expansion.to_string();
            if word.starts_with(|c: char| c.is_uppercase()) {
                expanded = capitalize(&expanded);
            }
            expanded + trailing
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
