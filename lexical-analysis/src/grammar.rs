//! Grammar pattern detection over unspaced Japanese text.
//!
//! Patterns are matched longest first against a masked copy of the text: once a
//! pattern matches, every occurrence of it is blotted out so shorter patterns
//! nested inside (`から` inside `からこそ`) can no longer match there.
//!
//! Table patterns are parsed into a [`PatternShape`] first. A `（）` group is
//! optional, and an inner `〜` is a gap that splits the pattern into pieces
//! found in order within one sentence (`〜ば〜ほど`).

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use language_utils::text_cleanup::strip_for_matching;
use language_utils::{GrammarProfile, JlptLevel, JlptLevelMap, MatchedPattern};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::DictionaryError;

const MASK: char = '\u{2588}';
/// Stands in for sentence punctuation in the matching text.
const SENTENCE_BREAK: &str = "\u{2016}";
const SENTENCE_BREAKERS: &[char] = &['。', '！', '？', '!', '?', '、', '\n'];

/// Patterns whose cleaned form is shorter than this are too ambiguous to match.
const MIN_PATTERN_CHARS: usize = 2;
/// Split pieces shorter than this in total (`は〜が`) match almost any sentence.
const MIN_SPLIT_CHARS: usize = 3;
/// Most characters allowed between two pieces of a split pattern.
const MAX_SPLIT_GAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GrammarPattern {
    pub pattern: String,
    pub level: JlptLevel,
    #[serde(default)]
    pub definition: String,
}

impl GrammarPattern {
    pub fn new(pattern: impl Into<String>, level: JlptLevel, definition: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            level,
            definition: definition.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGrammarEntry {
    pattern: String,
    level: String,
    #[serde(default)]
    definition: String,
}

/// An ordered pattern list. Earlier entries win ties between equally long patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternTable {
    patterns: Vec<GrammarPattern>,
    // cleaned pattern -> level, for grading single function words
    levels_by_form: FxHashMap<String, JlptLevel>,
}

impl PatternTable {
    pub fn new(patterns: impl IntoIterator<Item = GrammarPattern>) -> Self {
        let mut seen = rustc_hash::FxHashSet::default();
        let patterns: Vec<GrammarPattern> = patterns
            .into_iter()
            .filter(|pattern| seen.insert(pattern.pattern.clone()))
            .collect();

        let mut levels_by_form = FxHashMap::default();
        for pattern in &patterns {
            if let PatternShape::Literal(forms) = PatternShape::parse(&pattern.pattern) {
                for form in forms.into_iter().filter(|form| !form.is_empty()) {
                    levels_by_form.entry(form).or_insert(pattern.level);
                }
            }
        }

        Self {
            patterns,
            levels_by_form,
        }
    }

    /// Reads a JSON array of `{pattern, level, definition}`. Entries with an
    /// unrecognized level are skipped.
    pub fn from_json_file(path: &Path) -> Result<Self, DictionaryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let entries: Vec<RawGrammarEntry> =
            serde_json::from_str(&contents).map_err(|source| DictionaryError::Parse {
                path: path.to_path_buf(),
                source: Arc::new(source),
            })?;

        let mut skipped = 0;
        let patterns: Vec<GrammarPattern> = entries
            .into_iter()
            .filter_map(|entry| match entry.level.trim().parse::<JlptLevel>() {
                Ok(level) => Some(GrammarPattern::new(entry.pattern, level, entry.definition)),
                Err(_) => {
                    if skipped == 0 {
                        log::warn!(
                            "{}: {}",
                            path.display(),
                            DictionaryError::UnknownLevel {
                                word: entry.pattern,
                                level: entry.level,
                            }
                        );
                    }
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            log::warn!("{}: skipped {skipped} patterns with bad levels", path.display());
        }
        Ok(Self::new(patterns))
    }

    pub fn patterns(&self) -> &[GrammarPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Places `extra` ahead of this table's own patterns.
    pub fn with_priority_patterns(&self, extra: &[GrammarPattern]) -> PatternTable {
        if extra.is_empty() {
            return self.clone();
        }
        PatternTable::new(extra.iter().chain(self.patterns.iter()).cloned())
    }

    /// Appends another table; patterns already present keep their first definition.
    pub fn extend(&mut self, other: PatternTable) {
        let merged = std::mem::take(&mut self.patterns)
            .into_iter()
            .chain(other.patterns);
        *self = PatternTable::new(merged);
    }

    /// Level of a pattern whose cleaned form is exactly `form`.
    pub fn level_of(&self, form: &str) -> Option<JlptLevel> {
        self.levels_by_form.get(form).copied()
    }
}

/// Strips placeholders (`X`, `〜`), brackets, bracketed annotations and connectors
/// so a table pattern like `〜からこそ` or `Ｖ＋ても〔譲歩〕` can be found in text.
pub fn clean_pattern(pattern: &str) -> String {
    let mut cleaned = String::with_capacity(pattern.len());
    let mut skip_until: Option<char> = None;
    for ch in pattern.chars() {
        if let Some(close) = skip_until {
            if ch == close {
                skip_until = None;
            }
            continue;
        }
        match ch {
            '〔' => skip_until = Some('〕'),
            '＜' => skip_until = Some('＞'),
            'X' | 'Y' | 'Z' | 'Ｖ' | 'Ｎ' | '～' | '〜' | '＋' => {}
            '「' | '」' | '『' | '』' | '（' | '）' | '[' | ']' => {}
            _ => cleaned.push(ch),
        }
    }
    cleaned.trim().to_string()
}

/// What a table pattern looks for in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternShape {
    /// Alternative forms, longest first. An optional group gives one form with
    /// its content and one without.
    Literal(Vec<String>),
    /// Pieces that must appear in this order within one sentence.
    Split(Vec<String>),
}

impl PatternShape {
    pub fn parse(pattern: &str) -> Self {
        let stripped = strip_annotations(pattern);
        let core = stripped.trim_matches('〜');

        if core.contains('〜') {
            let pieces: Vec<String> = core
                .split('〜')
                .map(|piece| piece.replace(['（', '）'], ""))
                .filter(|piece| !piece.is_empty())
                .collect();
            if pieces.len() >= 2 {
                return PatternShape::Split(pieces);
            }
            return PatternShape::Literal(vec![pieces.concat()]);
        }

        if core.contains('（') {
            let with = core.replace(['（', '）'], "");
            let without = remove_optional_groups(core);
            let forms = if without.is_empty() || without == with {
                vec![with]
            } else {
                vec![with, without]
            };
            return PatternShape::Literal(forms);
        }

        PatternShape::Literal(vec![core.to_string()])
    }

    /// Characters a match must cover. Unusable shapes weigh 0.
    fn weight(&self) -> usize {
        match self {
            PatternShape::Literal(forms) => forms
                .iter()
                .map(|form| form.chars().count())
                .filter(|chars| *chars >= MIN_PATTERN_CHARS)
                .max()
                .unwrap_or(0),
            PatternShape::Split(pieces) => {
                let chars: usize = pieces.iter().map(|piece| piece.chars().count()).sum();
                if chars >= MIN_SPLIT_CHARS { chars } else { 0 }
            }
        }
    }
}

/// Like [`clean_pattern`] but keeps `〜` gaps and `（）` groups, with `～`
/// folded into `〜`.
fn strip_annotations(pattern: &str) -> String {
    let mut stripped = String::with_capacity(pattern.len());
    let mut skip_until: Option<char> = None;
    for ch in pattern.chars() {
        if let Some(close) = skip_until {
            if ch == close {
                skip_until = None;
            }
            continue;
        }
        match ch {
            '〔' => skip_until = Some('〕'),
            '＜' => skip_until = Some('＞'),
            '～' => stripped.push('〜'),
            'X' | 'Y' | 'Z' | 'Ｖ' | 'Ｎ' | '＋' => {}
            '「' | '」' | '『' | '』' | '[' | ']' => {}
            ch if ch.is_whitespace() => {}
            _ => stripped.push(ch),
        }
    }
    stripped
}

fn remove_optional_groups(pattern: &str) -> String {
    let mut kept = String::with_capacity(pattern.len());
    let mut depth = 0usize;
    for ch in pattern.chars() {
        match ch {
            '（' => depth += 1,
            '）' => depth = depth.saturating_sub(1),
            _ if depth == 0 => kept.push(ch),
            _ => {}
        }
    }
    kept
}

/// Text with whitespace and punctuation removed, sentence ends kept as a marker
/// no pattern contains.
fn matching_text(text: &str) -> String {
    text.split(SENTENCE_BREAKERS)
        .map(strip_for_matching)
        .filter(|sentence| !sentence.is_empty())
        .join(SENTENCE_BREAK)
}

/// Byte ranges of the first in-order occurrence of `pieces` with no sentence
/// break and at most [`MAX_SPLIT_GAP`] characters between neighbours.
fn find_split(text: &str, pieces: &[String]) -> Option<Vec<Range<usize>>> {
    let (first, rest) = pieces.split_first()?;
    'start: for (start, _) in text.match_indices(first.as_str()) {
        let mut ranges = vec![start..start + first.len()];
        let mut cursor = start + first.len();
        for piece in rest {
            let Some(offset) = text[cursor..].find(piece.as_str()) else {
                return None;
            };
            let gap = &text[cursor..cursor + offset];
            if gap.contains(SENTENCE_BREAK) || gap.chars().count() > MAX_SPLIT_GAP {
                continue 'start;
            }
            ranges.push(cursor + offset..cursor + offset + piece.len());
            cursor += offset + piece.len();
        }
        return Some(ranges);
    }
    None
}

/// A colloquial or inflected form commonly missing from curated tables.
pub struct ColloquialForm {
    /// Alternatives, longest first.
    pub forms: &'static [&'static str],
    pub name: &'static str,
    /// The textbook pattern this form contracts. `None` means the form is only reported.
    pub canonical: Option<&'static str>,
    pub level: JlptLevel,
}

pub const COLLOQUIAL_FORMS: &[ColloquialForm] = &[
    ColloquialForm {
        forms: &["てる"],
        name: "〜てる (colloquial ている)",
        canonical: Some("〜ている"),
        level: JlptLevel::N5,
    },
    ColloquialForm {
        forms: &["ちゃった", "ちゃう"],
        name: "〜ちゃう (colloquial てしまう)",
        canonical: Some("〜てしまう"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["なくちゃ", "なきゃ"],
        name: "〜なきゃ (colloquial なければ)",
        canonical: Some("〜なければ"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["られる", "れる"],
        name: "〜られる (passive/potential)",
        canonical: Some("〜られる"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["させる", "せる"],
        name: "〜させる (causative)",
        canonical: Some("〜させる"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["たい"],
        name: "〜たい (desire)",
        canonical: Some("〜たい"),
        level: JlptLevel::N5,
    },
    ColloquialForm {
        forms: &["ている", "ていた"],
        name: "〜ている (progressive/state)",
        canonical: Some("〜ている"),
        level: JlptLevel::N5,
    },
    ColloquialForm {
        forms: &["てしまった", "てしまう"],
        name: "〜てしまう (completion/regret)",
        canonical: Some("〜てしまう"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["ようとする"],
        name: "〜ようとする (intention)",
        canonical: Some("〜ようとする"),
        level: JlptLevel::N4,
    },
    ColloquialForm {
        forms: &["ことができる"],
        name: "〜ことができる (ability)",
        canonical: Some("〜ことができる"),
        level: JlptLevel::N5,
    },
];

/// Detects grammar patterns in `text`. Whitespace and punctuation are ignored.
pub fn match_patterns(text: &str, table: &PatternTable) -> GrammarProfile {
    match_patterns_with(text, table, COLLOQUIAL_FORMS)
}

pub fn match_patterns_with(
    text: &str,
    table: &PatternTable,
    colloquial: &[ColloquialForm],
) -> GrammarProfile {
    let mut masked = matching_text(text);

    let mut candidates: Vec<(usize, PatternShape, &GrammarPattern)> = table
        .patterns()
        .iter()
        .map(|pattern| {
            let shape = PatternShape::parse(&pattern.pattern);
            (shape.weight(), shape, pattern)
        })
        .filter(|(weight, _, _)| *weight > 0)
        .collect();
    // stable: equal weights keep table order
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let mut matched_patterns = Vec::new();
    let mut counts_by_level = JlptLevelMap::<usize>::default();

    for (_, shape, pattern) in candidates {
        let matched_text = match shape {
            PatternShape::Literal(forms) => {
                let forms: Vec<String> = forms
                    .into_iter()
                    .filter(|form| form.chars().count() >= MIN_PATTERN_CHARS)
                    .collect();
                let found = forms.iter().find(|form| masked.contains(form.as_str())).cloned();
                let Some(found) = found else {
                    continue;
                };
                for form in &forms {
                    masked = masked.replace(form.as_str(), &mask(form.chars().count()));
                }
                found
            }
            PatternShape::Split(pieces) => {
                let Some(ranges) = find_split(&masked, &pieces) else {
                    continue;
                };
                for range in ranges.into_iter().rev() {
                    let chars = masked[range.clone()].chars().count();
                    masked.replace_range(range, &mask(chars));
                }
                pieces.join("〜")
            }
        };
        *counts_by_level.get_mut(&pattern.level) += 1;
        matched_patterns.push(MatchedPattern {
            pattern: pattern.pattern.clone(),
            level: pattern.level,
            definition: pattern.definition.clone(),
            matched_text,
        });
    }

    let mut unrecognized_patterns = Vec::new();
    for entry in colloquial {
        let Some(form) = entry.forms.iter().find(|form| masked.contains(**form)) else {
            continue;
        };
        let covered = matched_patterns.iter().any(|matched| {
            entry
                .canonical
                .is_some_and(|canonical| matched.pattern.contains(clean_pattern(canonical).as_str()))
        });
        if covered {
            continue;
        }
        match entry.canonical {
            Some(canonical) => {
                masked = masked.replace(form, &mask(form.chars().count()));
                *counts_by_level.get_mut(&entry.level) += 1;
                matched_patterns.push(MatchedPattern {
                    pattern: entry.name.to_string(),
                    level: entry.level,
                    definition: format!("Colloquial form of {canonical}"),
                    matched_text: form.to_string(),
                });
            }
            None => {
                if !unrecognized_patterns.iter().any(|name| name == entry.name) {
                    unrecognized_patterns.push(entry.name.to_string());
                }
            }
        }
    }

    let hardest_pattern = JlptLevel::hardest_first().find_map(|level| {
        matched_patterns
            .iter()
            .find(|matched| matched.level == level)
            .map(|matched| format!("{} ({})", matched.pattern, matched.level))
    });

    GrammarProfile {
        total_matches: matched_patterns.len(),
        counts_by_level,
        matched_patterns,
        hardest_pattern,
        unrecognized_patterns,
    }
}

fn mask(chars: usize) -> String {
    std::iter::repeat_n(MASK, chars).collect()
}
