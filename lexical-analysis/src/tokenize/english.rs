//! Rule-based English tagging: Unicode word segmentation, a closed-class word
//! table, suffix heuristics for open classes, and a lemmatizer that checks its
//! guesses against the vocabulary list.

use std::sync::Arc;

use language_utils::PartOfSpeech;
use unicode_segmentation::UnicodeSegmentation;

use super::{PosTag, RawToken, Segmenter};
use crate::dictionary::Dictionary;
use crate::error::TokenizerError;

const CLOSED_CLASS: &[(&str, PartOfSpeech)] = &[
    ("the", PartOfSpeech::Det),
    ("a", PartOfSpeech::Det),
    ("an", PartOfSpeech::Det),
    ("this", PartOfSpeech::Det),
    ("that", PartOfSpeech::Det),
    ("these", PartOfSpeech::Det),
    ("those", PartOfSpeech::Det),
    ("my", PartOfSpeech::Det),
    ("your", PartOfSpeech::Det),
    ("his", PartOfSpeech::Det),
    ("her", PartOfSpeech::Det),
    ("its", PartOfSpeech::Det),
    ("our", PartOfSpeech::Det),
    ("their", PartOfSpeech::Det),
    ("some", PartOfSpeech::Det),
    ("any", PartOfSpeech::Det),
    ("no", PartOfSpeech::Det),
    ("every", PartOfSpeech::Det),
    ("each", PartOfSpeech::Det),
    ("either", PartOfSpeech::Det),
    ("neither", PartOfSpeech::Det),
    ("i", PartOfSpeech::Pron),
    ("you", PartOfSpeech::Pron),
    ("he", PartOfSpeech::Pron),
    ("she", PartOfSpeech::Pron),
    ("it", PartOfSpeech::Pron),
    ("we", PartOfSpeech::Pron),
    ("they", PartOfSpeech::Pron),
    ("me", PartOfSpeech::Pron),
    ("him", PartOfSpeech::Pron),
    ("us", PartOfSpeech::Pron),
    ("them", PartOfSpeech::Pron),
    ("mine", PartOfSpeech::Pron),
    ("yours", PartOfSpeech::Pron),
    ("hers", PartOfSpeech::Pron),
    ("ours", PartOfSpeech::Pron),
    ("theirs", PartOfSpeech::Pron),
    ("myself", PartOfSpeech::Pron),
    ("yourself", PartOfSpeech::Pron),
    ("himself", PartOfSpeech::Pron),
    ("herself", PartOfSpeech::Pron),
    ("itself", PartOfSpeech::Pron),
    ("ourselves", PartOfSpeech::Pron),
    ("themselves", PartOfSpeech::Pron),
    ("who", PartOfSpeech::Pron),
    ("whom", PartOfSpeech::Pron),
    ("whose", PartOfSpeech::Pron),
    ("which", PartOfSpeech::Pron),
    ("what", PartOfSpeech::Pron),
    ("something", PartOfSpeech::Pron),
    ("anything", PartOfSpeech::Pron),
    ("nothing", PartOfSpeech::Pron),
    ("everything", PartOfSpeech::Pron),
    ("someone", PartOfSpeech::Pron),
    ("anyone", PartOfSpeech::Pron),
    ("everyone", PartOfSpeech::Pron),
    ("in", PartOfSpeech::Adp),
    ("on", PartOfSpeech::Adp),
    ("at", PartOfSpeech::Adp),
    ("by", PartOfSpeech::Adp),
    ("for", PartOfSpeech::Adp),
    ("with", PartOfSpeech::Adp),
    ("about", PartOfSpeech::Adp),
    ("against", PartOfSpeech::Adp),
    ("between", PartOfSpeech::Adp),
    ("into", PartOfSpeech::Adp),
    ("through", PartOfSpeech::Adp),
    ("during", PartOfSpeech::Adp),
    ("before", PartOfSpeech::Adp),
    ("after", PartOfSpeech::Adp),
    ("above", PartOfSpeech::Adp),
    ("below", PartOfSpeech::Adp),
    ("from", PartOfSpeech::Adp),
    ("up", PartOfSpeech::Adp),
    ("down", PartOfSpeech::Adp),
    ("of", PartOfSpeech::Adp),
    ("off", PartOfSpeech::Adp),
    ("over", PartOfSpeech::Adp),
    ("under", PartOfSpeech::Adp),
    ("without", PartOfSpeech::Adp),
    ("within", PartOfSpeech::Adp),
    ("among", PartOfSpeech::Adp),
    ("across", PartOfSpeech::Adp),
    ("to", PartOfSpeech::Part),
    ("not", PartOfSpeech::Part),
    ("and", PartOfSpeech::Cconj),
    ("or", PartOfSpeech::Cconj),
    ("but", PartOfSpeech::Cconj),
    ("nor", PartOfSpeech::Cconj),
    ("so", PartOfSpeech::Cconj),
    ("yet", PartOfSpeech::Cconj),
    ("because", PartOfSpeech::Sconj),
    ("although", PartOfSpeech::Sconj),
    ("though", PartOfSpeech::Sconj),
    ("while", PartOfSpeech::Sconj),
    ("if", PartOfSpeech::Sconj),
    ("unless", PartOfSpeech::Sconj),
    ("until", PartOfSpeech::Sconj),
    ("whereas", PartOfSpeech::Sconj),
    ("than", PartOfSpeech::Sconj),
    ("be", PartOfSpeech::Aux),
    ("am", PartOfSpeech::Aux),
    ("is", PartOfSpeech::Aux),
    ("are", PartOfSpeech::Aux),
    ("was", PartOfSpeech::Aux),
    ("were", PartOfSpeech::Aux),
    ("been", PartOfSpeech::Aux),
    ("being", PartOfSpeech::Aux),
    ("have", PartOfSpeech::Aux),
    ("has", PartOfSpeech::Aux),
    ("had", PartOfSpeech::Aux),
    ("do", PartOfSpeech::Aux),
    ("does", PartOfSpeech::Aux),
    ("did", PartOfSpeech::Aux),
    ("will", PartOfSpeech::Aux),
    ("would", PartOfSpeech::Aux),
    ("shall", PartOfSpeech::Aux),
    ("should", PartOfSpeech::Aux),
    ("can", PartOfSpeech::Aux),
    ("cannot", PartOfSpeech::Aux),
    ("could", PartOfSpeech::Aux),
    ("may", PartOfSpeech::Aux),
    ("might", PartOfSpeech::Aux),
    ("must", PartOfSpeech::Aux),
    ("oh", PartOfSpeech::Intj),
    ("hey", PartOfSpeech::Intj),
    ("wow", PartOfSpeech::Intj),
    ("yes", PartOfSpeech::Intj),
    ("yeah", PartOfSpeech::Intj),
    ("okay", PartOfSpeech::Intj),
    ("ok", PartOfSpeech::Intj),
    ("please", PartOfSpeech::Intj),
];

const IRREGULAR_VERBS: &[(&str, &str)] = &[
    ("went", "go"),
    ("gone", "go"),
    ("saw", "see"),
    ("seen", "see"),
    ("took", "take"),
    ("taken", "take"),
    ("made", "make"),
    ("came", "come"),
    ("got", "get"),
    ("gotten", "get"),
    ("gave", "give"),
    ("given", "give"),
    ("knew", "know"),
    ("known", "know"),
    ("thought", "think"),
    ("told", "tell"),
    ("said", "say"),
    ("found", "find"),
    ("felt", "feel"),
    ("left", "leave"),
    ("kept", "keep"),
    ("began", "begin"),
    ("begun", "begin"),
    ("brought", "bring"),
    ("bought", "buy"),
    ("ran", "run"),
    ("wrote", "write"),
    ("written", "write"),
    ("ate", "eat"),
    ("eaten", "eat"),
];

const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
];

const IRREGULAR_ADJECTIVES: &[(&str, &str)] = &[
    ("better", "good"),
    ("best", "good"),
    ("worse", "bad"),
    ("worst", "bad"),
];

fn irregular(table: &[(&'static str, &'static str)], word: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(form, _)| *form == word)
        .map(|(_, lemma)| *lemma)
}

// (suffix, replacement), tried in order after the surface form itself
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("ied", "y"),
    ("ier", "y"),
    ("iest", "y"),
    ("ily", "y"),
    ("ves", "f"),
    ("ves", "fe"),
    ("es", ""),
    ("s", ""),
    ("ing", ""),
    ("ing", "e"),
    ("ed", ""),
    ("ed", "e"),
    ("est", ""),
    ("er", ""),
    ("er", "e"),
    ("ly", ""),
];

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "ous", "ful", "ive", "able", "ible", "al", "ic", "less", "ish",
];

pub fn closed_class(word: &str) -> Option<PartOfSpeech> {
    CLOSED_CLASS
        .iter()
        .find(|(closed, _)| *closed == word)
        .map(|(_, pos)| *pos)
}

/// Lemma guesses for a lowercased word, most specific first. The word itself is
/// not included.
pub fn lemma_candidates(word: &str) -> Vec<String> {
    let mut candidates: Vec<String> = [IRREGULAR_VERBS, IRREGULAR_NOUNS, IRREGULAR_ADJECTIVES]
        .into_iter()
        .filter_map(|table| irregular(table, word))
        .map(str::to_string)
        .collect();
    for (suffix, replacement) in SUFFIX_RULES {
        let Some(stem) = word.strip_suffix(suffix) else {
            continue;
        };
        if stem.chars().count() < 2 || (*suffix == "s" && stem.ends_with('s')) {
            continue;
        }
        candidates.push(format!("{stem}{replacement}"));
        // running -> run, stopped -> stop
        if replacement.is_empty() && matches!(*suffix, "ing" | "ed" | "er" | "est") {
            let mut chars = stem.chars().rev();
            if let (Some(last), Some(before)) = (chars.next(), chars.next())
                && last == before
                && !"aeiou".contains(last)
            {
                candidates.push(stem[..stem.len() - last.len_utf8()].to_string());
            }
        }
    }
    candidates
}

fn guess_open_class(word: &str) -> PartOfSpeech {
    if irregular(IRREGULAR_VERBS, word).is_some() {
        PartOfSpeech::Verb
    } else if irregular(IRREGULAR_NOUNS, word).is_some() {
        PartOfSpeech::Noun
    } else if irregular(IRREGULAR_ADJECTIVES, word).is_some() {
        PartOfSpeech::Adj
    } else if word.ends_with("ly") {
        PartOfSpeech::Adv
    } else if word.ends_with("ing") || word.ends_with("ed") {
        PartOfSpeech::Verb
    } else if ADJECTIVE_SUFFIXES.iter().any(|suffix| word.ends_with(suffix)) {
        PartOfSpeech::Adj
    } else {
        PartOfSpeech::Noun
    }
}

fn is_number(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit())
        && word.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.')
}

pub struct EnglishTagger {
    dictionary: Arc<Dictionary>,
}

impl EnglishTagger {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    /// First of the word itself and its candidates that the dictionary lists,
    /// else the word.
    pub fn lemmatize(&self, word: &str) -> String {
        if self.dictionary.contains(word) {
            return word.to_string();
        }
        lemma_candidates(word)
            .into_iter()
            .find(|candidate| self.dictionary.contains(candidate))
            .unwrap_or_else(|| word.to_string())
    }
}

impl Segmenter for EnglishTagger {
    fn name(&self) -> &'static str {
        "english-rules"
    }

    fn segment(&self, text: &str) -> Result<Vec<RawToken>, TokenizerError> {
        let mut tokens = Vec::new();
        let mut sentence_start = true;

        for piece in text.split_word_bounds() {
            if !piece.chars().any(char::is_alphanumeric) {
                if piece.contains(['.', '!', '?']) {
                    sentence_start = true;
                }
                continue;
            }

            let lower = piece.to_lowercase();
            let capitalized = piece.starts_with(char::is_uppercase);
            let (lemma, pos) = if let Some(pos) = closed_class(&lower) {
                (lower, pos)
            } else if is_number(&lower) {
                (lower, PartOfSpeech::Num)
            } else {
                let lemma = self.lemmatize(&lower);
                let pos = if capitalized && !sentence_start && !self.dictionary.contains(&lemma) {
                    PartOfSpeech::Propn
                } else {
                    guess_open_class(&lower)
                };
                (lemma, pos)
            };

            tokens.push(RawToken {
                surface: piece.to_string(),
                lemma: Some(lemma),
                tag: PosTag::Universal(pos),
            });
            sentence_start = false;
        }

        Ok(tokens)
    }
}
