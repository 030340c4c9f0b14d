//! Turns raw segmenter output into classified [`Token`]s: content or function,
//! proper noun or not, and a proficiency level when one is known.

use language_utils::script::{has_kanji, has_katakana, is_hiragana_only};
use language_utils::{JlptLevel, Language, PartOfSpeech, ProficiencyLabel, Token};

use crate::dictionary::Lexicon;
use crate::grammar::PatternTable;
use crate::tokenize::{PosTag, RawToken};

/// Inflectional endings, auxiliaries and interjections that segmenters emit as
/// standalone tokens. They are function words regardless of their tag.
const GRAMMAR_FRAGMENTS: &[(&str, Option<JlptLevel>)] = &[
    ("た", Some(JlptLevel::N5)),
    ("だ", Some(JlptLevel::N5)),
    ("です", Some(JlptLevel::N5)),
    ("ます", Some(JlptLevel::N5)),
    ("ない", Some(JlptLevel::N5)),
    ("なかった", Some(JlptLevel::N5)),
    ("て", Some(JlptLevel::N5)),
    ("で", Some(JlptLevel::N5)),
    ("なく", Some(JlptLevel::N5)),
    ("なかっ", Some(JlptLevel::N5)),
    ("けど", Some(JlptLevel::N5)),
    ("いる", Some(JlptLevel::N5)),
    ("てる", Some(JlptLevel::N5)),
    ("たい", Some(JlptLevel::N4)),
    ("ません", Some(JlptLevel::N4)),
    ("そう", Some(JlptLevel::N4)),
    ("ちゃう", Some(JlptLevel::N4)),
    ("ちゃっ", Some(JlptLevel::N4)),
    ("ござい", Some(JlptLevel::N4)),
    ("みたい", Some(JlptLevel::N4)),
    ("とか", Some(JlptLevel::N4)),
    ("みる", Some(JlptLevel::N4)),
    ("みよ", Some(JlptLevel::N4)),
    ("ほしい", Some(JlptLevel::N4)),
    ("もらえる", Some(JlptLevel::N4)),
    ("れる", Some(JlptLevel::N4)),
    ("たち", Some(JlptLevel::N4)),
    ("よう", Some(JlptLevel::N3)),
    ("らしい", Some(JlptLevel::N3)),
    ("かも", Some(JlptLevel::N3)),
    ("おき", Some(JlptLevel::N3)),
    ("くらい", Some(JlptLevel::N3)),
    ("ため", Some(JlptLevel::N3)),
    ("いたし", Some(JlptLevel::N3)),
    ("なんて", Some(JlptLevel::N3)),
    ("もの", Some(JlptLevel::N3)),
    ("って", None),
    ("ちゃ", None),
    ("じゃ", None),
    ("かな", None),
    ("だろう", None),
    ("でしょう", None),
    ("な", None),
    ("に", None),
    ("でる", None),
    ("すぎ", None),
    ("ごめん", None),
    ("ねえ", None),
    ("えっ", None),
    ("うーん", None),
    ("ううん", None),
    ("おお", None),
    ("いや", None),
    ("お疲れ様", None),
    ("おかえりなさい", None),
    ("ようこそ", None),
    ("よいしょ", None),
    ("いらっしゃい", None),
    ("らっしゃい", None),
    ("じゃん", None),
    ("なぁ", None),
    ("のう", None),
    ("えと", None),
    ("次に", None),
    ("ただし", None),
    ("いけ", None),
];

fn grammar_fragment(surface: &str) -> Option<Option<JlptLevel>> {
    GRAMMAR_FRAGMENTS
        .iter()
        .find(|(fragment, _)| *fragment == surface)
        .map(|(_, level)| *level)
}

const FUNCTION_POS: &[&str] = &["助詞", "助動詞", "接続詞", "感動詞", "フィラー", "記号"];
const CONTENT_POS: &[&str] = &["名詞", "動詞", "形容詞", "形容動詞", "副詞", "連体詞"];
const DEPENDENT_MINOR: &[&str] = &["非自立", "接尾"];
const PROPER_NOUN_MINOR: &[&str] = &["固有名詞", "人名", "地名"];

const HONORIFIC_SUFFIXES: &[&str] = &["さん", "ちゃん", "くん", "君", "様", "先生", "氏"];

const NUMERAL_CHARS: &str = "0123456789０１２３４５６７８９〇一二三四五六七八九十百千万億兆";
const COUNTER_SUFFIXES: &str = "%％時分秒日月年円個人回本枚台件番号目";

/// A name followed by an honorific (`田中さん`). The bare honorific is not a name.
pub fn has_honorific_suffix(surface: &str) -> bool {
    HONORIFIC_SUFFIXES.iter().any(|suffix| {
        surface.ends_with(suffix) && surface.chars().count() > suffix.chars().count()
    })
}

/// Numbers with an optional `第` prefix and a single counter or unit suffix:
/// `3`, `二十`, `第三`, `5時`, `100%`.
pub fn is_japanese_numeric(surface: &str) -> bool {
    let rest = surface.strip_prefix('第').unwrap_or(surface);
    let rest = match rest.chars().last() {
        Some(last) if COUNTER_SUFFIXES.contains(last) => &rest[..rest.len() - last.len_utf8()],
        _ => rest,
    };
    !rest.is_empty() && rest.chars().all(|c| NUMERAL_CHARS.contains(c))
}

fn is_plain_number(surface: &str) -> bool {
    surface.chars().any(|c| c.is_ascii_digit())
        && surface
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.')
}

fn ipadic_pos(major: &str) -> PartOfSpeech {
    match major {
        "名詞" => PartOfSpeech::Noun,
        "動詞" => PartOfSpeech::Verb,
        "形容詞" | "形容動詞" | "連体詞" => PartOfSpeech::Adj,
        "副詞" => PartOfSpeech::Adv,
        "助詞" => PartOfSpeech::Adp,
        "助動詞" => PartOfSpeech::Aux,
        "接続詞" => PartOfSpeech::Cconj,
        "感動詞" | "フィラー" => PartOfSpeech::Intj,
        "記号" => PartOfSpeech::Punct,
        "接頭詞" => PartOfSpeech::Part,
        _ => PartOfSpeech::X,
    }
}

/// Grades raw tokens. Borrowed for the duration of one analysis.
pub struct Classifier<'a> {
    pub lexicon: &'a Lexicon,
    /// Pattern table used to grade function words. Empty for languages without one.
    pub grammar: &'a PatternTable,
}

impl Classifier<'_> {
    fn language(&self) -> Language {
        self.lexicon.language()
    }

    pub fn classify_all(&self, raw: Vec<RawToken>) -> Vec<Token> {
        raw.into_iter()
            .filter_map(|token| self.classify(token))
            .collect()
    }

    /// `None` for punctuation and whitespace.
    pub fn classify(&self, raw: RawToken) -> Option<Token> {
        if !raw.surface.chars().any(char::is_alphanumeric) {
            return None;
        }
        match self.language() {
            Language::Japanese => self.classify_japanese(raw),
            _ => self.classify_generic(raw),
        }
    }

    fn content(&self, raw: &RawToken, pos: PartOfSpeech) -> Token {
        let lemma = raw.lemma_or_surface();
        let label = self.lexicon.resolve(lemma, &raw.surface);
        Token::content(&raw.surface, lemma, pos, label)
    }

    fn numeral(&self, raw: &RawToken) -> Token {
        let label = self.language().proficiency_scale().easiest_label();
        Token::content(&raw.surface, raw.lemma_or_surface(), PartOfSpeech::Num, Some(label))
    }

    /// Grammar table, then the fragment list, then overlay grammar, then the
    /// vocabulary list.
    pub fn function_word_level(&self, surface: &str, lemma: &str) -> Option<ProficiencyLabel> {
        let level = self
            .grammar
            .level_of(surface)
            .or_else(|| grammar_fragment(surface).flatten())
            .or_else(|| self.lexicon.overlay().grammar_level(surface));
        match level {
            Some(level) => Some(ProficiencyLabel::Jlpt(level)),
            None => self
                .lexicon
                .dictionary()
                .get(surface)
                .or_else(|| self.lexicon.dictionary().get(lemma)),
        }
    }

    fn function(&self, raw: &RawToken, pos: PartOfSpeech) -> Token {
        let lemma = raw.lemma_or_surface();
        let level = self.function_word_level(&raw.surface, lemma);
        Token::function(&raw.surface, lemma, pos, level)
    }

    fn classify_japanese(&self, raw: RawToken) -> Option<Token> {
        let tag = match &raw.tag {
            PosTag::Ipadic { major, minor } => Some(format!("{major},{minor}")),
            _ => None,
        };
        let with_tag = |token: Token| match &tag {
            Some(tag) => token.with_tag(tag.clone()),
            None => token,
        };

        if grammar_fragment(&raw.surface).is_some() {
            let pos = raw.ipadic_major().map_or(PartOfSpeech::Aux, ipadic_pos);
            return Some(with_tag(self.function(&raw, pos)));
        }
        if is_japanese_numeric(&raw.surface) {
            return Some(with_tag(self.numeral(&raw)));
        }

        let token = match &raw.tag {
            PosTag::Ipadic { major, minor } => {
                let major = major.as_str();
                let minor = minor.as_str();
                if FUNCTION_POS.contains(&major) {
                    if major == "記号" {
                        return None;
                    }
                    self.function(&raw, ipadic_pos(major))
                } else if CONTENT_POS.contains(&major) && !DEPENDENT_MINOR.contains(&minor) {
                    if PROPER_NOUN_MINOR.contains(&minor) || has_honorific_suffix(&raw.surface) {
                        Token::proper_noun(&raw.surface, raw.lemma_or_surface())
                    } else {
                        self.content(&raw, ipadic_pos(major))
                    }
                } else {
                    self.function(&raw, ipadic_pos(major))
                }
            }
            PosTag::Universal(pos) => self.classify_universal(&raw, *pos)?,
            PosTag::DictionaryMatch => {
                if has_honorific_suffix(&raw.surface) {
                    Token::proper_noun(&raw.surface, &raw.surface)
                } else {
                    self.content(&raw, PartOfSpeech::Noun)
                }
            }
            PosTag::Untagged => {
                let surface = raw.surface.as_str();
                if has_honorific_suffix(surface) {
                    Token::proper_noun(surface, surface)
                } else if has_kanji(surface)
                    || has_katakana(surface)
                    || (is_hiragana_only(surface) && surface.chars().count() >= 3)
                {
                    self.content(&raw, PartOfSpeech::X)
                } else {
                    self.function(&raw, PartOfSpeech::X)
                }
            }
        };
        Some(with_tag(token))
    }

    fn classify_universal(&self, raw: &RawToken, pos: PartOfSpeech) -> Option<Token> {
        Some(match pos {
            PartOfSpeech::Punct | PartOfSpeech::Space | PartOfSpeech::Sym => return None,
            PartOfSpeech::Propn => Token::proper_noun(&raw.surface, raw.lemma_or_surface()),
            PartOfSpeech::Num => self.numeral(raw),
            pos if pos.is_content_class() => self.content(raw, pos),
            pos => Token::function(&raw.surface, raw.lemma_or_surface(), pos, None),
        })
    }

    fn classify_generic(&self, raw: RawToken) -> Option<Token> {
        match raw.tag {
            PosTag::Universal(pos) => self.classify_universal(&raw, pos),
            _ if is_plain_number(&raw.surface) => Some(self.numeral(&raw)),
            // unspaced segmenters without tags: every word carries vocabulary
            _ => Some(self.content(&raw, PartOfSpeech::X)),
        }
    }
}
