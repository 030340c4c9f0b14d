pub mod ability;
pub mod proficiency;
pub mod profile;
pub mod script;
pub mod text_cleanup;
pub mod token;

pub use ability::{
    BayesianProfile, ExploreConfig, ItemMetadata, NewWord, PracticeSession, PracticeStatus,
    QuizResult, SelfReport, SentenceRecord, TargetBand, UserAbilityState,
};
pub use proficiency::{
    Band, BandMap, BroadBand, BroadBandMap, CefrLevel, JlptLevel, JlptLevelMap, ProficiencyLabel,
    ProficiencyScale,
};
pub use profile::{DifficultySummary, GrammarProfile, LexicalProfile, MatchedPattern};
pub use token::{Token, TokenClass};

#[derive(
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Copy,
    schemars::JsonSchema,
)]
pub enum PartOfSpeech {
    #[serde(rename = "ADJ")]
    Adj, // adjective
    #[serde(rename = "ADP")]
    Adp, // adposition
    #[serde(rename = "ADV")]
    Adv, // adverb
    #[serde(rename = "AUX")]
    Aux, // auxiliary
    #[serde(rename = "CCONJ")]
    Cconj, // coordinating conjunction
    #[serde(rename = "DET")]
    Det, // determiner
    #[serde(rename = "INTJ")]
    Intj, // interjection
    #[serde(rename = "NOUN")]
    Noun, // noun
    #[serde(rename = "NUM")]
    Num, // numeral
    #[serde(rename = "PART")]
    Part, // particle
    #[serde(rename = "PRON")]
    Pron, // pronoun
    #[serde(rename = "PROPN")]
    Propn, // proper noun
    #[serde(rename = "PUNCT")]
    Punct, // punctuation
    #[serde(rename = "SCONJ")]
    Sconj, // subordinating conjunction
    #[serde(rename = "SYM")]
    Sym, // symbol
    #[serde(rename = "VERB")]
    Verb, // verb
    #[serde(rename = "SPACE")]
    Space, // space
    #[serde(rename = "X")]
    X, // other
}

impl PartOfSpeech {
    /// Noun/verb/adjective/adverb classes. These carry vocabulary difficulty when the
    /// token is an independent form.
    pub fn is_content_class(&self) -> bool {
        matches!(
            self,
            PartOfSpeech::Noun
                | PartOfSpeech::Propn
                | PartOfSpeech::Verb
                | PartOfSpeech::Adj
                | PartOfSpeech::Adv
                | PartOfSpeech::Num
        )
    }
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let word = match self {
            PartOfSpeech::Adj => "adjective",
            PartOfSpeech::Adp => "adposition",
            PartOfSpeech::Adv => "adverb",
            PartOfSpeech::Aux => "auxiliary",
            PartOfSpeech::Cconj => "coordinating conjunction",
            PartOfSpeech::Det => "determiner",
            PartOfSpeech::Intj => "interjection",
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Num => "numeral",
            PartOfSpeech::Part => "particle",
            PartOfSpeech::Pron => "pronoun",
            PartOfSpeech::Propn => "proper noun",
            PartOfSpeech::Punct => "punctuation",
            PartOfSpeech::Sconj => "subordinating conjunction",
            PartOfSpeech::Sym => "symbol",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Space => "space",
            PartOfSpeech::X => "other",
        };
        write!(f, "{word}")
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    Ord,
    PartialOrd,
    schemars::JsonSchema,
)]
pub enum Language {
    French,
    English,
    Spanish,
    Korean,
    German,
    Chinese,
    Japanese,
    Russian,
    Portuguese,
    Italian,
}

#[derive(
    Copy,
    Clone,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    PartialEq,
    Eq,
    schemars::JsonSchema,
)]
pub enum WritingSystem {
    /// Latin alphabet (Romance languages, Germanic languages, etc.)
    Latin,
    /// Korean Hangul script
    Hangul,
    /// Cyrillic alphabet (Russian, etc.)
    Cyrillic,
    /// Chinese Han characters (simplified and traditional)
    Han,
    /// Japanese writing system (combines Kanji, Hiragana, and Katakana)
    Japanese,
}

impl WritingSystem {
    /// Scripts written without spaces between words.
    pub fn is_unspaced(&self) -> bool {
        matches!(self, WritingSystem::Han | WritingSystem::Japanese)
    }
}

impl Language {
    pub const ALL: [Language; 10] = [
        Language::French,
        Language::English,
        Language::Spanish,
        Language::Korean,
        Language::German,
        Language::Chinese,
        Language::Japanese,
        Language::Russian,
        Language::Portuguese,
        Language::Italian,
    ];

    pub fn iso_639_3(&self) -> &'static str {
        match self {
            Language::French => "fra",
            Language::English => "eng",
            Language::Spanish => "spa",
            Language::Korean => "kor",
            Language::German => "deu",
            Language::Chinese => "zho",
            Language::Japanese => "jpn",
            Language::Russian => "rus",
            Language::Portuguese => "por",
            Language::Italian => "ita",
        }
    }

    pub fn iso_639_1(&self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::English => "en",
            Language::Spanish => "es",
            Language::Korean => "ko",
            Language::German => "de",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
            Language::Russian => "ru",
            Language::Portuguese => "pt",
            Language::Italian => "it",
        }
    }

    /// Accepts ISO 639-1 or 639-3 codes, case-insensitively.
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.iso_639_1() == code || language.iso_639_3() == code)
    }

    pub fn writing_system(&self) -> WritingSystem {
        match self {
            Language::French
            | Language::English
            | Language::Spanish
            | Language::German
            | Language::Portuguese
            | Language::Italian => WritingSystem::Latin,
            Language::Korean => WritingSystem::Hangul,
            Language::Russian => WritingSystem::Cyrillic,
            Language::Chinese => WritingSystem::Han,
            Language::Japanese => WritingSystem::Japanese,
        }
    }

    pub fn proficiency_scale(&self) -> ProficiencyScale {
        match self {
            Language::Japanese => ProficiencyScale::Jlpt,
            Language::Chinese => ProficiencyScale::Hsk,
            _ => ProficiencyScale::Cefr,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::French => write!(f, "French"),
            Language::English => write!(f, "English"),
            Language::Spanish => write!(f, "Spanish"),
            Language::Korean => write!(f, "Korean"),
            Language::German => write!(f, "German"),
            Language::Chinese => write!(f, "Chinese"),
            Language::Japanese => write!(f, "Japanese"),
            Language::Russian => write!(f, "Russian"),
            Language::Portuguese => write!(f, "Portuguese"),
            Language::Italian => write!(f, "Italian"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("ja"), Some(Language::Japanese));
        assert_eq!(Language::from_code("ZHO"), Some(Language::Chinese));
        assert_eq!(Language::from_code(" en "), Some(Language::English));
        assert_eq!(Language::from_code("xx"), None);
    }

    #[test]
    fn test_scales() {
        assert_eq!(Language::Japanese.proficiency_scale(), ProficiencyScale::Jlpt);
        assert_eq!(Language::Chinese.proficiency_scale(), ProficiencyScale::Hsk);
        // Everything else is graded on CEFR
        assert_eq!(Language::French.proficiency_scale(), ProficiencyScale::Cefr);
    }

    #[test]
    fn test_part_of_speech_serializes_as_ud_tag() {
        let json = serde_json::to_string(&PartOfSpeech::Propn).unwrap();
        assert_eq!(json, "\"PROPN\"");
        assert!(PartOfSpeech::Verb.is_content_class());
        assert!(!PartOfSpeech::Adp.is_content_class());
    }
}
