use serde::{Deserialize, Serialize};

use crate::{Band, BroadBand, PartOfSpeech, ProficiencyLabel};

/// One classified token.
///
/// A token is exactly one of the [`TokenClass`] variants; the constructors below
/// are the only way the engine builds tokens, and they keep the fields consistent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Token {
    pub surface: String,
    pub lemma: String,
    pub part_of_speech: PartOfSpeech,
    /// Backend-specific tag detail such as `名詞,サ変接続`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency_label: Option<ProficiencyLabel>,
    pub broad_band: BroadBand,
    pub is_content_word: bool,
    #[serde(default)]
    pub is_proper_noun: bool,
    /// Level of a function word when it is a known grammar element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_level: Option<ProficiencyLabel>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenClass {
    Known(Band),
    Unknown,
    ProperNoun,
    Function,
}

impl Token {
    pub fn content(
        surface: impl Into<String>,
        lemma: impl Into<String>,
        part_of_speech: PartOfSpeech,
        label: Option<ProficiencyLabel>,
    ) -> Self {
        Self {
            surface: surface.into(),
            lemma: lemma.into(),
            part_of_speech,
            tag: None,
            broad_band: label.map(|label| label.band()).into(),
            proficiency_label: label,
            is_content_word: true,
            is_proper_noun: false,
            grammar_level: None,
        }
    }

    pub fn proper_noun(surface: impl Into<String>, lemma: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            lemma: lemma.into(),
            part_of_speech: PartOfSpeech::Propn,
            tag: None,
            proficiency_label: None,
            broad_band: BroadBand::Unknown,
            is_content_word: true,
            is_proper_noun: true,
            grammar_level: None,
        }
    }

    pub fn function(
        surface: impl Into<String>,
        lemma: impl Into<String>,
        part_of_speech: PartOfSpeech,
        grammar_level: Option<ProficiencyLabel>,
    ) -> Self {
        Self {
            surface: surface.into(),
            lemma: lemma.into(),
            part_of_speech,
            tag: None,
            proficiency_label: None,
            broad_band: BroadBand::Unknown,
            is_content_word: false,
            is_proper_noun: false,
            grammar_level,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn class(&self) -> TokenClass {
        if !self.is_content_word {
            TokenClass::Function
        } else if self.is_proper_noun {
            TokenClass::ProperNoun
        } else {
            match self.broad_band.known() {
                Some(band) => TokenClass::Known(band),
                None => TokenClass::Unknown,
            }
        }
    }
}
