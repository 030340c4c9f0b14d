//! Engine configuration and the selector enums callers pass per request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use language_utils::Language;
use serde::{Deserialize, Serialize};

/// Which segmenter to run.
///
/// | value           | Japanese                   | Chinese                  | other spaced languages |
/// |-----------------|----------------------------|--------------------------|------------------------|
/// | `morphological` | lindera (IPADIC details)   | lindera (CC-CEDICT)      | Unicode word splitter  |
/// | `segmenter`     | script-run segmenter       | dictionary longest match | Unicode word splitter  |
/// | `longest_match` | dictionary longest match   | dictionary longest match | Unicode word splitter  |
///
/// English ignores the choice and always runs the rule-based tagger.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenizerBackend {
    #[default]
    Morphological,
    Segmenter,
    LongestMatch,
}

/// Which vocabulary list to grade words against.
///
/// `elzup` and `tanos` are Japanese JLPT lists; `combined` merges both. Every
/// language has a `default` list.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DictionarySource {
    #[default]
    Default,
    Elzup,
    Tanos,
    Combined,
}

impl DictionarySource {
    /// File stems making up this source, in merge order.
    pub fn file_stems(&self) -> &'static [&'static str] {
        match self {
            DictionarySource::Default => &["default"],
            DictionarySource::Elzup => &["elzup"],
            DictionarySource::Tanos => &["tanos"],
            DictionarySource::Combined => &["elzup", "tanos"],
        }
    }
}

/// Which Japanese grammar pattern table to match against.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrammarTable {
    Yapan,
    Hagoromo,
    #[default]
    Combined,
}

impl GrammarTable {
    pub fn file_stems(&self) -> &'static [&'static str] {
        match self {
            GrammarTable::Yapan => &["yapan"],
            GrammarTable::Hagoromo => &["hagoromo"],
            GrammarTable::Combined => &["yapan", "hagoromo"],
        }
    }
}

/// Whether discovered vocabulary wins over the static dictionaries.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OverlayPrecedence {
    #[default]
    BeforeDictionary,
    AfterDictionary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct OverlayConfig {
    /// JSON object `{word: {"level": "N3"}}`. A missing file is an empty overlay.
    pub vocab_path: Option<PathBuf>,
    /// JSON object `{pattern: {"level": "N3", "definition": "..."}}`.
    pub grammar_path: Option<PathBuf>,
    pub ttl_ms: u64,
    pub precedence: OverlayPrecedence,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            vocab_path: None,
            grammar_path: None,
            ttl_ms: 5000,
            precedence: OverlayPrecedence::default(),
        }
    }
}

impl OverlayConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct MorphologicalDictionaries {
    /// lindera dictionary URI, e.g. a path to a compiled IPADIC directory.
    pub japanese: Option<String>,
    pub chinese: Option<String>,
}

impl MorphologicalDictionaries {
    pub fn for_language(&self, language: Language) -> Option<&str> {
        match language {
            Language::Japanese => self.japanese.as_deref(),
            Language::Chinese => self.chinese.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    /// Holds `<iso639-1>-<source>.json` files mapping words to level labels.
    pub dictionary_dir: PathBuf,
    /// Holds `ja-grammar-<table>.json` files.
    pub grammar_dir: PathBuf,
    pub overlay: OverlayConfig,
    pub japanese_backend: TokenizerBackend,
    pub chinese_backend: TokenizerBackend,
    pub morphological_dictionary: MorphologicalDictionaries,
    pub japanese_dictionary: DictionarySource,
    pub grammar_table: GrammarTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dictionary_dir: PathBuf::from("data/dictionaries"),
            grammar_dir: PathBuf::from("data/grammar"),
            overlay: OverlayConfig::default(),
            japanese_backend: TokenizerBackend::Morphological,
            chinese_backend: TokenizerBackend::Morphological,
            morphological_dictionary: MorphologicalDictionaries::default(),
            japanese_dictionary: DictionarySource::Combined,
            grammar_table: GrammarTable::Combined,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_backend(&self, language: Language) -> TokenizerBackend {
        match language {
            Language::Japanese => self.japanese_backend,
            Language::Chinese => self.chinese_backend,
            _ => TokenizerBackend::Morphological,
        }
    }

    pub fn default_dictionary(&self, language: Language) -> DictionarySource {
        match language {
            Language::Japanese => self.japanese_dictionary,
            _ => DictionarySource::Default,
        }
    }
}

/// Per-request selector overrides. `None` falls back to the [`EngineConfig`] default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AnalysisOptions {
    #[serde(default)]
    pub backend: Option<TokenizerBackend>,
    #[serde(default)]
    pub dictionary: Option<DictionarySource>,
    #[serde(default)]
    pub grammar_table: Option<GrammarTable>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"dictionary_dir": "/dicts", "overlay": {"precedence": "after_dictionary"}}"#,
        )
        .unwrap();
        assert_eq!(config.dictionary_dir, PathBuf::from("/dicts"));
        // Unspecified overlay fields keep their defaults
        assert_eq!(config.overlay.ttl_ms, 5000);
        assert_eq!(config.overlay.precedence, OverlayPrecedence::AfterDictionary);
        assert_eq!(config.grammar_table, GrammarTable::Combined);
    }

    #[test]
    fn test_selectors_parse_snake_case() {
        assert_eq!(
            "longest_match".parse::<TokenizerBackend>().unwrap(),
            TokenizerBackend::LongestMatch
        );
        assert_eq!("tanos".parse::<DictionarySource>().unwrap(), DictionarySource::Tanos);
        assert_eq!(GrammarTable::Hagoromo.to_string(), "hagoromo");
        assert!("spacy".parse::<TokenizerBackend>().is_err());
    }

    #[test]
    fn test_only_japanese_uses_configured_dictionary() {
        let config = EngineConfig::default();
        assert_eq!(config.default_dictionary(Language::Japanese), DictionarySource::Combined);
        assert_eq!(config.default_dictionary(Language::English), DictionarySource::Default);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"japanese_backend": "segmenter"}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.japanese_backend, TokenizerBackend::Segmenter);

        let missing = EngineConfig::from_json_file(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
