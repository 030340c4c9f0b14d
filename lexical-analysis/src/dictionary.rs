//! Vocabulary dictionaries and the lookup chain used to grade content words.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use language_utils::{JlptLevel, Language, ProficiencyLabel};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::config::{DictionarySource, GrammarTable, OverlayPrecedence};
use crate::error::DictionaryError;
use crate::grammar::{GrammarPattern, PatternTable};
use crate::overlay::DiscoveredRules;

/// Hand-curated levels that win over every other source. Frequent words that
/// the published lists either miss or place too high.
const CURATED_JAPANESE: &[(&str, JlptLevel)] = &[
    ("本当", JlptLevel::N5),
    ("本当に", JlptLevel::N5),
    ("わかる", JlptLevel::N5),
    ("日本語", JlptLevel::N5),
    ("子ども", JlptLevel::N5),
    ("母", JlptLevel::N5),
];

pub fn curated_level(language: Language, word: &str) -> Option<ProficiencyLabel> {
    match language {
        Language::Japanese => CURATED_JAPANESE
            .iter()
            .find(|(curated, _)| *curated == word)
            .map(|(_, level)| ProficiencyLabel::Jlpt(*level)),
        _ => None,
    }
}

/// Suffixes stripped for a second lookup, e.g. `勉強する` -> `勉強`.
fn stem_suffixes(language: Language) -> &'static [&'static str] {
    match language {
        Language::Japanese => &["する"],
        _ => &[],
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLevel {
    Text(String),
    Number(u8),
}

impl RawLevel {
    fn into_string(self) -> String {
        match self {
            RawLevel::Text(text) => text,
            RawLevel::Number(number) => number.to_string(),
        }
    }
}

/// Word -> level for one language. All labels are on the language's own scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    language: Language,
    entries: FxHashMap<String, ProficiencyLabel>,
    longest_entry: usize,
}

impl Dictionary {
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            entries: FxHashMap::default(),
            longest_entry: 0,
        }
    }

    pub fn from_entries<W: Into<String>>(
        language: Language,
        entries: impl IntoIterator<Item = (W, ProficiencyLabel)>,
    ) -> Self {
        let mut dictionary = Self::empty(language);
        for (word, label) in entries {
            dictionary.insert(word, label);
        }
        dictionary
    }

    /// Reads a JSON object mapping words to level labels. HSK levels may be bare
    /// numbers. Entries whose level is not on the language's scale are skipped.
    pub fn from_json_file(language: Language, path: &Path) -> Result<Self, DictionaryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DictionaryError::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let raw: FxHashMap<String, RawLevel> =
            serde_json::from_str(&contents).map_err(|source| DictionaryError::Parse {
                path: path.to_path_buf(),
                source: Arc::new(source),
            })?;

        let scale = language.proficiency_scale();
        let mut dictionary = Self::empty(language);
        let mut skipped = 0usize;
        for (word, level) in raw {
            let level = level.into_string();
            match scale.parse_label(&level) {
                Some(label) => dictionary.insert(word, label),
                None => {
                    if skipped == 0 {
                        log::warn!(
                            "{}: {}",
                            path.display(),
                            DictionaryError::UnknownLevel { word, level }
                        );
                    }
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            log::warn!("{}: skipped {skipped} entries", path.display());
        }
        log::debug!("loaded {} {language} words from {}", dictionary.len(), path.display());
        Ok(dictionary)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn insert(&mut self, word: impl Into<String>, label: ProficiencyLabel) {
        let word = word.into();
        self.longest_entry = self.longest_entry.max(word.chars().count());
        self.entries.insert(word, label);
    }

    /// Adds `other`'s entries. A word present in both keeps the easier label.
    pub fn merge_easier(&mut self, other: Dictionary) {
        for (word, label) in other.entries {
            match self.entries.get(&word) {
                Some(existing) if existing.difficulty_rank() <= label.difficulty_rank() => {}
                _ => self.insert(word, label),
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<ProficiencyLabel> {
        self.entries.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// Length in characters of the longest entry.
    pub fn longest_entry(&self) -> usize {
        self.longest_entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where dictionaries and grammar tables come from. The [`DictionarySource`] and
/// [`GrammarTable`] selectors pick what to load; the store decides how.
pub trait DictionaryStore: Send + Sync {
    fn load_vocabulary(
        &self,
        language: Language,
        source: DictionarySource,
    ) -> Result<Dictionary, DictionaryError>;

    fn load_grammar(&self, table: GrammarTable) -> Result<PatternTable, DictionaryError>;
}

/// Reads `<dictionary_dir>/<iso639-1>-<stem>.json` and
/// `<grammar_dir>/ja-grammar-<stem>.json`. Missing files contribute nothing.
pub struct FileDictionaryStore {
    dictionary_dir: PathBuf,
    grammar_dir: PathBuf,
}

impl FileDictionaryStore {
    pub fn new(dictionary_dir: impl Into<PathBuf>, grammar_dir: impl Into<PathBuf>) -> Self {
        Self {
            dictionary_dir: dictionary_dir.into(),
            grammar_dir: grammar_dir.into(),
        }
    }
}

fn is_not_found(error: &DictionaryError) -> bool {
    matches!(error, DictionaryError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
}

impl DictionaryStore for FileDictionaryStore {
    fn load_vocabulary(
        &self,
        language: Language,
        source: DictionarySource,
    ) -> Result<Dictionary, DictionaryError> {
        let mut merged = Dictionary::empty(language);
        for stem in source.file_stems() {
            let path = self
                .dictionary_dir
                .join(format!("{}-{stem}.json", language.iso_639_1()));
            match Dictionary::from_json_file(language, &path) {
                Ok(dictionary) => merged.merge_easier(dictionary),
                Err(err) if is_not_found(&err) => {
                    log::warn!("no {language} dictionary at {}", path.display());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(merged)
    }

    fn load_grammar(&self, table: GrammarTable) -> Result<PatternTable, DictionaryError> {
        let mut merged = PatternTable::default();
        for stem in table.file_stems() {
            let path = self.grammar_dir.join(format!("ja-grammar-{stem}.json"));
            match PatternTable::from_json_file(&path) {
                Ok(patterns) => merged.extend(patterns),
                Err(err) if is_not_found(&err) => {
                    log::warn!("no grammar table at {}", path.display());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(merged)
    }
}

/// Dictionaries held in memory, for embedding callers and tests.
#[derive(Default)]
pub struct MemoryDictionaryStore {
    vocabularies: FxHashMap<(Language, DictionarySource), Dictionary>,
    grammar: FxHashMap<GrammarTable, Vec<GrammarPattern>>,
}

impl MemoryDictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vocabulary(mut self, source: DictionarySource, dictionary: Dictionary) -> Self {
        self.vocabularies
            .insert((dictionary.language(), source), dictionary);
        self
    }

    pub fn with_grammar(mut self, table: GrammarTable, patterns: Vec<GrammarPattern>) -> Self {
        self.grammar.insert(table, patterns);
        self
    }
}

impl DictionaryStore for MemoryDictionaryStore {
    fn load_vocabulary(
        &self,
        language: Language,
        source: DictionarySource,
    ) -> Result<Dictionary, DictionaryError> {
        Ok(self
            .vocabularies
            .get(&(language, source))
            .cloned()
            .unwrap_or_else(|| Dictionary::empty(language)))
    }

    fn load_grammar(&self, table: GrammarTable) -> Result<PatternTable, DictionaryError> {
        Ok(PatternTable::new(
            self.grammar.get(&table).cloned().unwrap_or_default(),
        ))
    }
}

/// A loaded dictionary bundled with the overlay snapshot it should be read with.
///
/// Lookups are synchronous and never touch the filesystem.
#[derive(Debug, Clone)]
pub struct Lexicon {
    dictionary: Arc<Dictionary>,
    overlay: Arc<DiscoveredRules>,
    precedence: OverlayPrecedence,
}

impl Lexicon {
    pub fn new(
        dictionary: Arc<Dictionary>,
        overlay: Arc<DiscoveredRules>,
        precedence: OverlayPrecedence,
    ) -> Self {
        Self {
            dictionary,
            overlay,
            precedence,
        }
    }

    pub fn language(&self) -> Language {
        self.dictionary.language()
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn overlay(&self) -> &DiscoveredRules {
        &self.overlay
    }

    fn overlay_level(&self, word: &str) -> Option<ProficiencyLabel> {
        self.overlay
            .vocab_level(word)
            .filter(|label| label.scale() == self.language().proficiency_scale())
    }

    /// Level of a single form through the full chain.
    pub fn lookup(&self, word: &str) -> Option<ProficiencyLabel> {
        self.resolve(word, word)
    }

    /// Curated overrides, then the overlay (when it takes precedence), then the
    /// lemma and surface in the dictionary, then a stem-stripped retry, then the
    /// overlay (when it does not take precedence).
    pub fn resolve(&self, lemma: &str, surface: &str) -> Option<ProficiencyLabel> {
        let language = self.language();
        if let Some(label) = curated_level(language, lemma).or_else(|| curated_level(language, surface)) {
            return Some(label);
        }

        let overlay = || self.overlay_level(lemma).or_else(|| self.overlay_level(surface));
        if self.precedence == OverlayPrecedence::BeforeDictionary
            && let Some(label) = overlay()
        {
            return Some(label);
        }

        let found = self
            .dictionary
            .get(lemma)
            .or_else(|| self.dictionary.get(surface))
            .or_else(|| self.stem_stripped(lemma))
            .or_else(|| self.stem_stripped(surface));
        if found.is_some() {
            return found;
        }

        match self.precedence {
            OverlayPrecedence::AfterDictionary => overlay(),
            OverlayPrecedence::BeforeDictionary => None,
        }
    }

    fn stem_stripped(&self, word: &str) -> Option<ProficiencyLabel> {
        stem_suffixes(self.language()).iter().find_map(|suffix| {
            word.strip_suffix(suffix)
                .filter(|stem| !stem.is_empty())
                .and_then(|stem| self.dictionary.get(stem))
        })
    }

    /// Whether any source knows `word`. Used by the longest-match segmenter.
    pub fn knows(&self, word: &str) -> bool {
        curated_level(self.language(), word).is_some()
            || self.dictionary.contains(word)
            || self.overlay_level(word).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use language_utils::CefrLevel;

    fn jlpt(level: JlptLevel) -> ProficiencyLabel {
        ProficiencyLabel::Jlpt(level)
    }

    fn lexicon(dictionary: Dictionary, overlay: DiscoveredRules, precedence: OverlayPrecedence) -> Lexicon {
        Lexicon::new(Arc::new(dictionary), Arc::new(overlay), precedence)
    }

    #[test]
    fn test_lookup_chain_order() {
        let dictionary = Dictionary::from_entries(
            Language::Japanese,
            [
                ("本当", jlpt(JlptLevel::N3)),
                ("勉強", jlpt(JlptLevel::N4)),
                ("食べる", jlpt(JlptLevel::N5)),
            ],
        );
        let lexicon = lexicon(dictionary, DiscoveredRules::default(), OverlayPrecedence::BeforeDictionary);

        // Curated overrides beat the dictionary
        assert_eq!(lexicon.lookup("本当"), Some(jlpt(JlptLevel::N5)));
        // Lemma is preferred, surface is the fallback
        assert_eq!(lexicon.resolve("食べる", "食べ"), Some(jlpt(JlptLevel::N5)));
        assert_eq!(lexicon.resolve("食べ", "食べる"), Some(jlpt(JlptLevel::N5)));
        // する compounds retry on the noun stem
        assert_eq!(lexicon.lookup("勉強する"), Some(jlpt(JlptLevel::N4)));
        assert_eq!(lexicon.lookup("する"), None);
        assert_eq!(lexicon.lookup("猫"), None);
    }

    #[test]
    fn test_overlay_precedence_is_configurable() {
        let dictionary = Dictionary::from_entries(Language::Japanese, [("推し", jlpt(JlptLevel::N1))]);
        let overlay = DiscoveredRules::from_vocab([
            ("推し", jlpt(JlptLevel::N3)),
            ("ガチ", jlpt(JlptLevel::N2)),
        ]);

        let before = lexicon(dictionary.clone(), overlay.clone(), OverlayPrecedence::BeforeDictionary);
        assert_eq!(before.lookup("推し"), Some(jlpt(JlptLevel::N3)));

        let after = lexicon(dictionary, overlay, OverlayPrecedence::AfterDictionary);
        assert_eq!(after.lookup("推し"), Some(jlpt(JlptLevel::N1)));
        // The overlay still fills gaps when it ranks last
        assert_eq!(after.lookup("ガチ"), Some(jlpt(JlptLevel::N2)));
    }

    #[test]
    fn test_overlay_labels_on_another_scale_are_ignored() {
        let overlay = DiscoveredRules::from_vocab([("cat", jlpt(JlptLevel::N5))]);
        let lexicon = lexicon(Dictionary::empty(Language::English), overlay, OverlayPrecedence::BeforeDictionary);
        assert_eq!(lexicon.lookup("cat"), None);
    }

    #[test]
    fn test_dictionary_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zh-default.json");
        std::fs::write(&path, r#"{"你好": 1, "经济": "HSK4", "坏": "N3"}"#).unwrap();

        let dictionary = Dictionary::from_json_file(Language::Chinese, &path).unwrap();
        assert_eq!(dictionary.get("你好"), Some(ProficiencyLabel::Hsk(1)));
        assert_eq!(dictionary.get("经济"), Some(ProficiencyLabel::Hsk(4)));
        // A JLPT label in a Chinese list is off-scale
        assert_eq!(dictionary.get("坏"), None);
        assert_eq!(dictionary.longest_entry(), 2);
    }

    #[test]
    fn test_file_store_merges_combined_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ja-elzup.json"),
            r#"{"猫": "N4", "経済": "N2"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("ja-tanos.json"), r#"{"猫": "N5", "犬": "N5"}"#).unwrap();

        let store = FileDictionaryStore::new(dir.path(), dir.path());
        let combined = store
            .load_vocabulary(Language::Japanese, DictionarySource::Combined)
            .unwrap();
        // The easier of two listings wins
        assert_eq!(combined.get("猫"), Some(jlpt(JlptLevel::N5)));
        assert_eq!(combined.len(), 3);

        // A missing file is an empty dictionary, not an error
        let english = store
            .load_vocabulary(Language::English, DictionarySource::Default)
            .unwrap();
        assert!(english.is_empty());
    }

    #[test]
    fn test_malformed_dictionary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("en-default.json"), "[not a map").unwrap();
        let store = FileDictionaryStore::new(dir.path(), dir.path());
        let result = store.load_vocabulary(Language::English, DictionarySource::Default);
        assert!(matches!(result, Err(DictionaryError::Parse { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryDictionaryStore::new().with_vocabulary(
            DictionarySource::Default,
            Dictionary::from_entries(Language::English, [("dog", ProficiencyLabel::Cefr(CefrLevel::A1))]),
        );
        let english = store
            .load_vocabulary(Language::English, DictionarySource::Default)
            .unwrap();
        assert!(english.contains("dog"));
        let tanos = store
            .load_vocabulary(Language::Japanese, DictionarySource::Tanos)
            .unwrap();
        assert!(tanos.is_empty());
    }
}
