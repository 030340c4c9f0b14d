use std::convert::Infallible;
use std::sync::Arc;

use chokepoint::ChokePoint;
use language_utils::text_cleanup::preprocess_for_analysis;
use language_utils::{Language, LexicalProfile, ProficiencyLabel, Token};

use crate::aggregate::{aggregate, difficulty_summary};
use crate::classify::Classifier;
use crate::config::{AnalysisOptions, DictionarySource, EngineConfig, GrammarTable, TokenizerBackend};
use crate::dictionary::{Dictionary, DictionaryStore, FileDictionaryStore, Lexicon};
use crate::error::OverlayError;
use crate::grammar::{PatternTable, match_patterns};
use crate::overlay::{DiscoveredRules, FileOverlayStore, Overlay, OverlayStore};
use crate::tokenize::{
    EnglishTagger, JAPANESE_MERGE_RULES, LongestMatchSegmenter, MorphologicalSegmenter,
    RawToken, ScriptRunSegmenter, Segmenter, WordSegmenter, apply_merge_rules,
    segment_with_fallback,
};

/// Everything an analysis needs, built once and shared.
///
/// Dictionaries, grammar tables and morphological models load on first use;
/// concurrent first uses wait on a single load. After that, lookups are
/// synchronous reads of immutable data. The overlay is the only state that
/// changes over the life of a context.
pub struct AnalysisContext {
    config: EngineConfig,
    store: Arc<dyn DictionaryStore>,
    overlay: Overlay,
    dictionaries: ChokePoint<(Language, DictionarySource), Dictionary, Infallible>,
    grammar_tables: ChokePoint<GrammarTable, PatternTable, Infallible>,
    segmenters: ChokePoint<Language, Option<MorphologicalSegmenter>, Infallible>,
}

impl AnalysisContext {
    /// Reads dictionaries, grammar tables and overlay files from the paths in `config`.
    pub fn new(config: EngineConfig) -> Self {
        let store = Arc::new(FileDictionaryStore::new(
            config.dictionary_dir.clone(),
            config.grammar_dir.clone(),
        ));
        let overlay_store = Arc::new(FileOverlayStore::from_config(&config.overlay));
        Self::with_stores(config, store, overlay_store)
    }

    pub fn with_stores(
        config: EngineConfig,
        store: Arc<dyn DictionaryStore>,
        overlay_store: Arc<dyn OverlayStore>,
    ) -> Self {
        let overlay = Overlay::new(overlay_store, config.overlay.ttl());
        Self {
            config,
            store,
            overlay,
            dictionaries: ChokePoint::new(),
            grammar_tables: ChokePoint::new(),
            segmenters: ChokePoint::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn dictionary(&self, language: Language, source: DictionarySource) -> Arc<Dictionary> {
        let store = Arc::clone(&self.store);
        let Ok(dictionary) = self
            .dictionaries
            .get((language, source), async move {
                let loaded =
                    tokio::task::spawn_blocking(move || store.load_vocabulary(language, source))
                        .await;
                Ok(match loaded {
                    Ok(Ok(dictionary)) => {
                        log::info!("loaded {source} {language} dictionary: {} entries", dictionary.len());
                        dictionary
                    }
                    Ok(Err(err)) => {
                        log::error!("{err}; analyzing {language} without a dictionary");
                        Dictionary::empty(language)
                    }
                    Err(err) => {
                        log::error!("dictionary load task failed: {err}");
                        Dictionary::empty(language)
                    }
                })
            })
            .await;
        dictionary
    }

    async fn grammar_table(&self, table: GrammarTable) -> Arc<PatternTable> {
        let store = Arc::clone(&self.store);
        let Ok(patterns) = self
            .grammar_tables
            .get(table, async move {
                let loaded = tokio::task::spawn_blocking(move || store.load_grammar(table)).await;
                Ok(match loaded {
                    Ok(Ok(patterns)) => {
                        log::info!("loaded {table} grammar table: {} patterns", patterns.len());
                        patterns
                    }
                    Ok(Err(err)) => {
                        log::error!("{err}; matching without a grammar table");
                        PatternTable::default()
                    }
                    Err(err) => {
                        log::error!("grammar load task failed: {err}");
                        PatternTable::default()
                    }
                })
            })
            .await;
        patterns
    }

    /// `None` when the model can't be loaded. The failure is logged once and
    /// remembered for the life of the context.
    async fn morphological(&self, language: Language) -> Arc<Option<MorphologicalSegmenter>> {
        let uri = self
            .config
            .morphological_dictionary
            .for_language(language)
            .map(str::to_string);
        let Ok(segmenter) = self
            .segmenters
            .get(language, async move {
                let loaded = tokio::task::spawn_blocking(move || {
                    MorphologicalSegmenter::load(language, uri.as_deref())
                })
                .await;
                Ok(match loaded {
                    Ok(Ok(segmenter)) => Some(segmenter),
                    Ok(Err(err)) => {
                        log::warn!("{err}; {language} will use the fallback segmenter");
                        None
                    }
                    Err(err) => {
                        log::error!("morphological model load task failed: {err}");
                        None
                    }
                })
            })
            .await;
        segmenter
    }

    /// The dictionary for `language` read together with the current overlay.
    pub async fn lexicon(&self, language: Language, source: DictionarySource) -> Lexicon {
        let dictionary = self.dictionary(language, source).await;
        let overlay = self.overlay.current().await;
        Lexicon::new(dictionary, overlay, self.config.overlay.precedence)
    }

    /// Level of a single lemma or surface form, following the same order as
    /// analysis: curated table, overlay, dictionary, stem-stripped retry.
    pub async fn lookup(
        &self,
        word: &str,
        language: Language,
        source: Option<DictionarySource>,
    ) -> Option<ProficiencyLabel> {
        let source = source.unwrap_or_else(|| self.config.default_dictionary(language));
        self.lexicon(language, source).await.resolve(word, word)
    }

    /// Rereads the overlay store now rather than waiting for the TTL.
    pub async fn refresh_overlay(&self) -> Result<Arc<DiscoveredRules>, OverlayError> {
        self.overlay.refresh().await
    }

    async fn segment(
        &self,
        text: &str,
        backend: TokenizerBackend,
        lexicon: &Lexicon,
    ) -> Vec<RawToken> {
        let language = lexicon.language();

        if language.writing_system().is_unspaced() {
            let fallback = LongestMatchSegmenter::for_language(lexicon.clone());
            return match backend {
                TokenizerBackend::Morphological => {
                    let model = self.morphological(language).await;
                    let primary = (*model).as_ref().map(|model| model as &dyn Segmenter);
                    segment_with_fallback(primary, &fallback, text)
                }
                TokenizerBackend::Segmenter if language == Language::Japanese => {
                    segment_with_fallback(Some(&ScriptRunSegmenter), &fallback, text)
                }
                _ => segment_with_fallback(None, &fallback, text),
            };
        }

        // English is always tagged so function words stay out of coverage
        if language == Language::English {
            let tagger = EnglishTagger::new(Arc::clone(lexicon.dictionary()));
            return segment_with_fallback(Some(&tagger), &WordSegmenter, text);
        }
        segment_with_fallback(None, &WordSegmenter, text)
    }

    /// Preprocesses, segments and classifies `text`. `None` when nothing is
    /// left after preprocessing.
    async fn prepare(
        &self,
        text: &str,
        language: Language,
        options: AnalysisOptions,
    ) -> Option<Prepared> {
        let backend = options
            .backend
            .unwrap_or_else(|| self.config.default_backend(language));
        let source = options
            .dictionary
            .unwrap_or_else(|| self.config.default_dictionary(language));

        let text = preprocess_for_analysis(text, language);
        if text.trim().is_empty() {
            return None;
        }

        let lexicon = self.lexicon(language, source).await;
        let mut raw = self.segment(&text, backend, &lexicon).await;
        if language == Language::Japanese {
            raw = apply_merge_rules(raw, JAPANESE_MERGE_RULES);
        }

        let patterns = if language == Language::Japanese {
            let table = options.grammar_table.unwrap_or(self.config.grammar_table);
            self.grammar_table(table)
                .await
                .with_priority_patterns(lexicon.overlay().grammar())
        } else {
            PatternTable::default()
        };

        let classifier = Classifier {
            lexicon: &lexicon,
            grammar: &patterns,
        };
        let tokens = classifier.classify_all(raw);
        log::debug!("{language}: {} tokens via {backend}", tokens.len());

        Some(Prepared {
            text,
            tokens,
            patterns,
        })
    }

    /// Classified tokens of `text`, punctuation and whitespace dropped.
    ///
    /// Never fails: a backend that can't load or segment falls back to a
    /// simpler segmenter.
    pub async fn tokenize(
        &self,
        text: &str,
        language: Language,
        options: AnalysisOptions,
    ) -> Vec<Token> {
        self.prepare(text, language, options)
            .await
            .map(|prepared| prepared.tokens)
            .unwrap_or_default()
    }

    /// Tokenizes, grades and aggregates `text`.
    ///
    /// Never fails. A missing backend falls back to a simpler segmenter and a
    /// missing dictionary grades every content word as unknown.
    pub async fn analyze(
        &self,
        text: &str,
        language: Language,
        options: AnalysisOptions,
    ) -> LexicalProfile {
        let Some(Prepared {
            text,
            tokens,
            patterns,
        }) = self.prepare(text, language, options).await
        else {
            return LexicalProfile::empty();
        };

        if language == Language::Japanese {
            let grammar = match_patterns(&text, &patterns);
            let summary = difficulty_summary(&tokens, Some(&grammar));
            let mut profile = aggregate(tokens, Some(grammar));
            profile.difficulty_summary = Some(summary);
            profile
        } else {
            aggregate(tokens, None)
        }
    }
}

struct Prepared {
    text: String,
    tokens: Vec<Token>,
    patterns: PatternTable,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::MemoryDictionaryStore;
    use crate::grammar::GrammarPattern;
    use crate::error::DictionaryError;
    use language_utils::{CefrLevel, JlptLevel};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn english_store() -> MemoryDictionaryStore {
        MemoryDictionaryStore::new().with_vocabulary(
            DictionarySource::Default,
            Dictionary::from_entries(
                Language::English,
                [
                    ("dog", ProficiencyLabel::Cefr(CefrLevel::A1)),
                    ("run", ProficiencyLabel::Cefr(CefrLevel::A1)),
                    ("epistemological", ProficiencyLabel::Cefr(CefrLevel::C2)),
                ],
            ),
        )
    }

    fn japanese_store() -> MemoryDictionaryStore {
        MemoryDictionaryStore::new()
            .with_vocabulary(
                DictionarySource::Combined,
                Dictionary::from_entries(
                    Language::Japanese,
                    [
                        ("猫", ProficiencyLabel::Jlpt(JlptLevel::N5)),
                        ("対立", ProficiencyLabel::Jlpt(JlptLevel::N1)),
                    ],
                ),
            )
            .with_grammar(
                GrammarTable::Combined,
                vec![
                    GrammarPattern::new("〜からこそ", JlptLevel::N2, "precisely because"),
                    GrammarPattern::new("〜から", JlptLevel::N5, "because"),
                ],
            )
    }

    fn context(store: MemoryDictionaryStore) -> AnalysisContext {
        let overlay = Arc::new(FileOverlayStore::new(None, None));
        AnalysisContext::with_stores(EngineConfig::default(), Arc::new(store), overlay)
    }

    #[tokio::test]
    async fn test_english_profile() {
        let context = context(english_store());
        let profile = context
            .analyze("The dog runs. Epistemological xyzzy!", Language::English, AnalysisOptions::default())
            .await;

        // dog and runs (lemma run) are A1, epistemological is C2, xyzzy is unknown
        assert_eq!(profile.unknown_words, vec!["xyzzy".to_string()]);
        assert!((profile.coverage - 0.75).abs() < 1e-9);
        assert!((profile.band_fractions.beginner - 0.5).abs() < 1e-9);
        assert!(profile.grammar.is_none());
        assert!(profile.difficulty_summary.is_none());
    }

    #[tokio::test]
    async fn test_tokenize_returns_classified_tokens() {
        let context = context(english_store());
        let tokens = context
            .tokenize("The dog runs.", Language::English, AnalysisOptions::default())
            .await;
        let dog = tokens.iter().find(|t| t.surface == "dog").unwrap();
        assert!(dog.is_content_word);
        assert_eq!(dog.proficiency_label, Some(ProficiencyLabel::Cefr(CefrLevel::A1)));
        // Punctuation never becomes a token
        assert!(tokens.iter().all(|t| t.surface != "."));

        assert!(context.tokenize("", Language::English, AnalysisOptions::default()).await.is_empty());
    }

    #[tokio::test]
    async fn test_english_function_words_ignored_by_every_backend() {
        let context = context(english_store());
        for backend in [
            TokenizerBackend::Morphological,
            TokenizerBackend::Segmenter,
            TokenizerBackend::LongestMatch,
        ] {
            let options = AnalysisOptions {
                backend: Some(backend),
                ..Default::default()
            };
            let tokens = context
                .tokenize("The dog is in the park", Language::English, options)
                .await;
            let function_words = tokens.iter().filter(|t| !t.is_content_word).count();
            assert_eq!(function_words, 4, "{backend}");

            let profile = context
                .analyze("The dog is in the park", Language::English, options)
                .await;
            // dog is known, park is not
            assert_eq!(profile.unknown_words, vec!["park".to_string()], "{backend}");
            assert!((profile.coverage - 0.5).abs() < 1e-9, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_empty_text() {
        let context = context(english_store());
        let profile = context
            .analyze("  \n ", Language::English, AnalysisOptions::default())
            .await;
        assert_eq!(profile, LexicalProfile::empty());
    }

    #[tokio::test]
    async fn test_japanese_without_morphological_model_falls_back() {
        let context = context(japanese_store());
        let options = AnalysisOptions {
            backend: Some(TokenizerBackend::LongestMatch),
            ..Default::default()
        };
        let profile = context.analyze("猫だからこそ対立", Language::Japanese, options).await;

        let surfaces: Vec<&str> = profile.tokens.iter().map(|t| t.surface.as_str()).collect();
        assert!(surfaces.contains(&"猫"));
        assert!(surfaces.contains(&"対立"));

        // からこそ masks から
        let grammar = profile.grammar.as_ref().map(|g| g.total_matches);
        assert_eq!(grammar, Some(1));

        let summary = profile.difficulty_summary.as_ref().map(|s| s.overall_level);
        assert_eq!(summary, Some(JlptLevel::N1));
    }

    #[tokio::test]
    async fn test_morphological_backend_degrades_without_model() {
        // No model configured: the longest-match fallback still finds words
        let context = context(japanese_store());
        let profile = context
            .analyze("猫", Language::Japanese, AnalysisOptions::default())
            .await;
        assert_eq!(profile.coverage, 1.0);
    }

    #[tokio::test]
    async fn test_missing_dictionary_files_grade_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            dictionary_dir: dir.path().join("missing"),
            grammar_dir: dir.path().join("missing"),
            ..Default::default()
        };
        let context = AnalysisContext::new(config);
        let profile = context
            .analyze("dog", Language::English, AnalysisOptions::default())
            .await;
        assert_eq!(profile.coverage, 0.0);
        assert_eq!(profile.unknown_words, vec!["dog".to_string()]);
    }

    #[tokio::test]
    async fn test_overlay_lookup_and_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let vocab_path = dir.path().join("vocab.json");
        std::fs::write(&vocab_path, r#"{"xyzzy": {"level": "B1"}}"#).unwrap();

        let overlay = Arc::new(FileOverlayStore::new(Some(vocab_path.clone()), None::<PathBuf>));
        let context = AnalysisContext::with_stores(
            EngineConfig::default(),
            Arc::new(english_store()),
            overlay,
        );

        assert_eq!(
            context.lookup("xyzzy", Language::English, None).await,
            Some(ProficiencyLabel::Cefr(CefrLevel::B1))
        );

        std::fs::write(&vocab_path, r#"{"xyzzy": {"level": "C1"}}"#).unwrap();
        context.refresh_overlay().await.unwrap();
        assert_eq!(
            context.lookup("xyzzy", Language::English, None).await,
            Some(ProficiencyLabel::Cefr(CefrLevel::C1))
        );
    }

    struct CountingStore {
        inner: MemoryDictionaryStore,
        loads: AtomicUsize,
    }

    impl DictionaryStore for CountingStore {
        fn load_vocabulary(
            &self,
            language: Language,
            source: DictionarySource,
        ) -> Result<Dictionary, DictionaryError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.inner.load_vocabulary(language, source)
        }

        fn load_grammar(&self, table: GrammarTable) -> Result<PatternTable, DictionaryError> {
            self.inner.load_grammar(table)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_shares_one_load() {
        let store = Arc::new(CountingStore {
            inner: english_store(),
            loads: AtomicUsize::new(0),
        });
        let overlay = Arc::new(FileOverlayStore::new(None, None));
        let context = Arc::new(AnalysisContext::with_stores(
            EngineConfig::default(),
            Arc::clone(&store) as Arc<dyn DictionaryStore>,
            overlay,
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let context = Arc::clone(&context);
                tokio::spawn(async move { context.lookup("dog", Language::English, None).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(
                handle.await.unwrap(),
                Some(ProficiencyLabel::Cefr(CefrLevel::A1))
            );
        }
        // Eight concurrent first uses, one dictionary read
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        context.lookup("run", Language::English, None).await;
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }
}
