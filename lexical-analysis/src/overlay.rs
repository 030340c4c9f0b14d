//! Discovered rules: vocabulary and grammar learned after the static lists were
//! built, kept in small JSON files that other processes append to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chokepoint::ChokePoint;
use language_utils::{JlptLevel, ProficiencyLabel};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::grammar::{GrammarPattern, clean_pattern};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveredRules {
    vocab: FxHashMap<String, ProficiencyLabel>,
    grammar: Vec<GrammarPattern>,
}

impl DiscoveredRules {
    pub fn new(vocab: FxHashMap<String, ProficiencyLabel>, grammar: Vec<GrammarPattern>) -> Self {
        Self { vocab, grammar }
    }

    pub fn from_vocab<W: Into<String>>(entries: impl IntoIterator<Item = (W, ProficiencyLabel)>) -> Self {
        Self {
            vocab: entries
                .into_iter()
                .map(|(word, label)| (word.into(), label))
                .collect(),
            grammar: Vec::new(),
        }
    }

    pub fn with_grammar(mut self, grammar: Vec<GrammarPattern>) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn vocab_level(&self, word: &str) -> Option<ProficiencyLabel> {
        self.vocab.get(word).copied()
    }

    pub fn grammar(&self) -> &[GrammarPattern] {
        &self.grammar
    }

    /// Level of an overlay grammar pattern whose cleaned form is `form`.
    pub fn grammar_level(&self, form: &str) -> Option<JlptLevel> {
        self.grammar
            .iter()
            .find(|pattern| clean_pattern(&pattern.pattern) == form)
            .map(|pattern| pattern.level)
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty() && self.grammar.is_empty()
    }
}

/// Backing store for the overlay. An absent store yields empty rules.
pub trait OverlayStore: Send + Sync {
    fn load(&self) -> Result<DiscoveredRules, OverlayError>;
}

#[derive(Deserialize)]
struct VocabRule {
    level: String,
}

#[derive(Deserialize)]
struct GrammarRule {
    level: String,
    #[serde(default)]
    definition: String,
}

pub struct FileOverlayStore {
    vocab_path: Option<PathBuf>,
    grammar_path: Option<PathBuf>,
}

impl FileOverlayStore {
    pub fn new(vocab_path: Option<PathBuf>, grammar_path: Option<PathBuf>) -> Self {
        Self {
            vocab_path,
            grammar_path,
        }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.vocab_path.clone(), config.grammar_path.clone())
    }
}

fn read_rules<T: serde::de::DeserializeOwned>(
    path: Option<&Path>,
) -> Result<Vec<(String, T)>, OverlayError> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(OverlayError::Io {
                path: path.to_path_buf(),
                source: Arc::new(source),
            });
        }
    };
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&contents).map_err(|source| OverlayError::Parse {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
    map.into_iter()
        .map(|(key, value)| {
            serde_json::from_value(value)
                .map(|rule| (key, rule))
                .map_err(|source| OverlayError::Parse {
                    path: path.to_path_buf(),
                    source: Arc::new(source),
                })
        })
        .collect()
}

impl OverlayStore for FileOverlayStore {
    fn load(&self) -> Result<DiscoveredRules, OverlayError> {
        let vocab = read_rules::<VocabRule>(self.vocab_path.as_deref())?
            .into_iter()
            .filter_map(|(word, rule)| ProficiencyLabel::parse(&rule.level).map(|label| (word, label)))
            .collect();
        let grammar = read_rules::<GrammarRule>(self.grammar_path.as_deref())?
            .into_iter()
            .filter_map(|(pattern, rule)| {
                let level = rule.level.trim().parse::<JlptLevel>().ok()?;
                Some(GrammarPattern::new(pattern, level, rule.definition))
            })
            .collect();
        Ok(DiscoveredRules::new(vocab, grammar))
    }
}

/// Process-wide overlay state, reloaded from its store once the TTL lapses.
/// Concurrent reloads collapse into one read.
pub struct Overlay {
    store: Arc<dyn OverlayStore>,
    cache: ChokePoint<(), DiscoveredRules, OverlayError>,
}

impl Overlay {
    pub fn new(store: Arc<dyn OverlayStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: ChokePoint::with_ttl(ttl),
        }
    }

    async fn load(&self) -> Result<Arc<DiscoveredRules>, OverlayError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get((), async move {
                let rules = tokio::task::spawn_blocking(move || store.load())
                    .await
                    .map_err(|err| OverlayError::Join(err.to_string()))??;
                log::debug!(
                    "overlay reloaded: {} words, {} grammar patterns",
                    rules.vocab.len(),
                    rules.grammar.len()
                );
                Ok(rules)
            })
            .await
    }

    /// Current rules, reloading if stale. A failed reload keeps the previous rules.
    pub async fn current(&self) -> Arc<DiscoveredRules> {
        match self.load().await {
            Ok(rules) => rules,
            Err(err) => {
                log::error!("overlay reload failed: {err}");
                self.snapshot()
            }
        }
    }

    /// Forces a reload regardless of the TTL.
    pub async fn refresh(&self) -> Result<Arc<DiscoveredRules>, OverlayError> {
        self.cache.invalidate(&());
        self.load()
            .await
            .inspect(|rules| {
                log::info!(
                    "overlay refreshed: {} words, {} grammar patterns",
                    rules.vocab.len(),
                    rules.grammar.len()
                )
            })
            .inspect_err(|err| log::error!("overlay refresh failed: {err}"))
    }

    /// Last loaded rules without touching the store.
    pub fn snapshot(&self) -> Arc<DiscoveredRules> {
        self.cache
            .get_cached(&())
            .unwrap_or_else(|| Arc::new(DiscoveredRules::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        rules: RwLock<DiscoveredRules>,
        loads: AtomicUsize,
    }

    impl OverlayStore for CountingStore {
        fn load(&self) -> Result<DiscoveredRules, OverlayError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rules.read().unwrap().clone())
        }
    }

    fn counting_store() -> Arc<CountingStore> {
        Arc::new(CountingStore {
            rules: RwLock::new(DiscoveredRules::default()),
            loads: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_missing_files_are_an_empty_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOverlayStore::new(
            Some(dir.path().join("vocab.json")),
            Some(dir.path().join("grammar.json")),
        );
        let overlay = Overlay::new(Arc::new(store), Duration::from_secs(5));
        assert!(overlay.current().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_overlay_format() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        let grammar = dir.path().join("grammar.json");
        std::fs::write(&vocab, r#"{"推し": {"level": "N3", "source": "chat"}, "謎": {"level": "??"}}"#).unwrap();
        std::fs::write(&grammar, r#"{"〜っぽい": {"level": "N3", "definition": "-ish"}}"#).unwrap();

        let rules = FileOverlayStore::new(Some(vocab), Some(grammar)).load().unwrap();
        assert_eq!(rules.vocab_level("推し"), Some(ProficiencyLabel::Jlpt(JlptLevel::N3)));
        // Entries with unreadable levels are dropped
        assert_eq!(rules.vocab_level("謎"), None);
        assert_eq!(rules.grammar_level("っぽい"), Some(JlptLevel::N3));
        assert_eq!(rules.grammar()[0].definition, "-ish");
    }

    #[tokio::test]
    async fn test_ttl_caches_reads() {
        let store = counting_store();
        let overlay = Overlay::new(store.clone(), Duration::from_secs(60));

        overlay.current().await;
        overlay.current().await;
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_rules() {
        let store = counting_store();
        let overlay = Overlay::new(store.clone(), Duration::from_secs(60));
        assert!(overlay.current().await.vocab_level("ガチ").is_none());

        *store.rules.write().unwrap() =
            DiscoveredRules::from_vocab([("ガチ", ProficiencyLabel::Jlpt(JlptLevel::N2))]);
        // Still inside the TTL: the old rules are served
        assert!(overlay.current().await.vocab_level("ガチ").is_none());

        let refreshed = overlay.refresh().await.unwrap();
        assert!(refreshed.vocab_level("ガチ").is_some());
        assert!(overlay.snapshot().vocab_level("ガチ").is_some());
    }

    #[tokio::test]
    async fn test_expired_rules_reload() {
        let store = counting_store();
        let overlay = Overlay::new(store.clone(), Duration::from_millis(10));
        overlay.current().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        overlay.current().await;
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }
}
