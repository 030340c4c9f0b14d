//! Vocabulary and grammar difficulty analysis for learner texts.
//!
//! [`AnalysisContext`] is the entry point: it owns the loaded dictionaries,
//! grammar tables and segmenters, and turns text into a [`LexicalProfile`].
//!
//! [`LexicalProfile`]: language_utils::LexicalProfile

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod context;
pub mod dictionary;
pub mod error;
pub mod grammar;
pub mod overlay;
pub mod tokenize;

pub use aggregate::{aggregate, difficulty_summary};
pub use config::{
    AnalysisOptions, ConfigError, DictionarySource, EngineConfig, GrammarTable, OverlayConfig,
    OverlayPrecedence, TokenizerBackend,
};
pub use context::AnalysisContext;
pub use dictionary::{Dictionary, DictionaryStore, FileDictionaryStore, Lexicon, MemoryDictionaryStore};
pub use error::{DictionaryError, OverlayError, TokenizerError};
pub use grammar::{GrammarPattern, PatternTable, match_patterns};
pub use overlay::{DiscoveredRules, FileOverlayStore, Overlay, OverlayStore};
