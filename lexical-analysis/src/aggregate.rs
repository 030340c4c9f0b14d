use itertools::Itertools;
use language_utils::{
    BroadBand, BroadBandMap, DifficultySummary, GrammarProfile, JlptLevel, LexicalProfile, Token,
    TokenClass,
};

const HARDEST_SHOWN: usize = 3;

/// Folds classified tokens into a profile. Pure: the same tokens always give the
/// same profile.
///
/// Proper nouns count as content words but are left out of band fractions,
/// coverage and the unknown list.
pub fn aggregate(tokens: Vec<Token>, grammar: Option<GrammarProfile>) -> LexicalProfile {
    let mut band_counts = BroadBandMap::<usize>::default();
    let mut gradable = 0usize;
    let mut proper_nouns = 0usize;
    let mut function_words = 0usize;

    for token in &tokens {
        match token.class() {
            TokenClass::Known(band) => {
                gradable += 1;
                *band_counts.get_mut(&BroadBand::from(Some(band))) += 1;
            }
            TokenClass::Unknown => {
                gradable += 1;
                band_counts.unknown += 1;
            }
            TokenClass::ProperNoun => proper_nouns += 1,
            TokenClass::Function => function_words += 1,
        }
    }

    let band_fractions = if gradable == 0 {
        BroadBandMap::default()
    } else {
        band_counts.map(|_, count| *count as f64 / gradable as f64)
    };
    let coverage = if gradable == 0 {
        0.0
    } else {
        (gradable - band_counts.unknown) as f64 / gradable as f64
    };

    let unknown_words = tokens
        .iter()
        .filter(|token| token.class() == TokenClass::Unknown)
        .map(|token| token.lemma.clone())
        .unique()
        .collect();
    let grammar_tokens = tokens
        .iter()
        .filter(|token| !token.is_content_word)
        .map(|token| token.surface.clone())
        .unique()
        .collect();

    LexicalProfile {
        total_tokens: tokens.len(),
        unique_tokens: tokens.iter().map(|token| &token.lemma).unique().count(),
        content_word_count: tokens.len() - function_words,
        function_word_count: function_words,
        proper_noun_count: proper_nouns,
        band_fractions,
        coverage,
        tokens,
        unknown_words,
        grammar_tokens,
        grammar,
        difficulty_summary: None,
    }
}

/// JLPT headline levels: the hardest vocabulary level present, the hardest
/// grammar level matched, and the harder of the two.
pub fn difficulty_summary(tokens: &[Token], grammar: Option<&GrammarProfile>) -> DifficultySummary {
    let vocab_level = tokens
        .iter()
        .filter(|token| token.is_content_word && !token.is_proper_noun)
        .filter_map(|token| token.proficiency_label.and_then(|label| label.jlpt()))
        .max()
        .unwrap_or(JlptLevel::N5);
    let vocab_hardest = tokens
        .iter()
        .filter(|token| {
            token.is_content_word
                && token.proficiency_label.and_then(|label| label.jlpt()) == Some(vocab_level)
        })
        .map(|token| token.surface.clone())
        .unique()
        .take(HARDEST_SHOWN)
        .collect();

    let grammar_level = grammar
        .and_then(GrammarProfile::hardest_level)
        .unwrap_or(JlptLevel::N5);
    let grammar_hardest = grammar
        .map(|profile| {
            profile
                .matched_patterns
                .iter()
                .filter(|matched| matched.level == grammar_level)
                .map(|matched| matched.pattern.clone())
                .take(HARDEST_SHOWN)
                .collect()
        })
        .unwrap_or_default();

    DifficultySummary {
        vocab_level,
        vocab_hardest,
        grammar_level,
        grammar_hardest,
        overall_level: vocab_level.max(grammar_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use language_utils::{CefrLevel, JlptLevelMap, MatchedPattern, PartOfSpeech, ProficiencyLabel};

    fn cefr(surface: &str, level: Option<CefrLevel>) -> Token {
        Token::content(
            surface,
            surface,
            PartOfSpeech::Noun,
            level.map(ProficiencyLabel::Cefr),
        )
    }

    fn jlpt(surface: &str, level: JlptLevel) -> Token {
        Token::content(
            surface,
            surface,
            PartOfSpeech::Noun,
            Some(ProficiencyLabel::Jlpt(level)),
        )
    }

    fn fraction_sum(profile: &LexicalProfile) -> f64 {
        profile.band_fractions.values().sum()
    }

    #[test]
    fn test_known_advanced_unknown_mix() {
        let profile = aggregate(
            vec![
                cefr("dog", Some(CefrLevel::A1)),
                cefr("epistemological", Some(CefrLevel::C2)),
                cefr("xyzzy", None),
            ],
            None,
        );
        assert!((profile.coverage - 2.0 / 3.0).abs() < 1e-9);
        assert!((profile.band_fractions.advanced - 1.0 / 3.0).abs() < 1e-9);
        assert!((profile.band_fractions.unknown - 1.0 / 3.0).abs() < 1e-9);
        assert!((fraction_sum(&profile) - 1.0).abs() < 1e-9);
        assert_eq!(profile.unknown_words, vec!["xyzzy".to_string()]);
    }

    #[test]
    fn test_function_words_and_names_are_not_graded() {
        let profile = aggregate(
            vec![
                Token::function("the", "the", PartOfSpeech::Det, None),
                Token::proper_noun("Alice", "alice"),
                cefr("dog", Some(CefrLevel::A1)),
                cefr("dog", Some(CefrLevel::A1)),
            ],
            None,
        );
        assert_eq!(profile.total_tokens, 4);
        assert_eq!(profile.unique_tokens, 3);
        assert_eq!(profile.function_word_count, 1);
        assert_eq!(profile.content_word_count, 3);
        assert_eq!(profile.proper_noun_count, 1);
        // The name stays out of both sides of coverage
        assert_eq!(profile.coverage, 1.0);
        assert_eq!(profile.band_fractions.beginner, 1.0);
        assert!(profile.unknown_words.is_empty());
        assert_eq!(profile.grammar_tokens, vec!["the".to_string()]);
    }

    #[test]
    fn test_no_content_words() {
        let profile = aggregate(vec![Token::function("の", "の", PartOfSpeech::Adp, None)], None);
        // All-zero fractions, zero coverage
        assert_eq!(fraction_sum(&profile), 0.0);
        assert_eq!(profile.coverage, 0.0);

        let empty = aggregate(Vec::new(), None);
        assert_eq!(empty, LexicalProfile::empty());
    }

    #[test]
    fn test_adding_a_dictionary_entry_raises_coverage() {
        let before = aggregate(
            vec![cefr("dog", Some(CefrLevel::A1)), cefr("xyzzy", None), cefr("plugh", None)],
            None,
        );
        let after = aggregate(
            vec![
                cefr("dog", Some(CefrLevel::A1)),
                cefr("xyzzy", Some(CefrLevel::B2)),
                cefr("plugh", None),
            ],
            None,
        );
        // One more known word out of three
        assert!(after.coverage > before.coverage);
        assert!((after.coverage - 2.0 / 3.0).abs() < 1e-9);

        // Full coverage stays full
        let full = aggregate(vec![cefr("dog", Some(CefrLevel::A1))], None);
        let still_full = aggregate(
            vec![cefr("dog", Some(CefrLevel::A1)), cefr("run", Some(CefrLevel::A1))],
            None,
        );
        assert_eq!(full.coverage, 1.0);
        assert_eq!(still_full.coverage, 1.0);
    }

    #[test]
    fn test_difficulty_summary() {
        let tokens = vec![
            jlpt("猫", JlptLevel::N5),
            jlpt("対立", JlptLevel::N1),
            jlpt("耐える", JlptLevel::N1),
            jlpt("対立", JlptLevel::N1),
        ];
        let mut counts_by_level = JlptLevelMap::<usize>::default();
        counts_by_level.n2 = 1;
        let grammar = GrammarProfile {
            total_matches: 1,
            counts_by_level,
            matched_patterns: vec![MatchedPattern {
                pattern: "〜からこそ".to_string(),
                level: JlptLevel::N2,
                definition: String::new(),
                matched_text: "からこそ".to_string(),
            }],
            hardest_pattern: Some("〜からこそ (N2)".to_string()),
            unrecognized_patterns: Vec::new(),
        };

        let summary = difficulty_summary(&tokens, Some(&grammar));
        assert_eq!(summary.vocab_level, JlptLevel::N1);
        assert_eq!(summary.vocab_hardest, vec!["対立".to_string(), "耐える".to_string()]);
        assert_eq!(summary.grammar_level, JlptLevel::N2);
        assert_eq!(summary.grammar_hardest, vec!["〜からこそ".to_string()]);
        assert_eq!(summary.overall_level, JlptLevel::N1);

        // Nothing graded: everything defaults to the easiest level
        let summary = difficulty_summary(&[], None);
        assert_eq!(summary.overall_level, JlptLevel::N5);
        assert!(summary.vocab_hardest.is_empty());
    }
}
