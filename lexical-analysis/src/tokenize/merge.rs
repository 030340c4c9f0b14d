//! Repairs for known mis-splits in morphological output.
//!
//! Each rule looks at a token and its successor. Rules are tried in table order
//! at every position of a single left-to-right pass; a merged token is not
//! considered again.

use super::{PosTag, RawToken};

pub struct MergeRule {
    pub name: &'static str,
    pub matches: fn(&RawToken, &RawToken) -> bool,
    pub merge: fn(&RawToken, &RawToken) -> RawToken,
}

const NOUN_SUFFIXES: &[char] = &['会', '性', '的', '費', '化', '力', '長'];
const MUST_CONTRACTIONS: &[&str] = &["なきゃ", "なくちゃ"];

fn is_noun(token: &RawToken) -> bool {
    token.ipadic_major() == Some("名詞")
}

pub const JAPANESE_MERGE_RULES: &[MergeRule] = &[
    MergeRule {
        name: "本当",
        matches: |current, next| current.surface == "本" && next.surface == "当",
        merge: |_, _| RawToken::ipadic("本当", "本当", "副詞", "一般"),
    },
    MergeRule {
        name: "suru-verb",
        matches: |current, next| {
            matches!(current.ipadic_minor(), Some("サ変接続" | "一般"))
                && is_noun(current)
                && next.ipadic_major() == Some("動詞")
                && next.lemma_or_surface() == "する"
        },
        merge: |current, next| {
            RawToken::ipadic(
                format!("{}{}", current.surface, next.surface),
                format!("{}する", current.lemma_or_surface()),
                "動詞",
                "自立",
            )
        },
    },
    MergeRule {
        name: "noun-suffix",
        matches: |current, next| {
            is_noun(current)
                && matches!(next.tag, PosTag::Ipadic { .. })
                && next.surface.chars().count() == 1
                && next.surface.chars().all(|c| NOUN_SUFFIXES.contains(&c))
        },
        merge: |current, next| {
            RawToken::ipadic(
                format!("{}{}", current.surface, next.surface),
                format!("{}{}", current.lemma_or_surface(), next.surface),
                "名詞",
                "一般",
            )
        },
    },
    MergeRule {
        name: "nakya-ikenai",
        matches: |current, next| {
            MUST_CONTRACTIONS.contains(&current.surface.as_str()) && next.surface == "いけない"
        },
        merge: |current, next| {
            RawToken::ipadic(
                format!("{}{}", current.surface, next.surface),
                "なければならない",
                "動詞",
                "非自立",
            )
        },
    },
];

pub fn apply_merge_rules(tokens: Vec<RawToken>, rules: &[MergeRule]) -> Vec<RawToken> {
    let mut merged = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(current) = iter.next() {
        let rule = iter
            .peek()
            .and_then(|next| rules.iter().find(|rule| (rule.matches)(&current, next)));
        match rule {
            Some(rule) => {
                if let Some(next) = iter.next() {
                    log::trace!("merge rule {} joined {}+{}", rule.name, current.surface, next.surface);
                    merged.push((rule.merge)(&current, &next));
                }
            }
            None => merged.push(current),
        }
    }

    merged
}
