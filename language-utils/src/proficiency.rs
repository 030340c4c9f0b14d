//! Proficiency scales (CEFR, JLPT, HSK) and the broad bands used to compare
//! difficulty across languages.

use enumap::EnuMap;
use serde::{Deserialize, Serialize};

/// The three ordinal tiers every scale collapses onto.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    EnuMap,
)]
#[enumap(derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    schemars::JsonSchema
))]
pub enum Band {
    Beginner,
    Intermediate,
    Advanced,
}

/// A token's band, or `Unknown` when no dictionary resolved it.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    EnuMap,
)]
#[enumap(derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    schemars::JsonSchema
))]
pub enum BroadBand {
    Beginner,
    Intermediate,
    Advanced,
    Unknown,
}

impl BroadBand {
    pub fn known(self) -> Option<Band> {
        match self {
            BroadBand::Beginner => Some(Band::Beginner),
            BroadBand::Intermediate => Some(Band::Intermediate),
            BroadBand::Advanced => Some(Band::Advanced),
            BroadBand::Unknown => None,
        }
    }
}

impl From<Option<Band>> for BroadBand {
    fn from(band: Option<Band>) -> Self {
        match band {
            Some(Band::Beginner) => BroadBand::Beginner,
            Some(Band::Intermediate) => BroadBand::Intermediate,
            Some(Band::Advanced) => BroadBand::Advanced,
            None => BroadBand::Unknown,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

/// JLPT levels, easiest first. This is the five-point ladder used by the Bayesian
/// mastery model.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    parse_display::Display,
    parse_display::FromStr,
    EnuMap,
)]
#[enumap(derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    schemars::JsonSchema
))]
pub enum JlptLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl JlptLevel {
    pub fn hardest_first() -> impl Iterator<Item = JlptLevel> {
        JlptLevel::ALL.into_iter().rev()
    }

    /// 1 for N5 through 5 for N1.
    pub fn rank(self) -> u8 {
        match self {
            JlptLevel::N5 => 1,
            JlptLevel::N4 => 2,
            JlptLevel::N3 => 3,
            JlptLevel::N2 => 4,
            JlptLevel::N1 => 5,
        }
    }

    pub fn band(self) -> Band {
        match self {
            JlptLevel::N5 | JlptLevel::N4 => Band::Beginner,
            JlptLevel::N3 => Band::Intermediate,
            JlptLevel::N2 | JlptLevel::N1 => Band::Advanced,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum ProficiencyScale {
    Cefr,
    Jlpt,
    Hsk,
}

impl ProficiencyScale {
    /// Only JLPT has calibrated per-level mastery data.
    pub fn has_ladder(&self) -> bool {
        matches!(self, ProficiencyScale::Jlpt)
    }

    /// Numerals and other always-known tokens are assigned this label.
    pub fn easiest_label(&self) -> ProficiencyLabel {
        match self {
            ProficiencyScale::Cefr => ProficiencyLabel::Cefr(CefrLevel::A1),
            ProficiencyScale::Jlpt => ProficiencyLabel::Jlpt(JlptLevel::N5),
            ProficiencyScale::Hsk => ProficiencyLabel::Hsk(1),
        }
    }

    /// Parses a label belonging to this scale. HSK levels may be written as bare digits.
    pub fn parse_label(&self, raw: &str) -> Option<ProficiencyLabel> {
        let label = match (self, raw.trim().parse::<u8>()) {
            (ProficiencyScale::Hsk, Ok(level)) => ProficiencyLabel::hsk(level)?,
            _ => ProficiencyLabel::parse(raw)?,
        };
        (label.scale() == *self).then_some(label)
    }
}

/// A level on one of the supported scales.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProficiencyLabel {
    Cefr(CefrLevel),
    Jlpt(JlptLevel),
    /// HSK 1 through 9.
    Hsk(u8),
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized proficiency label {0:?}")]
pub struct ParseLabelError(pub String);

impl ProficiencyLabel {
    pub fn hsk(level: u8) -> Option<Self> {
        (1..=9).contains(&level).then_some(ProficiencyLabel::Hsk(level))
    }

    /// Parses `A1`..`C2`, `N1`..`N5` and `HSK1`..`HSK9` (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        if let Some(rest) = normalized.strip_prefix("HSK") {
            return rest.trim().parse::<u8>().ok().and_then(ProficiencyLabel::hsk);
        }
        if let Ok(level) = normalized.parse::<JlptLevel>() {
            return Some(ProficiencyLabel::Jlpt(level));
        }
        normalized.parse::<CefrLevel>().ok().map(ProficiencyLabel::Cefr)
    }

    pub fn scale(&self) -> ProficiencyScale {
        match self {
            ProficiencyLabel::Cefr(_) => ProficiencyScale::Cefr,
            ProficiencyLabel::Jlpt(_) => ProficiencyScale::Jlpt,
            ProficiencyLabel::Hsk(_) => ProficiencyScale::Hsk,
        }
    }

    pub fn band(&self) -> Band {
        match self {
            ProficiencyLabel::Cefr(CefrLevel::A1 | CefrLevel::A2) => Band::Beginner,
            ProficiencyLabel::Cefr(CefrLevel::B1 | CefrLevel::B2) => Band::Intermediate,
            ProficiencyLabel::Cefr(CefrLevel::C1 | CefrLevel::C2) => Band::Advanced,
            ProficiencyLabel::Jlpt(level) => level.band(),
            ProficiencyLabel::Hsk(level) if *level <= 2 => Band::Beginner,
            ProficiencyLabel::Hsk(level) if *level <= 4 => Band::Intermediate,
            ProficiencyLabel::Hsk(_) => Band::Advanced,
        }
    }

    /// Position within its own scale, 1 being easiest. Only comparable within a scale.
    pub fn difficulty_rank(&self) -> u8 {
        match self {
            ProficiencyLabel::Cefr(level) => *level as u8 + 1,
            ProficiencyLabel::Jlpt(level) => level.rank(),
            ProficiencyLabel::Hsk(level) => *level,
        }
    }

    pub fn jlpt(&self) -> Option<JlptLevel> {
        match self {
            ProficiencyLabel::Jlpt(level) => Some(*level),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProficiencyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProficiencyLabel::Cefr(level) => write!(f, "{level}"),
            ProficiencyLabel::Jlpt(level) => write!(f, "{level}"),
            ProficiencyLabel::Hsk(level) => write!(f, "HSK{level}"),
        }
    }
}

impl std::str::FromStr for ProficiencyLabel {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProficiencyLabel::parse(s).ok_or_else(|| ParseLabelError(s.to_string()))
    }
}

impl From<ProficiencyLabel> for String {
    fn from(label: ProficiencyLabel) -> Self {
        label.to_string()
    }
}

impl TryFrom<String> for ProficiencyLabel {
    type Error = ParseLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl schemars::JsonSchema for ProficiencyLabel {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "ProficiencyLabel".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "pattern": "^(A1|A2|B1|B2|C1|C2|N[1-5]|HSK[1-9])$"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(
            ProficiencyLabel::parse("b2"),
            Some(ProficiencyLabel::Cefr(CefrLevel::B2))
        );
        assert_eq!(
            ProficiencyLabel::parse("N3"),
            Some(ProficiencyLabel::Jlpt(JlptLevel::N3))
        );
        assert_eq!(ProficiencyLabel::parse("HSK 4"), Some(ProficiencyLabel::Hsk(4)));
        assert_eq!(ProficiencyLabel::parse("N6"), None);
        assert_eq!(ProficiencyLabel::parse("grammar"), None);
    }

    #[test]
    fn test_scale_aware_parse() {
        // Bare digits are only meaningful for HSK
        assert_eq!(
            ProficiencyScale::Hsk.parse_label("5"),
            Some(ProficiencyLabel::Hsk(5))
        );
        assert_eq!(ProficiencyScale::Cefr.parse_label("5"), None);
        // A JLPT label is not a valid CEFR label
        assert_eq!(ProficiencyScale::Cefr.parse_label("N5"), None);
    }

    #[test]
    fn test_band_mapping() {
        assert_eq!(ProficiencyLabel::Cefr(CefrLevel::A2).band(), Band::Beginner);
        assert_eq!(ProficiencyLabel::Cefr(CefrLevel::C1).band(), Band::Advanced);
        assert_eq!(ProficiencyLabel::Jlpt(JlptLevel::N4).band(), Band::Beginner);
        assert_eq!(ProficiencyLabel::Jlpt(JlptLevel::N3).band(), Band::Intermediate);
        assert_eq!(ProficiencyLabel::Jlpt(JlptLevel::N2).band(), Band::Advanced);
        assert_eq!(ProficiencyLabel::Hsk(2).band(), Band::Beginner);
        assert_eq!(ProficiencyLabel::Hsk(4).band(), Band::Intermediate);
        assert_eq!(ProficiencyLabel::Hsk(6).band(), Band::Advanced);
    }

    #[test]
    fn test_label_serde_is_a_plain_string() {
        let json = serde_json::to_string(&ProficiencyLabel::Hsk(3)).unwrap();
        assert_eq!(json, "\"HSK3\"");
        let back: ProficiencyLabel = serde_json::from_str("\"N1\"").unwrap();
        assert_eq!(back, ProficiencyLabel::Jlpt(JlptLevel::N1));
        assert!(serde_json::from_str::<ProficiencyLabel>("\"Z9\"").is_err());
    }

    #[test]
    fn test_jlpt_order() {
        let order: Vec<JlptLevel> = JlptLevel::hardest_first().collect();
        assert_eq!(order.first(), Some(&JlptLevel::N1));
        assert_eq!(order.last(), Some(&JlptLevel::N5));
        assert!(JlptLevel::N5 < JlptLevel::N1);
    }
}
