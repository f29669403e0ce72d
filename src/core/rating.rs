// src/core/rating.rs — Four-level quality scale

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Quality rating assigned by the evaluator. Ordered by ordinal value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityRating {
    /// Major improvements needed
    #[default]
    Poor = 0,
    /// Several improvements needed
    Fair = 1,
    /// Minor improvements possible
    Good = 2,
    /// No improvements needed
    Excellent = 3,
}

impl QualityRating {
    /// Bottom of the scale. Seeds best-response tracking before anything is evaluated.
    pub const FLOOR: QualityRating = QualityRating::Poor;

    pub const ALL: [QualityRating; 4] = [
        QualityRating::Poor,
        QualityRating::Fair,
        QualityRating::Good,
        QualityRating::Excellent,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityRating::Poor => "POOR",
            QualityRating::Fair => "FAIR",
            QualityRating::Good => "GOOD",
            QualityRating::Excellent => "EXCELLENT",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Self::from_value(n).ok_or_else(|| format!("rating out of range: {n}"));
        }
        // Models sometimes answer with a qualified path like "QualityRating.FAIR"
        let name = trimmed
            .rsplit('.')
            .next()
            .unwrap_or(trimmed)
            .to_ascii_uppercase();
        match name.as_str() {
            "POOR" => Ok(QualityRating::Poor),
            "FAIR" => Ok(QualityRating::Fair),
            "GOOD" => Ok(QualityRating::Good),
            "EXCELLENT" => Ok(QualityRating::Excellent),
            _ => Err(format!("unknown quality rating: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for QualityRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Ordinal(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Ordinal(n) => u8::try_from(n)
                .ok()
                .and_then(QualityRating::from_value)
                .ok_or_else(|| serde::de::Error::custom(format!("rating out of range: {n}"))),
            Raw::Name(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
