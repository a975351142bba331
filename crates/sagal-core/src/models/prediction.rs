use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// Label the classifier returns when the image is not a blood smear.
pub const OUT_OF_DOMAIN_LABEL: &str = "not_blood";

/// Diagnostic labels the smear classifier can return for a valid sample.
pub const DIAGNOSTIC_LABELS: [&str; 2] = ["ALL", "Normal"];

/// A classification tag as returned by the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
pub struct Label(String);

impl Label {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_out_of_domain(&self) -> bool {
        self.0 == OUT_OF_DOMAIN_LABEL
    }

    /// Whether the label belongs to the known diagnostic taxonomy.
    pub fn is_diagnostic(&self) -> bool {
        DIAGNOSTIC_LABELS.contains(&self.0.as_str())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classifier confidence, normalised to a probability in `[0, 1]`.
///
/// The inference service reports confidence as a formatted percentage
/// (`"93.12%"`), while older hand-off entries may carry a raw number. Both
/// forms are accepted on input; the value is always serialized as a number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, TS)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, CoreError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidConfidence(format!(
                "{value} is outside [0, 1]"
            )))
        }
    }

    pub fn from_percent(percent: f64) -> Result<Self, CoreError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(CoreError::InvalidConfidence(format!(
                "{percent}% is outside [0, 100]"
            )));
        }
        Self::new(percent / 100.0)
    }

    /// Interpret a bare number: `[0, 1]` is a probability, `(1, 100]` a
    /// percentage.
    pub fn from_score(score: f64) -> Result<Self, CoreError> {
        if score.is_finite() && score > 1.0 {
            Self::from_percent(score)
        } else {
            Self::new(score)
        }
    }

    /// Parse `"93.12%"`, `"0.93"` or `"93.12"`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if let Some(number) = trimmed.strip_suffix('%') {
            let percent: f64 = number.trim().parse().map_err(|_| {
                CoreError::InvalidConfidence(format!("{raw:?} is not a percentage"))
            })?;
            return Self::from_percent(percent);
        }

        let score: f64 = trimmed
            .parse()
            .map_err(|_| CoreError::InvalidConfidence(format!("{raw:?} is not a number")))?;
        Self::from_score(score)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_percent())
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Number(score) => Confidence::from_score(score),
            Raw::Text(text) => Confidence::parse(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// Parsed response of one successful inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: Label,
    pub confidence: Confidence,
    pub description: Option<String>,
    /// JPEG with abnormal cells outlined, when the service provides one.
    pub highlighted_image: Option<Vec<u8>>,
}

impl PredictionResult {
    pub fn new(label: Label, confidence: Confidence) -> Self {
        Self {
            label,
            confidence,
            description: None,
            highlighted_image: None,
        }
    }
}
