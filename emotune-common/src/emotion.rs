//! Emotion vocabulary and dominant-label selection
//!
//! The classifier reports one score per expression key. Keys inside the closed
//! [`EmotionLabel`] set drive colors and sounds; anything else is carried as
//! [`Expression::Unknown`] so it can still be displayed with the fallback
//! presentation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Closed set of emotion categories.
///
/// Declaration order is the fixed enumeration order used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Anger,
    Happy,
    Sad,
    Neutral,
    Surprised,
    Fear,
}

impl EmotionLabel {
    /// All labels in enumeration order
    pub const ALL: [EmotionLabel; 6] = [
        EmotionLabel::Anger,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Neutral,
        EmotionLabel::Surprised,
        EmotionLabel::Fear,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmotionLabel::Anger => "anger",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Surprised => "surprised",
            EmotionLabel::Fear => "fear",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EmotionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown emotion label: {}", s)))
    }
}

/// A classifier output key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Expression {
    /// Key inside the closed label set
    Known(EmotionLabel),
    /// Key the classifier reported that has no configured presentation
    Unknown(String),
}

impl Expression {
    /// Parse a raw classifier key. Never fails; unrecognized keys become `Unknown`.
    pub fn parse(key: &str) -> Self {
        match key.parse::<EmotionLabel>() {
            Ok(label) => Expression::Known(label),
            Err(_) => Expression::Unknown(key.to_string()),
        }
    }

    pub fn label(&self) -> Option<EmotionLabel> {
        match self {
            Expression::Known(label) => Some(*label),
            Expression::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Expression::Known(label) => label.as_str(),
            Expression::Unknown(key) => key,
        }
    }

    /// Position in canonical order: known labels first, in enumeration order
    fn rank(&self) -> usize {
        match self {
            Expression::Known(label) => *label as usize,
            Expression::Unknown(_) => EmotionLabel::ALL.len(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EmotionLabel> for Expression {
    fn from(label: EmotionLabel) -> Self {
        Expression::Known(label)
    }
}

impl From<&str> for Expression {
    fn from(key: &str) -> Self {
        Expression::parse(key)
    }
}

impl From<String> for Expression {
    fn from(key: String) -> Self {
        Expression::parse(&key)
    }
}

impl From<Expression> for String {
    fn from(expression: Expression) -> Self {
        match expression {
            Expression::Known(label) => label.as_str().to_string(),
            Expression::Unknown(key) => key,
        }
    }
}

/// Scores for one detected face, produced fresh every poll tick.
///
/// Always holds at least one entry, every score is finite and within [0, 1].
/// Entries are kept in canonical order (known labels in enumeration order,
/// then unknown keys in the order they were supplied).
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionScores {
    entries: Vec<(Expression, f32)>,
}

impl ExpressionScores {
    /// Build a score mapping, validating every entry.
    ///
    /// A key supplied twice keeps its last score.
    ///
    /// # Errors
    /// `Error::InvalidInput` for an empty mapping or a score that is NaN,
    /// infinite, or outside [0, 1].
    pub fn new<I, K>(scores: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f32)>,
        K: Into<Expression>,
    {
        let mut entries: Vec<(Expression, f32)> = Vec::new();

        for (key, score) in scores {
            let expression = key.into();
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(Error::InvalidInput(format!(
                    "Score for '{}' out of range: {}",
                    expression, score
                )));
            }

            match entries.iter_mut().find(|(existing, _)| *existing == expression) {
                Some(entry) => entry.1 = score,
                None => entries.push((expression, score)),
            }
        }

        if entries.is_empty() {
            return Err(Error::InvalidInput(
                "Expression scores must contain at least one entry".to_string(),
            ));
        }

        // Stable sort keeps unknown keys in arrival order
        entries.sort_by_key(|(expression, _)| expression.rank());

        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Expression, f32)> {
        self.entries.iter().map(|(expression, score)| (expression, *score))
    }

    pub fn get(&self, expression: &Expression) -> Option<f32> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == expression)
            .map(|(_, score)| *score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pick the dominant expression (arg-max).
///
/// Ties resolve to the entry that comes first in canonical order: the
/// reduction only replaces the incumbent on a strictly greater score.
pub fn select_dominant(scores: &ExpressionScores) -> (&Expression, f32) {
    let mut entries = scores.iter();
    // ExpressionScores is never empty
    let mut best = match entries.next() {
        Some(first) => first,
        None => unreachable!("ExpressionScores holds at least one entry"),
    };

    for candidate in entries {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    best
}
