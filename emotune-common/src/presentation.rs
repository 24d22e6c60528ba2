//! Presentation mapping
//!
//! Maps a detected expression to the cosmetic feedback shown to the user
//! (background color, color box fill, status text) and to the audio track
//! associated with it. Pure lookups; unknown expressions get a neutral
//! fallback instead of an error.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{SoundsConfig, UiConfig};
use crate::emotion::{EmotionLabel, Expression};

/// Status text shown when the classifier reports no face
pub const NO_DETECTION_TEXT: &str = "No face detected";

/// Identifier of a playable audio resource (a file path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(PathBuf);

impl TrackId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// RGB display color, rendered CSS-style as `rgb(r, g, b)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl DisplayColor {
    pub const BLACK: DisplayColor = DisplayColor::rgb(0, 0, 0);
    pub const WHITE: DisplayColor = DisplayColor::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fixed color for each label
    pub const fn for_label(label: EmotionLabel) -> Self {
        match label {
            EmotionLabel::Anger => DisplayColor::rgb(255, 0, 0),
            EmotionLabel::Happy => DisplayColor::rgb(255, 255, 0),
            EmotionLabel::Sad => DisplayColor::rgb(0, 0, 255),
            EmotionLabel::Neutral => DisplayColor::rgb(128, 128, 128),
            EmotionLabel::Surprised => DisplayColor::rgb(255, 165, 0),
            EmotionLabel::Fear => DisplayColor::rgb(128, 0, 128),
        }
    }
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Fill of the color box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoxFill {
    Solid { color: DisplayColor },
    /// Top-to-bottom linear gradient
    Gradient { from: DisplayColor, to: DisplayColor },
}

/// Everything the mapper derives from one poll tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub background: DisplayColor,
    pub box_fill: BoxFill,
    pub text: String,
    /// Track to crossfade to; `None` leaves audio untouched
    pub track: Option<TrackId>,
    pub no_detection: bool,
}

impl Presentation {
    /// Fixed presentation for ticks where no face was found
    pub fn no_detection() -> Self {
        Self {
            background: DisplayColor::BLACK,
            box_fill: BoxFill::Solid {
                color: DisplayColor::WHITE,
            },
            text: NO_DETECTION_TEXT.to_string(),
            track: None,
            no_detection: true,
        }
    }

    /// Build the sink-facing update, attaching transition hints
    pub fn ui_update(&self, ui: &UiConfig) -> UiUpdate {
        let text_transition = if self.no_detection {
            TextTransition::Immediate {
                fade_in: ui.text_fade(),
            }
        } else {
            TextTransition::FadeSwap {
                fade_out: ui.text_fade(),
                fade_in: ui.text_fade(),
            }
        };

        UiUpdate {
            background: self.background,
            background_transition: ui.background_transition(),
            box_fill: self.box_fill,
            text: self.text.clone(),
            text_transition,
            no_detection: self.no_detection,
        }
    }
}

/// How the status text changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextTransition {
    /// Swap text at once, then fade to full opacity
    Immediate {
        #[serde(with = "duration_ms")]
        fade_in: Duration,
    },
    /// Fade to transparent, swap text, fade back in
    FadeSwap {
        #[serde(with = "duration_ms")]
        fade_out: Duration,
        #[serde(with = "duration_ms")]
        fade_in: Duration,
    },
}

/// Per-tick update sent to the UI sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiUpdate {
    pub background: DisplayColor,
    #[serde(with = "duration_ms")]
    pub background_transition: Duration,
    pub box_fill: BoxFill,
    pub text: String,
    pub text_transition: TextTransition,
    pub no_detection: bool,
}

/// Label → presentation lookup, built once from configuration
#[derive(Debug, Clone)]
pub struct PresentationMapper {
    tracks: HashMap<EmotionLabel, TrackId>,
}

impl PresentationMapper {
    pub fn new(sounds: &SoundsConfig) -> Self {
        let tracks = EmotionLabel::ALL
            .into_iter()
            .map(|label| (label, TrackId::new(sounds.path_for(label))))
            .collect();
        Self { tracks }
    }

    /// Track bound to a label
    pub fn track_for(&self, label: EmotionLabel) -> Option<&TrackId> {
        self.tracks.get(&label)
    }

    /// Map a dominant expression to its presentation. Total over all inputs.
    pub fn present(&self, expression: &Expression) -> Presentation {
        let (color, track) = match expression.label() {
            Some(label) => (DisplayColor::for_label(label), self.track_for(label).cloned()),
            None => (DisplayColor::WHITE, None),
        };

        Presentation {
            background: color,
            box_fill: BoxFill::Gradient {
                from: color,
                to: DisplayColor::WHITE,
            },
            text: format!("Detected Expression: {}", expression),
            track,
            no_detection: false,
        }
    }
}

impl Default for PresentationMapper {
    fn default() -> Self {
        Self::new(&SoundsConfig::default())
    }
}

/// Serialize `Duration` as integer milliseconds
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_presentation() {
        let mapper = PresentationMapper::default();
        let p = mapper.present(&Expression::Known(EmotionLabel::Happy));

        assert_eq!(p.background, DisplayColor::rgb(255, 255, 0));
        assert_eq!(p.background.to_string(), "rgb(255, 255, 0)");
        assert_eq!(p.track, Some(TrackId::new("./sounds/happy.mp3")));
        assert_eq!(p.text, "Detected Expression: happy");
        assert_eq!(
            p.box_fill,
            BoxFill::Gradient {
                from: DisplayColor::rgb(255, 255, 0),
                to: DisplayColor::WHITE
            }
        );
        assert!(!p.no_detection);
    }

    #[test]
    fn test_every_label_is_mapped_and_stable() {
        let mapper = PresentationMapper::default();
        for label in EmotionLabel::ALL {
            let first = mapper.present(&label.into());
            let second = mapper.present(&label.into());
            assert_eq!(first, second);
            assert_eq!(first.background, DisplayColor::for_label(label));
            assert!(first.track.is_some());
            assert_ne!(first.background, DisplayColor::WHITE);
        }
    }

    #[test]
    fn test_label_colors() {
        assert_eq!(DisplayColor::for_label(EmotionLabel::Anger).to_string(), "rgb(255, 0, 0)");
        assert_eq!(DisplayColor::for_label(EmotionLabel::Sad).to_string(), "rgb(0, 0, 255)");
        assert_eq!(DisplayColor::for_label(EmotionLabel::Neutral).to_string(), "rgb(128, 128, 128)");
        assert_eq!(DisplayColor::for_label(EmotionLabel::Surprised).to_string(), "rgb(255, 165, 0)");
        assert_eq!(DisplayColor::for_label(EmotionLabel::Fear).to_string(), "rgb(128, 0, 128)");
    }

    #[test]
    fn test_unknown_expression_falls_back() {
        let mapper = PresentationMapper::default();
        let p = mapper.present(&Expression::parse("disgusted"));

        assert_eq!(p.background, DisplayColor::WHITE);
        assert_eq!(p.track, None);
        assert_eq!(p.text, "Detected Expression: disgusted");
        assert!(!p.no_detection);
    }

    #[test]
    fn test_no_detection_presentation() {
        let p = Presentation::no_detection();
        assert_eq!(p.background, DisplayColor::BLACK);
        assert_eq!(p.box_fill, BoxFill::Solid { color: DisplayColor::WHITE });
        assert_eq!(p.text, "No face detected");
        assert_eq!(p.track, None);
        assert!(p.no_detection);
    }

    #[test]
    fn test_tracks_follow_sounds_config() {
        let sounds = SoundsConfig {
            dir: PathBuf::from("/opt/moods"),
            ..SoundsConfig::default()
        };
        let mapper = PresentationMapper::new(&sounds);
        assert_eq!(
            mapper.track_for(EmotionLabel::Fear),
            Some(&TrackId::new("/opt/moods/fear.mp3"))
        );
    }

    #[test]
    fn test_ui_update_transitions() {
        let ui = UiConfig::default();
        let detected = PresentationMapper::default()
            .present(&EmotionLabel::Sad.into())
            .ui_update(&ui);
        assert_eq!(detected.background_transition, Duration::from_secs(1));
        assert_eq!(
            detected.text_transition,
            TextTransition::FadeSwap {
                fade_out: Duration::from_millis(500),
                fade_in: Duration::from_millis(500)
            }
        );

        let none = Presentation::no_detection().ui_update(&ui);
        assert!(none.no_detection);
        assert_eq!(
            none.text_transition,
            TextTransition::Immediate { fade_in: Duration::from_millis(500) }
        );
    }

    #[test]
    fn test_ui_update_serializes_millis() {
        let update = Presentation::no_detection().ui_update(&UiConfig::default());
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["background_transition"], 1000);
        assert_eq!(json["text"], "No face detected");
        assert_eq!(json["box_fill"]["kind"], "solid");
    }
}
