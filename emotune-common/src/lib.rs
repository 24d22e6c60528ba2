//! # Emotune Common Library
//!
//! Shared code for the emotune workspace including:
//! - Emotion vocabulary and dominant-label selection
//! - Presentation mapping (colors, sounds, display text)
//! - Configuration loading
//! - Playback event types and the event bus

pub mod config;
pub mod emotion;
pub mod error;
pub mod events;
pub mod presentation;

pub use emotion::{select_dominant, EmotionLabel, Expression, ExpressionScores};
pub use error::{Error, Result};
pub use presentation::{DisplayColor, Presentation, PresentationMapper, TrackId};
