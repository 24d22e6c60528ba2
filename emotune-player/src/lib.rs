//! # Emotune Player Library (emotune-player)
//!
//! Turns per-tick expression scores into UI updates and crossfaded,
//! emotion-associated audio.
//!
//! **Architecture:** a detection driver polls an [`detection::ExpressionSource`]
//! on a fixed period, maps the dominant expression to a presentation, hands the
//! cosmetic part to a [`ui::PresentationSink`] and the track to the
//! [`playback::CrossfadeScheduler`], which ramps volumes on a single repeating
//! timer over an [`audio::AudioBackend`].

pub mod audio;
pub mod detection;
pub mod driver;
pub mod error;
pub mod playback;
pub mod ui;

pub use error::{Error, Result};
pub use playback::CrossfadeScheduler;
