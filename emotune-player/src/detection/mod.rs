//! Detection sources
//!
//! The face/expression classifier is an external capability. The driver only
//! sees an [`ExpressionSource`], which yields one [`Detection`] per poll tick.

use std::future::Future;

use emotune_common::ExpressionScores;

use crate::error::Result;

pub mod replay;
pub mod scripted;

pub use replay::ReplaySource;
pub use scripted::ScriptedSource;

/// Classifier output for one poll tick
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// Scores for the first detected face
    Face(ExpressionScores),
    /// No face in frame
    NoFace,
}

/// Source of per-tick classifier results
pub trait ExpressionSource: Send {
    /// Result for the next poll tick.
    ///
    /// `Ok(None)` means the source is exhausted (camera stream ended,
    /// replay finished) and the driver should stop. An `Err` affects this
    /// tick only.
    fn next_detection(&mut self) -> impl Future<Output = Result<Option<Detection>>> + Send;
}
