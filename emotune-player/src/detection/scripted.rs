//! In-memory detection source

use std::collections::VecDeque;

use emotune_common::ExpressionScores;

use crate::detection::{Detection, ExpressionSource};
use crate::error::{Error, Result};

/// Detection source that plays back a fixed script, then ends
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Detection>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a face with the given scores
    pub fn face<I, K>(mut self, scores: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f32)>,
        K: Into<emotune_common::Expression>,
    {
        self.script
            .push_back(Ok(Detection::Face(ExpressionScores::new(scores)?)));
        Ok(self)
    }

    /// Append a tick with no face in frame
    pub fn no_face(mut self) -> Self {
        self.script.push_back(Ok(Detection::NoFace));
        self
    }

    /// Append a tick on which the classifier fails
    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.script.push_back(Err(Error::Source(message.into())));
        self
    }

    pub fn push(&mut self, detection: Detection) {
        self.script.push_back(Ok(detection));
    }

    /// Ticks left before the source ends
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ExpressionSource for ScriptedSource {
    async fn next_detection(&mut self) -> Result<Option<Detection>> {
        match self.script.pop_front() {
            Some(Ok(detection)) => Ok(Some(detection)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}
