//! UI sink that records updates

use emotune_common::presentation::UiUpdate;
use emotune_player::ui::PresentationSink;
use emotune_player::{Error, Result};

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub updates: Vec<UiUpdate>,
    /// Reject every update after recording it
    pub failing: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            updates: Vec::new(),
            failing: true,
        }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.updates.iter().map(|u| u.text.as_str()).collect()
    }
}

impl PresentationSink for RecordingSink {
    fn apply(&mut self, update: &UiUpdate) -> Result<()> {
        self.updates.push(update.clone());
        if self.failing {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "display unavailable",
            )));
        }
        Ok(())
    }
}
