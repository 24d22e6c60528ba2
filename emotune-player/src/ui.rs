//! Presentation sinks
//!
//! The rendering surface (window, web page, terminal) is outside the player.
//! The driver hands every tick's [`UiUpdate`] to a [`PresentationSink`].

use std::io::Write;

use emotune_common::presentation::UiUpdate;
use tracing::{debug, info};

use crate::error::Result;

/// Receiver of per-tick UI updates
pub trait PresentationSink: Send {
    fn apply(&mut self, update: &UiUpdate) -> Result<()>;
}

/// Sink that logs updates: `info` when the display text changes, `debug`
/// for every tick.
#[derive(Debug, Default)]
pub struct TracingSink {
    last_text: Option<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresentationSink for TracingSink {
    fn apply(&mut self, update: &UiUpdate) -> Result<()> {
        debug!(
            "UI update: background {} text {:?}",
            update.background, update.text
        );

        if self.last_text.as_deref() != Some(update.text.as_str()) {
            info!("{} (background {})", update.text, update.background);
            self.last_text = Some(update.text.clone());
        }

        Ok(())
    }
}

/// Sink that writes one JSON object per update, for a separate UI process
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> PresentationSink for JsonLinesSink<W> {
    fn apply(&mut self, update: &UiUpdate) -> Result<()> {
        serde_json::to_writer(&mut self.writer, update).map_err(emotune_common::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
