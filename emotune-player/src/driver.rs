//! Detection driver
//!
//! Polls an [`ExpressionSource`] on a fixed period. Each tick:
//! - no face: the sink gets the no-detection presentation, audio is untouched
//! - face: the dominant expression is mapped, the sink gets the presentation,
//!   and the mapped track (if any) goes to the crossfade scheduler
//!
//! Source, sink and scheduler errors are logged and polling continues.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use emotune_common::config::{RetriggerPolicy, TomlConfig, UiConfig};
use emotune_common::{select_dominant, Presentation, PresentationMapper, TrackId};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::detection::{Detection, ExpressionSource};
use crate::playback::CrossfadeScheduler;
use crate::ui::PresentationSink;

/// Driver settings
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub poll_interval: Duration,
    pub retrigger: RetriggerPolicy,
    pub ui: UiConfig,
}

impl From<&TomlConfig> for DriverOptions {
    fn from(config: &TomlConfig) -> Self {
        Self {
            poll_interval: config.detection.poll_interval(),
            retrigger: config.detection.retrigger,
            ui: config.ui.clone(),
        }
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

/// Counters for one driver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    pub faces: u64,
    pub no_face: u64,
    pub source_errors: u64,
    pub play_requests: u64,
    pub play_failures: u64,
}

/// Poll loop tying a detection source to the UI sink and the scheduler
pub struct DetectionDriver<S, K> {
    source: S,
    sink: K,
    mapper: PresentationMapper,
    scheduler: Arc<CrossfadeScheduler>,
    options: DriverOptions,
    /// Last track handed to the scheduler, for `RetriggerPolicy::OnChange`
    last_requested: Option<TrackId>,
    stats: DriverStats,
}

impl<S, K> DetectionDriver<S, K>
where
    S: ExpressionSource,
    K: PresentationSink,
{
    pub fn new(
        source: S,
        sink: K,
        mapper: PresentationMapper,
        scheduler: Arc<CrossfadeScheduler>,
        options: DriverOptions,
    ) -> Self {
        Self {
            source,
            sink,
            mapper,
            scheduler,
            options,
            last_requested: None,
            stats: DriverStats::default(),
        }
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Poll until the source is exhausted or `shutdown` completes.
    ///
    /// The first poll happens one period after the call.
    pub async fn run<F>(&mut self, shutdown: F) -> DriverStats
    where
        F: Future<Output = ()>,
    {
        let period = self.options.poll_interval;
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        info!("Detection driver polling every {:?}", period);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Detection driver stopping on shutdown");
                    break;
                }
                _ = interval.tick() => {
                    if self.poll_once().await.is_break() {
                        info!("Detection source exhausted");
                        break;
                    }
                }
            }
        }

        info!(
            "Detection driver stopped after {} ticks ({} faces, {} without face, {} source errors)",
            self.stats.ticks, self.stats.faces, self.stats.no_face, self.stats.source_errors
        );
        self.stats
    }

    /// Run one poll tick. `Break` when the source is exhausted.
    pub async fn poll_once(&mut self) -> ControlFlow<()> {
        let detection = match self.source.next_detection().await {
            Ok(Some(detection)) => detection,
            Ok(None) => return ControlFlow::Break(()),
            Err(e) => {
                self.stats.ticks += 1;
                self.stats.source_errors += 1;
                warn!("Skipping detection tick: {}", e);
                return ControlFlow::Continue(());
            }
        };
        self.stats.ticks += 1;

        match detection {
            Detection::NoFace => {
                self.stats.no_face += 1;
                debug!("No face detected");
                self.show(&Presentation::no_detection());
            }
            Detection::Face(scores) => {
                self.stats.faces += 1;
                let (expression, score) = select_dominant(&scores);
                debug!("Dominant expression {} ({:.2})", expression, score);

                let presentation = self.mapper.present(expression);
                self.show(&presentation);

                if let Some(track) = presentation.track {
                    self.request_track(track).await;
                }
            }
        }

        ControlFlow::Continue(())
    }

    fn show(&mut self, presentation: &Presentation) {
        let update = presentation.ui_update(&self.options.ui);
        if let Err(e) = self.sink.apply(&update) {
            warn!("UI sink rejected update: {}", e);
        }
    }

    async fn request_track(&mut self, track: TrackId) {
        if self.options.retrigger == RetriggerPolicy::OnChange
            && self.last_requested.as_ref() == Some(&track)
        {
            debug!("{} already requested, not retriggering", track);
            return;
        }

        self.stats.play_requests += 1;
        match self.scheduler.play_track(Some(track.clone())).await {
            Ok(()) => self.last_requested = Some(track),
            Err(e) => {
                self.stats.play_failures += 1;
                // Nothing is active now, so the next tick may retry
                self.last_requested = None;
                warn!("Failed to play {}: {}", track, e);
            }
        }
    }
}
