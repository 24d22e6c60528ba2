//! Crossfade scheduler
//!
//! Owns the currently active track and the single fade timer.
//!
//! `play_track(next)`:
//! 1. Cancels the running fade, if any (no completion step runs for it).
//! 2. Starts a fade-out on the active track, if any.
//! 3. Instantiates `next` at volume 0, starts it, makes it active and starts
//!    its fade-in.
//!
//! Only one timer exists, so the fade-in of step 3 replaces the fade-out of
//! step 2: an outgoing track is released still playing, frozen at whatever
//! volume it had reached, and plays on until its stream ends.
//! `play_track(None)` skips step 3, so the fade-out runs to silence, then
//! pauses, rewinds and releases the track.
//!
//! Loading a track that the backend has not decoded yet happens on the
//! blocking pool before the state lock is taken, so fade ticks keep running
//! while a file decodes.
//!
//! Every tick re-checks the fade generation under the state lock, so a tick
//! that was already queued when its fade was cancelled does nothing.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use emotune_common::events::{EventBus, PlaybackEvent, SchedulerState};
use emotune_common::TrackId;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::{AudioBackend, TrackResource};
use crate::error::{Error, Result};
use crate::playback::fade::{next_step, FadeDirection, FadeParams};
use crate::playback::timer::RepeatingTask;

/// One live track instance
struct LiveTrack {
    track: TrackId,
    instance_id: Uuid,
    resource: Box<dyn TrackResource>,
}

/// Which instance a fade drives
enum FadeTarget {
    /// The active track (fade-in)
    Active,
    /// A track that is no longer active (fade-out); owned by the fade
    Outgoing(LiveTrack),
}

struct FadeJob {
    generation: u64,
    direction: FadeDirection,
    target: FadeTarget,
    task: RepeatingTask,
}

#[derive(Default)]
struct PlaybackInner {
    active: Option<LiveTrack>,
    fade: Option<FadeJob>,
    generation: u64,
}

impl PlaybackInner {
    fn state(&self) -> SchedulerState {
        match (&self.fade, &self.active) {
            (Some(job), _) if job.direction == FadeDirection::Out => SchedulerState::FadingOut,
            (Some(_), _) => SchedulerState::FadingIn,
            (None, Some(_)) => SchedulerState::Steady,
            (None, None) => SchedulerState::Idle,
        }
    }

    /// Advance the fade started with `generation` by one tick
    fn fade_tick(
        &mut self,
        generation: u64,
        params: &FadeParams,
        events: &EventBus,
    ) -> ControlFlow<()> {
        let PlaybackInner { active, fade, .. } = self;

        let job = match fade.as_mut() {
            Some(job) if job.generation == generation => job,
            // Cancelled or replaced after this tick was queued
            _ => return ControlFlow::Break(()),
        };
        let direction = job.direction;

        let live = match &mut job.target {
            FadeTarget::Outgoing(live) => live,
            FadeTarget::Active => match active.as_mut() {
                Some(live) => live,
                None => {
                    *fade = None;
                    return ControlFlow::Break(());
                }
            },
        };

        let step = next_step(direction, live.resource.volume(), params);
        live.resource.set_volume(step.volume());
        debug!("{} {} volume {:.2}", direction, live.track, step.volume());

        if !step.is_finished() {
            return ControlFlow::Continue(());
        }

        if direction == FadeDirection::Out {
            live.resource.pause();
            live.resource.set_position(Duration::ZERO);
        }

        let track = live.track.clone();
        let instance_id = live.instance_id;
        let volume = step.volume();

        // Dropping the job ends this task and releases an outgoing track
        let finished = fade.take();

        info!("{} of {} complete at volume {:.1}", direction, track, volume);
        events.emit_lossy(PlaybackEvent::FadeCompleted {
            track: track.clone(),
            instance_id,
            direction,
            volume,
            timestamp: chrono::Utc::now(),
        });

        if direction == FadeDirection::Out {
            drop(finished);
            info!("Released {}", track);
            events.emit_lossy(PlaybackEvent::TrackReleased {
                track,
                instance_id,
                timestamp: chrono::Utc::now(),
            });
        }

        ControlFlow::Break(())
    }
}

/// Crossfade scheduler
///
/// Create one per process and share it through `Arc`. Requires a tokio
/// runtime: fades run as tokio tasks.
pub struct CrossfadeScheduler {
    inner: Arc<Mutex<PlaybackInner>>,
    backend: Arc<dyn AudioBackend>,
    params: FadeParams,
    events: EventBus,
}

impl CrossfadeScheduler {
    pub fn new(backend: Arc<dyn AudioBackend>, params: FadeParams, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlaybackInner::default())),
            backend,
            params,
            events,
        }
    }

    pub fn params(&self) -> &FadeParams {
        &self.params
    }

    /// Subscribe to playback events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Crossfade to `track`, or fade to silence when `track` is `None`.
    ///
    /// Always instantiates a fresh resource, even when `track` is already
    /// the active track.
    ///
    /// # Errors
    /// `Error::Audio` / `Error::Decode` when the new track cannot be
    /// instantiated or started. The previous track's fade-out keeps running
    /// in that case and no track is active.
    pub async fn play_track(&self, track: Option<TrackId>) -> Result<()> {
        let loaded = match &track {
            Some(track) if !self.backend.is_loaded(track) => self.load(track).await,
            _ => Ok(()),
        };

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        self.cancel_fade(inner);

        if let Some(outgoing) = inner.active.take() {
            self.start_fade(inner, FadeDirection::Out, FadeTarget::Outgoing(outgoing));
        }

        let Some(track) = track else {
            return Ok(());
        };
        loaded?;

        let mut resource = self.backend.instantiate(&track)?;
        resource.set_volume(0.0);
        resource.play()?;

        let instance_id = Uuid::new_v4();
        info!("Started {} (instance {})", track, instance_id);
        self.events.emit_lossy(PlaybackEvent::TrackStarted {
            track: track.clone(),
            instance_id,
            timestamp: chrono::Utc::now(),
        });

        inner.active = Some(LiveTrack {
            track,
            instance_id,
            resource,
        });

        // Single timer: the fade-in takes over from the fade-out
        self.cancel_fade(inner);
        self.start_fade(inner, FadeDirection::In, FadeTarget::Active);

        Ok(())
    }

    /// Decode `track` on the blocking pool
    async fn load(&self, track: &TrackId) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let track = track.clone();
        tokio::task::spawn_blocking(move || backend.load(&track))
            .await
            .map_err(|e| Error::Audio(format!("Track loading task failed: {}", e)))?
    }

    /// Cancel any fade and release the active track at once
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        self.cancel_fade(inner);
        if let Some(mut live) = inner.active.take() {
            live.resource.pause();
            info!("Released {} on shutdown", live.track);
            self.events.emit_lossy(PlaybackEvent::TrackReleased {
                track: live.track,
                instance_id: live.instance_id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub async fn state(&self) -> SchedulerState {
        self.inner.lock().await.state()
    }

    pub async fn active_track(&self) -> Option<TrackId> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(|live| live.track.clone())
    }

    /// Volume of the active track
    pub async fn volume(&self) -> Option<f32> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(|live| live.resource.volume())
    }

    /// Direction of the running fade, if a fade timer is running
    pub async fn fade_direction(&self) -> Option<FadeDirection> {
        self.inner.lock().await.fade.as_ref().map(|job| job.direction)
    }

    fn start_fade(&self, inner: &mut PlaybackInner, direction: FadeDirection, target: FadeTarget) {
        inner.generation += 1;
        let generation = inner.generation;

        let (track, instance_id) = match &target {
            FadeTarget::Outgoing(live) => (live.track.clone(), live.instance_id),
            FadeTarget::Active => match &inner.active {
                Some(live) => (live.track.clone(), live.instance_id),
                None => return,
            },
        };

        let shared = Arc::clone(&self.inner);
        let events = self.events.clone();
        let params = self.params;

        let task = RepeatingTask::spawn(params.tick_interval, move || {
            let shared = Arc::clone(&shared);
            let events = events.clone();
            async move {
                let mut inner = shared.lock().await;
                inner.fade_tick(generation, &params, &events)
            }
        });

        debug!("Starting {} of {}", direction, track);
        self.events.emit_lossy(PlaybackEvent::FadeStarted {
            track,
            instance_id,
            direction,
            timestamp: chrono::Utc::now(),
        });

        inner.fade = Some(FadeJob {
            generation,
            direction,
            target,
            task,
        });
    }

    /// Stop the running fade where it is. An outgoing track it owned is
    /// released without further volume changes.
    fn cancel_fade(&self, inner: &mut PlaybackInner) {
        let Some(job) = inner.fade.take() else {
            return;
        };
        let FadeJob {
            direction,
            target,
            task,
            ..
        } = job;
        task.cancel();

        let live = match &target {
            FadeTarget::Outgoing(live) => Some(live),
            FadeTarget::Active => inner.active.as_ref(),
        };

        if let Some(live) = live {
            let volume = live.resource.volume();
            info!(
                "{} of {} superseded at volume {:.1}",
                direction, live.track, volume
            );
            self.events.emit_lossy(PlaybackEvent::FadeSuperseded {
                track: live.track.clone(),
                instance_id: live.instance_id,
                direction,
                volume,
                timestamp: chrono::Utc::now(),
            });
        }

        if let FadeTarget::Outgoing(live) = target {
            info!("Released {}", live.track);
            self.events.emit_lossy(PlaybackEvent::TrackReleased {
                track: live.track,
                instance_id: live.instance_id,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}
