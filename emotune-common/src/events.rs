//! Playback event types and event bus
//!
//! The crossfade scheduler reports every state change here. Events are
//! serializable so a UI or log shipper can consume them as JSON.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::presentation::TrackId;

/// Direction of a volume ramp
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    /// Volume rises toward full
    In,
    /// Volume falls toward silence
    Out,
}

impl std::fmt::Display for FadeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FadeDirection::In => write!(f, "fade-in"),
            FadeDirection::Out => write!(f, "fade-out"),
        }
    }
}

/// Scheduler state as observed from outside
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No active track, no timer
    Idle,
    /// Fade-out timer running
    FadingOut,
    /// Fade-in timer running on the active track
    FadingIn,
    /// Active track at full volume, no timer
    Steady,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::FadingOut => write!(f, "fading_out"),
            SchedulerState::FadingIn => write!(f, "fading_in"),
            SchedulerState::Steady => write!(f, "steady"),
        }
    }
}

/// Events emitted by the crossfade scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaybackEvent {
    /// A fresh track instance was created and started
    TrackStarted {
        track: TrackId,
        instance_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fade timer was started
    FadeStarted {
        track: TrackId,
        instance_id: Uuid,
        direction: FadeDirection,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A running fade was cancelled before reaching its target
    FadeSuperseded {
        track: TrackId,
        instance_id: Uuid,
        direction: FadeDirection,
        /// Volume the track was left at
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fade reached its floor or ceiling
    FadeCompleted {
        track: TrackId,
        instance_id: Uuid,
        direction: FadeDirection,
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A faded-out instance was stopped, rewound and released
    TrackReleased {
        track: TrackId,
        instance_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlaybackEvent {
    /// Instance the event refers to
    pub fn instance_id(&self) -> Uuid {
        match self {
            PlaybackEvent::TrackStarted { instance_id, .. }
            | PlaybackEvent::FadeStarted { instance_id, .. }
            | PlaybackEvent::FadeSuperseded { instance_id, .. }
            | PlaybackEvent::FadeCompleted { instance_id, .. }
            | PlaybackEvent::TrackReleased { instance_id, .. } => *instance_id,
        }
    }
}

/// Broadcast bus for playback events
///
/// Events emitted before a subscriber joins are not delivered to it.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlaybackEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
