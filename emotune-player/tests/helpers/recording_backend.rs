//! Audio backend that records every call made on its resources
//!
//! Instances are numbered from 0 in instantiation order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use emotune_common::TrackId;
use emotune_player::audio::{AudioBackend, TrackResource};
use emotune_player::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Instantiate { instance: usize, track: TrackId },
    Play(usize),
    Pause(usize),
    SetVolume(usize, f32),
    SetPosition(usize, Duration),
    /// Resource dropped by the scheduler
    Released(usize),
}

#[derive(Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<Vec<Call>>>,
    next_instance: AtomicUsize,
    fail_instantiate: Mutex<HashSet<TrackId>>,
    fail_play: Mutex<HashSet<TrackId>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `instantiate` fail for `track`
    pub fn fail_instantiate(&self, track: &TrackId) {
        self.fail_instantiate.lock().unwrap().insert(track.clone());
    }

    /// Make `play` fail for new instances of `track`
    pub fn fail_play(&self, track: &TrackId) {
        self.fail_play.lock().unwrap().insert(track.clone());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    /// Tracks in instantiation order
    pub fn instances(&self) -> Vec<TrackId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Instantiate { track, .. } => Some(track),
                _ => None,
            })
            .collect()
    }

    /// Every volume set on `instance`, in order
    pub fn volumes(&self, instance: usize) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetVolume(i, v) if i == instance => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Every volume set on any instance
    pub fn all_volumes(&self) -> Vec<f32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SetVolume(_, v) => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Calls made on `instance` after instantiation
    pub fn calls_for(&self, instance: usize) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| match call {
                Call::Play(i)
                | Call::Pause(i)
                | Call::SetVolume(i, _)
                | Call::SetPosition(i, _)
                | Call::Released(i) => *i == instance,
                Call::Instantiate { .. } => false,
            })
            .collect()
    }

    pub fn is_released(&self, instance: usize) -> bool {
        self.calls().contains(&Call::Released(instance))
    }
}

impl AudioBackend for RecordingBackend {
    fn instantiate(&self, track: &TrackId) -> Result<Box<dyn TrackResource>> {
        if self.fail_instantiate.lock().unwrap().contains(track) {
            return Err(Error::Audio(format!("cannot open {}", track)));
        }

        let instance = self.next_instance.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Call::Instantiate {
            instance,
            track: track.clone(),
        });

        Ok(Box::new(RecordingTrack {
            instance,
            volume: 1.0,
            fail_play: self.fail_play.lock().unwrap().contains(track),
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingTrack {
    instance: usize,
    volume: f32,
    fail_play: bool,
    log: Arc<Mutex<Vec<Call>>>,
}

impl RecordingTrack {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl TrackResource for RecordingTrack {
    fn play(&mut self) -> Result<()> {
        if self.fail_play {
            return Err(Error::Audio("playback refused".to_string()));
        }
        self.record(Call::Play(self.instance));
        Ok(())
    }

    fn pause(&mut self) {
        self.record(Call::Pause(self.instance));
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.record(Call::SetVolume(self.instance, volume));
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_position(&mut self, position: Duration) {
        self.record(Call::SetPosition(self.instance, position));
    }
}

impl Drop for RecordingTrack {
    fn drop(&mut self) {
        self.record(Call::Released(self.instance));
    }
}
