//! Audio backends
//!
//! A backend turns a [`TrackId`] into a fresh playable resource. Resources
//! are never pooled: every call to [`AudioBackend::instantiate`] returns a new
//! instance with its own volume and position. Decoded sample data may be
//! shared between instances of the same file.
//!
//! Dropping a resource that is still playing does not stop it: the mixer
//! plays it out at its last volume. Pause a resource before dropping it to
//! silence it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use emotune_common::TrackId;
use tracing::{debug, info};

use crate::audio::decode::decode_file;
use crate::audio::output::{MixerHandle, OutputDevice, Voice};
use crate::audio::resampler::Resampler;
use crate::error::Result;

/// A playable audio instance
pub trait TrackResource: Send {
    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Set volume; values outside [0, 1] are clamped
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Move the play position
    fn set_position(&mut self, position: Duration);
}

/// Factory for track resources
pub trait AudioBackend: Send + Sync {
    /// Create a fresh, paused instance of `track`
    fn instantiate(&self, track: &TrackId) -> Result<Box<dyn TrackResource>>;

    /// Whether `instantiate` can run without decoding
    fn is_loaded(&self, _track: &TrackId) -> bool {
        true
    }

    /// Decode `track` ahead of `instantiate`. May block.
    fn load(&self, _track: &TrackId) -> Result<()> {
        Ok(())
    }
}

/// Backend that plays through the system output device
pub struct CpalBackend {
    output: OutputDevice,
    tracks: MixerBackend,
}

impl CpalBackend {
    /// Open the output device. `device` selects a device by name.
    pub fn open(device: Option<&str>) -> Result<Self> {
        let output = OutputDevice::open(device)?;
        let tracks = MixerBackend::new(Arc::clone(output.mixer()), output.sample_rate());
        Ok(Self { output, tracks })
    }

    pub fn device_name(&self) -> &str {
        self.output.device_name()
    }
}

impl AudioBackend for CpalBackend {
    fn instantiate(&self, track: &TrackId) -> Result<Box<dyn TrackResource>> {
        self.tracks.instantiate(track)
    }

    fn is_loaded(&self, track: &TrackId) -> bool {
        self.tracks.is_loaded(track)
    }

    fn load(&self, track: &TrackId) -> Result<()> {
        self.tracks.load(track)
    }
}

/// Backend feeding voices to a mixer, whoever renders it
pub struct MixerBackend {
    mixer: Arc<MixerHandle>,
    sample_rate: u32,
    /// Decoded PCM at the mixer rate, keyed by file path
    cache: Mutex<HashMap<PathBuf, Arc<[f32]>>>,
}

impl MixerBackend {
    pub fn new(mixer: Arc<MixerHandle>, sample_rate: u32) -> Self {
        Self {
            mixer,
            sample_rate,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, path: &Path) -> Option<Arc<[f32]>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Decoded samples for `path`, decoding on first use
    fn samples_for(&self, path: &Path) -> Result<Arc<[f32]>> {
        if let Some(samples) = self.cached(path) {
            return Ok(samples);
        }

        let decoded = decode_file(path)?;
        let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, self.sample_rate, 2)?;
        let samples: Arc<[f32]> = Arc::from(samples);

        info!(
            "Loaded track {} ({:.1}s)",
            path.display(),
            samples.len() as f64 / 2.0 / self.sample_rate as f64
        );

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), Arc::clone(&samples));

        Ok(samples)
    }
}

impl AudioBackend for MixerBackend {
    fn instantiate(&self, track: &TrackId) -> Result<Box<dyn TrackResource>> {
        let samples = self.samples_for(track.path())?;
        let voice = Arc::new(Voice::new(samples));
        self.mixer.add_voice(Arc::clone(&voice))?;

        Ok(Box::new(MixerTrack {
            voice,
            sample_rate: self.sample_rate,
        }))
    }

    fn is_loaded(&self, track: &TrackId) -> bool {
        self.cached(track.path()).is_some()
    }

    fn load(&self, track: &TrackId) -> Result<()> {
        self.samples_for(track.path()).map(|_| ())
    }
}

/// Track instance rendered by the mixer
struct MixerTrack {
    voice: Arc<Voice>,
    sample_rate: u32,
}

impl TrackResource for MixerTrack {
    fn play(&mut self) -> Result<()> {
        self.voice.set_playing(true);
        Ok(())
    }

    fn pause(&mut self) {
        self.voice.set_playing(false);
    }

    fn set_volume(&mut self, volume: f32) {
        self.voice.set_volume(volume);
    }

    fn volume(&self) -> f32 {
        self.voice.volume()
    }

    fn set_position(&mut self, position: Duration) {
        let frame = (position.as_secs_f64() * self.sample_rate as f64) as usize;
        self.voice.seek_frame(frame);
    }
}

/// Silent backend: resources only track their state.
///
/// Used when audio is disabled or no output device is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl AudioBackend for NullBackend {
    fn instantiate(&self, track: &TrackId) -> Result<Box<dyn TrackResource>> {
        debug!("Null backend instantiating {}", track);
        Ok(Box::new(NullTrack::default()))
    }
}

/// Resource of the silent backend
#[derive(Debug)]
pub struct NullTrack {
    volume: f32,
    position: Duration,
    playing: bool,
}

impl NullTrack {
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Duration {
        self.position
    }
}

impl Default for NullTrack {
    fn default() -> Self {
        Self {
            volume: 1.0,
            position: Duration::ZERO,
            playing: false,
        }
    }
}

impl TrackResource for NullTrack {
    fn play(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_position(&mut self, position: Duration) {
        self.position = position;
    }
}
