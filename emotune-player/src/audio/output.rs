//! Audio output using cpal
//!
//! One output stream is opened for the whole process. Every track instance
//! is a [`Voice`]. New voices reach the audio callback through a lock-free
//! queue ([`MixerHandle`] on the runtime side, [`Mixer`] on the callback
//! side); the callback sums all playing voices at their own volume.
//!
//! Dropping the owner of a voice does not silence it. A voice stays in the
//! mix until nobody else holds it and it is no longer playing, either
//! because its owner paused it first or because it reached the end of its
//! samples.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream lives on a
//! dedicated thread that holds it until the [`OutputDevice`] is dropped.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, info, warn};

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};

/// Voices that can wait between two audio callbacks
const VOICE_QUEUE_CAPACITY: usize = 64;

/// One playable instance of a decoded track
#[derive(Debug)]
pub struct Voice {
    /// Interleaved stereo samples at the device rate
    samples: Arc<[f32]>,
    /// Next frame to render
    cursor: AtomicUsize,
    /// f32 volume stored as bits
    volume: AtomicU32,
    playing: AtomicBool,
}

impl Voice {
    /// New voice, paused at position 0 with volume 1.0
    pub fn new(samples: Arc<[f32]>) -> Self {
        Self {
            samples,
            cursor: AtomicUsize::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
            playing: AtomicBool::new(false),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    /// Move the play cursor, clamped to the end of the track
    pub fn seek_frame(&self, frame: usize) {
        self.cursor.store(frame.min(self.frames()), Ordering::SeqCst);
    }

    pub fn position_frame(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Render the next frame, advancing the cursor. Playback stops at the end.
    fn next_frame(&self) -> Option<AudioFrame> {
        if !self.is_playing() {
            return None;
        }

        let frame_idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let sample_idx = frame_idx * 2;
        if sample_idx + 1 >= self.samples.len() {
            self.cursor.store(self.frames(), Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
            return None;
        }

        let frame = AudioFrame::from_stereo(self.samples[sample_idx], self.samples[sample_idx + 1]);
        Some(frame.scaled(self.volume()))
    }
}

/// Runtime side of the mixer: hands new voices to the audio callback
pub struct MixerHandle {
    incoming: Mutex<HeapProd<Arc<Voice>>>,
    voice_count: Arc<AtomicUsize>,
}

impl MixerHandle {
    /// Queue a voice for the mix
    ///
    /// # Errors
    /// `Error::Audio` when the callback has fallen behind and the queue is full.
    pub fn add_voice(&self, voice: Arc<Voice>) -> Result<()> {
        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_push(voice)
            .map_err(|_| Error::Audio("Mixer voice queue is full".to_string()))
    }

    /// Voices in the mix as of the last callback
    pub fn voice_count(&self) -> usize {
        self.voice_count.load(Ordering::Relaxed)
    }
}

/// Callback side of the mixer. Owned by the audio callback; never locks.
pub struct Mixer {
    incoming: HeapCons<Arc<Voice>>,
    voices: Vec<Arc<Voice>>,
    voice_count: Arc<AtomicUsize>,
}

impl Mixer {
    /// Create a connected handle and mixer
    pub fn new() -> (MixerHandle, Mixer) {
        let (producer, consumer) = HeapRb::<Arc<Voice>>::new(VOICE_QUEUE_CAPACITY).split();
        let voice_count = Arc::new(AtomicUsize::new(0));

        let handle = MixerHandle {
            incoming: Mutex::new(producer),
            voice_count: Arc::clone(&voice_count),
        };
        let mixer = Mixer {
            incoming: consumer,
            voices: Vec::with_capacity(VOICE_QUEUE_CAPACITY),
            voice_count,
        };
        (handle, mixer)
    }

    /// Voices kept in the mix
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Fill `out` with stereo frames, summing all playing voices
    pub fn render(&mut self, out: &mut [AudioFrame]) {
        while let Some(voice) = self.incoming.try_pop() {
            self.voices.push(voice);
        }

        for slot in out.iter_mut() {
            let mut frame = AudioFrame::zero();
            for voice in self.voices.iter() {
                if let Some(voice_frame) = voice.next_frame() {
                    frame.mix(voice_frame);
                }
            }
            *slot = frame.clamped();
        }

        // Orphaned voices play out to the end, then leave the mix
        self.voices
            .retain(|voice| voice.is_playing() || Arc::strong_count(voice) > 1);
        self.voice_count.store(self.voices.len(), Ordering::Relaxed);
    }
}

/// Audio output device running on its own thread
pub struct OutputDevice {
    mixer: Arc<MixerHandle>,
    sample_rate: u32,
    device_name: String,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl OutputDevice {
    /// Open the named device (or the default device) and start the stream.
    ///
    /// Falls back to the default device when the named one is not found.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let (handle, mixer) = Mixer::new();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, String)>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let requested = device_name.map(str::to_string);

        let thread = thread::Builder::new()
            .name("emotune-audio".to_string())
            .spawn(move || match start_stream(requested, mixer) {
                Ok((stream, sample_rate, name)) => {
                    let _ = ready_tx.send(Ok((sample_rate, name)));
                    // Hold the stream until the device is dropped
                    let _ = shutdown_rx.recv();
                    if let Err(e) = stream.pause() {
                        warn!("Failed to pause audio stream: {}", e);
                    }
                    drop(stream);
                    debug!("Audio thread exiting");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })?;

        let (sample_rate, device_name) = ready_rx
            .recv()
            .map_err(|_| Error::Audio("Audio thread exited during startup".to_string()))??;

        info!("Audio output started on '{}' at {}Hz", device_name, sample_rate);

        Ok(Self {
            mixer: Arc::new(handle),
            sample_rate,
            device_name,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn mixer(&self) -> &Arc<MixerHandle> {
        &self.mixer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for OutputDevice {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

/// Select the device, build the stream and start it. Runs on the audio thread.
fn start_stream(requested: Option<String>, mixer: Mixer) -> Result<(Stream, u32, String)> {
    let host = cpal::default_host();
    let device = select_device(&host, requested.as_deref())?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = device
        .default_output_config()
        .map_err(|e| Error::Audio(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    debug!(
        "Audio config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer)?,
        other => {
            return Err(Error::Audio(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    };

    stream
        .play()
        .map_err(|e| Error::Audio(format!("Failed to start stream: {}", e)))?;

    Ok((stream, config.sample_rate.0, name))
}

fn select_device(host: &cpal::Host, requested: Option<&str>) -> Result<Device> {
    if let Some(name) = requested {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::Audio(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    host.default_output_device()
        .ok_or_else(|| Error::Audio("No default output device found".to_string()))
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mut mixer: Mixer) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch: Vec<AudioFrame> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                scratch.resize(frames, AudioFrame::zero());
                mixer.render(&mut scratch);

                for (out, frame) in data.chunks_mut(channels).zip(scratch.iter()) {
                    write_frame(out, *frame);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None, // No timeout
        )
        .map_err(|e| Error::Audio(format!("Failed to build stream: {}", e)))
}

/// Write one stereo frame into a device frame of any channel count
fn write_frame<T: SizedSample + FromSample<f32>>(out: &mut [T], frame: AudioFrame) {
    match out.len() {
        0 => {}
        1 => out[0] = T::from_sample((frame.left + frame.right) * 0.5),
        _ => {
            out[0] = T::from_sample(frame.left);
            out[1] = T::from_sample(frame.right);
            for extra in out.iter_mut().skip(2) {
                *extra = T::EQUILIBRIUM;
            }
        }
    }
}
