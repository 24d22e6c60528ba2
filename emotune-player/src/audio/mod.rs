//! Audio subsystem: backends, decoding, resampling and device output

pub mod backend;
pub mod decode;
pub mod output;
pub mod resampler;
pub mod types;

pub use backend::{AudioBackend, CpalBackend, MixerBackend, NullBackend, NullTrack, TrackResource};
pub use types::{AudioFrame, DecodedAudio};
