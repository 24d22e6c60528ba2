//! Audio decoder using symphonia
//!
//! Decodes a whole file into memory. Tracks are short loops associated with
//! an emotion, so full decoding keeps playback free of I/O on the audio
//! thread.
//!
//! # Sample Format
//!
//! - Output: Stereo f32 samples (interleaved: [L, R, L, R, ...])
//! - Mono files: duplicated to stereo
//! - Multi-channel: downmixed to stereo

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::DecodedAudio;
use crate::error::{Error, Result};

/// Decode an audio file to interleaved stereo f32
///
/// # Errors
/// - File missing or unreadable
/// - Container or codec not supported
/// - File contains no decodable audio
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("Failed to open {}: {}", path.display(), e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create hint from file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported format {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Decode(format!("No audio track in {}", path.display())))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported codec in {}: {}", path.display(), e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // EOF
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::Decode(format!(
                    "Failed to read packet from {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame: skip it and keep going
                warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                return Err(Error::Decode(format!(
                    "Decoder failed on {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        append_as_stereo(&mut samples, buffer.samples(), channels);
    }

    if samples.is_empty() {
        return Err(Error::Decode(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    debug!(
        "Decoded {}: {} frames at {}Hz",
        path.display(),
        samples.len() / 2,
        sample_rate
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Append interleaved samples with `channels` channels as interleaved stereo
fn append_as_stereo(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            // Mono: duplicate to stereo
            for &sample in interleaved {
                out.push(sample);
                out.push(sample);
            }
        }
        2 => out.extend_from_slice(interleaved),
        _ => {
            // Multi-channel: even channels to left, odd to right, averaged
            let per_side = channels as f32 / 2.0;
            for frame in interleaved.chunks_exact(channels) {
                let mut left = 0.0f32;
                let mut right = 0.0f32;
                for (ch_idx, sample) in frame.iter().enumerate() {
                    if ch_idx % 2 == 0 {
                        left += sample;
                    } else {
                        right += sample;
                    }
                }
                out.push(left / per_side);
                out.push(right / per_side);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_nonexistent_file() {
        let result = decode_file(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_mono_is_duplicated() {
        let mut out = Vec::new();
        append_as_stereo(&mut out, &[0.1, 0.2], 1);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_stereo_passes_through() {
        let mut out = Vec::new();
        append_as_stereo(&mut out, &[0.1, 0.2, 0.3, 0.4], 2);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_quad_is_downmixed() {
        let mut out = Vec::new();
        append_as_stereo(&mut out, &[0.2, 0.4, 0.6, 0.8], 4);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.4).abs() < 1e-6);
        assert!((out[1] - 0.6).abs() < 1e-6);
    }
}
