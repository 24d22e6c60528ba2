//! Decode and resample generated WAV fixtures through the symphonia path

use std::f32::consts::PI;
use std::path::Path;

use emotune_player::audio::decode::decode_file;
use emotune_player::audio::resampler::Resampler;
use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

const RATE: u32 = 44_100;

/// Write a 440 Hz sine at half scale
fn write_sine(path: &Path, channels: u16, frames: u32) {
    let spec = WavSpec {
        channels,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for n in 0..frames {
        let t = n as f32 / RATE as f32;
        let sample = ((2.0 * PI * 440.0 * t).sin() * 16_384.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn assert_frames_near(actual: usize, expected: usize, tolerance: usize) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= tolerance,
        "expected about {} frames, got {}",
        expected,
        actual
    );
}

#[test]
fn test_decode_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("happy.wav");
    write_sine(&path, 2, RATE / 4);

    let decoded = decode_file(&path).unwrap();

    assert_eq!(decoded.sample_rate, RATE);
    assert_frames_near(decoded.frames(), (RATE / 4) as usize, 4);

    let peak = decoded.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!((peak - 0.5).abs() < 0.01, "peak {}", peak);
}

#[test]
fn test_decode_mono_wav_is_upmixed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sad.wav");
    write_sine(&path, 1, RATE / 10);

    let decoded = decode_file(&path).unwrap();

    assert_frames_near(decoded.frames(), (RATE / 10) as usize, 4);
    for frame in decoded.samples.chunks_exact(2) {
        assert_eq!(frame[0], frame[1]);
    }
}

#[test]
fn test_decode_rejects_non_audio_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.wav");
    std::fs::write(&path, b"definitely not a RIFF file").unwrap();

    assert!(decode_file(&path).is_err());
}

#[test]
fn test_decoded_track_resamples_to_device_rate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fear.wav");
    write_sine(&path, 2, RATE / 2);

    let decoded = decode_file(&path).unwrap();
    let resampled = Resampler::resample(&decoded.samples, decoded.sample_rate, 48_000, 2).unwrap();

    assert_eq!(resampled.len() % 2, 0);
    // Half a second at 48 kHz, allowing for resampler delay
    assert_frames_near(resampled.len() / 2, 24_000, 480);
}
