//! Audio data types

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between voices, the mixer and the output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Scaled copy of this frame
    pub fn scaled(self, volume: f32) -> Self {
        AudioFrame {
            left: self.left * volume,
            right: self.right * volume,
        }
    }

    /// Add another frame into this one
    pub fn mix(&mut self, other: AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Clamp both channels to [-1.0, 1.0]
    pub fn clamped(self) -> Self {
        AudioFrame {
            left: self.left.clamp(-1.0, 1.0),
            right: self.right.clamp(-1.0, 1.0),
        }
    }
}

/// Fully decoded track: interleaved stereo f32 samples [L, R, L, R, ...]
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_and_clamp() {
        let mut frame = AudioFrame::zero();
        frame.mix(AudioFrame::from_stereo(0.8, -0.2).scaled(0.5));
        frame.mix(AudioFrame::from_stereo(0.9, -1.5));
        assert_eq!(frame.clamped(), AudioFrame::from_stereo(1.0, -1.0));
    }

    #[test]
    fn test_decoded_frames() {
        let decoded = DecodedAudio {
            samples: vec![0.0; 10],
            sample_rate: 44100,
        };
        assert_eq!(decoded.frames(), 5);
    }
}
