//! Synthetic reverb impulse response

use rand::Rng;

/// Default impulse length in seconds
pub const DEFAULT_SECONDS: f64 = 0.22;

/// Default decay exponent
pub const DEFAULT_DECAY: f64 = 2.2;

/// Stereo impulse response for the convolver stage
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: u32,
    channels: [Vec<f32>; 2],
}

impl ImpulseResponse {
    /// Exponentially decaying white noise
    ///
    /// `sample[i] = uniform(-1, 1) * (1 - i/len)^decay` on each channel, with
    /// independent noise per channel.
    pub fn generate<R: Rng>(sample_rate: u32, seconds: f64, decay: f64, rng: &mut R) -> Self {
        let len = (sample_rate as f64 * seconds.max(0.0)).floor() as usize;
        let mut channel = || -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let envelope = (1.0 - i as f64 / len as f64).powf(decay);
                    (rng.gen_range(-1.0f64..=1.0) * envelope) as f32
                })
                .collect()
        };
        let left = channel();
        let right = channel();

        Self {
            sample_rate,
            channels: [left, right],
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }
}
