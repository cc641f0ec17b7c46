//! Sample rate conversion using rubato
//!
//! Decoded files are converted once, to the output device rate, before a
//! slot plays them.

use crate::audio::decoder::PcmBuffer;
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Convert `pcm` to `target_rate`
///
/// Buffers already at the target rate are passed through untouched.
pub fn resample(pcm: PcmBuffer, target_rate: u32) -> Result<PcmBuffer> {
    if pcm.sample_rate == target_rate || pcm.samples.is_empty() {
        return Ok(PcmBuffer {
            samples: pcm.samples,
            sample_rate: target_rate,
        });
    }
    if pcm.sample_rate == 0 || target_rate == 0 {
        return Err(Error::Decode(format!(
            "cannot resample {} Hz to {} Hz",
            pcm.sample_rate, target_rate
        )));
    }

    let planar = deinterleave(&pcm.samples);
    let frames = planar[0].len();
    debug!(
        "Resampling {} frames from {} Hz to {} Hz",
        frames, pcm.sample_rate, target_rate
    );

    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / pcm.sample_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        frames,
        2,
    )
    .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

    let output = resampler
        .process(&planar, None)
        .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

    Ok(PcmBuffer {
        samples: interleave(&output),
        sample_rate: target_rate,
    })
}

/// Interleaved stereo to `[left, right]`
fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
    let frames = samples.len() / 2;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks_exact(2) {
        left.push(frame[0]);
        right.push(frame[1]);
    }
    vec![left, right]
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let (Some(left), Some(right)) = (planar.first(), planar.get(1)) else {
        return Vec::new();
    };
    left.iter()
        .zip(right)
        .flat_map(|(l, r)| [*l, *r])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join_stereo() {
        let planar = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(interleave(&planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_same_rate_passes_through() {
        let pcm = PcmBuffer {
            samples: vec![0.1, 0.2, 0.3, 0.4],
            sample_rate: 48_000,
        };
        let out = resample(pcm.clone(), 48_000).unwrap();
        assert_eq!(out, pcm);
    }

    #[test]
    fn test_rate_change_scales_length() {
        let frames = 4_410;
        let samples: Vec<f32> = (0..frames)
            .flat_map(|i| {
                let v = (i as f32 * 0.01).sin() * 0.5;
                [v, v]
            })
            .collect();
        let pcm = PcmBuffer {
            samples,
            sample_rate: 44_100,
        };

        let out = resample(pcm, 48_000).unwrap();
        assert_eq!(out.sample_rate, 48_000);
        // 0.1s either way, allowing for the resampler's edge frames
        assert!(out.frames() > 4_000 && out.frames() < 5_600, "got {}", out.frames());
    }
}
