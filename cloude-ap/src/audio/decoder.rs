//! Whole-file decoding with symphonia
//!
//! A slot plays from memory: the file is decoded up front into interleaved
//! stereo f32. Mono is duplicated to both sides; channels past the first two
//! are dropped.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded audio as interleaved stereo frames
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Left/right pair at `index`, silence past the end
    pub fn frame(&self, index: usize) -> (f32, f32) {
        match self.samples.get(index * 2..index * 2 + 2) {
            Some([left, right]) => (*left, *right),
            _ => (0.0, 0.0),
        }
    }
}

/// Decode the first audio track of `path`
pub fn decode_file(path: &Path) -> Result<PcmBuffer> {
    debug!("Decoding {}", path.display());

    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode(format!("{}: no audio track", path.display())))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode(format!("{}: unknown sample rate", path.display())))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                warn!("Stopped reading {}: {}", path.display(), e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet; the rest of the stream is usually fine
                warn!("Skipping bad packet in {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                warn!("Decoder stopped on {}: {}", path.display(), e);
                break;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        append_stereo(buffer.samples(), channels, &mut samples);
    }

    let pcm = PcmBuffer {
        samples,
        sample_rate,
    };
    debug!(
        "Decoded {}: {} frames at {} Hz ({:.2}s)",
        path.display(),
        pcm.frames(),
        sample_rate,
        pcm.duration_seconds()
    );
    Ok(pcm)
}

/// Append `interleaved` (with `channels` per frame) to `out` as stereo
fn append_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            out.reserve(interleaved.len() * 2);
            for sample in interleaved {
                out.push(*sample);
                out.push(*sample);
            }
        }
        _ => {
            out.reserve(interleaved.len() / channels * 2);
            for frame in interleaved.chunks_exact(channels) {
                out.push(frame[0]);
                out.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_duplicated_to_both_sides() {
        let mut out = Vec::new();
        append_stereo(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_extra_channels_dropped() {
        let mut out = Vec::new();
        append_stereo(&[1.0, 2.0, 9.0, 3.0, 4.0, 9.0], 3, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_frame_access_past_end_is_silent() {
        let pcm = PcmBuffer {
            samples: vec![0.5, -0.5, 0.25, -0.25],
            sample_rate: 4,
        };
        assert_eq!(pcm.frames(), 2);
        assert_eq!(pcm.duration_seconds(), 0.5);
        assert_eq!(pcm.frame(1), (0.25, -0.25));
        assert_eq!(pcm.frame(2), (0.0, 0.0));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = decode_file(Path::new("/nonexistent/cloude/track.flac"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_non_audio_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"definitely not an mpeg stream").unwrap();
        assert!(matches!(decode_file(&path), Err(Error::Decode(_))));
    }
}
