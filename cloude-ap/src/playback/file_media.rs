//! Audible playback element
//!
//! [`FileMedia`] decodes its source on a background thread and plays it
//! through one [`Voice`] of the output mixer. Position comes from the frames
//! the device has consumed, not from the engine clock.

use crate::audio::decoder::decode_file;
use crate::audio::mixer::Voice;
use crate::audio::resampler::resample;
use crate::error::{Error, Result};
use crate::playback::media::{MediaElement, MediaSource};
use cloude_common::events::SlotId;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Slot element backed by a decoded file and a mixer voice
pub struct FileMedia {
    slot: SlotId,
    voice: Arc<Voice>,
    sample_rate: u32,
    source: Option<MediaSource>,
}

impl FileMedia {
    /// Element for `slot` rendering at the device `sample_rate`
    pub fn new(slot: SlotId, voice: Arc<Voice>, sample_rate: u32) -> Self {
        Self {
            slot,
            voice,
            sample_rate: sample_rate.max(1),
            source: None,
        }
    }

    fn rejected(&self, reason: impl Into<String>) -> Error {
        Error::PlayRejected {
            slot: self.slot,
            reason: reason.into(),
        }
    }
}

impl MediaElement for FileMedia {
    fn load(&mut self, source: MediaSource) {
        debug!("Slot {} decoding {}", self.slot, source.path.display());
        let generation = self.voice.reset();
        let voice = Arc::clone(&self.voice);
        let path = source.path.clone();
        let rate = self.sample_rate;
        let slot = self.slot;
        self.source = Some(source);

        let spawned = std::thread::Builder::new()
            .name(format!("cloude-decode-{}", slot))
            .spawn(move || {
                match decode_file(&path).and_then(|pcm| resample(pcm, rate)) {
                    Ok(pcm) => {
                        if !voice.attach(generation, Arc::new(pcm)) {
                            debug!("Slot {} dropped superseded decode of {}", slot, path.display());
                        }
                    }
                    Err(e) => {
                        warn!("Slot {} cannot play {}: {}", slot, path.display(), e);
                        voice.fail(generation, e.to_string());
                    }
                }
            });
        if let Err(e) = spawned {
            error!("Failed to spawn decode thread: {}", e);
            self.voice.fail(generation, e.to_string());
        }
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn source_path(&self) -> Option<PathBuf> {
        self.source.as_ref().map(|s| s.path.clone())
    }

    fn play(&mut self) -> Result<()> {
        if self.source.is_none() {
            return Err(self.rejected("no source loaded"));
        }
        self.voice.start().map_err(|reason| self.rejected(reason))
    }

    fn pause(&mut self) {
        self.voice.set_playing(false);
    }

    fn is_paused(&self) -> bool {
        !self.voice.is_playing()
    }

    fn current_time(&self) -> f64 {
        self.voice.position_frames() as f64 / self.sample_rate as f64
    }

    fn set_current_time(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.voice.seek((seconds * self.sample_rate as f64) as usize);
    }

    fn duration(&self) -> f64 {
        match self.voice.buffer_frames() {
            Some(frames) => frames as f64 / self.sample_rate as f64,
            None => self.source.as_ref().map_or(0.0, |s| s.duration_seconds),
        }
    }

    fn take_ended(&mut self) -> bool {
        self.voice.take_end()
    }

    fn set_output_gain(&mut self, gain: f32) {
        self.voice.set_gain(gain);
    }
}

impl std::fmt::Debug for FileMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMedia")
            .field("slot", &self.slot)
            .field("source", &self.source)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
