//! Two-voice mixer feeding the output device
//!
//! Each playback slot owns one [`Voice`]. The engine publishes the voice's
//! effective gain (slot gain times master) and the render callback glides
//! toward it per frame, so the coarse engine tick never produces steps.

use crate::audio::decoder::PcmBuffer;
use cloude_common::events::SlotId;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Per-frame smoothing coefficient toward the published gain
const GAIN_SMOOTHING: f32 = 0.0015;

#[derive(Debug, Default)]
struct VoiceState {
    /// Bumped on every reset; stale decode results are dropped
    generation: u64,
    buffer: Option<Arc<PcmBuffer>>,
    frame: usize,
    playing: bool,
    end_pending: bool,
    error: Option<String>,
    gain: f32,
}

/// One slot's playback position, decoded audio and gain
#[derive(Debug)]
pub struct Voice {
    state: Mutex<VoiceState>,
    target_gain: AtomicU32,
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice {
    /// Silent, empty voice
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VoiceState::default()),
            target_gain: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VoiceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop the current audio and return the generation for the next one
    pub fn reset(&self) -> u64 {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = VoiceState {
            generation,
            gain: state.gain,
            ..VoiceState::default()
        };
        generation
    }

    /// Install decoded audio for `generation`; ignored if superseded
    pub fn attach(&self, generation: u64, buffer: Arc<PcmBuffer>) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.frame = state.frame.min(buffer.frames());
        state.buffer = Some(buffer);
        true
    }

    /// Mark `generation` as undecodable
    ///
    /// A voice that was already playing reports an end so the engine moves on.
    pub fn fail(&self, generation: u64, reason: String) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.end_pending = state.playing;
        state.playing = false;
        state.error = Some(reason);
        true
    }

    /// Start playing; a voice at its end starts over
    ///
    /// Fails with the decode error when the audio could not be decoded.
    pub fn start(&self) -> std::result::Result<(), String> {
        let mut state = self.lock();
        if let Some(reason) = &state.error {
            return Err(reason.clone());
        }
        if let Some(buffer) = &state.buffer {
            if state.frame >= buffer.frames() {
                state.frame = 0;
            }
        }
        state.end_pending = false;
        state.playing = true;
        Ok(())
    }

    pub fn set_playing(&self, playing: bool) {
        self.lock().playing = playing;
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn is_failed(&self) -> bool {
        self.lock().error.is_some()
    }

    pub fn is_decoded(&self) -> bool {
        self.lock().buffer.is_some()
    }

    pub fn position_frames(&self) -> usize {
        self.lock().frame
    }

    /// Frame count of the decoded audio, `None` while decoding
    pub fn buffer_frames(&self) -> Option<usize> {
        self.lock().buffer.as_ref().map(|b| b.frames())
    }

    /// Move to `frame`, clamped to the decoded length when known
    pub fn seek(&self, frame: usize) {
        let mut state = self.lock();
        let frame = match &state.buffer {
            Some(buffer) => frame.min(buffer.frames()),
            None => frame,
        };
        state.frame = frame;
        state.end_pending = false;
    }

    /// Report a reached end once
    pub fn take_end(&self) -> bool {
        std::mem::take(&mut self.lock().end_pending)
    }

    /// Gain the render callback glides toward
    pub fn set_gain(&self, gain: f32) {
        let gain = if gain.is_finite() { gain.max(0.0) } else { 0.0 };
        self.target_gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    pub fn target_gain(&self) -> f32 {
        f32::from_bits(self.target_gain.load(Ordering::Relaxed))
    }

    /// Add this voice into interleaved stereo `out`
    fn mix_into(&self, out: &mut [f32]) {
        let target = self.target_gain();
        let mut guard = self.lock();
        let VoiceState {
            buffer,
            frame,
            playing,
            end_pending,
            gain,
            ..
        } = &mut *guard;

        let Some(buffer) = buffer.as_ref() else {
            return;
        };
        if !*playing {
            *gain = target;
            return;
        }

        for pair in out.chunks_exact_mut(2) {
            if *frame >= buffer.frames() {
                *playing = false;
                *end_pending = true;
                break;
            }
            *gain += (target - *gain) * GAIN_SMOOTHING;
            let (left, right) = buffer.frame(*frame);
            pair[0] += left * *gain;
            pair[1] += right * *gain;
            *frame += 1;
        }
    }
}

/// The two slot voices summed into one stereo stream
#[derive(Debug, Default)]
pub struct Mixer {
    a: Arc<Voice>,
    b: Arc<Voice>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voice(&self, slot: SlotId) -> Arc<Voice> {
        match slot {
            SlotId::A => Arc::clone(&self.a),
            SlotId::B => Arc::clone(&self.b),
        }
    }

    /// Fill interleaved stereo `out` with the next frames
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        self.a.mix_into(out);
        self.b.mix_into(out);
    }
}
