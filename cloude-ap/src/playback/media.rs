//! Playback elements
//!
//! A [`MediaElement`] is the thing a slot plays: it holds one media source,
//! reports position/duration, and flags end-of-media. The engine never
//! decodes audio itself; it only drives elements and the gain graph.
//!
//! [`SimulatedMedia`] derives its position from the shared [`Clock`], which
//! is what lets the whole engine run under a `ManualClock` in tests. The
//! audible element is `FileMedia` in `file_media.rs`.

use crate::audio::clock::Clock;
use crate::error::{Error, Result};
use cloude_common::events::SlotId;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Media loaded into a slot
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub path: PathBuf,

    /// Zero when the file failed to load
    pub duration_seconds: f64,
}

impl MediaSource {
    pub fn new(path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
        }
    }
}

/// A playback element driven by the engine
pub trait MediaElement: Send {
    /// Replace the current source; the element is paused at position 0
    fn load(&mut self, source: MediaSource);

    fn has_source(&self) -> bool;

    fn source_path(&self) -> Option<PathBuf>;

    /// Start or resume playback
    ///
    /// Fails with [`Error::PlayRejected`] when the element refuses to start.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Position in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Duration in seconds, zero when unknown
    fn duration(&self) -> f64;

    /// Report end-of-media once; the element is paused at its end afterwards
    fn take_ended(&mut self) -> bool;

    /// Level the element should be heard at (slot gain times master)
    ///
    /// Elements without an audible output ignore it.
    fn set_output_gain(&mut self, _gain: f32) {}
}

#[derive(Debug)]
struct SimulatedState {
    source: Option<MediaSource>,
    paused: bool,
    /// Position at `anchor`
    position: f64,
    /// Clock time playback last (re)started
    anchor: f64,
    ended_reported: bool,
    reject_play: Option<String>,
    output_gain: f32,
}

/// Clock-driven playback element
///
/// Clones share state, so a test can keep a handle to an element the engine
/// owns and inspect it or make it reject playback.
#[derive(Clone)]
pub struct SimulatedMedia {
    slot: SlotId,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedMedia {
    pub fn new(slot: SlotId, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot,
            clock,
            state: Arc::new(Mutex::new(SimulatedState {
                source: None,
                paused: true,
                position: 0.0,
                anchor: 0.0,
                ended_reported: false,
                reject_play: None,
                output_gain: 0.0,
            })),
        }
    }

    /// Make subsequent `play()` calls fail with `reason` (None to allow again)
    pub fn set_reject_play(&self, reason: Option<&str>) {
        self.lock().reject_play = reason.map(str::to_string);
    }

    /// Last level published by the engine
    pub fn output_gain(&self) -> f32 {
        self.lock().output_gain
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        // Poisoning only happens if a test panicked while holding the lock
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn position_of(&self, state: &SimulatedState) -> f64 {
        let duration = state
            .source
            .as_ref()
            .map(|s| s.duration_seconds)
            .unwrap_or(0.0);
        if !(duration > 0.0) {
            return 0.0;
        }
        if state.paused {
            return state.position;
        }
        let elapsed = (self.clock.now() - state.anchor).max(0.0);
        (state.position + elapsed).min(duration)
    }
}

impl MediaElement for SimulatedMedia {
    fn load(&mut self, source: MediaSource) {
        debug!(
            "Slot {} loading {} ({:.2}s)",
            self.slot,
            source.path.display(),
            source.duration_seconds
        );
        let mut state = self.lock();
        state.source = Some(source);
        state.paused = true;
        state.position = 0.0;
        state.ended_reported = false;
    }

    fn has_source(&self) -> bool {
        self.lock().source.is_some()
    }

    fn source_path(&self) -> Option<PathBuf> {
        self.lock().source.as_ref().map(|s| s.path.clone())
    }

    fn play(&mut self) -> Result<()> {
        let now = self.clock.now();
        let mut state = self.lock();
        if state.source.is_none() {
            return Err(Error::PlayRejected {
                slot: self.slot,
                reason: "no source loaded".to_string(),
            });
        }
        if let Some(reason) = &state.reject_play {
            return Err(Error::PlayRejected {
                slot: self.slot,
                reason: reason.clone(),
            });
        }
        if state.paused {
            // Playing an element that reached its end starts it over
            let duration = state.source.as_ref().map_or(0.0, |s| s.duration_seconds);
            if duration > 0.0 && state.position >= duration {
                state.position = 0.0;
                state.ended_reported = false;
            }
            state.paused = false;
            state.anchor = now;
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        if !state.paused {
            state.position = self.position_of(&state);
            state.paused = true;
        }
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn current_time(&self) -> f64 {
        let state = self.lock();
        self.position_of(&state)
    }

    fn set_current_time(&mut self, seconds: f64) {
        let now = self.clock.now();
        let mut state = self.lock();
        let duration = state
            .source
            .as_ref()
            .map(|s| s.duration_seconds)
            .unwrap_or(0.0);
        let target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        state.position = if duration > 0.0 { target.min(duration) } else { 0.0 };
        state.anchor = now;
        if state.position < duration {
            state.ended_reported = false;
        }
    }

    fn duration(&self) -> f64 {
        self.lock()
            .source
            .as_ref()
            .map(|s| s.duration_seconds)
            .unwrap_or(0.0)
    }

    fn take_ended(&mut self) -> bool {
        let mut state = self.lock();
        let duration = state
            .source
            .as_ref()
            .map(|s| s.duration_seconds)
            .unwrap_or(0.0);
        if state.paused || state.ended_reported || !(duration.is_finite() && duration > 0.0) {
            return false;
        }
        if self.position_of(&state) < duration {
            return false;
        }
        state.position = duration;
        state.paused = true;
        state.ended_reported = true;
        true
    }

    fn set_output_gain(&mut self, gain: f32) {
        self.lock().output_gain = gain;
    }
}

impl std::fmt::Debug for SimulatedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedMedia")
            .field("slot", &self.slot)
            .field("source", &state.source)
            .field("paused", &state.paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;

    fn element() -> (SimulatedMedia, ManualClock) {
        let clock = ManualClock::new();
        (SimulatedMedia::new(SlotId::A, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_play_without_source_rejected() {
        let (mut media, _) = element();
        assert!(matches!(media.play(), Err(Error::PlayRejected { .. })));
        assert!(media.is_paused());
    }

    #[test]
    fn test_position_advances_with_clock() {
        let (mut media, clock) = element();
        media.load(MediaSource::new("a.flac", 10.0));
        media.play().unwrap();
        clock.advance(2.5);
        assert!((media.current_time() - 2.5).abs() < 1e-9);

        media.pause();
        clock.advance(5.0);
        assert!((media.current_time() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_end_reported_once() {
        let (mut media, clock) = element();
        media.load(MediaSource::new("a.flac", 3.0));
        media.play().unwrap();
        clock.advance(2.0);
        assert!(!media.take_ended());
        clock.advance(1.5);
        assert!(media.take_ended());
        assert!(!media.take_ended());
        assert!(media.is_paused());
        assert_eq!(media.current_time(), 3.0);
    }

    #[test]
    fn test_zero_duration_never_progresses() {
        let (mut media, clock) = element();
        media.load(MediaSource::new("broken.mp3", 0.0));
        media.play().unwrap();
        clock.advance(10.0);
        assert_eq!(media.current_time(), 0.0);
        assert!(!media.take_ended());
    }

    #[test]
    fn test_seek_and_rewind() {
        let (mut media, clock) = element();
        media.load(MediaSource::new("a.flac", 60.0));
        media.play().unwrap();
        media.set_current_time(30.0);
        clock.advance(1.0);
        assert!((media.current_time() - 31.0).abs() < 1e-9);

        media.set_current_time(1000.0);
        assert_eq!(media.current_time(), 60.0);
        media.set_current_time(-4.0);
        assert_eq!(media.current_time(), 0.0);
    }

    #[test]
    fn test_rejection_shared_between_clones() {
        let (mut media, _) = element();
        let handle = media.clone();
        media.load(MediaSource::new("a.flac", 10.0));
        handle.set_reject_play(Some("autoplay blocked"));
        match media.play() {
            Err(Error::PlayRejected { slot, reason }) => {
                assert_eq!(slot, SlotId::A);
                assert_eq!(reason, "autoplay blocked");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        handle.set_reject_play(None);
        assert!(media.play().is_ok());
        assert!(!handle.is_paused());
    }
}
