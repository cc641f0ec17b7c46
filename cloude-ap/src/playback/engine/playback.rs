//! Track changes and transport control
//!
//! **Responsibilities:**
//! - `load_from_queue`: Idle -> Loading -> Priming -> Transitioning -> swap
//! - Crossfade completion via the timer queue
//! - Play/pause, seek, volume
//! - `tick`: progress reporting, end-of-media, early auto-advance
//! - Publishing slot-times-master levels to the elements

use super::core::{LoadOutcome, PlayerEngine, TimerEvent, GAPLESS_THRESHOLD_SECONDS, VOLUME_RAMP_SECONDS};
use crate::audio::graph::ParamKind;
use crate::error::{Error, Result};
use crate::library::TrackRecord;
use crate::playback::gain_registry::{GAIN_FLOOR, SLOT_UNITY};
use crate::playback::media::MediaSource;
use crate::playback::queue::{RepeatMode, Step};
use crate::playback::transition::TransitionState;
use cloude_common::events::{ChangeMode, EngineEvent, PlaybackState, SlotId};
use tracing::{debug, error, info, trace, warn};

/// A load request that passed the in-flight guard
struct PendingLoad {
    index: usize,
    step: Step,
    autoplay: bool,
    crossfade: bool,
    outgoing: SlotId,
    incoming: SlotId,
    track_index: usize,
    track: TrackRecord,
}

impl PlayerEngine {
    /// Load queue entry `index` into the inactive slot
    ///
    /// Rejected with [`Error::TransitionInFlight`] while another track
    /// change is running; nothing is touched in that case. With `autoplay`
    /// off the track is cued: made active and left paused.
    pub fn load_from_queue(&mut self, index: usize, autoplay: bool) -> Result<LoadOutcome> {
        self.load_entry(index, autoplay, Step::Forward)
    }

    pub(super) fn load_entry(&mut self, index: usize, autoplay: bool, step: Step) -> Result<LoadOutcome> {
        if self.transition.is_busy() {
            warn!(
                "Load of queue entry {} rejected: transition {} in flight",
                index,
                self.transition.state().name()
            );
            return Err(Error::TransitionInFlight);
        }

        let track_index = self.queue.get(index).ok_or_else(|| {
            Error::Queue(format!(
                "Queue index {} out of range ({} entries)",
                index,
                self.queue.len()
            ))
        })?;
        let track = self
            .library
            .get(track_index)
            .cloned()
            .ok_or_else(|| Error::Queue(format!("Library index {} out of range", track_index)))?;

        let outgoing = self.slots.active_slot();
        let incoming = self.slots.inactive_slot();
        let crossfade = autoplay
            && self.settings.playback.crossfade
            && self.slots.element(outgoing).has_source()
            && !self.slots.element(outgoing).is_paused();

        self.transition.begin_load(incoming)?;
        info!(
            "Loading '{}' (queue {}) into slot {} ({})",
            track.title,
            index,
            incoming,
            if !autoplay {
                "cue"
            } else if crossfade {
                "crossfade"
            } else {
                "instant"
            }
        );

        let load = PendingLoad {
            index,
            step,
            autoplay,
            crossfade,
            outgoing,
            incoming,
            track_index,
            track,
        };
        let result = self.run_transition(load);
        if let Err(e) = &result {
            error!("Track change to slot {} aborted: {}", incoming, e);
            self.crossfade_timer = None;
            self.transition.fail();
        }
        self.publish_gains();
        result
    }

    fn run_transition(&mut self, load: PendingLoad) -> Result<LoadOutcome> {
        let PendingLoad {
            index,
            step,
            autoplay,
            crossfade,
            outgoing,
            incoming,
            track_index,
            track,
        } = load;

        // Loading: source in, routing established before playback
        self.slots
            .element_mut(incoming)
            .load(MediaSource::new(&track.path, track.duration_seconds));
        self.slots.set_track(incoming, Some(track_index));
        self.route(incoming)?;

        self.emit(EngineEvent::TrackChanged {
            queue_index: index,
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            path: track.path.to_string_lossy().to_string(),
            mode: if crossfade {
                ChangeMode::Crossfade
            } else {
                ChangeMode::Instant
            },
            timestamp: chrono::Utc::now(),
        });

        if !autoplay {
            return self.cue(outgoing, index, step);
        }

        // Priming: the incoming gain gets a defined starting point
        self.transition.prime()?;
        let now = self.graph.current_time();
        let in_gain = self.registry.gain_node_for(&mut self.graph, incoming)?;
        {
            let param = self.graph.param_mut(in_gain, ParamKind::Gain)?;
            param.cancel_scheduled_values(now);
            param.set_value_at_time(if crossfade { GAIN_FLOOR } else { SLOT_UNITY }, now)?;
        }

        self.resume_context();

        if let Err(e) = self.slots.element_mut(incoming).play() {
            warn!("Slot {} refused to play '{}': {}", incoming, track.title, e);
            self.transition.fail();
            self.set_playback_state(PlaybackState::Paused);
            self.emit(EngineEvent::TransitionFailed {
                slot: incoming,
                reason: e.to_string(),
                timestamp: chrono::Utc::now(),
            });
            return Ok(LoadOutcome::Failed);
        }

        self.queue.commit(index, step);
        self.set_playback_state(PlaybackState::Playing);
        self.transition.start(outgoing, crossfade)?;
        self.emit(EngineEvent::TransitionStarted {
            outgoing,
            incoming,
            crossfade,
            timestamp: chrono::Utc::now(),
        });

        if crossfade {
            let out_gain = self.registry.gain_node_for(&mut self.graph, outgoing)?;
            let plan = self.scheduler.schedule(&mut self.graph, out_gain, in_gain, SLOT_UNITY)?;
            self.crossfade_timer = Some(
                self.timers
                    .schedule(plan.completes_at, TimerEvent::CrossfadeComplete { outgoing, incoming }),
            );
            info!(
                "Crossfade slot {} -> {} running until {:.2}s",
                outgoing, incoming, plan.completes_at
            );
            Ok(LoadOutcome::Crossfading(plan))
        } else {
            let element = self.slots.element_mut(outgoing);
            element.pause();
            element.set_current_time(0.0);
            self.finish_swap(outgoing)?;
            Ok(LoadOutcome::Swapped)
        }
    }

    /// Make the freshly loaded slot active without playing it
    fn cue(&mut self, outgoing: SlotId, index: usize, step: Step) -> Result<LoadOutcome> {
        let element = self.slots.element_mut(outgoing);
        element.pause();
        element.set_current_time(0.0);
        self.queue.commit(index, step);
        self.set_playback_state(PlaybackState::Paused);
        self.finish_swap(outgoing)?;
        Ok(LoadOutcome::Cued)
    }

    /// Swap the active designation and reset the outgoing slot
    pub(super) fn finish_swap(&mut self, outgoing: SlotId) -> Result<()> {
        let (outgoing, incoming) = self.transition.complete(outgoing)?;
        self.crossfade_timer = None;
        self.slots.swap_to(incoming);

        let element = self.slots.element_mut(outgoing);
        element.pause();
        element.set_current_time(0.0);

        let now = self.graph.current_time();
        if let Some(out_gain) = self.registry.gain_node(outgoing) {
            let param = self.graph.param_mut(out_gain, ParamKind::Gain)?;
            param.cancel_scheduled_values(now);
            param.set_value_at_time(GAIN_FLOOR, now)?;
        }
        let in_gain = self.registry.gain_node_for(&mut self.graph, incoming)?;
        {
            let param = self.graph.param_mut(in_gain, ParamKind::Gain)?;
            param.cancel_scheduled_values(now);
            param.set_value_at_time(SLOT_UNITY, now)?;
        }
        self.route(incoming)?;
        self.last_progress = None;

        info!("Slot {} is now active", incoming);
        self.emit(EngineEvent::TransitionCompleted {
            active: incoming,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Finish a running crossfade now, ahead of its timer
    pub(super) fn settle_transition(&mut self) -> Result<()> {
        if let TransitionState::Transitioning { outgoing, .. } = self.transition.state() {
            if let Some(id) = self.crossfade_timer.take() {
                self.timers.cancel(id);
            }
            debug!("Settling crossfade early");
            self.finish_swap(outgoing)?;
        }
        Ok(())
    }

    /// Fire every timer due at the current time
    pub fn poll_timers(&mut self) {
        let now = self.graph.current_time();
        for event in self.timers.poll(now) {
            match event {
                TimerEvent::CrossfadeComplete { outgoing, incoming } => {
                    let expected = TransitionState::Transitioning {
                        outgoing,
                        incoming,
                        crossfade: true,
                    };
                    if self.transition.state() != expected {
                        debug!("Stale crossfade timer for {} -> {}", outgoing, incoming);
                        continue;
                    }
                    if let Err(e) = self.finish_swap(outgoing) {
                        error!("Crossfade completion failed: {}", e);
                        self.transition.fail();
                    }
                }
            }
        }
    }

    /// Play or pause the active slot
    ///
    /// A running crossfade is completed first so the toggle applies to the
    /// track the user is hearing.
    pub fn toggle_play(&mut self) -> Result<PlaybackState> {
        self.settle_transition()?;

        let active = self.slots.active_slot();
        if !self.slots.active().has_source() {
            debug!("Toggle ignored: slot {} has no source", active);
            return Ok(self.playback_state);
        }

        if self.slots.active().is_paused() {
            self.route(active)?;
            let now = self.graph.current_time();
            let gain = self.registry.gain_node_for(&mut self.graph, active)?;
            {
                let param = self.graph.param_mut(gain, ParamKind::Gain)?;
                param.cancel_scheduled_values(now);
                param.set_value_at_time(SLOT_UNITY, now)?;
            }
            self.resume_context();

            match self.slots.active_mut().play() {
                Ok(()) => self.set_playback_state(PlaybackState::Playing),
                Err(e) => {
                    warn!("Slot {} refused to resume: {}", active, e);
                    self.set_playback_state(PlaybackState::Paused);
                }
            }
        } else {
            self.slots.active_mut().pause();
            self.set_playback_state(PlaybackState::Paused);
        }
        self.publish_gains();
        Ok(self.playback_state)
    }

    /// Seek the active slot to `ratio` of its duration
    ///
    /// Returns the new position, or `None` when the duration is unknown.
    pub fn seek_ratio(&mut self, ratio: f64) -> Option<f64> {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        let element = self.slots.active_mut();
        let duration = element.duration();
        if !(duration.is_finite() && duration > 0.0) {
            return None;
        }
        let position = ratio * duration;
        element.set_current_time(position);
        debug!("Seek to {:.2}s of {:.2}s", position, duration);
        Some(position)
    }

    /// Seek the active slot to `seconds`, clamped to its duration
    ///
    /// Used to jump to a lyric line. Returns `None` when the duration is
    /// unknown.
    pub fn seek_seconds(&mut self, seconds: f64) -> Option<f64> {
        let element = self.slots.active_mut();
        let duration = element.duration();
        if !(duration.is_finite() && duration > 0.0) {
            return None;
        }
        let position = if seconds.is_finite() {
            seconds.clamp(0.0, duration)
        } else {
            0.0
        };
        element.set_current_time(position);
        debug!("Seek to {:.2}s", position);
        Some(position)
    }

    /// Ramp the master stage to `volume` (clamped to 0..=1)
    pub fn set_volume(&mut self, volume: f32) -> Result<f32> {
        if !volume.is_finite() {
            return Err(cloude_common::Error::InvalidInput(format!("volume {}", volume)).into());
        }
        let volume = volume.clamp(0.0, 1.0);
        self.settings.volume = volume;

        let master = self.ensure_master_node()?;
        let now = self.graph.current_time();
        let param = self.graph.param_mut(master, ParamKind::Gain)?;
        param.cancel_scheduled_values(now);
        param.set_target_at_time(volume, now, VOLUME_RAMP_SECONDS)?;

        debug!("Volume -> {:.2}", volume);
        self.publish_gains();
        self.emit(EngineEvent::VolumeChanged {
            volume,
            timestamp: chrono::Utc::now(),
        });
        self.persist();
        Ok(volume)
    }

    /// Advance engine time-driven behaviour
    ///
    /// Fires due timers, reports progress of the active slot, dispatches
    /// end-of-media for the active slot, then evaluates the early
    /// auto-advance. Element levels follow the graph afterwards.
    pub fn tick(&mut self) -> Result<()> {
        let result = self.tick_inner();
        self.publish_gains();
        result
    }

    fn tick_inner(&mut self) -> Result<()> {
        self.poll_timers();
        self.report_progress();

        let active = self.slots.active_slot();
        for slot in SlotId::both() {
            if self.slots.element_mut(slot).take_ended() {
                if slot == active {
                    self.on_ended(slot)?;
                } else {
                    trace!("Inactive slot {} ended", slot);
                }
            }
        }

        self.check_auto_advance()
    }

    /// Hand each element the level it is heard at: its slot gain times the
    /// master gain, both read at the current graph time
    pub(super) fn publish_gains(&mut self) {
        let master = self
            .registry
            .master()
            .and_then(|node| self.graph.param_value(node, ParamKind::Gain).ok())
            .unwrap_or(self.settings.volume);
        for slot in SlotId::both() {
            let gain = self
                .registry
                .gain_node(slot)
                .and_then(|node| self.graph.param_value(node, ParamKind::Gain).ok())
                .unwrap_or(0.0);
            self.slots.element_mut(slot).set_output_gain(gain * master);
        }
    }

    fn report_progress(&mut self) {
        let slot = self.slots.active_slot();
        let element = self.slots.active();
        if !element.has_source() {
            return;
        }
        let position = element.current_time();
        let duration = element.duration();
        if self.last_progress == Some((slot, position)) {
            return;
        }
        self.last_progress = Some((slot, position));
        self.emit(EngineEvent::Progress {
            slot,
            position_seconds: position,
            duration_seconds: duration,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Natural end of media on `slot`
    ///
    /// Only the active slot advances. Repeat-one restarts it instead. The
    /// advance is skipped when an early trigger already claimed this track.
    pub fn on_ended(&mut self, slot: SlotId) -> Result<()> {
        if slot != self.slots.active_slot() {
            debug!("Ignoring end of inactive slot {}", slot);
            return Ok(());
        }

        if self.queue.repeat() == RepeatMode::One {
            info!("Repeat one: restarting slot {}", slot);
            let element = self.slots.element_mut(slot);
            element.set_current_time(0.0);
            if let Err(e) = element.play() {
                warn!("Slot {} refused to restart: {}", slot, e);
                self.set_playback_state(PlaybackState::Paused);
            }
            return Ok(());
        }

        if self.transition.is_busy() || !self.transition.claim_advance() {
            debug!("End of slot {} already handled", slot);
            return Ok(());
        }

        info!("Slot {} reached its end", slot);
        self.advance()
    }

    fn check_auto_advance(&mut self) -> Result<()> {
        if self.playback_state != PlaybackState::Playing
            || self.transition.is_busy()
            || self.transition.advance_triggered()
            || self.queue.repeat() == RepeatMode::One
            || !self.queue.has_next()
        {
            return Ok(());
        }

        let element = self.slots.active();
        if !element.has_source() || element.is_paused() {
            return Ok(());
        }
        let duration = element.duration();
        if !(duration.is_finite() && duration > 0.0) {
            return Ok(());
        }
        let remaining = duration - element.current_time();

        let modes = &self.settings.playback;
        let due = if modes.crossfade {
            remaining <= modes.crossfade_seconds
        } else if modes.gapless {
            remaining <= GAPLESS_THRESHOLD_SECONDS
        } else {
            false
        };
        if !due || !self.transition.claim_advance() {
            return Ok(());
        }

        info!("Auto-advance with {:.2}s remaining", remaining);
        self.advance()
    }

    fn advance(&mut self) -> Result<()> {
        match self.next_song() {
            Ok(_) => Ok(()),
            Err(e) => {
                self.transition.clear_advance();
                Err(e)
            }
        }
    }
}
