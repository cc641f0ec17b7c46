//! Status accessors and the serialisable engine snapshot

use super::core::PlayerEngine;
use crate::audio::graph::{AudioGraph, ContextState};
use crate::library::{Library, TrackRecord};
use crate::playback::effects::{EffectsGraph, StageValues};
use crate::playback::gain_registry::GainRegistry;
use crate::playback::queue::{PlayQueue, RepeatMode};
use crate::playback::routing::Route;
use crate::playback::slots::PlaybackSlots;
use crate::playback::transition::TransitionState;
use cloude_common::config::{EffectsSettings, PlaybackModes};
use cloude_common::events::{EventBus, PlaybackState, SlotId};
use cloude_common::time::format_clock;
use serde::Serialize;

/// Track summary without embedded lyrics
#[derive(Debug, Clone, Serialize)]
pub struct NowPlaying {
    pub library_index: usize,
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    pub lossless: bool,
    pub hires: bool,
    pub explicit: bool,
}

impl NowPlaying {
    fn from_record(library_index: usize, record: &TrackRecord) -> Self {
        Self {
            library_index,
            id: record.id.clone(),
            title: record.title.clone(),
            artist: record.artist.clone(),
            album: record.album.clone(),
            cover_url: record.cover_url.clone(),
            lossless: record.lossless,
            hires: record.hires,
            explicit: record.explicit,
        }
    }
}

/// Point-in-time view of the engine, as served by `GET /playback/state`
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub state: PlaybackState,
    pub active_slot: SlotId,
    pub transition: TransitionState,
    pub track: Option<NowPlaying>,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    pub position_label: String,
    pub duration_label: String,
    pub queue_index: usize,
    pub queue_len: usize,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    pub route: Option<Route>,
    pub context_running: bool,
    pub effects: EffectsSettings,
    pub stages: StageValues,
    pub modes: PlaybackModes,
}

impl PlayerEngine {
    pub fn snapshot(&self) -> EngineSnapshot {
        let active = self.slots.active_slot();
        let element = self.slots.active();
        let position = element.current_time();
        let duration = element.duration();
        let track = self
            .slots
            .track(active)
            .and_then(|i| self.library.get(i).map(|record| NowPlaying::from_record(i, record)));

        EngineSnapshot {
            state: self.playback_state,
            active_slot: active,
            transition: self.transition.state(),
            track,
            position_seconds: position,
            duration_seconds: duration,
            position_label: format_clock(position),
            duration_label: format_clock(duration),
            queue_index: self.queue.index(),
            queue_len: self.queue.len(),
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
            volume: self.settings.volume,
            route: self.current_route(active),
            context_running: self.graph.state() == ContextState::Running,
            effects: self.settings.effects.clone(),
            stages: self.stage_values(),
            modes: self.settings.playback.clone(),
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    pub fn transition_state(&self) -> TransitionState {
        self.transition.state()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_busy()
    }

    pub fn advance_triggered(&self) -> bool {
        self.transition.advance_triggered()
    }

    pub fn active_slot(&self) -> SlotId {
        self.slots.active_slot()
    }

    pub fn slots(&self) -> &PlaybackSlots {
        &self.slots
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn gain_registry(&self) -> &GainRegistry {
        &self.registry
    }

    /// The effects chain, if it has been built
    pub fn effects_graph(&self) -> Option<&EffectsGraph> {
        self.effects.as_ref()
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Context time of the next pending timer
    pub fn next_timer_due(&self) -> Option<f64> {
        self.timers.next_due()
    }
}
