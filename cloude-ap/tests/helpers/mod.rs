//! Test helpers for cloude-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - Harness: engine over a manual clock with inspectable media elements
//! - track: library records without touching the filesystem
//! - drain: collect the events emitted so far

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use cloude_ap::audio::clock::ManualClock;
use cloude_ap::audio::graph::ParamKind;
use cloude_ap::library::{FileStamp, RawTags, TrackRecord};
use cloude_ap::playback::media::SimulatedMedia;
use cloude_ap::PlayerEngine;
use cloude_common::config::PlayerSettings;
use cloude_common::events::{EngineEvent, EventBus, SlotId};
use tokio::sync::broadcast;

/// Engine plus handles the engine does not expose
pub struct Harness {
    pub engine: PlayerEngine,
    pub clock: ManualClock,
    pub a: SimulatedMedia,
    pub b: SimulatedMedia,
    pub events: EventBus,
    pub rx: broadcast::Receiver<EngineEvent>,
}

impl Harness {
    /// Engine with `durations.len()` tracks added (the first one cued)
    pub fn new(settings: PlayerSettings, durations: &[f64]) -> Self {
        let clock = ManualClock::new();
        let shared: Arc<ManualClock> = Arc::new(clock.clone());
        let a = SimulatedMedia::new(SlotId::A, shared.clone());
        let b = SimulatedMedia::new(SlotId::B, shared.clone());
        let events = EventBus::new(1024);
        let rx = events.subscribe();

        let mut engine = PlayerEngine::with_elements(
            shared,
            Box::new(a.clone()),
            Box::new(b.clone()),
            settings,
            events.clone(),
        )
        .with_seed(42);

        let tracks: Vec<TrackRecord> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| track(i, *d))
            .collect();
        if !tracks.is_empty() {
            engine.add_tracks(tracks).unwrap();
        }

        Self {
            engine,
            clock,
            a,
            b,
            events,
            rx,
        }
    }

    /// Media handle for `slot`
    pub fn media(&self, slot: SlotId) -> &SimulatedMedia {
        match slot {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    /// Current value of the gain stage for `slot`
    pub fn slot_gain(&self, slot: SlotId) -> f32 {
        let node = self.engine.gain_registry().gain_node(slot).unwrap();
        self.engine.graph().param_value(node, ParamKind::Gain).unwrap()
    }

    /// Level `slot` is heard at: its gain times the master gain
    pub fn output_gain(&self, slot: SlotId) -> f32 {
        let master = self.engine.gain_registry().master().unwrap();
        let master_gain = self.engine.graph().param_value(master, ParamKind::Gain).unwrap();
        self.slot_gain(slot) * master_gain
    }

    /// Advance the clock and run one engine tick
    pub fn step(&mut self, seconds: f64) {
        self.clock.advance(seconds);
        self.engine.tick().unwrap();
    }

    /// Events emitted since the last drain
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        drain(&mut self.rx)
    }
}

/// Settings with crossfade at `volume`, effects off
pub fn crossfade_settings(volume: f32) -> PlayerSettings {
    let mut settings = PlayerSettings::default();
    settings.volume = volume;
    settings.playback.crossfade = true;
    settings.playback.gapless = false;
    settings
}

/// Settings with gapless on and crossfade off
pub fn gapless_settings() -> PlayerSettings {
    let mut settings = PlayerSettings::default();
    settings.playback.crossfade = false;
    settings.playback.gapless = true;
    settings
}

/// Library record for track `n` lasting `duration` seconds
pub fn track(n: usize, duration: f64) -> TrackRecord {
    let path = PathBuf::from(format!("/music/Album {}/{:02} Track.mp3", n / 10, n));
    let tags = RawTags {
        title: Some(format!("Track {}", n)),
        artist: Some("Test Artist".to_string()),
        album: Some(format!("Album {}", n / 10)),
        picture: None,
    };
    let stamp = FileStamp {
        size: 1_000 + n as u64,
        modified_ms: 1_700_000_000_000,
    };
    TrackRecord::normalize(&path, tags, stamp, duration)
}

/// Collect every event currently buffered in `rx`
pub fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Names of `events`, in order
pub fn event_types(events: &[EngineEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.event_type()).collect()
}
