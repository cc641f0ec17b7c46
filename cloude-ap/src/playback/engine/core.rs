//! Core player engine - construction, graph ownership, routing
//!
//! **Responsibilities:**
//! - PlayerEngine struct definition and construction
//! - Lazy master stage and effects chain (`ensure_master_node`, `ensure_graph`)
//! - Routing of slot gains to the effects input or the master stage
//! - Event emission and settings write-through
//!
//! Every other engine operation lives in a sibling module as a further
//! `impl PlayerEngine` block.

use crate::audio::clock::Clock;
use crate::audio::graph::{AudioGraph, ContextState, NodeId, ParamKind};
use crate::error::Result;
use crate::library::Library;
use crate::playback::crossfade::{CrossfadePlan, CrossfadeScheduler};
use crate::playback::effects::{EffectsGraph, StageValues};
use crate::playback::gain_registry::GainRegistry;
use crate::playback::media::{MediaElement, SimulatedMedia};
use crate::playback::queue::PlayQueue;
use crate::playback::routing::{connect_exclusive, Route};
use crate::playback::slots::PlaybackSlots;
use crate::playback::timer::{TimerId, TimerQueue};
use crate::playback::transition::TransitionMachine;
use cloude_common::config::{PlayerSettings, SettingsStore};
use cloude_common::events::{EngineEvent, EventBus, PlaybackState, SlotId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sample rate of the audio graph
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Remaining time at which gapless mode advances
pub const GAPLESS_THRESHOLD_SECONDS: f64 = 0.25;

/// Time constant of the master volume ramp
pub const VOLUME_RAMP_SECONDS: f64 = 0.1;

/// Work scheduled on the engine's timer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The crossfade between these slots has run its course
    CrossfadeComplete { outgoing: SlotId, incoming: SlotId },
}

/// What a load request ended up doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// Incoming slot is playing; the swap happens when the plan completes
    Crossfading(CrossfadePlan),
    /// Hard cut: the swap already happened
    Swapped,
    /// Loaded and made active without starting playback
    Cued,
    /// Incoming slot refused to play; the previous slot stays active
    Failed,
}

/// Dual-slot player engine
///
/// Owns the audio graph and everything wired into it. All mutation happens
/// through `&mut self`, so callers serialise access (the HTTP layer holds
/// the engine behind a tokio mutex).
pub struct PlayerEngine {
    pub(super) graph: AudioGraph,
    pub(super) registry: GainRegistry,

    /// Built on first need, never rebuilt
    pub(super) effects: Option<EffectsGraph>,

    pub(super) slots: PlaybackSlots,
    pub(super) transition: TransitionMachine,
    pub(super) timers: TimerQueue<TimerEvent>,

    /// Completion timer of the crossfade in flight
    pub(super) crossfade_timer: Option<TimerId>,

    pub(super) scheduler: CrossfadeScheduler,
    pub(super) queue: PlayQueue,
    pub(super) library: Library,
    pub(super) settings: PlayerSettings,
    pub(super) store: Option<SettingsStore>,
    pub(super) playback_state: PlaybackState,
    pub(super) events: EventBus,

    /// Last progress reported, to skip duplicate events while paused
    pub(super) last_progress: Option<(SlotId, f64)>,

    /// Shuffle picks and impulse-response noise
    pub(super) rng: StdRng,
}

impl PlayerEngine {
    /// Engine with two clock-driven simulated media elements
    pub fn new(clock: Arc<dyn Clock>, settings: PlayerSettings, events: EventBus) -> Self {
        let a = SimulatedMedia::new(SlotId::A, Arc::clone(&clock));
        let b = SimulatedMedia::new(SlotId::B, Arc::clone(&clock));
        Self::with_elements(clock, Box::new(a), Box::new(b), settings, events)
    }

    /// Engine over caller-supplied media elements for slots A and B
    pub fn with_elements(
        clock: Arc<dyn Clock>,
        a: Box<dyn MediaElement>,
        b: Box<dyn MediaElement>,
        settings: PlayerSettings,
        events: EventBus,
    ) -> Self {
        let settings = settings.sanitized();
        let scheduler = CrossfadeScheduler::new(
            settings.playback.crossfade_seconds,
            settings.playback.fade_curve,
        );

        info!(
            "Player engine created: volume {:.2}, crossfade {} ({:.1}s), gapless {}, effects {}",
            settings.volume,
            settings.playback.crossfade,
            settings.playback.crossfade_seconds,
            settings.playback.gapless,
            settings.effects.enabled
        );

        Self {
            graph: AudioGraph::new(DEFAULT_SAMPLE_RATE, clock),
            registry: GainRegistry::new(),
            effects: None,
            slots: PlaybackSlots::new(a, b),
            transition: TransitionMachine::new(),
            timers: TimerQueue::new(),
            crossfade_timer: None,
            scheduler,
            queue: PlayQueue::new(),
            library: Library::new(),
            settings,
            store: None,
            playback_state: PlaybackState::Paused,
            events,
            last_progress: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic shuffle and impulse-response noise
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Write settings through `store` whenever they change
    pub fn with_store(mut self, store: SettingsStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Master stage, created on first use at the current volume
    pub fn ensure_master_node(&mut self) -> Result<NodeId> {
        if let Some(master) = self.registry.master() {
            return Ok(master);
        }
        let master = self.registry.ensure_master(&mut self.graph)?;
        self.graph
            .param_mut(master, ParamKind::Gain)?
            .set_value(self.settings.volume)?;
        Ok(master)
    }

    /// Effects chain, built the first time it is needed
    ///
    /// Building applies the current stage values. Later calls return the
    /// same chain.
    pub fn ensure_graph(&mut self) -> Result<&EffectsGraph> {
        let effects = match self.effects.take() {
            Some(effects) => effects,
            None => {
                let master = self.ensure_master_node()?;
                let effects = EffectsGraph::build(&mut self.graph, master, &mut self.rng)?;
                effects.apply(&mut self.graph, &StageValues::compute(&self.settings.effects))?;
                info!("Effects graph ready ({} nodes)", effects.nodes().len());
                effects
            }
        };
        Ok(&*self.effects.insert(effects))
    }

    /// Point the gain of `slot` at the effects input or the master stage
    ///
    /// The gain keeps exactly one downstream edge. Routing into the effects
    /// chain resumes a suspended context.
    pub fn route(&mut self, slot: SlotId) -> Result<Route> {
        let gain = self.registry.gain_node_for(&mut self.graph, slot)?;
        let master = self.ensure_master_node()?;

        if self.settings.effects.enabled {
            let input = self.ensure_graph()?.input();
            connect_exclusive(&mut self.graph, gain, input)?;
            self.resume_context();
            debug!("Slot {} routed through effects", slot);
            Ok(Route::Effects)
        } else {
            connect_exclusive(&mut self.graph, gain, master)?;
            debug!("Slot {} routed direct to master", slot);
            Ok(Route::Direct)
        }
    }

    /// Where the gain of `slot` currently sends its output
    pub fn current_route(&self, slot: SlotId) -> Option<Route> {
        let gain = self.registry.gain_node(slot)?;
        let downstream = self.graph.downstream(gain);
        if let Some(effects) = &self.effects {
            if downstream.contains(&effects.input()) {
                return Some(Route::Effects);
            }
        }
        match self.registry.master() {
            Some(master) if downstream.contains(&master) => Some(Route::Direct),
            _ => None,
        }
    }

    pub(super) fn resume_context(&mut self) {
        if self.graph.state() == ContextState::Suspended {
            self.graph.resume();
        }
    }

    pub(super) fn set_playback_state(&mut self, new_state: PlaybackState) {
        let old_state = self.playback_state;
        if old_state == new_state {
            return;
        }
        self.playback_state = new_state;
        debug!("Playback state {} -> {}", old_state, new_state);
        self.emit(EngineEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn emit(&self, event: EngineEvent) {
        self.events.emit_lossy(event);
    }

    /// Write current settings through the store, if any
    ///
    /// A failed write is logged; the in-memory settings stay authoritative.
    pub(super) fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.settings) {
                warn!("Failed to persist settings to {}: {}", store.path().display(), e);
            }
        }
    }
}

impl std::fmt::Debug for PlayerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerEngine")
            .field("state", &self.playback_state)
            .field("slots", &self.slots)
            .field("transition", &self.transition.state())
            .field("queue_index", &self.queue.index())
            .field("queue_len", &self.queue.len())
            .field("effects_built", &self.effects.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;

    fn engine(settings: PlayerSettings) -> PlayerEngine {
        PlayerEngine::new(Arc::new(ManualClock::new()), settings, EventBus::new(64)).with_seed(7)
    }

    #[test]
    fn test_master_created_at_volume() {
        let mut settings = PlayerSettings::default();
        settings.volume = 0.4;
        let mut engine = engine(settings);

        let master = engine.ensure_master_node().unwrap();
        assert_eq!(engine.ensure_master_node().unwrap(), master);
        assert!((engine.graph.param_value(master, ParamKind::Gain).unwrap() - 0.4).abs() < 1e-6);
        assert_eq!(engine.graph.downstream(master), vec![engine.graph.destination()]);
    }

    #[test]
    fn test_graph_built_once() {
        let mut engine = engine(PlayerSettings::default());
        let first = engine.ensure_graph().unwrap().input();
        let nodes = engine.graph.node_count();
        let second = engine.ensure_graph().unwrap().input();
        assert_eq!(first, second);
        assert_eq!(engine.graph.node_count(), nodes);
    }

    #[test]
    fn test_route_direct_leaves_effects_unbuilt() {
        let mut engine = engine(PlayerSettings::default());
        assert_eq!(engine.route(SlotId::A).unwrap(), Route::Direct);
        assert!(engine.effects.is_none());
        assert_eq!(engine.current_route(SlotId::A), Some(Route::Direct));
        assert_eq!(engine.current_route(SlotId::B), None);
        assert_eq!(engine.graph.state(), ContextState::Suspended);
    }

    #[test]
    fn test_route_effects_resumes_context() {
        let mut settings = PlayerSettings::default();
        settings.effects.enabled = true;
        let mut engine = engine(settings);

        assert_eq!(engine.route(SlotId::A).unwrap(), Route::Effects);
        assert_eq!(engine.current_route(SlotId::A), Some(Route::Effects));
        assert_eq!(engine.graph.state(), ContextState::Running);

        let gain = engine.registry.gain_node(SlotId::A).unwrap();
        assert_eq!(engine.graph.downstream(gain).len(), 1);
    }
}
