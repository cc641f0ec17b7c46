//! Player engine
//!
//! **Module Structure:**
//! - `core.rs`: Struct, construction, lazy graph pieces, routing
//! - `playback.rs`: Track changes, crossfade completion, transport, tick
//! - `queue.rs`: next/previous, library and album starts, track intake
//! - `settings.rs`: Effects and playback-mode setters
//! - `diagnostics.rs`: Status accessors and snapshot

mod core;
mod diagnostics;
mod playback;
mod queue;
mod settings;

pub use self::core::{
    LoadOutcome, PlayerEngine, TimerEvent, DEFAULT_SAMPLE_RATE, GAPLESS_THRESHOLD_SECONDS,
    VOLUME_RAMP_SECONDS,
};
pub use diagnostics::{EngineSnapshot, NowPlaying};
