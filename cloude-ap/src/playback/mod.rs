//! Dual-slot playback: slots, gains, routing, effects, crossfades, queue

pub mod crossfade;
pub mod effects;
pub mod engine;
pub mod file_media;
pub mod gain_registry;
pub mod media;
pub mod monitor;
pub mod queue;
pub mod routing;
pub mod slots;
pub mod timer;
pub mod transition;

pub use engine::{EngineSnapshot, LoadOutcome, PlayerEngine};
pub use monitor::start_ticker;
pub use queue::{PlayQueue, RepeatMode};
