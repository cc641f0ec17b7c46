//! Audio graph model
//!
//! The processing graph the engine routes playback slots through: node arena
//! and edges, automatable parameters, the injectable clock, and the reverb
//! impulse generator. The decoder, resampler, mixer and output modules carry
//! the audible signal path to the device.

pub mod clock;
pub mod decoder;
pub mod graph;
pub mod impulse;
pub mod mixer;
pub mod output;
pub mod param;
pub mod resampler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use graph::{AudioGraph, ContextState, Edge, FilterType, Node, NodeId, ParamKind};
pub use impulse::ImpulseResponse;
pub use mixer::{Mixer, Voice};
pub use output::AudioOutput;
pub use param::AudioParam;
