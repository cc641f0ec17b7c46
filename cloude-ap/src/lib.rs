//! # CloudE Audio Player Library (cloude-ap)
//!
//! Dual-slot playback engine with equal-power crossfades and a hot-swappable
//! stereo effects chain.
//!
//! **Purpose:** Keep two interchangeable playback slots, route their gains
//! through an in-process audio graph, crossfade between them, and expose
//! control over HTTP with an SSE event stream.
//!
//! **Architecture:**
//! - `audio`: graph model (nodes, edges, automatable parameters, clock)
//! - `playback`: slots, gain registry, effects chain, routing, crossfade
//!   scheduling, queue and the engine tying them together
//! - `library` / `lyrics`: local track scanning and LRC timing
//! - `api`: axum router and SSE

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod lyrics;
pub mod playback;

pub use error::{Error, Result};
pub use playback::engine::PlayerEngine;
