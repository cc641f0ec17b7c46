//! # CloudE Common Library
//!
//! Shared code for the CloudE player crates:
//! - Error type
//! - Fade curve definitions and crossfade curve generation
//! - Persisted player settings and their TOML store
//! - Engine event types and the broadcast EventBus
//! - Time formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
