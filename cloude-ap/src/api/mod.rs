//! HTTP control surface
//!
//! Axum router over the shared engine, plus the SSE event stream.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{build_router, run, AppContext};
