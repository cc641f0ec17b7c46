//! Track-change state machine
//!
//! ```text
//! Idle -> Loading -> Priming -> Transitioning -> Idle (swapped)
//!            \          \             \
//!             +----------+-------------+--> Idle (failed, no swap)
//! ```
//!
//! Only one track change may be in flight. A request made while the machine
//! is not `Idle` is rejected with [`Error::TransitionInFlight`] and leaves
//! everything untouched.
//!
//! The separate `advance_triggered` flag stops the near-end auto-advance and
//! the end-of-media fallback from both advancing the same track. It is
//! cleared whenever a track change completes or fails.

use crate::error::{Error, Result};
use cloude_common::events::SlotId;
use serde::Serialize;
use tracing::trace;

/// Track-change phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum TransitionState {
    Idle,
    /// Incoming slot is receiving its source and routing
    Loading { incoming: SlotId },
    /// Incoming gain is set to its starting point
    Priming { incoming: SlotId },
    /// Incoming slot is playing; the swap happens on completion
    Transitioning {
        outgoing: SlotId,
        incoming: SlotId,
        crossfade: bool,
    },
}

impl TransitionState {
    pub fn name(&self) -> &'static str {
        match self {
            TransitionState::Idle => "idle",
            TransitionState::Loading { .. } => "loading",
            TransitionState::Priming { .. } => "priming",
            TransitionState::Transitioning { .. } => "transitioning",
        }
    }
}

/// Guarded transition state plus the auto-advance flag
#[derive(Debug, Clone)]
pub struct TransitionMachine {
    state: TransitionState,
    advance_triggered: bool,
}

impl Default for TransitionMachine {
    fn default() -> Self {
        Self {
            state: TransitionState::Idle,
            advance_triggered: false,
        }
    }
}

impl TransitionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    /// True while a track change is in flight
    pub fn is_busy(&self) -> bool {
        self.state != TransitionState::Idle
    }

    pub fn advance_triggered(&self) -> bool {
        self.advance_triggered
    }

    /// Claim the auto-advance for the current track
    ///
    /// Returns false when it was already claimed.
    pub fn claim_advance(&mut self) -> bool {
        if self.advance_triggered {
            return false;
        }
        self.advance_triggered = true;
        true
    }

    pub fn clear_advance(&mut self) {
        self.advance_triggered = false;
    }

    /// Idle -> Loading
    pub fn begin_load(&mut self, incoming: SlotId) -> Result<()> {
        if self.is_busy() {
            return Err(Error::TransitionInFlight);
        }
        self.set(TransitionState::Loading { incoming });
        self.advance_triggered = true;
        Ok(())
    }

    /// Loading -> Priming
    pub fn prime(&mut self) -> Result<SlotId> {
        match self.state {
            TransitionState::Loading { incoming } => {
                self.set(TransitionState::Priming { incoming });
                Ok(incoming)
            }
            other => Err(invalid("prime", other)),
        }
    }

    /// Priming -> Transitioning
    pub fn start(&mut self, outgoing: SlotId, crossfade: bool) -> Result<SlotId> {
        match self.state {
            TransitionState::Priming { incoming } => {
                self.set(TransitionState::Transitioning {
                    outgoing,
                    incoming,
                    crossfade,
                });
                Ok(incoming)
            }
            other => Err(invalid("start", other)),
        }
    }

    /// Loading or Transitioning -> Idle, returning `(outgoing, incoming)`
    ///
    /// Loading completes directly when a track is cued without playback.
    pub fn complete(&mut self, outgoing: SlotId) -> Result<(SlotId, SlotId)> {
        let pair = match self.state {
            TransitionState::Transitioning {
                outgoing, incoming, ..
            } => (outgoing, incoming),
            TransitionState::Loading { incoming } => (outgoing, incoming),
            other => return Err(invalid("complete", other)),
        };
        self.reset();
        Ok(pair)
    }

    /// Any phase -> Idle without a swap
    pub fn fail(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.set(TransitionState::Idle);
        self.advance_triggered = false;
    }

    fn set(&mut self, state: TransitionState) {
        trace!("Transition {} -> {}", self.state.name(), state.name());
        self.state = state;
    }
}

fn invalid(op: &str, state: TransitionState) -> Error {
    Error::InvalidState(format!("cannot {} while {}", op, state.name()))
}
