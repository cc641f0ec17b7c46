//! Per-slot gain nodes and the master output
//!
//! Each slot's media source feeds exactly one gain node. That link is made
//! the first time the gain is requested and is never touched again; routing
//! only ever rewires the gain node's output.

use crate::audio::graph::{AudioGraph, NodeId};
use crate::error::Result;
use cloude_common::events::SlotId;
use std::collections::HashMap;
use tracing::debug;

/// Near-silent gain used instead of zero for ramp starting points
pub const GAIN_FLOOR: f32 = 0.0001;

/// Level of an audible slot; loudness is set on the master stage only
pub const SLOT_UNITY: f32 = 1.0;

/// Lazily created gain nodes keyed by slot, plus the master stage
#[derive(Debug, Default)]
pub struct GainRegistry {
    master: Option<NodeId>,
    gains: HashMap<SlotId, NodeId>,
}

impl GainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Master gain, created at unity and connected to the destination
    pub fn ensure_master(&mut self, graph: &mut AudioGraph) -> Result<NodeId> {
        if let Some(master) = self.master {
            return Ok(master);
        }

        let master = graph.create_gain(1.0);
        graph.connect(master, graph.destination())?;
        debug!("Created master gain {}", master);
        self.master = Some(master);
        Ok(master)
    }

    pub fn master(&self) -> Option<NodeId> {
        self.master
    }

    /// Persistent gain node for `slot`
    ///
    /// Creates the media source and the source -> gain link on first call.
    /// Also creates the master stage if it does not exist yet.
    pub fn gain_node_for(&mut self, graph: &mut AudioGraph, slot: SlotId) -> Result<NodeId> {
        self.ensure_master(graph)?;
        if let Some(gain) = self.gains.get(&slot) {
            return Ok(*gain);
        }

        let source = match graph.media_source(slot) {
            Some(source) => source,
            None => graph.create_media_element_source(slot)?,
        };
        let gain = graph.create_gain(1.0);
        graph.connect(source, gain)?;
        debug!("Slot {} wired: source {} -> gain {}", slot, source, gain);

        self.gains.insert(slot, gain);
        Ok(gain)
    }

    /// Gain node for `slot` if it has been created
    pub fn gain_node(&self, slot: SlotId) -> Option<NodeId> {
        self.gains.get(&slot).copied()
    }
}
