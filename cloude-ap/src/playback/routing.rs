//! Downstream routing of slot gain nodes

use crate::audio::graph::{AudioGraph, NodeId};
use crate::error::Result;
use serde::Serialize;
use tracing::trace;

/// Where a slot gain currently sends its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Straight into the master stage
    Direct,
    /// Through the effects chain input
    Effects,
}

/// Replace every outgoing edge of `gain` with a single edge to `target`
///
/// The gain's incoming source edge is left alone.
pub fn connect_exclusive(graph: &mut AudioGraph, gain: NodeId, target: NodeId) -> Result<()> {
    let removed = graph.disconnect(gain);
    graph.connect(gain, target)?;
    trace!("Gain {} routed to {} (replaced {} edges)", gain, target, removed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_exactly_one_downstream_edge() {
        let mut graph = AudioGraph::new(48_000, Arc::new(ManualClock::new()));
        let gain = graph.create_gain(1.0);
        let master = graph.create_gain(1.0);
        let fx = graph.create_gain(1.0);

        connect_exclusive(&mut graph, gain, master).unwrap();
        connect_exclusive(&mut graph, gain, fx).unwrap();
        assert_eq!(graph.downstream(gain), vec![fx]);

        connect_exclusive(&mut graph, gain, master).unwrap();
        connect_exclusive(&mut graph, gain, master).unwrap();
        assert_eq!(graph.downstream(gain), vec![master]);
    }
}
