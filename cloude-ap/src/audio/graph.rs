//! In-process audio graph
//!
//! Nodes live in an arena indexed by [`NodeId`]; connections are explicit
//! [`Edge`]s between an output port of one node and an input port of another.
//! The graph owns every automatable parameter, so routing and gain automation
//! can both be inspected at any point in (clock) time.
//!
//! Nodes are never removed. The only lifecycle operations are connect and
//! disconnect, matching how the player treats its gain nodes and effects
//! chain as session-long objects.

use crate::audio::clock::Clock;
use crate::audio::impulse::ImpulseResponse;
use crate::audio::param::AudioParam;
use crate::error::{Error, Result};
use cloude_common::events::SlotId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Handle to a node in an [`AudioGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Biquad filter shapes used by the tone stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    LowShelf,
    Peaking,
}

/// Named parameter on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Gain,
    Frequency,
    Q,
    Threshold,
    Knee,
    Ratio,
    Attack,
    Release,
}

/// Node variants
#[derive(Debug, Clone)]
pub enum Node {
    Destination,
    MediaSource {
        slot: SlotId,
    },
    Gain {
        gain: AudioParam,
    },
    Biquad {
        filter: FilterType,
        frequency: AudioParam,
        q: AudioParam,
        gain: AudioParam,
    },
    Splitter {
        channels: usize,
    },
    Merger {
        channels: usize,
    },
    Convolver {
        buffer: Option<ImpulseResponse>,
    },
    Compressor {
        threshold: AudioParam,
        knee: AudioParam,
        ratio: AudioParam,
        attack: AudioParam,
        release: AudioParam,
    },
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Destination => "destination",
            Node::MediaSource { .. } => "media_source",
            Node::Gain { .. } => "gain",
            Node::Biquad { .. } => "biquad",
            Node::Splitter { .. } => "splitter",
            Node::Merger { .. } => "merger",
            Node::Convolver { .. } => "convolver",
            Node::Compressor { .. } => "compressor",
        }
    }

    pub fn number_of_inputs(&self) -> usize {
        match self {
            Node::MediaSource { .. } => 0,
            Node::Merger { channels } => *channels,
            _ => 1,
        }
    }

    pub fn number_of_outputs(&self) -> usize {
        match self {
            Node::Destination => 0,
            Node::Splitter { channels } => *channels,
            _ => 1,
        }
    }

    fn param(&self, kind: ParamKind) -> Option<&AudioParam> {
        match (self, kind) {
            (Node::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Node::Biquad { gain, .. }, ParamKind::Gain) => Some(gain),
            (Node::Biquad { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (Node::Biquad { q, .. }, ParamKind::Q) => Some(q),
            (Node::Compressor { threshold, .. }, ParamKind::Threshold) => Some(threshold),
            (Node::Compressor { knee, .. }, ParamKind::Knee) => Some(knee),
            (Node::Compressor { ratio, .. }, ParamKind::Ratio) => Some(ratio),
            (Node::Compressor { attack, .. }, ParamKind::Attack) => Some(attack),
            (Node::Compressor { release, .. }, ParamKind::Release) => Some(release),
            _ => None,
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match (self, kind) {
            (Node::Gain { gain }, ParamKind::Gain) => Some(gain),
            (Node::Biquad { gain, .. }, ParamKind::Gain) => Some(gain),
            (Node::Biquad { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (Node::Biquad { q, .. }, ParamKind::Q) => Some(q),
            (Node::Compressor { threshold, .. }, ParamKind::Threshold) => Some(threshold),
            (Node::Compressor { knee, .. }, ParamKind::Knee) => Some(knee),
            (Node::Compressor { ratio, .. }, ParamKind::Ratio) => Some(ratio),
            (Node::Compressor { attack, .. }, ParamKind::Attack) => Some(attack),
            (Node::Compressor { release, .. }, ParamKind::Release) => Some(release),
            _ => None,
        }
    }
}

/// Connection from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub output: usize,
    pub to: NodeId,
    pub input: usize,
}

/// Processing state of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Suspended,
    Running,
}

/// Arena of nodes, edges and their parameters
pub struct AudioGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    destination: NodeId,
    state: ContextState,
    sample_rate: u32,
    clock: Arc<dyn Clock>,
    sources: HashMap<SlotId, NodeId>,
}

impl AudioGraph {
    /// Create a suspended graph containing only the destination
    pub fn new(sample_rate: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            nodes: vec![Node::Destination],
            edges: Vec::new(),
            destination: NodeId(0),
            state: ContextState::Suspended,
            sample_rate,
            clock,
            sources: HashMap::new(),
        }
    }

    /// Current context time in seconds
    pub fn current_time(&self) -> f64 {
        self.clock.now()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn resume(&mut self) {
        if self.state != ContextState::Running {
            debug!("Audio graph resumed");
            self.state = ContextState::Running;
        }
    }

    pub fn create_gain(&mut self, value: f32) -> NodeId {
        self.push(Node::Gain {
            gain: AudioParam::new(value),
        })
    }

    pub fn create_biquad(&mut self, filter: FilterType, frequency: f32, q: f32, gain_db: f32) -> NodeId {
        self.push(Node::Biquad {
            filter,
            frequency: AudioParam::new(frequency),
            q: AudioParam::new(q),
            gain: AudioParam::new(gain_db),
        })
    }

    pub fn create_splitter(&mut self, channels: usize) -> NodeId {
        self.push(Node::Splitter { channels })
    }

    pub fn create_merger(&mut self, channels: usize) -> NodeId {
        self.push(Node::Merger { channels })
    }

    pub fn create_convolver(&mut self, buffer: ImpulseResponse) -> NodeId {
        self.push(Node::Convolver {
            buffer: Some(buffer),
        })
    }

    /// Dynamics compressor with the default threshold/ratio of a fresh node
    pub fn create_compressor(&mut self, knee: f32, attack: f32, release: f32) -> NodeId {
        self.push(Node::Compressor {
            threshold: AudioParam::new(-24.0),
            knee: AudioParam::new(knee),
            ratio: AudioParam::new(12.0),
            attack: AudioParam::new(attack),
            release: AudioParam::new(release),
        })
    }

    /// Wrap a playback element as a graph source
    ///
    /// Each element can be wrapped exactly once for the life of the graph.
    pub fn create_media_element_source(&mut self, slot: SlotId) -> Result<NodeId> {
        if self.sources.contains_key(&slot) {
            return Err(Error::SourceAlreadyExists(slot));
        }
        let id = self.push(Node::MediaSource { slot });
        self.sources.insert(slot, id);
        Ok(id)
    }

    pub fn media_source(&self, slot: SlotId) -> Option<NodeId> {
        self.sources.get(&slot).copied()
    }

    /// Connect output 0 of `from` to input 0 of `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.connect_ports(from, 0, to, 0)
    }

    /// Connect a specific output port to a specific input port
    ///
    /// Connecting an existing edge again is a no-op.
    pub fn connect_ports(&mut self, from: NodeId, output: usize, to: NodeId, input: usize) -> Result<()> {
        let source = self.node_checked(from)?;
        if output >= source.number_of_outputs() {
            return Err(Error::Graph(format!(
                "{} node {} has no output {}",
                source.kind_name(),
                from,
                output
            )));
        }
        let target = self.node_checked(to)?;
        if input >= target.number_of_inputs() {
            return Err(Error::Graph(format!(
                "{} node {} has no input {}",
                target.kind_name(),
                to,
                input
            )));
        }

        let edge = Edge {
            from,
            output,
            to,
            input,
        };
        if !self.edges.contains(&edge) {
            trace!("connect {}:{} -> {}:{}", from, output, to, input);
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Remove every outgoing edge of `from`, returning how many were removed
    ///
    /// Disconnecting a node that has no outgoing edges is not an error.
    pub fn disconnect(&mut self, from: NodeId) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.from != from);
        let removed = before - self.edges.len();
        if removed > 0 {
            trace!("disconnect {} ({} edges)", from, removed);
        }
        removed
    }

    /// Nodes fed by `node`, in connection order
    pub fn downstream(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|edge| edge.from == node)
            .map(|edge| edge.to)
            .collect()
    }

    /// Nodes feeding `node`, in connection order
    pub fn upstream(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|edge| edge.to == node)
            .map(|edge| edge.from)
            .collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn param(&self, node: NodeId, kind: ParamKind) -> Result<&AudioParam> {
        let n = self.node_checked(node)?;
        let name = n.kind_name();
        n.param(kind)
            .ok_or_else(|| Error::Graph(format!("{} node {} has no {:?} parameter", name, node, kind)))
    }

    pub fn param_mut(&mut self, node: NodeId, kind: ParamKind) -> Result<&mut AudioParam> {
        let n = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| Error::Graph(format!("unknown node {}", node)))?;
        let name = n.kind_name();
        n.param_mut(kind)
            .ok_or_else(|| Error::Graph(format!("{} node {} has no {:?} parameter", name, node, kind)))
    }

    /// Parameter value at the current context time
    pub fn param_value(&self, node: NodeId, kind: ParamKind) -> Result<f32> {
        let now = self.current_time();
        Ok(self.param(node, kind)?.value_at(now))
    }

    pub fn convolver_buffer(&self, node: NodeId) -> Option<&ImpulseResponse> {
        match self.nodes.get(node.0) {
            Some(Node::Convolver { buffer }) => buffer.as_ref(),
            _ => None,
        }
    }

    fn node_checked(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::Graph(format!("unknown node {}", id)))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        trace!("create {} node {}", node.kind_name(), id);
        self.nodes.push(node);
        id
    }
}

impl std::fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("state", &self.state)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph() -> (AudioGraph, ManualClock) {
        let clock = ManualClock::new();
        (AudioGraph::new(48_000, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_new_graph_is_suspended() {
        let (mut graph, _) = graph();
        assert_eq!(graph.state(), ContextState::Suspended);
        assert_eq!(graph.node_count(), 1);
        graph.resume();
        assert_eq!(graph.state(), ContextState::Running);
    }

    #[test]
    fn test_current_time_follows_clock() {
        let (graph, clock) = graph();
        clock.advance(2.5);
        assert_eq!(graph.current_time(), 2.5);
    }

    #[test]
    fn test_media_source_created_once_per_slot() {
        let (mut graph, _) = graph();
        let a = graph.create_media_element_source(SlotId::A).unwrap();
        assert_eq!(graph.media_source(SlotId::A), Some(a));
        assert!(matches!(
            graph.create_media_element_source(SlotId::A),
            Err(Error::SourceAlreadyExists(SlotId::A))
        ));
        assert!(graph.create_media_element_source(SlotId::B).is_ok());
    }

    #[test]
    fn test_connect_ignores_duplicates() {
        let (mut graph, _) = graph();
        let gain = graph.create_gain(1.0);
        let dest = graph.destination();
        graph.connect(gain, dest).unwrap();
        graph.connect(gain, dest).unwrap();
        assert_eq!(graph.downstream(gain), vec![dest]);
        assert_eq!(graph.upstream(dest), vec![gain]);
    }

    #[test]
    fn test_connect_validates_ports() {
        let (mut graph, _) = graph();
        let splitter = graph.create_splitter(2);
        let merger = graph.create_merger(2);
        assert!(graph.connect_ports(splitter, 1, merger, 1).is_ok());
        assert!(graph.connect_ports(splitter, 2, merger, 0).is_err());
        assert!(graph.connect_ports(splitter, 0, merger, 2).is_err());

        let dest = graph.destination();
        let gain = graph.create_gain(1.0);
        assert!(graph.connect(dest, gain).is_err());
        assert!(graph.connect(gain, NodeId(999)).is_err());
    }

    #[test]
    fn test_disconnect_unconnected_is_noop() {
        let (mut graph, _) = graph();
        let gain = graph.create_gain(1.0);
        assert_eq!(graph.disconnect(gain), 0);

        let other = graph.create_gain(1.0);
        graph.connect(gain, other).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        assert_eq!(graph.disconnect(gain), 2);
        assert!(graph.downstream(gain).is_empty());
    }

    #[test]
    fn test_disconnect_keeps_incoming_edges() {
        let (mut graph, _) = graph();
        let source = graph.create_media_element_source(SlotId::A).unwrap();
        let gain = graph.create_gain(1.0);
        graph.connect(source, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();

        graph.disconnect(gain);
        assert_eq!(graph.upstream(gain), vec![source]);
    }

    #[test]
    fn test_params_by_kind() {
        let (mut graph, clock) = graph();
        let shelf = graph.create_biquad(FilterType::LowShelf, 120.0, 0.7, 3.0);
        assert_eq!(graph.param_value(shelf, ParamKind::Frequency).unwrap(), 120.0);
        assert_eq!(graph.param_value(shelf, ParamKind::Gain).unwrap(), 3.0);
        assert!(graph.param(shelf, ParamKind::Ratio).is_err());

        let gain = graph.create_gain(1.0);
        graph
            .param_mut(gain, ParamKind::Gain)
            .unwrap()
            .set_value_at_time(0.5, 1.0)
            .unwrap();
        assert_eq!(graph.param_value(gain, ParamKind::Gain).unwrap(), 1.0);
        clock.advance(1.0);
        assert_eq!(graph.param_value(gain, ParamKind::Gain).unwrap(), 0.5);
    }

    #[test]
    fn test_convolver_holds_buffer() {
        let (mut graph, _) = graph();
        let ir = ImpulseResponse::generate(48_000, 0.01, 2.2, &mut StdRng::seed_from_u64(1));
        let conv = graph.create_convolver(ir.clone());
        assert_eq!(graph.convolver_buffer(conv), Some(&ir));
        assert_eq!(graph.convolver_buffer(graph.destination()), None);
    }
}
