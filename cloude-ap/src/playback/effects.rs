//! Environment-sound effects chain
//!
//! The chain is built once per session and afterwards only has its node
//! values updated. Signal flow:
//!
//! ```text
//! input -> bass shelf -> clarity peak -> splitter
//!   splitter L/R -> mid trim L/R ----------------------------> merger L/R
//!   splitter L + inverted R -> L-R -> width L -> side boost L -> merger L
//!   splitter R + inverted L -> R-L -> width R -> side boost R -> merger R
//! merger -> split2
//!   split2 L/R ------------------> merge2 L/R
//!   split2 L -> crossfeed L->R --> merge2 R
//!   split2 R -> crossfeed R->L --> merge2 L
//! merge2 -> compressor
//! merge2 -> convolver -> reverb wet -> compressor
//! compressor -> output -> master
//! ```
//!
//! Every stage value is `strength × preset coefficient` and is computed by
//! [`StageValues::compute`], a pure function of the persisted settings.

use crate::audio::graph::{AudioGraph, FilterType, NodeId, ParamKind};
use crate::audio::impulse::{self, ImpulseResponse};
use crate::error::Result;
use cloude_common::config::EffectsSettings;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Bass low-shelf corner frequency (Hz)
pub const BASS_FREQUENCY: f32 = 120.0;

/// Clarity peak centre frequency (Hz)
pub const CLARITY_FREQUENCY: f32 = 3400.0;

pub const CLARITY_Q: f32 = 1.0;

pub const COMPRESSOR_KNEE: f32 = 22.0;
pub const COMPRESSOR_ATTACK: f32 = 0.006;
pub const COMPRESSOR_RELEASE: f32 = 0.18;

/// Named effect presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Studio,
    Cinema,
    Concert,
    Car,
    Night,
}

/// Base coefficients of a preset, scaled by user strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetCoefficients {
    pub width: f32,
    pub crossfeed: f32,
    pub reverb: f32,
    pub separation: f32,
    pub compression: f32,
}

impl Preset {
    /// Parse a preset name, falling back to [`Preset::Studio`] for unknown names
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    /// Parse a preset name exactly (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "studio" => Some(Preset::Studio),
            "cinema" => Some(Preset::Cinema),
            "concert" => Some(Preset::Concert),
            "car" => Some(Preset::Car),
            "night" => Some(Preset::Night),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Studio => "studio",
            Preset::Cinema => "cinema",
            Preset::Concert => "concert",
            Preset::Car => "car",
            Preset::Night => "night",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Preset::Studio => "Studio",
            Preset::Cinema => "Cinema",
            Preset::Concert => "Concert",
            Preset::Car => "Car",
            Preset::Night => "Night",
        }
    }

    pub fn coefficients(&self) -> PresetCoefficients {
        let (width, crossfeed, reverb, separation, compression) = match self {
            Preset::Studio => (0.35, 0.06, 0.04, 0.55, 0.25),
            Preset::Cinema => (0.65, 0.08, 0.12, 0.75, 0.35),
            Preset::Concert => (0.85, 0.10, 0.20, 0.65, 0.28),
            Preset::Car => (0.45, 0.07, 0.06, 0.70, 0.45),
            Preset::Night => (0.25, 0.08, 0.03, 0.50, 0.60),
        };
        PresetCoefficients {
            width,
            crossfeed,
            reverb,
            separation,
            compression,
        }
    }

    pub fn all() -> &'static [Preset] {
        &[
            Preset::Studio,
            Preset::Cinema,
            Preset::Concert,
            Preset::Car,
            Preset::Night,
        ]
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Effective value of every stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageValues {
    /// L−R / R−L difference gain
    pub width: f32,
    /// L→R / R→L leakage gain
    pub crossfeed: f32,
    /// Convolver wet level
    pub reverb: f32,
    /// Separation amount driving side boost and mid trim
    pub separation: f32,
    pub side_boost: f32,
    pub mid_trim: f32,
    pub bass_db: f32,
    pub clarity_db: f32,
    pub threshold_db: f32,
    pub ratio: f32,
}

impl StageValues {
    pub fn compute(settings: &EffectsSettings) -> Self {
        let enabled = settings.enabled;
        let strength = if enabled {
            settings.strength.min(100) as f32 / 100.0
        } else {
            0.0
        };
        let p = Preset::from_name(&settings.preset).coefficients();

        let separation = if enabled && settings.separation {
            strength * p.separation
        } else {
            0.0
        };
        let compression = strength * p.compression;
        let trim = |db: i8| if enabled { db.clamp(-12, 12) as f32 } else { 0.0 };

        Self {
            width: strength * p.width,
            crossfeed: strength * p.crossfeed,
            reverb: strength * p.reverb,
            separation,
            side_boost: 1.0 + separation,
            mid_trim: 1.0 - separation * 0.25,
            bass_db: trim(settings.bass_db),
            clarity_db: trim(settings.clarity_db),
            threshold_db: -16.0 - compression * 10.0,
            ratio: 2.8 + compression * 2.5,
        }
    }

    /// Values of a disabled chain: nothing added, tone flat
    pub fn neutral() -> Self {
        Self::compute(&EffectsSettings {
            enabled: false,
            ..EffectsSettings::default()
        })
    }
}

/// Handles to every node of the built chain
#[derive(Debug, Clone)]
pub struct EffectsGraph {
    input: NodeId,
    bass: NodeId,
    clarity: NodeId,
    splitter: NodeId,
    invert_l: NodeId,
    invert_r: NodeId,
    l_minus_r: NodeId,
    r_minus_l: NodeId,
    width_l: NodeId,
    width_r: NodeId,
    side_boost_l: NodeId,
    side_boost_r: NodeId,
    mid_trim_l: NodeId,
    mid_trim_r: NodeId,
    merger: NodeId,
    split2: NodeId,
    merge2: NodeId,
    cross_l_to_r: NodeId,
    cross_r_to_l: NodeId,
    convolver: NodeId,
    reverb: NodeId,
    compressor: NodeId,
    output: NodeId,
}

impl EffectsGraph {
    /// Create and wire every node, ending at `master`
    ///
    /// The impulse response is generated here, once. Stage values start
    /// neutral until [`EffectsGraph::apply`] is called.
    pub fn build<R: Rng>(graph: &mut AudioGraph, master: NodeId, rng: &mut R) -> Result<Self> {
        info!("Building effects graph");

        let input = graph.create_gain(1.0);
        let bass = graph.create_biquad(FilterType::LowShelf, BASS_FREQUENCY, 1.0, 0.0);
        let clarity = graph.create_biquad(FilterType::Peaking, CLARITY_FREQUENCY, CLARITY_Q, 0.0);

        let splitter = graph.create_splitter(2);
        let merger = graph.create_merger(2);
        let invert_l = graph.create_gain(-1.0);
        let invert_r = graph.create_gain(-1.0);
        let l_minus_r = graph.create_gain(1.0);
        let r_minus_l = graph.create_gain(1.0);
        let width_l = graph.create_gain(0.0);
        let width_r = graph.create_gain(0.0);
        let side_boost_l = graph.create_gain(1.0);
        let side_boost_r = graph.create_gain(1.0);
        let mid_trim_l = graph.create_gain(1.0);
        let mid_trim_r = graph.create_gain(1.0);

        let split2 = graph.create_splitter(2);
        let merge2 = graph.create_merger(2);
        let cross_l_to_r = graph.create_gain(0.0);
        let cross_r_to_l = graph.create_gain(0.0);

        let ir = ImpulseResponse::generate(
            graph.sample_rate(),
            impulse::DEFAULT_SECONDS,
            impulse::DEFAULT_DECAY,
            rng,
        );
        let convolver = graph.create_convolver(ir);
        let reverb = graph.create_gain(0.0);

        let compressor = graph.create_compressor(COMPRESSOR_KNEE, COMPRESSOR_ATTACK, COMPRESSOR_RELEASE);
        let output = graph.create_gain(1.0);

        // Tone
        graph.connect(input, bass)?;
        graph.connect(bass, clarity)?;
        graph.connect(clarity, splitter)?;

        // Width: difference signals via inversion and summing
        graph.connect_ports(splitter, 0, l_minus_r, 0)?;
        graph.connect_ports(splitter, 1, invert_r, 0)?;
        graph.connect(invert_r, l_minus_r)?;
        graph.connect_ports(splitter, 1, r_minus_l, 0)?;
        graph.connect_ports(splitter, 0, invert_l, 0)?;
        graph.connect(invert_l, r_minus_l)?;
        graph.connect(l_minus_r, width_l)?;
        graph.connect(r_minus_l, width_r)?;
        graph.connect(width_l, side_boost_l)?;
        graph.connect(width_r, side_boost_r)?;
        graph.connect_ports(side_boost_l, 0, merger, 0)?;
        graph.connect_ports(side_boost_r, 0, merger, 1)?;

        // Direct path
        graph.connect_ports(splitter, 0, mid_trim_l, 0)?;
        graph.connect_ports(splitter, 1, mid_trim_r, 0)?;
        graph.connect_ports(mid_trim_l, 0, merger, 0)?;
        graph.connect_ports(mid_trim_r, 0, merger, 1)?;

        // Crossfeed
        graph.connect(merger, split2)?;
        graph.connect_ports(split2, 0, merge2, 0)?;
        graph.connect_ports(split2, 1, merge2, 1)?;
        graph.connect_ports(split2, 0, cross_l_to_r, 0)?;
        graph.connect_ports(split2, 1, cross_r_to_l, 0)?;
        graph.connect_ports(cross_l_to_r, 0, merge2, 1)?;
        graph.connect_ports(cross_r_to_l, 0, merge2, 0)?;

        // Reverb send and dynamics
        graph.connect(merge2, convolver)?;
        graph.connect(convolver, reverb)?;
        graph.connect(merge2, compressor)?;
        graph.connect(reverb, compressor)?;
        graph.connect(compressor, output)?;
        graph.connect(output, master)?;

        let effects = Self {
            input,
            bass,
            clarity,
            splitter,
            invert_l,
            invert_r,
            l_minus_r,
            r_minus_l,
            width_l,
            width_r,
            side_boost_l,
            side_boost_r,
            mid_trim_l,
            mid_trim_r,
            merger,
            split2,
            merge2,
            cross_l_to_r,
            cross_r_to_l,
            convolver,
            reverb,
            compressor,
            output,
        };
        effects.apply(graph, &StageValues::neutral())?;

        debug!("Effects graph built: input {} output {}", input, output);
        Ok(effects)
    }

    /// Write stage values into the existing nodes
    pub fn apply(&self, graph: &mut AudioGraph, values: &StageValues) -> Result<()> {
        let settings = [
            (self.width_l, ParamKind::Gain, values.width),
            (self.width_r, ParamKind::Gain, values.width),
            (self.cross_l_to_r, ParamKind::Gain, values.crossfeed),
            (self.cross_r_to_l, ParamKind::Gain, values.crossfeed),
            (self.reverb, ParamKind::Gain, values.reverb),
            (self.side_boost_l, ParamKind::Gain, values.side_boost),
            (self.side_boost_r, ParamKind::Gain, values.side_boost),
            (self.mid_trim_l, ParamKind::Gain, values.mid_trim),
            (self.mid_trim_r, ParamKind::Gain, values.mid_trim),
            (self.bass, ParamKind::Gain, values.bass_db),
            (self.clarity, ParamKind::Gain, values.clarity_db),
            (self.compressor, ParamKind::Threshold, values.threshold_db),
            (self.compressor, ParamKind::Ratio, values.ratio),
        ];
        for (node, kind, value) in settings {
            graph.param_mut(node, kind)?.set_value(value)?;
        }
        Ok(())
    }

    /// Read the stage values currently held by the nodes
    pub fn current_values(&self, graph: &AudioGraph) -> Result<StageValues> {
        let gain = |node| graph.param_value(node, ParamKind::Gain);
        let side_boost = gain(self.side_boost_l)?;
        Ok(StageValues {
            width: gain(self.width_l)?,
            crossfeed: gain(self.cross_l_to_r)?,
            reverb: gain(self.reverb)?,
            separation: side_boost - 1.0,
            side_boost,
            mid_trim: gain(self.mid_trim_l)?,
            bass_db: gain(self.bass)?,
            clarity_db: gain(self.clarity)?,
            threshold_db: graph.param_value(self.compressor, ParamKind::Threshold)?,
            ratio: graph.param_value(self.compressor, ParamKind::Ratio)?,
        })
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn convolver(&self) -> NodeId {
        self.convolver
    }

    /// Every node of the chain, input first
    pub fn nodes(&self) -> Vec<NodeId> {
        vec![
            self.input,
            self.bass,
            self.clarity,
            self.splitter,
            self.invert_l,
            self.invert_r,
            self.l_minus_r,
            self.r_minus_l,
            self.width_l,
            self.width_r,
            self.side_boost_l,
            self.side_boost_r,
            self.mid_trim_l,
            self.mid_trim_r,
            self.merger,
            self.split2,
            self.merge2,
            self.cross_l_to_r,
            self.cross_r_to_l,
            self.convolver,
            self.reverb,
            self.compressor,
            self.output,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const EPSILON: f32 = 1e-6;

    fn settings(enabled: bool, preset: &str, strength: u8) -> EffectsSettings {
        EffectsSettings {
            enabled,
            preset: preset.to_string(),
            strength,
            ..EffectsSettings::default()
        }
    }

    #[test]
    fn test_unknown_preset_falls_back_to_studio() {
        assert_eq!(Preset::from_name("stadium"), Preset::Studio);
        assert_eq!(Preset::from_name("Concert"), Preset::Concert);
        assert_eq!(Preset::parse("stadium"), None);
        assert_eq!(Preset::Night.label(), "Night");
    }

    #[test]
    fn test_disabled_chain_contributes_nothing() {
        let values = StageValues::compute(&settings(false, "studio", 65));
        assert_eq!(values.width, 0.0);
        assert_eq!(values.crossfeed, 0.0);
        assert_eq!(values.reverb, 0.0);
        assert_eq!(values.separation, 0.0);
        assert_eq!(values.bass_db, 0.0);
        assert_eq!(values.clarity_db, 0.0);
        assert_eq!(values.side_boost, 1.0);
        assert_eq!(values.mid_trim, 1.0);
        assert_eq!(values, StageValues::neutral());
    }

    #[test]
    fn test_enabled_values_scale_with_strength() {
        let values = StageValues::compute(&settings(true, "concert", 50));
        assert!((values.width - 0.425).abs() < EPSILON);
        assert!((values.crossfeed - 0.05).abs() < EPSILON);
        assert!((values.reverb - 0.10).abs() < EPSILON);
        assert!((values.separation - 0.325).abs() < EPSILON);
        assert!((values.side_boost - 1.325).abs() < EPSILON);
        assert!((values.mid_trim - (1.0 - 0.325 * 0.25)).abs() < EPSILON);
        assert_eq!(values.bass_db, 3.0);
        assert_eq!(values.clarity_db, 2.0);
        assert!((values.threshold_db - (-16.0 - 1.4)).abs() < 1e-5);
        assert!((values.ratio - (2.8 + 0.35)).abs() < 1e-5);
    }

    #[test]
    fn test_separation_toggle() {
        let mut s = settings(true, "cinema", 100);
        s.separation = false;
        let values = StageValues::compute(&s);
        assert_eq!(values.separation, 0.0);
        assert_eq!(values.side_boost, 1.0);
        assert!((values.width - 0.65).abs() < EPSILON);
    }

    #[test]
    fn test_disable_enable_round_trip() {
        let on = settings(true, "car", 80);
        let before = StageValues::compute(&on);
        let off = EffectsSettings {
            enabled: false,
            ..on.clone()
        };
        assert_ne!(StageValues::compute(&off), before);
        assert_eq!(StageValues::compute(&on), before);
    }

    #[test]
    fn test_build_wires_chain_to_master() {
        let clock = ManualClock::new();
        let mut graph = AudioGraph::new(48_000, Arc::new(clock));
        let master = graph.create_gain(1.0);
        let mut rng = StdRng::seed_from_u64(5);

        let effects = EffectsGraph::build(&mut graph, master, &mut rng).unwrap();
        assert_eq!(graph.downstream(effects.output()), vec![master]);
        assert!(graph.convolver_buffer(effects.convolver()).is_some());
        assert_eq!(effects.current_values(&graph).unwrap(), StageValues::neutral());
    }

    #[test]
    fn test_apply_updates_in_place() {
        let clock = ManualClock::new();
        let mut graph = AudioGraph::new(48_000, Arc::new(clock));
        let master = graph.create_gain(1.0);
        let effects = EffectsGraph::build(&mut graph, master, &mut StdRng::seed_from_u64(9)).unwrap();

        let nodes_before = graph.node_count();
        let edges_before = graph.edges().to_vec();
        let values = StageValues::compute(&settings(true, "night", 100));
        effects.apply(&mut graph, &values).unwrap();

        assert_eq!(graph.node_count(), nodes_before);
        assert_eq!(graph.edges(), edges_before.as_slice());
        assert_eq!(effects.current_values(&graph).unwrap(), values);
    }
}
