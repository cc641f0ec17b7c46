//! Crossfade scheduling between two slot gains
//!
//! Both gains get a fixed-resolution curve over the crossfade duration.
//! Completion is not observed from the automation; the caller arms a timer
//! for `duration + settle margin` and treats that as the end of the fade.

use crate::audio::graph::{AudioGraph, NodeId, ParamKind};
use crate::error::Result;
use crate::playback::gain_registry::GAIN_FLOOR;
use cloude_common::config::DEFAULT_CROSSFADE_SECONDS;
use cloude_common::fade_curves::{CrossfadePair, FadeCurve, DEFAULT_CURVE_STEPS};
use serde::Serialize;
use tracing::debug;

/// Margin added to the fade duration before completion fires
pub const SETTLE_MARGIN_SECONDS: f64 = 0.05;

/// Result of scheduling a crossfade
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossfadePlan {
    /// Context time the curves start
    pub starts_at: f64,

    /// Context time the curves reach their final value
    pub ends_at: f64,

    /// Context time the completion timer should fire
    pub completes_at: f64,

    pub target: f32,
}

/// Crossfade parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadeScheduler {
    duration: f64,
    steps: usize,
    settle: f64,
    curve: FadeCurve,
}

impl Default for CrossfadeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CROSSFADE_SECONDS, FadeCurve::EqualPower)
    }
}

impl CrossfadeScheduler {
    pub fn new(duration: f64, curve: FadeCurve) -> Self {
        Self {
            duration,
            steps: DEFAULT_CURVE_STEPS,
            settle: SETTLE_MARGIN_SECONDS,
            curve,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn curve(&self) -> FadeCurve {
        self.curve
    }

    pub fn set_curve(&mut self, curve: FadeCurve) {
        self.curve = curve;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Outgoing/incoming value curves for `target`
    pub fn curves(&self, target: f32) -> CrossfadePair {
        self.curve.crossfade_pair(self.steps, target)
    }

    /// Schedule the fade from `outgoing` to `incoming` gain nodes
    ///
    /// Pending automation on both gains is cancelled first. The outgoing
    /// gain is anchored at the value it currently has and the incoming gain
    /// at the near-zero floor, then both curves start at the current time.
    pub fn schedule(
        &self,
        graph: &mut AudioGraph,
        outgoing: NodeId,
        incoming: NodeId,
        target: f32,
    ) -> Result<CrossfadePlan> {
        let now = graph.current_time();
        let pair = self.curves(target);

        let out_gain = graph.param_mut(outgoing, ParamKind::Gain)?;
        let held = out_gain.value_at(now);
        out_gain.cancel_scheduled_values(now);
        out_gain.set_value_at_time(held, now)?;
        out_gain.set_value_curve_at_time(&pair.fade_out, now, self.duration)?;

        let in_gain = graph.param_mut(incoming, ParamKind::Gain)?;
        in_gain.cancel_scheduled_values(now);
        in_gain.set_value_at_time(GAIN_FLOOR, now)?;
        in_gain.set_value_curve_at_time(&pair.fade_in, now, self.duration)?;

        let plan = CrossfadePlan {
            starts_at: now,
            ends_at: now + self.duration,
            completes_at: now + self.duration + self.settle,
            target,
        };
        debug!(
            "Crossfade {} -> {} scheduled: {:.2}s {} curve, target {:.3}",
            outgoing, incoming, self.duration, self.curve, target
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use std::sync::Arc;

    fn setup() -> (AudioGraph, ManualClock, NodeId, NodeId) {
        let clock = ManualClock::new();
        let mut graph = AudioGraph::new(48_000, Arc::new(clock.clone()));
        let out = graph.create_gain(0.8);
        let inc = graph.create_gain(GAIN_FLOOR);
        (graph, clock, out, inc)
    }

    fn gain(graph: &AudioGraph, node: NodeId) -> f32 {
        graph.param_value(node, ParamKind::Gain).unwrap()
    }

    #[test]
    fn test_completion_includes_settle_margin() {
        let (mut graph, clock, out, inc) = setup();
        clock.set(10.0);
        let plan = CrossfadeScheduler::default()
            .schedule(&mut graph, out, inc, 0.8)
            .unwrap();
        assert_eq!(plan.starts_at, 10.0);
        assert!((plan.ends_at - 13.8).abs() < 1e-9);
        assert!((plan.completes_at - 13.85).abs() < 1e-9);
    }

    #[test]
    fn test_midpoint_equal_gains() {
        let (mut graph, clock, out, inc) = setup();
        CrossfadeScheduler::default()
            .schedule(&mut graph, out, inc, 0.8)
            .unwrap();

        clock.advance(1.9);
        let expected = 0.8 * std::f32::consts::FRAC_PI_4.sin();
        assert!((gain(&graph, out) - expected).abs() < 1e-3);
        assert!((gain(&graph, inc) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_endpoints() {
        let (mut graph, clock, out, inc) = setup();
        CrossfadeScheduler::default()
            .schedule(&mut graph, out, inc, 0.8)
            .unwrap();
        assert!((gain(&graph, out) - 0.8).abs() < 1e-6);
        assert!(gain(&graph, inc) < 1e-3);

        clock.advance(4.0);
        assert!(gain(&graph, out) < 1e-6);
        assert!((gain(&graph, inc) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_schedule_replaces_running_fade() {
        let (mut graph, clock, out, inc) = setup();
        let scheduler = CrossfadeScheduler::new(2.0, FadeCurve::EqualPower);
        scheduler.schedule(&mut graph, out, inc, 1.0).unwrap();
        clock.advance(1.0);
        let out_mid = gain(&graph, out);

        // Fade back the other way from where the first one stood
        scheduler.schedule(&mut graph, inc, out, 1.0).unwrap();
        assert!(gain(&graph, out) < 1e-3);
        assert!(out_mid > 0.5);
        clock.advance(2.0);
        assert!((gain(&graph, out) - 1.0).abs() < 1e-6);
        assert!(gain(&graph, inc) < 1e-6);
    }

    #[test]
    fn test_equal_power_curves() {
        let scheduler = CrossfadeScheduler::default();
        let pair = scheduler.curves(0.8);
        assert_eq!(pair.len(), 60);
        for power in pair.power() {
            assert!((power - 0.64).abs() < 1e-5);
        }
    }
}
