//! Fade curve implementations for crossfading
//!
//! Provides the gain laws used when one playback slot hands over to the
//! other, plus generation of the fixed-resolution value curves that are
//! scheduled on the slot gain parameters.
//!
//! The default law is equal-power: the outgoing gain follows `cos(θ)` and the
//! incoming gain follows `sin(θ)` while `θ` sweeps 0 → π/2, so
//! `out² + in² = 1` at every point. A linear fade dips to half power at the
//! midpoint.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Number of samples in a scheduled crossfade curve
pub const DEFAULT_CURVE_STEPS: usize = 60;

/// Fade curve types for crossfading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Linear: in(t) = t, out(t) = 1 - t
    Linear,

    /// S-Curve: in(t) = 0.5 × (1 - cos(π × t))
    SCurve,

    /// Equal-Power: in(t) = sin(t × π/2), out(t) = cos(t × π/2)
    #[default]
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at a normalized position (0.0 to 1.0)
    pub fn fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at a normalized position (0.0 to 1.0)
    pub fn fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Generate paired outgoing/incoming value curves
    ///
    /// Sample `i` sits at normalized position `i / (steps - 1)`, so the first
    /// sample is the start of the fade and the last is its end. Both curves
    /// are scaled by `target`. Fewer than two steps are raised to two.
    pub fn crossfade_pair(&self, steps: usize, target: f32) -> CrossfadePair {
        let steps = steps.max(2);
        let last = (steps - 1) as f32;

        let mut fade_out = Vec::with_capacity(steps);
        let mut fade_in = Vec::with_capacity(steps);
        for i in 0..steps {
            let t = i as f32 / last;
            fade_out.push(self.fade_out(t) * target);
            fade_in.push(self.fade_in(t) * target);
        }

        CrossfadePair { fade_out, fade_in }
    }

    /// Parse curve from its settings string
    ///
    /// Accepts `linear`, `s_curve` (also `scurve`, `s-curve`, `cosine`) and
    /// `equal_power` (also `equalpower`).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Some(FadeCurve::Linear),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Some(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Some(FadeCurve::EqualPower),
            _ => None,
        }
    }

    /// Canonical settings string
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[FadeCurve::Linear, FadeCurve::SCurve, FadeCurve::EqualPower]
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outgoing and incoming gain curves of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadePair {
    pub fade_out: Vec<f32>,
    pub fade_in: Vec<f32>,
}

impl CrossfadePair {
    pub fn len(&self) -> usize {
        self.fade_out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fade_out.is_empty()
    }

    /// Combined power (`out² + in²`) at each sample
    pub fn power(&self) -> impl Iterator<Item = f32> + '_ {
        self.fade_out
            .iter()
            .zip(&self.fade_in)
            .map(|(o, i)| o * o + i * i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_bounds() {
        for curve in FadeCurve::all_variants() {
            assert!(curve.fade_in(0.0).abs() < 1e-6, "{:?} fade-in start", curve);
            assert!((curve.fade_in(1.0) - 1.0).abs() < 1e-6, "{:?} fade-in end", curve);
            assert!((curve.fade_out(0.0) - 1.0).abs() < 1e-6, "{:?} fade-out start", curve);
            assert!(curve.fade_out(1.0).abs() < 1e-6, "{:?} fade-out end", curve);
        }
    }

    #[test]
    fn test_position_is_clamped() {
        assert_eq!(FadeCurve::Linear.fade_in(-0.5), 0.0);
        assert_eq!(FadeCurve::Linear.fade_in(1.5), 1.0);
    }

    #[test]
    fn test_equal_power_keeps_constant_power() {
        let pair = FadeCurve::EqualPower.crossfade_pair(DEFAULT_CURVE_STEPS, 0.8);
        assert_eq!(pair.len(), 60);
        for power in pair.power() {
            assert!((power - 0.64).abs() < 1e-5, "power drifted to {}", power);
        }
    }

    #[test]
    fn test_linear_dips_at_midpoint() {
        let mid_linear = FadeCurve::Linear.fade_in(0.5).powi(2) + FadeCurve::Linear.fade_out(0.5).powi(2);
        assert!((mid_linear - 0.5).abs() < 1e-6);

        let mid_equal = FadeCurve::EqualPower.fade_in(0.5).powi(2)
            + FadeCurve::EqualPower.fade_out(0.5).powi(2);
        assert!((mid_equal - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_crossfade_pair_endpoints() {
        let pair = FadeCurve::EqualPower.crossfade_pair(60, 0.5);
        assert!((pair.fade_out[0] - 0.5).abs() < 1e-6);
        assert!(pair.fade_in[0].abs() < 1e-6);
        assert!(pair.fade_out[59].abs() < 1e-6);
        assert!((pair.fade_in[59] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_crossfade_pair_minimum_steps() {
        let pair = FadeCurve::Linear.crossfade_pair(0, 1.0);
        assert_eq!(pair.fade_out, vec![1.0, 0.0]);
        assert_eq!(pair.fade_in, vec![0.0, 1.0]);
    }

    #[test]
    fn test_name_round_trip() {
        for curve in FadeCurve::all_variants() {
            assert_eq!(FadeCurve::from_name(curve.as_str()), Some(*curve));
        }
        assert_eq!(FadeCurve::from_name("cosine"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::from_name("EqualPower"), Some(FadeCurve::EqualPower));
        assert_eq!(FadeCurve::from_name("bogus"), None);
    }

    #[test]
    fn test_default_is_equal_power() {
        assert_eq!(FadeCurve::default(), FadeCurve::EqualPower);
    }
}
