//! Automatable audio parameters
//!
//! An [`AudioParam`] is a base value plus a timeline of automation events.
//! The value at any time is produced by the last event that has started,
//! so overlapping automations resolve to whichever was scheduled last in
//! time order. Callers cancel pending events before scheduling new ones;
//! cancelling also folds started events into the base value.

use crate::error::{Error, Result};

/// One scheduled automation event
#[derive(Debug, Clone, PartialEq)]
enum Automation {
    /// Jump to `value` at `time`
    SetValue { time: f64, value: f32 },

    /// Spread `values` evenly over `[start, start + duration]`
    Curve {
        start: f64,
        duration: f64,
        values: Vec<f32>,
    },

    /// Exponential approach to `target` from `start`
    Target {
        start: f64,
        target: f32,
        time_constant: f64,
    },
}

impl Automation {
    fn start(&self) -> f64 {
        match self {
            Automation::SetValue { time, .. } => *time,
            Automation::Curve { start, .. } => *start,
            Automation::Target { start, .. } => *start,
        }
    }

    fn end(&self) -> f64 {
        match self {
            Automation::SetValue { time, .. } => *time,
            Automation::Curve {
                start, duration, ..
            } => start + duration,
            Automation::Target { .. } => f64::INFINITY,
        }
    }
}

/// A parameter with a base value and an automation timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    value: f32,
    events: Vec<Automation>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Set the base value immediately, dropping every scheduled event
    pub fn set_value(&mut self, value: f32) -> Result<()> {
        check_finite(value)?;
        self.events.clear();
        self.value = value;
        Ok(())
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<()> {
        check_finite(value)?;
        check_time(time)?;
        self.insert(Automation::SetValue { time, value });
        Ok(())
    }

    /// Schedule a value curve over `[start, start + duration]`
    ///
    /// Samples are linearly interpolated; the last sample holds afterwards.
    pub fn set_value_curve_at_time(&mut self, values: &[f32], start: f64, duration: f64) -> Result<()> {
        if values.len() < 2 {
            return Err(Error::InvalidAutomation(format!(
                "value curve needs at least 2 samples, got {}",
                values.len()
            )));
        }
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::InvalidAutomation(format!(
                "value curve duration must be positive, got {}",
                duration
            )));
        }
        check_time(start)?;
        for value in values {
            check_finite(*value)?;
        }

        self.insert(Automation::Curve {
            start,
            duration,
            values: values.to_vec(),
        });
        Ok(())
    }

    /// Approach `target` exponentially from `start` with `time_constant` seconds
    pub fn set_target_at_time(&mut self, target: f32, start: f64, time_constant: f64) -> Result<()> {
        check_finite(target)?;
        check_time(start)?;
        if !(time_constant.is_finite() && time_constant > 0.0) {
            return Err(Error::InvalidAutomation(format!(
                "time constant must be positive, got {}",
                time_constant
            )));
        }

        self.insert(Automation::Target {
            start,
            target,
            time_constant,
        });
        Ok(())
    }

    /// Drop every event starting at or after `time`
    ///
    /// Events that already started are folded into the base value as of
    /// `time`, so a running ramp holds at the value it reached and the
    /// timeline never keeps history from before the cancel point.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.start() < time);
        if !self.events.is_empty() {
            self.value = self.value_at(time);
            self.events.clear();
        }
    }

    /// Evaluate the parameter at `time`
    pub fn value_at(&self, time: f64) -> f32 {
        let started = self.events.partition_point(|event| event.start() <= time);
        self.evaluate(&self.events[..started], time)
    }

    /// Number of pending or past automation events
    pub fn scheduled_events(&self) -> usize {
        self.events.len()
    }

    /// True when an event starts or is still running after `time`
    pub fn has_automation_after(&self, time: f64) -> bool {
        self.events.iter().any(|event| event.end() > time)
    }

    fn evaluate(&self, events: &[Automation], time: f64) -> f32 {
        let Some((last, earlier)) = events.split_last() else {
            return self.value;
        };

        match last {
            Automation::SetValue { value, .. } => *value,
            Automation::Curve {
                start,
                duration,
                values,
            } => curve_value(values, (time - start) / duration),
            Automation::Target {
                start,
                target,
                time_constant,
            } => {
                let from = self.evaluate(earlier, *start);
                let decay = (-(time - start) / time_constant).exp() as f32;
                target + (from - target) * decay
            }
        }
    }

    fn insert(&mut self, event: Automation) {
        let at = self
            .events
            .partition_point(|existing| existing.start() <= event.start());
        self.events.insert(at, event);
    }
}

fn curve_value(values: &[f32], progress: f64) -> f32 {
    let last = values.len() - 1;
    if progress <= 0.0 {
        return values[0];
    }
    if progress >= 1.0 {
        return values[last];
    }

    let position = progress * last as f64;
    let index = position.floor() as usize;
    let frac = (position - index as f64) as f32;
    let next = (index + 1).min(last);
    values[index] + (values[next] - values[index]) * frac
}

fn check_finite(value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidAutomation(format!("non-finite value {}", value)))
    }
}

fn check_time(time: f64) -> Result<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAutomation(format!("invalid time {}", time)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_base_value_without_events() {
        let param = AudioParam::new(0.7);
        assert_eq!(param.value_at(0.0), 0.7);
        assert_eq!(param.value_at(100.0), 0.7);
    }

    #[test]
    fn test_set_value_at_time_steps() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.25, 2.0).unwrap();
        assert_eq!(param.value_at(1.999), 1.0);
        assert_eq!(param.value_at(2.0), 0.25);
        assert_eq!(param.value_at(5.0), 0.25);
    }

    #[test]
    fn test_curve_interpolates_and_holds() {
        let mut param = AudioParam::new(0.0);
        param.set_value_curve_at_time(&[0.0, 1.0, 0.5], 1.0, 2.0).unwrap();

        assert_eq!(param.value_at(0.5), 0.0);
        assert!((param.value_at(1.5) - 0.5).abs() < EPSILON);
        assert!((param.value_at(2.0) - 1.0).abs() < EPSILON);
        assert!((param.value_at(2.5) - 0.75).abs() < EPSILON);
        assert!((param.value_at(3.0) - 0.5).abs() < EPSILON);
        assert!((param.value_at(10.0) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_curve_rejects_bad_input() {
        let mut param = AudioParam::new(0.0);
        assert!(param.set_value_curve_at_time(&[1.0], 0.0, 1.0).is_err());
        assert!(param.set_value_curve_at_time(&[0.0, 1.0], 0.0, 0.0).is_err());
        assert!(param.set_value_curve_at_time(&[0.0, f32::NAN], 0.0, 1.0).is_err());
        assert!(param.set_value_curve_at_time(&[0.0, 1.0], -1.0, 1.0).is_err());
        assert_eq!(param.scheduled_events(), 0);
    }

    #[test]
    fn test_target_approaches_exponentially() {
        let mut param = AudioParam::new(1.0);
        param.set_target_at_time(0.0, 0.0, 0.1).unwrap();

        let after_one_constant = param.value_at(0.1);
        assert!((after_one_constant - (-1.0f32).exp()).abs() < EPSILON);
        assert!(param.value_at(2.0) < 1e-6);
    }

    #[test]
    fn test_target_starts_from_previous_event() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.5, 0.0).unwrap();
        param.set_target_at_time(1.0, 1.0, 0.2).unwrap();

        assert!((param.value_at(1.0) - 0.5).abs() < EPSILON);
        assert!(param.value_at(1.2) > 0.5);
        assert!(param.value_at(1.2) < 1.0);
    }

    #[test]
    fn test_cancel_freezes_running_curve() {
        let mut param = AudioParam::new(0.0);
        param.set_value_curve_at_time(&[0.0, 1.0], 0.0, 4.0).unwrap();

        param.cancel_scheduled_values(1.0);
        assert!((param.value_at(1.0) - 0.25).abs() < EPSILON);
        assert!((param.value_at(3.0) - 0.25).abs() < EPSILON);
        assert_eq!(param.scheduled_events(), 0);
    }

    #[test]
    fn test_cancel_drops_events_at_cancel_point() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.5, 1.0).unwrap();
        param.set_value_at_time(0.2, 8.0).unwrap();

        param.cancel_scheduled_values(8.0);
        assert_eq!(param.scheduled_events(), 0);
        assert_eq!(param.value_at(9.0), 0.5);
    }

    #[test]
    fn test_timeline_stays_bounded_across_repeated_fades() {
        let mut param = AudioParam::new(1.0);
        let mut now = 0.0;
        for _ in 0..500 {
            param.cancel_scheduled_values(now);
            param.set_value_at_time(param.value_at(now), now).unwrap();
            param.set_value_curve_at_time(&[1.0, 0.5, 0.0001], now, 3.8).unwrap();
            now += 5.0;
        }
        // Only the fade scheduled last is still on the timeline
        assert!(param.scheduled_events() <= 2);
        assert!((param.value_at(now) - 0.0001).abs() < EPSILON);
    }

    #[test]
    fn test_cancel_drops_future_events() {
        let mut param = AudioParam::new(1.0);
        param.set_value_at_time(0.1, 5.0).unwrap();
        param.cancel_scheduled_values(2.0);

        assert_eq!(param.value_at(6.0), 1.0);
        assert!(!param.has_automation_after(2.0));
    }

    #[test]
    fn test_set_value_clears_timeline() {
        let mut param = AudioParam::new(1.0);
        param.set_value_curve_at_time(&[1.0, 0.0], 0.0, 1.0).unwrap();
        param.set_value(0.0001).unwrap();

        assert_eq!(param.scheduled_events(), 0);
        assert_eq!(param.value_at(0.5), 0.0001);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut param = AudioParam::new(1.0);
        assert!(param.set_value(f32::INFINITY).is_err());
        assert!(param.set_value_at_time(f32::NAN, 0.0).is_err());
        assert!(param.set_target_at_time(0.5, 0.0, 0.0).is_err());
        assert_eq!(param.value_at(0.0), 1.0);
    }
}
