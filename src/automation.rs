//! Sample-accurate parameter automation
//!
//! [`AutomatableParam`] is the capability the sound scheduler needs from a
//! synthesis backend: set a value now, set a value at a future time, stretch
//! a value curve over a time span, and cancel pending changes. Times are in
//! seconds on the synthesis clock.
//!
//! [`ParamTimeline`] is the in-process implementation evaluated by
//! [`crate::synth::SoundGraph`] once per sample.

use crate::error::{Error, Result};
use std::sync::Arc;

/// Shared, immutable list of curve points
pub type ValueCurve = Arc<[f32]>;

pub trait AutomatableParam {
    /// Force the value immediately, discarding all scheduled events
    fn set_value(&mut self, value: f32);

    /// Step to `value` at `time`
    fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<()>;

    /// Spread `curve` evenly over `[start, start + duration]`
    fn set_value_curve_at_time(&mut self, curve: ValueCurve, start: f64, duration: f64)
        -> Result<()>;

    /// Drop events at or after `time`, including a curve still running at `time`
    fn cancel_scheduled_values(&mut self, time: f64);
}

#[derive(Debug, Clone)]
enum AutomationEvent {
    Set {
        time: f64,
        value: f32,
    },
    Curve {
        start: f64,
        duration: f64,
        curve: ValueCurve,
    },
}

impl AutomationEvent {
    fn time(&self) -> f64 {
        match self {
            AutomationEvent::Set { time, .. } => *time,
            AutomationEvent::Curve { start, .. } => *start,
        }
    }

    fn end(&self) -> f64 {
        match self {
            AutomationEvent::Set { time, .. } => *time,
            AutomationEvent::Curve {
                start, duration, ..
            } => start + duration,
        }
    }

    fn value_at(&self, t: f64) -> f32 {
        match self {
            AutomationEvent::Set { value, .. } => *value,
            AutomationEvent::Curve {
                start,
                duration,
                curve,
            } => sample_curve(curve, (t - start) / duration),
        }
    }
}

/// Linear interpolation into `curve` at `position` in `[0, 1]`
pub fn sample_curve(curve: &[f32], position: f64) -> f32 {
    match curve.len() {
        0 => 0.0,
        1 => curve[0],
        len => {
            let last = len - 1;
            let index = position.clamp(0.0, 1.0) * last as f64;
            let k = (index.floor() as usize).min(last);
            if k == last {
                return curve[last];
            }
            let frac = (index - k as f64) as f32;
            curve[k] + (curve[k + 1] - curve[k]) * frac
        }
    }
}

/// Ordered automation events plus a resting value
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    value: f32,
    events: Vec<AutomationEvent>,
}

impl ParamTimeline {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Value at time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        // Events are kept sorted by start time
        let idx = self.events.partition_point(|e| e.time() <= t);
        if idx == 0 {
            return self.value;
        }
        self.events[idx - 1].value_at(t)
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forget events that ended before `t`, folding the last one into the resting value
    pub fn prune_before(&mut self, t: f64) {
        let mut settled = 0;
        for (i, event) in self.events.iter().enumerate() {
            // Keep the event governing `t`
            let next_starts_by_t = self.events.get(i + 1).map_or(false, |n| n.time() <= t);
            if event.end() < t && next_starts_by_t {
                settled = i + 1;
            } else {
                break;
            }
        }
        if settled > 0 {
            self.value = self.events[settled - 1].value_at(t);
            self.events.drain(..settled);
        }
    }

    fn check_time(time: f64) -> Result<()> {
        if !time.is_finite() || time < 0.0 {
            return Err(Error::Automation(format!(
                "event time must be finite and non-negative, got {}",
                time
            )));
        }
        Ok(())
    }

    /// Reject `[start, end]` if it lands inside a scheduled curve, or (for
    /// curves) if it swallows another event
    fn check_overlap(&self, start: f64, end: f64, is_curve: bool) -> Result<()> {
        for event in &self.events {
            if let AutomationEvent::Curve {
                start: cs,
                duration,
                ..
            } = event
            {
                let ce = cs + duration;
                let overlaps = if is_curve {
                    start < ce && end > *cs
                } else {
                    start >= *cs && start < ce
                };
                if overlaps {
                    return Err(Error::Automation(format!(
                        "event at {:.4}s overlaps curve [{:.4}s, {:.4}s]",
                        start, cs, ce
                    )));
                }
            }
            if is_curve {
                let t = event.time();
                if t > start && t < end {
                    return Err(Error::Automation(format!(
                        "curve [{:.4}s, {:.4}s] overlaps event at {:.4}s",
                        start, end, t
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, event: AutomationEvent) {
        let t = event.time();
        // Later events at the same time win
        let idx = self.events.partition_point(|e| e.time() <= t);
        self.events.insert(idx, event);
    }
}

impl Default for ParamTimeline {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AutomatableParam for ParamTimeline {
    fn set_value(&mut self, value: f32) {
        self.events.clear();
        self.value = value;
    }

    fn set_value_at_time(&mut self, value: f32, time: f64) -> Result<()> {
        Self::check_time(time)?;
        self.check_overlap(time, time, false)?;
        self.insert(AutomationEvent::Set { time, value });
        Ok(())
    }

    fn set_value_curve_at_time(
        &mut self,
        curve: ValueCurve,
        start: f64,
        duration: f64,
    ) -> Result<()> {
        Self::check_time(start)?;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::Automation(format!(
                "curve duration must be positive, got {}",
                duration
            )));
        }
        if curve.len() < 2 {
            return Err(Error::Automation(format!(
                "curve needs at least 2 points, got {}",
                curve.len()
            )));
        }
        self.check_overlap(start, start + duration, true)?;
        self.insert(AutomationEvent::Curve {
            start,
            duration,
            curve,
        });
        Ok(())
    }

    fn cancel_scheduled_values(&mut self, time: f64) {
        // The value just before the cut becomes the resting value
        let held = self.value_at(time);
        self.events.retain(|event| match event {
            AutomationEvent::Set { time: t, .. } => *t < time,
            AutomationEvent::Curve {
                start, duration, ..
            } => start + duration <= time,
        });
        if self.events.is_empty() {
            self.value = held;
        }
    }
}
