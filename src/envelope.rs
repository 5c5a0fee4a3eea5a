//! Breath envelope curves
//!
//! The tone swells with a logistic curve on the inhale and fades with its
//! complement on the exhale. Curve shape and curve duration are independent:
//! curves are sampled once at a fixed resolution and stretched over the real
//! phase length by the automation layer.

use crate::automation::ValueCurve;
use std::sync::Arc;

/// Points per curve. Controls smoothness only, not the audio sample rate.
pub const CURVE_RESOLUTION: usize = 44_100;

/// Slope of the logistic curve around its midpoint
pub const SIGMOID_STEEPNESS: f32 = 12.0;

/// `1 / (1 + e^(-12(x - 0.5)))`
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * (x - 0.5)).exp())
}

/// Rising curve sampled at `x = i / resolution`
pub fn fade_in_curve(resolution: usize) -> Vec<f32> {
    let resolution = resolution.max(2);
    (0..resolution)
        .map(|i| sigmoid(i as f32 / resolution as f32))
        .collect()
}

/// Complement of [`fade_in_curve`]
pub fn fade_out_curve(resolution: usize) -> Vec<f32> {
    fade_in_curve(resolution)
        .into_iter()
        .map(|v| 1.0 - v)
        .collect()
}

/// The pair of curves used by one scheduler
#[derive(Debug, Clone)]
pub struct BreathCurves {
    pub fade_in: ValueCurve,
    pub fade_out: ValueCurve,
}

impl BreathCurves {
    pub fn new(resolution: usize) -> Self {
        Self {
            fade_in: Arc::from(fade_in_curve(resolution)),
            fade_out: Arc::from(fade_out_curve(resolution)),
        }
    }
}

impl Default for BreathCurves {
    fn default() -> Self {
        Self::new(CURVE_RESOLUTION)
    }
}

/// Tail of `curve` starting at `fraction` of its length, for resuming mid-phase
pub fn slice_from(curve: &ValueCurve, fraction: f64) -> ValueCurve {
    let fraction = fraction.clamp(0.0, 1.0);
    if fraction <= 0.0 {
        return curve.clone();
    }
    let last = curve.len().saturating_sub(2);
    let start = ((curve.len() - 1) as f64 * fraction).floor() as usize;
    Arc::from(&curve[start.min(last)..])
}
