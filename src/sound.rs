//! Sound scheduler: phase-locked gain envelopes for the breathing tone
//!
//! On phase entry the scheduler front-loads the automation for the rest of
//! the cycle onto the master gain, anchored to the synthesis clock rather
//! than the wall clock. Segments are laid end to end: each one starts where
//! the previous one ends, so nothing drifts within a cycle no matter how much
//! the tick driver jitters.
//!
//! | phase             | envelope                                  |
//! |-------------------|-------------------------------------------|
//! | inhale            | logistic rise to 1 over the inhale        |
//! | hold after inhale | low plateau (0.03)                        |
//! | exhale            | logistic fall to 0 over the exhale        |
//! | hold after exhale | near-silent plateau (0.01)                |

use crate::automation::AutomatableParam;
use crate::envelope::{self, BreathCurves, CURVE_RESOLUTION};
use crate::error::Result;
use crate::pattern::{BreathingPattern, Phase};
use crate::synth::{SynthBackend, VoiceConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub voice: VoiceConfig,
    /// Gain held during the hold after inhale
    pub hold_after_inhale_level: f32,
    /// Gain held during the hold after exhale
    pub hold_after_exhale_level: f32,
    /// Delay between a scheduling call and the first segment, in seconds
    pub lead_in: f64,
    /// Delay before oscillators stop on teardown, in seconds
    pub stop_delay: f64,
    /// Points per envelope curve
    pub curve_resolution: usize,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            voice: VoiceConfig::default(),
            hold_after_inhale_level: 0.03,
            hold_after_exhale_level: 0.01,
            lead_in: 0.05,
            stop_delay: 0.1,
            curve_resolution: CURVE_RESOLUTION,
        }
    }
}

/// How the gain moves during one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentShape {
    /// Logistic rise, starting `from` (0..1) of the way along the curve
    Rise { from: f64 },
    /// Logistic fall, starting `from` (0..1) of the way along the curve
    Fall { from: f64 },
    /// Constant level
    Plateau { level: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub phase: Phase,
    pub start: f64,
    pub duration: f64,
    pub shape: SegmentShape,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Gain at the first instant of the segment
    pub fn start_level(&self) -> f32 {
        match self.shape {
            SegmentShape::Rise { from } => envelope::sigmoid(from as f32),
            SegmentShape::Fall { from } => 1.0 - envelope::sigmoid(from as f32),
            SegmentShape::Plateau { level } => level,
        }
    }
}

/// Automation laid out for the remainder of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CyclePlan {
    /// Synthesis time of the scheduling call
    pub anchor: f64,
    /// Gain pinned at `anchor` before the first segment
    pub anchor_level: f32,
    pub segments: Vec<Segment>,
}

impl CyclePlan {
    pub fn segment(&self, phase: Phase) -> Option<&Segment> {
        self.segments.iter().find(|s| s.phase == phase)
    }

    /// Whether `phase` is scheduled and not yet over at `now`
    pub fn covers(&self, phase: Phase, now: f64) -> bool {
        self.segment(phase).map_or(false, |s| s.end() > now)
    }

    pub fn end(&self) -> f64 {
        self.segments.last().map_or(self.anchor, Segment::end)
    }
}

/// Lay out segments from `from` to the end of the cycle.
///
/// `remaining` shortens the first segment to the time actually left in a
/// phase that is already under way; curves then start part-way along.
pub fn plan_cycle(
    pattern: &BreathingPattern,
    from: Phase,
    remaining: Option<f64>,
    now: f64,
    config: &SoundConfig,
) -> CyclePlan {
    let mut segments = Vec::new();
    let mut current = now + config.lead_in;

    for phase in Phase::ALL.into_iter().skip_while(|&p| p != from) {
        let full = pattern.duration(phase) as f64;
        if full <= 0.0 {
            continue;
        }

        let duration = match remaining {
            Some(left) if phase == from => left.min(full),
            _ => full,
        };
        if duration <= 0.0 {
            continue;
        }

        let elapsed = 1.0 - duration / full;
        let shape = match phase {
            Phase::Inhale => SegmentShape::Rise { from: elapsed },
            Phase::Exhale => SegmentShape::Fall { from: elapsed },
            Phase::HoldAfterInhale => SegmentShape::Plateau {
                level: config.hold_after_inhale_level,
            },
            Phase::HoldAfterExhale => SegmentShape::Plateau {
                level: config.hold_after_exhale_level,
            },
        };

        segments.push(Segment {
            phase,
            start: current,
            duration,
            shape,
        });
        current += duration;
    }

    let fresh_inhale = from == Phase::Inhale && remaining.is_none();
    let anchor_level = match segments.first() {
        Some(first) if !fresh_inhale => first.start_level(),
        _ => 0.0,
    };

    CyclePlan {
        anchor: now,
        anchor_level,
        segments,
    }
}

pub struct SoundScheduler<B: SynthBackend> {
    backend: B,
    config: SoundConfig,
    curves: BreathCurves,
    plan: Option<CyclePlan>,
    initialized: bool,
}

impl<B: SynthBackend> SoundScheduler<B> {
    pub fn new(backend: B, config: SoundConfig) -> Self {
        let curves = BreathCurves::new(config.curve_resolution);
        Self {
            backend,
            config,
            curves,
            plan: None,
            initialized: false,
        }
    }

    /// Build and start the oscillator bank, then resume a suspended backend
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.backend.init_voice(&self.config.voice)?;
        if self.backend.is_suspended() {
            self.backend.resume()?;
        }
        self.initialized = true;
        info!(
            base_hz = self.config.voice.base_frequency,
            partials = self.config.voice.partial_weights.len(),
            "Breathing tone initialized"
        );
        Ok(())
    }

    /// React to the phase clock entering `phase`.
    ///
    /// Entering the inhale schedules a full cycle. Other phases only schedule
    /// when the current plan does not already cover them. Returns whether new
    /// automation was written.
    pub fn on_phase_enter(&mut self, phase: Phase, pattern: &BreathingPattern) -> bool {
        if !self.initialized {
            debug!(phase = %phase, "Sound not initialized, skipping envelope");
            return false;
        }

        let now = self.backend.current_time();
        let covered = self
            .plan
            .as_ref()
            .map_or(false, |plan| plan.covers(phase, now));
        if phase != Phase::Inhale && covered {
            return false;
        }

        let plan = plan_cycle(pattern, phase, None, now, &self.config);
        self.schedule(plan)
    }

    /// Pick up mid-phase after a pause, with `time_left` seconds of `phase` to go
    pub fn resync(&mut self, phase: Phase, time_left: u32, pattern: &BreathingPattern) -> bool {
        if !self.initialized {
            return false;
        }
        let now = self.backend.current_time();
        let plan = plan_cycle(pattern, phase, Some(time_left as f64), now, &self.config);
        self.schedule(plan)
    }

    fn schedule(&mut self, plan: CyclePlan) -> bool {
        let curves = &self.curves;
        let result = self
            .backend
            .with_master_gain(|gain| apply_plan(gain, &plan, curves));

        match result {
            Ok(()) => {
                debug!(
                    anchor = plan.anchor,
                    segments = plan.segments.len(),
                    end = plan.end(),
                    "Envelope scheduled"
                );
                self.plan = Some(plan);
                true
            }
            Err(e) => {
                error!("Error scheduling audio: {}", e);
                self.force_silence();
                false
            }
        }
    }

    /// Drop pending automation and go silent
    pub fn hush(&mut self) {
        self.force_silence();
    }

    fn force_silence(&mut self) {
        self.backend.with_master_gain(|gain| gain.set_value(0.0));
        self.plan = None;
    }

    /// Tear down: gain to zero now, oscillators stop shortly after
    pub fn stop(&mut self) {
        if !self.initialized {
            return;
        }
        self.force_silence();
        let when = self.backend.current_time() + self.config.stop_delay;
        self.backend.stop_at(when);
        self.initialized = false;
        info!(at = when, "Breathing tone stopped");
    }

    pub fn plan(&self) -> Option<&CyclePlan> {
        self.plan.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &SoundConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

fn apply_plan(gain: &mut dyn AutomatableParam, plan: &CyclePlan, curves: &BreathCurves) -> Result<()> {
    gain.cancel_scheduled_values(plan.anchor);
    gain.set_value_at_time(plan.anchor_level, plan.anchor)?;

    for segment in &plan.segments {
        match segment.shape {
            SegmentShape::Rise { from } => gain.set_value_curve_at_time(
                envelope::slice_from(&curves.fade_in, from),
                segment.start,
                segment.duration,
            )?,
            SegmentShape::Fall { from } => gain.set_value_curve_at_time(
                envelope::slice_from(&curves.fade_out, from),
                segment.start,
                segment.duration,
            )?,
            SegmentShape::Plateau { level } => gain.set_value_at_time(level, segment.start)?,
        }
    }
    Ok(())
}
