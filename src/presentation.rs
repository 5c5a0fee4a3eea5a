//! Presentation binding: clock state -> visual parameters
//!
//! Pure functions, no UI toolkit assumptions. The mandala grows from 1.0 to
//! 1.3 over the inhale, holds, shrinks back over the exhale, and turns a full
//! revolution each way.

use crate::exercise::{ExerciseView, Mode};
use crate::pattern::Phase;

pub const REST_SCALE: f32 = 1.0;
pub const FULL_SCALE: f32 = 1.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Visuals {
    pub scale: f32,
    /// Degrees
    pub rotation: f32,
    /// Opacity of the ring of indicator dots
    pub indicator_opacity: f32,
    /// Large text: seconds left, or the countdown
    pub headline: String,
    /// Instruction under the headline
    pub label: String,
    /// "Cycle X of Y" while running, the cycle count otherwise
    pub cycle_text: String,
}

/// Scale of the mandala `progress` (0..1) of the way through `phase`
pub fn phase_scale(phase: Phase, progress: f32) -> f32 {
    let progress = progress.clamp(0.0, 1.0);
    match phase {
        Phase::Inhale => REST_SCALE + (FULL_SCALE - REST_SCALE) * progress,
        Phase::HoldAfterInhale => FULL_SCALE,
        Phase::Exhale => FULL_SCALE - (FULL_SCALE - REST_SCALE) * progress,
        Phase::HoldAfterExhale => REST_SCALE,
    }
}

/// Rotation in degrees `progress` of the way through `phase`
pub fn phase_rotation(phase: Phase, progress: f32) -> f32 {
    let progress = progress.clamp(0.0, 1.0);
    match phase {
        Phase::Inhale => 360.0 * progress,
        Phase::Exhale => -360.0 * progress,
        Phase::HoldAfterInhale | Phase::HoldAfterExhale => 0.0,
    }
}

pub fn indicator_opacity(phase: Phase) -> f32 {
    if phase.is_hold() {
        0.8
    } else {
        0.4
    }
}

/// Text for the get-ready countdown
pub fn countdown_text(remaining: u32) -> String {
    if remaining == 0 {
        "Start!".to_string()
    } else {
        remaining.to_string()
    }
}

pub fn bind(view: &ExerciseView) -> Visuals {
    let clock = &view.clock;
    match view.mode {
        Mode::Settings => resting(
            String::new(),
            view.pattern.description.clone(),
            format!("{} cycles", clock.repetitions_target),
        ),
        Mode::CountingDown { remaining } => resting(
            countdown_text(remaining),
            "Get Ready...".to_string(),
            format!("{} cycles", clock.repetitions_target),
        ),
        Mode::Breathing | Mode::Paused => {
            let duration = view.pattern.duration(clock.phase).max(1) as f32;
            let progress = view.phase_elapsed / duration;
            let label = if view.mode == Mode::Paused {
                format!("{} (paused)", clock.phase.label())
            } else {
                clock.phase.label().to_string()
            };
            Visuals {
                scale: phase_scale(clock.phase, progress),
                rotation: phase_rotation(clock.phase, progress),
                indicator_opacity: indicator_opacity(clock.phase),
                headline: clock.time_left.to_string(),
                label,
                cycle_text: format!(
                    "Cycle {} of {}",
                    clock.repetitions_done, clock.repetitions_target
                ),
            }
        }
    }
}

/// Idle screens show the hold-after-exhale pose
fn resting(headline: String, label: String, cycle_text: String) -> Visuals {
    Visuals {
        scale: REST_SCALE,
        rotation: 0.0,
        indicator_opacity: indicator_opacity(Phase::HoldAfterExhale),
        headline,
        label,
        cycle_text,
    }
}
