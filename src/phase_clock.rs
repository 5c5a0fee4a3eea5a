//! Phase clock - the breathing state machine
//!
//! Advances through inhale / hold / exhale / hold once per second, looping
//! over repetitions until the target count is reached. The clock is a pure
//! state machine: it never reads a timer itself. A driver calls [`PhaseClock::tick`]
//! once per elapsed second, or [`PhaseClock::advance`] with arbitrary deltas.
//!
//! A tick decrements `time_left`; when it reaches zero the transition to the
//! next non-empty phase happens in the same tick. A phase of `d` seconds is
//! therefore observed for exactly `d` ticks and never with `time_left == 0`
//! while running.

use crate::pattern::{BreathingPattern, Phase};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Something that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClockEvent {
    /// A new phase began with its full duration on the clock
    PhaseEntered { phase: Phase },
    /// A full cycle finished; `completed` is the repetition number just done
    RepetitionCompleted { completed: u32 },
    /// The last repetition finished and the clock stopped
    Finished,
}

/// Snapshot read by presentation code once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockState {
    pub phase: Phase,
    pub time_left: u32,
    pub repetitions_done: u32,
    pub repetitions_target: u32,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct PhaseClock {
    pattern: BreathingPattern,
    phase: Phase,
    time_left: u32,
    repetitions_target: u32,
    repetitions_done: u32,
    running: bool,
    /// Sub-second remainder carried between `advance` calls
    carry: Duration,
}

impl PhaseClock {
    /// Idle clock positioned at the start of `pattern`
    pub fn new(pattern: BreathingPattern, repetitions_target: u32) -> Self {
        Self {
            phase: Phase::Inhale,
            time_left: pattern.inhale,
            pattern,
            repetitions_target: repetitions_target.max(1),
            repetitions_done: 1,
            running: false,
            carry: Duration::ZERO,
        }
    }

    /// Begin a fresh run at the top of the inhale
    pub fn start(&mut self) -> ClockEvent {
        self.reset();
        self.running = true;
        info!(
            repetitions = self.repetitions_target,
            cycle_secs = self.pattern.cycle_seconds(),
            "Breathing clock started"
        );
        ClockEvent::PhaseEntered { phase: Phase::Inhale }
    }

    /// Continue a paused run without touching phase or time left
    pub fn resume(&mut self) {
        if self.time_left == 0 {
            // A finished run has nothing left to resume
            warn!("resume() on a finished clock, restarting instead");
            self.start();
            return;
        }
        self.running = true;
    }

    /// Suspend ticking, keeping phase and time left
    pub fn pause(&mut self) {
        self.running = false;
        self.carry = Duration::ZERO;
    }

    /// Back to the top of the inhale with the clock stopped. Idempotent.
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = Phase::Inhale;
        self.time_left = self.pattern.inhale;
        self.repetitions_done = 1;
        self.carry = Duration::ZERO;
    }

    /// Switch technique. Stops the clock; durations are never hot-swapped.
    pub fn select_pattern(&mut self, pattern: BreathingPattern) {
        self.pattern = pattern;
        self.reset();
    }

    /// Takes effect at the next repetition-completion check
    pub fn set_repetitions_target(&mut self, target: u32) {
        self.repetitions_target = target.max(1);
    }

    /// Advance by one second
    pub fn tick(&mut self) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return events;
        }

        // Walk forward until a phase with a non-zero duration is found.
        // Two laps is plenty for any validated pattern.
        let mut phase = self.phase;
        for _ in 0..Phase::ALL.len() * 2 {
            if phase == Phase::HoldAfterExhale {
                events.push(ClockEvent::RepetitionCompleted {
                    completed: self.repetitions_done,
                });
                if self.repetitions_done >= self.repetitions_target {
                    self.finish();
                    events.push(ClockEvent::Finished);
                    return events;
                }
                self.repetitions_done += 1;
            }

            phase = phase.next();
            let duration = self.pattern.duration(phase);
            if duration > 0 {
                debug!(phase = %phase, duration, "Phase entered");
                self.phase = phase;
                self.time_left = duration;
                events.push(ClockEvent::PhaseEntered { phase });
                return events;
            }
        }

        warn!("Pattern has no phase with a positive duration, stopping");
        self.finish();
        events.push(ClockEvent::Finished);
        events
    }

    /// Feed elapsed wall-clock time; ticks once per whole second
    pub fn advance(&mut self, dt: Duration) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if !self.running {
            return events;
        }

        self.carry += dt;
        while self.running && self.carry >= ONE_SECOND {
            self.carry -= ONE_SECOND;
            events.extend(self.tick());
        }
        events
    }

    fn finish(&mut self) {
        info!(repetitions = self.repetitions_done, "Breathing session finished");
        self.running = false;
        self.repetitions_done = 1;
        self.carry = Duration::ZERO;
    }

    pub fn state(&self) -> ClockState {
        ClockState {
            phase: self.phase,
            time_left: self.time_left,
            repetitions_done: self.repetitions_done,
            repetitions_target: self.repetitions_target,
            running: self.running,
        }
    }

    /// Seconds spent in the current phase, including the carried fraction
    pub fn phase_elapsed(&self) -> f32 {
        let duration = self.pattern.duration(self.phase);
        let whole = duration.saturating_sub(self.time_left) as f32;
        (whole + self.carry.as_secs_f32()).min(duration as f32)
    }

    pub fn pattern(&self) -> &BreathingPattern {
        &self.pattern
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn repetitions_done(&self) -> u32 {
        self.repetitions_done
    }

    pub fn repetitions_target(&self) -> u32 {
        self.repetitions_target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(inhale: u32, hold_in: u32, exhale: u32, hold_out: u32) -> BreathingPattern {
        BreathingPattern::new(inhale, hold_in, exhale, hold_out, "").unwrap()
    }

    #[test]
    fn test_new_clock_is_idle_at_inhale() {
        let clock = PhaseClock::new(pattern(4, 4, 4, 4), 3);
        let state = clock.state();
        assert_eq!(state.phase, Phase::Inhale);
        assert_eq!(state.time_left, 4);
        assert_eq!(state.repetitions_done, 1);
        assert!(!state.running);
    }

    #[test]
    fn test_tick_is_ignored_while_stopped() {
        let mut clock = PhaseClock::new(pattern(4, 4, 4, 4), 1);
        assert!(clock.tick().is_empty());
        assert_eq!(clock.time_left(), 4);
    }

    #[test]
    fn test_phase_boundary_happens_on_last_tick() {
        let mut clock = PhaseClock::new(pattern(3, 0, 2, 0), 2);
        clock.start();
        assert!(clock.tick().is_empty());
        assert!(clock.tick().is_empty());
        assert_eq!(clock.time_left(), 1);
        assert_eq!(
            clock.tick(),
            vec![ClockEvent::PhaseEntered { phase: Phase::Exhale }]
        );
        assert_eq!(clock.time_left(), 2);
    }

    #[test]
    fn test_repetitions_target_clamped() {
        let mut clock = PhaseClock::new(pattern(2, 0, 2, 0), 0);
        assert_eq!(clock.repetitions_target(), 1);
        clock.set_repetitions_target(0);
        assert_eq!(clock.repetitions_target(), 1);
    }

    #[test]
    fn test_advance_carries_fractional_seconds() {
        let mut clock = PhaseClock::new(pattern(4, 0, 4, 0), 1);
        clock.start();
        clock.advance(Duration::from_millis(600));
        assert_eq!(clock.time_left(), 4);
        assert!((clock.phase_elapsed() - 0.6).abs() < 1e-3);
        clock.advance(Duration::from_millis(600));
        assert_eq!(clock.time_left(), 3);
        assert!((clock.phase_elapsed() - 1.2).abs() < 1e-3);
    }

    #[test]
    fn test_advance_stops_consuming_after_finish() {
        let mut clock = PhaseClock::new(pattern(1, 0, 1, 0), 1);
        clock.start();
        let events = clock.advance(Duration::from_secs(10));
        assert_eq!(events.last(), Some(&ClockEvent::Finished));
        assert!(!clock.is_running());
        assert_eq!(clock.phase_elapsed(), 1.0);
    }

    #[test]
    fn test_pause_preserves_position() {
        let mut clock = PhaseClock::new(pattern(4, 4, 4, 4), 1);
        clock.start();
        clock.tick();
        clock.tick();
        clock.pause();
        assert!(clock.tick().is_empty());
        assert_eq!(clock.time_left(), 2);
        clock.resume();
        clock.tick();
        assert_eq!(clock.time_left(), 1);
        assert_eq!(clock.phase(), Phase::Inhale);
    }
}
