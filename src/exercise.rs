//! Exercise controller: user intents on top of the phase clock and the tone
//!
//! Owns the selected pattern, the pre-start countdown, the [`PhaseClock`] and
//! the [`SoundScheduler`]. A front-end calls the intent methods (start, pause,
//! reset, select a pattern, change repetitions) and feeds elapsed time through
//! [`ExerciseController::advance`]; it reads back an [`ExerciseView`] to draw.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pattern::{BreathingPattern, PatternCatalog};
use crate::phase_clock::{ClockEvent, ClockState, PhaseClock};
use crate::sound::SoundScheduler;
use crate::synth::SynthBackend;
use std::time::Duration;
use tracing::{debug, info, warn};

const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pattern picker
    Settings,
    /// Get-ready countdown before the first breath
    CountingDown { remaining: u32 },
    Breathing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseEvent {
    CountdownTick { remaining: u32 },
    /// Countdown over, clock running
    Started,
    Clock(ClockEvent),
}

/// Everything a front-end needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseView {
    pub mode: Mode,
    pub pattern_name: String,
    pub pattern: BreathingPattern,
    pub clock: ClockState,
    /// Seconds into the current phase
    pub phase_elapsed: f32,
}

pub struct ExerciseController<B: SynthBackend> {
    catalog: PatternCatalog,
    selected: String,
    clock: PhaseClock,
    sound: SoundScheduler<B>,
    mode: Mode,
    countdown_seconds: u32,
    countdown_carry: Duration,
}

impl<B: SynthBackend> ExerciseController<B> {
    pub fn new(
        catalog: PatternCatalog,
        pattern_name: &str,
        repetitions: u32,
        countdown_seconds: u32,
        sound: SoundScheduler<B>,
    ) -> Result<Self> {
        let selected = catalog
            .canonical_name(pattern_name)
            .ok_or_else(|| Error::UnknownPattern(pattern_name.to_string()))?
            .to_string();
        let pattern = catalog
            .get(&selected)
            .cloned()
            .ok_or_else(|| Error::UnknownPattern(selected.clone()))?;

        Ok(Self {
            catalog,
            selected,
            clock: PhaseClock::new(pattern, repetitions),
            sound,
            mode: Mode::Settings,
            countdown_seconds,
            countdown_carry: Duration::ZERO,
        })
    }

    /// Controller for `config`, driving `backend`
    pub fn from_config(config: &Config, backend: B) -> Result<Self> {
        let sound = SoundScheduler::new(backend, config.sound.clone());
        Self::new(
            config.catalog()?,
            &config.default_pattern,
            config.repetitions,
            config.countdown_seconds,
            sound,
        )
    }

    /// Switch technique. Any run in progress stops and the picker comes back.
    pub fn select_pattern(&mut self, name: &str) -> Result<()> {
        let canonical = self
            .catalog
            .canonical_name(name)
            .ok_or_else(|| Error::UnknownPattern(name.to_string()))?
            .to_string();
        let pattern = self
            .catalog
            .get(&canonical)
            .cloned()
            .ok_or_else(|| Error::UnknownPattern(canonical.clone()))?;

        info!(pattern = %canonical, "Pattern selected");
        self.selected = canonical;
        self.clock.select_pattern(pattern);
        self.sound.hush();
        self.mode = Mode::Settings;
        self.countdown_carry = Duration::ZERO;
        Ok(())
    }

    pub fn select_next_pattern(&mut self) -> Result<()> {
        let next = self.catalog.next_name(&self.selected).map(str::to_string);
        match next {
            Some(name) => self.select_pattern(&name),
            None => Ok(()),
        }
    }

    pub fn select_previous_pattern(&mut self) -> Result<()> {
        let prev = self.catalog.previous_name(&self.selected).map(str::to_string);
        match prev {
            Some(name) => self.select_pattern(&name),
            None => Ok(()),
        }
    }

    /// Only honoured while the clock is not running (picker or paused).
    /// Returns whether it applied.
    pub fn set_repetitions(&mut self, repetitions: u32) -> bool {
        if matches!(self.mode, Mode::Breathing | Mode::CountingDown { .. }) {
            debug!("Repetitions are locked while a session is running");
            return false;
        }
        self.clock.set_repetitions_target(repetitions);
        true
    }

    pub fn increase_repetitions(&mut self) -> bool {
        self.set_repetitions(self.clock.repetitions_target().saturating_add(1))
    }

    pub fn decrease_repetitions(&mut self) -> bool {
        self.set_repetitions(self.clock.repetitions_target().saturating_sub(1).max(1))
    }

    /// Begin the get-ready countdown. Audio is initialized here, on the user's gesture.
    pub fn start(&mut self) -> Vec<ExerciseEvent> {
        if matches!(self.mode, Mode::Breathing | Mode::CountingDown { .. }) {
            return Vec::new();
        }

        if let Err(e) = self.sound.init() {
            warn!("Audio unavailable, continuing without sound: {}", e);
        }

        self.countdown_carry = Duration::ZERO;
        if self.countdown_seconds == 0 {
            return self.begin(Duration::ZERO);
        }

        self.mode = Mode::CountingDown {
            remaining: self.countdown_seconds,
        };
        debug!(seconds = self.countdown_seconds, "Countdown started");
        Vec::new()
    }

    /// Feed elapsed wall-clock time
    pub fn advance(&mut self, dt: Duration) -> Vec<ExerciseEvent> {
        match self.mode {
            Mode::CountingDown { remaining } => self.advance_countdown(remaining, dt),
            Mode::Breathing => self.drive_clock(dt),
            Mode::Settings | Mode::Paused => Vec::new(),
        }
    }

    fn advance_countdown(&mut self, mut remaining: u32, dt: Duration) -> Vec<ExerciseEvent> {
        let mut events = Vec::new();
        self.countdown_carry += dt;

        while self.countdown_carry >= ONE_SECOND {
            self.countdown_carry -= ONE_SECOND;
            remaining = remaining.saturating_sub(1);
            events.push(ExerciseEvent::CountdownTick { remaining });

            if remaining == 0 {
                let leftover = std::mem::take(&mut self.countdown_carry);
                events.extend(self.begin(leftover));
                return events;
            }
        }

        self.mode = Mode::CountingDown { remaining };
        events
    }

    fn begin(&mut self, leftover: Duration) -> Vec<ExerciseEvent> {
        self.mode = Mode::Breathing;
        let entered = self.clock.start();
        self.sound
            .on_phase_enter(self.clock.phase(), self.clock.pattern());

        let mut events = vec![ExerciseEvent::Started, ExerciseEvent::Clock(entered)];
        events.extend(self.drive_clock(leftover));
        events
    }

    fn drive_clock(&mut self, dt: Duration) -> Vec<ExerciseEvent> {
        let mut events = Vec::new();
        for event in self.clock.advance(dt) {
            match event {
                ClockEvent::PhaseEntered { phase } => {
                    self.sound.on_phase_enter(phase, self.clock.pattern());
                }
                ClockEvent::Finished => {
                    self.sound.hush();
                    self.mode = Mode::Settings;
                }
                ClockEvent::RepetitionCompleted { completed } => {
                    debug!(completed, "Repetition completed");
                }
            }
            events.push(ExerciseEvent::Clock(event));
        }
        events
    }

    /// Hold the breath where it is. Cancels a countdown outright.
    pub fn pause(&mut self) {
        match self.mode {
            Mode::Breathing => {
                self.clock.pause();
                self.sound.hush();
                self.mode = Mode::Paused;
                info!(phase = %self.clock.phase(), time_left = self.clock.time_left(), "Paused");
            }
            Mode::CountingDown { .. } => {
                self.countdown_carry = Duration::ZERO;
                self.mode = Mode::Settings;
            }
            Mode::Settings | Mode::Paused => {}
        }
    }

    /// Continue a paused run with the tone picked up mid-phase
    pub fn resume(&mut self) {
        if self.mode != Mode::Paused {
            return;
        }
        self.clock.resume();
        self.sound.resync(
            self.clock.phase(),
            self.clock.time_left(),
            self.clock.pattern(),
        );
        self.mode = Mode::Breathing;
        info!("Resumed");
    }

    pub fn toggle_pause(&mut self) {
        match self.mode {
            Mode::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// Back to the picker at the top of the inhale. Idempotent.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.sound.hush();
        self.mode = Mode::Settings;
        self.countdown_carry = Duration::ZERO;
    }

    /// Tear down the tone for good
    pub fn shutdown(&mut self) {
        self.reset();
        self.sound.stop();
    }

    pub fn view(&self) -> ExerciseView {
        ExerciseView {
            mode: self.mode,
            pattern_name: self.selected.clone(),
            pattern: self.clock.pattern().clone(),
            clock: self.clock.state(),
            phase_elapsed: self.clock.phase_elapsed(),
        }
    }

    /// A run is counting down, breathing or paused
    pub fn is_active(&self) -> bool {
        self.mode != Mode::Settings
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn clock(&self) -> &PhaseClock {
        &self.clock
    }

    pub fn sound(&self) -> &SoundScheduler<B> {
        &self.sound
    }

    pub fn sound_mut(&mut self) -> &mut SoundScheduler<B> {
        &mut self.sound
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn selected_pattern_name(&self) -> &str {
        &self.selected
    }

    pub fn repetitions(&self) -> u32 {
        self.clock.repetitions_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::SoundConfig;
    use crate::synth::SoundGraph;

    fn controller(countdown: u32) -> ExerciseController<SoundGraph> {
        let sound = SoundScheduler::new(SoundGraph::new(8000), SoundConfig {
            curve_resolution: 64,
            ..SoundConfig::default()
        });
        ExerciseController::new(PatternCatalog::builtin(), "box breathing", 2, countdown, sound)
            .unwrap()
    }

    #[test]
    fn test_unknown_pattern_is_rejected() {
        let sound = SoundScheduler::new(SoundGraph::new(8000), SoundConfig::default());
        let result = ExerciseController::new(PatternCatalog::builtin(), "Nope", 1, 3, sound);
        assert!(matches!(result, Err(Error::UnknownPattern(_))));
    }

    #[test]
    fn test_countdown_then_breathing() {
        let mut ctl = controller(3);
        assert!(ctl.start().is_empty());
        assert_eq!(ctl.mode(), Mode::CountingDown { remaining: 3 });

        let events = ctl.advance(Duration::from_secs(2));
        assert_eq!(
            events,
            vec![
                ExerciseEvent::CountdownTick { remaining: 2 },
                ExerciseEvent::CountdownTick { remaining: 1 },
            ]
        );
        assert!(!ctl.clock().is_running());

        let events = ctl.advance(Duration::from_secs(1));
        assert_eq!(events[0], ExerciseEvent::CountdownTick { remaining: 0 });
        assert_eq!(events[1], ExerciseEvent::Started);
        assert_eq!(ctl.mode(), Mode::Breathing);
        assert!(ctl.clock().is_running());
        assert_eq!(ctl.clock().time_left(), 4);
        assert!(ctl.sound().plan().is_some());
    }

    #[test]
    fn test_repetitions_locked_while_active() {
        let mut ctl = controller(0);
        assert!(ctl.decrease_repetitions());
        ctl.decrease_repetitions();
        assert_eq!(ctl.repetitions(), 1);
        ctl.start();
        assert!(!ctl.increase_repetitions());
        assert_eq!(ctl.repetitions(), 1);
    }

    #[test]
    fn test_repetitions_adjustable_while_paused() {
        let mut ctl = controller(0);
        ctl.start();
        ctl.advance(Duration::from_secs(5));
        ctl.pause();
        assert!(ctl.increase_repetitions());
        assert_eq!(ctl.repetitions(), 3);

        ctl.resume();
        assert!(!ctl.decrease_repetitions());
        let mut seconds = 5;
        while ctl.is_active() {
            ctl.advance(Duration::from_secs(1));
            seconds += 1;
            assert!(seconds < 100);
        }
        assert_eq!(seconds, 3 * 16);
    }

    #[test]
    fn test_pause_during_countdown_cancels() {
        let mut ctl = controller(3);
        ctl.start();
        ctl.advance(Duration::from_millis(1500));
        ctl.pause();
        assert_eq!(ctl.mode(), Mode::Settings);
        assert!(ctl.advance(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_select_next_pattern_wraps() {
        let mut ctl = controller(0);
        ctl.select_previous_pattern().unwrap();
        assert_eq!(ctl.selected_pattern_name(), "Lion's Breath");
        ctl.select_next_pattern().unwrap();
        assert_eq!(ctl.selected_pattern_name(), "Box Breathing");
    }
}
