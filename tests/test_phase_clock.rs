/// Phase clock timing tests
///
/// Checks the tick-level contract of the breathing clock against every
/// built-in pattern:
/// 1. A session of R repetitions lasts exactly R x cycle ticks
/// 2. Each phase is observed for exactly its duration, zero-length holds never
/// 3. Boundaries land on the expected ticks for box and 4-7-8 breathing
/// 4. Reset and pattern switches put the clock back at the top of the inhale
use breathwork::pattern::{BreathingPattern, PatternCatalog, Phase};
use breathwork::phase_clock::{ClockEvent, PhaseClock};
use std::collections::HashMap;
use std::time::Duration;

fn builtin(name: &str) -> BreathingPattern {
    PatternCatalog::builtin()
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("missing builtin pattern {}", name))
}

/// Tick until the clock stops, returning every tick's events
fn run_to_completion(clock: &mut PhaseClock) -> Vec<Vec<ClockEvent>> {
    let mut ticks = Vec::new();
    while clock.is_running() {
        ticks.push(clock.tick());
        assert!(ticks.len() < 10_000, "clock never finished");
    }
    ticks
}

fn entered_phases(ticks: &[Vec<ClockEvent>]) -> Vec<Phase> {
    ticks
        .iter()
        .flatten()
        .filter_map(|event| match event {
            ClockEvent::PhaseEntered { phase } => Some(*phase),
            _ => None,
        })
        .collect()
}

#[test]
fn test_session_length_for_all_patterns() {
    let catalog = PatternCatalog::builtin();
    for (name, pattern) in catalog.iter() {
        for repetitions in 1..=4 {
            let mut clock = PhaseClock::new(pattern.clone(), repetitions);
            clock.start();
            let ticks = run_to_completion(&mut clock);

            assert_eq!(
                ticks.len() as u32,
                repetitions * pattern.cycle_seconds(),
                "{} x{}",
                name,
                repetitions
            );

            let finished = ticks
                .iter()
                .flatten()
                .filter(|e| **e == ClockEvent::Finished)
                .count();
            assert_eq!(finished, 1, "{} x{} should finish once", name, repetitions);
            assert!(!clock.is_running());
            assert_eq!(clock.repetitions_done(), 1);
        }
    }
}

#[test]
fn test_each_phase_observed_for_its_duration() {
    let catalog = PatternCatalog::builtin();
    for (name, pattern) in catalog.iter() {
        let repetitions = 3;
        let mut clock = PhaseClock::new(pattern.clone(), repetitions);
        clock.start();

        let mut observed: HashMap<Phase, u32> = HashMap::new();
        while clock.is_running() {
            assert!(clock.time_left() > 0, "{}: running with time_left 0", name);
            *observed.entry(clock.phase()).or_default() += 1;
            clock.tick();
        }

        for phase in Phase::ALL {
            let expected = pattern.duration(phase) * repetitions;
            assert_eq!(
                observed.get(&phase).copied().unwrap_or(0),
                expected,
                "{}: seconds spent in {}",
                name,
                phase
            );
        }
    }
}

#[test]
fn test_box_breathing_boundaries() {
    let mut clock = PhaseClock::new(builtin("Box Breathing"), 2);
    clock.start();

    let mut boundaries = Vec::new();
    for second in 1..=16 {
        let events = clock.tick();
        if !events.is_empty() {
            boundaries.push((second, clock.phase()));
        }
        if second == 16 {
            assert!(events.contains(&ClockEvent::RepetitionCompleted { completed: 1 }));
        }
    }

    assert_eq!(
        boundaries,
        vec![
            (4, Phase::HoldAfterInhale),
            (8, Phase::Exhale),
            (12, Phase::HoldAfterExhale),
            (16, Phase::Inhale),
        ]
    );
    assert_eq!(clock.repetitions_done(), 2);
    assert_eq!(clock.time_left(), 4);
    assert!(clock.is_running());
}

#[test]
fn test_four_seven_eight_twice() {
    let mut clock = PhaseClock::new(builtin("4-7-8 Breathing"), 2);
    let first = clock.start();
    assert_eq!(first, ClockEvent::PhaseEntered { phase: Phase::Inhale });

    let ticks = run_to_completion(&mut clock);
    assert_eq!(ticks.len(), 38);

    assert_eq!(
        entered_phases(&ticks),
        vec![
            Phase::HoldAfterInhale,
            Phase::Exhale,
            Phase::Inhale,
            Phase::HoldAfterInhale,
            Phase::Exhale,
        ]
    );

    // Cycle 1 closes on tick 19 straight into the next inhale
    assert_eq!(
        ticks[18],
        vec![
            ClockEvent::RepetitionCompleted { completed: 1 },
            ClockEvent::PhaseEntered { phase: Phase::Inhale },
        ]
    );
    assert_eq!(
        ticks[37],
        vec![
            ClockEvent::RepetitionCompleted { completed: 2 },
            ClockEvent::Finished,
        ]
    );
}

#[test]
fn test_ocean_breath_never_holds() {
    let mut clock = PhaseClock::new(builtin("Ocean Breath"), 2);
    clock.start();
    let ticks = run_to_completion(&mut clock);

    assert_eq!(ticks.len(), 20);
    assert_eq!(
        entered_phases(&ticks),
        vec![Phase::Exhale, Phase::Inhale, Phase::Exhale]
    );
}

#[test]
fn test_reset_is_idempotent() {
    let mut clock = PhaseClock::new(builtin("Deep Calm"), 3);
    clock.start();
    for _ in 0..9 {
        clock.tick();
    }

    clock.reset();
    let once = clock.state();
    clock.reset();
    assert_eq!(clock.state(), once);

    assert_eq!(once.phase, Phase::Inhale);
    assert_eq!(once.time_left, 5);
    assert_eq!(once.repetitions_done, 1);
    assert!(!once.running);
    assert!(clock.tick().is_empty());
}

#[test]
fn test_pattern_switch_mid_run() {
    let mut clock = PhaseClock::new(builtin("Box Breathing"), 2);
    clock.start();
    for _ in 0..6 {
        clock.tick();
    }
    assert_eq!(clock.phase(), Phase::HoldAfterInhale);

    clock.select_pattern(builtin("Energizing Breath"));
    assert!(!clock.is_running());
    assert_eq!(clock.phase(), Phase::Inhale);
    assert_eq!(clock.time_left(), 2);
    assert_eq!(clock.repetitions_done(), 1);

    clock.start();
    let ticks = run_to_completion(&mut clock);
    assert_eq!(ticks.len(), 8);
}

#[test]
fn test_pause_keeps_position() {
    let mut clock = PhaseClock::new(builtin("Alternate Nostril"), 1);
    clock.start();
    for _ in 0..5 {
        clock.tick();
    }
    let before = clock.state();
    assert_eq!(before.phase, Phase::HoldAfterInhale);
    assert_eq!(before.time_left, 3);

    clock.pause();
    assert!(clock.tick().is_empty());
    assert!(clock.advance(Duration::from_secs(10)).is_empty());

    clock.resume();
    let after = clock.state();
    assert_eq!(after.phase, before.phase);
    assert_eq!(after.time_left, before.time_left);
    assert!(after.running);
}

#[test]
fn test_advance_carries_fractions() {
    let mut clock = PhaseClock::new(builtin("Box Breathing"), 1);
    clock.start();

    assert!(clock.advance(Duration::from_millis(2500)).is_empty());
    assert_eq!(clock.time_left(), 2);
    assert!((clock.phase_elapsed() - 2.5).abs() < 1e-3);

    let events = clock.advance(Duration::from_millis(1500));
    assert_eq!(
        events,
        vec![ClockEvent::PhaseEntered {
            phase: Phase::HoldAfterInhale
        }]
    );
    assert_eq!(clock.time_left(), 4);

    // A huge delta stops at the end of the session
    let events = clock.advance(Duration::from_secs(3600));
    assert_eq!(events.last(), Some(&ClockEvent::Finished));
    assert!(!clock.is_running());
}

#[test]
fn test_lowering_target_mid_run_finishes_current_cycle() {
    let mut clock = PhaseClock::new(builtin("Box Breathing"), 3);
    clock.start();
    for _ in 0..20 {
        assert!(!clock.tick().contains(&ClockEvent::Finished));
    }
    assert_eq!(clock.repetitions_done(), 2);
    assert_eq!(clock.phase(), Phase::HoldAfterInhale);

    clock.set_repetitions_target(1);
    assert!(clock.is_running());

    let mut ticks = 20;
    loop {
        let events = clock.tick();
        ticks += 1;
        if events.contains(&ClockEvent::Finished) {
            assert!(events.contains(&ClockEvent::RepetitionCompleted { completed: 2 }));
            break;
        }
        assert!(ticks < 100, "clock never finished");
    }
    assert_eq!(ticks, 32);
    assert!(!clock.is_running());
}

#[test]
fn test_raising_target_mid_run_adds_cycles() {
    let mut clock = PhaseClock::new(builtin("4-7-8 Breathing"), 1);
    clock.start();
    for _ in 0..10 {
        clock.tick();
    }
    clock.set_repetitions_target(3);

    let ticks = run_to_completion(&mut clock);
    assert_eq!(10 + ticks.len(), 3 * 19);

    let completed: Vec<u32> = ticks
        .iter()
        .flatten()
        .filter_map(|event| match event {
            ClockEvent::RepetitionCompleted { completed } => Some(*completed),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3]);
}

#[test]
fn test_repetitions_target_is_clamped() {
    let mut clock = PhaseClock::new(builtin("Energizing Breath"), 0);
    assert_eq!(clock.repetitions_target(), 1);
    clock.set_repetitions_target(0);
    assert_eq!(clock.repetitions_target(), 1);

    clock.start();
    assert_eq!(run_to_completion(&mut clock).len(), 4);
}
