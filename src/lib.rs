//! # Breathwork - Guided Breathing with a Sine-Tone Guide
//!
//! Breathwork walks the user through timed breathing techniques (box
//! breathing, 4-7-8, and friends). A once-per-second phase clock moves
//! through inhale, hold, exhale and hold, and a soft additive tone swells on
//! every inhale and fades on every exhale so the exercise can be followed
//! with eyes closed.
//!
//! ## Core Pieces
//!
//! - **Pattern catalog**: named four-phase timings with descriptions
//! - **Phase clock**: a pure, tick-driven state machine over phases and repetitions
//! - **Sound scheduler**: sigmoid gain envelopes written ahead of time onto an
//!   automatable master gain, re-anchored on every inhale
//! - **Sound graph**: three sine partials through a lowpass, rendered offline
//!   or streamed to the sound card through cpal
//! - **Presentation binding**: clock state to scale, rotation and labels
//!
//! ## Quick Start
//!
//! ### Driving the clock
//!
//! ```rust
//! use breathwork::pattern::{PatternCatalog, Phase};
//! use breathwork::phase_clock::PhaseClock;
//!
//! let catalog = PatternCatalog::builtin();
//! let pattern = catalog.get("4-7-8 Breathing").cloned().unwrap();
//!
//! let mut clock = PhaseClock::new(pattern, 2);
//! clock.start();
//!
//! let mut ticks = 0;
//! while clock.is_running() {
//!     clock.tick();
//!     ticks += 1;
//! }
//! assert_eq!(ticks, 38);
//! assert_eq!(clock.phase(), Phase::Exhale);
//! ```
//!
//! ### Rendering a session offline
//!
//! ```rust,no_run
//! use breathwork::render::{RenderConfig, Renderer};
//! use std::path::Path;
//!
//! let renderer = Renderer::new(RenderConfig::default());
//! let stats = renderer
//!     .render_session("Box Breathing", 3, Path::new("box.wav"))
//!     .unwrap();
//! println!("peak {:.3}", stats.peak);
//! ```
//!
//! ## Timing
//!
//! Phases last whole seconds. A phase of duration 0 is skipped, and inhale
//! and exhale are always at least one second. A session of `R` repetitions
//! lasts exactly `R` times the cycle length.

pub mod audio;
pub mod automation;
pub mod config;
pub mod envelope;
pub mod error;
pub mod exercise;
pub mod pattern;
pub mod phase_clock;
pub mod presentation;
pub mod render;
pub mod sound;
pub mod synth;
pub mod tui;

pub use error::{Error, Result};
pub use exercise::{ExerciseController, ExerciseEvent, Mode};
pub use pattern::{BreathingPattern, PatternCatalog, Phase};
pub use phase_clock::{ClockEvent, ClockState, PhaseClock};
pub use sound::{SoundConfig, SoundScheduler};
pub use synth::{SharedGraph, SoundGraph, SynthBackend};
