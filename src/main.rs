//! Breathwork CLI - guided breathing in the terminal

use breathwork::audio::AudioEngine;
use breathwork::config::Config;
use breathwork::exercise::ExerciseController;
use breathwork::phase_clock::{ClockEvent, ClockState, PhaseClock};
use breathwork::render::{RenderConfig, Renderer};
use breathwork::synth::SoundGraph;
use breathwork::tui::SessionScreen;
use breathwork::Error;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(name = "breathwork")]
#[command(about = "Guided breathing exercises with a sine-tone breath guide", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/breathwork/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available breathing patterns
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run an interactive session in the terminal
    Run {
        /// Pattern name (case-insensitive)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Number of cycles
        #[arg(short, long)]
        repetitions: Option<u32>,

        /// Run without opening an audio device
        #[arg(long)]
        mute: bool,
    },

    /// Print the second-by-second phase timeline of a session
    Simulate {
        /// Pattern name (case-insensitive)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Number of cycles
        #[arg(short, long)]
        repetitions: Option<u32>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a session's breath tone to WAV
    Render {
        /// Output WAV file path
        output: PathBuf,

        /// Pattern name (case-insensitive)
        #[arg(short, long)]
        pattern: Option<String>,

        /// Number of cycles
        #[arg(short, long)]
        repetitions: Option<u32>,

        /// Sample rate in Hz (default: 44100)
        #[arg(short, long, default_value = "44100")]
        sample_rate: u32,

        /// Get-ready countdown in seconds (default: 0)
        #[arg(long, default_value = "0")]
        countdown: u32,
    },
}

#[derive(Serialize)]
struct PatternEntry<'a> {
    name: &'a str,
    inhale: u32,
    hold_after_inhale: u32,
    exhale: u32,
    hold_after_exhale: u32,
    cycle_seconds: u32,
    description: &'a str,
}

#[derive(Serialize)]
struct TimelineStep {
    second: u32,
    state: ClockState,
    events: Vec<ClockEvent>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they stay out of the session screen and JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::List { json } => list_patterns(&config, json)?,

        Commands::Run {
            pattern,
            repetitions,
            mute,
        } => {
            let pattern = pattern.unwrap_or_else(|| config.default_pattern.clone());
            let repetitions = repetitions.unwrap_or(config.repetitions);

            if mute {
                run_session(&config, SoundGraph::new(44100), &pattern, repetitions)?;
            } else {
                match AudioEngine::new() {
                    Ok(engine) => run_session(&config, engine, &pattern, repetitions)?,
                    Err(e) => {
                        warn!("Audio unavailable, running silently: {}", e);
                        run_session(&config, SoundGraph::new(44100), &pattern, repetitions)?;
                    }
                }
            }
        }

        Commands::Simulate {
            pattern,
            repetitions,
            json,
        } => {
            let pattern = pattern.unwrap_or_else(|| config.default_pattern.clone());
            let repetitions = repetitions.unwrap_or(config.repetitions);
            simulate(&config, &pattern, repetitions, json)?;
        }

        Commands::Render {
            output,
            pattern,
            repetitions,
            sample_rate,
            countdown,
        } => {
            let pattern = pattern.unwrap_or_else(|| config.default_pattern.clone());
            let repetitions = repetitions.unwrap_or(config.repetitions);
            render(config, &output, &pattern, repetitions, sample_rate, countdown)?;
        }
    }

    Ok(())
}

fn list_patterns(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = config.catalog()?;
    let entries: Vec<PatternEntry> = catalog
        .iter()
        .map(|(name, p)| PatternEntry {
            name,
            inhale: p.inhale,
            hold_after_inhale: p.hold_after_inhale,
            exhale: p.exhale,
            hold_after_exhale: p.hold_after_exhale,
            cycle_seconds: p.cycle_seconds(),
            description: &p.description,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<20} {}-{}-{}-{}  ({}s)  {}",
            entry.name,
            entry.inhale,
            entry.hold_after_inhale,
            entry.exhale,
            entry.hold_after_exhale,
            entry.cycle_seconds,
            entry.description
        );
    }
    Ok(())
}

fn run_session<B: breathwork::synth::SynthBackend>(
    config: &Config,
    backend: B,
    pattern: &str,
    repetitions: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = ExerciseController::from_config(config, backend)?;
    controller.select_pattern(pattern)?;
    controller.set_repetitions(repetitions);

    let mut screen = SessionScreen::new(controller);
    screen.run()
}

fn simulate(
    config: &Config,
    pattern: &str,
    repetitions: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = config.catalog()?;
    let selected = catalog
        .get(pattern)
        .cloned()
        .ok_or_else(|| Error::UnknownPattern(pattern.to_string()))?;

    let mut clock = PhaseClock::new(selected, repetitions);
    let first = clock.start();
    let mut steps = vec![TimelineStep {
        second: 0,
        state: clock.state(),
        events: vec![first],
    }];

    let mut second = 0;
    while clock.is_running() {
        second += 1;
        let events = clock.tick();
        steps.push(TimelineStep {
            second,
            state: clock.state(),
            events,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    for step in &steps {
        let state = &step.state;
        let notes: Vec<String> = step
            .events
            .iter()
            .map(|event| match event {
                ClockEvent::PhaseEntered { phase } => format!("-> {}", phase),
                ClockEvent::RepetitionCompleted { completed } => {
                    format!("cycle {} done", completed)
                }
                ClockEvent::Finished => "finished".to_string(),
            })
            .collect();
        println!(
            "{:>4}s  {:<16} {:>2}s left  cycle {}/{}  {}",
            step.second,
            state.phase.as_str(),
            state.time_left,
            state.repetitions_done,
            state.repetitions_target,
            notes.join(", ")
        );
    }
    Ok(())
}

fn render(
    config: Config,
    output: &Path,
    pattern: &str,
    repetitions: u32,
    sample_rate: u32,
    countdown: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🎵 Rendering {} x{} to {}", pattern, repetitions, output.display());

    let renderer = Renderer::new(RenderConfig {
        sample_rate,
        countdown_seconds: countdown,
        app: config,
        ..RenderConfig::default()
    });
    let stats = renderer.render_session(pattern, repetitions, output)?;
    stats.print_summary();
    Ok(())
}
