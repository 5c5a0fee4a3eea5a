//! Terminal session screen
//!
//! Full-screen view of a running exercise. The breath is drawn as a gauge
//! that fills on the inhale and drains on the exhale, with the countdown or
//! seconds left, the instruction and the cycle counter.

use crate::exercise::{ExerciseController, ExerciseEvent, Mode};
use crate::phase_clock::ClockEvent;
use crate::presentation::{self, Visuals, FULL_SCALE, REST_SCALE};
use crate::synth::SynthBackend;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tracing::warn;

const HELP_TEXT: &str =
    "s/Enter: start | space/p: pause | r: reset | ←/→: pattern | +/-: cycles | q: quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyResult {
    Continue,
    Quit,
}

pub struct SessionScreen<B: SynthBackend> {
    controller: ExerciseController<B>,
    status_message: String,
}

impl<B: SynthBackend> SessionScreen<B> {
    pub fn new(controller: ExerciseController<B>) -> Self {
        Self {
            controller,
            status_message: "Ready - press s to start".to_string(),
        }
    }

    /// Run until the user quits, then tear the tone down
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal);
        let restored = restore_terminal(&mut terminal);
        self.finish(result, restored)
    }

    /// Tear the tone down, then report the first failure
    fn finish(
        &mut self,
        result: Result<(), Box<dyn std::error::Error>>,
        restored: Result<(), Box<dyn std::error::Error>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.controller.shutdown();
        result.and(restored)
    }

    fn run_app(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            let events = self.controller.advance(now - last);
            last = now;
            self.note_events(&events);

            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key_event(key) == KeyResult::Quit {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyResult {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyResult::Quit,
            KeyCode::Char('s') | KeyCode::Enter => {
                let events = self.controller.start();
                self.note_events(&events);
            }
            KeyCode::Char(' ') | KeyCode::Char('p') => {
                self.controller.toggle_pause();
                self.status_message = match self.controller.mode() {
                    Mode::Paused => "Paused".to_string(),
                    Mode::Breathing => "Breathing".to_string(),
                    _ => "Ready - press s to start".to_string(),
                };
            }
            KeyCode::Char('r') => {
                self.controller.reset();
                self.status_message = "Reset".to_string();
            }
            KeyCode::Right | KeyCode::Left => {
                let result = if key.code == KeyCode::Right {
                    self.controller.select_next_pattern()
                } else {
                    self.controller.select_previous_pattern()
                };
                match result {
                    Ok(()) => {
                        self.status_message =
                            format!("Pattern: {}", self.controller.selected_pattern_name())
                    }
                    Err(e) => warn!("Pattern switch failed: {}", e),
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
                self.change_repetitions(true);
            }
            KeyCode::Char('-') | KeyCode::Down => {
                self.change_repetitions(false);
            }
            _ => {}
        }
        KeyResult::Continue
    }

    fn change_repetitions(&mut self, up: bool) {
        let applied = if up {
            self.controller.increase_repetitions()
        } else {
            self.controller.decrease_repetitions()
        };
        self.status_message = if applied {
            format!("{} cycles", self.controller.repetitions())
        } else {
            "Cycles are locked while breathing - pause to change them".to_string()
        };
    }

    fn note_events(&mut self, events: &[ExerciseEvent]) {
        for event in events {
            match event {
                ExerciseEvent::Started => self.status_message = "Breathing".to_string(),
                ExerciseEvent::Clock(ClockEvent::Finished) => {
                    self.status_message = "Session complete".to_string()
                }
                _ => {}
            }
        }
    }

    fn ui(&self, f: &mut Frame) {
        let view = self.controller.view();
        let visuals = presentation::bind(&view);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Pattern and cycles
                Constraint::Min(5),    // Breath
                Constraint::Length(3), // Breath gauge
                Constraint::Length(2), // Status and help
            ])
            .split(f.size());

        let header = Paragraph::new(format!("{}    {}", view.pattern_name, visuals.cycle_text))
            .block(
                Block::default()
                    .title("Breathwork")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::White)),
            )
            .alignment(Alignment::Center);
        f.render_widget(header, chunks[0]);

        let breath = Paragraph::new(vec![
            Line::from(""),
            Line::from(visuals.headline.clone()),
            Line::from(""),
            Line::from(visuals.label.clone()),
            Line::from(""),
            Line::from(indicator_ring(&visuals)),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);
        f.render_widget(breath, chunks[1]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(phase_color(&view.mode, &visuals)))
            .ratio(breath_ratio(visuals.scale));
        f.render_widget(gauge, chunks[2]);

        let status_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(chunks[3]);

        let status = Paragraph::new(self.status_message.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Left);
        let help = Paragraph::new(HELP_TEXT)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(status, status_chunks[0]);
        f.render_widget(help, status_chunks[1]);
    }
}

/// Every step is attempted even if an earlier one fails
fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = disable_raw_mode();
    let screen = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let cursor = terminal.show_cursor();
    raw?;
    screen?;
    cursor?;
    Ok(())
}

/// Gauge fill for a mandala scale
fn breath_ratio(scale: f32) -> f64 {
    (((scale - REST_SCALE) / (FULL_SCALE - REST_SCALE)) as f64).clamp(0.0, 1.0)
}

/// Eight dots, with the lit one following the rotation
fn indicator_ring(visuals: &Visuals) -> String {
    let lit = (visuals.rotation.rem_euclid(360.0) / 45.0) as usize % 8;
    let dim = visuals.indicator_opacity < 0.5;
    (0..8)
        .map(|i| match (i == lit, dim) {
            (true, _) => "●",
            (false, true) => "·",
            (false, false) => "○",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn phase_color(mode: &Mode, visuals: &Visuals) -> Color {
    match mode {
        Mode::Paused => Color::DarkGray,
        Mode::Breathing if visuals.indicator_opacity > 0.5 => Color::Magenta,
        Mode::Breathing => Color::Cyan,
        Mode::Settings | Mode::CountingDown { .. } => Color::Blue,
    }
}
