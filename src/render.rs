//! Offline rendering of a breathing session
//!
//! Runs an [`ExerciseController`] against an in-memory [`SoundGraph`] the same
//! way the live player does, one second of audio per clock second, and writes
//! the result to a WAV file.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exercise::ExerciseController;
use crate::synth::SoundGraph;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Configuration for rendering audio
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Get-ready countdown rendered as silence before the first breath
    pub countdown_seconds: u32,
    /// Seconds rendered after the session ends
    pub tail_seconds: f32,
    /// Patterns and sound settings
    pub app: Config,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            countdown_seconds: 0,
            tail_seconds: 0.25,
            app: Config::default(),
        }
    }
}

pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render `repetitions` cycles of `pattern` to a WAV file
    pub fn render_session(
        &self,
        pattern: &str,
        repetitions: u32,
        output_path: &Path,
    ) -> Result<RenderStats> {
        let samples = self.render_to_buffer(pattern, repetitions)?;
        let stats = RenderStats::from_samples(&samples, self.config.sample_rate);
        self.write_wav(output_path, &samples)?;
        info!(
            path = %output_path.display(),
            frames = stats.frames,
            seconds = stats.duration_secs,
            "Session rendered"
        );
        Ok(stats)
    }

    /// Render to memory (mono samples)
    pub fn render_to_buffer(&self, pattern: &str, repetitions: u32) -> Result<Vec<f32>> {
        let mut app = self.config.app.clone();
        app.countdown_seconds = self.config.countdown_seconds;

        let graph = SoundGraph::new(self.config.sample_rate);
        let mut controller = ExerciseController::from_config(&app, graph)?;
        controller.select_pattern(pattern)?;
        controller.set_repetitions(repetitions);

        let session_seconds = controller
            .repetitions()
            .checked_mul(controller.clock().pattern().cycle_seconds())
            .and_then(|s| s.checked_add(self.config.countdown_seconds))
            .ok_or_else(|| {
                Error::Render(format!(
                    "{} x{} is too long to render",
                    pattern,
                    controller.repetitions()
                ))
            })?;
        let frames_per_second = self.config.sample_rate as usize;
        let mut samples = Vec::new();

        controller.start();
        let mut elapsed = 0;
        while controller.is_active() && elapsed < session_seconds {
            let block = controller
                .sound_mut()
                .backend_mut()
                .render_frames(frames_per_second);
            samples.extend_from_slice(&block);
            controller.advance(Duration::from_secs(1));
            elapsed += 1;
        }

        controller.shutdown();
        let tail = (self.config.tail_seconds.max(0.0) * self.config.sample_rate as f32) as usize;
        if tail > 0 {
            let block = controller.sound_mut().backend_mut().render_frames(tail);
            samples.extend_from_slice(&block);
        }

        Ok(samples)
    }

    /// Write samples to a 32-bit float mono WAV file
    fn write_wav(&self, path: &Path, samples: &[f32]) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.config.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in samples {
            writer.write_sample(sample.clamp(-1.0, 1.0))?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// Statistics about rendered audio
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStats {
    pub frames: usize,
    pub duration_secs: f32,
    pub peak: f32,
    pub rms: f32,
}

impl RenderStats {
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        let frames = samples.len();
        if frames == 0 {
            return Self {
                frames,
                duration_secs: 0.0,
                peak: 0.0,
                rms: 0.0,
            };
        }

        let sum_squares: f32 = samples.iter().map(|x| x * x).sum();
        let rms = (sum_squares / frames as f32).sqrt();
        let peak = samples.iter().map(|x| x.abs()).fold(0.0f32, f32::max);

        Self {
            frames,
            duration_secs: frames as f32 / sample_rate.max(1) as f32,
            peak,
            rms,
        }
    }

    pub fn print_summary(&self) {
        println!("Render Statistics:");
        println!("  Duration:  {:.3} seconds", self.duration_secs);
        println!("  Frames:    {}", self.frames);
        println!("  RMS:       {:.4}", self.rms);
        println!("  Peak:      {:.4}", self.peak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        let mut app = Config::default();
        app.sound.curve_resolution = 256;
        Renderer::new(RenderConfig {
            sample_rate: 8000,
            tail_seconds: 0.0,
            app,
            ..RenderConfig::default()
        })
    }

    #[test]
    fn test_buffer_length_matches_session() {
        let samples = renderer().render_to_buffer("Energizing Breath", 2).unwrap();
        assert_eq!(samples.len(), 8 * 8000);
    }

    #[test]
    fn test_countdown_renders_silence() {
        let mut r = renderer();
        r.config.countdown_seconds = 2;
        let samples = r.render_to_buffer("Energizing Breath", 1).unwrap();
        assert_eq!(samples.len(), 6 * 8000);
        assert!(samples[..16000].iter().all(|s| *s == 0.0));
        assert!(samples[16000..].iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn test_overlong_session_is_an_error() {
        let result = renderer().render_to_buffer("Box Breathing", u32::MAX);
        assert!(matches!(result, Err(Error::Render(_))));
    }

    #[test]
    fn test_stats_of_empty_buffer() {
        let stats = RenderStats::from_samples(&[], 44100);
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.peak, 0.0);
    }
}
