//! Sound graph: three sine partials -> lowpass -> master gain
//!
//! The timbre is fixed once the voice is built. The only parameter that moves
//! over time is the master gain, which follows a [`ParamTimeline`] evaluated
//! per sample against the graph's own clock (frames rendered / sample rate).

use crate::automation::{AutomatableParam, ParamTimeline};
use crate::error::{Error, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Timbre of the breathing tone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Fundamental in Hz; partial `n` (from 0) sounds at `(n + 1) * base_frequency`
    pub base_frequency: f32,
    /// Amplitude of each partial
    pub partial_weights: Vec<f32>,
    /// Lowpass cutoff in Hz
    pub filter_cutoff: f32,
    /// Lowpass resonance
    pub filter_q: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            base_frequency: 174.6,
            partial_weights: vec![0.6, 0.3, 0.1],
            filter_cutoff: 400.0,
            filter_q: 0.3,
        }
    }
}

/// What the sound scheduler needs from a synthesis engine
pub trait SynthBackend {
    /// Seconds on the synthesis clock
    fn current_time(&self) -> f64;

    /// Build the oscillator bank and start it running
    fn init_voice(&mut self, voice: &VoiceConfig) -> Result<()>;

    fn is_suspended(&self) -> bool;

    fn resume(&mut self) -> Result<()>;

    /// Silence the oscillators from `time` onward
    fn stop_at(&mut self, time: f64);

    /// Run `f` against the master gain parameter
    fn with_master_gain<R>(&mut self, f: impl FnOnce(&mut dyn AutomatableParam) -> R) -> R;
}

#[derive(Debug, Clone)]
struct Partial {
    frequency: f32,
    weight: f32,
    phase: f32,
}

pub struct SoundGraph {
    sample_rate: f32,
    frames: u64,
    partials: Vec<Partial>,
    filter: Option<DirectForm2Transposed<f32>>,
    master_gain: ParamTimeline,
    started: bool,
    suspended: bool,
    stop_time: Option<f64>,
}

impl SoundGraph {
    /// Empty, suspended graph with the master gain at 0
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            frames: 0,
            partials: Vec::new(),
            filter: None,
            master_gain: ParamTimeline::new(0.0),
            started: false,
            suspended: true,
            stop_time: None,
        }
    }

    /// Wire up the partials and the lowpass
    pub fn build(&mut self, voice: &VoiceConfig) -> Result<()> {
        let nyquist = self.sample_rate * 0.5;
        if voice.filter_cutoff <= 0.0 || voice.filter_cutoff >= nyquist {
            return Err(Error::Audio(format!(
                "filter cutoff {} Hz outside (0, {}) Hz",
                voice.filter_cutoff, nyquist
            )));
        }

        let coeffs = Coefficients::<f32>::from_params(
            Type::LowPass,
            self.sample_rate.hz(),
            voice.filter_cutoff.hz(),
            voice.filter_q,
        )
        .map_err(|e| Error::Audio(format!("lowpass coefficients: {:?}", e)))?;

        self.filter = Some(DirectForm2Transposed::<f32>::new(coeffs));
        self.partials = voice
            .partial_weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| Partial {
                frequency: voice.base_frequency * (i + 1) as f32,
                weight,
                phase: 0.0,
            })
            .collect();

        debug!(
            partials = self.partials.len(),
            base = voice.base_frequency,
            cutoff = voice.filter_cutoff,
            "Sound graph built"
        );
        Ok(())
    }

    /// Start the oscillators; they run until [`SoundGraph::stop_at`]
    pub fn start(&mut self) {
        self.started = true;
        self.stop_time = None;
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn master_gain(&self) -> &ParamTimeline {
        &self.master_gain
    }

    pub fn master_gain_mut(&mut self) -> &mut ParamTimeline {
        &mut self.master_gain
    }

    pub fn is_sounding(&self) -> bool {
        self.started && self.stop_time.map_or(true, |t| self.current_time() < t)
    }

    /// Produce one mono sample. A suspended graph outputs silence and its clock stands still.
    pub fn next_sample(&mut self) -> f32 {
        if self.suspended {
            return 0.0;
        }

        let t = self.current_time();
        self.frames += 1;

        if !self.started || self.stop_time.map_or(false, |stop| t >= stop) {
            return 0.0;
        }

        let mut mix = 0.0;
        for partial in &mut self.partials {
            mix += partial.weight * (TAU * partial.phase).sin();
            partial.phase += partial.frequency / self.sample_rate;
            if partial.phase >= 1.0 {
                partial.phase -= 1.0;
            }
        }

        let filtered = match self.filter.as_mut() {
            Some(filter) => filter.run(mix),
            None => mix,
        };

        filtered * self.master_gain.value_at(t)
    }

    /// Fill `output` with mono samples
    pub fn render(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.next_sample();
        }
        self.master_gain.prune_before(self.current_time());
    }

    /// Render `num_frames` mono samples
    pub fn render_frames(&mut self, num_frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; num_frames];
        self.render(&mut buffer);
        buffer
    }
}

impl SynthBackend for SoundGraph {
    fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    fn init_voice(&mut self, voice: &VoiceConfig) -> Result<()> {
        self.build(voice)?;
        self.master_gain.set_value(0.0);
        self.start();
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) -> Result<()> {
        if self.suspended {
            info!("Sound graph resumed");
        }
        self.suspended = false;
        Ok(())
    }

    fn stop_at(&mut self, time: f64) {
        self.stop_time = Some(time);
    }

    fn with_master_gain<R>(&mut self, f: impl FnOnce(&mut dyn AutomatableParam) -> R) -> R {
        f(&mut self.master_gain)
    }
}

/// A sound graph shared between a control thread and the audio callback
#[derive(Clone)]
pub struct SharedGraph {
    inner: Arc<Mutex<SoundGraph>>,
}

impl SharedGraph {
    pub fn new(graph: SoundGraph) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph, recovering from a poisoned lock
    pub fn lock(&self) -> MutexGuard<'_, SoundGraph> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SynthBackend for SharedGraph {
    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn init_voice(&mut self, voice: &VoiceConfig) -> Result<()> {
        self.lock().init_voice(voice)
    }

    fn is_suspended(&self) -> bool {
        self.lock().is_suspended()
    }

    fn resume(&mut self) -> Result<()> {
        self.lock().resume()
    }

    fn stop_at(&mut self, time: f64) {
        self.lock().stop_at(time);
    }

    fn with_master_gain<R>(&mut self, f: impl FnOnce(&mut dyn AutomatableParam) -> R) -> R {
        let mut graph = self.lock();
        f(graph.master_gain_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_graph() -> SoundGraph {
        let mut graph = SoundGraph::new(44100);
        graph.init_voice(&VoiceConfig::default()).unwrap();
        graph.resume().unwrap();
        graph
    }

    #[test]
    fn test_suspended_graph_is_silent_and_frozen() {
        let mut graph = SoundGraph::new(44100);
        graph.init_voice(&VoiceConfig::default()).unwrap();
        graph.master_gain_mut().set_value(1.0);
        let out = graph.render_frames(512);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(graph.current_time(), 0.0);
    }

    #[test]
    fn test_clock_advances_with_rendered_frames() {
        let mut graph = running_graph();
        graph.render_frames(22050);
        assert!((graph.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_gain_is_silent() {
        let mut graph = running_graph();
        let out = graph.render_frames(4410);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_unity_gain_produces_tone() {
        let mut graph = running_graph();
        graph.master_gain_mut().set_value(1.0);
        let out = graph.render_frames(44100);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.2 && peak < 1.5, "peak {}", peak);
    }

    #[test]
    fn test_stop_at_silences_oscillators() {
        let mut graph = running_graph();
        graph.master_gain_mut().set_value(1.0);
        graph.stop_at(0.1);
        let out = graph.render_frames(8820);
        assert!(out[..4000].iter().any(|s| s.abs() > 0.0));
        assert!(out[4410..].iter().all(|&s| s == 0.0));
        assert!(!graph.is_sounding());
    }

    #[test]
    fn test_cutoff_above_nyquist_is_rejected() {
        let mut graph = SoundGraph::new(8000);
        let voice = VoiceConfig {
            filter_cutoff: 5000.0,
            ..VoiceConfig::default()
        };
        assert!(matches!(graph.build(&voice), Err(Error::Audio(_))));
    }

    #[test]
    fn test_shared_graph_automation() {
        let mut shared = SharedGraph::new(SoundGraph::new(44100));
        shared.init_voice(&VoiceConfig::default()).unwrap();
        shared
            .with_master_gain(|gain| gain.set_value_at_time(0.5, 1.0))
            .unwrap();
        assert_eq!(shared.lock().master_gain().value_at(1.5), 0.5);
    }
}
