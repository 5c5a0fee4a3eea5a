//! Real-time audio output using cpal
//! Works with JACK, ALSA, OpenSL ES (Android/Termux), etc.
//!
//! The stream pulls mono samples from a [`SharedGraph`] and copies them to
//! every output channel. The graph starts suspended, so the device plays
//! silence until the scheduler resumes it.

use crate::automation::AutomatableParam;
use crate::error::{Error, Result};
use crate::synth::{SharedGraph, SoundGraph, SynthBackend, VoiceConfig};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

pub struct AudioEngine {
    sample_rate: u32,
    graph: SharedGraph,
    stream: cpal::Stream,
}

impl AudioEngine {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        // Get the default audio host (JACK/ALSA/OpenSL ES/etc)
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("No audio output device found".to_string()))?;
        info!("Audio device: {}", device.name()?);

        let config = device.default_output_config()?;
        info!("Audio config: {:?}", config);

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let graph = SharedGraph::new(SoundGraph::new(sample_rate));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), graph.clone(), channels)
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), graph.clone(), channels)
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), graph.clone(), channels)
            }
            other => {
                return Err(Error::Audio(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        }?;

        stream.play()?;
        info!("Audio stream started at {} Hz", sample_rate);

        Ok(Self {
            sample_rate,
            graph,
            stream,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        graph: SharedGraph,
        channels: usize,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let mut mono = Vec::new();
        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1);
                mono.resize(frames, 0.0);
                graph.lock().render(&mut mono);

                for (frame, &sample) in data.chunks_mut(channels.max(1)).zip(mono.iter()) {
                    for channel in frame.iter_mut() {
                        *channel = T::from_sample(sample);
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )?;

        Ok(stream)
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }
}

impl SynthBackend for AudioEngine {
    fn current_time(&self) -> f64 {
        self.graph.current_time()
    }

    fn init_voice(&mut self, voice: &VoiceConfig) -> Result<()> {
        self.graph.init_voice(voice)
    }

    fn is_suspended(&self) -> bool {
        self.graph.is_suspended()
    }

    fn resume(&mut self) -> Result<()> {
        self.stream.play()?;
        self.graph.resume()
    }

    fn stop_at(&mut self, time: f64) {
        self.graph.stop_at(time);
    }

    fn with_master_gain<R>(&mut self, f: impl FnOnce(&mut dyn AutomatableParam) -> R) -> R {
        self.graph.with_master_gain(f)
    }
}
