use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::AudioCommand;
use crate::error::{AudioError, AudioResult};
use crate::loader::SampleBank;
use crate::params::ParameterSnapshot;
use crate::publish::Published;
use crate::vision::HueDetectionState;

mod aux_voice;
mod effect;
mod frame;
mod mixer;
mod sample_buffer;
mod voice;
mod voice_pool;

pub use aux_voice::AuxHueVoice;
pub use effect::{Reverb, SoftLimiter, LIMIT_CEILING};
pub use frame::StereoFrame;
pub use mixer::{AudioMixer, CHUNK_FRAMES};
pub use sample_buffer::SampleBuffer;
pub use voice::{Voice, VoiceSource, Waveform};
pub use voice_pool::VoicePool;

const COMMAND_QUEUE: usize = 1024;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    fault_rx: Receiver<AudioError>,
    sample_rate: u32,
    channels: usize,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    /// Sender half for the sequencer thread.
    pub fn commands(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// First stream failure reported by the device, if any. Fatal.
    pub fn poll_fault(&self) -> Option<AudioError> {
        self.fault_rx.try_recv().ok()
    }
}

/// Open the default output device and start rendering. The mixer reads the
/// three snapshots lock-free from inside the callback.
pub fn start_audio(
    params: Published<ParameterSnapshot>,
    detection: Published<HueDetectionState>,
    bank: Published<SampleBank>,
) -> AudioResult<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    let (fault_tx, fault_rx) = crossbeam_channel::bounded::<AudioError>(8);

    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| AudioError::Config(e.to_string()))?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    log::info!("audio output: {} Hz, {} channels, {:?}", sample_rate, channels, config.sample_format());

    let output_stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let mixer = AudioMixer::new(sample_rate as f32, rx, params, detection, bank);
            build_output_stream_f32(&device, &config.into(), mixer, channels, fault_tx)?
        }
        other => return Err(AudioError::UnsupportedFormat(format!("{other:?} (only f32 supported)"))),
    };
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlay(e.to_string()))?;

    Ok(AudioHandle {
        tx,
        fault_rx,
        sample_rate,
        channels,
        _output_stream: output_stream,
    })
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut mixer: AudioMixer,
    channels: usize,
    fault_tx: Sender<AudioError>,
) -> AudioResult<cpal::Stream> {
    // runs off the render path; forward to the control loop instead of printing
    let err_fn = move |err: cpal::StreamError| {
        let _ = fault_tx.try_send(AudioError::Stream(err.to_string()));
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                mixer.render_interleaved(data, channels);
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))
}
