use super::effect::Reverb;
use super::frame::StereoFrame;
use crate::mapper::AuxHueVoiceParams;

// one-pole pitch glide time constant
const GLIDE_SECS: f32 = 0.05;

/// The always-present voice driven by the camera. Lives as long as the
/// audio stream; muting is a gain ramp to zero, never a teardown.
pub struct AuxHueVoice {
    sample_rate: f32,
    phase: f32,
    freq: f32,
    target_freq: f32,
    glide_coeff: f32,
    gain: f32,
    target_gain: f32,
    gain_step: f32,
    ramp_left: usize,
    reverb: Reverb,
}

impl AuxHueVoice {
    pub fn new(sample_rate: f32) -> Self {
        let start = AuxHueVoiceParams::SILENT;
        Self {
            sample_rate,
            phase: 0.0,
            freq: start.frequency,
            target_freq: start.frequency,
            glide_coeff: (-1.0 / (GLIDE_SECS * sample_rate)).exp(),
            gain: 0.0,
            target_gain: 0.0,
            gain_step: 0.0,
            ramp_left: 0,
            reverb: Reverb::new(sample_rate),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Latch new parameters for a device buffer of `frames` frames.
    /// The gain lands exactly on target by the end of that buffer.
    pub fn begin_block(&mut self, params: AuxHueVoiceParams, frames: usize) {
        self.target_freq = params.frequency;
        self.target_gain = params.gain.clamp(0.0, 1.0);
        self.reverb.set_amount(params.reverb_wet);
        if frames == 0 || self.target_gain == self.gain {
            self.gain = self.target_gain;
            self.ramp_left = 0;
            return;
        }
        self.ramp_left = frames;
        self.gain_step = (self.target_gain - self.gain) / frames as f32;
    }

    /// Overwrite `out` with this voice's signal, reverb included.
    pub fn render(&mut self, out: &mut [StereoFrame]) {
        let inc_scale = 1.0 / self.sample_rate;
        for frame in out.iter_mut() {
            if self.ramp_left > 0 {
                self.ramp_left -= 1;
                self.gain = if self.ramp_left == 0 { self.target_gain } else { self.gain + self.gain_step };
            }
            self.freq = self.target_freq + (self.freq - self.target_freq) * self.glide_coeff;

            let s = (std::f32::consts::TAU * self.phase).sin() * self.gain;
            *frame = StereoFrame::mono(s);

            self.phase += self.freq * inc_scale;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
        self.reverb.process(out);
    }
}
