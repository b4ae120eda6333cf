use super::frame::StereoFrame;
use crate::loader::{SampleBank, SampleId};

const ATTACK_SECS: f32 = 0.02;
const RELEASE_SECS: f32 = 0.1;

// saw and square carry far more energy than a sine at the same peak
const SINE_LEVEL: f32 = 1.0;
const EDGY_LEVEL: f32 = 0.6;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

// polynomial band-limited step correction, t and dt in cycles
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
}

// Closed set of generators; the render loop matches instead of going
// through a vtable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceSource {
    Silent,
    Osc { waveform: Waveform, phase: f32, phase_inc: f32 },
    Sample { id: SampleId, pos: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvStage {
    Idle,
    Attack,
    Sustain,
    Release,
}

#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    pub stage: EnvStage,
    pub level: f32,
    attack_step: f32,
    release_step: f32,
    release_samples: f32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage: EnvStage::Idle,
            level: 0.0,
            attack_step: 1.0 / (ATTACK_SECS * sample_rate).max(1.0),
            release_step: 0.0,
            release_samples: (RELEASE_SECS * sample_rate).max(1.0),
        }
    }

    pub fn start(&mut self) {
        // retrigger from the current level so a live voice doesn't click
        self.stage = EnvStage::Attack;
    }

    pub fn release(&mut self) {
        if matches!(self.stage, EnvStage::Attack | EnvStage::Sustain) {
            self.stage = EnvStage::Release;
            self.release_step = self.level / self.release_samples;
        }
    }

    pub fn kill(&mut self) {
        self.stage = EnvStage::Idle;
        self.level = 0.0;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        match self.stage {
            EnvStage::Idle => {}
            EnvStage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {}
            EnvStage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.kill();
                }
            }
        }
        self.level
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Voice {
    pub source: VoiceSource,
    pub env: Envelope,
    pub gain: f32,
}

impl Voice {
    pub fn idle(sample_rate: f32) -> Self {
        Self { source: VoiceSource::Silent, env: Envelope::new(sample_rate), gain: 0.0 }
    }

    pub fn is_sounding(&self) -> bool {
        self.env.stage != EnvStage::Idle
    }

    pub fn start_osc(&mut self, waveform: Waveform, freq: f32, sample_rate: f32, gain: f32) {
        let phase_inc = (freq / sample_rate).clamp(0.0, 0.5);
        // keep phase when retriggering the same oscillator
        let phase = match self.source {
            VoiceSource::Osc { phase, .. } if self.is_sounding() => phase,
            _ => 0.0,
        };
        self.source = VoiceSource::Osc { waveform, phase, phase_inc };
        self.gain = gain;
        self.env.start();
    }

    pub fn start_sample(&mut self, id: SampleId, gain: f32) {
        self.source = VoiceSource::Sample { id, pos: 0.0 };
        self.gain = gain;
        self.env.start();
    }

    /// Add this voice into `out`. No allocation, no locks.
    pub fn render_into(&mut self, bank: &SampleBank, out: &mut [StereoFrame]) {
        if !self.is_sounding() {
            return;
        }
        match &mut self.source {
            VoiceSource::Silent => self.env.kill(),
            VoiceSource::Osc { waveform, phase, phase_inc } => {
                let (wf, inc) = (*waveform, *phase_inc);
                for frame in out.iter_mut() {
                    let t = *phase;
                    let s = match wf {
                        Waveform::Sine => SINE_LEVEL * (std::f32::consts::TAU * t).sin(),
                        Waveform::Saw => EDGY_LEVEL * (2.0 * t - 1.0 - poly_blep(t, inc)),
                        Waveform::Square => {
                            let naive = if t < 0.5 { 1.0 } else { -1.0 };
                            EDGY_LEVEL * (naive + poly_blep(t, inc) - poly_blep((t + 0.5).fract(), inc))
                        }
                    };
                    let amp = self.env.next() * self.gain;
                    frame.add(StereoFrame::mono(s * amp));
                    *phase += inc;
                    if *phase >= 1.0 {
                        *phase -= 1.0;
                    }
                    if self.env.stage == EnvStage::Idle {
                        break;
                    }
                }
            }
            VoiceSource::Sample { id, pos } => {
                // the bank can be swapped underneath us; a stale id just goes quiet
                let Some(buffer) = bank.get(*id) else {
                    self.env.kill();
                    return;
                };
                let data = &buffer.data;
                let len = data.len();
                if len == 0 {
                    self.env.kill();
                    return;
                }
                for frame in out.iter_mut() {
                    let i = (*pos as usize).min(len - 1);
                    let frac = *pos - i as f32;
                    let s0 = data[i];
                    let s1 = data[(i + 1) % len]; // loop seam
                    let amp = self.env.next() * self.gain;
                    frame.add(StereoFrame {
                        left: lerp(s0.left, s1.left, frac) * amp,
                        right: lerp(s0.right, s1.right, frac) * amp,
                    });
                    *pos += 1.0;
                    if *pos >= len as f32 {
                        *pos -= len as f32; // samples loop while the cell holds
                    }
                    if self.env.stage == EnvStage::Idle {
                        break;
                    }
                }
            }
        }
    }
}
