use super::frame::StereoFrame;

// Freeverb tunings, in samples at 44.1 kHz; right channel is offset for width
const COMB_LENGTHS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_LENGTHS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const ALLPASS_FEEDBACK: f32 = 0.5;
const DAMPING: f32 = 0.4;
// keeps the comb bank's summed input from exploding
const INPUT_GAIN: f32 = 0.015;

struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(len: usize) -> Self {
        Self { buffer: vec![0.0; len.max(1)], pos: 0, filter_state: 0.0 }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        output
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(len: usize) -> Self {
        Self { buffer: vec![0.0; len.max(1)], pos: 0 }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        self.buffer[self.pos] = input + buffered * ALLPASS_FEEDBACK;
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        buffered - input
    }
}

/// Mono-in, stereo-out Freeverb. Delay lines are sized once in `new`;
/// `process` never allocates.
pub struct Reverb {
    combs_l: Vec<CombFilter>,
    combs_r: Vec<CombFilter>,
    allpass_l: Vec<AllpassFilter>,
    allpass_r: Vec<AllpassFilter>,
    room_size: f32,
    wet: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 44_100.0;
        let scaled = |len: usize| ((len as f32) * scale) as usize;
        Self {
            combs_l: COMB_LENGTHS.iter().map(|&l| CombFilter::new(scaled(l))).collect(),
            combs_r: COMB_LENGTHS.iter().map(|&l| CombFilter::new(scaled(l + STEREO_SPREAD))).collect(),
            allpass_l: ALLPASS_LENGTHS.iter().map(|&l| AllpassFilter::new(scaled(l))).collect(),
            allpass_r: ALLPASS_LENGTHS
                .iter()
                .map(|&l| AllpassFilter::new(scaled(l + STEREO_SPREAD)))
                .collect(),
            room_size: 0.5,
            wet: 0.5,
        }
    }

    /// Both size and wet follow the one HueReverb slider.
    pub fn set_amount(&mut self, amount: f32) {
        let amount = if amount.is_finite() { amount.clamp(0.0, 1.0) } else { 0.0 };
        self.room_size = amount;
        self.wet = amount;
    }

    // feedback between 0.7 and 0.98
    fn feedback(&self) -> f32 {
        0.7 + self.room_size * 0.28
    }

    /// Replace each frame with dry/wet mix of its mid signal.
    pub fn process(&mut self, buf: &mut [StereoFrame]) {
        let feedback = self.feedback();
        let wet = self.wet;
        let dry = 1.0 - wet;
        for frame in buf.iter_mut() {
            let input = 0.5 * (frame.left + frame.right);
            let fed = input * INPUT_GAIN;
            let mut l = 0.0;
            let mut r = 0.0;
            for c in self.combs_l.iter_mut() {
                l += c.process(fed, feedback, DAMPING);
            }
            for c in self.combs_r.iter_mut() {
                r += c.process(fed, feedback, DAMPING);
            }
            for a in self.allpass_l.iter_mut() {
                l = a.process(l);
            }
            for a in self.allpass_r.iter_mut() {
                r = a.process(r);
            }
            frame.left = frame.left * dry + l * wet;
            frame.right = frame.right * dry + r * wet;
        }
    }
}

/// Output ceiling of the limiter, a hair under full scale
pub const LIMIT_CEILING: f32 = 0.98;

/// Stateless soft limiter: untouched below the knee, tanh-shaped above it,
/// never passing LIMIT_CEILING.
#[derive(Clone, Copy, Debug)]
pub struct SoftLimiter {
    knee: f32,
}

impl Default for SoftLimiter {
    fn default() -> Self {
        Self { knee: 0.8 }
    }
}

impl SoftLimiter {
    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        if !x.is_finite() {
            return 0.0;
        }
        let mag = x.abs();
        if mag <= self.knee {
            return x;
        }
        let headroom = LIMIT_CEILING - self.knee;
        let limited = self.knee + headroom * ((mag - self.knee) / headroom).tanh();
        limited.copysign(x)
    }

    pub fn process(&self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            f.left = self.shape(f.left);
            f.right = self.shape(f.right);
        }
    }
}
