// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub const ZERO: StereoFrame = StereoFrame { left: 0.0, right: 0.0 };

    #[inline]
    pub fn mono(v: f32) -> Self {
        Self { left: v, right: v }
    }

    #[inline]
    pub fn scaled(self, g: f32) -> Self {
        Self { left: self.left * g, right: self.right * g }
    }

    #[inline]
    pub fn add(&mut self, other: StereoFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    #[inline]
    pub fn peak(self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

/// Write stereo frames into an interleaved device buffer of any width.
/// Mono devices get the average; channels past the second are silenced.
pub fn write_interleaved(frames: &[StereoFrame], out: &mut [f32], channels: usize) {
    if channels == 0 {
        return;
    }
    for (frame, chunk) in frames.iter().zip(out.chunks_exact_mut(channels)) {
        match chunk {
            [m] => *m = 0.5 * (frame.left + frame.right),
            [l, r, rest @ ..] => {
                *l = frame.left;
                *r = frame.right;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}
