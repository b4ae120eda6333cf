use super::frame::StereoFrame;
use super::voice::{Voice, Waveform};
use crate::audio_api::{AudioCommand, TriggerParams};
use crate::error::AssetError;
use crate::loader::SampleBank;
use crate::shared::{CellCoord, InstrumentKind, NUM_CELLS};

// One slot per grid cell, allocated once, so a trigger in the audio
// callback is an index and a copy.
pub struct VoicePool {
    sample_rate: f32,
    voices: [Voice; NUM_CELLS],
    volume: f32,
    target_volume: f32,
}

impl VoicePool {
    pub fn new(sample_rate: f32, volume: f32) -> Self {
        let volume = volume.clamp(0.0, 1.0);
        Self {
            sample_rate,
            voices: [Voice::idle(sample_rate); NUM_CELLS],
            volume,
            target_volume: volume,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand, bank: &SampleBank) {
        match cmd {
            // an asset failure only silences this cell; the sequencer already logged it
            AudioCommand::Trigger(t) => {
                let _ = self.trigger(t, bank);
            }
            AudioCommand::Stop(cell) => self.stop(cell),
            AudioCommand::StopAll { hard } => self.stop_all(hard),
        }
    }

    pub fn trigger(&mut self, t: TriggerParams, bank: &SampleBank) -> Result<(), AssetError> {
        let gain = if t.gain.is_finite() { t.gain.clamp(0.0, 1.0) } else { 0.0 };
        let voice = &mut self.voices[t.cell.index()];
        let waveform = match t.instrument {
            InstrumentKind::Sine => Waveform::Sine,
            InstrumentKind::Saw => Waveform::Saw,
            InstrumentKind::Square => Waveform::Square,
            InstrumentKind::Sample => {
                let id = t.sample.ok_or(AssetError::NoneSelected)?;
                if bank.get(id).is_none_or(|b| b.is_empty()) {
                    voice.env.kill();
                    return Err(AssetError::UnknownId(id.0));
                }
                voice.start_sample(id, gain);
                return Ok(());
            }
        };
        voice.start_osc(waveform, t.frequency, self.sample_rate, gain);
        Ok(())
    }

    pub fn stop(&mut self, cell: CellCoord) {
        self.voices[cell.index()].env.release();
    }

    pub fn stop_all(&mut self, hard: bool) {
        for v in self.voices.iter_mut() {
            if hard {
                v.env.kill();
            } else {
                v.env.release();
            }
        }
    }

    /// Output gain; ramps over the next block instead of jumping.
    pub fn set_global_volume(&mut self, v: f32) {
        if v.is_finite() {
            self.target_volume = v.clamp(0.0, 1.0);
        }
    }

    pub fn sounding_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_sounding()).count()
    }

    pub fn is_sounding(&self, cell: CellCoord) -> bool {
        self.voices[cell.index()].is_sounding()
    }

    /// Add every sounding voice into `out`, then apply the volume ramp.
    /// `out` is expected to start zeroed.
    pub fn render(&mut self, bank: &SampleBank, out: &mut [StereoFrame]) {
        for v in self.voices.iter_mut() {
            v.render_into(bank, out);
        }
        let n = out.len();
        if n == 0 {
            return;
        }
        let start = self.volume;
        let step = (self.target_volume - start) / n as f32;
        for (i, frame) in out.iter_mut().enumerate() {
            *frame = frame.scaled(start + step * (i + 1) as f32);
        }
        self.volume = self.target_volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::loader::SampleId;

    const SR: f32 = 44_100.0;

    fn cell(r: usize, c: usize) -> CellCoord {
        CellCoord::new(r, c).unwrap()
    }

    fn trig(cell: CellCoord, instrument: InstrumentKind, sample: Option<SampleId>) -> TriggerParams {
        TriggerParams { cell, instrument, frequency: cell.frequency(), sample, gain: 0.5 }
    }

    fn block(pool: &mut VoicePool, bank: &SampleBank, n: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::ZERO; n];
        pool.render(bank, &mut out);
        out
    }

    fn energy(frames: &[StereoFrame]) -> f32 {
        frames.iter().map(|f| f.left * f.left + f.right * f.right).sum()
    }

    #[test]
    fn missing_sample_silences_only_that_cell() {
        let bank = SampleBank::new();
        let mut pool = VoicePool::new(SR, 1.0);

        let err = pool.trigger(trig(cell(0, 0), InstrumentKind::Sample, Some(SampleId(7))), &bank);
        assert!(matches!(err, Err(AssetError::UnknownId(7))));
        let err = pool.trigger(trig(cell(1, 0), InstrumentKind::Sample, None), &bank);
        assert!(matches!(err, Err(AssetError::NoneSelected)));
        pool.trigger(trig(cell(2, 0), InstrumentKind::Sine, None), &bank).unwrap();

        assert!(!pool.is_sounding(cell(0, 0)));
        assert!(!pool.is_sounding(cell(1, 0)));
        assert!(pool.is_sounding(cell(2, 0)));
        let out = block(&mut pool, &bank, 4096);
        assert!(energy(&out) > 1.0, "the sine cell must still be heard");
    }

    #[test]
    fn sample_cell_plays_registered_buffer() {
        let mut bank = SampleBank::new();
        let id = bank.insert("hit.wav", SampleBuffer { data: vec![StereoFrame::mono(0.5); 2048] }).unwrap();
        let mut pool = VoicePool::new(SR, 1.0);
        pool.trigger(trig(cell(4, 4), InstrumentKind::Sample, Some(id)), &bank).unwrap();
        let out = block(&mut pool, &bank, 2048);
        assert!(out[2000].left > 0.2);
    }

    #[test]
    fn hard_stop_all_leaves_nothing_sounding() {
        let bank = SampleBank::new();
        let mut pool = VoicePool::new(SR, 1.0);
        for r in 0..10 {
            pool.trigger(trig(cell(r, 3), InstrumentKind::Saw, None), &bank).unwrap();
        }
        assert_eq!(pool.sounding_count(), 10);
        pool.stop_all(true);
        assert_eq!(pool.sounding_count(), 0);
        let out = block(&mut pool, &bank, 256);
        assert_eq!(energy(&out), 0.0);
    }

    #[test]
    fn soft_stop_fades_out() {
        let bank = SampleBank::new();
        let mut pool = VoicePool::new(SR, 1.0);
        pool.trigger(trig(cell(0, 0), InstrumentKind::Sine, None), &bank).unwrap();
        block(&mut pool, &bank, 2048);
        pool.stop(cell(0, 0));
        assert!(pool.is_sounding(cell(0, 0)), "release keeps the voice alive briefly");
        block(&mut pool, &bank, (SR * 0.1) as usize + 64);
        assert!(!pool.is_sounding(cell(0, 0)));
    }

    #[test]
    fn zero_volume_mutes_after_one_block() {
        let bank = SampleBank::new();
        let mut pool = VoicePool::new(SR, 1.0);
        pool.trigger(trig(cell(5, 5), InstrumentKind::Square, None), &bank).unwrap();
        block(&mut pool, &bank, 2048);
        pool.set_global_volume(0.0);
        block(&mut pool, &bank, 512);
        let out = block(&mut pool, &bank, 512);
        assert_eq!(energy(&out), 0.0);
    }
}
