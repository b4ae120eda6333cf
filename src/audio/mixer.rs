use crossbeam_channel::Receiver;

use super::aux_voice::AuxHueVoice;
use super::effect::SoftLimiter;
use super::frame::{write_interleaved, StereoFrame};
use super::voice_pool::VoicePool;
use crate::audio_api::AudioCommand;
use crate::loader::SampleBank;
use crate::mapper::map_aux_voice;
use crate::params::ParameterSnapshot;
use crate::publish::Published;
use crate::vision::HueDetectionState;

// internal render granularity; device buffers of any size are split into these
pub const CHUNK_FRAMES: usize = 512;

/// Everything the audio callback owns. Built on the control thread, moved
/// into the stream closure, never shared after that.
pub struct AudioMixer {
    pool: VoicePool,
    aux: AuxHueVoice,
    limiter: SoftLimiter,
    commands: Receiver<AudioCommand>,
    params: Published<ParameterSnapshot>,
    detection: Published<HueDetectionState>,
    bank: Published<SampleBank>,
    aux_bus: [StereoFrame; CHUNK_FRAMES],
    out_bus: [StereoFrame; CHUNK_FRAMES],
}

impl AudioMixer {
    pub fn new(
        sample_rate: f32,
        commands: Receiver<AudioCommand>,
        params: Published<ParameterSnapshot>,
        detection: Published<HueDetectionState>,
        bank: Published<SampleBank>,
    ) -> Self {
        let volume = params.load().volume;
        Self {
            pool: VoicePool::new(sample_rate, volume),
            aux: AuxHueVoice::new(sample_rate),
            limiter: SoftLimiter::default(),
            commands,
            params,
            detection,
            bank,
            aux_bus: [StereoFrame::ZERO; CHUNK_FRAMES],
            out_bus: [StereoFrame::ZERO; CHUNK_FRAMES],
        }
    }

    pub fn sounding_voices(&self) -> usize {
        self.pool.sounding_count()
    }

    pub fn aux_gain(&self) -> f32 {
        self.aux.gain()
    }

    // Apply queued voice events and latch the current snapshots for one
    // device buffer. Only try_recv and atomic loads here.
    fn begin_buffer(&mut self, frames: usize) {
        let bank = self.bank.load();
        while let Ok(cmd) = self.commands.try_recv() {
            self.pool.handle_cmd(cmd, &bank);
        }
        let params = self.params.load();
        let detection = self.detection.load();
        self.pool.set_global_volume(params.volume);
        self.aux.begin_block(map_aux_voice(&detection, &params), frames);
    }

    /// Render one device buffer of stereo frames.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        self.begin_buffer(out.len());
        let Self { pool, aux, limiter, bank, aux_bus, .. } = self;
        let bank = bank.load();
        for chunk in out.chunks_mut(CHUNK_FRAMES) {
            mix_chunk(pool, aux, limiter, &bank, aux_bus, chunk);
        }
    }

    /// Render straight into an interleaved device buffer.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        self.begin_buffer(data.len() / channels);
        let Self { pool, aux, limiter, bank, aux_bus, out_bus, .. } = self;
        let bank = bank.load();
        for chunk in data.chunks_mut(CHUNK_FRAMES * channels) {
            let bus = &mut out_bus[..chunk.len() / channels];
            mix_chunk(pool, aux, limiter, &bank, aux_bus, bus);
            write_interleaved(bus, chunk, channels);
        }
    }
}

// Grid voices plus the aux voice, limited. `out` is at most CHUNK_FRAMES long.
fn mix_chunk(
    pool: &mut VoicePool,
    aux: &mut AuxHueVoice,
    limiter: &SoftLimiter,
    bank: &SampleBank,
    aux_bus: &mut [StereoFrame; CHUNK_FRAMES],
    out: &mut [StereoFrame],
) {
    out.fill(StereoFrame::ZERO);
    pool.render(bank, out);

    let aux_out = &mut aux_bus[..out.len()];
    aux.render(aux_out);
    for (o, a) in out.iter_mut().zip(aux_out.iter()) {
        o.add(*a);
    }
    limiter.process(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::audio_api::TriggerParams;
    use crate::loader::SampleId;
    use crate::shared::{CellCoord, InstrumentKind};

    const SR: f32 = 48_000.0;

    struct Rig {
        tx: crossbeam_channel::Sender<AudioCommand>,
        params: Published<ParameterSnapshot>,
        detection: Published<HueDetectionState>,
        mixer: AudioMixer,
    }

    fn rig(bank: SampleBank) -> Rig {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let params = Published::new(ParameterSnapshot { volume: 1.0, ..Default::default() });
        let detection = Published::new(HueDetectionState::default());
        let mixer = AudioMixer::new(SR, rx, params.clone(), detection.clone(), Published::new(bank));
        Rig { tx, params, detection, mixer }
    }

    fn trigger(cell: CellCoord, instrument: InstrumentKind, sample: Option<SampleId>) -> AudioCommand {
        AudioCommand::Trigger(TriggerParams { cell, instrument, frequency: cell.frequency(), sample, gain: 0.5 })
    }

    fn energy(frames: &[StereoFrame]) -> f32 {
        frames.iter().map(|f| f.left * f.left + f.right * f.right).sum()
    }

    #[test]
    fn silence_in_silence_out() {
        let mut r = rig(SampleBank::new());
        let mut out = vec![StereoFrame::mono(0.3); 1024];
        r.mixer.render_block(&mut out);
        assert_eq!(energy(&out), 0.0);
    }

    #[test]
    fn missing_sample_does_not_disturb_other_cells() {
        let mut r = rig(SampleBank::new());
        let a = CellCoord::new(0, 0).unwrap();
        let b = CellCoord::new(5, 0).unwrap();
        r.tx.send(trigger(a, InstrumentKind::Sample, Some(SampleId(0)))).unwrap();
        r.tx.send(trigger(b, InstrumentKind::Sine, None)).unwrap();

        let mut out = vec![StereoFrame::ZERO; 4096];
        r.mixer.render_block(&mut out);
        assert_eq!(r.mixer.sounding_voices(), 1);
        assert!(energy(&out) > 1.0);
    }

    #[test]
    fn output_is_limited_under_heavy_load() {
        let mut bank = SampleBank::new();
        let id = bank.insert("loud.wav", SampleBuffer { data: vec![StereoFrame::mono(1.0); 4096] }).unwrap();
        let mut r = rig(bank);
        for row in 0..10 {
            let cell = CellCoord::new(row, 2).unwrap();
            let kind = if row % 2 == 0 { InstrumentKind::Sample } else { InstrumentKind::Square };
            r.tx.send(trigger(cell, kind, Some(id))).unwrap();
        }
        r.detection.publish(HueDetectionState { detected: true, hue: 0.5, coverage: 1.0, camera_fault: false });
        r.params.update(|p| p.hue_volume = 1.0);

        let mut out = vec![0.0f32; 4096 * 2];
        r.mixer.render_interleaved(&mut out, 2);
        assert!(out.iter().all(|s| s.abs() <= crate::audio::LIMIT_CEILING));
        assert!(out.iter().any(|s| s.abs() > 0.5));
    }

    #[test]
    fn disabling_detection_zeroes_aux_gain_in_one_buffer() {
        let mut r = rig(SampleBank::new());
        r.params.update(|p| p.hue_volume = 1.0);
        r.detection.publish(HueDetectionState { detected: true, hue: 0.2, coverage: 0.6, camera_fault: false });
        let mut out = vec![StereoFrame::ZERO; 480];
        for _ in 0..4 {
            r.mixer.render_block(&mut out);
        }
        assert!((r.mixer.aux_gain() - 0.6).abs() < 1e-5);

        r.params.update(|p| p.hue_detection_enabled = false);
        r.mixer.render_block(&mut out);
        assert_eq!(r.mixer.aux_gain(), 0.0);
    }

    #[test]
    fn interleaved_output_matches_planar_across_chunks() {
        let cell = CellCoord::new(3, 0).unwrap();
        let mut planar = rig(SampleBank::new());
        let mut inter = rig(SampleBank::new());
        planar.tx.send(trigger(cell, InstrumentKind::Saw, None)).unwrap();
        inter.tx.send(trigger(cell, InstrumentKind::Saw, None)).unwrap();

        // two full chunks plus a ragged tail
        let frames = CHUNK_FRAMES * 2 + 100;
        let mut block = vec![StereoFrame::ZERO; frames];
        planar.mixer.render_block(&mut block);
        let mut data = vec![0.0f32; frames * 2];
        inter.mixer.render_interleaved(&mut data, 2);

        assert!(energy(&block) > 1.0);
        for (f, pair) in block.iter().zip(data.chunks(2)) {
            assert_eq!([f.left, f.right], [pair[0], pair[1]]);
        }
    }

    #[test]
    fn hard_stop_all_through_the_queue() {
        let mut r = rig(SampleBank::new());
        for col in 0..10 {
            r.tx.send(trigger(CellCoord::new(1, col).unwrap(), InstrumentKind::Saw, None)).unwrap();
        }
        let mut out = vec![StereoFrame::ZERO; 256];
        r.mixer.render_block(&mut out);
        assert_eq!(r.mixer.sounding_voices(), 10);
        r.tx.send(AudioCommand::StopAll { hard: true }).unwrap();
        r.mixer.render_block(&mut out);
        assert_eq!(r.mixer.sounding_voices(), 0);
    }
}
