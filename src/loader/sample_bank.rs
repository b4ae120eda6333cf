// name -> buffer provider for the Sample instrument.
//
// The engine can't touch the disk, so every buffer is decoded up front and
// the finished bank is published as one snapshot. Voices hold a SampleId and
// look the buffer up through the snapshot each block.

use std::path::{Path, PathBuf};

use crate::audio::SampleBuffer;
use crate::error::AssetError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub usize);

#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    names: Vec<String>,
    buffers: Vec<SampleBuffer>,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, buffer: SampleBuffer) -> Result<SampleId, AssetError> {
        let name = name.into();
        if buffer.is_empty() {
            return Err(AssetError::Empty { name });
        }
        if let Some(i) = self.names.iter().position(|n| *n == name) {
            self.buffers[i] = buffer;
            return Ok(SampleId(i));
        }
        self.names.push(name);
        self.buffers.push(buffer);
        Ok(SampleId(self.buffers.len() - 1))
    }

    pub fn id_of(&self, name: &str) -> Result<SampleId, AssetError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(SampleId)
            .ok_or_else(|| AssetError::Missing(name.to_string()))
    }

    #[inline]
    pub fn get(&self, id: SampleId) -> Option<&SampleBuffer> {
        self.buffers.get(id.0)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Neighbour of `current` in name order, wrapping. `step` is +1 or -1.
    pub fn cycle_name(&self, current: Option<&str>, step: isize) -> Option<String> {
        if self.names.is_empty() {
            return None;
        }
        let len = self.names.len() as isize;
        let next = match current.and_then(|c| self.names.iter().position(|n| n == c)) {
            Some(i) => (i as isize + step).rem_euclid(len),
            None => 0,
        };
        Some(self.names[next as usize].clone())
    }

    /// Decode every WAV in `dir`. Unreadable files are logged and skipped so
    /// one bad asset never takes the others down with it.
    pub fn load_dir(dir: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut bank = Self::new();
        for path in index_wav_in_dir(dir)? {
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            let buffer = match SampleBuffer::load_wav(&path, target_rate) {
                Ok(b) => b,
                Err(e) => {
                    let err = AssetError::Decode { name, reason: format!("{e:#}") };
                    log::warn!("{err}");
                    continue;
                }
            };
            match bank.insert(name, buffer) {
                Ok(id) => log::debug!("registered sample {} as {:?}", path.display(), id),
                Err(e) => log::warn!("{e}"),
            }
        }
        log::info!("sample bank: {} samples from {}", bank.names.len(), dir.display());
        Ok(bank)
    }
}

// Sorted list of *.wav files directly inside `dir`
pub fn index_wav_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StereoFrame;

    fn buf(n: usize) -> SampleBuffer {
        SampleBuffer { data: vec![StereoFrame::mono(0.25); n] }
    }

    #[test]
    fn missing_names_are_asset_errors() {
        let mut bank = SampleBank::new();
        bank.insert("kick.wav", buf(8)).unwrap();
        assert!(matches!(bank.id_of("snare.wav"), Err(AssetError::Missing(_))));
        assert_eq!(bank.id_of("kick.wav").unwrap(), SampleId(0));
    }

    #[test]
    fn empty_buffers_are_rejected() {
        let mut bank = SampleBank::new();
        assert!(matches!(bank.insert("silence.wav", buf(0)), Err(AssetError::Empty { .. })));
        assert!(bank.is_empty());
    }

    #[test]
    fn reinsert_keeps_id() {
        let mut bank = SampleBank::new();
        let a = bank.insert("a.wav", buf(4)).unwrap();
        let again = bank.insert("a.wav", buf(6)).unwrap();
        assert_eq!(a, again);
        assert_eq!(bank.get(a).map(|b| b.len()), Some(6));
    }

    #[test]
    fn cycle_wraps_both_ways() {
        let mut bank = SampleBank::new();
        for n in ["a.wav", "b.wav", "c.wav"] {
            bank.insert(n, buf(1)).unwrap();
        }
        assert_eq!(bank.cycle_name(Some("c.wav"), 1).as_deref(), Some("a.wav"));
        assert_eq!(bank.cycle_name(Some("a.wav"), -1).as_deref(), Some("c.wav"));
        assert_eq!(bank.cycle_name(None, 1).as_deref(), Some("a.wav"));
    }

    #[test]
    fn load_dir_skips_garbage_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        std::fs::write(dir.join("broken.wav"), b"not a riff header").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut w = hound::WavWriter::create(dir.join("ok.wav"), spec).unwrap();
        for _ in 0..32 {
            w.write_sample(0.1f32).unwrap();
        }
        w.finalize().unwrap();

        let bank = SampleBank::load_dir(dir, 48000).unwrap();
        assert_eq!(bank.names(), &["ok.wav".to_string()]);
    }
}
