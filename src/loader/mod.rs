pub mod sample_bank;

pub use sample_bank::{index_wav_in_dir, SampleBank, SampleId};
