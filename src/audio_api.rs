use crossbeam_channel::Sender;

pub use crate::loader::SampleId;
use crate::shared::{CellCoord, InstrumentKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerParams {
    pub cell: CellCoord,
    pub instrument: InstrumentKind,
    pub frequency: f32,
    // Resolved before the command is sent; the engine can't do name lookups.
    pub sample: Option<SampleId>,
    pub gain: f32,
}

// Everything the sequencer can ask of the voice pool. All variants are Copy
// so sending one never allocates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioCommand {
    Trigger(TriggerParams),
    // release the voice bound to this cell
    Stop(CellCoord),
    // hard = cut immediately, otherwise release every voice
    StopAll { hard: bool },
}

/// Where the sequencer sends voice events. The running app uses the bounded
/// channel into the audio callback; tests collect into a Vec.
pub trait VoiceSink {
    fn send(&mut self, cmd: AudioCommand);
}

impl VoiceSink for Sender<AudioCommand> {
    fn send(&mut self, cmd: AudioCommand) {
        // never block the sequencer; a full queue means the callback is gone
        if self.try_send(cmd).is_err() {
            log::warn!("audio command queue full, dropped {cmd:?}");
        }
    }
}

impl VoiceSink for Vec<AudioCommand> {
    fn send(&mut self, cmd: AudioCommand) {
        self.push(cmd);
    }
}
