//! Step sequencer: walks a playhead across the grid columns on absolute
//! deadlines and turns active cells into voice events.
//!
//! Runs on its own thread. Transport changes arrive on a bounded channel,
//! the grid, sliders and sample bank are read from published snapshots, and
//! voice events leave through a `VoiceSink` that never blocks.

mod clock;
mod grid;

use std::collections::HashSet;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};

pub use clock::{TickClock, TickPoll};
pub use grid::{Cell, Grid};

use crate::audio_api::{AudioCommand, TriggerParams, VoiceSink};
use crate::loader::{SampleBank, SampleId};
use crate::params::ParameterSnapshot;
use crate::publish::Published;
use crate::shared::{CellCoord, InstrumentKind, TransportState, GRID_SIZE, NUM_CELLS};

// per-column headroom: n simultaneous cells share this much gain
const COLUMN_GAIN: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    ClearAll,
    /// hard stop without touching the grid (audio fault)
    Stop,
    /// speed changed; wake up and re-read the tick interval
    Retempo,
    Shutdown,
}

/// What the control surface draws: transport and playhead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequencerStatus {
    pub state: TransportState,
    /// `None` while stopped
    pub column: Option<u8>,
    pub dropped_ticks: u64,
}

pub struct GridSequencer<S: VoiceSink> {
    sink: S,
    grid: Published<Grid>,
    params: Published<ParameterSnapshot>,
    bank: Published<SampleBank>,
    status: Published<SequencerStatus>,
    clock: TickClock,
    state: TransportState,
    column: usize,
    // false until the playhead has sounded `column` since the last (re)start
    entered: bool,
    // voices this sequencer started and has not stopped yet
    sounding: [bool; NUM_CELLS],
    warned_samples: HashSet<String>,
    dropped_ticks: u64,
}

impl<S: VoiceSink> GridSequencer<S> {
    pub fn new(
        sink: S,
        grid: Published<Grid>,
        params: Published<ParameterSnapshot>,
        bank: Published<SampleBank>,
        status: Published<SequencerStatus>,
    ) -> Self {
        let seq = Self {
            sink,
            grid,
            params,
            bank,
            status,
            clock: TickClock::default(),
            state: TransportState::Stopped,
            column: 0,
            entered: false,
            sounding: [false; NUM_CELLS],
            warned_samples: HashSet::new(),
            dropped_ticks: 0,
        };
        seq.publish_status();
        seq
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Stopped starts from column 0, Paused resumes on the column it left.
    /// Either way the current column sounds right away.
    pub fn play(&mut self, now: Instant) {
        match self.state {
            TransportState::Playing => return,
            TransportState::Stopped => self.column = 0,
            TransportState::Paused => {}
        }
        self.state = TransportState::Playing;
        self.entered = false;
        self.clock.start(now);
        log::info!("play from column {}", self.column + 1);
        self.publish_status();
    }

    /// Stop stepping; sounding voices get their release fade.
    pub fn pause(&mut self) {
        if self.state != TransportState::Playing {
            return;
        }
        self.state = TransportState::Paused;
        self.clock.stop();
        self.sink.send(AudioCommand::StopAll { hard: false });
        self.sounding = [false; NUM_CELLS];
        self.publish_status();
    }

    /// Cut every voice and rewind. Grid contents are the controller's job.
    pub fn clear_all(&mut self) {
        self.halt();
        log::info!("cleared");
    }

    /// Same cut as `clear_all`; used when the audio device goes away.
    pub fn stop(&mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.state = TransportState::Stopped;
        self.clock.stop();
        self.column = 0;
        self.entered = false;
        self.sink.send(AudioCommand::StopAll { hard: true });
        self.sounding = [false; NUM_CELLS];
        self.publish_status();
    }

    pub fn handle(&mut self, cmd: TransportCommand, now: Instant) {
        match cmd {
            TransportCommand::Play => self.play(now),
            TransportCommand::Pause => self.pause(),
            TransportCommand::ClearAll => self.clear_all(),
            // the next poll picks up the new interval
            TransportCommand::Retempo => {}
            TransportCommand::Stop | TransportCommand::Shutdown => self.stop(),
        }
    }

    /// Fire whatever step is due at `now`. Returns the next deadline to
    /// sleep until, or `None` when not playing.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        let interval = self.params.load().tick_interval();
        match self.clock.poll(now, interval) {
            TickPoll::Idle => None,
            TickPoll::Wait(due) => Some(due),
            TickPoll::Fire { missed } => {
                if missed > 0 {
                    self.dropped_ticks += u64::from(missed);
                    log::debug!("late wake-up, dropped {missed} tick(s)");
                }
                self.step();
                self.clock.deadline(interval)
            }
        }
    }

    /// Advance the playhead one column (or sound the start column) and emit
    /// stop/trigger events for it.
    pub fn step(&mut self) {
        let departing = self.column;
        if self.entered {
            self.column = (self.column + 1) % GRID_SIZE;
        }
        self.entered = true;

        let grid = **self.grid.load();
        let params = self.params.load_full();

        if departing != self.column {
            for row in 0..GRID_SIZE {
                if let Some(at) = CellCoord::new(row, departing) {
                    if std::mem::take(&mut self.sounding[at.index()]) {
                        self.sink.send(AudioCommand::Stop(at));
                    }
                }
            }
        }

        let count = grid.active_in_column(self.column).count();
        if count > 0 {
            let gain = COLUMN_GAIN / count as f32;
            for (at, cell) in grid.active_in_column(self.column) {
                let sample = match cell.instrument {
                    InstrumentKind::Sample => match self.resolve_sample(&params) {
                        Some(id) => Some(id),
                        None => continue,
                    },
                    _ => None,
                };
                self.sink.send(AudioCommand::Trigger(TriggerParams {
                    cell: at,
                    instrument: cell.instrument,
                    frequency: at.frequency(),
                    sample,
                    gain,
                }));
                self.sounding[at.index()] = true;
            }
        }
        self.publish_status();
    }

    // Missing material leaves the cell silent; each bad name is logged once.
    fn resolve_sample(&mut self, params: &ParameterSnapshot) -> Option<SampleId> {
        let name = params.sample.as_deref().unwrap_or("");
        let result = if name.is_empty() {
            Err(crate::error::AssetError::NoneSelected)
        } else {
            self.bank.load().id_of(name)
        };
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                if self.warned_samples.insert(name.to_string()) {
                    log::warn!("sample cell silenced: {err}");
                }
                None
            }
        }
    }

    fn publish_status(&self) {
        let column = (self.state != TransportState::Stopped).then_some(self.column as u8);
        self.status.publish(SequencerStatus { state: self.state, column, dropped_ticks: self.dropped_ticks });
    }
}

impl<S: VoiceSink + Send + 'static> GridSequencer<S> {
    /// Run the tick loop on its own thread. Sleeps on the command channel
    /// until the next deadline so transport changes apply immediately.
    pub fn spawn(mut self, commands: Receiver<TransportCommand>) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("huegrid-sequencer".to_string())
            .spawn(move || {
                loop {
                    let next = self.poll(Instant::now());
                    let msg = match next {
                        Some(deadline) => commands.recv_deadline(deadline),
                        None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match msg {
                        Ok(TransportCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Ok(cmd) => self.handle(cmd, Instant::now()),
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
                self.stop();
                log::debug!("sequencer thread stopped");
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::{SampleBuffer, StereoFrame, VoicePool};

    struct Rig {
        grid: Published<Grid>,
        params: Published<ParameterSnapshot>,
        bank: Published<SampleBank>,
        status: Published<SequencerStatus>,
        seq: GridSequencer<Vec<AudioCommand>>,
    }

    fn rig() -> Rig {
        let grid = Published::<Grid>::default();
        let params = Published::<ParameterSnapshot>::default();
        let bank = Published::new(SampleBank::new());
        let status = Published::<SequencerStatus>::default();
        let seq = GridSequencer::new(Vec::new(), grid.clone(), params.clone(), bank.clone(), status.clone());
        Rig { grid, params, bank, status, seq }
    }

    fn at(row: usize, col: usize) -> CellCoord {
        CellCoord::new(row, col).unwrap()
    }

    fn triggers(cmds: &[AudioCommand]) -> Vec<CellCoord> {
        cmds.iter()
            .filter_map(|c| match c {
                AudioCommand::Trigger(t) => Some(t.cell),
                _ => None,
            })
            .collect()
    }

    // Drive `ticks` on-time steps starting at `t0`.
    fn run_ticks(r: &mut Rig, t0: Instant, ticks: u32) {
        let step = r.params.load().tick_interval();
        r.seq.play(t0);
        for i in 0..ticks {
            r.seq.poll(t0 + step * i);
        }
    }

    #[test]
    fn single_cell_triggers_once_per_cycle() {
        let mut r = rig();
        r.grid.update(|g| {
            g.toggle(at(0, 0));
        });
        run_ticks(&mut r, Instant::now(), 30);
        let hits = triggers(r.seq.sink());
        assert_eq!(hits, vec![at(0, 0); 3], "one trigger per ten steps");

        let stops = r.seq.sink().iter().filter(|c| matches!(c, AudioCommand::Stop(_))).count();
        assert_eq!(stops, 3, "voice stops when the playhead leaves column 0");
    }

    #[test]
    fn toggle_on_then_off_before_playhead_never_triggers() {
        let mut r = rig();
        let t0 = Instant::now();
        let step = r.params.load().tick_interval();
        r.seq.play(t0);
        r.seq.poll(t0);
        r.grid.update(|g| {
            g.toggle(at(4, 5));
        });
        r.seq.poll(t0 + step);
        r.grid.update(|g| {
            g.toggle(at(4, 5));
        });
        for i in 2..12 {
            r.seq.poll(t0 + step * i);
        }
        assert!(triggers(r.seq.sink()).is_empty());
    }

    #[test]
    fn column_gain_is_shared() {
        let mut r = rig();
        r.grid.update(|g| {
            for row in 0..4 {
                g.toggle(at(row, 0));
            }
        });
        run_ticks(&mut r, Instant::now(), 1);
        for cmd in r.seq.sink() {
            if let AudioCommand::Trigger(t) = cmd {
                assert!((t.gain - 0.125).abs() < 1e-6);
                assert_eq!(t.frequency, t.cell.frequency());
            }
        }
        assert_eq!(triggers(r.seq.sink()).len(), 4);
    }

    #[test]
    fn late_wake_drops_ticks_instead_of_catching_up() {
        let mut r = rig();
        let t0 = Instant::now();
        let step = r.params.load().tick_interval();
        r.seq.play(t0);
        r.seq.poll(t0);
        assert_eq!(r.seq.column(), 0);
        let next = r.seq.poll(t0 + step * 3 + step / 2);
        assert_eq!(r.seq.column(), 1, "a stalled thread advances one column only");
        assert_eq!(next, Some(t0 + step * 4));
        assert_eq!(r.status.load().dropped_ticks, 2);
    }

    #[test]
    fn speed_change_applies_to_next_step() {
        let mut r = rig();
        let t0 = Instant::now();
        r.seq.play(t0);
        r.params.update(|p| p.set_speed(10.0));
        assert_eq!(r.seq.poll(t0), Some(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn speed_change_between_ticks_moves_the_next_step() {
        let mut r = rig();
        r.params.update(|p| p.set_speed(1.0));
        let t0 = Instant::now();
        r.seq.play(t0);
        assert_eq!(r.seq.poll(t0), Some(t0 + Duration::from_millis(230)));

        r.params.update(|p| p.set_speed(10.0));
        let next = r.seq.poll(t0 + Duration::from_millis(60));
        assert_eq!(r.seq.column(), 1, "step due at +50 ms under the new speed");
        assert_eq!(next, Some(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn retempo_wakes_the_thread() {
        let r = rig();
        r.params.update(|p| p.set_speed(1.0));
        let (tx, rx) = crossbeam_channel::bounded(8);
        let handle = r.seq.spawn(rx).unwrap();
        tx.send(TransportCommand::Play).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(r.status.load().column, Some(0));

        // at speed 1 the next step would be 230 ms out
        r.params.update(|p| p.set_speed(10.0));
        tx.send(TransportCommand::Retempo).unwrap();
        std::thread::sleep(Duration::from_millis(120));
        assert_ne!(r.status.load().column, Some(0));
        tx.send(TransportCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn pause_fades_and_resume_retriggers_same_column() {
        let mut r = rig();
        r.grid.update(|g| {
            g.toggle(at(2, 3));
        });
        run_ticks(&mut r, Instant::now(), 4);
        assert_eq!(r.seq.column(), 3);
        r.seq.pause();
        assert_eq!(r.seq.sink().last(), Some(&AudioCommand::StopAll { hard: false }));
        assert_eq!(r.status.load().state, TransportState::Paused);
        assert_eq!(r.status.load().column, Some(3));

        r.seq.sink_mut().clear();
        let t1 = Instant::now();
        r.seq.play(t1);
        r.seq.poll(t1);
        assert_eq!(r.seq.column(), 3);
        assert_eq!(triggers(r.seq.sink()), vec![at(2, 3)]);
    }

    #[test]
    fn clear_all_is_idempotent_and_silences_everything() {
        let mut r = rig();
        r.grid.update(|g| {
            for col in 0..10 {
                g.toggle(at(col, col));
                g.toggle(at(9 - col, col));
            }
        });
        run_ticks(&mut r, Instant::now(), 7);

        // apply everything the sequencer said to a real pool
        let bank = r.bank.load_full();
        let mut pool = VoicePool::new(48_000.0, 1.0);
        let mut scratch = vec![StereoFrame::ZERO; 64];
        let mut apply = |cmds: &mut Vec<AudioCommand>, pool: &mut VoicePool| {
            for cmd in cmds.drain(..) {
                pool.handle_cmd(cmd, &bank);
            }
            pool.render(&bank, &mut scratch);
        };
        apply(r.seq.sink_mut(), &mut pool);
        assert!(pool.sounding_count() > 0);

        for _ in 0..2 {
            r.grid.update(|g| g.clear());
            r.seq.clear_all();
            apply(r.seq.sink_mut(), &mut pool);
            assert_eq!(pool.sounding_count(), 0);
            assert_eq!(r.grid.load().active_count(), 0);
            assert_eq!(**r.status.load(), SequencerStatus { state: TransportState::Stopped, column: None, dropped_ticks: 0 });
        }
    }

    #[test]
    fn missing_sample_silences_only_that_cell() {
        let mut r = rig();
        r.params.update(|p| p.sample = Some("gone.wav".into()));
        r.grid.update(|g| {
            g.toggle(at(0, 0));
            g.cycle_instrument(at(0, 0));
            g.cycle_instrument(at(0, 0));
            g.cycle_instrument(at(0, 0)); // Sample
            g.toggle(at(1, 0));
        });
        run_ticks(&mut r, Instant::now(), 11);
        assert_eq!(triggers(r.seq.sink()), vec![at(1, 0), at(1, 0)]);
        assert_eq!(r.seq.warned_samples.len(), 1, "logged once, not per tick");
    }

    #[test]
    fn sample_cells_resolve_through_the_bank() {
        let mut r = rig();
        let mut bank = SampleBank::new();
        let id = bank
            .insert("kick.wav", SampleBuffer { data: vec![StereoFrame::mono(0.5); 32] })
            .unwrap();
        r.bank.publish(bank);
        r.params.update(|p| p.sample = Some("kick.wav".into()));
        r.grid.update(|g| {
            g.toggle(at(3, 0));
            for _ in 0..3 {
                g.cycle_instrument(at(3, 0));
            }
        });
        run_ticks(&mut r, Instant::now(), 1);
        match r.seq.sink().first() {
            Some(AudioCommand::Trigger(t)) => {
                assert_eq!(t.instrument, InstrumentKind::Sample);
                assert_eq!(t.sample, Some(id));
            }
            other => panic!("expected a trigger, got {other:?}"),
        }
    }

    #[test]
    fn thread_shuts_down_on_command() {
        let r = rig();
        let (tx, rx) = crossbeam_channel::bounded(8);
        let handle = r.seq.spawn(rx).unwrap();
        tx.send(TransportCommand::Play).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(r.status.load().state, TransportState::Playing);
        tx.send(TransportCommand::Shutdown).unwrap();
        handle.join().unwrap();
        assert_eq!(r.status.load().state, TransportState::Stopped);
    }
}
