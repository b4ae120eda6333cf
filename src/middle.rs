// Sits between the control surface and everything else. Turns semantic
// ControlEvents into grid/slider snapshot writes and transport commands, and
// assembles the read-only view the TUI draws from.
//
// Single writer for the grid and the ParameterSnapshot; nobody else publishes
// either.

use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::loader::SampleBank;
use crate::params::ParameterSnapshot;
use crate::publish::Published;
use crate::sequencer::{Grid, SequencerStatus, TransportCommand};
use crate::shared::{CellCoord, ControlEvent, InstrumentKind, TransportState};
use crate::vision::HueDetectionState;

/// Everything the view needs for one frame.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub grid: Grid,
    pub params: ParameterSnapshot,
    pub status: SequencerStatus,
    pub detection: HueDetectionState,
    pub sample_count: usize,
}

pub struct Controller {
    grid: Published<Grid>,
    params: Published<ParameterSnapshot>,
    bank: Published<SampleBank>,
    status: Published<SequencerStatus>,
    detection: Published<HueDetectionState>,
    transport: Sender<TransportCommand>,
}

impl Controller {
    pub fn new(
        grid: Published<Grid>,
        params: Published<ParameterSnapshot>,
        bank: Published<SampleBank>,
        status: Published<SequencerStatus>,
        detection: Published<HueDetectionState>,
        transport: Sender<TransportCommand>,
    ) -> Self {
        Self { grid, params, bank, status, detection, transport }
    }

    pub fn params(&self) -> Arc<ParameterSnapshot> {
        self.params.load_full()
    }

    // out-of-range coordinates are ignored
    pub fn toggle_cell(&self, row: usize, col: usize) {
        let Some(at) = CellCoord::new(row, col) else {
            return;
        };
        self.grid.update(|g| {
            g.toggle(at);
        });
    }

    pub fn cycle_instrument(&self, row: usize, col: usize) {
        let Some(at) = CellCoord::new(row, col) else {
            return;
        };
        self.grid.update(|g| {
            g.cycle_instrument(at);
        });
        if self.grid.load().cell(at).instrument == InstrumentKind::Sample && self.params.load().sample.is_none() {
            log::warn!("{} set to Sample but no sample is selected", at.label());
        }
    }

    pub fn set_volume(&self, v: f32) {
        self.params.update(|p| p.set_volume(v));
    }

    pub fn set_hue_volume(&self, v: f32) {
        self.params.update(|p| p.set_hue_volume(v));
    }

    pub fn set_hue_reverb(&self, v: f32) {
        self.params.update(|p| p.set_hue_reverb(v));
    }

    /// Also wakes the sequencer so the next step lands on the new tempo.
    pub fn set_speed(&self, v: f32) {
        self.params.update(|p| p.set_speed(v));
        self.send(TransportCommand::Retempo);
    }

    pub fn set_hue_center(&self, v: f32) {
        self.params.update(|p| p.set_hue_center(v));
    }

    pub fn set_sensitivity(&self, v: f32) {
        self.params.update(|p| p.set_sensitivity(v));
    }

    pub fn enable_hue_detection(&self, on: bool) {
        self.params.update(|p| p.hue_detection_enabled = on);
        log::info!("hue detection {}", if on { "enabled" } else { "disabled" });
    }

    /// Unknown names are accepted; Sample cells just stay silent.
    pub fn select_sample(&self, name: &str) {
        if self.bank.load().id_of(name).is_err() {
            log::warn!("selected sample {name:?} is not in the bank");
        }
        let name = name.to_string();
        self.params.update(|p| p.sample = Some(name));
    }

    pub fn next_sample(&self) {
        self.step_sample(1);
    }

    pub fn prev_sample(&self) {
        self.step_sample(-1);
    }

    fn step_sample(&self, step: isize) {
        let current = self.params.load().sample.clone();
        if let Some(name) = self.bank.load().cycle_name(current.as_deref(), step) {
            self.params.update(|p| p.sample = Some(name));
        }
    }

    pub fn play(&self) {
        self.send(TransportCommand::Play);
    }

    pub fn pause(&self) {
        self.send(TransportCommand::Pause);
    }

    /// Hard stop that leaves the grid alone; used when audio output dies.
    pub fn stop(&self) {
        self.send(TransportCommand::Stop);
    }

    /// Deactivate every cell and stop every voice.
    pub fn clear_all(&self) {
        self.grid.update(|g| g.clear());
        self.send(TransportCommand::ClearAll);
    }

    pub fn toggle_play(&self) {
        if self.status.load().state == TransportState::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Returns false once the surface asked to quit.
    pub fn handle_input(&self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::ToggleCell { row, col } => self.toggle_cell(row, col),
            ControlEvent::CycleInstrument { row, col } => self.cycle_instrument(row, col),
            ControlEvent::SetVolume(v) => self.set_volume(v),
            ControlEvent::SetHueVolume(v) => self.set_hue_volume(v),
            ControlEvent::SetHueReverb(v) => self.set_hue_reverb(v),
            ControlEvent::SetSpeed(v) => self.set_speed(v),
            ControlEvent::SetHueCenter(v) => self.set_hue_center(v),
            ControlEvent::SetSensitivity(v) => self.set_sensitivity(v),
            ControlEvent::EnableHueDetection(on) => self.enable_hue_detection(on),
            ControlEvent::SelectSample(name) => self.select_sample(&name),
            ControlEvent::NextSample => self.next_sample(),
            ControlEvent::PrevSample => self.prev_sample(),
            ControlEvent::TogglePlay => self.toggle_play(),
            ControlEvent::Play => self.play(),
            ControlEvent::Pause => self.pause(),
            ControlEvent::ClearAll => self.clear_all(),
            ControlEvent::Quit => return false,
        }
        true
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            grid: **self.grid.load(),
            params: (**self.params.load()).clone(),
            status: **self.status.load(),
            detection: **self.detection.load(),
            sample_count: self.bank.load().names().len(),
        }
    }

    fn send(&self, cmd: TransportCommand) {
        if self.transport.try_send(cmd).is_err() {
            log::warn!("transport queue unavailable, dropped {cmd:?}");
        }
    }
}
