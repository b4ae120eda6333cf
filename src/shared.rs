// Types shared between the control surface, the sequencer and the audio engine.
//
// Keyboard plan for the terminal surface (resolved in tui/input.rs):
//   arrows / hjkl   move the cursor over the 10x10 grid
//   Enter / x       toggle the cell under the cursor
//   i               cycle the cell's instrument (Sine -> Saw -> Square -> Sample)
//   Space           play / pause
//   c               clear all
//   v / V           volume down / up
//   s / S           speed down / up
//   u / U           hue center down / up
//   e / E           sensitivity down / up
//   o / O           hue volume down / up
//   r / R           hue reverb down / up
//   d               toggle hue detection
//   [ / ]           previous / next sample
//   Esc / q         quit

pub const GRID_SIZE: usize = 10;
pub const NUM_CELLS: usize = GRID_SIZE * GRID_SIZE;

// A-minor pentatonic over three octaves, one pitch per row
pub const ROW_FREQUENCIES: [f32; GRID_SIZE] = [
    220.0, 261.63, 293.66, 329.63, 392.0, 440.0, 523.25, 587.33, 659.25, 784.0,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u8,
    pub col: u8,
}

impl CellCoord {
    /// Returns `None` for coordinates outside the grid.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < GRID_SIZE && col < GRID_SIZE {
            Some(Self { row: row as u8, col: col as u8 })
        } else {
            None
        }
    }

    // flat slot index, row major
    #[inline]
    pub fn index(self) -> usize {
        self.row as usize * GRID_SIZE + self.col as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::new(idx / GRID_SIZE, idx % GRID_SIZE)
    }

    pub fn frequency(self) -> f32 {
        ROW_FREQUENCIES[self.row as usize % GRID_SIZE]
    }

    // "A1".."J10", same labels the grid buttons carry
    pub fn label(self) -> String {
        format!("{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    #[default]
    Sine,
    Saw,
    Square,
    Sample,
}

impl InstrumentKind {
    pub fn next(self) -> Self {
        match self {
            InstrumentKind::Sine => InstrumentKind::Saw,
            InstrumentKind::Saw => InstrumentKind::Square,
            InstrumentKind::Square => InstrumentKind::Sample,
            InstrumentKind::Sample => InstrumentKind::Sine,
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            InstrumentKind::Sine => "SIN",
            InstrumentKind::Saw => "SAW",
            InstrumentKind::Square => "SQR",
            InstrumentKind::Sample => "SMP",
        }
    }
}

// Semantic events coming out of the control surface. The TUI resolves keys
// into these; the controller turns them into snapshot writes and transport
// commands.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlEvent {
    ToggleCell { row: usize, col: usize },
    CycleInstrument { row: usize, col: usize },
    SetVolume(f32),
    SetHueVolume(f32),
    SetHueReverb(f32),
    SetSpeed(f32),
    SetHueCenter(f32),
    SetSensitivity(f32),
    EnableHueDetection(bool),
    SelectSample(String),
    NextSample,
    PrevSample,
    TogglePlay,
    Play,
    Pause,
    ClearAll,
    Quit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn label(self) -> &'static str {
        match self {
            TransportState::Stopped => "STOP",
            TransportState::Playing => "PLAY",
            TransportState::Paused => "PAUSE",
        }
    }
}
