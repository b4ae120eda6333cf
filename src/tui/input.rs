use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

use super::mode::TuiState;
use crate::middle::DisplayState;
use crate::shared::ControlEvent;

const LEVEL_STEP: f32 = 0.05; // volume, hue volume, reverb
const SPEED_STEP: f32 = 1.0;
const HUE_STEP: f32 = 5.0;
const SENSITIVITY_STEP: f32 = 1.0;

// poll for a key, move the cursor locally, resolve everything else into
// ControlEvents for the controller
pub fn poll_input(timeout: Duration, ts: &mut TuiState, ds: &DisplayState) -> anyhow::Result<Vec<ControlEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    match event::read()? {
        Event::Key(key) => Ok(handle_key_event(key, ts, ds)),
        _ => Ok(vec![]),
    }
}

// Every binding acts on press; repeat and release events are ignored.
fn handle_key_event(key: KeyEvent, ts: &mut TuiState, ds: &DisplayState) -> Vec<ControlEvent> {
    if key.kind != KeyEventKind::Press {
        return vec![];
    }
    handle_key(key.code, ts, ds)
}

fn handle_key(code: KeyCode, ts: &mut TuiState, ds: &DisplayState) -> Vec<ControlEvent> {
    let p = &ds.params;
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![ControlEvent::Quit],

        // cursor
        KeyCode::Up | KeyCode::Char('k') => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down | KeyCode::Char('j') => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left | KeyCode::Char('h') => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right | KeyCode::Char('l') => { ts.move_cursor(0, 1); vec![] }

        // cell under the cursor
        KeyCode::Enter | KeyCode::Char('x') => {
            vec![ControlEvent::ToggleCell { row: ts.cursor_row, col: ts.cursor_col }]
        }
        KeyCode::Char('i') => vec![ControlEvent::CycleInstrument { row: ts.cursor_row, col: ts.cursor_col }],

        // transport
        KeyCode::Char(' ') => vec![ControlEvent::TogglePlay],
        KeyCode::Char('c') => vec![ControlEvent::ClearAll],

        // sliders, lowercase = down and shifted = up
        KeyCode::Char('v') => vec![ControlEvent::SetVolume(p.volume - LEVEL_STEP)],
        KeyCode::Char('V') => vec![ControlEvent::SetVolume(p.volume + LEVEL_STEP)],
        KeyCode::Char('s') => vec![ControlEvent::SetSpeed(p.speed - SPEED_STEP)],
        KeyCode::Char('S') => vec![ControlEvent::SetSpeed(p.speed + SPEED_STEP)],
        KeyCode::Char('u') => vec![ControlEvent::SetHueCenter(p.hue_center - HUE_STEP)],
        KeyCode::Char('U') => vec![ControlEvent::SetHueCenter(p.hue_center + HUE_STEP)],
        KeyCode::Char('e') => vec![ControlEvent::SetSensitivity(p.sensitivity - SENSITIVITY_STEP)],
        KeyCode::Char('E') => vec![ControlEvent::SetSensitivity(p.sensitivity + SENSITIVITY_STEP)],
        KeyCode::Char('o') => vec![ControlEvent::SetHueVolume(p.hue_volume - LEVEL_STEP)],
        KeyCode::Char('O') => vec![ControlEvent::SetHueVolume(p.hue_volume + LEVEL_STEP)],
        KeyCode::Char('r') => vec![ControlEvent::SetHueReverb(p.hue_reverb - LEVEL_STEP)],
        KeyCode::Char('R') => vec![ControlEvent::SetHueReverb(p.hue_reverb + LEVEL_STEP)],
        KeyCode::Char('d') => vec![ControlEvent::EnableHueDetection(!p.hue_detection_enabled)],

        // sample used by every Sample cell
        KeyCode::Char('[') => vec![ControlEvent::PrevSample],
        KeyCode::Char(']') => vec![ControlEvent::NextSample],

        _ => vec![],
    }
}
