use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::grid::draw_cell_grid;
use super::mode::TuiState;
use crate::middle::DisplayState;
use crate::shared::{CellCoord, TransportState};

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport + detection status
            Constraint::Min(20),   // cell grid
            Constraint::Length(4), // sliders
        ])
        .split(area);

    draw_status(frame, sections[0], state, ts);
    draw_cell_grid(
        frame,
        sections[1],
        &state.grid,
        state.status.column,
        (ts.cursor_row, ts.cursor_col),
        blink_on,
    );
    draw_sliders(frame, sections[2], state);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let transport_color = match state.status.state {
        TransportState::Playing => Color::LightGreen,
        TransportState::Paused => Color::Yellow,
        TransportState::Stopped => Color::Gray,
    };
    let d = &state.detection;
    let detection = if !state.params.hue_detection_enabled {
        Span::styled("hue off", Style::default().fg(Color::DarkGray))
    } else if d.camera_fault {
        Span::styled("camera fault", Style::default().fg(Color::LightRed))
    } else if d.detected {
        Span::styled(
            format!("hue {:>3.0}  cover {:>4.1}%", d.hue * 180.0, d.coverage * 100.0),
            Style::default().fg(Color::LightCyan),
        )
    } else {
        Span::styled("no color", Style::default().fg(Color::Gray))
    };
    let cursor = CellCoord::new(ts.cursor_row, ts.cursor_col).map(|c| c.label()).unwrap_or_default();
    let sample = state.params.sample.as_deref().unwrap_or("-");

    let line = Line::from(vec![
        Span::styled(format!(" {:<5} ", state.status.state.label()), Style::default().fg(transport_color)),
        Span::raw(format!("step {:>2}  ", state.status.column.map(|c| c + 1).unwrap_or(0))),
        Span::raw(format!("cell {cursor:<3}  ")),
        Span::raw(format!("sample {sample} ({})  ", state.sample_count)),
        detection,
    ]);
    frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("huegrid")), area);
}

fn draw_sliders(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let p = &state.params;
    let lines = vec![
        Line::from(format!(
            " vol {:.2} [v/V]   speed {:>2.0} [s/S]   hue vol {:.2} [o/O]   reverb {:.2} [r/R]",
            p.volume, p.speed, p.hue_volume, p.hue_reverb
        )),
        Line::from(format!(
            " hue center {:>3.0} [u/U]   sensitivity {:>2.0} [e/E]   detect [d]   sample [ ]   clear [c]   quit [q]",
            p.hue_center, p.sensitivity
        )),
    ];
    frame.render_widget(Paragraph::new(lines).block(Block::default().borders(Borders::TOP)), area);
}
